//! Applying one patch to many documents

use super::{PatchReport, Patcher};
use crate::dom::XmlDocument;
use crate::error::PatchError;
use rayon::prelude::*;

/// Apply `patch` to every document in `sources` in parallel.
/// Results are in the order of `sources`; a failure affects only its own document.
pub fn patch_parallel(
    patcher: &Patcher,
    sources: &mut [XmlDocument],
    patch: &XmlDocument,
) -> Vec<Result<PatchReport, PatchError>> {
    sources
        .par_iter_mut()
        .map(|source| patcher.patch(source, patch))
        .collect()
}
