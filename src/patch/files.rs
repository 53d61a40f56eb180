//! Patching serialized documents and files

use super::{PatchReport, Patcher};
use crate::dom::{writer, ParseOptions, WriteOptions, XmlDocument};
use crate::error::PatchError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// How documents are read and written around a patch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOptions {
    pub parse: ParseOptions,
    pub write: WriteOptions,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PatchError + '_ {
    move |source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read and parse a document
pub fn read_document(path: &Path, options: ParseOptions) -> Result<XmlDocument, PatchError> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    debug!(path = %path.display(), bytes = bytes.len(), "read document");
    Ok(XmlDocument::parse_with_options(&bytes, options)?)
}

/// Serialize a document to `path`, replacing any existing file
pub fn write_document(doc: &XmlDocument, path: &Path, options: &WriteOptions) -> Result<(), PatchError> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut out = BufWriter::new(file);
    writer::write_to(doc, options, &mut out).map_err(io_error(path))?;
    out.flush().map_err(io_error(path))
}

impl Patcher {
    /// Patch serialized XML and return the serialized result
    pub fn patch_str_with(
        &self,
        source: &str,
        patch: &str,
        options: &FileOptions,
    ) -> Result<(String, PatchReport), PatchError> {
        let mut source = XmlDocument::parse_with_options(source.as_bytes(), options.parse)?;
        let patch = XmlDocument::parse_with_options(patch.as_bytes(), options.parse)?;
        let report = self.patch(&mut source, &patch)?;
        Ok((source.to_xml_with(&options.write), report))
    }

    /// Patch the file at `source` and write the result to `result`.
    /// Nothing is written when reading, parsing or patching fails.
    pub fn patch_files_with(
        &self,
        source: &Path,
        patch: &Path,
        result: &Path,
        options: &FileOptions,
    ) -> Result<PatchReport, PatchError> {
        let mut doc = read_document(source, options.parse)?;
        let patch_doc = read_document(patch, options.parse)?;
        let report = self.patch(&mut doc, &patch_doc)?;
        write_document(&doc, result, &options.write)?;
        Ok(report)
    }
}

/// Patch serialized XML with default options
pub fn patch_str(source: &str, patch: &str) -> Result<String, PatchError> {
    Patcher::new()
        .patch_str_with(source, patch, &FileOptions::default())
        .map(|(xml, _)| xml)
}

/// Patch `source` into `result` with default options
pub fn patch_files(source: &Path, patch: &Path, result: &Path) -> Result<PatchReport, PatchError> {
    Patcher::new().patch_files_with(source, patch, result, &FileOptions::default())
}

/// Patch a file and overwrite it with the result
pub fn patch_file_in_place(path: &Path, patch: &Path) -> Result<PatchReport, PatchError> {
    patch_files(path, patch, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_patch_str() {
        let xml = patch_str("<root><s/></root>", "<root><s><n a=\"1\"/></s></root>").unwrap();
        assert_eq!(xml, "<root><s><n a=\"1\"/></s></root>");
    }

    #[test]
    fn test_patch_str_keeps_declaration_unless_disabled() {
        let source = "<?xml version=\"1.0\"?><root/>";
        let xml = patch_str(source, "<root a=\"1\"/>").unwrap();
        assert!(xml.starts_with("<?xml"));

        let options = FileOptions {
            write: WriteOptions {
                xml_declaration: false,
                indent: None,
            },
            ..FileOptions::default()
        };
        let (xml, report) = Patcher::new().patch_str_with(source, "<root a=\"1\"/>", &options).unwrap();
        assert_eq!(xml, "<root a=\"1\"/>");
        assert_eq!(report.merged, 1);
    }

    #[test]
    fn test_patch_str_parse_error() {
        let err = patch_str("<root>", "<root/>").unwrap_err();
        assert!(matches!(err, PatchError::Parse(_)));
    }

    #[test]
    fn test_patch_files() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.xml");
        let patch = dir.path().join("patch.xml");
        let result = dir.path().join("result.xml");
        fs::write(&source, "<root><settings><node/></settings></root>").unwrap();
        fs::write(&patch, "<root><settings><newnode/></settings></root>").unwrap();

        let report = patch_files(&source, &patch, &result).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(
            fs::read_to_string(&result).unwrap(),
            "<root><settings><node/><newnode/></settings></root>"
        );
        // Source is untouched
        assert_eq!(
            fs::read_to_string(&source).unwrap(),
            "<root><settings><node/></settings></root>"
        );
    }

    #[test]
    fn test_patch_file_in_place() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config.xml");
        let patch = dir.path().join("patch.xml");
        fs::write(&target, "<root><a/></root>").unwrap();
        fs::write(&patch, "<root><a v=\"2\"/></root>").unwrap();

        patch_file_in_place(&target, &patch).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "<root><a v=\"2\"/></root>");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.xml");
        let result = dir.path().join("result.xml");
        let err = patch_files(&missing, &missing, &result).unwrap_err();
        match err {
            PatchError::Io { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {}", other),
        }
        assert!(!result.exists());
    }
}
