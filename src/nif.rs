//! Erlang NIF bindings (Elixir.XmlPatch.Native)

use crate::dom::{WriteOptions, XmlDocument};
use crate::error::PatchError;
use crate::patch::{patch_parallel, Patcher};
use rustler::{Binary, Encoder, Env, NewBinary, NifResult, Term};
use std::sync::OnceLock;

rustler::atoms! {
    ok,
    error,
}

/// Shared so compiled expressions survive across calls
fn patcher() -> &'static Patcher {
    static PATCHER: OnceLock<Patcher> = OnceLock::new();
    PATCHER.get_or_init(Patcher::new)
}

fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

fn result_to_term<'a>(env: Env<'a>, result: Result<String, PatchError>) -> Term<'a> {
    match result {
        Ok(xml) => (ok(), str_to_binary(env, &xml)).encode(env),
        Err(e) => (error(), e.to_string()).encode(env),
    }
}

fn serialize(doc: &XmlDocument) -> String {
    doc.to_xml_with(&WriteOptions::default())
}

fn patch_bytes(source: &[u8], patch: &XmlDocument) -> Result<String, PatchError> {
    let mut doc = XmlDocument::parse(source)?;
    patcher().patch(&mut doc, patch)?;
    Ok(serialize(&doc))
}

/// Patch a source document; returns {:ok, xml} or {:error, reason}
#[rustler::nif(schedule = "DirtyCpu")]
fn patch<'a>(env: Env<'a>, source: Binary<'a>, patch_xml: Binary<'a>) -> NifResult<Term<'a>> {
    let result = XmlDocument::parse(patch_xml.as_slice())
        .map_err(PatchError::from)
        .and_then(|patch_doc| patch_bytes(source.as_slice(), &patch_doc));
    Ok(result_to_term(env, result))
}

/// Patch many source documents in parallel; one result tuple per source
#[rustler::nif(schedule = "DirtyCpu")]
fn patch_many<'a>(env: Env<'a>, sources: Vec<Binary<'a>>, patch_xml: Binary<'a>) -> NifResult<Term<'a>> {
    let patch_doc = match XmlDocument::parse(patch_xml.as_slice()) {
        Ok(doc) => doc,
        Err(e) => return Ok((error(), e.to_string()).encode(env)),
    };

    let mut parsed = Vec::with_capacity(sources.len());
    let mut parse_errors = Vec::new();
    for (index, source) in sources.iter().enumerate() {
        match XmlDocument::parse(source.as_slice()) {
            Ok(doc) => parsed.push(doc),
            Err(e) => parse_errors.push((index, PatchError::from(e))),
        }
    }

    let mut outcomes = patch_parallel(patcher(), &mut parsed, &patch_doc)
        .into_iter()
        .zip(parsed.iter())
        .map(|(result, doc)| result.map(|_| serialize(doc)));

    // Reassemble in input order
    let mut results: Vec<Result<String, PatchError>> = Vec::with_capacity(sources.len());
    let mut errors = parse_errors.into_iter().peekable();
    for index in 0..sources.len() {
        if errors.peek().is_some_and(|(i, _)| *i == index) {
            if let Some((_, e)) = errors.next() {
                results.push(Err(e));
            }
        } else if let Some(outcome) = outcomes.next() {
            results.push(outcome);
        }
    }

    let mut list = Term::list_new_empty(env);
    for result in results.into_iter().rev() {
        list = list.list_prepend(result_to_term(env, result));
    }
    Ok(list)
}

/// All elements as {depth, qualified_name} in document order
#[rustler::nif]
fn list_elements<'a>(env: Env<'a>, input: Binary<'a>) -> NifResult<Term<'a>> {
    let doc = match XmlDocument::parse(input.as_slice()) {
        Ok(doc) => doc,
        Err(e) => return Ok((error(), e.to_string()).encode(env)),
    };

    let mut list = Term::list_new_empty(env);
    for id in crate::patch::list_all_elements(&doc).into_iter().rev() {
        let name = doc.node_name(id).unwrap_or("");
        let entry = (doc.depth(id), str_to_binary(env, name));
        list = list.list_prepend(entry.encode(env));
    }
    Ok((ok(), list).encode(env))
}

rustler::init!("Elixir.XmlPatch.Native");
