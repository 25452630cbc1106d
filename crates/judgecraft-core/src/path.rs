//! Dotted / indexed path reader over arbitrary JSON values.
//!
//! `rag.summarizer[0].outputs.report` walks mapping keys and sequence
//! indices. Anything that does not resolve yields `None`, never an error.

use std::sync::OnceLock;

use judgecraft_types::{JsonMap, MappingInput, MappingOutput};
use regex::Regex;
use serde_json::Value;

/// One step of a path expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\[\].]+|\[\d+\]").expect("static path pattern"))
}

/// Split a path expression into key and index segments.
pub fn parse_path(path: &str) -> Vec<Segment<'_>> {
    segment_pattern()
        .find_iter(path)
        .map(|m| {
            let token = m.as_str();
            match token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                // Indices too large for usize can never be in bounds.
                Some(digits) => Segment::Index(digits.parse().unwrap_or(usize::MAX)),
                None => Segment::Key(token),
            }
        })
        .collect()
}

/// Like [`parse_path`] for a single dot-free field, but `None` unless the
/// tokens cover the whole field. Empty fields and stray brackets fail.
pub fn parse_field_strict(field: &str) -> Option<Vec<Segment<'_>>> {
    let mut end = 0;
    for m in segment_pattern().find_iter(field) {
        if m.start() != end {
            return None;
        }
        end = m.end();
    }
    if field.is_empty() || end != field.len() {
        return None;
    }
    Some(parse_path(field))
}

/// Resolve `path` inside `data`.
pub fn get_nested<'v>(data: &'v Value, path: &str) -> Option<&'v Value> {
    parse_path(path)
        .into_iter()
        .try_fold(data, |current, segment| match segment {
            Segment::Key(key) => current.as_object()?.get(key),
            Segment::Index(idx) => current.as_array()?.get(idx),
        })
}

/// Resolve every entry of a `target key -> path` mapping against the same input.
pub fn map_fields(input: &MappingInput) -> MappingOutput {
    let outputs: JsonMap = input
        .mapping
        .iter()
        .map(|(to_key, from_path)| {
            let value = get_nested(&input.inputs, from_path).cloned().unwrap_or(Value::Null);
            (to_key.clone(), value)
        })
        .collect();
    MappingOutput { outputs }
}
