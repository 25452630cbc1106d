//! Trace-tree field reader.
//!
//! Child spans are nested under a `spans` key until one of the leaf markers
//! (`inputs`, `internals`, `outputs`) appears in the path, after which the
//! remaining segments address plain fields:
//! `rag.retriever.internals.prompt` reads
//! `tree["spans"]["rag"]["spans"]["retriever"]["internals"]["prompt"]`.

use serde_json::Value;
use tracing::warn;

use crate::path::{parse_field_strict, Segment};

/// Key under which child spans are nested.
pub const SPANS_KEY: &str = "spans";

/// Keys that end span nesting.
pub const LEAF_MARKERS: [&str; 3] = ["inputs", "internals", "outputs"];

/// Resolve `path` in a trace tree. Failures are logged and reported as `None`.
pub fn get_trace_value<'v>(tree: &'v Value, path: &str) -> Option<&'v Value> {
    match walk(tree, path) {
        Ok(value) => Some(value),
        Err(reason) => {
            warn!(path, reason = %reason, "trace field lookup failed");
            None
        }
    }
}

fn walk<'v>(tree: &'v Value, path: &str) -> Result<&'v Value, String> {
    let mut current = tree;
    let mut in_spans = true;

    for field in path.split('.') {
        let segments = parse_field_strict(field).ok_or_else(|| format!("malformed field '{field}'"))?;
        for segment in segments {
            match segment {
                Segment::Key(key) => {
                    if LEAF_MARKERS.contains(&key) {
                        in_spans = false;
                    }
                    if in_spans {
                        current = current
                            .get(SPANS_KEY)
                            .ok_or_else(|| format!("no '{SPANS_KEY}' above span '{key}'"))?;
                    }
                    current = current
                        .get(key)
                        .ok_or_else(|| format!("key '{key}' not found"))?;
                }
                Segment::Index(idx) => {
                    current = current
                        .as_array()
                        .and_then(|items| items.get(idx))
                        .ok_or_else(|| format!("index [{idx}] not found in '{field}'"))?;
                }
            }
        }
    }

    Ok(current)
}
