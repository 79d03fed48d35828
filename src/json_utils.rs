//! Locating JSON inside model output. Models wrap JSON in prose or markdown
//! fences, so responses are scanned for balanced object/array structures and
//! each one (then its children) is tried against the target type.

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Byte span of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjCoords {
    pub start: usize,
    /// Inclusive index of the closing bracket/brace
    pub end: usize,
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..=self.end]
    }
}

struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Find all root JSON object/array structures in `text`. Brackets inside string
/// literals are ignored; mismatched closers drop the open frame.
#[instrument(target = "flag_quiz::json", skip(text), fields(text_len = text.len()))]
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let mut roots = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if in_string {
            match (escape, b) {
                (true, _) => escape = false,
                (false, b'\\') => escape = true,
                (false, b'"') => in_string = false,
                _ => {}
            }
            continue;
        }

        let closing = match b {
            b'"' if !stack.is_empty() => {
                in_string = true;
                None
            }
            b'{' => {
                stack.push(Frame { start: i, kind: NodeType::Object, children: Vec::new() });
                None
            }
            b'[' => {
                stack.push(Frame { start: i, kind: NodeType::Array, children: Vec::new() });
                None
            }
            b'}' => Some(NodeType::Object),
            b']' => Some(NodeType::Array),
            _ => None,
        };

        let Some(kind) = closing else { continue };
        let Some(frame) = stack.pop() else { continue };
        if frame.kind != kind {
            continue;
        }
        let node = ObjCoords { start: frame.start, end: i, kind, children: frame.children };
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    debug!(target: "flag_quiz::json", roots = roots.len(), "scanned for JSON structures");
    roots
}

/// First value of type `T` found in `text`, parent structures before children.
pub fn extract_first<T: DeserializeOwned>(text: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str::<T>(text.trim()) {
        return Some(value);
    }

    fn search<T: DeserializeOwned>(text: &str, node: &ObjCoords) -> Option<T> {
        serde_json::from_str::<T>(node.slice(text))
            .ok()
            .or_else(|| node.children.iter().find_map(|child| search(text, child)))
    }

    find_json_structures(text).iter().find_map(|node| search(text, node))
}
