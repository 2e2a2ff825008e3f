//! Path selectors over [`NestedValue`] trees.
//!
//! A selector addresses a location with dotted keys and bracketed indices,
//! freely combined: `a.b.0.c`, `a.b[0].c`, `rows['x.y']`. Resolution never
//! fails; anything that does not line up (missing key, bad index, a scalar
//! in the middle of the path) is simply absent.
//!
//! ```
//! use rapid_docframe::selector::{resolve, Selector};
//! use rapid_docframe::NestedValue;
//!
//! let doc: NestedValue = serde_json::json!({ "a": { "b": [{ "c": 7 }] } }).into();
//! assert_eq!(resolve(&doc, "a.b.0.c"), NestedValue::Number(7.0));
//! assert_eq!(resolve(&doc, "a.b[3].c"), NestedValue::from(""));
//! assert!(Selector::parse("a.missing").resolve(&doc).is_none());
//! ```

use crate::value::NestedValue;

/// A parsed selector, reusable across many documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    raw: String,
    segments: Vec<String>,
}

impl Selector {
    /// Split a selector string into path segments.
    pub fn parse(selector: &str) -> Self {
        Self {
            raw: selector.to_string(),
            segments: split_segments(selector),
        }
    }

    /// The selector as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk `doc` along the selector's segments.
    ///
    /// A mapping holding the whole selector as a literal key wins over the
    /// segmented walk, so keys such as `"cpu.total"` stay reachable.
    pub fn resolve<'a>(&self, doc: &'a NestedValue) -> Option<&'a NestedValue> {
        if let NestedValue::Mapping(m) = doc {
            if let Some(v) = m.get(&self.raw) {
                return Some(v);
            }
        }
        self.segments
            .iter()
            .try_fold(doc, |node, segment| step(node, segment))
    }

    /// Resolve, falling back to `default` when absent.
    pub fn resolve_or(&self, doc: &NestedValue, default: NestedValue) -> NestedValue {
        self.resolve(doc).cloned().unwrap_or(default)
    }
}

fn step<'a>(node: &'a NestedValue, segment: &str) -> Option<&'a NestedValue> {
    match node {
        NestedValue::Mapping(m) => m.get(segment),
        NestedValue::Sequence(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|idx| items.get(idx)),
        _ => None,
    }
}

fn split_segments(selector: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    // After `]` a following `.` must not emit an empty segment.
    let mut after_bracket = false;
    let mut chars = selector.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !after_bracket {
                    segments.push(std::mem::take(&mut current));
                }
                after_bracket = false;
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                let mut key = String::new();
                match chars.peek().copied() {
                    Some(quote @ ('\'' | '"')) => {
                        chars.next();
                        while let Some(c) = chars.next() {
                            match c {
                                '\\' => {
                                    if let Some(escaped) = chars.next() {
                                        key.push(escaped);
                                    }
                                }
                                c if c == quote => break,
                                c => key.push(c),
                            }
                        }
                        // Skip to the closing bracket.
                        for c in chars.by_ref() {
                            if c == ']' {
                                break;
                            }
                        }
                    }
                    _ => {
                        for c in chars.by_ref() {
                            if c == ']' {
                                break;
                            }
                            key.push(c);
                        }
                    }
                }
                segments.push(key);
                after_bracket = true;
            }
            c => {
                after_bracket = false;
                current.push(c);
            }
        }
    }

    if !after_bracket {
        segments.push(current);
    }
    segments
}

/// Resolve `selector` against `doc`, returning `None` when absent.
pub fn resolve_opt<'a>(doc: &'a NestedValue, selector: &str) -> Option<&'a NestedValue> {
    Selector::parse(selector).resolve(doc)
}

/// Resolve `selector` against `doc`, returning the empty string when absent.
pub fn resolve(doc: &NestedValue, selector: &str) -> NestedValue {
    resolve_or(doc, selector, NestedValue::String(String::new()))
}

/// Resolve `selector` against `doc`, returning `default` when absent.
pub fn resolve_or(doc: &NestedValue, selector: &str, default: NestedValue) -> NestedValue {
    Selector::parse(selector).resolve_or(doc, default)
}
