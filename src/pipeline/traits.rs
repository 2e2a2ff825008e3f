//! Decoder stage definitions for the pipeline.
//!
//! A [`DocumentDecoder`] turns raw bytes into a [`NestedValue`] tree. It is
//! the only stage that touches input bytes, and it always completes before
//! the frame builder starts. HTML has no built-in decoder; hosts decode it
//! and hand the tree to
//! [`FramePipeline::run_document`](super::runner::FramePipeline::run_document).

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::{FramerError, Result};
use crate::pipeline::spec::SourceType;
use crate::value::{Mapping, NestedValue};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text exported from spreadsheets and Windows tools often starts with a
/// byte-order mark that JSON parsers reject.
fn strip_bom(raw: &[u8]) -> &[u8] {
    raw.strip_prefix(UTF8_BOM).unwrap_or(raw)
}

// ============================================================================
// DocumentDecoder: raw bytes to document tree (stage 0)
// ============================================================================

/// Decodes one raw document into a tree.
///
/// # Contract
///
/// - **Input**: the complete raw document.
/// - **Output**: the decoded tree, or [`FramerError::Decode`] when the bytes
///   are not a valid document of this format.
/// - **Deterministic**: same bytes → same tree.
pub trait DocumentDecoder {
    /// Short format name used in errors and logs (e.g. `"json"`).
    fn format(&self) -> &str;

    /// Decode `raw` into a document tree.
    fn decode(&self, raw: &[u8]) -> Result<NestedValue>;
}

impl<D: DocumentDecoder + ?Sized> DocumentDecoder for Box<D> {
    fn format(&self) -> &str {
        (**self).format()
    }

    fn decode(&self, raw: &[u8]) -> Result<NestedValue> {
        (**self).decode(raw)
    }
}

// ============================================================================
// JsonDecoder
// ============================================================================

/// Plain JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl DocumentDecoder for JsonDecoder {
    fn format(&self) -> &str {
        "json"
    }

    fn decode(&self, raw: &[u8]) -> Result<NestedValue> {
        serde_json::from_slice::<serde_json::Value>(strip_bom(raw))
            .map(NestedValue::from)
            .map_err(|e| FramerError::decode(self.format(), e.to_string()))
    }
}

// ============================================================================
// GraphQlDecoder
// ============================================================================

/// GraphQL responses: JSON with top-level `data` and `errors` members.
///
/// The whole response is returned so root selectors read `data.…`. A response
/// whose `errors` array is non-empty while `data` is null or missing carries
/// nothing to build from and fails with the first error message.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphQlDecoder;

impl GraphQlDecoder {
    fn first_error(errors: &[serde_json::Value]) -> String {
        errors
            .first()
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string()
    }
}

impl DocumentDecoder for GraphQlDecoder {
    fn format(&self) -> &str {
        "graphql"
    }

    fn decode(&self, raw: &[u8]) -> Result<NestedValue> {
        let response: serde_json::Value = serde_json::from_slice(strip_bom(raw))
            .map_err(|e| FramerError::decode(self.format(), e.to_string()))?;

        let data_missing = response.get("data").map_or(true, |d| d.is_null());
        if let Some(errors) = response.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                if data_missing {
                    return Err(FramerError::decode(self.format(), Self::first_error(errors)));
                }
                tracing::debug!(
                    errors = errors.len(),
                    "graphql response carries partial errors"
                );
            }
        }
        Ok(response.into())
    }
}

// ============================================================================
// CsvDecoder
// ============================================================================

/// Delimited text. The header row names the keys; every record becomes a
/// mapping of string cells and the document is the sequence of records.
///
/// Ragged rows are tolerated: missing trailing cells are left out of the
/// record and cells beyond the header are dropped.
#[derive(Debug, Clone, Copy)]
pub struct CsvDecoder {
    delimiter: u8,
}

impl CsvDecoder {
    pub fn csv() -> Self {
        Self { delimiter: b',' }
    }

    pub fn tsv() -> Self {
        Self { delimiter: b'\t' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self::csv()
    }
}

impl DocumentDecoder for CsvDecoder {
    fn format(&self) -> &str {
        if self.delimiter == b'\t' {
            "tsv"
        } else {
            "csv"
        }
    }

    fn decode(&self, raw: &[u8]) -> Result<NestedValue> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(raw);

        let headers = reader
            .headers()
            .map_err(|e| FramerError::decode(self.format(), e.to_string()))?
            .clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| FramerError::decode(self.format(), e.to_string()))?;
            let mut row = Mapping::with_capacity(headers.len());
            for (key, cell) in headers.iter().zip(record.iter()) {
                row.insert(key, cell);
            }
            rows.push(NestedValue::Mapping(row));
        }
        Ok(NestedValue::Sequence(rows))
    }
}

// ============================================================================
// XmlDecoder
// ============================================================================

/// XML documents, shaped the way JavaScript XML-to-object converters shape
/// them so selectors written against those trees keep working.
///
/// - The document is a mapping from the root element's name to the root.
/// - Child elements are always sequences, even when they occur once.
/// - Attributes sit under `$`, element text under `_`.
/// - An element with neither attributes nor children is just its text
///   (`""` when empty).
///
/// Text is trimmed. Comments, processing instructions and the declaration
/// are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDecoder;

/// An element still waiting for its end tag.
#[derive(Debug, Default)]
struct OpenElement {
    name: String,
    attributes: Mapping,
    text: String,
    children: Mapping,
}

impl OpenElement {
    fn start(tag: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let mut element = Self {
            name: String::from_utf8_lossy(tag.name().as_ref()).into_owned(),
            ..Self::default()
        };
        for attr in tag.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            element.attributes.insert(
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value.into_owned(),
            );
        }
        Ok(element)
    }

    fn push_child(&mut self, name: String, value: NestedValue) {
        match self.children.get_mut(&name) {
            Some(NestedValue::Sequence(items)) => items.push(value),
            _ => self.children.insert(name, NestedValue::Sequence(vec![value])),
        }
    }

    fn finish(self) -> (String, NestedValue) {
        let Self {
            name,
            attributes,
            text,
            children,
        } = self;
        let text = text.trim();
        if attributes.is_empty() && children.is_empty() {
            return (name, NestedValue::from(text));
        }

        let mut node = Mapping::with_capacity(children.len() + 2);
        if !attributes.is_empty() {
            node.insert("$", attributes);
        }
        if !text.is_empty() {
            node.insert("_", text);
        }
        for (child, items) in children {
            node.insert(child, items);
        }
        (name, NestedValue::Mapping(node))
    }
}

impl DocumentDecoder for XmlDecoder {
    fn format(&self) -> &str {
        "xml"
    }

    fn decode(&self, raw: &[u8]) -> Result<NestedValue> {
        let fail = |message: String| FramerError::decode(self.format(), message);
        let source = std::str::from_utf8(strip_bom(raw)).map_err(|e| fail(e.to_string()))?;
        let mut reader = Reader::from_str(source);
        reader.trim_text(true);

        let mut open: Vec<OpenElement> = Vec::new();
        let mut root: Option<(String, NestedValue)> = None;
        loop {
            let closed = match reader.read_event().map_err(|e| fail(e.to_string()))? {
                Event::Start(tag) => {
                    open.push(OpenElement::start(&tag).map_err(fail)?);
                    None
                }
                Event::Empty(tag) => Some(OpenElement::start(&tag).map_err(fail)?.finish()),
                Event::End(_) => open.pop().map(OpenElement::finish),
                Event::Text(text) => {
                    if let Some(current) = open.last_mut() {
                        let text = text.unescape().map_err(|e| fail(e.to_string()))?;
                        current.text.push_str(&text);
                    }
                    None
                }
                Event::CData(data) => {
                    if let Some(current) = open.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                    None
                }
                Event::Eof => break,
                _ => None,
            };

            if let Some((name, value)) = closed {
                match open.last_mut() {
                    Some(parent) => parent.push_child(name, value),
                    None if root.is_none() => root = Some((name, value)),
                    None => return Err(fail("document has more than one root element".into())),
                }
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(fail(format!("element <{}> is never closed", unclosed.name)));
        }
        Ok(match root {
            Some((name, value)) => {
                let mut doc = Mapping::with_capacity(1);
                doc.insert(name, value);
                NestedValue::Mapping(doc)
            }
            None => NestedValue::Null,
        })
    }
}

// ============================================================================
// Decoder lookup
// ============================================================================

/// The built-in decoder for `source`.
///
/// HTML has none; decode it externally and build from the tree.
pub fn decoder_for(source: SourceType) -> Result<Box<dyn DocumentDecoder + Send + Sync>> {
    match source {
        SourceType::Json => Ok(Box::new(JsonDecoder)),
        SourceType::GraphQl => Ok(Box::new(GraphQlDecoder)),
        SourceType::Csv => Ok(Box::new(CsvDecoder::csv())),
        SourceType::Tsv => Ok(Box::new(CsvDecoder::tsv())),
        SourceType::Xml => Ok(Box::new(XmlDecoder)),
        SourceType::Html => Err(FramerError::unsupported_format(source.as_str())),
    }
}
