//! In-memory page documents
//!
//! Each loaded tab has its markup and at most one selection range, stored
//! as byte offsets into the markup. Selection boundaries always fall in text
//! content, never inside a tag.

use parking_lot::RwLock;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::ops::Range;
use tabwire_surface::TabId;

use crate::error::HeadlessError;
use crate::Result;

#[derive(Debug, Clone)]
struct PageDocument {
    markup: String,
    selection: Option<Range<usize>>,
}

#[derive(Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<TabId, PageDocument>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the document of a tab, clearing its selection
    pub fn load(&self, tab_id: TabId, markup: String) {
        self.documents.write().insert(
            tab_id,
            PageDocument {
                markup,
                selection: None,
            },
        );
    }

    pub fn markup(&self, tab_id: TabId) -> Option<String> {
        self.documents.read().get(&tab_id).map(|d| d.markup.clone())
    }

    pub fn is_loaded(&self, tab_id: TabId) -> bool {
        self.documents.read().contains_key(&tab_id)
    }

    /// Drop a tab's document, e.g. after navigation or close
    pub fn discard(&self, tab_id: TabId) {
        self.documents.write().remove(&tab_id);
    }

    /// Select a byte range of the markup
    pub fn select(&self, tab_id: TabId, range: Range<usize>) -> Result<()> {
        let mut documents = self.documents.write();
        let invalid = || HeadlessError::InvalidSelection {
            tab_id,
            start: range.start,
            end: range.end,
        };

        let document = documents.get_mut(&tab_id).ok_or_else(invalid)?;
        let markup = &document.markup;
        if range.start > range.end
            || range.end > markup.len()
            || !markup.is_char_boundary(range.start)
            || !markup.is_char_boundary(range.end)
        {
            return Err(invalid());
        }

        let tags = tag_spans(markup);
        if inside_tag(&tags, range.start) || inside_tag(&tags, range.end) {
            return Err(invalid());
        }

        document.selection = Some(range);
        Ok(())
    }

    /// Select the first occurrence of `text` in the document's text content.
    /// Returns false when the text does not occur.
    pub fn select_text(&self, tab_id: TabId, text: &str) -> bool {
        let mut documents = self.documents.write();
        let Some(document) = documents.get_mut(&tab_id) else {
            return false;
        };

        // The escaped needle has no angle brackets, so a match is either
        // wholly inside a tag or wholly in text.
        let needle = escape_html(text);
        let tags = tag_spans(&document.markup);
        let found = document
            .markup
            .match_indices(&needle)
            .map(|(start, _)| start)
            .find(|&start| !inside_tag(&tags, start));

        match found {
            Some(start) => {
                document.selection = Some(start..start + needle.len());
                true
            }
            None => false,
        }
    }

    /// Text content of the current selection, empty when nothing is selected
    pub fn selection_text(&self, tab_id: TabId) -> String {
        let documents = self.documents.read();
        let Some(document) = documents.get(&tab_id) else {
            return String::new();
        };

        match &document.selection {
            Some(range) if !range.is_empty() => {
                let fragment = Html::parse_fragment(&document.markup[range.clone()]);
                fragment.root_element().text().collect()
            }
            _ => String::new(),
        }
    }

    /// Replace the selected range with `text` as a text node and collapse
    /// the selection to the end of the insertion.
    ///
    /// Text in the range is deleted along with elements that lie wholly
    /// inside it. Tags of elements the range only partly covers are kept, so
    /// the element structure survives.
    ///
    /// Returns false, leaving the document untouched, when there is no
    /// selection.
    pub fn replace_selection(&self, tab_id: TabId, text: &str) -> bool {
        let mut documents = self.documents.write();
        let Some(document) = documents.get_mut(&tab_id) else {
            return false;
        };
        let Some(range) = document.selection.take() else {
            return false;
        };

        let tags = tag_spans(&document.markup);
        let kept = surviving_tags(&document.markup, &tags, &range);
        let escaped = escape_html(text);
        let end = range.start + escaped.len();
        document.markup.replace_range(range, &format!("{escaped}{kept}"));
        document.selection = Some(end..end);
        true
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

enum Tag {
    Open(String),
    Close(String),
    /// Void elements, self-closing tags, comments and declarations
    Empty,
}

impl Tag {
    fn parse(tag: &str) -> Self {
        let inner = tag.trim_start_matches('<').trim_end_matches('>');
        if inner.starts_with('!') || inner.starts_with('?') || inner.ends_with('/') {
            return Tag::Empty;
        }

        let (closing, rest) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let name = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect::<String>()
            .to_ascii_lowercase();

        if closing {
            Tag::Close(name)
        } else if VOID_ELEMENTS.contains(&name.as_str()) {
            Tag::Empty
        } else {
            Tag::Open(name)
        }
    }
}

/// Byte spans of every tag in `markup`, in document order. Quoted attribute
/// values may contain `>`.
fn tag_spans(markup: &str) -> Vec<Range<usize>> {
    let bytes = markup.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }

        let start = i;
        let mut quote = None;
        i += 1;
        while i < bytes.len() {
            match (quote, bytes[i]) {
                (None, b'"' | b'\'') => quote = Some(bytes[i]),
                (Some(q), b) if b == q => quote = None,
                (None, b'>') => break,
                _ => {}
            }
            i += 1;
        }
        i = (i + 1).min(bytes.len());
        spans.push(start..i);
    }
    spans
}

fn inside_tag(tags: &[Range<usize>], offset: usize) -> bool {
    tags.iter().any(|tag| tag.start < offset && offset < tag.end)
}

/// Tags inside `range` that must stay after its content is deleted: the
/// closing tags of elements opened before the range and the opening tags of
/// elements closed after it. Elements opened and closed inside the range go
/// with it.
fn surviving_tags(markup: &str, tags: &[Range<usize>], range: &Range<usize>) -> String {
    let mut kept: Vec<(&str, Option<String>)> = Vec::new();

    for span in tags
        .iter()
        .filter(|tag| tag.start >= range.start && tag.end <= range.end)
    {
        let tag = &markup[span.clone()];
        match Tag::parse(tag) {
            Tag::Empty => {}
            Tag::Open(name) => kept.push((tag, Some(name))),
            Tag::Close(name) => {
                let opened = kept
                    .iter()
                    .rposition(|(_, open)| open.as_deref() == Some(name.as_str()));
                match opened {
                    Some(pos) => {
                        kept.remove(pos);
                    }
                    None => kept.push((tag, None)),
                }
            }
        }
    }

    kept.into_iter().map(|(tag, _)| tag).collect()
}

/// Title of an HTML document, whitespace-normalized
pub fn document_title(markup: &str) -> Option<String> {
    let doc = Html::parse_document(markup);
    let sel = Selector::parse("title").ok()?;

    doc.select(&sel).find_map(|el| {
        let text = el.text().collect::<Vec<_>>().join(" ");
        let cleaned = normalize_whitespace(&text);
        (!cleaned.is_empty()).then_some(cleaned)
    })
}

fn normalize_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
