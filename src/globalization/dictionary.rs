use std::collections::HashMap;
use std::path::PathBuf;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Result, SageError};

/// Phrase texts for one locale, merged from every layer that supplies a dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    pub locale: String,
    phrases: HashMap<String, String>,
    sources: Vec<PathBuf>,
}

impl Dictionary {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..Self::default()
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.phrases.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.phrases.contains_key(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.phrases.insert(id.into(), text.into());
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Dictionary files merged into this one, highest precedence first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Add phrases from a lower-precedence source. Existing ids win.
    pub fn merge_lower(&mut self, source: PathBuf, phrases: HashMap<String, String>) {
        for (id, text) in phrases {
            self.phrases.entry(id).or_insert(text);
        }
        self.sources.push(source);
    }
}

/// Parse `<dictionary><phrase id="...">text</phrase></dictionary>`.
///
/// Element names are matched on their local part, so `intl:phrase` works too.
/// Phrase text is the concatenated text of the element and its descendants.
pub fn parse_phrases(path: &std::path::Path, text: &str) -> Result<HashMap<String, String>> {
    let fail = |message: String| SageError::parse(path, message);

    let mut reader = Reader::from_str(text);
    let mut phrases = HashMap::new();
    let mut current: Option<(String, String)> = None;
    let mut nested = 0usize;
    loop {
        let event = reader
            .read_event()
            .map_err(|err| fail(format!("{err} at byte {}", reader.error_position())))?;
        match event {
            Event::Start(e) if e.local_name().as_ref() == b"phrase" && current.is_none() => {
                let id = phrase_id(&e).map_err(fail)?;
                current = Some((id, String::new()));
                nested = 0;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"phrase" && current.is_none() => {
                let id = phrase_id(&e).map_err(fail)?;
                phrases.insert(id, String::new());
            }
            Event::Start(_) if current.is_some() => nested += 1,
            Event::End(_) if current.is_some() => {
                if nested == 0 {
                    if let Some((id, text)) = current.take() {
                        phrases.insert(id, text);
                    }
                } else {
                    nested -= 1;
                }
            }
            Event::Text(t) => {
                if let Some((_, text)) = current.as_mut() {
                    let content = t.unescape().map_err(|err| fail(err.to_string()))?;
                    text.push_str(&content);
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if current.is_some() {
        return Err(fail("unterminated phrase element".to_string()));
    }
    Ok(phrases)
}

fn phrase_id(e: &quick_xml::events::BytesStart<'_>) -> std::result::Result<String, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        if attr.key.local_name().as_ref() == b"id" {
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            let id = value.trim();
            if id.is_empty() {
                return Err("phrase with an empty id".to_string());
            }
            return Ok(id.to_string());
        }
    }
    Err("phrase without an id attribute".to_string())
}
