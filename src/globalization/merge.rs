use std::collections::{BTreeSet, HashSet};

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::dictionary::Dictionary;

const PHRASE_ELEMENT: &[u8] = b"phrase";
const PHRASE_REF: &[u8] = b"ref";

/// Result of walking one document.
#[derive(Debug, Default)]
pub(crate) struct MergeOutput {
    pub document: String,
    pub placeholders: usize,
    pub substituted: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

/// Substitute dictionary phrases into `source`.
///
/// Placeholders keep their markers after substitution, so running the merge
/// again over its own output replaces the same phrases instead of nesting
/// them:
/// - `<intl:phrase ref="id"/>`: content becomes the phrase text.
/// - `intl:title="id"` on any element: the `title` attribute becomes the phrase text.
pub(crate) fn merge_document(
    source: &str,
    dictionary: &Dictionary,
    prefix: &str,
) -> Result<MergeOutput, String> {
    let prefix = prefix.as_bytes();
    let mut reader = Reader::from_str(source);
    let mut writer = Writer::new(Vec::with_capacity(source.len()));
    let mut out = MergeOutput::default();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| format!("{err} at byte {}", reader.error_position()))?;
        match event {
            Event::Start(e) if is_phrase(&e, prefix) => {
                let id = phrase_ref(&e)?;
                out.placeholders += 1;
                let start = rewrite_attributes(&e, dictionary, prefix, &mut out)?;
                match dictionary.get(&id) {
                    Some(text) => {
                        let end = start.to_end().into_owned();
                        writer.write_event(Event::Start(start)).map_err(write_err)?;
                        writer
                            .write_event(Event::Text(BytesText::new(text)))
                            .map_err(write_err)?;
                        skip_to_end(&mut reader)?;
                        writer.write_event(Event::End(end)).map_err(write_err)?;
                        out.substituted.insert(id);
                    }
                    None => {
                        writer.write_event(Event::Start(start)).map_err(write_err)?;
                        out.missing.insert(id);
                    }
                }
            }
            Event::Empty(e) if is_phrase(&e, prefix) => {
                let id = phrase_ref(&e)?;
                out.placeholders += 1;
                let start = rewrite_attributes(&e, dictionary, prefix, &mut out)?;
                match dictionary.get(&id) {
                    Some(text) => {
                        let end = start.to_end().into_owned();
                        writer.write_event(Event::Start(start)).map_err(write_err)?;
                        writer
                            .write_event(Event::Text(BytesText::new(text)))
                            .map_err(write_err)?;
                        writer.write_event(Event::End(end)).map_err(write_err)?;
                        out.substituted.insert(id);
                    }
                    None => {
                        writer.write_event(Event::Empty(start)).map_err(write_err)?;
                        out.missing.insert(id);
                    }
                }
            }
            Event::Start(e) => {
                let start = rewrite_attributes(&e, dictionary, prefix, &mut out)?;
                writer.write_event(Event::Start(start)).map_err(write_err)?;
            }
            Event::Empty(e) => {
                let start = rewrite_attributes(&e, dictionary, prefix, &mut out)?;
                writer.write_event(Event::Empty(start)).map_err(write_err)?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(write_err)?,
        }
    }

    out.document = String::from_utf8(writer.into_inner()).map_err(|err| err.to_string())?;
    Ok(out)
}

fn write_err(err: impl std::fmt::Display) -> String {
    err.to_string()
}

fn is_phrase(e: &BytesStart<'_>, prefix: &[u8]) -> bool {
    let name = e.name();
    name.local_name().as_ref() == PHRASE_ELEMENT
        && name.prefix().is_some_and(|p| p.as_ref() == prefix)
}

fn phrase_ref(e: &BytesStart<'_>) -> Result<String, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        if attr.key.as_ref() == PHRASE_REF {
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            let id = value.trim();
            if id.is_empty() {
                break;
            }
            return Ok(id.to_string());
        }
    }
    Err(format!(
        "<{}> placeholder without a ref attribute",
        String::from_utf8_lossy(e.name().as_ref())
    ))
}

/// Drop everything up to and including the end tag of the current element.
fn skip_to_end(reader: &mut Reader<&[u8]>) -> Result<(), String> {
    let mut depth = 0usize;
    loop {
        let event = reader
            .read_event()
            .map_err(|err| format!("{err} at byte {}", reader.error_position()))?;
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(()),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err("unexpected end of document inside a phrase".to_string()),
            _ => {}
        }
    }
}

/// Apply `prefix:name="phrase.id"` attribute placeholders on one element.
fn rewrite_attributes<'a>(
    e: &BytesStart<'a>,
    dictionary: &Dictionary,
    prefix: &[u8],
    out: &mut MergeOutput,
) -> Result<BytesStart<'a>, String> {
    let attributes: Vec<Attribute<'_>> = e
        .attributes()
        .collect::<Result<_, _>>()
        .map_err(|err| err.to_string())?;

    // target attribute name -> phrase text, for placeholders that resolved
    let mut replacements: Vec<(String, String)> = Vec::new();
    for attr in &attributes {
        let key = attr.key;
        if key.prefix().is_some_and(|p| p.as_ref() == prefix) {
            let id = attr
                .unescape_value()
                .map_err(|err| err.to_string())?
                .trim()
                .to_string();
            if id.is_empty() {
                continue;
            }
            out.placeholders += 1;
            match dictionary.get(&id) {
                Some(text) => {
                    let target = std::str::from_utf8(key.local_name().as_ref())
                        .map_err(|err| err.to_string())?
                        .to_string();
                    replacements.push((target, text.to_string()));
                    out.substituted.insert(id);
                }
                None => {
                    out.missing.insert(id);
                }
            }
        }
    }
    if replacements.is_empty() {
        return Ok(e.clone());
    }

    let existing: HashSet<&[u8]> = attributes.iter().map(|a| a.key.as_ref()).collect();
    let replacement_for = |name: &[u8]| {
        replacements
            .iter()
            .find(|(target, _)| target.as_bytes() == name)
            .map(|(target, text)| (target.as_str(), text.as_str()))
    };

    let mut rewritten = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in &attributes {
        let key = attr.key.as_ref();
        if let Some(replacement) = replacement_for(key) {
            rewritten.push_attribute(replacement);
            continue;
        }
        rewritten.push_attribute(attr.clone());
        let is_placeholder = attr.key.prefix().is_some_and(|p| p.as_ref() == prefix);
        if is_placeholder {
            let target = attr.key.local_name();
            if !existing.contains(target.as_ref()) {
                if let Some(replacement) = replacement_for(target.as_ref()) {
                    rewritten.push_attribute(replacement);
                }
            }
        }
    }
    Ok(rewritten)
}
