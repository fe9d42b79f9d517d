//! Recovery of structured data from free-text model replies.
//!
//! List-shaped replies go through an ordered chain of stages, each a pure
//! function returning `Option<Vec<String>>`; the first stage to produce a
//! non-empty list wins. Nothing here ever fails: when every stage comes up
//! empty the caller pads with its own placeholders.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::cleanup::clean_narrative;

/// A single recovery strategy
pub type Stage = fn(&str) -> Option<Vec<String>>;

/// The list recovery chain, in the order it is tried
pub const LIST_STAGES: [(&str, Stage); 4] = [
    ("literal", parse_literal),
    ("embedded_array", parse_embedded_array),
    ("quoted", extract_quoted),
    ("enumerated", split_enumerated),
];

/// The chain used when exactly one item is wanted: a lone quoted phrase counts
pub const SINGLE_ITEM_STAGES: [(&str, Stage); 4] = [
    ("literal", parse_literal),
    ("embedded_array", parse_embedded_array),
    ("quoted", extract_single_quoted),
    ("enumerated", split_enumerated),
];

lazy_static! {
    static ref QUOTED: Regex =
        Regex::new(r#""((?:[^"\\\n]|\\.)*)"|“([^”\n]*)”"#).expect("valid quoted regex");
    static ref LIST_MARKER: Regex = Regex::new(
        r"(?i)^\s*(?:\d{1,2}\s*[.):]|[-*•]|(?:option|choice)\s*(?:[a-z]|\d{1,2})?\s*[.):])\s*(.*)$"
    )
    .expect("valid list marker regex");
}

/// Run `stages` in order and return the first non-empty result with the stage name
pub fn first_success(text: &str, stages: &[(&'static str, Stage)]) -> Option<(&'static str, Vec<String>)> {
    stages.iter().find_map(|(name, stage)| {
        stage(text)
            .filter(|items| !items.is_empty())
            .map(|items| (*name, items))
    })
}

/// Recover a list of short strings from a model reply. Returns an empty list on total failure.
pub fn normalize_list(text: &str) -> Vec<String> {
    recover(text, &LIST_STAGES)
}

/// Like [`normalize_list`], tuned for a reply that should hold `count` items
pub fn normalize_list_for(text: &str, count: usize) -> Vec<String> {
    if count == 1 {
        recover(text, &SINGLE_ITEM_STAGES)
    } else {
        recover(text, &LIST_STAGES)
    }
}

fn recover(text: &str, stages: &[(&'static str, Stage)]) -> Vec<String> {
    match first_success(text, stages) {
        Some((stage, items)) => {
            debug!(stage, items = items.len(), "Recovered list from model output");
            items
        }
        None => {
            debug!(text_len = text.len(), "No list could be recovered from model output");
            Vec::new()
        }
    }
}

/// Truncate to `count`, or pad with `placeholder(index)` for the missing slots
pub fn fit_to_count(
    mut items: Vec<String>,
    count: usize,
    placeholder: impl Fn(usize) -> String,
) -> Vec<String> {
    items.truncate(count);
    while items.len() < count {
        items.push(placeholder(items.len()));
    }
    items
}

/// Turn a prose reply into display text
pub fn normalize_prose(text: &str) -> String {
    clean_narrative(strip_code_fence(text))
}

/// Return the body of the first fenced code block, or the trimmed text when there is none
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[open + 3..];
    // Skip the info string (```json, ```python)
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Stage 1: the whole reply is an array literal
pub fn parse_literal(text: &str) -> Option<Vec<String>> {
    parse_string_array(strip_code_fence(text))
}

/// Stage 2: an array literal sits somewhere inside surrounding chatter
pub fn parse_embedded_array(text: &str) -> Option<Vec<String>> {
    text.char_indices()
        .filter(|(_, c)| *c == '[')
        .find_map(|(start, _)| {
            let end = matching_bracket(&text[start..])?;
            parse_string_array(&text[start..start + end + 1])
        })
}

/// Stage 3: every double-quoted substring is an item (needs at least two)
pub fn extract_quoted(text: &str) -> Option<Vec<String>> {
    quoted_items(text).filter(|items| items.len() >= 2)
}

/// Stage 3 for single-item replies: one quoted substring is enough
pub fn extract_single_quoted(text: &str) -> Option<Vec<String>> {
    quoted_items(text)
}

fn quoted_items(text: &str) -> Option<Vec<String>> {
    let items: Vec<String> = QUOTED
        .captures_iter(text)
        .filter_map(|caps| {
            caps.get(1)
                .map(|m| unescape(m.as_str()))
                .or_else(|| caps.get(2).map(|m| m.as_str().to_string()))
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Stage 4: numbered or bulleted lines, or plain lines when nothing is marked
pub fn split_enumerated(text: &str) -> Option<Vec<String>> {
    let body = strip_code_fence(text);
    let has_markers = body.lines().any(|l| LIST_MARKER.is_match(l));

    let mut items: Vec<String> = Vec::new();
    if has_markers {
        let mut in_list = false;
        for line in body.lines() {
            if let Some(caps) = LIST_MARKER.captures(line) {
                in_list = true;
                items.push(caps.get(1).map_or("", |m| m.as_str()).to_string());
            } else if in_list && !line.trim().is_empty() {
                if let Some(last) = items.last_mut() {
                    last.push(' ');
                    last.push_str(line.trim());
                }
            }
        }
    } else {
        items = body.lines().map(str::to_string).collect();
    }

    let items: Vec<String> = items
        .iter()
        .map(|s| tidy_item(s))
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Strip markdown emphasis, wrapping quotes and trailing commas from a list item
fn tidy_item(item: &str) -> String {
    let mut s = item.trim().replace("**", "");
    s = s.trim().trim_end_matches(',').trim().to_string();
    for (open, close) in [('"', '"'), ('“', '”'), ('\'', '\'')] {
        if s.len() >= 2 && s.starts_with(open) && s.ends_with(close) {
            s = s[open.len_utf8()..s.len() - close.len_utf8()].trim().to_string();
        }
    }
    s
}

/// Byte offset of the `]` closing the `[` at the start of `s`, skipping quoted text
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse `["a", 'b', ...]`: JSON first, then single- or double-quoted literal syntax.
/// Only string elements are accepted; nothing is evaluated.
fn parse_string_array(s: &str) -> Option<Vec<String>> {
    let s = s.trim();
    if !s.starts_with('[') || !s.ends_with(']') {
        return None;
    }

    if let Ok(items) = serde_json::from_str::<Vec<String>>(s) {
        return Some(clean_items(items));
    }

    let mut chars = s[1..s.len() - 1].chars().peekable();
    let mut items = Vec::new();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let quote = match chars.next() {
            None => break,
            Some(q @ ('"' | '\'')) => q,
            Some(_) => return None,
        };

        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next()? {
                    'n' => item.push('\n'),
                    't' => item.push('\t'),
                    other => item.push(other),
                },
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => item.push(c),
            }
        }
        if !closed {
            return None;
        }
        items.push(item);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }

    Some(clean_items(items))
}

fn clean_items(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
