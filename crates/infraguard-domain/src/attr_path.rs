//! Compiled attribute paths (`a.b.0.c`, `rules[*].port`, `tags["Name"]`).
//!
//! A path is compiled once at policy-parse time. Resolution never fails: a missing
//! path yields an empty match set, which operators treat as "absent".

use crate::value::AttributeValue;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributePathError {
    #[error("attribute path is empty")]
    Empty,

    #[error("empty segment at byte {position} in '{path}'")]
    EmptySegment { path: String, position: usize },

    #[error("unbalanced bracket at byte {position} in '{path}'")]
    UnbalancedBracket { path: String, position: usize },

    #[error("unterminated quoted key in '{path}'")]
    UnterminatedQuote { path: String },

    #[error("invalid bracket selector '{selector}' in '{path}'")]
    InvalidSelector { path: String, selector: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    /// Every list element or map value at this level.
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    segments: Vec<Segment>,
}

/// One concrete location a path resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    pub path: String,
    pub value: &'a AttributeValue,
}

impl AttributePath {
    pub fn parse(raw: &str) -> Result<Self, AttributePathError> {
        if raw.trim().is_empty() {
            return Err(AttributePathError::Empty);
        }

        let bytes: Vec<char> = raw.chars().collect();
        let mut segments = Vec::new();
        let mut current = String::new();
        // True right after a `]`, where the next char must be `.`, `[` or end.
        let mut after_bracket = false;
        let mut i = 0;
        let mut byte_pos = 0;

        while i < bytes.len() {
            let c = bytes[i];
            match c {
                '.' => {
                    if current.is_empty() && !after_bracket {
                        return Err(AttributePathError::EmptySegment {
                            path: raw.to_string(),
                            position: byte_pos,
                        });
                    }
                    if !current.is_empty() {
                        segments.push(dotted_segment(std::mem::take(&mut current)));
                    }
                    after_bracket = false;
                    // A trailing dot leaves an empty final segment.
                    if i + 1 == bytes.len() {
                        return Err(AttributePathError::EmptySegment {
                            path: raw.to_string(),
                            position: byte_pos + 1,
                        });
                    }
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(dotted_segment(std::mem::take(&mut current)));
                    }
                    let (segment, consumed) = parse_bracket(raw, &bytes[i + 1..], byte_pos)?;
                    segments.push(segment);
                    for ch in &bytes[i..=i + consumed] {
                        byte_pos += ch.len_utf8();
                    }
                    i += consumed + 1;
                    after_bracket = true;
                    continue;
                }
                ']' => {
                    return Err(AttributePathError::UnbalancedBracket {
                        path: raw.to_string(),
                        position: byte_pos,
                    });
                }
                _ => {
                    if after_bracket {
                        return Err(AttributePathError::InvalidSelector {
                            path: raw.to_string(),
                            selector: bytes[i..].iter().collect(),
                        });
                    }
                    current.push(c);
                }
            }
            byte_pos += c.len_utf8();
            i += 1;
        }

        if !current.is_empty() {
            segments.push(dotted_segment(current));
        }
        if segments.is_empty() {
            return Err(AttributePathError::Empty);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Wildcard))
    }

    /// Resolve against a resource's top-level attribute map.
    ///
    /// When the nested walk finds nothing, attribute maps that store flattened keys
    /// (`"encryption.enabled": true`) are tried: the longest prefix of the path whose
    /// dotted form is a top-level key wins, and the remaining segments are walked from
    /// its value.
    pub fn resolve<'a>(&self, attributes: &'a BTreeMap<String, AttributeValue>) -> Vec<Match<'a>> {
        let mut out = self.resolve_nested(attributes);
        if out.is_empty() {
            self.resolve_flattened(attributes, &mut out);
        }
        out
    }

    fn resolve_nested<'a>(
        &self,
        attributes: &'a BTreeMap<String, AttributeValue>,
    ) -> Vec<Match<'a>> {
        let mut out = Vec::new();
        let Some((first, rest)) = self.segments.split_first() else {
            return out;
        };

        match first {
            Segment::Key(key) => {
                if let Some(value) = attributes.get(key) {
                    walk(value, rest, push_key(String::new(), key), &mut out);
                }
            }
            Segment::Index(idx) => {
                let key = idx.to_string();
                if let Some(value) = attributes.get(&key) {
                    walk(value, rest, key, &mut out);
                }
            }
            Segment::Wildcard => {
                for (key, value) in attributes {
                    walk(value, rest, push_key(String::new(), key), &mut out);
                }
            }
        }
        out
    }

    fn resolve_flattened<'a>(
        &self,
        attributes: &'a BTreeMap<String, AttributeValue>,
        out: &mut Vec<Match<'a>>,
    ) {
        let literal_len = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Wildcard))
            .unwrap_or(self.segments.len());

        for split in (2..=literal_len).rev() {
            let (prefix, rest) = self.segments.split_at(split);
            let flat = prefix
                .iter()
                .map(|segment| match segment {
                    Segment::Key(key) => key.clone(),
                    Segment::Index(idx) => idx.to_string(),
                    Segment::Wildcard => "*".to_string(),
                })
                .collect::<Vec<_>>()
                .join(".");
            if let Some(value) = attributes.get(&flat) {
                walk(value, rest, render(prefix), out);
                if !out.is_empty() {
                    return;
                }
            }
        }
    }
}

fn dotted_segment(text: String) -> Segment {
    if text == "*" {
        Segment::Wildcard
    } else if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        match text.parse::<usize>() {
            Ok(idx) => Segment::Index(idx),
            Err(_) => Segment::Key(text),
        }
    } else {
        Segment::Key(text)
    }
}

/// Parse the inside of `[...]`; returns the segment and the number of chars consumed
/// including the closing bracket.
fn parse_bracket(
    raw: &str,
    rest: &[char],
    open_pos: usize,
) -> Result<(Segment, usize), AttributePathError> {
    match rest.first() {
        Some(q @ ('"' | '\'')) => {
            let mut key = String::new();
            let mut j = 1;
            while j < rest.len() && rest[j] != *q {
                // `\\`, `\"` and `\'` are escapes; any other backslash is literal.
                if rest[j] == '\\' && matches!(rest.get(j + 1), Some(&('\\' | '"' | '\''))) {
                    j += 1;
                }
                key.push(rest[j]);
                j += 1;
            }
            if j >= rest.len() {
                return Err(AttributePathError::UnterminatedQuote {
                    path: raw.to_string(),
                });
            }
            if rest.get(j + 1) != Some(&']') {
                return Err(AttributePathError::UnbalancedBracket {
                    path: raw.to_string(),
                    position: open_pos,
                });
            }
            Ok((Segment::Key(key), j + 2))
        }
        _ => {
            let Some(close) = rest.iter().position(|c| *c == ']') else {
                return Err(AttributePathError::UnbalancedBracket {
                    path: raw.to_string(),
                    position: open_pos,
                });
            };
            let selector: String = rest[..close].iter().collect();
            let selector = selector.trim();
            if selector == "*" {
                Ok((Segment::Wildcard, close + 1))
            } else if let Ok(idx) = selector.parse::<usize>() {
                Ok((Segment::Index(idx), close + 1))
            } else {
                Err(AttributePathError::InvalidSelector {
                    path: raw.to_string(),
                    selector: selector.to_string(),
                })
            }
        }
    }
}

fn walk<'a>(value: &'a AttributeValue, rest: &[Segment], here: String, out: &mut Vec<Match<'a>>) {
    let Some((segment, tail)) = rest.split_first() else {
        out.push(Match { path: here, value });
        return;
    };

    match (segment, value) {
        (Segment::Key(key), AttributeValue::Map(map)) => {
            if let Some(child) = map.get(key) {
                walk(child, tail, push_key(here, key), out);
            }
        }
        (Segment::Index(idx), AttributeValue::List(items)) => {
            if let Some(child) = items.get(*idx) {
                walk(child, tail, push_index(here, *idx), out);
            }
        }
        (Segment::Index(idx), AttributeValue::Map(map)) => {
            let key = idx.to_string();
            if let Some(child) = map.get(&key) {
                walk(child, tail, push_key(here, &key), out);
            }
        }
        (Segment::Wildcard, AttributeValue::List(items)) => {
            for (idx, child) in items.iter().enumerate() {
                walk(child, tail, push_index(here.clone(), idx), out);
            }
        }
        (Segment::Wildcard, AttributeValue::Map(map)) => {
            for (key, child) in map {
                walk(child, tail, push_key(here.clone(), key), out);
            }
        }
        _ => {}
    }
}

fn needs_quoting(key: &str) -> bool {
    key.trim().is_empty()
        || key == "*"
        || key.bytes().all(|b| b.is_ascii_digit())
        || key.contains(['.', '[', ']'])
}

fn push_key(mut base: String, key: &str) -> String {
    if needs_quoting(key) {
        base.push_str("[\"");
        for c in key.chars() {
            if matches!(c, '\\' | '"') {
                base.push('\\');
            }
            base.push(c);
        }
        base.push_str("\"]");
    } else {
        if !base.is_empty() {
            base.push('.');
        }
        base.push_str(key);
    }
    base
}

fn push_index(mut base: String, idx: usize) -> String {
    if !base.is_empty() {
        base.push('.');
    }
    base.push_str(&idx.to_string());
    base
}

fn render(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(key) => out = push_key(out, key),
            Segment::Index(idx) => out = push_index(out, *idx),
            Segment::Wildcard => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push('*');
            }
        }
    }
    out
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.segments))
    }
}

impl std::str::FromStr for AttributePath {
    type Err = AttributePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributePath::parse(s)
    }
}
