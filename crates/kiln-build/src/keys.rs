//! `.keys` resource files
//!
//! An indentation-structured key/value format:
//!
//! ```text
//! # comment
//! title       Hello
//! window
//!     width   800
//!     height  600
//! ```
//!
//! Each line is a key followed by an optional value (the rest of the line).
//! A key without a value may own a more deeply indented block. Builds
//! re-emit the parsed document canonically: tab indentation, single space
//! after the key, comments and blank lines dropped.

use std::fmt;

/// Value of one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeysValue {
    Text(String),
    Section(Vec<(String, KeysValue)>),
}

/// Parsed `.keys` document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeysDocument {
    pub entries: Vec<(String, KeysValue)>,
}

/// Parse failure with a 1-based line number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for KeysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for KeysError {}

struct Line<'a> {
    number: usize,
    indent: usize,
    key: &'a str,
    value: Option<&'a str>,
}

const TAB_WIDTH: usize = 4;

impl KeysDocument {
    pub fn parse(text: &str) -> Result<Self, KeysError> {
        let mut lines = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let body = raw.trim_start();
            if body.is_empty() || body.starts_with('#') {
                continue;
            }
            let indent = raw[..raw.len() - body.len()]
                .chars()
                .fold(0, |col, c| if c == '\t' { (col / TAB_WIDTH + 1) * TAB_WIDTH } else { col + 1 });

            let body = body.trim_end();
            let (key, value) = match body.find(char::is_whitespace) {
                Some(split) => (&body[..split], Some(body[split..].trim_start())),
                None => (body, None),
            };
            lines.push(Line {
                number: i + 1,
                indent,
                key,
                value,
            });
        }

        let mut pos = 0;
        let entries = parse_block(&lines, &mut pos, 0)?;
        Ok(Self { entries })
    }

    /// Look up a top-level text value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|(k, v)| match v {
            KeysValue::Text(text) if k == key => Some(text.as_str()),
            _ => None,
        })
    }

    /// Canonical text form
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        write_block(&self.entries, 0, &mut out);
        out
    }
}

fn parse_block(lines: &[Line<'_>], pos: &mut usize, indent: usize) -> Result<Vec<(String, KeysValue)>, KeysError> {
    let mut entries = Vec::new();

    while let Some(line) = lines.get(*pos) {
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(KeysError {
                line: line.number,
                message: "unexpected indentation".to_string(),
            });
        }
        *pos += 1;

        match lines.get(*pos) {
            Some(next) if next.indent > indent => {
                if line.value.is_some() {
                    return Err(KeysError {
                        line: next.number,
                        message: format!("key '{}' has both a value and a nested block", line.key),
                    });
                }
                let children = parse_block(lines, pos, next.indent)?;
                entries.push((line.key.to_string(), KeysValue::Section(children)));
            }
            _ => {
                let text = line.value.unwrap_or_default().to_string();
                entries.push((line.key.to_string(), KeysValue::Text(text)));
            }
        }
    }

    Ok(entries)
}

fn write_block(entries: &[(String, KeysValue)], depth: usize, out: &mut String) {
    for (key, value) in entries {
        out.extend(std::iter::repeat('\t').take(depth));
        out.push_str(key);
        match value {
            KeysValue::Text(text) if !text.is_empty() => {
                out.push(' ');
                out.push_str(text);
                out.push('\n');
            }
            KeysValue::Text(_) => out.push('\n'),
            KeysValue::Section(children) => {
                out.push('\n');
                write_block(children, depth + 1, out);
            }
        }
    }
}
