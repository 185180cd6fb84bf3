//! Configuration document parsing for tree and object backends

use std::collections::BTreeMap;

use serde_json::Value;

/// Marker prefix for values that still need decryption
pub const CIPHER_PREFIX: &str = "{cipher}";

/// Supported document formats, in lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Properties,
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Extensions tried when looking for a document stem
    pub const EXTENSIONS: [&'static str; 4] = ["properties", "json", "yml", "yaml"];

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "properties" => Some(DocumentFormat::Properties),
            "json" => Some(DocumentFormat::Json),
            "yml" | "yaml" => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let (_, extension) = path.rsplit_once('.')?;
        Self::from_extension(extension)
    }
}

/// Parse a document into flat `a.b.c` keys
pub fn parse_document(format: DocumentFormat, content: &str) -> Result<BTreeMap<String, String>, String> {
    match format {
        DocumentFormat::Properties => Ok(parse_properties(content)),
        DocumentFormat::Json => {
            let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
            flatten_document(&value)
        }
        DocumentFormat::Yaml => {
            if content.trim().is_empty() {
                return Ok(BTreeMap::new());
            }
            let yaml: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
            let value = serde_json::to_value(&yaml).map_err(|e| e.to_string())?;
            flatten_document(&value)
        }
    }
}

/// Flatten a JSON document whose root must be an object (or null for an empty document)
pub fn flatten_document(value: &Value) -> Result<BTreeMap<String, String>, String> {
    let mut out = BTreeMap::new();
    match value {
        Value::Object(_) => flatten_value("", value, &mut out),
        Value::Null => {}
        other => return Err(format!("expected an object at the document root, found {}", kind_of(other))),
    }
    Ok(out)
}

/// Flatten nested objects with `.` and arrays with `[index]`
pub fn flatten_value(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_value(&path, child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_value(&format!("{}[{}]", prefix, index), child, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Null => {
            out.insert(prefix.to_string(), String::new());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

/// Parse a `.properties` document the way `java.util.Properties` reads one
///
/// Supported: `#`/`!` comment lines, `=`, `:` or whitespace between key and
/// value, line continuations (an odd number of trailing backslashes), and the
/// escapes `\t \n \r \f \uXXXX` plus `\x` for any other `x`. Leading whitespace
/// of a value is dropped and trailing whitespace kept.
fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut logical = String::new();
    let mut continuing = false;

    for raw in content.lines() {
        let line = raw.trim_start_matches(is_blank);
        if !continuing && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }
        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continuing = true;
            continue;
        }
        logical.push_str(line);
        continuing = false;
        insert_entry(&std::mem::take(&mut logical), &mut out);
    }
    if continuing {
        insert_entry(&logical, &mut out);
    }
    out
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0C')
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn insert_entry(entry: &str, out: &mut BTreeMap<String, String>) {
    let chars: Vec<char> = entry.chars().collect();

    let mut key_end = chars.len();
    let mut index = 0;
    while index < chars.len() {
        match chars[index] {
            '\\' => index += 2,
            c if c == '=' || c == ':' || is_blank(c) => {
                key_end = index;
                break;
            }
            _ => index += 1,
        }
    }

    let mut value_start = key_end;
    while value_start < chars.len() && is_blank(chars[value_start]) {
        value_start += 1;
    }
    if value_start < chars.len() && matches!(chars[value_start], '=' | ':') {
        value_start += 1;
        while value_start < chars.len() && is_blank(chars[value_start]) {
            value_start += 1;
        }
    }

    let key = unescape(&chars[..key_end]);
    if !key.is_empty() {
        out.insert(key, unescape(&chars[value_start.min(chars.len())..]));
    }
}

fn unescape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut index = 0;
    while index < chars.len() {
        let c = chars[index];
        index += 1;
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&escaped) = chars.get(index) else {
            break;
        };
        index += 1;
        match escaped {
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            'f' => out.push('\x0C'),
            'u' => match code_unit(chars, index) {
                Some(unit) => {
                    index += 4;
                    let low = (0xD800..0xDC00)
                        .contains(&unit)
                        .then(|| {
                            (chars.get(index) == Some(&'\\') && chars.get(index + 1) == Some(&'u'))
                                .then(|| code_unit(chars, index + 2))
                                .flatten()
                        })
                        .flatten()
                        .filter(|low| (0xDC00..0xE000).contains(low));
                    let units: Vec<u16> = match low {
                        Some(low) => {
                            index += 6;
                            vec![unit, low]
                        }
                        None => vec![unit],
                    };
                    out.extend(char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)));
                }
                None => out.push('u'),
            },
            other => out.push(other),
        }
    }
    out
}

/// Four hex digits at `start` as a UTF-16 code unit
fn code_unit(chars: &[char], start: usize) -> Option<u16> {
    let digits: String = chars.get(start..start + 4)?.iter().collect();
    u16::from_str_radix(&digits, 16).ok()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
