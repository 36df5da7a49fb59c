/*!
 * Frontmatter-preserving document rewriter.
 *
 * Applies key/value updates to a markdown document's `---` delimited YAML
 * block. Untouched entries keep their exact text, so their order, quoting
 * and comments survive. Updated keys are rewritten in place and new keys
 * are appended after the existing ones, in the order of the update list.
 * The body after the closing delimiter is copied byte for byte.
 *
 * Malformed quoting that translation output frequently contains (a value
 * opened with `"` and closed with `'`, or single-quoted values) is repaired
 * before the block is parsed.
 */

use log::debug;
use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::sync::OnceLock;

use crate::errors::RewriteError;

/// Line that opens and closes a metadata block
pub const DELIMITER: &str = "---";

/// Characters that force a double-quoted scalar when emitting a string
const FORCE_QUOTE_CHARS: &[char] = &['"', '\'', '\t', ':', '\n', '\r'];

/// Ordered list of metadata updates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontmatterUpdates {
    entries: Vec<(String, Value)>,
}

impl FrontmatterUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key. Setting the same key twice keeps its first position.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    fn insert(&mut self, key: String, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Build updates from a flat `key, value, key, value, ...` list
    pub fn from_key_values(key_values: &[Value]) -> Result<Self, RewriteError> {
        if key_values.len() % 2 != 0 {
            return Err(RewriteError::OddKeyValues(key_values.len()));
        }

        let mut updates = Self::new();
        for (index, pair) in key_values.chunks(2).enumerate() {
            let key = match &pair[0] {
                Value::String(key) => key.clone(),
                _ => return Err(RewriteError::NonStringKey(index * 2)),
            };
            updates.insert(key, pair[1].clone());
        }
        Ok(updates)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A document split at its metadata delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitDocument<'a> {
    /// Text between the opening and closing delimiter lines
    pub metadata: &'a str,
    /// Everything after the closing `---`, including the rest of its line
    pub body: &'a str,
}

/// Stateless rewriter over `(path, content, updates)`
pub struct FrontmatterRewriter;

impl FrontmatterRewriter {
    /// Split a document into metadata and body.
    ///
    /// Returns `Ok(None)` when the document does not open with a delimiter
    /// line, and an error when the opened block is never closed.
    pub fn split(content: &str) -> Result<Option<SplitDocument<'_>>, RewriteError> {
        let mut lines = content.split_inclusive('\n');
        let first = match lines.next() {
            Some(first) if is_delimiter(first) => first,
            _ => return Ok(None),
        };

        let metadata_start = first.len();
        let mut offset = metadata_start;
        for line in lines {
            if is_delimiter(line) {
                return Ok(Some(SplitDocument {
                    metadata: &content[metadata_start..offset],
                    body: &content[offset + DELIMITER.len()..],
                }));
            }
            offset += line.len();
        }

        Err(RewriteError::Unterminated)
    }

    /// Parse the metadata block of a document, repairing quotes first.
    /// `Ok(None)` means the document has no metadata block.
    pub fn read_metadata(content: &str) -> Result<Option<Mapping>, RewriteError> {
        match Self::split(content)? {
            Some(split) => parse_mapping(&repair_quotes(split.metadata)).map(Some),
            None => Ok(None),
        }
    }

    /// Apply updates to a document and return the new content
    pub fn rewrite(content: &str, updates: &FrontmatterUpdates) -> Result<String, RewriteError> {
        let newline = detect_newline(content);

        let Some(split) = Self::split(content)? else {
            let mut block = String::new();
            for (key, value) in updates.iter() {
                block.push_str(&render_entry(key, value, newline)?);
            }
            return Ok(format!("{DELIMITER}{newline}{block}{DELIMITER}{newline}{content}"));
        };

        let repaired = repair_quotes(split.metadata);
        let mapping = parse_mapping(&repaired)?;
        let metadata = update_preserving_layout(&repaired, &mapping, updates, newline)?;

        Ok(format!("{DELIMITER}{newline}{metadata}{DELIMITER}{}", split.body))
    }

    /// Rewrite and write a document. All validation and rendering happen
    /// before the filesystem is touched.
    pub fn write(path: &Path, content: &str, updates: &FrontmatterUpdates) -> Result<(), RewriteError> {
        let rendered = Self::rewrite(content, updates)?;
        let io_error = |source| RewriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, rendered).map_err(io_error)
    }

    /// Same as [`FrontmatterRewriter::write`] with a flat key/value list
    pub fn write_key_values(path: &Path, content: &str, key_values: &[Value]) -> Result<(), RewriteError> {
        let updates = FrontmatterUpdates::from_key_values(key_values)?;
        Self::write(path, content, &updates)
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

fn detect_newline(content: &str) -> &'static str {
    if content.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Repair malformed scalar quoting, line by line
pub fn repair_quotes(metadata: &str) -> String {
    let fixed = fix_mismatched_quotes(metadata);
    convert_single_to_double_quoted(&fixed)
}

/// A value that opens with a quote but does not close with the same quote
/// is re-emitted as a double-quoted scalar. A trailing quote of the other
/// kind is dropped.
fn fix_mismatched_quotes(metadata: &str) -> String {
    metadata
        .split('\n')
        .map(|line| repair_line(line).unwrap_or_else(|| line.to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn repair_line(line: &str) -> Option<String> {
    let (content, cr) = match line.strip_suffix('\r') {
        Some(stripped) => (stripped, "\r"),
        None => (line, ""),
    };
    if content.trim_start().starts_with('#') {
        return None;
    }

    let (key, rest) = content.split_once(':')?;
    let value = rest.trim();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if value.len() > 1 && value.ends_with(quote) {
        return None;
    }
    if value.len() == 1 {
        return None;
    }
    // Properly quoted scalars followed by a comment are left alone
    if serde_yaml::from_str::<Value>(value).is_ok() {
        return None;
    }

    let mut value = value;
    if value.ends_with(['"', '\'']) {
        value = &value[..value.len() - 1];
    }
    let inner = &value[1..];
    Some(format!("{}: {}{}", key, double_quoted(inner), cr))
}

fn single_quoted_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([^#\n]*?:[ \t]*)'((?:[^'\n]|'')*)'[ \t]*(\r?)$")
            .expect("single-quote pattern is valid")
    })
}

/// Single-quoted values (`''` is a literal quote) become double-quoted
fn convert_single_to_double_quoted(metadata: &str) -> String {
    single_quoted_value()
        .replace_all(metadata, |caps: &Captures| {
            let unescaped = caps[2].replace("''", "'");
            format!("{}{}{}", &caps[1], double_quoted(&unescaped), &caps[3])
        })
        .into_owned()
}

/// Escaped double-quoted scalar. JSON strings are valid YAML
/// double-quoted scalars.
fn double_quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text.replace('"', "\\\"")))
}

fn parse_mapping(metadata: &str) -> Result<Mapping, RewriteError> {
    if metadata.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(metadata)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(RewriteError::NotAMapping(kind_name(&other).to_string())),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Top-level `key: value` entry located in the metadata text
#[derive(Debug)]
struct EntrySpan {
    key: String,
    /// Offset of the first character of the key line
    start: usize,
    /// Offset just past the `:` following the key
    key_end: usize,
    /// Offset past the last line that belongs to the value
    end: usize,
}

fn scan_entries(metadata: &str) -> Vec<EntrySpan> {
    let mut entries: Vec<EntrySpan> = Vec::new();
    let mut offset = 0;

    for line in metadata.split_inclusive('\n') {
        let line_end = offset + line.len();
        let first = line.chars().next();
        let is_top_level = matches!(first, Some(c) if !c.is_whitespace() && c != '#');

        if is_top_level {
            match scan_key(line) {
                Some((key, colon_end)) => entries.push(EntrySpan {
                    key,
                    start: offset,
                    key_end: offset + colon_end,
                    end: line_end,
                }),
                // Not a plain entry line: the caller falls back
                None => entries.push(EntrySpan {
                    key: String::new(),
                    start: offset,
                    key_end: offset,
                    end: line_end,
                }),
            }
        } else if !line.trim().is_empty() && !line.starts_with('#') {
            if let Some(current) = entries.last_mut() {
                current.end = line_end;
            }
        }
        offset = line_end;
    }

    entries
}

/// Extract the key of a top-level entry line and the offset past its colon
fn scan_key(line: &str) -> Option<(String, usize)> {
    let bytes = line.as_bytes();
    let (key, after_key) = match bytes.first()? {
        b'"' => {
            let mut i = 1;
            loop {
                match bytes.get(i)? {
                    b'\\' => i += 2,
                    b'"' => break,
                    _ => i += 1,
                }
            }
            (serde_yaml::from_str::<String>(&line[..=i]).ok()?, i + 1)
        }
        b'\'' => {
            let mut i = 1;
            loop {
                match (bytes.get(i)?, bytes.get(i + 1)) {
                    (b'\'', Some(b'\'')) => i += 2,
                    (b'\'', _) => break,
                    _ => i += 1,
                }
            }
            (serde_yaml::from_str::<String>(&line[..=i]).ok()?, i + 1)
        }
        _ => {
            let colon = plain_key_colon(line)?;
            let key = line[..colon].trim_end();
            if key.is_empty() {
                return None;
            }
            return Some((key.to_string(), colon + 1));
        }
    };

    let rest = &line[after_key..];
    let spaces = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    if rest[spaces..].starts_with(':') {
        Some((key, after_key + spaces + 1))
    } else {
        None
    }
}

fn plain_key_colon(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    bytes.iter().enumerate().find_map(|(i, b)| {
        let followed_by_space = matches!(bytes.get(i + 1), None | Some(b' ' | b'\t' | b'\r' | b'\n'));
        (*b == b':' && followed_by_space).then_some(i)
    })
}

fn mapping_key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn update_preserving_layout(
    metadata: &str,
    mapping: &Mapping,
    updates: &FrontmatterUpdates,
    newline: &str,
) -> Result<String, RewriteError> {
    let entries = scan_entries(metadata);
    let layout_matches = entries.len() == mapping.len()
        && entries
            .iter()
            .zip(mapping.keys())
            .all(|(entry, key)| mapping_key_text(key).as_deref() == Some(entry.key.as_str()));

    if !layout_matches {
        debug!("Frontmatter layout not line-addressable, re-serializing the mapping");
        return reserialize(mapping, updates);
    }

    let mut out = String::with_capacity(metadata.len() + 32);
    let mut cursor = 0;
    let mut replaced: Vec<&str> = Vec::new();

    for entry in &entries {
        if let Some(value) = updates.get(&entry.key) {
            out.push_str(&metadata[cursor..entry.key_end]);
            out.push_str(&render_value(value, newline)?);
            cursor = entry.end;
            replaced.push(entry.key.as_str());
        }
    }
    out.push_str(&metadata[cursor..]);

    let mut appended = false;
    for (key, value) in updates.iter().filter(|(k, _)| !replaced.contains(k)) {
        if !appended && !out.is_empty() && !out.ends_with('\n') {
            out.push_str(newline);
        }
        appended = true;
        out.push_str(&render_entry(key, value, newline)?);
    }

    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(newline);
    }
    Ok(out)
}

fn reserialize(mapping: &Mapping, updates: &FrontmatterUpdates) -> Result<String, RewriteError> {
    let mut mapping = mapping.clone();
    for (key, value) in updates.iter() {
        mapping.insert(Value::String(key.to_string()), value.clone());
    }
    Ok(serde_yaml::to_string(&mapping)?)
}

fn render_entry(key: &str, value: &Value, newline: &str) -> Result<String, RewriteError> {
    let key = serde_yaml::to_string(&Value::String(key.to_string()))?;
    Ok(format!("{}:{}", key.trim_end(), render_value(value, newline)?))
}

/// Render the part of an entry after `key:`, including the line ending
fn render_value(value: &Value, newline: &str) -> Result<String, RewriteError> {
    match value {
        Value::String(s) if s.contains(FORCE_QUOTE_CHARS) => Ok(format!(" {}{}", double_quoted(s), newline)),
        Value::Mapping(m) if !m.is_empty() => render_block(value, newline),
        Value::Sequence(s) if !s.is_empty() => render_block(value, newline),
        _ => {
            let scalar = serde_yaml::to_string(value)?;
            Ok(format!(" {}{}", scalar.trim_end(), newline))
        }
    }
}

fn render_block(value: &Value, newline: &str) -> Result<String, RewriteError> {
    let yaml = serde_yaml::to_string(value)?;
    let mut out = String::from(newline);
    for line in yaml.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push_str(newline);
    }
    Ok(out)
}
