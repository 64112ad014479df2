//! Line-oriented model of a grok configuration file.
//!
//! The file has no grammar beyond lines: a parameter is a keyword line and
//! its value is the line directly below it. The same keyword may repeat under
//! different sections, so every lookup is relative to an optional anchor line
//! and a start index. Indices shift on insertion, so nothing here hands out
//! absolute positions for later reuse.
use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the single-generation backup written by [`ConfigDocument::save`].
pub const BACKUP_SUFFIX: &str = ".backup";

/// A decoded or to-be-encoded parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Built-in decoders for parameter values.
///
/// Anything else goes through [`ConfigDocument::get_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decoder {
    #[default]
    Text,
    Integer,
    /// Plain or scientific notation (`8.640e+04`).
    Float,
}

impl Decoder {
    pub fn decode(self, raw: &str) -> Result<Value> {
        match self {
            Self::Text => Ok(Value::Text(raw.to_string())),
            Self::Integer => raw.trim().parse().map(Value::Integer).map_err(|_| Error::Decode {
                value: raw.to_string(),
                kind: "integer",
            }),
            Self::Float => raw.trim().parse().map(Value::Float).map_err(|_| Error::Decode {
                value: raw.to_string(),
                kind: "float",
            }),
        }
    }
}

/// How a value is rendered into its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Plain,
    /// Scientific notation with the given number of fractional digits and a
    /// signed, at least two-digit exponent (`{:.3e}` gives `8.640e+04`).
    Scientific(usize),
}

impl Encoding {
    pub fn encode(self, value: &Value) -> String {
        match (self, value) {
            (Self::Plain, value) => value.to_string(),
            (Self::Scientific(digits), Value::Float(value)) => format_scientific(*value, digits),
            (Self::Scientific(digits), Value::Integer(value)) => {
                format_scientific(*value as f64, digits)
            }
            (Self::Scientific(_), Value::Text(value)) => value.clone(),
        }
    }
}

/// Format `value` as `d.ddde±XX`.
pub fn format_scientific(value: f64, digits: usize) -> String {
    let rendered = format!("{value:.digits$e}");
    let Some((mantissa, exponent)) = rendered.split_once('e') else {
        // inf and NaN have no exponent
        return rendered;
    };
    let (sign, magnitude) = match exponent.strip_prefix('-') {
        Some(magnitude) => ('-', magnitude),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{magnitude:0>2}")
}

/// Where a keyword or token search starts.
///
/// With an anchor, the anchor line is located first (from `start`) and the
/// actual search resumes at the anchor's index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    after: Option<String>,
    start: usize,
}

impl Lookup {
    pub fn after(anchor: impl Into<String>) -> Self {
        Self {
            after: Some(anchor.into()),
            start: 0,
        }
    }

    pub fn starting_at(mut self, start: usize) -> Self {
        self.start = start;
        self
    }
}

/// In-memory grok configuration: trimmed, lower-cased lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    lines: Vec<String>,
    source_path: Option<PathBuf>,
    target_path: Option<PathBuf>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from in-memory lines, normalized as [`load`] would.
    ///
    /// [`load`]: ConfigDocument::load
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            lines: lines.into_iter().map(|line| normalize(line.as_ref())).collect(),
            ..Self::default()
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn target_path(&self) -> Option<&Path> {
        self.target_path.as_deref()
    }

    /// Replace the document with the contents of `path`.
    ///
    /// Every line is trimmed and lower-cased, values included.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)
            .map_err(|err| Error::io(format!("read {}", path.display()), err))?;
        self.lines = text.lines().map(normalize).collect();
        self.source_path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), lines = self.lines.len(), "loaded grok config");
        Ok(())
    }

    /// Write the document to `path`, moving an existing file to
    /// `<path>.backup` first (any older backup is overwritten).
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if path.is_file() {
            let backup = backup_path(path);
            if backup.exists() {
                fs::remove_file(&backup)
                    .map_err(|err| Error::io(format!("remove {}", backup.display()), err))?;
            }
            fs::rename(path, &backup)
                .map_err(|err| Error::io(format!("backup {}", path.display()), err))?;
        }
        fs::write(path, self.render())
            .map_err(|err| Error::io(format!("write {}", path.display()), err))?;
        self.target_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Serialized form: lines joined by newlines, one trailing newline.
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    /// Index of the first line equal to `token` at or after `from`.
    pub fn position(&self, token: &str, from: usize) -> Option<usize> {
        let token = normalize(token);
        self.lines
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, line)| **line == token)
            .map(|(index, _)| index)
    }

    /// Index of the value line belonging to `keyword`.
    ///
    /// A keyword on the final line has no value slot and does not match.
    pub fn locate(&self, keyword: &str, lookup: &Lookup) -> Result<usize> {
        let not_found = || Error::KeywordNotFound {
            keyword: normalize(keyword),
            after: lookup.after.clone(),
        };
        let from = self.search_start(lookup).ok_or_else(not_found)?;
        let keyword = normalize(keyword);
        self.lines
            .iter()
            .enumerate()
            .skip(from)
            .find(|(index, line)| **line == keyword && index + 1 < self.lines.len())
            .map(|(index, _)| index + 1)
            .ok_or_else(not_found)
    }

    /// Raw value line for `keyword`.
    pub fn get_raw(&self, keyword: &str, lookup: &Lookup) -> Result<&str> {
        let index = self.locate(keyword, lookup)?;
        Ok(&self.lines[index])
    }

    pub fn get(&self, keyword: &str, decoder: Decoder, lookup: &Lookup) -> Result<Value> {
        decoder.decode(self.get_raw(keyword, lookup)?)
    }

    /// Decode the value for `keyword` with a caller-supplied function.
    pub fn get_with<T, F>(&self, keyword: &str, lookup: &Lookup, decode: F) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T>,
    {
        decode(self.get_raw(keyword, lookup)?)
    }

    /// Overwrite the value line for `keyword`.
    pub fn set(
        &mut self,
        keyword: &str,
        value: impl Into<Value>,
        encoding: Encoding,
        lookup: &Lookup,
    ) -> Result<()> {
        let index = self.locate(keyword, lookup)?;
        self.lines[index] = encoding.encode(&value.into());
        Ok(())
    }

    /// Apply plain-encoded `set` for each pair in order, stopping at the
    /// first keyword that is missing.
    pub fn set_many<'a, I>(&mut self, params: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        for (keyword, value) in params {
            self.set(keyword, value, Encoding::Plain, &Lookup::default())?;
        }
        Ok(())
    }

    /// Overwrite the line that equals `old` itself (not the line below it).
    pub fn replace_token(
        &mut self,
        old: impl Into<Value>,
        new: impl Into<Value>,
        encoding: Encoding,
        lookup: &Lookup,
    ) -> Result<()> {
        let old = normalize(&encoding.encode(&old.into()));
        let not_found = || Error::TokenNotFound {
            token: old.clone(),
            after: lookup.after.clone(),
        };
        let from = self.search_start(lookup).ok_or_else(not_found)?;
        let index = self.position(&old, from).ok_or_else(not_found)?;
        self.lines[index] = encoding.encode(&new.into());
        Ok(())
    }

    fn search_start(&self, lookup: &Lookup) -> Option<usize> {
        match lookup.after.as_deref() {
            Some(anchor) => self.position(anchor, lookup.start),
            None => Some(lookup.start),
        }
    }
}

/// `<path>.backup` next to `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn normalize(line: &str) -> String {
    line.trim().to_lowercase()
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
