//! Line-oriented `key = value` file parser
//!
//! Format:
//! - `key=value` or `key:value`, whitespace around key and value ignored
//! - comment lines start with `#` or `!`
//! - keys may repeat; every occurrence is kept in file order
//! - lines without a separator are skipped

use std::fs;
use std::io;
use std::path::Path;

/// One `key = value` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// 1-based line number in the source
    pub line: usize,
    /// Key, trimmed
    pub key: String,
    /// Value, trimmed
    pub value: String,
}

/// Parsed properties, in order of appearance
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: Vec<Entry>,
}

impl Properties {
    /// Parse properties from a string
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    return None;
                }
                let sep = trimmed.find(|c: char| c == '=' || c == ':')?;
                Some(Entry {
                    line: i + 1,
                    key: trimmed[..sep].trim().to_string(),
                    value: trimmed[sep + 1..].trim().to_string(),
                })
            })
            .collect();

        Self { entries }
    }

    /// Load properties from a file
    ///
    /// Non-UTF-8 bytes are read as Latin-1.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let content = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        };
        Ok(Self::parse(&content))
    }

    /// All entries in file order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Last value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Every entry for a key, in file order
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.iter().filter(move |e| e.key == key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were parsed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
