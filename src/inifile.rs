//! Ini-style option files: sections, quoting, inline comments, and the same
//! normalization dialect the command line uses.
//!
//! A file moves through three states: unread, read (raw text loaded), and
//! parsed (sections populated). The ignore/limit filters must be configured
//! before parsing; the selected-section list may be changed any number of
//! times after parsing without re-parsing.
//!
//! Line grammar:
//!
//! - blank lines and lines starting with `;` or `#` are comments;
//! - `[section]` switches the active section, creating it on first mention;
//! - everything else is `key` or `key=value`, where values may be quoted with
//!   single, double, or backtick quotes, backslash escapes a character, and an
//!   unquoted `#` starts an inline comment;
//! - a quote or backslash before the first `=` is an error, as are an
//!   unterminated quote and a trailing backslash.
//!
//! One deliberate asymmetry, kept for compatibility: a bare `key` line for a
//! non-required string option stores a plain empty string, while an explicit
//! `key=` stores the explicit-empty sentinel. `Config::get` reads both back
//! as `""`; only sentinel-aware raw access can tell them apart, and a bare
//! key is indistinguishable from "never set" there.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::{Config, Source};
use crate::error::OptfigError;
use crate::normalize::{EXPLICIT_EMPTY, normalize};

/// A named group of key/value pairs within a file. The empty name is the
/// unnamed preamble before the first `[section]` header.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    values: HashMap<String, String>,
}

impl Section {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }
}

/// An ini-style option file.
#[derive(Debug)]
pub struct File {
    path: PathBuf,
    contents: String,
    read: bool,
    parsed: bool,
    ignore_options: HashSet<String>,
    limit_options: HashSet<String>,
    ignore_unknown: bool,
    sections: Vec<Section>,
    section_index: HashMap<String, usize>,
    // Lookup priority, re-selectable after parsing. RefCell so that a file
    // already shared with a Config can still be re-pointed at another
    // section; see the crate docs on single-threaded use.
    selected: RefCell<Vec<String>>,
    deprecations: Vec<String>,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: String::new(),
            read: false,
            parsed: false,
            ignore_options: HashSet::new(),
            limit_options: HashSet::new(),
            ignore_unknown: false,
            sections: Vec::new(),
            section_index: HashMap::new(),
            selected: RefCell::new(Vec::new()),
            deprecations: Vec::new(),
        }
    }

    /// Build a file directly from in-memory text, skipping the read step.
    pub fn from_string(path: impl Into<PathBuf>, contents: &str) -> Self {
        let mut file = Self::new(path);
        file.contents = contents.to_string();
        file.read = true;
        file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file's raw text from disk.
    pub fn read(&mut self) -> Result<(), OptfigError> {
        self.contents = std::fs::read_to_string(&self.path).map_err(|e| OptfigError::IoError {
            path: self.path.clone(),
            source: e,
        })?;
        self.read = true;
        Ok(())
    }

    /// Drop lines whose normalized key is in `names`.
    ///
    /// # Panics
    ///
    /// Panics if called after parsing, or if a limit set is already in place
    /// (the two filters are mutually exclusive).
    pub fn ignore_options<'a, I: IntoIterator<Item = &'a str>>(&mut self, names: I) {
        assert!(!self.parsed, "File filters cannot change after parsing");
        assert!(
            self.limit_options.is_empty(),
            "ignore_options and limit_options are mutually exclusive"
        );
        self.ignore_options
            .extend(names.into_iter().map(|n| n.to_string()));
    }

    /// Keep only lines whose normalized key is in `names`.
    ///
    /// # Panics
    ///
    /// Panics if called after parsing, or if an ignore set is already in
    /// place.
    pub fn limit_options<'a, I: IntoIterator<Item = &'a str>>(&mut self, names: I) {
        assert!(!self.parsed, "File filters cannot change after parsing");
        assert!(
            self.ignore_options.is_empty(),
            "ignore_options and limit_options are mutually exclusive"
        );
        self.limit_options
            .extend(names.into_iter().map(|n| n.to_string()));
    }

    /// Skip unrecognized options in this file instead of erroring, as if
    /// every line were `loose-`-prefixed.
    pub fn ignore_unknown_options(&mut self, ignore: bool) {
        assert!(!self.parsed, "File filters cannot change after parsing");
        self.ignore_unknown = ignore;
    }

    /// Parse the raw text into sections. `cfg` supplies the option
    /// definitions used to validate keys and coerce key-only lines; values
    /// are stored here, not on the config.
    ///
    /// # Panics
    ///
    /// Panics if the file has not been read, or if it was already parsed.
    pub fn parse(&mut self, cfg: &Config) -> Result<(), OptfigError> {
        assert!(self.read, "File::parse called before read: {}", self.path.display());
        assert!(!self.parsed, "File::parse called twice: {}", self.path.display());

        // Preamble section is always present, even in an empty file.
        self.sections.push(Section {
            name: String::new(),
            values: HashMap::new(),
        });
        self.section_index.insert(String::new(), 0);
        let mut current = 0usize;

        let text = std::mem::take(&mut self.contents);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

        for (i, raw_line) in text.lines().enumerate() {
            let line_num = i + 1;
            let line = raw_line.trim_start();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                current = self.enter_section(line, line_num)?;
            } else {
                self.key_value_line(line, line_num, current, cfg)?;
            }
        }

        self.parsed = true;
        *self.selected.borrow_mut() = vec![String::new()];
        tracing::debug!(
            path = %self.path.display(),
            sections = self.sections.len(),
            "parsed option file"
        );
        Ok(())
    }

    fn enter_section(&mut self, line: &str, line_num: usize) -> Result<usize, OptfigError> {
        let Some(end) = line.find(']') else {
            return Err(OptfigError::FileFormat {
                problem: "unterminated section name".into(),
                path: self.path.clone(),
                line: line_num,
            });
        };
        let trailer = line[end + 1..].trim();
        if !trailer.is_empty() && !trailer.starts_with('#') {
            return Err(OptfigError::FileFormat {
                problem: "extra characters after section name".into(),
                path: self.path.clone(),
                line: line_num,
            });
        }
        let name = line[1..end].trim().to_ascii_lowercase();
        Ok(self.section_id(&name))
    }

    fn section_id(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.section_index.get(name) {
            return idx;
        }
        self.sections.push(Section {
            name: name.to_string(),
            values: HashMap::new(),
        });
        let idx = self.sections.len() - 1;
        self.section_index.insert(name.to_string(), idx);
        idx
    }

    fn key_value_line(
        &mut self,
        line: &str,
        line_num: usize,
        section: usize,
        cfg: &Config,
    ) -> Result<(), OptfigError> {
        let content = self.strip_inline_comment(line, line_num)?;
        let n = normalize(content.trim_end());
        if n.key.is_empty() {
            return Ok(());
        }
        if self.ignore_options.contains(&n.key) {
            return Ok(());
        }
        if !self.limit_options.is_empty() && !self.limit_options.contains(&n.key) {
            return Ok(());
        }

        let origin = format!("{} line {line_num}", self.path.display());
        let Some(opt) = cfg.find_option(&n.key) else {
            if n.loose || self.ignore_unknown || cfg.ignore_unknown_options() {
                tracing::debug!(option = %n.key, %origin, "skipping unknown option");
                return Ok(());
            }
            return Err(OptfigError::OptionNotDefined {
                name: n.key,
                origin,
            });
        };

        let value = match n.value {
            None if opt.is_bool() => "1".to_string(),
            None if opt.require_value => {
                return Err(OptfigError::OptionMissingValue {
                    name: opt.name,
                    origin,
                });
            }
            // Bare key for an optional string: plain empty, not the sentinel.
            None => String::new(),
            Some(v) if n.negated => v,
            Some(v) => {
                let unquoted = unquote(v.trim());
                if unquoted.is_empty() && !opt.is_bool() {
                    EXPLICIT_EMPTY.to_string()
                } else {
                    unquoted
                }
            }
        };

        if let Some(detail) = &opt.deprecated {
            self.deprecations
                .push(format!("option {} is deprecated: {detail}", opt.name));
        }
        self.sections[section].values.insert(n.key, value);
        Ok(())
    }

    /// Scan a key/value line tracking quote and escape state, validating the
    /// syntax and returning the slice before any inline `#` comment.
    fn strip_inline_comment<'a>(
        &self,
        line: &'a str,
        line_num: usize,
    ) -> Result<&'a str, OptfigError> {
        let err = |problem: &str| OptfigError::FileFormat {
            problem: problem.into(),
            path: self.path.clone(),
            line: line_num,
        };

        let mut in_quote: Option<char> = None;
        let mut escaped = false;
        let mut seen_equals = false;
        let mut comment_at = None;

        for (i, ch) in line.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => {
                    if !seen_equals {
                        return Err(err("illegal character in option name"));
                    }
                    escaped = true;
                }
                '\'' | '"' | '`' => {
                    if !seen_equals {
                        return Err(err("illegal character in option name"));
                    }
                    match in_quote {
                        None => in_quote = Some(ch),
                        Some(q) if q == ch => in_quote = None,
                        Some(_) => {}
                    }
                }
                '=' if in_quote.is_none() => seen_equals = true,
                '#' if in_quote.is_none() => {
                    comment_at = Some(i);
                    break;
                }
                _ => {}
            }
        }

        if in_quote.is_some() {
            return Err(err("unterminated quote"));
        }
        if escaped {
            return Err(err("line ends in backslash"));
        }
        Ok(&line[..comment_at.unwrap_or(line.len())])
    }

    /// Replace the section lookup order. The first named section wins when
    /// several selected sections set the same option. Callers that already
    /// attached this file to a `Config` should follow up with
    /// `Config::mark_dirty`.
    ///
    /// # Panics
    ///
    /// Panics if the file has not been parsed.
    pub fn use_section<'a, I: IntoIterator<Item = &'a str>>(&self, names: I) {
        assert!(
            self.parsed,
            "File::use_section called before parse: {}",
            self.path.display()
        );
        *self.selected.borrow_mut() = names
            .into_iter()
            .map(|n| n.trim().to_ascii_lowercase())
            .collect();
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.section_index.get(name).map(|&idx| &self.sections[idx])
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Serialize the parsed sections back to ini text. Comments and original
    /// formatting are not preserved; values are re-quoted where the syntax
    /// requires it, so re-parsing the output reproduces the same sections.
    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            if !section.name.is_empty() {
                out.push_str(&format!("[{}]\n", section.name));
            }
            let mut keys: Vec<&String> = section.values.keys().collect();
            keys.sort();
            for key in keys {
                out.push_str(&format_line(key, &section.values[key]));
                out.push('\n');
            }
        }
        out
    }

    /// Write [`to_ini_string`](Self::to_ini_string) output to the file's path.
    pub fn write(&self) -> Result<(), OptfigError> {
        std::fs::write(&self.path, self.to_ini_string()).map_err(|e| OptfigError::IoError {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl Source for File {
    /// First match across the selected sections, in selection order.
    ///
    /// # Panics
    ///
    /// Panics if the file has not been parsed.
    fn option_value(&self, name: &str) -> Option<String> {
        assert!(
            self.parsed,
            "File::option_value called before parse: {}",
            self.path.display()
        );
        for section_name in self.selected.borrow().iter() {
            if let Some(&idx) = self.section_index.get(section_name)
                && let Some(value) = self.sections[idx].values.get(name)
            {
                return Some(value.clone());
            }
        }
        None
    }

    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    fn deprecation_warnings(&self) -> Vec<String> {
        self.deprecations.clone()
    }
}

/// Strip one layer of matching outer quotes and resolve backslash escapes.
fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    let inner = if bytes.len() >= 2
        && matches!(bytes[0], b'\'' | b'"' | b'`')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    };

    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for ch in inner.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Render one key/value pair as a line that parses back to the same pair.
fn format_line(key: &str, value: &str) -> String {
    if value.is_empty() {
        return key.to_string();
    }
    if value == EXPLICIT_EMPTY {
        return format!("{key}=''");
    }
    let needs_quoting = value.contains(['#', '\'', '"', '`', '\\'])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if needs_quoting {
        let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
        format!("{key}='{escaped}'")
    } else {
        format!("{key}={value}")
    }
}
