//! The option model: one named setting with a type, a default, and flags
//! controlling how the tokenizer and file parser treat it.

/// Value type of an option. Byte-size and integer reads are string options
/// interpreted by the typed getters on `Config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptKind {
    String,
    Bool,
}

/// One named setting. Built via [`Opt::string`] / [`Opt::bool`] plus the
/// builder-style modifiers, then registered on a command; immutable after
/// registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Opt {
    /// Canonical name: lowercase, dash-separated.
    pub name: String,
    /// Single-character shorthand, e.g. `'v'` for `-v`.
    pub shorthand: Option<char>,
    pub kind: OptKind,
    /// String-encoded default. Bool defaults are always `"0"` or `"1"`.
    pub default: String,
    /// Whether the option must be given a value when supplied at all.
    pub require_value: bool,
    /// Hidden from help output (help rendering lives outside this crate).
    pub hidden: bool,
    /// Grouping label, for help display only.
    pub group: String,
    /// Deprecation notice, surfaced through deprecation warnings when the
    /// option is actually used.
    pub deprecated: Option<String>,
}

impl Opt {
    /// A string option. Requires a value by default; use
    /// [`value_optional`](Self::value_optional) to relax that.
    pub fn string(name: &str, shorthand: Option<char>, default: &str) -> Self {
        Self {
            name: canonical_name(name),
            shorthand,
            kind: OptKind::String,
            default: default.to_string(),
            require_value: true,
            hidden: false,
            group: String::new(),
            deprecated: None,
        }
    }

    /// A boolean option. Never requires a value: bare mention means true,
    /// and the negation prefixes mean false.
    pub fn bool(name: &str, shorthand: Option<char>, default: bool) -> Self {
        Self {
            name: canonical_name(name),
            shorthand,
            kind: OptKind::Bool,
            default: if default { "1" } else { "0" }.to_string(),
            require_value: false,
            hidden: false,
            group: String::new(),
            deprecated: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn value_required(mut self) -> Self {
        self.require_value = true;
        self
    }

    pub fn value_optional(mut self) -> Self {
        self.require_value = false;
        self
    }

    /// Put the option in a named group for help display.
    pub fn in_group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    /// Mark the option deprecated. `detail` should tell the user what to do
    /// instead; it is included verbatim in deprecation warnings.
    pub fn deprecated(mut self, detail: &str) -> Self {
        self.deprecated = Some(detail.to_string());
        self
    }

    pub fn is_bool(&self) -> bool {
        self.kind == OptKind::Bool
    }
}

fn canonical_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}
