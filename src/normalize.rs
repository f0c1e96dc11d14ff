//! Option-token normalization, shared by the command-line tokenizer and the
//! ini-file parser.
//!
//! A raw token is either `name` or `name=value`. Normalization canonicalizes
//! the name (lowercase, underscores to dashes) and peels off the dialect's
//! prefixes:
//!
//! - `loose-` — authorizes the caller to silently ignore the option if it
//!   turns out not to be defined.
//! - `skip-` / `disable-` — negate a boolean: `skip-foo` means `foo=0`, and a
//!   supplied value is inverted (`skip-foo=off` means "don't skip", i.e.
//!   `foo=1`).
//! - `enable-` — accepted for symmetry, no effect.

/// The result of normalizing one raw option token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Canonical option name. Empty when the token had no name portion; the
    /// caller treats that as a no-op.
    pub key: String,
    /// The value, if one was supplied or synthesized by negation.
    pub value: Option<String>,
    /// The token carried a `loose-` prefix.
    pub loose: bool,
    /// The token carried a `skip-` or `disable-` prefix.
    pub negated: bool,
}

/// Normalize a raw `name` or `name=value` token.
pub fn normalize(token: &str) -> Normalized {
    let (raw_key, raw_value) = match token.split_once('=') {
        Some((k, v)) => (k, Some(v)),
        None => (token, None),
    };

    let mut key = raw_key.trim().to_ascii_lowercase().replace('_', "-");
    if key.is_empty() {
        return Normalized {
            key,
            value: None,
            loose: false,
            negated: false,
        };
    }

    let mut loose = false;
    let mut negated = false;
    if key.starts_with("loose-") {
        key.drain(.."loose-".len());
        loose = true;
    }
    if key.starts_with("skip-") {
        key.drain(.."skip-".len());
        negated = true;
    } else if key.starts_with("disable-") {
        key.drain(.."disable-".len());
        negated = true;
    } else if key.starts_with("enable-") {
        key.drain(.."enable-".len());
    }

    let value = match raw_value {
        Some(v) if negated => {
            // skip-foo=off means "don't skip foo", so the stored value flips.
            let falsy = matches!(v.to_ascii_lowercase().as_str(), "false" | "off" | "0");
            Some(if falsy { "1" } else { "0" }.to_string())
        }
        Some(v) => Some(v.to_string()),
        None if negated => Some("0".to_string()),
        None => None,
    };

    Normalized {
        key,
        value,
        loose,
        negated,
    }
}

/// Sentinel stored when a string option is explicitly set to the empty value
/// (`--foo=` on the command line, `foo=''` in a file). Distinguishes
/// "explicitly empty" from "never set"; typed getters unwrap it back to `""`.
pub(crate) const EXPLICIT_EMPTY: &str = "''";

/// Unwrap the explicit-empty sentinel: a value that is exactly a pair of
/// identical quote characters reads back as the empty string.
pub(crate) fn unwrap_explicit_empty(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() == 2 && bytes[0] == bytes[1] && matches!(bytes[0], b'\'' | b'"' | b'`') {
        ""
    } else {
        value
    }
}

/// Boolean interpretation used by `Config::get_bool`: falsy iff empty,
/// `false`, `off`, or `0`, case-insensitively.
pub(crate) fn truthy(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "" | "false" | "off" | "0"
    )
}
