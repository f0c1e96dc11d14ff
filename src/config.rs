//! The layered resolver: one consistent view over command defaults, any
//! number of attached sources, and the command line, with provenance.
//!
//! Precedence, lowest to highest: command defaults, attached sources in the
//! order they were added, the command line. Every layer is sparse; unset
//! names fall through to the layer below, and the command's own defaults
//! always answer, so resolution never comes up empty for a registered name.
//!
//! Resolution is cached and rebuilt lazily. Adding a source dirties the
//! cache automatically; mutating a source in place (say, re-pointing a
//! [`File`](crate::File) at another section) requires an explicit
//! [`mark_dirty`](Config::mark_dirty). The cache lives in a `RefCell` with no
//! locking: a `Config` is a cheap, single-threaded value scoped to one
//! program invocation.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::cmdline::CommandLine;
use crate::command::{CommandId, CommandTree};
use crate::error::OptfigError;
use crate::normalize::{truthy, unwrap_explicit_empty};
use crate::option::Opt;

/// Anything that can answer "do you have a value for option X". Files, the
/// command line, and in-memory test stubs all satisfy this uniformly.
pub trait Source {
    fn option_value(&self, name: &str) -> Option<String>;

    /// Human-readable label used in provenance reporting.
    fn source_name(&self) -> String;

    /// Warnings for deprecated options this source actually supplied.
    fn deprecation_warnings(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Which layer supplied a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    CommandDefault,
    External(usize),
    CommandLine,
}

#[derive(Debug, Default)]
struct Cache {
    dirty: bool,
    values: HashMap<String, String>,
    origins: HashMap<String, Origin>,
}

/// The unified view. Cloning shares the command line and the source objects
/// but copies the source list, so sources appended to the clone do not appear
/// in the original.
pub struct Config {
    tree: Rc<CommandTree>,
    cmdline: Rc<CommandLine>,
    sources: Vec<Rc<dyn Source>>,
    ignore_unknown: bool,
    cache: RefCell<Cache>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            tree: Rc::clone(&self.tree),
            cmdline: Rc::clone(&self.cmdline),
            sources: self.sources.clone(),
            ignore_unknown: self.ignore_unknown,
            cache: RefCell::new(Cache {
                dirty: true,
                ..Cache::default()
            }),
        }
    }
}

impl Config {
    pub fn new(tree: Rc<CommandTree>, cmdline: CommandLine) -> Self {
        Self {
            tree,
            cmdline: Rc::new(cmdline),
            sources: Vec::new(),
            ignore_unknown: false,
            cache: RefCell::new(Cache {
                dirty: true,
                ..Cache::default()
            }),
        }
    }

    /// Tokenize `argv` against `tree` and wrap the result.
    pub fn from_args<I, S>(tree: Rc<CommandTree>, argv: I) -> Result<Self, OptfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cmdline = CommandLine::parse(&tree, argv)?;
        Ok(Self::new(tree, cmdline))
    }

    /// The command the argument vector resolved to.
    pub fn command(&self) -> CommandId {
        self.cmdline.command()
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.cmdline
    }

    /// Append a source at the highest non-command-line priority.
    pub fn add_source(&mut self, source: Rc<dyn Source>) {
        self.sources.push(source);
        self.cache.borrow_mut().dirty = true;
    }

    /// Signal that an existing source changed in place; the next lookup
    /// rebuilds the cache.
    pub fn mark_dirty(&self) {
        self.cache.borrow_mut().dirty = true;
    }

    /// Treat unknown options in parsed files as skippable for every file,
    /// without marking each file individually.
    pub fn set_ignore_unknown_options(&mut self, ignore: bool) {
        self.ignore_unknown = ignore;
    }

    pub fn ignore_unknown_options(&self) -> bool {
        self.ignore_unknown
    }

    /// Look up an option definition in the active command's effective set.
    pub fn find_option(&self, name: &str) -> Option<Opt> {
        self.tree.find_option(self.cmdline.command(), name).cloned()
    }

    /// Resolved value for `name`, with the explicit-empty sentinel unwrapped.
    ///
    /// # Panics
    ///
    /// Panics if `name` was never registered on the active command. Asking
    /// for an unknown option is caller error, not a runtime condition.
    pub fn get(&self, name: &str) -> String {
        let (value, _) = self.lookup(name);
        unwrap_explicit_empty(&value).to_string()
    }

    /// Like [`get`](Self::get) but without sentinel unwrapping, so a caller
    /// can distinguish "explicitly set to empty" from "never set".
    pub fn get_raw(&self, name: &str) -> String {
        self.lookup(name).0
    }

    /// Boolean read: falsy iff the value is empty, `false`, `off`, or `0`,
    /// case-insensitively.
    pub fn get_bool(&self, name: &str) -> bool {
        truthy(&self.get(name))
    }

    /// Base-10 integer read.
    pub fn get_int(&self, name: &str) -> Result<i64, OptfigError> {
        let value = self.get(name);
        value.parse().map_err(|_| OptfigError::InvalidInt {
            name: name.to_string(),
            value,
        })
    }

    /// Integer read falling back to the option's declared default when the
    /// resolved value does not parse.
    ///
    /// # Panics
    ///
    /// Panics if the declared default itself is not an integer; a default
    /// comes from program code, so that is a defect, not bad input.
    pub fn get_int_or_default(&self, name: &str) -> i64 {
        if let Ok(value) = self.get_int(name) {
            return value;
        }
        let opt = self
            .find_option(name)
            .unwrap_or_else(|| panic!("option {name} is not defined"));
        opt.default.parse().unwrap_or_else(|_| {
            panic!(
                "default value '{}' for option {name} is not an integer",
                opt.default
            )
        })
    }

    /// Case-insensitive membership test against `allowed` plus the option's
    /// own default. Returns the matching allowed value in its original
    /// casing.
    pub fn get_enum(&self, name: &str, allowed: &[&str]) -> Result<String, OptfigError> {
        let value = self.get(name);
        let lower = value.to_ascii_lowercase();
        for candidate in allowed {
            if candidate.to_ascii_lowercase() == lower {
                return Ok((*candidate).to_string());
            }
        }
        if let Some(opt) = self.find_option(name)
            && opt.default.to_ascii_lowercase() == lower
        {
            return Ok(value);
        }
        Err(OptfigError::InvalidEnum {
            name: name.to_string(),
            value,
            allowed: allowed
                .iter()
                .map(|a| format!("\"{a}\""))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Byte-size read: a non-negative integer with an optional `K`, `M`, or
    /// `G` suffix (case-insensitive, optionally followed by `B`) multiplying
    /// by 1024, 1024², or 1024³. The empty string is zero.
    pub fn get_bytes(&self, name: &str) -> Result<u64, OptfigError> {
        let value = self.get(name);
        parse_byte_size(&value).ok_or_else(|| OptfigError::InvalidSize {
            name: name.to_string(),
            value,
        })
    }

    /// True iff some real source set the option, even to a value equal to
    /// the default.
    pub fn supplied(&self, name: &str) -> bool {
        self.lookup(name).1 != Origin::CommandDefault
    }

    /// True iff the option was supplied and its resolved value differs from
    /// the declared default.
    pub fn changed(&self, name: &str) -> bool {
        let (value, origin) = self.lookup(name);
        if origin == Origin::CommandDefault {
            return false;
        }
        let default = match self.find_option(name) {
            Some(opt) => opt.default,
            None => self
                .tree
                .args(self.cmdline.command())
                .iter()
                .find(|a| a.name() == name)
                .and_then(|a| a.default().map(str::to_string))
                .unwrap_or_default(),
        };
        value != default
    }

    /// True iff the winning source is specifically the command line.
    pub fn on_cli(&self, name: &str) -> bool {
        self.lookup(name).1 == Origin::CommandLine
    }

    /// Provenance label for the winning source.
    pub fn source_of(&self, name: &str) -> String {
        match self.lookup(name).1 {
            Origin::CommandDefault => "command defaults".to_string(),
            Origin::External(idx) => self.sources[idx].source_name(),
            Origin::CommandLine => self.cmdline.source_name(),
        }
    }

    /// Deprecation warnings from the command line and every attached source,
    /// in priority-ascending order.
    pub fn deprecation_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for source in &self.sources {
            warnings.extend(source.deprecation_warnings());
        }
        warnings.extend(self.cmdline.deprecation_warnings());
        warnings
    }

    fn lookup(&self, name: &str) -> (String, Origin) {
        if self.cache.borrow().dirty {
            let rebuilt = self.rebuild();
            *self.cache.borrow_mut() = rebuilt;
        }
        let cache = self.cache.borrow();
        match (cache.values.get(name), cache.origins.get(name)) {
            (Some(value), Some(origin)) => (value.clone(), *origin),
            _ => panic!("option {name} is not defined"),
        }
    }

    /// Build the full unified view: positional args first (shadowing
    /// same-named options only when actually supplied), then every option in
    /// the effective set, scanned highest-priority-first.
    fn rebuild(&self) -> Cache {
        let command = self.cmdline.command();
        let effective = self.tree.effective_options(command);
        let mut cache = Cache::default();
        let mut shadowed = HashSet::new();

        for (position, arg) in self.tree.args(command).iter().enumerate() {
            if let Some(value) = self.cmdline.args().get(position) {
                cache.values.insert(arg.name().to_string(), value.clone());
                cache
                    .origins
                    .insert(arg.name().to_string(), Origin::CommandLine);
                shadowed.insert(arg.name().to_string());
            } else {
                cache.values.insert(
                    arg.name().to_string(),
                    arg.default().unwrap_or_default().to_string(),
                );
                cache
                    .origins
                    .insert(arg.name().to_string(), Origin::CommandDefault);
            }
        }

        for name in effective.keys() {
            if shadowed.contains(name) {
                continue;
            }
            let (value, origin) = self.resolve(name, &effective);
            cache.values.insert(name.clone(), value);
            cache.origins.insert(name.clone(), origin);
        }

        tracing::debug!(
            options = cache.values.len(),
            sources = self.sources.len(),
            "rebuilt unified option cache"
        );
        cache.dirty = false;
        cache
    }

    fn resolve(&self, name: &str, effective: &HashMap<String, Opt>) -> (String, Origin) {
        if let Some(value) = Source::option_value(&*self.cmdline, name) {
            return (value, Origin::CommandLine);
        }
        for (idx, source) in self.sources.iter().enumerate().rev() {
            if let Some(value) = source.option_value(name) {
                return (value, Origin::External(idx));
            }
        }
        // The command's own defaults always answer for a registered option;
        // anything else is a broken cache invariant.
        let Some(opt) = effective.get(name) else {
            panic!("no source produced a value for option {name}");
        };
        (opt.default.clone(), Origin::CommandDefault)
    }
}

/// Parse a byte-size string. `None` on any malformed input.
fn parse_byte_size(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(0);
    }
    let lower = trimmed.to_ascii_lowercase();
    let mut body = lower.as_str();
    let mut multiplier: u64 = 1;

    if let Some(stripped) = body.strip_suffix('b') {
        // A trailing B is only valid after a unit letter.
        if !stripped.ends_with(['k', 'm', 'g']) {
            return None;
        }
        body = stripped;
    }
    if let Some(stripped) = body.strip_suffix('k') {
        multiplier = 1024;
        body = stripped;
    } else if let Some(stripped) = body.strip_suffix('m') {
        multiplier = 1024 * 1024;
        body = stripped;
    } else if let Some(stripped) = body.strip_suffix('g') {
        multiplier = 1024 * 1024 * 1024;
        body = stripped;
    }

    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    body.parse::<u64>().ok()?.checked_mul(multiplier)
}
