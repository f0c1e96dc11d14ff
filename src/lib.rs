//! Layered option resolution for command-line tools. Declare your options
//! once, point at your sources, and ask for values.
//!
//! Optfig merges option values arriving from multiple, prioritized sources —
//! compiled-in defaults, any number of ini-style files, and the command line
//! itself — into one consistent view, while remembering which source supplied
//! each value.
//!
//! ```ignore
//! let mut tree = CommandTree::new("tool");
//! let root = tree.root();
//! tree.add_option(root, Opt::string("host", Some('h'), "localhost"));
//! tree.add_option(root, Opt::bool("verbose", Some('v'), false));
//!
//! let tree = Rc::new(tree);
//! let mut cfg = Config::from_args(Rc::clone(&tree), std::env::args())?;
//!
//! let mut file = File::new("/etc/tool/tool.cnf");
//! file.read()?;
//! file.parse(&cfg)?;
//! cfg.add_source(Rc::new(file));
//!
//! let host = cfg.get("host");
//! let verbose = cfg.get_bool("verbose");
//! ```
//!
//! # Layer precedence
//!
//! ```text
//! Command defaults      Opt::string(..., default) / Opt::bool(...)
//!        ↑ overridden by
//! Attached sources      files (or anything implementing Source), in add order
//!        ↑ overridden by
//! Command line          --flags and positional args
//! ```
//!
//! Every layer is sparse: a file only needs the keys it wants to override,
//! and unset keys fall through to the layer below. The command's own defaults
//! always answer, so [`Config::get`] never fails for a registered option.
//!
//! # The option dialect
//!
//! The tokenizer and file parser share one normalization scheme, built for
//! backward compatibility with a long-lived family of config files:
//!
//! - names are lowercased and underscores become dashes, so `Max_Size`,
//!   `max_size`, and `max-size` are the same option;
//! - `skip-foo` and `disable-foo` negate a boolean; `enable-foo` is a no-op
//!   alias; `skip-foo=off` double-negates back to true;
//! - `loose-foo` means "set `foo` if you know it, stay quiet if you don't",
//!   letting one file serve program versions with different option sets;
//! - short flags cluster (`-vq`), and a non-boolean shorthand swallows the
//!   rest of its cluster as an attached value (`-psecret`);
//! - `--` ends flag parsing.
//!
//! Files are ini-style: `;`/`#` comments, `[section]` headers, `key` and
//! `key=value` lines with single/double/backtick quoting and backslash
//! escapes. Which sections a [`File`] exposes is chosen after parsing via
//! [`File::use_section`] and can be re-chosen at any time.
//!
//! # Provenance
//!
//! [`Config`] remembers the winning source for every option:
//! [`supplied`](Config::supplied) tells you a real source set it (even to the
//! default value), [`changed`](Config::changed) that the resolved value
//! differs from the default, [`on_cli`](Config::on_cli) that the command line
//! specifically won, and [`source_of`](Config::source_of) names the layer for
//! display.
//!
//! # Sub-commands
//!
//! Commands form a tree ([`CommandTree`]); the first positional token on a
//! command with children selects the sub-command, whose options join the
//! effective set (child wins on conflicts). Positional args are declared per
//! command, required before optional. A supplied positional shadows a
//! same-named option; an unsupplied one does not — the option resolves
//! through the normal source scan.
//!
//! # Error handling
//!
//! User input problems — unknown options, missing values, malformed files,
//! bad typed values — come back as [`OptfigError`], annotated with the
//! offending source (command line, or file path and line). Defects in the
//! program's own declarations — duplicate shorthands, malformed positional
//! declarations, lookups of unregistered names — panic instead: they cannot
//! be caused by input and should not be recovered from.
//!
//! # Concurrency
//!
//! A [`Config`] is a cheap, single-threaded value scoped to one program
//! invocation; its resolution cache uses interior mutability with no locking,
//! and sources are shared via `Rc`. Build the [`CommandTree`] once at startup
//! and treat it as immutable infrastructure.

pub mod error;

mod cmdline;
mod command;
mod config;
mod discovery;
mod inifile;
mod normalize;
mod option;

#[cfg(test)]
mod fixtures;

pub use cmdline::CommandLine;
pub use command::{ArgSpec, Command, CommandId, CommandTree};
pub use config::{Config, Source};
pub use discovery::{Boundary, SearchPath, expand_search_paths, find_option_files};
pub use error::OptfigError;
pub use inifile::{File, Section};
pub use normalize::{Normalized, normalize};
pub use option::{Opt, OptKind};
