//! The command-line tokenizer: consumes an argument vector against a command
//! tree's effective option set and produces a [`CommandLine`].
//!
//! The dialect:
//!
//! - `--name`, `--name=value` long options; `-x`, `-xvalue`, `-xyz` short
//!   options, where a cluster of boolean shorthands expands (`-bar` is
//!   `-b -a -r`) and a non-boolean shorthand swallows the rest of the cluster
//!   as its value (`-psecret`).
//! - `--` ends flag parsing; everything after is positional, verbatim.
//! - On a command with sub-commands, the first positional token selects the
//!   sub-command and its own options join the effective set (child wins on
//!   name or shorthand conflicts).
//! - A bare first positional of `help` or `version` on a leaf command is
//!   rewritten to the corresponding long option.
//! - `loose-`-prefixed unknown options are ignored instead of erroring.

use std::collections::{HashMap, HashSet};

use crate::command::{CommandId, CommandTree};
use crate::config::Source;
use crate::error::OptfigError;
use crate::normalize::{EXPLICIT_EMPTY, normalize};
use crate::option::Opt;

/// The result of tokenizing one argument vector: the resolved leaf command,
/// the option values actually supplied, and the positional values. Read-only
/// once built.
#[derive(Debug, Clone)]
pub struct CommandLine {
    command: CommandId,
    values: HashMap<String, String>,
    args: Vec<String>,
    deprecations: Vec<String>,
}

impl CommandLine {
    /// Tokenize `argv` against `tree`, starting at the root command. The
    /// first element of `argv` is the program invocation and is skipped.
    ///
    /// # Panics
    ///
    /// Panics if two options registered on the same command claim the same
    /// shorthand. That is a defect in the command tree, not in user input.
    pub fn parse<I, S>(tree: &CommandTree, argv: I) -> Result<Self, OptfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<String> = argv.into_iter().map(|s| s.as_ref().to_string()).collect();
        let mut scanner = Scanner {
            tree,
            tokens,
            pos: 1, // skip the program name
            command: tree.root(),
            long: HashMap::new(),
            short: HashMap::new(),
            values: HashMap::new(),
            args: Vec::new(),
            deprecations: Vec::new(),
        };
        scanner.merge_command(tree.root());
        scanner.run()?;
        scanner.finish()
    }

    /// The leaf command the argument vector resolved to.
    pub fn command(&self) -> CommandId {
        self.command
    }

    /// Raw value for an option supplied on the command line. The
    /// explicit-empty sentinel is not unwrapped here.
    pub fn option_value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Positional argument values, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Source for CommandLine {
    fn option_value(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn source_name(&self) -> String {
        "command-line".to_string()
    }

    fn deprecation_warnings(&self) -> Vec<String> {
        self.deprecations.clone()
    }
}

struct Scanner<'t> {
    tree: &'t CommandTree,
    tokens: Vec<String>,
    pos: usize,
    command: CommandId,
    long: HashMap<String, Opt>,
    short: HashMap<char, Opt>,
    values: HashMap<String, String>,
    args: Vec<String>,
    deprecations: Vec<String>,
}

impl Scanner<'_> {
    /// Merge a command's own options into the long and short indexes,
    /// overwriting inherited entries (child wins). Two options on the same
    /// command claiming one shorthand is a construction bug and panics.
    fn merge_command(&mut self, id: CommandId) {
        let mut seen = HashSet::new();
        for opt in self.tree.node(id).options.values() {
            if let Some(ch) = opt.shorthand
                && !seen.insert(ch)
            {
                panic!(
                    "command '{}' has two options with shorthand '-{ch}'",
                    self.tree.node(id).name
                );
            }
        }
        for opt in self.tree.node(id).options.values() {
            self.long.insert(opt.name.clone(), opt.clone());
            if let Some(ch) = opt.shorthand {
                self.short.insert(ch, opt.clone());
            }
        }
    }

    fn run(&mut self) -> Result<(), OptfigError> {
        let mut verbatim = false;
        while self.pos < self.tokens.len() {
            let token = self.tokens[self.pos].clone();
            self.pos += 1;

            if verbatim {
                self.positional(token, false)?;
            } else if token == "--" {
                verbatim = true;
            } else if let Some(body) = token.strip_prefix("--") {
                self.long_option(body)?;
            } else if token.len() > 1 && token.starts_with('-') {
                self.short_cluster(&token)?;
            } else {
                self.positional(token, true)?;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<CommandLine, OptfigError> {
        if !self.values.contains_key("help") {
            let expected = self.tree.min_args(self.command);
            if self.args.len() < expected {
                return Err(OptfigError::MissingRequiredArgs {
                    command: self.tree.node(self.command).name.clone(),
                    expected,
                    supplied: self.args.len(),
                });
            }
        }
        // A suite invoked with no sub-command falls through to its help.
        if self.tree.has_subcommands(self.command)
            && let Some(help) = self.tree.child(self.command, "help")
        {
            self.command = help;
        }
        Ok(CommandLine {
            command: self.command,
            values: self.values,
            args: self.args,
            deprecations: self.deprecations,
        })
    }

    fn long_option(&mut self, body: &str) -> Result<(), OptfigError> {
        let n = normalize(body);
        if n.key.is_empty() {
            return Ok(());
        }
        let Some(opt) = self.long.get(&n.key).cloned() else {
            if n.loose {
                tracing::debug!(option = %n.key, "ignoring loose unknown option");
                return Ok(());
            }
            return Err(OptfigError::OptionNotDefined {
                name: n.key,
                origin: "command-line".to_string(),
            });
        };

        let value = match n.value {
            Some(v) if v.is_empty() && !opt.is_bool() => EXPLICIT_EMPTY.to_string(),
            Some(v) => v,
            None if opt.is_bool() => "1".to_string(),
            None if opt.require_value => match self.take_value() {
                Some(v) => v,
                None => {
                    return Err(OptfigError::OptionMissingValue {
                        name: opt.name,
                        origin: "command-line".to_string(),
                    });
                }
            },
            None => String::new(),
        };
        self.record(&opt, value);
        Ok(())
    }

    fn short_cluster(&mut self, token: &str) -> Result<(), OptfigError> {
        let chars: Vec<char> = token[1..].chars().collect();
        let mut idx = 0;
        while idx < chars.len() {
            let ch = chars[idx];
            let Some(opt) = self.short.get(&ch).cloned() else {
                return Err(OptfigError::OptionNotDefined {
                    name: ch.to_string(),
                    origin: "command-line".to_string(),
                });
            };

            if opt.is_bool() {
                self.record(&opt, "1".to_string());
                idx += 1;
                continue;
            }

            // Non-boolean: the rest of the cluster is an attached value, or
            // the next token is consumed when a value is required.
            let value = if idx + 1 < chars.len() {
                chars[idx + 1..].iter().collect()
            } else if opt.require_value {
                match self.take_value() {
                    Some(v) => v,
                    None => {
                        return Err(OptfigError::OptionMissingValue {
                            name: opt.name,
                            origin: "command-line".to_string(),
                        });
                    }
                }
            } else {
                String::new()
            };
            self.record(&opt, value);
            break;
        }
        Ok(())
    }

    fn positional(&mut self, token: String, allow_dispatch: bool) -> Result<(), OptfigError> {
        if allow_dispatch && self.tree.has_subcommands(self.command) {
            let Some(child) = self.tree.child(self.command, &token) else {
                return Err(OptfigError::UnknownCommand(token));
            };
            self.command = child;
            self.merge_command(child);
            return Ok(());
        }
        if allow_dispatch && self.args.is_empty() && (token == "help" || token == "version") {
            // `tool help` reads as `tool --help` on a leaf command.
            return self.long_option(&token);
        }
        self.args.push(token);
        let max = self.tree.max_args(self.command);
        if self.args.len() > max {
            return Err(OptfigError::TooManyArgs {
                command: self.tree.node(self.command).name.clone(),
                max,
            });
        }
        Ok(())
    }

    /// Consume the next token as an option value, unless it looks like a flag.
    fn take_value(&mut self) -> Option<String> {
        let next = self.tokens.get(self.pos)?;
        if next.starts_with('-') {
            return None;
        }
        let value = next.clone();
        self.pos += 1;
        Some(value)
    }

    fn record(&mut self, opt: &Opt, value: String) {
        if let Some(detail) = &opt.deprecated {
            self.deprecations
                .push(format!("option {} is deprecated: {detail}", opt.name));
        }
        self.values.insert(opt.name.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{suite_tree, tool_tree};

    fn parse(args: &[&str]) -> Result<CommandLine, OptfigError> {
        let tree = tool_tree();
        let mut argv = vec!["tool"];
        argv.extend_from_slice(args);
        CommandLine::parse(&tree, argv)
    }

    #[test]
    fn long_inline_value() {
        let cli = parse(&["--host=db.example.com"]).unwrap();
        assert_eq!(cli.option_value("host"), Some("db.example.com"));
    }

    #[test]
    fn long_value_from_next_token() {
        let cli = parse(&["--host", "db.example.com"]).unwrap();
        assert_eq!(cli.option_value("host"), Some("db.example.com"));
        assert!(cli.args().is_empty());
    }

    #[test]
    fn required_value_never_slurps_a_flag() {
        let err = parse(&["--host", "--verbose"]).unwrap_err();
        assert!(matches!(err, OptfigError::OptionMissingValue { ref name, .. } if name == "host"));
    }

    #[test]
    fn missing_value_at_end_of_argv() {
        let err = parse(&["--host"]).unwrap_err();
        assert!(matches!(err, OptfigError::OptionMissingValue { .. }));
    }

    #[test]
    fn bool_without_value_is_true() {
        let cli = parse(&["--verbose"]).unwrap();
        assert_eq!(cli.option_value("verbose"), Some("1"));
    }

    #[test]
    fn bool_with_explicit_value_passes_through() {
        let cli = parse(&["--verbose=off"]).unwrap();
        assert_eq!(cli.option_value("verbose"), Some("off"));
    }

    #[test]
    fn negation_prefixes() {
        let cli = parse(&["--skip-verbose"]).unwrap();
        assert_eq!(cli.option_value("verbose"), Some("0"));
        let cli = parse(&["--disable-verbose"]).unwrap();
        assert_eq!(cli.option_value("verbose"), Some("0"));
        let cli = parse(&["--skip-verbose=off"]).unwrap();
        assert_eq!(cli.option_value("verbose"), Some("1"));
    }

    #[test]
    fn underscores_normalize_to_dashes() {
        let tree = tool_tree();
        let cli = CommandLine::parse(&tree, ["tool", "--connect_timeout=5"]).unwrap();
        assert_eq!(cli.option_value("connect-timeout"), Some("5"));
    }

    #[test]
    fn explicit_empty_becomes_sentinel() {
        let cli = parse(&["--host="]).unwrap();
        assert_eq!(cli.option_value("host"), Some("''"));
    }

    #[test]
    fn unknown_option_errors() {
        let err = parse(&["--frobnicate"]).unwrap_err();
        assert!(matches!(err, OptfigError::OptionNotDefined { ref name, .. } if name == "frobnicate"));
    }

    #[test]
    fn loose_unknown_option_is_ignored() {
        let cli = parse(&["--loose-frobnicate", "--loose-frobnicate=7"]).unwrap();
        assert_eq!(cli.option_value("frobnicate"), None);
    }

    #[test]
    fn loose_known_option_still_applies() {
        let cli = parse(&["--loose-verbose"]).unwrap();
        assert_eq!(cli.option_value("verbose"), Some("1"));
    }

    #[test]
    fn short_boolean_cluster_expands() {
        let tree = tool_tree();
        let cli = CommandLine::parse(&tree, ["tool", "-vq"]).unwrap();
        assert_eq!(cli.option_value("verbose"), Some("1"));
        assert_eq!(cli.option_value("quiet"), Some("1"));
    }

    #[test]
    fn short_attached_value() {
        let cli = parse(&["-psecret"]).unwrap();
        assert_eq!(cli.option_value("password"), Some("secret"));
    }

    #[test]
    fn short_attached_value_stops_cluster_scan() {
        // -vpsecret: v is boolean, then p consumes "secret".
        let cli = parse(&["-vpsecret"]).unwrap();
        assert_eq!(cli.option_value("verbose"), Some("1"));
        assert_eq!(cli.option_value("password"), Some("secret"));
    }

    #[test]
    fn short_required_value_from_next_token() {
        let cli = parse(&["-h", "example.com"]).unwrap();
        assert_eq!(cli.option_value("host"), Some("example.com"));
    }

    #[test]
    fn short_required_value_missing() {
        let err = parse(&["-h"]).unwrap_err();
        assert!(matches!(err, OptfigError::OptionMissingValue { ref name, .. } if name == "host"));
    }

    #[test]
    fn short_optional_value_defaults_empty() {
        let cli = parse(&["-p"]).unwrap();
        assert_eq!(cli.option_value("password"), Some(""));
    }

    #[test]
    fn unknown_shorthand_errors() {
        let err = parse(&["-z"]).unwrap_err();
        assert!(matches!(err, OptfigError::OptionNotDefined { ref name, .. } if name == "z"));
    }

    #[test]
    fn double_dash_ends_flag_parsing() {
        let tree = tool_tree();
        let cli = CommandLine::parse(&tree, ["tool", "--", "--verbose"]).unwrap();
        assert_eq!(cli.option_value("verbose"), None);
        assert_eq!(cli.args(), ["--verbose"]);
    }

    #[test]
    fn positional_values_collected_in_order() {
        let cli = parse(&["one", "two"]).unwrap();
        assert_eq!(cli.args(), ["one", "two"]);
    }

    #[test]
    fn too_many_positionals() {
        let err = parse(&["one", "two", "three"]).unwrap_err();
        assert!(matches!(err, OptfigError::TooManyArgs { max: 2, .. }));
    }

    #[test]
    fn help_as_first_positional_reads_as_option() {
        let cli = parse(&["help"]).unwrap();
        assert_eq!(cli.option_value("help"), Some("1"));
        assert!(cli.args().is_empty());
    }

    #[test]
    fn version_as_first_positional_reads_as_option() {
        let cli = parse(&["version"]).unwrap();
        assert_eq!(cli.option_value("version"), Some("1"));
    }

    #[test]
    fn help_alias_only_applies_to_first_positional() {
        let cli = parse(&["one", "help"]).unwrap();
        assert_eq!(cli.option_value("help"), None);
        assert_eq!(cli.args(), ["one", "help"]);
    }

    #[test]
    fn subcommand_dispatch() {
        let tree = suite_tree();
        let cli = CommandLine::parse(&tree, ["tool", "import", "data.sql"]).unwrap();
        assert_eq!(cli.command(), tree.child(tree.root(), "import").unwrap());
        assert_eq!(cli.args(), ["data.sql"]);
    }

    #[test]
    fn subcommand_options_merge_child_wins() {
        let tree = suite_tree();
        // --format is defined only on import; --verbose is inherited.
        let cli =
            CommandLine::parse(&tree, ["tool", "--verbose", "import", "data.sql", "--format=csv"])
                .unwrap();
        assert_eq!(cli.option_value("verbose"), Some("1"));
        assert_eq!(cli.option_value("format"), Some("csv"));
    }

    #[test]
    fn unknown_subcommand_errors() {
        let tree = suite_tree();
        let err = CommandLine::parse(&tree, ["tool", "exprot"]).unwrap_err();
        assert!(matches!(err, OptfigError::UnknownCommand(ref name) if name == "exprot"));
    }

    #[test]
    fn suite_without_subcommand_redirects_to_help() {
        let tree = suite_tree();
        let cli = CommandLine::parse(&tree, ["tool"]).unwrap();
        assert_eq!(cli.command(), tree.child(tree.root(), "help").unwrap());
    }

    #[test]
    fn missing_required_args_rejected() {
        let tree = suite_tree();
        let err = CommandLine::parse(&tree, ["tool", "import"]).unwrap_err();
        assert!(matches!(
            err,
            OptfigError::MissingRequiredArgs {
                expected: 1,
                supplied: 0,
                ..
            }
        ));
    }

    #[test]
    fn help_suppresses_required_arg_check() {
        let tree = suite_tree();
        let cli = CommandLine::parse(&tree, ["tool", "import", "--help"]).unwrap();
        assert_eq!(cli.option_value("help"), Some("1"));
        assert!(cli.args().is_empty());
    }

    #[test]
    fn deprecated_option_use_is_reported() {
        let cli = parse(&["--fast-mode"]).unwrap();
        let warnings = Source::deprecation_warnings(&cli);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("fast-mode"));
        assert!(warnings[0].contains("use turbo instead"));
    }

    #[test]
    #[should_panic(expected = "shorthand")]
    fn duplicate_shorthand_on_one_command_panics() {
        let mut tree = CommandTree::new("tool");
        let root = tree.root();
        tree.add_option(root, crate::option::Opt::bool("alpha", Some('x'), false));
        tree.add_option(root, crate::option::Opt::bool("beta", Some('x'), false));
        let _ = CommandLine::parse(&tree, ["tool"]);
    }
}
