#[cfg(test)]
pub mod test {
    use std::rc::Rc;

    use crate::command::CommandTree;
    use crate::config::Config;
    use crate::option::Opt;

    /// A leaf command with one of everything: booleans with shorthands, a
    /// required-value string, an optional-value string, typed-getter targets,
    /// a deprecated option, and two optional positional args.
    pub fn tool_tree() -> CommandTree {
        let mut tree = CommandTree::new("tool");
        let root = tree.root();
        tree.add_options(
            root,
            [
                Opt::bool("verbose", Some('v'), false),
                Opt::bool("quiet", Some('q'), false),
                Opt::bool("help", None, false),
                Opt::bool("version", None, false),
                Opt::string("host", Some('h'), "db"),
                Opt::string("port", Some('P'), "3306"),
                Opt::string("password", Some('p'), "").value_optional(),
                Opt::string("connect-timeout", None, "10"),
                Opt::string("format", None, "sql"),
                Opt::string("max-size", None, "0"),
                Opt::bool("fast-mode", None, false).deprecated("use turbo instead"),
            ],
        );
        tree.add_optional_arg(root, "input", "");
        tree.add_optional_arg(root, "output", "");
        tree
    }

    /// A command suite: `tool import|export|help`, with one option and one
    /// required arg on `import`.
    pub fn suite_tree() -> CommandTree {
        let mut tree = CommandTree::new("tool");
        let root = tree.root();
        tree.add_options(
            root,
            [
                Opt::bool("verbose", Some('v'), false),
                Opt::bool("help", None, false),
                Opt::bool("version", None, false),
            ],
        );
        let import = tree.add_subcommand(root, "import");
        tree.add_option(import, Opt::string("format", None, "sql"));
        tree.add_arg(import, "path");
        tree.add_subcommand(root, "export");
        tree.add_subcommand(root, "help");
        tree
    }

    /// Parse `args` (without the program name) against [`tool_tree`].
    pub fn parse_tool(args: &[&str]) -> Config {
        let mut argv = vec!["tool"];
        argv.extend_from_slice(args);
        Config::from_args(Rc::new(tool_tree()), argv).expect("fixture argv should parse")
    }

    /// A config over [`tool_tree`] with an empty command line.
    pub fn tool_config() -> Config {
        parse_tool(&[])
    }

    #[test]
    fn fixture_trees_build() {
        let cfg = tool_config();
        assert_eq!(cfg.get("host"), "db");
        let tree = suite_tree();
        assert!(tree.child(tree.root(), "import").is_some());
    }
}
