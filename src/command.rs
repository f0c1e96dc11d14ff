//! The command tree: a root command, optional sub-commands, and per-command
//! option and positional-arg declarations.
//!
//! The tree is an arena of nodes addressed by [`CommandId`] handles. Parents
//! own their children through the arena; a child's back-reference to its
//! parent is just another id, so ownership stays acyclic. Build the tree once
//! at startup, then treat it as immutable infrastructure: tokenizing an
//! argument vector never mutates it.

use std::collections::HashMap;

use crate::option::Opt;

/// Stable handle to a node in a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub(crate) usize);

/// A positional-argument declaration. Internally an [`Opt`] whose
/// `require_value` flag means "required, no default".
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub(crate) opt: Opt,
}

impl ArgSpec {
    pub fn name(&self) -> &str {
        &self.opt.name
    }

    pub fn required(&self) -> bool {
        self.opt.require_value
    }

    /// Declared default. `None` for required args, which by construction
    /// cannot carry one.
    pub fn default(&self) -> Option<&str> {
        if self.opt.require_value {
            None
        } else {
            Some(&self.opt.default)
        }
    }
}

/// One node in the tree.
#[derive(Debug)]
pub struct Command {
    pub name: String,
    pub(crate) options: HashMap<String, Opt>,
    pub(crate) args: Vec<ArgSpec>,
    pub(crate) children: HashMap<String, CommandId>,
    pub(crate) parent: Option<CommandId>,
}

/// Arena holding the whole command tree. All registration methods panic on
/// programmer error (duplicate declarations, ordering violations): the tree
/// is built from literals at startup, so these are bugs, not runtime input.
#[derive(Debug)]
pub struct CommandTree {
    nodes: Vec<Command>,
}

impl CommandTree {
    /// Create a tree with a single root command.
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Command {
                name: root_name.to_string(),
                options: HashMap::new(),
                args: Vec::new(),
                children: HashMap::new(),
                parent: None,
            }],
        }
    }

    pub fn root(&self) -> CommandId {
        CommandId(0)
    }

    pub fn node(&self, id: CommandId) -> &Command {
        &self.nodes[id.0]
    }

    /// Add a sub-command under `parent` and return its handle.
    ///
    /// # Panics
    ///
    /// Panics if `parent` already has a child with that name.
    pub fn add_subcommand(&mut self, parent: CommandId, name: &str) -> CommandId {
        let id = CommandId(self.nodes.len());
        self.nodes.push(Command {
            name: name.to_string(),
            options: HashMap::new(),
            args: Vec::new(),
            children: HashMap::new(),
            parent: Some(parent),
        });
        let previous = self.nodes[parent.0].children.insert(name.to_string(), id);
        if previous.is_some() {
            panic!("command '{}' already has a subcommand '{name}'", self.nodes[parent.0].name);
        }
        id
    }

    /// Register an option on a command. Re-registering the same name replaces
    /// the earlier definition.
    pub fn add_option(&mut self, id: CommandId, opt: Opt) {
        self.nodes[id.0].options.insert(opt.name.clone(), opt);
    }

    pub fn add_options<I: IntoIterator<Item = Opt>>(&mut self, id: CommandId, opts: I) {
        for opt in opts {
            self.add_option(id, opt);
        }
    }

    /// Declare a required positional argument.
    ///
    /// # Panics
    ///
    /// Panics if an optional arg was already declared (required args must
    /// come first) or if the name collides with an existing arg.
    pub fn add_arg(&mut self, id: CommandId, name: &str) {
        let opt = Opt::string(name, None, "").value_required();
        self.push_arg(id, ArgSpec { opt });
    }

    /// Declare an optional positional argument with a default.
    ///
    /// # Panics
    ///
    /// Panics if the name collides with an existing arg.
    pub fn add_optional_arg(&mut self, id: CommandId, name: &str, default: &str) {
        let opt = Opt::string(name, None, default).value_optional();
        self.push_arg(id, ArgSpec { opt });
    }

    fn push_arg(&mut self, id: CommandId, spec: ArgSpec) {
        let node = &mut self.nodes[id.0];
        if node.args.iter().any(|a| a.name() == spec.name()) {
            panic!(
                "command '{}' already declares a positional arg '{}'",
                node.name,
                spec.name()
            );
        }
        if spec.required() && node.args.iter().any(|a| !a.required()) {
            panic!(
                "command '{}': required arg '{}' declared after an optional arg",
                node.name,
                spec.name()
            );
        }
        node.args.push(spec);
    }

    pub fn has_subcommands(&self, id: CommandId) -> bool {
        !self.nodes[id.0].children.is_empty()
    }

    pub fn child(&self, id: CommandId, name: &str) -> Option<CommandId> {
        self.nodes[id.0].children.get(name).copied()
    }

    pub fn args(&self, id: CommandId) -> &[ArgSpec] {
        &self.nodes[id.0].args
    }

    /// Number of leading required positional args.
    pub fn min_args(&self, id: CommandId) -> usize {
        self.nodes[id.0].args.iter().take_while(|a| a.required()).count()
    }

    /// Total number of declared positional args.
    pub fn max_args(&self, id: CommandId) -> usize {
        self.nodes[id.0].args.len()
    }

    /// The chain of commands from the root down to `id`, inclusive.
    pub(crate) fn chain(&self, id: CommandId) -> Vec<CommandId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// The effective option set for a command: its own options merged over
    /// everything inherited from its ancestors, child winning on name
    /// collisions.
    pub fn effective_options(&self, id: CommandId) -> HashMap<String, Opt> {
        let mut merged = HashMap::new();
        for ancestor in self.chain(id) {
            for (name, opt) in &self.nodes[ancestor.0].options {
                merged.insert(name.clone(), opt.clone());
            }
        }
        merged
    }

    /// Look up an option in the effective set of `id`, nearest definition
    /// first.
    pub fn find_option(&self, id: CommandId, name: &str) -> Option<&Opt> {
        for ancestor in self.chain(id).into_iter().rev() {
            if let Some(opt) = self.nodes[ancestor.0].options.get(name) {
                return Some(opt);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_options_merge_ancestors_child_wins() {
        let mut tree = CommandTree::new("tool");
        let root = tree.root();
        tree.add_option(root, Opt::bool("verbose", Some('v'), false));
        tree.add_option(root, Opt::string("host", Some('h'), "parent-default"));

        let sub = tree.add_subcommand(root, "import");
        tree.add_option(sub, Opt::string("host", Some('H'), "child-default"));
        tree.add_option(sub, Opt::string("format", None, "sql"));

        let merged = tree.effective_options(sub);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["host"].default, "child-default");
        assert_eq!(merged["host"].shorthand, Some('H'));
        assert!(merged.contains_key("verbose"));

        // The parent's own set is untouched.
        assert_eq!(tree.effective_options(root)["host"].default, "parent-default");
    }

    #[test]
    fn find_option_prefers_nearest_definition() {
        let mut tree = CommandTree::new("tool");
        let root = tree.root();
        tree.add_option(root, Opt::string("host", None, "a"));
        let sub = tree.add_subcommand(root, "import");
        tree.add_option(sub, Opt::string("host", None, "b"));

        assert_eq!(tree.find_option(sub, "host").unwrap().default, "b");
        assert_eq!(tree.find_option(root, "host").unwrap().default, "a");
        assert!(tree.find_option(root, "missing").is_none());
    }

    #[test]
    fn arg_counts() {
        let mut tree = CommandTree::new("tool");
        let root = tree.root();
        tree.add_arg(root, "source");
        tree.add_arg(root, "target");
        tree.add_optional_arg(root, "mode", "fast");

        assert_eq!(tree.min_args(root), 2);
        assert_eq!(tree.max_args(root), 3);
        assert_eq!(tree.args(root)[2].default(), Some("fast"));
        assert_eq!(tree.args(root)[0].default(), None);
    }

    #[test]
    #[should_panic(expected = "required arg")]
    fn required_after_optional_panics() {
        let mut tree = CommandTree::new("tool");
        let root = tree.root();
        tree.add_optional_arg(root, "mode", "fast");
        tree.add_arg(root, "source");
    }

    #[test]
    #[should_panic(expected = "already declares")]
    fn duplicate_arg_name_panics() {
        let mut tree = CommandTree::new("tool");
        let root = tree.root();
        tree.add_arg(root, "source");
        tree.add_arg(root, "source");
    }

    #[test]
    #[should_panic(expected = "already has a subcommand")]
    fn duplicate_subcommand_panics() {
        let mut tree = CommandTree::new("tool");
        let root = tree.root();
        tree.add_subcommand(root, "import");
        tree.add_subcommand(root, "import");
    }
}
