//! Tree builder: turns a caller-declared [`Command`] into a [`CommandTree`].
//!
//! This is the one-time initialization phase. It names unnamed roots,
//! injects the global flags, lints and normalizes option declarations, sorts
//! options and children, and registers every node under its colon path.

use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::arena::{CommandNode, CommandTree};
use crate::domain::command::{Command, Opt};
use crate::domain::error::{ConfigError, ConfigIssue};
use crate::domain::value::{Bool, Str, StringArray};

/// Flags every tree carries on its root.
pub fn global_flags() -> Vec<Opt> {
    vec![
        Opt::new("help")
            .short('h')
            .description("Show help for command.")
            .value(Bool::new()),
        Opt::new("version")
            .short('v')
            .description("Show version information.")
            .value(Bool::new()),
        Opt::new("list-commands")
            .description("List all commands, including subcommands.")
            .value(Bool::new()),
        Opt::new("list-flags")
            .description("List all flags.")
            .value(Bool::new()),
        Opt::new("config-file")
            .short('c')
            .description("Path to the configuration file.")
            .value(Str::new()),
        Opt::new("debug")
            .description("Enable debug mode.")
            .value(Bool::new()),
        Opt::new("log-level")
            .description("Set the logging level.")
            .default_value("info")
            .value(Str::new()),
        Opt::new("environment")
            .short('e')
            .description("Set the environment.")
            .value(Str::new()),
        Opt::new("env-file")
            .description("Path to the environment file.")
            .value(Str::new()),
        Opt::new("env-files")
            .description("Paths to the environment files.")
            .value(StringArray::new()),
    ]
}

/// Trim, capitalize the first letter and end with exactly one period.
pub(crate) fn normalize_description(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches('.').trim_end();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut chars = trimmed.chars();
    let mut out: String = chars
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default();
    out.push_str(chars.as_str());
    out.push('.');
    out
}

/// Builds the arena snapshot of a command tree.
pub struct TreeBuilder {
    arena: Arena<CommandNode>,
    lookup: HashMap<String, Index>,
    issues: Vec<ConfigIssue>,
    version: Option<String>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            lookup: HashMap::new(),
            issues: Vec::new(),
            version: None,
        }
    }

    /// Version string reported by `--version`.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Consume the declaration and produce the snapshot, or every problem found.
    #[instrument(level = "debug", skip(self, root), fields(root = %root.name()))]
    pub fn build(mut self, mut root: Command) -> Result<CommandTree, ConfigError> {
        if root.usage.is_empty() {
            root.usage = "unnamed".to_string();
        }
        let declared: Vec<String> = root.options.iter().map(|o| o.flag.clone()).collect();
        root.options.extend(
            global_flags()
                .into_iter()
                .filter(|g| !declared.contains(&g.flag)),
        );

        let root_idx = self.insert(root, None, "");
        if !self.issues.is_empty() {
            return Err(ConfigError {
                issues: self.issues,
            });
        }
        debug!(nodes = self.arena.len(), "command tree initialized");
        Ok(CommandTree {
            arena: self.arena,
            root: root_idx,
            lookup: self.lookup,
            version: self.version,
        })
    }

    #[instrument(level = "trace", skip(self, command), fields(name = %command.name()))]
    fn insert(&mut self, mut command: Command, parent: Option<Index>, parent_path: &str) -> Index {
        let path = if parent_path.is_empty() {
            command.name().to_string()
        } else {
            format!("{}:{}", parent_path, command.name())
        };

        for opt in command.options.iter_mut() {
            if opt.flag.is_empty() && opt.envs.is_empty() {
                self.issues.push(ConfigIssue::UnnamedOption {
                    command: path.clone(),
                });
            }
            opt.description = normalize_description(&opt.description);
        }
        command.options.sort_by(|a, b| a.key().cmp(b.key()));

        let mut children = std::mem::take(&mut command.children);
        children.sort_by(|a, b| a.name().cmp(b.name()));

        let idx = self.arena.insert(CommandNode {
            command,
            parent,
            children: Vec::new(),
            path: path.clone(),
        });
        if self.lookup.insert(path.clone(), idx).is_some() {
            self.issues.push(ConfigIssue::DuplicateCommand(path.clone()));
        }

        for child in children {
            let child_idx = self.insert(child, Some(idx), &path);
            if let Some(node) = self.arena.get_mut(idx) {
                node.children.push(child_idx);
            }
        }
        idx
    }
}

impl CommandTree {
    /// Initialize a tree from its root declaration.
    pub fn new(root: Command) -> Result<Self, ConfigError> {
        TreeBuilder::new().build(root)
    }

    /// Same as [`CommandTree::new`], reporting `version` on `--version`.
    pub fn with_version(root: Command, version: impl Into<String>) -> Result<Self, ConfigError> {
        TreeBuilder::new().version(version).build(root)
    }
}
