use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::command::{Command, Opt};

/// Tree node in the arena-based command hierarchy.
///
/// `command.children` is always empty once inserted; structure lives in
/// `parent`/`children` indices.
#[derive(Debug)]
pub struct CommandNode {
    pub command: Command,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes, sorted by name
    pub children: Vec<Index>,
    /// Colon-joined path from the root, e.g. `app:user:create`
    pub path: String,
}

/// Immutable, parent-annotated snapshot of a command tree.
///
/// Built once by [`crate::domain::TreeBuilder`]; every run only reads it.
#[derive(Debug)]
pub struct CommandTree {
    pub(crate) arena: Arena<CommandNode>,
    pub(crate) root: Index,
    /// Colon path -> node, every node of the tree
    pub(crate) lookup: HashMap<String, Index>,
    pub(crate) version: Option<String>,
}

impl CommandTree {
    #[instrument(level = "trace", skip(self))]
    pub fn root(&self) -> Index {
        self.root
    }

    pub fn node(&self, idx: Index) -> Option<&CommandNode> {
        self.arena.get(idx)
    }

    /// Declaration of `idx`; indices always come from this tree.
    pub fn command(&self, idx: Index) -> &Command {
        &self.arena[idx].command
    }

    pub fn parent(&self, idx: Index) -> Option<Index> {
        self.arena.get(idx).and_then(|n| n.parent)
    }

    pub fn children(&self, idx: Index) -> &[Index] {
        self.arena
            .get(idx)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn name(&self, idx: Index) -> &str {
        self.command(idx).name()
    }

    /// Colon-joined path key of `idx`.
    pub fn path(&self, idx: Index) -> &str {
        self.arena.get(idx).map(|n| n.path.as_str()).unwrap_or("")
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Node registered under a full colon path (`app:user:create`).
    pub fn lookup(&self, path: &str) -> Option<Index> {
        self.lookup.get(path).copied()
    }

    /// Nodes from the root down to `idx`, inclusive.
    pub fn path_from_root(&self, idx: Index) -> Vec<Index> {
        let mut chain = vec![idx];
        let mut cur = idx;
        while let Some(parent) = self.parent(cur) {
            chain.push(parent);
            cur = parent;
        }
        chain.reverse();
        chain
    }

    /// Space-joined names from the root, as typed on the command line.
    pub fn full_name(&self, idx: Index) -> String {
        self.path_from_root(idx)
            .into_iter()
            .map(|i| self.name(i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parent's full name followed by the command's own usage string.
    pub fn full_usage(&self, idx: Index) -> String {
        let usage = &self.command(idx).usage;
        match self.parent(idx) {
            Some(parent) => format!("{} {}", self.full_name(parent), usage),
            None => usage.to_string(),
        }
    }

    /// Options of every command from the root down to `idx`.
    pub fn full_options(&self, idx: Index) -> Vec<&Opt> {
        self.path_from_root(idx)
            .into_iter()
            .flat_map(|i| self.command(i).options.iter())
            .collect()
    }

    /// Non-hidden root options that have a flag.
    pub fn global_flags(&self) -> Vec<&Opt> {
        self.command(self.root)
            .options
            .iter()
            .filter(|o| !o.flag.is_empty() && !o.hidden)
            .collect()
    }

    /// Direct child of `idx` answering to `token` by name or alias.
    pub fn find_child(&self, idx: Index, token: &str) -> Option<Index> {
        self.children(idx)
            .iter()
            .copied()
            .find(|&c| self.command(c).answers_to(token))
    }

    /// Walk `segments` child by child from the root; names or aliases.
    pub fn find<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Option<Index> {
        segments
            .into_iter()
            .try_fold(self.root, |cur, seg| self.find_child(cur, seg))
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.calculate_depth(self.root)
    }

    fn calculate_depth(&self, idx: Index) -> usize {
        1 + self
            .children(idx)
            .iter()
            .map(|&child| self.calculate_depth(child))
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

/// Pre-order traversal yielding `(index, node)`.
pub struct TreeIterator<'a> {
    tree: &'a CommandTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a CommandTree) -> Self {
        Self {
            tree,
            stack: vec![tree.root],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a CommandNode);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        let node = self.tree.arena.get(idx)?;
        // reversed so the first child pops first
        self.stack.extend(node.children.iter().rev());
        Some((idx, node))
    }
}
