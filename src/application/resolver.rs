//! Command tree resolution as a pure step function.
//!
//! Each [`step`] looks at the remaining tokens and either descends one or more
//! levels (consuming the tokens that named the commands) or reports that the
//! current command is terminal. [`resolve`] drives it to completion.

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::application::flagset::{FlagSet, TokenKind};
use crate::domain::CommandTree;

/// Immutable resolution state threaded through each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub command: Index,
    /// Tokens not consumed as command names, in original order.
    pub remaining: Vec<String>,
    /// Root down to `command`.
    pub path: Vec<Index>,
}

impl ResolutionContext {
    pub fn new(tree: &CommandTree, command: Index, args: Vec<String>) -> Self {
        Self {
            command,
            remaining: args,
            path: tree.path_from_root(command),
        }
    }

    fn descend(&self, tree: &CommandTree, command: Index, remaining: Vec<String>) -> Self {
        Self {
            command,
            remaining,
            path: tree.path_from_root(command),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Descend(ResolutionContext),
    Done(ResolutionContext),
}

fn without(tokens: &[String], pos: usize) -> Vec<String> {
    tokens
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != pos)
        .map(|(_, t)| t.clone())
        .collect()
}

/// One descent decision.
///
/// Only the leading run of tokens before the first flag or `=` token is
/// eligible: a full colon path from the lookup table, then a colon path
/// walked from the current command, then a space-separated chain of child
/// names. If none applies, the first plain positional (flag operands
/// skipped) is tried as a child name.
#[instrument(level = "trace", skip(tree, ctx), fields(command = %tree.name(ctx.command)))]
pub fn step(tree: &CommandTree, ctx: &ResolutionContext) -> Step {
    let eligible: Vec<&str> = ctx
        .remaining
        .iter()
        .take_while(|t| !t.starts_with('-') && !t.contains('='))
        .map(String::as_str)
        .collect();

    if let Some(&first) = eligible.first() {
        let below = |target: Index| {
            target != ctx.command && tree.path_from_root(target).contains(&ctx.command)
        };
        if let Some(target) = tree.lookup(first).filter(|&t| below(t)) {
            debug!(token = first, "resolved by full path");
            return Step::Descend(ctx.descend(tree, target, ctx.remaining[1..].to_vec()));
        }

        if first.contains(':') {
            let walked = first
                .split(':')
                .try_fold(ctx.command, |cur, seg| tree.find_child(cur, seg));
            if let Some(target) = walked {
                debug!(token = first, "resolved by colon path");
                return Step::Descend(ctx.descend(tree, target, ctx.remaining[1..].to_vec()));
            }
        }

        let mut cur = ctx.command;
        let mut consumed = 0;
        for tok in &eligible {
            match tree.find_child(cur, tok) {
                Some(child) => {
                    cur = child;
                    consumed += 1;
                }
                None => break,
            }
        }
        if consumed > 0 {
            debug!(consumed, "resolved by space path");
            return Step::Descend(ctx.descend(tree, cur, ctx.remaining[consumed..].to_vec()));
        }
    }

    let raw = tree.command(ctx.command).raw_args;
    if raw || tree.children(ctx.command).is_empty() {
        return Step::Done(ctx.clone());
    }

    // Flags may precede the subcommand: the first bare word that is not a
    // flag operand, unless a structured token or `--` comes first.
    let kinds = FlagSet::for_chain(tree, ctx.command).classify(&ctx.remaining);
    let plain = kinds
        .iter()
        .position(|k| !matches!(k, TokenKind::Flag | TokenKind::Operand))
        .filter(|&pos| kinds[pos] == TokenKind::Plain);
    if let Some(pos) = plain {
        if let Some(child) = tree.find_child(ctx.command, &ctx.remaining[pos]) {
            debug!(token = %ctx.remaining[pos], "resolved after leading flags");
            return Step::Descend(ctx.descend(tree, child, without(&ctx.remaining, pos)));
        }
    }
    Step::Done(ctx.clone())
}

/// Descend from `start` until no further command is named.
#[instrument(level = "debug", skip(tree))]
pub fn resolve(tree: &CommandTree, start: Index, args: Vec<String>) -> ResolutionContext {
    let mut ctx = ResolutionContext::new(tree, start, args);
    loop {
        match step(tree, &ctx) {
            Step::Descend(next) => ctx = next,
            Step::Done(done) => {
                debug!(command = %tree.full_name(done.command), "resolved");
                return done;
            }
        }
    }
}
