//! One end-to-end run of a command tree.
//!
//! Order of a run: entry-point (argv0) insertion, resolution, deprecation
//! warnings, flag merging with defaults and environment, a single flag parse,
//! global short-circuits (`--list-commands`, `--list-flags`, `--version`),
//! required-option validation, option actions, argument binding, and finally
//! help or the middleware-wrapped handler.

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::io::{self, Read, Write};
use std::path::Path;

use generational_arena::Index;
use tracing::{debug, instrument, warn};

use crate::application::binding::{bind_args, synthesize_args, BoundArg};
use crate::application::context::Context;
use crate::application::error::{Error, FlagError, Result};
use crate::application::error_ext::IoResultExt;
use crate::application::flagset::FlagSet;
use crate::application::middleware::{chain, describe, MiddlewareFunc};
use crate::application::resolver::resolve;
use crate::cli;
use crate::config::Settings;
use crate::domain::{Command, CommandTree, Opt};

/// A single execution of a [`CommandTree`].
///
/// Created by [`CommandTree::invoke`]; not live until [`Invocation::run`].
pub struct Invocation<'a> {
    tree: &'a CommandTree,
    command: Index,
    args: Vec<String>,
    flags: FlagSet,
    bound_args: Vec<BoundArg>,
    stdout: Box<dyn Write + 'a>,
    stderr: Box<dyn Write + 'a>,
    stdin: Box<dyn Read + 'a>,
    /// Arbitrary data shared between middleware and handler.
    pub annotations: BTreeMap<String, serde_json::Value>,
    ctx: Context,
    argv0: Option<String>,
    settings: Settings,
}

impl CommandTree {
    /// Prepare a run with `args` (program name excluded) and discarded stdio.
    pub fn invoke<I, S>(&self, args: I) -> Invocation<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            tree: self,
            command: self.root(),
            args: args.into_iter().map(Into::into).collect(),
            flags: FlagSet::new(),
            bound_args: Vec::new(),
            stdout: Box::new(io::sink()),
            stderr: Box::new(io::sink()),
            stdin: Box::new(io::empty()),
            annotations: BTreeMap::new(),
            ctx: Context::background(),
            argv0: None,
            settings: Settings::default(),
        }
    }
}

impl<'a> Invocation<'a> {
    pub fn with_stdout(mut self, w: impl Write + 'a) -> Self {
        self.stdout = Box::new(w);
        self
    }

    pub fn with_stderr(mut self, w: impl Write + 'a) -> Self {
        self.stderr = Box::new(w);
        self
    }

    pub fn with_stdin(mut self, r: impl Read + 'a) -> Self {
        self.stdin = Box::new(r);
        self
    }

    /// Entry-point name, e.g. the symlink the binary was started as.
    pub fn with_argv0(mut self, name: impl Into<String>) -> Self {
        self.argv0 = Some(name.into());
        self
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Process arguments, program name and stdio.
    pub fn with_os(mut self) -> Self {
        let mut argv = env::args();
        self.argv0 = argv.next().and_then(|p| {
            Path::new(&p)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        });
        self.args = argv.collect();
        self.stdout = Box::new(io::stdout());
        self.stderr = Box::new(io::stderr());
        self.stdin = Box::new(io::stdin());
        self
    }

    pub fn tree(&self) -> &'a CommandTree {
        self.tree
    }

    /// The resolved command (the root before `run`).
    pub fn command(&self) -> &'a Command {
        self.tree.command(self.command)
    }

    pub fn command_index(&self) -> Index {
        self.command
    }

    pub fn full_name(&self) -> String {
        self.tree.full_name(self.command)
    }

    pub fn has_children(&self) -> bool {
        !self.tree.children(self.command).is_empty()
    }

    /// Positional tokens left after flag parsing.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// Declared arguments after binding, or `arg1..argN` when none are declared.
    pub fn bound_args(&self) -> &[BoundArg] {
        &self.bound_args
    }

    /// Rendered value of a bound argument.
    pub fn arg(&self, name: &str) -> Option<String> {
        self.bound_args
            .iter()
            .find(|a| a.name == name)
            .map(BoundArg::render)
    }

    pub fn stdout(&mut self) -> &mut (dyn Write + 'a) {
        &mut *self.stdout
    }

    pub fn stderr(&mut self) -> &mut (dyn Write + 'a) {
        &mut *self.stderr
    }

    pub fn stdin(&mut self) -> &mut (dyn Read + 'a) {
        &mut *self.stdin
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Previous and current word, as completion hosts see them.
    pub fn cur_words(&self) -> (&str, &str) {
        match self.args.as_slice() {
            [] => ("", ""),
            [cur] => ("", cur),
            [.., prev, cur] => (prev, cur),
        }
    }

    /// True when `token` names a command by itself: a top-level command
    /// (optionally followed by `:child`) or a full colon path below the root.
    fn names_command(&self, token: &str) -> bool {
        let root = self.tree.root();
        let head = token.split(':').next().unwrap_or(token);
        self.tree.find_child(root, head).is_some()
            || self.tree.lookup(token).is_some_and(|idx| idx != root)
    }

    /// Prepend the entry-point command unless the explicit args already
    /// start with a command.
    fn apply_argv0(&self, mut args: Vec<String>) -> Vec<String> {
        let Some(name) = self.argv0.as_deref() else {
            return args;
        };
        let root = self.tree.root();
        let Some(entry) = self.tree.find_child(root, name) else {
            return args;
        };
        let explicit = args.first().is_some_and(|first| self.names_command(first));
        if !explicit {
            debug!(argv0 = name, "dispatching by entry-point name");
            args.insert(0, self.tree.name(entry).to_string());
        }
        args
    }

    fn warn_deprecated(&mut self, path: &[Index]) -> Result<()> {
        if !self.settings.deprecation_warnings {
            return Ok(());
        }
        for &idx in path {
            let cmd = self.tree.command(idx);
            if cmd.deprecated.is_empty() {
                continue;
            }
            let full_name = self.tree.full_name(idx);
            warn!(command = %full_name, "deprecated command");
            writeln!(
                self.stderr,
                "{} {:?} is deprecated!. {}",
                cli::output::header("warning", self.settings.color),
                full_name,
                cmd.deprecated
            )
            .io_context("write deprecation warning")?;
        }
        Ok(())
    }

    fn env_satisfies(&self, opt: &Opt) -> bool {
        if self.settings.strict_required_env {
            opt.envs
                .iter()
                .any(|e| env::var(e).is_ok_and(|v| !v.is_empty()))
        } else {
            !opt.envs.is_empty()
        }
    }

    /// Names of required options of the resolved command without a source.
    fn missing_required(&self) -> Vec<String> {
        self.command()
            .options
            .iter()
            .filter(|opt| opt.required)
            .filter(|opt| {
                let changed = !opt.flag.is_empty() && self.flags.changed(&opt.flag);
                !(changed || !opt.default.is_empty() || self.env_satisfies(opt))
            })
            .map(|opt| opt.key().to_string())
            .collect()
    }

    /// Run actions of changed flags, most specific declaration first.
    fn run_actions(&self) -> Result<()> {
        let mut done = HashSet::new();
        for opt in self.tree.full_options(self.command).into_iter().rev() {
            let Some(action) = opt.action.as_ref() else {
                continue;
            };
            if opt.flag.is_empty() || done.contains(opt.flag.as_str()) {
                continue;
            }
            let Some(flag) = self.flags.lookup(&opt.flag).filter(|f| f.changed) else {
                continue;
            };
            action
                .call(flag.value.as_ref())
                .map_err(|source| Error::Action {
                    flag: opt.flag.clone(),
                    source,
                })?;
            done.insert(opt.flag.as_str());
        }
        Ok(())
    }

    fn middleware_chain(&self) -> MiddlewareFunc {
        let path = self.tree.path_from_root(self.command);
        let owners: Vec<String> = path
            .iter()
            .filter(|&&i| self.tree.command(i).middleware.is_some())
            .map(|&i| self.tree.name(i).to_string())
            .collect();
        debug!("{}", describe(owners.len(), &owners));
        chain(
            path.iter()
                .filter_map(|&i| self.tree.command(i).middleware.clone())
                .collect(),
        )
    }

    /// Execute the invocation.
    #[instrument(level = "debug", skip(self), fields(args = ?self.args))]
    pub fn run(mut self) -> Result<()> {
        let tree = self.tree;
        let args = std::mem::take(&mut self.args);
        let args = self.apply_argv0(args);

        let resolved = resolve(tree, tree.root(), args);
        self.command = resolved.command;
        let cmd = tree.command(resolved.command);
        let full_name = tree.full_name(resolved.command);

        self.warn_deprecated(&resolved.path)?;

        let mut flags = FlagSet::for_chain(tree, resolved.command);
        let flag_error = |source: FlagError| Error::FlagParse {
            command: full_name.clone(),
            args: resolved.remaining.clone(),
            source,
        };
        flags
            .apply_sources(tree.full_options(resolved.command))
            .map_err(flag_error)?;

        let parsed = if cmd.raw_args {
            Ok(())
        } else {
            flags.parse(&resolved.remaining)
        };
        for notice in flags.take_notices() {
            writeln!(self.stderr, "{}", notice).io_context("write flag notice")?;
        }
        self.args = if cmd.raw_args {
            resolved.remaining.clone()
        } else {
            flags.args().to_vec()
        };
        self.flags = flags;

        if self.flags.get_bool("list-commands") == Some(true) {
            return cli::listing::print_commands(tree, &mut self.stdout, self.settings.color);
        }
        if self.flags.get_bool("list-flags") == Some(true) {
            return cli::listing::print_flags(tree, &mut self.stdout, self.settings.color);
        }
        if self.flags.get_bool("version") == Some(true) {
            let version = tree.version().unwrap_or("unknown");
            writeln!(self.stdout, "{} {}", tree.name(tree.root()), version)
                .io_context("write version")?;
            return Ok(());
        }
        if !cmd.raw_args {
            parsed.map_err(flag_error)?;
        }

        let help = self.flags.get_bool("help") == Some(true);
        if !help {
            let missing = self.missing_required();
            if !missing.is_empty() {
                return Err(Error::MissingRequired(missing));
            }
            self.run_actions()?;
            self.bound_args = if cmd.args.is_empty() {
                synthesize_args(&self.args)
            } else {
                bind_args(&cmd.args, &self.args)?
            };
        }

        let ctx = self.ctx.child();
        self.ctx = ctx.clone();
        let outcome = match cmd.handler.clone() {
            Some(handler) if !help => {
                let wrapped = self.middleware_chain()(handler);
                wrapped(&ctx, &mut self).map_err(|source| Error::Handler {
                    command: full_name.clone(),
                    source,
                })
            }
            _ => cli::help::show_help(&mut self),
        };
        ctx.cancel();
        outcome
    }
}
