//! Runtime flag set: registration with override, value sources and parsing.
//!
//! Flags from several declaration levels are merged into one set; a later
//! registration of the same long name replaces the earlier one in place and
//! takes over its shorthand. Parsing follows the familiar GNU/pflag surface:
//! `--name value`, `--name=value`, `-n value`, `-nvalue`, `-n=value`, grouped
//! bare shorthands, `--` terminator and interspersed positionals.

use std::collections::HashMap;
use std::env;
use std::rc::Rc;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::application::error::FlagError;
use crate::domain::format::is_json_shaped;
use crate::domain::value::parse_bool;
use crate::domain::{CommandTree, Opt, ValueRef};

/// One registered flag.
#[derive(Debug, Clone)]
pub struct Flag {
    pub name: String,
    pub shorthand: Option<char>,
    pub usage: String,
    pub value: ValueRef,
    pub default: String,
    pub deprecated: String,
    pub no_opt_default: Option<&'static str>,
    pub hidden: bool,
    /// Set from the command line or the environment.
    pub changed: bool,
}

impl Flag {
    fn from_opt(opt: &Opt) -> Self {
        let value = opt.value_or_discard();
        Self {
            name: opt.flag.clone(),
            shorthand: opt.shorthand,
            usage: opt.description.clone(),
            no_opt_default: value.no_opt_default(),
            value,
            default: opt.default.clone(),
            deprecated: opt.deprecated.clone(),
            hidden: opt.hidden,
            changed: false,
        }
    }

    fn takes_operand(&self) -> bool {
        self.no_opt_default.is_none()
    }
}

/// Metadata-only classification of a raw token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `--name`, `-n`, `--name=v`, `-abc`
    Flag,
    /// Operand consumed by the preceding flag.
    Operand,
    /// `--`
    Terminator,
    /// Query, form or JSON shaped argument.
    Structured,
    /// Bare word; may name a subcommand.
    Plain,
    /// Anything after `--`.
    Literal,
}

#[derive(Debug, Default)]
pub struct FlagSet {
    flags: Vec<Flag>,
    index: HashMap<String, usize>,
    shorthands: HashMap<char, usize>,
    args: Vec<String>,
    notices: Vec<String>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags of every command from the root down to `idx`; deeper
    /// declarations win.
    pub fn for_chain(tree: &CommandTree, idx: Index) -> Self {
        let mut fs = Self::new();
        fs.add_options(tree.full_options(idx));
        fs
    }

    /// Register every option with a flag name; same-named flags are replaced.
    #[instrument(level = "trace", skip(self, opts))]
    pub fn add_options<'o>(&mut self, opts: impl IntoIterator<Item = &'o Opt>) {
        for opt in opts.into_iter().filter(|o| !o.flag.is_empty()) {
            let flag = Flag::from_opt(opt);
            let pos = match self.index.get(&flag.name) {
                Some(&pos) => {
                    if let Some(old) = self.flags[pos].shorthand {
                        if self.shorthands.get(&old) == Some(&pos) {
                            self.shorthands.remove(&old);
                        }
                    }
                    debug!(flag = %flag.name, "overriding inherited flag");
                    self.flags[pos] = flag;
                    pos
                }
                None => {
                    self.flags.push(flag);
                    let pos = self.flags.len() - 1;
                    self.index.insert(self.flags[pos].name.clone(), pos);
                    pos
                }
            };
            if let Some(c) = self.flags[pos].shorthand {
                self.shorthands.insert(c, pos);
            }
        }
    }

    /// Reset every value, apply compiled defaults, then overlay the
    /// environment.
    ///
    /// For each option the first environment variable with a non-empty value
    /// that the value accepts wins and marks the flag changed.
    #[instrument(level = "trace", skip(self, opts))]
    pub fn apply_sources<'o>(
        &mut self,
        opts: impl IntoIterator<Item = &'o Opt>,
    ) -> Result<(), FlagError> {
        let opts: Vec<&Opt> = opts.into_iter().collect();
        // Values live in the tree; clear what an earlier run left behind.
        for opt in &opts {
            if let Some(value) = opt.value.as_ref() {
                value.reset();
            }
        }
        for opt in opts {
            let Some(value) = opt.value.as_ref() else {
                continue;
            };
            if !opt.default.is_empty() {
                value
                    .set_default(&opt.default)
                    .map_err(|source| FlagError::InvalidDefault {
                        flag: opt.key().to_string(),
                        value: opt.default.clone(),
                        source,
                    })?;
            }
            for name in &opt.envs {
                let Ok(raw) = env::var(name) else { continue };
                if raw.is_empty() || value.set(&raw).is_err() {
                    continue;
                }
                debug!(option = %opt.key(), env = %name, "value taken from environment");
                if let Some(&pos) = self.index.get(&opt.flag) {
                    if Rc::ptr_eq(&self.flags[pos].value, value) {
                        self.flags[pos].changed = true;
                    }
                }
                break;
            }
        }
        Ok(())
    }

    /// Parse `args`, binding flags and collecting positionals. Stops at the
    /// first error.
    #[instrument(level = "debug", skip(self))]
    pub fn parse(&mut self, args: &[String]) -> Result<(), FlagError> {
        self.args.clear();
        let mut i = 0;
        while i < args.len() {
            let tok = &args[i];
            i += 1;

            if tok == "--" {
                self.args.extend(args[i..].iter().cloned());
                break;
            }
            if let Some(long) = tok.strip_prefix("--") {
                let (name, inline) = match long.split_once('=') {
                    Some((n, v)) => (n, Some(v.to_string())),
                    None => (long, None),
                };
                let pos = *self
                    .index
                    .get(name)
                    .ok_or_else(|| FlagError::UnknownFlag(name.to_string()))?;
                let raw = match (inline, self.flags[pos].no_opt_default) {
                    (Some(v), _) => v,
                    (None, Some(d)) => d.to_string(),
                    (None, None) if i < args.len() => {
                        i += 1;
                        args[i - 1].clone()
                    }
                    (None, None) => return Err(FlagError::MissingOperand(format!("--{name}"))),
                };
                self.set_at(pos, &raw)?;
                continue;
            }
            if tok.len() > 1 && tok.starts_with('-') {
                let chars: Vec<char> = tok[1..].chars().collect();
                let mut j = 0;
                while j < chars.len() {
                    let c = chars[j];
                    let pos = *self
                        .shorthands
                        .get(&c)
                        .ok_or_else(|| FlagError::UnknownShorthand {
                            shorthand: c,
                            token: tok.clone(),
                        })?;
                    let rest: String = chars[j + 1..].iter().collect();
                    if let Some(v) = rest.strip_prefix('=') {
                        self.set_at(pos, v)?;
                        break;
                    }
                    if let Some(d) = self.flags[pos].no_opt_default {
                        self.set_at(pos, d)?;
                        j += 1;
                        continue;
                    }
                    if !rest.is_empty() {
                        self.set_at(pos, &rest)?;
                    } else if i < args.len() {
                        i += 1;
                        self.set_at(pos, &args[i - 1])?;
                    } else {
                        return Err(FlagError::MissingOperand(format!("-{c}")));
                    }
                    break;
                }
                continue;
            }
            self.args.push(tok.clone());
        }
        Ok(())
    }

    fn set_at(&mut self, pos: usize, raw: &str) -> Result<(), FlagError> {
        let flag = &mut self.flags[pos];
        flag.value
            .set(raw)
            .map_err(|source| FlagError::InvalidValue {
                flag: flag.name.clone(),
                value: raw.to_string(),
                source,
            })?;
        flag.changed = true;
        if !flag.deprecated.is_empty() {
            self.notices.push(format!(
                "Flag --{} has been deprecated, {}",
                flag.name, flag.deprecated
            ));
        }
        Ok(())
    }

    /// Classify tokens without touching any value.
    ///
    /// Unknown flags are assumed to take no operand.
    pub fn classify(&self, args: &[String]) -> Vec<TokenKind> {
        let mut kinds = Vec::with_capacity(args.len());
        let mut i = 0;
        while i < args.len() {
            let tok = &args[i];
            i += 1;

            if tok == "--" {
                kinds.push(TokenKind::Terminator);
                kinds.extend(std::iter::repeat(TokenKind::Literal).take(args.len() - i));
                break;
            }
            let wants_operand = if let Some(long) = tok.strip_prefix("--") {
                !long.contains('=')
                    && self
                        .lookup(long)
                        .is_some_and(Flag::takes_operand)
            } else if tok.len() > 1 && tok.starts_with('-') {
                self.group_wants_operand(&tok[1..])
            } else {
                let kind = if tok.contains('=') || is_json_shaped(tok) {
                    TokenKind::Structured
                } else {
                    TokenKind::Plain
                };
                kinds.push(kind);
                continue;
            };
            kinds.push(TokenKind::Flag);
            if wants_operand && i < args.len() {
                kinds.push(TokenKind::Operand);
                i += 1;
            }
        }
        kinds
    }

    /// True when a shorthand group ends in a flag still missing its operand.
    fn group_wants_operand(&self, group: &str) -> bool {
        let chars: Vec<char> = group.chars().collect();
        for (j, c) in chars.iter().enumerate() {
            let Some(&pos) = self.shorthands.get(c) else {
                return false;
            };
            if self.flags[pos].takes_operand() {
                return j + 1 == chars.len();
            }
        }
        false
    }

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.index.get(name).map(|&pos| &self.flags[pos])
    }

    pub fn changed(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|f| f.changed)
    }

    /// Boolean view of a flag's current value; an empty rendering is false.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.lookup(name).and_then(|f| match f.value.render().as_str() {
            "" => Some(false),
            rendered => parse_bool(rendered),
        })
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.lookup(name).map(|f| f.value.render())
    }

    /// Positional tokens left after the last [`FlagSet::parse`].
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Registered flags in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    /// Deprecation notices produced while parsing, drained.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bool, Int64, Str, StringArray};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> (FlagSet, Str, Bool, Int64) {
        let name = Str::new();
        let verbose = Bool::new();
        let count = Int64::new();
        let opts = vec![
            Opt::new("name").short('n').value(name.clone()),
            Opt::new("verbose").short('V').value(verbose.clone()),
            Opt::new("count").short('c').value(count.clone()),
        ];
        let mut fs = FlagSet::new();
        fs.add_options(&opts);
        (fs, name, verbose, count)
    }

    #[test]
    fn test_parse_long_forms() {
        let (mut fs, name, verbose, count) = sample();

        fs.parse(&strings(&["--name", "bob", "--verbose", "pos", "--count=3"]))
            .unwrap();

        assert_eq!(name.value(), "bob");
        assert!(verbose.value());
        assert_eq!(count.value(), 3);
        assert_eq!(fs.args(), strings(&["pos"]).as_slice());
    }

    #[test]
    fn test_parse_short_forms() {
        let (mut fs, name, verbose, count) = sample();

        fs.parse(&strings(&["-Vc5", "-n=alice"])).unwrap();

        assert!(verbose.value());
        assert_eq!(count.value(), 5);
        assert_eq!(name.value(), "alice");
    }

    #[test]
    fn test_parse_terminator_keeps_rest() {
        let (mut fs, _, verbose, _) = sample();

        fs.parse(&strings(&["a", "--", "--verbose", "-"])).unwrap();

        assert!(!verbose.value());
        assert_eq!(fs.args(), strings(&["a", "--verbose", "-"]).as_slice());
    }

    #[test]
    fn test_parse_errors() {
        let (mut fs, ..) = sample();
        assert_eq!(
            fs.parse(&strings(&["--nope"])),
            Err(FlagError::UnknownFlag("nope".into()))
        );
        assert_eq!(
            fs.parse(&strings(&["--name"])),
            Err(FlagError::MissingOperand("--name".into()))
        );
        assert!(matches!(
            fs.parse(&strings(&["--count", "x"])),
            Err(FlagError::InvalidValue { .. })
        ));
        assert!(matches!(
            fs.parse(&strings(&["-z"])),
            Err(FlagError::UnknownShorthand { shorthand: 'z', .. })
        ));
    }

    #[test]
    fn test_override_replaces_flag_and_shorthand() {
        let parent = Str::new();
        let child = Str::new();
        let mut fs = FlagSet::new();
        fs.add_options(&[Opt::new("target").short('t').value(parent.clone())]);
        fs.add_options(&[Opt::new("target").short('t').value(child.clone())]);

        fs.parse(&strings(&["-t", "x"])).unwrap();

        assert_eq!(child.value(), "x");
        assert_eq!(parent.value(), "");
        assert_eq!(fs.iter().count(), 1);
    }

    #[test]
    fn test_defaults_are_applied_and_list_default_is_replaced() {
        let tags = StringArray::new();
        let opts = vec![Opt::new("tags").default_value("a,b").value(tags.clone())];
        let mut fs = FlagSet::new();
        fs.add_options(&opts);
        fs.apply_sources(&opts).unwrap();
        assert_eq!(tags.value(), strings(&["a", "b"]));

        fs.parse(&strings(&["--tags", "c", "--tags", "d"])).unwrap();
        assert_eq!(tags.value(), strings(&["c", "d"]));
        assert!(!fs.changed("nope"));
        assert!(fs.changed("tags"));
    }

    #[test]
    fn test_env_overlay_first_non_empty_wins() {
        std::env::set_var("CMDTREE_FLAGSET_UNIT_EMPTY", "");
        std::env::set_var("CMDTREE_FLAGSET_UNIT_SET", "from-env");
        let token = Str::new();
        let opts = vec![Opt::new("token")
            .env("CMDTREE_FLAGSET_UNIT_MISSING")
            .env("CMDTREE_FLAGSET_UNIT_EMPTY")
            .env("CMDTREE_FLAGSET_UNIT_SET")
            .value(token.clone())];
        let mut fs = FlagSet::new();
        fs.add_options(&opts);

        fs.apply_sources(&opts).unwrap();

        assert_eq!(token.value(), "from-env");
        assert!(fs.changed("token"));
    }

    #[test]
    fn test_deprecated_flag_records_notice() {
        let old = Str::new();
        let opts = vec![Opt::new("old").deprecated("use --new").value(old.clone())];
        let mut fs = FlagSet::new();
        fs.add_options(&opts);

        fs.parse(&strings(&["--old", "v"])).unwrap();

        assert_eq!(old.value(), "v");
        assert_eq!(
            fs.take_notices(),
            vec!["Flag --old has been deprecated, use --new".to_string()]
        );
    }

    #[test]
    fn test_classify_skips_operands() {
        let (fs, ..) = sample();
        let kinds = fs.classify(&strings(&[
            "--name", "sub", "-V", "child", "k=v", "--", "x",
        ]));
        assert_eq!(
            kinds,
            vec![
                TokenKind::Flag,
                TokenKind::Operand,
                TokenKind::Flag,
                TokenKind::Plain,
                TokenKind::Structured,
                TokenKind::Terminator,
                TokenKind::Literal,
            ]
        );
    }
}
