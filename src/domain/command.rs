//! Caller-facing declarations: commands, options and positional arguments.
//!
//! These are plain owned builders. Nothing here knows about parent links;
//! those are established once by [`crate::domain::CommandTree::new`].

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::application::middleware::{BoxError, HandlerFunc, HandlerResult, MiddlewareFunc};
use crate::application::{Context, Invocation};
use crate::domain::value::{Discard, Value, ValueRef};

/// Callback run after validation for an option whose flag was set.
#[derive(Clone)]
pub struct Action(Rc<dyn Fn(&dyn Value) -> Result<(), BoxError>>);

impl Action {
    pub fn new(f: impl Fn(&dyn Value) -> Result<(), BoxError> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, value: &dyn Value) -> Result<(), BoxError> {
        (self.0)(value)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}

/// Flag declaration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Opt {
    /// Long name, also the primary key. May be empty for env-only options.
    pub flag: String,
    pub description: String,
    pub required: bool,
    pub shorthand: Option<char>,
    /// Environment variables consulted in order; the first non-empty wins.
    pub envs: Vec<String>,
    pub default: String,
    #[serde(skip)]
    pub value: Option<ValueRef>,
    pub hidden: bool,
    /// Deprecation message; empty means not deprecated.
    pub deprecated: String,
    pub category: String,
    #[serde(skip)]
    pub action: Option<Action>,
}

impl Opt {
    pub fn new(flag: impl Into<String>) -> Self {
        Self {
            flag: flag.into(),
            ..Default::default()
        }
    }

    /// Option sourced only from the environment.
    pub fn from_env(env: impl Into<String>) -> Self {
        Self {
            envs: vec![env.into()],
            ..Default::default()
        }
    }

    pub fn short(mut self, c: char) -> Self {
        self.shorthand = Some(c);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn env(mut self, name: impl Into<String>) -> Self {
        self.envs.push(name.into());
        self
    }

    pub fn default_value(mut self, raw: impl Into<String>) -> Self {
        self.default = raw.into();
        self
    }

    pub fn value(mut self, value: impl Value + 'static) -> Self {
        self.value = Some(Rc::new(value));
        self
    }

    pub fn value_ref(mut self, value: ValueRef) -> Self {
        self.value = Some(value);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecated = message.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn action(mut self, f: impl Fn(&dyn Value) -> Result<(), BoxError> + 'static) -> Self {
        self.action = Some(Action::new(f));
        self
    }

    /// Flag name, falling back to the first env name.
    pub fn key(&self) -> &str {
        if self.flag.is_empty() {
            self.envs.first().map(String::as_str).unwrap_or("")
        } else {
            &self.flag
        }
    }

    /// Declared value, or a sink for declarations without one.
    pub fn value_or_discard(&self) -> ValueRef {
        self.value.clone().unwrap_or_else(|| Rc::new(Discard))
    }
}

/// Positional or structured argument declaration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Arg {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub default: String,
    #[serde(skip)]
    pub value: Option<ValueRef>,
}

impl Arg {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, raw: impl Into<String>) -> Self {
        self.default = raw.into();
        self
    }

    pub fn value(mut self, value: impl Value + 'static) -> Self {
        self.value = Some(Rc::new(value));
        self
    }

    pub fn value_ref(mut self, value: ValueRef) -> Self {
        self.value = Some(value);
        self
    }

    /// Display name; unnamed args are numbered from 1.
    pub fn display_name(&self, position: usize) -> String {
        if self.name.is_empty() {
            format!("arg{}", position + 1)
        } else {
            self.name.clone()
        }
    }
}

/// A node of the command tree as declared by the caller.
#[derive(Clone, Default)]
pub struct Command {
    /// `"name [flags] <args>"`; the first word is the command name.
    pub usage: String,
    pub aliases: Vec<String>,
    pub short: String,
    pub long: String,
    pub hidden: bool,
    pub deprecated: String,
    /// Skip flag parsing and hand every token to the handler.
    pub raw_args: bool,
    pub options: Vec<Opt>,
    pub args: Vec<Arg>,
    pub middleware: Option<MiddlewareFunc>,
    /// `None` renders help instead.
    pub handler: Option<HandlerFunc>,
    pub children: Vec<Command>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("usage", &self.usage)
            .field("aliases", &self.aliases)
            .field("hidden", &self.hidden)
            .field("deprecated", &self.deprecated)
            .field("raw_args", &self.raw_args)
            .field("options", &self.options)
            .field("args", &self.args)
            .field("middleware", &self.middleware.is_some())
            .field("handler", &self.handler.is_some())
            .field("children", &self.children)
            .finish()
    }
}

impl Command {
    pub fn new(usage: impl Into<String>) -> Self {
        Self {
            usage: usage.into(),
            ..Default::default()
        }
    }

    /// First word of the usage string.
    pub fn name(&self) -> &str {
        self.usage.split(' ').next().unwrap_or("")
    }

    /// True when `token` is this command's name or one of its aliases.
    pub fn answers_to(&self, token: &str) -> bool {
        self.name() == token || self.aliases.iter().any(|a| a == token)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn short(mut self, text: impl Into<String>) -> Self {
        self.short = text.into();
        self
    }

    pub fn long(mut self, text: impl Into<String>) -> Self {
        self.long = text.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecated = message.into();
        self
    }

    pub fn raw_args(mut self) -> Self {
        self.raw_args = true;
        self
    }

    pub fn option(mut self, opt: Opt) -> Self {
        self.options.push(opt);
        self
    }

    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn middleware(mut self, mw: MiddlewareFunc) -> Self {
        self.middleware = Some(mw);
        self
    }

    pub fn handler(
        mut self,
        f: impl Fn(&Context, &mut Invocation<'_>) -> HandlerResult + 'static,
    ) -> Self {
        self.handler = Some(Rc::new(f));
        self
    }

    pub fn child(mut self, child: Command) -> Self {
        self.children.push(child);
        self
    }
}
