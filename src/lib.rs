//! Nested command trees for CLIs.
//!
//! A [`Command`] tree is declared once, frozen into a [`CommandTree`]
//! and then run any number of times:
//!
//! ```no_run
//! use std::io::Write;
//!
//! use cmdtree::{Command, CommandTree};
//!
//! let tree = CommandTree::new(
//!     Command::new("app").child(
//!         Command::new("hello <name>").handler(|_ctx, inv| {
//!             let args = inv.args().join(" ");
//!             writeln!(inv.stdout(), "hello {}", args)?;
//!             Ok(())
//!         }),
//!     ),
//! )?;
//! tree.invoke(["hello", "world"])
//!     .with_stdout(std::io::stdout())
//!     .run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Layers:
//! - `domain`: declarations, values, structured-argument decoding, tree snapshot
//! - `application`: resolution, flag parsing, binding, middleware, dispatch
//! - `cli`: help pages and listings
//! - `config`: engine settings

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod util;

pub use application::{
    chain, handler, middleware, require_n_args, require_range_args, BoundArg, Context, Error,
    FlagSet, HandlerFunc, HandlerResult, Invocation, MiddlewareFunc, Result,
};
pub use config::Settings;
pub use domain::{
    validate, Arg, Bool, Command, CommandTree, Discard, Duration, Enum, EnumArray, Float64,
    HostPort, Int64, Opt, Slot, Str, StringArray, Url, Value,
};
