//! Handlers, middleware and onion-order composition.

use std::error::Error as StdError;
use std::rc::Rc;

use itertools::Itertools;
use thiserror::Error;

use crate::application::context::Context;
use crate::application::invocation::Invocation;

pub type BoxError = Box<dyn StdError + Send + Sync>;

pub type HandlerResult = Result<(), BoxError>;

/// Terminal action of a command.
pub type HandlerFunc = Rc<dyn Fn(&Context, &mut Invocation<'_>) -> HandlerResult>;

/// Wraps a handler, returning the handler to call instead.
pub type MiddlewareFunc = Rc<dyn Fn(HandlerFunc) -> HandlerFunc>;

pub fn handler(f: impl Fn(&Context, &mut Invocation<'_>) -> HandlerResult + 'static) -> HandlerFunc {
    Rc::new(f)
}

pub fn middleware(f: impl Fn(HandlerFunc) -> HandlerFunc + 'static) -> MiddlewareFunc {
    Rc::new(f)
}

/// Compose middleware so the first one listed runs outermost:
/// `chain([a, b])(h)` executes a-before, b-before, h, b-after, a-after.
pub fn chain(middlewares: Vec<MiddlewareFunc>) -> MiddlewareFunc {
    Rc::new(move |next: HandlerFunc| {
        middlewares
            .iter()
            .rev()
            .fold(next, |inner, mw| mw(inner))
    })
}

/// Argument-count violations reported by [`require_range_args`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgCountError {
    #[error("wanted no args but got {got} [{}]", .args.join(" "))]
    NoArgs { got: usize, args: Vec<String> },

    #[error("unrecognized subcommand {0:?}")]
    UnrecognizedSubcommand(String),

    #[error("wanted {want} args but got {got} [{}]", .args.join(" "))]
    Exact {
        want: usize,
        got: usize,
        args: Vec<String>,
    },

    #[error("wanted at least {want} args but got {got}")]
    AtLeast { want: usize, got: usize },

    #[error("wanted between {start} and {end} args but got {got}")]
    Between { start: usize, end: usize, got: usize },

    #[error("invalid argument range: {start} > {end}")]
    InvertedRange { start: usize, end: usize },
}

/// Require exactly `want` positional arguments.
pub fn require_n_args(want: usize) -> MiddlewareFunc {
    require_range_args(want, Some(want))
}

/// Require between `start` and `end` (inclusive) positional arguments;
/// `None` leaves the upper bound open.
pub fn require_range_args(start: usize, end: Option<usize>) -> MiddlewareFunc {
    middleware(move |next| {
        handler(move |ctx, inv| {
            let got = inv.args().len();
            let check = match end {
                Some(end) if start == end && got != start => Err(if start == 0 {
                    if inv.has_children() {
                        ArgCountError::UnrecognizedSubcommand(inv.args()[0].clone())
                    } else {
                        ArgCountError::NoArgs {
                            got,
                            args: inv.args().to_vec(),
                        }
                    }
                } else {
                    ArgCountError::Exact {
                        want: start,
                        got,
                        args: inv.args().to_vec(),
                    }
                }),
                Some(end) if start > end => Err(ArgCountError::InvertedRange { start, end }),
                Some(end) if got < start || got > end => {
                    Err(ArgCountError::Between { start, end, got })
                }
                None if got < start => Err(ArgCountError::AtLeast { want: start, got }),
                _ => Ok(()),
            };
            check?;
            next(ctx, inv)
        })
    })
}

/// Debug rendering of a middleware list, used in traces.
pub(crate) fn describe(count: usize, names: &[String]) -> String {
    format!("{} middleware [{}]", count, names.iter().join(" > "))
}
