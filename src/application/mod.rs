//! Application layer: resolution, flag parsing, binding and dispatch
//!
//! This layer drives one run over an immutable domain snapshot and owns
//! the only I/O of the engine (the invocation's injected streams).

pub mod binding;
pub mod context;
pub mod error;
pub mod error_ext;
pub mod flagset;
pub mod invocation;
pub mod middleware;
pub mod resolver;

pub use binding::{bind_args, BoundArg};
pub use context::Context;
pub use error::{ArgError, Error, FlagError, Result, UnknownSubcommandError};
pub use error_ext::IoResultExt;
pub use flagset::{Flag, FlagSet};
pub use invocation::Invocation;
pub use middleware::{
    chain, handler, middleware, require_n_args, require_range_args, ArgCountError, BoxError,
    HandlerFunc, HandlerResult, MiddlewareFunc,
};
pub use resolver::{resolve, step, ResolutionContext, Step};
