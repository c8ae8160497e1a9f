//! Domain layer: declarations, values and the command tree snapshot
//!
//! This layer is independent of external concerns (no I/O, no process state).

pub mod arena;
pub mod builder;
pub mod command;
pub mod error;
pub mod format;
pub mod value;

pub use arena::{CommandNode, CommandTree, TreeIterator};
pub use builder::{global_flags, TreeBuilder};
pub use command::{Action, Arg, Command, Opt};
pub use error::{ConfigError, ConfigIssue, FormatError, ParseError, ValidationError, ValueError};
pub use format::{detect, ArgFormat, ArgValues};
pub use value::{
    validate, Bool, Discard, Duration, Enum, EnumArray, Float64, HostPort, Int64, Slot, Str,
    StringArray, Url, Validated, Value, ValueRef,
};
