//! Standard exit codes (BSD sysexits.h compatible)

use crate::application::Error;

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error
pub const DATAERR: i32 = 65;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;

/// Process status for a failed run.
pub fn for_error(err: &Error) -> i32 {
    match err {
        e if e.is_usage() => USAGE,
        Error::Config(_) | Error::Settings(_) => CONFIG,
        Error::Action { .. } => DATAERR,
        Error::Io { .. } => IOERR,
        _ => SOFTWARE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::UnknownSubcommandError;

    #[test]
    fn test_usage_errors_map_to_usage() {
        let err = Error::MissingRequired(vec!["name".into()]);
        assert_eq!(for_error(&err), USAGE);

        let err = Error::from(UnknownSubcommandError {
            args: vec!["nope".into()],
        });
        assert_eq!(for_error(&err), USAGE);
    }

    #[test]
    fn test_handler_error_maps_to_software() {
        let err = Error::Handler {
            command: "app run".into(),
            source: "boom".into(),
        };
        assert_eq!(for_error(&err), SOFTWARE);
    }
}
