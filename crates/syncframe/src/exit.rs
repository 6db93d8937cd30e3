use std::fmt;
use std::io;

use syncframe_frame::FrameError;

// Process exit codes returned by the CLI.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::BufferOverflow { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::PayloadTooLarge { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_maps_to_data_invalid() {
        let err = frame_error(
            "decode failed",
            FrameError::BufferOverflow {
                buffered: 10,
                max: 8,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("decode failed: "));
    }

    #[test]
    fn io_kinds_map_to_codes() {
        let denied = io_error("open", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.code, PERMISSION_DENIED);
        let missing = frame_error("open", FrameError::Io(io::ErrorKind::NotFound.into()));
        assert_eq!(missing.code, FAILURE);
        let timed_out = io_error("read", io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(timed_out.code, TIMEOUT);
    }
}
