use std::fmt;
use std::path::Path;

use keyplace_export::svg::SvgError;
use keyplace_pcb::PcbError;

/// Process exit status for each failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad flags or flag combinations.
    Usage = 1,
    /// Layout, board or config could not be read or is malformed.
    Input = 2,
    /// Rendering, placement or writing results failed.
    Processing = 3,
}

#[derive(Debug)]
pub struct CliError {
    pub code: ErrorCode,
    pub message: String,
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Usage,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Input,
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Processing,
            message: message.into(),
        }
    }

    pub fn read(path: &Path, err: &std::io::Error) -> Self {
        Self::input(format!("Could not read {}: {err}", path.display()))
    }

    pub fn write(path: &Path, err: &std::io::Error) -> Self {
        Self::processing(format!("Could not write {}: {err}", path.display()))
    }

    pub fn exit_status(&self) -> u8 {
        self.code as u8
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<keyplace_parser::Error> for CliError {
    fn from(err: keyplace_parser::Error) -> Self {
        Self::input(err.to_string())
    }
}

impl From<SvgError> for CliError {
    fn from(err: SvgError) -> Self {
        Self::processing(err.to_string())
    }
}

/// Unreadable or unparsable boards are input errors. A board that cannot take the layout, or
/// cannot be written back, is a processing error.
impl From<PcbError> for CliError {
    fn from(err: PcbError) -> Self {
        match err {
            PcbError::Read { .. } | PcbError::Parse { .. } => Self::input(err.to_string()),
            PcbError::MissingFootprint { .. }
            | PcbError::NotEnoughReferences { .. }
            | PcbError::Write { .. } => Self::processing(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::processing(err.to_string())
    }
}
