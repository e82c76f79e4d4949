use serde::{Deserialize, Serialize};

use crate::error::{MuxError, Result};

/// `status` value of a successful command.
pub const STATUS_SUCCESS: &str = "Success";
/// `status` value of a failed command.
pub const STATUS_FAILURE: &str = "Failure";
/// `reason` reported when the command ran but exited non-zero.
pub const REASON_NON_ZERO_EXIT_CODE: &str = "NonZeroExitCode";
/// Cause `reason` carrying the numeric exit code in its `message`.
pub const CAUSE_EXIT_CODE: &str = "ExitCode";

/// Status document the server writes on the ERROR channel when a command ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StatusCause>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusCause {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ExecStatus {
    /// Parse the raw ERROR channel contents.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Exit code of the remote command.
    ///
    /// `Success` maps to 0 and a `NonZeroExitCode` failure to the code in its
    /// `ExitCode` cause. Every other failure is an error.
    pub fn exit_code(&self) -> Result<i32> {
        match self.status.as_deref() {
            Some(STATUS_SUCCESS) => Ok(0),
            Some(STATUS_FAILURE) if self.reason.as_deref() == Some(REASON_NON_ZERO_EXIT_CODE) => {
                self.exit_code_cause().ok_or_else(|| self.failure())
            }
            _ => Err(self.failure()),
        }
    }

    fn exit_code_cause(&self) -> Option<i32> {
        self.details
            .as_ref()?
            .causes
            .iter()
            .find(|cause| cause.reason.as_deref() == Some(CAUSE_EXIT_CODE))?
            .message
            .as_deref()?
            .trim()
            .parse()
            .ok()
    }

    fn failure(&self) -> MuxError {
        let message = self
            .message
            .clone()
            .or_else(|| self.reason.clone())
            .unwrap_or_else(|| "unknown status".to_string());
        MuxError::ExecFailed(message)
    }
}

/// Terminal dimensions sent on the RESIZE channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TerminalSize {
    pub width: u16,
    pub height: u16,
}

impl TerminalSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}
