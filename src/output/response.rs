//! The `{success, data, error}` envelope printed on stdout, and the exit
//! code each error class maps to.

use std::io::{self, Write};

use devdocs::error::Hint;
use devdocs::{Error, ErrorCode, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code.as_str(),
            message: err.message.clone(),
            details: err.details.clone(),
            hints: err.hints.clone(),
            retryable: err.retryable,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl Envelope<()> {
    pub fn failed(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.into()),
        }
    }
}

fn write_stdout<T: Serialize>(envelope: &Envelope<T>) -> Result<()> {
    let payload = serde_json::to_string_pretty(envelope)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize response".to_string())))?;

    match writeln!(io::stdout().lock(), "{}", payload) {
        Ok(()) => Ok(()),
        // `devdocs plan | head` closes the pipe early.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(Error::internal_io(e.to_string(), Some("write stdout".to_string()))),
    }
}

/// Serialize a command's output, or turn its error into the matching exit code.
pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    let (data, exit_code) = match result {
        Ok(ok) => ok,
        Err(err) => {
            let code = exit_code_for(err.code);
            return (Err(err), code);
        }
    };

    match serde_json::to_value(data) {
        Ok(value) => (Ok(value), exit_code),
        Err(e) => (
            Err(Error::internal_json(e.to_string(), Some("serialize response".to_string()))),
            1,
        ),
    }
}

fn exit_code_for(code: ErrorCode) -> i32 {
    use ErrorCode::*;

    match code {
        ConfigMissingKey | ConfigInvalidYaml | ConfigInvalidJson | ConfigInvalidValue
        | ValidationMissingArgument | ValidationInvalidArgument => 2,
        CommandFailed | CommandTimeout | CommandSpawnFailed | DownloadFailed
        | DisplayStartFailed | GitCommandFailed => 20,
        InternalIoError | InternalJsonError | InternalUnexpected => 1,
    }
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => write_stdout(&Envelope::ok(data)),
        Err(err) => write_stdout(&Envelope::failed(&err)),
    }
}
