use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidYaml,
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,

    CommandFailed,
    CommandTimeout,
    CommandSpawnFailed,

    DownloadFailed,
    DisplayStartFailed,
    GitCommandFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidYaml => "config.invalid_yaml",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::CommandFailed => "command.failed",
            ErrorCode::CommandTimeout => "command.timeout",
            ErrorCode::CommandSpawnFailed => "command.spawn_failed",

            ErrorCode::DownloadFailed => "download.failed",
            ErrorCode::DisplayStartFailed => "display.start_failed",
            ErrorCode::GitCommandFailed => "git.command_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigParseDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

/// Captured state of a failed or timed-out child command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub label: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandTimeoutDetails {
    pub label: String,
    pub command: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFailedDetails {
    pub url: String,
    pub destination: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let details = to_details(ConfigMissingKeyDetails {
            key: key.into(),
            path,
        });
        Self::new(
            ErrorCode::ConfigMissingKey,
            "Missing required configuration key",
            details,
        )
    }

    pub fn config_invalid_yaml(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        let details = to_details(ConfigParseDetails {
            path: path.into(),
            error: err.to_string(),
        });
        Self::new(
            ErrorCode::ConfigInvalidYaml,
            "Invalid YAML in configuration",
            details,
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigParseDetails {
            path: path.into(),
            error: err.to_string(),
        });
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.clone(),
        });
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid configuration value: {}", problem),
            details,
        )
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        let details = to_details(MissingArgumentDetails { args });
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            details,
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.clone(),
            id,
            tried,
        });
        Self::new(ErrorCode::ValidationInvalidArgument, problem, details)
    }

    pub fn command_failed(details: CommandFailedDetails) -> Self {
        let message = format!(
            "'{}' exited with code {}",
            details.label, details.exit_code
        );
        Self::new(ErrorCode::CommandFailed, message, to_details(details))
    }

    pub fn command_timeout(
        label: impl Into<String>,
        command: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let label = label.into();
        let message = format!("'{}' timed out after {}s", label, timeout_secs);
        let details = to_details(CommandTimeoutDetails {
            label,
            command: command.into(),
            timeout_secs,
        });
        Self::new(ErrorCode::CommandTimeout, message, details)
    }

    pub fn command_spawn_failed(command: impl Into<String>, err: impl std::fmt::Display) -> Self {
        let command = command.into();
        Self::new(
            ErrorCode::CommandSpawnFailed,
            format!("Failed to start '{}': {}", command, err),
            serde_json::json!({ "command": command, "error": err.to_string() }),
        )
    }

    pub fn download_failed(
        url: impl Into<String>,
        destination: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        let url = url.into();
        let details = to_details(DownloadFailedDetails {
            url: url.clone(),
            destination: destination.into(),
            error: err.to_string(),
        });
        Self::new(
            ErrorCode::DownloadFailed,
            format!("Download of {} failed", url),
            details,
        )
        .with_retryable(true)
    }

    pub fn display_start_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DisplayStartFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn git_command_failed(details: CommandFailedDetails) -> Self {
        let message = format!(
            "git step '{}' exited with code {}",
            details.label, details.exit_code
        );
        Self::new(ErrorCode::GitCommandFailed, message, to_details(details))
            .with_hint("Check the output repository checkout and push credentials")
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        let message = match &context {
            Some(ctx) => format!("I/O error ({}): {}", ctx, error),
            None => format!("I/O error: {}", error),
        };
        let details = to_details(InternalIoErrorDetails { error, context });
        Self::new(ErrorCode::InternalIoError, message, details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = serde_json::json!({ "error": error.into(), "context": context });
        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }
}
