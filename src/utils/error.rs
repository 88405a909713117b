use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid input on line {line}: {message}")]
    InputError { line: usize, message: String },

    #[error("Audit of {url} failed: {message}")]
    AuditError { url: String, message: String },

    #[error("Audit of {url} timed out after {seconds}s")]
    TimeoutError { url: String, seconds: u64 },

    #[error("Cannot reduce an empty sample sequence")]
    EmptySamples,

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Audit,
    Output,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BatchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BatchError::ConfigError { .. }
            | BatchError::InvalidConfigValueError { .. }
            | BatchError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            BatchError::InputError { .. } => ErrorCategory::Input,
            BatchError::ApiError(_)
            | BatchError::AuditError { .. }
            | BatchError::TimeoutError { .. }
            | BatchError::SerializationError(_) => ErrorCategory::Audit,
            BatchError::CsvError(_) | BatchError::IoError(_) => ErrorCategory::Output,
            BatchError::EmptySamples | BatchError::ProcessingError { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Audit => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Output | ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BatchError::ConfigError { .. }
            | BatchError::InvalidConfigValueError { .. }
            | BatchError::ConfigValidationError { .. } => {
                "Check the command line flags or the job file and try again"
            }
            BatchError::InputError { .. } => {
                "Each input line needs the metadata fields followed by a URL"
            }
            BatchError::ApiError(_) => "Check network access and the PageSpeed API key",
            BatchError::AuditError { .. } => {
                "Make sure the lighthouse CLI is installed and Chrome can start"
            }
            BatchError::TimeoutError { .. } => "Increase --timeout-secs or check the page",
            BatchError::SerializationError(_) => "The audit report could not be parsed",
            BatchError::CsvError(_) | BatchError::IoError(_) => {
                "Check that the input exists and the output location is writable"
            }
            BatchError::EmptySamples | BatchError::ProcessingError { .. } => {
                "Re-run with --verbose and report the log"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Input => format!("Could not read the page list: {}", self),
            ErrorCategory::Audit => format!("Audit failed: {}", self),
            ErrorCategory::Output => format!("Could not write results: {}", self),
            ErrorCategory::Internal => format!("Unexpected failure: {}", self),
        }
    }

    /// 可恢復的錯誤只會被記錄，不會中斷批次
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::Audit
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal() {
        let err = BatchError::InvalidConfigValueError {
            field: "runs".to_string(),
            value: "0".to_string(),
            reason: "Value must be at least 1".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_audit_errors_are_recoverable() {
        let err = BatchError::TimeoutError {
            url: "https://a.example".to_string(),
            seconds: 30,
        };
        assert!(err.is_recoverable());
        assert!(err.user_friendly_message().contains("timed out after 30s"));
    }
}
