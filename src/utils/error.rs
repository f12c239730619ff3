use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("No document supplied: an artifact is required before dispatching")]
    MissingArtifact,

    #[error("Invalid dispatch request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown service: {service_id}")]
    UnknownService { service_id: String },

    #[error("Export failed for '{filename}': {message}")]
    ExportError { filename: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Input,
    Network,
    Storage,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DispatchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DispatchError::HttpError(_) => ErrorCategory::Network,
            DispatchError::IoError(_) | DispatchError::ExportError { .. } => ErrorCategory::Storage,
            DispatchError::SerializationError(_) => ErrorCategory::Data,
            DispatchError::ConfigError { .. }
            | DispatchError::ConfigValidationError { .. }
            | DispatchError::InvalidConfigValueError { .. }
            | DispatchError::MissingConfigError { .. } => ErrorCategory::Config,
            DispatchError::MissingArtifact
            | DispatchError::InvalidRequest { .. }
            | DispatchError::UnknownService { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Config | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DispatchError::HttpError(_) => {
                "Check that the gateway or service is reachable and try again".to_string()
            }
            DispatchError::IoError(_) => {
                "Check that the path exists and is readable/writable".to_string()
            }
            DispatchError::SerializationError(_) => {
                "The data could not be (de)serialized as JSON; inspect the file contents".to_string()
            }
            DispatchError::ConfigError { .. } | DispatchError::ConfigValidationError { .. } => {
                "Fix the configuration file (see dispatch.example.toml)".to_string()
            }
            DispatchError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' in the configuration", field)
            }
            DispatchError::MissingConfigError { field } => {
                format!("Add '{}' to the configuration file or pass it on the command line", field)
            }
            DispatchError::MissingArtifact => {
                "Pass a non-empty document with --file".to_string()
            }
            DispatchError::InvalidRequest { .. } => {
                "List every service id only once".to_string()
            }
            DispatchError::UnknownService { .. } => {
                "Run `doc-dispatch services` to list known service ids".to_string()
            }
            DispatchError::ExportError { .. } => {
                "Check the output directory and the file name".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DispatchError::HttpError(e) if e.is_timeout() => {
                "The request timed out".to_string()
            }
            DispatchError::HttpError(e) if e.is_connect() => {
                "Could not connect to the remote endpoint".to_string()
            }
            DispatchError::MissingArtifact => "No document selected".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
