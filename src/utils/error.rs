use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkyMapError {
    #[error("Input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Invalid sky map format in {}: {message}", path.display())]
    FormatError { path: PathBuf, message: String },

    #[error("Invalid input data: {message}")]
    InputError { message: String },

    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Rendering failed: {message}")]
    RenderError { message: String },

    #[error("PNG encoding failed: {0}")]
    EncodingError(#[from] png::EncodingError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    Rendering,
    Output,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SkyMapError {
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SkyMapError::FormatError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        SkyMapError::RenderError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SkyMapError::FileNotFound { .. } | SkyMapError::FormatError { .. } => {
                ErrorCategory::Input
            }
            SkyMapError::InputError { .. } => ErrorCategory::Data,
            SkyMapError::RenderError { .. } | SkyMapError::EncodingError(_) => {
                ErrorCategory::Rendering
            }
            SkyMapError::WriteError { .. } | SkyMapError::SerializationError(_) => {
                ErrorCategory::Output
            }
            SkyMapError::ConfigError { .. }
            | SkyMapError::ConfigValidationError { .. }
            | SkyMapError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            SkyMapError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Data | ErrorCategory::Rendering => {
                ErrorSeverity::High
            }
            ErrorCategory::Output => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 錯誤對應的處理建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SkyMapError::FileNotFound { .. } => {
                "Check input.path; the SMICA map must be downloaded and renamed first"
            }
            SkyMapError::FormatError { .. } => {
                "Make sure the file is a HEALPix FITS map with a binary table extension"
            }
            SkyMapError::InputError { .. } => "The map contains no samples to summarise",
            SkyMapError::WriteError { .. } => {
                "Check that the output directory is writable and the disk is not full"
            }
            SkyMapError::IoError(_) => "Check file permissions and available disk space",
            SkyMapError::RenderError { .. } | SkyMapError::EncodingError(_) => {
                "Try a lower DPI or check the render settings"
            }
            SkyMapError::SerializationError(_) => "Check output.stats_json",
            SkyMapError::ConfigError { .. }
            | SkyMapError::ConfigValidationError { .. }
            | SkyMapError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command line overrides"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SkyMapError::FileNotFound { path } => {
                format!("Cannot find the sky map file '{}'", path.display())
            }
            SkyMapError::FormatError { path, message } => {
                format!("'{}' is not a usable sky map: {}", path.display(), message)
            }
            SkyMapError::WriteError { path, .. } => {
                format!("Could not save the image to '{}'", path.display())
            }
            other => other.to_string(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, SkyMapError>;
