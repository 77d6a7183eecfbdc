//! Error types for camtrap.

use std::path::PathBuf;

/// Result type alias for camtrap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for camtrap.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file does not exist.
    #[error("config file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a YAML configuration file.
    #[error("failed to parse config file '{path}': {source}")]
    ConfigParseYaml {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Failed to parse a TOML configuration file.
    #[error("failed to parse config file '{path}': {source}")]
    ConfigParseToml {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Required configuration keys are absent.
    #[error("Missing required config fields: {}", fields.join(", "))]
    MissingConfigFields {
        /// Names of the missing keys, in declaration order.
        fields: Vec<&'static str>,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Unknown classifier backbone name.
    #[error("unknown classifier_base '{name}' (known: {known})")]
    UnknownClassifierBase {
        /// Requested backbone name.
        name: String,
        /// Comma-separated list of known backbones.
        known: String,
    },

    /// Labels file does not exist.
    #[error("labels file not found: {path}")]
    LabelsFileNotFound {
        /// Path to the missing labels file.
        path: PathBuf,
    },

    /// Failed to read labels file.
    #[error("failed to read labels file '{path}'")]
    LabelsRead {
        /// Path to the labels file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Labels file contains no usable entries.
    #[error("No labels found in {path}")]
    NoLabels {
        /// Path to the labels file.
        path: PathBuf,
    },

    /// Image folder does not exist.
    #[error("Image folder not found: {path}")]
    ImageFolderNotFound {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// Image folder path is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// Model file does not exist.
    #[error("model file not found: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: PathBuf,
    },

    /// Failed to build an ONNX Runtime session.
    #[error("failed to load model '{path}': {reason}")]
    ModelLoad {
        /// Path to the model file.
        path: PathBuf,
        /// Description of the load failure.
        reason: String,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Classifier output width does not match the label file.
    #[error("classifier produces {outputs} scores but {labels} labels were loaded")]
    LabelMismatch {
        /// Width of the classifier output.
        outputs: usize,
        /// Number of labels in the label file.
        labels: usize,
    },

    /// Failed to decode an image.
    #[error("failed to decode image '{path}'")]
    ImageDecode {
        /// Path to the image.
        path: PathBuf,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Failed to create output directory.
    #[error("failed to create output directory '{path}'")]
    OutputDirCreateFailed {
        /// Path to the output directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write CSV output file.
    #[error("failed to write CSV output file '{path}'")]
    CsvWrite {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write JSON output file.
    #[error("failed to write JSON output file '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Whether this error means a named input file or folder is missing.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::LabelsFileNotFound { .. }
                | Self::ImageFolderNotFound { .. }
                | Self::ModelFileNotFound { .. }
        )
    }

    /// This error and its sources joined into one line.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        message
    }

    /// Whether this error comes from invalid user configuration.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseYaml { .. }
                | Self::ConfigParseToml { .. }
                | Self::MissingConfigFields { .. }
                | Self::ConfigValidation { .. }
                | Self::UnknownClassifierBase { .. }
                | Self::NoLabels { .. }
                | Self::NotADirectory { .. }
                | Self::LabelMismatch { .. }
        )
    }
}
