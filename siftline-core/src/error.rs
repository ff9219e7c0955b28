//! Error types for the Siftline pipeline.
//!
//! Two failure families exist: configuration errors are fatal at
//! pipeline-construction time and prevent any record from being processed,
//! while decode errors abort the current input unit and propagate unwrapped
//! through every `process` call on the stack. Clean end-of-stream and the
//! cooperative soft stop are not errors and never appear here.

use thiserror::Error;

/// Main error type for the Siftline pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (pipeline construction).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Decode errors (malformed bytes mid-container).
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors raised while building a command chain.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("Missing required setting: {key}")]
    MissingSetting { key: String },

    /// Two mutually exclusive settings are both present.
    #[error("Settings {first} and {second} are mutually exclusive")]
    ConflictingSettings { first: String, second: String },

    /// A setting was supplied that the command does not recognize.
    #[error("Unknown setting: {key}")]
    UnknownSetting { key: String },

    /// A setting is present but its value is unusable.
    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },

    /// A schema declaration could not be parsed or resolved.
    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    /// No builder is registered under the requested logical name.
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    /// A builder is already registered under this logical name.
    #[error("Command name already registered: {name}")]
    AlreadyRegistered { name: String },
}

/// Decode errors raised while reading containers from a byte input.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The input ended in the middle of a container.
    #[error("Unexpected end of input mid-container")]
    UnexpectedEnd,

    /// The input is structurally malformed.
    #[error("Corrupt input: {message}")]
    Corrupt { message: String },

    /// Writer and reader shapes disagree where no promotion applies.
    #[error("Cannot resolve writer type {writer} against reader type {reader}")]
    SchemaMismatch { writer: String, reader: String },

    /// The inbound record carries no usable byte input.
    #[error("Record has no byte stream attached under {field}")]
    MissingAttachment { field: String },

    /// A value handed to an encoder does not match the declared schema.
    #[error("Value {value} does not match schema type {schema}")]
    ValueMismatch { schema: String, value: String },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Check if this is a decode error.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }
}

impl DecodeError {
    /// Create a corrupt-input error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        DecodeError::Corrupt {
            message: msg.into(),
        }
    }
}

impl ConfigError {
    /// Create an invalid-schema error.
    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        ConfigError::InvalidSchema {
            message: msg.into(),
        }
    }
}
