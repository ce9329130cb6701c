use thiserror::Error;

use pricesync_core::{ConfigError, CoreError, FieldErrors, ValidationError, WarehouseError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid parameters: {}", summarize(.0))]
    InvalidParameters(FieldErrors),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] WarehouseError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::InvalidParameters(_) | Self::Config(_) => 2,
            Self::Serialization(_) => 4,
            Self::Storage(_) | Self::Core(_) | Self::Command(_) | Self::Io(_) => 10,
        }
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .fields()
        .map(|field| {
            let messages = errors.get(field).unwrap_or_default();
            format!("{field}: {}", messages.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}
