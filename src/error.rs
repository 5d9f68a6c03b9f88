use thiserror::Error;

/// Errors raised by catalog construction, configuration loading and other
/// programmer-facing failures.
///
/// Problems in the validated *data* are never reported through this type;
/// they become issues of the returned `OperationOutcome`.
#[derive(Error, Debug)]
pub enum YafvError {
    #[error("Schema not found: {type_name}")]
    SchemaNotFound { type_name: String },

    #[error("Invalid schema catalog: {message}")]
    InvalidCatalog { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, YafvError>;

impl YafvError {
    pub fn schema_not_found<S: Into<String>>(type_name: S) -> Self {
        Self::SchemaNotFound {
            type_name: type_name.into(),
        }
    }

    pub fn invalid_catalog<S: Into<String>>(message: S) -> Self {
        Self::InvalidCatalog {
            message: message.into(),
        }
    }

    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
