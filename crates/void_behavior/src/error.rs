//! Error types for the behavior runtime

use std::path::PathBuf;
use thiserror::Error;
use void_script::RuntimeError;

use crate::compiler::Diagnostic;
use crate::runtime::SwapStage;

/// Result type for behavior runtime operations
pub type Result<T> = std::result::Result<T, BehaviorError>;

/// Errors surfaced by the behavior runtime
#[derive(Debug, Error)]
pub enum BehaviorError {
    /// Reading or writing a source file failed
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source names become file names and must stay simple
    #[error("Invalid source name '{0}'")]
    InvalidSourceName(String),

    /// No source unit with that name
    #[error("Source '{0}' not found")]
    SourceNotFound(String),

    /// Compilation produced at least one error
    #[error("Compilation failed with {} error(s)", count_errors(.0))]
    Compile(Vec<Diagnostic>),

    /// The sources could not be read or the compiled module did not load
    #[error("Swap failed while {stage} with {} error(s)", count_errors(.diagnostics))]
    Swap {
        stage: SwapStage,
        diagnostics: Vec<Diagnostic>,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

impl BehaviorError {
    /// Create an IO error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BehaviorError::Io {
            path: path.into(),
            source,
        }
    }

    /// Diagnostics of a failed swap
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            BehaviorError::Compile(diagnostics) => diagnostics,
            BehaviorError::Swap { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

/// Errors raised while loading a module image
#[derive(Debug, Error)]
pub enum LoadError {
    /// The binary image could not be decoded
    #[error("Invalid module image: {0}")]
    Decode(String),

    /// The image was produced by an incompatible compiler
    #[error("Unsupported module image version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// An import names a module the host does not provide
    #[error("Host module '{0}' is not available")]
    UnknownHostModule(String),

    /// A module-level constant failed to evaluate
    #[error("Failed to initialize '{name}': {source}")]
    Initializer {
        name: String,
        #[source]
        source: RuntimeError,
    },
}

/// Errors raised while creating a behavior instance
#[derive(Debug, Error)]
pub enum InstantiationError {
    /// The type name is not in the type registry
    #[error("Behavior type '{0}' is not registered")]
    UnknownType(String),

    /// A field initializer failed
    #[error("Failed to initialize field '{field}' of '{type_name}': {source}")]
    FieldInitializer {
        type_name: String,
        field: String,
        #[source]
        source: RuntimeError,
    },

    /// The entity is gone
    #[error("Entity {0} does not exist")]
    EntityNotFound(void_script::EntityRef),
}

impl InstantiationError {
    /// Create a field initializer error
    pub fn field_initializer(
        type_name: impl Into<String>,
        field: impl Into<String>,
        source: RuntimeError,
    ) -> Self {
        InstantiationError::FieldInitializer {
            type_name: type_name.into(),
            field: field.into(),
            source,
        }
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}
