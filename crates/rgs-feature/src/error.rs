//! Error types for the outcome core
//!
//! Every error is round-fatal: a round either completes or produces nothing.

use rgs_rng::RngError;
use thiserror::Error;

/// Typed parameter access failure
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("missing required parameter `{0}`")]
    Missing(String),

    #[error("parameter `{key}` should be {expected}, found {found}")]
    Mismatch {
        key: String,
        expected: &'static str,
        found: String,
    },
}

/// Game configuration does not fit the registered effects
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown feature type `{0}`")]
    UnknownType(String),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("ordered trigger name `{0}` not found in catalog")]
    UnresolvedName(String),

    #[error("{0}")]
    Invalid(String),
}

/// Grid or pattern arithmetic went out of bounds
#[derive(Debug, Error)]
pub enum DataError {
    #[error("position {position} outside grid of {len} cells")]
    PositionOutOfBounds { position: usize, len: usize },

    #[error("cell (reel {reel}, row {row}) outside {reels}x{rows} grid")]
    CellOutOfBounds {
        reel: usize,
        row: usize,
        reels: usize,
        rows: usize,
    },

    #[error("{0}")]
    Malformed(String),
}

/// Error category, independent of where in the tree it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Data,
    Serialization,
    Logic,
    Random,
}

/// Round-level error
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("logic error: {0}")]
    Logic(String),

    #[error("rng error: {0}")]
    Rng(#[from] RngError),

    #[error("{tag} #{id}: {source}")]
    InFeature {
        tag: String,
        id: u32,
        #[source]
        source: Box<FeatureError>,
    },
}

impl FeatureError {
    /// Attach the failing feature, keeping the innermost one if already set
    pub fn in_feature(self, tag: &str, id: u32) -> Self {
        match self {
            Self::InFeature { .. } => self,
            other => Self::InFeature {
                tag: tag.to_string(),
                id,
                source: Box::new(other),
            },
        }
    }

    /// The error without feature context
    pub fn root(&self) -> &FeatureError {
        match self {
            Self::InFeature { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Data(_) => ErrorKind::Data,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Logic(_) => ErrorKind::Logic,
            Self::Rng(_) => ErrorKind::Random,
            Self::InFeature { .. } => unreachable!("root() strips feature context"),
        }
    }

    /// Feature type tag the error was raised in, if known
    pub fn feature_tag(&self) -> Option<&str> {
        match self {
            Self::InFeature { tag, .. } => Some(tag),
            _ => None,
        }
    }
}

impl From<ParamError> for FeatureError {
    fn from(e: ParamError) -> Self {
        Self::Config(ConfigError::Param(e))
    }
}

impl From<serde_json::Error> for FeatureError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_yml::Error> for FeatureError {
    fn from(e: serde_yml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias
pub type FeatureResult<T> = Result<T, FeatureError>;
