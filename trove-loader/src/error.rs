use std::path::PathBuf;
use std::sync::Arc;
use trove_base::ModelName;

/// Returned by a parser that could not turn a file into a model
#[derive(Debug, Clone)]
pub enum ParseError {
    StringError(String),
    IoError(Arc<std::io::Error>),
    JsonError(Arc<serde_json::Error>),
    Truncated,
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            ParseError::StringError(_) => None,
            ParseError::IoError(ref e) => Some(&**e),
            ParseError::JsonError(ref e) => Some(&**e),
            ParseError::Truncated => None,
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            ParseError::StringError(ref e) => e.fmt(fmt),
            ParseError::IoError(ref e) => e.fmt(fmt),
            ParseError::JsonError(ref e) => e.fmt(fmt),
            ParseError::Truncated => "Truncated".fmt(fmt),
        }
    }
}

impl From<&str> for ParseError {
    fn from(str: &str) -> Self {
        ParseError::StringError(str.to_string())
    }
}

impl From<String> for ParseError {
    fn from(string: String) -> Self {
        ParseError::StringError(string)
    }
}

impl From<std::io::Error> for ParseError {
    fn from(error: std::io::Error) -> Self {
        ParseError::IoError(Arc::new(error))
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(error: serde_json::Error) -> Self {
        ParseError::JsonError(Arc::new(error))
    }
}

/// Asset-level failures of a load request. All of these are recoverable by the caller.
#[derive(Debug, Clone)]
pub enum LoadError {
    // The name did not resolve to a file in any search path
    AssetNotFound(ModelName),
    // The file's extension has no registered parser
    UnsupportedFormat {
        name: ModelName,
        extension: String,
    },
    // The parser rejected the file
    ParseFailure {
        name: ModelName,
        path: PathBuf,
        error: ParseError,
    },
    // The loader was used before init() or after kill()
    NotInitialized,
    // The loader was initialized with an empty parser registry, nothing can be preloaded
    NoParsers,
    WorkerSpawnFailed(Arc<std::io::Error>),
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            LoadError::AssetNotFound(_) => None,
            LoadError::UnsupportedFormat { .. } => None,
            LoadError::ParseFailure { ref error, .. } => Some(error),
            LoadError::NotInitialized => None,
            LoadError::NoParsers => None,
            LoadError::WorkerSpawnFailed(ref e) => Some(&**e),
        }
    }
}

impl core::fmt::Display for LoadError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            LoadError::AssetNotFound(ref name) => {
                write!(fmt, "Could not find model {:?} in any search path", name.as_str())
            }
            LoadError::UnsupportedFormat {
                ref name,
                ref extension,
            } => write!(
                fmt,
                "Model {:?} has unsupported format {:?}",
                name.as_str(),
                extension
            ),
            LoadError::ParseFailure {
                ref name,
                ref path,
                ref error,
            } => write!(
                fmt,
                "Failed to parse model {:?} from {:?}: {}",
                name.as_str(),
                path,
                error
            ),
            LoadError::NotInitialized => "NotInitialized".fmt(fmt),
            LoadError::NoParsers => "The model loader has no parsers registered".fmt(fmt),
            LoadError::WorkerSpawnFailed(ref e) => {
                write!(fmt, "Could not start the load queue worker: {}", e)
            }
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
