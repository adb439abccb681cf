#[cfg(feature = "tensorflow-backend")]
use tensorflow::Status;
use image::ImageError;
use regex::Error as PatternError;
use serde_json::Error as JsonError;
use toml::de::Error as TomlError;

use std::error::Error;
use std::fmt;
use std::io::Error as IOError;

#[derive(Debug)]
pub struct LprError(LprErrorKind);

#[derive(Debug)]
pub enum LprErrorKind {
    IOError(IOError),
    ImageError(ImageError),
    JsonError(JsonError),
    TomlError(TomlError),
    PatternError(PatternError),
    /// settings that parsed but make no sense
    Config(String),
    /// a detector or text reader failed to produce output
    Collaborator(String),
    #[cfg(feature = "tensorflow-backend")]
    TensorflowError(Status),
}

impl LprError {
    pub fn kind(&self) -> &LprErrorKind {
        &self.0
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self(LprErrorKind::Config(msg.into()))
    }

    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self(LprErrorKind::Collaborator(msg.into()))
    }
}

impl<T> From<T> for LprError
where T:  Into<LprErrorKind>
{
    fn from(e: T) -> Self {
        Self(e.into())
    }
}

impl fmt::Display for LprError {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            LprErrorKind::IOError(e) => e.fmt(f),
            LprErrorKind::ImageError(e) => e.fmt(f),
            LprErrorKind::JsonError(e) => write!(f, "bad recording: {}", e),
            LprErrorKind::TomlError(e) => write!(f, "bad config file: {}", e),
            LprErrorKind::PatternError(e) => write!(f, "bad exclude pattern: {}", e),
            LprErrorKind::Config(msg) => write!(f, "invalid config: {}", msg),
            LprErrorKind::Collaborator(msg) => write!(f, "collaborator failed: {}", msg),
            #[cfg(feature = "tensorflow-backend")]
            LprErrorKind::TensorflowError(e) => e.fmt(f),
        }
    }
}

impl Error for LprError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.kind() {
            LprErrorKind::IOError(e) => Some(e),
            LprErrorKind::ImageError(e) => Some(e),
            LprErrorKind::JsonError(e) => Some(e),
            LprErrorKind::TomlError(e) => Some(e),
            LprErrorKind::PatternError(e) => Some(e),
            LprErrorKind::Config(_) | LprErrorKind::Collaborator(_) => None,
            #[cfg(feature = "tensorflow-backend")]
            LprErrorKind::TensorflowError(e) => Some(e),
        }
    }
}

impl From<IOError> for LprErrorKind {
    fn from(e: IOError) -> Self {
        Self::IOError(e)
    }
}

impl From<ImageError> for LprErrorKind {
    fn from(e: ImageError) -> Self {
        Self::ImageError(e)
    }
}

impl From<JsonError> for LprErrorKind {
    fn from(e: JsonError) -> Self {
        Self::JsonError(e)
    }
}

impl From<TomlError> for LprErrorKind {
    fn from(e: TomlError) -> Self {
        Self::TomlError(e)
    }
}

impl From<PatternError> for LprErrorKind {
    fn from(e: PatternError) -> Self {
        Self::PatternError(e)
    }
}

#[cfg(feature = "tensorflow-backend")]
impl From<Status> for LprErrorKind {
    fn from(e: Status) -> Self {
        Self::TensorflowError(e)
    }
}
