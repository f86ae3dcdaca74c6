pub type Result<T> = std::result::Result<T, CanvasError>;

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// A length string whose suffix is not one of `rpx`, `px`, `vw`, `vh`.
    #[error("unsupported unit in length: {0:?}")]
    UnsupportedUnit(String),

    /// An isosceles triangle direction other than `up`, `down`, `left`, `right`.
    #[error("invalid triangle direction: {0:?}")]
    InvalidDirection(String),

    #[error("failed to load image {url:?}: {reason}")]
    ImageLoad { url: String, reason: String },

    #[error("canvas has not been initialized yet")]
    NotInitialized,

    #[error("operation not supported by this surface: {0}")]
    Unsupported(&'static str),

    #[error("canvas backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl CanvasError {
    pub fn image_load(url: impl Into<String>, reason: impl ToString) -> Self {
        CanvasError::ImageLoad {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        CanvasError::Other(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            msg.into(),
        )))
    }
}

impl From<std::io::Error> for CanvasError {
    fn from(err: std::io::Error) -> Self {
        CanvasError::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for CanvasError {
    fn from(err: serde_json::Error) -> Self {
        CanvasError::Other(Box::new(err))
    }
}

#[cfg(feature = "cairo")]
impl From<cairo::Error> for CanvasError {
    fn from(err: cairo::Error) -> Self {
        CanvasError::Backend(Box::new(err))
    }
}

#[cfg(feature = "cairo")]
impl From<cairo::BorrowError> for CanvasError {
    fn from(err: cairo::BorrowError) -> Self {
        CanvasError::Backend(Box::new(err))
    }
}

#[cfg(feature = "png")]
impl From<png::EncodingError> for CanvasError {
    fn from(err: png::EncodingError) -> Self {
        CanvasError::Other(Box::new(err))
    }
}

#[cfg(feature = "png")]
impl From<png::DecodingError> for CanvasError {
    fn from(err: png::DecodingError) -> Self {
        CanvasError::Other(Box::new(err))
    }
}

#[cfg(feature = "png")]
impl From<base64::DecodeError> for CanvasError {
    fn from(err: base64::DecodeError) -> Self {
        CanvasError::Other(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_offending_input() {
        let err = CanvasError::UnsupportedUnit("12em".into());
        assert!(err.to_string().contains("12em"));

        let err = CanvasError::InvalidDirection("north".into());
        assert!(err.to_string().contains("north"));

        let err = CanvasError::image_load("a.png", "not found");
        assert_eq!(err.to_string(), "failed to load image \"a.png\": not found");
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err: CanvasError = std::io::Error::other("boom").into();
        assert!(err.to_string().contains("boom"));
    }
}
