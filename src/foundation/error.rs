pub type StudioResult<T> = Result<T, StudioError>;

#[derive(thiserror::Error, Debug)]
pub enum StudioError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StudioError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// Failures reported by a capture device when a session tries to open it.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum DeviceError {
    #[error("camera access denied")]
    Denied,

    #[error("no camera found")]
    NotFound,

    #[error("camera is busy")]
    Busy,

    #[error("camera unavailable: {0}")]
    Other(String),
}

impl DeviceError {
    /// Status line shown on the capture view until the device is reopened.
    pub fn status_message(&self) -> String {
        match self {
            Self::Denied => "Camera access denied. Allow it in system settings.".to_string(),
            Self::NotFound => "No camera found.".to_string(),
            Self::Busy => "Camera already in use by another application.".to_string(),
            Self::Other(msg) => format!("Camera unavailable: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            StudioError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(StudioError::codec("x").to_string().contains("codec error:"));
        assert!(
            StudioError::persistence("x")
                .to_string()
                .contains("persistence error:")
        );
        assert!(
            StudioError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn device_errors_convert_and_keep_status() {
        let err: StudioError = DeviceError::Busy.into();
        assert!(err.to_string().contains("device error:"));
        assert_eq!(
            DeviceError::NotFound.status_message(),
            "No camera found.".to_string()
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = StudioError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
