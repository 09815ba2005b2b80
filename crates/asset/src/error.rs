use thiserror::Error;

/// Failure while fetching or decoding one of the viewer's assets.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("mesh decoder resource path must be configured before loading")]
    DecoderNotConfigured,
    #[error("failed to fetch asset '{path}'")]
    Fetch {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to decode asset '{path}'")]
    Decode {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AssetError {
    /// Path of the asset that failed, if the error concerns a specific one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::DecoderNotConfigured => None,
            Self::Fetch { path, .. } | Self::Decode { path, .. } => Some(path),
        }
    }
}
