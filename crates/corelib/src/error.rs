//! Viewer-level errors (renderer-agnostic).

use asset::AssetError;
use thiserror::Error;

use crate::binding::BindError;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("asset load failed")]
    Asset(#[from] AssetError),
    #[error("material binding failed")]
    Binding(#[from] BindError),
    #[error("a scene is already attached to this viewer")]
    AlreadyAttached,
}

pub type ViewerResult<T> = Result<T, ViewerError>;
