use crate::ClassifierError;
use fiducial_lens_ar::CaptureError;
use serde::{Deserialize, Serialize};

/// Terminal failure of one recognition cycle.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecognitionError {
    /// The surface could not be captured, projected or rectified.
    #[error("could not extract surface image: {0}")]
    CropFailed(CaptureError),
    /// The model could not be loaded; the next cycle retries.
    #[error("could not load model: {0}")]
    LoadModelFailed(ClassifierError),
    /// The classifier ran but returned no labels.
    #[error("classifier returned no results")]
    ClassificationFailed,
    #[error(transparent)]
    Underlying(ClassifierError),
}

/// Payload-free discriminant of [`RecognitionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CropFailed,
    LoadModelFailed,
    ClassificationFailed,
    Underlying,
}

impl RecognitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecognitionError::CropFailed(_) => ErrorKind::CropFailed,
            RecognitionError::LoadModelFailed(_) => ErrorKind::LoadModelFailed,
            RecognitionError::ClassificationFailed => ErrorKind::ClassificationFailed,
            RecognitionError::Underlying(_) => ErrorKind::Underlying,
        }
    }
}

impl From<CaptureError> for RecognitionError {
    fn from(err: CaptureError) -> Self {
        RecognitionError::CropFailed(err)
    }
}

/// Errors starting the recognizer's own threads.
#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("failed to spawn queue thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error(transparent)]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors reading a [`crate::RecognizerConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unknown log level {0:?}")]
    LogLevel(String),
}
