//! The classifier seam: an opaque model mapping a raster to ranked labels.

use fiducial_lens_core::RasterImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One ranked label produced by a [`Classifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Errors reported by a model or its loader.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("model unavailable: {0}")]
    Load(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Single-label image classifier.
///
/// Results are expected in descending confidence order; the first entry is
/// taken as-is, without re-sorting.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &RasterImage) -> Result<Vec<Classification>, ClassifierError>;
}

impl<F> Classifier for F
where
    F: Fn(&RasterImage) -> Result<Vec<Classification>, ClassifierError> + Send + Sync,
{
    fn classify(&self, image: &RasterImage) -> Result<Vec<Classification>, ClassifierError> {
        self(image)
    }
}

/// Produces the shared classifier on first use.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn Classifier>, ClassifierError>;
}

impl<F> ModelLoader for F
where
    F: Fn() -> Result<Arc<dyn Classifier>, ClassifierError> + Send + Sync,
{
    fn load(&self) -> Result<Arc<dyn Classifier>, ClassifierError> {
        self()
    }
}

/// Loader for a model that is already in memory.
#[derive(Clone)]
pub struct Preloaded(pub Arc<dyn Classifier>);

impl Preloaded {
    pub fn new<C: Classifier + 'static>(classifier: C) -> Self {
        Self(Arc::new(classifier))
    }
}

impl ModelLoader for Preloaded {
    fn load(&self) -> Result<Arc<dyn Classifier>, ClassifierError> {
        Ok(Arc::clone(&self.0))
    }
}
