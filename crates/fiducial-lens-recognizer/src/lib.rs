//! Recognition coordinator for tracked fiducial surfaces.
//!
//! [`Recognizer::classify`] captures what the camera currently shows,
//! rectifies the requested surface out of it and runs a single-label
//! classifier on the result. Stages run on injected [`Executor`]s; the
//! classifier is loaded lazily through a [`ModelLoader`] and only ever runs on
//! one serialized queue.
//!
//! ```no_run
//! use fiducial_lens_ar::{SceneSnapshot, SurfaceId};
//! use fiducial_lens_core::RasterImage;
//! use fiducial_lens_recognizer::{
//!     Classification, ClassifierError, Preloaded, Recognizer, RecognizerConfig,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scene = Arc::new(SceneSnapshot::new());
//! let model = Preloaded::new(|_: &RasterImage| -> Result<Vec<Classification>, ClassifierError> {
//!     Ok(vec![Classification::new("queenOfHearts", 0.91)])
//! });
//! let recognizer = Recognizer::new(scene, Arc::new(model), RecognizerConfig::default())?;
//! recognizer.classify(SurfaceId(1), |result| println!("{result:?}"));
//! # Ok(())
//! # }
//! ```

mod classifier;
mod config;
mod error;
mod executor;
mod recognizer;
mod state;

pub use classifier::{Classification, Classifier, ClassifierError, ModelLoader, Preloaded};
pub use config::{InputSize, RecognizerConfig};
pub use error::{ConfigError, ErrorKind, RecognitionError, SetupError};
pub use executor::{Executor, InlineExecutor, ManualQueue, SerialQueue, Task, WorkerPool};
pub use recognizer::{
    Recognizer, RecognizerBuilder, RecognitionResult, Submission, DELIVERY_QUEUE_NAME,
    INFERENCE_QUEUE_NAME,
};
pub use state::CycleState;
