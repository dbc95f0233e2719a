//! Capture, rectify and classify one surface per cycle.
//!
//! A cycle hops across four execution contexts:
//! - the scene executor reads the session and captures the viewport raster,
//! - the worker executor rectifies the surface and prepares classifier input,
//! - the inference queue loads the model (once) and runs it,
//! - the delivery executor resets the surface to idle and calls the
//!   completion.
//!
//! The inference queue is shared by all surfaces and is the only place the
//! model is touched.

use crate::{
    Classifier, ClassifierError, CycleState, Executor, InlineExecutor, ModelLoader, RecognitionError,
    RecognizerConfig, SerialQueue, SetupError, WorkerPool,
};
use fiducial_lens_ar::{capture_surface, CaptureError, SceneSource, SurfaceCapture, SurfaceId};
use fiducial_lens_core::{rectify, RasterImage};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Name of the inference thread created by [`RecognizerBuilder::build`].
pub const INFERENCE_QUEUE_NAME: &str = "fiducial-lens-inference";
/// Name of the default delivery thread.
pub const DELIVERY_QUEUE_NAME: &str = "fiducial-lens-delivery";

/// Outcome of one recognition cycle.
pub type RecognitionResult = Result<String, RecognitionError>;

type Completion = Box<dyn FnOnce(RecognitionResult) + Send + 'static>;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Whether a [`Recognizer::classify`] request started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// A cycle for the surface is already running; the completion was
    /// dropped without being called.
    Rejected,
}

/// Builder for [`Recognizer`]. Unset executors are created on `build`.
pub struct RecognizerBuilder {
    scene: Arc<dyn SceneSource>,
    loader: Arc<dyn ModelLoader>,
    config: RecognizerConfig,
    scene_executor: Option<Arc<dyn Executor>>,
    worker_executor: Option<Arc<dyn Executor>>,
    inference_executor: Option<Arc<dyn Executor>>,
    delivery_executor: Option<Arc<dyn Executor>>,
}

impl RecognizerBuilder {
    pub fn config(mut self, config: RecognizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Context that reads the scene. Defaults to the caller's thread.
    pub fn scene_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.scene_executor = Some(executor);
        self
    }

    /// Context for rectification. Defaults to a [`WorkerPool`] of
    /// `config.worker_threads`.
    pub fn worker_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.worker_executor = Some(executor);
        self
    }

    /// Serialized context owning the model. Defaults to a [`SerialQueue`].
    /// Must never run two tasks at once.
    pub fn inference_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.inference_executor = Some(executor);
        self
    }

    /// Context completions run on. Defaults to a dedicated [`SerialQueue`].
    pub fn delivery_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.delivery_executor = Some(executor);
        self
    }

    pub fn build(self) -> Result<Recognizer, SetupError> {
        let scene_executor = match self.scene_executor {
            Some(e) => e,
            None => Arc::new(InlineExecutor),
        };
        let worker_executor = match self.worker_executor {
            Some(e) => e,
            None => Arc::new(WorkerPool::new(self.config.worker_threads)?),
        };
        let inference_executor = match self.inference_executor {
            Some(e) => e,
            None => Arc::new(SerialQueue::new(INFERENCE_QUEUE_NAME)?),
        };
        let delivery_executor = match self.delivery_executor {
            Some(e) => e,
            None => Arc::new(SerialQueue::new(DELIVERY_QUEUE_NAME)?),
        };
        log::debug!("recognizer configured: {:?}", self.config);

        Ok(Recognizer {
            inner: Arc::new(Inner {
                scene: self.scene,
                loader: self.loader,
                model: Mutex::new(None),
                config: self.config,
                scene_executor,
                worker_executor,
                inference_executor,
                delivery_executor,
                cycles: Mutex::new(HashMap::new()),
            }),
        })
    }
}

/// Turns tracked surfaces into classifier labels.
///
/// Cheap to clone; clones share the model, executors and cycle table.
#[derive(Clone)]
pub struct Recognizer {
    inner: Arc<Inner>,
}

struct Inner {
    scene: Arc<dyn SceneSource>,
    loader: Arc<dyn ModelLoader>,
    // only locked from the inference executor
    model: Mutex<Option<Arc<dyn Classifier>>>,
    config: RecognizerConfig,
    scene_executor: Arc<dyn Executor>,
    worker_executor: Arc<dyn Executor>,
    inference_executor: Arc<dyn Executor>,
    delivery_executor: Arc<dyn Executor>,
    cycles: Mutex<HashMap<SurfaceId, CycleState>>,
}

impl Recognizer {
    pub fn builder(scene: Arc<dyn SceneSource>, loader: Arc<dyn ModelLoader>) -> RecognizerBuilder {
        RecognizerBuilder {
            scene,
            loader,
            config: RecognizerConfig::default(),
            scene_executor: None,
            worker_executor: None,
            inference_executor: None,
            delivery_executor: None,
        }
    }

    /// Recognizer with default executors.
    pub fn new(
        scene: Arc<dyn SceneSource>,
        loader: Arc<dyn ModelLoader>,
        config: RecognizerConfig,
    ) -> Result<Self, SetupError> {
        Self::builder(scene, loader).config(config).build()
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.inner.config
    }

    /// Current cycle state of `surface_id`; `Idle` when no cycle is in
    /// flight.
    pub fn cycle_state(&self, surface_id: SurfaceId) -> CycleState {
        self.inner
            .cycles
            .lock()
            .get(&surface_id)
            .copied()
            .unwrap_or_default()
    }

    /// Start a recognition cycle for `surface_id`.
    ///
    /// `completion` runs exactly once on the delivery executor if the request
    /// is accepted. A surface with a cycle in flight rejects new requests and
    /// drops their completion uncalled.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, completion), fields(surface = %surface_id))
    )]
    pub fn classify<F>(&self, surface_id: SurfaceId, completion: F) -> Submission
    where
        F: FnOnce(RecognitionResult) + Send + 'static,
    {
        if !self.inner.try_begin(surface_id) {
            log::debug!("surface {surface_id}: cycle already running, request rejected");
            return Submission::Rejected;
        }
        let inner = Arc::clone(&self.inner);
        let completion: Completion = Box::new(completion);
        self.inner
            .scene_executor
            .execute(Box::new(move || inner.capture(surface_id, completion)));
        Submission::Accepted
    }
}

impl Inner {
    fn try_begin(&self, id: SurfaceId) -> bool {
        let mut cycles = self.cycles.lock();
        let state = cycles.entry(id).or_default();
        if state.is_busy() {
            return false;
        }
        *state = CycleState::Capturing;
        log::debug!("surface {id}: idle -> capturing");
        true
    }

    fn transition(&self, id: SurfaceId, next: CycleState) {
        let prev = self.cycles.lock().insert(id, next).unwrap_or_default();
        log::debug!("surface {id}: {prev} -> {next}");
    }

    /// Back to idle. Idle surfaces have no entry in the cycle table.
    fn reset(&self, id: SurfaceId) {
        let prev = self.cycles.lock().remove(&id).unwrap_or_default();
        log::debug!("surface {id}: {prev} -> {}", CycleState::Idle);
    }

    fn capture(self: Arc<Self>, id: SurfaceId, completion: Completion) {
        let capture = match capture_surface(self.scene.as_ref(), id) {
            Ok(c) => c,
            Err(e) => return self.finish(id, Err(RecognitionError::CropFailed(e)), completion),
        };
        self.transition(id, CycleState::Rectifying);
        let inner = Arc::clone(&self);
        self.worker_executor
            .execute(Box::new(move || inner.rectify(id, capture, completion)));
    }

    fn rectify(self: Arc<Self>, id: SurfaceId, capture: SurfaceCapture, completion: Completion) {
        let input = match self.prepare_input(&capture) {
            Ok(img) => img,
            Err(e) => return self.finish(id, Err(RecognitionError::CropFailed(e)), completion),
        };
        self.transition(id, CycleState::Classifying);
        let inner = Arc::clone(&self);
        self.inference_executor
            .execute(Box::new(move || inner.classify(id, input, completion)));
    }

    fn prepare_input(&self, capture: &SurfaceCapture) -> Result<RasterImage, CaptureError> {
        let rectified = rectify(&capture.image, &capture.quad)?;
        log::trace!(
            "surface {}: rectified {}x{}",
            capture.surface_id,
            rectified.width,
            rectified.height
        );
        self.config.prepare_input(rectified)
    }

    fn model(&self) -> Result<Arc<dyn Classifier>, RecognitionError> {
        let mut slot = self.model.lock();
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }
        let model = catch_unwind(AssertUnwindSafe(|| self.loader.load()))
            .unwrap_or_else(|payload| {
                Err(ClassifierError::Load(format!(
                    "model loader panicked: {}",
                    panic_message(&*payload)
                )))
            })
            .map_err(RecognitionError::LoadModelFailed)?;
        log::info!("classifier model loaded");
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    fn classify(self: Arc<Self>, id: SurfaceId, input: RasterImage, completion: Completion) {
        let result = self.model().and_then(|model| {
            let ranked = catch_unwind(AssertUnwindSafe(|| model.classify(&input)))
                .unwrap_or_else(|payload| {
                    Err(ClassifierError::Inference(format!(
                        "classifier panicked: {}",
                        panic_message(&*payload)
                    )))
                })
                .map_err(RecognitionError::Underlying)?;
            ranked
                .into_iter()
                .next()
                .map(|top| {
                    log::debug!(
                        "surface {id}: top label {:?} ({:.3})",
                        top.label,
                        top.confidence
                    );
                    top.label
                })
                .ok_or(RecognitionError::ClassificationFailed)
        });
        self.finish(id, result, completion);
    }

    fn finish(self: Arc<Self>, id: SurfaceId, result: RecognitionResult, completion: Completion) {
        match &result {
            Ok(label) => {
                log::info!("surface {id}: recognized {label:?}");
                self.transition(id, CycleState::Succeeded);
            }
            Err(e) => {
                log::warn!("surface {id}: recognition failed: {e}");
                self.transition(id, CycleState::Failed(e.kind()));
            }
        }
        let inner = Arc::clone(&self);
        self.delivery_executor.execute(Box::new(move || {
            inner.reset(id);
            completion(result);
        }));
    }
}
