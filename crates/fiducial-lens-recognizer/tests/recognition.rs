use fiducial_lens_ar::{
    CameraFrame, CameraIntrinsics, CameraState, CaptureError, DeviceOrientation, FrameSnapshot,
    SceneSnapshot, SurfaceId, TrackedSurface, Viewport,
};
use fiducial_lens_core::{PixelBuffer, RasterImage};
use fiducial_lens_recognizer::{
    Classification, Classifier, ClassifierError, CycleState, ErrorKind, InlineExecutor, InputSize,
    ManualQueue, ModelLoader, Preloaded, RecognitionError, RecognitionResult, Recognizer,
    RecognizerConfig, SerialQueue, Submission,
};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

const CARD: SurfaceId = SurfaceId(7);
const OTHER: SurfaceId = SurfaceId(8);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scene() -> Arc<SceneSnapshot> {
    init_logging();
    let (w, h) = (640usize, 480usize);
    let mut data = Vec::with_capacity(w * h * 4);
    for v in 0..h {
        for u in 0..w {
            let red = (270..370).contains(&u) && (190..290).contains(&v);
            let px: [u8; 4] = if red { [230, 20, 20, 255] } else { [60, 60, 60, 255] };
            data.extend_from_slice(&px);
        }
    }
    let scene = SceneSnapshot::with_max_surfaces(2);
    scene.update_frame(FrameSnapshot {
        frame: CameraFrame {
            buffer: PixelBuffer::rgba8(w, h, data),
            timestamp: 1.0,
        },
        camera: CameraState {
            intrinsics: CameraIntrinsics {
                fx: 500.0,
                fy: 500.0,
                cx: 320.0,
                cy: 240.0,
                width: w,
                height: h,
            },
            pose: Isometry3::identity(),
        },
        orientation: DeviceOrientation::Portrait,
        viewport: Viewport::new(240.0, 320.0, 2.0),
    });
    for (id, x) in [(CARD, 0.0), (OTHER, 0.05)] {
        let pose = Isometry3::from_parts(
            Translation3::new(x, 0.0, -0.5),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_2),
        );
        assert!(scene.upsert_surface(TrackedSurface::new(id, pose, 0.1, 0.1)));
    }
    Arc::new(scene)
}

fn config() -> RecognizerConfig {
    RecognizerConfig {
        input_size: Some(InputSize {
            width: 32,
            height: 32,
        }),
        ..RecognizerConfig::default()
    }
}

/// Classifier returning a fixed ranking and counting its invocations.
fn fixed(ranking: Vec<Classification>, calls: Arc<AtomicUsize>) -> Arc<dyn ModelLoader> {
    Arc::new(Preloaded::new(
        move |img: &RasterImage| -> Result<Vec<Classification>, ClassifierError> {
            calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!((img.width, img.height), (32, 32));
            Ok(ranking.clone())
        },
    ))
}

fn inline_recognizer(scene: Arc<SceneSnapshot>, loader: Arc<dyn ModelLoader>) -> Recognizer {
    Recognizer::builder(scene, loader)
        .config(config())
        .worker_executor(Arc::new(InlineExecutor))
        .inference_executor(Arc::new(InlineExecutor))
        .delivery_executor(Arc::new(InlineExecutor))
        .build()
        .expect("build recognizer")
}

fn classify_now(rec: &Recognizer, id: SurfaceId) -> RecognitionResult {
    let (tx, rx) = mpsc::channel();
    assert_eq!(
        rec.classify(id, move |r| {
            let _ = tx.send(r);
        }),
        Submission::Accepted
    );
    rx.recv_timeout(Duration::from_secs(10))
        .expect("result delivered")
}

#[test]
fn top_label_is_returned_as_is() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ranking = vec![
        Classification::new("queenOfHearts", 0.91),
        Classification::new("kingOfHearts", 0.05),
    ];
    let rec = inline_recognizer(scene(), fixed(ranking, calls.clone()));
    assert_eq!(classify_now(&rec, CARD), Ok("queenOfHearts".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(rec.cycle_state(CARD), CycleState::Idle);
}

#[test]
fn first_entry_wins_even_if_not_highest() {
    let ranking = vec![
        Classification::new("twoOfClubs", 0.2),
        Classification::new("aceOfSpades", 0.8),
    ];
    let rec = inline_recognizer(scene(), fixed(ranking, Arc::new(AtomicUsize::new(0))));
    assert_eq!(classify_now(&rec, CARD), Ok("twoOfClubs".to_string()));
}

#[test]
fn empty_ranking_is_classification_failure() {
    let rec = inline_recognizer(scene(), fixed(Vec::new(), Arc::new(AtomicUsize::new(0))));
    let err = classify_now(&rec, CARD).unwrap_err();
    assert_eq!(err, RecognitionError::ClassificationFailed);
    assert_eq!(err.kind(), ErrorKind::ClassificationFailed);
}

#[test]
fn classifier_error_is_passed_through() {
    let loader = Arc::new(Preloaded::new(
        |_: &RasterImage| -> Result<Vec<Classification>, ClassifierError> {
            Err(ClassifierError::Inference("tensor shape".into()))
        },
    ));
    let rec = inline_recognizer(scene(), loader);
    assert_eq!(
        classify_now(&rec, CARD),
        Err(RecognitionError::Underlying(ClassifierError::Inference(
            "tensor shape".into()
        )))
    );
}

#[test]
fn model_load_failure_is_retried_then_cached() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let loader: Arc<dyn ModelLoader> = Arc::new(
        move || -> Result<Arc<dyn Classifier>, ClassifierError> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ClassifierError::Load("not yet".into()));
            }
            Ok(Arc::new(
                |_: &RasterImage| -> Result<Vec<Classification>, ClassifierError> {
                    Ok(vec![Classification::new("jackOfDiamonds", 0.6)])
                },
            ))
        },
    );
    let rec = inline_recognizer(scene(), loader);

    assert_eq!(
        classify_now(&rec, CARD),
        Err(RecognitionError::LoadModelFailed(ClassifierError::Load(
            "not yet".into()
        )))
    );
    assert_eq!(classify_now(&rec, CARD), Ok("jackOfDiamonds".to_string()));
    assert_eq!(classify_now(&rec, CARD), Ok("jackOfDiamonds".to_string()));
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[test]
fn panicking_classifier_fails_the_cycle_and_frees_the_surface() {
    let inference = Arc::new(SerialQueue::new("test-inference").expect("spawn"));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let loader = Arc::new(Preloaded::new(
        move |_: &RasterImage| -> Result<Vec<Classification>, ClassifierError> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("model exploded");
            }
            Ok(vec![Classification::new("aceOfSpades", 0.7)])
        },
    ));
    let rec = Recognizer::builder(scene(), loader)
        .config(config())
        .worker_executor(Arc::new(InlineExecutor))
        .inference_executor(inference)
        .delivery_executor(Arc::new(InlineExecutor))
        .build()
        .expect("build recognizer");

    let err = classify_now(&rec, CARD).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Underlying);
    assert!(err.to_string().contains("model exploded"), "{err}");
    assert_eq!(rec.cycle_state(CARD), CycleState::Idle);

    // the surface and the inference queue both keep working
    assert_eq!(classify_now(&rec, CARD), Ok("aceOfSpades".to_string()));
}

#[test]
fn panicking_loader_is_a_load_failure_and_is_retried() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let loader: Arc<dyn ModelLoader> = Arc::new(
        move || -> Result<Arc<dyn Classifier>, ClassifierError> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("weights missing");
            }
            Ok(Arc::new(
                |_: &RasterImage| -> Result<Vec<Classification>, ClassifierError> {
                    Ok(vec![Classification::new("tenOfClubs", 0.5)])
                },
            ))
        },
    );
    let rec = inline_recognizer(scene(), loader);

    match classify_now(&rec, CARD) {
        Err(RecognitionError::LoadModelFailed(ClassifierError::Load(msg))) => {
            assert!(msg.contains("weights missing"), "{msg}")
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(rec.cycle_state(CARD), CycleState::Idle);
    assert_eq!(classify_now(&rec, CARD), Ok("tenOfClubs".to_string()));
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[test]
fn untracked_surface_fails_without_running_classifier() {
    let scene = scene();
    let mut card = fiducial_lens_ar::SceneSource::surface(scene.as_ref(), CARD).expect("card");
    card.is_tracked = false;
    scene.upsert_surface(card);

    let calls = Arc::new(AtomicUsize::new(0));
    let rec = inline_recognizer(
        scene,
        fixed(vec![Classification::new("x", 1.0)], calls.clone()),
    );
    let err = classify_now(&rec, CARD).unwrap_err();
    assert_eq!(
        err,
        RecognitionError::CropFailed(CaptureError::SurfaceNotTracked(CARD))
    );
    assert_eq!(err.kind(), ErrorKind::CropFailed);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_request_for_same_surface_is_rejected() {
    let scene_queue = Arc::new(ManualQueue::new());
    let delivery = Arc::new(ManualQueue::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let rec = Recognizer::builder(
        scene(),
        fixed(vec![Classification::new("queenOfHearts", 0.91)], calls.clone()),
    )
    .config(config())
    .scene_executor(scene_queue.clone())
    .worker_executor(Arc::new(InlineExecutor))
    .inference_executor(Arc::new(InlineExecutor))
    .delivery_executor(delivery.clone())
    .build()
    .expect("build recognizer");

    let delivered = Arc::new(AtomicUsize::new(0));
    let submit = |id: SurfaceId| {
        let delivered = delivered.clone();
        rec.classify(id, move |r| {
            assert!(r.is_ok());
            delivered.fetch_add(1, Ordering::SeqCst);
        })
    };

    assert_eq!(submit(CARD), Submission::Accepted);
    assert_eq!(rec.cycle_state(CARD), CycleState::Capturing);
    assert_eq!(submit(CARD), Submission::Rejected);
    // other surfaces are independent
    assert_eq!(submit(OTHER), Submission::Accepted);

    assert_eq!(scene_queue.run_pending(), 2);
    assert_eq!(rec.cycle_state(CARD), CycleState::Succeeded);
    assert_eq!(submit(CARD), Submission::Rejected);
    assert_eq!(delivered.load(Ordering::SeqCst), 0);

    assert_eq!(delivery.run_pending(), 2);
    assert_eq!(delivered.load(Ordering::SeqCst), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(rec.cycle_state(CARD), CycleState::Idle);
    assert_eq!(submit(CARD), Submission::Accepted);
}

#[test]
fn completion_runs_on_delivery_queue_not_inference_queue() {
    let delivery = Arc::new(SerialQueue::new("test-delivery").expect("spawn"));
    let inference = Arc::new(SerialQueue::new("test-inference").expect("spawn"));
    let (seen_tx, seen_rx) = mpsc::channel();
    let classifier_tx = seen_tx.clone();
    let loader = Arc::new(Preloaded::new(
        move |_: &RasterImage| -> Result<Vec<Classification>, ClassifierError> {
            let name = std::thread::current().name().map(str::to_owned);
            let _ = classifier_tx.send(("classifier", name));
            Ok(vec![Classification::new("queenOfHearts", 0.91)])
        },
    ));
    let rec = Recognizer::builder(scene(), loader)
        .config(config())
        .inference_executor(inference)
        .delivery_executor(delivery)
        .build()
        .expect("build recognizer");

    let observer = rec.clone();
    rec.classify(CARD, move |r| {
        assert_eq!(r, Ok("queenOfHearts".to_string()));
        assert_eq!(observer.cycle_state(CARD), CycleState::Idle);
        let name = std::thread::current().name().map(str::to_owned);
        let _ = seen_tx.send(("completion", name));
    });

    let first = seen_rx.recv_timeout(Duration::from_secs(10)).expect("classifier ran");
    let second = seen_rx.recv_timeout(Duration::from_secs(10)).expect("completion ran");
    assert_eq!(first, ("classifier", Some("test-inference".to_string())));
    assert_eq!(second, ("completion", Some("test-delivery".to_string())));
}

#[test]
fn default_executors_deliver_off_the_caller_thread() {
    let rec = Recognizer::new(
        scene(),
        fixed(
            vec![Classification::new("queenOfHearts", 0.91)],
            Arc::new(AtomicUsize::new(0)),
        ),
        config(),
    )
    .expect("build recognizer");
    let (tx, rx) = mpsc::channel();
    rec.classify(CARD, move |r| {
        let name = std::thread::current().name().map(str::to_owned);
        let _ = tx.send((r, name));
    });
    let (result, thread) = rx.recv_timeout(Duration::from_secs(10)).expect("delivered");
    assert_eq!(result, Ok("queenOfHearts".to_string()));
    assert_eq!(
        thread.as_deref(),
        Some(fiducial_lens_recognizer::DELIVERY_QUEUE_NAME)
    );
}
