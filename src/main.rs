//! Application entry point: pose coach exercise session.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (default on first run); the first CLI
//!    argument selects the exercise.
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the analysis client ([`HttpAnalysisClient`]) from config.
//! 5. Fetch the exercise; fall back to a local animation file when the
//!    service is unreachable.
//! 6. Create channels (hotkeys, feedback) and the pause switch.
//! 7. Acquire the frame source, start the inference worker and the capture
//!    loop.  Failure here disables live analysis but the window still opens.
//! 8. Spawn the hotkey listener thread.
//! 9. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use anyhow::Context as _;
use eframe::egui;
use tokio::sync::mpsc;

use pose_coach::{
    api::{AnalysisClient, ExerciseInfo, HttpAnalysisClient},
    app::{AppParts, CoachApp},
    capture::FrameSource,
    config::{AppConfig, AppPaths},
    hotkey::{HotkeyBindings, HotkeyEvent, HotkeyListener},
    pipeline::{
        AnimationPlayer, CaptureLoop, FeedbackDispatcher, FeedbackState, InferenceWorker,
        LoopSettings, PauseFlag, PipelineError,
    },
    pose::{Animation, EngineError, PoseEngine, ReplayEngine},
    render::{SkeletonRenderer, SkeletonStyle},
};

// ---------------------------------------------------------------------------
// Exercise + animation
// ---------------------------------------------------------------------------

/// Fetch the exercise, falling back to offline metadata.  A missing or empty
/// animation is filled from `<animations_dir>/<id>.json`, then from
/// `animation.animation_file`.
fn load_exercise(
    rt: &tokio::runtime::Runtime,
    client: &dyn AnalysisClient,
    config: &AppConfig,
) -> ExerciseInfo {
    let exercise_id = &config.analysis.exercise_id;
    let mut exercise = match rt.block_on(client.fetch_exercise(exercise_id)) {
        Ok(exercise) => {
            log::info!(
                "exercise {exercise_id}: {} ({} keyframes)",
                exercise.name,
                exercise.keyframe_count()
            );
            exercise
        }
        Err(e) => {
            log::warn!("could not fetch exercise {exercise_id} ({e}); continuing offline");
            ExerciseInfo::offline(exercise_id)
        }
    };

    if exercise.keyframe_count() == 0 {
        let candidates = std::iter::once(AppPaths::new().animation_file(exercise_id))
            .chain(config.animation.animation_file.clone());
        for path in candidates.filter(|p| p.exists()) {
            match Animation::load(&path) {
                Ok(animation) if !animation.is_empty() => {
                    log::info!("reference animation loaded from {}", path.display());
                    exercise.animation = Some(animation);
                    break;
                }
                Ok(_) => log::warn!("{} contains no keyframes", path.display()),
                Err(e) => log::warn!("could not read {}: {e:#}", path.display()),
            }
        }
    }

    exercise
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Replay engine over the configured recording, or over the exercise's own
/// reference animation.
fn build_engine(config: &AppConfig, exercise: &ExerciseInfo) -> Result<Box<dyn PoseEngine>, EngineError> {
    let options = config.capture.engine.clone();
    let engine = match (&config.capture.replay_file, &exercise.animation) {
        (Some(path), _) => ReplayEngine::load(path, options)?,
        (None, Some(animation)) => ReplayEngine::from_animation(animation, options)?,
        (None, None) => {
            return Err(EngineError::Init(
                "no pose model or replay recording configured".into(),
            ))
        }
    };
    Ok(Box::new(engine))
}

#[cfg(feature = "camera")]
fn open_source(config: &AppConfig) -> Result<Box<dyn FrameSource>, PipelineError> {
    let camera = pose_coach::capture::CameraSource::open(config.capture.camera_index)?;
    Ok(Box::new(camera))
}

#[cfg(not(feature = "camera"))]
fn open_source(config: &AppConfig) -> Result<Box<dyn FrameSource>, PipelineError> {
    let source = pose_coach::capture::SyntheticSource::new(config.capture.width, config.capture.height, 30)?;
    Ok(Box::new(source))
}

fn start_capture(
    config: &AppConfig,
    exercise: &ExerciseInfo,
    pause: PauseFlag,
    dispatcher: FeedbackDispatcher,
) -> Result<CaptureLoop, PipelineError> {
    let engine = build_engine(config, exercise)?;
    let mut source = open_source(config)?;
    let worker = match InferenceWorker::spawn(engine) {
        Ok(worker) => worker,
        Err(e) => {
            source.release();
            return Err(e.into());
        }
    };
    Ok(CaptureLoop::start(
        source,
        worker,
        Box::new(dispatcher),
        pause,
        LoopSettings::from_config(&config.capture),
    ))
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Pose Coach")
        .with_inner_size([width, height])
        .with_min_inner_size([720.0, 420.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Pose coach starting up");

    // 2. Configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    config.apply_args(std::env::args().skip(1));

    // 3. Tokio runtime (HTTP calls only)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Analysis client
    let client: Arc<dyn AnalysisClient> = Arc::new(HttpAnalysisClient::from_config(&config.analysis));

    // 5. Exercise + reference animation
    let exercise = load_exercise(&rt, client.as_ref(), &config);

    // 6. Channels and shared pause state
    let (hotkey_tx, hotkey_rx) = mpsc::channel::<HotkeyEvent>(16);
    let (feedback, feedback_tx) = FeedbackState::channel();
    let pause = pose_coach::pipeline::PauseSwitch::new();

    // 7. Live capture
    let dispatcher = FeedbackDispatcher::new(
        Arc::clone(&client),
        &config.analysis.exercise_id,
        rt.handle().clone(),
        feedback_tx,
    );
    let capture = start_capture(&config, &exercise, pause.flag(), dispatcher).map_err(|e| {
        log::error!("live analysis disabled: {e}");
        e.to_string()
    });

    let player = AnimationPlayer::new(
        exercise.animation.clone(),
        config.animation.frame_interval(),
        SkeletonRenderer::new(config.capture.visibility_threshold, SkeletonStyle::REFERENCE),
        pause.flag(),
    );

    // 8. Hotkey listener thread
    let _hotkey_listener = match HotkeyBindings::from_config(&config.hotkey) {
        Some(bindings) => HotkeyListener::start(bindings, hotkey_tx)
            .map_err(|e| log::warn!("hotkeys unavailable: {e}"))
            .ok(),
        None => {
            log::warn!(
                "invalid hotkeys {:?}/{:?}; global hotkeys disabled",
                config.hotkey.pause_key,
                config.hotkey.finish_key
            );
            None
        }
    };

    // 9. Build the egui app and run it (blocks until the window is closed)
    let options = native_options(&config);
    let parts = AppParts {
        config,
        exercise,
        runtime: rt.handle().clone(),
        client,
        pause,
        capture,
        player,
        feedback,
        hotkey_rx,
    };

    eframe::run_native(
        "Pose Coach",
        options,
        Box::new(move |cc| Ok(Box::new(CoachApp::new(parts, &cc.egui_ctx)))),
    )
    .map_err(|e| anyhow::anyhow!("window error: {e}"))
}
