//! Application entry point — describelo.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the three service clients from config.
//! 5. Create the intent channel and the shared session.
//! 6. Spawn the session orchestrator on the tokio runtime, owning the
//!    recording controller.
//! 7. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed; closing drops the intent sender, which shuts the
//!    orchestrator down.

use std::sync::Arc;

use tokio::sync::mpsc;

use describelo::{
    app::DescribeloApp,
    audio::RecordingController,
    config::AppConfig,
    services::{
        ApiEvaluationService, ApiImageService, ApiTranscriptionService, EvaluationService,
        ImageService, TranscriptionService,
    },
    session::{new_shared_session, SessionOrchestrator, UserIntent},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_inner_size([width, height])
        .with_min_inner_size([360.0, 480.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("describelo starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    if config.services.resolved_api_key().is_none() {
        log::warn!(
            "No API key configured (settings.toml or DESCRIBELO_API_KEY) — \
             service calls will likely be rejected"
        );
    }

    // 3. Tokio runtime (2 workers — one external call plus dictation at most)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Service clients
    let images: Arc<dyn ImageService> = Arc::new(ApiImageService::from_config(&config.services));
    let evaluator: Arc<dyn EvaluationService> =
        Arc::new(ApiEvaluationService::from_config(&config.services));
    let transcriber: Arc<dyn TranscriptionService> =
        Arc::new(ApiTranscriptionService::from_config(&config.services));

    // 5. Channel + shared session
    let (intents_tx, intents_rx) = mpsc::channel::<UserIntent>(16);
    let session = new_shared_session();

    // 6. Orchestrator, owning the recording controller
    let capture = RecordingController::new(config.audio.sample_rate, config.audio.max_clip_secs);
    let orchestrator = SessionOrchestrator::new(
        Arc::clone(&session),
        images,
        evaluator,
        transcriber,
        Box::new(capture),
    );
    rt.spawn(orchestrator.run(intents_rx));

    // 7. Run the shell (blocks until the window closes; dropping the app
    //    drops intents_tx, which ends the orchestrator loop)
    let app = DescribeloApp::new(session, intents_tx);
    let options = native_options(&config);

    eframe::run_native("describelo", options, Box::new(move |_cc| Ok(Box::new(app))))
}
