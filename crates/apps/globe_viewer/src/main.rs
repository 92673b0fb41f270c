//! Headless globe viewer.
//!
//! Mounts the widget against an always-available graphics probe, generates
//! arc data on a worker thread, drives a fixed number of animation frames and
//! prints a JSON summary of the outcome.
//!
//! `showcase.json` next to this crate's manifest holds the showcase globe
//! configuration in its wire format, ready to edit:
//!
//! ```text
//! RUST_LOG=info globe_viewer --config crates/apps/globe_viewer/showcase.json --frames 120
//! ```

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use clap::Parser;
use compute::generator::WorkerFactory;
use compute::worker::{ArcWorker, FlakyWorker, InlineWorker, ThreadWorker};
use globe_web::widget::{self, GlobeWidget, SharedWidget, WidgetEnv, WidgetOptions};
use gpu::context::StaticProbe;
use layers::config::{ConfigError, GlobeConfig, WidgetSettings};
use layers::hex_polygons::BoundaryDataset;
use layers::layer::Layer;
use runtime::frame::FrameQueue;
use runtime::timer::TokioTimer;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "globe_viewer", about = "Render the arc globe headlessly")]
struct Args {
    /// Globe configuration JSON (defaults to the showcase configuration).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Widget settings JSON.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Country boundaries GeoJSON for the hex overlay.
    #[arg(long)]
    boundaries: Option<PathBuf>,

    /// Animation frames to run after the scene settles.
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Make the first N generation attempts fail.
    #[arg(long, default_value_t = 0)]
    fail_first: u32,

    /// Seed for reproducible arc data.
    #[arg(long)]
    seed: Option<u64>,

    /// Generate on the calling thread instead of a worker thread.
    #[arg(long)]
    inline_worker: bool,
}

#[derive(Debug, thiserror::Error)]
enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to encode summary: {0}")]
    Summary(#[from] serde_json::Error),
}

fn load_options(args: &Args) -> Result<WidgetOptions, ConfigError> {
    let config = match &args.config {
        Some(path) => GlobeConfig::from_json_path(path)?,
        None => GlobeConfig::showcase(),
    };
    let mut settings = match &args.settings {
        Some(path) => WidgetSettings::from_json_path(path)?,
        None => WidgetSettings::default(),
    };
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    let boundaries = match &args.boundaries {
        Some(path) => Some(Arc::new(BoundaryDataset::from_path(path)?)),
        None => None,
    };
    Ok(WidgetOptions {
        config,
        settings,
        boundaries,
        ..WidgetOptions::default()
    })
}

fn workers(args: &Args, seed: Option<u64>) -> WorkerFactory {
    let inline = args.inline_worker;
    let budget = Arc::new(AtomicU32::new(args.fail_first));
    Box::new(move || {
        let worker: Arc<dyn ArcWorker> = if inline {
            Arc::new(FlakyWorker::new(InlineWorker::new(seed), budget.clone()))
        } else {
            Arc::new(FlakyWorker::new(ThreadWorker::spawn(seed)?, budget.clone()))
        };
        Ok(worker)
    })
}

fn summary(widget: &GlobeWidget, frames_run: u32) -> serde_json::Value {
    let controller = widget.controller();
    let rotation = controller
        .globe()
        .and_then(|globe| widget.world().transform(globe))
        .map(|t| t.rotation.y);
    let events: Vec<_> = widget
        .events()
        .lock()
        .events()
        .iter()
        .map(|e| json!({ "kind": e.kind, "message": e.message }))
        .collect();
    json!({
        "status": widget.status(),
        "records": widget.records().map_or(0, <[_]>::len),
        "arcs": controller.arcs().len(),
        "points": controller.points().len(),
        "rings": controller.rings().len(),
        "hexFeatures": controller.hex_polygons().len(),
        "framesRun": frames_run,
        "rotationY": rotation,
        "events": events,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ViewerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let options = load_options(&args)?;
    let frames = FrameQueue::new();
    let env = WidgetEnv {
        timer: Arc::new(TokioTimer),
        frames: Arc::new(frames.clone()),
        workers: workers(&args, options.settings.seed),
    };

    let shared: SharedWidget = Rc::new(RefCell::new(GlobeWidget::mount(
        options,
        &StaticProbe(true),
        env,
    )));
    widget::load(shared.clone()).await;

    let mut frames_run = 0;
    while frames_run < args.frames && !frames.take_due().is_empty() {
        if shared.borrow_mut().on_animation_frame().is_none() {
            break;
        }
        frames_run += 1;
    }
    info!(frames_run, "viewer finished");

    let report = summary(&shared.borrow(), frames_run);
    println!("{}", serde_json::to_string_pretty(&report)?);
    shared.borrow_mut().unmount();
    Ok(())
}
