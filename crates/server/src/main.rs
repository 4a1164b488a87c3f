mod routes;
mod socket;
mod state;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};

use facestat_core::demographics::domain::demographic_estimator::EstimatorKind;
use facestat_core::demographics::infrastructure::estimator_factory::{create_estimator, ModelSource};
use facestat_core::demographics::infrastructure::onnx_age_gender_estimator::ChannelOrder;
use facestat_core::detection::infrastructure::cascade_face_locator::CascadeParams;
use facestat_core::detection::infrastructure::locator_factory::{create_locator, LocatorKind};
use facestat_core::pipeline::process_frame_use_case::ProcessFrameUseCase;
use facestat_core::shared::constants::{
    CASCADE_FILE_NAME, DEFAULT_JPEG_QUALITY, DEFAULT_MIN_FACE_SIZE, DEFAULT_MIN_NEIGHBORS,
    DEFAULT_SCALE_FACTOR,
};
use facestat_core::shared::model_resolver;
use facestat_core::statistics::statistics_aggregator::StatisticsAggregator;

use state::AppState;

/// Streams video frames through face location and age/gender estimation.
#[derive(Parser, Debug)]
#[command(name = "facestat-server")]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Directory holding the cascade and model files.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Cascade XML file (defaults to the frontal-face cascade in the models directory).
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Ratio between detection pyramid levels (must be greater than 1).
    #[arg(long, default_value_t = DEFAULT_SCALE_FACTOR)]
    scale_factor: f64,

    /// Neighbouring hits a face needs to be reported.
    #[arg(long, default_value_t = DEFAULT_MIN_NEIGHBORS)]
    min_neighbors: usize,

    /// Smallest face side in pixels.
    #[arg(long, default_value_t = DEFAULT_MIN_FACE_SIZE)]
    min_face_size: u32,

    /// Age/gender estimator: model or stand-in.
    #[arg(long, default_value = "stand-in")]
    estimator: String,

    /// Download URL for the age model, used when the file is absent.
    #[arg(long)]
    age_model_url: Option<String>,

    /// Download URL for the gender model, used when the file is absent.
    #[arg(long)]
    gender_model_url: Option<String>,

    /// Channel order the age/gender models expect: rgb or bgr.
    #[arg(long, default_value = "rgb")]
    channel_order: String,

    /// JPEG quality of annotated frames (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    jpeg_quality: u8,

    /// Origin allowed by CORS (any origin when omitted).
    #[arg(long)]
    cors_origin: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let cors = build_cors(cli.cors_origin.as_deref())?;

    let models_dir = match &cli.models_dir {
        Some(dir) => dir.clone(),
        None => model_resolver::default_models_dir()?,
    };
    let cascade = cli
        .cascade
        .clone()
        .unwrap_or_else(|| models_dir.join(CASCADE_FILE_NAME));
    let params = CascadeParams {
        scale_factor: cli.scale_factor,
        min_neighbors: cli.min_neighbors,
        min_size: cli.min_face_size,
    };
    let source = ModelSource {
        models_dir,
        age_url: cli.age_model_url.clone(),
        gender_url: cli.gender_model_url.clone(),
        channel_order: parse_channel_order(&cli.channel_order),
    };
    let requested = parse_estimator(&cli.estimator);
    let jpeg_quality = cli.jpeg_quality;

    let statistics = Arc::new(StatisticsAggregator::new());
    let (pipeline, locator_kind) = {
        let statistics = Arc::clone(&statistics);
        // Model loading may download and blocks on file IO.
        tokio::task::spawn_blocking(move || {
            let (locator, locator_kind) = create_locator(&cascade, params);
            let estimator = create_estimator(requested, &source);
            let pipeline = ProcessFrameUseCase::new(locator, estimator, statistics, jpeg_quality);
            (pipeline, locator_kind)
        })
        .await?
    };
    log::info!("{}", in_service(locator_kind, pipeline.estimator_kind()));

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        statistics,
    });
    let app = routes::router(state, cors);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {addr}: {e}"))?;
    log::info!("Listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Could not listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.scale_factor.is_nan() || cli.scale_factor <= 1.0 {
        return Err(format!(
            "Scale factor must be greater than 1.0, got {}",
            cli.scale_factor
        )
        .into());
    }
    if cli.min_face_size == 0 {
        return Err("Minimum face size must be at least 1 pixel".into());
    }
    if !(1..=100).contains(&cli.jpeg_quality) {
        return Err(format!(
            "JPEG quality must be between 1 and 100, got {}",
            cli.jpeg_quality
        )
        .into());
    }
    if cli.estimator != "model" && cli.estimator != "stand-in" {
        return Err(format!(
            "Estimator must be 'model' or 'stand-in', got '{}'",
            cli.estimator
        )
        .into());
    }
    if cli.channel_order != "rgb" && cli.channel_order != "bgr" {
        return Err(format!(
            "Channel order must be 'rgb' or 'bgr', got '{}'",
            cli.channel_order
        )
        .into());
    }
    Ok(())
}

fn build_cors(origin: Option<&str>) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin {
        None => Ok(cors.allow_origin(Any)),
        Some(origin) => {
            let value = HeaderValue::from_str(origin)
                .map_err(|_| format!("Invalid CORS origin: '{origin}'"))?;
            Ok(cors.allow_origin(value))
        }
    }
}

fn parse_estimator(choice: &str) -> EstimatorKind {
    if choice == "model" {
        EstimatorKind::Model
    } else {
        EstimatorKind::StandIn
    }
}

fn in_service(locator: LocatorKind, estimator: EstimatorKind) -> String {
    format!("In service: face locator {locator}, estimator {estimator}")
}

fn parse_channel_order(order: &str) -> ChannelOrder {
    if order == "bgr" {
        ChannelOrder::Bgr
    } else {
        ChannelOrder::Rgb
    }
}
