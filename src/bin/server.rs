use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use pilesim::config::{DisturbanceParams, Params};
use pilesim::export::{self, ExportRecord};
use pilesim::render::{self, Overlay};
use pilesim::sim::HIGHLIGHT_MS;
use pilesim::DisturbancePlan;

const MAX_GRID_SIZE: usize = 10_000;
const MAX_PARTICLES: u32 = 1_000_000;
const MAX_DISTURBANCE_TICKS: usize = 10_000;

#[derive(Deserialize)]
struct SimulateRequest {
    seed: Option<u64>,
    #[serde(default)]
    params: Params,
    /// Omit to stop after the building phase.
    disturbance: Option<DisturbanceParams>,
    disturbance_ticks: Option<usize>,
    image_width: Option<usize>,
    image_height: Option<usize>,
}

#[derive(Serialize)]
struct SimulateResponse {
    export: ExportRecord,
    image: String,
    highlight: Option<Highlight>,
    timings: Vec<TimingEntry>,
}

/// Cell of the latest avalanche and how long a client should keep it lit.
#[derive(Serialize)]
struct Highlight {
    position: usize,
    ms: u64,
}

#[derive(Serialize)]
struct TimingEntry {
    name: String,
    ms: f64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, msg: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
}

fn encode_png(rgba: &[u8], w: usize, h: usize) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder.write_image(rgba, w as u32, h as u32, image::ExtendedColorType::Rgba8)?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    Ok(format!("data:image/png;base64,{}", b64))
}

/// Reject requests whose run would be unbounded in memory or time.
fn check_limits(req: &SimulateRequest) -> Result<(), ApiError> {
    if req.params.grid_size > MAX_GRID_SIZE {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("grid_size {} exceeds {MAX_GRID_SIZE}", req.params.grid_size),
        ));
    }
    if req.params.target_particles > MAX_PARTICLES {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("target_particles {} exceeds {MAX_PARTICLES}", req.params.target_particles),
        ));
    }
    if let Some(ticks) = req.disturbance_ticks
        && ticks > MAX_DISTURBANCE_TICKS
    {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("disturbance_ticks {ticks} exceeds {MAX_DISTURBANCE_TICKS}"),
        ));
    }
    Ok(())
}

async fn simulate_handler(
    Json(req): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, ApiError> {
    check_limits(&req)?;

    let seed = req.seed.unwrap_or(42);
    let width = req.image_width.unwrap_or(800).clamp(16, 4096);
    let height = req.image_height.unwrap_or(400).clamp(16, 4096);
    let plan = req.disturbance.map(|params| DisturbancePlan {
        params,
        ticks: req.disturbance_ticks.unwrap_or(50),
    });
    let params = req.params;

    let response = tokio::task::spawn_blocking(move || {
        let (sim, timings) = pilesim::simulate(seed, &params, plan.as_ref())
            .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;

        let overlay = Overlay {
            material: params.material,
            uniform: params.uniform,
            recent: sim.recent_avalanche(),
            markers: sim.markers(),
            disturbance: sim.disturbance_params().kind,
        };
        let rgba = render::render_profile(sim.profile(), &overlay, width, height);
        let image = encode_png(&rgba, width, height)
            .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

        let timings = timings
            .iter()
            .map(|t| TimingEntry {
                name: t.name.to_string(),
                ms: t.ms,
            })
            .collect();

        let highlight = sim.recent_avalanche().map(|e| Highlight {
            position: e.position,
            ms: HIGHLIGHT_MS,
        });

        Ok::<_, ApiError>(SimulateResponse {
            export: export::export(&sim),
            image,
            highlight,
            timings,
        })
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))??;

    Ok(Json(response))
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let app = Router::new()
        .route("/api/simulate", post(simulate_handler))
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!(%addr, "pilesim server listening");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
