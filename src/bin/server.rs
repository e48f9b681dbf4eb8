use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::{Json, Router, extract::State, routing::post};
use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use loopgen::config::Params;
use loopgen::dir::Mode;
use loopgen::driver::CancelFlag;
use loopgen::render;

/// Each command stops whatever run is still in flight before starting its
/// own, so the board behaves like one shared canvas.
#[derive(Clone, Default)]
struct AppState {
    current: Arc<Mutex<Option<CancelFlag>>>,
}

impl AppState {
    fn begin_run(&self) -> CancelFlag {
        let flag = CancelFlag::new();
        let mut current = self.current.lock().expect("run registry poisoned");
        if let Some(prev) = current.replace(flag.clone()) {
            prev.cancel();
        }
        flag
    }
}

#[derive(Deserialize)]
struct RestartRequest {
    seed: Option<u64>,
    cols: Option<usize>,
    rows: Option<usize>,
    mode: Option<String>,
    tile_size: Option<usize>,
    retry_budget: Option<u32>,
    animation_steps: Option<usize>,
}

#[derive(Deserialize)]
struct PathRequest {
    seed: Option<u64>,
    cols: Option<usize>,
    rows: Option<usize>,
    mode: Option<String>,
    tile_size: Option<usize>,
    animation_steps: Option<usize>,
    src: Option<[usize; 2]>,
    dst: Option<[usize; 2]>,
    search_depth_limit: Option<usize>,
    search_node_budget: Option<usize>,
}

#[derive(Serialize)]
struct Layer {
    name: String,
    data_url: String,
}

#[derive(Serialize)]
struct TimingEntry {
    name: String,
    ms: f64,
}

#[derive(Serialize)]
struct RestartResponse {
    layers: Vec<Layer>,
    timings: Vec<TimingEntry>,
    width: usize,
    height: usize,
    populate_steps: usize,
    forced_merges: usize,
    completed: bool,
    cancelled: bool,
}

#[derive(Serialize)]
struct PathResponse {
    layers: Vec<Layer>,
    timings: Vec<TimingEntry>,
    width: usize,
    height: usize,
    path_len: usize,
    nodes: usize,
    exhausted: bool,
    seeded: bool,
    cancelled: bool,
}

fn encode_png(rgba: &[u8], w: usize, h: usize) -> String {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder
        .write_image(rgba, w as u32, h as u32, image::ExtendedColorType::Rgba8)
        .expect("PNG encode failed");
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    format!("data:image/png;base64,{}", b64)
}

fn parse_mode(name: Option<&str>) -> Result<Mode, (StatusCode, String)> {
    match name {
        None => Ok(Mode::Eight),
        Some(s) => Mode::from_name(s)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("unknown mode {s:?}"))),
    }
}

fn timing_entries(timings: &[loopgen::Timing]) -> Vec<TimingEntry> {
    timings
        .iter()
        .map(|t| TimingEntry {
            name: t.name.to_string(),
            ms: t.ms,
        })
        .collect()
}

async fn restart_handler(
    State(state): State<AppState>,
    Json(req): Json<RestartRequest>,
) -> Result<Json<RestartResponse>, (StatusCode, String)> {
    let seed = req.seed.unwrap_or(42);
    let cols = req.cols.unwrap_or(64);
    let rows = req.rows.unwrap_or(64);
    let mode = parse_mode(req.mode.as_deref())?;

    let defaults = Params::default();
    let params = Params {
        tile_size: req.tile_size.unwrap_or(defaults.tile_size).max(1),
        retry_budget: req.retry_budget.unwrap_or(defaults.retry_budget),
        animation_steps: req.animation_steps.unwrap_or(defaults.animation_steps),
        ..defaults
    };

    let cancel = state.begin_run();
    tokio::time::sleep(Duration::from_millis(params.restart_delay_ms)).await;

    let response = tokio::task::spawn_blocking(move || {
        let (outcome, timings) = loopgen::simulate(seed, cols, rows, mode, &params, &cancel)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

        let width = cols * params.tile_size;
        let height = rows * params.tile_size;
        let dir_rgba = render::render_directions(&outcome.board).to_rgba(params.tile_size);

        Ok(RestartResponse {
            layers: vec![
                Layer {
                    name: "board".into(),
                    data_url: encode_png(&outcome.rgba, width, height),
                },
                Layer {
                    name: "directions".into(),
                    data_url: encode_png(&dir_rgba, width, height),
                },
            ],
            timings: timing_entries(&timings),
            width,
            height,
            populate_steps: outcome.populate_steps,
            forced_merges: outcome.merges.len(),
            completed: outcome.completed,
            cancelled: outcome.cancelled,
        })
    })
    .await
    .expect("simulation task panicked")?;

    Ok(Json(response))
}

async fn path_handler(
    State(state): State<AppState>,
    Json(req): Json<PathRequest>,
) -> Result<Json<PathResponse>, (StatusCode, String)> {
    let seed = req.seed.unwrap_or(42);
    let cols = req.cols.unwrap_or(64);
    let rows = req.rows.unwrap_or(64);
    let mode = parse_mode(req.mode.as_deref())?;
    let src = req.src.map(|p| (p[0], p[1])).unwrap_or((2, 2));
    let dst = req.dst.map(|p| (p[0], p[1])).unwrap_or((2, 1));

    let defaults = Params::default();
    let params = Params {
        tile_size: req.tile_size.unwrap_or(defaults.tile_size).max(1),
        animation_steps: req.animation_steps.unwrap_or(defaults.animation_steps),
        search_depth_limit: req.search_depth_limit.unwrap_or(defaults.search_depth_limit),
        search_node_budget: req.search_node_budget.unwrap_or(defaults.search_node_budget),
        ..defaults
    };

    let cancel = state.begin_run();
    tokio::time::sleep(Duration::from_millis(params.restart_delay_ms)).await;

    let response = tokio::task::spawn_blocking(move || {
        let (outcome, timings) =
            loopgen::demonstrate_path(seed, cols, rows, mode, src, dst, &params, &cancel)
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

        let width = cols * params.tile_size;
        let height = rows * params.tile_size;
        let dir_rgba = render::render_directions(&outcome.board).to_rgba(params.tile_size);

        Ok(PathResponse {
            layers: vec![
                Layer {
                    name: "demo".into(),
                    data_url: encode_png(&outcome.rgba, width, height),
                },
                Layer {
                    name: "directions".into(),
                    data_url: encode_png(&dir_rgba, width, height),
                },
            ],
            timings: timing_entries(&timings),
            width,
            height,
            path_len: outcome.path.len(),
            nodes: outcome.nodes,
            exhausted: outcome.exhausted,
            seeded: outcome.seeded,
            cancelled: outcome.cancelled,
        })
    })
    .await
    .expect("search task panicked")?;

    Ok(Json(response))
}

#[tokio::main]
async fn main() {
    let frontend = ServeDir::new("frontend");

    let app = Router::new()
        .route("/api/restart", post(restart_handler))
        .route("/api/path", post(path_handler))
        .fallback_service(frontend)
        .with_state(AppState::default());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    eprintln!("loopgen server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
