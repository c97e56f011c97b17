use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ghostlink_core::{
    decode_wav, encode_bytes_to_wav, BitDepth, Channels, DecodeConfig, Density, EncodeConfig,
    EncodeRequest, GhostlinkError, InputSource, JsonDedupStore, MixProfile,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

const BASE_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra time granted per KiB of request payload
const TIMEOUT_PER_KIB: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] GhostlinkError),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("worker failed: {0}")]
    Worker(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<JsonDedupStore>,
    scratch_dir: PathBuf,
}

impl AppState {
    pub fn new(store: JsonDedupStore, scratch_dir: PathBuf) -> Self {
        Self {
            store: Arc::new(store),
            scratch_dir,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EncodeMode {
    Text,
    File,
    Dir,
}

/// Modem parameters as accepted over HTTP; omitted fields take the CLI defaults
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EncodeParams {
    pub samplerate: u32,
    pub baud: f64,
    pub amp: f64,
    pub dense: bool,
    pub mix_profile: MixProfile,
    pub preamble: f64,
    pub gap: f64,
    pub interleave: usize,
    pub repeats: usize,
    pub ramp: f64,
    pub bit_depth: u16,
    pub channels: u16,
    pub slow_variants: bool,
}

impl Default for EncodeParams {
    fn default() -> Self {
        let config = EncodeConfig::default();
        Self {
            samplerate: config.sample_rate,
            baud: config.baud,
            amp: config.amplitude,
            dense: config.density.is_dense(),
            mix_profile: config.mix_profile,
            preamble: config.preamble_s,
            gap: config.gap_ms,
            interleave: config.interleave_depth,
            repeats: config.repeats,
            ramp: config.ramp_ms,
            bit_depth: config.bit_depth.bits(),
            channels: config.channels.count(),
            slow_variants: config.slow_variants,
        }
    }
}

impl EncodeParams {
    fn to_config(&self) -> Result<EncodeConfig, ApiError> {
        let config = EncodeConfig {
            sample_rate: self.samplerate,
            baud: self.baud,
            amplitude: self.amp,
            density: Density::from_dense_flag(self.dense),
            mix_profile: self.mix_profile,
            gap_ms: self.gap,
            preamble_s: self.preamble,
            interleave_depth: self.interleave,
            repeats: self.repeats,
            ramp_ms: self.ramp,
            bit_depth: BitDepth::from_bits(self.bit_depth)?,
            channels: Channels::from_count(self.channels)?,
            slow_variants: self.slow_variants,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
pub struct EncodeBody {
    pub mode: EncodeMode,
    pub text: Option<String>,
    pub file_path: Option<PathBuf>,
    pub input_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub custom_filename: Option<String>,
    #[serde(flatten)]
    pub params: EncodeParams,
}

impl EncodeBody {
    fn source(&self) -> Result<InputSource, ApiError> {
        let missing = |field: &str| ApiError::BadRequest(format!("{} is required for this mode", field));
        let source = match self.mode {
            EncodeMode::Text => InputSource::Text(self.text.clone().ok_or_else(|| missing("text"))?),
            EncodeMode::File => InputSource::File(self.file_path.clone().ok_or_else(|| missing("file_path"))?),
            EncodeMode::Dir => InputSource::Dir(self.input_dir.clone().ok_or_else(|| missing("input_dir"))?),
        };
        source.validate()?;
        if self.custom_filename.is_some() && !source.allows_out_name() {
            return Err(ApiError::BadRequest(
                "custom_filename cannot be used with dir mode".to_string(),
            ));
        }
        Ok(source)
    }

    fn input_size(&self) -> u64 {
        match self.mode {
            EncodeMode::Text => self.text.as_ref().map_or(0, |t| t.len() as u64),
            EncodeMode::File => self
                .file_path
                .as_ref()
                .and_then(|p| fs::metadata(p).ok())
                .map_or(0, |m| m.len()),
            EncodeMode::Dir => self
                .input_dir
                .as_ref()
                .and_then(|d| fs::read_dir(d).ok())
                .map_or(0, |entries| {
                    entries
                        .filter_map(|e| e.ok()?.metadata().ok())
                        .map(|m| m.len())
                        .sum()
                }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct EncodeResponse {
    pub success: bool,
    pub files: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct DecodeBody {
    /// Base64 of a complete mono 16-bit WAV file
    pub audio_base64: String,
    #[serde(default = "default_baud")]
    pub baud: f64,
    #[serde(default = "default_true")]
    pub dense: bool,
    #[serde(default)]
    pub mix_profile: MixProfile,
    #[serde(default = "default_preamble")]
    pub preamble: f64,
    #[serde(default = "default_interleave")]
    pub interleave: usize,
    #[serde(default = "default_repeats")]
    pub repeats: usize,
}

fn default_baud() -> f64 {
    ghostlink_core::DEFAULT_BAUD
}

fn default_true() -> bool {
    true
}

fn default_preamble() -> f64 {
    ghostlink_core::DEFAULT_PREAMBLE_S
}

fn default_interleave() -> usize {
    ghostlink_core::DEFAULT_INTERLEAVE_DEPTH
}

fn default_repeats() -> usize {
    ghostlink_core::DEFAULT_REPEATS
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DecodeResponse {
    pub success: bool,
    /// Present when the payload is valid UTF-8
    pub decoded_text: Option<String>,
    pub decoded_hex: String,
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn timeout_for(input_bytes: u64) -> Duration {
    BASE_TIMEOUT + TIMEOUT_PER_KIB * (input_bytes / 1024).min(u32::MAX as u64) as u32
}

/// Run a blocking core call on the blocking pool, bounded by `limit`
async fn run_blocking<T, F>(limit: Duration, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ApiError::Worker(join_err.to_string())),
        Err(_) => Err(ApiError::Timeout(limit)),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn encode(State(state): State<AppState>, Json(body): Json<EncodeBody>) -> Result<Json<EncodeResponse>, ApiError> {
    let config = body.params.to_config()?;
    let source = body.source()?;
    let limit = timeout_for(body.input_size());

    let response = run_blocking(limit, move || {
        let items = source.items();
        info!("Encode request: {} payload(s) from {} input", items.len(), source.mode());
        if items.is_empty() {
            return Err(ApiError::BadRequest("no readable input".to_string()));
        }

        let mut files = Vec::new();
        let mut skipped = Vec::new();
        for item in &items {
            let request = EncodeRequest {
                payload: &item.bytes,
                name_hint: &item.name_hint,
                out_dir: &body.output_dir,
                out_name: body.custom_filename.as_deref(),
            };
            let outcome = encode_bytes_to_wav(&request, &config, state.store.as_ref())?;
            if outcome.skipped {
                skipped.push(outcome.path);
            } else {
                files.push(outcome.path);
            }
        }
        Ok(EncodeResponse {
            success: true,
            files,
            skipped,
        })
    })
    .await?;

    info!(
        "Encode request: {} written, {} skipped",
        response.files.len(),
        response.skipped.len()
    );
    Ok(Json(response))
}

async fn decode(State(state): State<AppState>, Json(body): Json<DecodeBody>) -> Result<Json<DecodeResponse>, ApiError> {
    let config = DecodeConfig {
        baud: body.baud,
        density: Density::from_dense_flag(body.dense),
        mix_profile: body.mix_profile,
        preamble_s: body.preamble,
        interleave_depth: body.interleave,
        repeats: body.repeats,
    };
    config.validate()?;

    let audio = STANDARD
        .decode(body.audio_base64.as_bytes())
        .map_err(|e| ApiError::BadRequest(format!("invalid base64 audio: {}", e)))?;
    let limit = timeout_for(audio.len() as u64);
    let upload = state.scratch_dir.join(format!("upload-{}.wav", Uuid::new_v4()));

    let payload = run_blocking(limit, move || {
        fs::create_dir_all(&state.scratch_dir).map_err(GhostlinkError::from)?;
        fs::write(&upload, &audio).map_err(GhostlinkError::from)?;
        let result = decode_wav(&upload, &config);
        if let Err(e) = fs::remove_file(&upload) {
            warn!("Failed to remove upload {}: {}", upload.display(), e);
        }
        Ok(result?)
    })
    .await?;

    let decoded_text = String::from_utf8(payload.clone()).ok();
    Ok(Json(DecodeResponse {
        success: true,
        decoded_text,
        decoded_hex: hex(&payload),
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/encode", post(encode))
        .route("/api/decode", post(decode))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
