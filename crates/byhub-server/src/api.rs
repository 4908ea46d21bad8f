use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use byhub_shared::constants::UPLOAD_FILE_FIELD;
use byhub_shared::{AppFieldsInput, PackageRecord, SafetyReport};

use crate::asset_store::{read_chunks, AssetStore, StagedAsset};
use crate::auth::AdminSession;
use crate::catalog::CatalogService;
use crate::config::ServerConfig;
use crate::error::ServerError;

/// Room for the text fields and multipart framing on top of the package.
const FORM_OVERHEAD: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let body_limit = state.config.max_upload_size.saturating_add(FORM_OVERHEAD);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", post(login))
        .route("/api/apps", get(list_apps))
        .route("/api/apps/upload", post(upload_app))
        .route("/api/apps/analyze", post(analyze_app))
        .route(
            "/api/apps/:id",
            get(get_app).put(update_app).delete(delete_app),
        )
        .route("/api/apps/:id/download", get(download_app))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginUser {
    username: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: LoginUser,
}

#[derive(Serialize)]
struct UploadResponse {
    id: Uuid,
    message: &'static str,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    /// Always `true`: the report is informational and is not stored.
    advisory: bool,
    report: SafetyReport,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ServerError> {
    let Json(req) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let (token, identity) = state
        .catalog
        .authenticate(req.username, req.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            username: identity.username,
        },
    }))
}

async fn list_apps(State(state): State<AppState>) -> Result<Json<Vec<PackageRecord>>, ServerError> {
    Ok(Json(state.catalog.list_apps().await?))
}

async fn get_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PackageRecord>, ServerError> {
    let id = parse_app_id(&id)?;
    Ok(Json(state.catalog.get_app(id).await?))
}

async fn upload_app(
    session: AdminSession,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ServerError> {
    let mut multipart = multipart.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let max = state.config.max_upload_size;

    let mut input = AppFieldsInput::default();
    let mut package = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == UPLOAD_FILE_FIELD || name == "file" {
            // A repeated file field replaces the earlier one, whose staged
            // file is dropped and removed.
            package = Some(stage_package(state.catalog.assets(), field, max).await?);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| multipart_error(e, max))?;
        if !input.set(&name, value) {
            debug!(field = %name, "Ignoring unknown upload field");
        }
    }

    let package = package.ok_or_else(|| {
        ServerError::BadRequest(format!(
            "Missing '{UPLOAD_FILE_FIELD}' file field in multipart form"
        ))
    })?;

    let record = state.catalog.upload_app(&session, input, package).await?;

    Ok(Json(UploadResponse {
        id: record.id,
        message: "App uploaded successfully",
    }))
}

/// Stream the file field to a staged asset chunk by chunk.
async fn stage_package(
    assets: &AssetStore,
    mut field: Field<'_>,
    max: usize,
) -> Result<StagedAsset, ServerError> {
    let file_name = field.file_name().unwrap_or("package.apk").to_string();
    let mut staged = assets.stage(&file_name).await?;

    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, max))? {
        staged.write(&chunk).await?;
    }

    Ok(staged)
}

fn multipart_error(e: MultipartError, max: usize) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge { max }
    } else {
        ServerError::BadRequest(format!("Multipart error: {}", e.body_text()))
    }
}

async fn update_app(
    session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AppFieldsInput>, JsonRejection>,
) -> Result<Json<MessageResponse>, ServerError> {
    let id = parse_app_id(&id)?;
    let Json(input) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    state.catalog.update_app(&session, id, input).await?;

    Ok(Json(MessageResponse {
        message: "App updated successfully",
    }))
}

async fn delete_app(
    session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    let id = parse_app_id(&id)?;
    state.catalog.delete_app(&session, id).await?;

    Ok(Json(MessageResponse {
        message: "App deleted",
    }))
}

async fn download_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let id = parse_app_id(&id)?;
    let asset = state.catalog.download_app(id).await?;

    debug!(id = %id, size = asset.len, file = %asset.file_name, "Serving download");

    let disposition = format!("attachment; filename=\"{}\"", asset.file_name);
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.android.package-archive".to_string(),
            ),
            (header::CONTENT_LENGTH, asset.len.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(read_chunks(asset.file)),
    )
        .into_response())
}

async fn analyze_app(
    session: AdminSession,
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ServerError> {
    let Json(req) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let report = state
        .catalog
        .analyze(&session, &req.name, &req.description)
        .await?;

    Ok(Json(AnalyzeResponse {
        advisory: true,
        report,
    }))
}

/// Ids are UUIDs; anything else cannot name an existing record.
fn parse_app_id(raw: &str) -> Result<Uuid, ServerError> {
    Uuid::parse_str(raw).map_err(|_| ServerError::AppNotFound)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
