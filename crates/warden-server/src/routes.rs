//! HTTP routes for the recovery protocol

use crate::error::ApiError;
use crate::wire::{
    ConfigureBody, DisableBody, Health, InitiateBody, PendingBody, PendingList,
    RegisterHandleBody, ReleaseHandleBody, SubmitBody,
};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use warden_core::effects::HandleRecord;
use warden_core::{Handle, PublicKey, RecoveryId};
use warden_recovery::{
    CompletionAck, ConfigurationView, ConfigureReceipt, DisableAck, FetchedShards,
    InitiateRequest, InitiateResponse, RecoveryEffects, RecoveryService, RegisterHandleRequest,
    ReleaseAck, ReleaseHandleRequest, SessionProgress, SubmissionReceipt,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the application router over `service`
pub fn router<E>(service: RecoveryService<E>) -> Router
where
    E: RecoveryEffects + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/recovery/configure", post(configure::<E>))
        .route("/recovery/initiate", post(initiate::<E>))
        .route("/recovery/pending", post(pending::<E>))
        .route("/recovery/submit", post(submit::<E>))
        .route("/recovery/disable", post(disable::<E>))
        .route("/recovery/config/:owner_pubkey", get(configuration::<E>))
        .route("/recovery/handles/register", post(register_handle::<E>))
        .route("/recovery/handles/release", post(release_handle::<E>))
        .route("/recovery/handles/:handle", get(lookup_handle::<E>))
        .route("/recovery/:recovery_id/status", get(status::<E>))
        .route("/recovery/:recovery_id/shards", get(shards::<E>))
        .route("/recovery/:recovery_id/complete", post(complete::<E>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(service)
}

fn recovery_id(path: Result<Path<String>, PathRejection>) -> Result<RecoveryId, ApiError> {
    let Path(raw) = path?;
    Ok(raw.parse()?)
}

async fn health() -> Json<Health> {
    Json(Health::ok())
}

async fn configure<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    body: Result<Json<ConfigureBody>, JsonRejection>,
) -> ApiResult<ConfigureReceipt> {
    let Json(body) = body?;
    Ok(Json(service.configure(body.into()).await?))
}

async fn initiate<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    body: Result<Json<InitiateBody>, JsonRejection>,
) -> ApiResult<InitiateResponse> {
    let Json(body) = body?;
    let request = InitiateRequest::try_from(body)?;
    Ok(Json(service.initiate(request).await?))
}

async fn pending<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    body: Result<Json<PendingBody>, JsonRejection>,
) -> ApiResult<PendingList> {
    let Json(body) = body?;
    let pending = service.guardian_pending(&body.into()).await?;
    Ok(Json(PendingList { pending }))
}

async fn submit<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    body: Result<Json<SubmitBody>, JsonRejection>,
) -> ApiResult<SubmissionReceipt> {
    let Json(body) = body?;
    Ok(Json(service.submit_shard(body.into()).await?))
}

async fn disable<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    body: Result<Json<DisableBody>, JsonRejection>,
) -> ApiResult<DisableAck> {
    let Json(body) = body?;
    Ok(Json(service.disable(&body.into()).await?))
}

async fn configuration<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ConfigurationView> {
    let Path(raw) = path?;
    let owner: PublicKey = raw.parse()?;
    Ok(Json(service.configuration(&owner).await?))
}

async fn register_handle<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    body: Result<Json<RegisterHandleBody>, JsonRejection>,
) -> ApiResult<HandleRecord> {
    let Json(body) = body?;
    let request = RegisterHandleRequest::try_from(body)?;
    Ok(Json(service.register_handle(request).await?))
}

async fn release_handle<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    body: Result<Json<ReleaseHandleBody>, JsonRejection>,
) -> ApiResult<ReleaseAck> {
    let Json(body) = body?;
    let request = ReleaseHandleRequest::try_from(body)?;
    Ok(Json(service.release_handle(request).await?))
}

async fn lookup_handle<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<HandleRecord> {
    let Path(raw) = path?;
    let handle = Handle::parse(&raw)?;
    Ok(Json(service.lookup_handle(&handle).await?))
}

async fn status<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<SessionProgress> {
    let id = recovery_id(path)?;
    Ok(Json(service.session_status(&id).await?))
}

async fn shards<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<FetchedShards> {
    let id = recovery_id(path)?;
    Ok(Json(service.fetch_shards(&id).await?))
}

async fn complete<E: RecoveryEffects + 'static>(
    State(service): State<RecoveryService<E>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<CompletionAck> {
    let id = recovery_id(path)?;
    Ok(Json(service.complete(&id).await?))
}
