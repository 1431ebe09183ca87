//! Axum request handlers for all service endpoints.
//!
//! Every record passes through [`RecordTranscoder`](crate::records::RecordTranscoder)
//! between the store and the wire: sealed on the way in, opened on the way out.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use common::{
    protocol::{DeleteResponse, ErrorResponse, ExportFormat, ExportQuery, HealthResponse},
    RecordKind, ServiceError,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{error::ApiError, state::AppState};
use crate::config::SecretSource;
use crate::export;
use crate::records::{schema_for, PlainRecord};

type ApiResult<T> = Result<T, ApiError>;

/// `GET /api/:kind` — every record of a kind, in plain form.
pub async fn list(State(state): State<AppState>, Path(kind): Path<String>) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;
    let stored = state
        .store
        .find_many(kind, schema_for(kind).list_order)
        .await;
    let plain = state.transcoder(kind).to_plain_forms(stored);
    debug!(%kind, count = plain.len(), "listed records");
    Ok(Json(plain.into_iter().map(body).collect::<Vec<_>>()).into_response())
}

/// `GET /api/:kind/:id`
pub async fn show(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;
    let stored = state.store.find(kind, &id).await?;
    let plain = state.transcoder(kind).to_plain_form(stored);
    Ok(Json(body(plain)).into_response())
}

/// `POST /api/:kind` — seal the sensitive fields and store a new record.
///
/// Responds `201 Created` with the record in plain form. If any field fails
/// to seal nothing is stored.
pub async fn create(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;
    let fields = accept(kind, payload)?;
    let transcoder = state.transcoder(kind);
    let sealed = transcoder.to_storage_form(PlainRecord::from_input(kind, fields))?;
    let created = state.store.create(sealed).await;
    info!(%kind, id = created.id().unwrap_or_default(), "record created");
    let plain = transcoder.to_plain_form(created);
    Ok((StatusCode::CREATED, Json(body(plain))).into_response())
}

/// `PUT /api/:kind/:id` — replace a record's fields.
///
/// Kinds with an edit marker (the chat log) come back flagged as edited.
pub async fn update(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;
    let mut fields = accept(kind, payload)?;
    schema_for(kind).mark_edited(&mut fields);
    let transcoder = state.transcoder(kind);
    let sealed = transcoder.to_storage_form(PlainRecord::from_input(kind, fields))?;
    let updated = state.store.update(&id, sealed).await?;
    info!(%kind, %id, "record updated");
    Ok(Json(body(transcoder.to_plain_form(updated))).into_response())
}

/// `DELETE /api/:kind/:id`
pub async fn delete(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;
    state.store.delete(kind, &id).await?;
    info!(%kind, %id, "record deleted");
    Ok(Json(DeleteResponse { success: true }).into_response())
}

/// `DELETE /api/:kind` — clear a kind that allows it. Other kinds are `404`.
pub async fn delete_all(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;
    if !schema_for(kind).bulk_delete {
        return Err(ServiceError::NotFound(format!("{kind} records cannot be deleted in bulk")).into());
    }
    let count = state.store.delete_all(kind).await;
    info!(%kind, count, "records deleted");
    Ok(Json(DeleteResponse { success: true }).into_response())
}

/// `GET /api/:kind/export?format=text|json` — every record as an attachment.
pub async fn export_all(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;
    let format = export_format(query)?;
    let stored = state
        .store
        .find_many(kind, schema_for(kind).export_order)
        .await;
    let plain = state.transcoder(kind).to_plain_forms(stored);
    let filename = export::export_filename(kind, format, Utc::now());
    info!(%kind, count = plain.len(), ?format, "exporting records");
    attachment(&plain, format, &filename)
}

/// `GET /api/:kind/:id/export?format=text|json` — one record as an attachment.
pub async fn export_one(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;
    let format = export_format(query)?;
    let stored = state.store.find(kind, &id).await?;
    let plain = state.transcoder(kind).to_plain_form(stored);
    let filename = export::record_filename(&plain, format);
    info!(%kind, %id, ?format, "exporting record");
    attachment(std::slice::from_ref(&plain), format, &filename)
}

/// `GET /health` — liveness check. Always `200 OK`.
///
/// Reports `degraded` while the fallback secret is in use so the
/// misconfiguration is visible at deployment time.
pub async fn health(State(state): State<AppState>) -> Response {
    let fallback_secret = state.secret_source == SecretSource::Fallback;
    let body = HealthResponse {
        status: if fallback_secret { "degraded" } else { "ok" }.into(),
        fallback_secret,
        records: state.store.len().await,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_kind(segment: &str) -> ApiResult<RecordKind> {
    segment
        .parse()
        .map_err(|e: common::kind::UnknownKind| ServiceError::NotFound(e.to_string()).into())
}

/// Validate a create/update body against the kind's field table.
fn accept(
    kind: RecordKind,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Map<String, Value>> {
    let Json(value) = payload.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    let Value::Object(fields) = value else {
        return Err(ServiceError::BadRequest("request body must be a JSON object".into()).into());
    };
    let accepted = schema_for(kind)
        .accept(fields)
        .map_err(|e| ServiceError::BadRequest(e.to_string()))?;
    Ok(accepted)
}

fn export_format(query: Result<Query<ExportQuery>, QueryRejection>) -> ApiResult<ExportFormat> {
    let Query(query) = query.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    Ok(query.format)
}

fn body(record: PlainRecord) -> Value {
    Value::Object(record.into_fields())
}

fn attachment(records: &[PlainRecord], format: ExportFormat, filename: &str) -> ApiResult<Response> {
    let content = export::render(records, format)
        .map_err(|e| ServiceError::Internal(format!("failed to render export: {e}")))?;
    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_owned()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((StatusCode::OK, headers, content).into_response())
}
