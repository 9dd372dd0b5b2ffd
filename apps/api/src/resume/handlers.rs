use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::resume::models::{ResumeRow, ResumeSummaryRow};
use crate::resume::photo::{self, PhotoUpload};
use crate::resume::store;
use crate::resume::validate::validate_update;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateResumeRequest {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct PhotoResponse {
    pub photo_file_name: Option<String>,
}

/// GET /api/v1/resumes
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ResumeSummaryRow>>, AppError> {
    let resumes = store::list_resumes(&state.db, params.user_id).await?;
    Ok(Json(resumes))
}

/// POST /api/v1/resumes
pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<CreateResumeRequest>,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let row = store::create_resume(
        &state.db,
        req.user_id,
        req.name.as_deref(),
        req.email.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ResumeRow>, AppError> {
    let row = store::load_owned(&state.db, id, params.user_id).await?;
    Ok(Json(row))
}

/// PUT /api/v1/resumes/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<ResumeRow>, AppError> {
    let user_id = user_id_from_body(&body)?;
    store::load_owned(&state.db, id, user_id).await?;

    let update = validate_update(&body)?;
    let row = store::update_resume(&state.db, id, &update).await?;
    Ok(Json(row))
}

/// DELETE /api/v1/resumes/:id
///
/// Removes the record and its photo blob. The blob delete is best-effort;
/// the record delete proceeds regardless of its outcome.
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let resume = store::load_owned(&state.db, id, params.user_id).await?;

    let _ = photo::delete_stored_blob(
        state.storage.as_ref(),
        resume.id,
        resume.photo_file_name.as_deref(),
    )
    .await;
    store::delete_resume(&state.db, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/resumes/:id/photo
pub async fn handle_attach_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
    multipart: Multipart,
) -> Result<Json<PhotoResponse>, AppError> {
    let upload = read_photo_field(multipart).await?;
    let file_name =
        photo::attach_photo(&state.db, state.storage.as_ref(), id, params.user_id, upload).await?;
    Ok(Json(PhotoResponse {
        photo_file_name: Some(file_name),
    }))
}

/// DELETE /api/v1/resumes/:id/photo
pub async fn handle_detach_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<PhotoResponse>, AppError> {
    photo::detach_photo(&state.db, state.storage.as_ref(), id, params.user_id).await?;
    Ok(Json(PhotoResponse {
        photo_file_name: None,
    }))
}

/// Pulls the `photo` field off a multipart request.
async fn read_photo_field(mut multipart: Multipart) -> Result<PhotoUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::field("photo", format!("could not read upload: {e}")))?
    {
        if field.name() != Some("photo") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::field("photo", format!("could not read upload: {e}")))?;

        return Ok(PhotoUpload {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(AppError::field("photo", "is required"))
}

fn user_id_from_body(body: &Value) -> Result<Uuid, AppError> {
    body.get("user_id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::field("user_id", "is required"))
}
