use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::common::middleware::Principal;
use crate::api::common::{ListResponse, PaginationParams};
use crate::api::v1::hydrate::FieldErrors;
use crate::api::v1::video::video_resource_uri;
use crate::db::timeout_query;
use crate::errors::AppError;
use crate::models::Speaker;
use crate::store::pg::PgCatalogStore;
use crate::store::CatalogStore;
use crate::InnerState;

const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(10000);

pub fn speaker_resource_uri(id: i32) -> String {
    format!("/api/v1/speaker/{}/", id)
}

#[derive(Debug, Deserialize)]
pub struct SpeakerPayload {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SpeakerDetail {
    pub id: i32,
    pub name: String,
    pub videos: Vec<String>,
    pub resource_uri: String,
}

/// The videos collection is computed fresh per request: staff see every
/// associated video, everyone else only the live ones.
pub async fn dehydrate_speaker(
    store: &dyn CatalogStore,
    speaker: &Speaker,
    principal: &Principal,
) -> Result<SpeakerDetail, AppError> {
    let video_ids = store
        .video_ids_for_speaker(speaker.id, principal.is_staff)
        .await?;

    Ok(SpeakerDetail {
        id: speaker.id,
        name: speaker.name.clone(),
        videos: video_ids.into_iter().map(video_resource_uri).collect(),
        resource_uri: speaker_resource_uri(speaker.id),
    })
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        let mut errors = FieldErrors::default();
        errors.add("name", "name must be a non-empty string.");
        return Err(errors.into_app_error());
    }
    Ok(())
}

#[tracing::instrument(name = "List speakers", skip(inner, principal, params))]
pub async fn list_speakers(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ListResponse<SpeakerDetail>>, AppError> {
    let InnerState { db, .. } = inner;

    let total_count = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM speakers"#).fetch_one(&db),
    )
    .await?;

    let speakers = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Speaker>(r#"SELECT * FROM speakers ORDER BY id LIMIT $1 OFFSET $2"#)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&db),
    )
    .await?;

    let store = PgCatalogStore::new(db.clone());
    let mut objects = Vec::with_capacity(speakers.len());
    for speaker in &speakers {
        objects.push(dehydrate_speaker(&store, speaker, &principal).await?);
    }

    Ok(Json(ListResponse::new(&params, total_count, objects)))
}

#[tracing::instrument(name = "Get speaker", skip(inner, principal), fields(speaker_id = %id))]
pub async fn get_speaker(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<SpeakerDetail>, AppError> {
    let InnerState { db, .. } = inner;

    let store = PgCatalogStore::new(db.clone());
    let speaker = store
        .speaker_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("speaker {} does not exist.", id)))?;

    Ok(Json(dehydrate_speaker(&store, &speaker, &principal).await?))
}

#[tracing::instrument(name = "Create speaker", skip(inner, payload), fields(name = %payload.name))]
pub async fn create_speaker(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<SpeakerPayload>,
) -> Result<(StatusCode, Json<SpeakerDetail>), AppError> {
    let InnerState { db, .. } = inner;

    validate_name(&payload.name)?;

    let speaker = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Speaker>(r#"INSERT INTO speakers (name) VALUES ($1) RETURNING *"#)
            .bind(&payload.name)
            .fetch_one(&db),
    )
    .await?;

    tracing::info!("created speaker {} ({})", speaker.id, speaker.name);

    let store = PgCatalogStore::new(db.clone());
    let detail = dehydrate_speaker(&store, &speaker, &principal).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[tracing::instrument(name = "Update speaker", skip(inner, payload), fields(speaker_id = %id))]
pub async fn update_speaker(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<SpeakerPayload>,
) -> Result<Json<SpeakerDetail>, AppError> {
    let InnerState { db, .. } = inner;

    validate_name(&payload.name)?;

    let speaker = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Speaker>(
            r#"UPDATE speakers SET name = $1 WHERE id = $2 RETURNING *"#,
        )
        .bind(&payload.name)
        .bind(id)
        .fetch_optional(&db),
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("speaker {} does not exist.", id)))?;

    let store = PgCatalogStore::new(db.clone());
    Ok(Json(dehydrate_speaker(&store, &speaker, &principal).await?))
}

#[tracing::instrument(name = "Delete speaker", skip(inner), fields(speaker_id = %id))]
pub async fn delete_speaker(
    State(inner): State<InnerState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let InnerState { db, .. } = inner;

    let result = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query(r#"DELETE FROM speakers WHERE id = $1"#)
            .bind(id)
            .execute(&db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("speaker {} does not exist.", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{STATE_DRAFT, STATE_LIVE};
    use crate::store::mem::MemStore;

    fn staff() -> Principal {
        Principal {
            user_id: Some(1),
            username: Some("admin".to_string()),
            is_staff: true,
        }
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_non_staff_video_collections() {
        let store = MemStore::new();
        let speaker = store.add_speaker("Carl Karsten");
        store.link_speaker_video(speaker.id, 10, STATE_LIVE);
        store.link_speaker_video(speaker.id, 11, STATE_DRAFT);
        store.link_speaker_video(speaker.id, 12, STATE_LIVE);

        let detail = dehydrate_speaker(&store, &speaker, &Principal::anonymous())
            .await
            .unwrap();
        assert_eq!(detail.videos, vec!["/api/v1/video/10/", "/api/v1/video/12/"]);

        let detail = dehydrate_speaker(&store, &speaker, &staff()).await.unwrap();
        assert_eq!(
            detail.videos,
            vec![
                "/api/v1/video/10/",
                "/api/v1/video/11/",
                "/api/v1/video/12/"
            ]
        );
    }

    #[tokio::test]
    async fn speaker_without_videos_has_an_empty_collection() {
        let store = MemStore::new();
        let speaker = store.add_speaker("Quiet Speaker");

        let detail = dehydrate_speaker(&store, &speaker, &Principal::anonymous())
            .await
            .unwrap();
        assert!(detail.videos.is_empty());
        assert_eq!(detail.resource_uri, format!("/api/v1/speaker/{}/", speaker.id));
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(validate_name("  ").is_err());
        assert!(validate_name("Carl").is_ok());
    }
}
