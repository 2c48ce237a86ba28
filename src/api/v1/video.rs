use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::PgPool;

use crate::api::common::middleware::Principal;
use crate::api::common::{ListResponse, PaginationParams};
use crate::api::v1::hydrate::{hydrate_video, ResolvedVideo, VideoPayload};
use crate::api::v1::{category_resource_uri, speaker_resource_uri, tag_resource_uri};
use crate::db::timeout_query;
use crate::errors::AppError;
use crate::models::{Video, STATE_DRAFT, STATE_LIVE};
use crate::store::pg::PgCatalogStore;
use crate::InnerState;

const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(10000);

pub fn video_resource_uri(id: i32) -> String {
    format!("/api/v1/video/{}/", id)
}

#[derive(Debug, Serialize)]
pub struct VideoDetail {
    pub id: i32,
    pub title: String,
    pub slug: Option<String>,
    pub state: i32,
    pub category: String,
    pub speakers: Vec<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i32>,
    pub whiteboard: Option<String>,
    pub added: Option<NaiveDateTime>,
    pub recorded: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,
    pub resource_uri: String,
}

/// Outbound transform: related records serialize as detail URLs, the
/// language as its name or null.
async fn dehydrate_video(db: &PgPool, video: &Video) -> Result<VideoDetail, AppError> {
    let language = match video.language_id {
        Some(language_id) => timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_scalar::<_, String>(r#"SELECT name FROM languages WHERE id = $1"#)
                .bind(language_id)
                .fetch_optional(db),
        )
        .await?,
        None => None,
    };

    let speaker_ids = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, i32>(
            r#"SELECT speaker_id FROM video_speakers WHERE video_id = $1 ORDER BY speaker_id"#,
        )
        .bind(video.id)
        .fetch_all(db),
    )
    .await?;

    let tag_ids = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, i32>(
            r#"SELECT tag_id FROM video_tags WHERE video_id = $1 ORDER BY tag_id"#,
        )
        .bind(video.id)
        .fetch_all(db),
    )
    .await?;

    Ok(VideoDetail {
        id: video.id,
        title: video.title.clone(),
        slug: video.slug.clone(),
        state: video.state,
        category: category_resource_uri(video.category_id),
        speakers: speaker_ids.into_iter().map(speaker_resource_uri).collect(),
        tags: tag_ids.into_iter().map(tag_resource_uri).collect(),
        language,
        summary: video.summary.clone(),
        description: video.description.clone(),
        source_url: video.source_url.clone(),
        thumbnail_url: video.thumbnail_url.clone(),
        duration: video.duration,
        whiteboard: video.whiteboard.clone(),
        added: video.added,
        recorded: video.recorded,
        updated: video.updated,
        resource_uri: video_resource_uri(video.id),
    })
}

#[tracing::instrument(name = "List videos", skip(inner, principal, params))]
pub async fn list_videos(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ListResponse<VideoDetail>>, AppError> {
    let InnerState { db, .. } = inner;

    // Non-staff only ever see live videos; the filter runs before counting
    // and pagination.
    let include_drafts = principal.is_staff;
    tracing::debug!(include_drafts, "fetching video list");

    let total_count = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM videos WHERE $1 OR state = $2"#)
            .bind(include_drafts)
            .bind(STATE_LIVE)
            .fetch_one(&db),
    )
    .await?;

    let videos = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Video>(
            r#"SELECT * FROM videos WHERE $1 OR state = $2 ORDER BY id LIMIT $3 OFFSET $4"#,
        )
        .bind(include_drafts)
        .bind(STATE_LIVE)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&db),
    )
    .await?;

    let mut objects = Vec::with_capacity(videos.len());
    for video in &videos {
        objects.push(dehydrate_video(&db, video).await?);
    }

    tracing::info!("returning {} of {} videos", objects.len(), total_count);
    Ok(Json(ListResponse::new(&params, total_count, objects)))
}

#[tracing::instrument(name = "Get video", skip(inner, principal), fields(video_id = %id))]
pub async fn get_video(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<VideoDetail>, AppError> {
    let InnerState { db, .. } = inner;

    let video = fetch_video(&db, id).await?;

    // A draft is indistinguishable from a missing record for non-staff.
    if video.state == STATE_DRAFT && !principal.is_staff {
        return Err(AppError::NotFound(format!("video {} does not exist.", id)));
    }

    Ok(Json(dehydrate_video(&db, &video).await?))
}

#[tracing::instrument(name = "Create video", skip(inner, payload), fields(title = %payload.title))]
pub async fn create_video(
    State(inner): State<InnerState>,
    Json(payload): Json<VideoPayload>,
) -> Result<(StatusCode, Json<VideoDetail>), AppError> {
    let InnerState { db, use_tz } = inner;

    let store = PgCatalogStore::new(db.clone());
    let resolved = hydrate_video(&store, payload, None, use_tz).await?;

    let mut tx = db.begin().await.map_err(AppError::from)?;

    let video = sqlx::query_as::<_, Video>(
        r#"INSERT INTO videos
           (slug, title, state, category_id, language_id, summary, description,
            source_url, thumbnail_url, duration, whiteboard, added, recorded, updated)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                   COALESCE($12, now()), $13, now())
           RETURNING *"#,
    )
    .bind(&resolved.slug)
    .bind(&resolved.title)
    .bind(resolved.state)
    .bind(resolved.category.id)
    .bind(resolved.language.as_ref().map(|l| l.id))
    .bind(&resolved.summary)
    .bind(&resolved.description)
    .bind(&resolved.source_url)
    .bind(&resolved.thumbnail_url)
    .bind(resolved.duration)
    .bind(&resolved.whiteboard)
    .bind(resolved.added)
    .bind(resolved.recorded)
    .fetch_one(&mut *tx)
    .await
    .map_err(AppError::from)?;

    insert_relations(&mut tx, video.id, &resolved).await?;

    tx.commit().await.map_err(AppError::from)?;
    tracing::info!("created video {} ({})", video.id, video.title);

    let detail = dehydrate_video(&db, &video).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[tracing::instrument(name = "Update video", skip(inner, payload), fields(video_id = %id))]
pub async fn update_video(
    State(inner): State<InnerState>,
    Path(id): Path<i32>,
    Json(payload): Json<VideoPayload>,
) -> Result<Json<VideoDetail>, AppError> {
    let InnerState { db, use_tz } = inner;

    let existing = fetch_video(&db, id).await?;

    let store = PgCatalogStore::new(db.clone());
    let resolved = hydrate_video(&store, payload, Some(&existing), use_tz).await?;

    let mut tx = db.begin().await.map_err(AppError::from)?;

    let video = sqlx::query_as::<_, Video>(
        r#"UPDATE videos SET
           slug = $1, title = $2, state = $3, category_id = $4, language_id = $5,
           summary = $6, description = $7, source_url = $8, thumbnail_url = $9,
           duration = $10, whiteboard = $11,
           added = COALESCE($12, added), recorded = $13, updated = now()
           WHERE id = $14
           RETURNING *"#,
    )
    .bind(&resolved.slug)
    .bind(&resolved.title)
    .bind(resolved.state)
    .bind(resolved.category.id)
    .bind(resolved.language.as_ref().map(|l| l.id))
    .bind(&resolved.summary)
    .bind(&resolved.description)
    .bind(&resolved.source_url)
    .bind(&resolved.thumbnail_url)
    .bind(resolved.duration)
    .bind(&resolved.whiteboard)
    .bind(resolved.added)
    .bind(resolved.recorded)
    .bind(id)
    .fetch_one(&mut *tx)
    .await
    .map_err(AppError::from)?;

    sqlx::query(r#"DELETE FROM video_speakers WHERE video_id = $1"#)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;
    sqlx::query(r#"DELETE FROM video_tags WHERE video_id = $1"#)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

    insert_relations(&mut tx, id, &resolved).await?;

    tx.commit().await.map_err(AppError::from)?;
    tracing::info!("updated video {}", id);

    Ok(Json(dehydrate_video(&db, &video).await?))
}

#[tracing::instrument(name = "Delete video", skip(inner), fields(video_id = %id))]
pub async fn delete_video(
    State(inner): State<InnerState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let InnerState { db, .. } = inner;

    let result = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query(r#"DELETE FROM videos WHERE id = $1"#)
            .bind(id)
            .execute(&db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("video {} does not exist.", id)));
    }

    tracing::info!("deleted video {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_video(db: &PgPool, id: i32) -> Result<Video, AppError> {
    let video = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Video>(r#"SELECT * FROM videos WHERE id = $1"#)
            .bind(id)
            .fetch_optional(db),
    )
    .await?;

    video.ok_or_else(|| AppError::NotFound(format!("video {} does not exist.", id)))
}

async fn insert_relations(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    video_id: i32,
    resolved: &ResolvedVideo,
) -> Result<(), AppError> {
    for speaker in &resolved.speakers {
        sqlx::query(
            r#"INSERT INTO video_speakers (video_id, speaker_id) VALUES ($1, $2)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(video_id)
        .bind(speaker.id)
        .execute(&mut **tx)
        .await
        .map_err(AppError::from)?;
    }

    for tag in &resolved.tags {
        sqlx::query(
            r#"INSERT INTO video_tags (video_id, tag_id) VALUES ($1, $2)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(video_id)
        .bind(tag.id)
        .execute(&mut **tx)
        .await
        .map_err(AppError::from)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_uri_matches_the_v1_shape() {
        assert_eq!(video_resource_uri(12), "/api/v1/video/12/");
    }
}
