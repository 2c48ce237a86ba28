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
use crate::models::Tag;
use crate::store::pg::PgCatalogStore;
use crate::store::CatalogStore;
use crate::InnerState;

const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(10000);

pub fn tag_resource_uri(id: i32) -> String {
    format!("/api/v1/tag/{}/", id)
}

#[derive(Debug, Deserialize)]
pub struct TagPayload {
    pub tag: String,
}

#[derive(Debug, Serialize)]
pub struct TagDetail {
    pub id: i32,
    pub tag: String,
    pub videos: Vec<String>,
    pub resource_uri: String,
}

pub async fn dehydrate_tag(
    store: &dyn CatalogStore,
    tag: &Tag,
    principal: &Principal,
) -> Result<TagDetail, AppError> {
    let video_ids = store.video_ids_for_tag(tag.id, principal.is_staff).await?;

    Ok(TagDetail {
        id: tag.id,
        tag: tag.tag.clone(),
        videos: video_ids.into_iter().map(video_resource_uri).collect(),
        resource_uri: tag_resource_uri(tag.id),
    })
}

fn validate_tag(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        let mut errors = FieldErrors::default();
        errors.add("tag", "tag must be a non-empty string.");
        return Err(errors.into_app_error());
    }
    Ok(())
}

#[tracing::instrument(name = "List tags", skip(inner, principal, params))]
pub async fn list_tags(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ListResponse<TagDetail>>, AppError> {
    let InnerState { db, .. } = inner;

    let total_count = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM tags"#).fetch_one(&db),
    )
    .await?;

    let tags = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Tag>(r#"SELECT * FROM tags ORDER BY id LIMIT $1 OFFSET $2"#)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&db),
    )
    .await?;

    let store = PgCatalogStore::new(db.clone());
    let mut objects = Vec::with_capacity(tags.len());
    for tag in &tags {
        objects.push(dehydrate_tag(&store, tag, &principal).await?);
    }

    Ok(Json(ListResponse::new(&params, total_count, objects)))
}

#[tracing::instrument(name = "Get tag", skip(inner, principal), fields(tag_id = %id))]
pub async fn get_tag(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<TagDetail>, AppError> {
    let InnerState { db, .. } = inner;

    let store = PgCatalogStore::new(db.clone());
    let tag = store
        .tag_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("tag {} does not exist.", id)))?;

    Ok(Json(dehydrate_tag(&store, &tag, &principal).await?))
}

#[tracing::instrument(name = "Create tag", skip(inner, payload), fields(tag = %payload.tag))]
pub async fn create_tag(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<TagPayload>,
) -> Result<(StatusCode, Json<TagDetail>), AppError> {
    let InnerState { db, .. } = inner;

    validate_tag(&payload.tag)?;

    // Tag creation is get-or-create, same as tag resolution during video
    // hydration.
    let store = PgCatalogStore::new(db.clone());
    let tag = store.tag_find_or_create(&payload.tag).await?;

    tracing::info!("created tag {} ({})", tag.id, tag.tag);

    let detail = dehydrate_tag(&store, &tag, &principal).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[tracing::instrument(name = "Update tag", skip(inner, payload), fields(tag_id = %id))]
pub async fn update_tag(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<TagPayload>,
) -> Result<Json<TagDetail>, AppError> {
    let InnerState { db, .. } = inner;

    validate_tag(&payload.tag)?;

    let tag = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Tag>(r#"UPDATE tags SET tag = $1 WHERE id = $2 RETURNING *"#)
            .bind(&payload.tag)
            .bind(id)
            .fetch_optional(&db),
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("tag {} does not exist.", id)))?;

    let store = PgCatalogStore::new(db.clone());
    Ok(Json(dehydrate_tag(&store, &tag, &principal).await?))
}

#[tracing::instrument(name = "Delete tag", skip(inner), fields(tag_id = %id))]
pub async fn delete_tag(
    State(inner): State<InnerState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let InnerState { db, .. } = inner;

    let result = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query(r#"DELETE FROM tags WHERE id = $1"#)
            .bind(id)
            .execute(&db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("tag {} does not exist.", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{STATE_DRAFT, STATE_LIVE};
    use crate::store::mem::MemStore;

    #[tokio::test]
    async fn tag_video_collection_applies_the_visibility_rule() {
        let store = MemStore::new();
        let tag = store.add_tag("rust");
        store.link_tag_video(tag.id, 3, STATE_DRAFT);
        store.link_tag_video(tag.id, 4, STATE_LIVE);

        let detail = dehydrate_tag(&store, &tag, &Principal::anonymous())
            .await
            .unwrap();
        assert_eq!(detail.videos, vec!["/api/v1/video/4/"]);

        let staff = Principal {
            user_id: Some(1),
            username: Some("admin".to_string()),
            is_staff: true,
        };
        let detail = dehydrate_tag(&store, &tag, &staff).await.unwrap();
        assert_eq!(detail.videos, vec!["/api/v1/video/3/", "/api/v1/video/4/"]);
    }
}
