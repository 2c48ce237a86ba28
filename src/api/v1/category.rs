use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::common::middleware::Principal;
use crate::api::common::{ListResponse, PaginationParams};
use crate::api::v1::hydrate::{hydrate_category, CategoryPayload};
use crate::api::v1::video::video_resource_uri;
use crate::db::timeout_query;
use crate::errors::AppError;
use crate::models::Category;
use crate::store::pg::PgCatalogStore;
use crate::store::CatalogStore;
use crate::InnerState;

const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(10000);

pub fn category_resource_uri(id: i32) -> String {
    format!("/api/v1/category/{}/", id)
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    pub id: i32,
    pub title: String,
    pub slug: Option<String>,
    pub kind: i32,
    pub videos: Vec<String>,
    pub resource_uri: String,
}

pub async fn dehydrate_category(
    store: &dyn CatalogStore,
    category: &Category,
    principal: &Principal,
) -> Result<CategoryDetail, AppError> {
    let video_ids = store
        .video_ids_for_category(category.id, principal.is_staff)
        .await?;

    Ok(CategoryDetail {
        id: category.id,
        title: category.title.clone(),
        slug: category.slug.clone(),
        kind: category.kind_id,
        videos: video_ids.into_iter().map(video_resource_uri).collect(),
        resource_uri: category_resource_uri(category.id),
    })
}

#[tracing::instrument(name = "List categories", skip(inner, principal, params))]
pub async fn list_categories(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ListResponse<CategoryDetail>>, AppError> {
    let InnerState { db, .. } = inner;

    let total_count = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM categories"#).fetch_one(&db),
    )
    .await?;

    let categories = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Category>(
            r#"SELECT * FROM categories ORDER BY id LIMIT $1 OFFSET $2"#,
        )
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&db),
    )
    .await?;

    let store = PgCatalogStore::new(db.clone());
    let mut objects = Vec::with_capacity(categories.len());
    for category in &categories {
        objects.push(dehydrate_category(&store, category, &principal).await?);
    }

    Ok(Json(ListResponse::new(&params, total_count, objects)))
}

#[tracing::instrument(name = "Get category", skip(inner, principal), fields(category_id = %id))]
pub async fn get_category(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<CategoryDetail>, AppError> {
    let InnerState { db, .. } = inner;

    let store = PgCatalogStore::new(db.clone());
    let category = store
        .category_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {} does not exist.", id)))?;

    Ok(Json(dehydrate_category(&store, &category, &principal).await?))
}

#[tracing::instrument(name = "Create category", skip(inner, payload), fields(title = %payload.title))]
pub async fn create_category(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<CategoryDetail>), AppError> {
    let InnerState { db, .. } = inner;

    let store = PgCatalogStore::new(db.clone());
    let resolved = hydrate_category(&store, payload, None).await?;

    let category = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (title, slug, kind_id) VALUES ($1, $2, $3) RETURNING *"#,
        )
        .bind(&resolved.title)
        .bind(&resolved.slug)
        .bind(resolved.kind_id)
        .fetch_one(&db),
    )
    .await?;

    tracing::info!("created category {} ({})", category.id, category.title);

    let detail = dehydrate_category(&store, &category, &principal).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[tracing::instrument(name = "Update category", skip(inner, payload), fields(category_id = %id))]
pub async fn update_category(
    State(inner): State<InnerState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<CategoryDetail>, AppError> {
    let InnerState { db, .. } = inner;

    let store = PgCatalogStore::new(db.clone());
    let existing = store
        .category_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {} does not exist.", id)))?;

    let resolved = hydrate_category(&store, payload, Some(&existing)).await?;

    let category = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Category>(
            r#"UPDATE categories SET title = $1, slug = $2, kind_id = $3 WHERE id = $4 RETURNING *"#,
        )
        .bind(&resolved.title)
        .bind(&resolved.slug)
        .bind(resolved.kind_id)
        .bind(id)
        .fetch_one(&db),
    )
    .await?;

    Ok(Json(dehydrate_category(&store, &category, &principal).await?))
}

#[tracing::instrument(name = "Delete category", skip(inner), fields(category_id = %id))]
pub async fn delete_category(
    State(inner): State<InnerState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let InnerState { db, .. } = inner;

    let result = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query(r#"DELETE FROM categories WHERE id = $1"#)
            .bind(id)
            .execute(&db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "category {} does not exist.",
            id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{STATE_DRAFT, STATE_LIVE};
    use crate::store::mem::MemStore;

    #[tokio::test]
    async fn category_video_collection_applies_the_visibility_rule() {
        let store = MemStore::new();
        let kind = store.add_kind("conference");
        let category = store.add_category("PyCon", Some("pycon"), kind.id);
        store.link_category_video(category.id, 21, STATE_LIVE);
        store.link_category_video(category.id, 22, STATE_DRAFT);

        let detail = dehydrate_category(&store, &category, &Principal::anonymous())
            .await
            .unwrap();
        assert_eq!(detail.videos, vec!["/api/v1/video/21/"]);
        assert_eq!(detail.kind, kind.id);
    }
}
