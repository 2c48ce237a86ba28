//! Languages are read-only through the API; there are no write handlers to
//! route.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

use crate::api::common::{ListResponse, PaginationParams};
use crate::db::timeout_query;
use crate::errors::AppError;
use crate::models::Language;
use crate::InnerState;

const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(10000);

pub fn language_resource_uri(id: i32) -> String {
    format!("/api/v1/language/{}/", id)
}

#[derive(Debug, Serialize)]
pub struct LanguageDetail {
    pub id: i32,
    pub name: String,
    pub resource_uri: String,
}

fn dehydrate_language(language: &Language) -> LanguageDetail {
    LanguageDetail {
        id: language.id,
        name: language.name.clone(),
        resource_uri: language_resource_uri(language.id),
    }
}

#[tracing::instrument(name = "List languages", skip(inner, params))]
pub async fn list_languages(
    State(inner): State<InnerState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ListResponse<LanguageDetail>>, AppError> {
    let InnerState { db, .. } = inner;

    let total_count = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM languages"#).fetch_one(&db),
    )
    .await?;

    let languages = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Language>(r#"SELECT * FROM languages ORDER BY id LIMIT $1 OFFSET $2"#)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&db),
    )
    .await?;

    let objects = languages.iter().map(dehydrate_language).collect();
    Ok(Json(ListResponse::new(&params, total_count, objects)))
}

#[tracing::instrument(name = "Get language", skip(inner), fields(language_id = %id))]
pub async fn get_language(
    State(inner): State<InnerState>,
    Path(id): Path<i32>,
) -> Result<Json<LanguageDetail>, AppError> {
    let InnerState { db, .. } = inner;

    let language = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Language>(r#"SELECT * FROM languages WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&db),
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("language {} does not exist.", id)))?;

    Ok(Json(dehydrate_language(&language)))
}
