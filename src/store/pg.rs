use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::timeout_query;
use crate::errors::AppError;
use crate::models::{Category, CategoryKind, Language, Speaker, Tag, STATE_LIVE};
use crate::store::CatalogStore;

const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(10000);

/// Postgres-backed catalog store. Uniqueness constraints in the schema are
/// the safety net under concurrent identical find-or-creates.
#[derive(Clone)]
pub struct PgCatalogStore {
    db: PgPool,
}

impl PgCatalogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn video_slug_in_use(&self, slug: &str, exclude: Option<i32>) -> Result<bool, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_scalar::<_, bool>(
                r#"SELECT EXISTS(SELECT 1 FROM videos WHERE slug = $1 AND ($2::int4 IS NULL OR id <> $2))"#,
            )
            .bind(slug)
            .bind(exclude)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn category_slug_in_use(
        &self,
        slug: &str,
        exclude: Option<i32>,
    ) -> Result<bool, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_scalar::<_, bool>(
                r#"SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1 AND ($2::int4 IS NULL OR id <> $2))"#,
            )
            .bind(slug)
            .bind(exclude)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn tag_by_id(&self, id: i32) -> Result<Option<Tag>, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_as::<_, Tag>(r#"SELECT * FROM tags WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn tag_find_or_create(&self, text: &str) -> Result<Tag, AppError> {
        // The no-op DO UPDATE makes RETURNING yield the existing row on
        // conflict, keeping find-or-insert a single atomic statement.
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_as::<_, Tag>(
                r#"INSERT INTO tags (tag) VALUES ($1)
                   ON CONFLICT (tag) DO UPDATE SET tag = EXCLUDED.tag
                   RETURNING *"#,
            )
            .bind(text)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn speaker_by_id(&self, id: i32) -> Result<Option<Speaker>, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_as::<_, Speaker>(r#"SELECT * FROM speakers WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn speaker_find_or_create(&self, name: &str) -> Result<Speaker, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_as::<_, Speaker>(
                r#"INSERT INTO speakers (name) VALUES ($1)
                   ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                   RETURNING *"#,
            )
            .bind(name)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn category_by_id(&self, id: i32) -> Result<Option<Category>, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_as::<_, Category>(r#"SELECT * FROM categories WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn category_by_title(&self, title: &str) -> Result<Option<Category>, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_as::<_, Category>(r#"SELECT * FROM categories WHERE title = $1"#)
                .bind(title)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn category_kind_by_id(&self, id: i32) -> Result<Option<CategoryKind>, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_as::<_, CategoryKind>(r#"SELECT * FROM category_kinds WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn language_by_name(&self, name: &str) -> Result<Option<Language>, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_as::<_, Language>(r#"SELECT * FROM languages WHERE name = $1"#)
                .bind(name)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn video_ids_for_speaker(
        &self,
        speaker_id: i32,
        include_drafts: bool,
    ) -> Result<Vec<i32>, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_scalar::<_, i32>(
                r#"SELECT v.id FROM videos v
                   JOIN video_speakers vs ON vs.video_id = v.id
                   WHERE vs.speaker_id = $1 AND ($2 OR v.state = $3)
                   ORDER BY v.id"#,
            )
            .bind(speaker_id)
            .bind(include_drafts)
            .bind(STATE_LIVE)
            .fetch_all(&self.db),
        )
        .await
    }

    async fn video_ids_for_category(
        &self,
        category_id: i32,
        include_drafts: bool,
    ) -> Result<Vec<i32>, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_scalar::<_, i32>(
                r#"SELECT id FROM videos
                   WHERE category_id = $1 AND ($2 OR state = $3)
                   ORDER BY id"#,
            )
            .bind(category_id)
            .bind(include_drafts)
            .bind(STATE_LIVE)
            .fetch_all(&self.db),
        )
        .await
    }

    async fn video_ids_for_tag(
        &self,
        tag_id: i32,
        include_drafts: bool,
    ) -> Result<Vec<i32>, AppError> {
        timeout_query(
            QUERY_TIMEOUT,
            sqlx::query_scalar::<_, i32>(
                r#"SELECT v.id FROM videos v
                   JOIN video_tags vt ON vt.video_id = v.id
                   WHERE vt.tag_id = $1 AND ($2 OR v.state = $3)
                   ORDER BY v.id"#,
            )
            .bind(tag_id)
            .bind(include_drafts)
            .bind(STATE_LIVE)
            .fetch_all(&self.db),
        )
        .await
    }
}
