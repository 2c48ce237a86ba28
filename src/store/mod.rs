//! Persistence seam for the catalog.
//!
//! Hydration and the per-resource video back-collections go through this
//! trait so the translation rules stay independent of query execution. The
//! find-or-create operations must be atomic in the implementation; the
//! component itself performs no locking.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Category, CategoryKind, Language, Speaker, Tag};

pub mod pg;

#[cfg(test)]
pub mod mem;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// True when another video (not `exclude`) already owns `slug`.
    async fn video_slug_in_use(&self, slug: &str, exclude: Option<i32>) -> Result<bool, AppError>;

    /// True when another category (not `exclude`) already owns `slug`.
    async fn category_slug_in_use(
        &self,
        slug: &str,
        exclude: Option<i32>,
    ) -> Result<bool, AppError>;

    async fn tag_by_id(&self, id: i32) -> Result<Option<Tag>, AppError>;

    /// Atomic find-or-insert by tag text.
    async fn tag_find_or_create(&self, text: &str) -> Result<Tag, AppError>;

    async fn speaker_by_id(&self, id: i32) -> Result<Option<Speaker>, AppError>;

    /// Atomic find-or-insert by speaker name.
    async fn speaker_find_or_create(&self, name: &str) -> Result<Speaker, AppError>;

    async fn category_by_id(&self, id: i32) -> Result<Option<Category>, AppError>;

    /// Exact-title lookup; categories are never created during hydration.
    async fn category_by_title(&self, title: &str) -> Result<Option<Category>, AppError>;

    async fn category_kind_by_id(&self, id: i32) -> Result<Option<CategoryKind>, AppError>;

    /// Exact-name lookup; languages are read-only through the API.
    async fn language_by_name(&self, name: &str) -> Result<Option<Language>, AppError>;

    /// Ids of the videos associated with a speaker, ordered by id. Draft
    /// videos are included only when `include_drafts` is set.
    async fn video_ids_for_speaker(
        &self,
        speaker_id: i32,
        include_drafts: bool,
    ) -> Result<Vec<i32>, AppError>;

    async fn video_ids_for_category(
        &self,
        category_id: i32,
        include_drafts: bool,
    ) -> Result<Vec<i32>, AppError>;

    async fn video_ids_for_tag(
        &self,
        tag_id: i32,
        include_drafts: bool,
    ) -> Result<Vec<i32>, AppError>;
}
