//! In-memory catalog store used by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Category, CategoryKind, Language, Speaker, Tag, STATE_LIVE};
use crate::store::CatalogStore;

#[derive(Default)]
struct Inner {
    next_id: i32,
    video_slugs: HashMap<i32, String>,
    tags: Vec<Tag>,
    speakers: Vec<Speaker>,
    categories: Vec<Category>,
    kinds: Vec<CategoryKind>,
    languages: Vec<Language>,
    // owner id -> [(video id, state)]
    speaker_videos: HashMap<i32, Vec<(i32, i32)>>,
    category_videos: HashMap<i32, Vec<(i32, i32)>>,
    tag_videos: HashMap<i32, Vec<(i32, i32)>>,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(inner: &mut Inner) -> i32 {
        inner.next_id += 1;
        inner.next_id
    }

    pub fn add_tag(&self, text: &str) -> Tag {
        let mut inner = self.inner.lock().unwrap();
        let tag = Tag {
            id: Self::alloc(&mut inner),
            tag: text.to_string(),
        };
        inner.tags.push(tag.clone());
        tag
    }

    pub fn add_speaker(&self, name: &str) -> Speaker {
        let mut inner = self.inner.lock().unwrap();
        let speaker = Speaker {
            id: Self::alloc(&mut inner),
            name: name.to_string(),
        };
        inner.speakers.push(speaker.clone());
        speaker
    }

    pub fn add_kind(&self, name: &str) -> CategoryKind {
        let mut inner = self.inner.lock().unwrap();
        let kind = CategoryKind {
            id: Self::alloc(&mut inner),
            name: name.to_string(),
        };
        inner.kinds.push(kind.clone());
        kind
    }

    pub fn add_category(&self, title: &str, slug: Option<&str>, kind_id: i32) -> Category {
        let mut inner = self.inner.lock().unwrap();
        let category = Category {
            id: Self::alloc(&mut inner),
            title: title.to_string(),
            slug: slug.map(str::to_string),
            kind_id,
        };
        inner.categories.push(category.clone());
        category
    }

    pub fn add_language(&self, name: &str) -> Language {
        let mut inner = self.inner.lock().unwrap();
        let language = Language {
            id: Self::alloc(&mut inner),
            name: name.to_string(),
        };
        inner.languages.push(language.clone());
        language
    }

    /// Registers an existing video slug so slug-uniqueness checks see it.
    pub fn add_video_slug(&self, video_id: i32, slug: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.video_slugs.insert(video_id, slug.to_string());
    }

    pub fn link_speaker_video(&self, speaker_id: i32, video_id: i32, state: i32) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .speaker_videos
            .entry(speaker_id)
            .or_default()
            .push((video_id, state));
    }

    pub fn link_category_video(&self, category_id: i32, video_id: i32, state: i32) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .category_videos
            .entry(category_id)
            .or_default()
            .push((video_id, state));
    }

    pub fn link_tag_video(&self, tag_id: i32, video_id: i32, state: i32) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .tag_videos
            .entry(tag_id)
            .or_default()
            .push((video_id, state));
    }

    pub fn tag_count(&self) -> usize {
        self.inner.lock().unwrap().tags.len()
    }
}

fn filter_ids(links: Option<&Vec<(i32, i32)>>, include_drafts: bool) -> Vec<i32> {
    let mut ids: Vec<i32> = links
        .map(|v| {
            v.iter()
                .filter(|(_, state)| include_drafts || *state == STATE_LIVE)
                .map(|(id, _)| *id)
                .collect()
        })
        .unwrap_or_default();
    ids.sort_unstable();
    ids
}

#[async_trait]
impl CatalogStore for MemStore {
    async fn video_slug_in_use(&self, slug: &str, exclude: Option<i32>) -> Result<bool, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .video_slugs
            .iter()
            .any(|(id, s)| s == slug && Some(*id) != exclude))
    }

    async fn category_slug_in_use(
        &self,
        slug: &str,
        exclude: Option<i32>,
    ) -> Result<bool, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .categories
            .iter()
            .any(|c| c.slug.as_deref() == Some(slug) && Some(c.id) != exclude))
    }

    async fn tag_by_id(&self, id: i32) -> Result<Option<Tag>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn tag_find_or_create(&self, text: &str) -> Result<Tag, AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(tag) = inner.tags.iter().find(|t| t.tag == text) {
            return Ok(tag.clone());
        }
        let tag = Tag {
            id: Self::alloc(&mut inner),
            tag: text.to_string(),
        };
        inner.tags.push(tag.clone());
        Ok(tag)
    }

    async fn speaker_by_id(&self, id: i32) -> Result<Option<Speaker>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.speakers.iter().find(|s| s.id == id).cloned())
    }

    async fn speaker_find_or_create(&self, name: &str) -> Result<Speaker, AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(speaker) = inner.speakers.iter().find(|s| s.name == name) {
            return Ok(speaker.clone());
        }
        let speaker = Speaker {
            id: Self::alloc(&mut inner),
            name: name.to_string(),
        };
        inner.speakers.push(speaker.clone());
        Ok(speaker)
    }

    async fn category_by_id(&self, id: i32) -> Result<Option<Category>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn category_by_title(&self, title: &str) -> Result<Option<Category>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.categories.iter().find(|c| c.title == title).cloned())
    }

    async fn category_kind_by_id(&self, id: i32) -> Result<Option<CategoryKind>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.kinds.iter().find(|k| k.id == id).cloned())
    }

    async fn language_by_name(&self, name: &str) -> Result<Option<Language>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.languages.iter().find(|l| l.name == name).cloned())
    }

    async fn video_ids_for_speaker(
        &self,
        speaker_id: i32,
        include_drafts: bool,
    ) -> Result<Vec<i32>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(filter_ids(inner.speaker_videos.get(&speaker_id), include_drafts))
    }

    async fn video_ids_for_category(
        &self,
        category_id: i32,
        include_drafts: bool,
    ) -> Result<Vec<i32>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(filter_ids(
            inner.category_videos.get(&category_id),
            include_drafts,
        ))
    }

    async fn video_ids_for_tag(
        &self,
        tag_id: i32,
        include_drafts: bool,
    ) -> Result<Vec<i32>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(filter_ids(inner.tag_videos.get(&tag_id), include_drafts))
    }
}
