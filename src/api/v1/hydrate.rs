//! Inbound transforms: flat JSON payloads become validated, resolved records.
//!
//! Checks are independent and all failures are collected into a field → messages
//! map; persistence is only attempted when the map stays empty. Dangling
//! numeric id references are the one exception and fail hard with a not-found
//! error.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::Value;

use crate::api::v1::refs::{parse_ref, RefParseError, ResourceRef};
use crate::errors::AppError;
use crate::models::{Category, Language, Speaker, Tag, Video, STATE_LIVE, VALID_STATES};
use crate::store::CatalogStore;

#[derive(Debug, Default)]
pub struct FieldErrors(HashMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_app_error(self) -> AppError {
        AppError::ValidationErrors(self.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoPayload {
    pub title: String,
    pub slug: Option<String>,
    pub state: Option<Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub speakers: Vec<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i32>,
    pub whiteboard: Option<String>,
    pub added: Option<String>,
    pub recorded: Option<String>,
    /// Server-authoritative; discarded when a client sends it.
    pub updated: Option<Value>,
}

/// A video payload after validation and reference resolution, ready to
/// persist.
#[derive(Debug)]
pub struct ResolvedVideo {
    pub title: String,
    pub slug: Option<String>,
    pub state: i32,
    pub category: Category,
    pub speakers: Vec<Speaker>,
    pub tags: Vec<Tag>,
    pub language: Option<Language>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i32>,
    pub whiteboard: Option<String>,
    pub added: Option<NaiveDateTime>,
    pub recorded: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub title: String,
    pub slug: Option<String>,
    pub kind: Option<Value>,
}

#[derive(Debug)]
pub struct ResolvedCategory {
    pub title: String,
    pub slug: Option<String>,
    pub kind_id: i32,
}

fn parse_i32(value: &Value) -> Option<i32> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    i32::try_from(parsed).ok()
}

fn parse_state(value: &Value) -> Option<i32> {
    parse_i32(value).filter(|state| VALID_STATES.contains(state))
}

fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strips the trailing UTC suffix when the deployment is configured without
/// timezone awareness.
pub fn normalize_timestamp(raw: &str, use_tz: bool) -> String {
    if !use_tz && raw.ends_with('Z') {
        raw[..raw.len() - 1].to_string()
    } else {
        raw.to_string()
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn timestamp_field(
    raw: Option<&str>,
    field: &str,
    use_tz: bool,
    errors: &mut FieldErrors,
) -> Option<NaiveDateTime> {
    let raw = raw?;
    let normalized = normalize_timestamp(raw, use_tz);
    match parse_timestamp(&normalized) {
        Some(ts) => Some(ts),
        None => {
            errors.add(field, format!(r#""{}" is not a valid timestamp."#, raw));
            None
        }
    }
}

pub async fn hydrate_video(
    store: &dyn CatalogStore,
    payload: VideoPayload,
    existing: Option<&Video>,
    use_tz: bool,
) -> Result<ResolvedVideo, AppError> {
    let mut errors = FieldErrors::default();

    // Slug must not belong to a different video.
    if let Some(slug) = payload.slug.as_deref() {
        if store
            .video_slug_in_use(slug, existing.map(|v| v.id))
            .await?
        {
            errors.add("slug", format!(r#"slug "{}" is already used."#, slug));
        }
    }

    // Missing state defaults to live.
    let state = match payload.state.as_ref() {
        Some(value) => match parse_state(value) {
            Some(state) => state,
            None => {
                errors.add("state", format!("state should be in {:?}", VALID_STATES));
                STATE_LIVE
            }
        },
        None => STATE_LIVE,
    };

    // Incoming tags can either be an API url or a tag name.
    let mut tags = Vec::with_capacity(payload.tags.len());
    for raw in &payload.tags {
        match parse_ref(raw) {
            Err(RefParseError::Empty) => {
                errors.add("tags", "tags must be list of non-empty strings.");
            }
            Err(RefParseError::MalformedId(value)) => {
                errors.add(
                    "tags",
                    format!(r#""{}" is not a valid resource reference."#, value),
                );
            }
            Ok(ResourceRef::Api(id)) => match store.tag_by_id(id).await? {
                Some(tag) => tags.push(tag),
                None => {
                    return Err(AppError::NotFound(format!("tag {} does not exist.", id)));
                }
            },
            Ok(ResourceRef::Natural(text)) => {
                tags.push(store.tag_find_or_create(&text).await?);
            }
        }
    }

    // Incoming speakers resolve the same way, keyed on name.
    let mut speakers = Vec::with_capacity(payload.speakers.len());
    for raw in &payload.speakers {
        match parse_ref(raw) {
            Err(RefParseError::Empty) => {
                errors.add("speakers", "speakers must be list of non-empty strings.");
            }
            Err(RefParseError::MalformedId(value)) => {
                errors.add(
                    "speakers",
                    format!(r#""{}" is not a valid resource reference."#, value),
                );
            }
            Ok(ResourceRef::Api(id)) => match store.speaker_by_id(id).await? {
                Some(speaker) => speakers.push(speaker),
                None => {
                    return Err(AppError::NotFound(format!(
                        "speaker {} does not exist.",
                        id
                    )));
                }
            },
            Ok(ResourceRef::Natural(name)) => {
                speakers.push(store.speaker_find_or_create(&name).await?);
            }
        }
    }

    // Incoming category can be either an API url or a category title (not a
    // slug). Categories are never created here.
    let category = match payload.category.as_deref() {
        None => {
            errors.add("category", "category is a required field.");
            None
        }
        Some(raw) => match parse_ref(raw) {
            Ok(ResourceRef::Api(id)) => match store.category_by_id(id).await? {
                Some(category) => Some(category),
                None => {
                    return Err(AppError::NotFound(format!(
                        "category {} does not exist.",
                        id
                    )));
                }
            },
            Ok(ResourceRef::Natural(title)) => match store.category_by_title(&title).await? {
                Some(category) => Some(category),
                None => {
                    errors.add("category", format!(r#"category "{}" does not exist."#, title));
                    None
                }
            },
            Err(_) => {
                errors.add("category", format!(r#"category "{}" does not exist."#, raw));
                None
            }
        },
    };

    // Incoming language can only be a language name; languages are not
    // created through the API. An absent language clears the field.
    let language = match payload.language.as_deref() {
        Some(name) => match store.language_by_name(name).await? {
            Some(language) => Some(language),
            None => {
                errors.add("language", format!(r#"language "{}" does not exist."#, name));
                None
            }
        },
        None => None,
    };

    // The updated field is stamped on every write; client values are dropped.
    if payload.updated.is_some() {
        tracing::debug!("discarding client-supplied updated field");
    }

    let added = timestamp_field(payload.added.as_deref(), "added", use_tz, &mut errors);
    let recorded = timestamp_field(payload.recorded.as_deref(), "recorded", use_tz, &mut errors);

    if !errors.is_empty() {
        return Err(errors.into_app_error());
    }

    let category =
        category.ok_or_else(|| AppError::Validation("category is a required field.".to_string()))?;

    Ok(ResolvedVideo {
        title: payload.title,
        slug: payload.slug,
        state,
        category,
        speakers,
        tags,
        language,
        summary: payload.summary,
        description: payload.description,
        source_url: payload.source_url,
        thumbnail_url: payload.thumbnail_url,
        duration: payload.duration,
        whiteboard: payload.whiteboard,
        added,
        recorded,
    })
}

pub async fn hydrate_category(
    store: &dyn CatalogStore,
    payload: CategoryPayload,
    existing: Option<&Category>,
) -> Result<ResolvedCategory, AppError> {
    let mut errors = FieldErrors::default();

    let kind_id = match payload.kind.as_ref() {
        None => {
            errors.add("kind", "kind is a required field.");
            None
        }
        Some(value) => match parse_i32(value) {
            None => {
                errors.add(
                    "kind",
                    format!(r#""{}" is not a valid category kind."#, value_display(value)),
                );
                None
            }
            Some(id) => match store.category_kind_by_id(id).await? {
                Some(kind) => Some(kind.id),
                None => {
                    errors.add("kind", format!(r#""{}" is not a valid category kind."#, id));
                    None
                }
            },
        },
    };

    if let Some(slug) = payload.slug.as_deref() {
        if store
            .category_slug_in_use(slug, existing.map(|c| c.id))
            .await?
        {
            errors.add("slug", format!(r#"slug "{}" is already used."#, slug));
        }
    }

    if !errors.is_empty() {
        return Err(errors.into_app_error());
    }

    let kind_id =
        kind_id.ok_or_else(|| AppError::Validation("kind is a required field.".to_string()))?;

    Ok(ResolvedCategory {
        title: payload.title,
        slug: payload.slug,
        kind_id,
    })
}
