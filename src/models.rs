use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Draft videos are only visible to staff.
pub const STATE_DRAFT: i32 = 0;
pub const STATE_LIVE: i32 = 1;

/// The only values the wire `state` field accepts.
pub const VALID_STATES: [i32; 2] = [STATE_LIVE, STATE_DRAFT];

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Video {
    pub id: i32,
    pub slug: Option<String>,
    pub title: String,
    pub state: i32,
    pub category_id: i32,
    pub language_id: Option<i32>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i32>,
    pub whiteboard: Option<String>,
    pub added: Option<NaiveDateTime>,
    pub recorded: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Speaker {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Tag {
    pub id: i32,
    pub tag: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Category {
    pub id: i32,
    pub title: String,
    pub slug: Option<String>,
    pub kind_id: i32,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct CategoryKind {
    pub id: i32,
    pub name: String,
}

/// Languages are read-only through the API; rows are seeded out of band.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Language {
    pub id: i32,
    pub name: String,
}
