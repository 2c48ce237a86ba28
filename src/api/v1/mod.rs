//! API Version 1 endpoints
//!
//! The catalog resources live here: video, speaker, category, tag and
//! language, plus the transforms that move them between wire JSON and
//! stored records.

pub mod category;
pub mod hydrate;
pub mod language;
pub mod refs;
pub mod routes;
pub mod speaker;
pub mod tag;
pub mod video;

pub use category::category_resource_uri;
pub use speaker::speaker_resource_uri;
pub use tag::tag_resource_uri;
