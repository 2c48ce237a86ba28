//! V1 API route definitions
//!
//! Reads are open to any principal; the auth middleware rejects writes from
//! everyone but staff before a handler ever runs.

use axum::{
    middleware,
    routing::get,
    Router,
};

use crate::api::common::middleware::auth_middleware;
use crate::api::v1::category::{
    create_category, delete_category, get_category, list_categories, update_category,
};
use crate::api::v1::language::{get_language, list_languages};
use crate::api::v1::speaker::{
    create_speaker, delete_speaker, get_speaker, list_speakers, update_speaker,
};
use crate::api::v1::tag::{create_tag, delete_tag, get_tag, list_tags, update_tag};
use crate::api::v1::video::{create_video, delete_video, get_video, list_videos, update_video};
use crate::InnerState;

/// Creates the v1 catalog routes.
pub fn create_v1_routes(state: InnerState) -> Router {
    Router::new()
        // Video resource
        .route("/video/", get(list_videos).post(create_video))
        .route(
            "/video/:id/",
            get(get_video).put(update_video).delete(delete_video),
        )
        // Speaker resource
        .route("/speaker/", get(list_speakers).post(create_speaker))
        .route(
            "/speaker/:id/",
            get(get_speaker).put(update_speaker).delete(delete_speaker),
        )
        // Category resource
        .route("/category/", get(list_categories).post(create_category))
        .route(
            "/category/:id/",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        // Tag resource
        .route("/tag/", get(list_tags).post(create_tag))
        .route("/tag/:id/", get(get_tag).put(update_tag).delete(delete_tag))
        // Language resource (read-only)
        .route("/language/", get(list_languages))
        .route("/language/:id/", get(get_language))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
