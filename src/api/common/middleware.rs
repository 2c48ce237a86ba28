use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::InnerState;

/// The requester a request resolved to. Anonymous requests resolve to a
/// non-staff principal; authorization, not authentication, gates writes.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub is_staff: bool,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            username: None,
            is_staff: false,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: i32,
    username: String,
    is_staff: bool,
}

pub fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Only staff get write access; read access is open to everyone.
pub fn is_authorized(method: &Method, principal: &Principal) -> bool {
    is_read_only(method) || principal.is_staff
}

/// Resolves the request to a principal via `Authorization: ApiKey
/// <username>:<key>` and rejects unauthorized writes before any handler runs.
pub async fn auth_middleware(
    State(inner): State<InnerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = resolve_principal(&inner.db, request.headers()).await;

    if !is_authorized(request.method(), &principal) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "rejecting write from non-staff principal"
        );
        return Err(AppError::Authorization(
            "write access requires a staff API key".to_string(),
        ));
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Looks up the API-key credentials; missing or unknown credentials fall
/// back to the anonymous principal rather than failing the request.
async fn resolve_principal(db: &PgPool, headers: &HeaderMap) -> Principal {
    let Some((username, key)) = extract_api_key(headers) else {
        return Principal::anonymous();
    };

    let row = sqlx::query_as::<_, ApiKeyRow>(
        r#"SELECT id, username, is_staff FROM users WHERE username = $1 AND api_key = $2"#,
    )
    .bind(&username)
    .bind(&key)
    .fetch_optional(db)
    .await;

    match row {
        Ok(Some(user)) => Principal {
            user_id: Some(user.id),
            username: Some(user.username),
            is_staff: user.is_staff,
        },
        Ok(None) => {
            tracing::debug!(username = %username, "unknown API key, continuing as anonymous");
            Principal::anonymous()
        }
        Err(e) => {
            tracing::error!("API key lookup failed: {:?}", e);
            Principal::anonymous()
        }
    }
}

/// Parses `Authorization: ApiKey <username>:<key>`.
fn extract_api_key(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let credentials = header.strip_prefix("ApiKey ")?;
    let (username, key) = credentials.split_once(':')?;
    if username.is_empty() || key.is_empty() {
        return None;
    }
    Some((username.to_string(), key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff() -> Principal {
        Principal {
            user_id: Some(1),
            username: Some("admin".to_string()),
            is_staff: true,
        }
    }

    #[test]
    fn read_only_methods_are_open_to_everyone() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert!(is_authorized(&method, &Principal::anonymous()));
            assert!(is_authorized(&method, &staff()));
        }
    }

    #[test]
    fn writes_require_staff() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            assert!(!is_authorized(&method, &Principal::anonymous()));
            assert!(is_authorized(&method, &staff()));
        }
    }
}
