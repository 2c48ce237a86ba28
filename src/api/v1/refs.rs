//! Reference values for related entities accept either an API detail URL
//! (`/api/v1/<resource>/<id>/`) or a natural-key string (tag text, speaker
//! name, category title).

/// Prefix shared by every v1 detail URL.
pub const API_PREFIX: &str = "/api/v1/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    /// A structured reference: fixed prefix plus trailing numeric id.
    Api(i32),
    /// Anything else is looked up (or created) by natural key.
    Natural(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefParseError {
    /// Empty values are rejected before classification.
    Empty,
    /// Starts with the API prefix but does not end in a numeric id.
    MalformedId(String),
}

/// Classifies a raw reference value. The structured-reference parse is
/// attempted first; everything that does not carry the API prefix falls back
/// to a natural key.
pub fn parse_ref(raw: &str) -> Result<ResourceRef, RefParseError> {
    if raw.is_empty() {
        return Err(RefParseError::Empty);
    }

    if let Some(rest) = raw.strip_prefix(API_PREFIX) {
        let id_segment = rest.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        return match id_segment.parse::<i32>() {
            Ok(id) => Ok(ResourceRef::Api(id)),
            Err(_) => Err(RefParseError::MalformedId(raw.to_string())),
        };
    }

    Ok(ResourceRef::Natural(raw.to_string()))
}
