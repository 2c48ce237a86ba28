//! Helpers shared across API versions.

pub mod middleware;

use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Serialize)]
pub struct ListMeta {
    pub limit: i64,
    pub offset: i64,
    pub total_count: i64,
}

/// List responses carry pagination metadata next to the objects.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub meta: ListMeta,
    pub objects: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(params: &PaginationParams, total_count: i64, objects: Vec<T>) -> Self {
        Self {
            meta: ListMeta {
                limit: params.limit(),
                offset: params.offset(),
                total_count,
            },
            objects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let params = PaginationParams {
            limit: None,
            offset: None,
        };
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 0);

        let params = PaginationParams {
            limit: Some(5000),
            offset: Some(-3),
        };
        assert_eq!(params.limit(), 1000);
        assert_eq!(params.offset(), 0);
    }
}
