use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FilterError;
use crate::config;

/// Common query parameters accepted by every list endpoint.
///
/// `filters` arrives as a JSON object serialized into a single query
/// parameter, e.g. `filters={"status":"available","year":{"$gte":2020}}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub filters: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl ListParams {
    /// Page number, 1-based.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Requested page size, clamped into [1, max_page_size].
    pub fn page_size(&self) -> i64 {
        let cfg = &config::config().api;
        self.page_size
            .unwrap_or(cfg.default_page_size)
            .clamp(1, cfg.max_page_size)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }

    pub fn sort_direction(&self) -> Result<SortDirection, FilterError> {
        match self.sort_order.as_deref() {
            None | Some("asc") | Some("ASC") => Ok(SortDirection::Asc),
            Some("desc") | Some("DESC") => Ok(SortDirection::Desc),
            Some(other) => Err(FilterError::InvalidSortOrder(other.to_string())),
        }
    }

    /// Parse the `filters` blob into a JSON object, if present.
    pub fn filters_value(&self) -> Result<Option<Value>, FilterError> {
        match self.filters.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => {
                let value: Value = serde_json::from_str(raw)?;
                if value.is_object() {
                    Ok(Some(value))
                } else {
                    Err(FilterError::InvalidFilters(
                        "filters must be a JSON object".to_string(),
                    ))
                }
            }
        }
    }
}

/// Pagination block attached to every list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(params: &ListParams, total: i64) -> Self {
        let page_size = params.page_size();
        let total_pages = if total == 0 {
            0
        } else {
            (total + page_size - 1) / page_size
        };
        Self {
            page: params.page(),
            page_size,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_capped() {
        let params = ListParams {
            page_size: Some(500),
            ..Default::default()
        };
        assert_eq!(params.page_size(), 100);
    }

    #[test]
    fn offset_follows_page() {
        let params = ListParams {
            page: Some(2),
            page_size: Some(10),
            ..Default::default()
        };
        assert_eq!(params.offset(), 10);
        assert_eq!(params.page_size(), 10);
    }

    #[test]
    fn rejects_non_object_filters() {
        let params = ListParams {
            filters: Some("[1,2]".to_string()),
            ..Default::default()
        };
        assert!(params.filters_value().is_err());
    }

    #[test]
    fn pagination_rounds_up() {
        let params = ListParams {
            page_size: Some(10),
            ..Default::default()
        };
        let p = Pagination::new(&params, 25);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.total, 25);
    }
}
