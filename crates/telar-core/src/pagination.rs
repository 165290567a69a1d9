//! Pagination envelope and list-request validation.
//!
//! Every list operation returns the same `{items, total, page, limit,
//! pages, hasNextPage, hasPrevPage}` envelope. Page numbers are derived
//! from skip/limit the way the original API computed them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Maximum page size a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Caller-supplied pagination and sorting options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Validated list parameters ready for a repository query.
///
/// `sort_column` is always one of the whitelisted column names handed to
/// [`PageRequest::resolve`], never raw caller input.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub limit: i64,
    pub skip: i64,
    pub sort_column: &'static str,
    pub descending: bool,
}

impl PageRequest {
    /// Validate and resolve against a sort-field whitelist.
    ///
    /// `sort_fields` maps wire names to column names; the first entry is the
    /// default. Unknown sort fields, a limit outside 1..=100, a negative
    /// skip, or a sort order other than asc/desc are rejected as invalid
    /// input.
    pub fn resolve(&self, sort_fields: &[(&str, &'static str)]) -> Result<ListParams> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(Error::InvalidInput(format!(
                "limit must be between 1 and {}, got {}",
                MAX_PAGE_LIMIT, limit
            )));
        }

        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(Error::InvalidInput(format!(
                "skip must be non-negative, got {}",
                skip
            )));
        }

        let sort_column = match self.sort_by.as_deref() {
            None => sort_fields[0].1,
            Some(name) => sort_fields
                .iter()
                .find(|(wire, _)| *wire == name)
                .map(|(_, column)| *column)
                .ok_or_else(|| Error::InvalidInput(format!("unknown sort field: {}", name)))?,
        };

        let descending = match self.sort_order.as_deref() {
            None | Some("desc") => true,
            Some("asc") => false,
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "sort order must be asc or desc, got {}",
                    other
                )))
            }
        };

        Ok(ListParams {
            limit,
            skip,
            sort_column,
            descending,
        })
    }
}

/// Uniform paginated response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Page<T> {
    /// Build the envelope from a result set and the params that produced it.
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        let page = params.skip / params.limit + 1;
        let pages = (total + params.limit - 1) / params.limit;
        Self {
            items,
            total,
            page,
            limit: params.limit,
            pages,
            has_next_page: page < pages,
            has_prev_page: page > 1,
        }
    }
}
