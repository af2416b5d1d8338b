// src/query/page.rs

//! Pagination stage

use super::QueryParams;

/// Page size limits for one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_per_page: 10,
            max_per_page: 50,
        }
    }
}

/// A resolved page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    /// Read `page` and `per-page`; bad values fall back, oversize pages are capped
    pub fn from_params(params: &QueryParams, limits: PageLimits) -> Self {
        let page = params
            .get("page")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        let per_page = params
            .get("per-page")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(limits.default_per_page)
            .min(limits.max_per_page);

        Self { page, per_page }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// `LIMIT ... OFFSET ...` clause
    pub fn sql(&self) -> String {
        format!(" LIMIT {} OFFSET {}", self.per_page, self.offset())
    }
}
