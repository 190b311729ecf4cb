//! Query shaping: filter predicates and offset pagination
//!
//! Both run on the read path over an already merged collection, so neither
//! affects what gets cached.

pub mod filter;

pub use filter::{
    CharacterFilter, FieldFilter, FilmFilter, Matcher, PlanetFilter, Predicate, Queryable,
    SpeciesFilter, StarshipFilter, VehicleFilter,
};

use crate::{HolonetError, Result};
use serde::{Deserialize, Serialize};

/// A 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self { page, per_page }
    }

    /// Reject non-positive page numbers and sizes
    pub fn validate(&self) -> Result<()> {
        if self.page <= 0 {
            return Err(HolonetError::InvalidArgument(format!(
                "page must be at least 1, got {}",
                self.page
            )));
        }
        if self.per_page <= 0 {
            return Err(HolonetError::InvalidArgument(format!(
                "per_page must be at least 1, got {}",
                self.per_page
            )));
        }
        Ok(())
    }

    /// Half-open item range `[start, end)` of this page, clamped to `len`
    fn bounds(&self, len: usize) -> (usize, usize) {
        let per_page = usize::try_from(self.per_page).unwrap_or(usize::MAX);
        let start = usize::try_from(self.page - 1)
            .ok()
            .and_then(|p| p.checked_mul(per_page))
            .unwrap_or(usize::MAX);
        let end = start.saturating_add(per_page);
        (start.min(len), end.min(len))
    }
}

/// Page metadata returned alongside a paginated slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: i64,
    pub per_page: i64,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Query result; `meta` is `None` when no pagination was requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: Option<PageMeta>,
}

impl<T: Serialize> Paginated<T> {
    /// Re-encode the items as untyped JSON values
    pub fn into_json(self) -> Result<Paginated<serde_json::Value>> {
        let items = self
            .items
            .into_iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Paginated {
            items,
            meta: self.meta,
        })
    }
}

/// Slice `items` according to `pagination`
///
/// A page past the end yields an empty slice, not an error.
pub fn paginate<T>(items: Vec<T>, pagination: Option<Pagination>) -> Result<Paginated<T>> {
    let Some(pagination) = pagination else {
        return Ok(Paginated { items, meta: None });
    };
    pagination.validate()?;

    let total_items = items.len();
    let (start, end) = pagination.bounds(total_items);
    let per_page = pagination.per_page as usize;

    let meta = PageMeta {
        current_page: pagination.page,
        per_page: pagination.per_page,
        total_items,
        total_pages: total_items.div_ceil(per_page),
        has_next_page: end < total_items,
        has_previous_page: pagination.page > 1,
    };

    let items = items.into_iter().skip(start).take(end - start).collect();
    Ok(Paginated {
        items,
        meta: Some(meta),
    })
}
