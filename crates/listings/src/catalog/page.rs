use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    PublishedAt,
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Zero-based page request with sort specification. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl PageRequest {
    pub const DEFAULT_SIZE: u32 = 20;

    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
            sort: SortField::default(),
            direction: SortDirection::default(),
        }
    }

    pub fn sorted(mut self, sort: SortField, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn offset(&self) -> usize {
        self.page as usize * self.size as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_SIZE)
    }
}

/// Raw pagination parameters as accepted on every list/search endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub sort: Option<SortField>,
    #[serde(default)]
    pub direction: Option<SortDirection>,
}

impl PageQuery {
    pub fn resolve(&self, config: &PaginationConfig) -> PageRequest {
        let size = self
            .size
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size.max(1));
        PageRequest::new(self.page.unwrap_or(0), size).sorted(
            self.sort.unwrap_or_default(),
            self.direction.unwrap_or_default(),
        )
    }
}

/// One page of results echoed back with its request metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total_items: u64) -> Self {
        let size = u64::from(request.size.max(1));
        let total_pages = total_items.div_ceil(size);
        Self {
            items,
            page: request.page,
            size: request.size,
            total_items,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }

    pub fn empty(request: &PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    /// Slices an already ordered, fully materialized result set.
    pub fn from_sorted(all: Vec<T>, request: &PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.size as usize)
            .collect();
        Self::new(items, request, total)
    }
}
