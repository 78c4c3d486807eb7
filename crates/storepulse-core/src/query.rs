//! Logical collection queries and canonical cache keys

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional dimension filter narrowing a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum DimensionFilter {
    Branch(String),
    Warehouse(String),
    Sku(String),
}

impl DimensionFilter {
    /// Query-string parameter carrying this filter
    pub fn param(&self) -> &'static str {
        match self {
            DimensionFilter::Branch(_) => "branch_id",
            DimensionFilter::Warehouse(_) => "warehouse",
            DimensionFilter::Sku(_) => "sku",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            DimensionFilter::Branch(v) | DimensionFilter::Warehouse(v) | DimensionFilter::Sku(v) => v,
        }
    }
}

/// Everything that affects the records a collection returns.
///
/// Page size is deliberately absent: a traversal yields the same deduplicated
/// set whatever page size is used, so it must not fragment the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionQuery {
    /// Collection path relative to the API base, e.g. `/sales`
    pub collection: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub dimension: Option<DimensionFilter>,
    pub include_inactive: bool,
    pub search: Option<String>,
}

impl CollectionQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            from: None,
            to: None,
            dimension: None,
            include_inactive: false,
            search: None,
        }
    }

    pub fn from_date(mut self, from: NaiveDate) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to_date(mut self, to: NaiveDate) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_dimension(mut self, dimension: DimensionFilter) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn include_inactive(mut self, include: bool) -> Self {
        self.include_inactive = include;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        let trimmed = search.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Query-string parameters for this query, excluding paging fields
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(from) = self.from {
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            params.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(ref dimension) = self.dimension {
            params.push((dimension.param(), dimension.value().to_string()));
        }
        params.push((
            "include_inactive",
            if self.include_inactive { "1" } else { "0" }.to_string(),
        ));
        if let Some(ref search) = self.search {
            params.push(("q", search.clone()));
        }
        params
    }

    /// Canonical cache key for this query under a consumer scope.
    ///
    /// Every field that changes the result is a segment, so two views that
    /// differ in any filter never share an entry.
    pub fn cache_key(&self, scope: &str) -> QueryKey {
        let date = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        let dimension = self
            .dimension
            .as_ref()
            .map(|d| format!("{}={}", d.param(), d.value()))
            .unwrap_or_else(|| "dim=".to_string());

        QueryKey::new(scope)
            .segment(format!("collection={}", self.collection.trim_start_matches('/')))
            .segment(format!("from={}", date(self.from)))
            .segment(format!("to={}", date(self.to)))
            .segment(dimension)
            .segment(format!("inactive={}", u8::from(self.include_inactive)))
            .segment(format!("q={}", self.search.as_deref().unwrap_or("")))
    }
}

/// Canonical, segment-wise comparable cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    segments: Vec<String>,
}

impl QueryKey {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            segments: vec![scope.into()],
        }
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whole-segment prefix match (`sales` does not match `sales-kpis`)
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments.iter().zip(&prefix.segments).all(|(a, b)| a == b)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
