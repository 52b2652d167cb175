//! Typed builders for the property objects of each event kind.
//!
//! Each builder converts into the flat [`Properties`] map that is sent on the
//! wire, using the camelCase keys the collection endpoint expects.

use crate::messages::Properties;
use serde_json::Value;

/// Search type recorded when the caller does not name one.
pub const DEFAULT_SEARCH_TYPE: &str = "global";

/// Properties of a `search` event.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchProperties {
    pub query: String,
    /// Omitted from the payload when unknown.
    pub results_count: Option<u64>,
    pub search_type: String,
    pub filters: Option<Properties>,
}

impl SearchProperties {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results_count: None,
            search_type: DEFAULT_SEARCH_TYPE.to_string(),
            filters: None,
        }
    }
}

impl From<SearchProperties> for Properties {
    fn from(p: SearchProperties) -> Self {
        let mut map = Properties::new();
        map.insert("query".into(), Value::String(p.query));
        if let Some(count) = p.results_count {
            map.insert("resultsCount".into(), Value::from(count));
        }
        map.insert("searchType".into(), Value::String(p.search_type));
        if let Some(filters) = p.filters {
            map.insert("filters".into(), Value::Object(filters));
        }
        map
    }
}

/// Properties of a `filter_applied` event.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterProperties {
    pub filter_type: String,
    pub filter_value: Value,
    pub page: String,
}

impl From<FilterProperties> for Properties {
    fn from(p: FilterProperties) -> Self {
        let mut map = Properties::new();
        map.insert("filterType".into(), Value::String(p.filter_type));
        map.insert("filterValue".into(), p.filter_value);
        map.insert("page".into(), Value::String(p.page));
        map
    }
}

/// Properties of a `page_view` event: the page plus any caller-supplied extras.
#[derive(Debug, Clone, PartialEq)]
pub struct PageViewProperties {
    pub page: String,
    pub extra: Properties,
}

impl From<PageViewProperties> for Properties {
    fn from(p: PageViewProperties) -> Self {
        let mut map = p.extra;
        // The viewed page always wins over an extra property of the same name.
        map.insert("page".into(), Value::String(p.page));
        map
    }
}

/// Properties of a `pagination` event.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationProperties {
    pub page: u64,
    pub items_per_page: u64,
    pub total_items: u64,
    pub url: String,
}

impl From<PaginationProperties> for Properties {
    fn from(p: PaginationProperties) -> Self {
        let mut map = Properties::new();
        map.insert("page".into(), Value::from(p.page));
        map.insert("itemsPerPage".into(), Value::from(p.items_per_page));
        map.insert("totalItems".into(), Value::from(p.total_items));
        map.insert("url".into(), Value::String(p.url));
        map
    }
}

/// Properties of a `download_click` event.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProperties {
    pub download_id: String,
    pub download_name: String,
}

impl From<DownloadProperties> for Properties {
    fn from(p: DownloadProperties) -> Self {
        let mut map = Properties::new();
        map.insert("downloadId".into(), Value::String(p.download_id));
        map.insert("downloadName".into(), Value::String(p.download_name));
        map
    }
}
