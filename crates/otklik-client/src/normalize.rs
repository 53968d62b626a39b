//! Search-URL normalization.
//!
//! User-supplied URLs arrive in many shapes (vacancy pages, employer pages,
//! search results with stray pagination parameters). Everything is funnelled
//! into a canonical search URL before the first fetch.

use otklik_core::error::EngineError;
use url::Url;

/// Query applied when the supplied URL carries no usable search parameters.
pub const DEFAULT_QUERY: &str =
    "text=Frontend&search_field=name&area=113&experience=doesNotMatter&order_by=relevance&search_period=7&items_on_page=20";

const SEARCH_PATH: &str = "/search/vacancy";

/// The canonical search URL with the default query.
pub fn default_search_url() -> String {
    format!("https://hh.ru{SEARCH_PATH}?{DEFAULT_QUERY}")
}

/// Normalize a user-supplied URL into a canonical search URL.
///
/// The host must belong to the hh.ru family. A URL already pointing at the
/// search path keeps its query (minus any `page` parameter); anything else
/// is rewritten to the search path with the default query.
pub fn normalize_search_url(input: &str) -> Result<String, EngineError> {
    let mut url =
        Url::parse(input).map_err(|e| EngineError::Config(format!("invalid URL '{input}': {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| EngineError::Config(format!("URL '{input}' has no host")))?;
    if !is_hh_host(host) {
        return Err(EngineError::Config(format!(
            "unsupported host '{host}', expected hh.ru"
        )));
    }

    if url.path() == SEARCH_PATH {
        strip_page_param(&mut url);
        if url.query().is_none_or(str::is_empty) {
            url.set_query(Some(DEFAULT_QUERY));
        }
    } else {
        url.set_path(SEARCH_PATH);
        url.set_query(Some(DEFAULT_QUERY));
    }
    url.set_fragment(None);

    Ok(url.into())
}

/// Append the zero-based page number to a normalized search URL.
pub fn page_url(base: &str, page: u32) -> Result<String, EngineError> {
    let mut url =
        Url::parse(base).map_err(|e| EngineError::Config(format!("invalid URL '{base}': {e}")))?;
    strip_page_param(&mut url);
    url.query_pairs_mut().append_pair("page", &page.to_string());
    Ok(url.into())
}

fn is_hh_host(host: &str) -> bool {
    host == "hh.ru" || host.ends_with(".hh.ru")
}

fn strip_page_param(url: &mut Url) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.set_query(None);
    if !kept.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
    }
}
