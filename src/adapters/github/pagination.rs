//! `Link` response header handling.
//!
//! GitHub advertises pagination through an RFC 8288 header such as
//!
//! ```text
//! <https://api.github.com/repositories/1/issues?page=2>; rel="next",
//! <https://api.github.com/repositories/1/issues?page=5>; rel="last"
//! ```
//!
//! Only the `rel="last"` target is needed: its `page` query parameter is
//! the total page count.

use reqwest::header::{HeaderMap, LINK};
use reqwest::Url;

/// Page number of the `rel="last"` link, if any.
pub fn last_page(headers: &HeaderMap) -> Option<u32> {
    let value = headers.get(LINK)?.to_str().ok()?;
    parse_last_page(value)
}

pub fn parse_last_page(link_header: &str) -> Option<u32> {
    link_header
        .split(',')
        .filter_map(|entry| {
            let (target, params) = entry.trim().split_once(';')?;
            let is_last = params
                .split(';')
                .filter_map(|p| p.trim().split_once('='))
                .any(|(k, v)| k.trim() == "rel" && v.trim().trim_matches('"').split_whitespace().any(|r| r == "last"));
            is_last.then_some(target)
        })
        .find_map(|target| {
            let url = target.trim().strip_prefix('<')?.strip_suffix('>')?;
            Url::parse(url)
                .ok()?
                .query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
        })
}
