//! Continuation-cursor extraction.
//!
//! Pagination metadata is advisory: anything absent or malformed degrades to
//! "no next page" instead of failing the aggregation.

use url::Url;

/// GraphQL-side pagination metadata: `pageInfo.hasNextPage` plus the cursor
/// of the last edge in the page.
#[derive(Debug, Clone, Default)]
pub struct PageMeta {
    pub has_next_page: bool,
    pub last_cursor: Option<String>,
}

pub fn next_cursor_from_page_meta(meta: &PageMeta) -> Option<String> {
    if !meta.has_next_page {
        return None;
    }
    meta.last_cursor.clone().filter(|c| !c.is_empty())
}

/// Pull the `page_info` token out of a REST `Link` header.
///
/// The header carries comma-separated descriptors of the shape
/// `<url>; rel="relation"`; only the descriptor whose relation is `next`
/// matters here.
pub fn next_cursor_from_link_header(header: &str) -> Option<String> {
    for descriptor in split_descriptors(header) {
        let mut parts = descriptor.split(';');
        let url_part = parts.next()?.trim();
        if !(url_part.starts_with('<') && url_part.ends_with('>')) {
            continue;
        }
        let is_next = parts.any(|p| {
            let p = p.trim();
            p.strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"') == "next")
                .unwrap_or(false)
        });
        if !is_next {
            continue;
        }
        let url = Url::parse(&url_part[1..url_part.len() - 1]).ok()?;
        return url
            .query_pairs()
            .find(|(k, _)| k == "page_info")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty());
    }
    None
}

/// Split on commas that separate descriptors, keeping commas inside `<...>`
/// intact.
fn split_descriptors(header: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in header.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&header[start..]);
    out
}
