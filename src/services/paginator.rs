//! Cursor-following walk over a paged list endpoint.

use std::future::Future;

use serde::Serialize;

use crate::domain::errors::DomainResult;
use crate::domain::models::Page;

/// First page number of the remote list API.
///
/// GitHub numbers pages from 1 and answers `page=0` with page 1, so
/// starting lower would deliver the first page twice.
pub const FIRST_PAGE: u32 = 1;

/// What a completed walk saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaginationSummary {
    pub pages: u32,
    pub items: u64,
}

/// Walk a paged endpoint until exhaustion.
///
/// `fetch(page)` retrieves one page. `handle(item)` is awaited for every
/// item in page-then-within-page order, one at a time. Between pages the
/// task yields so a long walk does not hog the runtime.
///
/// The first error, from either a fetch or a handler, aborts the walk and
/// is returned unchanged. Items handled before it stay handled.
pub async fn paginate<T, F, FFut, H, HFut>(mut fetch: F, mut handle: H) -> DomainResult<PaginationSummary>
where
    F: FnMut(u32) -> FFut,
    FFut: Future<Output = DomainResult<Page<T>>>,
    H: FnMut(T) -> HFut,
    HFut: Future<Output = DomainResult<()>>,
{
    let mut summary = PaginationSummary::default();
    let mut page = FIRST_PAGE;

    loop {
        tracing::debug!(page, "Fetching page");
        let response = fetch(page).await?;
        let is_last = response.is_last();
        summary.pages += 1;

        for item in response.items {
            handle(item).await?;
            summary.items += 1;
        }

        if is_last {
            break;
        }
        page += 1;
        tokio::task::yield_now().await;
    }

    tracing::debug!(pages = summary.pages, items = summary.items, "Done paging");
    Ok(summary)
}
