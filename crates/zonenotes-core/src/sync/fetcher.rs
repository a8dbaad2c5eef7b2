//! Change-feed pagination

use crate::error::{Error, Result, TransportError};
use crate::models::{RecordStub, Zone};
use crate::protocol::{decode_body, encode_body, ChangesRequest, ChangesResponse, SyncCursor};
use crate::transport::ZoneTransport;

/// Stubs collected from a fully drained change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Stubs in feed order, page after page. May contain duplicates.
    pub stubs: Vec<RecordStub>,
    pub pages: usize,
}

/// Drains a zone's change feed page by page.
pub struct ZoneChangeFetcher<'a, T: ?Sized> {
    transport: &'a T,
    url: &'a str,
    max_pages: usize,
}

impl<'a, T: ZoneTransport + ?Sized> ZoneChangeFetcher<'a, T> {
    pub const fn new(transport: &'a T, url: &'a str, max_pages: usize) -> Self {
        Self {
            transport,
            url,
            max_pages,
        }
    }

    /// Request pages starting from an empty cursor until `moreComing` is false.
    ///
    /// Fails with `PaginationLimitExceeded` instead of issuing more than
    /// `max_pages` requests.
    pub async fn fetch_all(&self, zone: &Zone) -> Result<ChangeSet> {
        let mut stubs = Vec::new();
        let mut cursor: Option<SyncCursor> = None;
        let mut pages = 0;

        loop {
            if pages == self.max_pages {
                return Err(Error::PaginationLimitExceeded { pages });
            }

            let body = encode_body(&ChangesRequest::new(zone, cursor.as_ref()))?;
            let response = self.transport.post_json(self.url, &body).await?;
            let page = decode_body::<ChangesResponse>(response, "change feed")?.into_first_zone()?;
            pages += 1;

            tracing::debug!(
                "Change feed page {} for zone {}: {} records, more_coming={}",
                pages,
                zone.name,
                page.records.len(),
                page.more_coming
            );
            stubs.extend(page.records);

            if !page.more_coming {
                return Ok(ChangeSet { stubs, pages });
            }

            let next = page.sync_token.ok_or_else(|| {
                TransportError::envelope("change feed reported moreComing without a syncToken")
            })?;
            cursor = Some(next);
        }
    }
}
