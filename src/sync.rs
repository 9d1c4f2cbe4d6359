//! Incremental sync of the 4byte export into the local store.
//!
//! Pages are processed strictly in order. A page's rows are committed before
//! its watermark, so a crash between the two only causes that page to be
//! fetched and inserted again, which the unique index makes harmless.

use crate::errors::SyncError;
use crate::remote::SignaturePages;
use crate::signature::SignatureKind;
use crate::store::SignatureStore;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Span;

/// Why a run stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The source returned an empty page.
    UpToDate,
    /// The cancellation signal was observed between pages.
    Cancelled,
    /// The configured page budget for this run was used up.
    PageLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: SignatureKind,
    pub outcome: SyncOutcome,
    pub pages_synced: u64,
    pub records_inserted: usize,
    /// Watermark at the end of the run.
    pub last_synced_page: u64,
}

pub struct SyncEngine {
    store: SignatureStore,
    pages: Arc<dyn SignaturePages>,
    max_pages: Option<u64>,
    span: Span,
}

impl SyncEngine {
    pub fn new(store: SignatureStore, pages: Arc<dyn SignaturePages>, span: Span) -> Self {
        Self {
            store,
            pages,
            max_pages: None,
            span,
        }
    }

    /// Stop after committing this many pages in one run.
    pub fn with_max_pages(mut self, max_pages: Option<u64>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sync `kind` until the export is exhausted, `cancel` turns `true`, or
    /// the page budget runs out.
    ///
    /// In-flight requests are not aborted; cancellation is checked once per
    /// page.
    pub async fn run(
        &self,
        kind: SignatureKind,
        cancel: &watch::Receiver<bool>,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport {
            kind,
            outcome: SyncOutcome::UpToDate,
            pages_synced: 0,
            records_inserted: 0,
            last_synced_page: 0,
        };

        loop {
            if *cancel.borrow() {
                tracing::info!(parent: &self.span, %kind, "sync cancelled");
                report.outcome = SyncOutcome::Cancelled;
                break;
            }

            let watermark = self
                .store
                .run_blocking(move |s| s.watermark(kind))
                .await
                .map_err(|source| SyncError::Persistence {
                    page: report.last_synced_page,
                    source,
                })?
                .map_or(0, |w| w.last_synced_page);
            report.last_synced_page = watermark;

            if self.max_pages.is_some_and(|max| report.pages_synced >= max) {
                report.outcome = SyncOutcome::PageLimit;
                break;
            }

            let page = watermark + 1;
            let records = self
                .pages
                .page(kind, page)
                .await
                .map_err(|source| SyncError::Network { page, source })?;

            if records.is_empty() {
                tracing::info!(parent: &self.span, %kind, page, "signatures up to date");
                report.outcome = SyncOutcome::UpToDate;
                break;
            }

            let fetched = records.len();
            let inserted = self
                .store
                .run_blocking(move |s| {
                    let inserted = s.insert_if_absent(&records)?;
                    s.set_watermark(kind, page)?;
                    Ok(inserted)
                })
                .await
                .map_err(|source| SyncError::Persistence { page, source })?;

            report.pages_synced += 1;
            report.records_inserted += inserted;
            report.last_synced_page = page;
            tracing::info!(
                parent: &self.span,
                %kind,
                page,
                fetched,
                inserted,
                "page synced"
            );
        }

        Ok(report)
    }
}

/// A cancellation pair: flip the sender to `true` to stop a running sync.
pub fn cancellation() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}
