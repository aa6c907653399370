//! Session manager: one live handle per store, released exactly once
//!
//! A session is either established (both handles live) or closed (both
//! released). Establishing opens the relational store first, then the
//! document store; if the second open fails the first handle is released
//! before the error is returned. Teardown releases each live handle
//! independently, so a failure releasing one never skips the other.
//!
//! `with_session` is the scoped form: the body runs against an established
//! session and teardown happens on every exit path, panics included.

use futures::future::BoxFuture;
use futures::FutureExt;
use hybrid_common::{Error, Result, StoreKind};
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, warn};

use crate::store::{StoreConnector, StoreHandle};

/// Resting state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Established,
    Closed,
}

/// Outcome of one teardown
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Stores whose handle was released cleanly
    pub released: Vec<StoreKind>,
    /// Stores whose release failed (the handle is dropped regardless)
    pub failures: Vec<(StoreKind, Error)>,
}

impl TeardownReport {
    /// True when every live handle was released without error
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of release attempts made
    pub fn attempts(&self) -> usize {
        self.released.len() + self.failures.len()
    }
}

/// Paired connection to the relational and document stores
pub struct Session<R: StoreHandle, D: StoreHandle> {
    relational: Option<R>,
    document: Option<D>,
}

impl<R: StoreHandle, D: StoreHandle> Session<R, D> {
    /// Open both stores, relational first
    ///
    /// Fails with the connection error of whichever store could not be
    /// opened. No handle outlives a failed establish.
    pub async fn establish<CR, CD>(relational: &CR, document: &CD) -> Result<Self>
    where
        CR: StoreConnector<Handle = R>,
        CD: StoreConnector<Handle = D>,
    {
        let rel = open_store(relational).await?;
        let doc = match open_store(document).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "Releasing {} handle after {} store failed to open",
                    StoreKind::Relational,
                    StoreKind::Document
                );
                // The open error is the one reported; a release failure is only logged
                let _ = release_store(rel).await;
                return Err(e);
            }
        };

        Ok(Self {
            relational: Some(rel),
            document: Some(doc),
        })
    }

    pub fn state(&self) -> SessionState {
        if self.relational.is_some() || self.document.is_some() {
            SessionState::Established
        } else {
            SessionState::Closed
        }
    }

    /// Relational handle, or `SessionClosed` after teardown
    pub fn relational(&mut self) -> Result<&mut R> {
        self.relational
            .as_mut()
            .ok_or(Error::SessionClosed(StoreKind::Relational))
    }

    /// Document handle, or `SessionClosed` after teardown
    pub fn document(&mut self) -> Result<&mut D> {
        self.document
            .as_mut()
            .ok_or(Error::SessionClosed(StoreKind::Document))
    }

    /// Both handles at once, for issuing one query against each concurrently
    pub fn handles(&mut self) -> Result<(&mut R, &mut D)> {
        match (self.relational.as_mut(), self.document.as_mut()) {
            (Some(rel), Some(doc)) => Ok((rel, doc)),
            (None, _) => Err(Error::SessionClosed(StoreKind::Relational)),
            (_, None) => Err(Error::SessionClosed(StoreKind::Document)),
        }
    }

    /// Release every live handle: relational first, then document
    ///
    /// Idempotent: a closed session yields an empty report and releases
    /// nothing. Release failures are collected, never returned as errors.
    pub async fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.state() == SessionState::Closed {
            debug!("Teardown on closed session: nothing to release");
            return report;
        }

        if let Some(rel) = self.relational.take() {
            match release_store(rel).await {
                Ok(()) => report.released.push(StoreKind::Relational),
                Err(e) => report.failures.push((StoreKind::Relational, e)),
            }
        }
        if let Some(doc) = self.document.take() {
            match release_store(doc).await {
                Ok(()) => report.released.push(StoreKind::Document),
                Err(e) => report.failures.push((StoreKind::Document, e)),
            }
        }
        report
    }
}

impl<R: StoreHandle, D: StoreHandle> Drop for Session<R, D> {
    fn drop(&mut self) {
        if self.state() == SessionState::Established {
            warn!("Session dropped without teardown; store handles closed without release");
        }
    }
}

async fn open_store<C: StoreConnector>(connector: &C) -> Result<C::Handle> {
    let kind = connector.kind();
    match connector.open().await {
        Ok(handle) => {
            info!("✓ {} store connected ({})", kind, connector.endpoint());
            Ok(handle)
        }
        Err(e) => {
            error!("Failed to connect to {} store ({}): {}", kind, connector.endpoint(), e);
            Err(e)
        }
    }
}

async fn release_store<H: StoreHandle>(handle: H) -> Result<()> {
    let kind = handle.kind();
    match handle.release().await {
        Ok(()) => {
            info!("{} store connection closed", kind);
            Ok(())
        }
        Err(e) => {
            error!("Failed to close {} store connection: {}", kind, e);
            Err(e)
        }
    }
}

/// Run `body` against a freshly established session, then tear it down
///
/// Teardown happens whether the body succeeds, returns an error, or panics;
/// the body's own error (or panic) is what the caller sees.
///
/// ```rust,ignore
/// let feed = with_session(&mysql, &mongo, |session| {
///     Box::pin(async move { hybrid_feed(session, 5).await })
/// })
/// .await?;
/// ```
pub async fn with_session<CR, CD, T, F>(relational: &CR, document: &CD, body: F) -> Result<T>
where
    CR: StoreConnector,
    CD: StoreConnector,
    F: for<'s> FnOnce(&'s mut Session<CR::Handle, CD::Handle>) -> BoxFuture<'s, Result<T>>,
{
    let mut session = Session::establish(relational, document).await?;

    let outcome = AssertUnwindSafe(body(&mut session)).catch_unwind().await;

    let report = session.teardown().await;
    if !report.is_clean() {
        warn!(
            "Session teardown finished with {} release failure(s)",
            report.failures.len()
        );
    }

    match outcome {
        Ok(Err(e)) => {
            match e.store() {
                Some(store) => error!("Session failed on {} store: {}", store, e),
                None => error!("Session failed: {}", e),
            }
            Err(e)
        }
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
