//! Locally cached listings of uploaded files and generated reports.
//!
//! Both are derived caches: they are replaced wholesale by backend listings
//! and are only ever written by their own list/delete results.

use crate::{
    backend::BackendError,
    tenant::{Gstin, RegistryKey},
};

/// A file known to the backend, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub name: String,
}

impl From<String> for Artifact {
    fn from(name: String) -> Self {
        Self { name }
    }
}

/// Issue order of listing requests; later requests carry larger numbers.
pub type ListingSeq = u64;

/// What happened to a listing result when it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingOutcome {
    /// Entries replaced; carries the new count.
    Applied(usize),
    /// The key moved on, or a newer listing already landed.
    Stale,
    /// The listing failed; the local view was cleared.
    Failed(BackendError),
}

/// Entries listed for one key at a time.
#[derive(Debug, Clone)]
pub struct Listing<K> {
    key: Option<K>,
    entries: Vec<Artifact>,
    /// Last request handed out.
    issued: ListingSeq,
    /// Newest request whose result is shown (or that a delete overtook).
    applied: ListingSeq,
}

impl<K> Default for Listing<K> {
    fn default() -> Self {
        Self {
            key: None,
            entries: Vec::new(),
            issued: 0,
            applied: 0,
        }
    }
}

/// Uploaded artifacts for the active (GSTIN, category) pair.
pub type FileRegistry = Listing<RegistryKey>;
/// Generated reports for the active GSTIN.
pub type ReportShelf = Listing<Gstin>;

impl<K: Clone + PartialEq + std::fmt::Display> Listing<K> {
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn entries(&self) -> &[Artifact] {
        &self.entries
    }

    /// A request is out whose result has not landed yet.
    pub fn is_loading(&self) -> bool {
        self.key.is_some() && self.applied < self.issued
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|a| a.name == name)
    }

    /// Re-key the listing. Returns the request to send when the key changed
    /// to a usable one; a `None` key clears locally without any request.
    pub fn sync(&mut self, key: Option<K>) -> Option<(K, ListingSeq)> {
        if key == self.key {
            return None;
        }
        self.entries.clear();
        self.key = key;
        // Anything still in flight belongs to the old key.
        self.applied = self.issued;
        self.next_request()
    }

    /// Request for an explicit re-fetch of the current key.
    pub fn refresh(&mut self) -> Option<(K, ListingSeq)> {
        self.next_request()
    }

    fn next_request(&mut self) -> Option<(K, ListingSeq)> {
        let key = self.key.clone()?;
        self.issued += 1;
        Some((key, self.issued))
    }

    /// Replace the entries with the listing fetched by request `seq` for
    /// `key`. A result older than the one already shown is dropped.
    pub fn apply_listing(
        &mut self,
        key: &K,
        seq: ListingSeq,
        result: Result<Vec<String>, BackendError>,
    ) -> ListingOutcome {
        if self.key.as_ref() != Some(key) {
            tracing::debug!(%key, seq, "listing for an old key ignored");
            return ListingOutcome::Stale;
        }
        if seq <= self.applied {
            tracing::debug!(%key, seq, applied = self.applied, "superseded listing ignored");
            return ListingOutcome::Stale;
        }
        self.applied = seq;
        match result {
            Ok(names) => {
                self.entries = names.into_iter().map(Artifact::from).collect();
                tracing::info!(%key, seq, count = self.entries.len(), "listing applied");
                ListingOutcome::Applied(self.entries.len())
            }
            Err(e) => {
                tracing::warn!(%key, seq, kind = e.kind(), "listing failed: {e}");
                self.entries.clear();
                ListingOutcome::Failed(e)
            }
        }
    }

    /// Drop `name` after the backend confirmed its deletion. Listings issued
    /// before this point may still name the file, so they are retired.
    pub fn remove(&mut self, key: &K, name: &str) -> bool {
        if self.key.as_ref() != Some(key) {
            return false;
        }
        let before = self.entries.len();
        self.entries.retain(|a| a.name != name);
        self.applied = self.issued;
        before != self.entries.len()
    }
}
