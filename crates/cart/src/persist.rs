//! Cart snapshot persistence.
//!
//! The persister is a [`CartListener`]: subscribed to a [`CartStore`], it
//! writes the whole cart under one storage key after every effective
//! mutation. The store itself never touches storage.
//!
//! # Format
//!
//! ```json
//! {
//!   "state": {
//!     "items": [{"productId": "p1", "storeId": "s1", "storeName": "Acme",
//!                "unitPrice": "100", "quantity": 1}],
//!     "storeId": "s1",
//!     "storeName": "Acme",
//!     "fulfillmentMode": "delivery",
//!     "totalItemCount": 1,
//!     "cartSubtotal": "100"
//!   },
//!   "version": 1,
//!   "savedAt": "2026-01-01T00:00:00Z"
//! }
//! ```
//!
//! Aggregates are written for readers of the blob but recomputed on restore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::state::{CartState, InvariantViolation};
use crate::storage::{KeyValueStorage, StorageError};
use crate::store::{CartEvent, CartListener, CartStore};

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "marketplace-cart";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors decoding or encoding a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The blob is not valid snapshot JSON.
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// The blob was written by an incompatible format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The blob decodes but describes an impossible cart.
    #[error("invalid cart in snapshot: {0}")]
    Invalid(#[from] InvariantViolation),
}

/// Errors saving a snapshot.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<T> {
    state: T,
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
}

/// Serialize `state` into a versioned snapshot.
///
/// # Errors
///
/// Returns `SnapshotError::Json` if serialization fails.
pub fn encode(state: &CartState) -> Result<String, SnapshotError> {
    let snapshot = Snapshot {
        state,
        version: SNAPSHOT_VERSION,
        saved_at: Some(Utc::now()),
    };
    Ok(serde_json::to_string(&snapshot)?)
}

/// Parse and validate a snapshot.
///
/// The returned state satisfies every cart invariant and has freshly
/// computed aggregates.
///
/// # Errors
///
/// Returns an error if the JSON is malformed, the version is unknown, or
/// the cart it describes breaks an invariant.
pub fn decode(raw: &str) -> Result<CartState, SnapshotError> {
    let snapshot: Snapshot<CartState> = serde_json::from_str(raw)?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let mut state = snapshot.state;
    state.check_invariants()?;
    state.recompute()?;
    Ok(state)
}

/// Writes cart snapshots to a key-value storage.
#[derive(Debug)]
pub struct CartPersister<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> CartPersister<S> {
    /// Create a persister writing under `key`.
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Create a persister writing under [`DEFAULT_STORAGE_KEY`].
    pub fn with_default_key(storage: S) -> Self {
        Self::new(storage, DEFAULT_STORAGE_KEY)
    }

    /// Read the stored cart.
    ///
    /// Never fails: a missing, unreadable, malformed or invalid snapshot
    /// yields the empty default cart.
    #[must_use]
    pub fn restore(&self) -> CartState {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No stored cart, starting empty");
                return CartState::default();
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read stored cart, starting empty");
                return CartState::default();
            }
        };

        match decode(&raw) {
            Ok(state) => {
                debug!(
                    key = %self.key,
                    items = state.items().len(),
                    "Restored cart"
                );
                state
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding stored cart");
                CartState::default()
            }
        }
    }

    /// Write `state` under the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the storage write fails.
    #[instrument(skip(self, state), fields(key = %self.key))]
    pub fn save(&self, state: &CartState) -> Result<(), PersistError> {
        let raw = encode(state)?;
        self.storage.set(&self.key, &raw)?;
        debug!(bytes = raw.len(), "Cart snapshot written");
        Ok(())
    }

    /// Delete the stored snapshot, so the next restore starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage delete fails.
    pub fn forget(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key)
    }
}

impl<S: KeyValueStorage + 'static> CartPersister<S> {
    /// Restore the stored cart and subscribe this persister to it.
    #[must_use]
    pub fn open_store(self) -> CartStore {
        let mut store = CartStore::from_state(self.restore()).unwrap_or_else(|e| {
            warn!(key = %self.key, error = %e, "Restored cart is invalid, starting empty");
            CartStore::new()
        });
        store.subscribe(self);
        store
    }
}

impl<S: KeyValueStorage> CartListener for CartPersister<S> {
    fn on_change(&self, state: &CartState, event: &CartEvent) {
        if let Err(e) = self.save(state) {
            // In-memory state stays authoritative for this session.
            warn!(key = %self.key, ?event, error = %e, "Failed to persist cart");
        }
    }
}
