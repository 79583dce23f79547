//! Marketplace Cart - Single-retailer cart store.
//!
//! Holds the line items a shopper intends to buy, enforces that they all
//! come from one retailer, and keeps the item count and subtotal consistent
//! with the items on every change.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the state and is the only mutation path. It has no
//!   I/O; changes are announced to [`CartListener`] subscribers.
//! - [`CartPersister`] is such a subscriber, writing a JSON snapshot to a
//!   [`KeyValueStorage`] after every change and restoring it at start-up.
//! - [`CartConfig`] picks the storage directory and key from the environment.
//!
//! # Modules
//!
//! - [`item`] - Validated line items
//! - [`state`] - Cart state, aggregates and invariant checks
//! - [`store`] - Cart operations and change notifications
//! - [`storage`] - Key-value storage backends
//! - [`persist`] - Snapshot format and the persisting listener
//! - [`config`] - Environment configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod item;
pub mod persist;
pub mod state;
pub mod storage;
pub mod store;

pub use config::{CartConfig, ConfigError};
pub use item::{CartItem, CartItemError};
pub use persist::{CartPersister, DEFAULT_STORAGE_KEY, PersistError, SnapshotError};
pub use state::{CartState, InvariantViolation};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{AddOutcome, CartEvent, CartListener, CartStore};
