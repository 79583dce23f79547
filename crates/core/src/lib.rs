//! Marketplace Core - Shared types library.
//!
//! This crate provides common types used across all marketplace components:
//! - `cart` - Single-retailer cart store and its persistence
//! - `cli` - Command-line composition root for the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for catalog IDs, prices, and fulfillment modes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
