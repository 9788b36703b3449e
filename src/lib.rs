// src/lib.rs

//! Depot
//!
//! Tracks parcels held at a depot and the recipients waiting to collect
//! them. State lives in flat comma-separated files plus an append-only
//! event log, kept mutually consistent without any transactional support
//! from the file system.
//!
//! # Architecture
//!
//! - Flat files: inventory, recipient queue, released-items ledger, event log
//! - Whole-file rewrites go through a sibling temp file and an atomic rename
//! - The ledger append is the commit point of a collection
//! - Exact decimal charges, rounded only for display
//! - Every operation returns a typed outcome and leaves one audit line

pub mod charge;
pub mod codec;
pub mod config;
pub mod depot;
mod error;
pub mod events;
pub mod index;
pub mod models;
pub mod queue;
pub mod store;

pub use config::DepotPaths;
pub use depot::{CollectionReceipt, Depot, LoadReport};
pub use error::{Error, Result};
