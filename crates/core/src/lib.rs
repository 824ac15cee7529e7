//! TuckBox Core - Shared domain types.
//!
//! This crate provides the types used by the TuckBox ordering client:
//! - `tuckbox-client` - session management and the remote store gateway
//! - `tuckbox-cli` - command-line front-end
//!
//! # Architecture
//!
//! The core crate contains only types, validation and pure business rules:
//! no I/O, no HTTP clients, no clock reads. Anything time-dependent takes
//! "now" as an argument so it can be tested deterministically.
//!
//! # Modules
//!
//! - [`types`] - IDs, credentials, money and business-local timestamps
//! - [`models`] - Reference data, addresses, orders and profiles
//! - [`policy`] - The order cutoff rule

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod policy;
pub mod types;

pub use models::*;
pub use policy::CutoffPolicy;
pub use types::*;
