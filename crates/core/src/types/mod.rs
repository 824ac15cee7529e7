//! Core value types for TuckBox.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credentials;
pub mod id;
pub mod money;
pub mod timestamp;

pub use credentials::{CredentialError, Email, Password};
pub use id::*;
pub use money::{Money, NegativeAmount};
pub use timestamp::{BusinessZone, ORDER_TIMESTAMP_FORMAT, OrderTimestamp};
