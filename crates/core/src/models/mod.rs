//! Documents stored in the remote hierarchical store.
//!
//! Field names on the wire match the existing store (`City_ID`,
//! `Food_Name`, ...); Rust names are snake_case via serde renames.

pub mod address;
pub mod catalog;
pub mod order;
pub mod profile;

pub use address::DeliveryAddress;
pub use catalog::{City, Food, TimeSlot};
pub use order::{
    Order, OrderLineItem, latest_order, line_item_key, orders_for_user, sort_newest_first,
};
pub use profile::{ProfileChanges, UserProfile};
