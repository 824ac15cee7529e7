//! User-facing flows built on the session manager and the gateway.
//!
//! These hold the business rules the gateway deliberately does not: the
//! order cutoff, required selections, and which failures degrade quietly.

pub mod history;
pub mod ordering;
pub mod profile;

pub use history::{current_order, order_history};
pub use ordering::{
    OrderError, OrderForm, OrderMenu, OrderPlacement, Selection, add_address, load_order_menu,
};
pub use profile::{
    LocalMirror, MirrorError, ProfileError, Registration, load_profile, register, update_profile,
};
