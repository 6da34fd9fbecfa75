//! Core business logic - framework-agnostic catalog, cart, checkout and order operations.
//!
//! Every operation takes the store handle explicitly; nothing here holds global state.

/// Cart contents per user
pub mod cart;
/// Catalog join and cart view
pub mod catalog;
/// Atomic cart-to-order conversion
pub mod checkout;
/// Cover image upload
pub mod cover;
/// Order ledger queries and status changes
pub mod order;
/// Plan catalog administration
pub mod plan;
/// Per-day exercise programs
pub mod program;
/// User profiles and roles
pub mod user;
