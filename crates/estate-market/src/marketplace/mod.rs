//! Marketplace domain: accounts and roles, builder inventory, the
//! announcement approval workflow, promotions, favorites, messaging, and
//! subscription renewal.

pub mod access;
pub mod announcements;
pub mod catalog;
pub mod favorites;
pub mod messaging;
pub mod promotions;
pub mod store;
pub mod subscriptions;
pub mod users;
