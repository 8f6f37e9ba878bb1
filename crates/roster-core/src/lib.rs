//! Core types and decision logic for the Roster user administration console.
//!
//! This crate has no HTTP or terminal dependencies. The backend is reached
//! through the [`api::UserAdminApi`] port; `roster-cli` supplies the concrete
//! client and the presentation layer.

pub mod api;
pub mod cascade;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod notification;
pub mod policy;
pub mod search;
pub mod session;
pub mod user;

pub use error::{Error, Result};
