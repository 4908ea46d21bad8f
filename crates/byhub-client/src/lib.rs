//! # byhub-client
//!
//! Typed HTTP client for the byhub catalog server, plus the catalog view
//! model used by front ends.

pub mod client;
pub mod error;
pub mod view;

pub use client::{Download, HubClient, LoginOutcome};
pub use error::ClientError;
pub use view::{decode_listing, CatalogView};
