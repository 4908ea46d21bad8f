//! # byhub-shared
//!
//! Types shared by the ByHub store, server and client: the package record
//! model, metadata validation and the signed session tokens used to
//! authorize catalog mutations.

pub mod constants;
pub mod error;
pub mod session;
pub mod types;

pub use error::{SessionError, ValidationError};
pub use session::{SessionClaims, SessionIssuer};
pub use types::*;
