//! Google Drive document source.
//!
//! Mirrors the PDFs of one Drive folder into the local staging directory
//! using a service-account key.

pub mod auth;
pub mod client;
pub mod credentials;
pub mod source;

pub use auth::TokenSource;
pub use client::{DriveClient, DriveFile};
pub use credentials::ServiceAccountKey;
pub use source::DriveSource;

#[cfg(test)]
mod tests;
