//! GCP API interaction module
//!
//! The backend side of the discovery layer: everything wrappers need to
//! read raw resources from Google Cloud, and nothing more.
//!
//! # Module Structure
//!
//! - [`auth`] - token sources (Application Default Credentials or static)
//! - [`client`] - authenticated client and API endpoints
//! - [`http`] - HTTP utilities for REST API calls
//! - [`collection`] - per-collection [`ResourceClient`] abstraction and pagination
//! - [`path`] - parsing resource URLs into linkable parts
//!
//! # Example
//!
//! ```ignore
//! use tgcp_discovery::gcp::{Collection, Endpoints, GcpClient, RestResourceClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new(Endpoints::default()).await?;
//!     let disks = RestResourceClient::new(client, Collection::Disks);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod collection;
mod error;
pub mod http;
pub mod path;

pub use auth::{GcpCredentials, StaticToken, TokenSource};
pub use client::{Api, Endpoints, GcpClient};
pub use collection::{paginate, Collection, Page, ResourceClient, RestResourceClient};
pub use error::ClientError;
pub use path::ResourcePath;
