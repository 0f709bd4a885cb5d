//! tgcp-discovery - uniform discovery over GCP resources
//!
//! Every resource kind is exposed through the same [`Adapter`] surface:
//! GET by unique key, plus LIST and SEARCH where the kind supports them.
//! Results come back as [`Item`]s carrying [`LinkedItemQuery`] edges to
//! related resources, which [`GraphBuilder`] follows to build a
//! dependency graph.
//!
//! # Module Structure
//!
//! - [`item`] - the normalized item model, queries and links
//! - [`key`] - composite lookup keys
//! - [`scope`] - scope strings
//! - [`adapter`] - wrapper traits and the caching adapter over them
//! - [`cache`] - cache strategies shared by adapters
//! - [`registry`] - adapters by item type
//! - [`graph`] - breadth-first link expansion
//! - [`wrappers`] - GCP resource kinds
//! - [`gcp`] - authentication and REST access
//! - [`config`], [`logging`] - ambient setup
//!
//! # Example
//!
//! ```ignore
//! use tgcp_discovery::{config::Config, gcp::GcpClient, wrappers, GraphBuilder, Query, QueryContext};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::load();
//!     let client = GcpClient::new(config.endpoints.clone()).await?;
//!     let registry = wrappers::registry_from_config(&config, &client)?;
//!
//!     let roots = vec![Query::get("gcp-sql-admin-instance", "server1", "my-project")];
//!     let graph = GraphBuilder::new(&registry, config.graph.clone())
//!         .expand(&QueryContext::new(), roots)
//!         .await?;
//!     println!("{} items", graph.len());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod gcp;
pub mod graph;
pub mod item;
pub mod key;
pub mod logging;
pub mod registry;
pub mod scope;
pub mod wrappers;

pub use adapter::{Adapter, Capabilities, ListableWrapper, SearchableWrapper, Wrapper, WrapperToAdapter};
pub use cache::{Cache, CacheKey, Cached, NoOpCache, TtlCache};
pub use context::QueryContext;
pub use error::{DiscoveryError, Result};
pub use graph::{DependencyGraph, GraphBuilder};
pub use item::{BlastPropagation, Coupling, Item, LinkedItemQuery, Query, QueryMethod};
pub use registry::AdapterRegistry;
