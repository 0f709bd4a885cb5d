//! GCP wrappers
//!
//! One wrapper per resource kind. Each turns raw REST resources into
//! [`Item`]s and decides which linked item queries they carry:
//!
//! - [`ComputeDiskWrapper`] - zonal persistent disks
//! - [`ComputeImageWrapper`] - project images, searchable by family
//! - [`SqlInstanceWrapper`] - Cloud SQL instances
//! - [`SqlDatabaseWrapper`] - Cloud SQL databases, addressed by a composite key

mod compute_disk;
mod compute_image;
mod sql_database;
mod sql_instance;

pub use compute_disk::ComputeDiskWrapper;
pub use compute_image::ComputeImageWrapper;
pub use sql_database::SqlDatabaseWrapper;
pub use sql_instance::SqlInstanceWrapper;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::stream::{self, BoxStream, StreamExt};

use crate::adapter::WrapperToAdapter;
use crate::cache::{self, Cache};
use crate::config::Config;
use crate::error::{DiscoveryError, Result};
use crate::gcp::{Collection, GcpClient, ResourceClient, RestResourceClient};
use crate::item::Item;
use crate::registry::AdapterRegistry;
use crate::scope;

pub const COMPUTE_DISK: &str = "gcp-compute-disk";
pub const COMPUTE_IMAGE: &str = "gcp-compute-image";
pub const SQL_INSTANCE: &str = "gcp-sql-admin-instance";
pub const SQL_DATABASE: &str = "gcp-sql-admin-database";

// Linked kinds without a wrapper in this crate
pub const COMPUTE_SNAPSHOT: &str = "gcp-compute-snapshot";
pub const COMPUTE_INSTANCE: &str = "gcp-compute-instance";
pub const COMPUTE_NETWORK: &str = "gcp-compute-network";
pub const SQL_SSL_CERT: &str = "gcp-sql-admin-ssl-cert";
pub const DNS: &str = "dns";
pub const IP: &str = "ip";

/// Register adapters for every GCP kind in this module.
pub fn register_gcp_adapters(
    registry: &mut AdapterRegistry,
    client: &GcpClient,
    project: &str,
    zones: &[String],
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
) -> Result<()> {
    let rest = |collection| -> Arc<dyn ResourceClient> {
        Arc::new(RestResourceClient::new(client.clone(), collection))
    };

    let disks = ComputeDiskWrapper::new(rest(Collection::Disks), project, zones.to_vec());
    let images = ComputeImageWrapper::new(rest(Collection::Images), project);
    let instances = SqlInstanceWrapper::new(rest(Collection::SqlInstances), project);
    let databases = SqlDatabaseWrapper::new(rest(Collection::SqlDatabases), project);

    registry.register(Arc::new(
        WrapperToAdapter::new(disks, cache.clone()).with_cache_ttl(cache_ttl),
    ))?;
    registry.register(Arc::new(
        WrapperToAdapter::new(images, cache.clone()).with_cache_ttl(cache_ttl),
    ))?;
    registry.register(Arc::new(
        WrapperToAdapter::new(instances, cache.clone()).with_cache_ttl(cache_ttl),
    ))?;
    registry.register(Arc::new(
        WrapperToAdapter::new(databases, cache).with_cache_ttl(cache_ttl),
    ))?;

    tracing::info!("Registered {} GCP adapters for project {}", registry.len(), project);
    Ok(())
}

/// Build a registry serving the configured project and zones, with the
/// configured cache strategy shared by every adapter.
pub fn registry_from_config(config: &Config, client: &GcpClient) -> anyhow::Result<AdapterRegistry> {
    let project = config
        .effective_project()
        .context("No GCP project configured. Set project_id or GOOGLE_CLOUD_PROJECT")?;
    let zones = config.effective_zones();

    let mut registry = AdapterRegistry::new();
    register_gcp_adapters(
        &mut registry,
        client,
        &project,
        &zones,
        cache::from_config(&config.cache),
        config.cache.default_ttl(),
    )?;
    Ok(registry)
}

/// Project id of a project-level scope.
fn project_parent(item_type: &str, scope: &str) -> Result<String> {
    match scope::split(scope) {
        (project, None) if !project.is_empty() => Ok(project.to_string()),
        _ => Err(DiscoveryError::no_scope(item_type, scope)),
    }
}

/// Project id and zone of a zonal scope.
fn zonal_parents(item_type: &str, scope: &str) -> Result<(String, String)> {
    match scope::split(scope) {
        (project, Some(zone)) if !project.is_empty() && !zone.is_empty() => {
            Ok((project.to_string(), zone.to_string()))
        }
        _ => Err(DiscoveryError::no_scope(item_type, scope)),
    }
}

/// A stream that yields a single error.
fn failed<'a>(error: DiscoveryError) -> BoxStream<'a, Result<Item>> {
    stream::once(async move { Err(error) }).boxed()
}
