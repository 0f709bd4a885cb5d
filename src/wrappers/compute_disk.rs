use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;

use super::{failed, zonal_parents, COMPUTE_DISK, COMPUTE_IMAGE, COMPUTE_INSTANCE, COMPUTE_SNAPSHOT};
use crate::adapter::{ListableWrapper, Wrapper};
use crate::context::QueryContext;
use crate::error::Result;
use crate::gcp::{paginate, ResourceClient, ResourcePath};
use crate::item::{lookup_path, lookup_str, Item, LinkedItemQuery};
use crate::scope;

/// Zonal persistent disks, one scope per configured zone.
pub struct ComputeDiskWrapper {
    client: Arc<dyn ResourceClient>,
    project: String,
    zones: Vec<String>,
}

impl ComputeDiskWrapper {
    pub fn new(client: Arc<dyn ResourceClient>, project: &str, zones: Vec<String>) -> Self {
        Self {
            client,
            project: project.to_string(),
            zones,
        }
    }

    fn to_item(&self, raw: Value, scope: &str) -> Result<Item> {
        let mut links = Vec::new();

        if let Some(path) = lookup_str(&raw, "sourceImage").and_then(ResourcePath::parse) {
            links.push(LinkedItemQuery::dependency(COMPUTE_IMAGE, &path.name, path.scope()));
        }
        if let Some(path) = lookup_str(&raw, "sourceSnapshot").and_then(ResourcePath::parse) {
            links.push(LinkedItemQuery::dependency(COMPUTE_SNAPSHOT, &path.name, path.scope()));
        }

        // instances the disk is attached to
        let users = lookup_path(&raw, "users").and_then(Value::as_array);
        for user in users.into_iter().flatten().filter_map(Value::as_str) {
            if let Some(path) = ResourcePath::parse(user) {
                links.push(LinkedItemQuery::dependent(COMPUTE_INSTANCE, &path.name, path.scope()));
            }
        }

        Ok(Item::builder(COMPUTE_DISK, "name")
            .scope(scope)
            .attributes_from(raw)
            .links(links)
            .build()?)
    }
}

#[async_trait]
impl Wrapper for ComputeDiskWrapper {
    fn item_type(&self) -> &str {
        COMPUTE_DISK
    }

    fn scopes(&self) -> Vec<String> {
        self.zones
            .iter()
            .map(|zone| scope::zonal(&self.project, zone))
            .collect()
    }

    async fn get(&self, ctx: &QueryContext, scope: &str, query: &str) -> Result<Item> {
        let (project, zone) = zonal_parents(COMPUTE_DISK, scope)?;
        let raw = self
            .client
            .get(ctx, &[&project, &zone], query)
            .await
            .map_err(|e| e.into_discovery(COMPUTE_DISK, scope, query))?;
        self.to_item(raw, scope)
    }

    fn as_listable(&self) -> Option<&dyn ListableWrapper> {
        Some(self)
    }

    fn potential_links(&self) -> &[&'static str] {
        &[COMPUTE_IMAGE, COMPUTE_SNAPSHOT, COMPUTE_INSTANCE]
    }
}

impl ListableWrapper for ComputeDiskWrapper {
    fn list<'a>(&'a self, ctx: &'a QueryContext, scope: &'a str) -> BoxStream<'a, Result<Item>> {
        let (project, zone) = match zonal_parents(COMPUTE_DISK, scope) {
            Ok(parents) => parents,
            Err(e) => return failed(e),
        };

        paginate(self.client.as_ref(), ctx, vec![project, zone], None)
            .map(move |raw| {
                raw.map_err(|e| e.into_discovery(COMPUTE_DISK, scope, ""))
                    .and_then(|raw| self.to_item(raw, scope))
            })
            .boxed()
    }
}
