use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;

use super::{failed, project_parent, COMPUTE_DISK, COMPUTE_IMAGE, COMPUTE_SNAPSHOT};
use crate::adapter::{ListableWrapper, SearchableWrapper, Wrapper};
use crate::context::QueryContext;
use crate::error::Result;
use crate::gcp::{paginate, ResourceClient, ResourcePath};
use crate::item::{lookup_str, Item, LinkedItemQuery};
use crate::scope;

/// Images rarely change once created
const IMAGE_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Project images. SEARCH takes an image family and returns its members.
pub struct ComputeImageWrapper {
    client: Arc<dyn ResourceClient>,
    project: String,
}

impl ComputeImageWrapper {
    pub fn new(client: Arc<dyn ResourceClient>, project: &str) -> Self {
        Self {
            client,
            project: project.to_string(),
        }
    }

    fn to_item(&self, raw: Value, scope: &str) -> Result<Item> {
        let mut links = Vec::new();

        // disks live in zonal scopes; the URL carries the zone
        if let Some(path) = lookup_str(&raw, "sourceDisk").and_then(ResourcePath::parse) {
            links.push(LinkedItemQuery::dependency(COMPUTE_DISK, &path.name, path.scope()));
        }
        if let Some(path) = lookup_str(&raw, "sourceImage").and_then(ResourcePath::parse) {
            links.push(LinkedItemQuery::dependency(COMPUTE_IMAGE, &path.name, path.scope()));
        }
        if let Some(path) = lookup_str(&raw, "sourceSnapshot").and_then(ResourcePath::parse) {
            links.push(LinkedItemQuery::dependency(COMPUTE_SNAPSHOT, &path.name, path.scope()));
        }

        Ok(Item::builder(COMPUTE_IMAGE, "name")
            .scope(scope)
            .attributes_from(raw)
            .links(links)
            .build()?)
    }

    fn stream<'a>(
        &'a self,
        ctx: &'a QueryContext,
        scope: &'a str,
        filter: Option<String>,
    ) -> BoxStream<'a, Result<Item>> {
        let project = match project_parent(COMPUTE_IMAGE, scope) {
            Ok(project) => project,
            Err(e) => return failed(e),
        };

        paginate(self.client.as_ref(), ctx, vec![project], filter)
            .map(move |raw| {
                raw.map_err(|e| e.into_discovery(COMPUTE_IMAGE, scope, ""))
                    .and_then(|raw| self.to_item(raw, scope))
            })
            .boxed()
    }
}

/// Server-side filter selecting the members of an image family.
fn family_filter(family: &str) -> String {
    format!("family = \"{}\"", family.replace('"', "\\\""))
}

#[async_trait]
impl Wrapper for ComputeImageWrapper {
    fn item_type(&self) -> &str {
        COMPUTE_IMAGE
    }

    fn scopes(&self) -> Vec<String> {
        vec![scope::project(&self.project)]
    }

    async fn get(&self, ctx: &QueryContext, scope: &str, query: &str) -> Result<Item> {
        let project = project_parent(COMPUTE_IMAGE, scope)?;
        let raw = self
            .client
            .get(ctx, &[&project], query)
            .await
            .map_err(|e| e.into_discovery(COMPUTE_IMAGE, scope, query))?;
        self.to_item(raw, scope)
    }

    fn as_listable(&self) -> Option<&dyn ListableWrapper> {
        Some(self)
    }

    fn as_searchable(&self) -> Option<&dyn SearchableWrapper> {
        Some(self)
    }

    fn default_cache_ttl(&self) -> Option<Duration> {
        Some(IMAGE_CACHE_TTL)
    }

    fn potential_links(&self) -> &[&'static str] {
        &[COMPUTE_DISK, COMPUTE_IMAGE, COMPUTE_SNAPSHOT]
    }
}

impl ListableWrapper for ComputeImageWrapper {
    fn list<'a>(&'a self, ctx: &'a QueryContext, scope: &'a str) -> BoxStream<'a, Result<Item>> {
        self.stream(ctx, scope, None)
    }
}

impl SearchableWrapper for ComputeImageWrapper {
    fn search<'a>(
        &'a self,
        ctx: &'a QueryContext,
        scope: &'a str,
        query: &'a str,
    ) -> BoxStream<'a, Result<Item>> {
        self.stream(ctx, scope, Some(family_filter(query)))
    }
}
