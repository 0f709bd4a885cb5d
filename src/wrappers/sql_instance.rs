use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;

use super::{
    failed, project_parent, COMPUTE_NETWORK, DNS, IP, SQL_DATABASE, SQL_INSTANCE, SQL_SSL_CERT,
};
use crate::adapter::{ListableWrapper, Wrapper};
use crate::context::QueryContext;
use crate::error::Result;
use crate::gcp::{paginate, ResourceClient, ResourcePath};
use crate::item::{lookup_path, lookup_str, Coupling, Item, LinkedItemQuery};
use crate::scope;

pub struct SqlInstanceWrapper {
    client: Arc<dyn ResourceClient>,
    project: String,
}

impl SqlInstanceWrapper {
    pub fn new(client: Arc<dyn ResourceClient>, project: &str) -> Self {
        Self {
            client,
            project: project.to_string(),
        }
    }

    fn to_item(&self, raw: Value, scope: &str) -> Result<Item> {
        let mut links = Vec::new();

        if let Some(name) = lookup_str(&raw, "name") {
            links.push(LinkedItemQuery::child(SQL_DATABASE, name, scope, Coupling::Dependent));
            links.push(LinkedItemQuery::child(SQL_SSL_CERT, name, scope, Coupling::Tight));
        }

        if let Some(path) = lookup_str(&raw, "settings.ipConfiguration.privateNetwork")
            .and_then(ResourcePath::parse)
        {
            links.push(LinkedItemQuery::dependency(COMPUTE_NETWORK, &path.name, path.scope()));
        }

        if let Some(dns_name) = lookup_str(&raw, "dnsName") {
            links.push(LinkedItemQuery::coupled(DNS, dns_name, scope::GLOBAL));
        }

        let addresses = lookup_path(&raw, "ipAddresses").and_then(Value::as_array);
        for address in addresses.into_iter().flatten() {
            if let Some(ip) = lookup_str(address, "ipAddress") {
                links.push(LinkedItemQuery::coupled(IP, ip, scope::GLOBAL));
            }
        }

        Ok(Item::builder(SQL_INSTANCE, "name")
            .scope(scope)
            .attributes_from(raw)
            .links(links)
            .build()?)
    }
}

#[async_trait]
impl Wrapper for SqlInstanceWrapper {
    fn item_type(&self) -> &str {
        SQL_INSTANCE
    }

    fn scopes(&self) -> Vec<String> {
        vec![scope::project(&self.project)]
    }

    async fn get(&self, ctx: &QueryContext, scope: &str, query: &str) -> Result<Item> {
        let project = project_parent(SQL_INSTANCE, scope)?;
        let raw = self
            .client
            .get(ctx, &[&project], query)
            .await
            .map_err(|e| e.into_discovery(SQL_INSTANCE, scope, query))?;
        self.to_item(raw, scope)
    }

    fn as_listable(&self) -> Option<&dyn ListableWrapper> {
        Some(self)
    }

    fn potential_links(&self) -> &[&'static str] {
        &[SQL_DATABASE, SQL_SSL_CERT, COMPUTE_NETWORK, DNS, IP]
    }
}

impl ListableWrapper for SqlInstanceWrapper {
    fn list<'a>(&'a self, ctx: &'a QueryContext, scope: &'a str) -> BoxStream<'a, Result<Item>> {
        let project = match project_parent(SQL_INSTANCE, scope) {
            Ok(project) => project,
            Err(e) => return failed(e),
        };

        paginate(self.client.as_ref(), ctx, vec![project], None)
            .map(move |raw| {
                raw.map_err(|e| e.into_discovery(SQL_INSTANCE, scope, ""))
                    .and_then(|raw| self.to_item(raw, scope))
            })
            .boxed()
    }
}
