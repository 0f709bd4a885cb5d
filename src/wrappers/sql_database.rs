use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use super::{failed, project_parent, SQL_DATABASE, SQL_INSTANCE};
use crate::adapter::{SearchableWrapper, Wrapper};
use crate::context::QueryContext;
use crate::error::Result;
use crate::gcp::{paginate, ResourceClient};
use crate::item::{lookup_str, Item, LinkedItemQuery};
use crate::key;
use crate::scope;

/// Attribute holding the `instance|database` composite key
pub const UNIQUE_ATTRIBUTE: &str = "uniqueAttr";

/// Cloud SQL databases. GET takes `instance|database`; SEARCH takes an
/// instance name and returns its databases. There is no project-wide list.
pub struct SqlDatabaseWrapper {
    client: Arc<dyn ResourceClient>,
    project: String,
}

impl SqlDatabaseWrapper {
    pub fn new(client: Arc<dyn ResourceClient>, project: &str) -> Self {
        Self {
            client,
            project: project.to_string(),
        }
    }

    fn to_item(&self, raw: Value, scope: &str) -> Result<Item> {
        let instance = lookup_str(&raw, "instance").unwrap_or_default().to_string();
        let name = lookup_str(&raw, "name").unwrap_or_default().to_string();
        let unique = key::compose(&[&instance, &name])?;

        Ok(Item::builder(SQL_DATABASE, UNIQUE_ATTRIBUTE)
            .scope(scope)
            .attributes_from(raw)
            .attribute(UNIQUE_ATTRIBUTE, unique)
            .link(LinkedItemQuery::dependency(SQL_INSTANCE, instance, scope))
            .build()?)
    }
}

#[async_trait]
impl Wrapper for SqlDatabaseWrapper {
    fn item_type(&self) -> &str {
        SQL_DATABASE
    }

    fn scopes(&self) -> Vec<String> {
        vec![scope::project(&self.project)]
    }

    async fn get(&self, ctx: &QueryContext, scope: &str, query: &str) -> Result<Item> {
        let project = project_parent(SQL_DATABASE, scope)?;
        let (instance, database) = key::decompose_pair(query)?;
        let raw = self
            .client
            .get(ctx, &[&project, &instance], &database)
            .await
            .map_err(|e| e.into_discovery(SQL_DATABASE, scope, query))?;
        self.to_item(raw, scope)
    }

    fn as_searchable(&self) -> Option<&dyn SearchableWrapper> {
        Some(self)
    }

    fn potential_links(&self) -> &[&'static str] {
        &[SQL_INSTANCE]
    }
}

impl SearchableWrapper for SqlDatabaseWrapper {
    fn search<'a>(
        &'a self,
        ctx: &'a QueryContext,
        scope: &'a str,
        query: &'a str,
    ) -> BoxStream<'a, Result<Item>> {
        let project = match project_parent(SQL_DATABASE, scope) {
            Ok(project) => project,
            Err(e) => return failed(e),
        };
        // not an instance name, so nothing can match
        if query.is_empty() || query.contains(key::SEPARATOR) {
            return stream::empty().boxed();
        }

        paginate(self.client.as_ref(), ctx, vec![project, query.to_string()], None)
            .map(move |raw| {
                raw.map_err(|e| e.into_discovery(SQL_DATABASE, scope, query))
                    .and_then(|raw| self.to_item(raw, scope))
            })
            .boxed()
    }
}
