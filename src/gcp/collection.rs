//! Resource collections and the client abstraction wrappers consume.
//!
//! Wrappers never build URLs or touch HTTP themselves: they hold a
//! [`ResourceClient`] for each collection they read. [`RestResourceClient`]
//! is the REST implementation; tests substitute in-memory fakes.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use super::client::{Api, GcpClient};
use super::error::ClientError;
use crate::context::QueryContext;

/// A REST collection, addressed by its parent identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// `projects/{project}/zones/{zone}/disks`
    Disks,
    /// `projects/{project}/global/images`
    Images,
    /// `projects/{project}/instances` (Cloud SQL)
    SqlInstances,
    /// `projects/{project}/instances/{instance}/databases` (Cloud SQL)
    SqlDatabases,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disks => "disks",
            Self::Images => "images",
            Self::SqlInstances => "sql instances",
            Self::SqlDatabases => "sql databases",
        }
    }

    fn api(&self) -> Api {
        match self {
            Self::Disks | Self::Images => Api::Compute,
            Self::SqlInstances | Self::SqlDatabases => Api::Sql,
        }
    }

    /// Number of parent identifiers the collection path needs
    pub fn parent_count(&self) -> usize {
        match self {
            Self::Images | Self::SqlInstances => 1,
            Self::Disks | Self::SqlDatabases => 2,
        }
    }

    fn segments<'a>(&self, parents: &[&'a str]) -> Result<Vec<&'a str>, ClientError> {
        if parents.len() != self.parent_count() {
            return Err(ClientError::Parents {
                collection: self.name(),
                expected: self.parent_count(),
                found: parents.len(),
            });
        }

        Ok(match self {
            Self::Disks => vec![
                "compute", "v1", "projects", parents[0], "zones", parents[1], "disks",
            ],
            Self::Images => vec!["compute", "v1", "projects", parents[0], "global", "images"],
            Self::SqlInstances => vec!["v1", "projects", parents[0], "instances"],
            Self::SqlDatabases => vec![
                "v1", "projects", parents[0], "instances", parents[1], "databases",
            ],
        })
    }
}

/// One page of a list response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
}

impl Page {
    /// Extract `items` and `nextPageToken` from a list response
    pub fn from_response(response: &Value) -> Self {
        let items = response
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let next_page_token = response
            .get("nextPageToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(String::from);

        Self {
            items,
            next_page_token,
        }
    }
}

/// Backend access for one resource collection.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch one raw resource. A missing resource is `ClientError::NotFound`.
    async fn get(
        &self,
        ctx: &QueryContext,
        parents: &[&str],
        name: &str,
    ) -> Result<Value, ClientError>;

    /// Fetch one page of the collection, optionally filtered server-side.
    async fn list_page(
        &self,
        ctx: &QueryContext,
        parents: &[&str],
        page_token: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Page, ClientError>;
}

/// Lazily walk every page of a collection, yielding raw resources.
///
/// The stream ends after the first error.
pub fn paginate<'a>(
    client: &'a dyn ResourceClient,
    ctx: &'a QueryContext,
    parents: Vec<String>,
    filter: Option<String>,
) -> BoxStream<'a, Result<Value, ClientError>> {
    enum Cursor {
        Start,
        Next(String),
        Done,
    }

    stream::unfold(Cursor::Start, move |cursor| {
        let parents = parents.clone();
        let filter = filter.clone();
        async move {
            let page_token = match cursor {
                Cursor::Done => return None,
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            let parent_refs: Vec<&str> = parents.iter().map(String::as_str).collect();
            let page = client
                .list_page(ctx, &parent_refs, page_token.as_deref(), filter.as_deref())
                .await;

            match page {
                Ok(page) => {
                    let next = page.next_page_token.map_or(Cursor::Done, Cursor::Next);
                    Some((Ok(page.items), next))
                }
                Err(e) => Some((Err(e), Cursor::Done)),
            }
        }
    })
    .flat_map(|page| {
        let results: Vec<Result<Value, ClientError>> = match page {
            Ok(items) => items.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(results)
    })
    .boxed()
}

/// [`ResourceClient`] over the GCP REST APIs.
#[derive(Clone)]
pub struct RestResourceClient {
    client: GcpClient,
    collection: Collection,
}

impl RestResourceClient {
    pub fn new(client: GcpClient, collection: Collection) -> Self {
        Self { client, collection }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }
}

#[async_trait]
impl ResourceClient for RestResourceClient {
    async fn get(
        &self,
        ctx: &QueryContext,
        parents: &[&str],
        name: &str,
    ) -> Result<Value, ClientError> {
        let mut segments = self.collection.segments(parents)?;
        segments.push(name);
        let url = self.client.url(self.collection.api(), &segments, &[])?;

        tracing::debug!(query_id = %ctx.id(), "get {} {}", self.collection.name(), name);
        self.client.get(url).await
    }

    async fn list_page(
        &self,
        ctx: &QueryContext,
        parents: &[&str],
        page_token: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Page, ClientError> {
        let segments = self.collection.segments(parents)?;

        let mut query = Vec::new();
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        if let Some(filter) = filter {
            query.push(("filter", filter));
        }
        let url = self.client.url(self.collection.api(), &segments, &query)?;

        tracing::debug!(
            query_id = %ctx.id(),
            "list {} page {}",
            self.collection.name(),
            page_token.unwrap_or("<first>")
        );
        let response = self.client.get(url).await?;
        Ok(Page::from_response(&response))
    }
}
