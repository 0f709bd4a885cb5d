//! Dependency graph expansion
//!
//! Starting from root queries, follow the linked item queries each item
//! carries, level by level, until `max_depth` is reached or nothing new
//! turns up. The result is a [`DependencyGraph`]: the items found, the
//! directed edges between them (with their blast flags) and the linked
//! queries that could not be resolved.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use futures::stream::{self, StreamExt};

use crate::config::{GraphConfig, LinkFollow};
use crate::context::QueryContext;
use crate::error::{DiscoveryError, Result};
use crate::item::{BlastPropagation, Item, LinkedItemQuery, Query};
use crate::registry::AdapterRegistry;

/// A link from one discovered item to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub blast_propagation: BlastPropagation,
}

/// A query that failed or has no adapter.
#[derive(Debug)]
pub struct Unresolved {
    pub query: Query,
    /// Items whose links produced the query; empty for roots
    pub sources: Vec<String>,
    pub error: DiscoveryError,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    items: BTreeMap<String, Item>,
    edges: Vec<Edge>,
    unresolved: Vec<Unresolved>,
}

impl DependencyGraph {
    /// Items keyed by global unique name
    pub fn items(&self) -> &BTreeMap<String, Item> {
        &self.items
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_from<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.from == name)
    }

    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Every item a change to `name` can reach: forward across outbound
    /// edges, backward across inbound ones.
    pub fn blast_radius(&self, name: &str) -> BTreeSet<String> {
        let mut affected = BTreeSet::new();
        let mut queue = VecDeque::from([name.to_string()]);

        while let Some(current) = queue.pop_front() {
            for edge in &self.edges {
                let next = if edge.from == current && edge.blast_propagation.outbound {
                    &edge.to
                } else if edge.to == current && edge.blast_propagation.inbound {
                    &edge.from
                } else {
                    continue;
                };

                if next != name && affected.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }

        affected
    }

    fn add_edge(&mut self, from: &str, to: &str, blast_propagation: BlastPropagation) {
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            blast_propagation,
        });
    }

    fn finish(&mut self) {
        self.edges.sort_by(|a, b| edge_order(a).cmp(&edge_order(b)));
        self.edges.dedup();
    }
}

fn edge_order(edge: &Edge) -> (&str, &str, bool, bool) {
    (
        edge.from.as_str(),
        edge.to.as_str(),
        edge.blast_propagation.inbound,
        edge.blast_propagation.outbound,
    )
}

/// The item that linked to a pending query, and how.
#[derive(Debug, Clone)]
struct Source {
    name: String,
    blast_propagation: BlastPropagation,
}

pub struct GraphBuilder<'r> {
    registry: &'r AdapterRegistry,
    config: GraphConfig,
    ignore_cache: bool,
}

impl<'r> GraphBuilder<'r> {
    pub fn new(registry: &'r AdapterRegistry, config: GraphConfig) -> Self {
        Self {
            registry,
            config,
            ignore_cache: false,
        }
    }

    /// Bypass adapter caches for every query this builder runs.
    pub fn ignore_cache(mut self, ignore_cache: bool) -> Self {
        self.ignore_cache = ignore_cache;
        self
    }

    /// Expand `roots` breadth-first. Cancellation aborts the expansion;
    /// any other failure is recorded as [`Unresolved`].
    pub async fn expand(&self, ctx: &QueryContext, roots: Vec<Query>) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::default();
        // query -> names of the items it produced
        let mut resolved: HashMap<Query, Vec<String>> = HashMap::new();
        let mut failed: HashSet<Query> = HashSet::new();
        let mut pending: BTreeMap<Query, Vec<Source>> =
            roots.into_iter().map(|q| (q, Vec::new())).collect();
        let mut depth = 0;

        while !pending.is_empty() {
            ctx.check()?;

            let mut level = Vec::new();
            for (query, sources) in std::mem::take(&mut pending) {
                if let Some(names) = resolved.get(&query) {
                    for source in &sources {
                        for name in names {
                            graph.add_edge(&source.name, name, source.blast_propagation);
                        }
                    }
                } else if failed.contains(&query) {
                    if let Some(entry) = graph.unresolved.iter_mut().find(|u| u.query == query) {
                        entry.sources.extend(sources.into_iter().map(|s| s.name));
                    }
                } else {
                    level.push((query, sources));
                }
            }

            tracing::debug!(query_id = %ctx.id(), "Graph level {}: {} queries", depth, level.len());

            let results: Vec<_> = stream::iter(level)
                .map(|(query, sources)| async move {
                    let result = self.registry.execute(ctx, &query, self.ignore_cache).await;
                    (query, sources, result)
                })
                .buffer_unordered(self.config.concurrency.max(1))
                .collect()
                .await;

            for (query, sources, result) in results {
                let items = match result {
                    Ok(items) => items,
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => {
                        tracing::warn!("Unresolved {}: {}", query, e);
                        failed.insert(query.clone());
                        graph.unresolved.push(Unresolved {
                            query,
                            sources: sources.into_iter().map(|s| s.name).collect(),
                            error: e,
                        });
                        continue;
                    }
                };

                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    let name = item.global_unique_name();
                    for source in &sources {
                        graph.add_edge(&source.name, &name, source.blast_propagation);
                    }
                    names.push(name.clone());

                    if graph.items.contains_key(&name) {
                        continue;
                    }
                    if depth < self.config.max_depth {
                        for link in item.linked_item_queries() {
                            if self.should_follow(link) {
                                pending.entry(link.query.clone()).or_default().push(Source {
                                    name: name.clone(),
                                    blast_propagation: link.blast_propagation,
                                });
                            }
                        }
                    }
                    graph.items.insert(name, item);
                }
                resolved.insert(query, names);
            }

            depth += 1;
        }

        graph.finish();
        Ok(graph)
    }

    fn should_follow(&self, link: &LinkedItemQuery) -> bool {
        match self.config.follow {
            LinkFollow::All => true,
            LinkFollow::BlastRadius => link.blast_propagation.outbound,
        }
    }
}
