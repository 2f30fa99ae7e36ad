//! Resolver - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates all aspects of a
//! resolution run:
//! - Loading the prior snapshot and revalidating unchanged resources
//! - Managing the frontier queue with enqueue-time deduplication
//! - Keeping a bounded set of fetch-and-sanitize tasks in flight
//! - Recording terminal nodes into the new document graph
//! - Emitting results in aggregate or incremental mode
//!
//! Tasks never touch shared state: they fetch and sanitize, then report a
//! message. The graph, frontier and discovered set are owned by the single
//! coordinating loop, so every write happens at a task-completion point.

use crate::cache::GraphStore;
use crate::fetch::{conditional_headers, Method, Transport, TransportError};
use crate::graph::{DocumentGraph, GraphNode, NodeOutcome, OutboundLink, TraversalOrder, Validators};
use crate::sanitize::{sanitize, sniff_kind, Sanitized};
use crate::WeftError;
use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use url::Url;

/// Default number of BFS layers fetched, root counted as layer 0
pub const DEFAULT_MAX_DEPTH: u32 = 2;

/// Default bound on concurrently in-flight resource fetches
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Crawl behavior configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Number of BFS layers to fetch; a resource assigned a depth at or
    /// beyond this is never fetched
    pub max_depth: u32,

    /// Maximum number of in-flight fetch-and-sanitize tasks
    pub concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Output of an aggregate-mode resolution
#[derive(Debug)]
pub struct Resolved {
    /// Flattened text of the crawl, in BFS order from the root
    pub content: String,

    /// The finished document graph
    pub graph: DocumentGraph,
}

/// Crawl orchestrator over a transport and a snapshot store
pub struct Resolver<T, S> {
    transport: Arc<T>,
    store: Arc<S>,
    config: ResolverConfig,
}

impl<T, S> Resolver<T, S>
where
    T: Transport + 'static,
    S: GraphStore + 'static,
{
    pub fn new(transport: T, store: S, config: ResolverConfig) -> Self {
        Self::shared(Arc::new(transport), Arc::new(store), config)
    }

    /// Builds a resolver over already-shared collaborators
    pub fn shared(transport: Arc<T>, store: Arc<S>, config: ResolverConfig) -> Self {
        Self {
            transport,
            store,
            config,
        }
    }

    /// Resolves a root resource in aggregate mode
    ///
    /// Drains the crawl fully, persists the new snapshot, and returns the
    /// flattened text together with the finished graph. Fails only when the
    /// root itself cannot be fetched; every other failure is absorbed into
    /// graph state.
    pub async fn resolve(&self, root_url: &str) -> crate::Result<Resolved> {
        let graph = drive(
            Arc::clone(&self.transport),
            Arc::clone(&self.store),
            self.config.clone(),
            root_url,
            None,
        )
        .await?;

        let content = graph.flatten(TraversalOrder::BreadthFirst);
        Ok(Resolved { content, graph })
    }

    /// Resolves a root resource in incremental mode
    ///
    /// Returns a single-consumption sequence of completed/error nodes in
    /// completion order. Dropping the stream early cancels the crawl: no
    /// further work is scheduled, in-flight fetches are abandoned, and the
    /// snapshot is not persisted. A stream pulled to exhaustion persists the
    /// snapshot exactly like aggregate mode.
    pub fn resolve_stream(&self, root_url: &str) -> NodeStream {
        let (sender, receiver) = mpsc::channel(1);
        let transport = Arc::clone(&self.transport);
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let root_url = root_url.to_string();

        tokio::spawn(async move {
            let events = sender.clone();
            match drive(transport, store, config, &root_url, Some(events)).await {
                Ok(graph) => {
                    tracing::debug!(
                        "streamed crawl of {} completed with {} nodes",
                        root_url,
                        graph.len()
                    );
                }
                Err(WeftError::Cancelled) => {
                    tracing::debug!("streamed crawl of {} cancelled by consumer", root_url);
                }
                Err(error) => {
                    let _ = sender.send(Err(error)).await;
                }
            }
        });

        NodeStream { receiver }
    }
}

/// Lazily-pulled sequence of resolved nodes
///
/// Items arrive in completion order, not discovery order. Dropping the
/// stream signals cancellation to the producing crawl.
pub struct NodeStream {
    receiver: mpsc::Receiver<crate::Result<GraphNode>>,
}

impl NodeStream {
    /// Pulls the next resolved node, or `None` once the crawl is drained
    pub async fn next_node(&mut self) -> Option<crate::Result<GraphNode>> {
        self.receiver.recv().await
    }
}

impl futures::Stream for NodeStream {
    type Item = crate::Result<GraphNode>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

/// Message a fetch-and-sanitize task reports back to the loop
enum TaskOutput {
    /// A completed node: freshly fetched, or reused verbatim from the prior
    /// snapshot. `scheduled_depth` is the depth the resource was processed
    /// at, which for reused nodes may differ from `node.depth`.
    Done {
        node: GraphNode,
        scheduled_depth: u32,
    },

    /// Transport failure for the resource
    Failed {
        id: String,
        depth: u32,
        error: TransportError,
    },
}

/// Runs the crawl loop shared by both output modes
///
/// When `events` is present, every terminal node is also pushed to the
/// consumer; a failed push means the consumer hung up, which aborts the
/// crawl without persisting.
async fn drive<T, S>(
    transport: Arc<T>,
    store: Arc<S>,
    config: ResolverConfig,
    root_url: &str,
    events: Option<mpsc::Sender<crate::Result<GraphNode>>>,
) -> crate::Result<DocumentGraph>
where
    T: Transport + 'static,
    S: GraphStore + 'static,
{
    let root = Url::parse(root_url).map_err(|source| WeftError::InvalidRootUrl {
        url: root_url.to_string(),
        source,
    })?;
    let root_id = root.to_string();

    let prior = store.load(&root_id).await;
    if let Some(prior) = &prior {
        tracing::debug!(
            "loaded prior snapshot for {} with {} nodes",
            root_id,
            prior.len()
        );
    }

    let mut graph = DocumentGraph::new(root_id.clone());
    let mut discovered: HashSet<String> = HashSet::new();
    let mut frontier: VecDeque<(String, u32)> = VecDeque::new();
    let mut in_flight: JoinSet<TaskOutput> = JoinSet::new();

    if config.max_depth > 0 {
        discovered.insert(root_id.clone());
        frontier.push_back((root_id.clone(), 0));
    } else {
        tracing::warn!("max_depth is 0; nothing will be fetched");
    }

    loop {
        // Keep the in-flight set full while the frontier has work.
        while in_flight.len() < config.concurrency.max(1) {
            let Some((id, depth)) = frontier.pop_front() else {
                break;
            };
            let cached = prior.as_ref().and_then(|g| g.get(&id)).cloned();
            in_flight.spawn(process_resource(Arc::clone(&transport), id, depth, cached));
        }

        // Frontier drained and nothing in flight: the crawl is complete.
        let Some(joined) = in_flight.join_next().await else {
            break;
        };
        let output = match joined {
            Ok(output) => output,
            Err(error) if error.is_cancelled() => continue,
            Err(error) => return Err(WeftError::Worker(error.to_string())),
        };

        let (node, scheduled_depth) = match output {
            TaskOutput::Failed {
                id,
                depth: 0,
                error,
            } => {
                // The crawl never produces partial results when the root
                // itself is unreachable.
                in_flight.abort_all();
                return Err(WeftError::Root {
                    url: id,
                    source: error,
                });
            }
            TaskOutput::Failed { id, depth, error } => {
                tracing::warn!("fetch failed for {}: {}", id, error);
                let message = error.to_string();
                (GraphNode::failed(id, depth, message), depth)
            }
            TaskOutput::Done {
                node,
                scheduled_depth,
            } => (node, scheduled_depth),
        };

        // Expand the frontier; first discovery wins and depth-excluded
        // targets stay undiscovered so a shallower path may still reach them.
        let next_depth = scheduled_depth + 1;
        if next_depth < config.max_depth {
            for target in node.link_targets() {
                if !discovered.contains(target) {
                    discovered.insert(target.to_string());
                    frontier.push_back((target.to_string(), next_depth));
                }
            }
        }

        if let Some(sender) = &events {
            let update = node.clone();
            graph.put(node);
            if sender.send(Ok(update)).await.is_err() {
                // Consumer hung up: abandon in-flight work, skip persistence.
                in_flight.abort_all();
                return Err(WeftError::Cancelled);
            }
        } else {
            graph.put(node);
        }
    }

    // A cache-write failure never invalidates the crawl itself.
    if let Err(error) = store.save(&root_id, &graph).await {
        tracing::warn!("failed to persist snapshot for {}: {}", root_id, error);
    }

    Ok(graph)
}

/// Processes one resource end-to-end: revalidate or fetch, then sanitize
async fn process_resource<T>(
    transport: Arc<T>,
    id: String,
    depth: u32,
    cached: Option<GraphNode>,
) -> TaskOutput
where
    T: Transport + 'static,
{
    // Revalidate against the prior crawl when validators are available.
    if let Some(prior) = cached {
        if let Some(validators) = &prior.validators {
            tracing::debug!("revalidating {}", id);
            let headers = conditional_headers(validators);
            match transport.fetch(&id, Method::Head, &headers).await {
                Ok(response) if response.is_not_modified() => {
                    tracing::debug!("{} unchanged, reusing cached node", id);
                    // Copied verbatim, original depth included.
                    return TaskOutput::Done {
                        node: prior,
                        scheduled_depth: depth,
                    };
                }
                Ok(_) => {}
                Err(error) => return TaskOutput::Failed { id, depth, error },
            }
        }
    }

    let response = match transport.fetch(&id, Method::Get, &[]).await {
        Ok(response) => response,
        Err(error) => return TaskOutput::Failed { id, depth, error },
    };

    let validators = response.validators();
    let raw_body = response.body.unwrap_or_default();

    TaskOutput::Done {
        node: build_completed_node(&id, depth, raw_body, validators),
        scheduled_depth: depth,
    }
}

/// Builds the completed node for a freshly fetched body
fn build_completed_node(
    id: &str,
    depth: u32,
    raw_body: String,
    validators: Option<Validators>,
) -> GraphNode {
    let kind = sniff_kind(&raw_body);

    let sanitized = match Url::parse(id) {
        Ok(base) => sanitize(&raw_body, &base, kind),
        // Unreachable in practice: ids are canonical absolute URLs.
        Err(_) => Sanitized::default(),
    };

    let content_digest = hex::encode(Sha256::digest(raw_body.as_bytes()));

    GraphNode {
        id: id.to_string(),
        title: sanitized.title,
        outcome: NodeOutcome::Completed,
        depth,
        content_kind: Some(kind),
        error_message: None,
        raw_body: Some(raw_body),
        clean_text: Some(sanitized.clean_text),
        outbound_links: sanitized.links.into_iter().map(OutboundLink::to).collect(),
        validators,
        content_digest: Some(content_digest),
    }
}
