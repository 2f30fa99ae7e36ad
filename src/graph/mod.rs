//! Document graph data model
//!
//! This module holds the in-memory record of a single crawl: a root resource
//! identifier and one node per visited resource. The graph is pure data plus
//! traversal queries; the crawl orchestrator populates it and the cache
//! adapters round-trip it through JSON.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Terminal outcome of processing a resource
///
/// A richer progress ladder (queued, revalidating, fetching, sanitizing)
/// exists while a resource is in flight, but only these two values are ever
/// recorded in a finished graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeOutcome {
    Completed,
    Error,
}

/// Sanitizer variant that produced a node's clean text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    #[serde(rename = "markup")]
    Markup,
    #[serde(rename = "light-markup")]
    LightMarkup,
}

/// Revalidation tokens captured from a fetch response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// An outbound link recorded on a node
///
/// `label` is reserved for future use and is always empty today; nothing may
/// treat it as meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundLink {
    pub label: String,
    pub target: String,
}

impl OutboundLink {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            label: String::new(),
            target: target.into(),
        }
    }
}

/// Per-resource record in a document graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Canonical absolute address of the resource; doubles as the node key
    pub id: String,

    pub title: Option<String>,

    pub outcome: NodeOutcome,

    /// BFS layer at which the resource was first discovered
    pub depth: u32,

    /// Absent when the fetch failed
    pub content_kind: Option<ContentKind>,

    /// Present iff `outcome` is `Error`
    pub error_message: Option<String>,

    pub raw_body: Option<String>,

    pub clean_text: Option<String>,

    /// Outbound links in document order
    pub outbound_links: Vec<OutboundLink>,

    /// Tokens for conditional re-fetch on a later crawl
    pub validators: Option<Validators>,

    /// SHA-256 of the raw body; write-only integrity hook
    pub content_digest: Option<String>,
}

impl GraphNode {
    /// Builds the error node recorded for a non-root fetch failure
    pub fn failed(id: impl Into<String>, depth: u32, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            outcome: NodeOutcome::Error,
            depth,
            content_kind: None,
            error_message: Some(message.into()),
            raw_body: None,
            clean_text: None,
            outbound_links: Vec::new(),
            validators: None,
            content_digest: None,
        }
    }

    /// Targets of this node's outbound links, in document order
    pub fn link_targets(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.outbound_links.iter().map(|l| l.target.as_str())
    }
}

/// Traversal order for [`DocumentGraph::flatten`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    BreadthFirst,
    DepthFirst,
}

/// In-memory record of every resource visited in one crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentGraph {
    pub root_id: String,
    pub nodes: HashMap<String, GraphNode>,
}

impl DocumentGraph {
    pub fn new(root_id: impl Into<String>) -> Self {
        Self {
            root_id: root_id.into(),
            nodes: HashMap::new(),
        }
    }

    /// Inserts or overwrites the node at `node.id`
    ///
    /// Within one crawl the orchestrator writes each id at most once, so an
    /// overwrite only happens when a caller rebuilds a graph by hand.
    pub fn put(&mut self, node: GraphNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn get(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Produces the crawl's aggregated output text
    ///
    /// Walks the graph from the root, visiting each node at most once (a
    /// visited set keeps cyclic and diamond-shaped link structures from
    /// looping), collecting every non-empty `clean_text` and following each
    /// node's outbound links in document order. Per-node texts are joined by
    /// a single newline.
    pub fn flatten(&self, order: TraversalOrder) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(self.root_id.as_str());

        match order {
            TraversalOrder::BreadthFirst => {
                let mut queue: VecDeque<&str> = VecDeque::new();
                queue.push_back(self.root_id.as_str());

                while let Some(id) = queue.pop_front() {
                    if let Some(node) = self.nodes.get(id) {
                        if let Some(text) = node.clean_text.as_deref() {
                            if !text.is_empty() {
                                parts.push(text);
                            }
                        }
                        for target in node.link_targets() {
                            if visited.insert(target) {
                                queue.push_back(target);
                            }
                        }
                    }
                }
            }
            TraversalOrder::DepthFirst => {
                let mut stack: Vec<&str> = vec![self.root_id.as_str()];

                while let Some(id) = stack.pop() {
                    if let Some(node) = self.nodes.get(id) {
                        if let Some(text) = node.clean_text.as_deref() {
                            if !text.is_empty() {
                                parts.push(text);
                            }
                        }
                        // Push in reverse so the first link is visited first
                        for target in node.link_targets().rev() {
                            if visited.insert(target) {
                                stack.push(target);
                            }
                        }
                    }
                }
            }
        }

        parts.join("\n")
    }

    /// Serializes the graph to its persisted JSON form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Restores a graph from its persisted JSON form
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}
