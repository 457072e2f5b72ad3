use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

use super::docs::load_extracted_pages;
use crate::types::DocumentationPage;

const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1.0e-6;

/// Co-occurrence graph of documentation topics. Edge weights count how
/// often two topics were seen together on a page.
#[derive(Debug, Clone, Default)]
pub struct TopicAnalyzer {
    graph: DiGraph<String, u32>,
    node_indices: HashMap<String, NodeIndex>,
    categories: HashMap<String, String>,
}

impl TopicAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_extracted(dir: &Path) -> Self {
        let pages = load_extracted_pages(dir);
        if pages.is_empty() {
            warn!("No extracted files found in {}", dir.display());
        }
        Self::from_pages(&pages)
    }

    pub fn from_pages(pages: &[DocumentationPage]) -> Self {
        let mut analyzer = Self::new();
        for page in pages {
            analyzer.add_page(page);
        }
        debug!(
            "Topic graph: {} topics, {} edges",
            analyzer.graph.node_count(),
            analyzer.graph.edge_count()
        );
        analyzer
    }

    pub fn topic_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn weight(&self, from: &str, to: &str) -> Option<u32> {
        let (a, b) = (*self.node_indices.get(from)?, *self.node_indices.get(to)?);
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    fn add_topic(&mut self, title: &str) -> NodeIndex {
        if let Some(&index) = self.node_indices.get(title) {
            return index;
        }
        let index = self.graph.add_node(title.to_string());
        self.node_indices.insert(title.to_string(), index);
        index
    }

    fn bump(&mut self, from: &str, to: &str) {
        let (a, b) = (self.add_topic(from), self.add_topic(to));
        match self.graph.find_edge(a, b) {
            Some(edge) => self.graph[edge] += 1,
            None => {
                self.graph.add_edge(a, b, 1);
            }
        }
    }

    /// Consecutive topics get an edge; every ordered pair on the page adds
    /// one to its edge weight.
    pub fn add_page(&mut self, page: &DocumentationPage) {
        let topics: Vec<&str> = page.topics.iter().map(|t| t.title.as_str()).collect();
        for topic in &topics {
            self.add_topic(topic);
            self.categories.insert(topic.to_string(), page.category.clone());
        }
        for pair in topics.windows(2) {
            let (a, b) = (self.add_topic(pair[0]), self.add_topic(pair[1]));
            if self.graph.find_edge(a, b).is_none() {
                self.graph.add_edge(a, b, 1);
            }
        }
        for (i, first) in topics.iter().enumerate() {
            for second in &topics[i + 1..] {
                self.bump(first, second);
            }
        }
    }

    /// Weighted PageRank with uniform redistribution from dangling topics.
    pub fn page_rank(&self) -> HashMap<NodeIndex, f64> {
        let n = self.graph.node_count();
        if n == 0 {
            return HashMap::new();
        }
        let uniform = 1.0 / n as f64;
        let out_weight: Vec<f64> = self
            .graph
            .node_indices()
            .map(|node| self.graph.edges(node).map(|e| *e.weight() as f64).sum())
            .collect();

        let mut rank = vec![uniform; n];
        for _ in 0..MAX_ITERATIONS {
            let dangling: f64 = self
                .graph
                .node_indices()
                .filter(|node| out_weight[node.index()] == 0.0)
                .map(|node| rank[node.index()])
                .sum();

            let mut next = vec![(1.0 - DAMPING) * uniform + DAMPING * dangling * uniform; n];
            for edge in self.graph.edge_references() {
                let (source, target) = (edge.source().index(), edge.target().index());
                next[target] += DAMPING * rank[source] * *edge.weight() as f64 / out_weight[source];
            }

            let delta: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
            rank = next;
            if delta < n as f64 * TOLERANCE {
                break;
            }
        }

        self.graph.node_indices().map(|node| (node, rank[node.index()])).collect()
    }

    /// In plus out degree over `n - 1`.
    pub fn degree_centrality(&self) -> HashMap<NodeIndex, f64> {
        let n = self.graph.node_count();
        let scale = if n > 1 { 1.0 / (n - 1) as f64 } else { 1.0 };
        self.graph
            .node_indices()
            .map(|node| {
                let degree = self.graph.edges_directed(node, Direction::Outgoing).count()
                    + self.graph.edges_directed(node, Direction::Incoming).count();
                (node, degree as f64 * scale)
            })
            .collect()
    }

    /// Top `n` topics by the mean of PageRank and degree centrality.
    pub fn central_topics(&self, n: usize) -> Vec<(String, f64)> {
        let rank = self.page_rank();
        let degree = self.degree_centrality();
        let mut scored: Vec<(String, f64)> = self
            .graph
            .node_indices()
            .map(|node| {
                let score = (rank.get(&node).copied().unwrap_or(0.0) + degree.get(&node).copied().unwrap_or(0.0)) / 2.0;
                (self.graph[node].clone(), score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(n);
        scored
    }

    /// Weakly connected groups of topics, named `Cluster i (<category>)`
    /// after the most common page category among their members.
    pub fn topic_clusters(&self) -> BTreeMap<String, Vec<String>> {
        let mut components = UnionFind::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            components.union(edge.source().index(), edge.target().index());
        }

        let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for node in self.graph.node_indices() {
            groups
                .entry(components.find(node.index()))
                .or_default()
                .push(self.graph[node].clone());
        }

        groups
            .into_values()
            .enumerate()
            .map(|(i, mut members)| {
                members.sort();
                (format!("Cluster {} ({})", i + 1, self.dominant_category(&members)), members)
            })
            .collect()
    }

    fn dominant_category(&self, members: &[String]) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for member in members {
            let category = self.categories.get(member).map(String::as_str).unwrap_or("Other");
            *counts.entry(category).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(category, _)| category.to_string())
            .unwrap_or_else(|| "Other".to_string())
    }
}
