use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::json::{load_json, save_json};
use crate::error::Result;

const EVIDENCE_WINDOW: usize = 5;
const STRONGEST_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedRelationship {
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub strength: f64,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    pub first_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelatedItem {
    pub item: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRelationship {
    pub relationship: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub strength: f64,
    pub evidence_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipStats {
    pub total_relationships: usize,
    pub relationship_types: BTreeMap<String, usize>,
    pub strongest_relationships: Vec<RankedRelationship>,
    pub most_connected_items: BTreeMap<String, usize>,
}

/// Evidence-weighted relationships between patterns and concepts, keyed
/// `source:target` and persisted after every change.
#[derive(Debug)]
pub struct RelationshipTracker {
    path: PathBuf,
    relationships: BTreeMap<String, TrackedRelationship>,
}

impl RelationshipTracker {
    /// Load `relationships.json` from `knowledge_dir`. An unreadable file is
    /// logged and replaced with an empty set.
    pub fn new(knowledge_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(knowledge_dir)?;
        let path = knowledge_dir.join("relationships.json");
        let relationships = match load_json(&path) {
            Ok(relationships) => relationships,
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Ok(Self { path, relationships })
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn get(&self, source: &str, target: &str) -> Option<&TrackedRelationship> {
        self.relationships.get(&relationship_key(source, target))
    }

    pub fn record_relationship(
        &mut self,
        source: &str,
        target: &str,
        relationship_type: &str,
        mut details: Map<String, Value>,
    ) -> Result<f64> {
        let now = Utc::now();
        if let Some(reported) = details.remove("timestamp") {
            details.insert("reported_timestamp".to_string(), reported);
        }
        let entry = self
            .relationships
            .entry(relationship_key(source, target))
            .or_insert_with(|| TrackedRelationship {
                relationship_type: relationship_type.to_string(),
                strength: 0.5,
                evidence: Vec::new(),
                first_seen: now,
            });

        entry.evidence.push(Evidence { timestamp: now, details });
        entry.strength = calculate_strength(&entry.evidence, now);
        let strength = entry.strength;
        debug!("{} -> {} ({}) strength {:.2}", source, target, relationship_type, strength);

        save_json(&self.path, &self.relationships)?;
        Ok(strength)
    }

    /// Targets of relationships from `item` with at least `min_strength`.
    pub fn get_related_items(&self, item: &str, min_strength: f64) -> Vec<RelatedItem> {
        self.relationships
            .iter()
            .filter_map(|(key, rel)| {
                let (source, target) = key.split_once(':')?;
                (source == item && rel.strength >= min_strength).then(|| RelatedItem {
                    item: target.to_string(),
                    relationship_type: rel.relationship_type.clone(),
                    strength: rel.strength,
                })
            })
            .collect()
    }

    pub fn get_relationship_stats(&self) -> RelationshipStats {
        let mut stats = RelationshipStats {
            total_relationships: self.relationships.len(),
            ..Default::default()
        };

        for (key, rel) in &self.relationships {
            *stats
                .relationship_types
                .entry(rel.relationship_type.clone())
                .or_insert(0) += 1;
            let source = key.split_once(':').map(|(s, _)| s).unwrap_or(key);
            *stats.most_connected_items.entry(source.to_string()).or_insert(0) += 1;
        }

        let mut ranked: Vec<_> = self.relationships.iter().collect();
        ranked.sort_by(|a, b| b.1.strength.total_cmp(&a.1.strength));
        stats.strongest_relationships = ranked
            .into_iter()
            .take(STRONGEST_LIMIT)
            .map(|(key, rel)| RankedRelationship {
                relationship: key.clone(),
                relationship_type: rel.relationship_type.clone(),
                strength: rel.strength,
                evidence_count: rel.evidence.len(),
            })
            .collect();
        stats
    }
}

pub fn relationship_key(source: &str, target: &str) -> String {
    format!("{}:{}", source, target)
}

/// 0.5 without evidence. Otherwise 0.1 per item up to 0.5, plus a recency
/// bonus of up to 0.1 for each of the last five items that decays by 0.01
/// per day of age. Capped at 1.0.
pub fn calculate_strength(evidence: &[Evidence], now: DateTime<Utc>) -> f64 {
    if evidence.is_empty() {
        return 0.5;
    }

    let base = (evidence.len() as f64 * 0.1).min(0.5);
    let recent: f64 = evidence
        .iter()
        .rev()
        .take(EVIDENCE_WINDOW)
        .map(|e| {
            let age_days = now.signed_duration_since(e.timestamp).num_days() as f64;
            (0.1 - age_days * 0.01).max(0.0)
        })
        .sum();

    (base + recent).min(1.0)
}
