use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::json::{load_json, save_json};
use crate::error::Result;

const NEW_PATTERN_THRESHOLD: usize = 3;
const CONTEXT_KEY_CHARS: usize = 50;

/// One observed instance of a pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredPattern {
    #[serde(rename = "type")]
    pub kind: String,
    pub implementation: String,
    pub context: String,
    #[serde(default)]
    pub related_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternRecord {
    pub first_seen: DateTime<Utc>,
    pub occurrences: usize,
    pub variations: BTreeSet<String>,
    pub contexts: BTreeSet<String>,
    pub related_patterns: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternHistory {
    #[serde(default)]
    pub patterns: BTreeMap<String, PatternRecord>,
    /// Pattern type → assigned category.
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Value>,
    #[serde(default)]
    pub versions: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPatternSuggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub occurrences: usize,
    pub contexts: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefinementSuggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub variations: usize,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipUpdate {
    pub source: String,
    pub related: Vec<String>,
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySuggestion {
    pub context: String,
    pub patterns: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternSuggestions {
    pub new_patterns: Vec<NewPatternSuggestion>,
    pub pattern_refinements: Vec<RefinementSuggestion>,
    pub relationship_updates: Vec<RelationshipUpdate>,
    pub category_changes: Vec<CategorySuggestion>,
}

impl PatternSuggestions {
    pub fn is_empty(&self) -> bool {
        self.new_patterns.is_empty()
            && self.pattern_refinements.is_empty()
            && self.relationship_updates.is_empty()
            && self.category_changes.is_empty()
    }
}

/// Tracks how pattern types accumulate variations and contexts over time,
/// persisted to `pattern_evolution.json`.
#[derive(Debug)]
pub struct PatternEvolution {
    path: PathBuf,
    history: PatternHistory,
}

impl PatternEvolution {
    pub fn new(knowledge_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(knowledge_dir)?;
        let path = knowledge_dir.join("pattern_evolution.json");
        let history = match load_json(&path) {
            Ok(history) => history,
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                PatternHistory::default()
            }
        };
        Ok(Self { path, history })
    }

    pub fn history(&self) -> &PatternHistory {
        &self.history
    }

    pub fn record_pattern_discovery(&mut self, pattern: &DiscoveredPattern) -> Result<()> {
        let entry = self
            .history
            .patterns
            .entry(pattern.kind.clone())
            .or_insert_with(|| PatternRecord {
                first_seen: Utc::now(),
                occurrences: 0,
                variations: BTreeSet::new(),
                contexts: BTreeSet::new(),
                related_patterns: BTreeSet::new(),
            });

        entry.occurrences += 1;
        entry.variations.insert(pattern.implementation.clone());
        entry.contexts.insert(pattern.context.clone());
        entry
            .related_patterns
            .extend(pattern.related_patterns.iter().cloned());
        debug!("Recorded {} (occurrences: {})", pattern.kind, entry.occurrences);

        self.save()
    }

    /// Assign a pattern type to a category; categorized types are no longer
    /// proposed as new patterns.
    pub fn assign_category(&mut self, pattern_type: &str, category: &str) -> Result<()> {
        self.history
            .categories
            .insert(pattern_type.to_string(), category.to_string());
        self.save()
    }

    fn save(&self) -> Result<()> {
        save_json(&self.path, &self.history)
    }

    pub fn suggest_pattern_updates(&self) -> PatternSuggestions {
        PatternSuggestions {
            new_patterns: self.identify_new_patterns(),
            pattern_refinements: self.suggest_refinements(),
            relationship_updates: self.analyze_relationships(),
            category_changes: self.suggest_categories(),
        }
    }

    fn identify_new_patterns(&self) -> Vec<NewPatternSuggestion> {
        self.history
            .patterns
            .iter()
            .filter(|(kind, record)| {
                !self.history.categories.contains_key(*kind)
                    && record.occurrences >= NEW_PATTERN_THRESHOLD
            })
            .map(|(kind, record)| NewPatternSuggestion {
                kind: kind.clone(),
                occurrences: record.occurrences,
                contexts: record.contexts.iter().cloned().collect(),
                confidence: (record.occurrences as f64 / 10.0).min(1.0),
            })
            .collect()
    }

    fn suggest_refinements(&self) -> Vec<RefinementSuggestion> {
        self.history
            .patterns
            .iter()
            .filter(|(_, record)| record.variations.len() > 1)
            .map(|(kind, record)| RefinementSuggestion {
                kind: kind.clone(),
                variations: record.variations.len(),
                suggestion: "Consider splitting pattern based on variations".to_string(),
            })
            .collect()
    }

    fn analyze_relationships(&self) -> Vec<RelationshipUpdate> {
        self.history
            .patterns
            .iter()
            .filter(|(_, record)| !record.related_patterns.is_empty())
            .map(|(kind, record)| RelationshipUpdate {
                source: kind.clone(),
                related: record.related_patterns.iter().cloned().collect(),
                strength: record.related_patterns.len() as f64 / 10.0,
            })
            .collect()
    }

    /// Group pattern types whose contexts share the same leading text.
    fn suggest_categories(&self) -> Vec<CategorySuggestion> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (kind, record) in &self.history.patterns {
            for context in &record.contexts {
                let key: String = context.chars().take(CONTEXT_KEY_CHARS).collect();
                groups.entry(key).or_default().push(kind.clone());
            }
        }

        groups
            .into_iter()
            .filter(|(_, patterns)| patterns.len() > 1)
            .map(|(context, patterns)| CategorySuggestion {
                confidence: patterns.len() as f64 / 5.0,
                context,
                patterns,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn discovered(kind: &str, implementation: &str, context: &str, related: &[&str]) -> DiscoveredPattern {
        DiscoveredPattern {
            kind: kind.to_string(),
            implementation: implementation.to_string(),
            context: context.to_string(),
            related_patterns: related.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_record_and_persist() {
        let dir = TempDir::new().unwrap();
        let mut evolution = PatternEvolution::new(dir.path()).unwrap();
        evolution
            .record_pattern_discovery(&discovered("3d_content", "RealityView {", "Load a model", &["RealityKit"]))
            .unwrap();
        evolution
            .record_pattern_discovery(&discovered("3d_content", "RealityView {", "Load a model", &["SwiftUI"]))
            .unwrap();

        let reloaded = PatternEvolution::new(dir.path()).unwrap();
        let record = &reloaded.history().patterns["3d_content"];
        assert_eq!(record.occurrences, 2);
        assert_eq!(record.variations.len(), 1);
        assert_eq!(record.related_patterns.len(), 2);
    }

    #[test]
    fn test_suggestions() {
        let dir = TempDir::new().unwrap();
        let mut evolution = PatternEvolution::new(dir.path()).unwrap();
        let shared = "Create an immersive space that presents a full environment to the person";
        for implementation in ["ImmersiveSpace(id:)", "openImmersiveSpace", "ImmersiveSpace(id:)"] {
            evolution
                .record_pattern_discovery(&discovered("immersive_space", implementation, shared, &["SwiftUI"]))
                .unwrap();
        }
        evolution
            .record_pattern_discovery(&discovered("ui_component", "struct V: View", shared, &[]))
            .unwrap();

        let suggestions = evolution.suggest_pattern_updates();
        assert_eq!(suggestions.new_patterns.len(), 1);
        assert_eq!(suggestions.new_patterns[0].kind, "immersive_space");
        assert!((suggestions.new_patterns[0].confidence - 0.3).abs() < 1e-9);

        assert_eq!(suggestions.pattern_refinements.len(), 1);
        assert_eq!(suggestions.pattern_refinements[0].variations, 2);

        assert_eq!(suggestions.relationship_updates.len(), 1);
        assert!((suggestions.relationship_updates[0].strength - 0.1).abs() < 1e-9);

        assert_eq!(suggestions.category_changes.len(), 1);
        assert_eq!(suggestions.category_changes[0].context.chars().count(), 50);
        assert_eq!(suggestions.category_changes[0].patterns.len(), 2);

        evolution.assign_category("immersive_space", "scenes").unwrap();
        assert!(evolution.suggest_pattern_updates().new_patterns.is_empty());
    }
}
