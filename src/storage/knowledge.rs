use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::json::{load_json, save_json};
use crate::analyzers::catalog::imports_of;
use crate::error::Result;
use crate::types::{Census, ComponentReport, FileAnalysis};

static CONFORMANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:struct|class)\s+(\w+)\s*:\s*(\w+)").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatternRelationships {
    pub commonly_used_with: BTreeSet<String>,
    /// Scene-level types (`App`, `Scene` conformers) declared in the files.
    pub parent_components: BTreeSet<String>,
    /// `View` conformers declared in the files.
    pub child_components: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KnowledgePattern {
    pub count: usize,
    pub files: BTreeSet<String>,
    pub examples: Vec<String>,
    pub relationships: PatternRelationships,
}

/// Flat JSON knowledge base: `patterns.json`, `components.json`,
/// `file_analyses.json`, and the shared `relationships.json`.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    dir: PathBuf,
}

impl KnowledgeBase {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn patterns_path(&self) -> PathBuf {
        self.dir.join("patterns.json")
    }

    fn relationships_path(&self) -> PathBuf {
        self.dir.join("relationships.json")
    }

    fn components_path(&self) -> PathBuf {
        self.dir.join("components.json")
    }

    fn file_analyses_path(&self) -> PathBuf {
        self.dir.join("file_analyses.json")
    }

    /// Turn a census into `patterns.json`, reading each listed file for its
    /// imports and declared types. Unreadable files are logged and skipped.
    pub fn build_from_analysis(&self, census: &Census) -> Result<BTreeMap<String, KnowledgePattern>> {
        let patterns: BTreeMap<String, KnowledgePattern> = census
            .iter()
            .map(|(kind, data)| {
                let files: BTreeSet<String> = data.files.iter().cloned().collect();
                let pattern = KnowledgePattern {
                    count: data.count,
                    relationships: file_relationships(&files),
                    files,
                    examples: data.examples.clone(),
                };
                (kind.clone(), pattern)
            })
            .collect();

        save_json(&self.patterns_path(), &patterns)?;
        info!("Saved {} patterns to knowledge base", patterns.len());
        Ok(patterns)
    }

    pub fn patterns(&self) -> Result<BTreeMap<String, KnowledgePattern>> {
        load_json(&self.patterns_path())
    }

    pub fn query_pattern(&self, pattern_type: &str) -> Option<KnowledgePattern> {
        match self.patterns() {
            Ok(mut patterns) => patterns.remove(pattern_type),
            Err(e) => {
                error!("Error querying pattern {}: {}", pattern_type, e);
                None
            }
        }
    }

    /// Raw entry for `component` in `relationships.json`.
    pub fn get_component_relationship(&self, component: &str) -> Option<Value> {
        let relationships: BTreeMap<String, Value> = match load_json(&self.relationships_path()) {
            Ok(relationships) => relationships,
            Err(e) => {
                error!("Error getting relationships for {}: {}", component, e);
                return None;
            }
        };
        relationships.get(component).cloned()
    }

    pub fn save_components(&self, report: &ComponentReport) -> Result<()> {
        save_json(&self.components_path(), report)?;
        info!(
            "Saved {} component categories and {} relationships",
            report.components.len(),
            report.relationships.len()
        );
        Ok(())
    }

    pub fn components(&self) -> Result<ComponentReport> {
        load_json(&self.components_path())
    }

    pub fn save_file_analyses(&self, analyses: &[FileAnalysis]) -> Result<()> {
        save_json(&self.file_analyses_path(), analyses)
    }

    pub fn file_analyses(&self) -> Result<Vec<FileAnalysis>> {
        load_json(&self.file_analyses_path())
    }
}

fn file_relationships(files: &BTreeSet<String>) -> PatternRelationships {
    let mut relationships = PatternRelationships::default();
    for file in files {
        let content = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                error!("Error analyzing file {}: {}", file, e);
                continue;
            }
        };
        relationships.commonly_used_with.extend(imports_of(&content));
        for caps in CONFORMANCE.captures_iter(&content) {
            let name = caps[1].to_string();
            match &caps[2] {
                "App" | "Scene" => {
                    relationships.parent_components.insert(name);
                }
                "View" => {
                    relationships.child_components.insert(name);
                }
                _ => {}
            }
        }
    }
    relationships
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternCensus;
    use tempfile::TempDir;

    #[test]
    fn test_build_from_analysis() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("App.swift");
        std::fs::write(
            &source,
            "import SwiftUI\n@main struct WorldApp: App {}\nstruct Globe: View {}\n",
        )
        .unwrap();
        let file = source.to_string_lossy().to_string();

        let mut census = Census::new();
        census.insert(
            "ui_components".into(),
            PatternCensus {
                count: 2,
                files: vec![file.clone(), file.clone()],
                examples: vec!["struct Globe: View {}".into()],
            },
        );

        let kb = KnowledgeBase::new(dir.path().join("knowledge")).unwrap();
        let patterns = kb.build_from_analysis(&census).unwrap();
        let ui = &patterns["ui_components"];
        assert_eq!(ui.files.len(), 1);
        assert!(ui.relationships.commonly_used_with.contains("SwiftUI"));
        assert!(ui.relationships.parent_components.contains("WorldApp"));
        assert!(ui.relationships.child_components.contains("Globe"));

        assert_eq!(kb.query_pattern("ui_components").unwrap().count, 2);
        assert!(kb.query_pattern("animation").is_none());
    }

    #[test]
    fn test_component_relationship_lookup() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::new(dir.path()).unwrap();
        assert!(kb.get_component_relationship("RealityView").is_none());

        std::fs::write(
            dir.path().join("relationships.json"),
            r#"{"RealityView:Entity": {"type": "uses"}}"#,
        )
        .unwrap();
        let rel = kb.get_component_relationship("RealityView:Entity").unwrap();
        assert_eq!(rel["type"], "uses");
    }

    #[test]
    fn test_components_and_file_analyses_round_trip() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::new(dir.path()).unwrap();
        let mut analysis = FileAnalysis::new("/p/View.swift");
        analysis.add_match("ui_controls", "Button");
        kb.save_file_analyses(&[analysis.clone()]).unwrap();
        assert_eq!(kb.file_analyses().unwrap(), vec![analysis]);
        assert!(kb.components().unwrap().is_empty());
    }
}
