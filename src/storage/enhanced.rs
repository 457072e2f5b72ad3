use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::json::{load_json, save_json};
use crate::error::Result;
use crate::types::ComponentReport;

const PATTERN_CATEGORIES: [&str; 3] = ["initialization", "interactions", "lifecycle"];
const RELATIONSHIP_TYPES: [&str; 3] = ["component_hierarchy", "service_dependencies", "interaction_flows"];
const RULE_CATEGORIES: [&str; 4] = ["required_setup", "compatibility", "performance", "security"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentConstraint {
    Version { min_version: String },
    Device { supported_devices: Vec<String> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentMetadata {
    pub name: String,
    /// Owning framework: RealityKit, SwiftUI, ...
    #[serde(rename = "type")]
    pub framework: String,
    #[serde(default)]
    pub required_imports: Vec<String>,
    #[serde(default)]
    pub initialization_pattern: String,
    #[serde(default)]
    pub required_permissions: Vec<String>,
    #[serde(default)]
    pub common_properties: Vec<Value>,
    #[serde(default)]
    pub example_implementations: Vec<Value>,
    #[serde(default)]
    pub related_components: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<ComponentConstraint>,
    #[serde(default)]
    pub best_practices: Vec<String>,
    #[serde(default)]
    pub documentation_url: String,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl ComponentMetadata {
    pub fn new(name: impl Into<String>, framework: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            framework: framework.into(),
            required_imports: Vec::new(),
            initialization_pattern: String::new(),
            required_permissions: Vec::new(),
            common_properties: Vec::new(),
            example_implementations: Vec::new(),
            related_components: Vec::new(),
            constraints: Vec::new(),
            best_practices: Vec::new(),
            documentation_url: String::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternMetadata {
    pub name: String,
    /// initialization, interactions, lifecycle, ...
    pub category: String,
    pub description: String,
    pub code_template: String,
    #[serde(default)]
    pub required_components: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub example_usage: Vec<Value>,
    #[serde(default)]
    pub related_patterns: Vec<String>,
    #[serde(default)]
    pub documentation_url: String,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl PatternMetadata {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        code_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: description.into(),
            code_template: code_template.into(),
            required_components: Vec::new(),
            constraints: Vec::new(),
            example_usage: Vec::new(),
            related_patterns: Vec::new(),
            documentation_url: String::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RelationKind {
    #[serde(rename = "parent-child")]
    ParentChild,
    #[serde(rename = "peer")]
    Peer,
    #[serde(rename = "dependency")]
    Dependency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentRelationship {
    pub source: String,
    pub target: String,
    pub relationship_type: RelationKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub state_sharing: Option<String>,
    #[serde(default)]
    pub communication_pattern: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl ComponentRelationship {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship_type: kind,
            required: false,
            state_sharing: None,
            communication_pattern: None,
            constraints: Vec::new(),
            examples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComponentHierarchy {
    #[serde(default)]
    pub root_components: BTreeSet<String>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Vec<ComponentRelationship>>,
    #[serde(default)]
    pub common_combinations: Vec<Vec<String>>,
    #[serde(default)]
    pub integration_patterns: BTreeMap<String, Vec<String>>,
}

impl ComponentHierarchy {
    fn of_kind(&self, component: &str, kind: RelationKind) -> Vec<ComponentRelationship> {
        self.relationships
            .get(component)
            .map(|rels| {
                rels.iter()
                    .filter(|r| r.relationship_type == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HierarchyView {
    pub children: Vec<ComponentRelationship>,
    pub dependencies: Vec<ComponentRelationship>,
    pub peers: Vec<ComponentRelationship>,
    pub common_combinations: Vec<Vec<String>>,
    pub integration_patterns: BTreeMap<String, Vec<String>>,
}

/// What a call site provides when checking a component's requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageContext {
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
}

type RelationshipTable = BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>;

/// Directory-structured knowledge base of components, patterns, typed
/// relationships and validation rules.
#[derive(Debug)]
pub struct EnhancedKnowledgeBase {
    dir: PathBuf,
    components: BTreeMap<String, ComponentMetadata>,
    patterns: BTreeMap<String, BTreeMap<String, PatternMetadata>>,
    relationships: RelationshipTable,
    validation_rules: BTreeMap<String, Vec<Value>>,
    hierarchy: ComponentHierarchy,
}

impl EnhancedKnowledgeBase {
    /// Open (creating if needed) the knowledge base under `dir` and load
    /// whatever is already stored there.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        for sub in ["components", "patterns", "relationships", "validation"] {
            std::fs::create_dir_all(dir.join(sub))?;
        }

        let mut kb = Self {
            dir,
            components: BTreeMap::new(),
            patterns: PATTERN_CATEGORIES
                .iter()
                .map(|c| (c.to_string(), BTreeMap::new()))
                .collect(),
            relationships: RELATIONSHIP_TYPES
                .iter()
                .map(|t| (t.to_string(), BTreeMap::new()))
                .collect(),
            validation_rules: RULE_CATEGORIES
                .iter()
                .map(|c| (c.to_string(), Vec::new()))
                .collect(),
            hierarchy: ComponentHierarchy::default(),
        };
        kb.load_existing();
        Ok(kb)
    }

    fn components_dir(&self) -> PathBuf {
        self.dir.join("components")
    }

    fn patterns_dir(&self) -> PathBuf {
        self.dir.join("patterns")
    }

    fn relationships_file(&self) -> PathBuf {
        self.dir.join("relationships").join("relationships.json")
    }

    fn hierarchy_file(&self) -> PathBuf {
        self.dir.join("relationships").join("component_relationships.json")
    }

    fn rules_file(&self) -> PathBuf {
        self.dir.join("validation").join("validation_rules.json")
    }

    fn load_existing(&mut self) {
        for path in json_files(&self.components_dir()) {
            match load_json::<Option<ComponentMetadata>>(&path) {
                Ok(Some(component)) => {
                    self.components.insert(component.name.clone(), component);
                }
                Ok(None) => {}
                Err(e) => error!("Error loading component {}: {}", path.display(), e),
            }
        }

        if let Ok(entries) = std::fs::read_dir(self.patterns_dir()) {
            for category_dir in entries.filter_map(|e| e.ok()).map(|e| e.path()).filter(|p| p.is_dir()) {
                for path in json_files(&category_dir) {
                    match load_json::<Option<PatternMetadata>>(&path) {
                        Ok(Some(pattern)) => {
                            self.patterns
                                .entry(pattern.category.clone())
                                .or_default()
                                .insert(pattern.name.clone(), pattern);
                        }
                        Ok(None) => {}
                        Err(e) => error!("Error loading pattern {}: {}", path.display(), e),
                    }
                }
            }
        }

        if self.relationships_file().exists() {
            match load_json::<RelationshipTable>(&self.relationships_file()) {
                Ok(table) => self.relationships.extend(table),
                Err(e) => error!("Error loading relationships: {}", e),
            }
        }
        if self.rules_file().exists() {
            match load_json::<BTreeMap<String, Vec<Value>>>(&self.rules_file()) {
                Ok(rules) => self.validation_rules.extend(rules),
                Err(e) => error!("Error loading validation rules: {}", e),
            }
        }
        match load_json(&self.hierarchy_file()) {
            Ok(hierarchy) => self.hierarchy = hierarchy,
            Err(e) => error!("Error loading component relationships: {}", e),
        }
    }

    pub fn add_component(&mut self, component: ComponentMetadata) -> Result<()> {
        let path = self.components_dir().join(format!("{}.json", component.name));
        save_json(&path, &component)?;
        info!("Added/updated component: {}", component.name);
        self.components.insert(component.name.clone(), component);
        Ok(())
    }

    pub fn add_pattern(&mut self, pattern: PatternMetadata) -> Result<()> {
        let path = self
            .patterns_dir()
            .join(&pattern.category)
            .join(format!("{}.json", pattern.name));
        save_json(&path, &pattern)?;
        info!("Added/updated pattern: {} in category {}", pattern.name, pattern.category);
        self.patterns
            .entry(pattern.category.clone())
            .or_default()
            .insert(pattern.name.clone(), pattern);
        Ok(())
    }

    pub fn add_component_relationship(&mut self, relationship: ComponentRelationship) -> Result<()> {
        self.hierarchy
            .relationships
            .entry(relationship.source.clone())
            .or_default()
            .push(relationship);
        self.save_hierarchy()
    }

    pub fn add_common_combination(&mut self, components: Vec<String>) -> Result<()> {
        self.hierarchy.common_combinations.push(components);
        self.save_hierarchy()
    }

    pub fn add_integration_pattern(&mut self, name: &str, components: Vec<String>) -> Result<()> {
        self.hierarchy
            .integration_patterns
            .insert(name.to_string(), components);
        self.save_hierarchy()
    }

    pub fn mark_root(&mut self, component: &str) -> Result<()> {
        self.hierarchy.root_components.insert(component.to_string());
        self.save_hierarchy()
    }

    fn save_hierarchy(&self) -> Result<()> {
        save_json(&self.hierarchy_file(), &self.hierarchy)
    }

    pub fn get_component_hierarchy(&self, component: &str) -> HierarchyView {
        HierarchyView {
            children: self.hierarchy.of_kind(component, RelationKind::ParentChild),
            dependencies: self.hierarchy.of_kind(component, RelationKind::Dependency),
            peers: self.hierarchy.of_kind(component, RelationKind::Peer),
            common_combinations: self
                .hierarchy
                .common_combinations
                .iter()
                .filter(|combo| combo.iter().any(|c| c == component))
                .cloned()
                .collect(),
            integration_patterns: self
                .hierarchy
                .integration_patterns
                .iter()
                .filter(|(_, members)| members.iter().any(|c| c == component))
                .map(|(name, members)| (name.clone(), members.clone()))
                .collect(),
        }
    }

    /// Record `source → target` under `relationship_type`, replacing any
    /// previous metadata for that pair.
    pub fn add_relationship(
        &mut self,
        relationship_type: &str,
        source: &str,
        target: &str,
        metadata: BTreeMap<String, Value>,
    ) -> Result<()> {
        self.relationships
            .entry(relationship_type.to_string())
            .or_default()
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string(), Value::Object(metadata.into_iter().collect()));
        save_json(&self.relationships_file(), &self.relationships)?;
        info!("Added relationship: {} -> {} ({})", source, target, relationship_type);
        Ok(())
    }

    pub fn add_validation_rule(&mut self, category: &str, rule: Value) -> Result<()> {
        self.validation_rules
            .entry(category.to_string())
            .or_default()
            .push(rule);
        save_json(&self.rules_file(), &self.validation_rules)?;
        info!("Added validation rule to category: {}", category);
        Ok(())
    }

    pub fn validation_rules(&self, category: &str) -> &[Value] {
        self.validation_rules
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_component(&self, name: &str) -> Option<&ComponentMetadata> {
        self.components.get(name)
    }

    pub fn get_pattern(&self, category: &str, name: &str) -> Option<&PatternMetadata> {
        self.patterns.get(category).and_then(|p| p.get(name))
    }

    /// Targets of `component` across the hierarchy, service dependency and
    /// interaction flow tables.
    pub fn get_related_components(&self, component: &str) -> BTreeSet<String> {
        RELATIONSHIP_TYPES
            .iter()
            .filter_map(|t| self.relationships.get(*t))
            .filter_map(|table| table.get(component))
            .flat_map(|targets| targets.keys().cloned())
            .collect()
    }

    pub fn get_required_patterns(&self, component: &str) -> Vec<&PatternMetadata> {
        if !self.components.contains_key(component) {
            return Vec::new();
        }
        self.patterns
            .values()
            .flat_map(|category| category.values())
            .filter(|p| p.required_components.iter().any(|c| c == component))
            .collect()
    }

    /// Problems with using `component` in `context`; empty when the usage
    /// satisfies every recorded requirement.
    pub fn validate_component_usage(&self, component: &str, context: &UsageContext) -> Vec<String> {
        let Some(meta) = self.get_component(component) else {
            return vec!["Component not found".to_string()];
        };

        let mut issues = Vec::new();
        for permission in &meta.required_permissions {
            if !context.permissions.contains(permission) {
                issues.push(format!("Missing required permission: {}", permission));
            }
        }
        for import in &meta.required_imports {
            if !context.imports.contains(import) {
                issues.push(format!("Missing required import: {}", import));
            }
        }
        for constraint in &meta.constraints {
            match constraint {
                ComponentConstraint::Version { min_version } => {
                    let satisfied = context
                        .os_version
                        .as_deref()
                        .map(|v| version_at_least(v, min_version))
                        .unwrap_or(false);
                    if !satisfied {
                        issues.push(format!("Requires minimum OS version: {}", min_version));
                    }
                }
                ComponentConstraint::Device { supported_devices } => {
                    let supported = context
                        .device_type
                        .as_ref()
                        .map(|d| supported_devices.contains(d))
                        .unwrap_or(false);
                    if !supported {
                        issues.push(format!(
                            "Not supported on device type: {}",
                            context.device_type.as_deref().unwrap_or("unknown")
                        ));
                    }
                }
                ComponentConstraint::Other => {}
            }
        }
        issues
    }

    /// Seed integration patterns and common combinations from an analysis
    /// run. Each relationship becomes an integration pattern over the
    /// modules its files import; each distinct multi-module import set
    /// becomes a combination. Returns `(patterns, combinations)` added.
    pub fn ingest_report(&mut self, report: &ComponentReport) -> Result<(usize, usize)> {
        let mut patterns = 0;
        for (relationship, files) in &report.relationships {
            let modules: BTreeSet<String> = files
                .iter()
                .filter_map(|f| report.imports.get(f))
                .flatten()
                .cloned()
                .collect();
            if modules.is_empty() {
                continue;
            }
            self.hierarchy
                .integration_patterns
                .insert(relationship.clone(), modules.into_iter().collect());
            patterns += 1;
        }

        let known: BTreeSet<Vec<String>> = self.hierarchy.common_combinations.iter().cloned().collect();
        let fresh: BTreeSet<Vec<String>> = report
            .imports
            .values()
            .filter(|imports| imports.len() > 1)
            .map(|imports| imports.iter().cloned().collect::<Vec<_>>())
            .filter(|combo| !known.contains(combo))
            .collect();
        let combinations = fresh.len();
        self.hierarchy.common_combinations.extend(fresh);

        self.save_hierarchy()?;
        info!(
            "Ingested {} integration patterns and {} import combinations",
            patterns, combinations
        );
        Ok((patterns, combinations))
    }
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect(),
        Err(e) => {
            warn!("Cannot read {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}

/// Dotted numeric comparison; non-numeric parts compare as zero.
fn version_at_least(version: &str, minimum: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> { v.split('.').map(|p| p.trim().parse().unwrap_or(0)).collect() };
    let (mut have, mut need) = (parse(version), parse(minimum));
    let len = have.len().max(need.len());
    have.resize(len, 0);
    need.resize(len, 0);
    have >= need
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn immersive_space() -> ComponentMetadata {
        let mut component = ComponentMetadata::new("ImmersiveSpace", "SwiftUI");
        component.required_imports = vec!["SwiftUI".into()];
        component.required_permissions = vec!["NSWorldSensingUsageDescription".into()];
        component.constraints = vec![
            ComponentConstraint::Version { min_version: "1.0".into() },
            ComponentConstraint::Device { supported_devices: vec!["vision_pro".into()] },
        ];
        component
    }

    #[test]
    fn test_components_and_patterns_persist() {
        let dir = TempDir::new().unwrap();
        {
            let mut kb = EnhancedKnowledgeBase::open(dir.path()).unwrap();
            kb.add_component(immersive_space()).unwrap();
            let mut pattern = PatternMetadata::new("open_space", "lifecycle", "Open a space", "openImmersiveSpace(id:)");
            pattern.required_components = vec!["ImmersiveSpace".into()];
            kb.add_pattern(pattern).unwrap();
            kb.add_pattern(PatternMetadata::new("drag", "gestures", "Drag", "DragGesture()")).unwrap();
        }

        let kb = EnhancedKnowledgeBase::open(dir.path()).unwrap();
        assert_eq!(kb.get_component("ImmersiveSpace").unwrap().framework, "SwiftUI");
        assert!(kb.get_pattern("gestures", "drag").is_some());
        let required = kb.get_required_patterns("ImmersiveSpace");
        assert_eq!(required.len(), 1);
        assert_eq!(required[0].name, "open_space");
        assert!(kb.get_required_patterns("Unknown").is_empty());
    }

    #[test]
    fn test_hierarchy_queries() {
        let dir = TempDir::new().unwrap();
        let mut kb = EnhancedKnowledgeBase::open(dir.path()).unwrap();
        kb.add_component_relationship(ComponentRelationship::new("WindowGroup", "ContentView", RelationKind::ParentChild))
            .unwrap();
        kb.add_component_relationship(ComponentRelationship::new("WindowGroup", "SwiftUI", RelationKind::Dependency))
            .unwrap();
        kb.add_common_combination(vec!["WindowGroup".into(), "ImmersiveSpace".into()]).unwrap();
        kb.add_integration_pattern("scene_setup", vec!["WindowGroup".into()]).unwrap();

        let reopened = EnhancedKnowledgeBase::open(dir.path()).unwrap();
        let view = reopened.get_component_hierarchy("WindowGroup");
        assert_eq!(view.children.len(), 1);
        assert_eq!(view.dependencies.len(), 1);
        assert!(view.peers.is_empty());
        assert_eq!(view.common_combinations.len(), 1);
        assert!(view.integration_patterns.contains_key("scene_setup"));
    }

    #[test]
    fn test_typed_relationships_and_rules() {
        let dir = TempDir::new().unwrap();
        let mut kb = EnhancedKnowledgeBase::open(dir.path()).unwrap();
        kb.add_relationship("component_hierarchy", "RealityView", "Entity", BTreeMap::new())
            .unwrap();
        kb.add_relationship("interaction_flows", "RealityView", "SpatialTapGesture", BTreeMap::new())
            .unwrap();
        kb.add_relationship("custom", "RealityView", "Ignored", BTreeMap::new()).unwrap();
        kb.add_validation_rule("security", json!({"rule": "request world sensing"})).unwrap();

        let related = kb.get_related_components("RealityView");
        assert_eq!(related.len(), 2);
        assert!(!related.contains("Ignored"));

        let reopened = EnhancedKnowledgeBase::open(dir.path()).unwrap();
        assert_eq!(reopened.validation_rules("security").len(), 1);
        assert!(reopened.validation_rules("performance").is_empty());
    }

    #[test]
    fn test_validate_component_usage() {
        let dir = TempDir::new().unwrap();
        let mut kb = EnhancedKnowledgeBase::open(dir.path()).unwrap();
        kb.add_component(immersive_space()).unwrap();

        assert_eq!(
            kb.validate_component_usage("Nope", &UsageContext::default()),
            vec!["Component not found"]
        );

        let issues = kb.validate_component_usage("ImmersiveSpace", &UsageContext::default());
        assert_eq!(issues.len(), 4);

        let ok = UsageContext {
            permissions: vec!["NSWorldSensingUsageDescription".into()],
            imports: vec!["SwiftUI".into()],
            os_version: Some("2.1".into()),
            device_type: Some("vision_pro".into()),
        };
        assert!(kb.validate_component_usage("ImmersiveSpace", &ok).is_empty());
    }

    #[test]
    fn test_version_comparison() {
        assert!(version_at_least("10.0", "9.2"));
        assert!(version_at_least("1.0", "1"));
        assert!(!version_at_least("1.2", "1.10"));
    }

    #[test]
    fn test_ingest_report() {
        let dir = TempDir::new().unwrap();
        let mut kb = EnhancedKnowledgeBase::open(dir.path()).unwrap();

        let mut report = ComponentReport::default();
        report
            .imports
            .insert("/a.swift".into(), ["SwiftUI", "RealityKit"].iter().map(|s| s.to_string()).collect());
        report
            .imports
            .insert("/b.swift".into(), ["SwiftUI"].iter().map(|s| s.to_string()).collect());
        report
            .relationships
            .insert("rcp_scene_integration".into(), ["/a.swift".to_string()].into_iter().collect());

        assert_eq!(kb.ingest_report(&report).unwrap(), (1, 1));
        assert_eq!(kb.ingest_report(&report).unwrap(), (1, 0));

        let view = kb.get_component_hierarchy("RealityKit");
        assert_eq!(view.integration_patterns["rcp_scene_integration"], vec!["RealityKit", "SwiftUI"]);
        assert_eq!(view.common_combinations.len(), 1);
    }
}
