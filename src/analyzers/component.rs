use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::catalog::{
    imports_of, PatternFamily, BINDING_PATTERNS, COMPONENT_PATTERNS, LIFECYCLE_PATTERNS,
    RCP_RELATIONSHIP_PATTERNS, REALITYKIT_CONTENT_PATTERNS, REALITY_COMPOSER_PATTERNS,
    SCENE_MODIFICATION_PATTERNS, STATE_FLOW_PATTERNS, STATE_MANAGEMENT_PATTERNS, STATE_PATTERNS,
    UI_PATTERNS, UPDATE_PATTERNS,
};
use crate::scanner::SourceScanner;
use crate::types::{ComponentReport, FileAnalysis, TermMap};

/// `(relationship, first category, second category)`: the relationship holds
/// for a file containing a term from each category accumulated so far.
type CoOccurrence = (&'static str, &'static str, &'static str);

const SCENE_RELATIONSHIPS: &[CoOccurrence] = &[
    ("swiftui_rcp_flow", "state_flow_rcp_state_handlers", "state_flow_state_handlers"),
    ("component_state_flow", "state_flow_component_state_updates", "state_flow_state_propagation"),
    ("material_state_flow", "state_flow_material_state_updates", "state_flow_state_propagation"),
    ("entity_state_flow", "state_flow_entity_state_updates", "state_flow_state_propagation"),
];

const STATE_RELATIONSHIPS: &[CoOccurrence] = &[
    ("state_environment_integration", "state_environment_values", "state_state_properties"),
    ("state_observation_integration", "state_observable_types", "state_observation_triggers"),
];

const BINDING_RELATIONSHIPS: &[CoOccurrence] = &[
    ("swiftui_rcp_binding_integration", "binding_swiftui_bindings", "binding_rcp_bindings"),
    ("binding_state_integration", "binding_binding_creation", "state_state_properties"),
    ("binding_transform_integration", "binding_binding_transforms", "binding_binding_chains"),
];

/// `(relationship, any of, and any of)` over fixed literal terms.
type LiteralRule = (&'static str, &'static [&'static str], &'static [&'static str]);

const COMPONENT_RULES: &[LiteralRule] = &[
    ("component_state_integration", &["@State", "@Binding", "@Observable"], &["components.set", "components.update"]),
    ("material_animation_integration", &[".material", ".materials"], &["withAnimation", ".animation"]),
];

const RCP_STATE_RULES: &[LiteralRule] = &[
    ("rcp_scene_integration", &["Entity", "Scene", "AnchorEntity"], &["components.set", "addChild"]),
    ("rcp_material_integration", &["Material", "ShaderGraphMaterial"], &["setParameter", "parameters"]),
    ("rcp_animation_integration", &["AnimationResource", "PlaybackController"], &["play", "resume", "pause"]),
];

/// Scans Swift sources against the pattern catalog and accumulates terms,
/// per-file imports and relationship file sets.
#[derive(Debug, Default)]
pub struct ComponentAnalyzer {
    samples_dir: PathBuf,
    scanner: SourceScanner,
    components: TermMap,
    imports: TermMap,
    relationships: TermMap,
    file_analyses: Vec<FileAnalysis>,
}

impl ComponentAnalyzer {
    pub fn new(samples_dir: impl Into<PathBuf>) -> Self {
        Self {
            samples_dir: samples_dir.into(),
            ..Default::default()
        }
    }

    /// Analyze every Swift file under `dir` (or the configured samples dir).
    /// Unreadable files are logged and skipped.
    pub fn analyze_samples(&mut self, dir: Option<&Path>) -> ComponentReport {
        let root = dir.map(Path::to_path_buf).unwrap_or_else(|| self.samples_dir.clone());
        let files = self.scanner.scan(&root);
        info!("Found {} Swift files to analyze", files.len());

        for path in files {
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    self.analyze_file(&content, &path);
                }
                Err(e) => error!("Error analyzing {}: {}", path.display(), e),
            }
        }
        self.report()
    }

    pub fn report(&self) -> ComponentReport {
        ComponentReport {
            components: self.components.clone(),
            imports: self.imports.clone(),
            relationships: self.relationships.clone(),
        }
    }

    pub fn file_analyses(&self) -> &[FileAnalysis] {
        &self.file_analyses
    }

    /// Analyze one file's content and fold the results into the accumulators.
    pub fn analyze_file(&mut self, content: &str, path: &Path) -> &FileAnalysis {
        let file = path.to_string_lossy().to_string();
        let imports = imports_of(content);
        let has = |module: &str| imports.contains(module);
        let mut analysis = FileAnalysis::new(&file);
        analysis.imports = imports.clone();

        if has("RealityKit") {
            self.store(&COMPONENT_PATTERNS, "component", content, &mut analysis);
        }

        if has("SwiftUI") {
            let state = STATE_PATTERNS.scan(content);
            let updates = UPDATE_PATTERNS.scan(content);
            let wrappers = found(&state, "property_wrappers");
            let system_updates = found(&updates, "system_updates");

            self.store_scanned("ui", UI_PATTERNS.scan(content), &mut analysis);
            self.store_scanned("state", state, &mut analysis);
            self.store(&LIFECYCLE_PATTERNS, "lifecycle", content, &mut analysis);
            self.store_scanned("update", updates, &mut analysis);
            self.imports.insert(file.clone(), imports.clone());

            if wrappers && system_updates {
                self.relate("state_update_integration", &file);
            }
        }

        if has("RealityKit") || has("RealityFoundation") {
            self.store(&REALITY_COMPOSER_PATTERNS, "rcp", content, &mut analysis);
            for (relationship, terms) in RCP_RELATIONSHIP_PATTERNS.scan(content) {
                if !terms.is_empty() {
                    self.relate(&format!("rcp_{}", relationship), &file);
                }
            }
            self.store(&SCENE_MODIFICATION_PATTERNS, "scene", content, &mut analysis);
            self.track(SCENE_RELATIONSHIPS, content, &file);
        }

        if has("SwiftUI") {
            self.store(&STATE_MANAGEMENT_PATTERNS, "state", content, &mut analysis);
            if self.any_in("state_state_properties", content) && content.contains("View") {
                self.relate("state_view_integration", &file);
            }
            self.track(STATE_RELATIONSHIPS, content, &file);
            if has("RealityKit") {
                self.apply_rules(RCP_STATE_RULES, content, &file);
            }
        }

        self.store(&BINDING_PATTERNS, "binding", content, &mut analysis);
        self.track(BINDING_RELATIONSHIPS, content, &file);
        self.store(&STATE_FLOW_PATTERNS, "state_flow", content, &mut analysis);

        let in_content_package = path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name == "RealityKitContent")
            .unwrap_or(false);
        if in_content_package {
            self.store(&REALITYKIT_CONTENT_PATTERNS, "rcp", content, &mut analysis);
        }

        if content.contains("SwiftUI")
            && content.contains("RealityKit")
            && ["RealityView", "Entity", "Model3D"].iter().any(|t| content.contains(t))
        {
            self.relate("swiftui_realitykit_integration", &file);
        }
        self.apply_rules(COMPONENT_RULES, content, &file);

        debug!("{}: {} terms", file, analysis.term_count());
        self.file_analyses.retain(|a| a.path != file);
        self.file_analyses.push(analysis);
        &self.file_analyses[self.file_analyses.len() - 1]
    }

    fn store(&mut self, family: &PatternFamily, prefix: &str, content: &str, analysis: &mut FileAnalysis) {
        self.store_scanned(prefix, family.scan(content), analysis);
    }

    fn store_scanned(
        &mut self,
        prefix: &str,
        scanned: Vec<(&'static str, BTreeSet<String>)>,
        analysis: &mut FileAnalysis,
    ) {
        for (category, terms) in scanned {
            let key = format!("{}_{}", prefix, category);
            let entry = self.components.entry(key.clone()).or_default();
            for term in terms {
                entry.insert(term.clone());
                analysis.add_match(&key, term);
            }
        }
    }

    fn relate(&mut self, relationship: &str, file: &str) {
        self.relationships
            .entry(relationship.to_string())
            .or_default()
            .insert(file.to_string());
    }

    /// True when any term accumulated under `category` appears in `content`.
    fn any_in(&self, category: &str, content: &str) -> bool {
        self.components
            .get(category)
            .map(|terms| terms.iter().any(|t| content.contains(t.as_str())))
            .unwrap_or(false)
    }

    fn track(&mut self, rules: &[CoOccurrence], content: &str, file: &str) {
        for (relationship, first, second) in rules {
            if self.any_in(first, content) && self.any_in(second, content) {
                self.relate(relationship, file);
            }
        }
    }

    fn apply_rules(&mut self, rules: &[LiteralRule], content: &str, file: &str) {
        for (relationship, first, second) in rules {
            if first.iter().any(|t| content.contains(t)) && second.iter().any(|t| content.contains(t)) {
                self.relate(relationship, file);
            }
        }
    }
}

fn found(scanned: &[(&'static str, BTreeSet<String>)], category: &str) -> bool {
    scanned
        .iter()
        .any(|(name, terms)| *name == category && !terms.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const IMMERSIVE: &str = r#"import SwiftUI
import RealityKit

struct ImmersiveView: View {
    @State private var isRotating = false

    var body: some View {
        RealityView { content in
            let sphere = ModelEntity(mesh: .generateSphere(radius: 0.1))
            content.add(sphere)
        }
        .onChange(of: isRotating) { value in print(value) }
    }
}
"#;

    const MODEL: &str = r#"import Foundation

final class Store {
    var name = ""
}
"#;

    fn terms(report: &ComponentReport, key: &str) -> Vec<String> {
        report
            .components
            .get(key)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_swiftui_gating() {
        let mut analyzer = ComponentAnalyzer::default();
        analyzer.analyze_file(IMMERSIVE, Path::new("/p/ImmersiveView.swift"));
        analyzer.analyze_file(MODEL, Path::new("/p/Store.swift"));
        let report = analyzer.report();

        assert_eq!(terms(&report, "state_property_wrappers"), vec!["@State"]);
        assert_eq!(terms(&report, "state_state_properties"), vec!["@State private var isRotating"]);
        assert!(terms(&report, "update_reality_view")[0].starts_with("RealityView"));
        assert_eq!(report.imports.len(), 1);
        assert!(report.imports["/p/ImmersiveView.swift"].contains("RealityKit"));
    }

    #[test]
    fn test_ungated_families_apply_to_every_file() {
        let mut analyzer = ComponentAnalyzer::default();
        let analysis = analyzer.analyze_file(MODEL, Path::new("/p/Store.swift")).clone();
        assert!(analysis.matches.contains_key("state_flow_state_propagation"));
        assert!(!analysis.matches.keys().any(|k| k.starts_with("ui_")));
    }

    #[test]
    fn test_relationships() {
        let mut analyzer = ComponentAnalyzer::default();
        analyzer.analyze_file(IMMERSIVE, Path::new("/p/ImmersiveView.swift"));
        let report = analyzer.report();

        assert!(report.relationships["state_view_integration"].contains("/p/ImmersiveView.swift"));
        assert!(report.relationships.contains_key("swiftui_realitykit_integration"));
        assert!(!report.relationships.contains_key("state_update_integration"));
    }

    #[test]
    fn test_state_update_integration() {
        let src = "import SwiftUI\nstruct S { @State var x = 1\n func update(context: Ctx) { } }";
        let mut analyzer = ComponentAnalyzer::default();
        analyzer.analyze_file(src, Path::new("/p/S.swift"));
        assert!(analyzer.report().relationships.contains_key("state_update_integration"));
    }

    #[test]
    fn test_realitykit_content_package() {
        let src = "import RealityKit\nstruct SpinSystem: System { }";
        let mut analyzer = ComponentAnalyzer::default();
        analyzer.analyze_file(src, Path::new("/p/RealityKitContent/SpinSystem.swift"));
        let report = analyzer.report();
        assert_eq!(terms(&report, "rcp_system_components"), vec!["struct SpinSystem: System"]);

        let mut other = ComponentAnalyzer::default();
        other.analyze_file(src, Path::new("/p/App/SpinSystem.swift"));
        assert!(terms(&other.report(), "rcp_system_components").is_empty());
    }

    #[test]
    fn test_reanalyzing_replaces_file_record() {
        let mut analyzer = ComponentAnalyzer::default();
        analyzer.analyze_file(MODEL, Path::new("/p/Store.swift"));
        analyzer.analyze_file(MODEL, Path::new("/p/Store.swift"));
        assert_eq!(analyzer.file_analyses().len(), 1);
    }

    #[test]
    fn test_analyze_samples_walks_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("World/World")).unwrap();
        std::fs::write(dir.path().join("World/World/ImmersiveView.swift"), IMMERSIVE).unwrap();
        std::fs::write(dir.path().join("World/World/Store.swift"), MODEL).unwrap();
        std::fs::write(dir.path().join("World/notes.txt"), "import SwiftUI").unwrap();

        let mut analyzer = ComponentAnalyzer::new(dir.path());
        let report = analyzer.analyze_samples(None);
        assert!(!report.is_empty());
        assert_eq!(analyzer.file_analyses().len(), 2);
    }
}
