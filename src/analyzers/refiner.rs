use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::catalog::imports_of;
use crate::error::Result;
use crate::storage::{load_json, save_json};
use crate::types::{Census, PatternCensus};

const EXAMPLES_PER_TYPE: usize = 3;

static COMPONENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:struct|class)\s+(\w+)(?::\s*\w+)?").unwrap());

/// Detection regexes per pattern type.
static TERM_PATTERNS: Lazy<BTreeMap<&'static str, Vec<Regex>>> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        ("animation", &[r"(?:withAnimation|animation|transition|\.animate)", r"Animation[A-Z]\w+"]),
        (
            "3d_content",
            &[
                r"(?:Entity|Model3D|RealityView|Scene3D)",
                r#"\.load\(["'].*\.usd[z]?["']"#,
                r"Material|Shader|Texture",
            ],
        ),
        (
            "arkit",
            &[
                r"(?:ARKit|ARSession|ARConfiguration)",
                r"(?:anchor|AnchorEntity|WorldTracking)",
                r"SceneReconstruction|PlaneDetection",
            ],
        ),
        (
            "spatial_audio",
            &[
                r"(?:SpatialAudio|AudioEngine|Sound3D)",
                r"\.playAudio|\.spatial\.audio",
                r"AudioComponent|SoundEffect",
            ],
        ),
        (
            "immersive_spaces",
            &[r"(?:ImmersiveSpace|WindowGroup)", r"\.immersive|\.fullspace", r"ImmersionStyle|SpaceStyle"],
        ),
        (
            "ui_components",
            &[
                r"(?:struct|class)\s+(\w+)(?::\s*View)",
                r"(?:Text|NavigationStack|RealityView|View)\b",
                r"struct\s+(\w+View)\b",
            ],
        ),
        (
            "scene_understanding",
            &[
                r"(?:SceneUnderstanding|SceneReconstruction)",
                r"(?:PlaneAnchor|MeshAnchor|PointCloud)",
                r"\.sceneReconstruction|\.planeDetection",
            ],
        ),
        (
            "gestures",
            &[
                r"(?:SpatialTapGesture|DragGesture|TapGesture|MagnifyGesture|RotateGesture3D|LongPressGesture)\b",
                r"\.(?:gesture|onTapGesture|targetedToAnyEntity|targetedToEntity)\b",
                r"(?:SpatialGesture|HandGesture|EyeGesture|HeadGesture)\b",
            ],
        ),
    ];
    table
        .iter()
        .map(|(kind, patterns)| (*kind, patterns.iter().map(|p| Regex::new(p).unwrap()).collect()))
        .collect()
});

struct ValidationRule {
    required: &'static [&'static str],
    optional: &'static [&'static str],
    imports: &'static [&'static str],
}

fn validation_rule(pattern_type: &str) -> Option<ValidationRule> {
    let rule = match pattern_type {
        "animation" => ValidationRule {
            required: &["Animation", "animate"],
            optional: &["transition", "withAnimation"],
            imports: &["SwiftUI"],
        },
        "3d_content" => ValidationRule {
            required: &["Entity", "Model3D"],
            optional: &["RealityView", "Scene3D"],
            imports: &["RealityKit"],
        },
        "arkit" => ValidationRule {
            required: &["ARKit", "ARSession"],
            optional: &["anchor", "WorldTracking"],
            imports: &["ARKit"],
        },
        "scene_understanding" => ValidationRule {
            required: &["SceneUnderstanding", "Anchor"],
            optional: &["PlaneDetection", "MeshAnchor"],
            imports: &["ARKit", "RealityKit"],
        },
        _ => return None,
    };
    Some(rule)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    NeedsReview,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsagePatterns {
    pub terms: BTreeSet<String>,
    pub imports: BTreeSet<String>,
    pub components: BTreeSet<String>,
}

impl UsagePatterns {
    fn as_text(&self) -> String {
        self.terms
            .iter()
            .chain(&self.imports)
            .chain(&self.components)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefinedPattern {
    pub detection_terms: BTreeSet<String>,
    pub common_imports: BTreeSet<String>,
    pub related_components: BTreeSet<String>,
    pub frequency: usize,
    pub confidence: f64,
    pub source_files: usize,
    pub validation_status: ValidationStatus,
}

/// Refines pattern types against the source files they were detected in
/// and writes `refined_patterns.json`.
#[derive(Debug, Clone)]
pub struct PatternRefiner {
    knowledge_dir: PathBuf,
    confidence_threshold: f64,
}

impl PatternRefiner {
    pub fn new(knowledge_dir: impl Into<PathBuf>, confidence_threshold: f64) -> Self {
        Self {
            knowledge_dir: knowledge_dir.into(),
            confidence_threshold,
        }
    }

    fn refined_path(&self) -> PathBuf {
        self.knowledge_dir.join("refined_patterns.json")
    }

    /// Count, per pattern type, the files in which that type's terms occur.
    pub fn census(&self, files: &[PathBuf], pattern_types: &[String]) -> Census {
        let mut census: Census = pattern_types
            .iter()
            .map(|kind| (kind.clone(), PatternCensus::default()))
            .collect();

        for file in files {
            let content = match std::fs::read_to_string(file) {
                Ok(content) => content,
                Err(e) => {
                    error!("Error reading {}: {}", file.display(), e);
                    continue;
                }
            };

            for (kind, entry) in census.iter_mut() {
                let terms = extract_pattern_terms(&content, kind);
                if terms.is_empty() {
                    continue;
                }
                entry.count += 1;
                entry.files.push(file.to_string_lossy().to_string());
                let room = EXAMPLES_PER_TYPE.saturating_sub(entry.examples.len());
                entry.examples.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|line| terms.iter().any(|t| line.contains(t.as_str())))
                        .take(room)
                        .map(str::to_string),
                );
            }
        }

        for (kind, entry) in &census {
            debug!("Census {}: {} files", kind, entry.count);
        }
        census
    }

    pub fn analyze_existing_patterns(&self, pattern_data: &Census) -> Result<BTreeMap<String, RefinedPattern>> {
        info!("Starting pattern refinement analysis...");
        let mut refined = BTreeMap::new();

        for (pattern_type, data) in pattern_data {
            info!("Refining pattern: {}", pattern_type);
            debug!("Found {} files for {}", data.files.len(), pattern_type);

            let usage = extract_usage_patterns(&data.files, pattern_type);
            let confidence = validate_pattern(pattern_type, &usage.as_text());
            info!("Pattern confidence: {:.2}", confidence);
            debug!("Detection terms: {:?}", usage.terms);
            debug!("Common imports: {:?}", usage.imports);
            debug!("Related components: {:?}", usage.components);

            let status = if confidence >= self.confidence_threshold {
                ValidationStatus::Valid
            } else {
                ValidationStatus::NeedsReview
            };
            info!("Refined {}: {} terms found", pattern_type, usage.terms.len());

            refined.insert(
                pattern_type.clone(),
                RefinedPattern {
                    detection_terms: usage.terms,
                    common_imports: usage.imports,
                    related_components: usage.components,
                    frequency: data.count,
                    confidence,
                    source_files: data.files.len(),
                    validation_status: status,
                },
            );
        }

        save_json(&self.refined_path(), &refined)?;
        info!("Saved refined patterns to {}", self.refined_path().display());

        info!("Pattern Refinement Summary:");
        for (pattern_type, data) in &refined {
            info!(
                "{}: terms={} confidence={:.2} status={:?}",
                pattern_type,
                data.detection_terms.len(),
                data.confidence,
                data.validation_status
            );
        }
        Ok(refined)
    }

    pub fn refined_patterns(&self) -> Result<BTreeMap<String, RefinedPattern>> {
        load_json(&self.refined_path())
    }
}

fn findall<'a>(regex: &'a Regex, content: &'a str) -> impl Iterator<Item = String> + 'a {
    let grouped = regex.captures_len() > 1;
    regex.captures_iter(content).filter_map(move |caps| {
        let m = if grouped { caps.get(1) } else { caps.get(0) };
        m.map(|m| m.as_str().to_string())
    })
}

/// Type-specific terms found in `content`; empty for types without
/// detection regexes.
pub fn extract_pattern_terms(content: &str, pattern_type: &str) -> BTreeSet<String> {
    TERM_PATTERNS
        .get(pattern_type)
        .map(|patterns| patterns.iter().flat_map(|re| findall(re, content)).collect())
        .unwrap_or_default()
}

pub fn extract_usage_patterns(files: &[String], pattern_type: &str) -> UsagePatterns {
    let mut usage = UsagePatterns::default();
    for file in files {
        let path = Path::new(file);
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => {
                usage.imports.extend(imports_of(&content));
                usage.components.extend(findall(&COMPONENTS, &content));
                usage.terms.extend(extract_pattern_terms(&content, pattern_type));
            }
            Err(e) => error!("Error processing file {}: {}", file, e),
        }
    }
    usage
}

/// Rule-table score for `content`: 0.6 × required share, 0.3 × optional
/// share and 0.1 × `import X` share, capped at 1. Types without a rule
/// score 0.5.
pub fn validate_pattern(pattern_type: &str, content: &str) -> f64 {
    let Some(rule) = validation_rule(pattern_type) else {
        return 0.5;
    };

    let share = |terms: &[&str], present: &dyn Fn(&str) -> bool| {
        terms.iter().filter(|t| present(t)).count() as f64 / terms.len() as f64
    };
    let mentioned = |t: &str| content.contains(t);
    let imported = |m: &str| content.contains(&format!("import {}", m));
    let score = 0.6 * share(rule.required, &mentioned)
        + 0.3 * share(rule.optional, &mentioned)
        + 0.1 * share(rule.imports, &imported);
    score.min(1.0)
}

pub fn calculate_confidence(usage: &UsagePatterns) -> f64 {
    if usage.terms.is_empty() {
        return 0.0;
    }
    let term_score = (usage.terms.len() as f64 / 3.0).min(1.0);
    let import_score = (usage.imports.len() as f64 / 2.0).min(1.0);
    let component_score = (usage.components.len() as f64).min(1.0);
    (term_score * 0.6 + import_score * 0.3 + component_score * 0.2).min(1.0)
}
