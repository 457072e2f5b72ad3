use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::scanner::SourceScanner;

const BLOCK_CONTEXT_LINES: usize = 15;
const PATTERN_CONTEXT_LINES: usize = 3;

static NAMED_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"@Observable\s+class\s+(\w+)", "Observable Class Pattern"),
        (r"RealityView\s*\{[^}]+\}", "RealityView Pattern"),
        (r"ImmersiveSpace\s*\{[^}]+\}", "ImmersiveSpace Pattern"),
        (r"@Model\s+class\s+(\w+)", "Model Class Pattern"),
        (r"Entity\s*\{[^}]+\}", "Entity Pattern"),
        (r"WindowGroup\s*\{[^}]+\}", "WindowGroup Pattern"),
    ]
    .into_iter()
    .map(|(pattern, name)| (Regex::new(pattern).unwrap(), name))
    .collect()
});

static SUBSCRIPTION_CONTAINER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(var|let)\s+\w+\s*:\s*(\[|\{).*EventSubscription").unwrap());

/// A group of matching lines from one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternHit {
    pub file: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub context: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectReport {
    pub patterns: BTreeMap<String, Vec<PatternHit>>,
    pub usage: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectStructure {
    pub main_files: Vec<String>,
    pub view_files: Vec<String>,
    pub model_files: Vec<String>,
    pub helper_files: Vec<String>,
    pub resources: Vec<String>,
    pub dependencies: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodePattern {
    pub name: String,
    pub file_path: String,
    pub line_number: usize,
    pub code_snippet: String,
    pub dependencies: Vec<String>,
    pub usage_context: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiUsage {
    pub container_types: BTreeMap<String, String>,
    pub method_usage: BTreeMap<String, BTreeSet<String>>,
}

/// Line-oriented analysis of a single downloaded sample project.
pub struct ProjectAnalyzer {
    project_path: PathBuf,
    scanner: SourceScanner,
}

impl ProjectAnalyzer {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            scanner: SourceScanner::swift(),
        }
    }

    fn swift_sources(&self) -> Vec<(String, String)> {
        self.scanner
            .scan(&self.project_path)
            .into_iter()
            .filter_map(|path| match std::fs::read_to_string(&path) {
                Ok(content) => Some((self.relative(&path), content)),
                Err(e) => {
                    error!("Error reading {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.project_path)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    /// Animation state machines, transform rotations and event subscriptions
    /// in files that mention RealityKit.
    pub fn analyze_project(&self) -> ProjectReport {
        let sources = self.swift_sources();
        info!("Found {} Swift files", sources.len());

        let mut report = ProjectReport::default();
        for kind in ["3d_content", "animation", "transforms", "ui_components"] {
            report.patterns.insert(kind.to_string(), Vec::new());
        }

        for (file, content) in &sources {
            if !content.contains("RealityKit") {
                continue;
            }
            let name = Path::new(file)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.clone());
            debug!("Analyzing {}", name);

            record_lines(&mut report, content, &name, "animation", "state_machine", "animation_state_machine", |line| {
                line.contains("AnimationState")
            });
            if content.contains("transform") {
                record_lines(&mut report, content, &name, "transforms", "rotation", "transform_rotation", |line| {
                    line.contains("transform") && (line.contains("rotation") || line.contains("simd_quatf"))
                });
            }
            if content.contains("subscribe") {
                record_lines(&mut report, content, &name, "ui_components", "subscription", "event_subscription", |line| {
                    line.contains("subscribe")
                });
            }
        }
        report
    }

    /// Classify files: `*App.swift` is main, then View, then Model/Data,
    /// else helper. Non-Swift files are resources.
    pub fn structure(&self) -> ProjectStructure {
        let mut structure = ProjectStructure::default();

        for entry in WalkDir::new(&self.project_path).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = self.relative(entry.path());
            if !relative.ends_with(".swift") {
                structure.resources.push(relative);
                continue;
            }

            match std::fs::read_to_string(entry.path()) {
                Ok(content) => structure.dependencies.extend(dependencies_of(&content)),
                Err(e) => error!("Error reading {}: {}", entry.path().display(), e),
            }

            if relative.contains("App.swift") {
                structure.main_files.push(relative);
            } else if relative.contains("View") {
                structure.view_files.push(relative);
            } else if relative.contains("Model") || relative.contains("Data") {
                structure.model_files.push(relative);
            } else {
                structure.helper_files.push(relative);
            }
        }

        for list in [
            &mut structure.main_files,
            &mut structure.view_files,
            &mut structure.model_files,
            &mut structure.helper_files,
            &mut structure.resources,
        ] {
            list.sort();
        }
        structure
    }

    /// Per-line matches of the named visionOS idioms, with ±3 lines of context.
    pub fn code_patterns(&self) -> Vec<CodePattern> {
        let mut found = Vec::new();
        for (file, content) in self.swift_sources() {
            let dependencies: Vec<String> = dependencies_of(&content).into_iter().collect();
            let lines: Vec<&str> = content.lines().collect();

            for (index, line) in lines.iter().enumerate() {
                for (regex, name) in NAMED_PATTERNS.iter() {
                    if regex.is_match(line) {
                        found.push(CodePattern {
                            name: name.to_string(),
                            file_path: file.clone(),
                            line_number: index + 1,
                            code_snippet: line.trim().to_string(),
                            dependencies: dependencies.clone(),
                            usage_context: context_around(&lines, index, PATTERN_CONTEXT_LINES),
                        });
                    }
                }
            }
        }
        found
    }

    /// View files ordered with scene roots (WindowGroup or ImmersiveSpace) first.
    pub fn view_hierarchy(&self) -> Vec<String> {
        let mut roots = Vec::new();
        let mut children = Vec::new();
        for view in self.structure().view_files {
            let content = std::fs::read_to_string(self.project_path.join(&view)).unwrap_or_default();
            if content.contains("WindowGroup") || content.contains("ImmersiveSpace") {
                roots.push(view);
            } else {
                children.push(view);
            }
        }
        roots.extend(children);
        roots
    }

    /// [`analyze_api_patterns`] for each Swift file that uses either API.
    pub fn api_usage(&self) -> BTreeMap<String, ApiUsage> {
        self.swift_sources()
            .into_iter()
            .map(|(file, content)| (file, analyze_api_patterns(&content)))
            .filter(|(_, usage)| !usage.container_types.is_empty() || !usage.method_usage.is_empty())
            .collect()
    }
}

/// How EventSubscription is stored and how quaternions are combined.
pub fn analyze_api_patterns(content: &str) -> ApiUsage {
    let mut usage = ApiUsage::default();

    if content.contains("EventSubscription") {
        if let Some(caps) = SUBSCRIPTION_CONTAINER.captures(content) {
            let container = if &caps[2] == "[" { "Array" } else { "Set" };
            usage
                .container_types
                .insert("EventSubscription".to_string(), container.to_string());
        }
    }

    for line in content.lines().filter(|l| l.contains("simd_quatf")) {
        if line.contains('*') {
            usage
                .method_usage
                .entry("quaternion".to_string())
                .or_default()
                .insert("multiplication".to_string());
        }
        if line.contains("concatenated") {
            usage
                .method_usage
                .entry("quaternion".to_string())
                .or_default()
                .insert("concatenation".to_string());
        }
    }
    usage
}

fn dependencies_of(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("import"))
        .filter_map(|l| l.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

fn context_around(lines: &[&str], index: usize, radius: usize) -> String {
    let start = index.saturating_sub(radius);
    let end = (index + radius + 1).min(lines.len());
    lines[start..end].join("\n")
}

fn record_lines(
    report: &mut ProjectReport,
    content: &str,
    file: &str,
    category: &str,
    kind: &str,
    usage_key: &str,
    matches: impl Fn(&str) -> bool,
) {
    let lines: Vec<&str> = content.lines().collect();
    let hits: Vec<(usize, &str)> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| (i, l.trim()))
        .filter(|(_, l)| !l.starts_with("//") && matches(*l))
        .collect();

    let Some(&(first, _)) = hits.first() else {
        return;
    };

    *report.usage.entry(usage_key.to_string()).or_insert(0) += 1;
    report
        .patterns
        .entry(category.to_string())
        .or_default()
        .push(PatternHit {
            file: file.to_string(),
            kind: kind.to_string(),
            content: hits.iter().map(|(_, l)| *l).collect::<Vec<_>>().join("\n"),
            context: context_around(&lines, first, BLOCK_CONTEXT_LINES),
        });
}
