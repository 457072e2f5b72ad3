use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::{MineError, Result};
use crate::storage::{load_json, DiscoveredPattern, PatternEvolution, PatternSuggestions};
use crate::types::{CodeBlock, DocumentationPage};

/// Every `extracted_*.json` page under `dir`, sorted by file name.
/// Unreadable files are logged and skipped.
pub fn load_extracted_pages(dir: &Path) -> Vec<DocumentationPage> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("extracted_") && n.ends_with(".json"))
                    .unwrap_or(false)
            })
            .collect(),
        Err(e) => {
            warn!("No extracted pages in {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    files.sort();

    files
        .iter()
        .filter_map(|path| match load_json::<Option<DocumentationPage>>(path) {
            Ok(page) => page,
            Err(e) => {
                error!("Error loading {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

/// Pages from the newest `visionos_documentation_*.json` in `dir`.
pub fn load_latest_documentation(dir: &Path) -> Result<Vec<DocumentationPage>> {
    let latest = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("visionos_documentation_") && n.ends_with(".json"))
                .unwrap_or(false)
        })
        .max()
        .ok_or_else(|| MineError::NotFound(format!("documentation files in {}", dir.display())))?;

    info!("Loading documentation from {}", latest.display());
    load_json(&latest)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocStatistics {
    pub pages: usize,
    pub pages_with_examples: usize,
    pub code_blocks: usize,
    pub topics: usize,
    pub frameworks: BTreeMap<String, usize>,
    pub code_types: BTreeMap<String, usize>,
    pub sections: BTreeMap<String, usize>,
    /// 1.0 minus weighted shares of pages missing a description (0.4),
    /// examples (0.4) or parameters (0.2).
    pub coverage_score: f64,
}

pub fn statistics(pages: &[DocumentationPage]) -> DocStatistics {
    let mut stats = DocStatistics {
        pages: pages.len(),
        ..Default::default()
    };
    let (mut no_description, mut no_examples, mut no_parameters) = (0usize, 0usize, 0usize);

    for page in pages {
        stats.code_blocks += page.code_blocks.len();
        stats.topics += page.topics.len();
        *stats.sections.entry(page.section.clone()).or_insert(0) += 1;
        if page.has_examples() {
            stats.pages_with_examples += 1;
        } else {
            no_examples += 1;
        }
        if page.description.as_deref().map(str::is_empty).unwrap_or(true) {
            no_description += 1;
        }
        if !page.has_parameters() {
            no_parameters += 1;
        }
        for block in &page.code_blocks {
            *stats.code_types.entry(block.kind.to_string()).or_insert(0) += 1;
            for framework in &block.frameworks {
                *stats.frameworks.entry(framework.clone()).or_insert(0) += 1;
            }
        }
    }

    if !pages.is_empty() {
        let total = pages.len() as f64;
        let missing = 0.4 * no_description as f64 / total
            + 0.4 * no_examples as f64 / total
            + 0.2 * no_parameters as f64 / total;
        stats.coverage_score = (1.0 - missing).clamp(0.0, 1.0);
    }
    stats
}

/// Feeds documentation code blocks into [`PatternEvolution`].
#[derive(Debug)]
pub struct DocumentationAnalyzer {
    evolution: PatternEvolution,
}

impl DocumentationAnalyzer {
    pub fn new(knowledge_dir: &Path) -> Result<Self> {
        Ok(Self {
            evolution: PatternEvolution::new(knowledge_dir)?,
        })
    }

    pub fn discovery_for(block: &CodeBlock) -> DiscoveredPattern {
        DiscoveredPattern {
            kind: block.kind.to_string(),
            implementation: block.first_line().to_string(),
            context: block.description.clone().unwrap_or_default(),
            related_patterns: block.frameworks.iter().cloned().collect(),
        }
    }

    pub fn analyze_page(&mut self, page: &DocumentationPage) -> Result<usize> {
        for block in &page.code_blocks {
            self.evolution.record_pattern_discovery(&Self::discovery_for(block))?;
        }
        Ok(page.code_blocks.len())
    }

    /// Record every code block; returns the number recorded.
    pub fn analyze_pages(&mut self, pages: &[DocumentationPage]) -> usize {
        let mut recorded = 0;
        for page in pages {
            match self.analyze_page(page) {
                Ok(n) => recorded += n,
                Err(e) => error!("Error analyzing {}: {}", page.url, e),
            }
        }
        info!("Recorded {} code patterns from {} pages", recorded, pages.len());
        recorded
    }

    pub fn suggestions(&self) -> PatternSuggestions {
        self.evolution.suggest_pattern_updates()
    }

    pub fn evolution(&self) -> &PatternEvolution {
        &self.evolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::save_json;
    use crate::types::CodeKind;
    use tempfile::TempDir;

    fn page(url: &str, blocks: Vec<CodeBlock>) -> DocumentationPage {
        let mut page = DocumentationPage::new("Creating an immersive space", url);
        page.code_blocks = blocks;
        page
    }

    fn block(code: &str, kind: CodeKind, description: &str) -> CodeBlock {
        let mut block = CodeBlock::new(code);
        block.kind = kind;
        block.description = Some(description.to_string());
        block.frameworks.insert("SwiftUI".to_string());
        block
    }

    #[test]
    fn test_records_one_discovery_per_block() {
        let dir = TempDir::new().unwrap();
        let mut analyzer = DocumentationAnalyzer::new(dir.path()).unwrap();
        let pages = vec![page(
            "https://developer.apple.com/documentation/visionos/a",
            vec![
                block("\n\nImmersiveSpace(id: \"s\") {\n}", CodeKind::ImmersiveSpace, "Declare a space"),
                block("openImmersiveSpace(id: \"s\")", CodeKind::ImmersiveSpace, "Open it"),
            ],
        )];

        assert_eq!(analyzer.analyze_pages(&pages), 2);
        let record = &analyzer.evolution().history().patterns["immersive_space"];
        assert_eq!(record.occurrences, 2);
        assert!(record.variations.contains("ImmersiveSpace(id: \"s\") {"));
        assert!(record.related_patterns.contains("SwiftUI"));
        assert_eq!(analyzer.suggestions().pattern_refinements.len(), 1);
    }

    #[test]
    fn test_load_extracted_pages_skips_other_files() {
        let dir = TempDir::new().unwrap();
        save_json(&dir.path().join("extracted_b.json"), &page("https://x/b", vec![])).unwrap();
        save_json(&dir.path().join("extracted_a.json"), &page("https://x/a", vec![])).unwrap();
        std::fs::write(dir.path().join("extracted_bad.json"), "{").unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let pages = load_extracted_pages(dir.path());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].url, "https://x/a");
        assert!(load_extracted_pages(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn test_load_latest_documentation() {
        let dir = TempDir::new().unwrap();
        assert!(load_latest_documentation(dir.path()).is_err());
        save_json(&dir.path().join("visionos_documentation_20240101_000000.json"), &vec![page("https://x/old", vec![])])
            .unwrap();
        save_json(&dir.path().join("visionos_documentation_20240102_000000.json"), &vec![page("https://x/new", vec![])])
            .unwrap();
        let pages = load_latest_documentation(dir.path()).unwrap();
        assert_eq!(pages[0].url, "https://x/new");
    }

    #[test]
    fn test_statistics() {
        let mut with_code = page("https://x/a", vec![block("RealityView { }", CodeKind::ThreeDContent, "")]);
        with_code.description = Some("Add 3D content".to_string());
        let empty = page("https://x/b", vec![]);

        let stats = statistics(&[with_code, empty]);
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.code_blocks, 1);
        assert_eq!(stats.pages_with_examples, 1);
        assert_eq!(stats.frameworks["SwiftUI"], 1);
        assert_eq!(stats.code_types["3d_content"], 1);
        assert!((stats.coverage_score - 0.4).abs() < 1e-9);
        assert_eq!(statistics(&[]).coverage_score, 0.0);
    }
}
