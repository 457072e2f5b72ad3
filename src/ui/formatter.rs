use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

use crate::analyzers::{DocStatistics, RefinedPattern};
use crate::storage::{CacheInspection, PatternSuggestions, TermHit};
use crate::types::{Census, ProjectResource};

const MAX_CELL: usize = 60;

#[derive(Tabled)]
struct CensusRow {
    #[tabled(rename = "Pattern")]
    pattern: String,
    #[tabled(rename = "Files")]
    count: usize,
    #[tabled(rename = "Example")]
    example: String,
}

#[derive(Tabled)]
struct RefinedRow {
    #[tabled(rename = "Pattern")]
    pattern: String,
    #[tabled(rename = "Terms")]
    terms: usize,
    #[tabled(rename = "Imports")]
    imports: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct TermRow {
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "File")]
    file: String,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Count")]
    count: String,
}

#[derive(Tabled)]
struct SampleRow {
    #[tabled(rename = "Sample")]
    title: String,
    #[tabled(rename = "Downloaded")]
    downloaded: String,
    #[tabled(rename = "Location")]
    location: String,
}

#[derive(Debug, Clone, Default)]
pub struct OutputFormatter;

impl OutputFormatter {
    pub fn new() -> Self {
        Self
    }

    fn render<T: Tabled>(rows: Vec<T>) -> String {
        Table::new(rows).with(Style::rounded()).to_string()
    }

    pub fn format_census(&self, census: &Census) -> String {
        let rows = census
            .iter()
            .map(|(pattern, entry)| CensusRow {
                pattern: pattern.clone(),
                count: entry.count,
                example: entry.examples.first().map(|e| truncate(e)).unwrap_or_default(),
            })
            .collect();
        Self::render::<CensusRow>(rows)
    }

    pub fn format_refined(&self, refined: &BTreeMap<String, RefinedPattern>) -> String {
        let rows = refined
            .iter()
            .map(|(pattern, data)| RefinedRow {
                pattern: pattern.clone(),
                terms: data.detection_terms.len(),
                imports: data.common_imports.iter().cloned().collect::<Vec<_>>().join(", "),
                confidence: format!("{:.2}", data.confidence),
                status: format!("{:?}", data.validation_status),
            })
            .collect();
        Self::render::<RefinedRow>(rows)
    }

    pub fn format_search_results(&self, hits: &[TermHit], query: &str) -> String {
        if hits.is_empty() {
            return format!("No terms matching '{}'", query);
        }
        let rows = hits
            .iter()
            .map(|hit| TermRow {
                term: hit.term.clone(),
                category: hit.category.clone(),
                file: truncate(&hit.file),
            })
            .collect();
        format!("{}\n{} result(s) for '{}'", Self::render::<TermRow>(rows), hits.len(), query)
    }

    pub fn format_counts<'a>(&self, counts: impl IntoIterator<Item = (&'a str, String)>) -> String {
        let rows = counts
            .into_iter()
            .map(|(name, count)| CountRow {
                name: name.to_string(),
                count,
            })
            .collect();
        Self::render::<CountRow>(rows)
    }

    pub fn format_stats(&self, stats: &DocStatistics) -> String {
        let mut out = self.format_counts([
            ("Pages", stats.pages.to_string()),
            ("Pages with examples", stats.pages_with_examples.to_string()),
            ("Code blocks", stats.code_blocks.to_string()),
            ("Topics", stats.topics.to_string()),
            ("Coverage score", format!("{:.2}", stats.coverage_score)),
        ]);
        for (title, table) in [
            ("Frameworks", &stats.frameworks),
            ("Code types", &stats.code_types),
            ("Sections", &stats.sections),
        ] {
            if table.is_empty() {
                continue;
            }
            out.push_str(&format!("\n\n{}\n", title));
            out.push_str(&self.format_counts(table.iter().map(|(k, v)| (k.as_str(), v.to_string()))));
        }
        out
    }

    pub fn format_samples(&self, samples: &[ProjectResource]) -> String {
        let rows = samples
            .iter()
            .map(|s| SampleRow {
                title: truncate(&s.title),
                downloaded: if s.downloaded { "yes" } else { "no" }.to_string(),
                location: s
                    .local_path
                    .as_ref()
                    .map(|p| truncate(&p.display().to_string()))
                    .unwrap_or_else(|| truncate(&s.download_url)),
            })
            .collect();
        Self::render::<SampleRow>(rows)
    }

    pub fn format_cache_inspection(&self, inspection: &CacheInspection) -> String {
        let cached_at = inspection
            .cached_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        let mut out = self.format_counts([
            ("Total samples", inspection.total.to_string()),
            ("Downloaded", inspection.downloaded.to_string()),
            ("Not downloaded", inspection.not_downloaded.to_string()),
            ("Cached at", cached_at),
        ]);
        if !inspection.samples.is_empty() {
            let rows = inspection
                .samples
                .iter()
                .map(|s| SampleRow {
                    title: truncate(&s.title),
                    downloaded: match (s.downloaded, s.path_missing) {
                        (true, true) => "yes (missing)".to_string(),
                        (true, false) => "yes".to_string(),
                        _ => "no".to_string(),
                    },
                    location: s
                        .local_path
                        .as_ref()
                        .map(|p| truncate(&p.display().to_string()))
                        .unwrap_or_default(),
                })
                .collect();
            out.push_str("\n\n");
            out.push_str(&Self::render::<SampleRow>(rows));
        }
        out
    }

    pub fn format_suggestions(&self, suggestions: &PatternSuggestions) -> String {
        if suggestions.is_empty() {
            return "No pattern updates suggested".to_string();
        }
        let mut lines = Vec::new();
        for s in &suggestions.new_patterns {
            lines.push(format!(
                "new pattern    {} ({} occurrences, confidence {:.2})",
                s.kind, s.occurrences, s.confidence
            ));
        }
        for s in &suggestions.pattern_refinements {
            lines.push(format!("refine         {} ({} variations)", s.kind, s.variations));
        }
        for s in &suggestions.relationship_updates {
            lines.push(format!(
                "relationships  {} -> {} (strength {:.2})",
                s.source,
                s.related.join(", "),
                s.strength
            ));
        }
        for s in &suggestions.category_changes {
            lines.push(format!(
                "category       [{}] {} (confidence {:.2})",
                truncate(&s.context),
                s.patterns.join(", "),
                s.confidence
            ));
        }
        lines.join("\n")
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_CELL - 1).collect();
    format!("{}…", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternCensus;

    #[test]
    fn test_census_table() {
        let mut census = Census::new();
        census.insert(
            "animation".into(),
            PatternCensus {
                count: 4,
                files: vec![],
                examples: vec!["withAnimation(.spring) {".into()],
            },
        );
        let table = OutputFormatter::new().format_census(&census);
        assert!(table.contains("animation"));
        assert!(table.contains("withAnimation(.spring) {"));
    }

    #[test]
    fn test_empty_search_results() {
        let out = OutputFormatter::new().format_search_results(&[], "Globe");
        assert_eq!(out, "No terms matching 'Globe'");
    }

    #[test]
    fn test_truncate() {
        let long = "x".repeat(100);
        assert_eq!(truncate(&long).chars().count(), MAX_CELL);
        assert_eq!(truncate("short"), "short");
    }
}
