use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::SystemTime;

use crate::error::{MineError, Result};
use crate::types::FileAnalysis;

#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub items: Vec<T>,
    pub total_matches: usize,
    pub query_duration_ms: u64,
}

impl<T> QueryResult<T> {
    pub fn new(items: Vec<T>, total_matches: usize, query_duration_ms: u64) -> Self {
        Self {
            items,
            total_matches,
            query_duration_ms,
        }
    }
}

/// One matched term in one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct TermHit {
    pub term: String,
    pub category: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternIndexMetadata {
    pub total_files: usize,
    pub total_terms: usize,
    pub total_categories: usize,
    pub total_imports: usize,
    pub last_updated: SystemTime,
}

impl Default for PatternIndexMetadata {
    fn default() -> Self {
        Self {
            total_files: 0,
            total_terms: 0,
            total_categories: 0,
            total_imports: 0,
            last_updated: SystemTime::now(),
        }
    }
}

/// In-memory lookups over per-file pattern matches.
#[derive(Debug, Clone, Default)]
pub struct PatternIndex {
    files: BTreeMap<String, FileAnalysis>,

    term_index: HashMap<String, BTreeSet<String>>,     // term -> file paths
    category_index: HashMap<String, BTreeSet<String>>, // category -> file paths
    import_index: HashMap<String, BTreeSet<String>>,   // module -> file paths

    metadata: PatternIndexMetadata,
    max_files: Option<usize>,
}

impl PatternIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = Some(max_files);
        self
    }

    pub fn from_analyses(analyses: impl IntoIterator<Item = FileAnalysis>) -> Result<Self> {
        let mut index = Self::new();
        for analysis in analyses {
            index.add_file(analysis)?;
        }
        Ok(index)
    }

    /// Add a file's matches, replacing any earlier record for the same path.
    pub fn add_file(&mut self, analysis: FileAnalysis) -> Result<()> {
        if let Some(max) = self.max_files {
            if self.files.len() >= max && !self.files.contains_key(&analysis.path) {
                return Err(MineError::Other(format!("Maximum file limit ({}) reached", max)));
            }
        }

        self.unindex(&analysis.path);

        let path = analysis.path.clone();
        for (category, term) in analysis.terms() {
            self.term_index
                .entry(term.to_string())
                .or_default()
                .insert(path.clone());
            self.category_index
                .entry(category.to_string())
                .or_default()
                .insert(path.clone());
        }
        for module in &analysis.imports {
            self.import_index
                .entry(module.clone())
                .or_default()
                .insert(path.clone());
        }
        self.files.insert(path, analysis);

        self.update_metadata();
        Ok(())
    }

    pub fn remove_file(&mut self, path: &str) -> bool {
        let removed = self.unindex(path);
        if removed {
            self.update_metadata();
        }
        removed
    }

    pub fn get_file(&self, path: &str) -> Option<&FileAnalysis> {
        self.files.get(path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get_metadata(&self) -> &PatternIndexMetadata {
        &self.metadata
    }

    /// Terms matching `pattern`: exact hits when there are any, otherwise
    /// case-insensitive, regex and substring matching over every term.
    pub fn find_term(&self, pattern: &str) -> QueryResult<TermHit> {
        let start_time = std::time::Instant::now();

        let mut results: Vec<TermHit> = match self.term_index.get(pattern) {
            Some(paths) => paths
                .iter()
                .filter_map(|p| self.files.get(p))
                .flat_map(|file| hits_in(file, |term| term == pattern))
                .collect(),
            None => Vec::new(),
        };

        if results.is_empty() {
            let regex = looks_like_regex(pattern)
                .then(|| Regex::new(pattern).ok())
                .flatten();
            results = self
                .files
                .values()
                .flat_map(|file| hits_in(file, |term| matches_pattern(term, pattern, regex.as_ref())))
                .collect();
        }

        let len = results.len();
        QueryResult::new(results, len, start_time.elapsed().as_millis() as u64)
    }

    pub fn find_term_with_options(&self, pattern: &str, limit: usize, fuzzy: bool) -> Vec<TermHit> {
        if fuzzy {
            let ranked: Vec<String> = self
                .fuzzy_search(pattern, Some(limit))
                .into_iter()
                .map(|(term, _)| term)
                .collect();
            let mut hits: Vec<TermHit> = ranked
                .iter()
                .flat_map(|term| self.find_term(term).items.into_iter().filter(move |h| &h.term == term))
                .collect();
            hits.truncate(limit);
            hits
        } else {
            self.find_term(pattern).items.into_iter().take(limit).collect()
        }
    }

    pub fn files_in_category(&self, category: &str) -> Vec<&str> {
        self.category_index
            .get(category)
            .map(|paths| paths.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn files_importing(&self, module: &str) -> Vec<&str> {
        self.import_index
            .get(module)
            .map(|paths| paths.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn categories(&self) -> BTreeSet<&str> {
        self.category_index.keys().map(String::as_str).collect()
    }

    /// Distinct terms ranked by skim score, best first.
    pub fn fuzzy_search(&self, query: &str, limit: Option<usize>) -> Vec<(String, f64)> {
        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(String, f64)> = self
            .term_index
            .keys()
            .filter_map(|term| {
                matcher
                    .fuzzy_match(term, query)
                    .map(|score| (term.clone(), score as f64))
            })
            .collect();

        results.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        results
    }

    fn unindex(&mut self, path: &str) -> bool {
        let Some(old) = self.files.remove(path) else {
            return false;
        };
        for (category, term) in old.terms() {
            drop_path(&mut self.term_index, term, path);
            drop_path(&mut self.category_index, category, path);
        }
        for module in &old.imports {
            drop_path(&mut self.import_index, module, path);
        }
        true
    }

    fn update_metadata(&mut self) {
        self.metadata = PatternIndexMetadata {
            total_files: self.files.len(),
            total_terms: self.term_index.len(),
            total_categories: self.category_index.len(),
            total_imports: self.import_index.len(),
            last_updated: SystemTime::now(),
        };
    }
}

fn hits_in<'a>(file: &'a FileAnalysis, keep: impl Fn(&str) -> bool + 'a) -> impl Iterator<Item = TermHit> + 'a {
    file.terms()
        .filter(move |(_, term)| keep(term))
        .map(move |(category, term)| TermHit {
            term: term.to_string(),
            category: category.to_string(),
            file: file.path.clone(),
        })
}

fn drop_path(index: &mut HashMap<String, BTreeSet<String>>, key: &str, path: &str) {
    if let Some(paths) = index.get_mut(key) {
        paths.remove(path);
        if paths.is_empty() {
            index.remove(key);
        }
    }
}

fn looks_like_regex(pattern: &str) -> bool {
    pattern.contains(['*', '^', '$', '[', ']', '(', ')', '{', '}', '|', '+', '?', '\\'])
}

fn matches_pattern(text: &str, pattern: &str, regex: Option<&Regex>) -> bool {
    if text == pattern || text.to_lowercase() == pattern.to_lowercase() {
        return true;
    }
    if let Some(regex) = regex {
        return regex.is_match(text);
    }
    text.to_lowercase().contains(&pattern.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(path: &str, imports: &[&str], matches: &[(&str, &str)]) -> FileAnalysis {
        let mut file = FileAnalysis::new(path);
        file.imports = imports.iter().map(|s| s.to_string()).collect();
        for (category, term) in matches {
            file.add_match(category, *term);
        }
        file
    }

    fn sample_index() -> PatternIndex {
        PatternIndex::from_analyses(vec![
            analysis(
                "/p/ContentView.swift",
                &["SwiftUI"],
                &[("ui_views", "ContentView"), ("ui_state", "isPresented")],
            ),
            analysis(
                "/p/Immersive.swift",
                &["SwiftUI", "RealityKit"],
                &[("ui_views", "ImmersiveView"), ("component_entity", "ModelEntity")],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_and_fallback_matching() {
        let index = sample_index();

        let exact = index.find_term("ContentView");
        assert_eq!(exact.total_matches, 1);
        assert_eq!(exact.items[0].category, "ui_views");

        assert_eq!(index.find_term("contentview").total_matches, 1);
        assert_eq!(index.find_term("View").total_matches, 2);
        assert_eq!(index.find_term("^Model.*").items[0].term, "ModelEntity");
        assert_eq!(index.find_term("Nothing").total_matches, 0);
    }

    #[test]
    fn test_category_and_import_lookups() {
        let index = sample_index();
        assert_eq!(index.files_in_category("ui_views").len(), 2);
        assert_eq!(index.files_importing("RealityKit"), vec!["/p/Immersive.swift"]);
        assert!(index.files_importing("ARKit").is_empty());
        assert_eq!(index.categories().len(), 3);
    }

    #[test]
    fn test_readding_replaces_record() {
        let mut index = sample_index();
        index
            .add_file(analysis("/p/ContentView.swift", &["SwiftUI"], &[("ui_views", "MainView")]))
            .unwrap();

        assert_eq!(index.file_count(), 2);
        assert!(index.find_term("ContentView").items.is_empty());
        assert!(index.files_in_category("ui_state").is_empty());
        assert_eq!(index.get_metadata().total_terms, 3);

        assert!(index.remove_file("/p/ContentView.swift"));
        assert!(!index.remove_file("/p/ContentView.swift"));
        assert_eq!(index.get_metadata().total_files, 1);
    }

    #[test]
    fn test_max_files_limit() {
        let mut index = PatternIndex::new().with_max_files(1);
        index.add_file(analysis("/a.swift", &[], &[])).unwrap();
        index.add_file(analysis("/a.swift", &[], &[])).unwrap();
        assert!(index.add_file(analysis("/b.swift", &[], &[])).is_err());
    }

    #[test]
    fn test_fuzzy_search() {
        let index = sample_index();
        let results = index.fuzzy_search("immview", Some(5));
        assert_eq!(results[0].0, "ImmersiveView");

        let hits = index.find_term_with_options("immview", 1, true);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file, "/p/Immersive.swift");
    }
}
