use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::{
    analyzers::{
        docs::{load_extracted_pages, load_latest_documentation, statistics},
        ComponentAnalyzer, DocumentationAnalyzer, PatternRefiner, ProjectAnalyzer, TopicAnalyzer,
    },
    cli_types::{
        AnalyzeArgs, CacheAction, CleanArgs, Commands, CrawlArgs, DiscoverArgs, SamplesArgs, ScrapeArgs,
        SearchArgs, ToolArgs, TopicsArgs,
    },
    config::MineConfig,
    crawler::{DocumentationScraper, DocumentationUrlCollector},
    scanner::SourceScanner,
    storage::{CacheManager, EnhancedKnowledgeBase, KnowledgeBase, PatternIndex, RelationshipTracker},
    tools::KnowledgeTools,
    types::{DocumentationPage, FileAnalysis, LinkCategory},
    ui::{progress::format_duration, UIManager},
};

/// Fold command-line flags that change library behaviour into the config
/// before the app is built.
pub fn apply_command_overrides(config: &mut MineConfig, command: &Commands) {
    match command {
        Commands::Crawl(args) => {
            if args.max_pages.is_some() {
                config.crawl.max_pages = args.max_pages;
            }
        }
        Commands::Samples(args) => {
            config.samples.test_mode |= args.test_mode;
            config.samples.force_download |= args.force;
            config.samples.skip_downloads |= args.skip_downloads;
            if let Some(count) = args.count {
                config.samples.test_sample_count = count;
            }
            if let Some(strategy) = args.strategy {
                config.samples.strategy = strategy;
            }
        }
        _ => {}
    }
}

pub struct CliApp {
    config: MineConfig,
    cache: Arc<CacheManager>,
    scraper: DocumentationScraper,
    verbose: bool,
    ui: UIManager,
}

impl CliApp {
    pub fn new(config: MineConfig, verbose: bool, colors_enabled: bool) -> Result<Self> {
        info!("Initializing visionmine");
        let ui = UIManager::new(colors_enabled);

        let cache = CacheManager::new(config.storage.clone()).context("Failed to prepare data directories")?;
        let scraper = DocumentationScraper::new(&config).context("Failed to create documentation scraper")?;

        Ok(Self {
            config,
            cache: Arc::new(cache),
            scraper,
            verbose,
            ui,
        })
    }

    /// Flag shared with the scraper; clearing it stops a running crawl.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.scraper.stop_handle()
    }

    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Discover(args) => self.discover(args).await,
            Commands::Scrape(args) => self.scrape(args).await,
            Commands::Crawl(args) => self.crawl(args).await,
            Commands::Samples(args) => self.samples(args).await,
            Commands::Analyze(args) => self.analyze(args).await,
            Commands::Search(args) => self.search(args).await,
            Commands::Stats => self.stats().await,
            Commands::Topics(args) => self.topics(args).await,
            Commands::Evolution => self.evolution().await,
            Commands::Tools => self.list_tools().await,
            Commands::Tool(args) => self.run_tool(args).await,
            Commands::Cache { action } => self.cache(action).await,
            Commands::ShowConfig => self.show_config().await,
            Commands::Clean(args) => self.clean(args).await,
        }
    }

    fn collector(&self) -> Result<DocumentationUrlCollector> {
        DocumentationUrlCollector::new(&self.config, Arc::clone(&self.cache))
            .context("Failed to create documentation collector")
    }

    fn urls_or_defaults(&self, urls: Vec<String>) -> Vec<String> {
        if urls.is_empty() {
            self.config.crawl.base_urls.clone()
        } else {
            urls
        }
    }

    pub async fn discover(&self, args: DiscoverArgs) -> Result<()> {
        self.ui.print_header("Link Discovery");
        let collector = self.collector()?;
        let start_time = Instant::now();

        for url in self.urls_or_defaults(args.urls) {
            let spinner = self.ui.progress.spinner(&format!("Collecting links from {}", url));
            let links = collector.get_documentation_links(&url).await;
            spinner.finish();

            self.ui.print_success(&format!("{}: {} links", url, links.total_links()));
            let counts: Vec<(&str, String)> = LinkCategory::ALL
                .iter()
                .map(|category| (category.as_str(), links.links_in(*category).count().to_string()))
                .chain(std::iter::once(("sample projects", links.samples.len().to_string())))
                .collect();
            println!("{}", self.ui.formatter.format_counts(counts));

            if args.structure {
                let structure = collector.analyze_documentation_structure(&url).await;
                self.ui.print_field("Sections", structure.sections);
                self.ui.print_field("Topics", structure.topics);
                self.ui.print_field("Samples", structure.samples);
            }
        }

        if self.verbose {
            self.ui.print_info(&format!("Discovery took {}", format_duration(start_time.elapsed())));
        }
        Ok(())
    }

    pub async fn scrape(&self, args: ScrapeArgs) -> Result<()> {
        self.ui.print_header("Scrape");
        let urls = self.urls_or_defaults(args.urls);
        let progress = self.ui.progress.create_progress(urls.len() as u64, "Scraping pages");

        let mut pages = Vec::new();
        for (i, url) in urls.iter().enumerate() {
            progress.set_message(url.clone());
            pages.extend(self.scraper.scrape_url(url).await);
            progress.inc(1);
            if i + 1 < urls.len() {
                tokio::time::sleep(self.config.crawl.request_delay()).await;
            }
        }
        progress.finish_and_clear();

        if pages.is_empty() {
            self.ui.print_warning("No documentation content extracted");
            return Ok(());
        }
        let code_blocks: usize = pages.iter().map(|p| p.code_blocks.len()).sum();
        self.ui.print_success(&format!(
            "Scraped {} of {} pages ({} code blocks) into {}",
            pages.len(),
            urls.len(),
            code_blocks,
            self.config.storage.extracted_dir().display()
        ));
        Ok(())
    }

    pub async fn crawl(&self, args: CrawlArgs) -> Result<()> {
        self.ui.print_header("Documentation Crawl");
        let start_time = Instant::now();
        let spinner = self.ui.progress.spinner("Crawling documentation...");
        let summary = self
            .scraper
            .crawl(args.start.as_deref())
            .await
            .context("Crawl failed")?;
        spinner.finish();

        if summary.stopped {
            self.ui.print_warning("Crawl interrupted; partial results were saved");
        }
        self.ui.print_success(&format!(
            "Extracted {} pages from {} visited URLs in {}",
            summary.pages,
            summary.visited,
            format_duration(start_time.elapsed())
        ));
        if let Some(output) = summary.output {
            self.ui.print_field("Output", output.display());
        }
        Ok(())
    }

    pub async fn samples(&self, _args: SamplesArgs) -> Result<()> {
        self.ui.print_header("Sample Projects");
        let collector = self.collector()?;

        let spinner = self.ui.progress.spinner("Discovering samples...");
        let discovered = collector
            .discover_all_samples()
            .await
            .context("Sample discovery failed")?;
        spinner.finish();
        self.ui.print_success(&format!("Found {} samples", discovered.len()));

        let mut selected = collector.select_samples(discovered);
        if self.config.samples.test_mode {
            self.ui.print_info(&format!(
                "Test mode: {} samples selected ({:?} strategy)",
                selected.len(),
                self.config.samples.strategy
            ));
        }

        if self.config.samples.skip_downloads {
            self.ui.print_info("Skipping downloads");
        } else {
            let downloaded = collector.download_all(&mut selected).await;
            if downloaded < selected.len() {
                self.ui.print_warning(&format!(
                    "Downloaded {} of {} samples",
                    downloaded,
                    selected.len()
                ));
            } else {
                self.ui.print_success(&format!("Downloaded {} samples", downloaded));
            }
        }

        if !selected.is_empty() {
            println!("{}", self.ui.formatter.format_samples(&selected));
        }
        Ok(())
    }

    pub async fn analyze(&self, args: AnalyzeArgs) -> Result<()> {
        self.ui.print_header("Pattern Analysis");
        let dir = args.dir.unwrap_or_else(|| self.config.storage.projects_dir());
        if !dir.is_dir() {
            self.ui.print_error_with_suggestions(
                &format!("Directory not found: {}", dir.display()),
                Some("Run 'visionmine samples' to download sample projects first"),
            );
            return Ok(());
        }

        let start_time = Instant::now();
        let knowledge_dir = self.config.storage.knowledge_dir();

        let spinner = self.ui.progress.spinner("Matching pattern dictionaries...");
        let mut analyzer = ComponentAnalyzer::new(&dir);
        let report = analyzer.analyze_samples(None);
        let analyses = analyzer.file_analyses().to_vec();
        spinner.finish();
        self.ui.print_success(&format!(
            "Analyzed {} Swift files ({} component terms)",
            analyses.len(),
            report.components.values().map(|terms| terms.len()).sum::<usize>()
        ));

        let knowledge = KnowledgeBase::new(&knowledge_dir).context("Failed to open knowledge base")?;
        knowledge.save_components(&report).context("Failed to save components")?;
        knowledge
            .save_file_analyses(&analyses)
            .context("Failed to save file analyses")?;

        let files = SourceScanner::swift().scan(&dir);
        let refiner = PatternRefiner::new(&knowledge_dir, self.config.analysis.confidence_threshold);
        let census = refiner.census(&files, &self.config.analysis.pattern_types);
        let patterns = knowledge
            .build_from_analysis(&census)
            .context("Failed to build knowledge base")?;
        let refined = refiner
            .analyze_existing_patterns(&census)
            .context("Failed to refine patterns")?;

        let mut tracker = RelationshipTracker::new(&knowledge_dir).context("Failed to load relationships")?;
        let recorded = record_import_usage(&mut tracker, &analyses).context("Failed to record relationships")?;

        let mut enhanced = EnhancedKnowledgeBase::open(knowledge_dir.join("enhanced"))
            .context("Failed to open enhanced knowledge base")?;
        let (integrations, combinations) = enhanced
            .ingest_report(&report)
            .context("Failed to update enhanced knowledge base")?;

        let index = PatternIndex::from_analyses(analyses).context("Failed to build pattern index")?;

        if args.json {
            let output = json!({
                "census": census,
                "refined_patterns": refined,
                "index": index.get_metadata(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", self.ui.formatter.format_census(&census));
            if !refined.is_empty() {
                println!("{}", self.ui.formatter.format_refined(&refined));
            }
            let metadata = index.get_metadata();
            println!(
                "{}",
                self.ui.formatter.format_counts([
                    ("Knowledge patterns", patterns.len().to_string()),
                    ("Indexed terms", metadata.total_terms.to_string()),
                    ("Matched categories", metadata.total_categories.to_string()),
                    ("Imports", metadata.total_imports.to_string()),
                    ("Relationships recorded", recorded.to_string()),
                    ("Integration patterns", integrations.to_string()),
                    ("New combinations", combinations.to_string()),
                ])
            );
        }

        if let Some(project) = args.project {
            self.analyze_project(&project, &knowledge_dir)?;
        }

        self.ui.print_success(&format!(
            "Analysis completed in {}; knowledge written to {}",
            format_duration(start_time.elapsed()),
            knowledge_dir.display()
        ));
        Ok(())
    }

    fn analyze_project(&self, project: &Path, knowledge_dir: &Path) -> Result<()> {
        if !project.is_dir() {
            self.ui.print_warning(&format!("Project not found: {}", project.display()));
            return Ok(());
        }
        let analyzer = ProjectAnalyzer::new(project);
        let report = analyzer.analyze_project();
        let structure = analyzer.structure();

        let name = project
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());
        let output = knowledge_dir.join("projects").join(format!("{}.json", name));
        crate::storage::save_json(
            &output,
            &json!({
                "patterns": report.patterns,
                "usage": report.usage,
                "structure": structure,
                "code_patterns": analyzer.code_patterns(),
                "view_hierarchy": analyzer.view_hierarchy(),
                "api_usage": analyzer.api_usage(),
            }),
        )
        .with_context(|| format!("Failed to save project analysis for {}", project.display()))?;

        self.ui.print_info(&format!("Project {}", name));
        println!(
            "{}",
            self.ui
                .formatter
                .format_counts(report.usage.iter().map(|(k, v)| (k.as_str(), v.to_string())))
        );
        self.ui.print_field("Views", structure.view_files.len());
        self.ui.print_field("Dependencies", structure.dependencies.len());
        self.ui.print_field("Saved", output.display());
        Ok(())
    }

    pub async fn search(&self, args: SearchArgs) -> Result<()> {
        self.ui.print_header("Search");
        let knowledge = KnowledgeBase::new(self.config.storage.knowledge_dir())
            .context("Failed to open knowledge base")?;
        let index = PatternIndex::from_analyses(knowledge.file_analyses().context("Failed to read file analyses")?)
            .context("Failed to build pattern index")?;

        if index.is_empty() {
            self.ui
                .print_warning("Pattern index is empty. Run 'analyze' first to populate data.");
            return Ok(());
        }

        if self.verbose {
            self.ui.print_info(&format!("Query: {}", args.query));
            self.ui.print_info(&format!("Fuzzy matching: {}", if args.fuzzy { "enabled" } else { "disabled" }));
        }

        let start_time = Instant::now();
        if args.category || args.import {
            let files = if args.category {
                index.files_in_category(&args.query)
            } else {
                index.files_importing(&args.query)
            };
            if files.is_empty() {
                let suggestion = args
                    .category
                    .then(|| format!("Known categories: {}", index.categories().into_iter().collect::<Vec<_>>().join(", ")));
                self.ui
                    .print_error_with_suggestions(&format!("No files for '{}'", args.query), suggestion.as_deref());
                return Ok(());
            }
            for file in files.iter().take(args.limit) {
                println!("  {}", file);
            }
            self.ui.print_info(&format!("{} file(s)", files.len()));
        } else {
            let hits = index.find_term_with_options(&args.query, args.limit, args.fuzzy);
            println!("{}", self.ui.formatter.format_search_results(&hits, &args.query));
        }

        if self.verbose {
            self.ui
                .print_info(&format!("Search completed in {}", format_duration(start_time.elapsed())));
        }
        Ok(())
    }

    /// Extracted pages when there are any, else the latest crawl output.
    fn scraped_pages(&self) -> Vec<DocumentationPage> {
        let pages = load_extracted_pages(&self.config.storage.extracted_dir());
        if !pages.is_empty() {
            return pages;
        }
        match load_latest_documentation(&self.config.storage.documentation_dir()) {
            Ok(pages) => pages,
            Err(e) => {
                debug!("No crawl output: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn stats(&self) -> Result<()> {
        self.ui.print_header("Documentation Statistics");
        let pages = self.scraped_pages();
        if pages.is_empty() {
            self.ui.print_error_with_suggestions(
                "No scraped documentation found",
                Some("Run 'visionmine scrape' or 'visionmine crawl' first"),
            );
            return Ok(());
        }
        println!("{}", self.ui.formatter.format_stats(&statistics(&pages)));
        Ok(())
    }

    pub async fn topics(&self, args: TopicsArgs) -> Result<()> {
        self.ui.print_header("Topic Graph");
        let analyzer = TopicAnalyzer::from_pages(&self.scraped_pages());
        if analyzer.is_empty() {
            self.ui.print_warning("No topics found in scraped documentation");
            return Ok(());
        }

        self.ui.print_info(&format!("{} topics", analyzer.topic_count()));
        let central = analyzer.central_topics(args.top);
        println!(
            "{}",
            self.ui
                .formatter
                .format_counts(central.iter().map(|(topic, score)| (topic.as_str(), format!("{:.3}", score))))
        );

        for (name, members) in analyzer.topic_clusters() {
            self.ui.print_field(&name, members.join(", "));
        }
        Ok(())
    }

    pub async fn evolution(&self) -> Result<()> {
        self.ui.print_header("Pattern Evolution");
        let pages = self.scraped_pages();
        let mut analyzer = DocumentationAnalyzer::new(&self.config.storage.knowledge_dir())
            .context("Failed to load pattern history")?;
        let recorded = analyzer.analyze_pages(&pages);
        self.ui
            .print_success(&format!("Recorded {} code patterns from {} pages", recorded, pages.len()));
        println!("{}", self.ui.formatter.format_suggestions(&analyzer.suggestions()));
        Ok(())
    }

    pub async fn list_tools(&self) -> Result<()> {
        self.ui.print_header("Knowledge Tools");
        let tools = KnowledgeTools::open(&self.config)?;
        for schema in tools.get_tool_schemas() {
            self.ui.print_field(&schema.name, &schema.description);
            if self.verbose {
                println!("{}", serde_json::to_string_pretty(&schema.input_schema)?);
            }
        }
        Ok(())
    }

    pub async fn run_tool(&self, args: ToolArgs) -> Result<()> {
        let input: Value = serde_json::from_str(&args.input)
            .with_context(|| format!("Tool input is not valid JSON: {}", args.input))?;
        let tools = KnowledgeTools::open(&self.config)?;
        let result = tools.execute_tool(&args.name, input).await?;

        if !result.success {
            self.ui.print_error_with_suggestions(
                result.error.as_deref().unwrap_or("Tool failed"),
                Some("Run 'visionmine tools' to list available tools"),
            );
        }
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }

    pub async fn cache(&self, action: CacheAction) -> Result<()> {
        match action {
            CacheAction::Clear => {
                self.ui.print_header("Clear Cache");
                let removed = self.cache.clear_all().context("Failed to clear cache")?;
                for path in &removed {
                    self.ui.print_info(&format!("Removed {}", path.display()));
                }
                self.ui.print_success(&format!("Cleared {} cache entries", removed.len()));
            }
            CacheAction::Inspect => {
                self.ui.print_header("Cache");
                let inspection = self.cache.inspect().context("Failed to inspect cache")?;
                println!("{}", self.ui.formatter.format_cache_inspection(&inspection));
                let missing = inspection.samples.iter().filter(|s| s.path_missing).count();
                if missing > 0 {
                    self.ui
                        .print_warning(&format!("{} downloaded samples are missing on disk", missing));
                }
            }
        }
        Ok(())
    }

    pub async fn show_config(&self) -> Result<()> {
        self.ui.print_header("Configuration");
        println!("{}", serde_json::to_string_pretty(&self.config)?);

        self.ui.print_info("Data directories:");
        for (name, path) in [
            ("cache", self.config.storage.cache_dir()),
            ("knowledge", self.config.storage.knowledge_dir()),
            ("projects", self.config.storage.projects_dir()),
            ("extracted", self.config.storage.extracted_dir()),
            ("documentation", self.config.storage.documentation_dir()),
            ("log", self.config.storage.log_file()),
        ] {
            let status = if path.exists() { "" } else { " (missing)" };
            self.ui.print_field(name, format!("{}{}", path.display(), status));
        }
        Ok(())
    }

    pub async fn clean(&self, args: CleanArgs) -> Result<()> {
        self.ui.print_header("Clean");
        let data_dir = self.config.storage.data_dir.clone();
        if !data_dir.exists() {
            self.ui.print_info(&format!("Nothing to remove at {}", data_dir.display()));
            return Ok(());
        }

        if !args.force && !confirm(&format!("Remove {} and everything in it?", data_dir.display()))? {
            self.ui.print_info("Aborted");
            return Ok(());
        }

        tokio::fs::remove_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to remove {}", data_dir.display()))?;
        self.ui.print_success(&format!("Removed {}", data_dir.display()));
        Ok(())
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("Failed to read input")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Record one `import_usage` relationship per (import, category) pair seen
/// in the analyses, with the matching files as evidence. Returns the number
/// of relationships recorded.
pub fn record_import_usage(tracker: &mut RelationshipTracker, analyses: &[FileAnalysis]) -> crate::error::Result<usize> {
    let mut pairs: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for analysis in analyses {
        for module in &analysis.imports {
            for category in analysis.matches.keys() {
                pairs
                    .entry((module.clone(), category.clone()))
                    .or_default()
                    .push(analysis.path.clone());
            }
        }
    }

    for ((module, category), files) in &pairs {
        let mut details = Map::new();
        details.insert("file_count".to_string(), json!(files.len()));
        details.insert("files".to_string(), json!(files));
        tracker.record_relationship(module, category, "import_usage", details)?;
    }
    Ok(pairs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli_types::Cli;
    use crate::config::SampleStrategy;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_apply_sample_overrides() {
        let cli = Cli::try_parse_from([
            "visionmine", "samples", "--test-mode", "--count", "5", "--strategy", "random", "--skip-downloads",
        ])
        .unwrap();
        let mut config = MineConfig::default();
        apply_command_overrides(&mut config, &cli.command);
        assert!(config.samples.test_mode);
        assert!(config.samples.skip_downloads);
        assert!(!config.samples.force_download);
        assert_eq!(config.samples.test_sample_count, 5);
        assert_eq!(config.samples.strategy, SampleStrategy::Random);
    }

    #[test]
    fn test_apply_crawl_override() {
        let cli = Cli::try_parse_from(["visionmine", "crawl", "--max-pages", "7"]).unwrap();
        let mut config = MineConfig::default();
        apply_command_overrides(&mut config, &cli.command);
        assert_eq!(config.crawl.max_pages, Some(7));
    }

    #[test]
    fn test_record_import_usage() {
        let dir = TempDir::new().unwrap();
        let mut tracker = RelationshipTracker::new(dir.path()).unwrap();

        let mut first = FileAnalysis::new("A.swift");
        first.imports.insert("SwiftUI".to_string());
        first.add_match("ui_window", "WindowGroup");
        let mut second = FileAnalysis::new("B.swift");
        second.imports.insert("SwiftUI".to_string());
        second.add_match("ui_window", "WindowGroup");
        second.add_match("state_observable", "@Observable");

        let recorded = record_import_usage(&mut tracker, &[first, second]).unwrap();
        assert_eq!(recorded, 2);
        let window = tracker.get("SwiftUI", "ui_window").unwrap();
        assert_eq!(window.relationship_type, "import_usage");
        assert_eq!(window.evidence[0].details["file_count"], json!(2));
    }

    #[tokio::test]
    async fn test_analyze_missing_directory_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let config = MineConfig::default().with_data_dir(dir.path());
        let app = CliApp::new(config, false, false).unwrap();
        let args = AnalyzeArgs {
            dir: Some(dir.path().join("nope")),
            project: None,
            json: false,
        };
        assert!(app.analyze(args).await.is_ok());
    }

    #[tokio::test]
    async fn test_clean_force_removes_data_dir() {
        let root = TempDir::new().unwrap();
        let data = root.path().join("data");
        let config = MineConfig::default().with_data_dir(&data);
        let app = CliApp::new(config, false, false).unwrap();
        assert!(data.exists());

        app.clean(CleanArgs { force: true }).await.unwrap();
        assert!(!data.exists());
    }
}
