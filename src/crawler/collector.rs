use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::download::extract_zip_async;
use super::fetch::PageFetcher;
use super::html;
use crate::config::{CrawlConfig, MineConfig, SampleConfig, SampleStrategy};
use crate::error::Result;
use crate::storage::cache::CacheManager;
use crate::types::{DiscoveredLinks, DocStructure, LinkCategory, ProjectResource};

pub const ESSENTIAL_FRAMEWORKS: &[&str] = &[
    "SwiftUI",
    "RealityKit",
    "ARKit",
    "AVFoundation",
    "CoreML",
    "Metal",
    "WebKit",
    "VisionKit",
    "Foundation",
];

pub const REALITY_COMPOSER_TERMS: &[&str] = &["reality-composer-pro", "reality composer pro", "realitycomposerpro"];

const VISIONOS_TERMS: &[&str] = &["visionos", "spatial", "3d", "reality", "immersive"];
const INTRO_SAMPLES_MARKER: &str = "introductory-visionos-samples";

/// True for visionOS pages, Reality Composer Pro pages, and essential
/// framework pages that mention a spatial-computing term.
pub fn is_relevant_url(url: &str) -> bool {
    let lower = url.to_lowercase();

    if lower.contains("/documentation/visionos") {
        return true;
    }
    if REALITY_COMPOSER_TERMS.iter().any(|t| lower.contains(t)) {
        return true;
    }

    ESSENTIAL_FRAMEWORKS
        .iter()
        .find(|fw| lower.contains(&format!("/documentation/{}", fw.to_lowercase())))
        .map(|_| VISIONOS_TERMS.iter().any(|t| lower.contains(t)))
        .unwrap_or(false)
}

pub fn categorize_link(url: &str) -> LinkCategory {
    if url.contains("/documentation/") {
        LinkCategory::Documentation
    } else if url.contains("/videos/") || url.contains("/wwdc/") {
        LinkCategory::Videos
    } else {
        LinkCategory::Other
    }
}

/// Discovers documentation links and sample projects, and downloads samples.
pub struct DocumentationUrlCollector {
    fetcher: PageFetcher,
    crawl: CrawlConfig,
    samples: SampleConfig,
    cache: Arc<CacheManager>,
    cache_enabled: bool,
    cache_ttl: chrono::Duration,
}

impl DocumentationUrlCollector {
    pub fn new(config: &MineConfig, cache: Arc<CacheManager>) -> Result<Self> {
        Ok(Self {
            fetcher: PageFetcher::new(&config.crawl)?,
            crawl: config.crawl.clone(),
            samples: config.samples.clone(),
            cache,
            cache_enabled: config.cache.enabled,
            cache_ttl: config.cache.ttl(),
        })
    }

    pub fn make_absolute_url(&self, url: &str) -> String {
        let root = self.crawl.site_root.trim_end_matches('/');
        if url.starts_with("http") {
            url.to_string()
        } else if let Some(rest) = url.strip_prefix("//") {
            format!("https://{}", rest)
        } else if url.starts_with('/') {
            format!("{}{}", root, url)
        } else {
            format!("{}/{}", root, url)
        }
    }

    pub fn validate_sample_url(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        url.ends_with(".zip")
            && (url.contains(&self.crawl.assets_host)
                || lower.contains("sample.code")
                || lower.contains("example.code"))
    }

    fn is_sample_download(&self, href: &str) -> bool {
        href.contains(&self.crawl.assets_host) && href.ends_with(".zip")
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let page = self.fetcher.fetch_text(url).await?;
        if !page.is_success() {
            return Err(crate::error::MineError::Other(format!(
                "status {} for {}",
                page.status, url
            )));
        }
        Ok(page.body)
    }

    async fn polite_pause(&self) {
        if self.crawl.request_delay_ms > 0 {
            tokio::time::sleep(self.crawl.request_delay()).await;
        }
    }

    /// Download buttons on a sample page, as project resources titled by
    /// the page heading.
    fn samples_on_page(&self, page_url: &str, body: &str) -> Vec<ProjectResource> {
        let title = page_heading(body).unwrap_or_else(|| last_segment(page_url));
        html::anchors(body)
            .into_iter()
            .filter(|a| a.attrs.has_all_classes(&["button-cta", "sample-download"]))
            .map(|a| self.make_absolute_url(&a.href))
            .filter(|href| self.is_sample_download(href))
            .map(|href| {
                info!("Found sample download: {}", href);
                ProjectResource::new(title.clone(), page_url, href).with_documentation(page_url, title.clone())
            })
            .collect()
    }

    async fn collect_samples_from(&self, page_url: &str, links: &mut DiscoveredLinks) {
        match self.fetch_page(page_url).await {
            Ok(body) => {
                for sample in self.samples_on_page(page_url, &body) {
                    links.add_link(LinkCategory::Samples, sample.download_url.clone());
                    links.samples.insert(page_url.to_string(), sample);
                }
            }
            Err(e) => error!("Error visiting sample page {}: {}", page_url, e),
        }
        self.polite_pause().await;
    }

    /// Walk the relevant links of `base_url` and categorise them, following
    /// sample pages to find their download buttons.
    pub async fn get_documentation_links(&self, base_url: &str) -> DiscoveredLinks {
        info!("Starting documentation link discovery from: {}", base_url);
        let mut links = DiscoveredLinks::default();

        let base_body = match self.fetch_page(base_url).await {
            Ok(body) => body,
            Err(e) => {
                error!("Error getting links from {}: {}", base_url, e);
                return links;
            }
        };

        let mut to_process: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for anchor in html::anchors(&base_body) {
            let url = self.make_absolute_url(&anchor.href);
            if is_relevant_url(&url) && seen.insert(url.clone()) {
                to_process.push(url);
            }
        }
        info!("Found {} relevant URLs to process", to_process.len());

        let mut processed: HashSet<String> = HashSet::new();
        for url in to_process {
            if !processed.insert(url.clone()) {
                continue;
            }
            self.polite_pause().await;

            let body = match self.fetch_page(&url).await {
                Ok(body) => body,
                Err(e) => {
                    error!("Error processing URL {}: {}", url, e);
                    continue;
                }
            };

            let mut sample_pages: Vec<String> = Vec::new();
            if url.contains(INTRO_SAMPLES_MARKER) {
                info!("Processing intro samples page: {}", url);
                sample_pages.extend(
                    html::anchors(&body)
                        .into_iter()
                        .filter(|a| a.attrs.has_class("link"))
                        .map(|a| self.make_absolute_url(&a.href)),
                );
            }
            if let Some(article) = html::first_element(&body, "article", &["article-content"]) {
                sample_pages.extend(
                    html::anchors(article.inner)
                        .into_iter()
                        .filter(|a| a.text.contains('{'))
                        .map(|a| self.make_absolute_url(&a.href)),
                );
            }

            for sample_page in sample_pages {
                if processed.insert(sample_page.clone()) {
                    self.collect_samples_from(&sample_page, &mut links).await;
                }
            }

            for sample in self.samples_on_page(&url, &body) {
                links.add_link(LinkCategory::Samples, sample.download_url.clone());
                links.samples.insert(url.clone(), sample);
            }

            let lower = url.to_lowercase();
            if lower.contains("/documentation/visionos") {
                links.add_link(LinkCategory::Documentation, url.clone());
            }
            if ESSENTIAL_FRAMEWORKS
                .iter()
                .any(|fw| lower.contains(&format!("/documentation/{}", fw.to_lowercase())))
            {
                links.add_link(LinkCategory::Frameworks, url.clone());
            }
            if REALITY_COMPOSER_TERMS.iter().any(|t| lower.contains(t)) {
                links.add_link(LinkCategory::Tools, url.clone());
            }
            if !lower.contains("/documentation/") {
                links.add_link(categorize_link(&url), url.clone());
            }
        }

        for category in LinkCategory::ALL {
            let count = links.links_in(category).count();
            if count > 0 {
                info!("{}: {} URLs found", category, count);
            }
        }
        links
    }

    /// Count sections, topic blocks and distinct sample links on a page.
    /// Fetch or parse failures produce zero counts.
    pub async fn analyze_documentation_structure(&self, url: &str) -> DocStructure {
        let body = match self.fetch_page(url).await {
            Ok(body) => body,
            Err(e) => {
                error!("Error analyzing documentation structure: {}", e);
                return DocStructure::default();
            }
        };

        let sections = html::headings(&body).iter().filter(|h| h.level <= 3).count();
        let topics = count_class(&body, "topic");

        let samples: BTreeSet<String> = html::anchors(&body)
            .into_iter()
            .filter(|a| {
                a.attrs.has_class("sample-code")
                    || a.attrs.has_class("sample-card")
                    || a.attrs.has_class("sample-download")
                    || a.href.to_lowercase().contains("sample")
                    || a.href.ends_with(".zip")
            })
            .map(|a| a.href)
            .collect();

        let structure = DocStructure {
            sections,
            topics,
            samples: samples.len(),
        };
        info!(
            "Found {} sections, {} topics, and {} samples",
            structure.sections, structure.topics, structure.samples
        );
        structure
    }

    /// Build a project resource from a sample's documentation page and
    /// record the sample ↔ documentation link in the documentation cache.
    pub async fn process_documentation_page(&self, url: &str) -> Option<ProjectResource> {
        let url = self.make_absolute_url(url);
        let body = match self.fetch_page(&url).await {
            Ok(body) => body,
            Err(e) => {
                error!("Error processing documentation page {}: {}", url, e);
                return None;
            }
        };

        let title = page_heading(&body).unwrap_or_else(|| last_segment(&url));
        let anchors = html::anchors(&body);
        let download = anchors
            .iter()
            .find(|a| a.attrs.has_class("sample-download"))
            .or_else(|| anchors.iter().find(|a| a.href.ends_with(".zip")))
            .map(|a| self.make_absolute_url(&a.href));

        let Some(download_url) = download else {
            debug!("No download links found on {}", url);
            return None;
        };

        let project = ProjectResource::new(title.clone(), url.clone(), download_url).with_documentation(url, title);
        if let Err(e) = self.cache.record_doc_relationship(&project) {
            error!("Error caching relationship for {}: {}", project.title, e);
        }
        Some(project)
    }

    /// Samples from the cache when it is fresh, otherwise from a full
    /// discovery pass over every base URL and known sample page.
    pub async fn discover_all_samples(&self) -> Result<Vec<ProjectResource>> {
        if self.cache_enabled {
            match self.cache.load_samples() {
                Ok(cache) if cache.is_valid(self.cache_ttl) => {
                    info!("Using {} cached samples", cache.samples.len());
                    return Ok(cache.samples);
                }
                Ok(cache) if cache.samples.is_empty() && cache.cached_at.is_some() => {
                    warn!("Cache exists but contains no samples");
                }
                Ok(_) => debug!("Samples cache stale or missing"),
                Err(e) => error!("Cache validation error: {}", e),
            }
        }

        info!("Cache miss - discovering samples...");
        let mut found: BTreeMap<String, ProjectResource> = BTreeMap::new();

        for base_url in &self.crawl.base_urls {
            let links = self.get_documentation_links(base_url).await;
            for (page_url, sample) in links.samples {
                if !self.validate_sample_url(&sample.download_url) {
                    debug!("Rejected sample URL {}", sample.download_url);
                    continue;
                }
                if let Err(e) = self.cache.record_doc_relationship(&sample) {
                    error!("Error caching relationship for {}: {}", sample.title, e);
                }
                found.entry(page_url).or_insert(sample);
            }
        }

        for known in &self.samples.known_samples {
            let page_url = self.make_absolute_url(&format!("{}{}", self.crawl.link_prefix, known));
            if found.contains_key(&page_url) {
                continue;
            }
            if let Some(sample) = self.process_documentation_page(&page_url).await {
                if self.validate_sample_url(&sample.download_url) {
                    found.insert(page_url, sample);
                }
            }
            self.polite_pause().await;
        }

        let samples: Vec<ProjectResource> = found.into_values().collect();
        if self.cache_enabled {
            self.cache.update_samples(&samples)?;
        }
        Ok(samples)
    }

    /// Download and extract a sample into `projects/<sanitized title>`.
    /// Returns `false` when there is nothing to download or the server
    /// does not answer 200.
    pub async fn download_project(&self, project: &mut ProjectResource) -> Result<bool> {
        if project.download_url.is_empty() {
            return Ok(false);
        }

        let project_dir = self.cache.storage().projects_dir().join(project.sanitized_title());
        if project_dir.is_dir() && !self.samples.force_download {
            info!("Reusing existing download at {}", project_dir.display());
            project.mark_downloaded(&project_dir);
            return Ok(true);
        }

        let (status, bytes) = self.fetcher.fetch_bytes(&project.download_url).await?;
        if status != 200 {
            error!("Got status {} for {}", status, project.download_url);
            return Ok(false);
        }

        let files = extract_zip_async(bytes, project_dir.clone()).await?;
        info!("Downloaded {} ({} files) to {}", project.title, files, project_dir.display());
        project.mark_downloaded(&project_dir);
        Ok(true)
    }

    /// Download every sample, logging and skipping failures. Returns the
    /// number of successful downloads.
    pub async fn download_all(&self, samples: &mut [ProjectResource]) -> usize {
        let mut downloaded = 0;
        for sample in samples.iter_mut() {
            match self.download_project(sample).await {
                Ok(true) => downloaded += 1,
                Ok(false) => warn!("Could not download {}", sample.title),
                Err(e) => error!("Error downloading project {}: {}", sample.title, e),
            }
        }
        if self.cache_enabled {
            if let Err(e) = self.cache.update_samples(samples) {
                error!("Error updating samples cache: {}", e);
            }
        }
        downloaded
    }

    pub fn select_samples(&self, samples: Vec<ProjectResource>) -> Vec<ProjectResource> {
        if !self.samples.test_mode {
            return samples;
        }
        select_samples(
            samples,
            self.samples.strategy,
            self.samples.test_sample_count,
            &self.samples.arkit_samples,
        )
    }
}

/// Pick `count` samples according to `strategy`.
pub fn select_samples(
    mut samples: Vec<ProjectResource>,
    strategy: SampleStrategy,
    count: usize,
    arkit_samples: &[String],
) -> Vec<ProjectResource> {
    match strategy {
        SampleStrategy::First => {}
        SampleStrategy::Random => samples.shuffle(&mut rand::thread_rng()),
        SampleStrategy::ArkitFirst => {
            let is_arkit = |s: &ProjectResource| {
                let compact: String = s.title.chars().filter(|c| !c.is_whitespace()).collect();
                arkit_samples
                    .iter()
                    .any(|name| compact.contains(name.as_str()) || s.download_url.contains(name.as_str()))
            };
            let (mut arkit, rest): (Vec<_>, Vec<_>) = samples.into_iter().partition(|s| is_arkit(s));
            arkit.extend(rest);
            samples = arkit;
        }
        SampleStrategy::Diverse => {
            let mut groups: Vec<(String, Vec<ProjectResource>)> = Vec::new();
            for sample in samples {
                let key = sample
                    .title
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_lowercase();
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, group)) => group.push(sample),
                    None => groups.push((key, vec![sample])),
                }
            }

            let mut interleaved = Vec::new();
            let mut round = 0;
            while interleaved.len() < count {
                let mut took_any = false;
                for (_, group) in &groups {
                    if let Some(sample) = group.get(round) {
                        interleaved.push(sample.clone());
                        took_any = true;
                    }
                }
                if !took_any {
                    break;
                }
                round += 1;
            }
            samples = interleaved;
        }
    }

    samples.truncate(count);
    samples
}

fn page_heading(body: &str) -> Option<String> {
    html::headings(body)
        .into_iter()
        .find(|h| h.level == 1 && !h.text.is_empty())
        .map(|h| h.text)
}

fn last_segment(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

fn count_class(body: &str, class: &str) -> usize {
    static OPEN_TAG: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(r"(?is)<[a-z][a-z0-9]*\b([^>]*)>").unwrap());
    OPEN_TAG
        .captures_iter(body)
        .filter(|cap| html::Attributes::parse(&cap[1]).has_class(class))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::crawler::download::test_support::{build_corrupt_zip, build_zip};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample(title: &str) -> ProjectResource {
        ProjectResource::new(title, format!("https://x/{}", title), format!("https://x/{}.zip", title))
    }

    fn collector(dir: &TempDir, site_root: &str) -> DocumentationUrlCollector {
        collector_with(dir, site_root, false)
    }

    fn collector_with(dir: &TempDir, site_root: &str, force_download: bool) -> DocumentationUrlCollector {
        let mut config = MineConfig::default().with_data_dir(dir.path());
        config.crawl.site_root = site_root.to_string();
        config.crawl.request_delay_ms = 0;
        config.crawl.assets_host = "127.0.0.1".to_string();
        config.samples.force_download = force_download;
        let cache = Arc::new(CacheManager::new(StorageConfig::new(dir.path())).unwrap());
        DocumentationUrlCollector::new(&config, cache).unwrap()
    }

    #[test]
    fn test_is_relevant_url() {
        assert!(is_relevant_url("https://developer.apple.com/documentation/visionos/world"));
        assert!(is_relevant_url("https://developer.apple.com/documentation/realitycomposerpro"));
        assert!(is_relevant_url("https://developer.apple.com/documentation/realitykit/immersive-spaces"));
        assert!(!is_relevant_url("https://developer.apple.com/documentation/swiftui/list"));
        assert!(!is_relevant_url("https://developer.apple.com/news"));
    }

    #[test]
    fn test_make_absolute_url() {
        let dir = TempDir::new().unwrap();
        let c = collector(&dir, "https://developer.apple.com");
        assert_eq!(c.make_absolute_url("https://a.com/x"), "https://a.com/x");
        assert_eq!(c.make_absolute_url("//cdn.apple.com/x"), "https://cdn.apple.com/x");
        assert_eq!(c.make_absolute_url("/documentation/visionos"), "https://developer.apple.com/documentation/visionos");
        assert_eq!(c.make_absolute_url("videos/play"), "https://developer.apple.com/videos/play");
    }

    #[test]
    fn test_validate_sample_url() {
        let dir = TempDir::new().unwrap();
        let mut c = collector(&dir, "https://developer.apple.com");
        c.crawl.assets_host = "docs-assets.developer.apple.com".to_string();
        assert!(c.validate_sample_url("https://docs-assets.developer.apple.com/published/a/World.zip"));
        assert!(c.validate_sample_url("https://example.com/sample.code/World.zip"));
        assert!(!c.validate_sample_url("https://docs-assets.developer.apple.com/published/a/World.pdf"));
        assert!(!c.validate_sample_url("https://example.com/World.zip"));
    }

    #[test]
    fn test_categorize_link() {
        assert_eq!(categorize_link("https://x/documentation/a"), LinkCategory::Documentation);
        assert_eq!(categorize_link("https://x/videos/play/wwdc2023/1"), LinkCategory::Videos);
        assert_eq!(categorize_link("https://x/news"), LinkCategory::Other);
    }

    #[test]
    fn test_select_first_and_arkit_first() {
        let samples = vec![sample("Hello World"), sample("Diorama"), sample("Object Placement Example")];
        let arkit = vec!["ObjectPlacementExample".to_string()];

        let first = select_samples(samples.clone(), SampleStrategy::First, 2, &arkit);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].title, "Hello World");

        let arkit_first = select_samples(samples, SampleStrategy::ArkitFirst, 2, &arkit);
        assert_eq!(arkit_first[0].title, "Object Placement Example");
        assert_eq!(arkit_first[1].title, "Hello World");
    }

    #[test]
    fn test_select_diverse_round_robins_prefixes() {
        let samples = vec![
            sample("Building A"),
            sample("Building B"),
            sample("Creating C"),
            sample("Playing D"),
        ];
        let picked = select_samples(samples, SampleStrategy::Diverse, 3, &[]);
        let titles: Vec<_> = picked.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Building A", "Creating C", "Playing D"]);
    }

    #[test]
    fn test_select_random_keeps_count() {
        let samples = vec![sample("a"), sample("b"), sample("c"), sample("d")];
        let picked = select_samples(samples, SampleStrategy::Random, 3, &[]);
        assert_eq!(picked.len(), 3);
    }

    #[tokio::test]
    async fn test_analyze_structure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documentation/visionos"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<h1>visionOS</h1><h2>A</h2><h3>B</h3><h4>C</h4>
<div class="topic">t1</div><div class="topic main">t2</div>
<a class="sample-card" href="/documentation/visionos/world">World</a>
<a href="/samples/a.zip">zip</a><a href="/samples/a.zip">dup</a>"#,
            ))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let c = collector(&dir, &server.uri());
        let structure = c
            .analyze_documentation_structure(&format!("{}/documentation/visionos", server.uri()))
            .await;
        assert_eq!(structure, DocStructure { sections: 3, topics: 2, samples: 2 });

        let missing = c.analyze_documentation_structure(&format!("{}/nope", server.uri())).await;
        assert_eq!(missing, DocStructure::default());
    }

    #[tokio::test]
    async fn test_process_documentation_page_records_relationship() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documentation/visionos/world"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<main><h1>Hello World</h1><a class="button-cta sample-download" href="/assets/World.zip">Download</a></main>"#,
            ))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let c = collector(&dir, &server.uri());
        let project = c.process_documentation_page("/documentation/visionos/world").await.unwrap();
        assert_eq!(project.title, "Hello World");
        assert_eq!(project.download_url, format!("{}/assets/World.zip", server.uri()));
        assert_eq!(project.documentation_title.as_deref(), Some("Hello World"));

        let cached = c.cache.doc_relationships().unwrap();
        assert!(cached.contains_key("Hello World"));
    }

    #[tokio::test]
    async fn test_download_project_extracts_archive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/World.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_zip(&[("World/App.swift", "import SwiftUI")])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/assets/Missing.zip"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let c = collector(&dir, &server.uri());

        let mut project = ProjectResource::new("Hello World", "u", format!("{}/assets/World.zip", server.uri()));
        assert!(c.download_project(&mut project).await.unwrap());
        let local = project.local_path.clone().unwrap();
        assert!(local.ends_with("projects/Hello_World"));
        assert!(local.join("World/App.swift").exists());

        let mut missing = ProjectResource::new("Missing", "u", format!("{}/assets/Missing.zip", server.uri()));
        assert!(!c.download_project(&mut missing).await.unwrap());
        assert!(!missing.downloaded);

        assert!(!dir.path().join("projects/Missing").exists());

        let mut empty = ProjectResource::new("Empty", "u", "");
        assert!(!c.download_project(&mut empty).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_not_reused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/A.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_corrupt_zip(&[
                ("A/First.swift", "import SwiftUI"),
                ("A/Second.swift", "struct Second {}"),
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let c = collector(&dir, &server.uri());
        let url = format!("{}/assets/A.zip", server.uri());

        let mut project = ProjectResource::new("A", "u", url.as_str());
        assert!(c.download_project(&mut project).await.is_err());
        assert!(!project.downloaded);
        assert!(!dir.path().join("projects/A").exists());

        // The next attempt fetches again instead of trusting a partial copy.
        let mut again = ProjectResource::new("A", "u", url.as_str());
        assert!(c.download_project(&mut again).await.is_err());
        assert!(!again.downloaded);
        assert!(again.local_path.is_none());
    }

    #[tokio::test]
    async fn test_retry_after_failed_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/World.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_corrupt_zip(&[("World/App.swift", "import SwiftUI")])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/assets/World.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_zip(&[("World/App.swift", "import SwiftUI")])))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let c = collector(&dir, &server.uri());
        let mut samples = vec![ProjectResource::new("World", "u", format!("{}/assets/World.zip", server.uri()))];

        assert_eq!(c.download_all(&mut samples).await, 0);
        assert!(!samples[0].downloaded);

        assert_eq!(c.download_all(&mut samples).await, 1);
        assert!(samples[0].downloaded);
        let app = samples[0].local_path.clone().unwrap().join("World/App.swift");
        assert_eq!(std::fs::read_to_string(app).unwrap(), "import SwiftUI");
    }

    #[tokio::test]
    async fn test_force_download_refetches_existing_project() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/World.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_zip(&[("World/Old.swift", "let v = 1")])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/assets/World.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_zip(&[("World/New.swift", "let v = 2")])))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = format!("{}/assets/World.zip", server.uri());
        let local = dir.path().join("projects/World");

        let cached = collector(&dir, &server.uri());
        let mut first = ProjectResource::new("World", "u", url.as_str());
        assert!(cached.download_project(&mut first).await.unwrap());
        let mut reused = ProjectResource::new("World", "u", url.as_str());
        assert!(cached.download_project(&mut reused).await.unwrap());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        assert!(local.join("World/Old.swift").exists());

        let forced = collector_with(&dir, &server.uri(), true);
        let mut refreshed = ProjectResource::new("World", "u", url.as_str());
        assert!(forced.download_project(&mut refreshed).await.unwrap());
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert!(local.join("World/New.swift").exists());
        assert!(!local.join("World/Old.swift").exists());
    }
}
