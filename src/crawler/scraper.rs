use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::fetch::PageFetcher;
use super::html;
use crate::config::{CrawlConfig, MineConfig, StorageConfig};
use crate::error::Result;
use crate::extract::DocumentationExtractor;
use crate::storage::json::save_json;
use crate::types::DocumentationPage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlManifest {
    pub timestamp: String,
    pub total_pages: usize,
    pub total_entries: usize,
    pub base_url: String,
    pub visited_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub pages: usize,
    pub visited: usize,
    pub output: Option<PathBuf>,
    pub stopped: bool,
}

/// Fetches documentation pages, extracts them, and writes the results.
pub struct DocumentationScraper {
    fetcher: PageFetcher,
    extractor: DocumentationExtractor,
    crawl: CrawlConfig,
    storage: StorageConfig,
    running: Arc<AtomicBool>,
}

impl DocumentationScraper {
    pub fn new(config: &MineConfig) -> Result<Self> {
        Ok(Self {
            fetcher: PageFetcher::new(&config.crawl)?,
            extractor: DocumentationExtractor::new(),
            crawl: config.crawl.clone(),
            storage: config.storage.clone(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Shared flag; storing `false` stops an in-progress crawl after the
    /// current batch.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        info!("Stopping scraper...");
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Scrape each URL in turn, pausing between requests.
    pub async fn scrape_urls(&self, urls: &[String]) -> Vec<DocumentationPage> {
        let mut pages = Vec::new();
        for (i, url) in urls.iter().enumerate() {
            if !self.is_running() {
                break;
            }
            if let Some(page) = self.scrape_url(url).await {
                pages.push(page);
            }
            if i + 1 < urls.len() && self.crawl.request_delay_ms > 0 {
                tokio::time::sleep(self.crawl.request_delay()).await;
            }
        }
        pages
    }

    /// Fetch, archive the raw HTML, extract, and persist one page.
    /// Failures are logged and yield `None`.
    pub async fn scrape_url(&self, url: &str) -> Option<DocumentationPage> {
        info!("Scraping {}", url);
        let (page, _) = self.fetch_and_extract(url).await;
        let page = page?;

        let path = self
            .storage
            .extracted_dir()
            .join(format!("extracted_{}.json", url_slug(url)));
        match save_json(&path, &page) {
            Ok(()) => debug!("Saved extracted content to {}", path.display()),
            Err(e) => error!("Error saving extracted content for {}: {}", url, e),
        }
        Some(page)
    }

    async fn fetch_and_extract(&self, url: &str) -> (Option<DocumentationPage>, Vec<String>) {
        let fetched = match self.fetcher.fetch_text(url).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                error!("Error scraping {}: status {}", url, page.status);
                return (None, Vec::new());
            }
            Err(e) => {
                error!("Error scraping {}: {}", url, e);
                return (None, Vec::new());
            }
        };

        let raw_path = self.storage.debug_dir().join(format!("raw_{}.html", url_slug(url)));
        if let Err(e) = std::fs::create_dir_all(self.storage.debug_dir())
            .and_then(|_| std::fs::write(&raw_path, &fetched.body))
        {
            warn!("Could not save raw HTML for {}: {}", url, e);
        }

        let page = self.extractor.extract(&fetched.body, url);
        if page.is_none() {
            debug!("No documentation content found for {}", url);
        }
        let links = self.crawl_links(&fetched.body);
        (page, links)
    }

    /// Absolute, fragment-free links under the configured documentation prefix.
    fn crawl_links(&self, body: &str) -> Vec<String> {
        let root = self.crawl.site_root.trim_end_matches('/');
        let absolute_prefix = format!("{}{}", root, self.crawl.link_prefix);

        html::anchors(body)
            .into_iter()
            .filter_map(|a| {
                let href = strip_fragment(&a.href);
                if href.starts_with(&self.crawl.link_prefix) {
                    Some(format!("{}{}", root, href))
                } else if href.starts_with(&absolute_prefix) {
                    Some(href.to_string())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Breadth-first crawl from `start` (default: the site's documentation
    /// prefix), fetching `batch_size` pages concurrently.
    pub async fn crawl(&self, start: Option<&str>) -> Result<CrawlSummary> {
        let base_url = start
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", self.crawl.site_root.trim_end_matches('/'), self.crawl.link_prefix));
        info!("Starting crawl from {}", base_url);

        let mut queue: VecDeque<String> = VecDeque::from([base_url.clone()]);
        let mut queued: HashSet<String> = HashSet::from([base_url.clone()]);
        let mut visited: Vec<String> = Vec::new();
        let mut documentation: Vec<DocumentationPage> = Vec::new();
        let mut last_save = Instant::now();
        let mut output = None;
        let batch_size = self.crawl.batch_size.max(1);

        while !queue.is_empty() && self.is_running() {
            let remaining = self
                .crawl
                .max_pages
                .map(|max| max.saturating_sub(visited.len()))
                .unwrap_or(usize::MAX);
            if remaining == 0 {
                info!("Reached page limit of {}", visited.len());
                break;
            }

            let take = batch_size.min(remaining).min(queue.len());
            let batch: Vec<String> = queue.drain(..take).collect();
            visited.extend(batch.iter().cloned());

            let results = join_all(batch.iter().map(|url| self.fetch_and_extract(url))).await;
            for (page, links) in results {
                if let Some(page) = page {
                    info!("Successfully scraped: {}", page.url);
                    documentation.push(page);
                }
                for link in links {
                    if queued.insert(link.clone()) {
                        queue.push_back(link);
                    }
                }
            }

            if last_save.elapsed().as_secs() >= self.crawl.save_interval_secs {
                output = Some(self.save_documentation(&documentation, &visited, &base_url)?);
                last_save = Instant::now();
            }

            if !queue.is_empty() && self.crawl.request_delay_ms > 0 {
                tokio::time::sleep(self.crawl.request_delay()).await;
            }
        }

        let stopped = !self.is_running();
        if !documentation.is_empty() || output.is_none() {
            output = Some(self.save_documentation(&documentation, &visited, &base_url)?);
        }

        Ok(CrawlSummary {
            pages: documentation.len(),
            visited: visited.len(),
            output,
            stopped,
        })
    }

    /// Write the deduplicated pages and a manifest. Returns the documentation file path.
    pub fn save_documentation(
        &self,
        documentation: &[DocumentationPage],
        visited: &[String],
        base_url: &str,
    ) -> Result<PathBuf> {
        let unique = dedupe_pages(documentation);
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let out_dir = self.storage.documentation_dir();

        let doc_path = out_dir.join(format!("visionos_documentation_{}.json", timestamp));
        save_json(&doc_path, &unique)?;

        let manifest = CrawlManifest {
            timestamp: timestamp.clone(),
            total_pages: unique.len(),
            total_entries: unique.len(),
            base_url: base_url.to_string(),
            visited_urls: visited.to_vec(),
        };
        save_json(&out_dir.join(format!("manifest_{}.json", timestamp)), &manifest)?;

        info!("Documentation saved to {}", doc_path.display());
        info!("Total unique pages: {}", unique.len());
        Ok(doc_path)
    }
}

/// One entry per fragment-free URL. A later entry replaces an earlier one
/// only when it adds examples or parameters the earlier one lacked.
pub fn dedupe_pages(pages: &[DocumentationPage]) -> Vec<DocumentationPage> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<DocumentationPage> = Vec::new();

    for page in pages {
        let key = strip_fragment(&page.url);
        match index.get(key) {
            None => {
                index.insert(key, unique.len());
                unique.push(page.clone());
            }
            Some(&slot) => {
                let existing = &unique[slot];
                if (!existing.has_examples() && page.has_examples())
                    || (!existing.has_parameters() && page.has_parameters())
                {
                    unique[slot] = page.clone();
                }
            }
        }
    }
    unique
}

fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

/// Filesystem-safe name for a URL: its readable path plus a short digest.
pub fn url_slug(url: &str) -> String {
    let path = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    let readable: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let readable = readable.trim_matches('_');
    let readable: String = readable.chars().rev().take(60).collect::<Vec<_>>().into_iter().rev().collect();

    let digest = Sha256::digest(url.as_bytes());
    let short: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("{}_{}", readable, short)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CodeBlock, Parameter};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(url: &str) -> DocumentationPage {
        DocumentationPage::new("T", url)
    }

    fn scraper(dir: &TempDir, site_root: &str) -> DocumentationScraper {
        let mut config = MineConfig::default().with_data_dir(dir.path());
        config.crawl.site_root = site_root.to_string();
        config.crawl.request_delay_ms = 0;
        config.crawl.batch_size = 2;
        DocumentationScraper::new(&config).unwrap()
    }

    #[test]
    fn test_dedupe_prefers_richer_entries() {
        let plain = page("https://x/doc#overview");
        let mut with_code = page("https://x/doc#topics");
        with_code.code_blocks.push(CodeBlock::new("let a = 1"));
        let mut with_params = page("https://x/doc");
        with_params.parameters.push(Parameter { name: "a".into(), description: "b".into() });
        let other = page("https://x/other");

        let unique = dedupe_pages(&[plain, with_code, with_params, other]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].url, "https://x/doc");
        assert!(unique[0].has_parameters());
        assert_eq!(unique[1].url, "https://x/other");
    }

    #[test]
    fn test_url_slug_is_stable_and_safe() {
        let a = url_slug("https://developer.apple.com/documentation/visionos/world");
        let b = url_slug("https://developer.apple.com/documentation/visionos/world");
        assert_eq!(a, b);
        assert!(a.starts_with("developer_apple_com_documentation_visionos_world_"));
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        assert_ne!(a, url_slug("https://developer.apple.com/documentation/visionos/world#x"));
    }

    #[tokio::test]
    async fn test_scrape_url_writes_artifacts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documentation/visionos/world"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<main><h1>Hello World</h1><p>Explore windows.</p></main>",
            ))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let scraper = scraper(&dir, &server.uri());
        let url = format!("{}/documentation/visionos/world", server.uri());

        let page = scraper.scrape_url(&url).await.unwrap();
        assert_eq!(page.title, "Hello World");

        let slug = url_slug(&url);
        assert!(dir.path().join(format!("debug/raw_{}.html", slug)).exists());
        assert!(dir.path().join(format!("extracted/extracted_{}.json", slug)).exists());
    }

    #[tokio::test]
    async fn test_scrape_urls_skips_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documentation/visionos/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Ok</h1>"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let scraper = scraper(&dir, &server.uri());
        let urls = vec![
            format!("{}/documentation/visionos/missing", server.uri()),
            format!("{}/documentation/visionos/ok", server.uri()),
        ];
        let pages = scraper.scrape_urls(&urls).await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Ok");
    }

    #[tokio::test]
    async fn test_crawl_follows_prefixed_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documentation/visionos"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r##"<main><h1>visionOS</h1>
<a href="/documentation/visionos/a">A</a>
<a href="/documentation/visionos/b#section">B</a>
<a href="/documentation/swiftui">SwiftUI</a></main>"##,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/documentation/visionos/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<main><h1>A</h1><a href="/documentation/visionos">Back</a></main>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/documentation/visionos/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<main><h1>B</h1></main>"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let scraper = scraper(&dir, &server.uri());
        let summary = scraper.crawl(None).await.unwrap();

        assert_eq!(summary.visited, 3);
        assert_eq!(summary.pages, 3);
        assert!(!summary.stopped);

        let output = summary.output.unwrap();
        let saved: Vec<DocumentationPage> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(saved.len(), 3);
    }

    #[tokio::test]
    async fn test_crawl_respects_page_limit_and_stop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<h1>Page</h1><a href="/documentation/visionos/x">x</a><a href="/documentation/visionos/y">y</a>"#,
            ))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut config = MineConfig::default().with_data_dir(dir.path());
        config.crawl.site_root = server.uri();
        config.crawl.request_delay_ms = 0;
        config.crawl.max_pages = Some(2);
        let scraper = DocumentationScraper::new(&config).unwrap();
        let summary = scraper.crawl(None).await.unwrap();
        assert_eq!(summary.visited, 2);

        let stopped = DocumentationScraper::new(&config).unwrap();
        stopped.stop();
        let summary = stopped.crawl(None).await.unwrap();
        assert_eq!(summary.visited, 0);
        assert!(summary.stopped);
    }
}
