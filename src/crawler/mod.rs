pub mod collector;
pub mod download;
pub mod fetch;
pub mod html;
pub mod scraper;

pub use collector::{categorize_link, is_relevant_url, select_samples, DocumentationUrlCollector};
pub use download::{extract_zip, extract_zip_async};
pub use fetch::{FetchedPage, PageFetcher};
pub use scraper::{CrawlManifest, CrawlSummary, DocumentationScraper};
