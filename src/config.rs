use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

const ENV_PREFIX: &str = "VISIONMINE";
const LOCAL_CONFIG_FILE: &str = "visionmine.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MineConfig {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub samples: SampleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "CrawlConfig::default_site_root")]
    pub site_root: String,
    #[serde(default = "CrawlConfig::default_base_urls")]
    pub base_urls: Vec<String>,
    #[serde(default = "CrawlConfig::default_assets_host")]
    pub assets_host: String,
    #[serde(default = "CrawlConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "CrawlConfig::default_page_timeout")]
    pub page_timeout_secs: u64,
    /// Politeness delay between sequential fetches.
    #[serde(default = "CrawlConfig::default_request_delay")]
    pub request_delay_ms: u64,
    #[serde(default = "CrawlConfig::default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default = "CrawlConfig::default_save_interval")]
    pub save_interval_secs: u64,
    #[serde(default = "CrawlConfig::default_link_prefix")]
    pub link_prefix: String,
}

impl CrawlConfig {
    fn default_site_root() -> String {
        "https://developer.apple.com".to_string()
    }

    fn default_base_urls() -> Vec<String> {
        vec![
            "https://developer.apple.com/documentation/visionos/".to_string(),
            "https://developer.apple.com/design/human-interface-guidelines/immersive-experiences".to_string(),
            "https://developer.apple.com/design/human-interface-guidelines/designing-for-visionos".to_string(),
        ]
    }

    fn default_assets_host() -> String {
        "docs-assets.developer.apple.com".to_string()
    }

    fn default_user_agent() -> String {
        "Mozilla/5.0 (compatible; visionmine/0.3)".to_string()
    }

    const fn default_page_timeout() -> u64 {
        60
    }

    const fn default_request_delay() -> u64 {
        2000
    }

    const fn default_batch_size() -> usize {
        5
    }

    const fn default_save_interval() -> u64 {
        60
    }

    fn default_link_prefix() -> String {
        "/documentation/visionos".to_string()
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            site_root: Self::default_site_root(),
            base_urls: Self::default_base_urls(),
            assets_host: Self::default_assets_host(),
            user_agent: Self::default_user_agent(),
            page_timeout_secs: Self::default_page_timeout(),
            request_delay_ms: Self::default_request_delay(),
            batch_size: Self::default_batch_size(),
            max_pages: None,
            save_interval_secs: Self::default_save_interval(),
            link_prefix: Self::default_link_prefix(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SampleStrategy {
    First,
    Diverse,
    Random,
    #[default]
    ArkitFirst,
}

impl std::str::FromStr for SampleStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(Self::First),
            "diverse" => Ok(Self::Diverse),
            "random" => Ok(Self::Random),
            "arkit_first" | "arkit-first" => Ok(Self::ArkitFirst),
            other => Err(format!("unknown sample strategy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConfig {
    #[serde(default = "SampleConfig::default_known_samples")]
    pub known_samples: Vec<String>,
    #[serde(default = "SampleConfig::default_arkit_samples")]
    pub arkit_samples: Vec<String>,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default = "SampleConfig::default_test_sample_count")]
    pub test_sample_count: usize,
    #[serde(default)]
    pub strategy: SampleStrategy,
    #[serde(default)]
    pub force_download: bool,
    #[serde(default)]
    pub skip_downloads: bool,
}

impl SampleConfig {
    fn default_known_samples() -> Vec<String> {
        [
            "/world",
            "/hello-world",
            "/bot-anist",
            "/playing-spatial-audio",
            "/diorama",
            "/destination-video",
            "/food-truck",
            "/happy-beam",
            "/solar-system",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_arkit_samples() -> Vec<String> {
        [
            "ExploringObjectTrackingWithARKit",
            "BuildingLocalExperiencesWithRoomTracking",
            "ObjectPlacementExample",
            "SceneReconstructionExample",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    const fn default_test_sample_count() -> usize {
        3
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            known_samples: Self::default_known_samples(),
            arkit_samples: Self::default_arkit_samples(),
            test_mode: false,
            test_sample_count: Self::default_test_sample_count(),
            strategy: SampleStrategy::default(),
            force_download: false,
            skip_downloads: false,
        }
    }
}

/// Directory layout rooted at `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_data_dir")]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("data")
    }

    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn knowledge_dir(&self) -> PathBuf {
        self.data_dir.join("knowledge")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.data_dir.join("debug")
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.data_dir.join("extracted")
    }

    pub fn documentation_dir(&self) -> PathBuf {
        self.data_dir.join("documentation")
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("scraper.log")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: Self::default_data_dir() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "CacheConfig::default_ttl_hours")]
    pub ttl_hours: u64,
}

impl CacheConfig {
    const fn default_enabled() -> bool {
        true
    }

    const fn default_ttl_hours() -> u64 {
        24
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours as i64)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            ttl_hours: Self::default_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "AnalysisConfig::default_pattern_types")]
    pub pattern_types: Vec<String>,
    #[serde(default = "AnalysisConfig::default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl AnalysisConfig {
    fn default_pattern_types() -> Vec<String> {
        [
            "ui_components",
            "immersive_spaces",
            "spatial_audio",
            "animation",
            "gestures",
            "3d_content",
            "arkit",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    const fn default_confidence_threshold() -> f64 {
        0.45
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pattern_types: Self::default_pattern_types(),
            confidence_threshold: Self::default_confidence_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default = "LoggingConfig::default_file_enabled")]
    pub file_enabled: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    const fn default_file_enabled() -> bool {
        true
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            file_enabled: Self::default_file_enabled(),
        }
    }
}

impl MineConfig {
    /// Load configuration from an explicit file, the local `visionmine.toml`,
    /// or the platform config directory, then apply `VISIONMINE__*` overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover_config_file(),
        };

        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(explicit.is_some()));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: MineConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    fn discover_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        directories::ProjectDirs::from("dev", "visionmine", "visionmine")
            .map(|dirs| dirs.config_dir().join(LOCAL_CONFIG_FILE))
            .filter(|path| path.exists())
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = data_dir.into();
        self
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::error::MineError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = MineConfig::default();
        assert_eq!(config.crawl.batch_size, 5);
        assert_eq!(config.crawl.page_timeout_secs, 60);
        assert_eq!(config.crawl.base_urls.len(), 3);
        assert_eq!(config.samples.test_sample_count, 3);
        assert_eq!(config.samples.strategy, SampleStrategy::ArkitFirst);
        assert_eq!(config.cache.ttl_hours, 24);
        assert_eq!(config.analysis.pattern_types.len(), 7);
        assert!((config.analysis.confidence_threshold - 0.45).abs() < f64::EPSILON);
    }

    #[test]
    fn test_storage_layout() {
        let storage = StorageConfig::new("/tmp/mine");
        assert_eq!(storage.cache_dir(), PathBuf::from("/tmp/mine/cache"));
        assert_eq!(storage.log_file(), PathBuf::from("/tmp/mine/logs/scraper.log"));
        assert_eq!(storage.knowledge_dir(), PathBuf::from("/tmp/mine/knowledge"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("visionmine.toml");
        std::fs::write(
            &path,
            r#"
[crawl]
site_root = "http://127.0.0.1:9000"
batch_size = 2

[samples]
strategy = "diverse"
test_mode = true
"#,
        )
        .unwrap();

        let config = MineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.crawl.site_root, "http://127.0.0.1:9000");
        assert_eq!(config.crawl.batch_size, 2);
        assert_eq!(config.crawl.request_delay_ms, 2000);
        assert_eq!(config.samples.strategy, SampleStrategy::Diverse);
        assert!(config.samples.test_mode);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = MineConfig::load(Some(Path::new("/nonexistent/visionmine.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("random".parse::<SampleStrategy>().unwrap(), SampleStrategy::Random);
        assert_eq!("arkit-first".parse::<SampleStrategy>().unwrap(), SampleStrategy::ArkitFirst);
        assert!("bogus".parse::<SampleStrategy>().is_err());
    }

    #[test]
    fn test_toml_round_trip_keeps_sections() {
        let rendered = MineConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[crawl]"));
        assert!(rendered.contains("[logging]"));
    }
}
