use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

use super::json::{load_json, save_json};
use crate::config::StorageConfig;
use crate::error::Result;
use crate::types::ProjectResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFile {
    Urls,
    Samples,
    Documentation,
    Analysis,
    Relationships,
}

impl CacheFile {
    pub const ALL: [CacheFile; 5] = [
        CacheFile::Urls,
        CacheFile::Samples,
        CacheFile::Documentation,
        CacheFile::Analysis,
        CacheFile::Relationships,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CacheFile::Urls => "url_cache",
            CacheFile::Samples => "samples_cache",
            CacheFile::Documentation => "doc_cache",
            CacheFile::Analysis => "analysis_cache",
            CacheFile::Relationships => "relationships",
        }
    }
}

/// Owns the on-disk cache layout under the data directory.
#[derive(Debug, Clone)]
pub struct CacheManager {
    storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheInspection {
    pub total: usize,
    pub downloaded: usize,
    pub not_downloaded: usize,
    pub samples: Vec<SampleStatus>,
    pub cached_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleStatus {
    pub title: String,
    pub downloaded: bool,
    pub local_path: Option<PathBuf>,
    pub path_missing: bool,
}

impl CacheManager {
    pub fn new(storage: StorageConfig) -> Result<Self> {
        let manager = Self { storage };
        manager.ensure_dirs()?;
        Ok(manager)
    }

    fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.storage.cache_dir())?;
        std::fs::create_dir_all(self.storage.knowledge_dir())?;
        std::fs::create_dir_all(self.storage.logs_dir())?;
        Ok(())
    }

    pub fn path(&self, file: CacheFile) -> PathBuf {
        match file {
            CacheFile::Urls => self.storage.cache_dir().join("url_cache.json"),
            CacheFile::Samples => self.storage.cache_dir().join("discovered_samples.json"),
            CacheFile::Documentation => self.storage.cache_dir().join("documentation_cache.json"),
            CacheFile::Analysis => self.storage.cache_dir().join("analysis_cache.json"),
            CacheFile::Relationships => self.storage.knowledge_dir().join("relationships.json"),
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Remove every cache file, stale sample downloads and the log file.
    /// Failures on individual entries are logged and skipped.
    pub fn clear_all(&self) -> Result<Vec<PathBuf>> {
        info!("Clearing all cache files...");
        let mut removed = Vec::new();

        for file in CacheFile::ALL {
            let path = self.path(file);
            if path.exists() {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        info!("Removed {} cache: {}", file.name(), path.display());
                        removed.push(path);
                    }
                    Err(e) => error!("Error removing {}: {}", path.display(), e),
                }
            }
        }

        let samples_dir = self.storage.cache_dir().join("samples");
        if samples_dir.exists() {
            match std::fs::remove_dir_all(&samples_dir) {
                Ok(()) => {
                    info!("Removed old samples directory: {}", samples_dir.display());
                    removed.push(samples_dir);
                }
                Err(e) => error!("Error removing samples directory: {}", e),
            }
        }

        let log_file = self.storage.log_file();
        if log_file.exists() {
            match std::fs::remove_file(&log_file) {
                Ok(()) => removed.push(log_file),
                Err(e) => error!("Error removing log file: {}", e),
            }
        }

        self.ensure_dirs()?;
        Ok(removed)
    }

    pub fn load_samples(&self) -> Result<SampleCache> {
        load_json(&self.path(CacheFile::Samples))
    }

    pub fn save_samples(&self, cache: &SampleCache) -> Result<()> {
        save_json(&self.path(CacheFile::Samples), cache)
    }

    /// Merge newly discovered samples into the samples cache by URL.
    pub fn update_samples(&self, new_samples: &[ProjectResource]) -> Result<SampleCache> {
        let mut cache = match self.load_samples() {
            Ok(cache) => cache,
            Err(e) => {
                error!("Samples cache unreadable, starting fresh: {}", e);
                SampleCache::default()
            }
        };
        cache.merge(new_samples.iter().cloned());
        self.save_samples(&cache)?;
        info!(
            "Cached {} samples (total: {})",
            new_samples.len(),
            cache.samples.len()
        );
        Ok(cache)
    }

    pub fn record_doc_relationship(&self, project: &ProjectResource) -> Result<()> {
        let path = self.path(CacheFile::Documentation);
        let mut relationships: BTreeMap<String, DocRelationship> = load_json(&path)?;
        relationships.insert(
            project.title.clone(),
            DocRelationship {
                sample_url: project.download_url.clone(),
                documentation_url: project.documentation_url.clone(),
                documentation_title: project.documentation_title.clone(),
                cached_at: Utc::now(),
            },
        );
        save_json(&path, &relationships)?;
        info!("Cached relationship for {}", project.title);
        Ok(())
    }

    pub fn doc_relationships(&self) -> Result<BTreeMap<String, DocRelationship>> {
        load_json(&self.path(CacheFile::Documentation))
    }

    pub fn inspect(&self) -> Result<CacheInspection> {
        let path = self.path(CacheFile::Samples);
        if !path.exists() {
            info!("No samples cache found");
            return Ok(CacheInspection::default());
        }

        let cache = self.load_samples()?;
        let samples: Vec<SampleStatus> = cache
            .samples
            .iter()
            .map(|s| {
                let missing = s.local_path.as_deref().filter(|p| !p.exists());
                if let Some(path) = missing {
                    warn!("Path does not exist for {}: {}", s.title, path.display());
                }
                let path_missing = missing.is_some();
                SampleStatus {
                    title: s.title.clone(),
                    downloaded: s.downloaded,
                    local_path: s.local_path.clone(),
                    path_missing,
                }
            })
            .collect();

        let downloaded = samples.iter().filter(|s| s.downloaded).count();
        Ok(CacheInspection {
            total: samples.len(),
            downloaded,
            not_downloaded: samples.len() - downloaded,
            samples,
            cached_at: cache.cached_at,
        })
    }
}

/// Persisted list of discovered sample projects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleCache {
    #[serde(default)]
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub samples: Vec<ProjectResource>,
}

impl SampleCache {
    /// Valid when non-empty and younger than `ttl`.
    pub fn is_valid(&self, ttl: Duration) -> bool {
        if self.samples.is_empty() {
            return false;
        }
        self.cached_at
            .map(|at| Utc::now().signed_duration_since(at) < ttl)
            .unwrap_or(false)
    }

    /// Insert or replace samples keyed by `url`, keeping first-seen order.
    pub fn merge(&mut self, new_samples: impl IntoIterator<Item = ProjectResource>) {
        for sample in new_samples {
            match self.samples.iter_mut().find(|s| s.url == sample.url) {
                Some(existing) => *existing = sample,
                None => self.samples.push(sample),
            }
        }
        self.cached_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocRelationship {
    pub sample_url: String,
    pub documentation_url: Option<String>,
    pub documentation_title: Option<String>,
    pub cached_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> CacheManager {
        CacheManager::new(StorageConfig::new(dir.path())).unwrap()
    }

    fn sample(name: &str) -> ProjectResource {
        ProjectResource::new(name, format!("https://x/{}", name), format!("https://x/{}.zip", name))
    }

    #[test]
    fn test_layout_created() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert!(dir.path().join("cache").is_dir());
        assert!(dir.path().join("knowledge").is_dir());
        assert!(dir.path().join("logs").is_dir());
        assert!(manager.path(CacheFile::Samples).ends_with("cache/discovered_samples.json"));
        assert!(manager.path(CacheFile::Relationships).ends_with("knowledge/relationships.json"));
    }

    #[test]
    fn test_sample_cache_validity() {
        let mut cache = SampleCache::default();
        assert!(!cache.is_valid(Duration::hours(24)));

        cache.merge(vec![sample("a")]);
        assert!(cache.is_valid(Duration::hours(24)));

        cache.cached_at = Some(Utc::now() - Duration::hours(25));
        assert!(!cache.is_valid(Duration::hours(24)));
    }

    #[test]
    fn test_update_samples_merges_by_url() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.update_samples(&[sample("a"), sample("b")]).unwrap();

        let mut replacement = sample("a");
        replacement.downloaded = true;
        let cache = manager.update_samples(&[replacement, sample("c")]).unwrap();

        assert_eq!(cache.samples.len(), 3);
        assert!(cache.samples[0].downloaded);
        assert_eq!(cache.samples[2].title, "c");
    }

    #[test]
    fn test_clear_all_removes_files_and_logs() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.update_samples(&[sample("a")]).unwrap();
        std::fs::create_dir_all(dir.path().join("cache/samples/old")).unwrap();
        std::fs::write(dir.path().join("logs/scraper.log"), "log").unwrap();

        let removed = manager.clear_all().unwrap();
        assert_eq!(removed.len(), 3);
        assert!(!manager.path(CacheFile::Samples).exists());
        assert!(dir.path().join("cache").is_dir());
    }

    #[test]
    fn test_inspect_reports_missing_paths() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        let mut downloaded = sample("a");
        downloaded.mark_downloaded(&dir.path().join("projects/missing"));
        manager.update_samples(&[downloaded, sample("b")]).unwrap();

        let report = manager.inspect().unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.downloaded, 1);
        assert_eq!(report.not_downloaded, 1);
        assert!(report.samples[0].path_missing);
    }

    #[test]
    fn test_doc_relationship_cache() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let project = sample("world").with_documentation("https://x/world", "Hello World");
        manager.record_doc_relationship(&project).unwrap();

        let relationships = manager.doc_relationships().unwrap();
        let entry = relationships.get("world").unwrap();
        assert_eq!(entry.sample_url, "https://x/world.zip");
        assert_eq!(entry.documentation_title.as_deref(), Some("Hello World"));
    }
}
