use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// A downloadable sample project discovered on a documentation page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectResource {
    pub title: String,
    pub url: String,
    pub download_url: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
    #[serde(default)]
    pub documentation_title: Option<String>,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    #[serde(default)]
    pub downloaded: bool,
}

impl ProjectResource {
    pub fn new(title: impl Into<String>, url: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            download_url: download_url.into(),
            documentation_url: None,
            documentation_title: None,
            local_path: None,
            downloaded: false,
        }
    }

    pub fn with_documentation(mut self, url: impl Into<String>, title: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self.documentation_title = Some(title.into());
        self
    }

    pub fn mark_downloaded(&mut self, path: &Path) {
        self.downloaded = true;
        self.local_path = Some(path.to_path_buf());
    }

    /// Directory-safe form of the title: anything outside `[A-Za-z0-9_-]` becomes `_`.
    pub fn sanitized_title(&self) -> String {
        self.title
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LinkCategory {
    Documentation,
    Videos,
    Samples,
    Frameworks,
    Tools,
    Other,
}

impl LinkCategory {
    pub const ALL: [LinkCategory; 6] = [
        LinkCategory::Documentation,
        LinkCategory::Videos,
        LinkCategory::Samples,
        LinkCategory::Frameworks,
        LinkCategory::Tools,
        LinkCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkCategory::Documentation => "documentation",
            LinkCategory::Videos => "videos",
            LinkCategory::Samples => "samples",
            LinkCategory::Frameworks => "frameworks",
            LinkCategory::Tools => "tools",
            LinkCategory::Other => "other",
        }
    }
}

impl fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a link-discovery pass over one base URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveredLinks {
    pub links: BTreeMap<LinkCategory, BTreeSet<String>>,
    /// Sample projects keyed by the page they were found on.
    pub samples: BTreeMap<String, ProjectResource>,
}

impl DiscoveredLinks {
    pub fn add_link(&mut self, category: LinkCategory, url: impl Into<String>) {
        self.links.entry(category).or_default().insert(url.into());
    }

    pub fn links_in(&self, category: LinkCategory) -> impl Iterator<Item = &String> {
        self.links.get(&category).into_iter().flatten()
    }

    pub fn total_links(&self) -> usize {
        self.links.values().map(BTreeSet::len).sum()
    }

    pub fn merge(&mut self, other: DiscoveredLinks) {
        for (category, urls) in other.links {
            self.links.entry(category).or_default().extend(urls);
        }
        self.samples.extend(other.samples);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_downloaded() {
        let mut resource = ProjectResource::new("Hello World", "https://x/a", "https://x/a.zip");
        assert!(!resource.downloaded);
        resource.mark_downloaded(Path::new("/tmp/Hello_World"));
        assert!(resource.downloaded);
        assert_eq!(resource.local_path, Some(PathBuf::from("/tmp/Hello_World")));
    }

    #[test]
    fn test_sanitized_title() {
        let resource = ProjectResource::new("Happy Beam: Part 1/2", "u", "d");
        assert_eq!(resource.sanitized_title(), "Happy_Beam__Part_1_2");
    }

    #[test]
    fn test_discovered_links_merge() {
        let mut a = DiscoveredLinks::default();
        a.add_link(LinkCategory::Documentation, "https://x/doc");
        let mut b = DiscoveredLinks::default();
        b.add_link(LinkCategory::Documentation, "https://x/doc");
        b.add_link(LinkCategory::Tools, "https://x/rcp");
        b.samples.insert("https://x/s".into(), ProjectResource::new("S", "https://x/s", "https://x/s.zip"));

        a.merge(b);
        assert_eq!(a.total_links(), 2);
        assert_eq!(a.samples.len(), 1);
        assert_eq!(a.links_in(LinkCategory::Tools).count(), 1);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&LinkCategory::Frameworks).unwrap();
        assert_eq!(json, "\"frameworks\"");
    }
}
