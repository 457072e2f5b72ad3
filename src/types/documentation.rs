use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A heading-delimited section of a documentation page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub title: String,
    pub level: u8,
    #[serde(default)]
    pub content: Option<String>,
    /// Enclosing headings, ending with this topic's own title.
    #[serde(default)]
    pub path: Vec<String>,
}

impl Topic {
    pub fn new(title: impl Into<String>, level: u8) -> Self {
        let title = title.into();
        Self {
            path: vec![title.clone()],
            title,
            level,
            content: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CodeKind {
    #[serde(rename = "ui_component")]
    UiComponent,
    #[serde(rename = "3d_content")]
    ThreeDContent,
    #[serde(rename = "animation")]
    Animation,
    #[serde(rename = "app_structure")]
    AppStructure,
    #[serde(rename = "event_handling")]
    EventHandling,
    #[serde(rename = "immersive_space")]
    ImmersiveSpace,
    #[default]
    #[serde(rename = "other")]
    Other,
}

impl CodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeKind::UiComponent => "ui_component",
            CodeKind::ThreeDContent => "3d_content",
            CodeKind::Animation => "animation",
            CodeKind::AppStructure => "app_structure",
            CodeKind::EventHandling => "event_handling",
            CodeKind::ImmersiveSpace => "immersive_space",
            CodeKind::Other => "other",
        }
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeBlock {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "CodeBlock::default_language")]
    pub language: String,
    pub preview: String,
    #[serde(default)]
    pub frameworks: BTreeSet<String>,
    #[serde(rename = "type", default)]
    pub kind: CodeKind,
}

impl CodeBlock {
    pub const PREVIEW_CHARS: usize = 200;

    fn default_language() -> String {
        "swift".to_string()
    }

    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            preview: code.chars().take(Self::PREVIEW_CHARS).collect(),
            code,
            description: None,
            language: Self::default_language(),
            frameworks: BTreeSet::new(),
            kind: CodeKind::Other,
        }
    }

    /// First non-blank line of the listing.
    pub fn first_line(&self) -> &str {
        self.code
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptRelationship {
    pub source: String,
    pub target: String,
    pub relationship_type: String,
    #[serde(default = "ConceptRelationship::default_strength")]
    pub strength: f64,
}

impl ConceptRelationship {
    fn default_strength() -> f64 {
        1.0
    }

    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship_type: impl Into<String>,
        strength: f64,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship_type: relationship_type.into(),
            strength,
        }
    }
}

/// Everything extracted from a single documentation page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentationPage {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code_blocks: Vec<CodeBlock>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub related_topics: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<ConceptRelationship>,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub classifications: BTreeSet<String>,
    #[serde(default)]
    pub frameworks_used: BTreeSet<String>,
    pub scraped_at: DateTime<Utc>,
}

impl DocumentationPage {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            category: Self::category_for_title(&title).to_string(),
            title,
            url: url.into(),
            description: None,
            code_blocks: Vec::new(),
            topics: Vec::new(),
            parameters: Vec::new(),
            related_topics: Vec::new(),
            prerequisites: Vec::new(),
            relationships: Vec::new(),
            section: "General".to_string(),
            classifications: BTreeSet::new(),
            frameworks_used: BTreeSet::new(),
            scraped_at: Utc::now(),
        }
    }

    /// Coarse page category derived from title keywords.
    pub fn category_for_title(title: &str) -> &'static str {
        let lower = title.to_lowercase();
        if lower.contains("3d") || lower.contains("reality") {
            "3D_Content"
        } else if lower.contains("immersive") {
            "Immersive_Experience"
        } else if lower.contains("window") || lower.contains("view") {
            "UI_Components"
        } else if lower.contains("first") || lower.contains("getting started") {
            "Getting_Started"
        } else {
            "Other"
        }
    }

    pub fn has_examples(&self) -> bool {
        !self.code_blocks.is_empty()
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// Counts produced by a structural survey of a documentation page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DocStructure {
    pub sections: usize,
    pub topics: usize,
    pub samples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_block_preview_truncates() {
        let code = "x".repeat(500);
        let block = CodeBlock::new(code);
        assert_eq!(block.preview.len(), CodeBlock::PREVIEW_CHARS);
        assert_eq!(block.language, "swift");
        assert_eq!(block.kind, CodeKind::Other);
    }

    #[test]
    fn test_code_kind_serializes_as_snake_name() {
        let json = serde_json::to_string(&CodeKind::ThreeDContent).unwrap();
        assert_eq!(json, "\"3d_content\"");
        let back: CodeKind = serde_json::from_str("\"event_handling\"").unwrap();
        assert_eq!(back, CodeKind::EventHandling);
    }

    #[test]
    fn test_category_for_title() {
        assert_eq!(DocumentationPage::category_for_title("Building a 3D scene"), "3D_Content");
        assert_eq!(DocumentationPage::category_for_title("Immersive spaces"), "Immersive_Experience");
        assert_eq!(DocumentationPage::category_for_title("Creating a window"), "UI_Components");
        assert_eq!(DocumentationPage::category_for_title("Your first app"), "Getting_Started");
        assert_eq!(DocumentationPage::category_for_title("Privacy"), "Other");
    }

    #[test]
    fn test_first_line_skips_blanks() {
        let block = CodeBlock::new("\n\n   import SwiftUI\nstruct A {}");
        assert_eq!(block.first_line(), "import SwiftUI");
    }

    #[test]
    fn test_topic_default_path() {
        let topic = Topic::new("Essentials", 2);
        assert_eq!(topic.path, vec!["Essentials".to_string()]);
    }
}
