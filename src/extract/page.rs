use std::collections::BTreeSet;
use tracing::debug;

use super::code_blocks::extract_code_blocks;
use super::relationships::{code_relationships, section_relationships};
use crate::crawler::html::{self, Heading};
use crate::types::{DocumentationPage, Parameter, Topic};

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("UI", &["window", "view", "button", "interface", "swiftui"]),
    ("3D", &["realitykit", "model", "3d", "scene", "mesh"]),
    ("Interaction", &["gesture", "input", "touch", "hand", "eye"]),
    ("Graphics", &["material", "texture", "shader", "rendering"]),
    ("System", &["privacy", "permission", "setting", "configuration"]),
    ("Media", &["audio", "video", "image", "sound", "spatial"]),
];

/// Turns a documentation page's HTML into a [`DocumentationPage`].
#[derive(Debug, Clone, Default)]
pub struct DocumentationExtractor;

impl DocumentationExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Returns `None` when the page has no recognisable title.
    pub fn extract(&self, source: &str, url: &str) -> Option<DocumentationPage> {
        let main = html::main_region(source);
        let headings = html::headings(main);

        let title = self
            .extract_title(main, &headings)
            .or_else(|| html::page_title(source));
        let Some(title) = title else {
            debug!("No title found for {}", url);
            return None;
        };

        let mut page = DocumentationPage::new(title, url);
        page.description = self.extract_description(main, &headings);
        page.topics = self.extract_topics(main, &headings);
        page.code_blocks = extract_code_blocks(main);
        page.parameters = self.extract_parameters(main, &headings);
        page.related_topics = self.extract_related_topics(main, &headings);
        page.prerequisites = self.extract_prerequisites(main, &headings);
        page.section = determine_section(url);

        page.relationships = section_relationships(&headings);
        page.relationships.extend(code_relationships(&page.code_blocks));

        page.frameworks_used = page
            .code_blocks
            .iter()
            .flat_map(|b| b.frameworks.iter().cloned())
            .collect();

        let mut classify_text = format!("{} {}", page.title, page.description.as_deref().unwrap_or(""));
        for block in &page.code_blocks {
            classify_text.push(' ');
            classify_text.push_str(&block.code);
        }
        page.classifications = classify_content(&classify_text);

        debug!(
            "Extracted '{}' with {} topics and {} code blocks",
            page.title,
            page.topics.len(),
            page.code_blocks.len()
        );
        Some(page)
    }

    fn extract_title(&self, main: &str, headings: &[Heading]) -> Option<String> {
        if let Some(hero) = html::first_element(main, "div", &["documentation-title"]) {
            if let Some(h1) = html::headings(hero.inner).into_iter().find(|h| h.level == 1) {
                if !h1.text.is_empty() {
                    return Some(h1.text);
                }
            }
        }

        headings
            .iter()
            .find(|h| h.level == 1 && !h.text.is_empty())
            .map(|h| h.text.clone())
    }

    fn extract_description(&self, main: &str, headings: &[Heading]) -> Option<String> {
        if let Some(abstract_div) = html::first_element(main, "div", &["abstract"]) {
            if let Some((_, text)) = html::paragraphs(abstract_div.inner).into_iter().next() {
                return Some(text);
            }
        }

        let after = headings.iter().find(|h| h.level == 1).map(|h| h.end).unwrap_or(0);
        html::paragraphs(main)
            .into_iter()
            .find(|(offset, _)| *offset >= after)
            .map(|(_, text)| text)
    }

    fn extract_topics(&self, main: &str, headings: &[Heading]) -> Vec<Topic> {
        let paragraphs = html::paragraphs(main);
        let mut stack: Vec<(u8, String)> = Vec::new();
        let mut topics = Vec::with_capacity(headings.len());

        for (i, heading) in headings.iter().enumerate() {
            let section_end = headings.get(i + 1).map(|h| h.start).unwrap_or(main.len());
            let content: Vec<&str> = paragraphs
                .iter()
                .filter(|(offset, _)| *offset >= heading.end && *offset < section_end)
                .map(|(_, text)| text.as_str())
                .collect();

            while stack.last().map(|(level, _)| *level >= heading.level).unwrap_or(false) {
                stack.pop();
            }
            stack.push((heading.level, heading.text.clone()));

            let mut topic = Topic::new(heading.text.clone(), heading.level)
                .with_path(stack.iter().map(|(_, t)| t.clone()).collect());
            if !content.is_empty() {
                topic = topic.with_content(content.join("\n"));
            }
            topics.push(topic);
        }

        topics
    }

    fn extract_parameters(&self, main: &str, headings: &[Heading]) -> Vec<Parameter> {
        headings
            .iter()
            .filter(|h| (3..=4).contains(&h.level) && h.text.contains("Parameters"))
            .filter_map(|h| html::first_element(&main[h.end..], "ul", &[]))
            .flat_map(|list| html::list_items(list.inner))
            .filter_map(|item| {
                let (name, description) = item.split_once('-')?;
                Some(Parameter {
                    name: name.trim().to_string(),
                    description: description.trim().to_string(),
                })
            })
            .collect()
    }

    fn extract_related_topics(&self, main: &str, headings: &[Heading]) -> Vec<String> {
        let Some((i, heading)) = headings.iter().enumerate().find(|(_, h)| {
            let lower = h.text.to_lowercase();
            (2..=3).contains(&h.level)
                && ["see also", "related", "see more"].iter().any(|s| lower.contains(s))
        }) else {
            return Vec::new();
        };

        let end = headings.get(i + 1).map(|h| h.start).unwrap_or(main.len());
        html::anchors(&main[heading.end..end])
            .into_iter()
            .map(|a| a.text)
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn extract_prerequisites(&self, main: &str, headings: &[Heading]) -> Vec<String> {
        headings
            .iter()
            .find(|h| {
                let lower = h.text.to_lowercase();
                (2..=3).contains(&h.level) && (lower.contains("prerequisites") || lower.contains("requirements"))
            })
            .and_then(|h| html::first_element(&main[h.end..], "ul", &[]))
            .map(|list| html::list_items(list.inner))
            .unwrap_or_default()
    }
}

/// Section name from the fifth `/`-separated URL segment, title-cased.
pub fn determine_section(url: &str) -> String {
    let parts: Vec<&str> = url.split('/').collect();
    match parts.get(4).filter(|p| !p.is_empty()) {
        Some(part) => title_case(&part.replace('-', " ")),
        None => "General".to_string(),
    }
}

pub fn classify_content(content: &str) -> BTreeSet<String> {
    let lower = content.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(topic, _)| topic.to_string())
        .collect()
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
