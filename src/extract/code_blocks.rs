use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

use crate::crawler::html;
use crate::types::{CodeBlock, CodeKind};

/// Frameworks recognised in code listings.
pub const KNOWN_FRAMEWORKS: &[&str] = &[
    "RealityKit",
    "SwiftUI",
    "ARKit",
    "Metal",
    "RealityFoundation",
    "WindowKit",
    "ImmersiveSpace",
];

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"import\s+(\w+)").unwrap());

/// Every `div.code-listing` in `html`, in document order.
pub fn extract_code_blocks(html: &str) -> Vec<CodeBlock> {
    let paragraphs = html::paragraphs(html);

    html::elements(html, "div", &["code-listing"])
        .into_iter()
        .filter_map(|listing| {
            let code_elem = html::first_element(listing.inner, "code", &[])?;
            let code = html::code_text(code_elem.inner);
            if code.trim().is_empty() {
                debug!("Skipping empty code listing at offset {}", listing.start);
                return None;
            }

            let description = paragraphs
                .iter()
                .rev()
                .find(|(offset, _)| *offset < listing.start)
                .map(|(_, text)| text.clone());

            let frameworks = detect_frameworks(&code);
            let kind = determine_code_type(&code);
            let mut block = CodeBlock::new(code);
            block.description = description;
            block.language = listing
                .attrs
                .get("data-syntax")
                .filter(|s| !s.is_empty())
                .unwrap_or("swift")
                .to_string();
            block.frameworks = frameworks;
            block.kind = kind;
            Some(block)
        })
        .collect()
}

pub fn detect_frameworks(code: &str) -> BTreeSet<String> {
    let mut frameworks: BTreeSet<String> = IMPORT_RE
        .captures_iter(code)
        .map(|cap| cap[1].to_string())
        .filter(|name| KNOWN_FRAMEWORKS.contains(&name.as_str()))
        .collect();

    for framework in KNOWN_FRAMEWORKS {
        if code.contains(framework) {
            frameworks.insert(framework.to_string());
        }
    }

    if code.contains("RealityView") || code.contains("ModelEntity") {
        frameworks.insert("RealityKit".to_string());
    }
    if code.contains("View") || code.contains("WindowGroup") {
        frameworks.insert("SwiftUI".to_string());
    }

    frameworks
}

/// First matching rule wins.
pub fn determine_code_type(code: &str) -> CodeKind {
    let lower = code.to_lowercase();

    if lower.contains("struct") && lower.contains("view") {
        CodeKind::UiComponent
    } else if lower.contains("realitykit") || lower.contains("entity") || lower.contains("model3d") {
        CodeKind::ThreeDContent
    } else if lower.contains("animate") || lower.contains("transition") {
        CodeKind::Animation
    } else if code.contains("@main") || code.contains("WindowGroup") {
        CodeKind::AppStructure
    } else if lower.contains("gesture") || lower.contains("event") || lower.contains("action") {
        CodeKind::EventHandling
    } else if code.contains("ImmersiveSpace") || code.contains("openImmersiveSpace") {
        CodeKind::ImmersiveSpace
    } else {
        CodeKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_frameworks_from_imports_and_usage() {
        let code = "import RealityKit\nlet e = ModelEntity()";
        let frameworks = detect_frameworks(code);
        assert!(frameworks.contains("RealityKit"));
        assert!(!frameworks.contains("SwiftUI"));

        let frameworks = detect_frameworks("WindowGroup { Text(\"hi\") }");
        assert!(frameworks.contains("SwiftUI"));
    }

    #[test]
    fn test_code_type_rules_in_order() {
        assert_eq!(determine_code_type("struct ContentView: View {}"), CodeKind::UiComponent);
        assert_eq!(determine_code_type("let e = Entity()"), CodeKind::ThreeDContent);
        assert_eq!(determine_code_type("Model3D(named: \"Robot\")"), CodeKind::ThreeDContent);
        assert_eq!(determine_code_type("withAnimation { x.animate() }"), CodeKind::Animation);
        assert_eq!(determine_code_type("@main\nstruct App {}"), CodeKind::AppStructure);
        assert_eq!(determine_code_type("onTapGesture { }"), CodeKind::EventHandling);
        assert_eq!(determine_code_type("ImmersiveSpace(id: \"s\") {}"), CodeKind::ImmersiveSpace);
        assert_eq!(determine_code_type("let x = 1"), CodeKind::Other);
    }

    #[test]
    fn test_extract_code_blocks_with_description() {
        let html = r#"
<p>Create a model entity.</p>
<div class="code-listing" data-syntax="swift"><pre><code>import RealityKit
let box = ModelEntity(mesh: .generateBox(size: 0.1))</code></pre></div>
<div class="code-listing"><pre><code>   </code></pre></div>"#;

        let blocks = extract_code_blocks(html);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.description.as_deref(), Some("Create a model entity."));
        assert_eq!(block.kind, CodeKind::ThreeDContent);
        assert!(block.frameworks.contains("RealityKit"));
        assert!(block.code.contains('\n'));
    }
}
