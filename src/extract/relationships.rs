use crate::crawler::html::Heading;
use crate::types::{CodeBlock, ConceptRelationship};

/// `parent_child` links between consecutive h2–h4 headings where the
/// second heading is nested deeper than the first.
pub fn section_relationships(headings: &[Heading]) -> Vec<ConceptRelationship> {
    let sections: Vec<_> = headings.iter().filter(|h| (2..=4).contains(&h.level)).collect();

    sections
        .windows(2)
        .filter(|pair| pair[1].level > pair[0].level)
        .map(|pair| ConceptRelationship::new(&pair[0].text, &pair[1].text, "parent_child", 1.0))
        .collect()
}

/// Framework dependencies of each code block, plus the RealityKit
/// `ModelEntity` concept dependency.
pub fn code_relationships(blocks: &[CodeBlock]) -> Vec<ConceptRelationship> {
    let mut relationships = Vec::new();

    for block in blocks {
        let kind = block.kind.as_str();
        for framework in &block.frameworks {
            relationships.push(ConceptRelationship::new(framework, kind, "framework_dependency", 1.0));
        }

        if block.frameworks.contains("RealityKit") && block.code.contains("ModelEntity") {
            relationships.push(ConceptRelationship::new("3d_content", kind, "concept_dependency", 0.9));
        }
    }

    relationships
}
