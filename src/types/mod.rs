pub mod analysis;
pub mod documentation;
pub mod project;

pub use analysis::{Census, ComponentReport, FileAnalysis, PatternCensus, TermMap};
pub use documentation::{
    CodeBlock, CodeKind, ConceptRelationship, DocStructure, DocumentationPage, Parameter, Topic,
};
pub use project::{DiscoveredLinks, LinkCategory, ProjectResource};
