pub mod catalog;
pub mod component;
pub mod docs;
pub mod project;
pub mod refiner;
pub mod topics;

pub use component::ComponentAnalyzer;
pub use docs::{load_extracted_pages, load_latest_documentation, statistics, DocStatistics, DocumentationAnalyzer};
pub use project::{analyze_api_patterns, ProjectAnalyzer, ProjectReport};
pub use refiner::{PatternRefiner, RefinedPattern, ValidationStatus};
pub use topics::TopicAnalyzer;
