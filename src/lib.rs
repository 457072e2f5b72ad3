pub mod analyzers;
pub mod cli;
pub mod cli_types;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod logging;
pub mod scanner;
pub mod storage;
pub mod tools;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use types::*;
pub use analyzers::{ComponentAnalyzer, DocumentationAnalyzer, PatternRefiner, ProjectAnalyzer, TopicAnalyzer};
pub use config::MineConfig;
pub use crawler::{DocumentationScraper, DocumentationUrlCollector};
pub use error::{MineError, Result};
pub use storage::{CacheManager, EnhancedKnowledgeBase, KnowledgeBase, PatternEvolution, PatternIndex, RelationshipTracker};
pub use cli::CliApp;
pub use tools::{KnowledgeTools, ToolResult, ToolSchema};
pub use ui::{OutputFormatter, ProgressIndicator, UIManager};
