pub mod cache;
pub mod enhanced;
pub mod evolution;
pub mod json;
pub mod knowledge;
pub mod memory;
pub mod relationships;

pub use cache::{CacheFile, CacheInspection, CacheManager, SampleCache};
pub use enhanced::{
    ComponentConstraint, ComponentHierarchy, ComponentMetadata, ComponentRelationship,
    EnhancedKnowledgeBase, HierarchyView, PatternMetadata, RelationKind, UsageContext,
};
pub use evolution::{DiscoveredPattern, PatternEvolution, PatternSuggestions};
pub use json::{load_json, save_json};
pub use knowledge::{KnowledgeBase, KnowledgePattern};
pub use memory::{PatternIndex, QueryResult, TermHit};
pub use relationships::{RelationshipStats, RelationshipTracker};
