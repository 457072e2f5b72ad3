use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::analyzers::PatternRefiner;
use crate::config::MineConfig;
use crate::storage::{EnhancedKnowledgeBase, KnowledgeBase, PatternIndex, RelationshipTracker};

/// Tool description in the shape LLM tool-use APIs expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: json!({}),
            error: Some(message),
        }
    }
}

/// Read-only access to the knowledge files for a code generator.
pub struct KnowledgeTools {
    knowledge: KnowledgeBase,
    refiner: PatternRefiner,
    tracker: RelationshipTracker,
    enhanced: EnhancedKnowledgeBase,
    index: Arc<PatternIndex>,
}

impl KnowledgeTools {
    pub fn new(
        knowledge: KnowledgeBase,
        refiner: PatternRefiner,
        tracker: RelationshipTracker,
        enhanced: EnhancedKnowledgeBase,
        index: Arc<PatternIndex>,
    ) -> Self {
        Self {
            knowledge,
            refiner,
            tracker,
            enhanced,
            index,
        }
    }

    /// Open everything under the configured knowledge directory and index
    /// the stored file analyses.
    pub fn open(config: &MineConfig) -> Result<Self> {
        let dir = config.storage.knowledge_dir();
        let knowledge = KnowledgeBase::new(&dir).context("Failed to open knowledge base")?;
        let analyses = knowledge
            .file_analyses()
            .context("Failed to read file analyses")?;
        let index = PatternIndex::from_analyses(analyses).context("Failed to build pattern index")?;

        Ok(Self::new(
            knowledge,
            PatternRefiner::new(&dir, config.analysis.confidence_threshold),
            RelationshipTracker::new(&dir).context("Failed to load relationships")?,
            EnhancedKnowledgeBase::open(dir.join("enhanced")).context("Failed to open enhanced knowledge base")?,
            Arc::new(index),
        ))
    }

    pub fn get_tool_schemas(&self) -> Vec<ToolSchema> {
        vec![
            ToolSchema {
                name: "query_pattern".to_string(),
                description: "Get detection counts, source files, examples and related imports for a visionOS pattern type".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "pattern_type": {
                            "type": "string",
                            "description": "Pattern type such as ui_components, animation or 3d_content"
                        }
                    },
                    "required": ["pattern_type"]
                }),
            },
            ToolSchema {
                name: "search_terms".to_string(),
                description: "Search matched Swift terms (types, modifiers, property wrappers) across analyzed sample code".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Term, substring or regex to look for"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of results to return",
                            "default": 20
                        },
                        "fuzzy": {
                            "type": "boolean",
                            "description": "Rank terms by fuzzy similarity instead",
                            "default": false
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolSchema {
                name: "get_refined_pattern".to_string(),
                description: "Get the refined detection terms, imports, confidence and validation status of a pattern type".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "pattern_type": {
                            "type": "string",
                            "description": "Pattern type to look up"
                        }
                    },
                    "required": ["pattern_type"]
                }),
            },
            ToolSchema {
                name: "get_related_items".to_string(),
                description: "List items related to a pattern or concept, with relationship type and strength".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "item": {
                            "type": "string",
                            "description": "Source pattern or concept"
                        },
                        "min_strength": {
                            "type": "number",
                            "description": "Minimum relationship strength between 0 and 1",
                            "default": 0.3
                        }
                    },
                    "required": ["item"]
                }),
            },
            ToolSchema {
                name: "list_relationships".to_string(),
                description: "Summarize tracked relationships: totals, types, strongest and most connected items".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            ToolSchema {
                name: "get_component_hierarchy".to_string(),
                description: "Get children, dependencies, peers, common combinations and integration patterns of a component".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "component": {
                            "type": "string",
                            "description": "Component name such as RealityView or ImmersiveSpace"
                        }
                    },
                    "required": ["component"]
                }),
            },
        ]
    }

    pub async fn execute_tool(&self, tool_name: &str, input: Value) -> Result<ToolResult> {
        match tool_name {
            "query_pattern" => self.query_pattern(input),
            "search_terms" => self.search_terms(input),
            "get_refined_pattern" => self.get_refined_pattern(input),
            "get_related_items" => self.get_related_items(input),
            "list_relationships" => Ok(self.list_relationships()),
            "get_component_hierarchy" => self.get_component_hierarchy(input),
            _ => Ok(ToolResult::error(format!("Unknown tool: {}", tool_name))),
        }
    }

    fn query_pattern(&self, input: Value) -> Result<ToolResult> {
        let input: PatternTypeInput = serde_json::from_value(input).context("Invalid query_pattern input")?;
        let pattern = self.knowledge.query_pattern(&input.pattern_type);

        Ok(ToolResult::success(json!({
            "pattern_type": input.pattern_type,
            "found": pattern.is_some(),
            "pattern": pattern
        })))
    }

    fn search_terms(&self, input: Value) -> Result<ToolResult> {
        let input: SearchTermsInput = serde_json::from_value(input).context("Invalid search_terms input")?;
        let results = self.index.find_term_with_options(
            &input.query,
            input.limit.unwrap_or(20),
            input.fuzzy.unwrap_or(false),
        );

        Ok(ToolResult::success(json!({
            "query": input.query,
            "results": results,
            "count": results.len()
        })))
    }

    fn get_refined_pattern(&self, input: Value) -> Result<ToolResult> {
        let input: PatternTypeInput = serde_json::from_value(input).context("Invalid get_refined_pattern input")?;
        let mut refined = self
            .refiner
            .refined_patterns()
            .context("Failed to read refined patterns")?;

        match refined.remove(&input.pattern_type) {
            Some(pattern) => Ok(ToolResult::success(json!({
                "pattern_type": input.pattern_type,
                "refined": pattern
            }))),
            None => Ok(ToolResult::error(format!(
                "No refined pattern for {}",
                input.pattern_type
            ))),
        }
    }

    fn get_related_items(&self, input: Value) -> Result<ToolResult> {
        let input: RelatedItemsInput = serde_json::from_value(input).context("Invalid get_related_items input")?;
        let related = self
            .tracker
            .get_related_items(&input.item, input.min_strength.unwrap_or(0.3));

        Ok(ToolResult::success(json!({
            "item": input.item,
            "related": related,
            "count": related.len()
        })))
    }

    fn list_relationships(&self) -> ToolResult {
        ToolResult::success(json!(self.tracker.get_relationship_stats()))
    }

    fn get_component_hierarchy(&self, input: Value) -> Result<ToolResult> {
        let input: ComponentInput = serde_json::from_value(input).context("Invalid get_component_hierarchy input")?;
        let hierarchy = self.enhanced.get_component_hierarchy(&input.component);

        Ok(ToolResult::success(json!({
            "component": input.component,
            "metadata": self.enhanced.get_component(&input.component),
            "hierarchy": hierarchy,
            "related": self.enhanced.get_related_components(&input.component)
        })))
    }
}

#[derive(Debug, Deserialize)]
struct PatternTypeInput {
    pattern_type: String,
}

#[derive(Debug, Deserialize)]
struct SearchTermsInput {
    query: String,
    limit: Option<usize>,
    fuzzy: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RelatedItemsInput {
    item: String,
    min_strength: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ComponentInput {
    component: String,
}
