pub mod code_blocks;
pub mod page;
pub mod relationships;

pub use code_blocks::{detect_frameworks, determine_code_type, extract_code_blocks, KNOWN_FRAMEWORKS};
pub use page::{classify_content, determine_section, DocumentationExtractor};
