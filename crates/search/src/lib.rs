//! Knowledge index search
//!
//! Azure AI Search client plus the snippet post-processing the answer
//! pipeline feeds to the LLM: pick the best chunks, strip noise, combine.

pub mod azure;
pub mod snippets;

pub use azure::AzureSearchClient;
pub use snippets::{clean_text, extract_relevant_text};
