//! Per-session reply generation for continuous calls

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use totem_core::{
    ConversationHistory, Error, GenerateRequest, KnowledgeSearch, LanguageModel, ReplyGenerator,
    Result,
};
use totem_search::extract_relevant_text;

/// Search-grounded reply generator with bounded conversation history.
///
/// One instance per session; the search and LLM clients behind it are
/// process-wide and shared.
pub struct TotemReplyGenerator {
    search: Arc<dyn KnowledgeSearch>,
    llm: Arc<dyn LanguageModel>,
    history: Mutex<ConversationHistory>,
    top_k: usize,
}

impl TotemReplyGenerator {
    pub fn new(
        search: Arc<dyn KnowledgeSearch>,
        llm: Arc<dyn LanguageModel>,
        history_capacity: usize,
        top_k: usize,
    ) -> Self {
        Self {
            search,
            llm,
            history: Mutex::new(ConversationHistory::new(history_capacity)),
            top_k,
        }
    }
}

#[async_trait]
impl ReplyGenerator for TotemReplyGenerator {
    async fn reply(&self, utterance: &str) -> Result<String> {
        if utterance.trim().is_empty() {
            return Err(Error::InvalidInput("utterance cannot be empty".into()));
        }

        // Search failure degrades to generation without grounding; it does
        // not fail the turn.
        let context = match self.search.search(utterance, None, self.top_k).await {
            Ok(snippets) => {
                debug!(results = snippets.len(), "knowledge search complete");
                extract_relevant_text(&snippets)
            }
            Err(e) => {
                warn!(error = %e, "knowledge search failed, replying without context");
                String::new()
            }
        };

        let history = self.history.lock().turns();
        let request = GenerateRequest::new(utterance)
            .with_context(context)
            .with_history(history);

        let reply = self.llm.generate(request).await?;
        self.history.lock().push_exchange(utterance, &reply.text);

        Ok(reply.text)
    }

    fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    fn reset(&self) {
        self.history.lock().clear();
    }
}
