//! LLM-based reranker implementation.

use std::sync::Arc;

use async_trait::async_trait;

use recollect_core::error::{RecollectError, RecollectResult};
use recollect_core::traits::{CompletionOptions, Llm, Reranker};
use recollect_core::types::Message;

const SYSTEM_PROMPT: &str = "You are a document relevance scorer for a tutoring assistant.";

/// Uses an [`Llm`] to score document relevance.
pub struct LlmReranker {
    llm: Arc<dyn Llm>,
}

impl LlmReranker {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }

    fn build_prompt(query: &str, documents: &[String]) -> String {
        let mut prompt = format!(
            "Score each document's relevance to the query on a scale of 0.0 to 1.0.\n\n\
            Query: {}\n\n\
            Documents to score:\n",
            query
        );

        for (i, document) in documents.iter().enumerate() {
            prompt.push_str(&format!("\n[Document {}]: {}\n", i, document));
        }

        prompt.push_str(&format!(
            "\n\nRespond with a JSON array of exactly {} scores in document order, e.g. [0.8, 0.2, 0.5].\n\
            Only output the JSON array, nothing else.",
            documents.len()
        ));

        prompt
    }
}

/// Pull the JSON score array out of a reply, tolerating surrounding prose.
fn parse_scores(reply: &str, expected: usize) -> RecollectResult<Vec<f32>> {
    let start = reply.find('[');
    let end = reply.rfind(']');
    let array = match (start, end) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(RecollectError::reranker(format!(
                "no score array in reply: {}",
                reply.trim()
            )))
        }
    };

    let scores: Vec<f32> = serde_json::from_str(array)
        .map_err(|e| RecollectError::reranker(format!("invalid score array: {}", e)))?;
    if scores.len() != expected {
        return Err(RecollectError::reranker(format!(
            "expected {} scores, got {}",
            expected,
            scores.len()
        )));
    }
    Ok(scores)
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn score(&self, query: &str, documents: &[String]) -> RecollectResult<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(Self::build_prompt(query, documents)),
        ];
        let reply = self
            .llm
            .complete(&messages, Some(CompletionOptions::scoring()))
            .await
            .map_err(|e| RecollectError::reranker(e.to_string()))?;

        parse_scores(&reply, documents.len())
    }

    fn model_name(&self) -> &str {
        self.llm.model_name()
    }
}
