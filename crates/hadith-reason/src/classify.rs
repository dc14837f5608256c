use async_trait::async_trait;
use hadith_core::error::{ExternalError, ExternalResult};
use hadith_core::traits::Classify;
use hadith_core::types::QueryType;
use hadith_openai::{ChatRequest, Message, OpenAIClient};
use tracing::debug;

use crate::prompts::CLASSIFY_SYSTEM;

pub struct LlmClassifier {
    client: OpenAIClient,
    model: String,
}

impl LlmClassifier {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }
}

#[async_trait]
impl Classify for LlmClassifier {
    async fn classify(&self, query: &str) -> ExternalResult<QueryType> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(CLASSIFY_SYSTEM))
            .message(Message::user(query))
            .temperature(0.0)
            .max_tokens(20);
        let reply = self.client.chat_completion(request).await?;
        let label = parse_classification(&reply)?;
        debug!(%label, "Classified query");
        Ok(label)
    }
}

/// Find the label in a free-form model reply.
///
/// `HADITH_QUERY` wins when several labels appear, so an ambiguous reply
/// still searches.
pub fn parse_classification(reply: &str) -> ExternalResult<QueryType> {
    let upper = reply.trim().to_uppercase();
    [QueryType::HadithQuery, QueryType::Greeting, QueryType::OffTopic]
        .into_iter()
        .find(|t| upper.contains(t.as_str()))
        .ok_or_else(|| ExternalError::MalformedOutput(format!("unrecognized classification '{}'", reply.trim())))
}
