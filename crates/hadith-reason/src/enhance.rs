use async_trait::async_trait;
use hadith_core::error::ExternalResult;
use hadith_core::traits::Enhance;
use hadith_openai::{ChatRequest, Message, OpenAIClient};

use crate::prompts::{enhance_user, ENHANCE_SYSTEM};

pub struct LlmEnhancer {
    client: OpenAIClient,
    model: String,
}

impl LlmEnhancer {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }
}

#[async_trait]
impl Enhance for LlmEnhancer {
    async fn enhance(&self, query: &str) -> ExternalResult<String> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(ENHANCE_SYSTEM))
            .message(Message::user(enhance_user(query)))
            .temperature(0.2)
            .max_tokens(300);
        let reply = self.client.chat_completion(request).await?;
        Ok(reply.trim().to_string())
    }
}
