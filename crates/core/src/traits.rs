use crate::error::GenerationError;
use async_trait::async_trait;

#[async_trait]
pub trait AnswerGenerator {
    /// Sends one fully assembled prompt and returns the model text unchanged.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
