use crate::models::RetrievedChunk;

pub const DEFAULT_FALLBACK_PHRASE: &str = "I don't have that info in my resume.";
pub const DEFAULT_CANDIDATE_NAME: &str = "the candidate";

/// Instruction wrapper around the retrieved context. Asking the model to stay inside
/// the context is a request only; nothing checks the response against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub candidate_name: String,
    pub fallback_phrase: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            candidate_name: DEFAULT_CANDIDATE_NAME.to_string(),
            fallback_phrase: DEFAULT_FALLBACK_PHRASE.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn render(&self, context: &[RetrievedChunk], question: &str) -> String {
        format!(
            "You are {name}. Answer the question based ONLY on the context provided below.\n\
             If the answer is not in the context, say \"{fallback}\"\n\
             \n\
             Context:\n\
             {context}\n\
             \n\
             Question:\n\
             {question}\n",
            name = self.candidate_name,
            fallback = self.fallback_phrase,
            context = join_context(context),
            question = question.trim(),
        )
    }

    pub fn is_fallback(&self, answer: &str) -> bool {
        let expected = self.fallback_phrase.trim();
        let answer = answer.trim().trim_matches('"');
        answer == expected || answer.trim_end_matches('.') == expected.trim_end_matches('.')
    }
}

/// Retrieved chunk texts in rank order, separated by a blank line.
pub fn join_context(context: &[RetrievedChunk]) -> String {
    context
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
