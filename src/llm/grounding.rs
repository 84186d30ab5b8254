//! Strict grounding prompt.
//!
//! The model may only use the supplied context and must answer with
//! [`REFUSAL_SENTENCE`] when the context does not cover the question.

/// Sentence the model must use when the context lacks the answer.
pub const REFUSAL_SENTENCE: &str = "I don't have that information in the provided context. Please ask about the details that are available.";

/// Builds the full prompt sent to the model.
///
/// `query` must already be trimmed and length-checked; `context` must come from
/// [`crate::services::build_context`].
#[must_use]
pub fn build_grounded_prompt(context: &str, query: &str) -> String {
    format!(
        r#"You are an AI assistant helping visitors learn about a specific project or research paper.

STRICT RULES:
1. You MUST answer using ONLY the information provided in the context below
2. If the context does not contain the information needed to answer the question, say: "{REFUSAL_SENTENCE}"
3. DO NOT make up, infer, or fabricate any information
4. DO NOT mention skills, technologies, or features not explicitly stated in the context
5. Keep your answers concise and directly based on the context

CONTEXT:
{context}

USER QUESTION: {query}

Please provide a helpful answer based strictly on the context above."#
    )
}
