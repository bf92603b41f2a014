use crate::Prompt;

/// Instruction sent ahead of every question.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful, knowledgeable, and friendly AI assistant from I-TECH. Provide clear, concise, and accurate responses.";

/// Wrap `question` in the assistant's two-message prompt.
///
/// The question is inserted verbatim: no trimming, escaping or truncation.
pub fn build_prompt(question: &str) -> Prompt {
    Prompt::system(SYSTEM_INSTRUCTION).with_user(format!("Question: {question}"))
}
