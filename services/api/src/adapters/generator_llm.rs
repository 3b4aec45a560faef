//! services/api/src/adapters/generator_llm.rs
//!
//! This module contains the adapter for the question-generating LLM.
//! It implements the `QuestionGeneratorService` port from the `core` crate
//! against any OpenAI-compatible chat-completions endpoint (Gemini's
//! compatibility endpoint by default).

const SYSTEM_INSTRUCTIONS: &str = "You are an expert quiz generator. Generate multiple choice \
questions based on the provided content. Provide the JSON response directly without wrapping \
it in backticks or marking it as a code block. Each question should have exactly 4 options \
with one correct answer.";

const PROMPT_TEMPLATE: &str = r#"Generate {num_questions} multiple choice questions from the following content.

Requirements:
- Difficulty level: {difficulty}
- Bloom's taxonomy levels: {bloom_levels}
- Topic focus: {topic}
- Each question must have 4 options
- Avoid these previous questions: {previous_questions}

Content:
{content}

Return ONLY a JSON array in this exact format:
[
    {
        "question": "What is the capital of France?",
        "options": ["Paris", "London", "Berlin", "Madrid"],
        "answer": "Paris",
        "difficulty": "easy",
        "bloom_level": "remember"
    }
]"#;

/// At most this many previous questions are named in the prompt; the rest of
/// the exclusion list is noise the model would ignore anyway.
const MAX_PROMPT_EXCLUSIONS: usize = 5;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;

use quizforge_core::domain::{BloomLevel, Hardness};
use quizforge_core::ports::{
    CandidateQuestion, GenerationParams, PortError, PortResult, QuestionGeneratorService,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuestionGeneratorService` using an
/// OpenAI-compatible LLM.
#[derive(Clone)]
pub struct LlmGeneratorAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl LlmGeneratorAdapter {
    /// Creates a new `LlmGeneratorAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// The JSON shape the generator is asked to return.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    answer: String,
    difficulty: Option<String>,
    bloom_level: Option<String>,
}

fn build_prompt(source_text: &str, params: &GenerationParams) -> String {
    let bloom_levels = params
        .bloom_levels
        .iter()
        .map(|level| level.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let previous = params
        .avoid
        .iter()
        .take(MAX_PROMPT_EXCLUSIONS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    PROMPT_TEMPLATE
        .replace("{num_questions}", &params.num_questions.to_string())
        .replace("{difficulty}", params.hardness.as_str())
        .replace("{bloom_levels}", &bloom_levels)
        .replace("{topic}", params.topic.as_deref().unwrap_or("general"))
        .replace("{previous_questions}", &previous)
        .replace("{content}", source_text)
}

/// Strips a leading/trailing markdown code fence if the model added one
/// despite the instructions.
fn strip_code_fences(response: &str) -> &str {
    let mut text = response.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn parse_questions(response: &str) -> PortResult<Vec<CandidateQuestion>> {
    let cleaned = strip_code_fences(response);
    let raw: Vec<RawQuestion> = serde_json::from_str(cleaned)
        .map_err(|e| PortError::Generation(format!("unparseable generator output: {e}")))?;

    Ok(raw
        .into_iter()
        .map(|q| CandidateQuestion {
            question: q.question,
            options: q.options,
            answer: q.answer,
            difficulty: q.difficulty.as_deref().and_then(Hardness::parse),
            bloom_level: q.bloom_level.as_deref().and_then(BloomLevel::parse),
        })
        .collect())
}

//=========================================================================================
// `QuestionGeneratorService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuestionGeneratorService for LlmGeneratorAdapter {
    async fn generate(
        &self,
        source_text: &str,
        params: &GenerationParams,
    ) -> PortResult<Vec<CandidateQuestion>> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(source_text, params))
                .build()
                .map_err(|e| PortError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Generation(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Generation(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Generation("generator returned no text content".to_string())
            })?;

        parse_questions(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_RESPONSE: &str = r#"[
        {
            "question": "What is the capital of France?",
            "options": ["Paris", "London", "Berlin", "Madrid"],
            "answer": "Paris",
            "difficulty": "easy",
            "bloom_level": "remember"
        }
    ]"#;

    #[test]
    fn parses_a_plain_json_array() {
        let questions = parse_questions(VALID_RESPONSE).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "What is the capital of France?");
        assert_eq!(questions[0].options.len(), 4);
        assert_eq!(questions[0].answer, "Paris");
        assert_eq!(questions[0].difficulty, Some(Hardness::Easy));
        assert_eq!(questions[0].bloom_level, Some(BloomLevel::Remember));
    }

    #[test]
    fn strips_code_fences_before_parsing() {
        let fenced = format!("```json\n{VALID_RESPONSE}\n```");
        let questions = parse_questions(&fenced).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn unknown_enum_values_fall_back_to_none() {
        let response = r#"[{"question": "q", "options": ["a","b","c","d"],
            "answer": "a", "difficulty": "impossible", "bloom_level": "transcend"}]"#;
        let questions = parse_questions(response).unwrap();
        assert_eq!(questions[0].difficulty, None);
        assert_eq!(questions[0].bloom_level, None);
    }

    #[test]
    fn prose_output_is_a_generation_error() {
        let result = parse_questions("I could not generate questions for this document.");
        assert!(matches!(result, Err(PortError::Generation(_))));
    }

    #[test]
    fn prompt_carries_params_and_caps_exclusions() {
        let params = GenerationParams {
            num_questions: 3,
            hardness: Hardness::Hard,
            bloom_levels: vec![BloomLevel::Apply, BloomLevel::Analyze],
            topic: Some("rivers".to_string()),
            avoid: (0..8).map(|i| format!("old question {i}")).collect(),
        };
        let prompt = build_prompt("some content", &params);

        assert!(prompt.contains("Generate 3 multiple choice questions"));
        assert!(prompt.contains("Difficulty level: hard"));
        assert!(prompt.contains("apply, analyze"));
        assert!(prompt.contains("Topic focus: rivers"));
        assert!(prompt.contains("old question 4"));
        assert!(!prompt.contains("old question 5"));
        assert!(prompt.contains("some content"));
    }
}
