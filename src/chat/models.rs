//! Request and response bodies for the chat service

use serde::{Deserialize, Serialize};

/// Reply shown when the chat service cannot answer
pub const FALLBACK_MESSAGE: &str =
    "Desculpe, não consegui processar sua pergunta agora. Tente novamente em instantes.";

/// Request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The learner's question
    pub message: String,
    /// Title and description of the lesson being watched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_context: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), lesson_context: None }
    }

    /// Attach lesson context
    pub fn with_lesson_context(mut self, context: impl Into<String>) -> Self {
        self.lesson_context = Some(context.into());
        self
    }
}

/// Response body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_context() {
        let request = ChatRequest::new("O que é ownership?").with_lesson_context("Aula 3");
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"lessonContext\":\"Aula 3\""));
    }

    #[test]
    fn request_omits_missing_context() {
        let json = serde_json::to_string(&ChatRequest::new("oi")).unwrap();
        assert_eq!(json, r#"{"message":"oi"}"#);
    }

    #[test]
    fn response_deserializes() {
        let response: ChatResponse = serde_json::from_str(r#"{"response":"Olá!"}"#).unwrap();
        assert_eq!(response.response, "Olá!");
    }
}
