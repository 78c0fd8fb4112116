//! Generation options shared by every backend

use serde::{Deserialize, Serialize};

/// Options for chat, streaming chat and embedding requests.
///
/// Every field is optional. Each adapter forwards the fields its backend
/// understands and drops the rest without complaint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    /// Model identifier; adapters fall back to their own default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature (0.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Nucleus sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl GenerationOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Set top-p
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    pub fn with_presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    /// Set stop sequences
    pub fn with_stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.stop_sequences = Some(stop);
        self
    }

    /// Model to use, falling back to `default` when none was requested.
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.model.as_deref() {
            Some(model) if !model.trim().is_empty() => model,
            _ => default,
        }
    }

    /// Stop sequences, or `None` when absent or empty
    pub fn stop(&self) -> Option<&[String]> {
        self.stop_sequences
            .as_deref()
            .filter(|stop| !stop.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = GenerationOptions::new()
            .with_model("gpt-4o")
            .with_temperature(0.2)
            .with_max_tokens(256)
            .with_top_p(0.9)
            .with_frequency_penalty(0.1)
            .with_presence_penalty(0.3)
            .with_stop_sequences(vec!["END".to_string()]);

        assert_eq!(options.model.as_deref(), Some("gpt-4o"));
        assert_eq!(options.max_tokens, Some(256));
        assert_eq!(options.stop(), Some(&["END".to_string()][..]));
    }

    #[test]
    fn test_model_fallback() {
        let options = GenerationOptions::default();
        assert_eq!(options.model_or("llama3.2"), "llama3.2");

        let blank = GenerationOptions::new().with_model("  ");
        assert_eq!(blank.model_or("llama3.2"), "llama3.2");

        let explicit = GenerationOptions::new().with_model("mistral");
        assert_eq!(explicit.model_or("llama3.2"), "mistral");
    }

    #[test]
    fn test_empty_stop_is_none() {
        let options = GenerationOptions::new().with_stop_sequences(vec![]);
        assert!(options.stop().is_none());
    }

    #[test]
    fn test_camel_case_deserialization() {
        let options: GenerationOptions = serde_json::from_str(
            r#"{"maxTokens":100,"topP":0.5,"stopSequences":["x"],"presencePenalty":1.0}"#,
        )
        .unwrap();
        assert_eq!(options.max_tokens, Some(100));
        assert_eq!(options.top_p, Some(0.5));
        assert_eq!(options.presence_penalty, Some(1.0));
        assert!(options.model.is_none());

        let json = serde_json::to_string(&GenerationOptions::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
