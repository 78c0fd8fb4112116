//! Provider selection and configuration types

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The closed set of backends the gateway can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OpenAI-style chat completions API (SSE streaming)
    OpenAi,
    /// Anthropic-style messages API (SSE streaming with named events)
    Anthropic,
    /// Locally hosted model server (NDJSON streaming)
    Local,
}

/// Error returned when a provider name does not match any known backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl ProviderKind {
    /// All provider kinds, in display order
    pub const ALL: [ProviderKind; 3] = [ProviderKind::OpenAi, ProviderKind::Anthropic, ProviderKind::Local];

    /// Canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Local => "local",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Local => "Local (Ollama)",
        }
    }

    /// Default API base URL when none is configured
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Local => "http://localhost:11434",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
            ProviderKind::Local => "llama3.2",
        }
    }

    /// Default embedding model. Anthropic embeds through the OpenAI adapter.
    pub fn default_embedding_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi | ProviderKind::Anthropic => "text-embedding-3-small",
            ProviderKind::Local => "nomic-embed-text",
        }
    }

    /// Whether a credential must be present before an adapter is built
    pub fn requires_credential(&self) -> bool {
        !matches!(self, ProviderKind::Local)
    }

    /// Key under which this provider's credential is stored in a `SecretStore`
    pub fn secret_key(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "local" | "ollama" => Ok(ProviderKind::Local),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

impl Serialize for ProviderKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Caller-supplied provider configuration.
///
/// `credential` is required for cloud kinds and ignored for `Local`.
/// `embedding_credential` is only read by the Anthropic adapter, which has no
/// embedding endpoint of its own.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(rename = "provider")]
    pub kind: ProviderKind,
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(rename = "embeddingApiKey", default, skip_serializing_if = "Option::is_none")]
    pub embedding_credential: Option<String>,
}

impl ProviderConfig {
    /// Create a configuration for the given provider
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            credential: None,
            base_url: None,
            embedding_credential: None,
        }
    }

    /// Set the credential
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    /// Set the OpenAI-compatible credential used for embeddings
    pub fn with_embedding_credential(mut self, credential: impl Into<String>) -> Self {
        self.embedding_credential = Some(credential.into());
        self
    }

    /// Configured base URL, or the provider default
    pub fn base_url_or_default(&self) -> &str {
        match self.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => self.kind.default_base_url(),
        }
    }

    /// Non-blank credential, if any
    pub fn credential(&self) -> Option<&str> {
        non_blank(self.credential.as_deref())
    }

    pub fn embedding_credential(&self) -> Option<&str> {
        non_blank(self.embedding_credential.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// Credentials stay out of debug output and logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field(
                "embedding_credential",
                &self.embedding_credential.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Static information about a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    /// Provider identifier
    pub id: String,
    /// Display name
    pub display_name: String,
    /// Default API base URL
    pub default_base_url: String,
    /// Whether a credential is required
    pub requires_credential: bool,
    pub default_model: String,
    pub default_embedding_model: String,
}

impl From<ProviderKind> for ProviderMetadata {
    fn from(kind: ProviderKind) -> Self {
        Self {
            id: kind.as_str().to_string(),
            display_name: kind.display_name().to_string(),
            default_base_url: kind.default_base_url().to_string(),
            requires_credential: kind.requires_credential(),
            default_model: kind.default_model().to_string(),
            default_embedding_model: kind.default_embedding_model().to_string(),
        }
    }
}
