//! Context retrieval collaborator
//!
//! The gateway does not rank or store pages. A host plugs in a
//! [`ContextRetriever`]; the chat endpoint turns its pages into the `sources`
//! frame and a leading system message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Message, SourceRef};

/// A retrieved page, ranked by the retriever
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPage {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl ContextPage {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn source_ref(&self) -> SourceRef {
        SourceRef::new(self.id.clone(), self.title.clone())
    }
}

#[derive(Debug, Error)]
#[error("retrieval failed: {0}")]
pub struct RetrievalError(pub String);

pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Source of context pages for a query
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// At most `limit` pages relevant to `query`, best first
    async fn retrieve(&self, query: &str, limit: usize) -> RetrievalResult<Vec<ContextPage>>;
}

/// Default number of pages fetched per chat request
pub const DEFAULT_CONTEXT_LIMIT: usize = 5;

/// System message presenting `pages` to the model; `None` when there are none
pub fn context_message(pages: &[ContextPage]) -> Option<Message> {
    if pages.is_empty() {
        return None;
    }
    let mut text = String::from(
        "Answer using the following notes when they are relevant. Cite notes by title.\n",
    );
    for page in pages {
        text.push_str(&format!("\n## {}\n{}\n", page.title, page.content.trim()));
    }
    Some(Message::system(text))
}

pub fn source_refs(pages: &[ContextPage]) -> Vec<SourceRef> {
    pages.iter().map(ContextPage::source_ref).collect()
}

/// Fixed page set matched by case-insensitive term overlap
///
/// For tests and hosts without a search index.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    pages: Vec<ContextPage>,
}

impl StaticRetriever {
    pub fn new(pages: Vec<ContextPage>) -> Self {
        Self { pages }
    }

    fn score(page: &ContextPage, terms: &[String]) -> usize {
        let haystack = format!("{} {}", page.title, page.content).to_lowercase();
        terms.iter().filter(|term| haystack.contains(term.as_str())).count()
    }
}

#[async_trait]
impl ContextRetriever for StaticRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> RetrievalResult<Vec<ContextPage>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| t.len() > 3)
            .collect();

        let mut scored: Vec<(usize, &ContextPage)> = self
            .pages
            .iter()
            .map(|page| (Self::score(page, &terms), page))
            .filter(|(score, _)| *score > 0)
            .collect();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, page)| page.clone())
            .collect())
    }
}
