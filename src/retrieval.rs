//! Passage retrieval for grounded chat.
//!
//! Similarity search proper lives behind [`Retriever`]; the bundled
//! [`KeywordRetriever`] scores passages by query-term overlap and is enough
//! for small plain-text documents.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;

/// Default passage size when splitting a document.
pub const DEFAULT_PASSAGE_CHARS: usize = 800;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `k` passages, most relevant first. Order between equally
    /// relevant passages is unspecified.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Default)]
pub struct KeywordRetriever {
    passages: Vec<Passage>,
}

#[derive(Debug, Clone)]
struct Passage {
    text: String,
    terms: BTreeSet<String>,
}

impl KeywordRetriever {
    pub fn new<I, S>(passages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passages: passages
                .into_iter()
                .map(Into::<String>::into)
                .filter(|p| !p.trim().is_empty())
                .map(|text| Passage {
                    terms: terms(&text),
                    text,
                })
                .collect(),
        }
    }

    /// Split a document into passages of at most `max_chars` characters.
    pub fn from_text(text: &str, max_chars: usize) -> Self {
        Self::new(split_passages(text, max_chars))
    }

    pub fn from_file(path: &Path, max_chars: usize) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading document: {}", path.display()))?;
        Ok(Self::from_text(&text, max_chars))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn rank(&self, query: &str, k: usize) -> Vec<String> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, usize)> = self
            .passages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.terms.intersection(&query_terms).count(), i))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(k)
            .map(|(_, i)| self.passages[i].text.clone())
            .collect()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self.rank(query, k))
    }
}

/// Lowercased alphanumeric words of three or more characters.
fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Paragraphs packed greedily up to `max_chars`; oversized paragraphs are
/// split on word boundaries.
pub fn split_passages(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, out: &mut Vec<String>| {
        if !current.trim().is_empty() {
            out.push(current.trim().to_string());
        }
        current.clear();
    };

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let pieces = if paragraph.chars().count() > max_chars {
            split_words(paragraph, max_chars)
        } else {
            vec![paragraph.to_string()]
        };
        for piece in pieces {
            let joined = current.chars().count() + piece.chars().count() + 2;
            if !current.is_empty() && joined > max_chars {
                flush(&mut current, &mut out);
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&piece);
        }
    }
    flush(&mut current, &mut out);
    out
}

fn split_words(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
