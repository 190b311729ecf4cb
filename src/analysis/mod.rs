//! Text analysis over film opening crawls
//!
//! Counts every word in the combined corpus and tallies how often each known
//! character name is mentioned.

use crate::{HolonetError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\b\w+\b").expect("word pattern is valid");
}

/// Occurrences of one word in the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Result of [`analyze`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusAnalysis {
    /// One entry per distinct word, most frequent first
    pub word_counts: Vec<WordCount>,
    /// Mentions per character name; names never mentioned are absent
    pub mentions: BTreeMap<String, usize>,
    /// Every name sharing the highest mention count, sorted
    pub top_mentioned: Vec<String>,
}

impl CorpusAnalysis {
    /// The `n` most frequent words
    pub fn top_words(&self, n: usize) -> &[WordCount] {
        &self.word_counts[..n.min(self.word_counts.len())]
    }

    pub fn count_of(&self, word: &str) -> usize {
        self.word_counts
            .iter()
            .find(|wc| wc.word == word)
            .map_or(0, |wc| wc.count)
    }
}

/// Analyze `texts` for word frequencies and mentions of `names`
///
/// The corpus is the texts joined with a single space and lower-cased.
/// Words are runs of Unicode letters, digits and underscores, so "Padmé"
/// is one word rather than "padm" plus a stray letter.
/// Names match case-insensitively on word boundaries, so "Luke" counts
/// inside "Luke's" but not inside "Lukewarm".
pub fn analyze<S, N>(texts: &[S], names: &[N]) -> Result<CorpusAnalysis>
where
    S: AsRef<str>,
    N: AsRef<str>,
{
    let corpus = texts
        .iter()
        .map(|text| text.as_ref())
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase();

    let word_counts = count_words(&corpus);
    let mentions = count_mentions(&corpus, names)?;
    let top_mentioned = most_mentioned(&mentions);

    tracing::debug!(
        words = word_counts.len(),
        mentioned = mentions.len(),
        "Analyzed corpus"
    );

    Ok(CorpusAnalysis {
        word_counts,
        mentions,
        top_mentioned,
    })
}

fn count_words(corpus: &str) -> Vec<WordCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in WORD.find_iter(corpus) {
        *counts.entry(word.as_str()).or_insert(0) += 1;
    }

    let mut pairs: Vec<WordCount> = counts
        .into_iter()
        .map(|(word, count)| WordCount {
            word: word.to_string(),
            count,
        })
        .collect();
    pairs.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    pairs
}

fn count_mentions<N: AsRef<str>>(corpus: &str, names: &[N]) -> Result<BTreeMap<String, usize>> {
    let distinct: BTreeSet<&str> = names
        .iter()
        .map(|n| n.as_ref().trim())
        .filter(|n| !n.is_empty())
        .collect();

    let mut mentions = BTreeMap::new();
    for name in distinct {
        let pattern = format!(r"\b{}\b", regex::escape(&name.to_lowercase()));
        let re = Regex::new(&pattern).map_err(|e| {
            HolonetError::InvalidArgument(format!("cannot search for name '{}': {}", name, e))
        })?;

        let count = re.find_iter(corpus).count();
        if count > 0 {
            mentions.insert(name.to_string(), count);
        }
    }
    Ok(mentions)
}

fn most_mentioned(mentions: &BTreeMap<String, usize>) -> Vec<String> {
    let Some(max) = mentions.values().copied().max() else {
        return Vec::new();
    };
    mentions
        .iter()
        .filter(|(_, count)| **count == max)
        .map(|(name, _)| name.clone())
        .collect()
}
