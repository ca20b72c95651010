//! Query classification.

use crate::types::Classification;
use tender_core::AppResult;
use tender_prompt::QueryCategory;

/// Maps a free-text query to a response category.
#[async_trait::async_trait]
pub trait QueryClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> AppResult<Classification>;
}

// Small talk matches whole words only, so Hangul entries list the
// inflected forms people actually type.
const GREETING_KEYWORDS: &[&str] = &[
    "안녕", "안녕하세요", "안녕하십니까", "반가워", "반가워요", "반갑습니다", "하이",
    "hello", "hi", "hey", "good morning",
];

const THANKS_KEYWORDS: &[&str] = &[
    "감사합니다", "감사해요", "감사드립니다", "고마워", "고마워요", "고맙습니다", "땡큐",
    "thank", "thanks", "thx",
];

// Hangul entries match as a word prefix so particles (날씨가, 게임은) still hit.
const OUT_OF_SCOPE_KEYWORDS: &[&str] = &[
    "날씨", "주식", "맛집", "영화", "노래", "게임", "축구", "weather", "stock", "recipe",
];

// Any of these anywhere in the query routes it to retrieval.
const PROCUREMENT_TERMS: &[&str] = &[
    "사업", "예산", "입찰", "제안", "계약", "발주", "과업", "평가", "공고", "용역", "기관",
    "rfp", "budget", "bid", "proposal", "contract",
];

/// Queries at most this many characters long are eligible for small talk.
const SMALL_TALK_MAX_CHARS: usize = 20;

/// Keyword-list classifier.
///
/// Anything mentioning procurement goes to retrieval. Otherwise short
/// greetings and thanks are answered directly, a few obviously unrelated
/// topics are deflected, and the rest goes to retrieval.
#[derive(Debug, Default, Clone)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous classification used by the trait implementation.
    pub fn classify_text(&self, query: &str) -> Classification {
        let normalized = query.trim().to_lowercase();
        let words = split_words(&normalized);

        if let Some(term) = PROCUREMENT_TERMS
            .iter()
            .copied()
            .find(|term| contains_term(&normalized, &words, term))
        {
            return Classification::new(QueryCategory::Document, 0.8)
                .with_field("route", "rag")
                .with_field("reason", format!("domain:{}", term));
        }

        if normalized.chars().count() <= SMALL_TALK_MAX_CHARS {
            if let Some(keyword) = find_word(&normalized, &words, THANKS_KEYWORDS) {
                return verdict(QueryCategory::Thanks, 0.9, keyword);
            }
            if let Some(keyword) = find_word(&normalized, &words, GREETING_KEYWORDS) {
                return verdict(QueryCategory::Greeting, 0.9, keyword);
            }
        }

        if let Some(keyword) = find_topic(&words, OUT_OF_SCOPE_KEYWORDS) {
            return verdict(QueryCategory::OutOfScope, 0.7, keyword);
        }

        Classification::new(QueryCategory::Document, 0.6)
            .with_field("route", "rag")
            .with_field("reason", "default")
    }
}

#[async_trait::async_trait]
impl QueryClassifier for KeywordClassifier {
    async fn classify(&self, query: &str) -> AppResult<Classification> {
        Ok(self.classify_text(query))
    }
}

fn verdict(category: QueryCategory, confidence: f32, keyword: &str) -> Classification {
    Classification::new(category, confidence)
        .with_field("route", "direct")
        .with_field("reason", format!("keyword:{}", keyword))
}

fn split_words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect()
}

/// Whole-word match; multi-word keywords match as a phrase.
fn find_word<'a>(text: &str, words: &[&str], keywords: &[&'a str]) -> Option<&'a str> {
    keywords.iter().copied().find(|keyword| {
        if keyword.contains(' ') {
            text.contains(keyword)
        } else {
            words.contains(keyword)
        }
    })
}

/// Latin keywords match a whole word, Hangul keywords a word prefix.
fn find_topic<'a>(words: &[&str], keywords: &[&'a str]) -> Option<&'a str> {
    keywords.iter().copied().find(|keyword| {
        if keyword.is_ascii() {
            words.contains(keyword)
        } else {
            words.iter().any(|word| word.starts_with(keyword))
        }
    })
}

/// Hangul terms match anywhere (제안서, 사업비); Latin terms a whole word.
fn contains_term(text: &str, words: &[&str], term: &str) -> bool {
    if term.is_ascii() {
        words.contains(&term)
    } else {
        text.contains(term)
    }
}
