//! English stopword list used by the boilerplate classifier

use std::collections::HashSet;
use std::sync::LazyLock;

const ENGLISH: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
    "any", "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
    "each", "even", "ever", "every", "few", "for", "from", "further", "had", "has", "have",
    "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "i",
    "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more", "most", "much",
    "must", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves",
    "then", "there", "these", "they", "this", "those", "through", "to", "too", "under",
    "until", "up", "upon", "us", "very", "was", "we", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
    "yourself", "yourselves", "may", "might", "shall", "still", "yet", "there's", "it's",
    "don't", "can't", "won't", "isn't", "aren't", "wasn't", "weren't", "i'm", "you're",
    "we're", "they're", "that's",
];

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH.iter().copied().collect());

/// Whether a lowercase word is a stopword
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Share of words in `text` that are stopwords; 0.0 for text without words
pub fn stopword_ratio(text: &str) -> f32 {
    let mut words = 0usize;
    let mut stops = 0usize;
    for word in text
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
    {
        words += 1;
        if is_stopword(&word.to_lowercase()) {
            stops += 1;
        }
    }

    if words == 0 {
        0.0
    } else {
        stops as f32 / words as f32
    }
}
