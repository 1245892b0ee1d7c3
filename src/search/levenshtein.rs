//! Edit distance and a word vocabulary for typo-tolerant queries.
//!
//! The vocabulary holds every distinct word that was ever indexed. Query terms
//! are snapped to their closest vocabulary word before they reach FTS5, which
//! on its own only matches exact tokens.

use std::collections::{HashMap, HashSet};

/// Minimum number of single-character edits turning `a` into `b`.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let substitution = prev_row[j] + usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(substitution);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}

/// Edits tolerated for a term of `term_chars` characters: none up to two
/// characters, one up to five, two beyond.
pub fn auto_fuzziness(term_chars: usize) -> usize {
    match term_chars {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Splits text the same way the `unicode61` tokenizer does, lowercased.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

#[derive(Clone, Default)]
pub struct Vocabulary {
    words: Vec<String>,
    known: HashSet<String>,
    /// Word indices bucketed by length in characters.
    by_length: HashMap<usize, Vec<usize>>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_word(&mut self, word: &str) {
        let word = word.to_lowercase();
        let len = word.chars().count();
        if len < 2 || self.known.contains(&word) {
            return;
        }

        let idx = self.words.len();
        self.known.insert(word.clone());
        self.words.push(word);
        self.by_length.entry(len).or_default().push(idx);
    }

    pub fn add_text(&mut self, text: &str) {
        for word in tokenize(text) {
            self.add_word(&word);
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.known.contains(&word.to_lowercase())
    }

    /// Closest known word within `max_distance` edits.
    ///
    /// Ties go to the word whose length is closest to the query, then to the
    /// word indexed first.
    pub fn find_best_match(&self, query: &str, max_distance: usize) -> Option<&str> {
        let query = query.to_lowercase();
        if let Some(word) = self.known.get(&query) {
            return Some(word.as_str());
        }
        if max_distance == 0 {
            return None;
        }

        let query_len = query.chars().count();
        let min_len = query_len.saturating_sub(max_distance);
        let max_len = query_len + max_distance;

        // (index, distance, length difference)
        let mut best_match: Option<(usize, usize, usize)> = None;
        for len in min_len..=max_len {
            let Some(indices) = self.by_length.get(&len) else {
                continue;
            };
            for &idx in indices {
                let distance = levenshtein_distance(&query, &self.words[idx]);
                if distance > max_distance {
                    continue;
                }
                let length_diff = len.abs_diff(query_len);
                let better = match best_match {
                    None => true,
                    Some((best_idx, best_dist, best_len_diff)) => {
                        (distance, length_diff, idx) < (best_dist, best_len_diff, best_idx)
                    }
                };
                if better {
                    best_match = Some((idx, distance, length_diff));
                }
            }
        }

        best_match.map(|(idx, _, _)| self.words[idx].as_str())
    }

    /// Best correction for a single query term, using the smaller of
    /// `max_distance` and the term's automatic fuzziness.
    pub fn correct_term(&self, term: &str, max_distance: usize) -> Option<&str> {
        let allowed = max_distance.min(auto_fuzziness(term.chars().count()));
        self.find_best_match(term, allowed)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("hello", "hello"), 0);
        assert_eq!(levenshtein_distance("hello", "hallo"), 1);
        assert_eq!(levenshtein_distance("hello", "hell"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("beatles", "beatels"), 2);
        assert_eq!(levenshtein_distance("yesterdy", "yesterday"), 1);
    }

    #[test]
    fn test_auto_fuzziness() {
        assert_eq!(auto_fuzziness(2), 0);
        assert_eq!(auto_fuzziness(4), 1);
        assert_eq!(auto_fuzziness(9), 2);
    }

    #[test]
    fn test_tokenize() {
        let tokens: Vec<String> = tokenize("Hey, Jude! (Remastered 2009)").collect();
        assert_eq!(tokens, vec!["hey", "jude", "remastered", "2009"]);
    }

    #[test]
    fn test_vocabulary_corrections() {
        let mut vocab = Vocabulary::new();
        vocab.add_text("Yesterday all my troubles seemed so far away");
        vocab.add_text("The Beatles");

        assert_eq!(vocab.correct_term("yesterdy", 2), Some("yesterday"));
        assert_eq!(vocab.correct_term("beatels", 2), Some("beatles"));
        assert_eq!(vocab.correct_term("BEATLES", 0), Some("beatles"));
        assert_eq!(vocab.correct_term("xyz", 2), None);
    }

    #[test]
    fn test_short_terms_are_not_fuzzed() {
        let mut vocab = Vocabulary::new();
        vocab.add_word("so");
        assert_eq!(vocab.correct_term("se", 2), None);
        assert_eq!(vocab.correct_term("so", 2), Some("so"));
    }

    #[test]
    fn test_tie_breaking_prefers_same_length() {
        let mut vocab = Vocabulary::new();
        vocab.add_word("alla");
        vocab.add_word("dalla");
        assert_eq!(vocab.find_best_match("palla", 2), Some("dalla"));
    }

    #[test]
    fn test_words_are_unique() {
        let mut vocab = Vocabulary::new();
        vocab.add_text("let it be let it be");
        assert_eq!(vocab.len(), 3);
        assert!(vocab.contains("Let"));
    }
}
