//! Heuristic quality score for extracted text.
//!
//! Five pass/fail checks, averaged into 0..=1.

use serde::{Deserialize, Serialize};

const MIN_CONTENT_CHARS: usize = 10;
const VOWEL_RATIO: (f32, f32) = (0.1, 0.6);
const WHITESPACE_RATIO: (f32, f32) = (0.05, 0.5);
const WORD_LIKE_SHARE: f32 = 0.7;
const MAX_WORD_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Excellent,
    Good,
    Acceptable,
    Poor,
    Failed,
}

impl QualityLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            Self::Excellent
        } else if score >= 0.6 {
            Self::Good
        } else if score >= 0.4 {
            Self::Acceptable
        } else if score >= 0.2 {
            Self::Poor
        } else {
            Self::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Acceptable => "acceptable",
            Self::Poor => "poor",
            Self::Failed => "failed",
        }
    }
}

pub fn score(text: &str) -> f32 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    let checks = [
        has_content(text),
        has_sentence_punctuation(text),
        not_gibberish(text),
        mostly_words(text),
        reasonable_whitespace(text),
    ];
    checks.iter().filter(|&&pass| pass).count() as f32 / checks.len() as f32
}

fn has_content(text: &str) -> bool {
    text.chars().count() > MIN_CONTENT_CHARS
}

fn has_sentence_punctuation(text: &str) -> bool {
    text.contains(['.', '!', '?'])
}

fn not_gibberish(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return false;
    }
    let vowels = letters
        .iter()
        .filter(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
        .count();
    let ratio = vowels as f32 / letters.len() as f32;
    (VOWEL_RATIO.0..=VOWEL_RATIO.1).contains(&ratio)
}

fn mostly_words(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return false;
    }
    let word_like = tokens
        .iter()
        .filter(|t| t.chars().count() <= MAX_WORD_CHARS && t.chars().any(char::is_alphanumeric))
        .count();
    word_like as f32 / tokens.len() as f32 >= WORD_LIKE_SHARE
}

fn reasonable_whitespace(text: &str) -> bool {
    let total = text.chars().count();
    let spaces = text.chars().filter(|c| c.is_whitespace()).count();
    let ratio = spaces as f32 / total as f32;
    (WHITESPACE_RATIO.0..=WHITESPACE_RATIO.1).contains(&ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_scores_excellent() {
        let text = "The service charge for the year ending March 2024 was approved by the board.";
        assert_eq!(score(text), 1.0);
        assert_eq!(QualityLevel::from_score(score(text)), QualityLevel::Excellent);
    }

    #[test]
    fn empty_scores_zero() {
        assert_eq!(score("   "), 0.0);
        assert_eq!(QualityLevel::from_score(score("")), QualityLevel::Failed);
    }

    #[test]
    fn ocr_noise_scores_low() {
        let noise = "#$%^&*~~~|||@@@@";
        assert!(score(noise) < 0.4, "noise scored {}", score(noise));
    }

    #[test]
    fn buckets() {
        assert_eq!(QualityLevel::from_score(0.6), QualityLevel::Good);
        assert_eq!(QualityLevel::from_score(0.4), QualityLevel::Acceptable);
        assert_eq!(QualityLevel::from_score(0.2), QualityLevel::Poor);
        assert_eq!(QualityLevel::from_score(0.19), QualityLevel::Failed);
    }
}
