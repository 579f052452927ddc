//! Lexicon based line sentiment.
//!
//! Each word carries a valence in `[-4, 4]`. Boosters scale the next
//! sentiment word, a negation within the three preceding tokens flips and
//! damps it, and exclamation marks push the total away from zero. The sum is
//! squashed into a compound score in `[-1, 1]`.

use std::collections::HashMap;

use shortgen_models::ScoredSegment;

use super::SentimentAnalyzer;

const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCREMENT: f64 = 0.293;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const NORMALIZATION_ALPHA: f64 = 15.0;

const LEXICON: &[(&str, f64)] = &[
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("brilliant", 2.8),
    ("celebrate", 2.7),
    ("cool", 1.3),
    ("delight", 2.9),
    ("enjoy", 2.2),
    ("excellent", 2.7),
    ("excited", 1.4),
    ("exciting", 2.2),
    ("fantastic", 2.6),
    ("fun", 2.3),
    ("glad", 2.0),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("incredible", 2.6),
    ("laugh", 2.6),
    ("like", 1.5),
    ("love", 3.2),
    ("lovely", 2.8),
    ("nice", 1.8),
    ("perfect", 2.7),
    ("win", 2.8),
    ("winner", 2.8),
    ("wonderful", 2.7),
    ("wow", 2.8),
    ("yes", 1.7),
    ("thanks", 1.9),
    ("thank", 1.5),
    ("hope", 1.9),
    ("proud", 2.1),
    ("success", 2.7),
    ("angry", -2.3),
    ("awful", -2.0),
    ("bad", -2.5),
    ("boring", -1.3),
    ("broken", -2.1),
    ("cry", -2.1),
    ("damn", -1.7),
    ("dead", -3.3),
    ("disaster", -3.1),
    ("fail", -2.5),
    ("failed", -2.3),
    ("fear", -2.2),
    ("hate", -2.7),
    ("horrible", -2.5),
    ("hurt", -2.4),
    ("kill", -3.7),
    ("lose", -1.6),
    ("lost", -1.3),
    ("no", -1.2),
    ("pain", -2.3),
    ("sad", -2.1),
    ("scared", -1.9),
    ("shock", -1.6),
    ("terrible", -2.1),
    ("ugly", -2.3),
    ("upset", -1.6),
    ("worst", -3.1),
    ("wrong", -2.1),
    ("problem", -1.7),
    ("crazy", -1.4),
];

const BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", 1.0),
    ("really", 1.0),
    ("very", 1.0),
    ("so", 1.0),
    ("extremely", 1.0),
    ("incredibly", 1.0),
    ("totally", 1.0),
    ("super", 1.0),
    ("completely", 1.0),
    ("barely", -1.0),
    ("hardly", -1.0),
    ("slightly", -1.0),
    ("somewhat", -1.0),
    ("kind", -1.0),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "neither", "nor", "none", "without", "cannot",
    "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't", "weren't", "won't", "can't",
    "couldn't", "shouldn't", "wouldn't", "ain't",
];

/// Line sentiment with a built-in valence lexicon.
#[derive(Debug, Clone)]
pub struct LexiconSentiment {
    lexicon: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
    top_k: usize,
    line_interval: f64,
}

impl Default for LexiconSentiment {
    fn default() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
            boosters: BOOSTERS.iter().copied().collect(),
            top_k: 5,
            line_interval: 10.0,
        }
    }
}

/// One scored transcript line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSentiment {
    /// Position among all `.`-separated pieces, blank ones included
    pub index: usize,
    pub text: String,
    pub score: f64,
}

impl LexiconSentiment {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_line_interval(mut self, seconds: f64) -> Self {
        self.line_interval = seconds;
        self
    }

    /// Compound polarity of `text` in `[-1, 1]`.
    pub fn polarity(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .collect();

        let mut total = 0.0;
        for (i, token) in tokens.iter().enumerate() {
            let Some(&valence) = self.lexicon.get(token) else {
                continue;
            };
            // "no" only counts as a sentiment word on its own.
            if *token == "no" && i + 1 < tokens.len() && self.lexicon.contains_key(tokens[i + 1]) {
                continue;
            }

            let mut value = valence;
            if let Some(prev) = i.checked_sub(1).and_then(|j| tokens.get(j)) {
                if let Some(&direction) = self.boosters.get(prev) {
                    let boost = BOOSTER_INCREMENT * direction;
                    value += if value > 0.0 { boost } else { -boost };
                }
            }

            let window = &tokens[i.saturating_sub(3)..i];
            if window.iter().any(|t| NEGATIONS.contains(t)) {
                value *= NEGATION_SCALAR;
            }

            total += value;
        }

        if total != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
            let emphasis = bangs * EXCLAMATION_INCREMENT;
            total += if total > 0.0 { emphasis } else { -emphasis };
        }

        let compound = total / (total * total + NORMALIZATION_ALPHA).sqrt();
        compound.clamp(-1.0, 1.0)
    }

    /// Score every non-blank `.`-separated line.
    pub fn score_lines(&self, transcript: &str) -> Vec<LineSentiment> {
        transcript
            .split('.')
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| LineSentiment {
                index,
                text: line.trim().to_string(),
                score: self.polarity(line),
            })
            .collect()
    }
}

impl SentimentAnalyzer for LexiconSentiment {
    fn analyze(&self, transcript: &str) -> Vec<ScoredSegment> {
        let mut lines = self.score_lines(transcript);
        // Stable: equally intense lines keep transcript order.
        lines.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));
        lines.truncate(self.top_k);

        lines
            .into_iter()
            .map(|line| {
                let start = line.index as f64 * self.line_interval;
                ScoredSegment::new(start, start + self.line_interval, line.score)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_direction() {
        let s = LexiconSentiment::default();
        assert!(s.polarity("This is great") > 0.0);
        assert!(s.polarity("This is terrible") < 0.0);
        assert_eq!(s.polarity("The table is brown"), 0.0);
    }

    #[test]
    fn test_negation_flips() {
        let s = LexiconSentiment::default();
        assert!(s.polarity("this is not good") < 0.0);
        assert!(s.polarity("I don't hate it") > 0.0);
    }

    #[test]
    fn test_boosters_and_exclamations_intensify() {
        let s = LexiconSentiment::default();
        let plain = s.polarity("good");
        assert!(s.polarity("very good") > plain);
        assert!(s.polarity("good!!") > plain);
        assert!(s.polarity("very bad") < s.polarity("bad"));
    }

    #[test]
    fn test_compound_bounded() {
        let s = LexiconSentiment::default();
        let p = s.polarity("best best best love love love awesome great wow!!!!!!");
        assert!(p > 0.9 && p <= 1.0);
    }

    #[test]
    fn test_line_timing_counts_blank_pieces() {
        let s = LexiconSentiment::default().with_top_k(10);
        // Pieces: "I love this", " ", " It is awful", ""
        let segments = s.analyze("I love this. . It is awful.");
        assert_eq!(segments.len(), 2);

        let starts: Vec<f64> = segments.iter().map(|seg| seg.start_time).collect();
        assert!(starts.contains(&0.0));
        assert!(starts.contains(&20.0));
        assert!(segments.iter().all(|seg| seg.end_time - seg.start_time == 10.0));
    }

    #[test]
    fn test_top_k_by_absolute_score() {
        let s = LexiconSentiment::default().with_top_k(2);
        let segments = s.analyze("It is fine. This is the worst disaster. I love it so much. The sky");
        assert_eq!(segments.len(), 2);
        assert!(segments[0].score.abs() >= segments[1].score.abs());
        assert!(segments.iter().all(|seg| seg.score != 0.0));
    }

    #[test]
    fn test_empty_transcript() {
        assert!(LexiconSentiment::default().analyze("").is_empty());
        assert!(LexiconSentiment::default().analyze("...").is_empty());
    }
}
