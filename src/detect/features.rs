//! Report feature extraction.
//!
//! Turns a report's free text and metadata into a fixed-length numeric
//! vector for the outlier ensemble. These are surface statistics standing
//! in for a real semantic embedding; swapping in an actual language model
//! changes this module and nothing else.

use crate::model::Report;

/// Dimension of the extracted feature vector.
pub const FEATURE_DIM: usize = 7;

/// Extract the feature vector for a single report:
/// text length, word count, `!` count, `?` count, priority,
/// category count, negative-sentiment flag.
pub fn extract(report: &Report) -> [f64; FEATURE_DIM] {
    let text = report.text.as_str();
    [
        text.chars().count() as f64,
        text.split_whitespace().count() as f64,
        text.matches('!').count() as f64,
        text.matches('?').count() as f64,
        report.priority as f64,
        report.categories.len() as f64,
        if report.is_negative() { 1.0 } else { 0.0 },
    ]
}

/// Extract feature vectors for a whole batch, preserving order.
pub fn extract_batch(reports: &[Report]) -> Vec<[f64; FEATURE_DIM]> {
    reports.iter().map(extract).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Sentiment, SentimentLabel};
    use chrono::Utc;

    fn report(text: &str, priority: i64, categories: &[&str], negative: bool) -> Report {
        Report {
            id: "r".to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
            priority,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            sentiment: negative.then_some(Sentiment {
                label: SentimentLabel::Negative,
                score: -0.8,
            }),
            location: None,
            processed: false,
            incident_id: None,
        }
    }

    #[test]
    fn test_feature_vector_contents() {
        let r = report("Au feu ! Vite !", 5, &["incendie", "securite"], true);
        let v = extract(&r);
        assert_eq!(v[0], 15.0); // chars, including spaces
        assert_eq!(v[1], 5.0); // words
        assert_eq!(v[2], 2.0); // '!'
        assert_eq!(v[3], 0.0); // '?'
        assert_eq!(v[4], 5.0); // priority
        assert_eq!(v[5], 2.0); // categories
        assert_eq!(v[6], 1.0); // negative sentiment
    }

    #[test]
    fn test_char_length_counts_chars_not_bytes() {
        let r = report("blessé", 1, &[], false);
        let v = extract(&r);
        assert_eq!(v[0], 6.0);
    }

    #[test]
    fn test_batch_preserves_order() {
        let batch = vec![report("a", 1, &[], false), report("bb", 2, &[], false)];
        let vectors = extract_batch(&batch);
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0][0], 1.0);
        assert_eq!(vectors[1][0], 2.0);
    }
}
