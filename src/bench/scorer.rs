//! Answer scoring for tasks with a known expected answer.
//!
//! Follows the GAIA scorer's normalization: numeric answers compare by
//! value (commas, units of percent and whitespace ignored), list answers
//! compare element-wise, everything else compares as normalized strings.

/// Normalizes a free-form answer for comparison.
///
/// Lowercases, trims, collapses inner whitespace and strips surrounding
/// punctuation.
pub fn normalize_answer(answer: &str) -> String {
    let cleaned = answer
        .trim()
        .trim_matches(|c: char| c == '.' || c == '"' || c == '\'')
        .to_lowercase();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scores a model answer against the ground truth.
///
/// Returns true when the answers match after normalization.
pub fn score_answer(model_answer: &str, ground_truth: &str) -> bool {
    if let Some(truth_num) = parse_number(ground_truth) {
        return match parse_number(model_answer) {
            Some(model_num) => (model_num - truth_num).abs() < 1e-9,
            None => false,
        };
    }

    // Comma or semicolon separated ground truths compare element-wise.
    let separator = [';', ','].iter().find(|s| ground_truth.contains(**s));
    if let Some(&sep) = separator {
        let truth_parts: Vec<&str> = ground_truth.split(sep).collect();
        let model_parts: Vec<&str> = model_answer.split(sep).collect();
        if truth_parts.len() != model_parts.len() {
            return false;
        }
        return truth_parts
            .iter()
            .zip(model_parts.iter())
            .all(|(t, m)| score_answer(m, t));
    }

    normalize_answer(model_answer) == normalize_answer(ground_truth)
}

/// Parses a numeric answer, tolerating thousands separators, a leading
/// currency sign and a trailing percent sign.
fn parse_number(answer: &str) -> Option<f64> {
    let cleaned = answer
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .trim_end_matches('%')
        .replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  The   Answer. "), "the answer");
        assert_eq!(normalize_answer("\"Paris\""), "paris");
    }

    #[test]
    fn test_numeric_answers_ignore_formatting() {
        assert!(score_answer("1,000", "1000"));
        assert!(score_answer("1000", "1,000"));
        assert!(score_answer("42%", "42"));
        assert!(score_answer("$17.50", "17.5"));
        assert!(!score_answer("1001", "1000"));
        assert!(!score_answer("a thousand", "1000"));
    }

    #[test]
    fn test_string_answers_case_and_space_insensitive() {
        assert!(score_answer("Right  Ascension", "right ascension"));
        assert!(score_answer("Paris.", "paris"));
        assert!(!score_answer("London", "Paris"));
    }

    #[test]
    fn test_list_answers_compare_element_wise() {
        assert!(score_answer("apple, Banana, cherry", "Apple, banana, Cherry"));
        assert!(score_answer("3; 5", "3 ; 5"));
        assert!(!score_answer("apple, banana", "apple, banana, cherry"));
        assert!(!score_answer("apple, pear, cherry", "apple, banana, cherry"));
    }
}
