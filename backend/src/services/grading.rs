//! Grades a submitted attempt against the questions that were served.

use std::collections::HashMap;

use crate::{
    models::{
        lesson::{Question, QuestionType},
        result::AnswerDetail,
    },
    utils::points::round_points,
};

/// Totals of a graded attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub score: f64,
    pub total_points: f64,
    pub correct_count: usize,
    pub details: Vec<AnswerDetail>,
}

impl Grade {
    /// Score as a 0..=100 percentage, two decimals.
    pub fn percentage(&self) -> f64 {
        if self.total_points <= 0.0 {
            return if self.is_perfect() { 100.0 } else { 0.0 };
        }
        round_points(self.score / self.total_points * 100.0)
    }

    pub fn is_perfect(&self) -> bool {
        !self.details.is_empty() && self.correct_count == self.details.len()
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `None` unless both sides are finite numbers; "inf" and "NaN" compare as text.
fn numbers_match(given: &str, expected: &str) -> Option<bool> {
    let given: f64 = given.trim().parse().ok()?;
    let expected: f64 = expected.trim().parse().ok()?;
    if !given.is_finite() || !expected.is_finite() {
        return None;
    }
    let scale = expected.abs().max(1.0);
    Some((given - expected).abs() <= 1e-9 * scale)
}

/// Whether `given` answers `question` correctly.
///
/// Choice questions compare trimmed option text. Short answers ignore case
/// and repeated whitespace, and compare numerically when both sides parse.
pub fn is_correct(question: &Question, given: &str) -> bool {
    if let Some(matched) = numbers_match(given, &question.answer) {
        return matched;
    }
    match question.question_type {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            given.trim() == question.answer.trim()
        }
        QuestionType::ShortAnswer => normalize(given) == normalize(&question.answer),
    }
}

/// Grades `answers` for the served `(question, points)` pairs.
/// Answers to questions that were not served are ignored.
pub fn grade(served: &[(&Question, f64)], answers: &HashMap<String, String>) -> Grade {
    let mut score = 0.0;
    let mut total_points = 0.0;
    let mut correct_count = 0;
    let mut details = Vec::with_capacity(served.len());

    for (question, points) in served {
        total_points += points;
        let given = answers
            .get(&question.id)
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        let correct = given
            .as_deref()
            .map(|answer| is_correct(question, answer))
            .unwrap_or(false);

        let earned = if correct { *points } else { 0.0 };
        if correct {
            correct_count += 1;
            score += earned;
        }

        details.push(AnswerDetail {
            question_id: question.id.clone(),
            given,
            correct_answer: question.answer.clone(),
            correct,
            points: *points,
            earned,
            explanation: question.explanation.clone(),
        });
    }

    Grade {
        score: round_points(score),
        total_points: round_points(total_points),
        correct_count,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, question_type: QuestionType, answer: &str) -> Question {
        Question {
            id: id.to_string(),
            question_type,
            text: "?".to_string(),
            options: vec![],
            answer: answer.to_string(),
            explanation: None,
            image_url: None,
        }
    }

    #[test]
    fn short_answers_ignore_case_and_spacing() {
        let q = question("q", QuestionType::ShortAnswer, "Newton's  second law");
        assert!(is_correct(&q, "newton's second   LAW"));
        assert!(!is_correct(&q, "Newton's third law"));
    }

    #[test]
    fn numeric_answers_compare_by_value() {
        let q = question("q", QuestionType::ShortAnswer, "9.8");
        assert!(is_correct(&q, "9.80"));
        assert!(!is_correct(&q, "9.81"));
    }

    #[test]
    fn infinity_answers_compare_as_text() {
        let q = question("q", QuestionType::ShortAnswer, "Infinity");
        assert!(is_correct(&q, "Infinity"));
        assert!(is_correct(&q, "infinity"));
        assert!(!is_correct(&q, "0"));

        let mut q = question("q", QuestionType::MultipleChoice, "Infinity");
        q.options = vec!["0".to_string(), "Infinity".to_string()];
        assert!(is_correct(&q, "Infinity"));
        assert!(!is_correct(&q, "0"));

        let q = question("q", QuestionType::ShortAnswer, "NaN");
        assert!(is_correct(&q, "nan"));
    }

    #[test]
    fn choice_answers_are_exact() {
        let q = question("q", QuestionType::MultipleChoice, "Joule");
        assert!(is_correct(&q, " Joule "));
        assert!(!is_correct(&q, "joule"));
    }

    #[test]
    fn grade_sums_points_of_correct_answers() {
        let q1 = question("a", QuestionType::TrueFalse, "True");
        let q2 = question("b", QuestionType::ShortAnswer, "3");
        let q3 = question("c", QuestionType::MultipleChoice, "Watt");
        let served = vec![(&q1, 33.33), (&q2, 33.33), (&q3, 33.34)];

        let answers = HashMap::from([
            ("a".to_string(), "True".to_string()),
            ("c".to_string(), "Watt".to_string()),
            ("zzz".to_string(), "ignored".to_string()),
        ]);

        let grade = grade(&served, &answers);
        assert_eq!(grade.correct_count, 2);
        assert_eq!(grade.score, 66.67);
        assert_eq!(grade.total_points, 100.0);
        assert_eq!(grade.percentage(), 66.67);
        assert!(!grade.is_perfect());
        assert_eq!(grade.details[1].given, None);
        assert!(!grade.details[1].correct);
    }

    #[test]
    fn perfect_attempt() {
        let q1 = question("a", QuestionType::TrueFalse, "False");
        let served = vec![(&q1, 10.0)];
        let answers = HashMap::from([("a".to_string(), "False".to_string())]);
        let grade = grade(&served, &answers);
        assert!(grade.is_perfect());
        assert_eq!(grade.percentage(), 100.0);
    }
}
