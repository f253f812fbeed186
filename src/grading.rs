use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Question, QuestionKind, QuestionResponse, Quiz, QuizResult};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    pub score: u32,
    pub total_points: u32,
    pub responses: Vec<QuestionResponse>,
}

impl GradeReport {
    pub fn into_result(self, id: String, quiz_id: &str, student_id: &str, submitted_at: DateTime<Utc>) -> QuizResult {
        QuizResult {
            id,
            quiz_id: quiz_id.to_string(),
            student_id: student_id.to_string(),
            score: self.score,
            total_points: self.total_points,
            submitted_at,
            responses: self.responses,
        }
    }
}

/// Short answers ignore case and surrounding whitespace, and an empty
/// side never matches. Choice questions compare exactly.
pub fn is_correct(question: &Question, response: Option<&str>) -> bool {
    let Some(response) = response else {
        return false;
    };
    match question.kind {
        QuestionKind::ShortAnswer => {
            let expected = question.answer.trim().to_lowercase();
            let given = response.trim().to_lowercase();
            !expected.is_empty() && !given.is_empty() && expected == given
        }
        QuestionKind::MultipleChoice | QuestionKind::TrueFalse => response == question.answer,
    }
}

/// Scores `responses` (question id -> answer) against the quiz. Pure.
pub fn grade(quiz: &Quiz, responses: &HashMap<String, String>) -> GradeReport {
    let mut score: u32 = 0;
    let mut total_points: u32 = 0;
    let mut detailed = Vec::with_capacity(quiz.questions.len());

    for question in &quiz.questions {
        let response = responses.get(&question.id).map(String::as_str);
        let correct = is_correct(question, response);
        if correct {
            score = score.saturating_add(question.points);
        }
        total_points = total_points.saturating_add(question.points);
        detailed.push(QuestionResponse {
            question_id: question.id.clone(),
            response: response.unwrap_or_default().to_string(),
            correct,
        });
    }

    GradeReport { score, total_points, responses: detailed }
}

/// `score / total * 100`, rounded; 0 for a pointless quiz.
pub fn percentage(score: u32, total_points: u32) -> u32 {
    if total_points == 0 {
        return 0;
    }
    (f64::from(score) / f64::from(total_points) * 100.0).round() as u32
}
