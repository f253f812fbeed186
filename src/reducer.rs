use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::Document;
use crate::models::*;

/// A mutation intent. Wire form: `{"type": "DELETE_COURSE", "payload": "course-1"}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    SetActiveUser(String),
    CreateCourse(Course),
    UpdateCourse(Course),
    DeleteCourse(String),
    ImportCourse(Course),
    AddEnrollment(Enrollment),
    UpdateEnrollment(Enrollment),
    CreateBundle(Bundle),
    UpdateBundle(Bundle),
    DeleteBundle(String),
    CreateQuiz(Quiz),
    UpdateQuiz(Quiz),
    DeleteQuiz(String),
    SubmitQuiz(QuizResult),
    SaveCertificate(Certificate),
    DeleteCertificate(String),
    AddCommunication(Communication),
    DeleteCommunication(String),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetActiveUser(_) => "SET_ACTIVE_USER",
            Action::CreateCourse(_) => "CREATE_COURSE",
            Action::UpdateCourse(_) => "UPDATE_COURSE",
            Action::DeleteCourse(_) => "DELETE_COURSE",
            Action::ImportCourse(_) => "IMPORT_COURSE",
            Action::AddEnrollment(_) => "ADD_ENROLLMENT",
            Action::UpdateEnrollment(_) => "UPDATE_ENROLLMENT",
            Action::CreateBundle(_) => "CREATE_BUNDLE",
            Action::UpdateBundle(_) => "UPDATE_BUNDLE",
            Action::DeleteBundle(_) => "DELETE_BUNDLE",
            Action::CreateQuiz(_) => "CREATE_QUIZ",
            Action::UpdateQuiz(_) => "UPDATE_QUIZ",
            Action::DeleteQuiz(_) => "DELETE_QUIZ",
            Action::SubmitQuiz(_) => "SUBMIT_QUIZ",
            Action::SaveCertificate(_) => "SAVE_CERTIFICATE",
            Action::DeleteCertificate(_) => "DELETE_CERTIFICATE",
            Action::AddCommunication(_) => "ADD_COMMUNICATION",
            Action::DeleteCommunication(_) => "DELETE_COMMUNICATION",
        }
    }
}

/// Records addressed by their own id.
pub trait Keyed {
    fn id(&self) -> &str;
}

macro_rules! keyed {
    ($($t:ty),*) => {
        $(impl Keyed for $t {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

keyed!(User, Course, Enrollment, Bundle, Quiz, QuizResult, Certificate, Communication);

/// Replaces the record sharing `item`'s id. Returns false (and drops `item`) when none does.
fn replace_by_id<T: Keyed>(items: &mut [T], item: T) -> bool {
    match items.iter_mut().find(|x| x.id() == item.id()) {
        Some(slot) => {
            *slot = item;
            true
        }
        None => false,
    }
}

fn remove_by_id<T: Keyed>(items: &mut Vec<T>, id: &str) {
    items.retain(|x| x.id() != id);
}

// Ids stay unique: a create that reuses a live id replaces that record.
fn append<T: Keyed>(items: &mut Vec<T>, item: T, kind: &str) {
    if items.iter().any(|x| x.id() == item.id()) {
        warn!(kind, id = item.id(), "create reused an existing id; replacing");
        replace_by_id(items, item);
    } else {
        items.push(item);
    }
}

fn clamp_progress(mut enrollment: Enrollment) -> Enrollment {
    enrollment.progress = enrollment.progress.min(100);
    enrollment
}

/// Applies one action to the document. Never fails; lookups that miss are no-ops.
pub fn reduce(doc: &mut Document, action: Action) {
    debug!(action = action.name(), "reduce");
    match action {
        Action::SetActiveUser(user_id) => doc.active_user_id = user_id,
        Action::CreateCourse(course) | Action::ImportCourse(course) => append(&mut doc.courses, course, "course"),
        Action::UpdateCourse(course) => {
            replace_by_id(&mut doc.courses, course);
        }
        Action::DeleteCourse(course_id) => delete_course(doc, &course_id),
        Action::AddEnrollment(enrollment) => {
            let enrollment = clamp_progress(enrollment);
            let existing = doc
                .enrollments
                .iter_mut()
                .find(|e| e.course_id == enrollment.course_id && e.user_id == enrollment.user_id);
            match existing {
                Some(slot) => {
                    let id = std::mem::take(&mut slot.id);
                    *slot = Enrollment { id, ..enrollment };
                }
                None => doc.enrollments.push(enrollment),
            }
        }
        Action::UpdateEnrollment(enrollment) => {
            replace_by_id(&mut doc.enrollments, clamp_progress(enrollment));
        }
        Action::CreateBundle(bundle) => append(&mut doc.bundles, bundle, "bundle"),
        Action::UpdateBundle(bundle) => {
            replace_by_id(&mut doc.bundles, bundle);
        }
        Action::DeleteBundle(bundle_id) => remove_by_id(&mut doc.bundles, &bundle_id),
        Action::CreateQuiz(quiz) => append(&mut doc.quizzes, quiz, "quiz"),
        Action::UpdateQuiz(quiz) => {
            replace_by_id(&mut doc.quizzes, quiz);
        }
        Action::DeleteQuiz(quiz_id) => {
            remove_by_id(&mut doc.quizzes, &quiz_id);
            doc.quiz_results.retain(|r| r.quiz_id != quiz_id);
        }
        Action::SubmitQuiz(result) => {
            let existing = doc
                .quiz_results
                .iter_mut()
                .find(|r| r.quiz_id == result.quiz_id && r.student_id == result.student_id);
            match existing {
                Some(slot) => {
                    let id = std::mem::take(&mut slot.id);
                    *slot = QuizResult { id, ..result };
                }
                None => doc.quiz_results.push(result),
            }
        }
        Action::SaveCertificate(certificate) => {
            let existing = doc
                .certificates
                .iter_mut()
                .find(|c| c.course_id == certificate.course_id && c.student_id == certificate.student_id);
            match existing {
                Some(slot) => {
                    let id = std::mem::take(&mut slot.id);
                    let issued_on = slot.issued_on;
                    *slot = Certificate { id, issued_on, ..certificate };
                }
                None => doc.certificates.push(certificate),
            }
        }
        Action::DeleteCertificate(certificate_id) => remove_by_id(&mut doc.certificates, &certificate_id),
        Action::AddCommunication(communication) => append(&mut doc.communications, communication, "communication"),
        Action::DeleteCommunication(communication_id) => remove_by_id(&mut doc.communications, &communication_id),
    }
}

// Course deletion cascades by convention: quizzes and their results,
// enrollments, certificates, communications, and bundle membership.
fn delete_course(doc: &mut Document, course_id: &str) {
    let removed_quizzes: Vec<String> = doc
        .quizzes
        .iter()
        .filter(|q| q.course_id == course_id)
        .map(|q| q.id.clone())
        .collect();

    doc.courses.retain(|c| c.id != course_id);
    doc.quizzes.retain(|q| q.course_id != course_id);
    doc.quiz_results.retain(|r| !removed_quizzes.contains(&r.quiz_id));
    doc.enrollments.retain(|e| e.course_id != course_id);
    doc.certificates.retain(|c| c.course_id != course_id);
    doc.communications.retain(|m| !m.belongs_to(course_id));
    for bundle in &mut doc.bundles {
        bundle.course_ids.retain(|id| id != course_id);
    }
    debug!(course_id, quizzes = removed_quizzes.len(), "course deleted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn course(id: &str, title: &str) -> Course {
        Course { id: id.into(), title: title.into(), ..Default::default() }
    }

    fn enrollment(id: &str, course_id: &str, user_id: &str, progress: u8) -> Enrollment {
        Enrollment {
            id: id.into(),
            course_id: course_id.into(),
            user_id: user_id.into(),
            progress,
            enrolled_on: Utc::now(),
        }
    }

    fn result(id: &str, quiz_id: &str, student_id: &str, score: u32) -> QuizResult {
        QuizResult {
            id: id.into(),
            quiz_id: quiz_id.into(),
            student_id: student_id.into(),
            score,
            total_points: 3,
            submitted_at: Utc::now(),
            responses: vec![QuestionResponse { question_id: "q1".into(), response: format!("r{score}"), correct: true }],
        }
    }

    fn empty() -> Document {
        Document::default()
    }

    #[test]
    fn update_replaces_exactly() {
        let mut doc = empty();
        reduce(&mut doc, Action::CreateCourse(course("c1", "One")));
        reduce(&mut doc, Action::CreateCourse(course("c2", "Two")));
        reduce(&mut doc, Action::UpdateCourse(course("c1", "Uno")));
        reduce(&mut doc, Action::UpdateCourse(course("c1", "Eins")));
        reduce(&mut doc, Action::UpdateCourse(course("missing", "Nope")));

        assert_eq!(doc.courses.len(), 2);
        assert_eq!(doc.courses.iter().filter(|c| c.id == "c1").count(), 1);
        assert_eq!(doc.course("c1").unwrap().title, "Eins");
        assert!(doc.course("missing").is_none());
    }

    #[test]
    fn create_with_live_id_does_not_duplicate() {
        let mut doc = empty();
        reduce(&mut doc, Action::CreateCourse(course("c1", "One")));
        reduce(&mut doc, Action::ImportCourse(course("c1", "Again")));
        assert_eq!(doc.courses.len(), 1);
        assert_eq!(doc.courses[0].title, "Again");
    }

    #[test]
    fn delete_course_cascades() {
        let mut doc = empty();
        doc.users.push(User { id: "u1".into(), ..Default::default() });
        doc.courses = vec![course("c1", "One"), course("c2", "Two")];
        doc.quizzes = vec![
            Quiz { id: "qa".into(), course_id: "c1".into(), ..Default::default() },
            Quiz { id: "qb".into(), course_id: "c2".into(), ..Default::default() },
        ];
        doc.quiz_results = vec![result("r1", "qa", "u1", 1), result("r2", "qb", "u1", 2), result("r3", "orphan", "u1", 0)];
        doc.enrollments = vec![enrollment("e1", "c1", "u1", 10), enrollment("e2", "c2", "u1", 20)];
        doc.certificates = vec![
            Certificate { id: "cert1".into(), course_id: "c1".into(), student_id: "u1".into(), ..Default::default() },
            Certificate { id: "cert2".into(), course_id: "c2".into(), student_id: "u1".into(), ..Default::default() },
        ];
        doc.communications = vec![
            Communication { id: "m1".into(), course_id: Some("c1".into()), ..Default::default() },
            Communication { id: "m2".into(), course_id: Some("c2".into()), ..Default::default() },
            Communication { id: "m3".into(), course_id: None, ..Default::default() },
        ];
        doc.bundles = vec![Bundle { id: "b1".into(), course_ids: vec!["c1".into(), "c2".into()], ..Default::default() }];
        doc.active_user_id = "u1".into();
        let users_before = doc.users.clone();

        reduce(&mut doc, Action::DeleteCourse("c1".into()));

        let ids = |v: Vec<&str>| v.into_iter().map(String::from).collect::<Vec<_>>();
        assert_eq!(doc.courses.iter().map(|c| c.id.clone()).collect::<Vec<_>>(), ids(vec!["c2"]));
        assert_eq!(doc.quizzes.iter().map(|q| q.id.clone()).collect::<Vec<_>>(), ids(vec!["qb"]));
        assert_eq!(doc.quiz_results.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), ids(vec!["r2", "r3"]));
        assert_eq!(doc.enrollments.iter().map(|e| e.id.clone()).collect::<Vec<_>>(), ids(vec!["e2"]));
        assert_eq!(doc.certificates.iter().map(|c| c.id.clone()).collect::<Vec<_>>(), ids(vec!["cert2"]));
        assert_eq!(doc.communications.iter().map(|m| m.id.clone()).collect::<Vec<_>>(), ids(vec!["m2", "m3"]));
        assert_eq!(doc.bundles[0].course_ids, ids(vec!["c2"]));
        assert_eq!(doc.users, users_before);
        assert_eq!(doc.active_user_id, "u1");
    }

    #[test]
    fn enrollment_merges_on_natural_key() {
        let mut doc = empty();
        reduce(&mut doc, Action::AddEnrollment(enrollment("e1", "c1", "u1", 10)));
        reduce(&mut doc, Action::AddEnrollment(enrollment("e2", "c1", "u1", 55)));

        assert_eq!(doc.enrollments.len(), 1);
        assert_eq!(doc.enrollments[0].id, "e1");
        assert_eq!(doc.enrollments[0].progress, 55);

        reduce(&mut doc, Action::AddEnrollment(enrollment("e3", "c1", "u2", 0)));
        assert_eq!(doc.enrollments.len(), 2);
    }

    #[test]
    fn update_enrollment_by_id_and_clamps() {
        let mut doc = empty();
        reduce(&mut doc, Action::AddEnrollment(enrollment("e1", "c1", "u1", 10)));
        reduce(&mut doc, Action::UpdateEnrollment(enrollment("e1", "c1", "u1", 250)));
        assert_eq!(doc.enrollments[0].progress, 100);

        reduce(&mut doc, Action::UpdateEnrollment(enrollment("nope", "c1", "u1", 5)));
        assert_eq!(doc.enrollments.len(), 1);
        assert_eq!(doc.enrollments[0].progress, 100);
    }

    #[test]
    fn resubmission_overwrites() {
        let mut doc = empty();
        reduce(&mut doc, Action::SubmitQuiz(result("r1", "q1", "u1", 1)));
        reduce(&mut doc, Action::SubmitQuiz(result("r2", "q1", "u1", 3)));

        assert_eq!(doc.quiz_results.len(), 1);
        assert_eq!(doc.quiz_results[0].id, "r1");
        assert_eq!(doc.quiz_results[0].score, 3);
        assert_eq!(doc.quiz_results[0].responses[0].response, "r3");
    }

    #[test]
    fn delete_quiz_purges_results() {
        let mut doc = empty();
        reduce(&mut doc, Action::CreateQuiz(Quiz { id: "q1".into(), ..Default::default() }));
        reduce(&mut doc, Action::SubmitQuiz(result("r1", "q1", "u1", 1)));
        reduce(&mut doc, Action::SubmitQuiz(result("r2", "q2", "u1", 1)));
        reduce(&mut doc, Action::DeleteQuiz("q1".into()));
        assert!(doc.quizzes.is_empty());
        assert_eq!(doc.quiz_results.len(), 1);
        assert_eq!(doc.quiz_results[0].quiz_id, "q2");
    }

    #[test]
    fn certificate_upsert_keeps_identity() {
        let mut doc = empty();
        let first = Certificate {
            id: "cert-a".into(),
            course_id: "c1".into(),
            student_id: "u1".into(),
            issued_on: Utc::now() - chrono::Duration::days(3),
            template: CertificateTemplate::default(),
        };
        reduce(&mut doc, Action::SaveCertificate(first.clone()));

        let mut second = first.clone();
        second.id = "cert-b".into();
        second.issued_on = Utc::now();
        second.template.signature = "Morgan Lee".into();
        reduce(&mut doc, Action::SaveCertificate(second));

        assert_eq!(doc.certificates.len(), 1);
        assert_eq!(doc.certificates[0].id, "cert-a");
        assert_eq!(doc.certificates[0].issued_on, first.issued_on);
        assert_eq!(doc.certificates[0].template.signature, "Morgan Lee");

        reduce(&mut doc, Action::DeleteCertificate("cert-a".into()));
        assert!(doc.certificates.is_empty());
    }

    #[test]
    fn bundle_delete_leaves_courses() {
        let mut doc = empty();
        doc.courses.push(course("c1", "One"));
        reduce(&mut doc, Action::CreateBundle(Bundle { id: "b1".into(), course_ids: vec!["c1".into()], ..Default::default() }));
        reduce(&mut doc, Action::UpdateBundle(Bundle { id: "b1".into(), name: "Renamed".into(), ..Default::default() }));
        assert_eq!(doc.bundles[0].name, "Renamed");
        reduce(&mut doc, Action::DeleteBundle("b1".into()));
        assert!(doc.bundles.is_empty());
        assert_eq!(doc.courses.len(), 1);
    }

    #[test]
    fn communications_add_and_remove() {
        let mut doc = empty();
        reduce(&mut doc, Action::AddCommunication(Communication { id: "m1".into(), ..Default::default() }));
        reduce(&mut doc, Action::AddCommunication(Communication { id: "m2".into(), ..Default::default() }));
        reduce(&mut doc, Action::DeleteCommunication("m1".into()));
        assert_eq!(doc.communications.len(), 1);
        assert_eq!(doc.communications[0].id, "m2");
    }

    #[test]
    fn set_active_user_is_unchecked() {
        let mut doc = empty();
        reduce(&mut doc, Action::SetActiveUser("nobody".into()));
        assert_eq!(doc.active_user_id, "nobody");
    }

    #[test]
    fn action_wire_format() {
        let action: Action = serde_json::from_str(r#"{"type":"DELETE_COURSE","payload":"c1"}"#).unwrap();
        assert_eq!(action, Action::DeleteCourse("c1".into()));

        let action: Action =
            serde_json::from_str(r#"{"type":"CREATE_BUNDLE","payload":{"id":"b1","name":"Track"}}"#).unwrap();
        assert_eq!(action.name(), "CREATE_BUNDLE");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "CREATE_BUNDLE");
        assert_eq!(json["payload"]["name"], "Track");
    }
}
