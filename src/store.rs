use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::ImportError;
use crate::grading;
use crate::interchange::parse_course_import;
use crate::models::*;
use crate::reducer::{reduce, Action};
use crate::storage::Storage;
use crate::util::generate_id;

pub const DEFAULT_STORAGE_KEY: &str = "tutor-lms-state";

pub fn backup_key(key: &str) -> String {
    format!("{}.bak", key)
}

/// Owns the document and its persistence slot. Every applied action bumps
/// the revision, notifies subscribers, and writes the whole document through.
pub struct Store {
    doc: Document,
    storage: Box<dyn Storage>,
    key: String,
    revision: watch::Sender<u64>,
}

impl Store {
    /// Loads the snapshot under `key`, or the seed document if there is none or it can't be read.
    /// A snapshot that fails to parse is copied to `<key>.bak` and left in place until the next write.
    pub fn open(mut storage: impl Storage + 'static, key: impl Into<String>) -> Self {
        let key = key.into();
        let (doc, write_seed) = match storage.read(&key) {
            Ok(Some(text)) => match Document::from_json(&text) {
                Ok(doc) => {
                    info!(key = %key, courses = doc.courses.len(), "loaded stored state");
                    (doc, true)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "failed to parse stored state, using seed");
                    let backup = backup_key(&key);
                    if let Err(e) = storage.write(&backup, &text) {
                        warn!(key = %backup, error = %e, "failed to back up stored state");
                    }
                    (Document::seed(), false)
                }
            },
            Ok(None) => {
                info!(key = %key, "no stored state, using seed");
                (Document::seed(), true)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read stored state, using seed");
                (Document::seed(), false)
            }
        };

        let (revision, _) = watch::channel(0);
        let mut store = Self { doc, storage: Box::new(storage), key, revision };
        if write_seed {
            store.persist();
        }
        store
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn snapshot(&self) -> Document {
        self.doc.clone()
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Yields the revision after each applied action.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn dispatch(&mut self, action: Action) {
        let action = match action {
            Action::ImportCourse(course) => Action::ImportCourse(self.unique_import(course)),
            other => other,
        };
        let name = action.name();
        reduce(&mut self.doc, action);
        self.revision.send_modify(|r| *r += 1);
        debug!(action = name, revision = self.revision(), "applied");
        self.persist();
    }

    // Quota or io failures must never touch the in-memory document.
    fn persist(&mut self) {
        let text = match self.doc.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to serialize state");
                return;
            }
        };
        if let Err(e) = self.storage.write(&self.key, &text) {
            warn!(key = %self.key, error = %e, "failed to persist state");
        }
    }

    // An imported id that is already live gets a fresh one.
    fn unique_import(&self, mut course: Course) -> Course {
        if self.doc.course(&course.id).is_some() {
            let fresh = generate_id("course");
            warn!(id = %course.id, fresh = %fresh, "imported course id already in use, reassigning");
            course.id = fresh;
        }
        course
    }

    pub fn set_active_user(&mut self, user_id: impl Into<String>) {
        self.dispatch(Action::SetActiveUser(user_id.into()));
    }

    pub fn create_course(&mut self, course: Course) {
        self.dispatch(Action::CreateCourse(course));
    }

    pub fn update_course(&mut self, course: Course) {
        self.dispatch(Action::UpdateCourse(course));
    }

    pub fn delete_course(&mut self, course_id: &str) {
        self.dispatch(Action::DeleteCourse(course_id.to_string()));
    }

    /// Same as [`Store::create_course`] but recorded as an import. Returns the id the course ended up with.
    pub fn import_course(&mut self, course: Course) -> String {
        let course = self.unique_import(course);
        let id = course.id.clone();
        self.dispatch(Action::ImportCourse(course));
        id
    }

    /// Parses exported JSON and imports it.
    pub fn import_course_json(&mut self, text: &str, now: DateTime<Utc>) -> Result<Course, ImportError> {
        let course = self.unique_import(parse_course_import(text, now)?);
        self.dispatch(Action::ImportCourse(course.clone()));
        Ok(course)
    }

    pub fn add_enrollment(&mut self, enrollment: Enrollment) {
        self.dispatch(Action::AddEnrollment(enrollment));
    }

    pub fn update_enrollment(&mut self, enrollment: Enrollment) {
        self.dispatch(Action::UpdateEnrollment(enrollment));
    }

    pub fn create_bundle(&mut self, bundle: Bundle) {
        self.dispatch(Action::CreateBundle(bundle));
    }

    pub fn update_bundle(&mut self, bundle: Bundle) {
        self.dispatch(Action::UpdateBundle(bundle));
    }

    pub fn delete_bundle(&mut self, bundle_id: &str) {
        self.dispatch(Action::DeleteBundle(bundle_id.to_string()));
    }

    pub fn create_quiz(&mut self, quiz: Quiz) {
        self.dispatch(Action::CreateQuiz(quiz));
    }

    pub fn update_quiz(&mut self, quiz: Quiz) {
        self.dispatch(Action::UpdateQuiz(quiz));
    }

    pub fn delete_quiz(&mut self, quiz_id: &str) {
        self.dispatch(Action::DeleteQuiz(quiz_id.to_string()));
    }

    pub fn submit_quiz(&mut self, result: QuizResult) {
        self.dispatch(Action::SubmitQuiz(result));
    }

    /// Grades `responses` against the stored quiz and submits the result.
    /// `None` when the quiz doesn't exist.
    pub fn take_quiz(
        &mut self,
        quiz_id: &str,
        student_id: &str,
        responses: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> Option<QuizResult> {
        let quiz = self.doc.quiz(quiz_id)?;
        let report = grading::grade(quiz, responses);
        let id = self
            .doc
            .quiz_result_for(quiz_id, student_id)
            .map(|r| r.id.clone())
            .unwrap_or_else(|| generate_id("result"));
        let result = report.into_result(id, quiz_id, student_id, now);
        info!(quiz_id, student_id, score = result.score, total = result.total_points, "quiz graded");
        self.submit_quiz(result.clone());
        Some(result)
    }

    pub fn save_certificate(&mut self, certificate: Certificate) {
        self.dispatch(Action::SaveCertificate(certificate));
    }

    pub fn delete_certificate(&mut self, certificate_id: &str) {
        self.dispatch(Action::DeleteCertificate(certificate_id.to_string()));
    }

    pub fn add_communication(&mut self, communication: Communication) {
        self.dispatch(Action::AddCommunication(communication));
    }

    pub fn delete_communication(&mut self, communication_id: &str) {
        self.dispatch(Action::DeleteCommunication(communication_id.to_string()));
    }
}
