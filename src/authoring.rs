//! Drafts and edits made before a record is handed to the store.

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::models::*;
use crate::util::generate_id;

const BLANK_OPTIONS: usize = 4;

pub fn new_course(id: String, instructor_id: Option<&str>, now: DateTime<Utc>) -> Course {
    Course {
        id,
        title: "Untitled course".into(),
        category: "General".into(),
        level: "Beginner".into(),
        language: "English".into(),
        duration: 7,
        drip: Drip { start_date: Some(now.date_naive()), interval_days: 3 },
        instructors: instructor_id.map(|id| vec![id.to_string()]).unwrap_or_default(),
        visibility: Visibility::Public,
        created_at: now,
        updated_at: now,
        ..Default::default()
    }
}

impl Course {
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Appends a module spaced one drip interval after the previous one.
    pub fn add_module(&mut self, id: String, title: impl Into<String>) -> &mut Module {
        let release_offset = self.modules.len() as u32 * self.drip.interval_days;
        self.modules.push(Module { id, title: title.into(), release_offset, lessons: Vec::new() });
        let last = self.modules.len() - 1;
        &mut self.modules[last]
    }

    pub fn remove_module(&mut self, module_id: &str) {
        self.modules.retain(|m| m.id != module_id);
    }

    /// Adds a video lesson released on the drip start date. `None` if the module is unknown.
    pub fn add_lesson(&mut self, module_id: &str, id: String, title: impl Into<String>) -> Option<&mut Lesson> {
        let release_date = self.drip.start_date;
        let module = self.modules.iter_mut().find(|m| m.id == module_id)?;
        module.lessons.push(Lesson {
            id,
            title: title.into(),
            kind: LessonKind::Video,
            provider: "youtube".into(),
            url: String::new(),
            duration: 10,
            release_date,
        });
        module.lessons.last_mut()
    }

    pub fn remove_lesson(&mut self, module_id: &str, lesson_id: &str) {
        if let Some(module) = self.modules.iter_mut().find(|m| m.id == module_id) {
            module.lessons.retain(|l| l.id != lesson_id);
        }
    }

    /// Drip start plus the module's offset.
    pub fn module_release_date(&self, module: &Module) -> Option<NaiveDate> {
        self.drip.start_date?.checked_add_days(Days::new(u64::from(module.release_offset)))
    }

    /// Toggles membership; a course can't require itself.
    pub fn toggle_prerequisite(&mut self, course_id: &str) {
        if course_id == self.id {
            return;
        }
        if let Some(pos) = self.prerequisites.iter().position(|id| id == course_id) {
            self.prerequisites.remove(pos);
        } else {
            self.prerequisites.push(course_id.to_string());
        }
    }

    pub fn is_taught_by(&self, user_id: &str) -> bool {
        self.instructors.iter().any(|id| id == user_id)
    }
}

pub fn new_quiz(id: String, course_id: Option<&str>, now: DateTime<Utc>) -> Quiz {
    Quiz {
        id,
        course_id: course_id.unwrap_or_default().to_string(),
        title: "Untitled quiz".into(),
        availability: Availability { opens_at: now.format("%Y-%m-%dT%H:%M").to_string(), closes_at: String::new() },
        settings: QuizSettings::default(),
        questions: Vec::new(),
    }
}

impl Quiz {
    pub fn add_question(&mut self) -> &mut Question {
        self.questions.push(Question::new(generate_id("question")));
        let last = self.questions.len() - 1;
        &mut self.questions[last]
    }

    pub fn remove_question(&mut self, question_id: &str) {
        self.questions.retain(|q| q.id != question_id);
    }

    pub fn total_points(&self) -> u32 {
        self.questions.iter().fold(0, |total, q| total.saturating_add(q.points))
    }
}

impl Question {
    /// Blank multiple-choice question worth one point.
    pub fn new(id: String) -> Self {
        Self { id, options: vec![String::new(); BLANK_OPTIONS], ..Default::default() }
    }

    /// Switching type clears the answer; only multiple-choice keeps options.
    pub fn set_kind(&mut self, kind: QuestionKind) {
        self.kind = kind;
        self.answer.clear();
        match kind {
            QuestionKind::MultipleChoice if self.options.is_empty() => {
                self.options = vec![String::new(); BLANK_OPTIONS];
            }
            QuestionKind::MultipleChoice => {}
            QuestionKind::TrueFalse | QuestionKind::ShortAnswer => self.options.clear(),
        }
    }
}

pub fn new_bundle(id: String, now: DateTime<Utc>) -> Bundle {
    Bundle { id, created_at: now, ..Default::default() }
}

impl Bundle {
    pub fn toggle_course(&mut self, course_id: &str) {
        if let Some(pos) = self.course_ids.iter().position(|id| id == course_id) {
            self.course_ids.remove(pos);
        } else {
            self.course_ids.push(course_id.to_string());
        }
    }
}

/// A post from `author`; title and audience fall back to what the kind and role imply.
pub fn new_communication(
    id: String,
    course_id: &str,
    kind: CommunicationKind,
    title: &str,
    message: &str,
    author: &User,
    now: DateTime<Utc>,
) -> Communication {
    let title = if title.trim().is_empty() {
        match kind {
            CommunicationKind::Announcement => "Course announcement",
            CommunicationKind::Message => "Direct message",
            CommunicationKind::Event => "Course event",
        }
        .to_string()
    } else {
        title.to_string()
    };
    let audience = match (kind, author.role) {
        (CommunicationKind::Message, _) | (_, Role::Student) => "instructors",
        _ => "students",
    };
    Communication {
        id,
        course_id: Some(course_id.to_string()),
        kind,
        title,
        message: message.to_string(),
        audience: audience.into(),
        created_by: author.id.clone(),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 10, 30, 0).unwrap()
    }

    #[test]
    fn course_draft_defaults() {
        let course = new_course("course-1".into(), Some("user-1"), now());
        assert_eq!(course.title, "Untitled course");
        assert_eq!(course.instructors, vec!["user-1".to_string()]);
        assert_eq!(course.drip.start_date, NaiveDate::from_ymd_opt(2024, 9, 2));
        assert_eq!(course.created_at, now());
        assert!(new_course("c".into(), None, now()).instructors.is_empty());
    }

    #[test]
    fn modules_follow_drip_interval() {
        let mut course = new_course("course-1".into(), None, now());
        course.drip.interval_days = 5;
        course.add_module("m1".into(), "Intro");
        course.add_module("m2".into(), "Deep dive");
        assert_eq!(course.modules[1].release_offset, 5);
        assert_eq!(
            course.module_release_date(&course.modules[1]),
            NaiveDate::from_ymd_opt(2024, 9, 7)
        );
    }

    #[test]
    fn lessons_start_at_drip_date() {
        let mut course = new_course("course-1".into(), None, now());
        course.add_module("m1".into(), "Intro");
        let lesson = course.add_lesson("m1", "l1".into(), "Welcome").unwrap();
        assert_eq!(lesson.release_date, NaiveDate::from_ymd_opt(2024, 9, 2));
        assert!(course.add_lesson("nope", "l2".into(), "Lost").is_none());

        course.remove_lesson("m1", "l1");
        assert!(course.modules[0].lessons.is_empty());
        course.remove_module("m1");
        assert!(course.modules.is_empty());
    }

    #[test]
    fn prerequisites_toggle() {
        let mut course = new_course("course-1".into(), None, now());
        course.toggle_prerequisite("course-2");
        course.toggle_prerequisite("course-1");
        assert_eq!(course.prerequisites, vec!["course-2".to_string()]);
        course.toggle_prerequisite("course-2");
        assert!(course.prerequisites.is_empty());
    }

    #[test]
    fn question_kind_switch() {
        let mut q = Question::new("q1".into());
        assert_eq!(q.options.len(), 4);
        q.answer = "A".into();
        q.set_kind(QuestionKind::TrueFalse);
        assert!(q.options.is_empty());
        assert!(q.answer.is_empty());
        q.set_kind(QuestionKind::MultipleChoice);
        assert_eq!(q.options.len(), 4);
    }

    #[test]
    fn quiz_draft() {
        let mut quiz = new_quiz("quiz-1".into(), Some("course-1"), now());
        assert_eq!(quiz.availability.opens_at, "2024-09-02T10:30");
        assert_eq!(quiz.settings.time_limit, 20);
        let id = quiz.add_question().id.clone();
        quiz.add_question().points = 3;
        assert_eq!(quiz.total_points(), 4);
        quiz.remove_question(&id);
        assert_eq!(quiz.questions.len(), 1);
        quiz.add_question().points = u32::MAX;
        assert_eq!(quiz.total_points(), u32::MAX);
    }

    #[test]
    fn bundle_toggle() {
        let mut bundle = new_bundle("bundle-1".into(), now());
        assert_eq!(bundle.name, "New bundle");
        bundle.toggle_course("c1");
        bundle.toggle_course("c2");
        bundle.toggle_course("c1");
        assert_eq!(bundle.course_ids, vec!["c2".to_string()]);
    }

    #[test]
    fn communication_defaults() {
        let instructor = User { id: "i".into(), role: Role::Instructor, ..Default::default() };
        let student = User { id: "s".into(), role: Role::Student, ..Default::default() };

        let post = new_communication("m1".into(), "c1", CommunicationKind::Announcement, " ", "Hi", &instructor, now());
        assert_eq!(post.title, "Course announcement");
        assert_eq!(post.audience, "students");

        let question = new_communication("m2".into(), "c1", CommunicationKind::Message, "Help", "?", &student, now());
        assert_eq!(question.title, "Help");
        assert_eq!(question.audience, "instructors");
    }
}
