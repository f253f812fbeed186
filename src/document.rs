use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::*;

/// The whole persisted state: every collection plus the viewer pointer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub users: Vec<User>,
    pub courses: Vec<Course>,
    pub enrollments: Vec<Enrollment>,
    pub bundles: Vec<Bundle>,
    pub quizzes: Vec<Quiz>,
    pub quiz_results: Vec<QuizResult>,
    pub certificates: Vec<Certificate>,
    pub communications: Vec<Communication>,
    pub active_user_id: String,
}

// Loaded snapshots may omit any key; absent or null keys come from the seed.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PartialDocument {
    users: Option<Vec<User>>,
    courses: Option<Vec<Course>>,
    enrollments: Option<Vec<Enrollment>>,
    bundles: Option<Vec<Bundle>>,
    quizzes: Option<Vec<Quiz>>,
    quiz_results: Option<Vec<QuizResult>>,
    certificates: Option<Vec<Certificate>>,
    communications: Option<Vec<Communication>>,
    active_user_id: Option<String>,
}

impl Document {
    /// Parses a persisted snapshot, filling missing keys from [`Document::seed`].
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let partial: PartialDocument = serde_json::from_str(text)?;
        let seed = Self::seed();
        Ok(Self {
            users: partial.users.unwrap_or(seed.users),
            courses: partial.courses.unwrap_or(seed.courses),
            enrollments: partial.enrollments.unwrap_or(seed.enrollments),
            bundles: partial.bundles.unwrap_or(seed.bundles),
            quizzes: partial.quizzes.unwrap_or(seed.quizzes),
            quiz_results: partial.quiz_results.unwrap_or(seed.quiz_results),
            certificates: partial.certificates.unwrap_or(seed.certificates),
            communications: partial.communications.unwrap_or(seed.communications),
            active_user_id: partial.active_user_id.unwrap_or(seed.active_user_id),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// The viewer; falls back to the first user when the pointer dangles.
    pub fn active_user(&self) -> Option<&User> {
        self.user(&self.active_user_id).or_else(|| self.users.first())
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn quiz(&self, id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.id == id)
    }

    pub fn enrollment_for(&self, course_id: &str, user_id: &str) -> Option<&Enrollment> {
        self.enrollments.iter().find(|e| e.course_id == course_id && e.user_id == user_id)
    }

    pub fn quiz_result_for(&self, quiz_id: &str, student_id: &str) -> Option<&QuizResult> {
        self.quiz_results.iter().find(|r| r.quiz_id == quiz_id && r.student_id == student_id)
    }

    pub fn certificate_for(&self, course_id: &str, student_id: &str) -> Option<&Certificate> {
        self.certificates.iter().find(|c| c.course_id == course_id && c.student_id == student_id)
    }

    /// Hardcoded starting document used on first run or when the stored one is unreadable.
    pub fn seed() -> Self {
        let users = vec![
            seed_user("user-instructor-1", "Morgan Lee", "morgan.lee@example.com", Role::Instructor, "bg-primary-500"),
            seed_user("user-instructor-2", "Riley Okafor", "riley.okafor@example.com", Role::Instructor, "bg-emerald-500"),
            seed_user("user-student-1", "Sam Rivera", "sam.rivera@example.com", Role::Student, "bg-amber-500"),
            seed_user("user-student-2", "Jordan Kim", "jordan.kim@example.com", Role::Student, "bg-rose-500"),
        ];

        let foundations = Course {
            id: "course-foundations".into(),
            title: "Foundations of Product Design".into(),
            description: "Research, sketch and test product ideas with real users.".into(),
            category: "Design".into(),
            level: "Beginner".into(),
            language: "English".into(),
            duration: 21,
            preview_video: PreviewVideo {
                provider: "youtube".into(),
                url: "https://www.youtube.com/embed/dQw4w9WgXcQ".into(),
            },
            cover_image: String::new(),
            password: String::new(),
            prerequisites: Vec::new(),
            drip: Drip { start_date: date(2024, 9, 2), interval_days: 7 },
            modules: vec![
                Module {
                    id: "module-discovery".into(),
                    title: "Discovery".into(),
                    release_offset: 0,
                    lessons: vec![
                        seed_lesson("lesson-interviews", "Running user interviews", LessonKind::Video, 18, date(2024, 9, 2)),
                        seed_lesson("lesson-synthesis", "Synthesis worksheet", LessonKind::Document, 25, date(2024, 9, 4)),
                    ],
                },
                Module {
                    id: "module-prototyping".into(),
                    title: "Prototyping".into(),
                    release_offset: 7,
                    lessons: vec![
                        seed_lesson("lesson-wireframes", "Wireframes that test ideas", LessonKind::Video, 22, date(2024, 9, 9)),
                        seed_lesson("lesson-checkpoint", "Checkpoint quiz", LessonKind::Quiz, 10, date(2024, 9, 11)),
                    ],
                },
            ],
            instructors: vec!["user-instructor-1".into()],
            tags: vec!["ux".into(), "research".into()],
            visibility: Visibility::Public,
            created_at: at(2024, 8, 20, 9),
            updated_at: at(2024, 8, 28, 16),
        };

        let analytics = Course {
            id: "course-analytics".into(),
            title: "Data Storytelling".into(),
            description: "Turn spreadsheets into decisions.".into(),
            category: "Analytics".into(),
            level: "Intermediate".into(),
            language: "English".into(),
            duration: 14,
            preview_video: PreviewVideo::default(),
            cover_image: String::new(),
            password: "insights".into(),
            prerequisites: vec!["course-foundations".into()],
            drip: Drip { start_date: date(2024, 10, 1), interval_days: 3 },
            modules: vec![Module {
                id: "module-charts".into(),
                title: "Choosing the right chart".into(),
                release_offset: 0,
                lessons: vec![seed_lesson("lesson-charts", "Chart anatomy", LessonKind::Video, 15, date(2024, 10, 1))],
            }],
            instructors: vec!["user-instructor-2".into(), "user-instructor-1".into()],
            tags: vec!["data".into()],
            visibility: Visibility::Password,
            created_at: at(2024, 8, 22, 11),
            updated_at: at(2024, 8, 22, 11),
        };

        let quiz = Quiz {
            id: "quiz-discovery".into(),
            course_id: "course-foundations".into(),
            title: "Discovery checkpoint".into(),
            availability: Availability { opens_at: "2024-09-04T09:00".into(), closes_at: String::new() },
            settings: QuizSettings::default(),
            questions: vec![
                Question {
                    id: "question-interviews".into(),
                    kind: QuestionKind::MultipleChoice,
                    prompt: "What is the goal of a discovery interview?".into(),
                    options: vec![
                        "Sell the product".into(),
                        "Understand the problem".into(),
                        "Collect bug reports".into(),
                        "Estimate pricing".into(),
                    ],
                    answer: "Understand the problem".into(),
                    points: 2,
                },
                Question {
                    id: "question-leading".into(),
                    kind: QuestionKind::TrueFalse,
                    prompt: "Leading questions improve interview quality.".into(),
                    options: Vec::new(),
                    answer: "False".into(),
                    points: 1,
                },
                Question {
                    id: "question-artifact".into(),
                    kind: QuestionKind::ShortAnswer,
                    prompt: "Name the artifact that groups observations by theme.".into(),
                    options: Vec::new(),
                    answer: "Affinity map".into(),
                    points: 1,
                },
            ],
        };

        Self {
            users,
            courses: vec![foundations, analytics],
            enrollments: vec![Enrollment {
                id: "enroll-sam-foundations".into(),
                course_id: "course-foundations".into(),
                user_id: "user-student-1".into(),
                progress: 40,
                enrolled_on: at(2024, 9, 1, 8),
            }],
            bundles: vec![Bundle {
                id: "bundle-product".into(),
                name: "Product track".into(),
                description: "Design through data, end to end.".into(),
                course_ids: vec!["course-foundations".into(), "course-analytics".into()],
                visibility: Visibility::Public,
                badge_color: "bg-primary-500".into(),
                created_at: at(2024, 8, 25, 10),
            }],
            quizzes: vec![quiz],
            quiz_results: Vec::new(),
            certificates: Vec::new(),
            communications: vec![Communication {
                id: "comm-welcome".into(),
                course_id: Some("course-foundations".into()),
                kind: CommunicationKind::Announcement,
                title: "Welcome aboard".into(),
                message: "Kickoff call is Monday at 10:00. Bring one product you love.".into(),
                audience: "students".into(),
                created_by: "user-instructor-1".into(),
                created_at: at(2024, 9, 1, 12),
            }],
            active_user_id: "user-instructor-1".into(),
        }
    }
}

fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).single().unwrap_or_default()
}

fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn seed_user(id: &str, name: &str, email: &str, role: Role, color: &str) -> User {
    User { id: id.into(), name: name.into(), email: email.into(), role, avatar_color: color.into() }
}

fn seed_lesson(id: &str, title: &str, kind: LessonKind, duration: u32, release_date: Option<NaiveDate>) -> Lesson {
    let provider = match kind {
        LessonKind::Video => "youtube",
        LessonKind::Document => "pdf",
        LessonKind::Quiz => "internal",
    };
    Lesson {
        id: id.into(),
        title: title.into(),
        kind,
        provider: provider.into(),
        url: String::new(),
        duration,
        release_date,
    }
}
