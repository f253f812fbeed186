//! Read-side projections. Nothing here is stored; every function walks the live document.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::document::Document;
use crate::grading::percentage;
use crate::models::{Communication, CommunicationKind, Course, Lesson, Quiz, Role};

/// How many upcoming lessons the dashboard previews.
pub const UPCOMING_PREVIEW: usize = 4;
/// How many recent communications the dashboard previews.
pub const LATEST_PREVIEW: usize = 3;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnalytics {
    pub quiz_id: String,
    pub course_id: String,
    pub title: String,
    pub attempts: usize,
    pub average_score: u32,
    pub best_score: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingLesson {
    pub course_id: String,
    pub course_title: String,
    pub release_date: NaiveDate,
    pub lesson: Lesson,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CourseUnread {
    pub course_id: String,
    pub title: String,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UnreadSummary {
    pub total: usize,
    pub by_course: Vec<CourseUnread>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum RoleInsights {
    #[serde(rename_all = "camelCase")]
    Instructor {
        headline: String,
        highlights: Vec<String>,
        owned_courses: usize,
        modules: usize,
        unread: usize,
    },
    #[serde(rename_all = "camelCase")]
    Student {
        headline: String,
        highlights: Vec<String>,
        enrolled_courses: usize,
        quiz_submissions: usize,
        average_progress: u32,
    },
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn newest_first(items: &mut [&Communication]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Rounded mean progress over the user's enrollments; 0 with none.
pub fn average_progress(doc: &Document, user_id: &str) -> u32 {
    let progress: Vec<u32> = doc
        .enrollments
        .iter()
        .filter(|e| e.user_id == user_id)
        .map(|e| u32::from(e.progress))
        .collect();
    if progress.is_empty() {
        return 0;
    }
    (f64::from(progress.iter().sum::<u32>()) / progress.len() as f64).round() as u32
}

pub fn quiz_analytics(doc: &Document) -> Vec<QuizAnalytics> {
    doc.quizzes
        .iter()
        .map(|quiz| {
            let results: Vec<_> = doc.quiz_results.iter().filter(|r| r.quiz_id == quiz.id).collect();
            let average_score = if results.is_empty() {
                0
            } else {
                let sum: f64 = results
                    .iter()
                    .map(|r| {
                        if r.total_points == 0 {
                            0.0
                        } else {
                            f64::from(r.score) / f64::from(r.total_points) * 100.0
                        }
                    })
                    .sum();
                (sum / results.len() as f64).round() as u32
            };
            let best_score = results
                .iter()
                .map(|r| percentage(r.score, r.total_points))
                .max()
                .unwrap_or(0);
            QuizAnalytics {
                quiz_id: quiz.id.clone(),
                course_id: quiz.course_id.clone(),
                title: quiz.title.clone(),
                attempts: results.len(),
                average_score,
                best_score,
            }
        })
        .collect()
}

/// Lessons releasing at or after `now` (a date counts from 00:00 UTC), soonest first.
pub fn upcoming_releases(doc: &Document, now: DateTime<Utc>, limit: usize) -> Vec<UpcomingLesson> {
    let mut upcoming: Vec<UpcomingLesson> = doc
        .courses
        .iter()
        .flat_map(|course| {
            course.modules.iter().flat_map(move |module| {
                module.lessons.iter().filter_map(move |lesson| {
                    let release_date = lesson.release_date?;
                    let opens = Utc.from_utc_datetime(&release_date.and_time(NaiveTime::MIN));
                    (opens >= now).then(|| UpcomingLesson {
                        course_id: course.id.clone(),
                        course_title: course.title.clone(),
                        release_date,
                        lesson: lesson.clone(),
                    })
                })
            })
        })
        .collect();
    upcoming.sort_by_key(|u| u.release_date);
    upcoming.truncate(limit);
    upcoming
}

/// Communications on the instructor's courses written by someone else.
pub fn unread_communications(doc: &Document, instructor_id: &str) -> UnreadSummary {
    let by_course: Vec<CourseUnread> = doc
        .courses
        .iter()
        .filter(|c| c.is_taught_by(instructor_id))
        .map(|course| CourseUnread {
            course_id: course.id.clone(),
            title: course.title.clone(),
            count: doc
                .communications
                .iter()
                .filter(|m| m.belongs_to(&course.id) && m.created_by != instructor_id)
                .count(),
        })
        .collect();
    UnreadSummary { total: by_course.iter().map(|c| c.count).sum(), by_course }
}

pub fn role_insights(doc: &Document, user_id: &str) -> Option<RoleInsights> {
    let user = doc.user(user_id)?;
    let insights = match user.role {
        Role::Instructor => {
            let owned: Vec<&Course> =
                doc.courses.iter().filter(|c| c.is_taught_by(&user.id)).collect();
            let modules = owned.iter().map(|c| c.modules.len()).sum();
            let unread = unread_communications(doc, &user.id).total;
            RoleInsights::Instructor {
                headline: format!("You are orchestrating {} course{} this sprint.", owned.len(), plural(owned.len())),
                highlights: vec![
                    format!("{} modules ready", modules),
                    format!("{} learner communication{} awaiting review", unread, plural(unread)),
                ],
                owned_courses: owned.len(),
                modules,
                unread,
            }
        }
        Role::Student => {
            let enrolled = doc
                .enrollments
                .iter()
                .filter(|e| e.user_id == user.id && doc.course(&e.course_id).is_some())
                .count();
            let quiz_submissions = doc.quiz_results.iter().filter(|r| r.student_id == user.id).count();
            let average_progress = average_progress(doc, &user.id);
            RoleInsights::Student {
                headline: format!(
                    "You are progressing through {} course{}. Keep the streak going!",
                    enrolled,
                    plural(enrolled)
                ),
                highlights: vec![
                    format!("{} quiz submissions logged", quiz_submissions),
                    format!("{}% average progress", average_progress),
                ],
                enrolled_courses: enrolled,
                quiz_submissions,
                average_progress,
            }
        }
    };
    Some(insights)
}

/// General posts and posts on live courses, newest first.
pub fn latest_communications(doc: &Document, limit: usize) -> Vec<&Communication> {
    let mut items: Vec<&Communication> = doc
        .communications
        .iter()
        .filter(|m| m.is_general() || m.course_id.as_deref().is_some_and(|id| doc.course(id).is_some()))
        .collect();
    newest_first(&mut items);
    items.truncate(limit);
    items
}

pub fn course_communications<'a>(doc: &'a Document, course_id: &str) -> Vec<&'a Communication> {
    filter_communications(doc, Some(course_id), None)
}

pub fn filter_communications<'a>(
    doc: &'a Document,
    course_id: Option<&str>,
    kind: Option<CommunicationKind>,
) -> Vec<&'a Communication> {
    let mut items: Vec<&Communication> = doc
        .communications
        .iter()
        .filter(|m| course_id.map_or(true, |id| m.belongs_to(id)))
        .filter(|m| kind.map_or(true, |k| m.kind == k))
        .collect();
    newest_first(&mut items);
    items
}

/// Case-insensitive substring match on title or category.
pub fn search_catalog<'a>(doc: &'a Document, query: &str) -> Vec<&'a Course> {
    let needle = query.to_lowercase();
    doc.courses
        .iter()
        .filter(|c| c.title.to_lowercase().contains(&needle) || c.category.to_lowercase().contains(&needle))
        .collect()
}

/// Instructors see quizzes of courses they teach; students those of courses they're enrolled in.
pub fn available_quizzes<'a>(doc: &'a Document, user_id: &str) -> Vec<&'a Quiz> {
    let Some(user) = doc.user(user_id) else {
        return Vec::new();
    };
    match user.role {
        Role::Instructor => doc
            .quizzes
            .iter()
            .filter(|q| {
                doc.course(&q.course_id)
                    .is_some_and(|c| c.is_taught_by(&user.id))
            })
            .collect(),
        Role::Student => doc
            .quizzes
            .iter()
            .filter(|q| doc.enrollment_for(&q.course_id, &user.id).is_some())
            .collect(),
    }
}

pub fn certificate_eligible_students<'a>(doc: &'a Document, course_id: &str) -> Vec<&'a str> {
    doc.enrollments
        .iter()
        .filter(|e| e.course_id == course_id)
        .map(|e| e.user_id.as_str())
        .collect()
}

pub fn lesson_count(course: &Course) -> usize {
    course.modules.iter().map(|m| m.lessons.len()).sum()
}
