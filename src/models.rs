use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{serde_as, DefaultOnNull, DeserializeAs, SerializeAs};

/// `YYYY-MM-DD`, written as-is. Reads also take a full timestamp (only the
/// date prefix counts); empty, null or unreadable values become `None`.
pub struct CalendarDate;

impl SerializeAs<Option<NaiveDate>> for CalendarDate {
    fn serialize_as<S: Serializer>(source: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match source {
            Some(date) => serializer.collect_str(&date.format("%Y-%m-%d")),
            None => serializer.serialize_str(""),
        }
    }
}

impl<'de> DeserializeAs<'de, Option<NaiveDate>> for CalendarDate {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        let text = text.trim();
        let prefix = text.get(..10).unwrap_or(text);
        Ok(NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    }
}

/// Non-negative whole number. Reads accept fractions and numeric strings,
/// rounded and clamped into range; null reads as 0.
pub struct WholeNumber;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Int(u64),
    Float(f64),
    Text(String),
}

impl NumberLike {
    fn to_f64(&self) -> Result<f64, String> {
        match self {
            NumberLike::Int(n) => Ok(*n as f64),
            NumberLike::Float(n) => Ok(*n),
            NumberLike::Text(s) if s.trim().is_empty() => Ok(0.0),
            NumberLike::Text(s) => s.trim().parse().map_err(|_| format!("not a number: {:?}", s)),
        }
    }
}

impl<T: Serialize> SerializeAs<T> for WholeNumber {
    fn serialize_as<S: Serializer>(source: &T, serializer: S) -> Result<S::Ok, S::Error> {
        source.serialize(serializer)
    }
}

macro_rules! whole_number {
    ($($t:ty),*) => {$(
        impl<'de> DeserializeAs<'de, $t> for WholeNumber {
            fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<$t, D::Error> {
                let n = match Option::<NumberLike>::deserialize(deserializer)? {
                    Some(n) => n.to_f64().map_err(D::Error::custom)?,
                    None => 0.0,
                };
                // NaN casts to 0
                Ok(n.round().clamp(0.0, f64::from(<$t>::MAX)) as $t)
            }
        }
    )*};
}

whole_number!(u8, u32);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Instructor,
    #[default]
    Student,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar_color: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Password,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewVideo {
    // older exports call this field "type"
    #[serde(alias = "type")]
    pub provider: String,
    pub url: String,
}

impl Default for PreviewVideo {
    fn default() -> Self {
        Self { provider: "youtube".into(), url: String::new() }
    }
}

/// Staged release: module `n` opens `releaseOffset` days after `startDate`.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Drip {
    #[serde_as(as = "CalendarDate")]
    pub start_date: Option<NaiveDate>,
    #[serde_as(as = "WholeNumber")]
    pub interval_days: u32,
}

impl Default for Drip {
    fn default() -> Self {
        Self { start_date: None, interval_days: 3 }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub language: String,
    /// Length in days.
    #[serde_as(as = "WholeNumber")]
    pub duration: u32,
    #[serde_as(as = "DefaultOnNull")]
    pub preview_video: PreviewVideo,
    pub cover_image: String,
    /// Only checked when `visibility` is `password`.
    pub password: String,
    pub prerequisites: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub drip: Drip,
    pub modules: Vec<Module>,
    pub instructors: Vec<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Module {
    pub id: String,
    pub title: String,
    /// Days after the drip start date.
    #[serde_as(as = "WholeNumber")]
    pub release_offset: u32,
    pub lessons: Vec<Lesson>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    #[default]
    Video,
    Document,
    Quiz,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LessonKind,
    pub provider: String,
    pub url: String,
    /// Minutes.
    #[serde_as(as = "WholeNumber")]
    pub duration: u32,
    #[serde_as(as = "CalendarDate")]
    pub release_date: Option<NaiveDate>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Enrollment {
    pub id: String,
    pub course_id: String,
    pub user_id: String,
    /// Percent complete, 0..=100.
    #[serde_as(as = "WholeNumber")]
    pub progress: u8,
    pub enrolled_on: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Bundle {
    pub id: String,
    pub name: String,
    pub description: String,
    pub course_ids: Vec<String>,
    pub visibility: Visibility,
    pub badge_color: String,
    pub created_at: DateTime<Utc>,
}

impl Default for Bundle {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: "New bundle".into(),
            description: String::new(),
            course_ids: Vec::new(),
            visibility: Visibility::Public,
            badge_color: "bg-primary-500".into(),
            created_at: DateTime::default(),
        }
    }
}

/// Opening window, as entered in the builder (`YYYY-MM-DDTHH:MM`). Empty means unbounded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Availability {
    pub opens_at: String,
    pub closes_at: String,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizSettings {
    /// Minutes.
    #[serde_as(as = "WholeNumber")]
    pub time_limit: u32,
    #[serde_as(as = "WholeNumber")]
    pub attempts_allowed: u32,
    pub shuffle_questions: bool,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self { time_limit: 20, attempts_allowed: 1, shuffle_questions: false }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Quiz {
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    pub availability: Availability,
    #[serde_as(as = "DefaultOnNull")]
    pub settings: QuizSettings,
    pub questions: Vec<Question>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    #[default]
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
    /// Authoritative correct value.
    pub answer: String,
    #[serde_as(as = "WholeNumber")]
    pub points: u32,
}

impl Default for Question {
    fn default() -> Self {
        Self {
            id: String::new(),
            kind: QuestionKind::MultipleChoice,
            prompt: String::new(),
            options: Vec::new(),
            answer: String::new(),
            points: 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionResponse {
    pub question_id: String,
    pub response: String,
    pub correct: bool,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizResult {
    pub id: String,
    pub quiz_id: String,
    pub student_id: String,
    #[serde_as(as = "WholeNumber")]
    pub score: u32,
    #[serde_as(as = "WholeNumber")]
    pub total_points: u32,
    pub submitted_at: DateTime<Utc>,
    pub responses: Vec<QuestionResponse>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateTemplate {
    pub accent_color: String,
    pub background_color: String,
    pub signature: String,
    pub message: String,
    pub badge: String,
}

impl Default for CertificateTemplate {
    fn default() -> Self {
        Self {
            accent_color: "#4f46e5".into(),
            background_color: "#eef2ff".into(),
            signature: String::new(),
            message: "has successfully completed this course.".into(),
            badge: "Certificate of Achievement".into(),
        }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Certificate {
    pub id: String,
    pub course_id: String,
    pub student_id: String,
    pub issued_on: DateTime<Utc>,
    #[serde_as(as = "DefaultOnNull")]
    pub template: CertificateTemplate,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationKind {
    #[default]
    Announcement,
    Message,
    Event,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Communication {
    pub id: String,
    /// `None`, empty or `"general"` for course-less posts.
    pub course_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: CommunicationKind,
    pub title: String,
    pub message: String,
    pub audience: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Communication {
    pub fn is_general(&self) -> bool {
        match self.course_id.as_deref() {
            None | Some("") | Some("general") => true,
            Some(_) => false,
        }
    }

    pub fn belongs_to(&self, course_id: &str) -> bool {
        !self.is_general() && self.course_id.as_deref() == Some(course_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_course_takes_defaults() {
        let c: Course = serde_json::from_str(r#"{"title":"X","drip":null}"#).unwrap();
        assert_eq!(c.title, "X");
        assert_eq!(c.id, "");
        assert_eq!(c.drip, Drip::default());
        assert_eq!(c.preview_video.provider, "youtube");
        assert!(c.modules.is_empty());
    }

    #[test]
    fn legacy_preview_video_type_key() {
        let c: Course =
            serde_json::from_str(r#"{"previewVideo":{"type":"vimeo","url":"https://vimeo.com/1"}}"#).unwrap();
        assert_eq!(c.preview_video.provider, "vimeo");
        let out = serde_json::to_value(&c).unwrap();
        assert_eq!(out["previewVideo"]["provider"], "vimeo");
    }

    #[test]
    fn empty_release_date_is_unset() {
        let l: Lesson = serde_json::from_str(r#"{"id":"l1","releaseDate":""}"#).unwrap();
        assert_eq!(l.release_date, None);
        let l: Lesson = serde_json::from_str(r#"{"id":"l1","releaseDate":"2024-05-01"}"#).unwrap();
        assert_eq!(l.release_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn timestamp_release_date_keeps_the_day() {
        let l: Lesson = serde_json::from_str(r#"{"releaseDate":"2024-09-02T00:00:00.000Z"}"#).unwrap();
        assert_eq!(l.release_date, NaiveDate::from_ymd_opt(2024, 9, 2));
        let l: Lesson = serde_json::from_str(r#"{"releaseDate":"someday"}"#).unwrap();
        assert_eq!(l.release_date, None);
        let d: Drip = serde_json::from_str(r#"{"startDate":"2024-09-02T09:30:00+02:00","intervalDays":7}"#).unwrap();
        assert_eq!(d.start_date, NaiveDate::from_ymd_opt(2024, 9, 2));
        let out = serde_json::to_value(&d).unwrap();
        assert_eq!(out["startDate"], "2024-09-02");
        assert_eq!(serde_json::to_value(Drip::default()).unwrap()["startDate"], "");
    }

    #[test]
    fn loose_numbers_are_rounded_and_clamped() {
        let l: Lesson = serde_json::from_str(r#"{"duration":12.6}"#).unwrap();
        assert_eq!(l.duration, 13);
        let l: Lesson = serde_json::from_str(r#"{"duration":"45"}"#).unwrap();
        assert_eq!(l.duration, 45);
        let l: Lesson = serde_json::from_str(r#"{"duration":-3}"#).unwrap();
        assert_eq!(l.duration, 0);
        let l: Lesson = serde_json::from_str(r#"{"duration":null}"#).unwrap();
        assert_eq!(l.duration, 0);
        let e: Enrollment = serde_json::from_str(r#"{"progress":1000}"#).unwrap();
        assert_eq!(e.progress, u8::MAX);
        assert!(serde_json::from_str::<Lesson>(r#"{"duration":"long"}"#).is_err());
        assert_eq!(serde_json::to_value(&l).unwrap()["duration"], 0);
    }

    #[test]
    fn question_points_default_to_one() {
        let q: Question = serde_json::from_str(r#"{"id":"q","type":"short-answer"}"#).unwrap();
        assert_eq!(q.points, 1);
        assert_eq!(q.kind, QuestionKind::ShortAnswer);
    }

    #[test]
    fn general_communications() {
        let mut c = Communication::default();
        assert!(c.is_general());
        c.course_id = Some("general".into());
        assert!(c.is_general());
        c.course_id = Some("course-1".into());
        assert!(c.belongs_to("course-1"));
        assert!(!c.belongs_to("course-2"));
    }
}
