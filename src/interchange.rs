use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::ImportError;
use crate::models::Course;
use crate::util::generate_id;

/// Pretty JSON for a single course, suitable for hand editing.
pub fn export_course(course: &Course) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(course)
}

/// `"Intro to Rust"` -> `"intro-to-rust.json"`.
pub fn export_file_name(course: &Course) -> String {
    let slug = course.title.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase();
    format!("{}.json", slug)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Parses exported course JSON. A missing id gets a fresh `course-` id and
/// missing timestamps become `now`; anything present is kept as-is.
pub fn parse_course_import(text: &str, now: DateTime<Utc>) -> Result<Course, ImportError> {
    let mut value: Value = serde_json::from_str(text)?;
    let obj = value.as_object_mut().ok_or(ImportError::NotAnObject)?;

    if is_blank(obj.get("id")) {
        obj.insert("id".into(), Value::String(generate_id("course")));
    }
    let stamp = Value::String(now.to_rfc3339_opts(SecondsFormat::AutoSi, true));
    for key in ["createdAt", "updatedAt"] {
        if is_blank(obj.get(key)) {
            obj.insert(key.into(), stamp.clone());
        }
    }

    Ok(serde_json::from_value(value)?)
}

/// Copy of `course` under a new id, titled "<title> (Copy)".
pub fn duplicate_course(course: &Course, new_id: String, now: DateTime<Utc>) -> Course {
    Course {
        id: new_id,
        title: format!("{} (Copy)", course.title),
        created_at: now,
        updated_at: now,
        ..course.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 19, 8, 15, 0).unwrap()
    }

    #[test]
    fn bare_title_gets_id_and_timestamps() {
        let course = parse_course_import(r#"{"title":"X"}"#, now()).unwrap();
        assert_eq!(course.title, "X");
        assert!(course.id.starts_with("course-"));
        assert_eq!(course.created_at, now());
        assert_eq!(course.updated_at, now());
    }

    #[test]
    fn present_fields_are_preserved() {
        let text = r#"{"id":"course-keep","title":"Kept","createdAt":"2023-01-02T03:04:05Z","updatedAt":"2023-02-03T04:05:06Z"}"#;
        let course = parse_course_import(text, now()).unwrap();
        assert_eq!(course.id, "course-keep");
        assert_eq!(course.created_at, Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(course.updated_at, Utc.with_ymd_and_hms(2023, 2, 3, 4, 5, 6).unwrap());
    }

    #[test]
    fn malformed_input_fails_with_status() {
        let err = parse_course_import("{title", now()).unwrap_err();
        assert_eq!(err.to_string(), "Import failed. Ensure the JSON structure is valid.");
        assert!(matches!(parse_course_import("[1,2]", now()), Err(ImportError::NotAnObject)));
        assert!(parse_course_import(r#"{"modules":"many"}"#, now()).is_err());
    }

    #[test]
    fn export_then_import_is_identity() {
        let mut course = parse_course_import(r#"{"title":"Round trip","tags":["a"]}"#, now()).unwrap();
        course.add_module("module-1".into(), "Start");
        let text = export_course(&course).unwrap();
        assert_eq!(parse_course_import(&text, Utc::now()).unwrap(), course);
    }

    #[test]
    fn file_name_slug() {
        let course = Course { title: "Intro  to\tRust ".into(), ..Default::default() };
        assert_eq!(export_file_name(&course), "intro-to-rust.json");
    }

    #[test]
    fn duplicate_gets_copy_suffix() {
        let course = Course { id: "c1".into(), title: "Base".into(), tags: vec!["t".into()], ..Default::default() };
        let copy = duplicate_course(&course, "c2".into(), now());
        assert_eq!(copy.id, "c2");
        assert_eq!(copy.title, "Base (Copy)");
        assert_eq!(copy.tags, course.tags);
        assert_eq!(copy.created_at, now());
    }
}
