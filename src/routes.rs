use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    authoring, insights, interchange,
    models::*,
    reducer::Action,
    store::Store,
    util::generate_id,
};

pub type SharedStore = Arc<Mutex<Store>>;
type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router(store: SharedStore) -> Router {
    Router::new()
        // whole-document access
        .route("/api/state", get(get_state))
        .route("/api/dispatch", post(dispatch))
        .route("/api/active-user", put(set_active_user))
        .route("/api/ids/:prefix", get(new_id))
        // courses
        .route("/api/catalog", get(catalog))
        .route("/api/courses", post(create_course))
        .route("/api/courses/import", post(import_course))
        .route("/api/courses/:id", put(update_course).delete(delete_course))
        .route("/api/courses/:id/export", get(export_course))
        .route("/api/courses/:id/duplicate", post(duplicate_course))
        .route("/api/enrollments", post(add_enrollment))
        .route("/api/enrollments/:id", put(update_enrollment))
        .route("/api/bundles", post(create_bundle))
        .route("/api/bundles/:id", put(update_bundle).delete(delete_bundle))
        // assessment
        .route("/api/quizzes", post(create_quiz))
        .route("/api/quizzes/:id", put(update_quiz).delete(delete_quiz))
        .route("/api/quizzes/:id/submit", post(submit_quiz))
        .route("/api/certificates", post(save_certificate))
        .route("/api/certificates/:id", delete(delete_certificate))
        // messaging
        .route("/api/communications", post(add_communication))
        .route("/api/communications/:id", delete(delete_communication))
        // read-only projections
        .route("/api/insights/users/:id", get(user_insights))
        .route("/api/insights/quizzes", get(quiz_report))
        .route("/api/insights/releases", get(releases))
        .with_state(store)
}

fn lock(store: &SharedStore) -> ApiResult<MutexGuard<'_, Store>> {
    store.lock().map_err(e500)
}

fn is_unset(ts: &DateTime<Utc>) -> bool {
    *ts == DateTime::<Utc>::default()
}

fn fill_id(id: &mut String, prefix: &str) {
    if id.is_empty() {
        *id = generate_id(prefix);
    }
}

async fn get_state(State(store): State<SharedStore>) -> ApiResult<impl IntoResponse> {
    let store = lock(&store)?;
    Ok(Json(store.snapshot()))
}

async fn dispatch(State(store): State<SharedStore>, Json(action): Json<Action>) -> ApiResult<impl IntoResponse> {
    let mut store = lock(&store)?;
    store.dispatch(action);
    Ok(Json(serde_json::json!({ "ok": true, "revision": store.revision() })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveUserReq {
    user_id: String,
}

async fn set_active_user(
    State(store): State<SharedStore>,
    Json(req): Json<ActiveUserReq>,
) -> ApiResult<impl IntoResponse> {
    let mut store = lock(&store)?;
    store.set_active_user(req.user_id);
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn new_id(Path(prefix): Path<String>) -> impl IntoResponse {
    Json(serde_json::json!({ "id": generate_id(&prefix) }))
}

#[derive(Deserialize)]
struct CatalogQuery {
    q: Option<String>,
}

async fn catalog(State(store): State<SharedStore>, Query(query): Query<CatalogQuery>) -> ApiResult<Json<Vec<Course>>> {
    let store = lock(&store)?;
    let found = insights::search_catalog(store.document(), query.q.as_deref().unwrap_or_default());
    Ok(Json(found.into_iter().cloned().collect()))
}

async fn create_course(State(store): State<SharedStore>, Json(mut course): Json<Course>) -> ApiResult<Json<Course>> {
    let now = Utc::now();
    fill_id(&mut course.id, "course");
    if is_unset(&course.created_at) {
        course.created_at = now;
    }
    course.touch(now);
    let mut store = lock(&store)?;
    store.create_course(course.clone());
    Ok(Json(course))
}

async fn update_course(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(mut course): Json<Course>,
) -> ApiResult<Json<Course>> {
    let mut store = lock(&store)?;
    if store.document().course(&id).is_none() {
        return Err(e404("course not found"));
    }
    course.id = id;
    course.touch(Utc::now());
    store.update_course(course.clone());
    Ok(Json(course))
}

async fn delete_course(State(store): State<SharedStore>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let mut store = lock(&store)?;
    store.delete_course(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn import_course(State(store): State<SharedStore>, body: String) -> ApiResult<Json<Course>> {
    let mut store = lock(&store)?;
    let course = store.import_course_json(&body, Utc::now()).map_err(e400)?;
    Ok(Json(course))
}

async fn export_course(State(store): State<SharedStore>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let store = lock(&store)?;
    let course = store.document().course(&id).ok_or_else(|| e404("course not found"))?;
    let text = interchange::export_course(course).map_err(e500)?;
    let disposition = format!("attachment; filename=\"{}\"", interchange::export_file_name(course));
    Ok(([(CONTENT_TYPE, "application/json".to_string()), (CONTENT_DISPOSITION, disposition)], text))
}

async fn duplicate_course(State(store): State<SharedStore>, Path(id): Path<String>) -> ApiResult<Json<Course>> {
    let mut store = lock(&store)?;
    let source = store.document().course(&id).ok_or_else(|| e404("course not found"))?;
    let copy = interchange::duplicate_course(source, generate_id("course"), Utc::now());
    store.create_course(copy.clone());
    Ok(Json(copy))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollReq {
    course_id: String,
    user_id: Option<String>,
    #[serde(default)]
    progress: u8,
}

async fn add_enrollment(State(store): State<SharedStore>, Json(req): Json<EnrollReq>) -> ApiResult<Json<Enrollment>> {
    let mut store = lock(&store)?;
    let user_id = match req.user_id {
        Some(id) => id,
        None => store.document().active_user().map(|u| u.id.clone()).ok_or_else(|| e400("no active user"))?,
    };
    if req.course_id.is_empty() {
        return Err(e400("Select a course to enroll in."));
    }
    store.add_enrollment(Enrollment {
        id: generate_id("enroll"),
        course_id: req.course_id.clone(),
        user_id: user_id.clone(),
        progress: req.progress,
        enrolled_on: Utc::now(),
    });
    let enrollment = store
        .document()
        .enrollment_for(&req.course_id, &user_id)
        .cloned()
        .ok_or_else(|| e500("enrollment vanished"))?;
    Ok(Json(enrollment))
}

async fn update_enrollment(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(mut enrollment): Json<Enrollment>,
) -> ApiResult<Json<Enrollment>> {
    let mut store = lock(&store)?;
    if !store.document().enrollments.iter().any(|e| e.id == id) {
        return Err(e404("enrollment not found"));
    }
    enrollment.id = id.clone();
    store.update_enrollment(enrollment);
    let stored = store
        .document()
        .enrollments
        .iter()
        .find(|e| e.id == id)
        .cloned()
        .ok_or_else(|| e500("enrollment vanished"))?;
    Ok(Json(stored))
}

async fn create_bundle(State(store): State<SharedStore>, Json(mut bundle): Json<Bundle>) -> ApiResult<Json<Bundle>> {
    fill_id(&mut bundle.id, "bundle");
    if is_unset(&bundle.created_at) {
        bundle.created_at = Utc::now();
    }
    let mut store = lock(&store)?;
    store.create_bundle(bundle.clone());
    Ok(Json(bundle))
}

async fn update_bundle(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(mut bundle): Json<Bundle>,
) -> ApiResult<Json<Bundle>> {
    let mut store = lock(&store)?;
    if !store.document().bundles.iter().any(|b| b.id == id) {
        return Err(e404("bundle not found"));
    }
    bundle.id = id;
    store.update_bundle(bundle.clone());
    Ok(Json(bundle))
}

async fn delete_bundle(State(store): State<SharedStore>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let mut store = lock(&store)?;
    store.delete_bundle(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn create_quiz(State(store): State<SharedStore>, Json(mut quiz): Json<Quiz>) -> ApiResult<Json<Quiz>> {
    if quiz.course_id.is_empty() {
        return Err(e400("Select a course before saving."));
    }
    fill_id(&mut quiz.id, "quiz");
    let mut store = lock(&store)?;
    store.create_quiz(quiz.clone());
    Ok(Json(quiz))
}

async fn update_quiz(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(mut quiz): Json<Quiz>,
) -> ApiResult<Json<Quiz>> {
    if quiz.course_id.is_empty() {
        return Err(e400("Select a course before saving."));
    }
    let mut store = lock(&store)?;
    if store.document().quiz(&id).is_none() {
        return Err(e404("quiz not found"));
    }
    quiz.id = id;
    store.update_quiz(quiz.clone());
    Ok(Json(quiz))
}

async fn delete_quiz(State(store): State<SharedStore>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let mut store = lock(&store)?;
    store.delete_quiz(&id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitReq {
    student_id: Option<String>,
    #[serde(default)]
    responses: HashMap<String, String>,
}

async fn submit_quiz(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(req): Json<SubmitReq>,
) -> ApiResult<Json<QuizResult>> {
    let mut store = lock(&store)?;
    let student_id = match req.student_id {
        Some(id) => id,
        None => store.document().active_user().map(|u| u.id.clone()).ok_or_else(|| e400("no active user"))?,
    };
    let result = store
        .take_quiz(&id, &student_id, &req.responses, Utc::now())
        .ok_or_else(|| e404("quiz not found"))?;
    Ok(Json(result))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CertificateReq {
    #[serde(default)]
    course_id: String,
    #[serde(default)]
    student_id: String,
    #[serde(default)]
    template: CertificateTemplate,
}

async fn save_certificate(
    State(store): State<SharedStore>,
    Json(req): Json<CertificateReq>,
) -> ApiResult<Json<Certificate>> {
    if req.course_id.is_empty() || req.student_id.is_empty() {
        return Err(e400("Select both course and learner."));
    }
    let mut store = lock(&store)?;
    store.save_certificate(Certificate {
        id: generate_id("cert"),
        course_id: req.course_id.clone(),
        student_id: req.student_id.clone(),
        issued_on: Utc::now(),
        template: req.template,
    });
    let saved = store
        .document()
        .certificate_for(&req.course_id, &req.student_id)
        .cloned()
        .ok_or_else(|| e500("certificate vanished"))?;
    Ok(Json(saved))
}

async fn delete_certificate(State(store): State<SharedStore>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let mut store = lock(&store)?;
    store.delete_certificate(&id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommunicationReq {
    #[serde(default)]
    course_id: String,
    #[serde(default, rename = "type")]
    kind: CommunicationKind,
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
    created_by: Option<String>,
}

async fn add_communication(
    State(store): State<SharedStore>,
    Json(req): Json<CommunicationReq>,
) -> ApiResult<Json<Communication>> {
    if req.course_id.is_empty() || req.message.trim().is_empty() {
        return Err(e400("Select a course and add a message."));
    }
    let mut store = lock(&store)?;
    let doc = store.document();
    let author = match &req.created_by {
        Some(id) => doc.user(id),
        None => doc.active_user(),
    }
    .ok_or_else(|| e400("unknown author"))?;
    let post = authoring::new_communication(
        generate_id("comm"),
        &req.course_id,
        req.kind,
        &req.title,
        &req.message,
        author,
        Utc::now(),
    );
    store.add_communication(post.clone());
    Ok(Json(post))
}

async fn delete_communication(State(store): State<SharedStore>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let mut store = lock(&store)?;
    store.delete_communication(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn user_insights(State(store): State<SharedStore>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let store = lock(&store)?;
    let doc = store.document();
    let role = insights::role_insights(doc, &id).ok_or_else(|| e404("user not found"))?;
    let quizzes: Vec<&str> = insights::available_quizzes(doc, &id).iter().map(|q| q.id.as_str()).collect();
    Ok(Json(serde_json::json!({
        "insights": role,
        "averageProgress": insights::average_progress(doc, &id),
        "unread": insights::unread_communications(doc, &id),
        "availableQuizzes": quizzes,
        "latest": insights::latest_communications(doc, insights::LATEST_PREVIEW),
    })))
}

async fn quiz_report(State(store): State<SharedStore>) -> ApiResult<impl IntoResponse> {
    let store = lock(&store)?;
    Ok(Json(insights::quiz_analytics(store.document())))
}

#[derive(Deserialize)]
struct ReleaseQuery {
    limit: Option<usize>,
}

async fn releases(State(store): State<SharedStore>, Query(query): Query<ReleaseQuery>) -> ApiResult<impl IntoResponse> {
    let store = lock(&store)?;
    let limit = query.limit.unwrap_or(insights::UPCOMING_PREVIEW);
    Ok(Json(insights::upcoming_releases(store.document(), Utc::now(), limit)))
}

// --- helpers ---
fn e400<T: ToString>(msg: T) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.to_string())
}

fn e404<T: Into<String>>(msg: T) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, msg.into())
}

fn e500<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    tracing::error!(error=%e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
