use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use crate::core::security::Role;
use crate::core::time::{format_primitive, to_primitive_utc};
use crate::test_support::{self, StubScorer, TestContext};

fn iso(offset: Duration) -> String {
    format_primitive(to_primitive_utc(OffsetDateTime::now_utc() + offset))
}

fn tokens(ctx: &TestContext) -> (String, String) {
    let settings = ctx.state.settings();
    (
        test_support::bearer_token(1, Role::Teacher, settings),
        test_support::bearer_token(50, Role::Student, settings),
    )
}

async fn create(
    ctx: &TestContext,
    token: &str,
    path: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, path, Some(token), Some(body)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    test_support::read_json(response).await
}

#[tokio::test]
async fn teacher_manages_exam_lifecycle() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, student) = tokens(&ctx);

    let exam = create(
        &ctx,
        &teacher,
        "/api/v1/exams",
        json!({
            "title": "Ujian Tengah Semester",
            "class_id": 7,
            "total_marks": 100,
            "start_time": iso(Duration::minutes(-10)),
            "end_time": iso(Duration::hours(1)),
            "content": {"1": "2 + 2?", "1_a": "3", "1_b": "4", "1_answer": "1_b"}
        }),
    )
    .await;
    assert_eq!(exam["status"], "Active");
    assert_eq!(exam["class_id"], 7);
    assert_eq!(exam["teacher_id"], 1);
    assert_eq!(exam["content"]["1_answer"], "1_b");
    let exam_id = exam["id"].as_i64().expect("id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exams?class_id=7",
            Some(&teacher),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let list = test_support::read_json(response).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/exams/{exam_id}"),
            Some(&teacher),
            Some(json!({"end_time": iso(Duration::minutes(-1)), "title": "UTS"})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = test_support::read_json(response).await;
    assert_eq!(updated["status"], "Completed");
    assert_eq!(updated["title"], "UTS");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams/{exam_id}"),
            Some(&student),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/exams/{exam_id}"),
            Some(&teacher),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams/{exam_id}"),
            Some(&teacher),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn exam_requires_a_valid_window() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, _) = tokens(&ctx);

    let cases = [
        json!({"title": "A", "total_marks": 10, "start_time": iso(Duration::ZERO), "end_time": iso(Duration::hours(1))}),
        json!({"title": "B", "total_marks": 10, "class_id": 1}),
        json!({"title": "C", "total_marks": 10, "class_id": 1, "start_time": iso(Duration::hours(2)), "end_time": iso(Duration::hours(1))}),
    ];

    for body in cases {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::POST, "/api/v1/exams", Some(&teacher), Some(body)))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn question_page_hides_answer_key() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, student) = tokens(&ctx);

    let exercise = create(
        &ctx,
        &teacher,
        "/api/v1/exercises",
        json!({
            "title": "Latihan 1",
            "material_id": 3,
            "total_marks": 10,
            "content": {"1": "Ibukota?", "1_a": "Jakarta", "1_answer": "1_a", "10": "Other", "2_essay": "Jelaskan"}
        }),
    )
    .await;
    let exercise_id = exercise["id"].as_i64().expect("id");
    assert_eq!(exercise["material_id"], 3);
    assert!(exercise.get("status").is_none());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exercises/{exercise_id}/questions/1"),
            Some(&student),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let page = test_support::read_json(response).await;
    assert_eq!(page["number"], "1");
    assert_eq!(page["content"], json!({"1": "Ibukota?", "1_a": "Jakarta"}));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exercises/{exercise_id}/questions/9"),
            Some(&student),
            None,
        ))
        .await
        .expect("response");
    let page = test_support::read_json(response).await;
    assert_eq!(page["content"], json!({}));
}

#[tokio::test]
async fn students_list_assessments_without_answer_keys() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, student) = tokens(&ctx);
    let content = json!({
        "1": "Ibukota?", "1_a": "Jakarta", "1_answer": "1_a",
        "2_essay": "Jelaskan", "2_answer": "hidden", "10": "Lain", "10_answer": "x"
    });

    for (class_id, start, end) in [
        (5, Duration::hours(1), Duration::hours(2)),
        (5, Duration::hours(-1), Duration::hours(1)),
        (6, Duration::hours(-1), Duration::hours(1)),
    ] {
        create(
            &ctx,
            &teacher,
            "/api/v1/exams",
            json!({
                "title": format!("Ujian {class_id}"),
                "class_id": class_id,
                "total_marks": 20,
                "start_time": iso(start),
                "end_time": iso(end),
                "content": content.clone()
            }),
        )
        .await;
    }
    create(
        &ctx,
        &teacher,
        "/api/v1/exercises",
        json!({"title": "Latihan", "material_id": 5, "total_marks": 10, "content": content.clone()}),
    )
    .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exams/student?class_id=5&number=1",
            Some(&student),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let exams = test_support::read_json(response).await;
    let exams = exams.as_array().expect("list");
    assert_eq!(exams.len(), 2);
    assert_eq!(exams[0]["status"], "Scheduled");
    assert_eq!(exams[1]["status"], "Active");
    for exam in exams {
        assert_eq!(exam["class_id"], 5);
        assert_eq!(exam["number"], "1");
        assert_eq!(exam["content"], json!({"1": "Ibukota?", "1_a": "Jakarta"}));
        assert!(exam.get("start_time").is_some());
    }

    for number in ["2", "10", "1_answer"] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/exercises/student?material_id=5&number={number}"),
                Some(&student),
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let exercises = test_support::read_json(response).await;
        assert_eq!(exercises.as_array().map(Vec::len), Some(1));
        let page = exercises[0]["content"].as_object().expect("content");
        assert!(page.keys().all(|key| !key.ends_with("_answer")), "leaked key for {number}");
        assert!(exercises[0].get("status").is_none());
    }

    for uri in ["/api/v1/exams/student?number=1", "/api/v1/exams/student?class_id=5&number=%20"] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, uri, Some(&student), None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn exercise_is_graded_once_per_submission() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, student) = tokens(&ctx);

    let exercise = create(
        &ctx,
        &teacher,
        "/api/v1/exercises",
        json!({
            "title": "Latihan 2",
            "material_id": 4,
            "total_marks": 100,
            "content": {"1": "Q1", "1_answer": "A", "2": "Q2", "2_answer": "B"}
        }),
    )
    .await;
    let exercise_id = exercise["id"].as_i64().expect("id");
    let answers_path = format!("/api/v1/exercises/{exercise_id}/answers");
    let grade_path = format!("/api/v1/exercises/{exercise_id}/grade");

    let submission = create(
        &ctx,
        &student,
        &answers_path,
        json!({"student_id": 50, "answers": {"1": "A", "2": "C"}}),
    )
    .await;
    assert_eq!(submission["status"], "Active");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &answers_path,
            Some(&student),
            Some(json!({"student_id": 50, "answers": {"1": "B"}})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let grade = create(&ctx, &student, &grade_path, json!({"student_id": 50})).await;
    assert_eq!(grade["score"], 50.0);
    assert_eq!(grade["detail"], json!({"1": true, "2": false}));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &grade_path,
            Some(&student),
            Some(json!({"student_id": 50})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("{answers_path}?student_id=50"),
            Some(&student),
            None,
        ))
        .await
        .expect("response");
    let stored = test_support::read_json(response).await;
    assert_eq!(stored["status"], "Inactive");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &answers_path,
            Some(&student),
            Some(json!({"student_id": 50, "answers": {"1": "A", "2": "B"}})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &grade_path,
            Some(&student),
            Some(json!({"student_id": 50})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("{grade_path}?student_id=50"),
            Some(&student),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let latest = test_support::read_json(response).await;
    assert_eq!(latest["id"], grade["id"]);
    assert_eq!(latest["score"], 50.0);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exercises/grades?student_id=50",
            Some(&student),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let grades = test_support::read_json(response).await;
    assert_eq!(grades.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn ungraded_answers_can_be_replaced() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, student) = tokens(&ctx);

    let exercise = create(
        &ctx,
        &teacher,
        "/api/v1/exercises",
        json!({"title": "L", "material_id": 2, "total_marks": 10, "content": {"1_answer": "A"}}),
    )
    .await;
    let answers_path = format!("/api/v1/exercises/{}/answers", exercise["id"]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &answers_path,
            Some(&student),
            Some(json!({"student_id": 55, "answers": {"1": "A"}})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    create(&ctx, &student, &answers_path, json!({"student_id": 55, "answers": {"1": "B"}})).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &answers_path,
            Some(&student),
            Some(json!({"student_id": 55, "answers": {"1": "A"}})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = test_support::read_json(response).await;
    assert_eq!(updated["answers"], json!({"1": "A"}));
    assert_eq!(updated["status"], "Active");
}

#[tokio::test]
async fn essay_exam_is_scored_through_the_api() {
    let ctx =
        test_support::setup_test_context_with_scorer(Arc::new(StubScorer::new(["20", "30"]))).await;
    let (teacher, student) = tokens(&ctx);

    let exam = create(
        &ctx,
        &teacher,
        "/api/v1/exams",
        json!({
            "title": "Esai",
            "class_id": 2,
            "total_marks": 90,
            "start_time": iso(Duration::hours(-1)),
            "end_time": iso(Duration::hours(1)),
            "content": {"1": "Pilih", "1_answer": "X", "2_essay": "Jelaskan A", "3_essay": "Jelaskan B"}
        }),
    )
    .await;
    let exam_id = exam["id"].as_i64().expect("id");

    create(
        &ctx,
        &student,
        &format!("/api/v1/exams/{exam_id}/answers"),
        json!({"student_id": 51, "answers": {"1": "X"}}),
    )
    .await;

    let grade =
        create(&ctx, &student, &format!("/api/v1/exams/{exam_id}/grade"), json!({"student_id": 51}))
            .await;

    assert_eq!(grade["score"], 80.0);
    assert_eq!(grade["detail"], json!({"1": true, "2": "20.00/30.00", "3": "30.00/30.00"}));
}

#[tokio::test]
async fn grading_failures_map_to_statuses() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, student) = tokens(&ctx);

    let exam = create(
        &ctx,
        &teacher,
        "/api/v1/exams",
        json!({
            "title": "Kosong",
            "class_id": 2,
            "total_marks": 10,
            "start_time": iso(Duration::hours(-1)),
            "end_time": iso(Duration::hours(1)),
            "content": {"1": "Baca bab 1"}
        }),
    )
    .await;
    let exam_id = exam["id"].as_i64().expect("id");
    let grade_path = format!("/api/v1/exams/{exam_id}/grade");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &grade_path,
            Some(&student),
            Some(json!({"student_id": 52})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    create(
        &ctx,
        &student,
        &format!("/api/v1/exams/{exam_id}/answers"),
        json!({"student_id": 52, "answers": {"1": "sudah"}}),
    )
    .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &grade_path,
            Some(&student),
            Some(json!({"student_id": 52})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "assessment has no gradable questions");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("{grade_path}?student_id=52"),
            Some(&student),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn essay_backend_failure_is_service_unavailable() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, student) = tokens(&ctx);

    let exercise = create(
        &ctx,
        &teacher,
        "/api/v1/exercises",
        json!({"title": "Esai", "material_id": 8, "total_marks": 10, "content": {"1_essay": "Jelaskan"}}),
    )
    .await;
    let exercise_id = exercise["id"].as_i64().expect("id");
    create(
        &ctx,
        &student,
        &format!("/api/v1/exercises/{exercise_id}/answers"),
        json!({"student_id": 53, "answers": {"1": "Karena"}}),
    )
    .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exercises/{exercise_id}/grade"),
            Some(&student),
            Some(json!({"student_id": 53})),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn answers_can_be_deleted() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, student) = tokens(&ctx);

    let exercise = create(
        &ctx,
        &teacher,
        "/api/v1/exercises",
        json!({"title": "L", "material_id": 1, "total_marks": 5, "content": {"1_answer": "A"}}),
    )
    .await;
    let answers_path = format!("/api/v1/exercises/{}/answers", exercise["id"]);
    create(&ctx, &student, &answers_path, json!({"student_id": 54, "answers": {"1": "A"}})).await;

    for expected in [StatusCode::NO_CONTENT, StatusCode::NOT_FOUND] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::DELETE,
                &format!("{answers_path}?student_id=54"),
                Some(&student),
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exercises/grades?student_id=1",
            Some("not-a-jwt"),
            None,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
