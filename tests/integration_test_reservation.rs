mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Weekday};
use common::{parse_body, upcoming, TestApp};
use serde_json::json;
use tokio::task::JoinSet;
use tower::ServiceExt;

fn day(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[tokio::test]
async fn test_reservation_materializes_slot_once() {
    let app = TestApp::new().await;
    let template = app.weekly_template("Robotics Lab", &[2], "16:00", 10).await;
    let id = template["id"].as_str().unwrap();
    let tuesday = upcoming(Weekday::Tue, 1);

    let res = app.book(id, tuesday, "16:00", "Mia", "+1 (555) 010-2030").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let first = parse_body(res).await;
    assert_eq!(first["status"], "confirmed");
    assert_eq!(first["payment_status"], "unpaid");
    assert!(first.get("phone_digits").is_none());

    let res = app.book(id, tuesday, "16:00", "Leo", "555-010-9999").await;
    let second = parse_body(res).await;
    assert_eq!(first["workshop_slot_id"], second["workshop_slot_id"]);

    let res = app.get(&format!("/api/v1/slots?from={}&days=1", day(tuesday))).await;
    let slots = parse_body(res).await["slots"].clone();
    assert_eq!(slots[0]["slot_id"], first["workshop_slot_id"]);
    assert_eq!(slots[0]["booked_count"], 2);
    assert_eq!(slots[0]["remaining"], 8);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workshop_slots").fetch_one(&app.pool).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_public_booking_by_slug() {
    let app = TestApp::new().await;
    let template = app.weekly_template("Lego Robotics: Intro!", &[6], "10:00", 4).await;
    let slug = template["slug"].as_str().unwrap();
    assert!(slug.starts_with("lego-robotics-intro-"));
    let saturday = upcoming(Weekday::Sat, 1);

    let res = app.post(&format!("/api/v1/workshops/{}/book", slug), json!({
        "date": day(saturday),
        "time": "10:00",
        "attendee_name": "Noah",
        "guardian_name": "Eva",
        "phone": "555 300 4000",
        "email": "eva@example.com"
    })).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app.post("/api/v1/workshops/no-such-workshop/book", json!({
        "date": day(saturday), "time": "10:00", "attendee_name": "Noah", "phone": "555 300 4000"
    })).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_seat_goes_to_exactly_one_of_two_concurrent_requests() {
    let app = TestApp::new().await;
    let template = app.weekly_template("Solo Session", &[3], "14:00", 1).await;
    let id = template["id"].as_str().unwrap().to_string();
    let wednesday = upcoming(Weekday::Wed, 1);

    let mut set = JoinSet::new();
    for (name, phone) in [("Ana", "555-000-0001"), ("Ben", "555-000-0002")] {
        let router = app.router.clone();
        let body = json!({
            "template_id": id, "date": day(wednesday), "time": "14:00",
            "attendee_name": name, "phone": phone
        });
        set.spawn(async move {
            let res = router.oneshot(
                Request::builder().method("POST").uri("/api/v1/bookings")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())).unwrap()
            ).await.unwrap();
            let status = res.status();
            (status, parse_body(res).await)
        });
    }

    let mut created = 0;
    let mut rejected = 0;
    while let Some(joined) = set.join_next().await {
        let (status, body) = joined.unwrap();
        match status {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => {
                assert_eq!(body["code"], "capacity_exceeded");
                assert_eq!(body["remaining"], 0);
                assert_eq!(body["capacity"], 1);
                rejected += 1;
            }
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!((created, rejected), (1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_never_overbook() {
    let app = TestApp::new().await;
    let template = app.weekly_template("Busy Class", &[4], "16:30", 3).await;
    let id = template["id"].as_str().unwrap().to_string();
    let thursday = upcoming(Weekday::Thu, 1);

    let mut set = JoinSet::new();
    for i in 0..8 {
        let state = app.state.clone();
        let id = id.clone();
        set.spawn(async move {
            use academy_scheduler::domain::models::booking::AttendeeInfo;
            use academy_scheduler::domain::services::scheduling::{SlotQuery, TemplateRef};
            state.scheduling.reserve_seat(
                SlotQuery {
                    template: TemplateRef::Id(id),
                    date: thursday,
                    start_time: chrono::NaiveTime::from_hms_opt(16, 30, 0).unwrap(),
                },
                AttendeeInfo {
                    attendee_name: format!("Kid {}", i),
                    guardian_name: "Parent".into(),
                    phone: format!("555-700-{:04}", i),
                    email: None,
                    notes: None,
                },
            ).await
        });
    }

    let mut admitted = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined.unwrap() {
            Ok(booking) => admitted.push(booking),
            Err(academy_scheduler::error::AppError::CapacityExceeded { .. }) => {}
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }
    assert_eq!(admitted.len(), 3);

    let slot_id = &admitted[0].workshop_slot_id;
    let res = app.get(&format!("/api/v1/slots/{}/occupancy", slot_id)).await;
    let occupancy = parse_body(res).await;
    assert_eq!(occupancy, json!({ "capacity": 3, "booked": 3, "remaining": 0 }));

    let seats_taken: i64 = sqlx::query_scalar("SELECT seats_taken FROM workshop_slots WHERE id = ?")
        .bind(slot_id).fetch_one(&app.pool).await.unwrap();
    assert_eq!(seats_taken, 3);
}

#[tokio::test]
async fn test_cancellation_frees_the_seat() {
    let app = TestApp::new().await;
    let template = app.weekly_template("Tiny Class", &[1], "09:30", 1).await;
    let id = template["id"].as_str().unwrap();
    let monday = upcoming(Weekday::Mon, 1);

    let booking = parse_body(app.book(id, monday, "09:30", "Ana", "555-000-1111").await).await;
    let full = app.book(id, monday, "09:30", "Ben", "555-000-2222").await;
    assert_eq!(full.status(), StatusCode::CONFLICT);

    let res = app.transition(booking["id"].as_str().unwrap(), "cancel").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(parse_body(res).await["status"], "cancelled");

    let res = app.book(id, monday, "09:30", "Ben", "555-000-2222").await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app.get(&format!("/api/v1/slots/{}/bookings", booking["workshop_slot_id"].as_str().unwrap())).await;
    let statuses: Vec<String> = parse_body(res).await.as_array().unwrap().iter()
        .map(|b| b["status"].as_str().unwrap().to_string()).collect();
    assert_eq!(statuses, vec!["cancelled", "confirmed"]);
}

#[tokio::test]
async fn test_no_show_keeps_its_seat() {
    let app = TestApp::new().await;
    let template = app.weekly_template("Tiny Class", &[1], "09:30", 1).await;
    let id = template["id"].as_str().unwrap();
    let monday = upcoming(Weekday::Mon, 1);

    let booking = parse_body(app.book(id, monday, "09:30", "Ana", "555-000-1111").await).await;
    assert_eq!(app.transition(booking["id"].as_str().unwrap(), "mark_no_show").await.status(), StatusCode::OK);
    assert_eq!(app.book(id, monday, "09:30", "Ben", "555-000-2222").await.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reservation_rejections() {
    let app = TestApp::new().await;
    let template = app.weekly_template("Ceramics", &[2], "16:00", 5).await;
    let id = template["id"].as_str().unwrap();
    let tuesday = upcoming(Weekday::Tue, 1);

    // Not an occurrence of the rule.
    let res = app.book(id, tuesday + Duration::days(1), "16:00", "Ana", "555-000-1111").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = app.book(id, tuesday, "17:00", "Ana", "555-000-1111").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Already over.
    let res = app.book(id, tuesday - Duration::days(14), "16:00", "Ana", "555-000-1111").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unusable contact.
    let res = app.book(id, tuesday, "16:00", "Ana", "12-34").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let res = app.book(id, tuesday, "16:00", "  ", "555-000-1111").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Malformed time.
    let res = app.book(id, tuesday, "4pm", "Ana", "555-000-1111").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Cancelled slot.
    app.put(&format!("/api/v1/templates/{}/slots", id), json!({
        "date": day(tuesday), "time": "16:00", "cancelled": true
    })).await;
    let res = app.book(id, tuesday, "16:00", "Ana", "555-000-1111").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(parse_body(res).await["code"], "conflict");

    // Inactive template.
    app.put(&format!("/api/v1/templates/{}", id), json!({ "is_active": false })).await;
    let res = app.book(id, tuesday + Duration::days(7), "16:00", "Ana", "555-000-1111").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let bookings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings").fetch_one(&app.pool).await.unwrap();
    assert_eq!(bookings, 0);
}

#[tokio::test]
async fn test_reservation_schedules_promotion_and_reminder() {
    let app = TestApp::new().await;
    let template = app.weekly_template("Astronomy", &[5], "19:00", 5).await;
    let id = template["id"].as_str().unwrap();
    let friday = upcoming(Weekday::Fri, 3);

    let booking = parse_body(app.book(id, friday, "19:00", "Ana", "555-000-1111").await).await;
    let jobs = app.state.job_repo.list_for_booking(booking["id"].as_str().unwrap()).await.unwrap();
    let mut types: Vec<&str> = jobs.iter().map(|j| j.job_type.as_str()).collect();
    types.sort();
    assert_eq!(types, vec!["AUTO_REMINDER", "PIPELINE_PROMOTE"]);

    let reminder = jobs.iter().find(|j| j.job_type == "AUTO_REMINDER").unwrap();
    let starts_at = friday.and_hms_opt(19, 0, 0).unwrap().and_utc();
    assert_eq!(reminder.execute_at, starts_at - Duration::hours(24));
}

#[tokio::test]
async fn test_bookings_by_phone_and_by_id() {
    let app = TestApp::new().await;
    let template = app.weekly_template("Music", &[2, 4], "15:00", 5).await;
    let id = template["id"].as_str().unwrap();
    let tuesday = upcoming(Weekday::Tue, 1);

    let first = parse_body(app.book(id, tuesday, "15:00", "Ana", "(555) 123-4567").await).await;
    app.book(id, tuesday + Duration::days(2), "15:00", "Ana", "555.123.4567").await;
    app.book(id, tuesday, "15:00", "Ben", "555-999-0000").await;

    let res = app.get("/api/v1/bookings?phone=555-123-4567").await;
    assert_eq!(parse_body(res).await.as_array().unwrap().len(), 2);

    let res = app.get("/api/v1/bookings?phone=12").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app.get(&format!("/api/v1/bookings/{}", first["id"].as_str().unwrap())).await;
    assert_eq!(parse_body(res).await["attendee_name"], "Ana");

    assert_eq!(app.get("/api/v1/bookings/missing").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/v1/slots/missing/occupancy").await.status(), StatusCode::NOT_FOUND);
}
