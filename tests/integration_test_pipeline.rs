mod common;

use academy_scheduler::domain::models::lead::LeadStatus;
use axum::http::StatusCode;
use chrono::Weekday;
use common::{parse_body, upcoming, CrmCall, TestApp};
use serde_json::json;
use std::sync::atomic::Ordering;

async fn book(app: &TestApp, phone: &str) -> serde_json::Value {
    let template = app.weekly_template("Robotics Lab", &[2], "16:00", 10).await;
    let id = template["id"].as_str().unwrap();
    let res = app.book(id, upcoming(Weekday::Tue, 1), "16:00", "Mia", phone).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    parse_body(res).await
}

#[tokio::test]
async fn test_booking_promotes_early_funnel_lead() {
    let app = TestApp::new().await;
    let lead_id = app.leads.seed("555-010-2030", LeadStatus::Interested);

    book(&app, "(555) 010 2030").await;
    app.run_jobs().await;

    assert_eq!(app.leads.lead(&lead_id).status, LeadStatus::WorkshopBooked);
}

#[tokio::test]
async fn test_promotion_never_moves_a_lead_backwards() {
    let app = TestApp::new().await;
    let lead_id = app.leads.seed("555-010-2030", LeadStatus::Converted);

    book(&app, "555-010-2030").await;
    app.run_jobs().await;

    assert_eq!(app.leads.lead(&lead_id).status, LeadStatus::Converted);
    assert!(app.leads.calls().is_empty());
}

#[tokio::test]
async fn test_differently_formatted_numbers_are_not_matched() {
    let app = TestApp::new().await;
    let lead_id = app.leads.seed("+1 555 010 2030", LeadStatus::New);

    book(&app, "555-010-2030").await;
    app.run_jobs().await;

    assert_eq!(app.leads.lead(&lead_id).status, LeadStatus::New);
}

#[tokio::test]
async fn test_crm_outage_does_not_block_booking() {
    let app = TestApp::new().await;
    let lead_id = app.leads.seed("555-010-2030", LeadStatus::New);
    app.leads.failing.store(true, Ordering::SeqCst);

    let booking = book(&app, "555-010-2030").await;
    app.run_jobs().await;

    assert_eq!(booking["status"], "confirmed");
    let jobs = app.state.job_repo.list_for_booking(booking["id"].as_str().unwrap()).await.unwrap();
    let promote = jobs.iter().find(|j| j.job_type == "PIPELINE_PROMOTE").unwrap();
    assert_eq!(promote.status, "PENDING");
    assert_eq!(promote.attempts, 1);

    app.leads.failing.store(false, Ordering::SeqCst);
    let res = app.post("/api/v1/pipeline/sync", json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.leads.lead(&lead_id).status, LeadStatus::WorkshopBooked);
}

#[tokio::test]
async fn test_sweep_skips_ambiguous_contacts() {
    let app = TestApp::new().await;
    let single = app.leads.seed("555-111-0000", LeadStatus::Contacted);
    let twin_a = app.leads.seed("555-222-0000", LeadStatus::New);
    let twin_b = app.leads.seed("(555) 222-0000", LeadStatus::Interested);
    let idle = app.leads.seed("555-333-0000", LeadStatus::New);

    app.leads.failing.store(true, Ordering::SeqCst);
    book(&app, "555-111-0000").await;
    book(&app, "555-222-0000").await;
    app.leads.failing.store(false, Ordering::SeqCst);

    let res = app.post("/api/v1/pipeline/sync", json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(parse_body(res).await, json!({ "examined": 4, "promoted": 1, "ambiguous": 2 }));

    assert_eq!(app.leads.lead(&single).status, LeadStatus::WorkshopBooked);
    assert_eq!(app.leads.lead(&twin_a).status, LeadStatus::New);
    assert_eq!(app.leads.lead(&twin_b).status, LeadStatus::Interested);
    assert_eq!(app.leads.lead(&idle).status, LeadStatus::New);
    assert_eq!(
        app.leads.calls(),
        vec![CrmCall::Promote(single, LeadStatus::WorkshopBooked)]
    );
}

#[tokio::test]
async fn test_sweep_ignores_cancelled_bookings() {
    let app = TestApp::new().await;
    let lead_id = app.leads.seed("555-444-0000", LeadStatus::New);

    app.leads.failing.store(true, Ordering::SeqCst);
    let booking = book(&app, "555-444-0000").await;
    app.transition(booking["id"].as_str().unwrap(), "cancel").await;
    app.leads.failing.store(false, Ordering::SeqCst);

    let res = app.post("/api/v1/pipeline/sync", json!({})).await;
    assert_eq!(parse_body(res).await["promoted"], 0);
    assert_eq!(app.leads.lead(&lead_id).status, LeadStatus::New);
}

#[tokio::test]
async fn test_sweep_reports_crm_failure() {
    let app = TestApp::new().await;
    app.leads.failing.store(true, Ordering::SeqCst);

    let res = app.post("/api/v1/pipeline/sync", json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(parse_body(res).await["code"], "sync_deferred");
}

#[tokio::test]
async fn test_booking_does_not_promote_shared_phone_leads() {
    let app = TestApp::new().await;
    let first = app.leads.seed("555-010-2030", LeadStatus::New);
    let second = app.leads.seed("555.010.2030", LeadStatus::Contacted);

    book(&app, "555-010-2030").await;
    app.run_jobs().await;

    assert_eq!(app.leads.lead(&first).status, LeadStatus::New);
    assert_eq!(app.leads.lead(&second).status, LeadStatus::Contacted);
    assert!(app.leads.calls().is_empty());
}
