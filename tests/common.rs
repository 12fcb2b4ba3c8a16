use academy_scheduler::{
    api::router::create_router,
    background::run_due_jobs,
    config::Config,
    domain::models::lead::{Lead, LeadMatch, LeadStatus, LeadUpdate, NewLead},
    domain::ports::{LeadStore, MessageChannel},
    domain::services::pipeline::normalize_phone,
    error::AppError,
    infra::factory::{connect_sqlite, sqlite_repositories},
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde_json::{json, Value};
use sqlx::{Pool, Sqlite};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

/// Records every outbound message; can be switched to fail.
#[derive(Default)]
pub struct MockMessageChannel {
    pub sent: Mutex<Vec<(String, String)>>,
    pub failing: AtomicBool,
}

#[async_trait]
impl MessageChannel for MockMessageChannel {
    async fn send_message(&self, phone: &str, text: &str) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::SyncDeferred("message gateway unavailable".into()));
        }
        self.sent.lock().unwrap().push((phone.to_string(), text.to_string()));
        Ok(())
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum CrmCall {
    Create(String),
    Update(String),
    Promote(String, LeadStatus),
}

/// Lead store kept in memory. Records writes; can be switched to fail.
#[derive(Default)]
pub struct InMemoryLeadStore {
    pub leads: Mutex<Vec<Lead>>,
    pub calls: Mutex<Vec<CrmCall>>,
    pub failing: AtomicBool,
}

#[allow(dead_code)]
impl InMemoryLeadStore {
    pub fn seed(&self, phone: &str, status: LeadStatus) -> String {
        let id = Uuid::new_v4().to_string();
        self.leads.lock().unwrap().push(Lead {
            id: id.clone(),
            phone: phone.to_string(),
            name: "Seeded Lead".to_string(),
            status,
            tags: vec![],
            interests: vec![],
            timeline: vec![],
        });
        id
    }

    pub fn lead(&self, id: &str) -> Lead {
        self.leads.lock().unwrap().iter().find(|l| l.id == id).cloned().expect("lead exists")
    }

    pub fn calls(&self) -> Vec<CrmCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::SyncDeferred("crm unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn find_lead_by_phone(&self, phone: &str) -> Result<LeadMatch, AppError> {
        self.check()?;
        let leads = self.leads.lock().unwrap();
        let matches = leads.iter().filter(|l| normalize_phone(&l.phone) == phone).cloned().collect();
        Ok(LeadMatch::from_candidates(matches))
    }

    async fn list_leads_by_status(&self, statuses: &[LeadStatus]) -> Result<Vec<Lead>, AppError> {
        self.check()?;
        Ok(self.leads.lock().unwrap().iter().filter(|l| statuses.contains(&l.status)).cloned().collect())
    }

    async fn create_lead(&self, lead: &NewLead) -> Result<Lead, AppError> {
        self.check()?;
        let created = Lead {
            id: Uuid::new_v4().to_string(),
            phone: lead.phone.clone(),
            name: lead.name.clone(),
            status: lead.status,
            tags: lead.tags.clone(),
            interests: lead.interests.clone(),
            timeline: lead.timeline.clone(),
        };
        self.leads.lock().unwrap().push(created.clone());
        self.calls.lock().unwrap().push(CrmCall::Create(normalize_phone(&lead.phone)));
        Ok(created)
    }

    async fn update_lead(&self, id: &str, update: &LeadUpdate) -> Result<Lead, AppError> {
        self.check()?;
        let mut leads = self.leads.lock().unwrap();
        let lead = leads.iter_mut().find(|l| l.id == id)
            .ok_or(AppError::NotFound("lead".into()))?;
        lead.tags = update.tags.clone();
        lead.interests = update.interests.clone();
        lead.timeline = update.timeline.clone();
        self.calls.lock().unwrap().push(CrmCall::Update(id.to_string()));
        Ok(lead.clone())
    }

    async fn promote_lead_status(&self, id: &str, status: LeadStatus) -> Result<(), AppError> {
        self.check()?;
        let mut leads = self.leads.lock().unwrap();
        if let Some(lead) = leads.iter_mut().find(|l| l.id == id)
            && lead.status < status {
            lead.status = status;
        }
        self.calls.lock().unwrap().push(CrmCall::Promote(id.to_string(), status));
        Ok(())
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub channel: Arc<MockMessageChannel>,
    pub leads: Arc<InMemoryLeadStore>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let pool = connect_sqlite(&db_url).await.expect("Failed to open test db");

        let config = Config {
            database_url: db_url,
            port: 0,
            timezone: chrono_tz::UTC,
            message_service_url: "http://localhost".to_string(),
            message_service_token: "token".to_string(),
            crm_service_url: "http://localhost".to_string(),
            crm_service_token: "token".to_string(),
            reminder_lead_hours: 24,
            job_max_attempts: 3,
            sync_timeout_secs: 1,
            pipeline_sweep_secs: 300,
        };

        let channel = Arc::new(MockMessageChannel::default());
        let leads = Arc::new(InMemoryLeadStore::default());

        let state = Arc::new(
            AppState::new(config, sqlite_repositories(pool.clone()), channel.clone(), leads.clone())
                .expect("Failed to build state"),
        );
        let router = create_router(state.clone());

        Self { router, pool, db_filename, state, channel, leads }
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.send("POST", uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Response {
        self.send("PUT", uri, Some(body)).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send("GET", uri, None).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.send("DELETE", uri, None).await
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Creates a weekly template and returns its JSON.
    pub async fn weekly_template(&self, title: &str, weekdays: &[u8], time: &str, capacity: i32) -> Value {
        let res = self.post("/api/v1/templates", json!({
            "title": title,
            "duration_min": 90,
            "recurrence": { "type": "weekly", "weekdays": weekdays, "time": time },
            "capacity_per_slot": capacity,
            "target_audience": "ages 8-12"
        })).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        parse_body(res).await
    }

    pub async fn one_time_template(&self, title: &str, date: NaiveDate, time: &str, capacity: i32) -> Value {
        let res = self.post("/api/v1/templates", json!({
            "title": title,
            "duration_min": 60,
            "recurrence": { "type": "one-time", "date": date.format("%Y-%m-%d").to_string(), "time": time },
            "capacity_per_slot": capacity
        })).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        parse_body(res).await
    }

    /// Staff reservation; returns the raw response.
    pub async fn book(&self, template_id: &str, date: NaiveDate, time: &str, name: &str, phone: &str) -> Response {
        self.post("/api/v1/bookings", json!({
            "template_id": template_id,
            "date": date.format("%Y-%m-%d").to_string(),
            "time": time,
            "attendee_name": name,
            "guardian_name": format!("{} Parent", name),
            "phone": phone
        })).await
    }

    pub async fn transition(&self, booking_id: &str, event: &str) -> Response {
        self.post(&format!("/api/v1/bookings/{}/transitions", booking_id), json!({ "event": event })).await
    }

    pub async fn run_jobs(&self) -> usize {
        run_due_jobs(&self.state, 50).await
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.channel.sent.lock().unwrap().clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

#[allow(dead_code)]
pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// First `weekday` strictly after today plus `min_days_ahead`.
#[allow(dead_code)]
pub fn upcoming(weekday: Weekday, min_days_ahead: i64) -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(min_days_ahead.max(1));
    while date.weekday() != weekday {
        date += Duration::days(1);
    }
    date
}
