use std::time::Duration;
use crate::domain::models::lead::{Lead, LeadMatch, LeadStatus, LeadUpdate, NewLead};
use crate::domain::services::pipeline::normalize_phone;
use crate::domain::ports::LeadStore;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

/// REST client for the CRM lead store.
///
/// Every failure, including timeouts and 5xx answers, surfaces as
/// `SyncDeferred` so the caller can retry later.
pub struct HttpLeadStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpLeadStore {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalWithMsg(format!("Failed to build CRM client: {}", e)))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, AppError> {
        let res = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("CRM connection error: {}", e);
                error!("{}", msg);
                AppError::SyncDeferred(msg)
            })?;
        Ok(res)
    }

    async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, AppError> {
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let msg = format!("CRM request failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::SyncDeferred(msg));
        }
        res.json::<T>().await
            .map_err(|e| AppError::SyncDeferred(format!("CRM returned an unreadable body: {}", e)))
    }
}

#[derive(Serialize)]
struct StatusBody {
    status: LeadStatus,
}

#[async_trait]
impl LeadStore for HttpLeadStore {
    async fn find_lead_by_phone(&self, phone: &str) -> Result<LeadMatch, AppError> {
        let res = self.send(self.client.get(self.url("/leads")).query(&[("phone", phone)])).await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(LeadMatch::None);
        }
        let leads: Vec<Lead> = Self::read_json(res).await?;
        debug!("CRM returned {} leads for phone lookup", leads.len());
        // The CRM search is fuzzy; keep exact digit matches only.
        let exact = leads.into_iter().filter(|l| normalize_phone(&l.phone) == phone).collect();
        Ok(LeadMatch::from_candidates(exact))
    }

    async fn list_leads_by_status(&self, statuses: &[LeadStatus]) -> Result<Vec<Lead>, AppError> {
        let wanted = statuses
            .iter()
            .filter_map(|s| serde_json::to_value(s).ok())
            .filter_map(|v| v.as_str().map(String::from))
            .collect::<Vec<_>>()
            .join(",");
        let res = self.send(self.client.get(self.url("/leads")).query(&[("status", wanted)])).await?;
        Self::read_json(res).await
    }

    async fn create_lead(&self, lead: &NewLead) -> Result<Lead, AppError> {
        let res = self.send(self.client.post(self.url("/leads")).json(lead)).await?;
        Self::read_json(res).await
    }

    async fn update_lead(&self, id: &str, update: &LeadUpdate) -> Result<Lead, AppError> {
        let res = self.send(self.client.patch(self.url(&format!("/leads/{}", id))).json(update)).await?;
        Self::read_json(res).await
    }

    async fn promote_lead_status(&self, id: &str, status: LeadStatus) -> Result<(), AppError> {
        let res = self.send(
            self.client.post(self.url(&format!("/leads/{}/promote", id))).json(&StatusBody { status })
        ).await?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let msg = format!("CRM promote failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::SyncDeferred(msg));
        }
        Ok(())
    }
}
