use std::collections::HashMap;
use std::sync::Arc;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use crate::domain::models::booking::Booking;
use crate::domain::models::lead::{Lead, LeadFields, LeadMatch, LeadStatus, LeadUpdate, NewLead, TimelineEntry};
use crate::domain::ports::{BookingRepository, LeadStore};
use crate::error::AppError;

/// Shortest digit string accepted as a contact key.
pub const MIN_PHONE_DIGITS: usize = 7;

/// Strips everything but ASCII digits. This is the only place phone numbers
/// are made comparable.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalized key, or `None` when too short to identify a contact.
pub fn phone_key(raw: &str) -> Option<String> {
    let digits = normalize_phone(raw);
    (digits.len() >= MIN_PHONE_DIGITS).then_some(digits)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub promoted: usize,
    pub ambiguous: usize,
}

/// Best-effort bridge from booking activity into the external lead store.
pub struct PipelineService {
    leads: Arc<dyn LeadStore>,
    bookings: Arc<dyn BookingRepository>,
}

impl PipelineService {
    pub fn new(leads: Arc<dyn LeadStore>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { leads, bookings }
    }

    /// Looks up the lead for a phone, accepting only an exact digit match.
    async fn matching_lead(&self, phone: &str) -> Result<LeadMatch, AppError> {
        let Some(key) = phone_key(phone) else {
            return Ok(LeadMatch::None);
        };
        Ok(match self.leads.find_lead_by_phone(&key).await? {
            LeadMatch::One(lead) if normalize_phone(&lead.phone) != key => LeadMatch::None,
            other => other,
        })
    }

    /// Advances an early-funnel lead to `workshop_booked` when its contact books.
    pub async fn promote_for_booking(&self, booking: &Booking) -> Result<bool, AppError> {
        let lead = match self.matching_lead(&booking.phone).await? {
            LeadMatch::One(lead) => lead,
            LeadMatch::None => return Ok(false),
            LeadMatch::Ambiguous(n) => {
                warn!("Booking {} matches {} leads by phone; not promoting", booking.id, n);
                return Ok(false);
            }
        };
        if !lead.status.is_early_funnel() {
            return Ok(false);
        }
        self.leads.promote_lead_status(&lead.id, LeadStatus::WorkshopBooked).await?;
        info!("Lead {} promoted to workshop_booked by booking {}", lead.id, booking.id);
        Ok(true)
    }

    /// Creates the lead for a converted booking, or merges into the existing one.
    /// Safe to repeat: tags and interests are unions and the timeline entry is
    /// keyed by booking id. Returns `None` when the phone matches several leads;
    /// those are left for staff to merge by hand.
    pub async fn convert(&self, booking: &Booking, fields: &LeadFields) -> Result<Option<Lead>, AppError> {
        let entry = TimelineEntry {
            at: Utc::now(),
            kind: "workshop_converted".to_string(),
            note: conversion_note(booking, fields),
            booking_id: Some(booking.id.clone()),
        };
        let mut interests = fields.interests.clone();
        if let Some(program) = &fields.program {
            interests.push(program.clone());
        }

        match self.matching_lead(&booking.phone).await? {
            LeadMatch::Ambiguous(n) => {
                warn!("Converted booking {} matches {} leads by phone; CRM left untouched", booking.id, n);
                Ok(None)
            }
            LeadMatch::One(lead) => {
                let update = LeadUpdate {
                    tags: union(&lead.tags, &fields.tags),
                    interests: union(&lead.interests, &interests),
                    timeline: append_once(&lead.timeline, entry),
                };
                let updated = self.leads.update_lead(&lead.id, &update).await?;
                self.leads.promote_lead_status(&lead.id, LeadStatus::WorkshopBooked).await?;
                info!("Lead {} updated from converted booking {}", lead.id, booking.id);
                Ok(Some(updated))
            }
            LeadMatch::None => {
                let new_lead = NewLead {
                    phone: booking.phone.clone(),
                    name: booking.guardian_name.clone(),
                    status: LeadStatus::WorkshopBooked,
                    tags: union(&[], &fields.tags),
                    interests: union(&[], &interests),
                    timeline: vec![entry],
                };
                let created = self.leads.create_lead(&new_lead).await?;
                info!("Lead {} created from converted booking {}", created.id, booking.id);
                Ok(Some(created))
            }
        }
    }

    /// Promotes every early-funnel lead whose phone has a live booking. Digit
    /// strings shared by several leads are skipped rather than merged.
    pub async fn sweep(&self) -> Result<SweepReport, AppError> {
        let leads = self.leads.list_leads_by_status(&LeadStatus::EARLY_FUNNEL).await?;
        let mut report = SweepReport { examined: leads.len(), ..Default::default() };

        let mut by_key: HashMap<String, Vec<&Lead>> = HashMap::new();
        for lead in leads.iter().filter(|l| l.status.is_early_funnel()) {
            if let Some(key) = phone_key(&lead.phone) {
                by_key.entry(key).or_default().push(lead);
            }
        }

        for (key, group) in by_key {
            if group.len() > 1 {
                warn!("Skipping {} leads sharing phone digits {}", group.len(), key);
                report.ambiguous += group.len();
                continue;
            }
            let bookings = self.bookings.list_by_phone_digits(&key).await?;
            if bookings.iter().any(|b| b.status.occupies_seat()) {
                self.leads.promote_lead_status(&group[0].id, LeadStatus::WorkshopBooked).await?;
                report.promoted += 1;
            }
        }

        info!("Pipeline sweep: {:?}", report);
        Ok(report)
    }
}

fn conversion_note(booking: &Booking, fields: &LeadFields) -> String {
    let mut note = format!("Converted from workshop booking for {}", booking.attendee_name);
    if let Some(program) = &fields.program {
        note.push_str(&format!("; program: {}", program));
    }
    if let Some(extra) = &fields.note {
        note.push_str(&format!("; {}", extra));
    }
    note
}

fn union(existing: &[String], added: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(existing.len() + added.len());
    for item in existing.iter().chain(added) {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

fn append_once(timeline: &[TimelineEntry], entry: TimelineEntry) -> Vec<TimelineEntry> {
    let mut out = timeline.to_vec();
    let seen = entry.booking_id.is_some()
        && out.iter().any(|e| e.booking_id == entry.booking_id && e.kind == entry.kind);
    if !seen {
        out.push(entry);
    }
    out
}
