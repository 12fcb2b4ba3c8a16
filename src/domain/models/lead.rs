use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Funnel position of a lead in the external CRM. Declaration order is the
/// funnel order, so `Ord` compares stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Interested,
    WorkshopBooked,
    Converted,
    Closed,
}

impl LeadStatus {
    pub const EARLY_FUNNEL: [LeadStatus; 3] = [LeadStatus::New, LeadStatus::Contacted, LeadStatus::Interested];

    pub fn is_early_funnel(&self) -> bool {
        Self::EARLY_FUNNEL.contains(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub kind: String,
    pub note: String,
    /// Booking that produced this entry; used to keep retried appends single.
    pub booking_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub phone: String,
    pub name: String,
    pub status: LeadStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

/// Result of looking a contact up by its digit string.
#[derive(Debug, Clone)]
pub enum LeadMatch {
    None,
    One(Lead),
    /// Several leads share the digits; none of them may be picked.
    Ambiguous(usize),
}

impl LeadMatch {
    /// Classifies the leads whose normalized phone equals the looked-up key.
    pub fn from_candidates(mut leads: Vec<Lead>) -> Self {
        match leads.len() {
            0 => LeadMatch::None,
            1 => leads.pop().map_or(LeadMatch::None, LeadMatch::One),
            n => LeadMatch::Ambiguous(n),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLead {
    pub phone: String,
    pub name: String,
    pub status: LeadStatus,
    pub tags: Vec<String>,
    pub interests: Vec<String>,
    pub timeline: Vec<TimelineEntry>,
}

/// Full replacement of the mutable CRM fields of an existing lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadUpdate {
    pub tags: Vec<String>,
    pub interests: Vec<String>,
    pub timeline: Vec<TimelineEntry>,
}

/// Staff-supplied fields carried by the `convert` transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadFields {
    pub program: Option<String>,
    pub tags: Vec<String>,
    pub interests: Vec<String>,
    pub note: Option<String>,
}
