use crate::domain::models::slot::VirtualSlot;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Serialize)]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: VirtualSlot,
    pub remaining: i64,
}

impl From<VirtualSlot> for SlotView {
    fn from(slot: VirtualSlot) -> Self {
        Self { remaining: slot.remaining(), slot }
    }
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub from: NaiveDate,
    pub days: u32,
    pub slots: Vec<SlotView>,
}
