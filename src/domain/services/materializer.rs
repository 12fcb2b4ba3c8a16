use chrono::{Duration, NaiveDate, NaiveTime};
use std::collections::HashMap;
use crate::domain::models::slot::{VirtualSlot, WorkshopSlot};
use crate::domain::models::template::{Recurrence, WorkshopTemplate};

/// One (date, time) produced by a template's rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

/// Half-open day window `[from, from + days)`.
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub days: u32,
}

impl DateWindow {
    pub fn new(from: NaiveDate, days: u32) -> Self {
        Self { from, days }
    }

    pub fn end(&self) -> NaiveDate {
        self.from + Duration::days(self.days as i64)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date < self.end()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.days).map(move |offset| self.from + Duration::days(offset as i64))
    }
}

pub fn expand_occurrences(recurrence: &Recurrence, window: DateWindow) -> Vec<Occurrence> {
    match recurrence {
        Recurrence::OneTime { date, time } => {
            if window.contains(*date) {
                vec![Occurrence { date: *date, start_time: *time }]
            } else {
                Vec::new()
            }
        }
        Recurrence::Weekly { weekdays, time } => window
            .dates()
            .filter(|d| weekdays.contains(*d))
            .map(|date| Occurrence { date, start_time: *time })
            .collect(),
    }
}

pub fn is_occurrence(recurrence: &Recurrence, date: NaiveDate, start_time: NaiveTime) -> bool {
    if recurrence.time() != start_time {
        return false;
    }
    match recurrence {
        Recurrence::OneTime { date: d, .. } => *d == date,
        Recurrence::Weekly { weekdays, .. } => weekdays.contains(date),
    }
}

/// Merges rule occurrences of the given templates with persisted slots.
///
/// Persisted slots win: their capacity and id are used and cancelled ones hide
/// the occurrence. Occurrences without a slot get template defaults and a zero
/// count. `occupancy` maps slot id to its live booking count. Output is sorted
/// by (date, start_time).
pub fn merge_virtual_slots(
    templates: &[WorkshopTemplate],
    persisted: &[WorkshopSlot],
    occupancy: &HashMap<String, i64>,
    window: DateWindow,
) -> Vec<VirtualSlot> {
    let by_identity: HashMap<(&str, NaiveDate, NaiveTime), &WorkshopSlot> = persisted
        .iter()
        .map(|s| ((s.workshop_template_id.as_str(), s.date, s.start_time), s))
        .collect();

    let mut slots = Vec::new();
    for template in templates {
        for occ in expand_occurrences(&template.recurrence, window) {
            match by_identity.get(&(template.id.as_str(), occ.date, occ.start_time)) {
                Some(slot) if slot.is_cancelled() => {}
                Some(slot) => slots.push(VirtualSlot {
                    template_id: template.id.clone(),
                    template_title: template.title.clone(),
                    date: slot.date,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    capacity: slot.capacity,
                    booked_count: occupancy.get(&slot.id).copied().unwrap_or(0),
                    slot_id: Some(slot.id.clone()),
                }),
                None => slots.push(VirtualSlot {
                    template_id: template.id.clone(),
                    template_title: template.title.clone(),
                    date: occ.date,
                    start_time: occ.start_time,
                    end_time: template.end_time(occ.start_time),
                    capacity: template.capacity_per_slot,
                    booked_count: 0,
                    slot_id: None,
                }),
            }
        }
    }

    slots.sort_by(|a, b| {
        (a.date, a.start_time, &a.template_title).cmp(&(b.date, b.start_time, &b.template_title))
    });
    slots
}
