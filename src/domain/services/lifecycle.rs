use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::models::booking::BookingStatus;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    SendReminder,
    Reconfirm,
    Cancel,
    MarkAttended,
    MarkNoShow,
    RequestFeedback,
    Convert,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 7] = [
        LifecycleEvent::SendReminder,
        LifecycleEvent::Reconfirm,
        LifecycleEvent::Cancel,
        LifecycleEvent::MarkAttended,
        LifecycleEvent::MarkNoShow,
        LifecycleEvent::RequestFeedback,
        LifecycleEvent::Convert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::SendReminder => "send_reminder",
            LifecycleEvent::Reconfirm => "reconfirm",
            LifecycleEvent::Cancel => "cancel",
            LifecycleEvent::MarkAttended => "mark_attended",
            LifecycleEvent::MarkNoShow => "mark_no_show",
            LifecycleEvent::RequestFeedback => "request_feedback",
            LifecycleEvent::Convert => "convert",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a lifecycle event does to the stored booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Write the new status and run its side effects.
    Move(BookingStatus),
    /// Repeat of an already-applied idempotent event; nothing is written.
    Unchanged,
}

/// The booking lifecycle table. Every (status, event) pair is listed so a new
/// status or event fails to compile until it is placed in the table.
pub fn next_status(from: BookingStatus, event: LifecycleEvent) -> Result<Transition, AppError> {
    use BookingStatus as S;
    use LifecycleEvent as E;
    use Transition::{Move, Unchanged};

    let outcome = match (from, event) {
        (S::Confirmed, E::SendReminder) => Some(Move(S::ReminderSent)),
        (S::ReminderSent, E::SendReminder) => Some(Unchanged),

        (S::ReminderSent, E::Reconfirm) => Some(Move(S::Confirmed)),

        (S::Confirmed | S::ReminderSent, E::Cancel) => Some(Move(S::Cancelled)),
        (S::Confirmed | S::ReminderSent, E::MarkAttended) => Some(Move(S::Attended)),
        (S::Confirmed | S::ReminderSent, E::MarkNoShow) => Some(Move(S::NoShow)),

        (S::Attended, E::RequestFeedback) => Some(Move(S::FeedbackRequested)),

        (S::Attended | S::FeedbackRequested, E::Convert) => Some(Move(S::Converted)),
        (S::Converted, E::Convert) => Some(Unchanged),

        (S::Confirmed, E::Reconfirm | E::RequestFeedback | E::Convert) => None,
        (S::ReminderSent, E::RequestFeedback | E::Convert) => None,
        (S::Attended, E::SendReminder | E::Reconfirm | E::Cancel | E::MarkAttended | E::MarkNoShow) => None,
        (S::FeedbackRequested, E::SendReminder | E::Reconfirm | E::Cancel | E::MarkAttended | E::MarkNoShow | E::RequestFeedback) => None,
        (S::Converted, E::SendReminder | E::Reconfirm | E::Cancel | E::MarkAttended | E::MarkNoShow | E::RequestFeedback) => None,
        (S::Cancelled | S::NoShow, _) => None,
    };

    outcome.ok_or(AppError::InvalidTransition { from, event })
}
