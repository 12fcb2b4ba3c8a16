use serde::{Deserialize, Serialize};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use rand::{distributions::Alphanumeric, Rng};
use crate::error::AppError;

/// Set of weekdays as a bitmask, bit 0 = Sunday ... bit 6 = Saturday.
/// Never empty once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn contains(&self, date: NaiveDate) -> bool {
        let idx = date.weekday().num_days_from_sunday();
        self.0 & (1 << idx) != 0
    }

    pub fn indices(&self) -> Vec<u8> {
        (0..7u8).filter(|i| self.0 & (1 << i) != 0).collect()
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = String;

    fn try_from(days: Vec<u8>) -> Result<Self, Self::Error> {
        let mut mask = 0u8;
        for day in days {
            if day > 6 {
                return Err(format!("weekday index {} outside 0-6", day));
            }
            mask |= 1 << day;
        }
        if mask == 0 {
            return Err("weekly recurrence needs at least one weekday".to_string());
        }
        Ok(Self(mask))
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.indices()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    OneTime { date: NaiveDate, time: NaiveTime },
    Weekly { weekdays: WeekdaySet, time: NaiveTime },
}

impl Recurrence {
    pub fn time(&self) -> NaiveTime {
        match self {
            Recurrence::OneTime { time, .. } | Recurrence::Weekly { time, .. } => *time,
        }
    }

    /// Builds a rule from the loosely typed form staff submit. Only the branch
    /// selected by `recurrence_type` is looked at.
    pub fn parse(
        recurrence_type: &str,
        weekdays: Option<Vec<u8>>,
        date: Option<&str>,
        time: &str,
    ) -> Result<Self, AppError> {
        let time = parse_time_of_day(time)?;
        match recurrence_type {
            "one-time" | "one_time" => {
                let date = date.ok_or(AppError::Validation("recurrence.date is required for one-time workshops".into()))?;
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .map_err(|_| AppError::Validation("recurrence.date must be YYYY-MM-DD".into()))?;
                Ok(Recurrence::OneTime { date, time })
            }
            "weekly" => {
                let days = weekdays.unwrap_or_default();
                let weekdays = WeekdaySet::try_from(days)
                    .map_err(|e| AppError::Validation(format!("recurrence.weekdays: {}", e)))?;
                Ok(Recurrence::Weekly { weekdays, time })
            }
            other => Err(AppError::Validation(format!("Unknown recurrence type '{}'", other))),
        }
    }
}

/// Accepts `HH:MM` in 00:00-23:59.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| AppError::Validation(format!("Invalid time '{}' (expected HH:MM, 00:00-23:59)", raw)))
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct WorkshopTemplate {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub duration_min: i32,
    #[sqlx(json)]
    pub recurrence: Recurrence,
    pub capacity_per_slot: i32,
    pub is_active: bool,
    pub target_audience: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewTemplateParams {
    pub title: String,
    pub description: String,
    pub duration_min: i32,
    pub recurrence: Recurrence,
    pub capacity_per_slot: i32,
    pub is_active: bool,
    pub target_audience: String,
}

impl WorkshopTemplate {
    pub fn new(params: NewTemplateParams) -> Result<Self, AppError> {
        let template = Self {
            id: Uuid::new_v4().to_string(),
            slug: public_slug(&params.title),
            title: params.title,
            description: params.description,
            duration_min: params.duration_min,
            recurrence: params.recurrence,
            capacity_per_slot: params.capacity_per_slot,
            is_active: params.is_active,
            target_audience: params.target_audience,
            created_at: Utc::now(),
        };
        template.validate()?;
        Ok(template)
    }

    /// Save-time checks. Expansion assumes a template that passed these.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        if self.duration_min <= 0 {
            return Err(AppError::Validation("duration_min must be greater than 0".into()));
        }
        if self.capacity_per_slot < 1 {
            return Err(AppError::Validation("capacity_per_slot must be at least 1".into()));
        }
        let start = self.recurrence.time();
        let start_min = (start.hour() * 60 + start.minute()) as i32;
        if start_min + self.duration_min > 24 * 60 {
            return Err(AppError::Validation("workshop must end on the day it starts".into()));
        }
        Ok(())
    }

    pub fn end_time(&self, start: NaiveTime) -> NaiveTime {
        start + chrono::Duration::minutes(self.duration_min as i64)
    }
}

fn public_slug(title: &str) -> String {
    let mut base = String::new();
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            base.push(c);
        } else if !base.is_empty() && !base.ends_with('-') {
            base.push('-');
        }
    }
    let base = base.trim_end_matches('-');

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();

    if base.is_empty() {
        suffix
    } else {
        format!("{}-{}", base, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(recurrence: Recurrence, duration_min: i32) -> NewTemplateParams {
        NewTemplateParams {
            title: "Lego Robotics: Intro!".into(),
            description: String::new(),
            duration_min,
            recurrence,
            capacity_per_slot: 10,
            is_active: true,
            target_audience: "kids".into(),
        }
    }

    #[test]
    fn weekly_rule_rejects_empty_day_set() {
        let err = Recurrence::parse("weekly", Some(vec![]), None, "16:00").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn weekly_rule_rejects_out_of_range_day() {
        assert!(Recurrence::parse("weekly", Some(vec![2, 7]), None, "16:00").is_err());
    }

    #[test]
    fn time_outside_day_is_rejected() {
        assert!(Recurrence::parse("weekly", Some(vec![2]), None, "24:00").is_err());
        assert!(Recurrence::parse("weekly", Some(vec![2]), None, "16:60").is_err());
        assert!(Recurrence::parse("weekly", Some(vec![2]), None, "4pm").is_err());
    }

    #[test]
    fn one_time_ignores_weekday_branch() {
        let rule = Recurrence::parse("one-time", Some(vec![]), Some("2026-11-03"), "10:30").unwrap();
        assert_eq!(
            rule,
            Recurrence::OneTime {
                date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
                time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            }
        );
    }

    #[test]
    fn weekly_ignores_date_branch() {
        let rule = Recurrence::parse("weekly", Some(vec![4, 2]), Some("garbage"), "16:00").unwrap();
        match rule {
            Recurrence::Weekly { weekdays, .. } => assert_eq!(weekdays.indices(), vec![2, 4]),
            _ => panic!("expected weekly rule"),
        }
    }

    #[test]
    fn weekday_set_round_trips_through_json() {
        let rule = Recurrence::parse("weekly", Some(vec![2, 4]), None, "16:00").unwrap();
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"weekdays\":[2,4]"));
        let back: Recurrence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);

        let bad = r#"{"type":"weekly","weekdays":[],"time":"16:00:00"}"#;
        assert!(serde_json::from_str::<Recurrence>(bad).is_err());
    }

    #[test]
    fn template_validation() {
        let rule = Recurrence::parse("weekly", Some(vec![2]), None, "16:00").unwrap();
        assert!(WorkshopTemplate::new(params(rule.clone(), 0)).is_err());
        assert!(WorkshopTemplate::new(params(rule.clone(), 90)).is_ok());

        let late = Recurrence::parse("weekly", Some(vec![2]), None, "23:30").unwrap();
        assert!(WorkshopTemplate::new(params(late, 60)).is_err());
    }

    #[test]
    fn slug_is_derived_from_title() {
        let rule = Recurrence::parse("weekly", Some(vec![2]), None, "16:00").unwrap();
        let t = WorkshopTemplate::new(params(rule, 60)).unwrap();
        assert!(t.slug.starts_with("lego-robotics-intro-"), "{}", t.slug);
        assert_eq!(t.slug.len(), "lego-robotics-intro-".len() + 6);
    }
}
