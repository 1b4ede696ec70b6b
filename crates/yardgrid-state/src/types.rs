//! Domain types for the yard.
//!
//! `ContainerRecord` is what ingestion hands to the core; `Container` is
//! the validated entity the yard stores. Dates are calendar days; a date
//! that is absent or fails to parse is "unknown", never an error.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{YardError, YardResult};

/// Unique, stable identifier of a container.
pub type ContainerId = String;

/// Date format used by container records.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Records ───────────────────────────────────────────────────────

/// A container as received from ingestion or the command surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: ContainerId,
    pub weight: f64,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub arrival_date: Option<String>,
    #[serde(default)]
    pub departure_date: Option<String>,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub refrigerated: bool,
    #[serde(default)]
    pub priority: i32,
}

/// Amendment of an existing container's descriptive fields.
///
/// Absent fields are left untouched. Applying an update never moves
/// the container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerUpdate {
    pub weight: Option<f64>,
    pub destination: Option<String>,
    pub arrival_date: Option<String>,
    pub departure_date: Option<String>,
}

/// A resident container handed over by the persistence layer at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentRecord {
    #[serde(flatten)]
    pub record: ContainerRecord,
    #[serde(default)]
    pub position: Option<yard_core::Position>,
}

// ── Container ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    /// Weight in kg, always finite and positive.
    pub weight: f64,
    pub destination: String,
    pub arrival_date: Option<NaiveDate>,
    pub departure_date: Option<NaiveDate>,
    pub content_type: String,
    pub refrigerated: bool,
    /// Higher is more urgent.
    pub priority: i32,
    /// Unix timestamp (seconds) of the last placement or move.
    pub last_moved: Option<u64>,
}

impl Container {
    /// Validate a record into a container.
    pub fn from_record(record: ContainerRecord) -> YardResult<Self> {
        validate_weight(&record.id, record.weight)?;
        Ok(Self {
            arrival_date: parse_date(record.arrival_date.as_deref()),
            departure_date: parse_date(record.departure_date.as_deref()),
            id: record.id,
            weight: record.weight,
            destination: record.destination,
            content_type: record.content_type,
            refrigerated: record.refrigerated,
            priority: record.priority,
            last_moved: None,
        })
    }

    /// Apply an amendment, validating the new weight first.
    pub fn amend(&mut self, update: &ContainerUpdate) -> YardResult<()> {
        if let Some(weight) = update.weight {
            validate_weight(&self.id, weight)?;
            self.weight = weight;
        }
        if let Some(destination) = &update.destination {
            self.destination = destination.clone();
        }
        if let Some(arrival) = &update.arrival_date {
            self.arrival_date = parse_date(Some(arrival));
        }
        if let Some(departure) = &update.departure_date {
            self.departure_date = parse_date(Some(departure));
        }
        Ok(())
    }

    /// Whole days until departure, floored at zero.
    ///
    /// `None` when the departure date is unknown.
    pub fn days_until_departure(&self, today: NaiveDate) -> Option<u32> {
        let departure = self.departure_date?;
        let days = (departure - today).num_days().max(0);
        Some(u32::try_from(days).unwrap_or(u32::MAX))
    }

    /// The departure date has passed while the container is still resident.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.departure_date.is_some_and(|d| d < today)
    }

    /// Whole days since arrival, zero when unknown or in the future.
    pub fn days_in_storage(&self, today: NaiveDate) -> u32 {
        self.arrival_date
            .map(|a| (today - a).num_days().max(0))
            .map(|d| u32::try_from(d).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }

    pub fn storage_cost(&self, today: NaiveDate, rate_per_day: f64) -> f64 {
        f64::from(self.days_in_storage(today)) * rate_per_day
    }
}

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
}

fn validate_weight(id: &str, weight: f64) -> YardResult<()> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(YardError::InvalidWeight {
            id: id.to_string(),
            weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn record(id: &str, weight: f64) -> ContainerRecord {
        ContainerRecord {
            id: id.to_string(),
            weight,
            destination: "Port A".to_string(),
            arrival_date: Some("2023-05-01".to_string()),
            departure_date: Some("2023-05-10".to_string()),
            content_type: "general".to_string(),
            refrigerated: false,
            priority: 0,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn from_record_parses_dates() {
        let c = Container::from_record(record("CONT001", 1000.0)).unwrap();
        assert_eq!(c.id, "CONT001");
        assert_eq!(c.weight, 1000.0);
        assert_eq!(c.destination, "Port A");
        assert_eq!(c.arrival_date, Some(date("2023-05-01")));
        assert_eq!(c.departure_date, Some(date("2023-05-10")));
        assert_eq!(c.last_moved, None);
    }

    #[test]
    fn unparseable_dates_become_unknown() {
        let mut r = record("C", 10.0);
        r.arrival_date = Some("yesterday".to_string());
        r.departure_date = None;
        let c = Container::from_record(r).unwrap();
        assert_eq!(c.arrival_date, None);
        assert_eq!(c.departure_date, None);
        assert_eq!(c.days_until_departure(date("2023-05-01")), None);
        assert!(!c.is_overdue(date("2030-01-01")));
    }

    #[test]
    fn rejects_non_positive_weight() {
        for w in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = Container::from_record(record("BAD", w)).unwrap_err();
            assert!(matches!(err, YardError::InvalidWeight { .. }));
        }
    }

    #[test]
    fn days_until_departure_relative_to_today() {
        let today = date("2024-03-01");
        let mut c = Container::from_record(record("C", 10.0)).unwrap();
        c.departure_date = today.checked_add_days(Days::new(5));
        assert_eq!(c.days_until_departure(today), Some(5));
        assert!(!c.is_overdue(today));
    }

    #[test]
    fn overdue_floors_days_at_zero() {
        let today = date("2024-03-01");
        let mut c = Container::from_record(record("C", 10.0)).unwrap();
        c.departure_date = today.checked_sub_days(Days::new(1));
        assert!(c.is_overdue(today));
        assert_eq!(c.days_until_departure(today), Some(0));
    }

    #[test]
    fn departing_today_is_not_overdue() {
        let today = date("2024-03-01");
        let mut c = Container::from_record(record("C", 10.0)).unwrap();
        c.departure_date = Some(today);
        assert!(!c.is_overdue(today));
        assert_eq!(c.days_until_departure(today), Some(0));
    }

    #[test]
    fn storage_cost_counts_days_since_arrival() {
        let c = Container::from_record(record("C", 10.0)).unwrap();
        assert_eq!(c.days_in_storage(date("2023-05-11")), 10);
        assert_eq!(c.storage_cost(date("2023-05-11"), 2.5), 25.0);
        assert_eq!(c.days_in_storage(date("2023-04-01")), 0);
    }

    #[test]
    fn amend_updates_fields_and_validates() {
        let mut c = Container::from_record(record("C", 10.0)).unwrap();
        let update = ContainerUpdate {
            weight: Some(20.0),
            destination: Some("Port B".to_string()),
            departure_date: Some("not a date".to_string()),
            ..Default::default()
        };
        c.amend(&update).unwrap();
        assert_eq!(c.weight, 20.0);
        assert_eq!(c.destination, "Port B");
        assert_eq!(c.departure_date, None);
        assert_eq!(c.arrival_date, Some(date("2023-05-01")));

        let bad = ContainerUpdate {
            weight: Some(-1.0),
            destination: Some("Port C".to_string()),
            ..Default::default()
        };
        assert!(c.amend(&bad).is_err());
        assert_eq!(c.weight, 20.0);
        assert_eq!(c.destination, "Port B");
    }

    #[test]
    fn resident_record_flattens() {
        let json = r#"{"id":"C1","weight":1000.0,"position":{"x":1,"y":2,"z":0}}"#;
        let resident: ResidentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(resident.record.id, "C1");
        assert_eq!(resident.record.destination, "");
        assert_eq!(resident.position, Some(yard_core::Position::new(1, 2, 0)));
    }
}
