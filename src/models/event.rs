//! Anomaly event model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Auxiliary context attached to an event (source/destination, protocol, ...).
/// Opaque to the pipeline.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Classification outcome. Serialized as `0` / `1` on every wire surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Normal = 0,
    Anomaly = 1,
}

impl Label {
    pub fn is_anomaly(self) -> bool {
        self == Label::Anomaly
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label as u8
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Normal),
            1 => Ok(Label::Anomaly),
            other => Err(format!("label must be 0 or 1, got {}", other)),
        }
    }
}

impl TryFrom<i16> for Label {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| format!("label must be 0 or 1, got {}", value))
            .and_then(Label::try_from)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Normal => write!(f, "normal"),
            Label::Anomaly => write!(f, "anomaly"),
        }
    }
}

/// One classified observation. Immutable once the store hands it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub label: Label,
    pub score: Option<f64>,
    pub features: Vec<f64>,
    pub meta: Option<Meta>,
}

/// Everything the store needs to append an event. `id` and `timestamp`
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub label: Label,
    pub score: Option<f64>,
    pub features: Vec<f64>,
    pub meta: Option<Meta>,
}

/// Live notification payload (`features` are not pushed to subscribers).
#[derive(Debug, Clone, Serialize)]
pub struct EventNotice<'a> {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub label: Label,
    pub score: Option<f64>,
    pub meta: Option<&'a Meta>,
}

impl<'a> From<&'a AnomalyEvent> for EventNotice<'a> {
    fn from(event: &'a AnomalyEvent) -> Self {
        Self {
            id: event.id,
            timestamp: event.timestamp,
            label: event.label,
            score: event.score,
            meta: event.meta.as_ref(),
        }
    }
}

/// Maximum number of rows a single query may return.
pub const MAX_QUERY_LIMIT: i64 = 1000;

/// Range/label/score filter for `EventStore::query`.
///
/// Bounds on `timestamp` are inclusive. When `min_score` is set, events
/// without a score are excluded.
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub from_time: Option<DateTime<Utc>>,
    pub to_time: Option<DateTime<Utc>>,
    pub min_score: Option<f64>,
    pub label: Option<Label>,
    pub limit: i64,
}

impl EventFilter {
    pub fn with_limit(limit: i64) -> Self {
        Self {
            from_time: None,
            to_time: None,
            min_score: None,
            label: None,
            limit,
        }
    }

    pub fn matches(&self, event: &AnomalyEvent) -> bool {
        if let Some(from) = self.from_time {
            if event.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to_time {
            if event.timestamp > to {
                return false;
            }
        }
        if let Some(min) = self.min_score {
            match event.score {
                Some(score) if score >= min => {}
                _ => return false,
            }
        }
        if let Some(label) = self.label {
            if event.label != label {
                return false;
            }
        }
        true
    }

    /// Limit clamped into `1..=MAX_QUERY_LIMIT`.
    pub fn effective_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_QUERY_LIMIT)
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::with_limit(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(score: Option<f64>, label: Label) -> AnomalyEvent {
        AnomalyEvent {
            id: 1,
            timestamp: Utc::now(),
            label,
            score,
            features: vec![0.0; 3],
            meta: None,
        }
    }

    #[test]
    fn test_label_wire_format() {
        assert_eq!(serde_json::to_value(Label::Anomaly).unwrap(), json!(1));
        assert_eq!(serde_json::from_value::<Label>(json!(0)).unwrap(), Label::Normal);
        assert!(serde_json::from_value::<Label>(json!(2)).is_err());
        assert!(Label::try_from(-1i16).is_err());
    }

    #[test]
    fn test_min_score_excludes_null_scores() {
        let filter = EventFilter {
            min_score: Some(0.5),
            ..EventFilter::default()
        };
        assert!(!filter.matches(&event(None, Label::Anomaly)));
        assert!(!filter.matches(&event(Some(0.49), Label::Anomaly)));
        assert!(filter.matches(&event(Some(0.5), Label::Normal)));
    }

    #[test]
    fn test_time_bounds_are_inclusive() {
        let ev = event(None, Label::Normal);
        let filter = EventFilter {
            from_time: Some(ev.timestamp),
            to_time: Some(ev.timestamp),
            ..EventFilter::default()
        };
        assert!(filter.matches(&ev));
    }

    #[test]
    fn test_notice_omits_features() {
        let mut ev = event(Some(0.73), Label::Anomaly);
        let mut meta = Meta::new();
        meta.insert("source_ip".into(), json!("10.0.0.1"));
        ev.meta = Some(meta);

        let value = serde_json::to_value(EventNotice::from(&ev)).unwrap();
        assert!(value.get("features").is_none());
        assert_eq!(value["label"], json!(1));
        assert_eq!(value["meta"]["source_ip"], json!("10.0.0.1"));
    }
}
