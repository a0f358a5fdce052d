use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::services::reconciler::MergedEvent;

/// Inclusive date range for export filtering, matched against event start.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Prepare the finalized list handed to the export collaborator: cancelled
/// events excluded, optional range applied, sorted ascending by start. The
/// document/image rendering itself happens outside this service.
pub fn finalize_for_export(
    events: &[MergedEvent],
    range: Option<&DateRange>,
) -> Vec<MergedEvent> {
    let mut finalized: Vec<MergedEvent> = events
        .iter()
        .filter(|event| !event.cancelled)
        .filter(|event| {
            range.map_or(true, |r| event.start >= r.start && event.start <= r.end)
        })
        .cloned()
        .collect();

    finalized.sort_by(|a, b| a.start.cmp(&b.start));
    finalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(id: &str, day: u32, cancelled: bool) -> MergedEvent {
        MergedEvent {
            id: id.to_string(),
            title: format!("Event {}", id),
            start: Utc.with_ymd_and_hms(2099, 6, day, 18, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2099, 6, day, 21, 0, 0).unwrap(),
            description: String::new(),
            location: String::new(),
            chat_url: None,
            partiful_link: None,
            insta_handle: None,
            event_owner: None,
            owner_instagram: None,
            flyer_url: None,
            cancelled,
        }
    }

    #[test]
    fn export_is_sorted_and_skips_cancelled() {
        let events = vec![event("b", 20, false), event("a", 10, false), event("c", 15, true)];

        let finalized = finalize_for_export(&events, None);
        let ids: Vec<&str> = finalized.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn range_filter_is_inclusive_on_start() {
        let events = vec![event("a", 10, false), event("b", 20, false), event("c", 30, false)];
        let range = DateRange {
            start: Utc.with_ymd_and_hms(2099, 6, 10, 18, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2099, 6, 20, 18, 0, 0).unwrap(),
        };

        let finalized = finalize_for_export(&events, Some(&range));
        let ids: Vec<&str> = finalized.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
