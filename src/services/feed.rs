use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use icalendar::parser::{read_calendar, unfold};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};

use crate::config::FeedConfig;
use crate::error::{AppError, AppResult};

/// A single event as parsed from the external calendar feed. Immutable from
/// this system's perspective; the whole set is regenerated on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Stable UID from the feed, globally unique per calendar.
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: String,
    pub location: String,
}

/// Fetches and parses the external ICS feed.
///
/// The upstream calendar host does not reliably allow direct access, so
/// requests are routed through an ordered list of forwarding proxies, trying
/// each in turn and stopping at the first success.
pub struct FeedFetcher {
    client: reqwest::Client,
    calendar_url: String,
    proxies: Vec<String>,
}

impl FeedFetcher {
    pub fn new(config: &FeedConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}; using defaults", e);
                reqwest::Client::new()
            });

        Self {
            client,
            calendar_url: config.calendar_url.clone(),
            proxies: config.cors_proxies.clone(),
        }
    }

    /// Subscribe link for adding the feed to Google Calendar.
    pub fn add_to_calendar_url(&self) -> String {
        format!(
            "https://calendar.google.com/calendar/render?cid={}",
            urlencoding::encode(&self.calendar_url)
        )
    }

    /// Fetch the feed and return upcoming events sorted by start time.
    ///
    /// Never fails to the caller: network and parse errors are logged and
    /// surface as an empty list. Callers that need to distinguish "empty
    /// calendar" from "feed unreachable" must probe reachability separately.
    pub async fn fetch_events(&self) -> Vec<CalendarEvent> {
        let text = match self.fetch_raw().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to fetch calendar feed: {}", e);
                return Vec::new();
            }
        };

        match parse_feed(&text) {
            Ok(events) => upcoming_sorted(events, Utc::now()),
            Err(e) => {
                tracing::warn!("Failed to parse calendar feed: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_raw(&self) -> AppResult<String> {
        if self.proxies.is_empty() {
            return self.get_text(&self.calendar_url).await;
        }

        let mut last_error = None;
        for proxy in &self.proxies {
            let url = format!("{}{}", proxy, urlencoding::encode(&self.calendar_url));
            match self.get_text(&url).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!("Feed fetch via proxy {} failed: {}", proxy, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Feed("no forwarding proxies configured".to_string())))
    }

    async fn get_text(&self, url: &str) -> AppResult<String> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/calendar")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Feed(format!("HTTP status {}", response.status())));
        }

        Ok(response.text().await?)
    }
}

/// Parse VCALENDAR text into events. VEVENTs without a UID or a parseable
/// DTSTART are skipped rather than failing the whole feed.
pub fn parse_feed(content: &str) -> AppResult<Vec<CalendarEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| AppError::Feed(e.to_string()))?;

    let mut events = Vec::new();
    for vevent in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        let id = match vevent.find_prop("UID") {
            Some(prop) => prop.val.to_string(),
            None => {
                tracing::debug!("Skipping VEVENT without UID");
                continue;
            }
        };

        let start = match vevent
            .find_prop("DTSTART")
            .and_then(|p| DatePerhapsTime::try_from(p).ok())
            .and_then(to_utc)
        {
            Some(start) => start,
            None => {
                tracing::debug!("Skipping VEVENT {} without a parseable DTSTART", id);
                continue;
            }
        };

        // Some producers omit DTEND for zero-length events
        let end = vevent
            .find_prop("DTEND")
            .and_then(|p| DatePerhapsTime::try_from(p).ok())
            .and_then(to_utc)
            .unwrap_or(start);

        let title = vevent
            .find_prop("SUMMARY")
            .map(|p| p.val.to_string())
            .unwrap_or_else(|| "Untitled Event".to_string());
        let description = vevent
            .find_prop("DESCRIPTION")
            .map(|p| p.val.to_string())
            .unwrap_or_default();
        let location = vevent
            .find_prop("LOCATION")
            .map(|p| p.val.to_string())
            .unwrap_or_default();

        events.push(CalendarEvent {
            id,
            title,
            start,
            end,
            description,
            location,
        });
    }

    Ok(events)
}

/// Drop events that have already ended and sort the rest by start time.
pub fn upcoming_sorted(
    mut events: Vec<CalendarEvent>,
    now: DateTime<Utc>,
) -> Vec<CalendarEvent> {
    events.retain(|event| event.end >= now);
    events.sort_by(|a, b| a.start.cmp(&b.start));
    events
}

/// Convert an ICS date-or-datetime to UTC. All-day dates become midnight UTC;
/// floating times are treated as UTC; zoned times resolve through chrono-tz.
fn to_utc(value: DatePerhapsTime) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::Date(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive)),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            Some(Utc.from_utc_datetime(&naive))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => tzid
            .parse::<chrono_tz::Tz>()
            .ok()
            .and_then(|tz| tz.from_local_datetime(&date_time).earliest())
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE_FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:first@calendar\r\n\
SUMMARY:Drag Brunch\r\n\
DTSTART:20990301T180000Z\r\n\
DTEND:20990301T210000Z\r\n\
DESCRIPTION:Bottomless mimosas\r\n\
LOCATION:The Roof\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:second@calendar\r\n\
DTSTART:20990201T180000Z\r\n\
DTEND:20990201T200000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:No uid here\r\n\
DTSTART:20990401T180000Z\r\n\
DTEND:20990401T200000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn parses_vevents_and_skips_missing_uid() {
        let events = parse_feed(SAMPLE_FEED).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "first@calendar");
        assert_eq!(events[0].title, "Drag Brunch");
        assert_eq!(events[0].description, "Bottomless mimosas");
        assert_eq!(events[0].location, "The Roof");
        assert_eq!(
            events[0].start,
            Utc.with_ymd_and_hms(2099, 3, 1, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_summary_defaults_to_untitled() {
        let events = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(events[1].title, "Untitled Event");
        assert_eq!(events[1].description, "");
    }

    #[test]
    fn upcoming_filters_ended_events_and_sorts_by_start() {
        let events = parse_feed(SAMPLE_FEED).unwrap();

        // Cutoff after the February event has ended
        let now = Utc.with_ymd_and_hms(2099, 2, 15, 0, 0, 0).unwrap();
        let upcoming = upcoming_sorted(events.clone(), now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "first@calendar");

        // Before both: sorted ascending by start, February first
        let earlier = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        let both = upcoming_sorted(events, earlier);
        assert_eq!(both.len(), 2);
        assert_eq!(both[0].id, "second@calendar");
        assert_eq!(both[1].id, "first@calendar");
    }

    #[test]
    fn event_still_running_is_kept() {
        let events = parse_feed(SAMPLE_FEED).unwrap();
        // Mid-event: started but not ended
        let now = Utc.with_ymd_and_hms(2099, 3, 1, 19, 0, 0).unwrap();
        let upcoming = upcoming_sorted(events, now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "first@calendar");
    }

    #[test]
    fn all_day_dates_become_midnight_utc() {
        let feed = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:allday@calendar\r\n\
SUMMARY:Pride Picnic\r\n\
DTSTART;VALUE=DATE:20990615\r\n\
DTEND;VALUE=DATE:20990616\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(feed).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].start,
            Utc.with_ymd_and_hms(2099, 6, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            events[0].end,
            Utc.with_ymd_and_hms(2099, 6, 16, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn unparseable_feed_is_an_error() {
        assert!(parse_feed("this is not a calendar").is_err());
    }
}
