//! Scheduled advertisement model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::FromRow;

/// Upper bound on how many times one ad may be delivered
pub const MAX_AD_REPEATS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Ad {
    pub id: i64,
    pub image_handle: Option<String>,
    pub text: String,
    pub button_text: Option<String>,
    pub button_url: Option<String>,
    /// Next delivery time
    pub scheduled_at: DateTime<Utc>,
    pub repeat_count: i32,
    pub times_sent: i32,
    pub created_at: DateTime<Utc>,
}

impl Ad {
    pub fn deliveries_left(&self) -> i32 {
        (self.repeat_count - self.times_sent).max(0)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.deliveries_left() > 0 && self.scheduled_at <= now
    }

    pub fn button(&self) -> Option<(&str, &str)> {
        Some((self.button_text.as_deref()?, self.button_url.as_deref()?))
    }
}

/// Ad as entered by an admin, before it gets an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAd {
    pub image_handle: Option<String>,
    pub text: String,
    pub button_text: Option<String>,
    pub button_url: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub repeat_count: u32,
}

impl NewAd {
    /// Parse `when | repeats | button text | button url | text`.
    ///
    /// `when` is `now`, `YYYY-MM-DD HH:MM` (UTC) or RFC 3339. The button
    /// segments may both be left empty. Everything after the fourth `|`
    /// is the ad text.
    pub fn parse_pipe_separated(args: &str, image_handle: Option<String>, now: DateTime<Utc>) -> Option<Self> {
        let mut parts = args.splitn(5, '|').map(str::trim);

        let scheduled_at = parse_schedule(parts.next()?, now)?;
        let repeat_count = parts.next()?.parse::<u32>().ok()?;
        let button_text = parts.next().filter(|p| !p.is_empty()).map(str::to_string);
        let button_url = parts.next().filter(|p| !p.is_empty()).map(str::to_string);
        let text = parts.next().unwrap_or_default().to_string();

        Some(Self {
            image_handle,
            text,
            button_text,
            button_url,
            scheduled_at,
            repeat_count,
        })
    }
}

fn parse_schedule(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if value.eq_ignore_ascii_case("now") {
        return Some(now);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M")
        .ok()
        .map(|at| at.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_full_ad() {
        let ad = NewAd::parse_pipe_separated(
            "2025-08-10 15:30 | 3 | Watch | https://t.me/kino_uz | New releases | every day",
            Some("photo-1".to_string()),
            now(),
        )
        .unwrap();

        assert_eq!(ad.scheduled_at, Utc.with_ymd_and_hms(2025, 8, 10, 15, 30, 0).unwrap());
        assert_eq!(ad.repeat_count, 3);
        assert_eq!(ad.button_text.as_deref(), Some("Watch"));
        assert_eq!(ad.button_url.as_deref(), Some("https://t.me/kino_uz"));
        assert_eq!(ad.text, "New releases | every day");
        assert_eq!(ad.image_handle.as_deref(), Some("photo-1"));
    }

    #[test]
    fn test_parse_now_without_button() {
        let ad = NewAd::parse_pipe_separated("now | 1 | | | Hello", None, now()).unwrap();
        assert_eq!(ad.scheduled_at, now());
        assert!(ad.button_text.is_none() && ad.button_url.is_none());
        assert_eq!(ad.text, "Hello");
    }

    #[test]
    fn test_parse_rejects_bad_time_or_count() {
        assert!(NewAd::parse_pipe_separated("tomorrow | 1 | | | x", None, now()).is_none());
        assert!(NewAd::parse_pipe_separated("now | many | | | x", None, now()).is_none());
        assert!(NewAd::parse_pipe_separated("now", None, now()).is_none());
    }

    #[test]
    fn test_due_and_deliveries_left() {
        let mut ad = Ad {
            id: 1,
            image_handle: None,
            text: "x".to_string(),
            button_text: None,
            button_url: None,
            scheduled_at: now(),
            repeat_count: 2,
            times_sent: 1,
            created_at: now(),
        };
        assert!(ad.is_due(now()));
        assert!(!ad.is_due(now() - chrono::Duration::minutes(1)));

        ad.times_sent = 2;
        assert_eq!(ad.deliveries_left(), 0);
        assert!(!ad.is_due(now()));
    }
}
