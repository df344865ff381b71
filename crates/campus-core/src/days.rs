//! Day buckets for a conversation, computed in a fixed reference zone so that
//! every participant sees the same day boundaries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use campus_types::models::ConversationMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    English,
    #[default]
    Spanish,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s.split(['-', '_']).next().unwrap_or_default();
        match lang.to_ascii_lowercase().as_str() {
            "en" => Ok(Self::English),
            "es" => Ok(Self::Spanish),
            _ => Err(format!("unsupported locale {s:?}, expected en or es")),
        }
    }
}

const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const MONTHS_ES: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayLabel {
    Today,
    Yesterday,
    Date(NaiveDate),
}

impl DayLabel {
    pub fn for_date(date: NaiveDate, today: NaiveDate) -> Self {
        if date == today {
            Self::Today
        } else if today.pred_opt() == Some(date) {
            Self::Yesterday
        } else {
            Self::Date(date)
        }
    }

    pub fn render(&self, locale: Locale) -> String {
        match (self, locale) {
            (Self::Today, Locale::English) => "Today".to_string(),
            (Self::Today, Locale::Spanish) => "Hoy".to_string(),
            (Self::Yesterday, Locale::English) => "Yesterday".to_string(),
            (Self::Yesterday, Locale::Spanish) => "Ayer".to_string(),
            (Self::Date(d), Locale::English) => format!("{} {}", d.day(), MONTHS_EN[d.month0() as usize]),
            (Self::Date(d), Locale::Spanish) => format!("{} de {}", d.day(), MONTHS_ES[d.month0() as usize]),
        }
    }
}

impl fmt::Display for DayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Locale::English))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    /// Calendar date in the reference zone.
    pub date: NaiveDate,
    pub label: DayLabel,
    pub messages: Vec<ConversationMessage>,
}

impl DayGroup {
    pub fn title(&self, locale: Locale) -> String {
        self.label.render(locale)
    }
}

/// Calendar date of `at` as seen in `zone`.
pub fn local_date<Tz: TimeZone>(at: DateTime<Utc>, zone: &Tz) -> NaiveDate {
    at.with_timezone(zone).date_naive()
}

/// Partition messages into day buckets in ascending date order. Messages are
/// ordered by `sent_at`; equal timestamps keep their input order.
pub fn group_messages_by_day<'a, Tz: TimeZone>(
    messages: impl IntoIterator<Item = &'a ConversationMessage>,
    now: DateTime<Utc>,
    zone: &Tz,
) -> Vec<DayGroup> {
    let mut sorted: Vec<ConversationMessage> = messages.into_iter().cloned().collect();
    sorted.sort_by_key(|m| m.sent_at);

    let today = local_date(now, zone);
    let mut groups: Vec<DayGroup> = Vec::new();

    for message in sorted {
        let date = local_date(message.sent_at, zone);
        match groups.last_mut() {
            Some(group) if group.date == date => group.messages.push(message),
            _ => groups.push(DayGroup {
                date,
                label: DayLabel::for_date(date, today),
                messages: vec![message],
            }),
        }
    }

    groups
}
