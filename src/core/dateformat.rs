//! NM-005: Date rendering with `yyyy-mm-dd` style masks.
//!
//! Lowercase `m` is the month, uppercase `M` the minute. Text inside single
//! or double quotes is copied literally; anything not a mask is kept as-is.

use chrono::{Datelike, NaiveDateTime, Timelike};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Mask used when a note does not set `date`.
pub const DEFAULT_PATTERN: &str = "yyyy-mm-dd";

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn mask_regex() -> &'static Regex {
    static MASK: OnceLock<Regex> = OnceLock::new();
    MASK.get_or_init(|| {
        Regex::new(r#"d{1,4}|m{1,4}|yy(?:yy)?|HH?|hh?|MM?|ss?|TT?|tt?|WW?|[LlSN]|"[^"]*"|'[^']*'"#)
            .expect("date mask pattern is valid")
    })
}

/// Render `when` with a date mask.
pub fn format(when: &NaiveDateTime, pattern: &str) -> String {
    mask_regex()
        .replace_all(pattern, |caps: &Captures| render_token(when, &caps[0]))
        .into_owned()
}

fn render_token(when: &NaiveDateTime, token: &str) -> String {
    let hour12 = match when.hour() % 12 {
        0 => 12,
        h => h,
    };
    let weekday = when.weekday().num_days_from_sunday() as usize;
    let month = when.month0() as usize;
    match token {
        "d" => when.day().to_string(),
        "dd" => format!("{:02}", when.day()),
        "ddd" => DAY_NAMES[weekday][..3].to_string(),
        "dddd" => DAY_NAMES[weekday].to_string(),
        "m" => when.month().to_string(),
        "mm" => format!("{:02}", when.month()),
        "mmm" => MONTH_NAMES[month][..3].to_string(),
        "mmmm" => MONTH_NAMES[month].to_string(),
        "yy" => format!("{:02}", when.year().rem_euclid(100)),
        "yyyy" => format!("{:04}", when.year()),
        "H" => when.hour().to_string(),
        "HH" => format!("{:02}", when.hour()),
        "h" => hour12.to_string(),
        "hh" => format!("{:02}", hour12),
        "M" => when.minute().to_string(),
        "MM" => format!("{:02}", when.minute()),
        "s" => when.second().to_string(),
        "ss" => format!("{:02}", when.second()),
        "l" => format!("{:03}", when.nanosecond() / 1_000_000 % 1000),
        "L" => format!("{:02}", when.nanosecond() / 10_000_000 % 100),
        "t" => meridiem(when)[..1].to_lowercase(),
        "tt" => meridiem(when).to_lowercase(),
        "T" => meridiem(when)[..1].to_string(),
        "TT" => meridiem(when).to_string(),
        "W" => when.iso_week().week().to_string(),
        "WW" => format!("{:02}", when.iso_week().week()),
        "N" => when.weekday().number_from_monday().to_string(),
        "S" => ordinal_suffix(when.day()).to_string(),
        quoted => quoted[1..quoted.len() - 1].to_string(),
    }
}

fn meridiem(when: &NaiveDateTime) -> &'static str {
    if when.hour() < 12 {
        "AM"
    } else {
        "PM"
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
