use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use signage_types::api::ClockReading;
use signage_types::models::WorldClock;

pub const INVALID_TIME: &str = "--:--:--";

/// Clocks shown when the `worldclocks` table is empty.
pub const DEFAULT_CLOCKS: &[(&str, &str)] = &[
    ("Brasília", "America/Sao_Paulo"),
    ("New York", "America/New_York"),
    ("Hong Kong", "Asia/Hong_Kong"),
];

/// Wall-clock time in an IANA zone as `HH:MM:SS`.
pub fn local_time(now: DateTime<Utc>, timezone: &str) -> String {
    match timezone.trim().parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).format("%H:%M:%S").to_string(),
        Err(_) => INVALID_TIME.to_string(),
    }
}

pub fn world_times(clocks: &[WorldClock], now: DateTime<Utc>) -> Vec<ClockReading> {
    let zones: Vec<(&str, &str)> = if clocks.is_empty() {
        DEFAULT_CLOCKS.to_vec()
    } else {
        clocks
            .iter()
            .map(|c| (c.label.as_str(), c.timezone.as_str()))
            .collect()
    };

    zones
        .into_iter()
        .map(|(label, tz)| ClockReading {
            label: label.to_string(),
            time: local_time(now, tz),
        })
        .collect()
}
