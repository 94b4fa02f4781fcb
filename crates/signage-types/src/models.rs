use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::flags::{format_flag, is_truthy, is_truthy_lenient};

/// One spreadsheet row keyed by header name. Every value is a string on the
/// wire; typed records below parse on the way in and format on the way out.
pub type Record = HashMap<String, String>;

/// A record type bound to one worksheet.
pub trait TableRow: Sized {
    /// Worksheet name.
    const TABLE: &'static str;
    /// Column whose values are unique within the table.
    const KEY: &'static str;
    /// Default header, in order.
    const COLUMNS: &'static [&'static str];

    fn from_record(record: &Record) -> Self;
    fn to_record(&self) -> Record;
}

fn field(record: &Record, name: &str) -> String {
    record.get(name).cloned().unwrap_or_default()
}

fn record_of<const N: usize>(pairs: [(&str, String); N]) -> Record {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn parse_coordinate(value: &str) -> Option<f64> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    // Sheets locales may render decimals with a comma.
    v.replace(',', ".").parse().ok()
}

fn format_coordinate(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// -- Users --

/// Per-user capability flags, one per editable content area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_news: bool,
    pub can_weather: bool,
    pub can_birthdays: bool,
    pub can_videos: bool,
    pub can_worldclocks: bool,
    pub can_currencies: bool,
}

impl Permissions {
    pub fn all() -> Self {
        Self {
            can_news: true,
            can_weather: true,
            can_birthdays: true,
            can_videos: true,
            can_worldclocks: true,
            can_currencies: true,
        }
    }

    /// Look a capability up by its column name (`can_news`, ...).
    pub fn get(&self, column: &str) -> bool {
        match column {
            "can_news" => self.can_news,
            "can_weather" => self.can_weather,
            "can_birthdays" => self.can_birthdays,
            "can_videos" => self.can_videos,
            "can_worldclocks" => self.can_worldclocks,
            "can_currencies" => self.can_currencies,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub is_admin: bool,
    pub permissions: Permissions,
    pub active: bool,
}

impl User {
    /// A record with an empty salt or hash has never had a password set.
    pub fn has_password(&self) -> bool {
        !self.password_salt.is_empty() && !self.password_hash.is_empty()
    }
}

impl TableRow for User {
    const TABLE: &'static str = "users";
    const KEY: &'static str = "username";
    const COLUMNS: &'static [&'static str] = &[
        "username",
        "name",
        "email",
        "password_hash",
        "password_salt",
        "is_admin",
        "can_news",
        "can_weather",
        "can_birthdays",
        "can_videos",
        "can_worldclocks",
        "can_currencies",
        "active",
    ];

    fn from_record(record: &Record) -> Self {
        let flag = |name: &str| is_truthy_lenient(&field(record, name));
        Self {
            username: field(record, "username"),
            name: field(record, "name"),
            email: field(record, "email"),
            password_hash: field(record, "password_hash"),
            password_salt: field(record, "password_salt"),
            is_admin: flag("is_admin"),
            permissions: Permissions {
                can_news: flag("can_news"),
                can_weather: flag("can_weather"),
                can_birthdays: flag("can_birthdays"),
                can_videos: flag("can_videos"),
                can_worldclocks: flag("can_worldclocks"),
                can_currencies: flag("can_currencies"),
            },
            active: flag("active"),
        }
    }

    fn to_record(&self) -> Record {
        let p = &self.permissions;
        record_of([
            ("username", self.username.clone()),
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("password_hash", self.password_hash.clone()),
            ("password_salt", self.password_salt.clone()),
            ("is_admin", format_flag(self.is_admin).into()),
            ("can_news", format_flag(p.can_news).into()),
            ("can_weather", format_flag(p.can_weather).into()),
            ("can_birthdays", format_flag(p.can_birthdays).into()),
            ("can_videos", format_flag(p.can_videos).into()),
            ("can_worldclocks", format_flag(p.can_worldclocks).into()),
            ("can_currencies", format_flag(p.can_currencies).into()),
            ("active", format_flag(self.active).into()),
        ])
    }
}

// -- Content tables --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub active: bool,
    pub created_at: String,
}

impl TableRow for NewsItem {
    const TABLE: &'static str = "news";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] =
        &["id", "title", "description", "image_url", "active", "created_at"];

    fn from_record(record: &Record) -> Self {
        Self {
            id: field(record, "id"),
            title: field(record, "title"),
            description: field(record, "description"),
            image_url: field(record, "image_url"),
            active: is_truthy(&field(record, "active")),
            created_at: field(record, "created_at"),
        }
    }

    fn to_record(&self) -> Record {
        record_of([
            ("id", self.id.clone()),
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("image_url", self.image_url.clone()),
            ("active", format_flag(self.active).into()),
            ("created_at", self.created_at.clone()),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Birthday {
    pub id: String,
    pub name: String,
    pub sector: String,
    /// Free text, `YYYY-MM-DD` recommended.
    pub birthday: String,
    pub photo_url: String,
    pub active: bool,
}

impl Birthday {
    /// Day of month as shown on the card: the last two characters of the
    /// birthday text, or `--` when it is blank.
    pub fn day_label(&self) -> String {
        let b = self.birthday.trim();
        if b.is_empty() {
            return "--".to_string();
        }
        let chars: Vec<char> = b.chars().collect();
        chars[chars.len().saturating_sub(2)..].iter().collect()
    }
}

impl TableRow for Birthday {
    const TABLE: &'static str = "birthdays";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "sector", "birthday", "photo_url", "active"];

    fn from_record(record: &Record) -> Self {
        Self {
            id: field(record, "id"),
            name: field(record, "name"),
            sector: field(record, "sector"),
            birthday: field(record, "birthday"),
            photo_url: field(record, "photo_url"),
            active: is_truthy(&field(record, "active")),
        }
    }

    fn to_record(&self) -> Record {
        record_of([
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("sector", self.sector.clone()),
            ("birthday", self.birthday.clone()),
            ("photo_url", self.photo_url.clone()),
            ("active", format_flag(self.active).into()),
        ])
    }
}

pub const DEFAULT_VIDEO_SECONDS: u64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration_seconds: u64,
    pub active: bool,
}

/// Parse a duration cell such as `"45"` or `"45.0"`; blank or garbage yields
/// the 30 second default.
pub fn parse_duration_seconds(value: &str) -> u64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
        .unwrap_or(DEFAULT_VIDEO_SECONDS)
}

impl TableRow for Video {
    const TABLE: &'static str = "videos";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "title", "url", "duration_seconds", "active"];

    fn from_record(record: &Record) -> Self {
        Self {
            id: field(record, "id"),
            title: field(record, "title"),
            url: field(record, "url"),
            duration_seconds: parse_duration_seconds(&field(record, "duration_seconds")),
            active: is_truthy(&field(record, "active")),
        }
    }

    fn to_record(&self) -> Record {
        record_of([
            ("id", self.id.clone()),
            ("title", self.title.clone()),
            ("url", self.url.clone()),
            ("duration_seconds", self.duration_seconds.to_string()),
            ("active", format_flag(self.active).into()),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherUnit {
    pub id: String,
    pub alias: String,
    pub city: String,
    pub state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub active: bool,
}

impl WeatherUnit {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Label shown on the ticker: alias, else city, else a generic name.
    pub fn display_name(&self) -> String {
        [&self.alias, &self.city]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "Unidade".to_string())
    }
}

impl TableRow for WeatherUnit {
    const TABLE: &'static str = "weather_units";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] =
        &["id", "alias", "city", "state", "latitude", "longitude", "active"];

    fn from_record(record: &Record) -> Self {
        Self {
            id: field(record, "id"),
            alias: field(record, "alias"),
            city: field(record, "city"),
            state: field(record, "state"),
            latitude: parse_coordinate(&field(record, "latitude")),
            longitude: parse_coordinate(&field(record, "longitude")),
            active: is_truthy(&field(record, "active")),
        }
    }

    fn to_record(&self) -> Record {
        record_of([
            ("id", self.id.clone()),
            ("alias", self.alias.clone()),
            ("city", self.city.clone()),
            ("state", self.state.clone()),
            ("latitude", format_coordinate(self.latitude)),
            ("longitude", format_coordinate(self.longitude)),
            ("active", format_flag(self.active).into()),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldClock {
    pub id: String,
    pub label: String,
    /// IANA zone name, e.g. `America/Sao_Paulo`.
    pub timezone: String,
}

impl TableRow for WorldClock {
    const TABLE: &'static str = "worldclocks";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "label", "timezone"];

    fn from_record(record: &Record) -> Self {
        Self {
            id: field(record, "id"),
            label: field(record, "label"),
            timezone: field(record, "timezone"),
        }
    }

    fn to_record(&self) -> Record {
        record_of([
            ("id", self.id.clone()),
            ("label", self.label.clone()),
            ("timezone", self.timezone.clone()),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

impl TableRow for Setting {
    const TABLE: &'static str = "settings";
    const KEY: &'static str = "key";
    const COLUMNS: &'static [&'static str] = &["key", "value"];

    fn from_record(record: &Record) -> Self {
        Self {
            key: field(record, "key"),
            value: field(record, "value"),
        }
    }

    fn to_record(&self) -> Record {
        record_of([("key", self.key.clone()), ("value", self.value.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn user_flags_parse_leniently() {
        let user = User::from_record(&rec(&[
            ("username", "ana"),
            ("is_admin", "Sim"),
            ("can_news", "y"),
            ("can_videos", "FALSE"),
            ("active", "1"),
        ]));
        assert!(user.is_admin);
        assert!(user.permissions.can_news);
        assert!(!user.permissions.can_videos);
        assert!(user.active);
        assert!(!user.has_password());
    }

    #[test]
    fn user_record_uses_canonical_flags() {
        let user = User {
            username: "ana".into(),
            is_admin: true,
            active: true,
            ..Default::default()
        };
        let r = user.to_record();
        assert_eq!(r["is_admin"], "true");
        assert_eq!(r["can_news"], "false");
        assert_eq!(r.len(), User::COLUMNS.len());
        assert!(User::COLUMNS.iter().all(|c| r.contains_key(*c)));
    }

    #[test]
    fn video_duration_defaults() {
        assert_eq!(parse_duration_seconds("45"), 45);
        assert_eq!(parse_duration_seconds("12.0"), 12);
        assert_eq!(parse_duration_seconds(""), 30);
        assert_eq!(parse_duration_seconds("abc"), 30);
    }

    #[test]
    fn weather_unit_coordinates() {
        let unit = WeatherUnit::from_record(&rec(&[
            ("city", "Campinas"),
            ("latitude", "-22,9"),
            ("longitude", "-47.06"),
        ]));
        assert_eq!(unit.coordinates(), Some((-22.9, -47.06)));
        assert_eq!(unit.display_name(), "Campinas");

        let blank = WeatherUnit::from_record(&rec(&[("latitude", "")]));
        assert_eq!(blank.coordinates(), None);
        assert_eq!(blank.display_name(), "Unidade");
    }

    #[test]
    fn birthday_day_label() {
        let mut b = Birthday {
            birthday: "1990-09-30".into(),
            ..Default::default()
        };
        assert_eq!(b.day_label(), "30");
        b.birthday = String::new();
        assert_eq!(b.day_label(), "--");
        b.birthday = "7".into();
        assert_eq!(b.day_label(), "7");
    }

    #[test]
    fn permissions_lookup_by_column() {
        let p = Permissions {
            can_weather: true,
            ..Default::default()
        };
        assert!(p.get("can_weather"));
        assert!(!p.get("can_news"));
        assert!(!p.get("is_admin"));
        assert!(Permissions::all().get("can_currencies"));
    }
}
