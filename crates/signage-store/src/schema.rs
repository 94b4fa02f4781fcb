use signage_types::TableRow;
use signage_types::models::{Birthday, NewsItem, Setting, User, Video, WeatherUnit, WorldClock};

/// Every worksheet the application expects, in display order.
pub const KNOWN_TABLES: &[&str] = &[
    User::TABLE,
    NewsItem::TABLE,
    Birthday::TABLE,
    Video::TABLE,
    WeatherUnit::TABLE,
    WorldClock::TABLE,
    Setting::TABLE,
];

/// Default header for a known table; `None` for anything else.
pub fn default_columns(table: &str) -> Option<&'static [&'static str]> {
    match table {
        User::TABLE => Some(User::COLUMNS),
        NewsItem::TABLE => Some(NewsItem::COLUMNS),
        Birthday::TABLE => Some(Birthday::COLUMNS),
        Video::TABLE => Some(Video::COLUMNS),
        WeatherUnit::TABLE => Some(WeatherUnit::COLUMNS),
        WorldClock::TABLE => Some(WorldClock::COLUMNS),
        Setting::TABLE => Some(Setting::COLUMNS),
        _ => None,
    }
}

/// Key column for a known table.
pub fn key_column(table: &str) -> Option<&'static str> {
    match table {
        User::TABLE => Some(User::KEY),
        NewsItem::TABLE => Some(NewsItem::KEY),
        Birthday::TABLE => Some(Birthday::KEY),
        Video::TABLE => Some(Video::KEY),
        WeatherUnit::TABLE => Some(WeatherUnit::KEY),
        WorldClock::TABLE => Some(WorldClock::KEY),
        Setting::TABLE => Some(Setting::KEY),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tables_have_schemas() {
        for t in KNOWN_TABLES {
            let cols = default_columns(t).unwrap();
            let key = key_column(t).unwrap();
            assert!(cols.contains(&key), "{t}: key {key} missing from header");
        }
        assert!(default_columns("scratch").is_none());
    }

    #[test]
    fn news_header_order() {
        assert_eq!(
            default_columns("news").unwrap(),
            &["id", "title", "description", "image_url", "active", "created_at"]
        );
    }
}
