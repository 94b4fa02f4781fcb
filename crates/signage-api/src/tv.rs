use axum::{Json, extract::State};
use chrono::Utc;

use signage_feeds::clocks::world_times;
use signage_store::TableSet;
use signage_types::TableRow;
use signage_types::api::{BirthdaySlide, NewsSlide, TvFrame, VideoKind, VideoSlide};
use signage_types::models::{
    Birthday, DEFAULT_VIDEO_SECONDS, NewsItem, Video, WeatherUnit, WorldClock,
};

use crate::auth::AppState;

/// Everything one frame needs, fetched in a single batch.
const FRAME_TABLES: &[&str] = &[
    NewsItem::TABLE,
    Birthday::TABLE,
    Video::TABLE,
    WeatherUnit::TABLE,
    WorldClock::TABLE,
];

const MIN_REFRESH_MS: u64 = 1000;

fn active_rows<T: TableRow>(tables: &TableSet) -> Vec<T> {
    tables
        .get(T::TABLE)
        .map(|t| t.filter_active().typed())
        .unwrap_or_default()
}

pub fn video_kind(url: &str) -> VideoKind {
    let lower = url.to_lowercase();
    if lower.contains("youtube.com") || lower.contains("youtu.be") {
        VideoKind::Youtube
    } else if [".mp4", ".webm", ".ogg"].iter().any(|ext| lower.ends_with(ext)) {
        VideoKind::File
    } else {
        VideoKind::Embed
    }
}

/// YouTube embeds must autoplay muted on an unattended screen.
pub fn video_slide(video: &Video) -> VideoSlide {
    let kind = video_kind(&video.url);
    let url = match kind {
        VideoKind::Youtube => {
            let sep = if video.url.contains('?') { '&' } else { '?' };
            format!("{}{}autoplay=1&mute=1", video.url, sep)
        }
        _ => video.url.clone(),
    };
    VideoSlide {
        title: video.title.clone(),
        url,
        kind,
        duration_seconds: video.duration_seconds,
    }
}

/// Time until the page should reload: the shorter of the news interval and
/// the running video (30 s when there is none).
pub fn refresh_ms(news_interval_ms: u64, video: Option<&VideoSlide>) -> u64 {
    let video_ms = video
        .map(|v| v.duration_seconds.saturating_mul(1000))
        .unwrap_or(DEFAULT_VIDEO_SECONDS * 1000);
    news_interval_ms.min(video_ms).max(MIN_REFRESH_MS)
}

/// Current slide of `items` under rotation `key`, then step the rotation.
fn rotate<'a, T>(state: &AppState, key: &str, items: &'a [T]) -> Option<&'a T> {
    let idx = state.rotation.current(key, items.len());
    state.rotation.advance(key, items.len());
    items.get(idx)
}

/// One frame of the rotating display. Never fails: missing data shows up as
/// empty slides.
pub async fn frame(State(state): State<AppState>) -> Json<TvFrame> {
    let tables = state.store.read_tables(FRAME_TABLES).await;

    let news: Vec<NewsItem> = active_rows(&tables);
    let birthdays: Vec<Birthday> = active_rows(&tables);
    let videos: Vec<Video> = active_rows(&tables);
    let units: Vec<WeatherUnit> = active_rows(&tables);
    let clocks: Vec<WorldClock> = tables
        .get(WorldClock::TABLE)
        .map(|t| t.typed())
        .unwrap_or_default();

    let news = rotate(&state, "news", &news).map(|n| NewsSlide {
        title: n.title.clone(),
        description: n.description.clone(),
        image_url: n.image_url.clone(),
    });
    let birthday = rotate(&state, "birthdays", &birthdays).map(|b| BirthdaySlide {
        name: b.name.clone(),
        sector: b.sector.clone(),
        day: b.day_label(),
        photo_url: b.photo_url.clone(),
    });
    let video = rotate(&state, "videos", &videos).map(video_slide);

    let weather = state.feeds.weather(&units).await;
    let rates = state.feeds.rates().await;

    Json(TvFrame {
        refresh_ms: refresh_ms(state.news_rotation_secs.saturating_mul(1000), video.as_ref()),
        news,
        birthday,
        video,
        clocks: world_times(&clocks, Utc::now()),
        rates,
        weather,
    })
}
