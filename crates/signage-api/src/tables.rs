use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{debug, info};

use signage_store::Table;
use signage_store::schema::{default_columns, key_column};
use signage_types::api::{
    Claims, GeocodeResponse, SaveTableRequest, TableResponse, UpsertRowRequest,
};
use signage_types::flags::{format_flag, is_truthy_lenient};
use signage_types::models::{DEFAULT_VIDEO_SECONDS, NewsItem, Video, WeatherUnit};
use signage_types::{Record, TableRow};

use crate::auth::{AppState, require_admin};
use crate::error::{ApiError, ApiResult};

/// Capability flag that grants editing a content table. `users` is not a
/// content table and has its own endpoints.
pub fn capability_for(table: &str) -> Option<&'static str> {
    match table {
        "news" => Some("can_news"),
        "birthdays" => Some("can_birthdays"),
        "videos" => Some("can_videos"),
        "weather_units" => Some("can_weather"),
        "worldclocks" => Some("can_worldclocks"),
        "settings" => Some("can_currencies"),
        _ => None,
    }
}

/// Check the session may edit `table` and return its columns.
fn authorize(claims: &Claims, table: &str) -> ApiResult<&'static [&'static str]> {
    let capability =
        capability_for(table).ok_or_else(|| ApiError::not_found(format!("unknown table {table}")))?;
    if !claims.permissions.get(capability) {
        return Err(ApiError::forbidden(format!("{capability} required")));
    }
    default_columns(table).ok_or_else(|| ApiError::not_found(format!("unknown table {table}")))
}

/// Clean up one edited record: trimmed column names, canonical `active`
/// flags, and a default video duration.
pub fn normalize_record(table: &str, record: &Record) -> Record {
    let mut out: Record = record
        .iter()
        .map(|(k, v)| (k.trim().to_string(), v.clone()))
        .collect();

    if let Some(active) = out.get_mut("active") {
        *active = format_flag(is_truthy_lenient(active)).to_string();
    }
    if table == Video::TABLE {
        if let Some(d) = out.get_mut("duration_seconds") {
            let trimmed = d.trim();
            *d = if trimmed.is_empty() {
                DEFAULT_VIDEO_SECONDS.to_string()
            } else {
                trimmed.to_string()
            };
        }
    }
    out
}

/// Rows of `data` laid out under `columns`; missing cells are empty and
/// extra columns are dropped.
fn conform(columns: &[&str], records: &[Record]) -> Table {
    let columns = columns.iter().map(|c| c.to_string()).collect();
    Table::from_records(columns, records)
}

fn response(table: &str, data: &Table) -> TableResponse {
    TableResponse {
        table: table.to_string(),
        columns: data.columns().to_vec(),
        rows: data.records(),
    }
}

pub async fn get_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<TableResponse>> {
    let columns = authorize(&claims, &table)?;
    // Uncached and propagating: an outage must not look like an empty table
    // the editor could then save back.
    let current = state.store.read(&table).await?;
    let shaped = conform(columns, &current.records());
    Ok(Json(response(&table, &shaped)))
}

/// Replace a whole content table with the edited rows.
pub async fn save_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SaveTableRequest>,
) -> ApiResult<Json<TableResponse>> {
    let columns = authorize(&claims, &table)?;
    let rows: Vec<Record> = req.rows.iter().map(|r| normalize_record(&table, r)).collect();
    let data = conform(columns, &rows);

    state.store.replace(&table, &data).await?;
    info!("{} saved {} ({} rows)", claims.sub, table, data.len());
    Ok(Json(response(&table, &data)))
}

/// Insert or update one row by the table's key. Rows without an `id` are
/// new: they get the current Unix time as id, bumped past any id already in
/// the table, and are appended.
pub async fn upsert_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpsertRowRequest>,
) -> ApiResult<impl IntoResponse> {
    let columns = authorize(&claims, &table)?;
    let key = key_column(&table).ok_or_else(|| ApiError::not_found("unknown table"))?;

    let mut row = normalize_record(&table, &req.row);
    row.retain(|k, _| columns.contains(&k.as_str()));

    let blank = |r: &Record, f: &str| r.get(f).is_none_or(|v| v.trim().is_empty());
    if key == "id" && blank(&row, "id") {
        let current = state.store.read(&table).await?;
        row.insert("id".into(), next_id(&current, chrono::Utc::now().timestamp()));
        if table == NewsItem::TABLE && blank(&row, "created_at") {
            row.insert(
                "created_at".into(),
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            );
        }
        state.store.append(&table, &row).await?;
        info!("{} added {} id={}", claims.sub, table, row["id"]);
        return Ok((StatusCode::OK, Json(row)));
    }
    if blank(&row, key) {
        return Err(ApiError::bad_request(format!("{key} is required")));
    }

    state.store.upsert(&table, key, &row).await?;
    info!("{} upserted {} {}={}", claims.sub, table, key, row[key]);
    Ok((StatusCode::OK, Json(row)))
}

/// First id at or after `now` not already used in `current`.
fn next_id(current: &Table, now: i64) -> String {
    let mut id = now;
    while current.position("id", &id.to_string()).is_some() {
        id += 1;
    }
    id.to_string()
}

/// Fill blank coordinates of weather units from their city, then save.
pub async fn geocode_units(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<GeocodeResponse>> {
    authorize(&claims, WeatherUnit::TABLE)?;
    let mut units = state.store.read(WeatherUnit::TABLE).await?;

    let mut updated = 0;
    for i in 0..units.len() {
        let cell = |col: &str| units.get(i, col).unwrap_or_default().trim().to_string();
        let (lat, lon, city) = (cell("latitude"), cell("longitude"), cell("city"));
        if !(lat.is_empty() || lon.is_empty()) || city.is_empty() {
            continue;
        }
        match state.feeds.geocode(&city).await {
            Ok(Some((la, lo))) => {
                units.set(i, "latitude", la.to_string());
                units.set(i, "longitude", lo.to_string());
                updated += 1;
            }
            Ok(None) => debug!("No geocoding match for {}", city),
            Err(e) => debug!("Geocoding {} failed: {}", city, e),
        }
    }

    if updated > 0 {
        state.store.replace(WeatherUnit::TABLE, &units).await?;
    }
    info!("Geocoded {} weather units", updated);
    Ok(Json(GeocodeResponse { updated }))
}

pub async fn init_headers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claims)?;
    let written = state.store.ensure_headers().await?;
    Ok(Json(json!({ "written": written })))
}

pub async fn clear_cache(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> StatusCode {
    state.store.invalidate();
    state.feeds.clear_cache();
    StatusCode::NO_CONTENT
}
