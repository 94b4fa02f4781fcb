use serde::{Deserialize, Serialize};

use crate::models::{Permissions, Record, User};

// -- Session claims --

/// JWT claims for an admin-panel session. Capabilities are captured at login,
/// the same way the panel kept them for the whole session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub is_admin: bool,
    pub permissions: Permissions,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub name: String,
    pub is_admin: bool,
    pub permissions: Permissions,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SetupStatus {
    pub needs_setup: bool,
}

/// First-run wizard and admin "create user" form.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// A user as shown in the admin list. Hash and salt never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub username: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    #[serde(flatten)]
    pub permissions: Permissions,
    pub active: bool,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            username: u.username.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            is_admin: u.is_admin,
            permissions: u.permissions,
            active: u.active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SavePermissionsRequest {
    pub users: Vec<UserView>,
}

// -- Tables --

#[derive(Debug, Serialize, Deserialize)]
pub struct TableResponse {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveTableRequest {
    pub rows: Vec<Record>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertRowRequest {
    pub row: Record,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub updated: usize,
}

// -- TV display --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSlide {
    pub title: String,
    pub description: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirthdaySlide {
    pub name: String,
    pub sector: String,
    pub day: String,
    pub photo_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    Youtube,
    File,
    Embed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSlide {
    pub title: String,
    pub url: String,
    pub kind: VideoKind,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockReading {
    pub label: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub usd: Option<f64>,
    pub eur: Option<f64>,
    pub btc: Option<f64>,
    pub eth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub alias: String,
    pub temperature: Option<f64>,
    pub windspeed: Option<f64>,
    pub weathercode: Option<i64>,
    pub icon: String,
}

/// One frame of the rotating display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvFrame {
    pub news: Option<NewsSlide>,
    pub birthday: Option<BirthdaySlide>,
    pub video: Option<VideoSlide>,
    pub clocks: Vec<ClockReading>,
    pub rates: Rates,
    pub weather: Vec<WeatherReport>,
    pub refresh_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_view_hides_credentials() {
        let user = User {
            username: "ana".into(),
            password_hash: "abc".into(),
            password_salt: "def".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert_eq!(json["username"], "ana");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_salt").is_none());
        // Capabilities are flattened next to the identity fields.
        assert_eq!(json["can_news"], false);
    }

    #[test]
    fn login_request_rejects_unknown_fields() {
        let bad = r#"{"username":"a","password":"b","admin":true}"#;
        assert!(serde_json::from_str::<LoginRequest>(bad).is_err());
    }
}
