//! Public data feeds for the display: weather, exchange rates and world
//! clocks.

pub mod client;
pub mod clocks;
pub mod error;
pub mod memo;
pub mod rates;
pub mod weather;

pub use client::{Endpoints, FeedClient};
pub use error::{FeedError, Result};
pub use weather::weather_emoji;
