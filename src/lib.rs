//! Agmarknet mandi price scraper.
//!
//! [`crate::scraper::MarketScraper`] drives the commodity/market search form through a
//! browser session and returns the rendered price table as
//! [`models::PriceRecord`]s.

pub mod chromedriver_manager;
pub mod config;
pub mod export;
pub mod models;
pub mod scraper;

pub use models::{PriceRecord, QueryParameters, ResultSet};
pub use crate::scraper::error::ScrapeError;
pub use crate::scraper::{MarketScraper, ScrapeSettings};
