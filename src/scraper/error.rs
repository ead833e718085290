use std::time::Duration;
use thirtyfour::error::WebDriverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Missing query parameters")]
    MissingParameters,

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("{field} option \"{value}\" is not available")]
    OptionNotAvailable { field: String, value: String },

    #[error("results not available: {what} did not appear within {}s", .waited.as_secs_f64())]
    Timeout { what: String, waited: Duration },

    #[error("malformed row {row}: {tokens} tokens, at least {required} required")]
    MalformedRow {
        row: usize,
        tokens: usize,
        required: usize,
    },

    #[error("browser session error: {0}")]
    Session(String),

    #[error("webdriver error: {0}")]
    WebDriver(#[from] WebDriverError),
}

impl ScrapeError {
    pub fn option_not_available(field: &str, value: &str) -> Self {
        Self::OptionNotAvailable {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}
