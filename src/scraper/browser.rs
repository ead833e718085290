use std::fmt;
use thirtyfour::components::SelectElement;
use thirtyfour::prelude::*;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use super::error::ScrapeError;

/// How a control of the remote page is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(&'static str),
    Class(&'static str),
    Css(&'static str),
}

impl Locator {
    fn to_by(&self) -> By {
        match self {
            Self::Id(id) => By::Id(*id),
            Self::Class(class) => By::ClassName(*class),
            Self::Css(css) => By::Css(*css),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Class(class) => write!(f, ".{class}"),
            Self::Css(css) => write!(f, "{css}"),
        }
    }
}

/// The browser operations the form pipeline needs. Every call blocks until
/// the browser answers; none of them waits for the page to change.
#[allow(async_fn_in_trait)]
pub trait FormSession {
    async fn goto(&self, url: &str) -> Result<(), ScrapeError>;

    /// Whether at least one element matches.
    async fn exists(&self, locator: &Locator) -> Result<bool, ScrapeError>;

    async fn click(&self, locator: &Locator) -> Result<(), ScrapeError>;

    /// Visible labels of the options of a `<select>`, in order.
    async fn option_labels(&self, select: &Locator) -> Result<Vec<String>, ScrapeError>;

    async fn select_by_label(&self, select: &Locator, label: &str) -> Result<(), ScrapeError>;

    /// Clears an input and types `text` into it.
    async fn replace_text(&self, input: &Locator, text: &str) -> Result<(), ScrapeError>;

    async fn page_source(&self) -> Result<String, ScrapeError>;

    /// Ends the session. Consumes it so it cannot be closed twice.
    async fn quit(self) -> Result<(), ScrapeError>
    where
        Self: Sized;
}

/// Opens a fresh, independent session per scrape.
#[allow(async_fn_in_trait)]
pub trait SessionProvider {
    type Session: FormSession;

    async fn open(&self) -> Result<Self::Session, ScrapeError>;
}

pub struct BrowserDriver {
    driver: WebDriver,
}

impl BrowserDriver {
    pub async fn new(webdriver_url: &str, headless: bool) -> Result<Self, ScrapeError> {
        debug!(webdriver_url, headless, "creating browser session");

        let mut caps = DesiredCapabilities::chrome();

        let mut chrome_args = vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--window-size=1920,1080",
        ];

        if headless {
            chrome_args.push("--headless=new");
        }

        for arg in chrome_args {
            caps.add_arg(arg)?;
        }

        let mut last_error = None;
        for attempt in 1..=3 {
            match WebDriver::new(webdriver_url, caps.clone()).await {
                Ok(driver) => {
                    debug!(attempt, "connected to webdriver");
                    return Ok(Self { driver });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "webdriver connection attempt failed");
                    last_error = Some(e);
                    if attempt < 3 {
                        sleep(Duration::from_millis(1000)).await;
                    }
                }
            }
        }

        Err(ScrapeError::Session(format!(
            "could not connect to webdriver at {webdriver_url} after 3 attempts: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn find(&self, locator: &Locator) -> Result<WebElement, ScrapeError> {
        self.driver
            .find_all(locator.to_by())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::ElementNotFound(locator.to_string()))
    }
}

impl FormSession for BrowserDriver {
    async fn goto(&self, url: &str) -> Result<(), ScrapeError> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, ScrapeError> {
        Ok(!self.driver.find_all(locator.to_by()).await?.is_empty())
    }

    async fn click(&self, locator: &Locator) -> Result<(), ScrapeError> {
        self.find(locator).await?.click().await?;
        Ok(())
    }

    async fn option_labels(&self, select: &Locator) -> Result<Vec<String>, ScrapeError> {
        let element = self.find(select).await?;
        let select = SelectElement::new(&element).await?;

        let mut labels = Vec::new();
        for option in select.options().await? {
            labels.push(option.text().await?);
        }
        Ok(labels)
    }

    async fn select_by_label(&self, select: &Locator, label: &str) -> Result<(), ScrapeError> {
        let element = self.find(select).await?;
        SelectElement::new(&element)
            .await?
            .select_by_visible_text(label)
            .await?;
        Ok(())
    }

    async fn replace_text(&self, input: &Locator, text: &str) -> Result<(), ScrapeError> {
        let element = self.find(input).await?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn page_source(&self) -> Result<String, ScrapeError> {
        Ok(self.driver.source().await?)
    }

    async fn quit(self) -> Result<(), ScrapeError> {
        self.driver.quit().await?;
        Ok(())
    }
}

/// Opens Chrome sessions through a running WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverProvider {
    pub webdriver_url: String,
    pub headless: bool,
}

impl WebDriverProvider {
    pub fn new(webdriver_url: impl Into<String>, headless: bool) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless,
        }
    }
}

impl SessionProvider for WebDriverProvider {
    type Session = BrowserDriver;

    async fn open(&self) -> Result<BrowserDriver, ScrapeError> {
        BrowserDriver::new(&self.webdriver_url, self.headless).await
    }
}
