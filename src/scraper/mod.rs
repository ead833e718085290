pub mod browser;
pub mod error;
pub mod extractor;
pub mod form;
pub mod popup;

use chrono::NaiveDate;
use std::fmt;
use std::future::Future;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::{PriceRecord, QueryParameters, ResultSet};
use browser::{FormSession, Locator, SessionProvider};
use error::ScrapeError;
use extractor::PriceTableExtractor;

/// Timing of one scrape.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub target_url: String,
    /// Bound on waiting for the market selector to offer the requested market.
    pub market_timeout: Duration,
    /// Bound on waiting for the results table.
    pub results_timeout: Duration,
    pub poll_interval: Duration,
    /// Pause after the final submit before looking for the results table.
    pub settle_delay: Duration,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            target_url: form::TARGET_URL.to_string(),
            market_timeout: Duration::from_secs(10),
            results_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// The steps of a scrape, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    OpenSession,
    Navigate,
    DismissPopup,
    SelectCommodity,
    SelectState,
    SetDate,
    SubmitForMarkets,
    SelectMarket,
    SubmitForResults,
    AwaitResults,
    ExtractTable,
    CloseSession,
}

impl Step {
    pub const ALL: [Step; 12] = [
        Step::OpenSession,
        Step::Navigate,
        Step::DismissPopup,
        Step::SelectCommodity,
        Step::SelectState,
        Step::SetDate,
        Step::SubmitForMarkets,
        Step::SelectMarket,
        Step::SubmitForResults,
        Step::AwaitResults,
        Step::ExtractTable,
        Step::CloseSession,
    ];

    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenSession => "open browser session",
            Self::Navigate => "navigate to search form",
            Self::DismissPopup => "dismiss popup",
            Self::SelectCommodity => "select commodity",
            Self::SelectState => "select state",
            Self::SetDate => "set report date",
            Self::SubmitForMarkets => "submit for market list",
            Self::SelectMarket => "select market",
            Self::SubmitForResults => "submit for results",
            Self::AwaitResults => "wait for results table",
            Self::ExtractTable => "extract price table",
            Self::CloseSession => "close browser session",
        };
        f.write_str(name)
    }
}

/// Runs one step, logging entry and outcome.
async fn run_step<T, F>(step: Step, action: F) -> Result<T, ScrapeError>
where
    F: Future<Output = Result<T, ScrapeError>>,
{
    info!(step = step.number(), "step {}/{}: {}", step.number(), Step::ALL.len(), step);
    match action.await {
        Ok(value) => {
            debug!(step = step.number(), "{} done", step);
            Ok(value)
        }
        Err(e) => {
            debug!(step = step.number(), error = %e, "{} failed", step);
            Err(e)
        }
    }
}

/// Polls `check` until it reports true or `timeout` elapses.
///
/// Errors from `check` count as "not yet", since the page is reloading while
/// we poll. If the last poll before the deadline still failed, that error is
/// returned instead of `Ok(false)`.
async fn wait_until<F, Fut>(
    timeout: Duration,
    poll_interval: Duration,
    mut check: F,
) -> Result<bool, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, ScrapeError>>,
{
    let start = Instant::now();

    loop {
        let last_err = match check().await {
            Ok(true) => return Ok(true),
            Ok(false) => None,
            Err(e) => {
                debug!(error = %e, "not ready yet");
                Some(e)
            }
        };

        if start.elapsed() >= timeout {
            return match last_err {
                Some(e) => Err(e),
                None => Ok(false),
            };
        }

        sleep(poll_interval).await;
    }
}

/// Selects `label` in `select`, failing with the field name when the option
/// does not exist.
async fn select_exact<S: FormSession>(
    session: &S,
    select: &Locator,
    field: &str,
    label: &str,
) -> Result<(), ScrapeError> {
    let labels = session.option_labels(select).await?;
    if !labels.iter().any(|l| l == label) {
        debug!(field, label, available = labels.len(), "option missing");
        return Err(ScrapeError::option_not_available(field, label));
    }

    session.select_by_label(select, label).await
}

/// Drives the Agmarknet search form for one query per call.
pub struct MarketScraper<P> {
    provider: P,
    settings: ScrapeSettings,
}

impl<P: SessionProvider> MarketScraper<P> {
    pub fn new(provider: P, settings: ScrapeSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &ScrapeSettings {
        &self.settings
    }

    /// Fetches the price table for `query` with today's report date.
    pub async fn fetch_market_data(
        &self,
        query: &QueryParameters,
    ) -> Result<ResultSet, ScrapeError> {
        self.fetch_market_data_on(query, chrono::Local::now().date_naive())
            .await
    }

    /// Fetches the price table as if today were `today`.
    ///
    /// The session opened here is closed before returning, whether the
    /// scrape succeeded or not.
    pub async fn fetch_market_data_on(
        &self,
        query: &QueryParameters,
        today: NaiveDate,
    ) -> Result<ResultSet, ScrapeError> {
        if !query.missing_fields().is_empty() {
            return Err(ScrapeError::MissingParameters);
        }

        info!(
            state = %query.state,
            commodity = %query.commodity,
            market = %query.market,
            "starting market data scrape"
        );

        let report_date = form::report_date(today);

        let session = run_step(Step::OpenSession, self.provider.open()).await?;
        let outcome = self.drive(&session, query, &report_date).await;

        if let Err(e) = run_step(Step::CloseSession, session.quit()).await {
            warn!(error = %e, "browser session did not close cleanly");
        }

        let records = outcome?;
        info!(records = records.len(), "scrape finished");
        Ok(ResultSet::new(query.clone(), report_date, records))
    }

    async fn drive<S: FormSession>(
        &self,
        session: &S,
        query: &QueryParameters,
        report_date: &str,
    ) -> Result<Vec<PriceRecord>, ScrapeError> {
        let settings = &self.settings;

        run_step(Step::Navigate, session.goto(&settings.target_url)).await?;

        run_step(Step::DismissPopup, popup::dismiss_popup(session)).await?;

        run_step(
            Step::SelectCommodity,
            select_exact(session, &form::COMMODITY_SELECT, "commodity", &query.commodity),
        )
        .await?;

        run_step(
            Step::SelectState,
            select_exact(session, &form::STATE_SELECT, "state", &query.state),
        )
        .await?;

        run_step(
            Step::SetDate,
            session.replace_text(&form::DATE_INPUT, report_date),
        )
        .await?;

        run_step(Step::SubmitForMarkets, async {
            session.click(&form::GO_BUTTON).await?;

            let market = query.market.as_str();
            let offered = wait_until(
                settings.market_timeout,
                settings.poll_interval,
                move || async move {
                    let labels = session.option_labels(&form::MARKET_SELECT).await?;
                    Ok(labels.iter().any(|l| l == market))
                },
            )
            .await?;

            if offered {
                Ok(())
            } else {
                Err(ScrapeError::option_not_available("market", &query.market))
            }
        })
        .await?;

        run_step(
            Step::SelectMarket,
            select_exact(session, &form::MARKET_SELECT, "market", &query.market),
        )
        .await?;

        run_step(Step::SubmitForResults, async {
            session.click(&form::GO_BUTTON).await?;
            sleep(settings.settle_delay).await;
            Ok(())
        })
        .await?;

        run_step(Step::AwaitResults, async {
            let present = wait_until(settings.results_timeout, settings.poll_interval, move || {
                session.exists(&form::RESULTS_TABLE)
            })
            .await?;

            if present {
                Ok(())
            } else {
                Err(ScrapeError::Timeout {
                    what: "results table".to_string(),
                    waited: settings.results_timeout,
                })
            }
        })
        .await?;

        run_step(Step::ExtractTable, async {
            let source = session.page_source().await?;
            PriceTableExtractor::extract(&source)
        })
        .await
    }
}
