use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use agmark_scraper::chromedriver_manager::ChromeDriverManager;
use agmark_scraper::config::AppConfig;
use agmark_scraper::export::{self, error_body, Exporter, JsonExporter, OutputFormat};
use agmark_scraper::scraper::browser::WebDriverProvider;
use agmark_scraper::{MarketScraper, QueryParameters, ScrapeError};

/// Fetch mandi prices from Agmarknet for one state, commodity and market.
#[derive(Debug, Parser)]
#[command(name = "agmark_scraper", version, about)]
struct Cli {
    /// State, exactly as listed on the form (e.g. "Maharashtra")
    #[arg(long, default_value = "")]
    state: String,

    /// Commodity, exactly as listed on the form (e.g. "Onion")
    #[arg(long, default_value = "")]
    commodity: String,

    /// Market, exactly as listed on the form (e.g. "Pune")
    #[arg(long, default_value = "")]
    market: String,

    /// Output format; defaults to the configured one
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file. JSON goes to stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, conflicts_with = "no_headless")]
    headless: bool,

    #[arg(long)]
    no_headless: bool,

    #[arg(long, env = "WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Connect to an already running WebDriver instead of starting ChromeDriver
    #[arg(long)]
    no_manage_chromedriver: bool,

    /// Persist the effective configuration
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if self.headless {
            config.headless = true;
        }
        if self.no_headless {
            config.headless = false;
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        if self.no_manage_chromedriver {
            config.manage_chromedriver = false;
        }
        if let Some(format) = self.format {
            config.output_format = format;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            println!("{}", failure_body(&e));
            ExitCode::FAILURE
        }
    }
}

/// The `{"error": ..}` body printed for a failed run. Scrape errors keep
/// their own message; anything else carries its whole context chain.
fn failure_body(e: &anyhow::Error) -> serde_json::Value {
    let message = match e.downcast_ref::<ScrapeError>() {
        Some(scrape_error) => scrape_error.to_string(),
        None => format!("{e:#}"),
    };
    error_body(&message)
}

async fn run(cli: Cli) -> Result<()> {
    let query = QueryParameters::new(&cli.state, &cli.commodity, &cli.market)?;

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    cli.apply_to(&mut config);

    let problems = config.validate();
    if !problems.is_empty() {
        anyhow::bail!("Invalid configuration: {}", problems.join("; "));
    }

    let (chromedriver, webdriver_url) = if config.manage_chromedriver {
        let manager = ChromeDriverManager::new();
        manager.start_driver(config.chromedriver_port).await?;
        (Some(manager), format!("http://localhost:{}", config.chromedriver_port))
    } else {
        (None, config.webdriver_url.clone())
    };

    let scraper = MarketScraper::new(
        WebDriverProvider::new(webdriver_url, config.headless),
        config.scrape_settings(),
    );
    let outcome = scraper.fetch_market_data(&query).await;

    if let Some(manager) = &chromedriver {
        manager.stop_driver().await;
    }

    let results = outcome?;

    match (&cli.output, config.output_format) {
        (None, OutputFormat::Json) => {
            println!("{}", JsonExporter::new().render(&results.records)?);
        }
        (output, format) => {
            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(export::default_file_name(&results, format)));
            format.exporter().export(&results, &path)?;
            info!(path = %path.display(), records = results.len(), "export written");
            config.last_export_path = Some(path.display().to_string());
        }
    }

    if cli.save_config {
        config.save()?;
        info!(path = %AppConfig::config_path()?.display(), "configuration saved");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_parameter_fails_with_missing_parameters_body() {
        let args = ["agmark_scraper", "--commodity", "Onion", "--market", "Pune"];
        let cli = Cli::try_parse_from(args).unwrap();

        let err = run(cli).await.unwrap_err();

        assert_eq!(
            failure_body(&err).to_string(),
            r#"{"error":"Missing query parameters"}"#
        );
    }

    #[test]
    fn other_failures_keep_their_context() {
        let err = anyhow::anyhow!("connection refused").context("Failed to load configuration");
        assert_eq!(
            failure_body(&err)["error"],
            "Failed to load configuration: connection refused"
        );
    }

    #[test]
    fn scrape_errors_use_their_own_message() {
        let err = anyhow::Error::new(ScrapeError::option_not_available("market", "Pune"));
        assert_eq!(
            failure_body(&err)["error"],
            "market option \"Pune\" is not available"
        );
    }

    #[test]
    fn headless_flags_conflict() {
        assert!(Cli::try_parse_from(["agmark_scraper", "--headless", "--no-headless"]).is_err());
    }
}
