use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const VERSION_URL: &str =
    "https://googlechromelabs.github.io/chrome-for-testing/LATEST_RELEASE_STABLE";
const DOWNLOAD_BASE: &str = "https://storage.googleapis.com/chrome-for-testing-public";

/// Chrome-for-Testing platform name and driver binary name for this host.
pub fn platform() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("win64", "chromedriver.exe")
    } else if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
        ("mac-arm64", "chromedriver")
    } else if cfg!(target_os = "macos") {
        ("mac-x64", "chromedriver")
    } else {
        ("linux64", "chromedriver")
    }
}

pub fn download_url(version: &str) -> String {
    let (platform, _) = platform();
    format!("{DOWNLOAD_BASE}/{version}/{platform}/chromedriver-{platform}.zip")
}

/// Owns a local ChromeDriver process for the lifetime of the run.
pub struct ChromeDriverManager {
    driver_path: PathBuf,
    process: Arc<Mutex<Option<Child>>>,
}

impl Default for ChromeDriverManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromeDriverManager {
    /// Expects the driver next to the executable.
    pub fn new() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        Self::with_driver_path(exe_dir.join(platform().1))
    }

    pub fn with_driver_path(driver_path: PathBuf) -> Self {
        Self {
            driver_path,
            process: Arc::new(Mutex::new(None)),
        }
    }

    pub fn driver_path(&self) -> &Path {
        &self.driver_path
    }

    pub async fn ensure_driver_available(&self) -> Result<()> {
        if self.driver_path.exists() {
            debug!(path = %self.driver_path.display(), "chromedriver found");
            return Ok(());
        }

        info!(path = %self.driver_path.display(), "chromedriver not found, downloading");
        self.download_chromedriver()
            .await
            .context("Failed to download ChromeDriver. Please check your internet connection.")
    }

    pub async fn start_driver(&self, port: u16) -> Result<()> {
        self.ensure_driver_available().await?;

        let mut process_guard = self.process.lock().await;
        if process_guard.is_some() {
            debug!(port, "chromedriver already running");
            return Ok(());
        }

        info!(port, "starting chromedriver");
        let child = Command::new(&self.driver_path)
            .arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to start ChromeDriver from {}. Make sure Chrome is installed.",
                    self.driver_path.display()
                )
            })?;

        *process_guard = Some(child);
        drop(process_guard);

        if !self.wait_for_readiness(port, 15).await {
            self.stop_driver().await;
            anyhow::bail!("ChromeDriver did not become ready on port {port} within 15 seconds");
        }

        info!(port, "chromedriver ready");
        Ok(())
    }

    pub async fn stop_driver(&self) {
        let mut process_guard = self.process.lock().await;
        if let Some(mut child) = process_guard.take() {
            if let Err(e) = child.kill() {
                warn!(error = %e, "failed to kill chromedriver");
            }
            let _ = child.wait();
            info!("chromedriver stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        let mut process_guard = self.process.lock().await;
        match process_guard.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn download_chromedriver(&self) -> Result<()> {
        let version = reqwest::get(VERSION_URL)
            .await?
            .error_for_status()?
            .text()
            .await?
            .trim()
            .to_string();

        let url = download_url(&version);
        info!(%version, %url, "downloading chromedriver");

        let zip_data = reqwest::get(&url).await?.error_for_status()?.bytes().await?;

        let zip_path = std::env::temp_dir().join("chromedriver.zip");
        fs::write(&zip_path, &zip_data)?;
        let extracted = self.extract_driver(&zip_path);
        let _ = fs::remove_file(&zip_path);
        extracted?;

        info!(path = %self.driver_path.display(), "chromedriver downloaded");
        Ok(())
    }

    fn extract_driver(&self, zip_path: &Path) -> Result<()> {
        let binary_name = platform().1;
        let mut archive = zip::ZipArchive::new(fs::File::open(zip_path)?)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            if name.ends_with(&format!("/{binary_name}")) || name == binary_name {
                debug!(entry = %name, "extracting");
                if let Some(parent) = self.driver_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut outfile = fs::File::create(&self.driver_path)?;
                std::io::copy(&mut entry, &mut outfile)?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(&self.driver_path, fs::Permissions::from_mode(0o755))?;
                }

                return Ok(());
            }
        }

        anyhow::bail!("{binary_name} not found in downloaded archive")
    }

    async fn wait_for_readiness(&self, port: u16, timeout_secs: u64) -> bool {
        let client = reqwest::Client::new();
        let url = format!("http://localhost:{port}/status");
        let timeout = tokio::time::Duration::from_secs(timeout_secs);
        let start = tokio::time::Instant::now();

        while start.elapsed() < timeout {
            if let Ok(response) = client.get(&url).send().await {
                if response.status().is_success() {
                    return true;
                }
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        }

        false
    }
}

impl Drop for ChromeDriverManager {
    fn drop(&mut self) {
        if let Ok(mut process_guard) = self.process.try_lock() {
            if let Some(mut child) = process_guard.take() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}
