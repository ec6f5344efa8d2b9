use crate::calcheck_browser::page::CalcheckPage;
use anyhow::{Context, Result};
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::collections::HashMap;
use webdriver::capabilities::Capabilities;

/// Thin wrapper around a `fantoccini` WebDriver client scoped to one
/// verification run.
pub struct CalcheckDriver {
    pub client: Client,
}

/// Chrome command-line arguments for a verification session.
pub fn build_chrome_arguments(headless: bool, window: (u32, u32)) -> Vec<String> {
    let mut args = vec![
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        format!("--window-size={},{}", window.0, window.1),
    ];
    if headless {
        args.push("--headless".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

impl CalcheckDriver {
    /// Create a new driver connected to a running WebDriver service
    /// (chromedriver serves `http://localhost:9515` by default).
    pub async fn new(webdriver_url: &str, headless: bool, window: (u32, u32)) -> Result<Self> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();
        chrome_opts.insert(
            "args".to_string(),
            json!(build_chrome_arguments(headless, window)),
        );
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .with_context(|| format!("failed to connect to WebDriver at {webdriver_url}"))?;

        Ok(Self { client })
    }

    /// Navigate to `url` and return a [`CalcheckPage`] for the new document.
    pub async fn goto(&mut self, url: &str) -> Result<CalcheckPage> {
        let mut page = CalcheckPage::new(self.client.clone());
        page.goto(url).await?;
        Ok(page)
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_adds_headless_flags() {
        let args = build_chrome_arguments(true, (1280, 720));
        assert!(args.iter().any(|a| a == "--headless"));
        assert!(args.iter().any(|a| a == "--disable-gpu"));
        assert!(args.iter().any(|a| a == "--window-size=1280,720"));
    }

    #[test]
    fn headed_omits_headless_flags() {
        let args = build_chrome_arguments(false, (1920, 1080));
        assert!(!args.iter().any(|a| a == "--headless"));
        assert!(args.iter().any(|a| a == "--window-size=1920,1080"));
    }
}
