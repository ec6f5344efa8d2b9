//! The verification checklist: navigate, wait for markers, click day 15,
//! confirm the selection, screenshot, close.

use std::path::Path;
use std::time::Duration;

use calcheck_common::{CalcheckError, Result};
use calcheck_config::CalcheckConfig;
use calcheck_drivers::calcheck_browser::driver::CalcheckDriver;
use calcheck_drivers::calcheck_browser::page::CalcheckElement;
use regex::Regex;
use tracing::info;
use url::Url;

const TITLE_MARKER: &str = "React Boxed Calendar";
const MODE_MARKER: &str = "Single Date Selection";
const CALENDAR_CONTAINER: &str = ".bg-white";
const DAY_LABEL: &str = "15";
const SELECTION_PREFIX: &str = "Selected:";
// "Selected:" followed by some content, e.g. "Selected: 6/15/2024".
const SELECTION_PATTERN: &str = r"Selected:\s*\S";

/// Execute the verification checklist against the configured target.
///
/// The browser session is closed on every exit path, including checklist
/// failures; only the checklist outcome is surfaced to the caller.
pub async fn run(cfg: &CalcheckConfig) -> Result<()> {
    let target = Url::parse(&cfg.target.url).map_err(|e| {
        CalcheckError::Config(format!("invalid target url {:?}: {e}", cfg.target.url))
    })?;

    let window = (cfg.browser.window_width, cfg.browser.window_height);
    let mut driver =
        CalcheckDriver::new(&cfg.browser.webdriver_url, cfg.browser.headless, window).await?;

    let outcome = verify_calendar(&mut driver, &target, cfg).await;
    let _ = driver.close().await;
    outcome
}

async fn verify_calendar(
    driver: &mut CalcheckDriver,
    target: &Url,
    cfg: &CalcheckConfig,
) -> Result<()> {
    let marker_timeout = Duration::from_secs(cfg.waits.marker_secs);

    info!(url = %target, "navigating to target");
    let page = driver.goto(target.as_str()).await?;
    info!(title = %page.get_title().await?, "page loaded");

    page.wait_for_text(TITLE_MARKER, marker_timeout).await?;
    info!(marker = TITLE_MARKER, "title found");

    page.wait_for_text(MODE_MARKER, marker_timeout).await?;
    info!(marker = MODE_MARKER, "single date selection found");

    // Day buttons are looked up inside the first calendar container so other
    // widgets on the page cannot match.
    let calendar = page.find_element(CALENDAR_CONTAINER, marker_timeout).await?;
    let buttons = calendar.find_buttons_labeled(DAY_LABEL).await?;

    match first_visible(&buttons).await? {
        Some(button) => {
            button.click().await?;
            info!(day = DAY_LABEL, "clicked day");

            let pattern = Regex::new(SELECTION_PATTERN)
                .map_err(|e| CalcheckError::Config(format!("bad selection pattern: {e}")))?;
            let selection = page
                .wait_for_text_matching(
                    SELECTION_PREFIX,
                    &pattern,
                    Duration::from_millis(cfg.waits.selection_ms),
                    Duration::from_millis(cfg.waits.poll_ms),
                )
                .await?;
            // Observed, not compared against an expected date.
            info!(selection = %selection, "selection text");
        }
        None => {
            info!(day = DAY_LABEL, "day not visible (maybe end of month?), skipping click");
        }
    }

    let png = page.screenshot_full_page().await?;
    write_screenshot(Path::new(&cfg.screenshot.path), &png)?;
    info!(path = %cfg.screenshot.path, bytes = png.len(), "screenshot saved");

    Ok(())
}

/// First button that reports as rendered visible, if any.
async fn first_visible(buttons: &[CalcheckElement]) -> Result<Option<&CalcheckElement>> {
    for button in buttons {
        if button.is_displayed().await? {
            return Ok(Some(button));
        }
    }
    Ok(None)
}

/// Write the screenshot, creating parent directories and overwriting any
/// artifact from a previous run.
fn write_screenshot(path: &Path, png: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| CalcheckError::Screenshot {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    std::fs::write(path, png).map_err(|source| CalcheckError::Screenshot {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_pattern_requires_content_after_prefix() {
        let re = Regex::new(SELECTION_PATTERN).unwrap();
        assert!(re.is_match("Selected: 6/15/2024"));
        assert!(re.is_match("Selected: None"));
        assert!(re.is_match("Some label\nSelected: 2024-06-15"));
        assert!(!re.is_match("Selected:"));
        assert!(!re.is_match("Selected:   "));
        assert!(!re.is_match("nothing relevant"));
    }

    #[test]
    fn screenshot_write_creates_parents() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("verification/calendar_verification.png");

        write_screenshot(&path, b"png-bytes").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
    }

    #[test]
    fn screenshot_write_overwrites_previous_artifact() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("calendar_verification.png");

        write_screenshot(&path, b"first run").unwrap();
        write_screenshot(&path, b"second run").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second run");
    }

    #[test]
    fn bad_target_url_is_a_config_error() {
        let mut cfg = calcheck_config::CalcheckConfig::default();
        cfg.target.url = "not a url".into();

        let err = block_on(run(&cfg));
        assert!(matches!(err, Err(CalcheckError::Config(_))));
    }

    // Tiny current-thread runtime so the URL-validation path is testable
    // without a WebDriver endpoint.
    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }
}
