use anyhow::{bail, Context, Result};
use fantoccini::{elements::Element, Client, Locator};
use regex::Regex;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// High-level page wrapper providing the waits and element queries the
/// verification checklist needs. Locators are re-resolved against the live
/// DOM on each use.
pub struct CalcheckPage {
    pub(crate) client: Client,
}

impl CalcheckPage {
    /// Construct a page wrapper around an existing WebDriver client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Navigate to `url`, blocking until the navigation settles.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))
    }

    /// Return the page title.
    pub async fn get_title(&self) -> Result<String> {
        self.client.title().await.map_err(anyhow::Error::from)
    }

    /// Block until `marker` appears anywhere in the rendered DOM, or fail
    /// after `timeout`.
    pub async fn wait_for_text(&self, marker: &str, timeout: Duration) -> Result<()> {
        let xpath = text_marker_xpath(marker);
        self.client
            .wait()
            .at_most(timeout)
            .for_element(Locator::XPath(&xpath))
            .await
            .with_context(|| format!("text marker {marker:?} did not appear within {timeout:?}"))?;
        Ok(())
    }

    /// Find the first element matching a CSS selector, waiting up to
    /// `timeout` for it to exist.
    pub async fn find_element(&self, selector: &str, timeout: Duration) -> Result<CalcheckElement> {
        let element = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
            .with_context(|| format!("no element matched selector {selector:?}"))?;
        Ok(CalcheckElement::new(element))
    }

    /// Poll the live DOM until an element containing `marker` carries text
    /// matching `pattern`, and return that text. Fails after `timeout`.
    pub async fn wait_for_text_matching(
        &self,
        marker: &str,
        pattern: &Regex,
        timeout: Duration,
        poll: Duration,
    ) -> Result<String> {
        let xpath = text_marker_xpath(marker);
        let deadline = Instant::now() + timeout;
        loop {
            for element in self.client.find_all(Locator::XPath(&xpath)).await? {
                let text = element.text().await.unwrap_or_default();
                if pattern.is_match(&text) {
                    return Ok(text);
                }
                debug!(target: "browser.wait", %text, "marker content not yet matching");
            }
            if Instant::now() >= deadline {
                bail!("no element containing {marker:?} matched `{pattern}` within {timeout:?}");
            }
            sleep(poll).await;
        }
    }

    /// Capture the entire scrollable document, not just the viewport.
    ///
    /// WebDriver screenshots are viewport-sized, so the window is first grown
    /// to the document's scroll dimensions.
    pub async fn screenshot_full_page(&self) -> Result<Vec<u8>> {
        let size = self
            .client
            .execute(
                "return [document.documentElement.scrollWidth, document.documentElement.scrollHeight];",
                vec![],
            )
            .await
            .context("failed to read document dimensions")?;
        if let Some((width, height)) = parse_document_size(&size) {
            self.client.set_window_size(width, height).await?;
        }
        self.client.screenshot().await.map_err(anyhow::Error::from)
    }
}

/// Wrapper for DOM elements providing the helpers the checklist needs.
pub struct CalcheckElement {
    pub element: Element,
}

impl CalcheckElement {
    /// Construct an element wrapper.
    pub fn new(element: Element) -> Self {
        Self { element }
    }

    /// Find child buttons whose accessible label equals `label`.
    pub async fn find_buttons_labeled(&self, label: &str) -> Result<Vec<CalcheckElement>> {
        let xpath = button_label_xpath(label);
        let elements = self.element.find_all(Locator::XPath(&xpath)).await?;
        Ok(elements.into_iter().map(CalcheckElement::new).collect())
    }

    /// Whether the element is rendered visible.
    pub async fn is_displayed(&self) -> Result<bool> {
        self.element.is_displayed().await.map_err(anyhow::Error::from)
    }

    /// Click the element with a native event.
    pub async fn click(&self) -> Result<()> {
        self.element.click().await.map_err(anyhow::Error::from)
    }
}

/// XPath matching elements that own a text node containing `marker`.
///
/// Matching on `text()` rather than the element's full string value keeps the
/// hit on the element that actually renders the fragment instead of every
/// ancestor up to `<html>`.
fn text_marker_xpath(marker: &str) -> String {
    format!("//*[text()[contains(., {})]]", xpath_literal(marker))
}

/// Relative XPath for buttons whose normalized text equals `label`.
fn button_label_xpath(label: &str) -> String {
    format!(".//button[normalize-space(.)={}]", xpath_literal(label))
}

/// Quote `s` as an XPath string literal. XPath 1.0 has no escape syntax, so
/// strings containing both quote kinds fall back to `concat()`.
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(r#", "'", "#))
    }
}

/// Extract `[scrollWidth, scrollHeight]` from a script result.
fn parse_document_size(v: &Value) -> Option<(u32, u32)> {
    let arr = v.as_array()?;
    let width = as_dimension(arr.first()?)?;
    let height = as_dimension(arr.get(1)?)?;
    Some((width.max(1) as u32, height.max(1) as u32))
}

fn as_dimension(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_f64().map(|f| f.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn marker_xpath_targets_owning_element() {
        assert_eq!(
            text_marker_xpath("Single Date Selection"),
            "//*[text()[contains(., 'Single Date Selection')]]"
        );
    }

    #[test]
    fn button_xpath_uses_normalized_label() {
        assert_eq!(
            button_label_xpath("15"),
            ".//button[normalize-space(.)='15']"
        );
    }

    #[test]
    fn xpath_literal_prefers_single_quotes() {
        assert_eq!(xpath_literal("plain"), "'plain'");
    }

    #[test]
    fn xpath_literal_switches_to_double_quotes() {
        assert_eq!(xpath_literal("it's"), "\"it's\"");
    }

    #[test]
    fn xpath_literal_concats_mixed_quotes() {
        assert_eq!(
            xpath_literal(r#"it's a "day""#),
            r#"concat('it', "'", 's a "day"')"#
        );
    }

    #[test]
    fn parses_integer_document_size() {
        assert_eq!(parse_document_size(&json!([1280, 2400])), Some((1280, 2400)));
    }

    #[test]
    fn parses_fractional_document_size() {
        assert_eq!(parse_document_size(&json!([1280.0, 2400.5])), Some((1280, 2401)));
    }

    #[test]
    fn rejects_malformed_document_size() {
        assert_eq!(parse_document_size(&json!("nope")), None);
        assert_eq!(parse_document_size(&json!([1280])), None);
        assert_eq!(parse_document_size(&json!(["a", "b"])), None);
    }

    #[test]
    fn zero_dimensions_are_clamped() {
        assert_eq!(parse_document_size(&json!([0, 0])), Some((1, 1)));
    }
}
