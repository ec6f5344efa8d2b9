//! Driver layer for the browser automation behind the verification runner.
//!
//! This crate wraps `fantoccini` with the small set of operations the
//! checklist needs: bounded text-marker waits, scoped element lookups,
//! condition polling, and full-page screenshots.
//!
//! - [`calcheck_browser::driver::CalcheckDriver`]: WebDriver client wrapper
//! - [`calcheck_browser::page::CalcheckPage`]: DOM waits, queries, screenshots
pub mod calcheck_browser;
