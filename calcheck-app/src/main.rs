use std::path::Path;

use anyhow::Result;
use calcheck_common::observability::{init_logging, LogConfig};
use calcheck_config::{CalcheckConfig, CalcheckConfigLoader};

mod runner;

const CONFIG_FILE: &str = "calcheck.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    // 1) Load config (env wins); the file is optional and every field has a
    //    default, so a bare `calcheck` invocation still runs.
    let mut loader = CalcheckConfigLoader::new();
    if Path::new(CONFIG_FILE).exists() {
        loader = loader.with_file(CONFIG_FILE);
    }
    let cfg: CalcheckConfig = loader.load()?;

    // 2) Logging; stderr duplication gives the per-step progress lines.
    init_logging(LogConfig {
        emit_stderr: true,
        ..LogConfig::default()
    })?;

    runner::run(&cfg).await?;
    Ok(())
}
