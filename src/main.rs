use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use solescout::core::config::{self, ScoutConfig};
use solescout::scraping::SessionDriver;
use solescout::store::{JsonFileStore, ProductSink};
use solescout::{batch, serve};

/// File listing one product URL per line for the default batch mode.
const URL_LIST_PATH: &str = "product_urls.txt";
/// Single-URL mode also drops the record here for piping into other tools.
const SINGLE_OUTPUT_PATH: &str = "product_data.json";

enum Mode {
    Batch { url_list: String },
    Single(String),
    Serve { port: u16 },
}

/// Hand-rolled argument scan. Subcommand first, flags anywhere after.
fn parse_args(args: &[String]) -> anyhow::Result<(Mode, ScoutConfig)> {
    let mut cfg = config::load_scout_config();
    let mut mode = Mode::Batch {
        url_list: URL_LIST_PATH.to_string(),
    };
    let mut rest = args.iter().skip(1).peekable();

    match rest.peek().map(|s| s.as_str()) {
        Some("single") => {
            rest.next();
            let url = rest
                .next()
                .context("usage: solescout single <url>")?
                .clone();
            mode = Mode::Single(url);
        }
        Some("serve") => {
            rest.next();
            mode = Mode::Serve { port: 8000 };
        }
        _ => {}
    }

    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--headless" => cfg.headless = Some(true),
            "--timeout" => {
                let v = rest.next().context("--timeout requires a value in seconds")?;
                cfg.manual_solve_timeout_secs =
                    Some(v.parse().context("--timeout value must be an integer")?);
            }
            "--port" => {
                let v = rest.next().context("--port requires a value")?;
                let p: u16 = v.parse().context("--port value must be a port number")?;
                match &mut mode {
                    Mode::Serve { port } => *port = p,
                    _ => anyhow::bail!("--port is only valid with the serve subcommand"),
                }
            }
            "--urls" => {
                let v = rest.next().context("--urls requires a file path")?;
                match &mut mode {
                    Mode::Batch { url_list } => *url_list = v.clone(),
                    _ => anyhow::bail!("--urls is only valid in batch mode"),
                }
            }
            other => anyhow::bail!(
                "unrecognized argument '{}'\nusage: solescout [single <url> | serve] [--headless] [--timeout <secs>] [--urls <file>] [--port <n>]",
                other
            ),
        }
    }

    Ok((mode, cfg))
}

/// Read the URL list, skipping blank lines and `#` comments.
fn read_url_list(path: &str) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("URL list not found at {} — create it with one product URL per line", path))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Ctrl-C flips the abort flag; in-flight polling loops notice it on their
/// next tick. A second Ctrl-C kills the process the usual way.
fn spawn_abort_watcher() -> Arc<AtomicBool> {
    let abort = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&abort);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received — finishing current step then stopping");
            flag.store(true, Ordering::SeqCst);
        }
    });
    abort
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();
    let (mode, cfg) = parse_args(&args)?;

    match mode {
        Mode::Serve { port } => {
            let store_path = cfg.resolve_store_path();
            serve::run(port, store_path).await
        }
        Mode::Single(url) => {
            let abort = spawn_abort_watcher();
            let driver = SessionDriver::from_config(&cfg, abort)?;
            let record = batch::scrape_product(&driver, &url)
                .await
                .with_context(|| format!("scrape of {} failed", url))?;

            let json = serde_json::to_string_pretty(&record)?;
            println!("{}", json);
            std::fs::write(SINGLE_OUTPUT_PATH, &json)
                .with_context(|| format!("writing {}", SINGLE_OUTPUT_PATH))?;
            info!("💾 product written to {}", SINGLE_OUTPUT_PATH);
            Ok(())
        }
        Mode::Batch { url_list } => {
            let urls = read_url_list(&url_list)?;
            if urls.is_empty() {
                info!("{} contains no URLs — nothing to do", url_list);
                return Ok(());
            }

            let abort = spawn_abort_watcher();
            let driver = SessionDriver::from_config(&cfg, abort)?;
            let mut sink = JsonFileStore::open(cfg.resolve_store_path());
            let before = sink.len();

            let summary = batch::run_batch(&driver, &urls, &mut sink).await?;
            info!(
                "catalog grew from {} to {} products",
                before,
                sink.len()
            );
            if summary.aborted {
                anyhow::bail!(
                    "run aborted by operator after {} of {} URLs",
                    summary.processed,
                    urls.len()
                );
            }
            if summary.failed > 0 && summary.saved == 0 && summary.skipped == 0 {
                anyhow::bail!("all {} URLs failed", summary.failed);
            }
            Ok(())
        }
    }
}
