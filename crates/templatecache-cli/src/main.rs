//! templatecache - sync, inspect and verify the localized template cache.
//!
//! Usage:
//!   templatecache [--lang CODE] [--user ID] [--force] [--verify]
//!   templatecache --clear [--user ID]
//!   templatecache --clear-all

use std::io;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use templatecache_core::{
    Config, HttpCatalog, Language, Scope, ScopeProvider, SessionScope, TemplateCache,
    TemplateFetcher, TemplateSync,
};

/// Directory for an optional rolling log file
const LOG_DIR_VAR: &str = "TEMPLATECACHE_LOG_DIR";

#[derive(Debug, Default)]
struct Options {
    language: Option<String>,
    user: Option<String>,
    force: bool,
    verify: bool,
    clear: bool,
    clear_all: bool,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Options::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--lang" => options.language = Some(value(&mut args, "--lang")?),
                "--user" => options.user = Some(value(&mut args, "--user")?),
                "--force" => options.force = true,
                "--verify" => options.verify = true,
                "--clear" => options.clear = true,
                "--clear-all" => options.clear_all = true,
                other => bail!("Unknown argument: {}", other),
            }
        }
        Ok(options)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow::anyhow!("{} requires a value", flag))
}

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must live until exit.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match std::env::var(LOG_DIR_VAR) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "templatecache.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    let options = Options::parse(std::env::args().skip(1))?;

    let config = Config::load()?;
    let cache = Arc::new(TemplateCache::new(config.cache_dir()?, config.asset_version.clone())?);
    let scope = SessionScope::new(match options.user.clone() {
        Some(id) => Scope::User(id),
        None => Scope::Guest,
    });

    if options.clear_all {
        cache.clear_all();
        eprintln!("Cleared cached templates for all scopes");
        return Ok(());
    }

    let catalog = HttpCatalog::new(&config)?;
    let sync = TemplateSync::new(
        TemplateFetcher::new(Arc::new(catalog)),
        Arc::clone(&cache),
        scope.clone(),
        config.sync_settings(),
    );

    if options.clear {
        sync.clear_current_scope();
        eprintln!("Cleared cached templates for {}", scope.current_scope());
        return Ok(());
    }

    let language = options
        .language
        .clone()
        .unwrap_or_else(|| config.default_language.code().to_string());
    let resolved = Language::parse(&language).unwrap_or(config.default_language);
    if let Some(age) = cache.age(&scope.current_scope(), resolved) {
        info!(lang = %resolved, age_minutes = age.num_minutes(), "Existing cache entry");
    }

    let templates = sync.templates(&language, options.force).await?;
    eprintln!("{} templates ({})", templates.len(), resolved);

    if options.verify {
        let summary = sync.verify_assets(&templates).await;
        summary.log();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&templates)?);
    }

    // Stale hits refresh in the background; let that land before the runtime stops.
    sync.wait_background().await;

    Ok(())
}
