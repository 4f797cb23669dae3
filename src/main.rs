//! Main entry point for the cdn-resolver CLI

use anyhow::Context;
use cdn_resolver::cli::{Args, OutputFormatter, PayloadInput, VerbosityLevel};
use cdn_resolver::platform::{PlayerClient, ScriptSource, StaticScript};
use cdn_resolver::{ResolveError, Resolver};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbosity_level());
    debug!("Starting cdn-resolver with args: {:?}", args);

    let formatter = OutputFormatter::new(args.verbosity_level());
    if let Err(error) = run(&args, &formatter).await {
        formatter.error(&format!("{:#}", error));

        let stale = error
            .downcast_ref::<ResolveError>()
            .is_some_and(ResolveError::is_stale_key);
        if stale {
            formatter.warning("the player key has likely rotated; check the variant or script");
        }
        std::process::exit(1);
    }
}

async fn run(args: &Args, formatter: &OutputFormatter) -> anyhow::Result<()> {
    let variant = args.player_variant();
    let resolver = Resolver::with_source(script_source(args)?)
        .with_refresh_on_stale_key(!args.no_refresh);

    if args.table_only {
        let table = resolver.find_table(variant).await?;
        formatter.print_table_summary(&table);
        formatter.print_json(&table, args.pretty)?;
        return Ok(());
    }

    let text = args
        .read_payload()?
        .context("no payload given; pass it as an argument, '-' for stdin, or --payload-file")?;

    let start_time = Instant::now();
    match PayloadInput::parse(&text)? {
        PayloadInput::Raw(encrypted) => {
            formatter.info(&format!("resolving raw payload for {} player", variant));
            let sources = resolver.get_cdn(&encrypted, variant).await?;
            formatter.print_json(&sources, args.pretty)?;
        }
        PayloadInput::Response(response) => {
            formatter.info(&format!("resolving getSources response for {} player", variant));
            let resolved = resolver.resolve_response(response, variant).await?;
            formatter.print_json(&resolved, args.pretty)?;
        }
    }

    formatter.success(&format!(
        "decrypted in {:.3}s",
        start_time.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// Local script file when given, HTTP otherwise
fn script_source(args: &Args) -> anyhow::Result<Arc<dyn ScriptSource>> {
    if let Some(path) = &args.script {
        let script = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read player script {}", path.display()))?;
        return Ok(Arc::new(StaticScript::new(script)));
    }

    let mut client = PlayerClient::with_config(args.http_config())?;
    if let Some(url) = &args.player_url {
        client = client.with_script_url(args.player_variant(), url)?;
    }
    Ok(Arc::new(client))
}

/// Initialize logging system
fn init_logging(verbosity: VerbosityLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
