mod chunk;
mod config;
mod fetch;
mod host;
mod monitor;
mod probe;
mod retry;
mod sink;

use chunk::ChunkForwarder;
use clap::{CommandFactory, Parser};
use config::{HarnessConfig, SinkKind};
use fetch::HttpFetcher;
use monitor::PollDiffMonitor;
use retry::RetryPolicy;
use sink::{Sink, TraceSink, WriterSink};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Poll a growing text resource and forward every new line to a sink in
/// line-safe chunks.
#[derive(Parser, Debug)]
#[command(name = "tailforward", version, about)]
pub struct Cli {
    /// URL of the resource to monitor
    #[arg(value_name = "RESOURCE")]
    resource: Option<String>,

    /// Config file path
    #[arg(short, long, default_value = "tailforward.toml")]
    config: PathBuf,

    /// Poll interval in milliseconds (overrides config)
    #[arg(long)]
    interval: Option<u64>,

    /// Fetch timeout in milliseconds (overrides config)
    #[arg(long)]
    timeout: Option<u64>,

    /// Maximum chunk size in characters (overrides config)
    #[arg(long)]
    chunk_limit: Option<usize>,

    /// Retries per failed poll before giving up (overrides config)
    #[arg(long)]
    retries: Option<u32>,

    /// Where forwarded text goes (overrides config)
    #[arg(long, value_enum)]
    sink: Option<SinkKind>,

    /// Skip the byte-range capability probe
    #[arg(long)]
    no_probe: bool,

    /// Exit 1 if ARG names a resource this tool can monitor, -1 otherwise
    #[arg(long, value_name = "ARG", num_args = 0.., allow_hyphen_values = true)]
    identify: Option<Vec<String>>,

    /// Print capability metadata and exit
    #[arg(long)]
    info: bool,

    /// Validate config and print resolved settings, don't run
    #[arg(long)]
    dry_run: bool,

    /// Log full error detail and range probe headers
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    fn apply_overrides(&self, config: &mut HarnessConfig) {
        if let Some(ms) = self.interval {
            config.monitor.poll_interval_ms = ms;
        }
        if let Some(ms) = self.timeout {
            config.fetch.timeout_ms = ms;
        }
        if let Some(limit) = self.chunk_limit {
            config.forward.chunk_limit = limit;
        }
        if let Some(retries) = self.retries {
            config.retry.max_retries = retries;
        }
        if let Some(sink) = self.sink {
            config.forward.sink = sink;
        }
        if self.verbose {
            config.monitor.verbose = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.info {
        for line in host::CAPABILITIES {
            println!("{line}");
        }
        return ExitCode::SUCCESS;
    }

    if let Some(args) = &cli.identify {
        std::process::exit(host::identify(&args.join(" ")));
    }

    let default_filter = if cli.verbose {
        "tailforward=debug"
    } else {
        "tailforward=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let mut config = match HarnessConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        tracing::error!("{e}");
        return ExitCode::FAILURE;
    }

    if cli.dry_run {
        println!("Config file: {}", cli.config.display());
        println!("{config:#?}");
        return ExitCode::SUCCESS;
    }

    let Some(url) = cli.resource.clone() else {
        let _ = Cli::command().print_help();
        return ExitCode::from(2);
    };

    run(&url, &config, !cli.no_probe).await
}

/// Wire the collaborators together and monitor `url` until a fatal fetch
/// failure or Ctrl-C.
async fn run(url: &str, config: &HarnessConfig, range_probe: bool) -> ExitCode {
    let verbose = config.monitor.verbose;

    let forwarder = match ChunkForwarder::new(config.forward.chunk_limit, config.forward.overflow) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let fetcher = match HttpFetcher::new(
        url,
        config.fetch_timeout(),
        config.fetch.accept_invalid_certs,
    ) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("{}", e.describe(verbose));
            return ExitCode::FAILURE;
        }
    };
    let mut sink: Box<dyn Sink> = match config.forward.sink {
        SinkKind::Stdout => Box::new(WriterSink::stdout()),
        SinkKind::Trace => Box::new(TraceSink),
    };

    tracing::info!(
        url = fetcher.url(),
        poll_interval_ms = config.monitor.poll_interval_ms,
        chunk_limit = forwarder.limit(),
        "monitoring"
    );

    if range_probe {
        if let Err(e) = probe::supports_partial_content(&fetcher, verbose).await {
            tracing::error!("{}", e.describe(verbose));
            return finish(url, sink.as_mut(), ExitCode::FAILURE);
        }
    }

    let retry = RetryPolicy::new(
        config.retry.max_retries,
        Duration::from_millis(config.retry.initial_delay_ms),
        Duration::from_millis(config.retry.max_delay_ms),
    );
    let mut monitor =
        PollDiffMonitor::new(forwarder, config.poll_interval(), verbose).with_retry(retry);

    let code = tokio::select! {
        // The error was already logged by the monitor
        result = monitor.run(&fetcher, &mut sink) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            ExitCode::SUCCESS
        }
    };
    finish(url, sink.as_mut(), code)
}

/// Emit the terminal message to both the sink and the log.
fn finish(url: &str, sink: &mut dyn Sink, code: ExitCode) -> ExitCode {
    let message = format!("--- monitoring of '{url}' ended ---");
    sink.accept(&format!("{message}\n"));
    tracing::info!("{message}");
    code
}
