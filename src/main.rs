//! `fetch-mediator`: load one URL through the router.
//!
//! Streams chunks to stdout when `--chunks` is given, prints the terminal
//! outcome to stderr, cancels on Ctrl-C, and applies config file reloads
//! (e.g. toggling offline mode) while the request is in flight.

use axum::body::Bytes;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use url::Url;

use fetch_mediator::auth::{Authoriser, BearerTokenAuthoriser};
use fetch_mediator::config::{load_config, ConfigWatcher, MediatorConfig};
use fetch_mediator::observability::{logging, metrics};
use fetch_mediator::{Handler, HyperTransport, Request, Response, Router};

#[derive(Parser)]
#[command(name = "fetch-mediator")]
#[command(about = "Load a URL through the request-routing mediator", long_about = None)]
struct Cli {
    /// TOML configuration file (watched for changes).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force cache-only loading.
    #[arg(long)]
    offline: bool,

    /// Request timeout in milliseconds (0 disables it).
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Stream the body to stdout as chunks arrive.
    #[arg(long)]
    chunks: bool,

    /// URL to load.
    url: Url,
}

/// Terminal outcome of the CLI's single request.
enum Outcome {
    Success(Response),
    Failure(Response),
    Cancelled,
}

/// Handler writing the payload to stdout and signalling the terminal event.
struct PrintHandler {
    done: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl PrintHandler {
    fn new(done: oneshot::Sender<Outcome>) -> Self {
        Self {
            done: Mutex::new(Some(done)),
        }
    }

    fn finish(&self, outcome: Outcome) {
        let sender = self.done.lock().ok().and_then(|mut done| done.take());
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }

    fn write(data: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(data).and_then(|_| stdout.flush()) {
            tracing::warn!(error = %e, "Failed to write to stdout");
        }
    }
}

impl Handler for PrintHandler {
    fn successful_response(&self, response: Response) {
        if let Some(body) = response.body() {
            Self::write(body);
        }
        self.finish(Outcome::Success(response));
    }

    fn failed_response(&self, response: Response) {
        self.finish(Outcome::Failure(response));
    }

    fn cancelled_request(&self, _request: Arc<Request>) {
        self.finish(Outcome::Cancelled);
    }

    fn received_data_chunk(&self, data: Bytes, _response: &Response) {
        Self::write(&data);
    }

    fn received_initial_response(&self, response: &Response) {
        tracing::debug!(status = ?response.status(), "Initial response received");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MediatorConfig::default(),
    };
    config.offline |= cli.offline;

    logging::init(&config.observability.log_level)?;

    tracing::info!(
        offline = config.offline,
        authorisers = config.authorisers.len(),
        "fetch-mediator v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let transport = Arc::new(HyperTransport::new(&config.transport, Handle::current()));
    let authorisers = config.authorisers.iter().map(|authoriser| {
        Arc::new(BearerTokenAuthoriser::from_config(authoriser)) as Arc<dyn Authoriser>
    });
    let router = Router::builder()
        .authorisers(authorisers)
        .config(config.clone())
        .build(transport)?;

    // Keep the watcher alive for the duration of the request.
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;
            let router = Arc::downgrade(&router);
            let force_offline = cli.offline;
            tokio::spawn(async move {
                while let Some(mut update) = updates.recv().await {
                    let Some(router) = router.upgrade() else { break };
                    update.offline |= force_offline;
                    router.reload_config(update);
                }
            });
            Some(watcher)
        }
        None => None,
    };

    let timeout = cli
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.requests.default_timeout());
    let request = Request::builder(cli.url)
        .timeout(timeout)
        .chunks(cli.chunks)
        .build();

    let (done_tx, mut done_rx) = oneshot::channel();
    let handler = Arc::new(PrintHandler::new(done_tx));
    let cancel = router.dispatch(&handler, request)?;

    let outcome = tokio::select! {
        outcome = &mut done_rx => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, cancelling request");
            cancel.cancel();
            done_rx.await
        }
    }?;

    Ok(match outcome {
        Outcome::Success(response) => {
            eprintln!("\nstatus: {}", response.status().unwrap_or_default());
            ExitCode::SUCCESS
        }
        Outcome::Failure(response) => {
            match response.error() {
                Some(error) => eprintln!("error: {error}"),
                None => eprintln!("error: request failed"),
            }
            ExitCode::FAILURE
        }
        Outcome::Cancelled => {
            eprintln!("cancelled");
            ExitCode::from(130)
        }
    })
}
