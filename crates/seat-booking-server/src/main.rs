//! Server implementation

#![warn(missing_docs)]

mod http;
mod settings;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use eyre::{eyre, Result, WrapErr};
use seat_booking_core::{HoldPolicy, RequestHandler};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use settings::Settings;

const DEFAULT_LOG_FILTER: &str = "seat_booking_engine=info,seat_booking_server=info";

/// Command line options
///
/// Every option overrides the corresponding setting from the settings file
/// and the environment.
#[derive(Debug, Default, PartialEq)]
struct Opts {
    /// Settings file to use instead of searching for one
    config: Option<PathBuf>,

    /// Address for the HTTP server to listen on
    host: Option<String>,
    /// Port for the HTTP server to listen on
    port: Option<u16>,
    /// Number of acceptor threads
    acceptor_threads: Option<u32>,
    /// Directory static files are served from
    root: Option<PathBuf>,

    seats: Option<u32>,
    workers: Option<u32>,
    queue_capacity: Option<u32>,
    /// Discard queued requests on shutdown
    no_drain: bool,
    /// Refuse holds on seats held by someone else
    strict_holds: bool,
}

impl Opts {
    fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut opts = Opts::default();

        let mut option: Option<String> = None;
        for arg in args {
            if let Some(opt) = option {
                match opt.as_str() {
                    "-config" => opts.config = Some(PathBuf::from(arg)),
                    "-host" => opts.host = Some(arg),
                    "-port" => {
                        opts.port = Some(arg.parse().wrap_err("-port takes a decimal u16")?)
                    }
                    "-acceptor-threads" => {
                        opts.acceptor_threads = Some(
                            arg.parse()
                                .wrap_err("-acceptor-threads takes a decimal u32")?,
                        )
                    }
                    "-root" => opts.root = Some(PathBuf::from(arg)),
                    "-seats" => {
                        opts.seats = Some(arg.parse().wrap_err("-seats takes a decimal u32")?)
                    }
                    "-workers" => {
                        opts.workers = Some(arg.parse().wrap_err("-workers takes a decimal u32")?)
                    }
                    "-queue-capacity" => {
                        opts.queue_capacity = Some(
                            arg.parse()
                                .wrap_err("-queue-capacity takes a decimal u32")?,
                        )
                    }
                    _ => return Err(eyre!("unknown option {opt}")),
                }
                option = None;
            } else {
                match arg.as_str() {
                    "-no-drain" => opts.no_drain = true,
                    "-strict-holds" => opts.strict_holds = true,
                    _ if arg.starts_with('-') => option = Some(arg),
                    _ => {
                        opts.seats = Some(
                            arg.parse()
                                .wrap_err_with(|| format!("invalid seat count {arg}"))?,
                        )
                    }
                }
            }
        }
        if let Some(opt) = option {
            return Err(eyre!("option {opt} is missing its value"));
        }

        Ok(opts)
    }

    fn apply(self, settings: &mut Settings) {
        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(threads) = self.acceptor_threads {
            settings.acceptor_threads = threads;
        }
        if let Some(root) = self.root {
            settings.root = root;
        }
        if let Some(seats) = self.seats {
            settings.booking.seats = seats;
        }
        if let Some(workers) = self.workers {
            settings.booking.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            settings.booking.queue_capacity = capacity;
        }
        if self.no_drain {
            settings.booking.graceful_shutdown = false;
        }
        if self.strict_holds {
            settings.booking.hold_policy = HoldPolicy::Reject;
        }
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` selects what is logged, `BOOKING_LOG_FORMAT=json` switches to
/// JSON lines.
fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;
    let json = std::env::var("BOOKING_LOG_FORMAT").is_ok_and(|format| format == "json");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_thread_names(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_thread_names(true))
            .try_init()?;
    }
    Ok(())
}

fn http_loop<H: RequestHandler>(
    server: &tiny_http::Server,
    handler: &H,
    root: &Path,
    running: &AtomicBool,
) {
    while running.load(Ordering::SeqCst) {
        match server.recv() {
            Ok(rq) => {
                if let Some(rq) = http::parse(rq, root) {
                    handler.handle(rq);
                }
            }
            Err(_) if !running.load(Ordering::SeqCst) => break,
            Err(err) => error!(error = %err, "HTTP receive failed"),
        }
    }
}

/// Block until the process receives an interrupt
fn wait_for_interrupt() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(tokio::signal::ctrl_c())?;
    Ok(())
}

/// Stop the acceptors: each `unblock` wakes one thread waiting in `recv`
fn stop_acceptors(server: &tiny_http::Server, running: &AtomicBool, threads: u32) {
    running.store(false, Ordering::SeqCst);
    for _ in 0..threads {
        server.unblock();
    }
}

fn main() -> Result<()> {
    init_logging()?;

    let opts = Opts::from_args(std::env::args().skip(1))?;
    let mut settings = Settings::load(opts.config.as_deref())?;
    opts.apply(&mut settings);
    settings.validate()?;
    info!(?settings, "starting");

    let server = tiny_http::Server::http((settings.host.as_str(), settings.port))
        .map_err(|err| eyre!("cannot listen on {}:{}: {err}", settings.host, settings.port))?;

    let dispatcher = seat_booking_engine::launch(&settings.booking)
        .wrap_err("failed to start the seat booking system")?;
    info!(
        host = %settings.host,
        port = settings.port,
        seats = settings.booking.seats,
        workers = settings.booking.workers,
        "listening"
    );

    let running = AtomicBool::new(true);
    let served = thread::scope(|s| -> Result<()> {
        for i in 0..settings.acceptor_threads {
            let spawned = thread::Builder::new()
                .name(format!("acceptor_{i}"))
                .spawn_scoped(s, || {
                    http_loop(&server, &dispatcher, &settings.root, &running)
                });
            if let Err(err) = spawned {
                stop_acceptors(&server, &running, i);
                return Err(err.into());
            }
        }

        let interrupted = wait_for_interrupt();
        info!("shutting down");
        stop_acceptors(&server, &running, settings.acceptor_threads);
        interrupted
    });

    dispatcher.shutdown();
    served
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Result<Opts> {
        Opts::from_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn options_override_settings() {
        let opts = args(&[
            "-port",
            "9000",
            "-workers",
            "8",
            "-queue-capacity",
            "0",
            "-strict-holds",
            "-no-drain",
            "50",
        ])
        .unwrap();
        assert_eq!(opts.port, Some(9000));
        assert_eq!(opts.seats, Some(50));

        let mut settings = Settings::default();
        opts.apply(&mut settings);
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.booking.seats, 50);
        assert_eq!(settings.booking.workers, 8);
        assert_eq!(settings.booking.queue_capacity, 0);
        assert!(!settings.booking.graceful_shutdown);
        assert_eq!(settings.booking.hold_policy, HoldPolicy::Reject);
        assert_eq!(settings.host, "127.0.0.1");
    }

    #[test]
    fn no_options_keep_settings() {
        assert_eq!(args(&[]).unwrap(), Opts::default());
    }

    #[test]
    fn malformed_options_are_errors() {
        assert!(args(&["-frobnicate", "1"]).is_err());
        assert!(args(&["-port"]).is_err());
        assert!(args(&["-port", "eighty"]).is_err());
        assert!(args(&["many"]).is_err());
    }
}
