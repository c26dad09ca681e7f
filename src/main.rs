//! Command-line rover client.
//!
//! ```text
//! rover-link <host> <port> [--debug] [--config <file>]
//! ```
//!
//! `--config` loads [`ClientOptions`] from JSON; `host` and `port` on the
//! command line take precedence. `RUST_LOG` overrides the log filter.

// ============================================================================
// Imports
// ============================================================================

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rover_link::{Client, ClientOptions};

// ============================================================================
// Constants
// ============================================================================

const USAGE: &str = "usage: rover-link <host> <port> [--debug] [--config <file>]";

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    host: String,
    port: u16,
    debug: bool,
    config: Option<String>,
}

impl Args {
    /// Parses `argv` without the program name.
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut positional = Vec::new();
        let mut debug = false;
        let mut config = None;

        let mut argv = argv.into_iter();
        while let Some(arg) = argv.next() {
            match arg.as_str() {
                "--debug" => debug = true,
                "--config" => {
                    config = Some(argv.next().ok_or("--config needs a file path")?);
                }
                flag if flag.starts_with("--") => return Err(format!("unknown flag `{flag}`")),
                _ => positional.push(arg),
            }
        }

        let [host, port] = <[String; 2]>::try_from(positional)
            .map_err(|_| "expected exactly <host> and <port>".to_owned())?;
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid port `{port}`: {e}"))?;

        Ok(Self {
            host,
            port,
            debug,
            config,
        })
    }
}

// ============================================================================
// Functions
// ============================================================================

fn init_logging(debug: bool) {
    let default = if debug {
        "rover_link=debug"
    } else {
        "rover_link=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> rover_link::Result<()> {
    let options = match &args.config {
        Some(path) => ClientOptions::from_json_file(path)?,
        None => ClientOptions::default(),
    };

    let client = Client::builder()
        .options(options)
        .host(args.host)
        .port(args.port)
        .build()?;

    let session = client.connect().await?;
    let summary = session.run().await?;

    info!(
        frames = summary.frames,
        rejected = summary.rejected_frames,
        commands = summary.commands_sent,
        runs = summary.scores.len(),
        "Run summary"
    );
    for (timestamp, score) in &summary.scores {
        info!(timestamp, score, "Score");
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(args.debug);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Session failed");
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| (*a).to_owned()).collect()
    }

    #[test]
    fn test_parse_host_and_port() {
        let args = Args::parse(argv(&["localhost", "17676"])).unwrap();
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 17676);
        assert!(!args.debug);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_parse_flags_anywhere() {
        let args = Args::parse(argv(&["--debug", "h", "--config", "c.json", "1"])).unwrap();
        assert!(args.debug);
        assert_eq!(args.config.as_deref(), Some("c.json"));
        assert_eq!((args.host.as_str(), args.port), ("h", 1));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Args::parse(argv(&[])).is_err());
        assert!(Args::parse(argv(&["h"])).is_err());
        assert!(Args::parse(argv(&["h", "1", "extra"])).is_err());
        assert!(Args::parse(argv(&["h", "port"])).is_err());
        assert!(Args::parse(argv(&["h", "70000"])).is_err());
        assert!(Args::parse(argv(&["h", "1", "--config"])).is_err());
        assert!(Args::parse(argv(&["h", "1", "--verbose"])).is_err());
    }
}
