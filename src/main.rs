// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QKD key generation service
//!
//! Runs the BB84 simulator behind a REST interface, or drives it directly
//! from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! qkd-service serve
//!
//! # Start with custom config
//! qkd-service serve --config /path/to/config.yaml
//!
//! # Generate five 32-bit keys, 500 ms apart
//! qkd-service generate --length 32 --count 5
//!
//! # Check backend health
//! qkd-service health
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qkd_service::{
    backend::{BackendRegistry, HealthStatus},
    config::Config,
    protocol::Bb84Simulator,
    server,
    storage::KeyStore,
    Result, VERSION,
};

/// BB84 quantum key distribution service
#[derive(Parser)]
#[command(name = "qkd-service")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "BB84 key generation on a simulated quantum backend")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// HTTP port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Generate keys locally and print them as JSON
    Generate {
        /// Bits to send per key (configured default when omitted)
        #[arg(short, long)]
        length: Option<usize>,

        /// Number of keys to generate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,

        /// Pause between keys in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,

        /// Seed for choices and measurement sampling
        #[arg(long, env = "QKD_SEED")]
        seed: Option<u64>,

        /// Do not write the latest key to disk
        #[arg(long)]
        no_persist: bool,
    },

    /// Check backend health
    Health {
        /// Specific backend to check
        #[arg(short, long)]
        backend: Option<String>,
    },

    /// List available backends
    Backends,

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging.level, &config.logging.format);

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            config.validate()?;

            let registry = Arc::new(BackendRegistry::from_config(&config.backends)?);

            info!(
                version = VERSION,
                host = %config.server.host,
                port = config.server.port,
                backends = ?registry.list(),
                "Starting QKD service"
            );

            server::run_server(&config, registry).await?;
        }

        Commands::Generate {
            length,
            count,
            interval_ms,
            seed,
            no_persist,
        } => {
            if let Some(seed) = seed {
                config.protocol.seed = Some(seed);
                config.backends.local_simulator.seed = Some(seed);
            }
            if no_persist {
                config.storage.enabled = false;
            }
            config.validate()?;

            let registry = BackendRegistry::from_config(&config.backends)?;
            let simulator = Bb84Simulator::new(registry.get_default()?, &config.protocol);
            let store = KeyStore::from_config(&config.storage);
            let key_length = length.unwrap_or(config.protocol.default_key_length);

            for i in 0..count {
                if i > 0 {
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }

                let record = simulator.generate_key(key_length).await?;
                if let Some(store) = &store {
                    store.save(&record)?;
                }
                println!("{}", serde_json::to_string(&record)?);
            }
        }

        Commands::Health { backend } => {
            let registry = BackendRegistry::from_config(&config.backends)?;

            let names = match backend {
                Some(name) => vec![name],
                None => registry.list(),
            };

            let mut all_healthy = true;
            for name in names {
                match registry.get(&name) {
                    Ok(b) => match b.health_check().await {
                        Ok(status) => {
                            println!("{}: {}", name, status.as_str());
                            if status != HealthStatus::Healthy {
                                all_healthy = false;
                            }
                        }
                        Err(e) => {
                            println!("{}: Error - {}", name, e);
                            all_healthy = false;
                        }
                    },
                    Err(e) => {
                        eprintln!("Backend not found: {}", e);
                        all_healthy = false;
                    }
                }
            }

            if !all_healthy {
                std::process::exit(1);
            }
        }

        Commands::Backends => {
            let registry = BackendRegistry::from_config(&config.backends)?;

            println!("Available backends:");
            for (name, backend_type) in registry.list_with_types() {
                let default_marker = if Some(&name) == registry.default_backend_name().as_ref() {
                    " (default)"
                } else {
                    ""
                };
                println!("  {} [{}]{}", name, backend_type, default_marker);
            }
        }

        Commands::Config => {
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => match config.validate() {
            Ok(()) => {
                println!("Configuration is valid");
            }
            Err(e) => {
                error!(error = %e, "Invalid configuration");
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

/// Initialize logging with tracing. RUST_LOG takes precedence over `level`.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
