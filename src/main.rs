//! fwports - port alias and port-range reasoning for firewall zones
//!
//! Command-line front end to the `fwports` library.
//!
//! # Usage
//!
//! ```bash
//! fwports check 8000:8080                  # Is this a valid port range?
//! fwports contains http 1:100 8000:8080    # Is the port inside any range?
//! fwports remove 25 19:88 152:160          # Punch a port out of ranges
//! fwports make 10 20                       # Build a range token
//! fwports aliases www                      # Port number plus all names
//! fwports flatten -p tcp ssh 22 http 81:90 # Minimal equivalent list
//! fwports divide --with-aliases ssh 1:10   # Split ports from ranges
//! fwports config show                      # Print active configuration
//! ```
//!
//! `check` and `contains` exit with status 1 when the answer is "no".

use clap::{Parser, Subcommand};
use fwports::config::{self, AppConfig};
use fwports::core::error::Error;
use fwports::{PortAliases, PortRanges, Protocol, make_range, utils, validators};
use std::process::ExitCode;
use std::sync::Arc;

shadow_rs::shadow!(build);

#[derive(Parser)]
#[command(name = "fwports")]
#[command(version = build::PKG_VERSION, long_version = build::CLAP_LONG_VERSION)]
#[command(about = "Port alias and port-range reasoning for firewall zones", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a token is a valid port range (min:max)
    Check {
        range: String,
    },
    /// Check whether a port (number or name) lies in any of the ranges
    Contains {
        port: String,
        #[arg(required = true)]
        ranges: Vec<String>,
    },
    /// Remove a port from a list of ranges
    Remove {
        port: String,
        ranges: Vec<String>,
    },
    /// Build a range token from two bounds
    Make {
        min: String,
        max: String,
    },
    /// Show the port number and all names of a port
    Aliases {
        port: String,
    },
    /// Flatten a service list into a minimal equivalent list
    Flatten {
        /// Protocol of the service list (TCP and UDP support ranges)
        #[arg(short, long, default_value = "TCP")]
        protocol: String,
        /// Print ports and ranges as a JSON object
        #[arg(long)]
        json: bool,
        tokens: Vec<String>,
    },
    /// Split a service list into single ports and port ranges
    Divide {
        /// Expand every single port to its number and all its names
        #[arg(long)]
        with_aliases: bool,
        /// Print ports and ranges as a JSON object
        #[arg(long)]
        json: bool,
        tokens: Vec<String>,
    },
    /// Show or initialize the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active configuration (including environment overrides)
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(handle_cli(cli.command)) {
        Ok(code) => code,
        Err(e) => {
            let translation = e.translate();
            eprintln!("Error: {}", translation.user_message);
            for suggestion in translation.suggestions {
                eprintln!("  - {suggestion}");
            }
            ExitCode::FAILURE
        }
    }
}

fn answer(yes: bool) -> ExitCode {
    if yes {
        println!("yes");
        ExitCode::SUCCESS
    } else {
        println!("no");
        ExitCode::from(1)
    }
}

fn validation(field: &str, message: String) -> Error {
    Error::Validation {
        field: field.to_string(),
        message,
    }
}

fn print_list(tokens: &[String]) {
    for token in tokens {
        println!("{token}");
    }
}

fn port_ranges(config: &AppConfig) -> fwports::Result<PortRanges> {
    let database = config.open_service_database()?;
    Ok(PortRanges::new(Arc::new(PortAliases::with_database(
        database,
    ))))
}

/// JSON form of `flatten`: a ports/ranges object, or the untouched token
/// array for protocols without port ranges.
fn flatten_json(
    port_ranges: &PortRanges,
    tokens: &[String],
    protocol: &Protocol,
) -> serde_json::Result<String> {
    match port_ranges.flatten(tokens, protocol) {
        Some(collection) => serde_json::to_string_pretty(&collection),
        None => serde_json::to_string_pretty(tokens),
    }
}

async fn handle_cli(command: Commands) -> fwports::Result<ExitCode> {
    let config = config::load_config().await.with_env_overrides();
    utils::init_logging(&config.log_level);

    match command {
        Commands::Check { range } => {
            let valid = match validators::validate_range_token(&range) {
                Ok(_) => true,
                Err(reason) => {
                    tracing::info!("{}", reason);
                    false
                }
            };
            Ok(answer(valid))
        }
        Commands::Contains { port, ranges } => {
            validators::validate_port_token(&port).map_err(|e| validation("port", e))?;
            let port_ranges = port_ranges(&config)?;
            Ok(answer(port_ranges.port_in_ranges(&port, &ranges)))
        }
        Commands::Remove { port, ranges } => {
            let port = validators::validate_port_number(&port).map_err(|e| validation("port", e))?;
            let port_ranges = port_ranges(&config)?;
            print_list(&port_ranges.remove_port_from_ranges(port, &ranges));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Make { min, max } => {
            let min = validators::validate_range_bound(&min).map_err(|e| validation("min", e))?;
            let max = validators::validate_range_bound(&max).map_err(|e| validation("max", e))?;
            let range = make_range(min, max).ok_or_else(|| {
                validation(
                    "port range",
                    format!("cannot build a range from {min} to {max}"),
                )
            })?;
            println!("{range}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Aliases { port } => {
            validators::validate_port_token(&port).map_err(|e| validation("port", e))?;
            let port_ranges = port_ranges(&config)?;
            println!("{}", port_ranges.aliases().service_aliases(&port).join(" "));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Flatten {
            protocol,
            json,
            tokens,
        } => {
            // Parsing never fails: unknown protocols become Protocol::Other
            let protocol: Protocol = protocol
                .parse()
                .unwrap_or_else(|_| Protocol::Other(protocol.clone()));
            let port_ranges = port_ranges(&config)?;
            if json {
                println!("{}", flatten_json(&port_ranges, &tokens, &protocol)?);
            } else {
                print_list(&port_ranges.flatten_services(&tokens, &protocol));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Divide {
            with_aliases,
            json,
            tokens,
        } => {
            let port_ranges = port_ranges(&config)?;
            let collection = port_ranges.divide_ports_and_ranges(&tokens, with_aliases);
            if json {
                println!("{}", serde_json::to_string_pretty(&collection)?);
            } else {
                println!("ports: {}", collection.ports.join(" "));
                println!("ranges: {}", collection.port_ranges.join(" "));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => handle_config(action, &config).await,
    }
}

async fn handle_config(action: ConfigAction, config: &AppConfig) -> fwports::Result<ExitCode> {
    match action {
        ConfigAction::Show => {
            match config::config_path() {
                Some(path) => println!("# {}", path.display()),
                None => println!("# no configuration directory"),
            }
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Init { force } => {
            utils::ensure_dirs()?;
            if !force
                && let Some(path) = config::config_path()
                && tokio::fs::try_exists(&path).await.unwrap_or(false)
            {
                return Err(Error::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            let path = config::save_config(&AppConfig::default()).await?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}
