use clap::{Parser, Subcommand};
use sd_core::calendar::calendar_from_env;
use sd_core::config::{parse_hhmm, LifecycleConfig, SlotSearchConfig};
use sd_core::extract::default_extractor;
use sd_events::NotificationBus;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Parser)]
#[command(name = "slated")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Serve,
    Openapi,
    Completions { shell: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve => {
            init_tracing();
            sd_serve::openapi::ensure_initialized();
            let port = env_parse("SLATED_PORT", 5001u16);
            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
            let state = sd_serve::build_state(
                NotificationBus::new(1024),
                lifecycle_from_env(),
                search_from_env(),
                calendar_from_env(),
                default_extractor(),
            );
            let sweep_secs = env_parse("SLATED_SWEEP_INTERVAL_SECS", 5u64);
            let sweep_state = state.clone();
            tokio::spawn(async move { sd_serve::sweeper::run(sweep_state, sweep_secs).await });
            if let Err(err) = sd_serve::serve(state, addr).await {
                eprintln!("serve error: {err}");
            }
        }
        Command::Openapi => {
            let spec = sd_serve::openapi::generate_spec();
            println!("{}", spec);
        }
        Command::Completions { shell: _ } => {
            // Placeholder until clap completions are wired.
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn lifecycle_from_env() -> LifecycleConfig {
    LifecycleConfig {
        ttl: chrono::Duration::seconds(env_parse("SLATED_TTL_SECS", 300)),
        retention: chrono::Duration::seconds(env_parse("SLATED_RETENTION_SECS", 3600)),
    }
}

fn search_from_env() -> SlotSearchConfig {
    let defaults = SlotSearchConfig::default();
    SlotSearchConfig {
        step_minutes: env_parse("SLATED_SLOT_STEP_MINS", defaults.step_minutes),
        business_start_min: env_hhmm("SLATED_BUSINESS_START", defaults.business_start_min),
        business_end_min: env_hhmm("SLATED_BUSINESS_END", defaults.business_end_min),
        max_suggestions: env_parse("SLATED_MAX_SUGGESTIONS", defaults.max_suggestions),
        horizon_days: env_parse("SLATED_HORIZON_DAYS", defaults.horizon_days),
        utc_offset_minutes: env_parse("SLATED_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes),
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_hhmm(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|value| parse_hhmm(&value))
        .unwrap_or(default)
}
