use clap::builder::RangedU64ValueParser;
use clap::Parser;
use log::info;
use std::time::Duration;
use worldsync_server::config::ServerConfig;
use worldsync_server::network::Server;
use worldsync_shared::{DEFAULT_PORT, KEEPALIVE_INTERVAL_SECS, MAX_MOVE_DISTANCE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds between keepalive pings; also the login deadline
    #[arg(short, long, default_value_t = KEEPALIVE_INTERVAL_SECS)]
    keepalive_secs: u64,

    /// Largest distance a single move may cover
    #[arg(short = 'd', long, default_value_t = MAX_MOVE_DISTANCE)]
    max_move_distance: f64,

    /// Chat lines replayed to joining sessions
    #[arg(long, default_value = "100", value_parser = at_least_one())]
    chat_history: usize,

    /// Longest accepted chat line in characters
    #[arg(long, default_value = "256", value_parser = at_least_one())]
    max_chat_length: usize,

    /// Packets buffered per session before deliveries are dropped
    #[arg(long, default_value = "256", value_parser = at_least_one())]
    outbox_capacity: usize,

    /// Seconds between full roster refreshes (0 disables)
    #[arg(long, default_value = "30")]
    roster_secs: u64,
}

fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..)
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            bind_addr: format!("{}:{}", args.host, args.port),
            keepalive_interval: Duration::from_secs(args.keepalive_secs.max(1)),
            max_move_distance: args.max_move_distance,
            chat_history_limit: args.chat_history,
            max_chat_length: args.max_chat_length,
            outbox_capacity: args.outbox_capacity,
            roster_interval: (args.roster_secs > 0).then(|| Duration::from_secs(args.roster_secs)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());
    info!(
        "Keepalive every {:?}, max move distance {}",
        config.keepalive_interval, config.max_move_distance
    );

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
