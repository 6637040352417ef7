//! BlueChat node binary.
//!
//! # Usage
//!
//! ```bash
//! # First run: create the local identity
//! bluechat --name Ana --area-code 11 --phone 912345678
//!
//! # Later runs reuse the stored identity
//! bluechat --data-dir ~/.bluechat
//! ```

use std::{net::Ipv4Addr, path::PathBuf, time::Duration};

use bluechat_core::{ChatService, CoreConfig, Environment, Storage, UnsupportedScanner};
use bluechat_node::{
    DEFAULT_GROUP, DEFAULT_PORT, NodeConfig, NodeError, RedbStorage, Runtime, SystemEnv, UdpLink,
};
use bluechat_proto::Profile;
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// BlueChat peer-to-peer chat node
#[derive(Parser, Debug)]
#[command(name = "bluechat")]
#[command(about = "Peer-to-peer chat over a local multicast group")]
#[command(version)]
struct Args {
    /// Multicast group address
    #[arg(long, default_value_t = DEFAULT_GROUP)]
    group: Ipv4Addr,

    /// Multicast port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory for the local database
    #[arg(short, long, default_value = ".bluechat")]
    data_dir: PathBuf,

    /// Display name (first run only)
    #[arg(long)]
    name: Option<String>,

    /// Two-digit area code (first run only)
    #[arg(long)]
    area_code: Option<String>,

    /// Phone number, at least 8 digits (first run only)
    #[arg(long)]
    phone: Option<String>,

    /// Seconds of silence before a typing indicator is withdrawn
    #[arg(long, default_value = "2")]
    typing_timeout: u64,

    /// Start with the radio off
    #[arg(long)]
    radio_off: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn node_config(&self) -> NodeConfig {
        NodeConfig {
            group: self.group,
            port: self.port,
            data_dir: self.data_dir.clone(),
            radio_on_start: !self.radio_off,
            core: CoreConfig {
                typing_idle_timeout: Duration::from_secs(self.typing_timeout),
                ..CoreConfig::default()
            },
            ..NodeConfig::default()
        }
    }

    fn profile(&self) -> Result<Profile, NodeError> {
        let (Some(name), Some(area), Some(phone)) = (&self.name, &self.area_code, &self.phone) else {
            return Err(NodeError::Config(
                "no identity stored yet: pass --name, --area-code and --phone".to_owned(),
            ));
        };
        Profile::new(name, area, phone).map_err(|err| NodeError::Core(err.into()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout belongs to the conversation
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let config = args.node_config();
    std::fs::create_dir_all(&config.data_dir)?;
    let storage = RedbStorage::open(config.database_path())?;
    let env = SystemEnv::new();

    if storage.load_identity()?.is_none() {
        let identity = ChatService::<SystemEnv, RedbStorage, UdpLink>::onboard(&env, &storage, args.profile()?)?;
        tracing::info!(peer = %identity.id, handle = %identity.phone_handle, "identity created");
    }

    let link = UdpLink::bind(config.group, config.port, env.random_u64())?;
    tracing::info!("joined {}:{} from {}", config.group, config.port, link.local_addr()?);

    let mut service = ChatService::start(env.clone(), storage, link, config.core.clone())?;
    if config.radio_on_start {
        service.set_radio(true);
    }

    let runtime = Runtime::new(service, env, UnsupportedScanner, config.tick_interval);
    runtime.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    tracing::info!("bye");
    Ok(())
}
