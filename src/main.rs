use anyhow::Result;
use chrono::Utc;
use clap::{ArgGroup, Parser};
use log::{debug, error, info};
use std::io;
use std::process::ExitCode;
use std::time::Duration;

use serialshark::device::serial::{list_ports, select_port};
use serialshark::device::{CancelToken, Handshake, SerialConnector};
use serialshark::models::address::AddressPair;
use serialshark::models::config::CaptureConfig;
use serialshark::models::filter::FilterSelection;
use serialshark::models::settings::{
    ProtocolSettings, DEFAULT_BAUD_RATE, DEFAULT_MAX_CHANNEL, FIRMWARE_MAX_CHANNEL,
};
use serialshark::protocol::filter::MNEMONICS;
use serialshark::protocol::{build_command, encode_address, encode_address_any, encode_filter, AddressLength};
use serialshark::relay::{self, DEFAULT_VIEWER};
use serialshark::utils::error::{EncodeError, HandshakeError};
use serialshark::utils::logging;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Pipes a WiFiPcap capture into Wireshark",
    after_help = filter_help()
)]
#[clap(group(ArgGroup::new("address").args(["mac", "oui", "clear_address"])))]
#[clap(group(ArgGroup::new("filter").args(["filter_mask", "filter_all", "filter_all_good", "filter_connection"])))]
struct Args {
    /// Full device path of the serial port the sniffer is attached to
    #[clap(short, long)]
    port: Option<String>,

    /// Select/change WiFi channel
    #[clap(short, long, visible_alias = "ch", value_parser = clap::value_parser!(u8).range(1..=FIRMWARE_MAX_CHANNEL as i64))]
    channel: Option<u8>,

    /// Highest channel permitted in your region
    #[clap(long, default_value_t = DEFAULT_MAX_CHANNEL)]
    max_channel: u8,

    /// No time sync between host and device
    #[clap(short = 'n', long)]
    no_time_sync: bool,

    /// MAC, 6 bytes of a source or destination address of interest, e.g. "24:0a:c4:12:34:56"
    #[clap(short, long)]
    mac: Option<String>,

    /// OUI, first 3 bytes of a source or destination address of interest
    #[clap(short, long)]
    oui: Option<String>,

    /// Clear an address filter uploaded by an earlier session
    #[clap(long)]
    clear_address: bool,

    /// With --mac or --oui, also capture this multicast address (3 or 6 bytes)
    #[clap(short = 'u', long, requires = "address")]
    multicast: Option<String>,

    /// With --mac or --oui, also capture broadcast frames
    #[clap(long, conflicts_with = "multicast", requires = "address")]
    broadcast: bool,

    /// Filter mask expression, mnemonics joined with '|'. See the list below.
    #[clap(short, long)]
    filter_mask: Option<String>,

    /// Capture all packets possible, including control frames
    #[clap(short = 'a', long)]
    filter_all: bool,

    /// Capture all packets except those with a bad FCS
    #[clap(long)]
    filter_all_good: bool,

    /// Capture AP connection and data related packets
    #[clap(long)]
    filter_connection: bool,

    /// Serial bit rate
    #[clap(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Give up if the device does not answer within this many seconds (default: wait forever)
    #[clap(long, value_name = "SECS")]
    ready_timeout: Option<u64>,

    /// Viewer command; it reads the pcap stream on stdin
    #[clap(long, default_value = DEFAULT_VIEWER)]
    viewer: String,

    /// Write the pcap stream to stdout instead of starting a viewer
    #[clap(long)]
    stdout: bool,

    /// Stop once the device has accepted the options
    #[clap(short, long, visible_alias = "test")]
    testing: bool,

    /// Print the encoded options and command line as JSON and exit
    #[clap(long)]
    dry_run: bool,

    /// List serial ports and exit
    #[clap(long)]
    list_ports: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[clap(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn filter_selection(&self) -> FilterSelection {
        if let Some(expression) = &self.filter_mask {
            FilterSelection::Expression(expression.clone())
        } else if self.filter_all {
            FilterSelection::All
        } else if self.filter_all_good {
            FilterSelection::AllGood
        } else if self.filter_connection {
            FilterSelection::Session
        } else {
            FilterSelection::Keep
        }
    }

    fn settings(&self) -> ProtocolSettings {
        ProtocolSettings::default()
            .with_baud_rate(self.baud)
            .with_max_channel(self.max_channel)
            .with_sentinel_timeout(self.ready_timeout.map(Duration::from_secs))
    }
}

/// Mnemonic list shown after `--help`
fn filter_help() -> String {
    let mut text = String::from(
        "When no filter option is given the device keeps the filter uploaded last.\n\n\
         Filter mask mnemonics (join with '|', hex constants such as 0x10000 also work):\n",
    );
    for mnemonic in MNEMONICS {
        text.push_str(&format!("  {:<10} {}\n", mnemonic.name, mnemonic.help));
    }
    text.push_str("\nExamples:\n  serialshark --filter-connection --ch 11\n  serialshark -c6 --filter-mask \"mgmt|data\"\n");
    text
}

/// Turn the command line into wire-ready capture options
fn capture_config(args: &Args, settings: &ProtocolSettings) -> Result<CaptureConfig, EncodeError> {
    let filter = encode_filter(&args.filter_selection(), settings.mnemonics)?;

    let unicast = match (&args.mac, &args.oui) {
        (Some(mac), _) => Some(encode_address(mac, AddressLength::Mac)?),
        (None, Some(oui)) => Some(encode_address(oui, AddressLength::Oui)?),
        (None, None) if args.clear_address => Some(AddressPair::NONE),
        (None, None) => None,
    };

    let multicast = if args.broadcast {
        Some(AddressPair::BROADCAST)
    } else {
        args.multicast.as_deref().map(encode_address_any).transpose()?
    };

    Ok(CaptureConfig::new(filter)
        .with_channel(args.channel, settings.max_channel)?
        .with_addresses(unicast, multicast)
        .with_time_sync(!args.no_time_sync))
}

fn log_options(port: &str, config: &CaptureConfig) {
    info!("Port: \"{}\"", port);
    match config.channel {
        Some(channel) => info!("Channel: {}", channel),
        None => info!("Channel: unchanged"),
    }
    match (config.filter.standard, config.filter.custom) {
        (None, None) => info!("Filter mask: unchanged"),
        (standard, custom) => info!(
            "Filter mask: {:#010x}, custom: {:#010x}",
            standard.unwrap_or(0),
            custom.unwrap_or(0)
        ),
    }
    match config.unicast {
        Some(unicast) if unicast.is_none() => info!("Address filter: cleared"),
        Some(unicast) => info!("Address: {}", unicast),
        None => {}
    }
    if let Some(multicast) = config.multicast {
        info!("Multicast: {}", multicast);
    }
    info!("Time sync: {}", config.time_sync);
}

fn run(args: Args) -> Result<()> {
    if args.list_ports {
        for port in list_ports()? {
            println!("{}", port.formatted_display());
        }
        return Ok(());
    }

    let settings = args.settings();

    // Reject bad options before touching the device
    let config = capture_config(&args, &settings)?;

    if args.dry_run {
        let report = serde_json::json!({
            "settings": settings,
            "config": config,
            "command": build_command(&config, Utc::now()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let port = match &args.port {
        Some(port) => port.clone(),
        None => select_port(&list_ports()?, &mut io::stdin().lock(), &mut io::stderr())?,
    };
    log_options(&port, &config);

    let cancel = CancelToken::install_ctrlc_handler()?;
    let connector = SerialConnector::new(port, &settings);
    let mut handshake = Handshake::new(&settings, cancel.clone());
    let mut stream = handshake.establish(&connector, config)?;
    debug!("{} capture bytes arrived with the ack", stream.buffered().len());

    if args.testing {
        info!("Testing mode, not relaying the stream");
        return Ok(());
    }

    let stats = if args.stdout {
        relay::relay_to_stdout(&mut stream, &cancel)?
    } else {
        relay::relay_to_viewer(&mut stream, &args.viewer, &cancel)?
    };
    debug!("Relay stats: {}", serde_json::to_string(&stats)?);

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    logging::init_logger(logging::get_log_level(&args.log_level));

    info!("Starting serialshark v{}", env!("CARGO_PKG_VERSION"));

    match run(args) {
        Ok(()) => {
            info!("Done.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<HandshakeError>() {
                Some(handshake) if handshake.is_interrupt() => info!("{}", handshake),
                _ => error!("{:#}", err),
            }
            info!("Exiting ...");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("serialshark").chain(argv.iter().copied())).unwrap()
    }

    fn config(argv: &[&str]) -> Result<CaptureConfig, EncodeError> {
        let args = parse(argv);
        capture_config(&args, &args.settings())
    }

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_keep_device_state_and_sync_time() {
        let config = config(&[]).unwrap();
        assert!(config.filter.is_empty());
        assert_eq!(config.channel, None);
        assert_eq!(config.unicast, None);
        assert!(config.time_sync);
    }

    #[test]
    fn filter_and_channel_options() {
        let config = config(&["-c6", "--filter-mask", "mgmt|data", "-n"]).unwrap();
        assert_eq!(config.channel, Some(6));
        assert_eq!(config.filter.standard, Some(0b101));
        assert!(!config.time_sync);
        assert_eq!(build_command(&config, Utc::now()), "PC6F0f5S0X\n");
    }

    #[test]
    fn filter_options_are_mutually_exclusive() {
        let argv = ["serialshark", "--filter-all", "--filter-connection"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn mac_and_oui_are_mutually_exclusive() {
        let argv = ["serialshark", "--mac", "aa:bb:cc:dd:ee:ff", "--oui", "aa:bb:cc"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn multicast_requires_an_address() {
        assert!(Args::try_parse_from(["serialshark", "--broadcast"]).is_err());
        assert!(Args::try_parse_from(["serialshark", "-u", "01:00:5e"]).is_err());
    }

    #[test]
    fn broadcast_uses_reserved_pair() {
        let config = config(&["--oui", "24:0a:c4", "--broadcast"]).unwrap();
        assert_eq!(config.multicast, Some(AddressPair::BROADCAST));
        assert_eq!(config.unicast.unwrap().least_significant, 0);
    }

    #[test]
    fn clear_address_uploads_the_empty_pair() {
        let config = config(&["--clear-address", "-n"]).unwrap();
        assert!(config.unicast.unwrap().is_none());
        assert_eq!(config.multicast, None);
        assert_eq!(build_command(&config, Utc::now()), "PU0u0M0m0X\n");
    }

    #[test]
    fn regional_channel_limit_applies() {
        assert!(matches!(
            config(&["-c", "13"]),
            Err(EncodeError::InvalidChannel { channel: 13, max: 11 })
        ));
        assert!(config(&["-c", "13", "--max-channel", "13"]).is_ok());
        assert!(Args::try_parse_from(["serialshark", "-c", "15"]).is_err());
    }

    #[test]
    fn bad_options_fail_before_io() {
        assert!(matches!(
            config(&["--filter-mask", "beacon"]),
            Err(EncodeError::InvalidMnemonic { .. })
        ));
        assert!(matches!(
            config(&["--mac", "aa:bb:cc"]),
            Err(EncodeError::MalformedAddress { .. })
        ));
    }

    #[test]
    fn help_lists_every_mnemonic() {
        let help = filter_help();
        for mnemonic in MNEMONICS {
            assert!(help.contains(mnemonic.name));
        }
    }
}
