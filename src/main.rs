//! Owl CM160 monitor.
//!
//! Talks to the energy monitor, shows every frame it sends, and keeps the latest power figure in a
//! file once the device has started sending live readings.

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use cm160::{BusyPolicy, Driver, DriverConfig, FileSink, ForwardPolicy};
use log::info;

mod usb;

#[derive(Parser, Debug)]
#[command(name = "owlmon")]
#[command(about = "Read power usage from an Owl CM160", long_about = None)]
struct Cli {
    /// File to keep the latest power reading in.
    #[arg(long, env = "OWL_LIVE_FILE", default_value = ".live")]
    live_file: PathBuf,

    /// Which readings to store once live: "session" or "live-only".
    #[arg(long, default_value = "session")]
    forward: ForwardPolicy,

    /// What to do when the device is busy: "propagate" or "retry".
    #[arg(long, default_value = "propagate")]
    on_busy: BusyPolicy,

    /// Read timeout, in seconds.
    #[arg(long, default_value_t = 60)]
    read_timeout: u64,

    #[arg(long, value_parser = parse_id, default_value = "0x0fde")]
    vendor_id: u16,

    #[arg(long, value_parser = parse_id, default_value = "0xca05")]
    product_id: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let device = usb::Cm160::open(cli.vendor_id, cli.product_id)?;
    let sink = FileSink::new(&cli.live_file);
    info!("Writing readings to {}", sink.path().display());

    let config = DriverConfig {
        read_timeout: Duration::from_secs(cli.read_timeout),
        busy: cli.on_busy,
        forward: cli.forward,
        ..DriverConfig::default()
    };
    let mut driver = Driver::new(device, sink, config);

    // Only returns on a fatal error, which anyhow reports on the way out.
    driver.run()?;

    Ok(())
}

/// USB ids are given in hex, with or without the 0x.
fn parse_id(text: &str) -> std::result::Result<u16, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid usb id {:?}: {}", text, e))
}

#[cfg(test)]
mod test {
    use clap::Parser;
    use cm160::{BusyPolicy, ForwardPolicy};

    use super::{parse_id, Cli};

    #[test]
    fn ids() {
        assert_eq!(parse_id("0x0fde"), Ok(0x0fde));
        assert_eq!(parse_id("CA05"), Ok(0xca05));
        assert!(parse_id("0xfffff").is_err());
        assert!(parse_id("owl").is_err());
    }

    #[test]
    fn no_arguments() {
        let cli = Cli::try_parse_from(["owlmon"]).unwrap();
        assert_eq!(cli.forward, ForwardPolicy::Session);
        assert_eq!(cli.on_busy, BusyPolicy::Propagate);
        assert_eq!(cli.read_timeout, 60);
        assert_eq!(cli.vendor_id, cm160::OWL_VENDOR_ID);
        assert_eq!(cli.product_id, cm160::CM160_PRODUCT_ID);
    }

    #[test]
    fn policies() {
        let cli = Cli::try_parse_from(["owlmon", "--forward", "live-only", "--on-busy", "retry"])
            .unwrap();
        assert_eq!(cli.forward, ForwardPolicy::LiveOnly);
        assert_eq!(cli.on_busy, BusyPolicy::Retry);
    }
}
