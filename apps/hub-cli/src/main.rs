use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::thread;
use std::time::Duration;
use tracing::info;

use hub_codec::devices::Apds9151;
use hub_codec::{crc, BitWriter, ChannelMode, EncoderMode, Hub, HubConfig};
use hub_transport::{HubBus, MockBus};

#[cfg(feature = "serial")]
use hub_transport::BridgeBus;

#[derive(Parser, Debug)]
#[command(
    name = "hub",
    version,
    about = "Sensor expansion hub CLI",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    #[cfg(feature = "serial")]
    Serial,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available bus endpoints
    List {
        #[arg(long, value_enum, default_value_t = Backend::Mock)]
        backend: Backend,
    },
    /// Read and print the hub's identity byte and firmware version
    Probe {
        #[arg(long, value_enum, default_value_t = Backend::Mock)]
        backend: Backend,
        /// Endpoint name (serial path for the bridge backend)
        #[arg(long, default_value = "mock0")]
        endpoint: String,
    },
    /// Print the planned frame shapes and init frame for the demo config
    InitFrame,
    /// Initialize the demo configuration and poll, printing JSON readings
    Watch {
        #[arg(long, value_enum, default_value_t = Backend::Mock)]
        backend: Backend,
        #[arg(long, default_value = "mock0")]
        endpoint: String,
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
        /// Number of polls before exiting (0 = forever)
        #[arg(long, default_value_t = 10)]
        count: u64,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::List { backend } => match backend {
            Backend::Mock => list::<MockBus>(),
            #[cfg(feature = "serial")]
            Backend::Serial => list::<BridgeBus>(),
        },
        Commands::Probe { backend, endpoint } => match backend {
            Backend::Mock => {
                let mut bus = MockBus::open(&endpoint)?;
                bus.queue_read(
                    hub_codec::registers::DEVICE_INFO,
                    vec![hub_codec::DEVICE_ID, 1, 1, 1],
                );
                probe(bus)
            }
            #[cfg(feature = "serial")]
            Backend::Serial => probe(BridgeBus::open(&endpoint)?),
        },
        Commands::InitFrame => init_frame(),
        Commands::Watch {
            backend,
            endpoint,
            interval_ms,
            count,
        } => {
            let interval = Duration::from_millis(interval_ms);
            match backend {
                Backend::Mock => {
                    let mut hub =
                        Hub::with_settle_delay(MockBus::open(&endpoint)?, Duration::ZERO);
                    preload_mock(hub.bus_mut(), count.saturating_add(1));
                    watch(hub, interval, count)
                }
                #[cfg(feature = "serial")]
                Backend::Serial => watch(Hub::new(BridgeBus::open(&endpoint)?), interval, count),
            }
        }
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Channels 1-2, a quadrature encoder and a light sensor on bus 1.
fn demo_config() -> Result<HubConfig> {
    let mut config = HubConfig::new();
    config.set_channel(1, ChannelMode::Analog)?;
    config.set_channel(2, ChannelMode::Digital)?;
    config.set_encoder(1, EncoderMode::Quadrature)?;
    config.attach(1, Box::new(Apds9151::new()))?;
    Ok(config)
}

fn list<B: HubBus>() -> Result<()> {
    for endpoint in B::list()? {
        println!("{}\t{}", endpoint.name, endpoint.driver);
    }
    Ok(())
}

fn probe<B: HubBus>(bus: B) -> Result<()> {
    let mut hub = Hub::new(bus);
    let (identity, version) = hub.device_info()?;
    println!("identity: {identity:#04x}");
    println!("firmware: v{version}");
    if identity != hub_codec::DEVICE_ID {
        println!("warning: identity does not match the expected {:#04x}", hub_codec::DEVICE_ID);
    }
    Ok(())
}

fn init_frame() -> Result<()> {
    let config = demo_config()?;
    let layout = hub_codec::plan(&config)?;
    let frame = hub_codec::encode_init(&config, &layout);
    println!("init frame bits: {}", layout.init_bits);
    println!("bus payload bits: {:?}", layout.bus_payload_bits);
    println!("telemetry frame bytes: {}", layout.update_bytes);
    println!("init frame: {}", hex(&frame));
    Ok(())
}

fn watch<B: HubBus>(mut hub: Hub<B>, interval: Duration, count: u64) -> Result<()> {
    hub.configure(demo_config()?);
    hub.initialize()?;
    info!("hub ready: {}", hub.is_ready());

    let mut polls = 0u64;
    loop {
        hub.poll()?;
        if hub.is_disconnected() {
            info!("hub disconnected; readings retained");
        } else {
            let line = serde_json::json!({
                "analog_1": hub.read_channel(1)?,
                "digital_2": hub.read_channel(2)?,
                "encoder_1": hub.read_encoder(1)?,
                "light": hub.read_peripheral(1, 0)?,
            });
            println!("{line}");
        }
        polls += 1;
        if count != 0 && polls >= count {
            break;
        }
        thread::sleep(interval);
    }
    Ok(())
}

/// Stock the mock bus with a device-info reply and `frames` synthesized
/// telemetry frames so the demo loop has something to decode.
fn preload_mock(bus: &mut MockBus, frames: u64) {
    bus.queue_read(
        hub_codec::registers::DEVICE_INFO,
        vec![hub_codec::DEVICE_ID, 1, 1, 1],
    );
    for tick in 0..frames {
        bus.queue_read(hub_codec::registers::TELEMETRY, synth_frame(tick));
    }
}

/// One plausible telemetry frame for `demo_config`, fields ramping with
/// `tick`.
fn synth_frame(tick: u64) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_bits(hub_codec::DEVICE_ID as u64, 8);
    w.write_bits(tick * 137 % 4096, 12); // analog channel 1
    w.write_bit(tick % 2 == 0); // digital channel 2
    w.write_bits(10, 16); // quadrature delta
    w.write_bits(500, 32); // quadrature velocity
    w.write_bit(false); // light sensor present
    w.write_bits(tick * 3 % 2048, 11); // proximity
    for base in [1000u64, 2000, 3000, 4000] {
        w.write_bits(base + tick, 20);
    }
    let mut frame = w.into_bytes();
    crc::seal(&mut frame);
    frame
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
