//! Sample SmartThings device.
//!
//! Usage:
//!   cargo run --bin caps-sample -- --interval 5
//!
//! Registers an audioVolume, a contactSensor and a temperatureMeasurement
//! capability against the loopback SDK, then simulates sensor readings and
//! cloud commands until Ctrl+C.

use clap::Parser;
use log::{error, info, warn};
use st_capabilities::capabilities::helpers::AUDIO_VOLUME;
use st_capabilities::capabilities::{
    AudioVolume, ContactSensor, ContactValue, TemperatureMeasurement,
};
use st_capabilities::config::{self, Config};
use st_capabilities::device::Device;
use st_capabilities::sdk::{DeviceContext, LoopbackSdk};
use st_capabilities::simulation::{SimulatedCapabilities, run_simulation};
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;

const VOLUME_STEP: i32 = 5;

#[derive(Parser, Debug)]
#[command(name = "caps-sample", about = "SmartThings capability sample device")]
struct Args {
    /// Device name
    #[arg(long, env = "ST_DEVICE_NAME")]
    name: Option<String>,

    /// Component the capabilities register on
    #[arg(long, env = "ST_COMPONENT")]
    component: Option<String>,

    /// Seconds between simulated updates
    #[arg(long, env = "ST_SIM_INTERVAL_SECS")]
    interval: Option<u64>,

    /// Report every attribute send as failed
    #[arg(long)]
    fail_send: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn step_volume(caps: &AudioVolume, delta: i32) {
    let min = AUDIO_VOLUME.attr_volume.min as i32;
    let max = AUDIO_VOLUME.attr_volume.max as i32;
    let current = caps.volume_value().max(min);
    caps.set_volume_value((current + delta).clamp(min, max));
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();
    init_logger();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(name) = args.name {
        config.device.name = name;
    }
    if let Some(component) = args.component {
        config.device.component = component;
    }
    if let Some(interval) = args.interval {
        config.simulation.interval_secs = interval;
    }
    config.loopback.fail_send |= args.fail_send;

    info!("Starting {}", config.device.name);
    info!("  Component: {}", config.device.component);
    info!("  Update interval: {}s", config.simulation.interval_secs);

    let sdk = Arc::new(LoopbackSdk::new());
    sdk.set_fail_send(config.loopback.fail_send);
    let mut device = Device::new(&config.device.name, Some(DeviceContext::new(sdk.clone())));

    let component = config.device.component.clone();
    let volume_unit = config.device.volume_unit.clone();
    let volume = device.add_audio_volume(
        &component,
        Some(Arc::new(move |caps: &AudioVolume| {
            caps.set_volume_unit(&volume_unit);
            caps.set_volume_value(50);
        })),
        None,
    );
    volume.set_volume_up_hook(Arc::new(|caps: &AudioVolume| step_volume(caps, VOLUME_STEP)));
    volume.set_volume_down_hook(Arc::new(|caps: &AudioVolume| {
        step_volume(caps, -VOLUME_STEP)
    }));
    volume.set_set_volume_hook(Arc::new(|caps: &AudioVolume| {
        info!("[App] volume set to {}", caps.volume_value());
    }));

    let contact = device.add_contact_sensor(
        &component,
        Some(Arc::new(|caps: &ContactSensor| {
            caps.set_contact(ContactValue::Closed)
        })),
        None,
    );

    let temperature_unit = config.device.temperature_unit.clone();
    let temperature = device.add_temperature_measurement(
        &component,
        Some(Arc::new(move |caps: &TemperatureMeasurement| {
            caps.set_temperature_unit(&temperature_unit);
        })),
        None,
    );

    if let Err(e) = device.check_registrations() {
        warn!("Device registered with problems: {}", e);
    }

    device.start();
    info!("{} is running, press Ctrl+C to exit", device.name());

    let simulation = run_simulation(
        sdk.clone(),
        SimulatedCapabilities {
            contact,
            temperature,
            volume,
        },
        Duration::from_secs(config.simulation.interval_secs.max(1)),
    );

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    simulation.abort();
    device.shutdown();
    info!("{} messages sent", sdk.sent().len());
    info!("{} stopped", config.device.name);
}
