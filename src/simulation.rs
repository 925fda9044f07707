//! Capability simulation for the sample app.
//!
//! Produces sensor readings and cloud-side commands so the adapters have
//! something to do without real hardware or a cloud connection.

use crate::capabilities::{AudioVolume, Capability, ContactSensor, TemperatureMeasurement};
use crate::sdk::{CmdArg, CommandData, LoopbackSdk};
use log::{info, warn};
use rand::Rng;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

/// Capability instances driven by the simulation.
pub struct SimulatedCapabilities {
    pub contact: Arc<ContactSensor>,
    pub temperature: Arc<TemperatureMeasurement>,
    pub volume: Arc<AudioVolume>,
}

/// Next temperature reading: a small random step from `current`.
fn next_temperature(rng: &mut impl Rng, current: f64, start: f64) -> f64 {
    let base = if current.is_finite() && current >= -100.0 {
        current
    } else {
        start
    };
    let step: f64 = rng.gen_range(-0.5..=0.5);
    ((base + step) * 10.0).round() / 10.0
}

/// Command the simulated cloud sends on `tick`.
fn command_for_tick(rng: &mut impl Rng, tick: u64) -> CommandData {
    match tick % 3 {
        0 => CommandData::new(
            "setVolume",
            vec![CmdArg::Integer(rng.gen_range(0..=100))],
        ),
        1 => CommandData::new("volumeUp", vec![]),
        _ => CommandData::new("volumeDown", vec![]),
    }
}

/// Spawn a task that periodically updates the sensors and sends a volume
/// command through the loopback SDK.
///
/// # Returns
///
/// A `JoinHandle` that can be used to abort the simulation task.
pub fn run_simulation(
    sdk: Arc<LoopbackSdk>,
    caps: SimulatedCapabilities,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(period);
        let mut tick: u64 = 0;
        loop {
            interval.tick().await;
            tick += 1;

            let open = caps.contact.contact_value().as_deref() != Some("open");
            caps.contact
                .set_contact_value(if open { "open" } else { "closed" });
            info!("[Sim] contact -> {}", if open { "open" } else { "closed" });
            if let Err(e) = caps.contact.send_contact() {
                warn!("[Sim] contact update failed: {}", e);
            }

            let (reading, command) = {
                let mut rng = rand::thread_rng();
                (
                    next_temperature(&mut rng, caps.temperature.temperature_value(), 21.0),
                    command_for_tick(&mut rng, tick),
                )
            };
            caps.temperature.set_temperature_value(reading);
            info!("[Sim] temperature -> {:.1}", reading);
            if let Err(e) = caps.temperature.send_temperature() {
                warn!("[Sim] temperature update failed: {}", e);
            }

            let Some(handle) = caps.volume.handle() else {
                continue;
            };
            if let Err(e) = sdk.dispatch(handle, &command) {
                warn!("[Sim] {} failed: {}", command.command(), e);
            }
        }
    })
}
