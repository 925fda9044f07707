//! Device: owner of every capability instance of one SmartThings device.
//!
//! Capabilities are created through the device so their registrations can
//! be handed back to the SDK when the device shuts down.

use crate::capabilities::{
    AudioVolume, Capability, ContactSensor, Hook, TemperatureMeasurement, UserData,
};
use crate::error::Result;
use crate::sdk::DeviceContext;
use log::{info, warn};
use std::sync::Arc;

pub struct Device {
    name: String,
    ctx: Option<DeviceContext>,
    capabilities: Vec<Arc<dyn Capability>>,
    running: bool,
}

impl Device {
    /// Create a device. Without a context every capability runs offline.
    pub fn new(name: &str, ctx: Option<DeviceContext>) -> Self {
        Self {
            name: name.to_string(),
            ctx,
            capabilities: Vec::new(),
            running: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> Option<&DeviceContext> {
        self.ctx.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn capabilities(&self) -> &[Arc<dyn Capability>] {
        &self.capabilities
    }

    /// Take ownership of an already initialized capability.
    pub fn add(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities.push(capability);
    }

    pub fn add_audio_volume(
        &mut self,
        component: &str,
        init_hook: Option<Hook<AudioVolume>>,
        user_data: Option<UserData>,
    ) -> Arc<AudioVolume> {
        let caps = AudioVolume::initialize(self.ctx.as_ref(), component, init_hook, user_data);
        self.add(caps.clone());
        caps
    }

    pub fn add_contact_sensor(
        &mut self,
        component: &str,
        init_hook: Option<Hook<ContactSensor>>,
        user_data: Option<UserData>,
    ) -> Arc<ContactSensor> {
        let caps = ContactSensor::initialize(self.ctx.as_ref(), component, init_hook, user_data);
        self.add(caps.clone());
        caps
    }

    pub fn add_temperature_measurement(
        &mut self,
        component: &str,
        init_hook: Option<Hook<TemperatureMeasurement>>,
        user_data: Option<UserData>,
    ) -> Arc<TemperatureMeasurement> {
        let caps =
            TemperatureMeasurement::initialize(self.ctx.as_ref(), component, init_hook, user_data);
        self.add(caps.clone());
        caps
    }

    /// Fail with the first capability whose registration failed or is partial.
    pub fn check_registrations(&self) -> Result<()> {
        self.capabilities
            .iter()
            .try_for_each(|caps| caps.registration().check(caps.id(), caps.component()))
    }

    /// Start the SDK connection. Init callbacks fire from here, once.
    pub fn start(&mut self) {
        if self.running {
            warn!("[Device] {} already running", self.name);
            return;
        }
        let Some(ctx) = &self.ctx else {
            warn!("[Device] {} has no context, nothing to start", self.name);
            return;
        };
        info!(
            "[Device] starting {} with {} capability instance(s)",
            self.name,
            self.capabilities.len()
        );
        self.running = true;
        ctx.sdk().start();
    }

    /// Release every capability handle and drop the instances owned here.
    ///
    /// Callers still holding an `Arc` keep a usable offline view; sends
    /// through it fail with `MissingHandle`.
    pub fn shutdown(&mut self) {
        if self.capabilities.is_empty() && !self.running {
            return;
        }
        info!(
            "[Device] shutting down {} ({} capability instance(s))",
            self.name,
            self.capabilities.len()
        );
        for caps in self.capabilities.drain(..) {
            caps.core().release();
        }
        self.running = false;
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.shutdown();
    }
}
