//! SmartThings capability adapters.
//!
//! Each adapter keeps the current attribute values of one capability
//! instance, registers itself and its command callbacks with the SDK and
//! pushes attribute updates back out through its handle.
//!
//! All adapters share [`CapabilityCore`] for the SDK side and implement
//! [`Capability`] so a [`Device`](crate::device::Device) can own them
//! without knowing their concrete type.

pub mod audio_volume;
pub mod contact_sensor;
pub mod helpers;
pub mod temperature_measurement;

pub use audio_volume::AudioVolume;
pub use contact_sensor::{ContactSensor, ContactValue};
pub use temperature_measurement::TemperatureMeasurement;

use crate::error::{CapsError, Result};
use crate::sdk::{
    AttrEvent, CapHandle, CommandCallback, CommandData, DeviceContext, InitCallback,
    SequenceNumber, StBoundary,
};
use helpers::CommandDef;
use log::{error, info, warn};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// User callback invoked with the capability it belongs to.
pub type Hook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Opaque data the application attaches to a capability instance.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Command shim: unpacks the arguments and applies them to the capability.
pub(crate) type CommandShim<T> = fn(&T, &CommandData) -> Result<()>;

/// Outcome of registering a capability instance with the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Handle and every command callback registered.
    Registered,
    /// No device context was given; the instance only holds local state.
    Offline,
    /// The SDK refused the handle. Sends are impossible.
    HandleFailed,
    /// Handle registered but some command callbacks are missing.
    Degraded { missing_commands: Vec<&'static str> },
}

impl Registration {
    pub fn is_registered(&self) -> bool {
        matches!(self, Registration::Registered | Registration::Degraded { .. })
    }

    /// Turn a failed or partial registration into an error.
    pub fn check(&self, capability: &'static str, component: &str) -> Result<()> {
        match self {
            Registration::Registered | Registration::Offline => Ok(()),
            Registration::HandleFailed => Err(CapsError::HandleRegistration {
                capability,
                component: component.to_string(),
            }),
            Registration::Degraded { missing_commands } => Err(CapsError::CommandRegistration {
                capability,
                commands: missing_commands.clone(),
            }),
        }
    }
}

/// Common behaviour of every capability adapter.
pub trait Capability: Send + Sync {
    fn core(&self) -> &CapabilityCore;

    /// Send every attribute of the capability with its current value.
    fn send_all(&self) -> Result<SequenceNumber>;

    /// Run the user init hook, if one was given.
    fn run_init_hook(&self);

    /// Called when the SDK reports the handle as ready.
    fn on_init(&self) {
        self.run_init_hook();
        if let Err(e) = self.send_all() {
            warn!("[{}] initial send failed: {}", self.id(), e);
        }
    }

    fn id(&self) -> &'static str {
        self.core().capability_id()
    }

    fn component(&self) -> &str {
        self.core().component()
    }

    /// Live handle, `None` when offline, refused or released.
    fn handle(&self) -> Option<CapHandle> {
        self.core().handle()
    }

    fn registration(&self) -> &Registration {
        self.core().registration()
    }

    fn is_released(&self) -> bool {
        self.core().is_released()
    }
}

// Reported while registration is still in progress.
static PENDING: Registration = Registration::Offline;

/// SDK-facing half of a capability adapter.
///
/// The handle is bound at most once, either by `register_handle` returning
/// or by the SDK init callback, whichever comes first. After
/// [`CapabilityCore::release`] the handle is returned to the SDK and every
/// send fails with [`CapsError::MissingHandle`].
pub struct CapabilityCore {
    capability_id: &'static str,
    component: String,
    sdk: Option<Arc<dyn StBoundary>>,
    handle: OnceLock<CapHandle>,
    registration: OnceLock<Registration>,
    released: AtomicBool,
    user_data: Option<UserData>,
}

impl CapabilityCore {
    /// Core for one capability instance. Without `ctx` it stays offline.
    pub(crate) fn new(
        ctx: Option<&DeviceContext>,
        capability_id: &'static str,
        component: &str,
        user_data: Option<UserData>,
    ) -> Self {
        let core = Self {
            capability_id,
            component: component.to_string(),
            sdk: ctx.map(|ctx| ctx.sdk().clone()),
            handle: OnceLock::new(),
            registration: OnceLock::new(),
            released: AtomicBool::new(false),
            user_data,
        };
        if core.sdk.is_none() {
            warn!(
                "[{}] no device context, running offline on {}",
                capability_id, component
            );
            let _ = core.registration.set(Registration::Offline);
        }
        core
    }

    /// Register `caps` with the SDK and wire its commands.
    ///
    /// The SDK callbacks keep only a weak reference to `caps`. The init
    /// callback may fire before `register_handle` returns.
    pub(crate) fn register<T>(caps: &Arc<T>, commands: &[(CommandDef, CommandShim<T>)])
    where
        T: Capability + 'static,
    {
        let core = caps.core();
        let capability_id = core.capability_id;
        let Some(sdk) = core.sdk.clone() else {
            return;
        };

        let init_weak = Arc::downgrade(caps);
        let init_cb: InitCallback = Arc::new(move |handle| match init_weak.upgrade() {
            Some(cap) => {
                cap.core().bind_handle(handle);
                cap.on_init();
            }
            None => warn!(
                "[{}] init callback for {} after the instance was dropped",
                capability_id, handle
            ),
        });

        let Some(handle) = sdk.register_handle(&core.component, capability_id, init_cb) else {
            error!("[{}] fail to init handle on {}", capability_id, core.component);
            let _ = core.registration.set(Registration::HandleFailed);
            return;
        };
        core.bind_handle(handle);

        let mut missing = Vec::new();
        for &(def, shim) in commands {
            let cmd_weak = Arc::downgrade(caps);
            let cb: CommandCallback = Arc::new(move |handle: CapHandle, data: &CommandData| {
                info!(
                    "[{}] called {} on {} with {} arg(s)",
                    capability_id,
                    def.name,
                    handle,
                    data.num_args()
                );
                if data.num_args() != def.num_args {
                    error!(
                        "[{}] {} expects {} arg(s), got {}",
                        capability_id,
                        def.name,
                        def.num_args,
                        data.num_args()
                    );
                    return Err(CapsError::ArgumentCount {
                        command: def.name.to_string(),
                        expected: def.num_args,
                        actual: data.num_args(),
                    });
                }
                match cmd_weak.upgrade() {
                    Some(cap) => shim(&cap, data).inspect_err(|e| {
                        error!("[{}] command {} rejected: {}", capability_id, def.name, e);
                    }),
                    None => Err(CapsError::MissingHandle(capability_id)),
                }
            });
            let status = sdk.register_command(handle, def.name, cb);
            if status != 0 {
                error!(
                    "[{}] fail to set cmd_cb for {} (status {})",
                    capability_id, def.name, status
                );
                missing.push(def.name);
            }
        }

        let registration = if missing.is_empty() {
            Registration::Registered
        } else {
            Registration::Degraded {
                missing_commands: missing,
            }
        };
        let _ = core.registration.set(registration);
    }

    fn bind_handle(&self, handle: CapHandle) {
        if let Err(handle) = self.handle.set(handle)
            && self.handle.get() != Some(&handle)
        {
            warn!(
                "[{}] ignoring {}, already bound to another handle",
                self.capability_id, handle
            );
        }
    }

    pub fn capability_id(&self) -> &'static str {
        self.capability_id
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn handle(&self) -> Option<CapHandle> {
        self.handle.get().copied().filter(|_| !self.is_released())
    }

    pub fn registration(&self) -> &Registration {
        self.registration.get().unwrap_or(&PENDING)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// Submit `events` through the handle.
    pub(crate) fn send(
        &self,
        attribute: &'static str,
        events: &[AttrEvent],
    ) -> Result<SequenceNumber> {
        let (Some(sdk), Some(&handle)) = (self.sdk.as_ref(), self.handle.get()) else {
            warn!("[{}] fail to get handle", self.capability_id);
            return Err(CapsError::MissingHandle(self.capability_id));
        };
        if self.is_released() {
            warn!("[{}] handle {} already released", self.capability_id, handle);
            return Err(CapsError::MissingHandle(self.capability_id));
        }

        let seq = sdk.send_attributes(handle, events);
        if seq < 0 {
            error!("[{}] fail to send {} value", self.capability_id, attribute);
            return Err(CapsError::Transmission { attribute, seq });
        }
        info!("[{}] sequence number return: {}", self.capability_id, seq);
        Ok(SequenceNumber(seq))
    }

    /// Hand the handle back to the SDK. Safe to call more than once.
    pub(crate) fn release(&self) {
        if let (Some(sdk), Some(&handle)) = (self.sdk.as_ref(), self.handle.get())
            && !self.released.swap(true, Ordering::SeqCst)
        {
            sdk.release_handle(handle);
            info!("[{}] released handle {}", self.capability_id, handle);
        }
    }
}

/// Log an accessor call made without a capability instance.
pub(crate) fn absent_state(capability: &str) {
    warn!("[{}] caps_data is absent", capability);
}
