//! contactSensor capability.
//!
//! A single enumerated string attribute (`contact`) and no commands.

use super::helpers::CONTACT_SENSOR;
use super::{Capability, CapabilityCore, Hook, UserData, absent_state};
use crate::error::{CapsError, Result};
use crate::sdk::{AttrEvent, DeviceContext, SequenceNumber};
use log::warn;
use parking_lot::RwLock;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Values of the `contact` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ContactValue {
    Closed,
    Open,
}

/// contactSensor capability instance.
pub struct ContactSensor {
    core: CapabilityCore,
    contact: RwLock<Option<String>>,
    init_hook: Option<Hook<ContactSensor>>,
}

impl ContactSensor {
    pub fn initialize(
        ctx: Option<&DeviceContext>,
        component: &str,
        init_hook: Option<Hook<ContactSensor>>,
        user_data: Option<UserData>,
    ) -> Arc<Self> {
        let caps = Arc::new(Self {
            core: CapabilityCore::new(ctx, CONTACT_SENSOR.id, component, user_data),
            contact: RwLock::new(None),
            init_hook,
        });
        CapabilityCore::register(&caps, &[]);
        caps
    }

    /// Current contact value, `None` until the first set.
    pub fn contact_value(&self) -> Option<String> {
        self.contact.read().clone()
    }

    /// Replace the stored value with an owned copy of `value`.
    ///
    /// The value is stored as given; use [`contact_str2idx`] to check it
    /// against the declared values first.
    pub fn set_contact_value(&self, value: &str) {
        *self.contact.write() = Some(value.to_string());
    }

    pub fn set_contact(&self, value: ContactValue) {
        self.set_contact_value(value.as_ref());
    }

    /// Parsed contact value, `None` when unset or not a declared value.
    pub fn contact(&self) -> Option<ContactValue> {
        self.contact.read().as_deref()?.parse().ok()
    }

    /// Send the current contact value. Skipped when no value is set.
    pub fn send_contact(&self) -> Result<SequenceNumber> {
        let Some(value) = self.contact_value() else {
            warn!("[{}] value is absent, not sending", CONTACT_SENSOR.id);
            return Err(CapsError::MissingValue(CONTACT_SENSOR.attr_contact.name));
        };
        self.core.send(
            CONTACT_SENSOR.attr_contact.name,
            &[AttrEvent::string(CONTACT_SENSOR.attr_contact.name, &value)],
        )
    }
}

impl Capability for ContactSensor {
    fn core(&self) -> &CapabilityCore {
        &self.core
    }

    fn send_all(&self) -> Result<SequenceNumber> {
        self.send_contact()
    }

    fn run_init_hook(&self) {
        if let Some(hook) = &self.init_hook {
            hook(self);
        }
    }
}

/// Index of `value` among the declared contact values.
pub fn contact_str2idx(value: &str) -> Option<usize> {
    CONTACT_SENSOR.attr_contact.index_of(value)
}

pub fn get_contact_value(caps: Option<&ContactSensor>) -> Option<String> {
    match caps {
        Some(caps) => caps.contact_value(),
        None => {
            absent_state(CONTACT_SENSOR.id);
            None
        }
    }
}

pub fn set_contact_value(caps: Option<&ContactSensor>, value: &str) {
    match caps {
        Some(caps) => caps.set_contact_value(value),
        None => absent_state(CONTACT_SENSOR.id),
    }
}

pub fn attr_contact_send(caps: Option<&ContactSensor>) -> Result<SequenceNumber> {
    match caps {
        Some(caps) => caps.send_contact(),
        None => Err(CapsError::MissingHandle(CONTACT_SENSOR.id)),
    }
}
