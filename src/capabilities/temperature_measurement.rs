//! temperatureMeasurement capability.
//!
//! One numeric attribute (`temperature`) with a `C` or `F` unit. There are
//! no commands; readings are pushed by the application.

use super::helpers::TEMPERATURE_MEASUREMENT;
use super::{Capability, CapabilityCore, Hook, UserData, absent_state};
use crate::error::{CapsError, Result};
use crate::sdk::{AttrEvent, DeviceContext, SequenceNumber};
use parking_lot::RwLock;
use std::sync::Arc;

/// Reading reported before the first measurement. One below the declared minimum.
pub const TEMPERATURE_UNSET: f64 = TEMPERATURE_MEASUREMENT.attr_temperature.min - 1.0;

struct TemperatureState {
    value: f64,
    unit: Option<String>,
}

/// temperatureMeasurement capability instance.
pub struct TemperatureMeasurement {
    core: CapabilityCore,
    state: RwLock<TemperatureState>,
    init_hook: Option<Hook<TemperatureMeasurement>>,
}

impl TemperatureMeasurement {
    pub fn initialize(
        ctx: Option<&DeviceContext>,
        component: &str,
        init_hook: Option<Hook<TemperatureMeasurement>>,
        user_data: Option<UserData>,
    ) -> Arc<Self> {
        let caps = Arc::new(Self {
            core: CapabilityCore::new(ctx, TEMPERATURE_MEASUREMENT.id, component, user_data),
            state: RwLock::new(TemperatureState {
                value: TEMPERATURE_UNSET,
                unit: None,
            }),
            init_hook,
        });
        CapabilityCore::register(&caps, &[]);
        caps
    }

    pub fn temperature_value(&self) -> f64 {
        self.state.read().value
    }

    pub fn set_temperature_value(&self, value: f64) {
        self.state.write().value = value;
    }

    pub fn temperature_unit(&self) -> Option<String> {
        self.state.read().unit.clone()
    }

    pub fn set_temperature_unit(&self, unit: &str) {
        self.state.write().unit = Some(unit.to_string());
    }

    /// Whether a measurement has been stored since initialization.
    pub fn has_reading(&self) -> bool {
        self.temperature_value() >= TEMPERATURE_MEASUREMENT.attr_temperature.min
    }

    pub fn send_temperature(&self) -> Result<SequenceNumber> {
        let event = {
            let state = self.state.read();
            AttrEvent::number(
                TEMPERATURE_MEASUREMENT.attr_temperature.name,
                state.value,
                state.unit.as_deref(),
            )
        };
        self.core
            .send(TEMPERATURE_MEASUREMENT.attr_temperature.name, &[event])
    }
}

impl Capability for TemperatureMeasurement {
    fn core(&self) -> &CapabilityCore {
        &self.core
    }

    fn send_all(&self) -> Result<SequenceNumber> {
        self.send_temperature()
    }

    fn run_init_hook(&self) {
        if let Some(hook) = &self.init_hook {
            hook(self);
        }
    }
}

/// Temperature of `caps`, or [`TEMPERATURE_UNSET`] when there is no instance.
pub fn get_temperature_value(caps: Option<&TemperatureMeasurement>) -> f64 {
    match caps {
        Some(caps) => caps.temperature_value(),
        None => {
            absent_state(TEMPERATURE_MEASUREMENT.id);
            TEMPERATURE_UNSET
        }
    }
}

pub fn set_temperature_value(caps: Option<&TemperatureMeasurement>, value: f64) {
    match caps {
        Some(caps) => caps.set_temperature_value(value),
        None => absent_state(TEMPERATURE_MEASUREMENT.id),
    }
}

pub fn get_temperature_unit(caps: Option<&TemperatureMeasurement>) -> Option<String> {
    match caps {
        Some(caps) => caps.temperature_unit(),
        None => {
            absent_state(TEMPERATURE_MEASUREMENT.id);
            None
        }
    }
}

pub fn set_temperature_unit(caps: Option<&TemperatureMeasurement>, unit: &str) {
    match caps {
        Some(caps) => caps.set_temperature_unit(unit),
        None => absent_state(TEMPERATURE_MEASUREMENT.id),
    }
}

pub fn attr_temperature_send(caps: Option<&TemperatureMeasurement>) -> Result<SequenceNumber> {
    match caps {
        Some(caps) => caps.send_temperature(),
        None => Err(CapsError::MissingHandle(TEMPERATURE_MEASUREMENT.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{AttrValue, LoopbackSdk};

    #[test]
    fn test_offline_default_is_sentinel() {
        let temp = TemperatureMeasurement::initialize(None, "main", None, None);
        assert!(temp.handle().is_none());
        assert_eq!(temp.temperature_value(), TEMPERATURE_UNSET);
        assert_eq!(get_temperature_value(Some(&temp)), -461.0);
        assert!(!temp.has_reading());
    }

    #[test]
    fn test_absent_state() {
        assert_eq!(get_temperature_value(None), TEMPERATURE_UNSET);
        assert_eq!(get_temperature_unit(None), None);
        set_temperature_value(None, 21.5);
        set_temperature_unit(None, "C");
    }

    #[test]
    fn test_round_trip() {
        let temp = TemperatureMeasurement::initialize(None, "main", None, None);
        set_temperature_value(Some(&temp), 21.5);
        set_temperature_unit(Some(&temp), "C");
        assert_eq!(get_temperature_value(Some(&temp)), 21.5);
        assert_eq!(get_temperature_unit(Some(&temp)).as_deref(), Some("C"));
        assert!(temp.has_reading());
    }

    #[test]
    fn test_send_number_event() {
        let sdk = Arc::new(LoopbackSdk::new());
        let ctx = DeviceContext::new(sdk.clone());
        let temp = TemperatureMeasurement::initialize(Some(&ctx), "main", None, None);

        temp.set_temperature_unit("F");
        temp.set_temperature_value(70.25);
        attr_temperature_send(Some(&temp)).unwrap();

        let sent = sdk.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].events[0].value, AttrValue::Number(70.25));
        assert_eq!(
            sent[0].payloads[0],
            r#"{"name":"temperature","value":70.25,"unit":"F"}"#
        );
    }

    #[test]
    fn test_offline_send_fails() {
        let temp = TemperatureMeasurement::initialize(None, "main", None, None);
        temp.set_temperature_value(20.0);
        assert!(matches!(
            temp.send_temperature(),
            Err(CapsError::MissingHandle(_))
        ));
    }
}
