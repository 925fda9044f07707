//! Capability helper tables.
//!
//! Names, bounds and enum values of the capabilities this crate adapts, as
//! published in the SmartThings capability definitions.

/// Numeric attribute definition.
#[derive(Debug, Clone, Copy)]
pub struct NumberAttr {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Enumerated string attribute definition.
#[derive(Debug, Clone, Copy)]
pub struct EnumAttr {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

impl EnumAttr {
    /// Index of `value` in the declared values.
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| *v == value)
    }
}

/// Command definition.
#[derive(Debug, Clone, Copy)]
pub struct CommandDef {
    pub name: &'static str,
    pub num_args: usize,
}

pub struct AudioVolumeHelper {
    pub id: &'static str,
    pub attr_volume: NumberAttr,
    pub cmd_volume_up: CommandDef,
    pub cmd_volume_down: CommandDef,
    pub cmd_set_volume: CommandDef,
}

pub const AUDIO_VOLUME: AudioVolumeHelper = AudioVolumeHelper {
    id: "audioVolume",
    attr_volume: NumberAttr {
        name: "volume",
        min: 0.0,
        max: 100.0,
    },
    cmd_volume_up: CommandDef {
        name: "volumeUp",
        num_args: 0,
    },
    cmd_volume_down: CommandDef {
        name: "volumeDown",
        num_args: 0,
    },
    cmd_set_volume: CommandDef {
        name: "setVolume",
        num_args: 1,
    },
};

pub struct ContactSensorHelper {
    pub id: &'static str,
    pub attr_contact: EnumAttr,
}

pub const CONTACT_SENSOR: ContactSensorHelper = ContactSensorHelper {
    id: "contactSensor",
    attr_contact: EnumAttr {
        name: "contact",
        values: &["closed", "open"],
    },
};

pub struct TemperatureMeasurementHelper {
    pub id: &'static str,
    pub attr_temperature: NumberAttr,
}

pub const TEMPERATURE_MEASUREMENT: TemperatureMeasurementHelper = TemperatureMeasurementHelper {
    id: "temperatureMeasurement",
    attr_temperature: NumberAttr {
        name: "temperature",
        min: -460.0,
        max: 10000.0,
    },
};
