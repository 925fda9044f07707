//! audioVolume capability.
//!
//! One integer attribute (`volume`, 0-100 %) and three commands:
//! `volumeUp` and `volumeDown` carry no arguments and only run the user
//! hook before re-sending, `setVolume` stores its integer argument first.

use super::helpers::{AUDIO_VOLUME, CommandDef};
use super::{Capability, CapabilityCore, CommandShim, Hook, UserData, absent_state};
use crate::error::{CapsError, Result};
use crate::sdk::{AttrEvent, CommandData, DeviceContext, SequenceNumber};
use parking_lot::RwLock;
use std::sync::Arc;

/// Value reported before the first explicit set. One below the declared minimum.
pub const VOLUME_UNSET: i32 = AUDIO_VOLUME.attr_volume.min as i32 - 1;

struct VolumeState {
    value: i32,
    unit: Option<String>,
}

#[derive(Default)]
struct VolumeHooks {
    volume_up: Option<Hook<AudioVolume>>,
    volume_down: Option<Hook<AudioVolume>>,
    set_volume: Option<Hook<AudioVolume>>,
}

/// audioVolume capability instance.
pub struct AudioVolume {
    core: CapabilityCore,
    state: RwLock<VolumeState>,
    init_hook: Option<Hook<AudioVolume>>,
    hooks: RwLock<VolumeHooks>,
}

impl AudioVolume {
    /// Create the instance and register it with the SDK when `ctx` is given.
    ///
    /// Registration problems do not fail the call; inspect
    /// [`Capability::registration`] for the outcome.
    pub fn initialize(
        ctx: Option<&DeviceContext>,
        component: &str,
        init_hook: Option<Hook<AudioVolume>>,
        user_data: Option<UserData>,
    ) -> Arc<Self> {
        let commands: [(CommandDef, CommandShim<AudioVolume>); 3] = [
            (AUDIO_VOLUME.cmd_volume_down, Self::cmd_volume_down),
            (AUDIO_VOLUME.cmd_volume_up, Self::cmd_volume_up),
            (AUDIO_VOLUME.cmd_set_volume, Self::cmd_set_volume),
        ];
        let caps = Arc::new(Self {
            core: CapabilityCore::new(ctx, AUDIO_VOLUME.id, component, user_data),
            state: RwLock::new(VolumeState {
                value: VOLUME_UNSET,
                unit: None,
            }),
            init_hook,
            hooks: RwLock::new(VolumeHooks::default()),
        });
        CapabilityCore::register(&caps, &commands);
        caps
    }

    pub fn volume_value(&self) -> i32 {
        self.state.read().value
    }

    /// Store a new volume. The value is not range checked.
    pub fn set_volume_value(&self, value: i32) {
        self.state.write().value = value;
    }

    pub fn volume_unit(&self) -> Option<String> {
        self.state.read().unit.clone()
    }

    pub fn set_volume_unit(&self, unit: &str) {
        self.state.write().unit = Some(unit.to_string());
    }

    /// Send the current volume through the handle.
    pub fn send_volume(&self) -> Result<SequenceNumber> {
        let event = {
            let state = self.state.read();
            AttrEvent::integer(
                AUDIO_VOLUME.attr_volume.name,
                state.value,
                state.unit.as_deref(),
            )
        };
        self.core.send(AUDIO_VOLUME.attr_volume.name, &[event])
    }

    pub fn set_volume_up_hook(&self, hook: Hook<AudioVolume>) {
        self.hooks.write().volume_up = Some(hook);
    }

    pub fn set_volume_down_hook(&self, hook: Hook<AudioVolume>) {
        self.hooks.write().volume_down = Some(hook);
    }

    pub fn set_set_volume_hook(&self, hook: Hook<AudioVolume>) {
        self.hooks.write().set_volume = Some(hook);
    }

    // Hooks run without any lock held so they may call back into `self`.
    fn run_hook(&self, select: fn(&VolumeHooks) -> Option<Hook<AudioVolume>>) {
        let hook = select(&self.hooks.read());
        if let Some(hook) = hook {
            hook(self);
        }
    }

    fn cmd_volume_down(&self, _data: &CommandData) -> Result<()> {
        self.run_hook(|h| h.volume_down.clone());
        self.send_volume().map(|_| ())
    }

    fn cmd_volume_up(&self, _data: &CommandData) -> Result<()> {
        self.run_hook(|h| h.volume_up.clone());
        self.send_volume().map(|_| ())
    }

    fn cmd_set_volume(&self, data: &CommandData) -> Result<()> {
        let value = data.integer(0)?;
        self.set_volume_value(value);
        self.run_hook(|h| h.set_volume.clone());
        self.send_volume().map(|_| ())
    }
}

impl Capability for AudioVolume {
    fn core(&self) -> &CapabilityCore {
        &self.core
    }

    fn send_all(&self) -> Result<SequenceNumber> {
        self.send_volume()
    }

    fn run_init_hook(&self) {
        if let Some(hook) = &self.init_hook {
            hook(self);
        }
    }
}

/// Volume of `caps`, or [`VOLUME_UNSET`] when there is no instance.
pub fn get_volume_value(caps: Option<&AudioVolume>) -> i32 {
    match caps {
        Some(caps) => caps.volume_value(),
        None => {
            absent_state(AUDIO_VOLUME.id);
            VOLUME_UNSET
        }
    }
}

pub fn set_volume_value(caps: Option<&AudioVolume>, value: i32) {
    match caps {
        Some(caps) => caps.set_volume_value(value),
        None => absent_state(AUDIO_VOLUME.id),
    }
}

pub fn get_volume_unit(caps: Option<&AudioVolume>) -> Option<String> {
    match caps {
        Some(caps) => caps.volume_unit(),
        None => {
            absent_state(AUDIO_VOLUME.id);
            None
        }
    }
}

pub fn set_volume_unit(caps: Option<&AudioVolume>, unit: &str) {
    match caps {
        Some(caps) => caps.set_volume_unit(unit),
        None => absent_state(AUDIO_VOLUME.id),
    }
}

pub fn attr_volume_send(caps: Option<&AudioVolume>) -> Result<SequenceNumber> {
    match caps {
        Some(caps) => caps.send_volume(),
        None => Err(CapsError::MissingHandle(AUDIO_VOLUME.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Registration;
    use crate::sdk::{AttrValue, CmdArg, LoopbackSdk};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<LoopbackSdk>, Arc<AudioVolume>) {
        let sdk = Arc::new(LoopbackSdk::new());
        let ctx = DeviceContext::new(sdk.clone());
        let volume = AudioVolume::initialize(Some(&ctx), "main", None, None);
        (sdk, volume)
    }

    fn counter_hook(counter: &Arc<AtomicUsize>) -> Hook<AudioVolume> {
        let counter = counter.clone();
        Arc::new(move |_: &AudioVolume| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_set_get_round_trip() {
        let volume = AudioVolume::initialize(None, "main", None, None);
        assert_eq!(volume.volume_value(), VOLUME_UNSET);

        volume.set_volume_value(35);
        assert_eq!(volume.volume_value(), 35);
        assert_eq!(get_volume_value(Some(&volume)), 35);

        set_volume_unit(Some(&volume), "%");
        assert_eq!(volume.volume_unit().as_deref(), Some("%"));
    }

    #[test]
    fn test_absent_state_returns_sentinel() {
        assert_eq!(get_volume_value(None), -1);
        assert_eq!(get_volume_unit(None), None);
        set_volume_value(None, 10);
        assert!(matches!(
            attr_volume_send(None),
            Err(CapsError::MissingHandle(_))
        ));
    }

    #[test]
    fn test_offline_has_no_handle() {
        let volume = AudioVolume::initialize(None, "main", None, None);
        assert!(volume.handle().is_none());
        assert_eq!(volume.registration(), &Registration::Offline);
        assert!(matches!(
            volume.send_volume(),
            Err(CapsError::MissingHandle(_))
        ));
    }

    #[test]
    fn test_registers_all_commands() {
        let (sdk, volume) = setup();
        let handle = volume.handle().unwrap();
        assert_eq!(volume.registration(), &Registration::Registered);
        assert_eq!(
            sdk.registered_commands(handle),
            vec!["setVolume", "volumeDown", "volumeUp"]
        );
    }

    #[test]
    fn test_send_uses_current_values() {
        let (sdk, volume) = setup();
        volume.set_volume_unit("%");
        volume.set_volume_value(20);
        volume.send_volume().unwrap();
        volume.set_volume_value(21);
        let seq = volume.send_volume().unwrap();
        assert_eq!(seq, SequenceNumber(2));

        let sent = sdk.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].events[0].value, AttrValue::Integer(21));
        assert_eq!(sent[1].events[0].unit.as_deref(), Some("%"));
    }

    #[test]
    fn test_set_volume_command() {
        let (sdk, volume) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        volume.set_set_volume_hook(counter_hook(&calls));

        let handle = volume.handle().unwrap();
        sdk.dispatch(handle, &CommandData::new("setVolume", vec![CmdArg::Integer(55)]))
            .unwrap();

        assert_eq!(volume.volume_value(), 55);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let sent = sdk.sent_for(handle);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].events[0].value, AttrValue::Integer(55));
    }

    #[test]
    fn test_set_volume_without_argument_fails_closed() {
        let (sdk, volume) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        volume.set_set_volume_hook(counter_hook(&calls));
        volume.set_volume_value(40);

        let handle = volume.handle().unwrap();
        let err = sdk
            .dispatch(handle, &CommandData::new("setVolume", vec![]))
            .unwrap_err();

        assert!(matches!(
            err,
            CapsError::ArgumentCount {
                expected: 1,
                actual: 0,
                ..
            }
        ));
        assert_eq!(volume.volume_value(), 40);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(sdk.send_attempts(), 0);
    }

    #[test]
    fn test_set_volume_with_wrong_type_fails_closed() {
        let (sdk, volume) = setup();
        volume.set_volume_value(40);

        let handle = volume.handle().unwrap();
        let data = CommandData::new("setVolume", vec![CmdArg::String("loud".into())]);
        let err = sdk.dispatch(handle, &data).unwrap_err();

        assert!(matches!(err, CapsError::InvalidArgument { index: 0, .. }));
        assert_eq!(volume.volume_value(), 40);
        assert_eq!(sdk.send_attempts(), 0);
    }

    #[test]
    fn test_extra_arguments_are_rejected() {
        let (sdk, volume) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        volume.set_volume_up_hook(counter_hook(&calls));
        volume.set_volume_value(40);

        let handle = volume.handle().unwrap();
        let err = sdk
            .dispatch(handle, &CommandData::new("volumeUp", vec![CmdArg::Integer(5)]))
            .unwrap_err();
        assert!(matches!(
            err,
            CapsError::ArgumentCount {
                expected: 0,
                actual: 1,
                ..
            }
        ));

        let two = vec![CmdArg::Integer(10), CmdArg::Integer(20)];
        assert!(sdk.dispatch(handle, &CommandData::new("setVolume", two)).is_err());

        assert_eq!(volume.volume_value(), 40);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(sdk.send_attempts(), 0);
    }

    #[test]
    fn test_volume_up_resends_unchanged_value() {
        let (sdk, volume) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        volume.set_volume_up_hook(counter_hook(&calls));
        volume.set_volume_value(30);

        let handle = volume.handle().unwrap();
        sdk.dispatch(handle, &CommandData::new("volumeUp", vec![])).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let sent = sdk.sent_for(handle);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].events[0].value, AttrValue::Integer(30));
    }

    #[test]
    fn test_volume_down_hook_can_update_value() {
        let (sdk, volume) = setup();
        volume.set_volume_value(30);
        volume.set_volume_down_hook(Arc::new(|caps: &AudioVolume| {
            caps.set_volume_value(caps.volume_value() - 5);
        }));

        let handle = volume.handle().unwrap();
        sdk.dispatch(handle, &CommandData::new("volumeDown", vec![])).unwrap();

        assert_eq!(volume.volume_value(), 25);
        assert_eq!(sdk.sent()[0].events[0].value, AttrValue::Integer(25));
    }

    #[test]
    fn test_init_callback_runs_hook_and_sends() {
        let sdk = Arc::new(LoopbackSdk::new());
        let ctx = DeviceContext::new(sdk.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let volume = AudioVolume::initialize(Some(&ctx), "main", Some(counter_hook(&calls)), None);

        sdk.start();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sdk.sent_for(volume.handle().unwrap()).len(), 1);
    }

    #[test]
    fn test_handle_registration_failure() {
        let sdk = Arc::new(LoopbackSdk::new());
        sdk.reject_handle("audioVolume");
        let ctx = DeviceContext::new(sdk.clone());
        let volume = AudioVolume::initialize(Some(&ctx), "main", None, None);

        assert!(volume.handle().is_none());
        assert_eq!(volume.registration(), &Registration::HandleFailed);
        assert!(
            volume
                .registration()
                .check(volume.id(), volume.component())
                .is_err()
        );
    }

    #[test]
    fn test_partial_command_registration() {
        let sdk = Arc::new(LoopbackSdk::new());
        sdk.reject_command("volumeUp");
        let ctx = DeviceContext::new(sdk.clone());
        let volume = AudioVolume::initialize(Some(&ctx), "main", None, None);

        assert!(volume.handle().is_some());
        assert_eq!(
            volume.registration(),
            &Registration::Degraded {
                missing_commands: vec!["volumeUp"]
            }
        );
        assert_eq!(
            sdk.registered_commands(volume.handle().unwrap()),
            vec!["setVolume", "volumeDown"]
        );
    }

    #[test]
    fn test_transmission_failure_is_reported() {
        let (sdk, volume) = setup();
        sdk.set_fail_send(true);
        let err = volume.send_volume().unwrap_err();
        assert!(matches!(err, CapsError::Transmission { seq, .. } if seq < 0));
    }

    #[test]
    fn test_user_data_is_passed_through() {
        let data: UserData = Arc::new(7u8);
        let volume = AudioVolume::initialize(None, "main", None, Some(data));
        let stored = volume.core().user_data().unwrap();
        assert_eq!(stored.downcast_ref::<u8>(), Some(&7));
    }
}
