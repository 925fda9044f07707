//! In-process SDK boundary.
//!
//! `LoopbackSdk` stands in for the vendor SDK: it hands out handles, keeps
//! command callbacks, dispatches commands to them and records every
//! transmitted attribute event instead of putting it on the network.
//! Registration and transmission failures can be injected to exercise the
//! adapters' error paths.

use super::{AttrEvent, CapHandle, CommandCallback, CommandData, InitCallback, StBoundary};
use crate::error::{CapsError, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

/// One accepted `send_attributes` call.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub handle: CapHandle,
    pub seq: i32,
    pub events: Vec<AttrEvent>,
    /// JSON payload per event
    pub payloads: Vec<String>,
    pub at: DateTime<Utc>,
}

struct Registration {
    component: String,
    capability_id: String,
    init_cb: InitCallback,
    commands: HashMap<String, CommandCallback>,
}

#[derive(Default)]
struct Faults {
    reject_handles: HashSet<String>,
    reject_commands: HashSet<String>,
}

/// Loopback implementation of [`StBoundary`].
pub struct LoopbackSdk {
    registrations: Mutex<HashMap<CapHandle, Registration>>,
    sent: Mutex<Vec<SentMessage>>,
    faults: Mutex<Faults>,
    fail_send: AtomicBool,
    next_handle: AtomicU32,
    next_seq: AtomicI32,
    send_attempts: AtomicU32,
}

impl LoopbackSdk {
    pub fn new() -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
            fail_send: AtomicBool::new(false),
            next_handle: AtomicU32::new(1),
            next_seq: AtomicI32::new(1),
            send_attempts: AtomicU32::new(0),
        }
    }

    /// Refuse handle registration for a capability id.
    pub fn reject_handle(&self, capability_id: &str) {
        self.faults
            .lock()
            .reject_handles
            .insert(capability_id.to_string());
    }

    /// Refuse callback registration for a command name.
    pub fn reject_command(&self, command: &str) {
        self.faults
            .lock()
            .reject_commands
            .insert(command.to_string());
    }

    /// Make every subsequent send report a negative sequence number.
    pub fn set_fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Run the init callback of every registered handle, the way the SDK
    /// does once the device connection comes up.
    pub fn start(&self) {
        let callbacks: Vec<(CapHandle, InitCallback)> = self
            .registrations
            .lock()
            .iter()
            .map(|(handle, reg)| (*handle, reg.init_cb.clone()))
            .collect();
        info!("[Loopback] starting {} capability handle(s)", callbacks.len());
        for (handle, cb) in callbacks {
            cb(handle);
        }
    }

    /// Deliver a command to the callback registered for it.
    pub fn dispatch(&self, handle: CapHandle, data: &CommandData) -> Result<()> {
        let cb = self
            .registrations
            .lock()
            .get(&handle)
            .and_then(|reg| reg.commands.get(data.command()).cloned())
            .ok_or_else(|| CapsError::UnknownCommand {
                handle: handle.0,
                command: data.command().to_string(),
            })?;
        debug!(
            "[Loopback] dispatch {} to handle {} with {} arg(s)",
            data.command(),
            handle,
            data.num_args()
        );
        cb(handle, data)
    }

    /// Handle registered for `capability_id` on `component`, if any.
    pub fn find_handle(&self, component: &str, capability_id: &str) -> Option<CapHandle> {
        self.registrations
            .lock()
            .iter()
            .find(|(_, reg)| reg.component == component && reg.capability_id == capability_id)
            .map(|(handle, _)| *handle)
    }

    pub fn is_registered(&self, handle: CapHandle) -> bool {
        self.registrations.lock().contains_key(&handle)
    }

    pub fn registered_commands(&self, handle: CapHandle) -> Vec<String> {
        let mut commands: Vec<String> = self
            .registrations
            .lock()
            .get(&handle)
            .map(|reg| reg.commands.keys().cloned().collect())
            .unwrap_or_default();
        commands.sort();
        commands
    }

    pub fn handle_count(&self) -> usize {
        self.registrations.lock().len()
    }

    /// Every accepted transmission so far, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_for(&self, handle: CapHandle) -> Vec<SentMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|msg| msg.handle == handle)
            .cloned()
            .collect()
    }

    /// Number of `send_attributes` calls, including failed ones.
    pub fn send_attempts(&self) -> u32 {
        self.send_attempts.load(Ordering::SeqCst)
    }
}

impl Default for LoopbackSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl StBoundary for LoopbackSdk {
    fn register_handle(
        &self,
        component: &str,
        capability_id: &str,
        init_cb: InitCallback,
    ) -> Option<CapHandle> {
        if self.faults.lock().reject_handles.contains(capability_id) {
            warn!(
                "[Loopback] rejecting handle for {} on {}",
                capability_id, component
            );
            return None;
        }
        let handle = CapHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.registrations.lock().insert(
            handle,
            Registration {
                component: component.to_string(),
                capability_id: capability_id.to_string(),
                init_cb,
                commands: HashMap::new(),
            },
        );
        debug!(
            "[Loopback] registered {} on {} as {}",
            capability_id, component, handle
        );
        Some(handle)
    }

    fn register_command(&self, handle: CapHandle, command: &str, cb: CommandCallback) -> i32 {
        if self.faults.lock().reject_commands.contains(command) {
            return -1;
        }
        match self.registrations.lock().get_mut(&handle) {
            Some(reg) => {
                reg.commands.insert(command.to_string(), cb);
                0
            }
            None => -2,
        }
    }

    fn send_attributes(&self, handle: CapHandle, events: &[AttrEvent]) -> i32 {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) || !self.is_registered(handle) {
            return -1;
        }
        let payloads = match events
            .iter()
            .map(AttrEvent::to_payload)
            .collect::<Result<Vec<_>>>()
        {
            Ok(payloads) => payloads,
            Err(e) => {
                warn!("[Loopback] failed to encode events: {}", e);
                return -1;
            }
        };
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().push(SentMessage {
            handle,
            seq,
            events: events.to_vec(),
            payloads,
            at: Utc::now(),
        });
        seq
    }

    fn start(&self) {
        LoopbackSdk::start(self);
    }

    fn release_handle(&self, handle: CapHandle) {
        if self.registrations.lock().remove(&handle).is_some() {
            debug!("[Loopback] released {}", handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn noop_init() -> InitCallback {
        Arc::new(|_| {})
    }

    #[test]
    fn test_handles_are_unique() {
        let sdk = LoopbackSdk::new();
        let a = sdk.register_handle("main", "audioVolume", noop_init()).unwrap();
        let b = sdk.register_handle("main", "contactSensor", noop_init()).unwrap();
        assert_ne!(a, b);
        assert_eq!(sdk.find_handle("main", "contactSensor"), Some(b));
        assert_eq!(sdk.handle_count(), 2);
    }

    #[test]
    fn test_rejected_handle() {
        let sdk = LoopbackSdk::new();
        sdk.reject_handle("audioVolume");
        assert!(sdk.register_handle("main", "audioVolume", noop_init()).is_none());
        assert_eq!(sdk.handle_count(), 0);
    }

    #[test]
    fn test_dispatch_reaches_callback() {
        let sdk = LoopbackSdk::new();
        let handle = sdk.register_handle("main", "audioVolume", noop_init()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = calls.clone();
        let status = sdk.register_command(
            handle,
            "volumeUp",
            Arc::new(move |_, _: &CommandData| {
                calls_cb.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        assert_eq!(status, 0);

        sdk.dispatch(handle, &CommandData::new("volumeUp", vec![])).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let err = sdk
            .dispatch(handle, &CommandData::new("mute", vec![]))
            .unwrap_err();
        assert!(matches!(err, CapsError::UnknownCommand { .. }));
    }

    #[test]
    fn test_send_records_payload() {
        let sdk = LoopbackSdk::new();
        let handle = sdk.register_handle("main", "audioVolume", noop_init()).unwrap();
        let seq = sdk.send_attributes(handle, &[AttrEvent::integer("volume", 5, Some("%"))]);
        assert_eq!(seq, 1);

        let sent = sdk.sent_for(handle);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payloads[0], r#"{"name":"volume","value":5,"unit":"%"}"#);

        sdk.set_fail_send(true);
        assert!(sdk.send_attributes(handle, &[AttrEvent::integer("volume", 6, None)]) < 0);
        assert_eq!(sdk.sent().len(), 1);
        assert_eq!(sdk.send_attempts(), 2);
    }

    #[test]
    fn test_release_handle() {
        let sdk = LoopbackSdk::new();
        let handle = sdk.register_handle("main", "audioVolume", noop_init()).unwrap();
        sdk.release_handle(handle);
        assert!(!sdk.is_registered(handle));
        assert!(sdk.send_attributes(handle, &[AttrEvent::integer("volume", 1, None)]) < 0);
    }
}
