//! The mixer-facing adapter: one loaded plugin, its host surface, its
//! generic port set, and the UI-thread service loop.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use mixport_graph::{current_thread_role, ControlCell, ThreadRole};

use crate::config::HostConfig;
use crate::error::HostError;
use crate::events::EventQueue;
use crate::gui::{EmbeddingHost, GuiManager, GuiState};
use crate::host::HostHandle;
use crate::instance::PluginHandle;
use crate::loader::{ClapLibrary, PluginDescriptor};
use crate::ports::PortModel;
use crate::process::{
    effective_latency, BridgeLayout, BridgeState, ProcessBridge, ProcessShared, RtPlugin,
};
use crate::state::{self, SessionRecord};
use crate::sync::{param_channel, GestureSync, ParamOutput, ParamSender};

/// Owns a hosted plugin end to end: dynamic library, live instance, host
/// callback surface, port model, and the UI-side service state.
///
/// The audio half is split off once via [`ClapAdapter::take_bridge`] and
/// moved to the realtime thread; the embedding application must stop that
/// thread (dropping the bridge) before dropping the adapter, which owns
/// the plugin the bridge points into.
pub struct ClapAdapter {
    // Field order is drop order: the plugin instance goes first, the host
    // surface it may still reference second, the library (entry deinit)
    // last.
    handle: PluginHandle,
    ports: PortModel,
    gui: GuiManager,
    sync: GestureSync,
    shared: Arc<ProcessShared>,
    bypass: Arc<ControlCell>,
    param_tx: Option<ParamSender>,
    audio_config: Option<(f64, u32)>,
    host: HostHandle,
    library: ClapLibrary,
}

impl ClapAdapter {
    /// Load `plugin_id` from the library at `path`. The host surface is
    /// installed before plugin `init` runs; any failure aborts the whole
    /// sequence with nothing registered.
    pub fn load(path: &Path, plugin_id: &str, config: &HostConfig) -> Result<Self, HostError> {
        let library = unsafe { ClapLibrary::load_with_fallback(path, &config.search_roots)? };
        let host = HostHandle::new(config);
        let raw_descriptor = library.find_descriptor(plugin_id)?;
        let factory = library.factory()?;
        let handle = unsafe { PluginHandle::create(factory, raw_descriptor, host.as_raw())? };

        let bypass = ControlCell::new(0.0);
        let ports = PortModel::scan(&handle, bypass.clone());
        let (param_tx, param_rx) = param_channel(1024);

        Ok(Self {
            library,
            handle,
            host,
            ports,
            gui: GuiManager::new(),
            sync: GestureSync::new(param_rx),
            shared: ProcessShared::new(),
            bypass,
            param_tx: Some(param_tx),
            audio_config: None,
        })
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        self.handle.descriptor()
    }

    pub fn library_path(&self) -> &Path {
        self.library.path()
    }

    pub fn ports(&self) -> &PortModel {
        &self.ports
    }

    pub fn bridge_state(&self) -> BridgeState {
        self.shared.state()
    }

    /// Split off the audio-thread half. Returns `None` after the first
    /// call.
    pub fn take_bridge(&mut self) -> Option<ProcessBridge> {
        let param_tx = self.param_tx.take()?;
        Some(ProcessBridge::new(
            RtPlugin(self.handle.raw()),
            self.shared.clone(),
            BridgeLayout::from_model(&self.ports),
            param_tx,
            self.ports.bypass_cell(),
        ))
    }

    /// Activate for the given audio configuration. Activating an active
    /// plugin reports `ActivationPrecondition`.
    pub fn activate(&mut self, sample_rate: f64, max_frames: u32) -> Result<(), HostError> {
        let _guard = self.shared.gate.lock();
        unsafe { self.handle.activate(sample_rate, 1, max_frames)? };
        self.shared.set_sample_rate(sample_rate);
        self.shared.set_state(BridgeState::ActiveIdle);
        self.audio_config = Some((sample_rate, max_frames));
        Ok(())
    }

    /// Deactivate from any active state. The gate excludes the audio
    /// callback for the duration, so the plugin is never mid-process here.
    pub fn deactivate(&mut self) {
        let _guard = self.shared.gate.lock();
        if self.shared.state() == BridgeState::ActiveProcessing {
            unsafe { self.handle.stop_processing() };
        }
        unsafe { self.handle.deactivate() };
        self.shared.set_state(BridgeState::Inactive);
    }

    /// Deactivate/reactivate cycle, used when the plugin renegotiates
    /// latency or asks for a restart.
    pub fn restart(&mut self) -> Result<(), HostError> {
        let Some((sample_rate, max_frames)) = self.audio_config else {
            return Ok(());
        };
        self.deactivate();
        self.activate(sample_rate, max_frames)
    }

    /// Flush the plugin's internal buffers after a transport relocation.
    /// Runs under the gate so the audio callback is excluded.
    pub fn reset(&mut self) {
        let _guard = self.shared.gate.lock();
        unsafe { self.handle.reset() };
    }

    /// Reported latency: 0 while active, the latency extension's answer
    /// while inactive.
    pub fn latency(&self) -> u32 {
        effective_latency(self.shared.state(), || {
            let get = self.handle.extensions().latency()?.get?;
            Some(unsafe { get(self.handle.raw()) })
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.host.shared().is_dirty()
    }

    pub fn clear_dirty(&self) {
        self.host.shared().clear_dirty()
    }

    /// Whether the plugin asked to be woken for processing since the last
    /// call; the embedding mixer decides what to do with it.
    pub fn take_process_request(&self) -> bool {
        self.host.shared().take_process_request()
    }

    /// The periodic UI-thread tick: gesture replay, deferred flags, param
    /// flush, timers and GUI traffic. Must run on the registered main
    /// thread.
    pub fn ui_tick(&mut self, embedder: &mut dyn EmbeddingHost, now: Instant) {
        if current_thread_role() != ThreadRole::Main {
            log::warn!("ui_tick called off the registered main thread; skipping");
            return;
        }

        self.drain_gestures();

        // Parameter flush is only legal while the plugin is not in its
        // processing state.
        if self.host.shared().take_flush_request() {
            let state = self.shared.state();
            if state == BridgeState::Inactive || state == BridgeState::ActiveIdle {
                self.flush_params();
            }
        }

        let (values_only, full) = self.host.shared().take_rescan_requests();
        if full {
            self.ports = PortModel::scan(&self.handle, self.bypass.clone());
            log::info!(
                "rebuilt port set after parameter rescan ({} ports)",
                self.ports.ports().len()
            );
        } else if values_only {
            self.ports.refresh_values(&self.handle);
        }

        self.service_timers(now);

        self.gui.service(
            self.handle.raw(),
            self.handle.extensions().gui(),
            embedder,
            &self.host.shared().gui,
        );

        if self.host.shared().take_restart_request() {
            if let Err(err) = self.restart() {
                log::error!("deferred restart failed: {err}");
            }
        }

        // Cleared before the call so thread-check answers truthfully while
        // the plugin runs its main-thread work.
        if self.host.shared().take_callback_request() {
            unsafe { self.handle.on_main_thread() };
        }
    }

    fn drain_gestures(&mut self) {
        let Self {
            ref mut sync,
            ref ports,
            ref host,
            ..
        } = *self;
        sync.drain(|id, value| Self::apply_param(ports, host, id, value));
    }

    fn apply_param(ports: &PortModel, host: &HostHandle, id: u32, value: f64) {
        match ports.port_index_for_param(id) {
            Some(index) => {
                // Applied to the generic control only; re-propagating into
                // the plugin would loop the change back.
                ports.ports()[index].set_control_value(value);
                host.shared().mark_dirty();
            }
            None => {
                // Read-only/output parameters legitimately show up in the
                // event stream without being host-settable.
                log::debug!("ignoring value for unknown or read-only parameter {id}");
            }
        }
    }

    /// Run `params.flush` with an empty input list, feeding any parameter
    /// events the plugin emits straight into gesture handling.
    fn flush_params(&mut self) {
        let Some(params) = self.handle.extensions().params() else {
            return;
        };
        let Some(flush) = params.flush else {
            return;
        };
        let in_queue = EventQueue::default();
        let mut out_queue = EventQueue::default();
        let in_list = in_queue.as_input_list();
        let out_list = out_queue.as_output_list();
        unsafe { flush(self.handle.raw(), &in_list, &out_list) };

        let Self {
            ref mut sync,
            ref ports,
            ref host,
            ..
        } = *self;
        while let Some(event) = out_queue.pop_event() {
            if let Some(output) = ParamOutput::from_event(&event) {
                sync.handle(output, |id, value| Self::apply_param(ports, host, id, value));
            }
        }
    }

    fn service_timers(&mut self, now: Instant) {
        let due = self.host.shared().timers.lock().due(now);
        if due.is_empty() {
            return;
        }
        // A plugin may have registered its first timer from init, before
        // the extension set was cached; re-resolve lazily.
        if self.handle.extensions().timer().is_none() {
            self.handle.refresh_extensions();
        }
        let Some(on_timer) = self.handle.extensions().timer().and_then(|ext| ext.on_timer) else {
            return;
        };
        for id in due {
            unsafe { on_timer(self.handle.raw(), id) };
        }
    }

    /// Open the plugin editor or toggle its visibility.
    pub fn open_editor(&mut self, embedder: &mut dyn EmbeddingHost) -> GuiState {
        let title = self.handle.descriptor().name.clone();
        self.gui.try_open(
            self.handle.raw(),
            self.handle.extensions().gui(),
            embedder,
            &title,
        )
    }

    pub fn close_editor(&mut self, embedder: &mut dyn EmbeddingHost) {
        self.gui
            .close(self.handle.raw(), self.handle.extensions().gui(), embedder);
    }

    pub fn editor_state(&self) -> GuiState {
        self.gui.state()
    }

    pub fn save_state(&self) -> Result<Option<Vec<u8>>, HostError> {
        state::save_state(self.handle.raw(), self.handle.extensions().state())
    }

    pub fn load_state(&self, blob: &[u8]) -> Result<bool, HostError> {
        state::load_state(self.handle.raw(), self.handle.extensions().state(), blob)
    }

    pub fn save_state_to_file(&self, path: &Path) -> Result<bool, HostError> {
        state::save_state_to_file(self.handle.raw(), self.handle.extensions().state(), path)
    }

    pub fn restore_state_from_file(&self, path: &Path) -> Result<bool, HostError> {
        state::restore_state_from_file(self.handle.raw(), self.handle.extensions().state(), path)
    }

    /// Project log fields for this instance.
    pub fn session_record(&self, state_file: Option<&Path>) -> SessionRecord {
        SessionRecord {
            path: self.library.path().to_path_buf(),
            plugin_id: self.handle.descriptor().id.clone(),
            audio_inputs: self.ports.input_channel_total() as u32,
            audio_outputs: self.ports.output_channel_total() as u32,
            state_file: state_file.map(Path::to_path_buf),
        }
    }
}

impl Drop for ClapAdapter {
    fn drop(&mut self) {
        self.deactivate();
    }
}
