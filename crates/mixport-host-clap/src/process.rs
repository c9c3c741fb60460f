//! The real-time audio/MIDI process cycle.
//!
//! The bridge runs on the audio thread once per fixed-size block. It never
//! allocates on the hot path after warm-up and takes exactly one lock: the
//! short activation gate it shares with the UI thread, because
//! (de)activation physically starts and stops the plugin's processing
//! state. When the gate is contended the cycle outputs silence and returns.

use std::ptr;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use clap_abi::{
    clap_audio_buffer, clap_event_header_t, clap_event_transport, clap_plugin, clap_process,
    CLAP_BEATTIME_FACTOR, CLAP_CORE_EVENT_SPACE_ID, CLAP_EVENT_TRANSPORT, CLAP_PROCESS_ERROR,
    CLAP_SECTIME_FACTOR, CLAP_TRANSPORT_HAS_BEATS_TIMELINE, CLAP_TRANSPORT_HAS_SECONDS_TIMELINE,
    CLAP_TRANSPORT_HAS_TEMPO, CLAP_TRANSPORT_HAS_TIME_SIGNATURE, CLAP_TRANSPORT_IS_PLAYING,
};
use mixport_graph::{ControlCell, CycleIo, DriverTransport};

use crate::events::{EventQueue, PluginEvent};
use crate::midi::{encode_output, translate_input};
use crate::ports::PortModel;
use crate::sync::{ParamOutput, ParamSender};

/// Lifecycle of the hosted plugin, shared between the UI thread (which
/// drives activation) and the audio thread (which drives processing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Unloaded = 0,
    /// Loaded, not activated.
    Inactive = 1,
    /// Activated; the audio thread has not started the processing state.
    ActiveIdle = 2,
    ActiveProcessing = 3,
}

impl BridgeState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => BridgeState::Inactive,
            2 => BridgeState::ActiveIdle,
            3 => BridgeState::ActiveProcessing,
            _ => BridgeState::Unloaded,
        }
    }
}

/// State shared between the adapter and the process bridge.
pub struct ProcessShared {
    /// Bounded mutual-exclusion region around (de)activation.
    pub(crate) gate: Mutex<()>,
    state: AtomicU8,
    sample_rate: AtomicU64,
}

impl ProcessShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Mutex::new(()),
            state: AtomicU8::new(BridgeState::Inactive as u8),
            sample_rate: AtomicU64::new(48_000f64.to_bits()),
        })
    }

    pub fn state(&self) -> BridgeState {
        BridgeState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: BridgeState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn sample_rate(&self) -> f64 {
        f64::from_bits(self.sample_rate.load(Ordering::Acquire))
    }

    pub(crate) fn set_sample_rate(&self, sample_rate: f64) {
        self.sample_rate
            .store(sample_rate.to_bits(), Ordering::Release);
    }
}

/// Raw plugin pointer usable from the audio thread. The adapter retains
/// ownership; the embedding application must tear the bridge down before
/// the adapter drops the handle.
#[derive(Clone, Copy)]
pub struct RtPlugin(pub(crate) *const clap_plugin);

unsafe impl Send for RtPlugin {}

impl RtPlugin {
    unsafe fn start_processing(&self) -> bool {
        match (*self.0).start_processing {
            Some(start_processing) => start_processing(self.0),
            None => true,
        }
    }

    unsafe fn process(&self, process: *const clap_process) -> i32 {
        match (*self.0).process {
            Some(process_fn) => process_fn(self.0, process),
            None => CLAP_PROCESS_ERROR,
        }
    }
}

/// Cached transport position, recomputed only when the driver reports a
/// change so protocol transport flags are not re-raised every cycle.
pub struct TransportSnapshot {
    cached: Option<DriverTransport>,
    event: clap_event_transport,
}

impl TransportSnapshot {
    pub fn new() -> Self {
        Self {
            cached: None,
            event: unsafe { std::mem::zeroed() },
        }
    }

    /// Recompute the protocol snapshot if the driver state moved. Returns
    /// whether a recompute happened.
    pub fn update(&mut self, driver: DriverTransport, sample_rate: f64) -> bool {
        if self.cached == Some(driver) {
            return false;
        }
        let seconds = driver.frame as f64 / sample_rate;
        let beats = seconds * driver.tempo_bpm / 60.0;
        let bar_number = (beats / 4.0).floor();

        self.event = clap_event_transport {
            header: clap_event_header_t {
                size: std::mem::size_of::<clap_event_transport>() as u32,
                time: 0,
                space_id: CLAP_CORE_EVENT_SPACE_ID,
                type_: CLAP_EVENT_TRANSPORT,
                flags: 0,
            },
            flags: CLAP_TRANSPORT_HAS_TEMPO
                | CLAP_TRANSPORT_HAS_BEATS_TIMELINE
                | CLAP_TRANSPORT_HAS_SECONDS_TIMELINE
                | CLAP_TRANSPORT_HAS_TIME_SIGNATURE
                | if driver.rolling {
                    CLAP_TRANSPORT_IS_PLAYING
                } else {
                    0
                },
            song_pos_beats: (beats * CLAP_BEATTIME_FACTOR as f64) as i64,
            song_pos_seconds: (seconds * CLAP_SECTIME_FACTOR as f64) as i64,
            tempo: driver.tempo_bpm,
            tempo_inc: 0.0,
            loop_start_beats: 0,
            loop_end_beats: 0,
            loop_start_seconds: 0,
            loop_end_seconds: 0,
            bar_start: (bar_number * 4.0 * CLAP_BEATTIME_FACTOR as f64) as i64,
            bar_number: bar_number as i32,
            tsig_num: 4,
            tsig_denom: 4,
        };
        self.cached = Some(driver);
        true
    }

    pub fn raw(&self) -> *const clap_event_transport {
        &self.event
    }
}

/// Protocol-side layout the bridge marshals against; fixed after load
/// because port rescans are refused.
#[derive(Debug, Clone, Default)]
pub struct BridgeLayout {
    pub in_buses: Vec<u32>,
    pub out_buses: Vec<u32>,
    pub midi_in_ports: usize,
    pub midi_out_ports: usize,
    pub midi_dialect_in: usize,
    pub midi_dialect_out: usize,
}

impl BridgeLayout {
    pub fn from_model(model: &PortModel) -> Self {
        Self {
            in_buses: model
                .audio_in_buses()
                .iter()
                .map(|bus| bus.channel_count)
                .collect(),
            out_buses: model
                .audio_out_buses()
                .iter()
                .map(|bus| bus.channel_count)
                .collect(),
            midi_in_ports: model.midi_in_ports(),
            midi_out_ports: model.midi_out_ports(),
            midi_dialect_in: model.midi_dialect_in(),
            midi_dialect_out: model.midi_dialect_out(),
        }
    }
}

/// Audio-thread half of the adapter.
pub struct ProcessBridge {
    plugin: RtPlugin,
    shared: Arc<ProcessShared>,
    layout: BridgeLayout,
    transport: TransportSnapshot,
    in_events: EventQueue,
    out_events: EventQueue,
    /// Note/MIDI output events carried to the next cycle's driver buffers.
    pending_midi_out: Vec<PluginEvent>,
    param_out: ParamSender,
    bypass: Option<Arc<ControlCell>>,
    steady_time: i64,
    // Per-bus channel pointer scratch, refilled every cycle.
    in_ptrs: Vec<Vec<*mut f32>>,
    out_ptrs: Vec<Vec<*mut f32>>,
    in_buffers: Vec<clap_audio_buffer>,
    out_buffers: Vec<clap_audio_buffer>,
    process_errors: u64,
    encode_errors: u64,
}

unsafe impl Send for ProcessBridge {}

impl ProcessBridge {
    pub fn new(
        plugin: RtPlugin,
        shared: Arc<ProcessShared>,
        layout: BridgeLayout,
        param_out: ParamSender,
        bypass: Option<Arc<ControlCell>>,
    ) -> Self {
        let in_ptrs: Vec<Vec<*mut f32>> = layout
            .in_buses
            .iter()
            .map(|&channels| vec![ptr::null_mut(); channels as usize])
            .collect();
        let out_ptrs: Vec<Vec<*mut f32>> = layout
            .out_buses
            .iter()
            .map(|&channels| vec![ptr::null_mut(); channels as usize])
            .collect();
        let empty_buffer = || clap_audio_buffer {
            data32: ptr::null_mut(),
            data64: ptr::null_mut(),
            channel_count: 0,
            latency: 0,
            constant_mask: 0,
        };
        let in_buffers = layout.in_buses.iter().map(|_| empty_buffer()).collect();
        let out_buffers = layout.out_buses.iter().map(|_| empty_buffer()).collect();
        Self {
            plugin,
            shared,
            layout,
            transport: TransportSnapshot::new(),
            in_events: EventQueue::default(),
            out_events: EventQueue::default(),
            pending_midi_out: Vec::with_capacity(64),
            param_out,
            bypass,
            steady_time: 0,
            in_ptrs,
            out_ptrs,
            in_buffers,
            out_buffers,
            process_errors: 0,
            encode_errors: 0,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.shared.state()
    }

    fn bypassed(&self) -> bool {
        self.bypass
            .as_ref()
            .is_some_and(|cell| cell.get() >= 0.5)
    }

    /// Run one audio cycle.
    pub fn process_cycle(&mut self, io: &mut CycleIo<'_>) {
        // The only lock on the hot path; contended exclusively during the
        // bounded (de)activation window.
        let Some(_guard) = self.shared.gate.try_lock() else {
            silence(io);
            return;
        };

        match self.shared.state() {
            BridgeState::ActiveProcessing => {}
            BridgeState::ActiveIdle => {
                if unsafe { self.plugin.start_processing() } {
                    self.shared.set_state(BridgeState::ActiveProcessing);
                } else {
                    silence(io);
                    return;
                }
            }
            BridgeState::Unloaded | BridgeState::Inactive => {
                silence(io);
                return;
            }
        }

        if self.bypassed() {
            bypass_passthrough(io);
            self.in_events.clear();
            return;
        }

        // 1. Transport, recomputed only when the driver moved.
        let sample_rate = self.shared.sample_rate();
        self.transport.update(io.transport, sample_rate);

        // 2. Driver MIDI in -> protocol events.
        let dialect_in = self.layout.midi_dialect_in > 0;
        for (port, bytes) in io.midi_in.iter().enumerate().take(self.layout.midi_in_ports) {
            let queue = &mut self.in_events;
            translate_input(bytes, port as u16, dialect_in, |event| queue.push(&event));
        }

        // 3. Protocol events from the previous call -> driver MIDI out.
        for event in self.pending_midi_out.drain(..) {
            let port = match event {
                PluginEvent::NoteOn { port, .. } | PluginEvent::NoteOff { port, .. } => port as usize,
                PluginEvent::Midi { port, .. } => port as usize,
                _ => continue,
            };
            let Some(buffer) = io.midi_out.get_mut(port) else {
                continue;
            };
            let mut sink = |bytes: &[u8]| buffer.push(bytes);
            if encode_output(&event, &mut sink).is_err() {
                self.encode_errors += 1;
            }
        }

        // 4. Marshal per-channel pointers in (bus, channel) order.
        let frames = io.frames;
        let mut next_in = 0;
        for (bus, ptrs) in self.in_ptrs.iter_mut().enumerate() {
            for slot in ptrs.iter_mut() {
                *slot = io
                    .audio_in
                    .get(next_in)
                    .map(|slice| slice.as_ptr() as *mut f32)
                    .unwrap_or(ptr::null_mut());
                next_in += 1;
            }
            self.in_buffers[bus].data32 = ptrs.as_mut_ptr();
            self.in_buffers[bus].channel_count = ptrs.len() as u32;
        }
        let mut next_out = 0;
        for (bus, ptrs) in self.out_ptrs.iter_mut().enumerate() {
            for slot in ptrs.iter_mut() {
                *slot = io
                    .audio_out
                    .get_mut(next_out)
                    .map(|slice| slice.as_mut_ptr())
                    .unwrap_or(ptr::null_mut());
                next_out += 1;
            }
            self.out_buffers[bus].data32 = ptrs.as_mut_ptr();
            self.out_buffers[bus].channel_count = ptrs.len() as u32;
        }

        // 5. Invoke the plugin.
        let in_list = self.in_events.as_input_list();
        let out_list = self.out_events.as_output_list();
        let process = clap_process {
            steady_time: self.steady_time,
            frames_count: frames,
            transport: self.transport.raw(),
            audio_inputs: self.in_buffers.as_ptr(),
            audio_outputs: self.out_buffers.as_mut_ptr(),
            audio_inputs_count: self.in_buffers.len() as u32,
            audio_outputs_count: self.out_buffers.len() as u32,
            in_events: &in_list,
            out_events: &out_list,
        };
        let status = unsafe { self.plugin.process(&process) };
        if status == CLAP_PROCESS_ERROR {
            self.process_errors += 1;
        }
        self.steady_time += i64::from(frames);

        // 6. Input records are spent; route the output split.
        self.in_events.clear();
        while let Some(event) = self.out_events.pop_event() {
            if let Some(param) = ParamOutput::from_event(&event) {
                self.param_out.send(param);
            } else {
                self.pending_midi_out.push(event);
            }
        }
    }

    pub fn process_errors(&self) -> u64 {
        self.process_errors
    }

    /// MIDI re-encode failures, reported rather than raised.
    pub fn encode_errors(&self) -> u64 {
        self.encode_errors
    }
}

fn silence(io: &mut CycleIo<'_>) {
    for channel in io.audio_out.iter_mut() {
        channel.fill(0.0);
    }
}

/// Pass input through unmodified for matching channel counts and the
/// common 1-in/2-out duplication case; other mismatches are left
/// untouched.
fn bypass_passthrough(io: &mut CycleIo<'_>) {
    let frames = io.frames as usize;
    if io.audio_in.len() == io.audio_out.len() {
        for (dst, src) in io.audio_out.iter_mut().zip(io.audio_in.iter()) {
            let n = frames.min(dst.len()).min(src.len());
            dst[..n].copy_from_slice(&src[..n]);
        }
    } else if io.audio_in.len() == 1 && io.audio_out.len() == 2 {
        let src = io.audio_in[0];
        for dst in io.audio_out.iter_mut() {
            let n = frames.min(dst.len()).min(src.len());
            dst[..n].copy_from_slice(&src[..n]);
        }
    }
}

/// Latency contract: a live plugin's self-reported latency is not safe to
/// re-query mid-stream, so the bridge reports 0 while active and defers to
/// the latency extension only while inactive. Restarting after a
/// `latency.changed` callback is what refreshes the cached value.
pub fn effective_latency(state: BridgeState, query: impl Fn() -> Option<u32>) -> u32 {
    match state {
        BridgeState::ActiveIdle | BridgeState::ActiveProcessing => 0,
        BridgeState::Unloaded | BridgeState::Inactive => query().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::param_channel;
    use clap_abi::{
        clap_event_header, clap_event_param_value, clap_process_status, CLAP_EVENT_PARAM_VALUE,
        CLAP_PROCESS_CONTINUE,
    };
    use mixport_graph::MidiOutBuffer;

    // A scripted in-process plugin: echoes note events back to the output
    // queue, reports one parameter value per call, and writes a marker
    // into its first output channel.
    unsafe extern "C" fn fake_process(
        _plugin: *const clap_plugin,
        process: *const clap_process,
    ) -> clap_process_status {
        let process = &*process;
        let in_events = &*process.in_events;
        let out_events = &*process.out_events;
        let n = (in_events.size.unwrap())(in_events);
        for i in 0..n {
            let header = (in_events.get.unwrap())(in_events, i);
            (out_events.try_push.unwrap())(out_events, header);
        }
        let param = clap_event_param_value {
            header: clap_event_header {
                size: std::mem::size_of::<clap_event_param_value>() as u32,
                time: 0,
                space_id: CLAP_CORE_EVENT_SPACE_ID,
                type_: CLAP_EVENT_PARAM_VALUE,
                flags: 0,
            },
            param_id: 7,
            cookie: std::ptr::null_mut(),
            note_id: -1,
            port_index: -1,
            channel: -1,
            key: -1,
            value: 0.42,
        };
        (out_events.try_push.unwrap())(out_events, &param.header);
        if process.audio_outputs_count > 0 {
            let bus = &*process.audio_outputs;
            if bus.channel_count > 0 && process.frames_count > 0 {
                let channel = *bus.data32;
                if !channel.is_null() {
                    *channel = 1.0;
                }
            }
        }
        CLAP_PROCESS_CONTINUE
    }

    fn fake_plugin() -> Box<clap_plugin> {
        Box::new(clap_plugin {
            desc: std::ptr::null(),
            plugin_data: std::ptr::null_mut(),
            init: None,
            destroy: None,
            activate: None,
            deactivate: None,
            start_processing: None,
            stop_processing: None,
            reset: None,
            process: Some(fake_process),
            get_extension: None,
            on_main_thread: None,
        })
    }

    fn stereo_layout() -> BridgeLayout {
        BridgeLayout {
            in_buses: vec![2],
            out_buses: vec![2],
            midi_in_ports: 1,
            midi_out_ports: 1,
            midi_dialect_in: 1,
            midi_dialect_out: 1,
        }
    }

    struct Rig {
        bridge: ProcessBridge,
        shared: Arc<ProcessShared>,
        rx: crossbeam_channel::Receiver<ParamOutput>,
        _plugin: Box<clap_plugin>,
    }

    fn rig(bypass: Option<Arc<ControlCell>>) -> Rig {
        let plugin = fake_plugin();
        let shared = ProcessShared::new();
        let (tx, rx) = param_channel(64);
        let bridge = ProcessBridge::new(
            RtPlugin(&*plugin),
            shared.clone(),
            stereo_layout(),
            tx,
            bypass,
        );
        Rig {
            bridge,
            shared,
            rx,
            _plugin: plugin,
        }
    }

    fn run_cycle(
        bridge: &mut ProcessBridge,
        midi_in: &[u8],
        transport: DriverTransport,
    ) -> (Vec<Vec<f32>>, Vec<u8>) {
        let frames = 16;
        let in_l = vec![0.25f32; frames];
        let in_r = vec![0.25f32; frames];
        let mut out_l = vec![0.0f32; frames];
        let mut out_r = vec![0.0f32; frames];
        let mut midi_out = [MidiOutBuffer::with_capacity(64)];
        {
            let audio_in: [&[f32]; 2] = [&in_l, &in_r];
            let mut out_slices: [&mut [f32]; 2] = [&mut out_l, &mut out_r];
            let midi_streams: [&[u8]; 1] = [midi_in];
            let mut io = CycleIo {
                frames: frames as u32,
                transport,
                audio_in: &audio_in,
                audio_out: &mut out_slices,
                midi_in: &midi_streams,
                midi_out: &mut midi_out,
            };
            bridge.process_cycle(&mut io);
        }
        (vec![out_l, out_r], midi_out[0].as_bytes().to_vec())
    }

    #[test]
    fn inactive_bridge_outputs_silence() {
        let mut rig = rig(None);
        let (out, _) = run_cycle(&mut rig.bridge, &[], DriverTransport::default());
        assert!(out.iter().all(|c| c.iter().all(|&s| s == 0.0)));
        assert_eq!(rig.bridge.state(), BridgeState::Inactive);
    }

    #[test]
    fn first_cycle_enters_processing_and_reaches_the_plugin() {
        let mut rig = rig(None);
        rig.shared.set_state(BridgeState::ActiveIdle);
        let (out, _) = run_cycle(&mut rig.bridge, &[], DriverTransport::default());
        assert_eq!(rig.bridge.state(), BridgeState::ActiveProcessing);
        // The fake plugin writes a marker through the marshalled pointer.
        assert_eq!(out[0][0], 1.0);
    }

    #[test]
    fn param_events_route_to_the_synchronizer_channel() {
        let mut rig = rig(None);
        rig.shared.set_state(BridgeState::ActiveIdle);
        run_cycle(&mut rig.bridge, &[], DriverTransport::default());
        assert_eq!(
            rig.rx.try_recv(),
            Ok(ParamOutput::Value { id: 7, value: 0.42 })
        );
    }

    #[test]
    fn echoed_notes_come_back_as_midi_on_the_next_cycle() {
        let mut rig = rig(None);
        rig.shared.set_state(BridgeState::ActiveIdle);
        let (_, first) = run_cycle(&mut rig.bridge, &[0x90, 60, 127], DriverTransport::default());
        assert!(first.is_empty());
        let (_, second) = run_cycle(&mut rig.bridge, &[], DriverTransport::default());
        assert_eq!(second, vec![0x90, 60, 127]);
    }

    #[test]
    fn bypass_duplicates_input_and_skips_the_plugin() {
        let cell = ControlCell::new(1.0);
        let mut rig = rig(Some(cell));
        rig.shared.set_state(BridgeState::ActiveProcessing);
        let (out, _) = run_cycle(&mut rig.bridge, &[], DriverTransport::default());
        assert!(out[0].iter().all(|&s| s == 0.25));
        assert!(out[1].iter().all(|&s| s == 0.25));
        assert!(rig.rx.try_recv().is_err());
    }

    #[test]
    fn transport_snapshot_recomputes_only_on_change() {
        let mut snapshot = TransportSnapshot::new();
        let driver = DriverTransport {
            frame: 48_000,
            tempo_bpm: 120.0,
            rolling: true,
        };
        assert!(snapshot.update(driver, 48_000.0));
        assert!(!snapshot.update(driver, 48_000.0));
        let moved = DriverTransport {
            frame: 48_128,
            ..driver
        };
        assert!(snapshot.update(moved, 48_000.0));

        let event = unsafe { &*snapshot.raw() };
        assert_ne!(event.flags & CLAP_TRANSPORT_IS_PLAYING, 0);
        // One second at 120 bpm is two beats.
        let beats = event.song_pos_beats as f64 / CLAP_BEATTIME_FACTOR as f64;
        assert!((beats - (48_128.0 / 48_000.0 * 2.0)).abs() < 1e-6);
    }

    #[test]
    fn steady_time_advances_by_block_size() {
        let mut rig = rig(None);
        rig.shared.set_state(BridgeState::ActiveIdle);
        run_cycle(&mut rig.bridge, &[], DriverTransport::default());
        run_cycle(&mut rig.bridge, &[], DriverTransport::default());
        assert_eq!(rig.bridge.steady_time, 32);
    }

    #[test]
    fn latency_is_zero_while_active() {
        assert_eq!(effective_latency(BridgeState::ActiveProcessing, || Some(64)), 0);
        assert_eq!(effective_latency(BridgeState::Inactive, || Some(64)), 64);
        assert_eq!(effective_latency(BridgeState::Inactive, || None), 0);
    }
}
