//! Hand-maintained `#[repr(C)]` rendition of the CLAP plugin ABI.
//!
//! Only the surface the Mixport bridge actually consumes is declared here:
//! entry/factory/plugin core, the process call, the event records, the
//! stream/window types, and the extensions the host binds (audio-ports,
//! note-ports, params, state, gui, latency, timer-support, thread-check,
//! log). Struct layouts follow the upstream C headers field for field; all
//! function pointers are nullable because a misbehaving binary may ship a
//! partially filled vtable.

#![no_std]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

use core::ffi::{c_char, c_void};

pub type clap_id = u32;
pub const CLAP_INVALID_ID: clap_id = u32::MAX;

pub const CLAP_NAME_SIZE: usize = 256;
pub const CLAP_PATH_SIZE: usize = 1024;

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct clap_version {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
}
pub type clap_version_t = clap_version;

pub const CLAP_VERSION_MAJOR: u32 = 1;
pub const CLAP_VERSION_MINOR: u32 = 2;
pub const CLAP_VERSION_REVISION: u32 = 2;

/// ABI version these declarations were written against.
pub const CLAP_VERSION: clap_version_t = clap_version_t {
    major: CLAP_VERSION_MAJOR,
    minor: CLAP_VERSION_MINOR,
    revision: CLAP_VERSION_REVISION,
};

/// Versions are compatible when the major revisions match; 0.x releases
/// predate ABI stability and never qualify.
pub const fn clap_version_is_compatible(v: clap_version_t) -> bool {
    v.major == CLAP_VERSION_MAJOR && v.major >= 1
}

// ---------------------------------------------------------------------------
// Entry point & factory
// ---------------------------------------------------------------------------

/// Name of the single exported symbol of a CLAP shared library.
pub const CLAP_ENTRY_SYMBOL: &[u8] = b"clap_entry\0";

pub const CLAP_PLUGIN_FACTORY_ID: &[u8] = b"clap.plugin-factory\0";

#[repr(C)]
pub struct clap_plugin_entry {
    pub clap_version: clap_version_t,
    pub init: Option<unsafe extern "C" fn(plugin_path: *const c_char) -> bool>,
    pub deinit: Option<unsafe extern "C" fn()>,
    pub get_factory: Option<unsafe extern "C" fn(factory_id: *const c_char) -> *const c_void>,
}
pub type clap_plugin_entry_t = clap_plugin_entry;

#[repr(C)]
pub struct clap_plugin_factory {
    pub get_plugin_count: Option<unsafe extern "C" fn(factory: *const clap_plugin_factory) -> u32>,
    pub get_plugin_descriptor: Option<
        unsafe extern "C" fn(
            factory: *const clap_plugin_factory,
            index: u32,
        ) -> *const clap_plugin_descriptor,
    >,
    pub create_plugin: Option<
        unsafe extern "C" fn(
            factory: *const clap_plugin_factory,
            host: *const clap_host,
            plugin_id: *const c_char,
        ) -> *const clap_plugin,
    >,
}
pub type clap_plugin_factory_t = clap_plugin_factory;

#[repr(C)]
pub struct clap_plugin_descriptor {
    pub clap_version: clap_version_t,
    pub id: *const c_char,
    pub name: *const c_char,
    pub vendor: *const c_char,
    pub url: *const c_char,
    pub manual_url: *const c_char,
    pub support_url: *const c_char,
    pub version: *const c_char,
    pub description: *const c_char,
    pub features: *const *const c_char,
}
pub type clap_plugin_descriptor_t = clap_plugin_descriptor;

// ---------------------------------------------------------------------------
// Host & plugin
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct clap_host {
    pub clap_version: clap_version_t,
    /// Opaque pointer back to the host-side per-instance state.
    pub host_data: *mut c_void,
    pub name: *const c_char,
    pub vendor: *const c_char,
    pub url: *const c_char,
    pub version: *const c_char,
    pub get_extension: Option<
        unsafe extern "C" fn(host: *const clap_host, extension_id: *const c_char) -> *const c_void,
    >,
    pub request_restart: Option<unsafe extern "C" fn(host: *const clap_host)>,
    pub request_process: Option<unsafe extern "C" fn(host: *const clap_host)>,
    pub request_callback: Option<unsafe extern "C" fn(host: *const clap_host)>,
}
pub type clap_host_t = clap_host;

pub type clap_process_status = i32;
pub const CLAP_PROCESS_ERROR: clap_process_status = 0;
pub const CLAP_PROCESS_CONTINUE: clap_process_status = 1;
pub const CLAP_PROCESS_CONTINUE_IF_NOT_QUIET: clap_process_status = 2;
pub const CLAP_PROCESS_TAIL: clap_process_status = 3;
pub const CLAP_PROCESS_SLEEP: clap_process_status = 4;

#[repr(C)]
pub struct clap_plugin {
    pub desc: *const clap_plugin_descriptor,
    pub plugin_data: *mut c_void,
    pub init: Option<unsafe extern "C" fn(plugin: *const clap_plugin) -> bool>,
    pub destroy: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
    pub activate: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            sample_rate: f64,
            min_frames_count: u32,
            max_frames_count: u32,
        ) -> bool,
    >,
    pub deactivate: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
    pub start_processing: Option<unsafe extern "C" fn(plugin: *const clap_plugin) -> bool>,
    pub stop_processing: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
    pub reset: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
    pub process: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            process: *const clap_process,
        ) -> clap_process_status,
    >,
    pub get_extension: Option<
        unsafe extern "C" fn(plugin: *const clap_plugin, id: *const c_char) -> *const c_void,
    >,
    pub on_main_thread: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
}
pub type clap_plugin_t = clap_plugin;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

pub const CLAP_CORE_EVENT_SPACE_ID: u16 = 0;

pub type clap_event_type = u16;
pub const CLAP_EVENT_NOTE_ON: clap_event_type = 0;
pub const CLAP_EVENT_NOTE_OFF: clap_event_type = 1;
pub const CLAP_EVENT_NOTE_CHOKE: clap_event_type = 2;
pub const CLAP_EVENT_NOTE_END: clap_event_type = 3;
pub const CLAP_EVENT_NOTE_EXPRESSION: clap_event_type = 4;
pub const CLAP_EVENT_PARAM_VALUE: clap_event_type = 5;
pub const CLAP_EVENT_PARAM_MOD: clap_event_type = 6;
pub const CLAP_EVENT_PARAM_GESTURE_BEGIN: clap_event_type = 7;
pub const CLAP_EVENT_PARAM_GESTURE_END: clap_event_type = 8;
pub const CLAP_EVENT_TRANSPORT: clap_event_type = 9;
pub const CLAP_EVENT_MIDI: clap_event_type = 10;
pub const CLAP_EVENT_MIDI_SYSEX: clap_event_type = 11;
pub const CLAP_EVENT_MIDI2: clap_event_type = 12;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct clap_event_header {
    /// Size of the whole event record, header included.
    pub size: u32,
    /// Sample offset relative to the current process block.
    pub time: u32,
    pub space_id: u16,
    pub type_: u16,
    pub flags: u32,
}
pub type clap_event_header_t = clap_event_header;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct clap_event_note {
    pub header: clap_event_header_t,
    pub note_id: i32,
    pub port_index: i16,
    pub channel: i16,
    pub key: i16,
    pub velocity: f64,
}
pub type clap_event_note_t = clap_event_note;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct clap_event_midi {
    pub header: clap_event_header_t,
    pub port_index: u16,
    pub data: [u8; 3],
}
pub type clap_event_midi_t = clap_event_midi;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct clap_event_param_value {
    pub header: clap_event_header_t,
    pub param_id: clap_id,
    pub cookie: *mut c_void,
    pub note_id: i32,
    pub port_index: i16,
    pub channel: i16,
    pub key: i16,
    pub value: f64,
}
pub type clap_event_param_value_t = clap_event_param_value;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct clap_event_param_gesture {
    pub header: clap_event_header_t,
    pub param_id: clap_id,
}
pub type clap_event_param_gesture_t = clap_event_param_gesture;

pub type clap_beattime = i64;
pub type clap_sectime = i64;
pub const CLAP_BEATTIME_FACTOR: i64 = 1 << 31;
pub const CLAP_SECTIME_FACTOR: i64 = 1 << 31;

pub const CLAP_TRANSPORT_HAS_TEMPO: u32 = 1 << 0;
pub const CLAP_TRANSPORT_HAS_BEATS_TIMELINE: u32 = 1 << 1;
pub const CLAP_TRANSPORT_HAS_SECONDS_TIMELINE: u32 = 1 << 2;
pub const CLAP_TRANSPORT_HAS_TIME_SIGNATURE: u32 = 1 << 3;
pub const CLAP_TRANSPORT_IS_PLAYING: u32 = 1 << 4;
pub const CLAP_TRANSPORT_IS_RECORDING: u32 = 1 << 5;
pub const CLAP_TRANSPORT_IS_LOOP_ACTIVE: u32 = 1 << 6;
pub const CLAP_TRANSPORT_IS_WITHIN_PRE_ROLL: u32 = 1 << 7;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct clap_event_transport {
    pub header: clap_event_header_t,
    pub flags: u32,
    pub song_pos_beats: clap_beattime,
    pub song_pos_seconds: clap_sectime,
    pub tempo: f64,
    pub tempo_inc: f64,
    pub loop_start_beats: clap_beattime,
    pub loop_end_beats: clap_beattime,
    pub loop_start_seconds: clap_sectime,
    pub loop_end_seconds: clap_sectime,
    pub bar_start: clap_beattime,
    pub bar_number: i32,
    pub tsig_num: u16,
    pub tsig_denom: u16,
}
pub type clap_event_transport_t = clap_event_transport;

#[repr(C)]
pub struct clap_input_events {
    pub ctx: *mut c_void,
    pub size: Option<unsafe extern "C" fn(list: *const clap_input_events) -> u32>,
    pub get: Option<
        unsafe extern "C" fn(list: *const clap_input_events, index: u32) -> *const clap_event_header,
    >,
}
pub type clap_input_events_t = clap_input_events;

#[repr(C)]
pub struct clap_output_events {
    pub ctx: *mut c_void,
    pub try_push: Option<
        unsafe extern "C" fn(list: *const clap_output_events, event: *const clap_event_header) -> bool,
    >,
}
pub type clap_output_events_t = clap_output_events;

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct clap_audio_buffer {
    pub data32: *mut *mut f32,
    pub data64: *mut *mut f64,
    pub channel_count: u32,
    pub latency: u32,
    pub constant_mask: u64,
}
pub type clap_audio_buffer_t = clap_audio_buffer;

#[repr(C)]
pub struct clap_process {
    /// Monotonic frame counter, -1 when unavailable.
    pub steady_time: i64,
    pub frames_count: u32,
    pub transport: *const clap_event_transport,
    pub audio_inputs: *const clap_audio_buffer,
    pub audio_outputs: *mut clap_audio_buffer,
    pub audio_inputs_count: u32,
    pub audio_outputs_count: u32,
    pub in_events: *const clap_input_events,
    pub out_events: *const clap_output_events,
}
pub type clap_process_t = clap_process;

// ---------------------------------------------------------------------------
// Streams (state blobs)
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct clap_istream {
    pub ctx: *mut c_void,
    /// Returns bytes copied, 0 at end of stream, -1 on error.
    pub read: Option<
        unsafe extern "C" fn(stream: *const clap_istream, buffer: *mut c_void, size: u64) -> i64,
    >,
}
pub type clap_istream_t = clap_istream;

#[repr(C)]
pub struct clap_ostream {
    pub ctx: *mut c_void,
    /// Returns bytes written, -1 on error.
    pub write: Option<
        unsafe extern "C" fn(stream: *const clap_ostream, buffer: *const c_void, size: u64) -> i64,
    >,
}
pub type clap_ostream_t = clap_ostream;

// ---------------------------------------------------------------------------
// Extension: audio ports
// ---------------------------------------------------------------------------

pub const CLAP_EXT_AUDIO_PORTS: &[u8] = b"clap.audio-ports\0";

pub const CLAP_AUDIO_PORT_IS_MAIN: u32 = 1 << 0;
pub const CLAP_AUDIO_PORT_SUPPORTS_64BITS: u32 = 1 << 1;
pub const CLAP_AUDIO_PORT_PREFERS_64BITS: u32 = 1 << 2;
pub const CLAP_AUDIO_PORT_REQUIRES_COMMON_SAMPLE_SIZE: u32 = 1 << 3;

pub const CLAP_PORT_MONO: &[u8] = b"mono\0";
pub const CLAP_PORT_STEREO: &[u8] = b"stereo\0";

#[repr(C)]
pub struct clap_audio_port_info {
    pub id: clap_id,
    pub name: [c_char; CLAP_NAME_SIZE],
    pub flags: u32,
    pub channel_count: u32,
    pub port_type: *const c_char,
    pub in_place_pair: clap_id,
}
pub type clap_audio_port_info_t = clap_audio_port_info;

#[repr(C)]
pub struct clap_plugin_audio_ports {
    pub count: Option<unsafe extern "C" fn(plugin: *const clap_plugin, is_input: bool) -> u32>,
    pub get: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            index: u32,
            is_input: bool,
            info: *mut clap_audio_port_info,
        ) -> bool,
    >,
}
pub type clap_plugin_audio_ports_t = clap_plugin_audio_ports;

#[repr(C)]
pub struct clap_host_audio_ports {
    pub is_rescan_flag_supported:
        Option<unsafe extern "C" fn(host: *const clap_host, flag: u32) -> bool>,
    pub rescan: Option<unsafe extern "C" fn(host: *const clap_host, flags: u32)>,
}
pub type clap_host_audio_ports_t = clap_host_audio_ports;

// ---------------------------------------------------------------------------
// Extension: note ports
// ---------------------------------------------------------------------------

pub const CLAP_EXT_NOTE_PORTS: &[u8] = b"clap.note-ports\0";

pub type clap_note_dialect = u32;
pub const CLAP_NOTE_DIALECT_CLAP: clap_note_dialect = 1 << 0;
pub const CLAP_NOTE_DIALECT_MIDI: clap_note_dialect = 1 << 1;
pub const CLAP_NOTE_DIALECT_MIDI_MPE: clap_note_dialect = 1 << 2;
pub const CLAP_NOTE_DIALECT_MIDI2: clap_note_dialect = 1 << 3;

#[repr(C)]
pub struct clap_note_port_info {
    pub id: clap_id,
    pub supported_dialects: u32,
    pub preferred_dialect: u32,
    pub name: [c_char; CLAP_NAME_SIZE],
}
pub type clap_note_port_info_t = clap_note_port_info;

#[repr(C)]
pub struct clap_plugin_note_ports {
    pub count: Option<unsafe extern "C" fn(plugin: *const clap_plugin, is_input: bool) -> u32>,
    pub get: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            index: u32,
            is_input: bool,
            info: *mut clap_note_port_info,
        ) -> bool,
    >,
}
pub type clap_plugin_note_ports_t = clap_plugin_note_ports;

#[repr(C)]
pub struct clap_host_note_ports {
    pub supported_dialects: Option<unsafe extern "C" fn(host: *const clap_host) -> u32>,
    pub rescan: Option<unsafe extern "C" fn(host: *const clap_host, flags: u32)>,
}
pub type clap_host_note_ports_t = clap_host_note_ports;

// ---------------------------------------------------------------------------
// Extension: params
// ---------------------------------------------------------------------------

pub const CLAP_EXT_PARAMS: &[u8] = b"clap.params\0";

pub type clap_param_info_flags = u32;
pub const CLAP_PARAM_IS_STEPPED: clap_param_info_flags = 1 << 0;
pub const CLAP_PARAM_IS_PERIODIC: clap_param_info_flags = 1 << 1;
pub const CLAP_PARAM_IS_HIDDEN: clap_param_info_flags = 1 << 2;
pub const CLAP_PARAM_IS_READONLY: clap_param_info_flags = 1 << 3;
pub const CLAP_PARAM_IS_BYPASS: clap_param_info_flags = 1 << 4;
pub const CLAP_PARAM_IS_AUTOMATABLE: clap_param_info_flags = 1 << 5;
pub const CLAP_PARAM_IS_MODULATABLE: clap_param_info_flags = 1 << 10;
pub const CLAP_PARAM_REQUIRES_PROCESS: clap_param_info_flags = 1 << 15;
pub const CLAP_PARAM_IS_ENUM: clap_param_info_flags = 1 << 16;

pub type clap_param_rescan_flags = u32;
pub const CLAP_PARAM_RESCAN_VALUES: clap_param_rescan_flags = 1 << 0;
pub const CLAP_PARAM_RESCAN_TEXT: clap_param_rescan_flags = 1 << 1;
pub const CLAP_PARAM_RESCAN_INFO: clap_param_rescan_flags = 1 << 2;
pub const CLAP_PARAM_RESCAN_ALL: clap_param_rescan_flags = 1 << 3;

pub type clap_param_clear_flags = u32;
pub const CLAP_PARAM_CLEAR_ALL: clap_param_clear_flags = 1 << 0;
pub const CLAP_PARAM_CLEAR_AUTOMATIONS: clap_param_clear_flags = 1 << 1;
pub const CLAP_PARAM_CLEAR_MODULATIONS: clap_param_clear_flags = 1 << 2;

#[repr(C)]
pub struct clap_param_info {
    pub id: clap_id,
    pub flags: clap_param_info_flags,
    pub cookie: *mut c_void,
    pub name: [c_char; CLAP_NAME_SIZE],
    pub module: [c_char; CLAP_PATH_SIZE],
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
}
pub type clap_param_info_t = clap_param_info;

#[repr(C)]
pub struct clap_plugin_params {
    pub count: Option<unsafe extern "C" fn(plugin: *const clap_plugin) -> u32>,
    pub get_info: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            param_index: u32,
            param_info: *mut clap_param_info,
        ) -> bool,
    >,
    pub get_value: Option<
        unsafe extern "C" fn(plugin: *const clap_plugin, param_id: clap_id, out_value: *mut f64) -> bool,
    >,
    pub value_to_text: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            param_id: clap_id,
            value: f64,
            out_buffer: *mut c_char,
            out_buffer_capacity: u32,
        ) -> bool,
    >,
    pub text_to_value: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            param_id: clap_id,
            param_value_text: *const c_char,
            out_value: *mut f64,
        ) -> bool,
    >,
    pub flush: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            in_: *const clap_input_events,
            out: *const clap_output_events,
        ),
    >,
}
pub type clap_plugin_params_t = clap_plugin_params;

#[repr(C)]
pub struct clap_host_params {
    pub rescan: Option<unsafe extern "C" fn(host: *const clap_host, flags: clap_param_rescan_flags)>,
    pub clear: Option<
        unsafe extern "C" fn(host: *const clap_host, param_id: clap_id, flags: clap_param_clear_flags),
    >,
    pub request_flush: Option<unsafe extern "C" fn(host: *const clap_host)>,
}
pub type clap_host_params_t = clap_host_params;

// ---------------------------------------------------------------------------
// Extension: state
// ---------------------------------------------------------------------------

pub const CLAP_EXT_STATE: &[u8] = b"clap.state\0";

#[repr(C)]
pub struct clap_plugin_state {
    pub save: Option<unsafe extern "C" fn(plugin: *const clap_plugin, stream: *const clap_ostream) -> bool>,
    pub load: Option<unsafe extern "C" fn(plugin: *const clap_plugin, stream: *const clap_istream) -> bool>,
}
pub type clap_plugin_state_t = clap_plugin_state;

#[repr(C)]
pub struct clap_host_state {
    pub mark_dirty: Option<unsafe extern "C" fn(host: *const clap_host)>,
}
pub type clap_host_state_t = clap_host_state;

// ---------------------------------------------------------------------------
// Extension: gui
// ---------------------------------------------------------------------------

pub const CLAP_EXT_GUI: &[u8] = b"clap.gui\0";

pub const CLAP_WINDOW_API_WIN32: &[u8] = b"win32\0";
pub const CLAP_WINDOW_API_COCOA: &[u8] = b"cocoa\0";
pub const CLAP_WINDOW_API_X11: &[u8] = b"x11\0";
pub const CLAP_WINDOW_API_WAYLAND: &[u8] = b"wayland\0";

#[repr(C)]
#[derive(Clone, Copy)]
pub union clap_window_handle {
    pub cocoa: *mut c_void,
    pub x11: core::ffi::c_ulong,
    pub win32: *mut c_void,
    pub ptr: *mut c_void,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct clap_window {
    pub api: *const c_char,
    pub specific: clap_window_handle,
}
pub type clap_window_t = clap_window;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct clap_gui_resize_hints {
    pub can_resize_horizontally: bool,
    pub can_resize_vertically: bool,
    pub preserve_aspect_ratio: bool,
    pub aspect_ratio_width: u32,
    pub aspect_ratio_height: u32,
}
pub type clap_gui_resize_hints_t = clap_gui_resize_hints;

#[repr(C)]
pub struct clap_plugin_gui {
    pub is_api_supported: Option<
        unsafe extern "C" fn(plugin: *const clap_plugin, api: *const c_char, is_floating: bool) -> bool,
    >,
    pub get_preferred_api: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            api: *mut *const c_char,
            is_floating: *mut bool,
        ) -> bool,
    >,
    pub create: Option<
        unsafe extern "C" fn(plugin: *const clap_plugin, api: *const c_char, is_floating: bool) -> bool,
    >,
    pub destroy: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
    pub set_scale: Option<unsafe extern "C" fn(plugin: *const clap_plugin, scale: f64) -> bool>,
    pub get_size: Option<
        unsafe extern "C" fn(plugin: *const clap_plugin, width: *mut u32, height: *mut u32) -> bool,
    >,
    pub can_resize: Option<unsafe extern "C" fn(plugin: *const clap_plugin) -> bool>,
    pub get_resize_hints: Option<
        unsafe extern "C" fn(plugin: *const clap_plugin, hints: *mut clap_gui_resize_hints) -> bool,
    >,
    pub adjust_size: Option<
        unsafe extern "C" fn(plugin: *const clap_plugin, width: *mut u32, height: *mut u32) -> bool,
    >,
    pub set_size:
        Option<unsafe extern "C" fn(plugin: *const clap_plugin, width: u32, height: u32) -> bool>,
    pub set_parent:
        Option<unsafe extern "C" fn(plugin: *const clap_plugin, window: *const clap_window) -> bool>,
    pub set_transient:
        Option<unsafe extern "C" fn(plugin: *const clap_plugin, window: *const clap_window) -> bool>,
    pub suggest_title:
        Option<unsafe extern "C" fn(plugin: *const clap_plugin, title: *const c_char)>,
    pub show: Option<unsafe extern "C" fn(plugin: *const clap_plugin) -> bool>,
    pub hide: Option<unsafe extern "C" fn(plugin: *const clap_plugin) -> bool>,
}
pub type clap_plugin_gui_t = clap_plugin_gui;

#[repr(C)]
pub struct clap_host_gui {
    pub resize_hints_changed: Option<unsafe extern "C" fn(host: *const clap_host)>,
    pub request_resize:
        Option<unsafe extern "C" fn(host: *const clap_host, width: u32, height: u32) -> bool>,
    pub request_show: Option<unsafe extern "C" fn(host: *const clap_host) -> bool>,
    pub request_hide: Option<unsafe extern "C" fn(host: *const clap_host) -> bool>,
    pub closed: Option<unsafe extern "C" fn(host: *const clap_host, was_destroyed: bool)>,
}
pub type clap_host_gui_t = clap_host_gui;

// ---------------------------------------------------------------------------
// Extension: latency
// ---------------------------------------------------------------------------

pub const CLAP_EXT_LATENCY: &[u8] = b"clap.latency\0";

#[repr(C)]
pub struct clap_plugin_latency {
    pub get: Option<unsafe extern "C" fn(plugin: *const clap_plugin) -> u32>,
}
pub type clap_plugin_latency_t = clap_plugin_latency;

#[repr(C)]
pub struct clap_host_latency {
    pub changed: Option<unsafe extern "C" fn(host: *const clap_host)>,
}
pub type clap_host_latency_t = clap_host_latency;

// ---------------------------------------------------------------------------
// Extension: timer support
// ---------------------------------------------------------------------------

pub const CLAP_EXT_TIMER_SUPPORT: &[u8] = b"clap.timer-support\0";

#[repr(C)]
pub struct clap_plugin_timer_support {
    pub on_timer: Option<unsafe extern "C" fn(plugin: *const clap_plugin, timer_id: clap_id)>,
}
pub type clap_plugin_timer_support_t = clap_plugin_timer_support;

#[repr(C)]
pub struct clap_host_timer_support {
    pub register_timer: Option<
        unsafe extern "C" fn(host: *const clap_host, period_ms: u32, timer_id: *mut clap_id) -> bool,
    >,
    pub unregister_timer:
        Option<unsafe extern "C" fn(host: *const clap_host, timer_id: clap_id) -> bool>,
}
pub type clap_host_timer_support_t = clap_host_timer_support;

// ---------------------------------------------------------------------------
// Extension: thread check
// ---------------------------------------------------------------------------

pub const CLAP_EXT_THREAD_CHECK: &[u8] = b"clap.thread-check\0";

#[repr(C)]
pub struct clap_host_thread_check {
    pub is_main_thread: Option<unsafe extern "C" fn(host: *const clap_host) -> bool>,
    pub is_audio_thread: Option<unsafe extern "C" fn(host: *const clap_host) -> bool>,
}
pub type clap_host_thread_check_t = clap_host_thread_check;

// ---------------------------------------------------------------------------
// Extension: log
// ---------------------------------------------------------------------------

pub const CLAP_EXT_LOG: &[u8] = b"clap.log\0";

pub type clap_log_severity = i32;
pub const CLAP_LOG_DEBUG: clap_log_severity = 0;
pub const CLAP_LOG_INFO: clap_log_severity = 1;
pub const CLAP_LOG_WARNING: clap_log_severity = 2;
pub const CLAP_LOG_ERROR: clap_log_severity = 3;
pub const CLAP_LOG_FATAL: clap_log_severity = 4;
pub const CLAP_LOG_HOST_MISBEHAVING: clap_log_severity = 5;
pub const CLAP_LOG_PLUGIN_MISBEHAVING: clap_log_severity = 6;

#[repr(C)]
pub struct clap_host_log {
    pub log: Option<
        unsafe extern "C" fn(host: *const clap_host, severity: clap_log_severity, msg: *const c_char),
    >,
}
pub type clap_host_log_t = clap_host_log;
