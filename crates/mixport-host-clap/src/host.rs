//! The host callback surface installed for every plugin instance.
//!
//! One [`HostShared`] block sits behind `clap_host.host_data`; every
//! capability vtable is a `static` whose functions do nothing but recover
//! that block and record the request. Tables never change after
//! installation. Requests that require host work (rescans, restarts,
//! main-thread callbacks, GUI traffic) are latched into atomics here and
//! serviced by the adapter's UI tick; nothing toolkit- or plugin-facing
//! happens inside the callback itself.

use core::ffi::{c_char, c_void};
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use clap_abi::{
    clap_host, clap_host_audio_ports_t, clap_host_gui_t, clap_host_latency_t, clap_host_log_t,
    clap_host_note_ports_t, clap_host_params_t, clap_host_state_t, clap_host_thread_check_t,
    clap_host_timer_support_t, clap_id, clap_log_severity, clap_param_clear_flags,
    clap_param_rescan_flags, CLAP_EXT_AUDIO_PORTS, CLAP_EXT_GUI, CLAP_EXT_LATENCY, CLAP_EXT_LOG,
    CLAP_EXT_NOTE_PORTS, CLAP_EXT_PARAMS, CLAP_EXT_STATE, CLAP_EXT_THREAD_CHECK,
    CLAP_EXT_TIMER_SUPPORT, CLAP_LOG_DEBUG, CLAP_LOG_INFO, CLAP_LOG_WARNING,
    CLAP_NOTE_DIALECT_CLAP, CLAP_NOTE_DIALECT_MIDI, CLAP_PARAM_RESCAN_INFO, CLAP_PARAM_RESCAN_ALL,
    CLAP_VERSION,
};
use mixport_graph::{current_thread_role, ThreadRole};

use crate::config::HostConfig;
use crate::timer::TimerRegistry;

const RESIZE_NONE: u64 = u64::MAX;

/// GUI traffic recorded from plugin callbacks, drained by the lifecycle
/// manager on the UI tick.
#[derive(Default)]
pub struct GuiRequests {
    resize: AtomicU64,
    show: AtomicBool,
    hide: AtomicBool,
    closed: AtomicBool,
    closed_was_destroyed: AtomicBool,
    resize_hints_changed: AtomicBool,
}

impl GuiRequests {
    fn new() -> Self {
        let this = Self::default();
        this.resize.store(RESIZE_NONE, Ordering::Relaxed);
        this
    }

    fn record_resize(&self, width: u32, height: u32) {
        self.resize
            .store(u64::from(width) << 32 | u64::from(height), Ordering::Release);
    }

    pub fn take_resize(&self) -> Option<(u32, u32)> {
        let packed = self.resize.swap(RESIZE_NONE, Ordering::Acquire);
        if packed == RESIZE_NONE {
            return None;
        }
        Some(((packed >> 32) as u32, packed as u32))
    }

    pub fn take_show(&self) -> bool {
        self.show.swap(false, Ordering::AcqRel)
    }

    pub fn take_hide(&self) -> bool {
        self.hide.swap(false, Ordering::AcqRel)
    }

    /// Returns `Some(was_destroyed)` when the plugin reported its editor
    /// closed since the last tick.
    pub fn take_closed(&self) -> Option<bool> {
        if self.closed.swap(false, Ordering::AcqRel) {
            Some(self.closed_was_destroyed.swap(false, Ordering::AcqRel))
        } else {
            None
        }
    }

    pub fn take_resize_hints_changed(&self) -> bool {
        self.resize_hints_changed.swap(false, Ordering::AcqRel)
    }
}

/// Per-plugin host state reachable from `clap_host.host_data`.
pub struct HostShared {
    restart_requested: AtomicBool,
    process_requested: AtomicBool,
    callback_pending: AtomicBool,
    flush_requested: AtomicBool,
    rescan_values: AtomicBool,
    rescan_full: AtomicBool,
    state_dirty: AtomicBool,
    pub gui: GuiRequests,
    pub(crate) timers: Mutex<TimerRegistry>,
}

impl HostShared {
    fn new() -> Self {
        Self {
            restart_requested: AtomicBool::new(false),
            process_requested: AtomicBool::new(false),
            callback_pending: AtomicBool::new(false),
            flush_requested: AtomicBool::new(false),
            rescan_values: AtomicBool::new(false),
            rescan_full: AtomicBool::new(false),
            state_dirty: AtomicBool::new(false),
            gui: GuiRequests::new(),
            timers: Mutex::new(TimerRegistry::new()),
        }
    }

    pub fn request_restart(&self) {
        self.restart_requested.store(true, Ordering::Release);
    }

    pub fn take_restart_request(&self) -> bool {
        self.restart_requested.swap(false, Ordering::AcqRel)
    }

    pub fn take_process_request(&self) -> bool {
        self.process_requested.swap(false, Ordering::AcqRel)
    }

    pub fn callback_pending(&self) -> bool {
        self.callback_pending.load(Ordering::Acquire)
    }

    pub fn take_callback_request(&self) -> bool {
        self.callback_pending.swap(false, Ordering::AcqRel)
    }

    pub fn take_flush_request(&self) -> bool {
        self.flush_requested.swap(false, Ordering::AcqRel)
    }

    /// Returns `(values_only, full_rebuild)` rescan requests.
    pub fn take_rescan_requests(&self) -> (bool, bool) {
        (
            self.rescan_values.swap(false, Ordering::AcqRel),
            self.rescan_full.swap(false, Ordering::AcqRel),
        )
    }

    pub fn mark_dirty(&self) {
        self.state_dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.state_dirty.load(Ordering::Acquire)
    }

    pub fn clear_dirty(&self) {
        self.state_dirty.store(false, Ordering::Release);
    }

    /// Thread-check answer for the plugin. A pending main-thread callback
    /// masks the main role until the adapter services it, so a plugin never
    /// re-enters main-thread work inside its own callback window.
    pub fn is_main_thread(&self) -> bool {
        current_thread_role() == ThreadRole::Main && !self.callback_pending()
    }

    pub fn is_audio_thread(&self) -> bool {
        current_thread_role() == ThreadRole::Audio
    }
}

struct HostIdentity {
    _name: CString,
    _vendor: CString,
    _url: CString,
    _version: CString,
}

/// Owns the `clap_host` handed to `create_plugin` and the shared state its
/// callbacks dispatch into. Must outlive the plugin instance.
pub struct HostHandle {
    raw: Box<clap_host>,
    shared: Box<HostShared>,
    _identity: HostIdentity,
}

unsafe impl Send for HostHandle {}

impl HostHandle {
    pub fn new(config: &HostConfig) -> Self {
        let identity = HostIdentity {
            _name: CString::new(config.name.clone()).unwrap_or_default(),
            _vendor: CString::new(config.vendor.clone()).unwrap_or_default(),
            _url: CString::new(config.url.clone()).unwrap_or_default(),
            _version: CString::new(config.version.clone()).unwrap_or_default(),
        };
        let shared = Box::new(HostShared::new());
        let raw = Box::new(clap_host {
            clap_version: CLAP_VERSION,
            host_data: &*shared as *const HostShared as *mut c_void,
            name: identity._name.as_ptr(),
            vendor: identity._vendor.as_ptr(),
            url: identity._url.as_ptr(),
            version: identity._version.as_ptr(),
            get_extension: Some(host_get_extension),
            request_restart: Some(host_request_restart),
            request_process: Some(host_request_process),
            request_callback: Some(host_request_callback),
        });
        Self {
            raw,
            shared,
            _identity: identity,
        }
    }

    pub fn as_raw(&self) -> *const clap_host {
        &*self.raw
    }

    pub fn shared(&self) -> &HostShared {
        &self.shared
    }
}

unsafe fn shared_from<'a>(host: *const clap_host) -> Option<&'a HostShared> {
    if host.is_null() {
        return None;
    }
    ((*host).host_data as *const HostShared).as_ref()
}

// --- core host callbacks ---------------------------------------------------

unsafe extern "C" fn host_get_extension(
    _host: *const clap_host,
    extension_id: *const c_char,
) -> *const c_void {
    if extension_id.is_null() {
        return core::ptr::null();
    }
    let id = CStr::from_ptr(extension_id).to_bytes_with_nul();
    if id == CLAP_EXT_PARAMS {
        &HOST_PARAMS as *const clap_host_params_t as *const c_void
    } else if id == CLAP_EXT_STATE {
        &HOST_STATE as *const clap_host_state_t as *const c_void
    } else if id == CLAP_EXT_GUI {
        &HOST_GUI as *const clap_host_gui_t as *const c_void
    } else if id == CLAP_EXT_AUDIO_PORTS {
        &HOST_AUDIO_PORTS as *const clap_host_audio_ports_t as *const c_void
    } else if id == CLAP_EXT_NOTE_PORTS {
        &HOST_NOTE_PORTS as *const clap_host_note_ports_t as *const c_void
    } else if id == CLAP_EXT_LATENCY {
        &HOST_LATENCY as *const clap_host_latency_t as *const c_void
    } else if id == CLAP_EXT_TIMER_SUPPORT {
        &HOST_TIMER_SUPPORT as *const clap_host_timer_support_t as *const c_void
    } else if id == CLAP_EXT_THREAD_CHECK {
        &HOST_THREAD_CHECK as *const clap_host_thread_check_t as *const c_void
    } else if id == CLAP_EXT_LOG {
        &HOST_LOG as *const clap_host_log_t as *const c_void
    } else {
        core::ptr::null()
    }
}

unsafe extern "C" fn host_request_restart(host: *const clap_host) {
    if let Some(shared) = shared_from(host) {
        shared.request_restart();
    }
}

unsafe extern "C" fn host_request_process(host: *const clap_host) {
    if let Some(shared) = shared_from(host) {
        shared.process_requested.store(true, Ordering::Release);
    }
}

unsafe extern "C" fn host_request_callback(host: *const clap_host) {
    if let Some(shared) = shared_from(host) {
        shared.callback_pending.store(true, Ordering::Release);
    }
}

// --- params ----------------------------------------------------------------

static HOST_PARAMS: clap_host_params_t = clap_host_params_t {
    rescan: Some(host_params_rescan),
    clear: Some(host_params_clear),
    request_flush: Some(host_params_request_flush),
};

unsafe extern "C" fn host_params_rescan(host: *const clap_host, flags: clap_param_rescan_flags) {
    let Some(shared) = shared_from(host) else {
        return;
    };
    if flags & (CLAP_PARAM_RESCAN_ALL | CLAP_PARAM_RESCAN_INFO) != 0 {
        shared.rescan_full.store(true, Ordering::Release);
    } else {
        shared.rescan_values.store(true, Ordering::Release);
    }
}

unsafe extern "C" fn host_params_clear(
    host: *const clap_host,
    _param_id: clap_id,
    _flags: clap_param_clear_flags,
) {
    // Individual parameter deletion is unsupported; any clear forces a full
    // rebuild of the port set.
    if let Some(shared) = shared_from(host) {
        shared.rescan_full.store(true, Ordering::Release);
    }
}

unsafe extern "C" fn host_params_request_flush(host: *const clap_host) {
    if let Some(shared) = shared_from(host) {
        shared.flush_requested.store(true, Ordering::Release);
    }
}

// --- state -----------------------------------------------------------------

static HOST_STATE: clap_host_state_t = clap_host_state_t {
    mark_dirty: Some(host_state_mark_dirty),
};

unsafe extern "C" fn host_state_mark_dirty(host: *const clap_host) {
    if let Some(shared) = shared_from(host) {
        shared.mark_dirty();
    }
}

// --- gui -------------------------------------------------------------------

static HOST_GUI: clap_host_gui_t = clap_host_gui_t {
    resize_hints_changed: Some(host_gui_resize_hints_changed),
    request_resize: Some(host_gui_request_resize),
    request_show: Some(host_gui_request_show),
    request_hide: Some(host_gui_request_hide),
    closed: Some(host_gui_closed),
};

unsafe extern "C" fn host_gui_resize_hints_changed(host: *const clap_host) {
    if let Some(shared) = shared_from(host) {
        shared.gui.resize_hints_changed.store(true, Ordering::Release);
    }
}

unsafe extern "C" fn host_gui_request_resize(
    host: *const clap_host,
    width: u32,
    height: u32,
) -> bool {
    match shared_from(host) {
        Some(shared) => {
            shared.gui.record_resize(width, height);
            true
        }
        None => false,
    }
}

unsafe extern "C" fn host_gui_request_show(host: *const clap_host) -> bool {
    match shared_from(host) {
        Some(shared) => {
            shared.gui.show.store(true, Ordering::Release);
            true
        }
        None => false,
    }
}

unsafe extern "C" fn host_gui_request_hide(host: *const clap_host) -> bool {
    match shared_from(host) {
        Some(shared) => {
            shared.gui.hide.store(true, Ordering::Release);
            true
        }
        None => false,
    }
}

unsafe extern "C" fn host_gui_closed(host: *const clap_host, was_destroyed: bool) {
    if let Some(shared) = shared_from(host) {
        shared
            .gui
            .closed_was_destroyed
            .store(was_destroyed, Ordering::Release);
        shared.gui.closed.store(true, Ordering::Release);
    }
}

// --- audio ports / note ports ----------------------------------------------

static HOST_AUDIO_PORTS: clap_host_audio_ports_t = clap_host_audio_ports_t {
    is_rescan_flag_supported: Some(host_audio_ports_is_rescan_flag_supported),
    rescan: Some(host_audio_ports_rescan),
};

unsafe extern "C" fn host_audio_ports_is_rescan_flag_supported(
    _host: *const clap_host,
    _flag: u32,
) -> bool {
    // Port counts are fixed after load in this host.
    false
}

unsafe extern "C" fn host_audio_ports_rescan(_host: *const clap_host, flags: u32) {
    log::warn!("plugin requested unsupported audio-port rescan (flags {flags:#x})");
}

static HOST_NOTE_PORTS: clap_host_note_ports_t = clap_host_note_ports_t {
    supported_dialects: Some(host_note_ports_supported_dialects),
    rescan: Some(host_note_ports_rescan),
};

unsafe extern "C" fn host_note_ports_supported_dialects(_host: *const clap_host) -> u32 {
    CLAP_NOTE_DIALECT_CLAP | CLAP_NOTE_DIALECT_MIDI
}

unsafe extern "C" fn host_note_ports_rescan(_host: *const clap_host, flags: u32) {
    log::warn!("plugin requested unsupported note-port rescan (flags {flags:#x})");
}

// --- latency ---------------------------------------------------------------

static HOST_LATENCY: clap_host_latency_t = clap_host_latency_t {
    changed: Some(host_latency_changed),
};

unsafe extern "C" fn host_latency_changed(host: *const clap_host) {
    // Latency renegotiation requires the plugin out of its processing
    // state; schedule a deactivate/reactivate cycle.
    if let Some(shared) = shared_from(host) {
        shared.request_restart();
    }
}

// --- timer support ---------------------------------------------------------

static HOST_TIMER_SUPPORT: clap_host_timer_support_t = clap_host_timer_support_t {
    register_timer: Some(host_register_timer),
    unregister_timer: Some(host_unregister_timer),
};

unsafe extern "C" fn host_register_timer(
    host: *const clap_host,
    period_ms: u32,
    timer_id: *mut clap_id,
) -> bool {
    let Some(shared) = shared_from(host) else {
        return false;
    };
    if timer_id.is_null() {
        return false;
    }
    let id = shared.timers.lock().register(period_ms, Instant::now());
    *timer_id = id;
    true
}

unsafe extern "C" fn host_unregister_timer(host: *const clap_host, timer_id: clap_id) -> bool {
    match shared_from(host) {
        Some(shared) => shared.timers.lock().unregister(timer_id),
        None => false,
    }
}

// --- thread check ----------------------------------------------------------

static HOST_THREAD_CHECK: clap_host_thread_check_t = clap_host_thread_check_t {
    is_main_thread: Some(host_is_main_thread),
    is_audio_thread: Some(host_is_audio_thread),
};

unsafe extern "C" fn host_is_main_thread(host: *const clap_host) -> bool {
    shared_from(host).is_some_and(|shared| shared.is_main_thread())
}

unsafe extern "C" fn host_is_audio_thread(host: *const clap_host) -> bool {
    shared_from(host).is_some_and(|shared| shared.is_audio_thread())
}

// --- log -------------------------------------------------------------------

static HOST_LOG: clap_host_log_t = clap_host_log_t {
    log: Some(host_log),
};

unsafe extern "C" fn host_log(
    _host: *const clap_host,
    severity: clap_log_severity,
    msg: *const c_char,
) {
    if msg.is_null() {
        return;
    }
    let text = CStr::from_ptr(msg).to_string_lossy();
    match severity {
        CLAP_LOG_DEBUG => log::debug!("plugin: {text}"),
        CLAP_LOG_INFO => log::info!("plugin: {text}"),
        CLAP_LOG_WARNING => log::warn!("plugin: {text}"),
        // ERROR, FATAL and both misbehaving severities land here.
        _ => log::error!("plugin: {text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixport_graph::register_thread_role;

    fn handle() -> HostHandle {
        HostHandle::new(&HostConfig::default())
    }

    #[test]
    fn supported_extensions_resolve() {
        let host = handle();
        let raw = host.as_raw();
        unsafe {
            for id in [
                CLAP_EXT_PARAMS,
                CLAP_EXT_STATE,
                CLAP_EXT_GUI,
                CLAP_EXT_AUDIO_PORTS,
                CLAP_EXT_NOTE_PORTS,
                CLAP_EXT_LATENCY,
                CLAP_EXT_TIMER_SUPPORT,
                CLAP_EXT_THREAD_CHECK,
                CLAP_EXT_LOG,
            ] {
                let ext = host_get_extension(raw, id.as_ptr() as *const c_char);
                assert!(!ext.is_null());
            }
            let ext = host_get_extension(raw, b"clap.posix-fd-support\0".as_ptr() as *const _);
            assert!(ext.is_null());
        }
    }

    #[test]
    fn rescan_flags_split_values_from_full_rebuild() {
        let host = handle();
        unsafe {
            host_params_rescan(host.as_raw(), clap_abi::CLAP_PARAM_RESCAN_VALUES);
        }
        assert_eq!(host.shared().take_rescan_requests(), (true, false));
        unsafe {
            host_params_rescan(host.as_raw(), CLAP_PARAM_RESCAN_INFO);
        }
        assert_eq!(host.shared().take_rescan_requests(), (false, true));
        // Clear cannot delete a single parameter; it forces a rebuild too.
        unsafe {
            host_params_clear(host.as_raw(), 3, clap_abi::CLAP_PARAM_CLEAR_ALL);
        }
        assert_eq!(host.shared().take_rescan_requests(), (false, true));
    }

    #[test]
    fn pending_callback_masks_main_thread() {
        register_thread_role(ThreadRole::Main);
        let host = handle();
        assert!(host.shared().is_main_thread());
        unsafe {
            host_request_callback(host.as_raw());
        }
        assert!(!host.shared().is_main_thread());
        assert!(host.shared().take_callback_request());
        assert!(host.shared().is_main_thread());
    }

    #[test]
    fn timer_registration_round_trips_through_the_vtable() {
        let host = handle();
        let mut id: clap_id = clap_abi::CLAP_INVALID_ID;
        unsafe {
            assert!(host_register_timer(host.as_raw(), 30, &mut id));
            assert_ne!(id, clap_abi::CLAP_INVALID_ID);
            assert!(host_unregister_timer(host.as_raw(), id));
            assert!(!host_unregister_timer(host.as_raw(), id));
        }
    }

    #[test]
    fn gui_requests_latch_until_taken() {
        let host = handle();
        unsafe {
            assert!(host_gui_request_resize(host.as_raw(), 640, 480));
            host_gui_closed(host.as_raw(), true);
        }
        assert_eq!(host.shared().gui.take_resize(), Some((640, 480)));
        assert_eq!(host.shared().gui.take_resize(), None);
        assert_eq!(host.shared().gui.take_closed(), Some(true));
        assert_eq!(host.shared().gui.take_closed(), None);
    }
}
