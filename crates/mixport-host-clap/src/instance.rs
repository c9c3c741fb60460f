//! Ownership wrapper around a live plugin instance.

use core::ffi::{c_char, c_void};
use std::ffi::CString;

use clap_abi::{
    clap_host, clap_plugin, clap_plugin_audio_ports_t, clap_plugin_descriptor,
    clap_plugin_factory_t, clap_plugin_gui_t, clap_plugin_latency_t, clap_plugin_note_ports_t,
    clap_plugin_params_t, clap_plugin_state_t, clap_plugin_timer_support_t, clap_process,
    clap_process_status, clap_version_is_compatible, CLAP_EXT_AUDIO_PORTS, CLAP_EXT_GUI,
    CLAP_EXT_LATENCY, CLAP_EXT_NOTE_PORTS, CLAP_EXT_PARAMS, CLAP_EXT_STATE,
    CLAP_EXT_TIMER_SUPPORT, CLAP_PROCESS_ERROR,
};

use crate::error::HostError;
use crate::loader::{describe, PluginDescriptor};

/// Non-owning references to the plugin-exposed capability tables.
///
/// Absence of an extension is a normal state, not an error; each accessor
/// simply yields `None` and the corresponding host feature stays disabled.
#[derive(Clone, Copy)]
pub struct ExtensionSet {
    params: *const clap_plugin_params_t,
    state: *const clap_plugin_state_t,
    gui: *const clap_plugin_gui_t,
    timer: *const clap_plugin_timer_support_t,
    audio_ports: *const clap_plugin_audio_ports_t,
    note_ports: *const clap_plugin_note_ports_t,
    latency: *const clap_plugin_latency_t,
}

impl ExtensionSet {
    unsafe fn resolve(plugin: *const clap_plugin) -> Self {
        let lookup = |id: &[u8]| -> *const c_void {
            match (*plugin).get_extension {
                Some(get_extension) => get_extension(plugin, id.as_ptr() as *const c_char),
                None => core::ptr::null(),
            }
        };
        Self {
            params: lookup(CLAP_EXT_PARAMS) as *const _,
            state: lookup(CLAP_EXT_STATE) as *const _,
            gui: lookup(CLAP_EXT_GUI) as *const _,
            timer: lookup(CLAP_EXT_TIMER_SUPPORT) as *const _,
            audio_ports: lookup(CLAP_EXT_AUDIO_PORTS) as *const _,
            note_ports: lookup(CLAP_EXT_NOTE_PORTS) as *const _,
            latency: lookup(CLAP_EXT_LATENCY) as *const _,
        }
    }

    pub fn params(&self) -> Option<&clap_plugin_params_t> {
        unsafe { self.params.as_ref() }
    }
    pub fn state(&self) -> Option<&clap_plugin_state_t> {
        unsafe { self.state.as_ref() }
    }
    pub fn gui(&self) -> Option<&clap_plugin_gui_t> {
        unsafe { self.gui.as_ref() }
    }
    pub fn timer(&self) -> Option<&clap_plugin_timer_support_t> {
        unsafe { self.timer.as_ref() }
    }
    pub fn audio_ports(&self) -> Option<&clap_plugin_audio_ports_t> {
        unsafe { self.audio_ports.as_ref() }
    }
    pub fn note_ports(&self) -> Option<&clap_plugin_note_ports_t> {
        unsafe { self.note_ports.as_ref() }
    }
    pub fn latency(&self) -> Option<&clap_plugin_latency_t> {
        unsafe { self.latency.as_ref() }
    }
}

/// Exclusively owned native plugin instance. Destroyed exactly once, on
/// drop, after deactivation.
pub struct PluginHandle {
    plugin: *const clap_plugin,
    descriptor: PluginDescriptor,
    extensions: ExtensionSet,
    activated: bool,
}

unsafe impl Send for PluginHandle {}

impl PluginHandle {
    /// Create and init a plugin instance for the already-selected
    /// descriptor. The host callback surface behind `host` must be fully
    /// installed before this call: the plugin may query host extensions
    /// from inside `init`.
    ///
    /// # Safety
    /// `factory`, `raw_descriptor` and `host` must originate from a
    /// successfully loaded [`crate::loader::ClapLibrary`] and an installed
    /// host surface, both outliving the handle.
    pub unsafe fn create(
        factory: &clap_plugin_factory_t,
        raw_descriptor: *const clap_plugin_descriptor,
        host: *const clap_host,
    ) -> Result<Self, HostError> {
        let descriptor_ref = &*raw_descriptor;
        let version = descriptor_ref.clap_version;
        if !clap_version_is_compatible(version) {
            return Err(HostError::VersionMismatch {
                major: version.major,
                minor: version.minor,
                revision: version.revision,
            });
        }
        let descriptor = describe(descriptor_ref);

        let create_plugin = factory.create_plugin.ok_or(HostError::InitFailed)?;
        let id = CString::new(descriptor.id.clone()).map_err(|_| HostError::InitFailed)?;
        let plugin = create_plugin(factory, host, id.as_ptr());
        if plugin.is_null() {
            return Err(HostError::InitFailed);
        }

        if let Some(init) = (*plugin).init {
            if !init(plugin) {
                if let Some(destroy) = (*plugin).destroy {
                    destroy(plugin);
                }
                return Err(HostError::InitFailed);
            }
        }

        let extensions = ExtensionSet::resolve(plugin);
        log::info!(
            "created plugin {} ({}) by {}",
            descriptor.name,
            descriptor.id,
            descriptor.vendor
        );

        Ok(Self {
            plugin,
            descriptor,
            extensions,
            activated: false,
        })
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    /// Re-query the plugin's capability tables. Used when a capability was
    /// exercised from plugin `init` before the first resolution ran.
    pub fn refresh_extensions(&mut self) {
        self.extensions = unsafe { ExtensionSet::resolve(self.plugin) };
    }

    pub fn raw(&self) -> *const clap_plugin {
        self.plugin
    }

    pub fn is_active(&self) -> bool {
        self.activated
    }

    /// Activate for the given audio configuration. Activating an already
    /// active plugin is a host bug and fails hard.
    pub unsafe fn activate(
        &mut self,
        sample_rate: f64,
        min_frames: u32,
        max_frames: u32,
    ) -> Result<(), HostError> {
        if self.activated {
            return Err(HostError::ActivationPrecondition);
        }
        if let Some(activate) = (*self.plugin).activate {
            if !activate(self.plugin, sample_rate, min_frames, max_frames) {
                return Err(HostError::ActivationFailed);
            }
        }
        self.activated = true;
        Ok(())
    }

    pub unsafe fn deactivate(&mut self) {
        if !self.activated {
            return;
        }
        if let Some(deactivate) = (*self.plugin).deactivate {
            deactivate(self.plugin);
        }
        self.activated = false;
    }

    pub unsafe fn start_processing(&mut self) -> bool {
        match (*self.plugin).start_processing {
            Some(start_processing) => start_processing(self.plugin),
            None => true,
        }
    }

    pub unsafe fn stop_processing(&mut self) {
        if let Some(stop_processing) = (*self.plugin).stop_processing {
            stop_processing(self.plugin);
        }
    }

    /// Flush internal buffers after a transport relocation.
    pub unsafe fn reset(&mut self) {
        if let Some(reset) = (*self.plugin).reset {
            reset(self.plugin);
        }
    }

    pub unsafe fn process(&mut self, process: *const clap_process) -> clap_process_status {
        match (*self.plugin).process {
            Some(process_fn) => process_fn(self.plugin, process),
            None => CLAP_PROCESS_ERROR,
        }
    }

    pub unsafe fn on_main_thread(&self) {
        if let Some(on_main_thread) = (*self.plugin).on_main_thread {
            on_main_thread(self.plugin);
        }
    }
}

impl Drop for PluginHandle {
    fn drop(&mut self) {
        unsafe {
            if self.activated {
                if let Some(deactivate) = (*self.plugin).deactivate {
                    deactivate(self.plugin);
                }
            }
            if let Some(destroy) = (*self.plugin).destroy {
                destroy(self.plugin);
            }
        }
    }
}
