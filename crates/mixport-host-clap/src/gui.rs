//! Plugin editor window lifecycle.
//!
//! The manager sequences create/show/hide/resize/destroy against the
//! plugin's gui extension. Actual window embedding is delegated to the
//! toolkit collaborator behind [`EmbeddingHost`]; only the lifecycle
//! contract lives here.

use core::ffi::{c_char, c_void};
use std::ffi::CString;

use clap_abi::{clap_plugin, clap_plugin_gui_t, clap_window, clap_window_handle};

use crate::host::GuiRequests;

/// The single embedding technology this host speaks per platform.
#[cfg(target_os = "macos")]
pub const WINDOW_API: &[u8] = clap_abi::CLAP_WINDOW_API_COCOA;
#[cfg(target_os = "windows")]
pub const WINDOW_API: &[u8] = clap_abi::CLAP_WINDOW_API_WIN32;
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const WINDOW_API: &[u8] = clap_abi::CLAP_WINDOW_API_X11;

/// Platform window handle supplied by the toolkit collaborator.
#[derive(Debug, Clone, Copy)]
pub enum NativeWindow {
    X11(core::ffi::c_ulong),
    Ptr(*mut c_void),
}

impl NativeWindow {
    fn to_clap_window(self) -> clap_window {
        clap_window {
            api: WINDOW_API.as_ptr() as *const c_char,
            specific: match self {
                NativeWindow::X11(id) => clap_window_handle { x11: id },
                NativeWindow::Ptr(ptr) => clap_window_handle { ptr },
            },
        }
    }
}

/// Toolkit-side collaborator that owns the native embedding window.
pub trait EmbeddingHost {
    /// Create the native window an embedded editor will be re-parented
    /// into.
    fn create_embedding(&mut self, width: u32, height: u32) -> Option<NativeWindow>;
    fn resize_embedding(&mut self, width: u32, height: u32);
    fn destroy_embedding(&mut self);
    /// Owner window for a floating editor's transient hint.
    fn transient_owner(&self) -> Option<NativeWindow> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiState {
    Closed,
    Created,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuiMode {
    Embedded,
    Floating,
}

/// Creation/show/hide/resize/destroy sequencing for one plugin editor.
pub struct GuiManager {
    state: GuiState,
    mode: GuiMode,
}

impl Default for GuiManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GuiManager {
    pub fn new() -> Self {
        Self {
            state: GuiState::Closed,
            mode: GuiMode::Embedded,
        }
    }

    pub fn state(&self) -> GuiState {
        self.state
    }

    /// Open the editor, or toggle its visibility when it already exists.
    /// Returns the resulting state; `GuiState::Closed` means the plugin has
    /// no usable editor.
    pub fn try_open(
        &mut self,
        plugin: *const clap_plugin,
        gui: Option<&clap_plugin_gui_t>,
        embedder: &mut dyn EmbeddingHost,
        title: &str,
    ) -> GuiState {
        let Some(gui) = gui else {
            return self.state;
        };

        match self.state {
            GuiState::Visible => {
                self.hide(plugin, gui);
                return self.state;
            }
            GuiState::Created => {
                self.show(plugin, gui);
                return self.state;
            }
            GuiState::Closed => {}
        }

        let api = WINDOW_API.as_ptr() as *const c_char;
        let supported = |floating: bool| -> bool {
            gui.is_api_supported
                .map(|f| unsafe { f(plugin, api, floating) })
                .unwrap_or(false)
        };
        self.mode = if supported(false) {
            GuiMode::Embedded
        } else if supported(true) {
            GuiMode::Floating
        } else {
            log::warn!("plugin editor supports neither embedded nor floating mode");
            return self.state;
        };

        let floating = self.mode == GuiMode::Floating;
        let created = gui
            .create
            .map(|f| unsafe { f(plugin, api, floating) })
            .unwrap_or(false);
        if !created {
            log::warn!("plugin editor refused to create");
            return self.state;
        }

        match self.mode {
            GuiMode::Embedded => {
                let (mut width, mut height) = (640, 480);
                if let Some(get_size) = gui.get_size {
                    unsafe {
                        get_size(plugin, &mut width, &mut height);
                    }
                }
                let Some(window) = embedder.create_embedding(width, height) else {
                    unsafe { self.destroy_editor(plugin, gui) };
                    return self.state;
                };
                let attached = gui
                    .set_parent
                    .map(|f| unsafe { f(plugin, &window.to_clap_window()) })
                    .unwrap_or(false);
                if !attached {
                    unsafe { self.destroy_editor(plugin, gui) };
                    embedder.destroy_embedding();
                    return self.state;
                }
            }
            GuiMode::Floating => {
                if let (Some(set_transient), Some(owner)) =
                    (gui.set_transient, embedder.transient_owner())
                {
                    unsafe {
                        set_transient(plugin, &owner.to_clap_window());
                    }
                }
                if let Some(suggest_title) = gui.suggest_title {
                    if let Ok(title) = CString::new(title) {
                        unsafe {
                            suggest_title(plugin, title.as_ptr());
                        }
                    }
                }
            }
        }

        self.state = GuiState::Created;
        self.show(plugin, gui);
        self.state
    }

    fn show(&mut self, plugin: *const clap_plugin, gui: &clap_plugin_gui_t) {
        let shown = gui
            .show
            .map(|f| unsafe { f(plugin) })
            .unwrap_or(false);
        if shown {
            self.state = GuiState::Visible;
        }
    }

    fn hide(&mut self, plugin: *const clap_plugin, gui: &clap_plugin_gui_t) {
        if let Some(hide) = gui.hide {
            unsafe {
                hide(plugin);
            }
        }
        self.state = GuiState::Created;
    }

    /// Hide the editor; an embedded editor is destroyed and its window
    /// released, a floating one merely hides.
    pub fn close(
        &mut self,
        plugin: *const clap_plugin,
        gui: Option<&clap_plugin_gui_t>,
        embedder: &mut dyn EmbeddingHost,
    ) {
        let Some(gui) = gui else {
            return;
        };
        if self.state == GuiState::Closed {
            return;
        }
        self.hide(plugin, gui);
        if self.mode == GuiMode::Embedded {
            unsafe { self.destroy_editor(plugin, gui) };
            embedder.destroy_embedding();
        }
    }

    /// A plugin-side resize request: the plugin's own constraints adjust
    /// the size before the embedding window and editor are resized.
    pub fn handle_resize_request(
        &mut self,
        plugin: *const clap_plugin,
        gui: Option<&clap_plugin_gui_t>,
        embedder: &mut dyn EmbeddingHost,
        mut width: u32,
        mut height: u32,
    ) {
        let Some(gui) = gui else {
            return;
        };
        if self.state == GuiState::Closed {
            return;
        }
        if let Some(adjust_size) = gui.adjust_size {
            unsafe {
                adjust_size(plugin, &mut width, &mut height);
            }
        }
        if self.mode == GuiMode::Embedded {
            embedder.resize_embedding(width, height);
        }
        if let Some(set_size) = gui.set_size {
            unsafe {
                set_size(plugin, width, height);
            }
        }
    }

    /// The plugin reported its editor closed. A destroyed editor is
    /// acknowledged with exactly one destroy call.
    pub fn handle_closed(
        &mut self,
        plugin: *const clap_plugin,
        gui: Option<&clap_plugin_gui_t>,
        embedder: &mut dyn EmbeddingHost,
        was_destroyed: bool,
    ) {
        let Some(gui) = gui else {
            return;
        };
        if was_destroyed {
            if self.state != GuiState::Closed {
                unsafe { self.destroy_editor(plugin, gui) };
                if self.mode == GuiMode::Embedded {
                    embedder.destroy_embedding();
                }
            }
        } else {
            self.state = GuiState::Created;
        }
    }

    /// Drain GUI traffic recorded by the callback surface. Runs on the UI
    /// tick, never inside the plugin callback itself.
    pub fn service(
        &mut self,
        plugin: *const clap_plugin,
        gui: Option<&clap_plugin_gui_t>,
        embedder: &mut dyn EmbeddingHost,
        requests: &GuiRequests,
    ) {
        if let Some(destroyed) = requests.take_closed() {
            self.handle_closed(plugin, gui, embedder, destroyed);
        }
        if let Some((width, height)) = requests.take_resize() {
            self.handle_resize_request(plugin, gui, embedder, width, height);
        }
        requests.take_resize_hints_changed();
        if requests.take_show() {
            if let Some(gui) = gui {
                if self.state == GuiState::Created {
                    self.show(plugin, gui);
                }
            }
        }
        if requests.take_hide() {
            if let Some(gui) = gui {
                if self.state == GuiState::Visible {
                    self.hide(plugin, gui);
                }
            }
        }
    }

    unsafe fn destroy_editor(&mut self, plugin: *const clap_plugin, gui: &clap_plugin_gui_t) {
        if let Some(destroy) = gui.destroy {
            destroy(plugin);
        }
        self.state = GuiState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct GuiSpy {
        embedded_supported: bool,
        floating_supported: bool,
        created: Cell<u32>,
        destroyed: Cell<u32>,
        shown: Cell<u32>,
        hidden: Cell<u32>,
        parented: Cell<u32>,
        transient: Cell<u32>,
        titled: Cell<u32>,
        set_size: Cell<(u32, u32)>,
    }

    unsafe fn spy<'a>(plugin: *const clap_plugin) -> &'a GuiSpy {
        &*((*plugin).plugin_data as *const GuiSpy)
    }

    unsafe extern "C" fn is_api_supported(
        plugin: *const clap_plugin,
        _api: *const c_char,
        is_floating: bool,
    ) -> bool {
        let spy = spy(plugin);
        if is_floating {
            spy.floating_supported
        } else {
            spy.embedded_supported
        }
    }

    unsafe extern "C" fn create(
        plugin: *const clap_plugin,
        _api: *const c_char,
        _is_floating: bool,
    ) -> bool {
        spy(plugin).created.set(spy(plugin).created.get() + 1);
        true
    }

    unsafe extern "C" fn destroy(plugin: *const clap_plugin) {
        spy(plugin).destroyed.set(spy(plugin).destroyed.get() + 1);
    }

    unsafe extern "C" fn get_size(
        _plugin: *const clap_plugin,
        width: *mut u32,
        height: *mut u32,
    ) -> bool {
        *width = 400;
        *height = 300;
        true
    }

    unsafe extern "C" fn adjust_size(
        _plugin: *const clap_plugin,
        width: *mut u32,
        _height: *mut u32,
    ) -> bool {
        // The editor refuses to grow past 800 wide.
        if *width > 800 {
            *width = 800;
        }
        true
    }

    unsafe extern "C" fn set_size(plugin: *const clap_plugin, width: u32, height: u32) -> bool {
        spy(plugin).set_size.set((width, height));
        true
    }

    unsafe extern "C" fn set_parent(
        plugin: *const clap_plugin,
        _window: *const clap_window,
    ) -> bool {
        spy(plugin).parented.set(spy(plugin).parented.get() + 1);
        true
    }

    unsafe extern "C" fn set_transient(
        plugin: *const clap_plugin,
        _window: *const clap_window,
    ) -> bool {
        spy(plugin).transient.set(spy(plugin).transient.get() + 1);
        true
    }

    unsafe extern "C" fn suggest_title(plugin: *const clap_plugin, _title: *const c_char) {
        spy(plugin).titled.set(spy(plugin).titled.get() + 1);
    }

    unsafe extern "C" fn show(plugin: *const clap_plugin) -> bool {
        spy(plugin).shown.set(spy(plugin).shown.get() + 1);
        true
    }

    unsafe extern "C" fn hide(plugin: *const clap_plugin) -> bool {
        spy(plugin).hidden.set(spy(plugin).hidden.get() + 1);
        true
    }

    fn gui_vtable() -> clap_plugin_gui_t {
        clap_plugin_gui_t {
            is_api_supported: Some(is_api_supported),
            get_preferred_api: None,
            create: Some(create),
            destroy: Some(destroy),
            set_scale: None,
            get_size: Some(get_size),
            can_resize: None,
            get_resize_hints: None,
            adjust_size: Some(adjust_size),
            set_size: Some(set_size),
            set_parent: Some(set_parent),
            set_transient: Some(set_transient),
            suggest_title: Some(suggest_title),
            show: Some(show),
            hide: Some(hide),
        }
    }

    fn fake_plugin(spy: &GuiSpy) -> clap_plugin {
        clap_plugin {
            desc: std::ptr::null(),
            plugin_data: spy as *const GuiSpy as *mut c_void,
            init: None,
            destroy: None,
            activate: None,
            deactivate: None,
            start_processing: None,
            stop_processing: None,
            reset: None,
            process: None,
            get_extension: None,
            on_main_thread: None,
        }
    }

    #[derive(Default)]
    struct EmbedSpy {
        created: u32,
        destroyed: u32,
        resized: Option<(u32, u32)>,
    }

    impl EmbeddingHost for EmbedSpy {
        fn create_embedding(&mut self, _width: u32, _height: u32) -> Option<NativeWindow> {
            self.created += 1;
            Some(NativeWindow::X11(0x1234))
        }

        fn resize_embedding(&mut self, width: u32, height: u32) {
            self.resized = Some((width, height));
        }

        fn destroy_embedding(&mut self) {
            self.destroyed += 1;
        }
    }

    #[test]
    fn open_prefers_embedded_and_parents_the_editor() {
        let spy = GuiSpy {
            embedded_supported: true,
            floating_supported: true,
            ..GuiSpy::default()
        };
        let plugin = fake_plugin(&spy);
        let gui = gui_vtable();
        let mut embedder = EmbedSpy::default();
        let mut manager = GuiManager::new();

        let state = manager.try_open(&plugin, Some(&gui), &mut embedder, "Fuzz");
        assert_eq!(state, GuiState::Visible);
        assert_eq!(spy.created.get(), 1);
        assert_eq!(spy.parented.get(), 1);
        assert_eq!(embedder.created, 1);
        assert_eq!(spy.shown.get(), 1);
        assert_eq!(spy.transient.get(), 0);
    }

    #[test]
    fn open_falls_back_to_floating_with_title() {
        let spy = GuiSpy {
            embedded_supported: false,
            floating_supported: true,
            ..GuiSpy::default()
        };
        let plugin = fake_plugin(&spy);
        let gui = gui_vtable();
        let mut embedder = EmbedSpy::default();
        let mut manager = GuiManager::new();

        let state = manager.try_open(&plugin, Some(&gui), &mut embedder, "Fuzz");
        assert_eq!(state, GuiState::Visible);
        assert_eq!(embedder.created, 0);
        assert_eq!(spy.titled.get(), 1);
    }

    #[test]
    fn reopen_toggles_visibility_without_recreating() {
        let spy = GuiSpy {
            embedded_supported: true,
            ..GuiSpy::default()
        };
        let plugin = fake_plugin(&spy);
        let gui = gui_vtable();
        let mut embedder = EmbedSpy::default();
        let mut manager = GuiManager::new();

        manager.try_open(&plugin, Some(&gui), &mut embedder, "Fuzz");
        manager.try_open(&plugin, Some(&gui), &mut embedder, "Fuzz");
        assert_eq!(manager.state(), GuiState::Created);
        manager.try_open(&plugin, Some(&gui), &mut embedder, "Fuzz");
        assert_eq!(manager.state(), GuiState::Visible);
        assert_eq!(spy.created.get(), 1);
    }

    #[test]
    fn close_destroys_an_embedded_editor_once() {
        let spy = GuiSpy {
            embedded_supported: true,
            ..GuiSpy::default()
        };
        let plugin = fake_plugin(&spy);
        let gui = gui_vtable();
        let mut embedder = EmbedSpy::default();
        let mut manager = GuiManager::new();

        manager.try_open(&plugin, Some(&gui), &mut embedder, "Fuzz");
        manager.close(&plugin, Some(&gui), &mut embedder);
        assert_eq!(manager.state(), GuiState::Closed);
        assert_eq!(spy.destroyed.get(), 1);
        assert_eq!(embedder.destroyed, 1);
        // Closing again is a no-op.
        manager.close(&plugin, Some(&gui), &mut embedder);
        assert_eq!(spy.destroyed.get(), 1);
    }

    #[test]
    fn plugin_initiated_destroy_is_acknowledged_exactly_once() {
        let spy = GuiSpy {
            embedded_supported: true,
            ..GuiSpy::default()
        };
        let plugin = fake_plugin(&spy);
        let gui = gui_vtable();
        let mut embedder = EmbedSpy::default();
        let mut manager = GuiManager::new();

        manager.try_open(&plugin, Some(&gui), &mut embedder, "Fuzz");
        manager.handle_closed(&plugin, Some(&gui), &mut embedder, true);
        assert_eq!(manager.state(), GuiState::Closed);
        assert_eq!(spy.destroyed.get(), 1);
        manager.handle_closed(&plugin, Some(&gui), &mut embedder, true);
        assert_eq!(spy.destroyed.get(), 1);
    }

    #[test]
    fn resize_requests_pass_through_plugin_constraints() {
        let spy = GuiSpy {
            embedded_supported: true,
            ..GuiSpy::default()
        };
        let plugin = fake_plugin(&spy);
        let gui = gui_vtable();
        let mut embedder = EmbedSpy::default();
        let mut manager = GuiManager::new();

        manager.try_open(&plugin, Some(&gui), &mut embedder, "Fuzz");
        manager.handle_resize_request(&plugin, Some(&gui), &mut embedder, 1000, 500);
        assert_eq!(embedder.resized, Some((800, 500)));
        assert_eq!(spy.set_size.get(), (800, 500));
    }
}
