//! CLAP plugin hosting bridge for the Mixport mixer.
//!
//! The adapter loads a plugin binary, installs the host callback surface,
//! expands the plugin's buses/note ports/parameters into the mixer's
//! generic port set, and drives the realtime process cycle through a
//! split-off [`ProcessBridge`]. Everything else (rescans, gesture replay,
//! timers, editor lifecycle, state persistence) happens on the UI tick.

mod adapter;
mod config;
mod error;
mod events;
mod gui;
mod host;
mod instance;
mod loader;
mod midi;
mod ports;
mod process;
mod state;
mod sync;
mod timer;

pub use adapter::ClapAdapter;
pub use config::{default_search_roots, HostConfig};
pub use error::HostError;
pub use events::{EventQueue, PluginEvent};
pub use gui::{EmbeddingHost, GuiManager, GuiState, NativeWindow, WINDOW_API};
pub use host::{GuiRequests, HostHandle, HostShared};
pub use instance::{ExtensionSet, PluginHandle};
pub use loader::{locate_by_basename, ClapLibrary, PluginDescriptor};
pub use ports::{BusInfo, NotePortInfo, ParamInfo, PortModel};
pub use process::{
    effective_latency, BridgeLayout, BridgeState, ProcessBridge, ProcessShared, TransportSnapshot,
};
pub use state::{
    load_state, restore_state_from_file, save_state, save_state_to_file, SessionRecord,
};
pub use sync::{param_channel, GestureSync, ParamOutput, ParamSender};
pub use timer::TimerRegistry;

/// Re-export the raw ABI for users that need to drop down to it.
pub use clap_abi as ffi;
