//! Generic port, transport, and threading primitives shared between the
//! Mixport mixer and its plugin hosting bridges.

mod cycle;
mod port;
mod thread;
mod transport;

pub use cycle::{CycleIo, MidiOutBuffer};
pub use port::{ControlCell, ControlKind, ControlSpec, Port, PortBinding, PortDirection, PortKind};
pub use thread::{current_thread_role, register_thread_role, ThreadRole};
pub use transport::{DriverTransport, TransportDriver};
