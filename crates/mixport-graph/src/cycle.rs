//! Per-cycle I/O views handed from the driver layer to a hosting bridge.

/// Pre-allocated byte sink for MIDI re-encoded on the way out of a plugin.
///
/// The driver drains it after every cycle; capacity is reserved up front so
/// pushes on the audio thread stay allocation-free for bounded event loads.
#[derive(Debug, Default)]
pub struct MidiOutBuffer {
    bytes: Vec<u8>,
}

impl MidiOutBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

/// Everything the driver layer supplies to, and collects from, one process
/// cycle. Slices are ordered like the bridge's generic port set: one audio
/// slice per audio port, one MIDI stream per MIDI port, per direction.
pub struct CycleIo<'a> {
    pub frames: u32,
    pub transport: crate::DriverTransport,
    pub audio_in: &'a [&'a [f32]],
    pub audio_out: &'a mut [&'a mut [f32]],
    /// Raw driver MIDI bytes for the cycle, one stream per MIDI input port.
    pub midi_in: &'a [&'a [u8]],
    /// Re-encoded plugin MIDI output, one buffer per MIDI output port.
    pub midi_out: &'a mut [MidiOutBuffer],
}
