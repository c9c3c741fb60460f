use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Direction of a generic port, seen from the hosted processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// Payload carried by a generic port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    Audio,
    Midi,
    Control,
}

/// Value shape of a control port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    Continuous,
    Integer,
    Toggle,
}

/// Back-reference from a generic port into the protocol-side structure it
/// was expanded from. Audio ports remember their (bus, channel) pair so the
/// bridge can marshal buffers in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortBinding {
    AudioChannel { bus: usize, channel: usize },
    MidiPort { port: usize },
    Parameter { param_id: u32 },
    Bypass,
}

/// Lock-free backing cell for a control port value.
///
/// Stored as raw `f64` bits so the audio thread can read the latest value
/// without taking a lock.
#[derive(Debug, Default)]
pub struct ControlCell {
    bits: AtomicU64,
}

impl ControlCell {
    pub fn new(value: f64) -> Arc<Self> {
        Arc::new(Self {
            bits: AtomicU64::new(value.to_bits()),
        })
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// A generic audio/MIDI/control endpoint exposed to the mixer.
///
/// Ports live exactly as long as the plugin they describe; a parameter
/// rescan tears the whole set down and rebuilds it, so holders of port
/// indices must re-resolve by id afterwards.
#[derive(Debug, Clone)]
pub struct Port {
    pub name: String,
    pub direction: PortDirection,
    pub kind: PortKind,
    pub binding: PortBinding,
    /// Control-port range metadata; `None` for audio and MIDI ports.
    pub control: Option<ControlSpec>,
    /// Backing value for control ports.
    pub cell: Option<Arc<ControlCell>>,
}

/// Range metadata of a control port.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub kind: ControlKind,
    /// Hidden ports stay connected to their cell but are not shown in the
    /// mixer UI.
    pub visible: bool,
}

impl Port {
    pub fn audio(
        name: impl Into<String>,
        direction: PortDirection,
        bus: usize,
        channel: usize,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            kind: PortKind::Audio,
            binding: PortBinding::AudioChannel { bus, channel },
            control: None,
            cell: None,
        }
    }

    pub fn midi(name: impl Into<String>, direction: PortDirection, port: usize) -> Self {
        Self {
            name: name.into(),
            direction,
            kind: PortKind::Midi,
            binding: PortBinding::MidiPort { port },
            control: None,
            cell: None,
        }
    }

    pub fn control(
        name: impl Into<String>,
        direction: PortDirection,
        binding: PortBinding,
        spec: ControlSpec,
    ) -> Self {
        let cell = ControlCell::new(spec.default);
        Self {
            name: name.into(),
            direction,
            kind: PortKind::Control,
            binding,
            control: Some(spec),
            cell: Some(cell),
        }
    }

    /// Current value of a control port, clamped to its declared range.
    pub fn control_value(&self) -> Option<f64> {
        let spec = self.control.as_ref()?;
        let cell = self.cell.as_ref()?;
        Some(cell.get().clamp(spec.min, spec.max))
    }

    pub fn set_control_value(&self, value: f64) {
        if let Some(cell) = &self.cell {
            cell.set(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_value_clamps_to_range() {
        let port = Port::control(
            "gain",
            PortDirection::Input,
            PortBinding::Parameter { param_id: 7 },
            ControlSpec {
                min: 0.0,
                max: 1.0,
                default: 0.5,
                kind: ControlKind::Continuous,
                visible: true,
            },
        );
        assert_eq!(port.control_value(), Some(0.5));
        port.set_control_value(3.0);
        assert_eq!(port.control_value(), Some(1.0));
    }

    #[test]
    fn audio_port_has_no_cell() {
        let port = Port::audio("out L", PortDirection::Output, 0, 0);
        assert!(port.cell.is_none());
        assert_eq!(port.control_value(), None);
    }
}
