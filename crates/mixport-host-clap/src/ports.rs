//! Maps protocol-described audio buses, note ports and parameters onto the
//! mixer's generic port set.
//!
//! The whole set is built in one pass per (re)initialization and torn down
//! wholesale on rescan; indices held across a rescan are invalid and must
//! be re-resolved through the id table.

use core::ffi::c_void;
use std::collections::HashMap;
use std::sync::Arc;

use clap_abi::{
    clap_audio_port_info_t, clap_note_port_info_t, clap_param_info_t, CLAP_NOTE_DIALECT_MIDI,
    CLAP_PARAM_IS_BYPASS, CLAP_PARAM_IS_HIDDEN, CLAP_PARAM_IS_READONLY, CLAP_PARAM_IS_STEPPED,
};
use mixport_graph::{
    ControlCell, ControlKind, ControlSpec, Port, PortBinding, PortDirection, PortKind,
};

use crate::instance::PluginHandle;

/// Description of one protocol audio bus.
#[derive(Debug, Clone)]
pub struct BusInfo {
    pub name: String,
    pub channel_count: u32,
}

/// Description of one protocol note port.
#[derive(Debug, Clone)]
pub struct NotePortInfo {
    pub name: String,
    pub supported_dialects: u32,
}

/// Cached per-parameter metadata, keyed by protocol parameter id. Rebuilt
/// on rescan, never partially mutated.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub id: u32,
    pub cookie: *mut c_void,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub flags: u32,
}

impl ParamInfo {
    pub fn is_readonly(&self) -> bool {
        self.flags & CLAP_PARAM_IS_READONLY != 0
    }

    pub fn is_stepped(&self) -> bool {
        self.flags & CLAP_PARAM_IS_STEPPED != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.flags & CLAP_PARAM_IS_HIDDEN != 0
    }

    pub fn is_bypass(&self) -> bool {
        self.flags & CLAP_PARAM_IS_BYPASS != 0
    }

    fn control_kind(&self) -> ControlKind {
        if !self.is_stepped() {
            ControlKind::Continuous
        } else if self.min == 0.0 && self.max == 1.0 {
            ControlKind::Toggle
        } else {
            ControlKind::Integer
        }
    }
}

/// The generic port set plus the id-indexed lookup tables the rest of the
/// bridge resolves through.
pub struct PortModel {
    ports: Vec<Port>,
    params: HashMap<u32, ParamInfo>,
    param_ports: HashMap<u32, usize>,
    audio_in_buses: Vec<BusInfo>,
    audio_out_buses: Vec<BusInfo>,
    midi_in_ports: usize,
    midi_out_ports: usize,
    midi_dialect_in: usize,
    midi_dialect_out: usize,
    bypass: Option<Arc<ControlCell>>,
}

impl PortModel {
    /// Build the set from already-collected protocol descriptions.
    /// `bypass_cell` is the adapter-owned cell the hidden bypass port gets
    /// wired to when the plugin declares a bypass parameter.
    pub fn from_raw(
        audio_in: Vec<BusInfo>,
        audio_out: Vec<BusInfo>,
        note_in: Vec<NotePortInfo>,
        note_out: Vec<NotePortInfo>,
        param_infos: Vec<ParamInfo>,
        bypass_cell: Arc<ControlCell>,
    ) -> Self {
        let mut ports = Vec::new();

        for (bus, info) in audio_in.iter().enumerate() {
            for channel in 0..info.channel_count as usize {
                ports.push(Port::audio(
                    format!("{} {}", info.name, channel + 1),
                    PortDirection::Input,
                    bus,
                    channel,
                ));
            }
        }
        for (bus, info) in audio_out.iter().enumerate() {
            for channel in 0..info.channel_count as usize {
                ports.push(Port::audio(
                    format!("{} {}", info.name, channel + 1),
                    PortDirection::Output,
                    bus,
                    channel,
                ));
            }
        }

        let mut midi_dialect_in = 0;
        for (index, info) in note_in.iter().enumerate() {
            if info.supported_dialects & CLAP_NOTE_DIALECT_MIDI != 0 {
                midi_dialect_in += 1;
            }
            ports.push(Port::midi(info.name.clone(), PortDirection::Input, index));
        }
        let mut midi_dialect_out = 0;
        for (index, info) in note_out.iter().enumerate() {
            if info.supported_dialects & CLAP_NOTE_DIALECT_MIDI != 0 {
                midi_dialect_out += 1;
            }
            ports.push(Port::midi(info.name.clone(), PortDirection::Output, index));
        }

        let mut params = HashMap::with_capacity(param_infos.len());
        let mut param_ports = HashMap::new();
        let mut bypass_declared = false;
        for info in &param_infos {
            if info.is_bypass() {
                bypass_declared = true;
                params.insert(info.id, info.clone());
                continue;
            }
            let direction = if info.is_readonly() {
                PortDirection::Output
            } else {
                PortDirection::Input
            };
            let spec = ControlSpec {
                min: info.min,
                max: info.max,
                default: info.default,
                kind: info.control_kind(),
                visible: !info.is_hidden(),
            };
            let port = Port::control(
                info.name.clone(),
                direction,
                PortBinding::Parameter { param_id: info.id },
                spec,
            );
            // Read-only parameters surface as output controls and are not
            // host-settable, so they stay out of the id table on purpose.
            if !info.is_readonly() {
                param_ports.insert(info.id, ports.len());
            }
            params.insert(info.id, info.clone());
            ports.push(port);
        }

        let mut bypass = None;
        if bypass_declared {
            ports.push(Port {
                name: "Bypass".into(),
                direction: PortDirection::Input,
                kind: PortKind::Control,
                binding: PortBinding::Bypass,
                control: Some(ControlSpec {
                    min: 0.0,
                    max: 1.0,
                    default: 0.0,
                    kind: ControlKind::Toggle,
                    visible: false,
                }),
                cell: Some(bypass_cell.clone()),
            });
            bypass = Some(bypass_cell);
        }

        Self {
            ports,
            params,
            param_ports,
            audio_in_buses: audio_in,
            audio_out_buses: audio_out,
            midi_in_ports: note_in.len(),
            midi_out_ports: note_out.len(),
            midi_dialect_in,
            midi_dialect_out,
            bypass,
        }
    }

    /// Query the plugin's extensions and build the set. Absent extensions
    /// contribute nothing.
    pub fn scan(handle: &PluginHandle, bypass_cell: Arc<ControlCell>) -> Self {
        let plugin = handle.raw();
        let extensions = handle.extensions();

        let mut audio_in = Vec::new();
        let mut audio_out = Vec::new();
        if let Some(audio_ports) = extensions.audio_ports() {
            if let (Some(count), Some(get)) = (audio_ports.count, audio_ports.get) {
                for (is_input, out) in [(true, &mut audio_in), (false, &mut audio_out)] {
                    let n = unsafe { count(plugin, is_input) };
                    for index in 0..n {
                        let mut info: clap_audio_port_info_t = unsafe { std::mem::zeroed() };
                        if unsafe { get(plugin, index, is_input, &mut info) } {
                            out.push(BusInfo {
                                name: cstr_array(&info.name),
                                channel_count: info.channel_count,
                            });
                        }
                    }
                }
            }
        }

        let mut note_in = Vec::new();
        let mut note_out = Vec::new();
        if let Some(note_ports) = extensions.note_ports() {
            if let (Some(count), Some(get)) = (note_ports.count, note_ports.get) {
                for (is_input, out) in [(true, &mut note_in), (false, &mut note_out)] {
                    let n = unsafe { count(plugin, is_input) };
                    for index in 0..n {
                        let mut info: clap_note_port_info_t = unsafe { std::mem::zeroed() };
                        if unsafe { get(plugin, index, is_input, &mut info) } {
                            out.push(NotePortInfo {
                                name: cstr_array(&info.name),
                                supported_dialects: info.supported_dialects,
                            });
                        }
                    }
                }
            }
        }

        let mut param_infos = Vec::new();
        if let Some(params) = extensions.params() {
            if let (Some(count), Some(get_info)) = (params.count, params.get_info) {
                let n = unsafe { count(plugin) };
                for index in 0..n {
                    let mut info: clap_param_info_t = unsafe { std::mem::zeroed() };
                    if unsafe { get_info(plugin, index, &mut info) } {
                        param_infos.push(ParamInfo {
                            id: info.id,
                            cookie: info.cookie,
                            name: cstr_array(&info.name),
                            min: info.min_value,
                            max: info.max_value,
                            default: info.default_value,
                            flags: info.flags,
                        });
                    }
                }
            }
        }

        let model = Self::from_raw(audio_in, audio_out, note_in, note_out, param_infos, bypass_cell);
        model.refresh_values(handle);
        model
    }

    /// Pull current parameter values from the plugin into the backing
    /// cells (a values-only rescan).
    pub fn refresh_values(&self, handle: &PluginHandle) {
        let Some(params) = handle.extensions().params() else {
            return;
        };
        let Some(get_value) = params.get_value else {
            return;
        };
        for port in &self.ports {
            let PortBinding::Parameter { param_id } = port.binding else {
                continue;
            };
            let mut value = 0.0f64;
            if unsafe { get_value(handle.raw(), param_id, &mut value) } {
                port.set_control_value(value);
            }
        }
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn param_info(&self, param_id: u32) -> Option<&ParamInfo> {
        self.params.get(&param_id)
    }

    /// Resolve a settable parameter to its current port index. Returns
    /// `None` for read-only parameters and unknown ids.
    pub fn port_index_for_param(&self, param_id: u32) -> Option<usize> {
        self.param_ports.get(&param_id).copied()
    }

    pub fn audio_in_buses(&self) -> &[BusInfo] {
        &self.audio_in_buses
    }

    pub fn audio_out_buses(&self) -> &[BusInfo] {
        &self.audio_out_buses
    }

    pub fn midi_in_ports(&self) -> usize {
        self.midi_in_ports
    }

    pub fn midi_out_ports(&self) -> usize {
        self.midi_out_ports
    }

    /// Count of input note ports that accept the raw MIDI dialect; CC,
    /// pitch-bend, aftertouch and program-change bytes are only forwarded
    /// while this is non-zero.
    pub fn midi_dialect_in(&self) -> usize {
        self.midi_dialect_in
    }

    pub fn midi_dialect_out(&self) -> usize {
        self.midi_dialect_out
    }

    /// Backing cell of the hidden bypass port, when the plugin declared
    /// one.
    pub fn bypass_cell(&self) -> Option<Arc<ControlCell>> {
        self.bypass.clone()
    }

    pub fn input_channel_total(&self) -> usize {
        self.audio_in_buses
            .iter()
            .map(|bus| bus.channel_count as usize)
            .sum()
    }

    pub fn output_channel_total(&self) -> usize {
        self.audio_out_buses
            .iter()
            .map(|bus| bus.channel_count as usize)
            .sum()
    }
}

fn cstr_array(chars: &[core::ffi::c_char]) -> String {
    let bytes: Vec<u8> = chars
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
