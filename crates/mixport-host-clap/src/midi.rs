//! Raw MIDI byte stream translation for the process cycle.

use crate::error::HostError;
use crate::events::PluginEvent;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const POLY_PRESSURE: u8 = 0xA0;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const CHANNEL_PRESSURE: u8 = 0xD0;
const PITCH_BEND: u8 = 0xE0;

fn message_len(status: u8) -> usize {
    match status & 0xF0 {
        PROGRAM_CHANGE | CHANNEL_PRESSURE => 2,
        _ => 3,
    }
}

/// Translate one cycle's raw input bytes for a MIDI port into protocol
/// events.
///
/// Note on/off become typed note events with 0..1 velocity. The remaining
/// channel messages pass through as raw MIDI only while `dialect_enabled`
/// (the port set's MIDI-dialect input count is non-zero); a host without
/// dialect support must not synthesize message types the plugin never
/// asked for. System and realtime bytes are dropped, as is a truncated
/// trailing message.
pub fn translate_input(
    bytes: &[u8],
    port: u16,
    dialect_enabled: bool,
    mut emit: impl FnMut(PluginEvent),
) {
    let mut cursor = 0;
    while cursor < bytes.len() {
        let status = bytes[cursor];
        if status < 0x80 {
            // Stray data byte; resynchronize on the next status byte.
            cursor += 1;
            continue;
        }
        if status >= 0xF0 {
            cursor += 1;
            continue;
        }
        let len = message_len(status);
        if cursor + len > bytes.len() {
            // Incomplete trailing message, tolerated and discarded.
            return;
        }
        let message = &bytes[cursor..cursor + len];
        cursor += len;

        let channel = i16::from(status & 0x0F);
        match status & 0xF0 {
            NOTE_ON if message[2] > 0 => emit(PluginEvent::NoteOn {
                time: 0,
                port: port as i16,
                channel,
                key: i16::from(message[1]),
                velocity: f64::from(message[2]) / 127.0,
            }),
            // Note on with zero velocity is a note off by convention.
            NOTE_ON | NOTE_OFF => emit(PluginEvent::NoteOff {
                time: 0,
                port: port as i16,
                channel,
                key: i16::from(message[1]),
                velocity: f64::from(message.get(2).copied().unwrap_or(0)) / 127.0,
            }),
            POLY_PRESSURE | CONTROL_CHANGE | PITCH_BEND if dialect_enabled => {
                emit(PluginEvent::Midi {
                    time: 0,
                    port,
                    data: [message[0], message[1], message[2]],
                })
            }
            PROGRAM_CHANGE | CHANNEL_PRESSURE if dialect_enabled => emit(PluginEvent::Midi {
                time: 0,
                port,
                data: [message[0], message[1], 0],
            }),
            _ => {}
        }
    }
}

/// Re-encode a plugin output event back into driver MIDI bytes.
///
/// Events that have no MIDI rendition (parameter traffic is routed to the
/// synchronizer before this point) report `EncodeFailed`.
pub fn encode_output(event: &PluginEvent, out: &mut impl FnMut(&[u8])) -> Result<(), HostError> {
    match *event {
        PluginEvent::NoteOn {
            channel,
            key,
            velocity,
            ..
        } => {
            let (status, key) = note_status(NOTE_ON, channel, key)?;
            out(&[status, key, denormalize_velocity(velocity)]);
            Ok(())
        }
        PluginEvent::NoteOff {
            channel,
            key,
            velocity,
            ..
        } => {
            let (status, key) = note_status(NOTE_OFF, channel, key)?;
            out(&[status, key, denormalize_velocity(velocity)]);
            Ok(())
        }
        PluginEvent::Midi { data, .. } => {
            out(&data[..message_len(data[0]).min(3)]);
            Ok(())
        }
        _ => Err(HostError::EncodeFailed(
            "event has no MIDI rendition".into(),
        )),
    }
}

fn note_status(kind: u8, channel: i16, key: i16) -> Result<(u8, u8), HostError> {
    if !(0..16).contains(&channel) || !(0..128).contains(&key) {
        return Err(HostError::EncodeFailed(format!(
            "note event out of range (channel {channel}, key {key})"
        )));
    }
    Ok((kind | channel as u8, key as u8))
}

fn denormalize_velocity(velocity: f64) -> u8 {
    (velocity.clamp(0.0, 1.0) * 127.0).round() as u8
}
