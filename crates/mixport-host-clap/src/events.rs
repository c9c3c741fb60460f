//! Growable byte-arena FIFO of CLAP event records.
//!
//! The queue backs both directions of the process call: the bridge packs
//! typed events into it before invoking the plugin, and the plugin pushes
//! raw records into the output instance through the `clap_output_events`
//! facade. Records are stored verbatim in a contiguous arena with a
//! parallel `(offset, len)` index; growth doubles both buffers, so a
//! realtime caller feeding a bounded worst case per cycle settles after a
//! few cycles and never allocates again.

use core::ffi::c_void;
use std::mem;
use std::ptr;

use clap_abi::{
    clap_event_header, clap_event_header_t, clap_event_midi, clap_event_note,
    clap_event_param_gesture, clap_event_param_value, clap_input_events, clap_output_events,
    CLAP_CORE_EVENT_SPACE_ID, CLAP_EVENT_MIDI, CLAP_EVENT_NOTE_OFF, CLAP_EVENT_NOTE_ON,
    CLAP_EVENT_PARAM_GESTURE_BEGIN, CLAP_EVENT_PARAM_GESTURE_END, CLAP_EVENT_PARAM_VALUE,
};

const INITIAL_ARENA_BYTES: usize = 4096;
const INITIAL_INDEX_SLOTS: usize = 64;

/// Typed view of the event records the bridge exchanges with a plugin.
///
/// `time` is the sample offset relative to the current process block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PluginEvent {
    NoteOn {
        time: u32,
        port: i16,
        channel: i16,
        key: i16,
        /// Normalized 0..1.
        velocity: f64,
    },
    NoteOff {
        time: u32,
        port: i16,
        channel: i16,
        key: i16,
        velocity: f64,
    },
    Midi {
        time: u32,
        port: u16,
        data: [u8; 3],
    },
    ParamValue {
        time: u32,
        param_id: u32,
        cookie: *mut c_void,
        value: f64,
    },
    GestureBegin {
        time: u32,
        param_id: u32,
    },
    GestureEnd {
        time: u32,
        param_id: u32,
    },
}

impl PluginEvent {
    fn header(time: u32, type_: u16, size: usize) -> clap_event_header_t {
        clap_event_header_t {
            size: size as u32,
            time,
            space_id: CLAP_CORE_EVENT_SPACE_ID,
            type_,
            flags: 0,
        }
    }

    /// Parse a raw record back into a typed event. Unknown or foreign-space
    /// records yield `None`.
    pub fn decode(record: &[u8]) -> Option<PluginEvent> {
        if record.len() < mem::size_of::<clap_event_header>() {
            return None;
        }
        // The arena only ever stores records it was handed whole, so reading
        // the header from the front of the slice is sound.
        let header = unsafe { ptr::read_unaligned(record.as_ptr() as *const clap_event_header) };
        if header.space_id != CLAP_CORE_EVENT_SPACE_ID {
            return None;
        }
        unsafe {
            match header.type_ {
                CLAP_EVENT_NOTE_ON | CLAP_EVENT_NOTE_OFF
                    if record.len() >= mem::size_of::<clap_event_note>() =>
                {
                    let ev = ptr::read_unaligned(record.as_ptr() as *const clap_event_note);
                    let common = (ev.header.time, ev.port_index, ev.channel, ev.key, ev.velocity);
                    Some(if header.type_ == CLAP_EVENT_NOTE_ON {
                        PluginEvent::NoteOn {
                            time: common.0,
                            port: common.1,
                            channel: common.2,
                            key: common.3,
                            velocity: common.4,
                        }
                    } else {
                        PluginEvent::NoteOff {
                            time: common.0,
                            port: common.1,
                            channel: common.2,
                            key: common.3,
                            velocity: common.4,
                        }
                    })
                }
                CLAP_EVENT_MIDI if record.len() >= mem::size_of::<clap_event_midi>() => {
                    let ev = ptr::read_unaligned(record.as_ptr() as *const clap_event_midi);
                    Some(PluginEvent::Midi {
                        time: ev.header.time,
                        port: ev.port_index,
                        data: ev.data,
                    })
                }
                CLAP_EVENT_PARAM_VALUE
                    if record.len() >= mem::size_of::<clap_event_param_value>() =>
                {
                    let ev = ptr::read_unaligned(record.as_ptr() as *const clap_event_param_value);
                    Some(PluginEvent::ParamValue {
                        time: ev.header.time,
                        param_id: ev.param_id,
                        cookie: ev.cookie,
                        value: ev.value,
                    })
                }
                CLAP_EVENT_PARAM_GESTURE_BEGIN | CLAP_EVENT_PARAM_GESTURE_END
                    if record.len() >= mem::size_of::<clap_event_param_gesture>() =>
                {
                    let ev =
                        ptr::read_unaligned(record.as_ptr() as *const clap_event_param_gesture);
                    Some(if header.type_ == CLAP_EVENT_PARAM_GESTURE_BEGIN {
                        PluginEvent::GestureBegin {
                            time: ev.header.time,
                            param_id: ev.param_id,
                        }
                    } else {
                        PluginEvent::GestureEnd {
                            time: ev.header.time,
                            param_id: ev.param_id,
                        }
                    })
                }
                _ => None,
            }
        }
    }
}

fn struct_bytes<T>(value: &T) -> &[u8] {
    // Sound for the #[repr(C)] event records: they are plain old data and
    // the slice lives no longer than the borrow.
    unsafe { std::slice::from_raw_parts(value as *const T as *const u8, mem::size_of::<T>()) }
}

/// Append-only byte arena plus an `(offset, len)` index, drained in FIFO
/// order.
///
/// Offsets are monotonically non-decreasing and records never overlap;
/// record starts are kept 8-byte aligned so the plugin may read them as the
/// C structs they are.
pub struct EventQueue {
    arena: Vec<u8>,
    index: Vec<(u32, u32)>,
    read: usize,
}

// The queue crosses into the audio thread inside the process bridge; the
// raw cookie pointers it stores are plugin-owned and thread-agnostic.
unsafe impl Send for EventQueue {}

impl Default for EventQueue {
    fn default() -> Self {
        Self::with_capacity(INITIAL_ARENA_BYTES, INITIAL_INDEX_SLOTS)
    }
}

impl EventQueue {
    pub fn with_capacity(arena_bytes: usize, events: usize) -> Self {
        Self {
            arena: Vec::with_capacity(arena_bytes.max(64)),
            index: Vec::with_capacity(events.max(4)),
            read: 0,
        }
    }

    /// Number of unread records.
    pub fn len(&self) -> usize {
        self.index.len() - self.read
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a typed event, encoded as its wire record.
    pub fn push(&mut self, event: &PluginEvent) {
        match *event {
            PluginEvent::NoteOn {
                time,
                port,
                channel,
                key,
                velocity,
            }
            | PluginEvent::NoteOff {
                time,
                port,
                channel,
                key,
                velocity,
            } => {
                let type_ = if matches!(event, PluginEvent::NoteOn { .. }) {
                    CLAP_EVENT_NOTE_ON
                } else {
                    CLAP_EVENT_NOTE_OFF
                };
                let ev = clap_event_note {
                    header: PluginEvent::header(time, type_, mem::size_of::<clap_event_note>()),
                    note_id: -1,
                    port_index: port,
                    channel,
                    key,
                    velocity,
                };
                self.push_record(struct_bytes(&ev));
            }
            PluginEvent::Midi { time, port, data } => {
                let ev = clap_event_midi {
                    header: PluginEvent::header(
                        time,
                        CLAP_EVENT_MIDI,
                        mem::size_of::<clap_event_midi>(),
                    ),
                    port_index: port,
                    data,
                };
                self.push_record(struct_bytes(&ev));
            }
            PluginEvent::ParamValue {
                time,
                param_id,
                cookie,
                value,
            } => {
                let ev = clap_event_param_value {
                    header: PluginEvent::header(
                        time,
                        CLAP_EVENT_PARAM_VALUE,
                        mem::size_of::<clap_event_param_value>(),
                    ),
                    param_id,
                    cookie,
                    note_id: -1,
                    port_index: -1,
                    channel: -1,
                    key: -1,
                    value,
                };
                self.push_record(struct_bytes(&ev));
            }
            PluginEvent::GestureBegin { time, param_id }
            | PluginEvent::GestureEnd { time, param_id } => {
                let type_ = if matches!(event, PluginEvent::GestureBegin { .. }) {
                    CLAP_EVENT_PARAM_GESTURE_BEGIN
                } else {
                    CLAP_EVENT_PARAM_GESTURE_END
                };
                let ev = clap_event_param_gesture {
                    header: PluginEvent::header(
                        time,
                        type_,
                        mem::size_of::<clap_event_param_gesture>(),
                    ),
                    param_id,
                };
                self.push_record(struct_bytes(&ev));
            }
        }
    }

    /// Append a raw record. A declared size of zero is a caller contract
    /// violation and is dropped silently.
    pub fn push_record(&mut self, record: &[u8]) {
        if record.is_empty() {
            return;
        }
        if self.read != 0 && self.read == self.index.len() {
            self.reset();
        }
        // Keep record starts 8-byte aligned for the doubles and pointers in
        // the C structs.
        let offset = (self.arena.len() + 7) & !7;
        let pad = offset - self.arena.len();
        self.ensure_arena(pad + record.len());
        self.ensure_index(1);
        self.arena.resize(offset, 0);
        self.arena.extend_from_slice(record);
        self.index.push((offset as u32, record.len() as u32));
    }

    /// Non-destructive view of the i-th unread record.
    pub fn get(&self, i: usize) -> Option<&[u8]> {
        let (offset, len) = *self.index.get(self.read + i)?;
        Some(&self.arena[offset as usize..(offset + len) as usize])
    }

    /// Oldest unread record; the read cursor advances past it. Once the
    /// cursor catches the write side, the next operation resets both to the
    /// arena start.
    pub fn pop(&mut self) -> Option<&[u8]> {
        if self.read >= self.index.len() {
            self.reset();
            return None;
        }
        let (offset, len) = self.index[self.read];
        self.read += 1;
        Some(&self.arena[offset as usize..(offset + len) as usize])
    }

    /// Pop and decode in one step.
    pub fn pop_event(&mut self) -> Option<PluginEvent> {
        loop {
            let record = self.pop()?;
            if let Some(event) = PluginEvent::decode(record) {
                return Some(event);
            }
        }
    }

    /// Reset cursors and index; backing memory is reused, not freed.
    pub fn clear(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.read = 0;
        self.index.clear();
        self.arena.clear();
    }

    fn ensure_arena(&mut self, needed: usize) {
        let required = self.arena.len() + needed;
        if required > self.arena.capacity() {
            let mut target = self.arena.capacity().max(INITIAL_ARENA_BYTES);
            while target < required {
                target *= 2;
            }
            self.arena.reserve_exact(target - self.arena.len());
        }
    }

    fn ensure_index(&mut self, slots: usize) {
        let required = self.index.len() + slots;
        if required > self.index.capacity() {
            let mut target = self.index.capacity().max(INITIAL_INDEX_SLOTS);
            while target < required {
                target *= 2;
            }
            self.index.reserve_exact(target - self.index.len());
        }
    }

    /// `clap_input_events` facade over the unread records. The returned
    /// value borrows `self` raw; it must not outlive the queue and the
    /// queue must not be mutated while the plugin holds it.
    pub fn as_input_list(&self) -> clap_input_events {
        clap_input_events {
            ctx: self as *const EventQueue as *mut c_void,
            size: Some(input_events_size),
            get: Some(input_events_get),
        }
    }

    /// `clap_output_events` facade appending raw records.
    pub fn as_output_list(&mut self) -> clap_output_events {
        clap_output_events {
            ctx: self as *mut EventQueue as *mut c_void,
            try_push: Some(output_events_try_push),
        }
    }
}

unsafe extern "C" fn input_events_size(list: *const clap_input_events) -> u32 {
    let queue = &*((*list).ctx as *const EventQueue);
    queue.len() as u32
}

unsafe extern "C" fn input_events_get(
    list: *const clap_input_events,
    index: u32,
) -> *const clap_event_header {
    let queue = &*((*list).ctx as *const EventQueue);
    match queue.get(index as usize) {
        Some(record) => record.as_ptr() as *const clap_event_header,
        None => ptr::null(),
    }
}

unsafe extern "C" fn output_events_try_push(
    list: *const clap_output_events,
    event: *const clap_event_header,
) -> bool {
    if event.is_null() {
        return false;
    }
    let queue = &mut *((*list).ctx as *mut EventQueue);
    let size = (*event).size as usize;
    if size < mem::size_of::<clap_event_header>() {
        return false;
    }
    let record = std::slice::from_raw_parts(event as *const u8, size);
    queue.push_record(record);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_on(time: u32, key: i16) -> PluginEvent {
        PluginEvent::NoteOn {
            time,
            port: 0,
            channel: 0,
            key,
            velocity: 0.5,
        }
    }

    #[test]
    fn round_trip_preserves_order_and_contents() {
        let mut queue = EventQueue::with_capacity(64, 4);
        // Enough traffic to force the arena and index through at least two
        // doublings from their starting capacities.
        let events: Vec<PluginEvent> = (0..128)
            .map(|i| match i % 3 {
                0 => note_on(i, (i % 127) as i16),
                1 => PluginEvent::Midi {
                    time: i,
                    port: 0,
                    data: [0xB0, 7, (i % 127) as u8],
                },
                _ => PluginEvent::ParamValue {
                    time: i,
                    param_id: i,
                    cookie: std::ptr::null_mut(),
                    value: f64::from(i) / 128.0,
                },
            })
            .collect();
        for event in &events {
            queue.push(event);
        }
        assert_eq!(queue.len(), events.len());
        for expected in &events {
            let got = queue.pop_event().unwrap();
            assert_eq!(&got, expected);
        }
        assert!(queue.pop().is_none());
    }

    #[test]
    fn empty_and_single_round_trips() {
        let mut queue = EventQueue::default();
        assert!(queue.pop().is_none());
        queue.push(&note_on(3, 60));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_event(), Some(note_on(3, 60)));
        assert!(queue.is_empty());
    }

    #[test]
    fn get_is_non_destructive() {
        let mut queue = EventQueue::default();
        queue.push(&note_on(0, 60));
        queue.push(&note_on(1, 61));
        let first = PluginEvent::decode(queue.get(0).unwrap()).unwrap();
        let again = PluginEvent::decode(queue.get(0).unwrap()).unwrap();
        assert_eq!(first, again);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn clear_on_empty_is_a_noop_and_midstream_clear_restarts() {
        let mut queue = EventQueue::default();
        queue.clear();
        assert!(queue.is_empty());

        queue.push(&note_on(0, 60));
        queue.push(&note_on(1, 61));
        queue.pop();
        queue.clear();
        assert!(queue.is_empty());
        queue.push(&note_on(9, 72));
        assert_eq!(queue.pop_event(), Some(note_on(9, 72)));
    }

    #[test]
    fn zero_size_record_is_rejected_silently() {
        let mut queue = EventQueue::default();
        queue.push_record(&[]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cursor_reset_after_full_drain_reuses_arena_start() {
        let mut queue = EventQueue::default();
        queue.push(&note_on(0, 60));
        queue.pop();
        assert!(queue.pop().is_none());
        queue.push(&note_on(1, 61));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_event(), Some(note_on(1, 61)));
    }

    #[test]
    fn raw_push_matches_plugin_facade() {
        let mut queue = EventQueue::default();
        let out = queue.as_output_list();
        let ev = clap_event_param_gesture {
            header: PluginEvent::header(
                0,
                CLAP_EVENT_PARAM_GESTURE_BEGIN,
                mem::size_of::<clap_event_param_gesture>(),
            ),
            param_id: 42,
        };
        let pushed = unsafe { (out.try_push.unwrap())(&out, &ev.header) };
        assert!(pushed);
        assert_eq!(
            queue.pop_event(),
            Some(PluginEvent::GestureBegin {
                time: 0,
                param_id: 42
            })
        );
    }
}
