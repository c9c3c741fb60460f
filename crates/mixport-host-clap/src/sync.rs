//! Cross-thread replay of plugin-originated parameter changes.
//!
//! The audio thread forwards parameter traffic produced during processing
//! into a bounded SPSC channel; the UI tick drains it here and resolves
//! gesture brackets into concrete (id, value) pairs. While a gesture is
//! open the latest value wins; nothing is applied until the bracket
//! resolves.

use std::collections::HashMap;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::events::PluginEvent;

/// Parameter traffic crossing from the audio thread to the UI tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamOutput {
    GestureBegin { id: u32 },
    GestureEnd { id: u32 },
    Value { id: u32, value: f64 },
}

impl ParamOutput {
    /// The subset of process-output events that belongs to the
    /// synchronizer.
    pub fn from_event(event: &PluginEvent) -> Option<Self> {
        match *event {
            PluginEvent::GestureBegin { param_id, .. } => {
                Some(ParamOutput::GestureBegin { id: param_id })
            }
            PluginEvent::GestureEnd { param_id, .. } => {
                Some(ParamOutput::GestureEnd { id: param_id })
            }
            PluginEvent::ParamValue {
                param_id, value, ..
            } => Some(ParamOutput::Value {
                id: param_id,
                value,
            }),
            _ => None,
        }
    }
}

/// Build the audio→UI hand-off channel. Bounded so the producer side never
/// grows unboundedly; an overflowing burst is dropped and counted by the
/// sender.
pub fn param_channel(capacity: usize) -> (ParamSender, Receiver<ParamOutput>) {
    let (tx, rx) = bounded(capacity);
    (ParamSender { tx, dropped: 0 }, rx)
}

/// Audio-thread side of the hand-off.
pub struct ParamSender {
    tx: Sender<ParamOutput>,
    dropped: u64,
}

impl ParamSender {
    /// Non-blocking push; a full channel drops the event rather than stall
    /// the audio thread.
    pub fn send(&mut self, output: ParamOutput) {
        match self.tx.try_send(output) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// UI-side gesture tracking and value application.
pub struct GestureSync {
    rx: Receiver<ParamOutput>,
    open: HashMap<u32, f64>,
}

impl GestureSync {
    pub fn new(rx: Receiver<ParamOutput>) -> Self {
        Self {
            rx,
            open: HashMap::new(),
        }
    }

    /// Drain all pending traffic, invoking `apply` for every resolved
    /// (id, value) pair.
    pub fn drain(&mut self, mut apply: impl FnMut(u32, f64)) {
        while let Ok(output) = self.rx.try_recv() {
            self.handle(output, &mut apply);
        }
    }

    /// Feed one piece of traffic through gesture tracking.
    pub fn handle(&mut self, output: ParamOutput, mut apply: impl FnMut(u32, f64)) {
        match output {
            ParamOutput::GestureBegin { id } => {
                self.open.insert(id, 0.0);
            }
            ParamOutput::Value { id, value } => {
                if let Some(in_flight) = self.open.get_mut(&id) {
                    *in_flight = value;
                } else {
                    apply(id, value);
                }
            }
            ParamOutput::GestureEnd { id } => match self.open.remove(&id) {
                Some(value) => apply(id, value),
                None => {
                    log::debug!("gesture end for {id} without a matching begin");
                }
            },
        }
    }

    /// Number of gestures currently in flight.
    pub fn open_gestures(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (ParamSender, GestureSync) {
        let (tx, rx) = param_channel(64);
        (tx, GestureSync::new(rx))
    }

    #[test]
    fn gesture_bracket_applies_exactly_the_last_value() {
        let (mut tx, mut sync) = pair();
        tx.send(ParamOutput::GestureBegin { id: 1 });
        tx.send(ParamOutput::Value { id: 1, value: 5.0 });
        tx.send(ParamOutput::Value { id: 1, value: 7.0 });
        tx.send(ParamOutput::GestureEnd { id: 1 });
        let mut applied = Vec::new();
        sync.drain(|id, value| applied.push((id, value)));
        assert_eq!(applied, vec![(1, 7.0)]);
        assert_eq!(sync.open_gestures(), 0);
    }

    #[test]
    fn bare_value_applies_immediately_without_tracking() {
        let (mut tx, mut sync) = pair();
        tx.send(ParamOutput::Value { id: 4, value: 0.25 });
        let mut applied = Vec::new();
        sync.drain(|id, value| applied.push((id, value)));
        assert_eq!(applied, vec![(4, 0.25)]);
        assert_eq!(sync.open_gestures(), 0);
    }

    #[test]
    fn values_for_other_ids_pass_through_an_open_bracket() {
        let (mut tx, mut sync) = pair();
        tx.send(ParamOutput::GestureBegin { id: 1 });
        tx.send(ParamOutput::Value { id: 2, value: 0.5 });
        let mut applied = Vec::new();
        sync.drain(|id, value| applied.push((id, value)));
        assert_eq!(applied, vec![(2, 0.5)]);
        assert_eq!(sync.open_gestures(), 1);
    }

    #[test]
    fn end_without_begin_is_ignored() {
        let (mut tx, mut sync) = pair();
        tx.send(ParamOutput::GestureEnd { id: 3 });
        let mut applied = Vec::new();
        sync.drain(|id, value| applied.push((id, value)));
        assert!(applied.is_empty());
    }

    #[test]
    fn begin_without_value_resolves_to_zero() {
        let (mut tx, mut sync) = pair();
        tx.send(ParamOutput::GestureBegin { id: 9 });
        tx.send(ParamOutput::GestureEnd { id: 9 });
        let mut applied = Vec::new();
        sync.drain(|id, value| applied.push((id, value)));
        assert_eq!(applied, vec![(9, 0.0)]);
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (mut tx, _rx) = param_channel(1);
        tx.send(ParamOutput::Value { id: 1, value: 0.0 });
        tx.send(ParamOutput::Value { id: 2, value: 0.0 });
        assert_eq!(tx.dropped(), 1);
    }
}
