//! Shared pipeline state
//!
//! One mutex guards every slot, so readers always see a record together
//! with the frame it was sampled from. The lock is held only to copy
//! values in or out, never across I/O or an `.await`.

use parking_lot::Mutex;

use blendcast_core::RawFrame;
use blendcast_wire::Record;

use crate::GateDecision;

#[derive(Debug, Default)]
struct Slots {
    current_record: Record,
    current_raw_frame: Option<RawFrame>,
    last_dispatched_record: Record,
    sample_seq: u64,
}

/// Consistent copy of the latest sample
#[derive(Debug, Clone, Default)]
pub struct Sample {
    pub record: Record,
    pub frame: Option<RawFrame>,
    /// Number of samples committed before this one was read
    pub seq: u64,
}

/// State written by the sampling tick and read by the message and
/// file-save ticks
#[derive(Debug, Default)]
pub struct PipelineState {
    slots: Mutex<Slots>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current record and frame together
    pub fn commit_sample(&self, record: Record, frame: Option<RawFrame>) {
        let mut slots = self.slots.lock();
        slots.current_record = record;
        slots.current_raw_frame = frame;
        slots.sample_seq += 1;
    }

    pub fn snapshot(&self) -> Sample {
        let slots = self.slots.lock();
        Sample {
            record: slots.current_record.clone(),
            frame: slots.current_raw_frame.clone(),
            seq: slots.sample_seq,
        }
    }

    pub fn current_record(&self) -> Record {
        self.slots.lock().current_record.clone()
    }

    pub fn last_dispatched_record(&self) -> Record {
        self.slots.lock().last_dispatched_record.clone()
    }

    /// Compare the current record with the last dispatched one and, when
    /// it differs, mark it dispatched before returning it
    pub fn gate_for_dispatch(&self) -> GateDecision {
        let mut slots = self.slots.lock();
        if slots.current_record.is_blank() {
            return GateDecision::Blank;
        }
        if slots.current_record == slots.last_dispatched_record {
            return GateDecision::Unchanged;
        }
        slots.last_dispatched_record = slots.current_record.clone();
        GateDecision::Dispatch(slots.current_record.clone())
    }

    /// Forget everything
    pub fn reset(&self) {
        *self.slots.lock() = Slots::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = PipelineState::new();
        let sample = state.snapshot();
        assert!(sample.record.is_empty());
        assert!(sample.frame.is_none());
        assert_eq!(sample.seq, 0);
        assert!(state.last_dispatched_record().is_empty());
    }

    #[test]
    fn test_commit_pairs_record_and_frame() {
        let state = PipelineState::new();
        let frame = RawFrame::filled(4, 4, [1, 2, 3]);
        state.commit_sample(Record::from_text("a,b"), Some(frame.clone()));

        let sample = state.snapshot();
        assert_eq!(sample.record.as_str(), "a,b");
        assert!(sample.frame.unwrap().same_capture(&frame));
        assert_eq!(sample.seq, 1);

        // A sample without a frame clears the previous one
        state.commit_sample(Record::from_text("c,d"), None);
        let sample = state.snapshot();
        assert_eq!(sample.record.as_str(), "c,d");
        assert!(sample.frame.is_none());
    }

    #[test]
    fn test_gate_marks_dispatched() {
        let state = PipelineState::new();
        assert_eq!(state.gate_for_dispatch(), GateDecision::Blank);

        state.commit_sample(Record::from_text("1"), None);
        assert_eq!(state.gate_for_dispatch(), GateDecision::Dispatch(Record::from_text("1")));
        assert_eq!(state.last_dispatched_record().as_str(), "1");
        assert_eq!(state.gate_for_dispatch(), GateDecision::Unchanged);

        state.commit_sample(Record::from_text("2"), None);
        assert_eq!(state.gate_for_dispatch(), GateDecision::Dispatch(Record::from_text("2")));
    }

    #[test]
    fn test_reset() {
        let state = PipelineState::new();
        state.commit_sample(Record::from_text("1"), Some(RawFrame::filled(1, 1, [0, 0, 0])));
        state.gate_for_dispatch();

        state.reset();
        let sample = state.snapshot();
        assert!(sample.record.is_empty());
        assert!(sample.frame.is_none());
        assert!(state.last_dispatched_record().is_empty());
    }
}
