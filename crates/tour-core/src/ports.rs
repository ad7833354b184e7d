//! Output ports toward the rendering and persistence collaborators.
//!
//! The input port lives in [`crate::feed::CalendarFeed`].

use crate::draft::SubmitCommand;
use crate::engine::SlotDecision;

/// Receives every decision the draft controller computes.
pub trait SlotDecisionSink {
    fn on_slot_decision(&mut self, decision: &SlotDecision);
}

/// Receives the command produced by a successful submit.
pub trait SubmitSink {
    fn on_submit(&mut self, command: &SubmitCommand);
}

impl SlotDecisionSink for Vec<SlotDecision> {
    fn on_slot_decision(&mut self, decision: &SlotDecision) {
        self.push(decision.clone());
    }
}

impl SubmitSink for Vec<SubmitCommand> {
    fn on_submit(&mut self, command: &SubmitCommand) {
        self.push(command.clone());
    }
}

/// A sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl SlotDecisionSink for Discard {
    fn on_slot_decision(&mut self, _decision: &SlotDecision) {}
}

impl SubmitSink for Discard {
    fn on_submit(&mut self, _command: &SubmitCommand) {}
}
