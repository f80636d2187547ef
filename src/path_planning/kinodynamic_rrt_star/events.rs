//! Structured planner events
//!
//! The planner reports what happens inside `step()` through an optional
//! [EventSink] supplied by the caller instead of printing to the console.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info};

use crate::common::State;

use super::tree::NodeId;

/// Which of the two trees an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeSlot {
    /// Initially grown from the start state
    A,
    /// Initially grown from the goal state
    B,
}

/// Why an exploratory sample was thrown away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Source node already has enough children
    Crowded,
    OutOfBounds,
    /// New displacement opposes the incoming one
    Reversal,
    /// Too close to an existing node
    TooClose,
    NotClear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannerEvent {
    StepStarted { step: usize, time_forward: bool },
    NoNearest { sample: State },
    SteerFailed { from: State, to: State },
    SampleRejected { reason: RejectReason },
    NodeInserted { tree: TreeSlot, node: NodeId, cost: f64 },
    Linked { from: State, to: State, dt: f64 },
    Rewired { tree: TreeSlot, node: NodeId, cost: f64 },
    BestPathImproved { distance: f64, previous: Option<f64> },
    TreesSwapped,
}

/// Receiver for planner events
pub trait EventSink {
    fn record(&mut self, event: &PlannerEvent);
}

impl<T: EventSink> EventSink for Rc<RefCell<T>> {
    fn record(&mut self, event: &PlannerEvent) {
        self.borrow_mut().record(event);
    }
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&mut self, event: &PlannerEvent) {
        match event {
            PlannerEvent::BestPathImproved { distance, previous: None } => {
                info!("first path distance {:7.3}", distance)
            }
            PlannerEvent::BestPathImproved { distance, previous: Some(p) } => {
                info!("new best path distance {:7.3} (was {:7.3})", distance, p)
            }
            PlannerEvent::Linked { from, to, dt } => {
                info!("linked trees {:?} -> {:?} dt {:5.3}", from.as_slice(), to.as_slice(), dt)
            }
            other => debug!("{:?}", other),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default, Clone)]
pub struct EventRecorder {
    pub events: Vec<PlannerEvent>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&PlannerEvent) -> bool,
    {
        self.events.iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for EventRecorder {
    fn record(&mut self, event: &PlannerEvent) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_keeps_events() {
        let mut recorder = EventRecorder::new();
        recorder.record(&PlannerEvent::TreesSwapped);
        recorder.record(&PlannerEvent::SampleRejected { reason: RejectReason::TooClose });
        recorder.record(&PlannerEvent::TreesSwapped);
        assert_eq!(recorder.events.len(), 3);
        assert_eq!(recorder.count(|e| *e == PlannerEvent::TreesSwapped), 2);
    }

    #[test]
    fn test_shared_recorder_sink() {
        let recorder = Rc::new(RefCell::new(EventRecorder::new()));
        let mut sink: Box<dyn EventSink> = Box::new(recorder.clone());
        sink.record(&PlannerEvent::TreesSwapped);
        assert_eq!(recorder.borrow().events.len(), 1);
    }

    #[test]
    fn test_log_sink_accepts_all_events() {
        let mut sink = LogSink;
        sink.record(&PlannerEvent::BestPathImproved { distance: 1.0, previous: None });
        sink.record(&PlannerEvent::StepStarted { step: 1, time_forward: true });
    }
}
