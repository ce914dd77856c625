//! Core data types for the activity-on-arc network.

use pyo3::prelude::*;

use crate::interner::ActivityIndex;

/// Time unit for durations, event times and floats.
pub type Time = i64;

/// Event id, assigned by the owning network's counter.
pub type EventId = u32;

/// Id of the virtual start activity. Never stored in a table.
pub const START_MARKER: &str = "*";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    Real,
    /// Zero-duration arc added during synthesis.
    Dummy,
}

/// Total and free float of one activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Floats {
    pub total: Time,
    pub free: Time,
}

/// A task, rendered as an arc between its head and tail events.
#[derive(Clone, Debug)]
pub struct Activity {
    pub id: String,
    pub label: String,
    pub duration: Time,
    pub kind: ActivityKind,
    /// Sorted by id. Empty means the activity follows the virtual start.
    pub predecessors: Vec<ActivityIndex>,
    /// Sorted by id.
    pub successors: Vec<ActivityIndex>,
    pub head: Option<EventId>,
    pub tail: Option<EventId>,
    floats: Option<Floats>,
}

impl Activity {
    pub fn new(id: String, label: String, duration: Time) -> Self {
        Self {
            id,
            label,
            duration,
            kind: ActivityKind::Real,
            predecessors: Vec::new(),
            successors: Vec::new(),
            head: None,
            tail: None,
            floats: None,
        }
    }

    pub fn dummy(id: String, head: EventId, tail: EventId) -> Self {
        Self {
            label: "dummy".to_string(),
            kind: ActivityKind::Dummy,
            head: Some(head),
            tail: Some(tail),
            ..Self::new(id, String::new(), 0)
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.kind == ActivityKind::Dummy
    }

    pub fn starts_project(&self) -> bool {
        self.predecessors.is_empty()
    }

    pub fn floats(&self) -> Option<Floats> {
        self.floats
    }

    /// Critical real activities have zero total float.
    pub fn is_critical(&self) -> bool {
        !self.is_dummy() && matches!(self.floats, Some(f) if f.total == 0)
    }

    /// Floats are written once, by the propagation pass.
    pub(crate) fn set_floats(&mut self, floats: Floats) {
        debug_assert!(self.floats.is_none(), "floats of {} written twice", self.id);
        self.floats = Some(floats);
    }
}

/// A point in time where activities finish and start, rendered as a node.
#[derive(Clone, Debug)]
pub struct Event {
    pub id: EventId,
    pub incoming: Vec<ActivityIndex>,
    pub outgoing: Vec<ActivityIndex>,
    /// `Some` once the forward pass has resolved this event.
    est: Option<Time>,
    lft: Option<Time>,
}

impl Event {
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            est: None,
            lft: None,
        }
    }

    pub fn est(&self) -> Option<Time> {
        self.est
    }

    pub fn lft(&self) -> Option<Time> {
        self.lft
    }

    pub fn is_start(&self) -> bool {
        self.incoming.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.outgoing.is_empty()
    }

    pub(crate) fn set_est(&mut self, est: Time) {
        debug_assert!(self.est.is_none(), "EST of event {} written twice", self.id);
        self.est = Some(est);
    }

    pub(crate) fn set_lft(&mut self, lft: Time) {
        debug_assert!(self.lft.is_none(), "LFT of event {} written twice", self.id);
        self.lft = Some(lft);
    }
}

/// Per-activity result handed to Python callers.
#[pyclass]
#[derive(Clone, Debug)]
pub struct ActivitySchedule {
    #[pyo3(get)]
    pub id: String,
    #[pyo3(get)]
    pub label: String,
    #[pyo3(get)]
    pub duration: Time,
    #[pyo3(get)]
    pub head_event: EventId,
    #[pyo3(get)]
    pub tail_event: EventId,
    #[pyo3(get)]
    pub earliest_start: Time,
    #[pyo3(get)]
    pub latest_finish: Time,
    #[pyo3(get)]
    pub total_float: Time,
    #[pyo3(get)]
    pub free_float: Time,
    #[pyo3(get)]
    pub is_dummy: bool,
    #[pyo3(get)]
    pub is_critical: bool,
}

#[pymethods]
impl ActivitySchedule {
    fn __repr__(&self) -> String {
        format!(
            "ActivitySchedule(id={:?}, events={}->{}, est={}, lft={}, tf={}, ff={})",
            self.id,
            self.head_event,
            self.tail_event,
            self.earliest_start,
            self.latest_finish,
            self.total_float,
            self.free_float
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_activity() {
        let dummy = Activity::dummy("D0".to_string(), 1, 2);
        assert!(dummy.is_dummy());
        assert_eq!(dummy.duration, 0);
        assert_eq!(dummy.head, Some(1));
        assert_eq!(dummy.tail, Some(2));
        assert!(!dummy.is_critical());
    }

    #[test]
    fn test_critical_requires_zero_total_float() {
        let mut act = Activity::new("A".to_string(), "Dig".to_string(), 3);
        assert!(!act.is_critical());
        act.set_floats(Floats { total: 0, free: 0 });
        assert!(act.is_critical());

        let mut slack = Activity::new("B".to_string(), "Pour".to_string(), 1);
        slack.set_floats(Floats { total: 2, free: 1 });
        assert!(!slack.is_critical());
    }

    #[test]
    fn test_event_times_start_unresolved() {
        let mut event = Event::new(0);
        assert!(event.is_start());
        assert!(event.is_terminal());
        assert_eq!(event.est(), None);
        event.set_est(4);
        event.set_lft(6);
        assert_eq!(event.est(), Some(4));
        assert_eq!(event.lft(), Some(6));
    }
}
