//! Activity-on-arc network.
//!
//! Events and activities are two flat tables; every cross reference is an
//! index into one of them, so the graph has no owning cycles. The network
//! owns its event and dummy counters, so independent networks never share
//! state.

mod propagation;
mod synthesis;

use std::fmt::Write;

use thiserror::Error;

use crate::interner::{ActivityIndex, ActivityInterner};
use crate::models::{Activity, Event, EventId};

pub use propagation::{PropagationError, ScheduleSummary};

/// Graph-construction invariant violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("activity '{activity}' has no {end} event after {stage}")]
    MissingEndpoint {
        activity: String,
        end: &'static str,
        stage: &'static str,
    },
}

/// Events and activities of one project.
#[derive(Clone, Debug)]
pub struct Network {
    pub(crate) interner: ActivityInterner,
    pub(crate) activities: Vec<Activity>,
    pub(crate) events: Vec<Event>,
    /// Topological rank of each table activity; dummies have none.
    ranks: Vec<u32>,
    start_event: Option<EventId>,
    next_event_id: EventId,
    next_dummy_id: u32,
    verbosity: u8,
}

impl Network {
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.interner
            .get(id)
            .map(|index| &self.activities[index as usize])
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(id as usize)
    }

    /// The shared event of every activity that follows the virtual start.
    pub fn start_event(&self) -> Option<EventId> {
        self.start_event
    }

    pub fn dummy_count(&self) -> usize {
        self.activities.iter().filter(|a| a.is_dummy()).count()
    }

    /// Activities leaving `head` and entering `tail`.
    pub fn arcs_between(&self, head: EventId, tail: EventId) -> Vec<&Activity> {
        self.events
            .get(head as usize)
            .map(|event| {
                event
                    .outgoing
                    .iter()
                    .map(|&a| &self.activities[a as usize])
                    .filter(|a| a.tail == Some(tail))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn create_event(&mut self) -> EventId {
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.events.push(Event::new(id));
        id
    }

    fn start_event_or_create(&mut self) -> EventId {
        match self.start_event {
            Some(id) => id,
            None => {
                let id = self.create_event();
                self.start_event = Some(id);
                id
            }
        }
    }

    /// Next `D<n>` id not already used by an activity.
    fn next_dummy_name(&mut self) -> String {
        loop {
            let candidate = format!("D{}", self.next_dummy_id);
            self.next_dummy_id += 1;
            if !self.interner.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Append a zero-duration activity from `head` to `tail`.
    fn add_dummy(&mut self, head: EventId, tail: EventId) -> ActivityIndex {
        let id = self.next_dummy_name();
        let index = self.activities.len() as ActivityIndex;
        // The name was just checked against the interner.
        let _ = self.interner.insert(&id);
        self.activities.push(Activity::dummy(id, head, tail));
        self.events[head as usize].outgoing.push(index);
        self.events[tail as usize].incoming.push(index);
        index
    }

    pub(crate) fn head_of(&self, index: ActivityIndex, stage: &'static str) -> Result<EventId, NetworkError> {
        let activity = &self.activities[index as usize];
        activity.head.ok_or_else(|| NetworkError::MissingEndpoint {
            activity: activity.id.clone(),
            end: "head",
            stage,
        })
    }

    pub(crate) fn tail_of(&self, index: ActivityIndex, stage: &'static str) -> Result<EventId, NetworkError> {
        let activity = &self.activities[index as usize];
        activity.tail.ok_or_else(|| NetworkError::MissingEndpoint {
            activity: activity.id.clone(),
            end: "tail",
            stage,
        })
    }

    /// Every activity must have both events once synthesis is done.
    pub fn verify_endpoints(&self) -> Result<(), NetworkError> {
        for index in 0..self.activities.len() as ActivityIndex {
            self.head_of(index, "synthesis")?;
            self.tail_of(index, "synthesis")?;
        }
        Ok(())
    }

    /// Tabular dump of every activity and its events.
    pub fn dump_table(&self) -> String {
        let rule = "---------+------------------+------------------+------------+------------\n";
        let mut buf = String::new();
        buf.push_str(rule);
        buf.push_str("    ID   |       Prev       |       Next       | Prev Event | Next Event\n");
        buf.push_str(rule);

        let name = |index: ActivityIndex| self.interner.resolve(index).unwrap_or("?");
        let join = |indices: &[ActivityIndex]| {
            indices
                .iter()
                .map(|&i| name(i))
                .collect::<Vec<_>>()
                .join(" ")
        };
        let event = |id: Option<EventId>| id.map(|e| e.to_string()).unwrap_or_default();

        for (index, activity) in self.activities.iter().enumerate() {
            let _ = writeln!(
                buf,
                "{:>8} | {:>16} | {:>16} | {:>10} | {:>10}",
                name(index as ActivityIndex),
                join(&activity.predecessors),
                join(&activity.successors),
                event(activity.head),
                event(activity.tail)
            );
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::loader::Record;
    use crate::table::ActivityTable;

    fn make_network(rows: &[&[&str]]) -> Network {
        let records: Vec<Record> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| Record::new(i as u64 + 1, row.iter().map(|f| f.to_string()).collect()))
            .collect();
        let config = NetworkConfig::default();
        let table = ActivityTable::from_records(&records, &config).unwrap();
        Network::synthesize(table, &config).unwrap()
    }

    #[test]
    fn test_dummy_names_skip_taken_ids() {
        let mut network = make_network(&[&["D0", "taken", "1", "*"], &["D2", "taken", "1", "*"]]);
        assert_eq!(network.dummy_count(), 0);
        let start = network.start_event().unwrap();
        let first = network.add_dummy(start, start);
        let second = network.add_dummy(start, start);

        assert_eq!(network.activities[first as usize].id, "D1");
        assert_eq!(network.activities[second as usize].id, "D3");
        assert_eq!(network.dummy_count(), 2);
    }

    #[test]
    fn test_event_counter_is_per_network() {
        let first = make_network(&[&["A", "a", "1", "*"]]);
        let second = make_network(&[&["A", "a", "1", "*"]]);
        let ids = |n: &Network| n.events().iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), vec![0, 1]);
        assert_eq!(ids(&second), vec![0, 1]);
    }

    #[test]
    fn test_dump_table_lists_events() {
        let network = make_network(&[&["A", "a", "1", "*"], &["B", "b", "1", "A"]]);
        let dump = network.dump_table();
        assert!(dump.contains("Prev Event"));
        let row_b = dump.lines().find(|l| l.trim_start().starts_with("B ")).unwrap();
        assert!(row_b.contains('A'));
        assert_eq!(dump.lines().count(), 5);
    }

    #[test]
    fn test_dump_table_names_dummies() {
        let network = make_network(&[&["A", "a", "3", "*"], &["B", "b", "2", "*"], &["D", "d", "5", "A", "B"]]);
        let dump = network.dump_table();
        assert!(dump.lines().any(|l| l.trim_start().starts_with("D0 ")));
        assert_eq!(dump.lines().count(), 3 + network.activities().len());
    }
}
