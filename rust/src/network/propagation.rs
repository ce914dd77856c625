//! Forward and backward time passes over the event graph.

use std::collections::VecDeque;

use thiserror::Error;

use crate::config::LatestFinishRule;
use crate::interner::ActivityIndex;
use crate::models::{EventId, Floats, Time};
use crate::{log_debug, log_stage};

use super::{Network, NetworkError};

/// Errors raised while propagating event times.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropagationError {
    #[error("event graph has a cycle through activities: {}", .activities.join(", "))]
    EventCycle { activities: Vec<String> },
    #[error("events not reachable from the start event: {events:?}")]
    Disconnected { events: Vec<EventId> },
    #[error("event times have already been computed")]
    AlreadyPropagated,
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Project-level result of the time passes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    /// Latest EST over all events.
    pub project_duration: Time,
    /// Real activities with zero total float, in table order.
    pub critical_activities: Vec<String>,
}

impl Network {
    /// Compute EST and LFT for every event, then both floats for every activity.
    ///
    /// Event times and floats are written exactly once; a second call fails
    /// with `AlreadyPropagated`.
    pub fn propagate(&mut self, rule: LatestFinishRule) -> Result<ScheduleSummary, PropagationError> {
        if self.events.iter().any(|e| e.est().is_some()) {
            return Err(PropagationError::AlreadyPropagated);
        }

        let order = self.topological_order()?;
        self.check_single_source()?;
        log_debug!(self.verbosity, "Event order: {:?}", order);

        let est = self.forward_pass(&order)?;
        let lft = self.backward_pass(&order, &est, rule)?;

        for event in &mut self.events {
            let id = event.id as usize;
            event.set_est(est[id]);
            event.set_lft(lft[id]);
        }

        for index in 0..self.activities.len() as ActivityIndex {
            let head = self.head_of(index, "synthesis")? as usize;
            let tail = self.tail_of(index, "synthesis")? as usize;
            let activity = &mut self.activities[index as usize];
            let finish = est[head] + activity.duration;
            let floats = Floats {
                total: lft[tail] - finish,
                free: est[tail] - finish,
            };
            debug_assert!(
                floats.total >= floats.free && floats.free >= 0,
                "float invariant broken for {}: {:?}",
                activity.id,
                floats
            );
            activity.set_floats(floats);
        }

        let summary = ScheduleSummary {
            project_duration: est.iter().copied().max().unwrap_or(0),
            critical_activities: self
                .activities
                .iter()
                .filter(|a| a.is_critical())
                .map(|a| a.id.clone())
                .collect(),
        };
        log_stage!(
            self.verbosity,
            "Project duration {} with {} critical activities",
            summary.project_duration,
            summary.critical_activities.len()
        );
        Ok(summary)
    }

    /// Kahn's algorithm over events, lowest id first.
    ///
    /// Events left with unresolved incoming arcs sit on or behind a cycle.
    /// Input cycles are rejected with the table, so any cycle here is a
    /// synthesis fault.
    fn topological_order(&self) -> Result<Vec<EventId>, PropagationError> {
        let mut in_degree: Vec<usize> = self.events.iter().map(|e| e.incoming.len()).collect();
        let mut queue: VecDeque<EventId> = self
            .events
            .iter()
            .filter(|e| e.incoming.is_empty())
            .map(|e| e.id)
            .collect();

        let mut order = Vec::with_capacity(self.events.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &arc in &self.events[id as usize].outgoing {
                let tail = self.tail_of(arc, "synthesis")?;
                let degree = &mut in_degree[tail as usize];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(tail);
                }
            }
        }

        if order.len() != self.events.len() {
            return Err(PropagationError::EventCycle {
                activities: self.activities_on_unresolved(&in_degree),
            });
        }
        Ok(order)
    }

    fn activities_on_unresolved(&self, in_degree: &[usize]) -> Vec<String> {
        let unresolved = |event: Option<EventId>| event.is_some_and(|e| in_degree[e as usize] > 0);
        let stuck: Vec<_> = self
            .activities
            .iter()
            .filter(|a| unresolved(a.head) && unresolved(a.tail))
            .collect();

        let mut ids: Vec<String> = stuck
            .iter()
            .filter(|a| !a.is_dummy())
            .map(|a| a.id.clone())
            .collect();
        if ids.is_empty() {
            ids = stuck.iter().map(|a| a.id.clone()).collect();
        }
        ids.sort();
        ids
    }

    /// The start event must be the only event without incoming arcs.
    fn check_single_source(&self) -> Result<(), PropagationError> {
        let stray: Vec<EventId> = self
            .events
            .iter()
            .filter(|e| e.is_start() && Some(e.id) != self.start_event)
            .map(|e| e.id)
            .collect();
        if stray.is_empty() {
            Ok(())
        } else {
            Err(PropagationError::Disconnected { events: stray })
        }
    }

    fn forward_pass(&self, order: &[EventId]) -> Result<Vec<Time>, PropagationError> {
        let mut est = vec![0; self.events.len()];
        for &id in order {
            let mut earliest = 0;
            for &arc in &self.events[id as usize].incoming {
                let head = self.head_of(arc, "synthesis")?;
                earliest = earliest.max(est[head as usize] + self.activities[arc as usize].duration);
            }
            est[id as usize] = earliest;
        }
        Ok(est)
    }

    fn backward_pass(
        &self,
        order: &[EventId],
        est: &[Time],
        rule: LatestFinishRule,
    ) -> Result<Vec<Time>, PropagationError> {
        let project_end = est.iter().copied().max().unwrap_or(0);
        let mut lft = vec![0; self.events.len()];

        for &id in order.iter().rev() {
            let event = &self.events[id as usize];
            let mut latest: Option<Time> = None;
            for &arc in &event.outgoing {
                let tail = self.tail_of(arc, "synthesis")? as usize;
                let reference = match rule {
                    LatestFinishRule::SuccessorEarliest => est[tail],
                    LatestFinishRule::ProjectEnd => lft[tail],
                };
                let bound = reference - self.activities[arc as usize].duration;
                latest = Some(latest.map_or(bound, |l| l.min(bound)));
            }
            lft[id as usize] = match (latest, rule) {
                (Some(latest), _) => latest,
                (None, LatestFinishRule::SuccessorEarliest) => est[id as usize],
                (None, LatestFinishRule::ProjectEnd) => project_end,
            };
        }
        Ok(lft)
    }
}
