//! Turns the activity-on-node precedence table into an activity-on-arc network.
//!
//! Stages, in order:
//! 1. Head events: an activity starts where its first predecessor ends.
//! 2. Tail events: an activity ends where its first successor starts, or at a
//!    fresh terminal event.
//! 3. Consistency: dummies carry predecessors the first-predecessor merge missed.
//! 4. Duplicates: parallel arcs between the same two events are split apart.
//!
//! Every merge keeps the activities' topological ranks in order: whatever
//! enters an event ranks below whatever leaves it, looking through dummies.
//! A merge that would break this gets its own event and a dummy instead, so
//! the event graph stays acyclic.

use rustc_hash::FxHashMap;

use crate::config::{ConsistencyMode, NetworkConfig};
use crate::interner::ActivityIndex;
use crate::models::EventId;
use crate::table::ActivityTable;
use crate::{log_check, log_debug, log_stage};

use super::{Network, NetworkError};

impl Network {
    /// Build and repair the network for a loaded table.
    pub fn synthesize(table: ActivityTable, config: &NetworkConfig) -> Result<Self, NetworkError> {
        let ActivityTable {
            interner,
            activities,
            ranks,
        } = table;
        let verbosity = config.verbosity;
        let mut network = Self {
            interner,
            activities,
            events: Vec::new(),
            ranks,
            start_event: None,
            next_event_id: 0,
            next_dummy_id: 0,
            verbosity,
        };

        network.assign_head_events();
        log_debug!(verbosity, "After head assignment:\n{}", network.dump_table());

        network.assign_tail_events()?;
        log_debug!(verbosity, "After tail assignment:\n{}", network.dump_table());

        let repaired = network.resolve_consistency(config.consistency_mode)?;
        log_stage!(verbosity, "Consistency repair added {} dummies", repaired);

        let rerouted = network.resolve_duplicates()?;
        log_stage!(verbosity, "Rerouted {} parallel arcs", rerouted);
        log_debug!(verbosity, "After synthesis:\n{}", network.dump_table());

        network.verify_endpoints()?;
        log_stage!(
            verbosity,
            "Network has {} events and {} activities ({} dummies)",
            network.events.len(),
            network.activities.len(),
            network.dummy_count()
        );

        Ok(network)
    }

    fn table_len(&self) -> ActivityIndex {
        self.ranks.len() as ActivityIndex
    }

    fn assign_head_events(&mut self) {
        for index in 0..self.table_len() {
            let head = match self.activities[index as usize].predecessors.first().copied() {
                None => self.start_event_or_create(),
                Some(first) => match self.activities[first as usize].tail {
                    Some(tail) => tail,
                    None => {
                        let tail = self.create_event();
                        self.activities[first as usize].tail = Some(tail);
                        tail
                    }
                },
            };
            self.activities[index as usize].head = Some(head);
            self.events[head as usize].outgoing.push(index);
        }
    }

    fn assign_tail_events(&mut self) -> Result<(), NetworkError> {
        for index in 0..self.table_len() {
            let tail = match self.activities[index as usize].tail {
                Some(tail) => tail,
                None => {
                    let tail = match self.activities[index as usize].successors.first().copied() {
                        None => self.create_event(),
                        Some(next) => self.entry_event(index, next)?,
                    };
                    self.activities[index as usize].tail = Some(tail);
                    tail
                }
            };
            self.events[tail as usize].incoming.push(index);
        }
        Ok(())
    }

    /// The event where `index` ends so that `next` follows it.
    ///
    /// Normally `next`'s head event. If an activity leaving that event ranks
    /// below `index`, `next` moves to a head event of its own first.
    fn entry_event(&mut self, index: ActivityIndex, next: ActivityIndex) -> Result<EventId, NetworkError> {
        let head = self.head_of(next, "head assignment")?;
        if in_rank_order(self.rank(index), self.ceiling(head)) {
            return Ok(head);
        }
        log_check!(
            self.verbosity,
            "{} cannot end at event {}; moving {} to its own head event",
            self.activities[index as usize].id,
            head,
            self.activities[next as usize].id
        );
        self.detach_head(next)
    }

    /// Add dummies so each activity's head event follows its predecessors.
    ///
    /// Only activities loaded from the table are examined; dummies have no
    /// declared predecessors. Returns the number of dummies added.
    fn resolve_consistency(&mut self, mode: ConsistencyMode) -> Result<usize, NetworkError> {
        let before = self.activities.len();

        for index in 0..self.table_len() {
            let head = self.head_of(index, "tail assignment")?;
            let missing: Vec<ActivityIndex> = match mode {
                ConsistencyMode::FirstMissing => self
                    .first_missing_predecessor(index, head)?
                    .into_iter()
                    .collect(),
                ConsistencyMode::Complete => self.unlinked_predecessors(index, head)?,
            };

            for pred in missing {
                self.link_predecessor(pred, index)?;
            }
        }
        Ok(self.activities.len() - before)
    }

    /// The first predecessor absent from the head event's incoming arcs, when
    /// the head event has fewer incoming arcs than the activity has predecessors.
    fn first_missing_predecessor(
        &self,
        index: ActivityIndex,
        head: EventId,
    ) -> Result<Option<ActivityIndex>, NetworkError> {
        let incoming = &self.events[head as usize].incoming;
        let predecessors = &self.activities[index as usize].predecessors;
        if incoming.is_empty() || predecessors.len() <= incoming.len() {
            return Ok(None);
        }
        Ok(predecessors
            .iter()
            .copied()
            .find(|pred| !incoming.contains(pred)))
    }

    /// Every predecessor whose tail event neither is the head event nor
    /// already has an arc into it.
    fn unlinked_predecessors(
        &self,
        index: ActivityIndex,
        head: EventId,
    ) -> Result<Vec<ActivityIndex>, NetworkError> {
        let mut linked: Vec<EventId> = vec![head];
        for &arc in &self.events[head as usize].incoming {
            linked.push(self.head_of(arc, "tail assignment")?);
        }

        let mut missing = Vec::new();
        for &pred in &self.activities[index as usize].predecessors {
            let from = self.tail_of(pred, "tail assignment")?;
            if !linked.contains(&from) {
                linked.push(from);
                missing.push(pred);
            }
        }
        Ok(missing)
    }

    /// Join `pred`'s tail event to `activity`'s head event with a dummy.
    ///
    /// When that dummy would break rank order or close a loop, `activity`
    /// first moves to a head event of its own, then `pred` to a tail event
    /// of its own. Between two private events the dummy always fits, since
    /// `pred` ranks below `activity`.
    fn link_predecessor(&mut self, pred: ActivityIndex, activity: ActivityIndex) -> Result<ActivityIndex, NetworkError> {
        let mut from = self.tail_of(pred, "tail assignment")?;
        let mut to = self.head_of(activity, "tail assignment")?;
        if !self.can_join(from, to) {
            to = self.detach_head(activity)?;
        }
        if !self.can_join(from, to) {
            from = self.detach_tail(pred)?;
        }

        let dummy = self.add_dummy(from, to);
        log_check!(
            self.verbosity,
            "Dummy {} ({} -> {}) links {} to {}",
            self.activities[dummy as usize].id,
            from,
            to,
            self.activities[pred as usize].id,
            self.activities[activity as usize].id
        );
        Ok(dummy)
    }

    /// Split parallel arcs that share both events.
    ///
    /// The longest activity of each group stays on the shared tail event
    /// (ties keep arc order); every other one gets its own tail event joined
    /// to the shared one by a dummy. Returns the number of rerouted arcs.
    fn resolve_duplicates(&mut self) -> Result<usize, NetworkError> {
        let event_count = self.events.len();
        let mut rerouted = 0;

        for event in 0..event_count {
            let mut groups: Vec<Vec<ActivityIndex>> = Vec::new();
            let mut slot: FxHashMap<EventId, usize> = FxHashMap::default();
            for &arc in &self.events[event].outgoing {
                let tail = self.tail_of(arc, "consistency repair")?;
                match slot.get(&tail) {
                    Some(&i) => groups[i].push(arc),
                    None => {
                        slot.insert(tail, groups.len());
                        groups.push(vec![arc]);
                    }
                }
            }

            for mut group in groups {
                if group.len() < 2 {
                    continue;
                }
                // Stable: equal durations keep their arc order.
                group.sort_by(|&l, &r| {
                    self.activities[r as usize]
                        .duration
                        .cmp(&self.activities[l as usize].duration)
                });
                for &arc in &group[1..] {
                    self.detach_tail(arc)?;
                    rerouted += 1;
                }
            }
        }
        Ok(rerouted)
    }

    /// Move `activity` to a head event of its own, fed by a dummy from the
    /// event it leaves. Returns the new head event, or the current one if
    /// `activity` is already the only arc leaving it.
    fn detach_head(&mut self, activity: ActivityIndex) -> Result<EventId, NetworkError> {
        let shared = self.head_of(activity, "head assignment")?;
        if self.events[shared as usize].outgoing == [activity] {
            return Ok(shared);
        }
        self.events[shared as usize]
            .outgoing
            .retain(|&a| a != activity);

        let own = self.create_event();
        self.activities[activity as usize].head = Some(own);
        self.events[own as usize].outgoing.push(activity);

        let dummy = self.add_dummy(shared, own);
        log_check!(
            self.verbosity,
            "Moved {} to head event {}, fed by dummy {} from event {}",
            self.activities[activity as usize].id,
            own,
            self.activities[dummy as usize].id,
            shared
        );
        Ok(own)
    }

    /// Move `arc` to a tail event of its own, joined by a dummy to the event
    /// it entered. Returns the new tail event, or the current one if `arc`
    /// is already the only arc entering it.
    fn detach_tail(&mut self, arc: ActivityIndex) -> Result<EventId, NetworkError> {
        let shared = self.tail_of(arc, "tail assignment")?;
        if self.events[shared as usize].incoming == [arc] {
            return Ok(shared);
        }
        self.events[shared as usize]
            .incoming
            .retain(|&a| a != arc);

        let own = self.create_event();
        self.activities[arc as usize].tail = Some(own);
        self.events[own as usize].incoming.push(arc);

        let dummy = self.add_dummy(own, shared);
        log_check!(
            self.verbosity,
            "Rerouted {} via event {} and dummy {} to event {}",
            self.activities[arc as usize].id,
            own,
            self.activities[dummy as usize].id,
            shared
        );
        Ok(own)
    }

    fn rank(&self, arc: ActivityIndex) -> Option<u32> {
        self.ranks.get(arc as usize).copied()
    }

    /// Highest rank of a real activity entering `event`, looking back
    /// through dummies.
    fn floor(&self, event: EventId) -> Option<u32> {
        let mut highest = None;
        let mut seen = vec![false; self.events.len()];
        let mut stack = vec![event];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id as usize], true) {
                continue;
            }
            for &arc in &self.events[id as usize].incoming {
                match self.rank(arc) {
                    Some(rank) => highest = highest.max(Some(rank)),
                    None => stack.extend(self.activities[arc as usize].head),
                }
            }
        }
        highest
    }

    /// Lowest rank of a real activity leaving `event`, looking ahead
    /// through dummies.
    fn ceiling(&self, event: EventId) -> Option<u32> {
        let mut lowest: Option<u32> = None;
        let mut seen = vec![false; self.events.len()];
        let mut stack = vec![event];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id as usize], true) {
                continue;
            }
            for &arc in &self.events[id as usize].outgoing {
                match self.rank(arc) {
                    Some(rank) => lowest = Some(lowest.map_or(rank, |l| l.min(rank))),
                    None => stack.extend(self.activities[arc as usize].tail),
                }
            }
        }
        lowest
    }

    fn reaches(&self, from: EventId, to: EventId) -> bool {
        let mut seen = vec![false; self.events.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if std::mem::replace(&mut seen[id as usize], true) {
                continue;
            }
            stack.extend(
                self.events[id as usize]
                    .outgoing
                    .iter()
                    .filter_map(|&arc| self.activities[arc as usize].tail),
            );
        }
        false
    }

    /// Whether a dummy `from -> to` keeps rank order and the graph acyclic.
    fn can_join(&self, from: EventId, to: EventId) -> bool {
        from != to && in_rank_order(self.floor(from), self.ceiling(to)) && !self.reaches(to, from)
    }
}

/// `below` ranks strictly under `above`; a missing side never conflicts.
fn in_rank_order(below: Option<u32>, above: Option<u32>) -> bool {
    match (below, above) {
        (Some(below), Some(above)) => below < above,
        _ => true,
    }
}
