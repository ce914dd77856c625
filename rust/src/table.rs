//! Activity table: validated activities with resolved precedence links.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use thiserror::Error;

use crate::config::{NetworkConfig, RecordPolicy};
use crate::interner::{ActivityIndex, ActivityInterner};
use crate::loader::Record;
use crate::models::{Activity, Time, START_MARKER};
use crate::{log_check, log_stage};

/// `id, label, duration` plus at least one predecessor field.
pub const MIN_FIELDS: usize = 4;

/// Errors raised while loading the activity table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("line {line}: malformed record, found {found} fields but at least {minimum} are required")]
    MalformedRecord {
        line: u64,
        found: usize,
        minimum: usize,
    },
    #[error("line {line}: activity id is empty")]
    EmptyIdentifier { line: u64 },
    #[error("line {line}: '*' is reserved and cannot be used as an activity id")]
    ReservedIdentifier { line: u64 },
    #[error("line {line}: activity '{id}' is defined more than once")]
    DuplicateActivity { line: u64, id: String },
    #[error("line {line}: activity '{id}' has invalid duration '{value}'")]
    InvalidDuration { line: u64, id: String, value: String },
    #[error("line {line}: activity '{id}' has no predecessors (use '*' for project start)")]
    MissingPredecessors { line: u64, id: String },
    #[error("line {line}: activity '{id}' mixes '*' with other predecessors")]
    MisplacedStartMarker { line: u64, id: String },
    #[error("line {line}: activity '{id}' references undefined predecessor '{predecessor}'")]
    UndefinedPredecessorReference {
        line: u64,
        id: String,
        predecessor: String,
    },
    #[error("input contains no activities")]
    EmptyInput,
    #[error("cyclic dependency involving activities: {}", .activities.join(", "))]
    CyclicDependency { activities: Vec<String> },
}

/// Activities keyed by id, in input order.
#[derive(Clone, Debug, Default)]
pub struct ActivityTable {
    pub(crate) interner: ActivityInterner,
    pub(crate) activities: Vec<Activity>,
    /// Position of each activity in a topological order of the precedence graph.
    pub(crate) ranks: Vec<u32>,
}

/// Raw predecessor ids waiting for every activity to be known.
struct PendingLinks {
    line: u64,
    index: ActivityIndex,
    predecessors: Vec<String>,
}

impl ActivityTable {
    /// Build the table from a record stream.
    ///
    /// Activities may reference predecessors defined later in the stream;
    /// links are resolved once every record has been read.
    pub fn from_records(records: &[Record], config: &NetworkConfig) -> Result<Self, TableError> {
        let verbosity = config.verbosity;
        let mut table = Self {
            interner: ActivityInterner::with_capacity(records.len()),
            activities: Vec::with_capacity(records.len()),
            ranks: Vec::new(),
        };
        let mut pending = Vec::with_capacity(records.len());

        for record in records {
            let line = record.line;
            let fields = &record.fields;

            if fields.len() < MIN_FIELDS {
                match config.record_policy {
                    RecordPolicy::Strict => {
                        return Err(TableError::MalformedRecord {
                            line,
                            found: fields.len(),
                            minimum: MIN_FIELDS,
                        })
                    }
                    RecordPolicy::SkipShort => {
                        log_check!(
                            verbosity,
                            "Skipping line {}: {} fields, need {}",
                            line,
                            fields.len(),
                            MIN_FIELDS
                        );
                        continue;
                    }
                }
            }

            let id = fields[0].as_str();
            if id.is_empty() {
                return Err(TableError::EmptyIdentifier { line });
            }
            if id == START_MARKER {
                return Err(TableError::ReservedIdentifier { line });
            }

            let duration = parse_duration(&fields[2]).ok_or_else(|| TableError::InvalidDuration {
                line,
                id: id.to_string(),
                value: fields[2].clone(),
            })?;

            let predecessors: Vec<String> = fields[MIN_FIELDS - 1..]
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect();
            if predecessors.is_empty() {
                return Err(TableError::MissingPredecessors {
                    line,
                    id: id.to_string(),
                });
            }

            let index = table
                .interner
                .insert(id)
                .ok_or_else(|| TableError::DuplicateActivity {
                    line,
                    id: id.to_string(),
                })?;
            table
                .activities
                .push(Activity::new(id.to_string(), fields[1].clone(), duration));
            pending.push(PendingLinks {
                line,
                index,
                predecessors,
            });
        }

        if table.activities.is_empty() {
            return Err(TableError::EmptyInput);
        }

        for links in pending {
            table.link_predecessors(links)?;
        }
        table.derive_successors();
        table.rank_activities()?;

        log_stage!(
            verbosity,
            "Loaded {} activities ({} start the project)",
            table.activities.len(),
            table.activities.iter().filter(|a| a.starts_project()).count()
        );

        Ok(table)
    }

    fn link_predecessors(&mut self, links: PendingLinks) -> Result<(), TableError> {
        let PendingLinks {
            line,
            index,
            predecessors,
        } = links;
        let id = &self.activities[index as usize].id;

        // A lone marker links to the virtual start, which is never stored.
        if predecessors.len() == 1 && predecessors[0] == START_MARKER {
            return Ok(());
        }

        let mut resolved = Vec::with_capacity(predecessors.len());
        for pred in &predecessors {
            if pred == START_MARKER {
                return Err(TableError::MisplacedStartMarker {
                    line,
                    id: id.clone(),
                });
            }
            let pred_index =
                self.interner
                    .get(pred)
                    .ok_or_else(|| TableError::UndefinedPredecessorReference {
                        line,
                        id: id.clone(),
                        predecessor: pred.clone(),
                    })?;
            resolved.push(pred_index);
        }

        sort_by_id(&mut resolved, &self.activities);
        resolved.dedup();
        self.activities[index as usize].predecessors = resolved;
        Ok(())
    }

    fn derive_successors(&mut self) {
        for index in 0..self.activities.len() {
            for i in 0..self.activities[index].predecessors.len() {
                let pred = self.activities[index].predecessors[i];
                self.activities[pred as usize]
                    .successors
                    .push(index as ActivityIndex);
            }
        }
        for index in 0..self.activities.len() {
            let mut successors = std::mem::take(&mut self.activities[index].successors);
            sort_by_id(&mut successors, &self.activities);
            self.activities[index].successors = successors;
        }
    }

    /// Rank activities with Kahn's algorithm, lowest table index first.
    ///
    /// Activities that never become ready sit on or behind a cycle.
    fn rank_activities(&mut self) -> Result<(), TableError> {
        let mut in_degree: Vec<usize> = self
            .activities
            .iter()
            .map(|a| a.predecessors.len())
            .collect();
        let mut ready: BinaryHeap<Reverse<ActivityIndex>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(index, _)| Reverse(index as ActivityIndex))
            .collect();

        let mut ranks = vec![0; self.activities.len()];
        let mut ranked = 0;
        while let Some(Reverse(index)) = ready.pop() {
            ranks[index as usize] = ranked;
            ranked += 1;
            for &succ in &self.activities[index as usize].successors {
                let degree = &mut in_degree[succ as usize];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }

        if ranked as usize != self.activities.len() {
            return Err(TableError::CyclicDependency {
                activities: self.activities_on_cycles(&in_degree),
            });
        }
        self.ranks = ranks;
        Ok(())
    }

    /// Ids of unranked activities that also lead back into a cycle.
    fn activities_on_cycles(&self, in_degree: &[usize]) -> Vec<String> {
        let mut remaining: Vec<bool> = in_degree.iter().map(|&degree| degree > 0).collect();
        let mut out_degree: Vec<usize> = self
            .activities
            .iter()
            .map(|a| a.successors.iter().filter(|&&s| remaining[s as usize]).count())
            .collect();

        // Peel off activities that only lead out of the cycle.
        let mut sinks: Vec<usize> = (0..self.activities.len())
            .filter(|&i| remaining[i] && out_degree[i] == 0)
            .collect();
        while let Some(index) = sinks.pop() {
            remaining[index] = false;
            for &pred in &self.activities[index].predecessors {
                let pred = pred as usize;
                if remaining[pred] {
                    out_degree[pred] -= 1;
                    if out_degree[pred] == 0 {
                        sinks.push(pred);
                    }
                }
            }
        }

        let mut ids: Vec<String> = self
            .activities
            .iter()
            .zip(&remaining)
            .filter(|(_, &left)| left)
            .map(|(a, _)| a.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn get(&self, id: &str) -> Option<&Activity> {
        self.interner
            .get(id)
            .map(|index| &self.activities[index as usize])
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

fn parse_duration(field: &str) -> Option<Time> {
    field.parse::<Time>().ok().filter(|d| *d >= 0)
}

/// Sort activity indices by activity id, the tie-break for every later stage.
pub(crate) fn sort_by_id(indices: &mut [ActivityIndex], activities: &[Activity]) {
    indices.sort_by(|&l, &r| activities[l as usize].id.cmp(&activities[r as usize].id));
}
