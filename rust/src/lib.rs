//! PERT/CPM activity-on-arc network construction.
//!
//! Turns an activity list (id, label, duration, predecessors) into events
//! joined by activities, computes event times and activity floats, and
//! renders the result as a Graphviz digraph.
//!
//! Pipeline: [`loader`] records -> [`ActivityTable`] -> [`Network::synthesize`]
//! -> [`Network::propagate`] -> [`export::write_dot`].

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;
use thiserror::Error;

mod config;
pub mod export;
pub mod interner;
pub mod loader;
pub mod logging;
mod models;
pub mod network;
pub mod table;

pub use config::{ConsistencyMode, LatestFinishRule, NetworkConfig, RecordPolicy};
pub use export::{to_dot, write_dot, ExportError, ExportOptions};
pub use interner::ActivityIndex;
pub use loader::{read_records, read_records_from_path, Record};
pub use models::{Activity, ActivityKind, ActivitySchedule, Event, EventId, Floats, Time};
pub use network::{Network, NetworkError, PropagationError, ScheduleSummary};
pub use table::{ActivityTable, TableError};

/// Any failure of a run, from reading input to writing the graph.
#[derive(Error, Debug)]
pub enum PertError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Propagation(#[from] PropagationError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("failed to parse input: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A synthesized and scheduled network.
///
/// Read-only once built; share it freely between consumers.
#[derive(Clone, Debug)]
pub struct Analysis {
    network: Network,
    summary: ScheduleSummary,
}

impl Analysis {
    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn summary(&self) -> &ScheduleSummary {
        &self.summary
    }

    /// Per-activity results in table order.
    pub fn schedules(&self) -> Vec<ActivitySchedule> {
        let network = &self.network;
        let time = |event: Option<EventId>, pick: fn(&Event) -> Option<Time>| {
            event
                .and_then(|e| network.event(e))
                .and_then(pick)
                .unwrap_or_default()
        };
        network
            .activities()
            .iter()
            .map(|act| {
                let floats = act.floats().unwrap_or(Floats { total: 0, free: 0 });
                ActivitySchedule {
                    id: act.id.clone(),
                    label: act.label.clone(),
                    duration: act.duration,
                    head_event: act.head.unwrap_or_default(),
                    tail_event: act.tail.unwrap_or_default(),
                    earliest_start: time(act.head, Event::est),
                    latest_finish: time(act.tail, Event::lft),
                    total_float: floats.total,
                    free_float: floats.free,
                    is_dummy: act.is_dummy(),
                    is_critical: act.is_critical(),
                }
            })
            .collect()
    }

    pub fn to_dot(&self, options: &ExportOptions) -> Result<String, ExportError> {
        to_dot(&self.network, options)
    }
}

/// Load, synthesize and schedule a record stream.
pub fn analyze(records: &[Record], config: &NetworkConfig) -> Result<Analysis, PertError> {
    let table = ActivityTable::from_records(records, config)?;
    let mut network = Network::synthesize(table, config)?;
    let summary = network.propagate(config.latest_finish_rule)?;
    Ok(Analysis { network, summary })
}

fn records_from_rows(rows: Vec<Vec<String>>) -> Vec<Record> {
    rows.into_iter()
        .enumerate()
        .map(|(i, fields)| Record::new(i as u64 + 1, fields))
        .collect()
}

/// Render activity rows as a DOT digraph.
///
/// # Arguments
/// * `records` - One list of string fields per activity: id, label, duration, predecessors...
/// * `config` - Network configuration (defaults when omitted)
///
/// # Raises
/// * ValueError on invalid records or a cyclic dependency
#[pyfunction]
#[pyo3(signature = (records, config=None))]
fn render_dot(records: Vec<Vec<String>>, config: Option<NetworkConfig>) -> PyResult<String> {
    let config = config.unwrap_or_default();
    analyze(&records_from_rows(records), &config)
        .and_then(|analysis| {
            analysis
                .to_dot(&ExportOptions::from(&config))
                .map_err(PertError::from)
        })
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

/// Schedule activity rows and return per-activity timings, dummies included.
#[pyfunction]
#[pyo3(signature = (records, config=None))]
fn schedule_activities(
    records: Vec<Vec<String>>,
    config: Option<NetworkConfig>,
) -> PyResult<Vec<ActivitySchedule>> {
    let config = config.unwrap_or_default();
    match analyze(&records_from_rows(records), &config) {
        Ok(analysis) => Ok(analysis.schedules()),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// The pertnet.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<NetworkConfig>()?;
    m.add_class::<RecordPolicy>()?;
    m.add_class::<ConsistencyMode>()?;
    m.add_class::<LatestFinishRule>()?;
    m.add_class::<ActivitySchedule>()?;

    m.add_function(wrap_pyfunction!(render_dot, m)?)?;
    m.add_function(wrap_pyfunction!(schedule_activities, m)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|f| f.to_string()).collect())
            .collect()
    }

    fn run(data: &[&[&str]], config: &NetworkConfig) -> Result<Analysis, PertError> {
        analyze(&records_from_rows(rows(data)), config)
    }

    fn schedule_of<'a>(schedules: &'a [ActivitySchedule], id: &str) -> &'a ActivitySchedule {
        schedules.iter().find(|s| s.id == id).unwrap()
    }

    #[test]
    fn test_join_example_end_to_end() {
        let analysis = run(
            &[&["A", "a", "3", "*"], &["B", "b", "2", "*"], &["D", "d", "5", "A", "B"]],
            &NetworkConfig::default(),
        )
        .unwrap();
        let schedules = analysis.schedules();

        let d = schedule_of(&schedules, "D");
        assert_eq!(d.earliest_start, 3);
        assert_eq!(d.latest_finish, 8);
        assert!(d.is_critical);
        assert_eq!(schedules.iter().filter(|s| s.is_dummy).count(), 1);
        assert_eq!(analysis.summary().project_duration, 8);

        let dot = analysis.to_dot(&ExportOptions::default()).unwrap();
        assert!(dot.contains("[ style = dashed ];"));
        assert!(dot.contains("<b>d</b><br/>&#916;5 TF0 FF0"));
    }

    #[test]
    fn test_parallel_pair_floats() {
        // E and F both follow A only and both feed G.
        let analysis = run(
            &[
                &["A", "a", "3", "*"],
                &["E", "e", "2", "A"],
                &["F", "f", "6", "A"],
                &["G", "g", "1", "E", "F"],
            ],
            &NetworkConfig::default(),
        )
        .unwrap();
        let schedules = analysis.schedules();

        let e = schedule_of(&schedules, "E");
        let f = schedule_of(&schedules, "F");
        assert_ne!(e.tail_event, f.tail_event);
        assert_eq!(f.total_float, 0);
        assert!(e.total_float >= e.free_float && e.free_float >= 0);
        assert_eq!(e.total_float, 4);
        assert_eq!(analysis.summary().project_duration, 10);
    }

    #[test]
    fn test_errors_fold_into_pert_error() {
        let config = NetworkConfig::default();
        assert!(matches!(
            run(&[&["A", "a", "1"]], &config),
            Err(PertError::Table(TableError::MalformedRecord { .. }))
        ));
        assert!(matches!(
            run(&[&["A", "a", "1", "Z"]], &config),
            Err(PertError::Table(TableError::UndefinedPredecessorReference { .. }))
        ));
        assert!(matches!(
            run(&[], &config),
            Err(PertError::Table(TableError::EmptyInput))
        ));
        assert!(matches!(
            run(&[&["A", "a", "1", "*"], &["B", "b", "1", "A", "C"], &["C", "c", "1", "B"]], &config),
            Err(PertError::Table(TableError::CyclicDependency { .. }))
        ));
    }

    #[test]
    fn test_acyclic_input_never_reports_a_cycle() {
        // Y and S both start where P ends, but S also waits on Y through X.
        let data: &[&[&str]] = &[
            &["P", "p", "1", "*"],
            &["Y", "y", "1", "P"],
            &["X", "x", "1", "Y"],
            &["S", "s", "1", "P", "X"],
        ];
        for mode in [ConsistencyMode::FirstMissing, ConsistencyMode::Complete] {
            let config = NetworkConfig {
                consistency_mode: mode,
                ..Default::default()
            };
            let analysis = run(data, &config).unwrap();
            let schedules = analysis.schedules();
            assert_eq!(schedule_of(&schedules, "S").earliest_start, 3);
            assert_eq!(analysis.summary().critical_activities, vec!["P", "Y", "X", "S"]);
        }
    }

    #[test]
    fn test_independent_networks_number_events_alike() {
        let data: &[&[&str]] = &[&["A", "a", "3", "*"], &["B", "b", "1", "A"]];
        let config = NetworkConfig::default();
        let first = run(data, &config).unwrap();
        let second = run(data, &config).unwrap();
        assert_eq!(
            first.to_dot(&ExportOptions::default()).unwrap(),
            second.to_dot(&ExportOptions::default()).unwrap()
        );
    }

    #[test]
    fn test_complete_mode_respects_every_predecessor() {
        // Z needs A, B and C; B and C finish late on side events.
        let data: &[&[&str]] = &[
            &["A", "a", "1", "*"],
            &["B", "b", "5", "*"],
            &["C", "c", "7", "*"],
            &["X", "x", "1", "B"],
            &["Y", "y", "1", "C"],
            &["Z", "z", "1", "A", "B", "C"],
        ];
        let faithful = run(data, &NetworkConfig::default()).unwrap();
        let complete = run(
            data,
            &NetworkConfig {
                consistency_mode: ConsistencyMode::Complete,
                ..Default::default()
            },
        )
        .unwrap();

        // One dummy only carries B, so Z may start before C ends.
        assert_eq!(schedule_of(&faithful.schedules(), "Z").earliest_start, 5);
        assert_eq!(schedule_of(&complete.schedules(), "Z").earliest_start, 7);
    }
}
