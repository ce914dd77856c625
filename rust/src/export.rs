//! Graphviz DOT rendering of a scheduled network.
//!
//! Arcs are written in activity-table order, then nodes in event-id order:
//!
//! ```text
//! digraph "PERT" {
//!   rankdir = LR;
//!   0 -> 1 [ label = < <b>Dig</b><br/>&#916;3 TF0 FF0 > ];
//!   2 -> 1 [ style = dashed ];
//!   0 [ label = "\N\nEST:0\nLFT:0" ];
//! }
//! ```

use std::io::{self, Write};

use thiserror::Error;

use crate::config::NetworkConfig;
use crate::models::{Activity, EventId};
use crate::network::Network;

const INDENT: &str = "  ";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("activity '{0}' has no schedule; propagate the network before export")]
    Unscheduled(String),
    #[error("event {0} has no schedule; propagate the network before export")]
    UnscheduledEvent(EventId),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ExportOptions {
    /// Draw critical real activities in red.
    pub highlight_critical: bool,
}

impl From<&NetworkConfig> for ExportOptions {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            highlight_critical: config.highlight_critical,
        }
    }
}

pub fn write_dot<W: Write>(
    network: &Network,
    options: &ExportOptions,
    out: &mut W,
) -> Result<(), ExportError> {
    writeln!(out, "digraph \"PERT\" {{")?;
    writeln!(out, "{INDENT}rankdir = LR;")?;

    for activity in network.activities() {
        write_arc(activity, options, out)?;
    }

    for event in network.events() {
        let (est, lft) = match (event.est(), event.lft()) {
            (Some(est), Some(lft)) => (est, lft),
            _ => return Err(ExportError::UnscheduledEvent(event.id)),
        };
        writeln!(
            out,
            "{INDENT}{} [ label = \"\\N\\nEST:{}\\nLFT:{}\" ];",
            event.id, est, lft
        )?;
    }

    writeln!(out, "}}")?;
    Ok(())
}

pub fn to_dot(network: &Network, options: &ExportOptions) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_dot(network, options, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_arc<W: Write>(activity: &Activity, options: &ExportOptions, out: &mut W) -> Result<(), ExportError> {
    let (head, tail) = match (activity.head, activity.tail) {
        (Some(head), Some(tail)) => (head, tail),
        _ => return Err(ExportError::Unscheduled(activity.id.clone())),
    };
    write!(out, "{INDENT}{head} -> {tail} ")?;

    if activity.is_dummy() {
        writeln!(out, "[ style = dashed ];")?;
        return Ok(());
    }

    let floats = activity
        .floats()
        .ok_or_else(|| ExportError::Unscheduled(activity.id.clone()))?;
    write!(out, "[ ")?;
    if options.highlight_critical && activity.is_critical() {
        write!(out, "color = \"red\" ")?;
    }
    writeln!(
        out,
        "label = < <b>{}</b><br/>&#916;{} TF{} FF{} > ];",
        escape_html(&activity.label),
        activity.duration,
        floats.total,
        floats.free
    )?;
    Ok(())
}

/// Escape text for a Graphviz HTML-like label.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
