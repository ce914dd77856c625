use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use pertnet::logging::verbosity_from_count;
use pertnet::{
    analyze, read_records_from_path, write_dot, ConsistencyMode, ExportOptions, LatestFinishRule,
    NetworkConfig, RecordPolicy,
};

/// Build a PERT/CPM activity-on-arc network and print it as a Graphviz digraph.
///
/// Example:
///   pertnet activities.csv | dot -Tsvg > network.svg
#[derive(Debug, Parser)]
#[command(name = "pertnet", long_about = None)]
struct Cli {
    /// Activity file: one `id, label, duration, pred...` record per line (`*` = project start).
    input: PathBuf,

    /// Diagnostics on stderr; repeat for more detail (-vvv).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Skip records with too few fields instead of failing.
    #[arg(long)]
    lenient_records: bool,

    /// Add dummies for every missing predecessor, not only the first.
    #[arg(long)]
    complete_dependencies: bool,

    /// Derive latest finish times from the project end (textbook CPM).
    #[arg(long)]
    project_end_lft: bool,

    /// Draw critical activities in red.
    #[arg(long)]
    highlight_critical: bool,
}

impl Cli {
    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            verbosity: verbosity_from_count(self.verbose),
            record_policy: if self.lenient_records {
                RecordPolicy::SkipShort
            } else {
                RecordPolicy::Strict
            },
            consistency_mode: if self.complete_dependencies {
                ConsistencyMode::Complete
            } else {
                ConsistencyMode::FirstMissing
            },
            latest_finish_rule: if self.project_end_lft {
                LatestFinishRule::ProjectEnd
            } else {
                LatestFinishRule::SuccessorEarliest
            },
            highlight_critical: self.highlight_critical,
        }
    }
}

fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let config = cli.network_config();

    let records = read_records_from_path(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let analysis = analyze(&records, &config)
        .with_context(|| format!("failed to build network from {}", cli.input.display()))?;

    write_dot(analysis.network(), &ExportOptions::from(&config), out)
        .context("failed to write graph")?;
    out.flush().context("failed to write graph")?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if let Err(e) = run(&cli, &mut out) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_input(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pertnet").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_input_path_required() {
        assert!(Cli::try_parse_from(["pertnet"]).is_err());
    }

    #[test]
    fn test_defaults_map_to_default_config() {
        let cli = parse(&["plan.csv"]);
        let config = cli.network_config();
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.record_policy, RecordPolicy::Strict);
        assert_eq!(config.consistency_mode, ConsistencyMode::FirstMissing);
        assert_eq!(config.latest_finish_rule, LatestFinishRule::SuccessorEarliest);
        assert!(!config.highlight_critical);
    }

    #[test]
    fn test_flags_map_to_config() {
        let cli = parse(&[
            "-vvvv",
            "--lenient-records",
            "--complete-dependencies",
            "--project-end-lft",
            "--highlight-critical",
            "plan.csv",
        ]);
        let config = cli.network_config();
        assert_eq!(config.verbosity, 3);
        assert_eq!(config.record_policy, RecordPolicy::SkipShort);
        assert_eq!(config.consistency_mode, ConsistencyMode::Complete);
        assert_eq!(config.latest_finish_rule, LatestFinishRule::ProjectEnd);
        assert!(config.highlight_critical);
    }

    #[test]
    fn test_run_writes_digraph() {
        let file = write_input("A,Dig,3,*\nB,Order,2,*\nD,Build,5,A,B\n");
        let cli = parse(&[file.path().to_str().unwrap()]);

        let mut out = Vec::new();
        run(&cli, &mut out).unwrap();
        let dot = String::from_utf8(out).unwrap();

        assert!(dot.starts_with("digraph \"PERT\" {\n  rankdir = LR;\n"));
        assert!(dot.ends_with("}\n"));
        assert_eq!(dot.matches("style = dashed").count(), 1);
    }

    #[test]
    fn test_run_reports_bad_record_with_context() {
        let file = write_input("A,Dig,3,*\nB,Order\n");
        let cli = parse(&[file.path().to_str().unwrap()]);

        let err = run(&cli, &mut Vec::new()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("failed to build network"));
        assert!(message.contains("line 2"));
    }

    #[test]
    fn test_run_lenient_skips_short_record() {
        let file = write_input("A,Dig,3,*\nB,Order\n");
        let cli = parse(&["--lenient-records", file.path().to_str().unwrap()]);
        let mut out = Vec::new();
        run(&cli, &mut out).unwrap();
        assert!(!String::from_utf8(out).unwrap().contains("Order"));
    }
}
