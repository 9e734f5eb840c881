use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use linekit_balance::C_FILE_UPDATED_DEFAULT;

#[derive(Parser, Debug)]
#[command(name = "linekit", version, about = "Assembly-line element grouping and rebalancing")]
pub struct Cli {
    /// YAML file with balance options.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config_path: Option<PathBuf>,
    /// Log filter for stderr: a level such as `info` or an `EnvFilter`
    /// directive such as `linekit_balance=debug`.
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn", global = true)]
    pub log_level: String,
    #[command(flatten)]
    pub overrides: ArgsOverrides,
    #[command(subcommand)]
    pub command: EnumCommand,
}

/// Flags that override values from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct ArgsOverrides {
    /// Task text marking operator walking.
    #[arg(long = "walking-marker", value_name = "TEXT", global = true)]
    pub walking_marker: Option<String>,
    /// Number units from the first row instead of the last.
    #[arg(long = "number-from-start", global = true)]
    pub if_number_from_start: bool,
    /// Treat blank process/task cells as values instead of failing.
    #[arg(long = "keep-missing", global = true)]
    pub if_keep_missing: bool,
    /// Use English column names and label texts.
    #[arg(long = "english", global = true)]
    pub if_english: bool,
}

#[derive(Subcommand, Debug)]
pub enum EnumCommand {
    /// Assign unit IDs and print the station summary.
    Group(ArgsGroup),
    /// Move units between stations and write the updated plan.
    Move(ArgsMove),
    /// Print station loads, optionally with every stacked segment.
    Summary(ArgsSummary),
}

#[derive(Args, Debug)]
pub struct ArgsGroup {
    /// Element table (.csv, .xlsx first sheet, .ipc, .arrow, .feather).
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,
    /// Workbook with the grouped data and the station chart.
    #[arg(long, value_name = "FILE.xlsx")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ArgsMove {
    /// Element table to regroup before moving (same formats as `group`).
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,
    /// Workbook with the moved data and before/after station charts.
    #[arg(long, value_name = "FILE.xlsx", default_value = C_FILE_UPDATED_DEFAULT)]
    pub output: PathBuf,
    /// `ID=PROCESS`, repeatable.
    #[arg(long = "move", value_name = "ID=PROCESS")]
    pub moves: Vec<String>,
    /// Comma separated unit IDs moved to `--to`.
    #[arg(long, value_name = "1,2,5", requires = "to")]
    pub ids: Option<String>,
    /// Target station for `--ids`.
    #[arg(long, value_name = "PROCESS", requires = "ids")]
    pub to: Option<String>,
    /// `from=P,location=L,task=T,to=Q`, repeatable.
    #[arg(long = "rule", value_name = "RULE")]
    pub rules: Vec<String>,
    /// Accept target stations that do not exist yet.
    #[arg(long = "allow-new-process")]
    pub if_allow_new_process: bool,
    /// Print the stations each unit can move to, then exit.
    #[arg(long = "list-targets")]
    pub if_list_targets: bool,
}

#[derive(Args, Debug)]
pub struct ArgsSummary {
    /// Element table (same formats as `group`).
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,
    /// Print each segment label under its station.
    #[arg(long = "segments")]
    pub if_show_segments: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_every_flag_has_help_text() {
        let cmd = Cli::command();
        cmd.clone().debug_assert();

        let mut l_missing = Vec::new();
        let l_cmds = std::iter::once(&cmd).chain(cmd.get_subcommands());
        for sub in l_cmds {
            for arg in sub.get_arguments() {
                if arg.get_help().is_none() {
                    l_missing.push(format!("{} --{}", sub.get_name(), arg.get_id()));
                }
            }
        }
        assert!(l_missing.is_empty(), "{l_missing:?}");
    }
}
