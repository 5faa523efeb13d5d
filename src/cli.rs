//! Command-line argument parsing

use anyhow::{anyhow, bail, Result};

#[derive(Debug, PartialEq, Eq)]
pub enum CliCommand {
    /// One-shot scan: start a job and wait for its terminal state.
    Scan { target: String },
    /// Persisted job history.
    Jobs,
    /// Asset inventory.
    Assets,
    /// List saved schedules.
    Schedules,
    ScheduleAdd {
        name: String,
        target: String,
        cron: String,
    },
    ScheduleRemove { id: i64 },
    ScheduleSetEnabled { id: i64, enabled: bool },
    /// Run a saved schedule's target now.
    RunSchedule { id: i64 },
    /// Run the cron scheduler until interrupted.
    Daemon,
    Help,
    Version,
}

pub fn version_text() -> String {
    format!("netwarden {}", env!("CARGO_PKG_VERSION"))
}

pub fn usage_text() -> String {
    format!(
        "{version}
netwarden — Network Scan Job Engine & Scheduler

Usage:
  netwarden scan <TARGET>
  netwarden jobs
  netwarden assets
  netwarden schedule list
  netwarden schedule add <NAME> <TARGET> <CRON>
  netwarden schedule remove <ID>
  netwarden schedule enable <ID>
  netwarden schedule disable <ID>
  netwarden run <ID>
  netwarden daemon
  netwarden --help
  netwarden --version

TARGET is an IP, CIDR range, or hostname passed to the scanner as-is.
CRON accepts 5-field (minute-resolution) or 6-field (with seconds) syntax.",
        version = version_text()
    )
}

pub fn parse_cli_args<I, S>(args: I) -> Result<CliCommand>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
    let mut iter = args.iter();

    let Some(first) = iter.next() else {
        return Ok(CliCommand::Help);
    };

    let command = match first.as_str() {
        "-h" | "--help" | "help" => CliCommand::Help,
        "-V" | "--version" | "version" => CliCommand::Version,
        "scan" => {
            let target = iter
                .next()
                .ok_or_else(|| anyhow!("scan requires a <TARGET> argument"))?
                .clone();
            CliCommand::Scan { target }
        }
        "jobs" => CliCommand::Jobs,
        "assets" => CliCommand::Assets,
        "daemon" => CliCommand::Daemon,
        "run" => CliCommand::RunSchedule {
            id: parse_id(iter.next(), "run")?,
        },
        "schedule" => {
            let sub = iter
                .next()
                .ok_or_else(|| anyhow!("schedule requires a subcommand (list/add/remove/enable/disable)"))?;
            match sub.as_str() {
                "list" => CliCommand::Schedules,
                "add" => {
                    let name = iter
                        .next()
                        .ok_or_else(|| anyhow!("schedule add requires <NAME> <TARGET> <CRON>"))?
                        .clone();
                    let target = iter
                        .next()
                        .ok_or_else(|| anyhow!("schedule add requires <NAME> <TARGET> <CRON>"))?
                        .clone();
                    let cron = iter
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    if cron.is_empty() {
                        bail!("schedule add requires <NAME> <TARGET> <CRON>");
                    }
                    return Ok(CliCommand::ScheduleAdd { name, target, cron });
                }
                "remove" => CliCommand::ScheduleRemove {
                    id: parse_id(iter.next(), "schedule remove")?,
                },
                "enable" => CliCommand::ScheduleSetEnabled {
                    id: parse_id(iter.next(), "schedule enable")?,
                    enabled: true,
                },
                "disable" => CliCommand::ScheduleSetEnabled {
                    id: parse_id(iter.next(), "schedule disable")?,
                    enabled: false,
                },
                other => bail!("unknown schedule subcommand '{other}'"),
            }
        }
        other => bail!("unknown command '{other}' (see --help)"),
    };

    if let Some(extra) = iter.next() {
        bail!("unexpected argument '{extra}'");
    }
    Ok(command)
}

fn parse_id(arg: Option<&String>, context: &str) -> Result<i64> {
    let raw = arg.ok_or_else(|| anyhow!("{context} requires a schedule <ID>"))?;
    raw.parse()
        .map_err(|_| anyhow!("{context}: '{raw}' is not a valid schedule id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_means_help() {
        assert_eq!(parse_cli_args(Vec::<String>::new()).unwrap(), CliCommand::Help);
    }

    #[test]
    fn scan_requires_target() {
        assert!(parse_cli_args(["scan"]).is_err());
        assert_eq!(
            parse_cli_args(["scan", "10.0.0.0/24"]).unwrap(),
            CliCommand::Scan {
                target: "10.0.0.0/24".to_string()
            }
        );
    }

    #[test]
    fn schedule_add_joins_cron_fields() {
        let command = parse_cli_args(["schedule", "add", "nightly", "10.0.0.0/24", "0", "2", "*", "*", "*"])
            .unwrap();
        assert_eq!(
            command,
            CliCommand::ScheduleAdd {
                name: "nightly".to_string(),
                target: "10.0.0.0/24".to_string(),
                cron: "0 2 * * *".to_string(),
            }
        );
    }

    #[test]
    fn schedule_ids_must_be_numeric() {
        assert!(parse_cli_args(["schedule", "remove", "abc"]).is_err());
        assert_eq!(
            parse_cli_args(["schedule", "disable", "7"]).unwrap(),
            CliCommand::ScheduleSetEnabled {
                id: 7,
                enabled: false
            }
        );
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(parse_cli_args(["explode"]).is_err());
        assert!(parse_cli_args(["jobs", "extra"]).is_err());
    }
}
