use anyhow::Result;

use crate::cli::{parse_cli_args, usage_text, version_text, CliCommand};
use crate::command_handlers::{
    handle_assets, handle_daemon, handle_jobs, handle_run_schedule, handle_scan,
    handle_schedule_add, handle_schedule_remove, handle_schedule_set_enabled, handle_schedules,
};

/// Run the app by parsing CLI-style args and dispatching the command.
pub async fn run<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let command = parse_cli_args(args)?;
    execute_command(command).await
}

/// Execute a pre-parsed command. Reusable for non-CLI entrypoints.
pub async fn execute_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Help => {
            println!("{}", usage_text());
            Ok(())
        }
        CliCommand::Version => {
            println!("{}", version_text());
            Ok(())
        }
        CliCommand::Scan { target } => handle_scan(target).await,
        CliCommand::Jobs => handle_jobs().await,
        CliCommand::Assets => handle_assets().await,
        CliCommand::Schedules => handle_schedules().await,
        CliCommand::ScheduleAdd { name, target, cron } => {
            handle_schedule_add(name, target, cron).await
        }
        CliCommand::ScheduleRemove { id } => handle_schedule_remove(id).await,
        CliCommand::ScheduleSetEnabled { id, enabled } => {
            handle_schedule_set_enabled(id, enabled).await
        }
        CliCommand::RunSchedule { id } => handle_run_schedule(id).await,
        CliCommand::Daemon => handle_daemon().await,
    }
}
