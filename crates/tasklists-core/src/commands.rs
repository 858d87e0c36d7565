use std::io::{self, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument};

use crate::app::{Event, Outcome, Refresh, TaskListApp};
use crate::cli::Invocation;
use crate::config::Config;
use crate::model::{ListId, TaskId};
use crate::render::Renderer;
use crate::state::AppState;
use crate::storage::KeyValueStore;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "show",
        "new-list",
        "select",
        "delete-list",
        "add",
        "check",
        "uncheck",
        "remove",
        "clear",
        "export",
        "config",
        "commands",
        "help",
        "version",
    ]
}

/// Exact names win; otherwise a prefix must match exactly one command.
pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(app, cfg, renderer, inv))]
pub fn dispatch<S: KeyValueStore>(
    app: &mut TaskListApp<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = &inv.command_args;
    debug!(command, ?args, "dispatching command");

    let event = match command {
        "show" => return renderer.print_view(&app.view()),
        "new-list" => Event::CreateList {
            name: args.join(" "),
        },
        "select" => Event::SelectList {
            id: resolve_list_ref(app.state(), single_arg(command, args)?)?,
        },
        "delete-list" => Event::DeleteSelectedList,
        "add" => Event::CreateTask {
            name: args.join(" "),
        },
        "check" | "uncheck" => Event::ToggleTask {
            id: resolve_task_ref(app.state(), single_arg(command, args)?),
            complete: command == "check",
        },
        "remove" => Event::DeleteTask {
            id: resolve_task_ref(app.state(), single_arg(command, args)?),
        },
        "clear" => Event::ClearCompleted,
        "export" => return cmd_export(app.state()),
        "config" => return cmd_config(cfg),
        "commands" => return cmd_commands(),
        "help" => return cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        other => return Err(anyhow!("unknown command: {other}")),
    };

    match app.dispatch(event) {
        Outcome::Applied {
            view,
            refresh,
            persisted,
        } => {
            if !persisted {
                eprintln!("warning: changes could not be saved; they were kept for this run only");
            }
            match (refresh, &view.panel) {
                (Refresh::RemainingCount, Some(panel)) => {
                    renderer.print_remaining(&panel.remaining_count_text)
                }
                _ => renderer.print_view(&view),
            }
        }
        Outcome::Ignored(reason) => {
            info!(command, reason = reason.describe(), "command ignored");
            println!("Nothing changed: {}.", reason.describe());
            Ok(())
        }
    }
}

fn single_arg<'a>(command: &str, args: &'a [String]) -> anyhow::Result<&'a str> {
    match args {
        [one] => Ok(one.as_str()),
        [] => Err(anyhow!("{command} requires an id or position")),
        _ => Err(anyhow!("{command} takes exactly one id or position")),
    }
}

/// Exact id first, then a 1-based position in the sidebar.
pub fn resolve_list_ref(state: &AppState, token: &str) -> anyhow::Result<ListId> {
    if let Some(list) = state.lists.iter().find(|list| list.id.as_str() == token) {
        return Ok(list.id.clone());
    }
    position(token, state.lists.len())
        .map(|idx| state.lists[idx].id.clone())
        .ok_or_else(|| anyhow!("no list matching '{token}'"))
}

/// Exact id first, then a 1-based position in the selected list. Anything
/// else is passed through so the app reports what was wrong.
pub fn resolve_task_ref(state: &AppState, token: &str) -> TaskId {
    let Some(list) = state.selected_list() else {
        return TaskId::new(token);
    };
    if let Some(task) = list.tasks.iter().find(|task| task.id.as_str() == token) {
        return task.id.clone();
    }
    position(token, list.tasks.len())
        .map(|idx| list.tasks[idx].id.clone())
        .unwrap_or_else(|| TaskId::new(token))
}

fn position(token: &str, len: usize) -> Option<usize> {
    let n = token.parse::<usize>().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

fn cmd_export(state: &AppState) -> anyhow::Result<()> {
    let payload =
        serde_json::to_string_pretty(&state.lists).context("failed to serialize lists")?;
    println!("{payload}");
    Ok(())
}

fn cmd_config(cfg: &Config) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    for (key, value) in cfg.iter() {
        writeln!(out, "{key}={value}")?;
    }
    if let Some(source) = &cfg.source {
        writeln!(out, "# from {}", source.display())?;
    }
    Ok(())
}

fn cmd_commands() -> anyhow::Result<()> {
    for cmd in known_command_names() {
        println!("{cmd}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "usage: tasklists [options] <command> [args]\n\n\
         show                  print lists and the selected list's tasks\n\
         new-list <name>       create a list\n\
         select <list>         select a list by id or position\n\
         delete-list           delete the selected list\n\
         add <name>            add a task to the selected list\n\
         check <task>          mark a task complete\n\
         uncheck <task>        mark a task incomplete\n\
         remove <task>         delete a task\n\
         clear                 delete completed tasks from the selected list\n\
         export                print all lists as JSON\n\
         config                print effective configuration\n\
         commands | help | version"
    );
    Ok(())
}
