use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::model::{ListId, TaskId, TaskList};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub id: ListId,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: TaskId,
    pub name: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPanel {
    pub title: String,
    pub remaining_count_text: String,
    pub tasks: Vec<TaskRow>,
}

/// Everything a UI binding needs to redraw: the list sidebar and, when a list
/// is selected, its task panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub lists: Vec<ListSummary>,
    pub panel: Option<TaskPanel>,
}

pub fn render(state: &AppState) -> View {
    let lists = state
        .lists
        .iter()
        .map(|list| ListSummary {
            id: list.id.clone(),
            name: list.name.clone(),
            is_active: state.is_selected(&list.id),
        })
        .collect();

    let panel = state.selected_list().map(render_panel);

    View { lists, panel }
}

fn render_panel(list: &TaskList) -> TaskPanel {
    TaskPanel {
        title: list.name.clone(),
        remaining_count_text: remaining_count_text(list.remaining()),
        tasks: list
            .tasks
            .iter()
            .map(|task| TaskRow {
                id: task.id.clone(),
                name: task.name.clone(),
                checked: task.complete,
            })
            .collect(),
    }
}

pub fn remaining_count_text(remaining: usize) -> String {
    let noun = if remaining == 1 { "task" } else { "tasks" };
    format!("{remaining} {noun} remaining")
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()? && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, view))]
    pub fn print_view(&mut self, view: &View) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_view(&mut out, view)
    }

    #[tracing::instrument(skip(self))]
    pub fn print_remaining(&mut self, text: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{text}")?;
        Ok(())
    }

    pub fn write_view<W: Write>(&self, mut out: W, view: &View) -> anyhow::Result<()> {
        if view.lists.is_empty() {
            writeln!(out, "No lists.")?;
        } else {
            let rows = view
                .lists
                .iter()
                .enumerate()
                .map(|(idx, list)| {
                    let marker = if list.is_active { "*" } else { "" };
                    let name = if list.is_active {
                        self.paint(&list.name, "1;36")
                    } else {
                        list.name.clone()
                    };
                    vec![
                        self.paint(&(idx + 1).to_string(), "33"),
                        marker.to_string(),
                        name,
                        list.id.to_string(),
                    ]
                })
                .collect();
            write_table(&mut out, headers(&["#", "", "List", "ID"]), rows)?;
        }

        let Some(panel) = &view.panel else {
            return Ok(());
        };

        writeln!(out)?;
        writeln!(out, "{}", self.paint(&panel.title, "1"))?;
        if !panel.tasks.is_empty() {
            let rows = panel
                .tasks
                .iter()
                .enumerate()
                .map(|(idx, task)| {
                    let (check, name) = if task.checked {
                        ("[x]", self.paint(&task.name, "2"))
                    } else {
                        ("[ ]", task.name.clone())
                    };
                    vec![
                        self.paint(&(idx + 1).to_string(), "33"),
                        check.to_string(),
                        name,
                        task.id.to_string(),
                    ]
                })
                .collect();
            write_table(&mut out, headers(&["#", "Done", "Task", "ID"]), rows)?;
        }
        writeln!(out, "{}", panel.remaining_count_text)?;

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
