//! Mutation handlers over an owned [`AppState`].
//!
//! Every applied event runs the same cycle to completion: mutate, persist the
//! whole state, render. Events that change nothing (blank names, a missing
//! selection, an unknown task) return [`Outcome::Ignored`] and touch neither
//! storage nor the view.

use tracing::{debug, info, warn};

use crate::ids::{IdGenerator, IdScheme};
use crate::model::{ListId, Task, TaskId, TaskList, is_blank};
use crate::render::{View, render};
use crate::state::AppState;
use crate::storage::{KeyValueStore, StateStore};

/// Inbound UI events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CreateList { name: String },
    SelectList { id: ListId },
    DeleteSelectedList,
    CreateTask { name: String },
    ToggleTask { id: TaskId, complete: bool },
    DeleteTask { id: TaskId },
    ClearCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    BlankName,
    NoSelection,
    UnknownList,
    UnknownTask,
}

impl Ignored {
    pub fn describe(self) -> &'static str {
        match self {
            Self::BlankName => "name is blank",
            Self::NoSelection => "no list is selected",
            Self::UnknownList => "selected list does not exist",
            Self::UnknownTask => "no such task in the selected list",
        }
    }
}

/// How much of the surface a binding has to redraw after an applied event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Full,
    RemainingCount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied {
        view: View,
        refresh: Refresh,
        /// False when the store rejected the write; the change is kept in memory.
        persisted: bool,
    },
    Ignored(Ignored),
}

impl Outcome {
    pub fn view(&self) -> Option<&View> {
        match self {
            Self::Applied { view, .. } => Some(view),
            Self::Ignored(_) => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug)]
pub struct TaskListApp<S> {
    state: AppState,
    store: StateStore<S>,
    ids: IdGenerator,
}

impl<S: KeyValueStore> TaskListApp<S> {
    /// Loads state from `kv`, falling back to an empty collection.
    #[tracing::instrument(skip(kv))]
    pub fn open(kv: S, scheme: IdScheme) -> Self {
        let store = StateStore::new(kv);
        let state = store.load();
        let ids = IdGenerator::resume(scheme, &state);
        Self { state, store, ids }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    pub fn view(&self) -> View {
        render(&self.state)
    }

    pub fn dispatch(&mut self, event: Event) -> Outcome {
        debug!(?event, "dispatching event");
        match event {
            Event::CreateList { name } => self.create_list(&name),
            Event::SelectList { id } => self.select_list(id),
            Event::DeleteSelectedList => self.delete_selected_list(),
            Event::CreateTask { name } => self.create_task(&name),
            Event::ToggleTask { id, complete } => self.toggle_task(&id, complete),
            Event::DeleteTask { id } => self.delete_task(&id),
            Event::ClearCompleted => self.clear_completed(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn create_list(&mut self, name: &str) -> Outcome {
        if is_blank(name) {
            return ignore(Ignored::BlankName);
        }
        let list = TaskList::new(ListId::new(self.ids.next_id()), name.to_string());
        info!(id = %list.id, "created list");
        self.state.lists.push(list);
        self.save_and_render(Refresh::Full)
    }

    /// No existence check; rendering treats an unknown id as no selection.
    #[tracing::instrument(skip(self))]
    pub fn select_list(&mut self, id: ListId) -> Outcome {
        info!(id = %id, "selected list");
        self.state.selected_list_id = Some(id);
        self.save_and_render(Refresh::Full)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_selected_list(&mut self) -> Outcome {
        let Some(selected) = self.state.selected_list_id.clone() else {
            return ignore(Ignored::NoSelection);
        };
        let before = self.state.lists.len();
        self.state.lists.retain(|list| list.id != selected);
        if self.state.lists.len() == before {
            return ignore(Ignored::UnknownList);
        }
        self.state.selected_list_id = None;
        info!(id = %selected, "deleted list");
        self.save_and_render(Refresh::Full)
    }

    #[tracing::instrument(skip(self))]
    pub fn create_task(&mut self, name: &str) -> Outcome {
        if is_blank(name) {
            return ignore(Ignored::BlankName);
        }
        let list = match selected_in(&mut self.state) {
            Ok(list) => list,
            Err(reason) => return ignore(reason),
        };
        let id = TaskId::new(self.ids.next_id());
        info!(list = %list.id, task = %id, "created task");
        list.tasks.push(Task::new(id, name.to_string()));
        self.save_and_render(Refresh::Full)
    }

    /// Sets `complete` to the checkbox state rather than flipping it.
    #[tracing::instrument(skip(self))]
    pub fn toggle_task(&mut self, id: &TaskId, complete: bool) -> Outcome {
        let list = match selected_in(&mut self.state) {
            Ok(list) => list,
            Err(reason) => return ignore(reason),
        };
        let Some(task) = list.task_mut(id) else {
            return ignore(Ignored::UnknownTask);
        };
        task.complete = complete;
        info!(task = %id, complete, "set task completion");
        self.save_and_render(Refresh::RemainingCount)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: &TaskId) -> Outcome {
        let list = match selected_in(&mut self.state) {
            Ok(list) => list,
            Err(reason) => return ignore(reason),
        };
        let before = list.tasks.len();
        list.tasks.retain(|task| &task.id != id);
        if list.tasks.len() == before {
            return ignore(Ignored::UnknownTask);
        }
        info!(task = %id, "deleted task");
        self.save_and_render(Refresh::Full)
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&mut self) -> Outcome {
        let list = match selected_in(&mut self.state) {
            Ok(list) => list,
            Err(reason) => return ignore(reason),
        };
        let before = list.tasks.len();
        list.tasks.retain(|task| !task.complete);
        info!(
            before,
            after = list.tasks.len(),
            "cleared completed tasks"
        );
        self.save_and_render(Refresh::Full)
    }

    fn save_and_render(&mut self, refresh: Refresh) -> Outcome {
        let persisted = match self.store.save(&self.state) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to persist state; continuing in memory");
                false
            }
        };
        Outcome::Applied {
            view: self.view(),
            refresh,
            persisted,
        }
    }
}

fn selected_in(state: &mut AppState) -> Result<&mut TaskList, Ignored> {
    if state.selected_list_id.is_none() {
        return Err(Ignored::NoSelection);
    }
    state.selected_list_mut().ok_or(Ignored::UnknownList)
}

fn ignore(reason: Ignored) -> Outcome {
    match reason {
        Ignored::BlankName => debug!("ignoring event with blank name"),
        other => warn!(reason = other.describe(), "ignoring event"),
    }
    Outcome::Ignored(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LISTS_KEY, MemoryStore};

    fn app() -> TaskListApp<MemoryStore> {
        TaskListApp::open(MemoryStore::new(), IdScheme::Sequential)
    }

    fn panel_count(outcome: &Outcome) -> String {
        outcome
            .view()
            .and_then(|view| view.panel.as_ref())
            .map(|panel| panel.remaining_count_text.clone())
            .unwrap_or_default()
    }

    fn task_id(app: &TaskListApp<MemoryStore>, name: &str) -> TaskId {
        app.state()
            .selected_list()
            .and_then(|list| list.tasks.iter().find(|t| t.name == name))
            .map(|task| task.id.clone())
            .unwrap()
    }

    fn groceries() -> TaskListApp<MemoryStore> {
        let mut app = app();
        app.create_list("Groceries");
        let id = app.state().lists[0].id.clone();
        app.select_list(id);
        app
    }

    #[test]
    fn blank_list_name_is_ignored_without_writing() {
        let mut app = app();
        assert_eq!(app.create_list("   "), Outcome::Ignored(Ignored::BlankName));
        assert_eq!(app.create_list(""), Outcome::Ignored(Ignored::BlankName));
        assert!(app.state().lists.is_empty());
        assert_eq!(app.store().kv().writes(), 0);
    }

    #[test]
    fn select_shows_empty_panel() {
        let mut app = app();
        app.create_list("Groceries");
        let id = app.state().lists[0].id.clone();
        let outcome = app.select_list(id);

        let panel = outcome.view().and_then(|v| v.panel.clone()).unwrap();
        assert_eq!(panel.title, "Groceries");
        assert_eq!(panel.remaining_count_text, "0 tasks remaining");
        assert!(panel.tasks.is_empty());
    }

    #[test]
    fn remaining_count_tracks_toggles() {
        let mut app = groceries();
        app.create_task("Milk");
        let outcome = app.create_task("Eggs");
        assert_eq!(panel_count(&outcome), "2 tasks remaining");

        let milk = task_id(&app, "Milk");
        let outcome = app.toggle_task(&milk, true);
        assert_eq!(panel_count(&outcome), "1 task remaining");
        assert!(matches!(
            outcome,
            Outcome::Applied {
                refresh: Refresh::RemainingCount,
                persisted: true,
                ..
            }
        ));

        let eggs = task_id(&app, "Eggs");
        assert_eq!(panel_count(&app.toggle_task(&eggs, true)), "0 tasks remaining");
        assert_eq!(panel_count(&app.toggle_task(&eggs, false)), "1 task remaining");
    }

    #[test]
    fn toggle_sets_rather_than_flips() {
        let mut app = groceries();
        app.create_task("Milk");
        let milk = task_id(&app, "Milk");
        app.toggle_task(&milk, true);
        app.toggle_task(&milk, true);
        assert!(app.state().lists[0].tasks[0].complete);
    }

    #[test]
    fn clear_completed_keeps_order_and_identity() {
        let mut app = groceries();
        for name in ["A", "B", "C", "D"] {
            app.create_task(name);
        }
        let b = task_id(&app, "B");
        let d = task_id(&app, "D");
        app.toggle_task(&b, true);
        app.toggle_task(&d, true);
        let kept_before: Vec<Task> = app.state().lists[0]
            .tasks
            .iter()
            .filter(|t| !t.complete)
            .cloned()
            .collect();

        assert!(app.clear_completed().is_applied());
        assert_eq!(app.state().lists[0].tasks, kept_before);
        let names: Vec<&str> = app.state().lists[0]
            .tasks
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn delete_selected_list_hides_panel() {
        let mut app = groceries();
        app.create_list("Work");
        let outcome = app.delete_selected_list();

        let view = outcome.view().unwrap();
        assert!(view.panel.is_none());
        assert_eq!(view.lists.len(), 1);
        assert_eq!(view.lists[0].name, "Work");
        assert_eq!(app.state().selected_list_id, None);
    }

    #[test]
    fn task_events_without_selection_are_ignored() {
        let mut app = app();
        app.create_list("Inbox");
        let writes = app.store().kv().writes();

        assert_eq!(app.create_task("Milk"), Outcome::Ignored(Ignored::NoSelection));
        assert_eq!(app.clear_completed(), Outcome::Ignored(Ignored::NoSelection));
        assert_eq!(
            app.delete_selected_list(),
            Outcome::Ignored(Ignored::NoSelection)
        );
        assert_eq!(app.store().kv().writes(), writes);
    }

    #[test]
    fn dangling_selection_is_guarded() {
        let mut app = app();
        app.create_list("Inbox");
        let outcome = app.select_list(ListId::new("missing"));
        assert!(outcome.view().unwrap().panel.is_none());

        assert_eq!(app.create_task("Milk"), Outcome::Ignored(Ignored::UnknownList));
        assert_eq!(
            app.toggle_task(&TaskId::new("x"), true),
            Outcome::Ignored(Ignored::UnknownList)
        );
        assert_eq!(
            app.delete_selected_list(),
            Outcome::Ignored(Ignored::UnknownList)
        );
        assert_eq!(app.state().lists.len(), 1);
    }

    #[test]
    fn unknown_task_is_ignored() {
        let mut app = groceries();
        app.create_task("Milk");
        assert_eq!(
            app.delete_task(&TaskId::new("nope")),
            Outcome::Ignored(Ignored::UnknownTask)
        );
        assert_eq!(app.state().lists[0].tasks.len(), 1);

        let milk = task_id(&app, "Milk");
        assert!(app.delete_task(&milk).is_applied());
        assert!(app.state().lists[0].tasks.is_empty());
    }

    #[test]
    fn toggling_unknown_task_is_ignored_without_writing() {
        let mut app = groceries();
        app.create_task("Milk");
        let writes = app.store().kv().writes();

        assert_eq!(
            app.toggle_task(&TaskId::new("nope"), true),
            Outcome::Ignored(Ignored::UnknownTask)
        );
        assert!(!app.state().lists[0].tasks[0].complete);
        assert_eq!(app.store().kv().writes(), writes);
    }

    #[test]
    fn ignored_task_does_not_consume_an_id() {
        let mut app = app();
        app.create_list("Inbox");
        app.create_task("Lost");
        app.select_list(ListId::new("1"));
        app.create_task("Kept");
        assert_eq!(app.state().lists[0].tasks[0].id, TaskId::new("2"));
    }

    #[test]
    fn stored_max_id_does_not_break_creation() {
        let mut kv = MemoryStore::new();
        let list = TaskList::new(ListId::new(u64::MAX.to_string()), "Full".to_string());
        kv.set_item(LISTS_KEY, &serde_json::to_string(&vec![list]).unwrap())
            .unwrap();
        let mut app = TaskListApp::open(kv, IdScheme::Sequential);
        app.select_list(ListId::new(u64::MAX.to_string()));

        assert_eq!(panel_count(&app.create_task("Milk")), "1 task remaining");
        assert!(app.create_list("Next").is_applied());
        let ids: Vec<&ListId> = app.state().lists.iter().map(|l| &l.id).collect();
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn quota_failure_keeps_state_in_memory() {
        let mut app = TaskListApp::open(MemoryStore::with_quota(64), IdScheme::Sequential);
        assert!(matches!(
            app.create_list("Short"),
            Outcome::Applied { persisted: true, .. }
        ));

        let outcome = app.create_list(&"long name ".repeat(10));
        assert!(matches!(outcome, Outcome::Applied { persisted: false, .. }));
        assert_eq!(app.state().lists.len(), 2);
    }

    #[test]
    fn reopen_restores_state() {
        let mut app = groceries();
        app.create_task("Milk");
        let saved = app.state().clone();

        let reopened = TaskListApp::open(app.into_store(), IdScheme::Sequential);
        assert_eq!(reopened.state(), &saved);
    }

    #[test]
    fn dispatch_routes_events() {
        let mut app = app();
        app.dispatch(Event::CreateList {
            name: "Inbox".to_string(),
        });
        let id = app.state().lists[0].id.clone();
        app.dispatch(Event::SelectList { id });
        let outcome = app.dispatch(Event::CreateTask {
            name: "Call".to_string(),
        });
        assert_eq!(panel_count(&outcome), "1 task remaining");
    }
}
