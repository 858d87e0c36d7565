use crate::model::{ListId, TaskList};

/// Everything the app mutates: the lists in display order and the selection key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub lists: Vec<TaskList>,
    pub selected_list_id: Option<ListId>,
}

impl AppState {
    pub fn new(lists: Vec<TaskList>, selected_list_id: Option<ListId>) -> Self {
        Self {
            lists,
            selected_list_id,
        }
    }

    /// Resolves the selection; a dangling id resolves to `None`.
    pub fn selected_list(&self) -> Option<&TaskList> {
        let id = self.selected_list_id.as_ref()?;
        self.lists.iter().find(|list| &list.id == id)
    }

    pub fn selected_list_mut(&mut self) -> Option<&mut TaskList> {
        let id = self.selected_list_id.as_ref()?;
        self.lists.iter_mut().find(|list| &list.id == id)
    }

    pub fn is_selected(&self, id: &ListId) -> bool {
        self.selected_list_id.as_ref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_selection_resolves_to_none() {
        let state = AppState::new(
            vec![TaskList::new("a".into(), "Inbox".to_string())],
            Some("gone".into()),
        );
        assert!(state.selected_list().is_none());
        assert!(!state.is_selected(&"a".into()));
    }

    #[test]
    fn selection_resolves_by_id() {
        let mut state = AppState::new(
            vec![
                TaskList::new("a".into(), "Inbox".to_string()),
                TaskList::new("b".into(), "Work".to_string()),
            ],
            Some("b".into()),
        );
        assert_eq!(state.selected_list().map(|l| l.name.as_str()), Some("Work"));
        if let Some(list) = state.selected_list_mut() {
            list.name = "Office".to_string();
        }
        assert_eq!(state.lists[1].name, "Office");
    }
}
