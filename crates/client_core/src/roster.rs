use crate::render::ViewNode;

/// Rendered user list plus the online count label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterView {
    pub items: Vec<ViewNode>,
    pub count_label: String,
}

impl RosterView {
    fn build(users: &[String]) -> Self {
        Self {
            items: users
                .iter()
                .map(|user| ViewNode::new("li").with_class("user-item").with_text(user.clone()))
                .collect(),
            count_label: users.len().to_string(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| item.text.as_deref())
            .collect()
    }
}

/// Online users exactly as last pushed by the server. Never merged, never
/// deduplicated.
#[derive(Debug, Clone)]
pub struct RosterStore {
    users: Vec<String>,
    view: RosterView,
    revision: u64,
}

impl Default for RosterStore {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            view: RosterView::build(&[]),
            revision: 0,
        }
    }
}

impl RosterStore {
    pub fn replace(&mut self, users: Vec<String>) {
        self.view = RosterView::build(&users);
        self.users = users;
        self.revision += 1;
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn view(&self) -> &RosterView {
        &self.view
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }

    /// Bumped on every replace, even when the list is unchanged.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
#[path = "tests/roster_tests.rs"]
mod tests;
