//! Compliance gate - restricts which actions may leave the engine

use std::collections::HashSet;

use crate::core::{Action, Assessment, ComplianceRule};

/// Only the listed actions (plus hold) are permitted
#[derive(Debug, Clone)]
pub struct ActionAllowList {
    allowed: HashSet<Action>,
}

impl ActionAllowList {
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: actions.into_iter().map(Action::new).collect(),
        }
    }
}

impl ComplianceRule for ActionAllowList {
    fn name(&self) -> &str {
        "action_allow_list"
    }

    fn permits(&self, action: &Action, _assessment: &Assessment) -> bool {
        action.is_no_action() || self.allowed.contains(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        let rule = ActionAllowList::new(["Enter"]);
        let a = Assessment::new(0.9, 0.1);

        assert!(rule.permits(&Action::new("enter"), &a));
        assert!(rule.permits(&Action::hold(), &a));
        assert!(!rule.permits(&Action::new("short"), &a));
    }

    #[test]
    fn test_empty_list_only_holds() {
        let rule = ActionAllowList::new(Vec::<String>::new());
        assert!(!rule.permits(&Action::new("enter"), &Assessment::new(1.0, 0.0)));
        assert!(rule.permits(&Action::hold(), &Assessment::new(1.0, 0.0)));
    }
}
