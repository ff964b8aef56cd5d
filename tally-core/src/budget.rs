//! Budget folders and category → budget selection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Budget {
    pub id: String,
    pub name: String,
}

impl Budget {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Pick the budget for a category name.
///
/// Priority: case-insensitive equal name > name containing the category > first budget.
/// Only returns `None` when there are no budgets.
pub fn select_budget<'a>(category: Option<&str>, budgets: &'a [Budget]) -> Option<&'a Budget> {
    let wanted = category
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());

    if let Some(wanted) = wanted {
        if let Some(b) = budgets.iter().find(|b| b.name.trim().to_lowercase() == wanted) {
            return Some(b);
        }
        if let Some(b) = budgets.iter().find(|b| b.name.to_lowercase().contains(&wanted)) {
            return Some(b);
        }
    }

    budgets.first()
}

pub fn budget_name<'a>(id: Option<&str>, budgets: &'a [Budget]) -> Option<&'a str> {
    let id = id?;
    budgets
        .iter()
        .find(|b| b.id == id)
        .map(|b| b.name.as_str())
}
