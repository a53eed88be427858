//! Operator selection
//!
//! Orders the inventory for display and resolves one selection expression
//! into a concrete set of ids. Re-prompting on a bad expression is the
//! caller's job.

use crate::models::{ResourceKind, ResourceRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ids chosen for deletion, in display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    ids: Vec<String>,
}

impl SelectionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Outcome of evaluating one selection expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    Selected(SelectionSet),
    /// The expression could not be satisfied; ask again
    Retry(String),
    Cancelled,
}

/// Count and cost of a selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub count: usize,
    pub monthly_cost: f64,
    pub annual_cost: f64,
}

/// Presents records in cost order and resolves selections against that order
pub struct SelectionEngine<'a> {
    kind: ResourceKind,
    ordered: Vec<&'a ResourceRecord>,
}

impl<'a> SelectionEngine<'a> {
    /// Display order: cost descending, ties keep discovery order
    pub fn new(kind: ResourceKind, records: &'a [ResourceRecord]) -> Self {
        let mut ordered: Vec<&ResourceRecord> = records.iter().collect();
        ordered.sort_by(|a, b| b.monthly_cost_estimate.total_cmp(&a.monthly_cost_estimate));
        Self { kind, ordered }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn display_order(&self) -> &[&'a ResourceRecord] {
        &self.ordered
    }

    /// Evaluate one expression; first matching rule wins
    pub fn parse_selection(&self, input: &str) -> SelectionResult {
        let choice = input.trim().to_lowercase();
        let noun = self.kind.noun();

        match choice.as_str() {
            "" => SelectionResult::Selected(SelectionSet::empty()),
            "all" => SelectionResult::Selected(self.select_where(|_| true)),
            "q" | "quit" => SelectionResult::Cancelled,
            "inactive" => self.non_empty(
                self.select_where(|r| r.is_inactive()),
                format!("No inactive {}s found", noun),
            ),
            "safe" => self.non_empty(
                self.select_where(|r| !r.is_risky()),
                format!("No 'safe' {}s found (all have warnings)", noun),
            ),
            keyword if self.kind.variant_keywords().contains(&keyword) => self.non_empty(
                self.select_where(|r| variant_matches(r.variant(), keyword)),
                format!("No {} {}s found", keyword, noun),
            ),
            _ => self.select_indices(&choice),
        }
    }

    /// Records of `selection` in display order
    pub fn targets(&self, selection: &SelectionSet) -> Vec<&'a ResourceRecord> {
        self.ordered
            .iter()
            .copied()
            .filter(|r| selection.contains(&r.id))
            .collect()
    }

    pub fn summarize(&self, selection: &SelectionSet) -> SelectionSummary {
        let monthly_cost: f64 = self
            .targets(selection)
            .iter()
            .map(|r| r.monthly_cost_estimate)
            .sum();
        SelectionSummary {
            count: selection.len(),
            monthly_cost,
            annual_cost: monthly_cost * 12.0,
        }
    }

    fn select_where<F>(&self, predicate: F) -> SelectionSet
    where
        F: Fn(&ResourceRecord) -> bool,
    {
        SelectionSet {
            ids: self
                .ordered
                .iter()
                .filter(|r| predicate(r))
                .map(|r| r.id.clone())
                .collect(),
        }
    }

    fn non_empty(&self, selection: SelectionSet, message: String) -> SelectionResult {
        if selection.is_empty() {
            SelectionResult::Retry(message)
        } else {
            SelectionResult::Selected(selection)
        }
    }

    fn select_indices(&self, choice: &str) -> SelectionResult {
        let mut positions = BTreeSet::new();
        for token in choice.split(',') {
            let Ok(index) = token.trim().parse::<usize>() else {
                return SelectionResult::Retry(format!(
                    "Invalid input. Please enter numbers separated by commas, 'all', 'inactive', 'safe', a variant ({}), or 'q' to quit",
                    self.kind.variant_keywords().join(", ")
                ));
            };
            if index == 0 || index > self.ordered.len() {
                return SelectionResult::Retry(format!("Invalid {} number: {}", self.kind.noun(), index));
            }
            positions.insert(index - 1);
        }

        SelectionResult::Selected(SelectionSet {
            ids: positions
                .into_iter()
                .map(|p| self.ordered[p].id.clone())
                .collect(),
        })
    }
}

/// A keyword matches the variant itself or its family (`aurora` ~ `aurora-mysql`)
fn variant_matches(variant: Option<&str>, keyword: &str) -> bool {
    let Some(variant) = variant else {
        return false;
    };
    let variant = variant.to_lowercase();
    variant == keyword
        || variant
            .strip_prefix(keyword)
            .map(|rest| rest.starts_with('-'))
            .unwrap_or(false)
}
