use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::entities::{ExpenseEntry, Matter, TimesheetEntry};

/// Temporal constraints derived from the selection: both minimums equal
/// the **latest** date among selected, not-yet-invoiced timesheet entries.
/// The invoice cannot predate the most recent work it bills for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
  pub min_invoice_date: Option<NaiveDate>,
  pub min_due_date: Option<NaiveDate>,
}

/// Input events of the selection engine. Every event triggers a full
/// recompute of the selected-uninvoiced subset and the date bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
  MatterAdded {
    matter: Matter,
    timesheets: Vec<TimesheetEntry>,
    expenses: Vec<ExpenseEntry>,
  },
  MatterRemoved(Uuid),
  TimesheetToggled(Uuid),
  SelectAll { person: Option<String> },
  DeselectAll { person: Option<String> },
  DateRangeChanged {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
  },
  ExpensesIncluded(bool),
  ExpenseToggled(Uuid),
}

/// The draft's selection set plus its filters. Mutated only through
/// `apply`, which consumes the state and returns the next one so ordering
/// guarantees can be asserted directly, without any UI runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
  editing_invoice: Option<Uuid>,
  matters: Vec<Matter>,
  timesheets: Vec<TimesheetEntry>,
  expenses: Vec<ExpenseEntry>,
  selected_timesheets: BTreeSet<Uuid>,
  selected_expenses: BTreeSet<Uuid>,
  include_expenses: bool,
  date_from: Option<NaiveDate>,
  date_to: Option<NaiveDate>,
}

impl SelectionState {
  pub fn new(editing_invoice: Option<Uuid>) -> Self {
    Self {
      editing_invoice,
      ..Self::default()
    }
  }

  pub fn editing_invoice(&self) -> Option<Uuid> {
    self.editing_invoice
  }

  pub fn matters(&self) -> &[Matter] {
    &self.matters
  }

  pub fn include_expenses(&self) -> bool {
    self.include_expenses
  }

  pub fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
    (self.date_from, self.date_to)
  }

  pub fn selected_timesheet_ids(&self) -> Vec<Uuid> {
    self.selected_timesheets.iter().copied().collect()
  }

  pub fn selected_expense_ids(&self) -> Vec<Uuid> {
    self.selected_expenses.iter().copied().collect()
  }

  fn in_range(&self, entry: &TimesheetEntry) -> bool {
    if let Some(from) = self.date_from
      && entry.date < from
    {
      return false;
    }
    if let Some(to) = self.date_to
      && entry.date > to
    {
      return false;
    }
    true
  }

  /// All candidate entries within the date-range filter. Locked entries
  /// stay visible so the user understands the totals; they are only
  /// excluded from toggling.
  pub fn visible_timesheets(&self) -> impl Iterator<Item = &TimesheetEntry> {
    self.timesheets.iter().filter(|e| self.in_range(e))
  }

  pub fn visible_expenses(&self) -> impl Iterator<Item = &ExpenseEntry> {
    self.expenses.iter().filter(|e| e.included)
  }

  /// The currently selected entries, restricted to the visible subset.
  pub fn selected_entries(&self) -> Vec<&TimesheetEntry> {
    self
      .visible_timesheets()
      .filter(|e| self.selected_timesheets.contains(&e.id))
      .collect()
  }

  pub fn selected_expense_entries(&self) -> Vec<&ExpenseEntry> {
    self
      .visible_expenses()
      .filter(|e| self.selected_expenses.contains(&e.id))
      .collect()
  }

  /// Entries looked up by id regardless of selection, used by the
  /// edit-mode fallback to the original stored selection.
  pub fn entries_by_ids(&self, ids: &[Uuid]) -> Vec<&TimesheetEntry> {
    self
      .timesheets
      .iter()
      .filter(|e| ids.contains(&e.id))
      .collect()
  }

  fn scoped_selectable_ids(&self, person: Option<&str>) -> Vec<Uuid> {
    self
      .visible_timesheets()
      .filter(|e| !e.is_locked_for(self.editing_invoice))
      .filter(|e| person.is_none_or(|p| e.person == p))
      .map(|e| e.id)
      .collect()
  }

  /// Whether the filtered, not-invoiced subset is entirely selected.
  /// Select-all toggles the whole subset atomically to the opposite of
  /// this state.
  pub fn fully_selected(&self, person: Option<&str>) -> bool {
    let scoped = self.scoped_selectable_ids(person);
    !scoped.is_empty() && scoped.iter().all(|id| self.selected_timesheets.contains(id))
  }

  /// Latest date among selected, not-invoiced entries; empty selection
  /// clears both bounds.
  pub fn bounds(&self) -> DateBounds {
    let latest = self
      .selected_entries()
      .iter()
      .filter(|e| !e.is_invoiced)
      .map(|e| e.date)
      .max();
    DateBounds {
      min_invoice_date: latest,
      min_due_date: latest,
    }
  }

  /// Applies one input event and returns the next state.
  pub fn apply(mut self, event: SelectionEvent) -> Self {
    match event {
      SelectionEvent::MatterAdded {
        matter,
        timesheets,
        expenses,
      } => {
        if self.matters.iter().any(|m| m.id == matter.id) {
          return self;
        }
        self.matters.push(matter);
        let known_ts: BTreeSet<Uuid> = self.timesheets.iter().map(|t| t.id).collect();
        self
          .timesheets
          .extend(timesheets.into_iter().filter(|t| !known_ts.contains(&t.id)));
        let known_ex: BTreeSet<Uuid> = self.expenses.iter().map(|x| x.id).collect();
        self
          .expenses
          .extend(expenses.into_iter().filter(|x| !known_ex.contains(&x.id)));
      }
      SelectionEvent::MatterRemoved(matter_id) => {
        self.matters.retain(|m| m.id != matter_id);
        let removed_ts: Vec<Uuid> = self
          .timesheets
          .iter()
          .filter(|t| t.matter_id == matter_id)
          .map(|t| t.id)
          .collect();
        let removed_ex: Vec<Uuid> = self
          .expenses
          .iter()
          .filter(|x| x.matter_id == matter_id)
          .map(|x| x.id)
          .collect();
        self.timesheets.retain(|t| t.matter_id != matter_id);
        self.expenses.retain(|x| x.matter_id != matter_id);
        for id in removed_ts {
          self.selected_timesheets.remove(&id);
        }
        for id in removed_ex {
          self.selected_expenses.remove(&id);
        }
      }
      SelectionEvent::TimesheetToggled(id) => {
        // Toggling a locked or filtered-out entry is a no-op, not an error.
        let toggleable = self
          .timesheets
          .iter()
          .find(|e| e.id == id)
          .is_some_and(|e| self.in_range(e) && !e.is_locked_for(self.editing_invoice));
        if toggleable && !self.selected_timesheets.remove(&id) {
          self.selected_timesheets.insert(id);
        }
      }
      SelectionEvent::SelectAll { person } => {
        for id in self.scoped_selectable_ids(person.as_deref()) {
          self.selected_timesheets.insert(id);
        }
      }
      SelectionEvent::DeselectAll { person } => {
        for id in self.scoped_selectable_ids(person.as_deref()) {
          self.selected_timesheets.remove(&id);
        }
      }
      SelectionEvent::DateRangeChanged { from, to } => {
        self.date_from = from;
        self.date_to = to;
        // Selections outside the new range are dropped, not remembered.
        let keep: BTreeSet<Uuid> = self
          .timesheets
          .iter()
          .filter(|e| self.selected_timesheets.contains(&e.id) && self.in_range(e))
          .map(|e| e.id)
          .collect();
        self.selected_timesheets = keep;
      }
      SelectionEvent::ExpensesIncluded(include) => {
        self.include_expenses = include;
      }
      SelectionEvent::ExpenseToggled(id) => {
        let toggleable = self
          .expenses
          .iter()
          .find(|e| e.id == id)
          .is_some_and(|e| e.included);
        if toggleable && !self.selected_expenses.remove(&id) {
          self.selected_expenses.insert(id);
        }
      }
    }
    self
  }
}
