//! Filter encoding for list queries.
//!
//! UI selections become opaque tokens (`itemType:DOCUMENT`,
//! `createdBy~a@b.c`, `updatedAt:2024-01-01..2024-02-01`, `parent.id:42`)
//! that the backend list endpoints accept as a repeated query parameter.
//! At most one token per key is ever active; setting a key replaces its
//! previous token, and a "no filter" value removes it.

use chrono::NaiveDate;

use crate::types::{ItemId, ItemType};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    ItemType,
    CreatedBy,
    UpdatedAt,
    Parent,
}

impl FilterKey {
    pub const ALL: [FilterKey; 4] =
        [FilterKey::ItemType, FilterKey::CreatedBy, FilterKey::UpdatedAt, FilterKey::Parent];

    /// Key prefix including its operator.
    pub fn prefix(&self) -> &'static str {
        match self {
            FilterKey::ItemType => "itemType:",
            FilterKey::CreatedBy => "createdBy~",
            FilterKey::UpdatedAt => "updatedAt:",
            FilterKey::Parent => "parent.id:",
        }
    }

    pub fn matches(&self, token: &str) -> bool {
        token.starts_with(self.prefix())
    }
}

/// Inclusive date range; `to` falls back to today when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn since(from: NaiveDate) -> Self {
        Self { from, to: None }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to: Some(to) }
    }

    fn encode(&self, today: NaiveDate) -> String {
        let to = self.to.unwrap_or(today);
        // A reversed selection is read as the same span.
        let (from, to) = if to < self.from { (to, self.from) } else { (self.from, to) };
        format!("{}..{}", from.format(DATE_FORMAT), to.format(DATE_FORMAT))
    }
}

/// A new selection for one filter dimension. `None` means "no filter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// `None` is the "ALL" choice.
    ItemType(Option<ItemType>),
    CreatedBy(Option<String>),
    UpdatedAt(Option<DateRange>),
    /// `None` is the root folder.
    Parent(Option<ItemId>),
}

impl FilterValue {
    pub fn key(&self) -> FilterKey {
        match self {
            FilterValue::ItemType(_) => FilterKey::ItemType,
            FilterValue::CreatedBy(_) => FilterKey::CreatedBy,
            FilterValue::UpdatedAt(_) => FilterKey::UpdatedAt,
            FilterValue::Parent(_) => FilterKey::Parent,
        }
    }

    /// The token for this value, or `None` when it clears the filter.
    pub fn encode(&self, today: NaiveDate) -> Option<String> {
        let prefix = self.key().prefix();
        match self {
            FilterValue::ItemType(t) => t.map(|t| format!("{}{}", prefix, t.as_str())),
            FilterValue::CreatedBy(email) => email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(|e| format!("{}{}", prefix, e)),
            FilterValue::UpdatedAt(range) => range.map(|r| format!("{}{}", prefix, r.encode(today))),
            FilterValue::Parent(id) => id.map(|id| format!("{}{}", prefix, id)),
        }
    }
}

/// Produces the next token array: drops any token of the same key, then
/// appends the new token unless the value clears the filter.
pub fn apply(tokens: &[String], value: &FilterValue, today: NaiveDate) -> Vec<String> {
    let key = value.key();
    let mut next: Vec<String> = tokens.iter().filter(|t| !key.matches(t)).cloned().collect();
    if let Some(token) = value.encode(today) {
        next.push(token);
    }
    next
}

/// The ordered set of active filter tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterTokens(Vec<String>);

impl FilterTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a selection using the local calendar date as "today".
    /// Returns whether the token array changed.
    pub fn set(&mut self, value: &FilterValue) -> bool {
        self.set_with_today(value, chrono::Local::now().date_naive())
    }

    pub fn set_with_today(&mut self, value: &FilterValue, today: NaiveDate) -> bool {
        let next = apply(&self.0, value, today);
        if next == self.0 {
            return false;
        }
        self.0 = next;
        true
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.0.iter().find(|t| key.matches(t)).map(String::as_str)
    }

    /// The value part of the active token for `key`.
    pub fn value_of(&self, key: FilterKey) -> Option<&str> {
        self.get(key).map(|t| &t[key.prefix().len()..])
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.value_of(FilterKey::Parent).and_then(|v| v.parse().ok())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl From<Vec<String>> for FilterTokens {
    fn from(tokens: Vec<String>) -> Self {
        Self(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_prefixes_do_not_overlap() {
        for a in FilterKey::ALL {
            for b in FilterKey::ALL {
                if a != b {
                    assert!(!b.matches(a.prefix()), "{:?} vs {:?}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_blank_owner_clears() {
        let today = day(2024, 5, 1);
        let tokens = vec!["createdBy~a@b.io".to_string()];
        let next = apply(&tokens, &FilterValue::CreatedBy(Some("   ".into())), today);
        assert!(next.is_empty());
    }
}
