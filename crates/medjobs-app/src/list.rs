// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Search, facet filter and sort projection over an in-memory collection.
//!
//! The controller never talks to the network. Callers hand it the latest
//! collection and it recomputes the visible rows whenever the collection,
//! the search term, a filter selection or the sort changes.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::{CollectionItem, ColumnSpec, FilterSpec, ResourceKind, SortDirection};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterSelection {
    #[default]
    Unset,
    Value(String),
}

impl FilterSelection {
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value(value.into())
    }

    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub label: String,
    pub selection: FilterSelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub field: String,
    pub title: String,
    pub values: Vec<String>,
    pub selection: FilterSelection,
}

impl FilterDescriptor {
    fn from_spec(spec: FilterSpec) -> Self {
        Self {
            field: spec.field,
            title: spec.title,
            values: Vec::new(),
            selection: FilterSelection::Unset,
        }
    }

    /// The unset option first (shown as the title), then observed values.
    pub fn options(&self) -> Vec<FilterOption> {
        let mut options = Vec::with_capacity(self.values.len() + 1);
        options.push(FilterOption {
            label: self.title.clone(),
            selection: FilterSelection::Unset,
        });
        options.extend(self.values.iter().map(|value| FilterOption {
            label: value.clone(),
            selection: FilterSelection::Value(value.clone()),
        }));
        options
    }

    pub fn is_active(&self) -> bool {
        !self.selection.is_unset()
    }

    pub fn selected_label(&self) -> &str {
        match &self.selection {
            FilterSelection::Unset => &self.title,
            FilterSelection::Value(value) => value,
        }
    }

    fn matches(&self, item: &CollectionItem) -> bool {
        match &self.selection {
            FilterSelection::Unset => true,
            FilterSelection::Value(value) => item.text(&self.field).trim() == value,
        }
    }
}

/// Stable identity of a row: the item's `id` (or `_id`), or its position in
/// the source collection when the backend sends neither.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    Id(String),
    Position(usize),
}

impl RowKey {
    fn for_item(item: &CollectionItem, position: usize) -> Self {
        ["id", "_id"]
            .into_iter()
            .map(|field| item.text(field).trim().to_owned())
            .find(|id| !id.is_empty())
            .map_or(Self::Position(position), Self::Id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: usize,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    View,
    Edit,
    Delete,
}

impl RowAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

/// Caller-supplied row callbacks. Each receives the full item.
pub trait RowActions {
    fn view(&mut self, item: &CollectionItem);
    fn edit(&mut self, item: &CollectionItem);
    fn delete(&mut self, item: &CollectionItem);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListController {
    columns: Vec<ColumnSpec>,
    filters: Vec<FilterDescriptor>,
    search: String,
    items: Vec<CollectionItem>,
    keys: Vec<RowKey>,
    view: Vec<usize>,
    sort: Option<SortSpec>,
    selected: BTreeSet<RowKey>,
}

impl ListController {
    pub fn new(columns: Vec<ColumnSpec>, filters: Vec<FilterSpec>) -> Self {
        Self {
            columns,
            filters: filters.into_iter().map(FilterDescriptor::from_spec).collect(),
            search: String::new(),
            items: Vec::new(),
            keys: Vec::new(),
            view: Vec::new(),
            sort: None,
            selected: BTreeSet::new(),
        }
    }

    pub fn for_resource(kind: ResourceKind) -> Self {
        Self::new(kind.columns(), kind.filters())
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn items(&self) -> &[CollectionItem] {
        &self.items
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn filter_descriptors(&self) -> &[FilterDescriptor] {
        &self.filters
    }

    pub fn filter(&self, field: &str) -> Option<&FilterDescriptor> {
        self.filters.iter().find(|filter| filter.field == field)
    }

    pub fn set_collection(&mut self, items: Vec<CollectionItem>) {
        self.keys = items
            .iter()
            .enumerate()
            .map(|(position, item)| RowKey::for_item(item, position))
            .collect();
        self.items = items;
        for filter in &mut self.filters {
            filter.values = distinct_values(&self.items, &filter.field);
        }
        let live: BTreeSet<&RowKey> = self.keys.iter().collect();
        self.selected.retain(|key| live.contains(key));
        self.recompute();
    }

    /// Returns whether the term changed.
    pub fn set_search(&mut self, term: &str) -> bool {
        if self.search == term {
            return false;
        }
        self.search = term.to_owned();
        self.recompute();
        true
    }

    /// Returns false when no filter is declared for `field`.
    pub fn select_filter(&mut self, field: &str, selection: FilterSelection) -> bool {
        let Some(filter) = self.filters.iter_mut().find(|filter| filter.field == field) else {
            return false;
        };
        filter.selection = selection;
        self.recompute();
        true
    }

    /// Steps a filter through its options, wrapping around through unset.
    pub fn cycle_filter(&mut self, field: &str, delta: isize) -> Option<FilterSelection> {
        let filter = self.filters.iter().find(|filter| filter.field == field)?;
        let options = filter.options();
        let current = options
            .iter()
            .position(|option| option.selection == filter.selection)
            .unwrap_or(0) as isize;
        let len = options.len() as isize;
        let next = options[(current + delta).rem_euclid(len) as usize]
            .selection
            .clone();
        self.select_filter(field, next.clone());
        Some(next)
    }

    pub fn clear_filters(&mut self) {
        for filter in &mut self.filters {
            filter.selection = FilterSelection::Unset;
        }
        self.recompute();
    }

    pub fn visible(&self) -> Vec<&CollectionItem> {
        self.view.iter().map(|index| &self.items[*index]).collect()
    }

    pub fn visible_len(&self) -> usize {
        self.view.len()
    }

    pub fn row(&self, row: usize) -> Option<&CollectionItem> {
        self.view.get(row).map(|index| &self.items[*index])
    }

    pub fn row_key(&self, row: usize) -> Option<&RowKey> {
        self.view.get(row).map(|index| &self.keys[*index])
    }

    /// Flips the selection of a visible row; returns the new state.
    pub fn toggle_selected(&mut self, row: usize) -> Option<bool> {
        let key = self.row_key(row)?.clone();
        if self.selected.remove(&key) {
            Some(false)
        } else {
            self.selected.insert(key);
            Some(true)
        }
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.row_key(row)
            .map(|key| self.selected.contains(key))
            .unwrap_or(false)
    }

    pub fn select_all_visible(&mut self) {
        for index in &self.view {
            self.selected.insert(self.keys[*index].clone());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn selection_len(&self) -> usize {
        self.selected.len()
    }

    /// Selected items in source order, visible or not.
    pub fn selected_items(&self) -> Vec<&CollectionItem> {
        self.items
            .iter()
            .zip(&self.keys)
            .filter(|(_, key)| self.selected.contains(*key))
            .map(|(item, _)| item)
            .collect()
    }

    /// Selected items in view order, limited to rows currently visible.
    pub fn selected_visible(&self) -> Vec<&CollectionItem> {
        self.view
            .iter()
            .filter(|index| self.selected.contains(&self.keys[**index]))
            .map(|index| &self.items[*index])
            .collect()
    }

    /// asc -> desc -> none for one column; picking another column restarts at asc.
    pub fn cycle_sort(&mut self, column: usize) -> Option<SortDirection> {
        if column >= self.columns.len() {
            return None;
        }
        self.sort = match self.sort {
            Some(SortSpec {
                column: current,
                direction: SortDirection::Asc,
            }) if current == column => Some(SortSpec {
                column,
                direction: SortDirection::Desc,
            }),
            Some(SortSpec {
                column: current,
                direction: SortDirection::Desc,
            }) if current == column => None,
            _ => Some(SortSpec {
                column,
                direction: SortDirection::Asc,
            }),
        };
        self.recompute();
        self.sort.map(|sort| sort.direction)
    }

    /// Runs a row callback; false when the row is out of range.
    pub fn invoke<H: RowActions + ?Sized>(
        &self,
        action: RowAction,
        row: usize,
        handler: &mut H,
    ) -> bool {
        let Some(item) = self.row(row) else {
            return false;
        };
        match action {
            RowAction::View => handler.view(item),
            RowAction::Edit => handler.edit(item),
            RowAction::Delete => handler.delete(item),
        }
        true
    }

    fn recompute(&mut self) {
        let search_field = self.columns.first().map(|column| column.field.as_str());
        let mut view = visible_indices(&self.items, search_field, &self.search, &self.filters);

        if let Some(sort) = self.sort
            && let Some(column) = self.columns.get(sort.column)
        {
            let field = column.field.as_str();
            view.sort_by(|left, right| {
                let left = self.items[*left].text(field);
                let right = self.items[*right].text(field);
                let (left, right) = (left.trim(), right.trim());
                match (left.is_empty(), right.is_empty()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => match sort.direction {
                        SortDirection::Asc => compare_text(left, right),
                        SortDirection::Desc => compare_text(left, right).reverse(),
                    },
                }
            });
        }

        self.view = view;
    }
}

/// Distinct non-empty trimmed values of `field`, in first-seen order.
pub fn distinct_values(items: &[CollectionItem], field: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut values = Vec::new();
    for item in items {
        let text = item.text(field);
        let trimmed = text.trim();
        if trimmed.is_empty() || !seen.insert(trimmed.to_owned()) {
            continue;
        }
        values.push(trimmed.to_owned());
    }
    values
}

/// Source indices of the items that pass the search and every active filter.
pub fn visible_indices(
    items: &[CollectionItem],
    search_field: Option<&str>,
    search: &str,
    filters: &[FilterDescriptor],
) -> Vec<usize> {
    let needle = search.to_lowercase();
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            needle.is_empty()
                || search_field
                    .map(|field| item.text(field).to_lowercase().contains(&needle))
                    .unwrap_or(false)
        })
        .filter(|(_, item)| filters.iter().all(|filter| filter.matches(item)))
        .map(|(index, _)| index)
        .collect()
}

fn compare_text(left: &str, right: &str) -> Ordering {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(left), Ok(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
        _ => left.to_lowercase().cmp(&right.to_lowercase()),
    }
}
