//! In-progress item list of one quotation being assembled.

use crate::error::{QuoteError, Result};
use crate::quotation::{LineItem, Totals};

/// Items collected so far plus the index of the item being edited, if any.
/// Owned by the caller; nothing here is global.
#[derive(Debug, Clone, Default)]
pub struct QuoteSession {
    items: Vec<LineItem>,
    editing: Option<usize>,
}

fn check_item(item: &LineItem) -> Result<()> {
    let mut errors = Vec::new();
    if item.descricao.trim().is_empty() {
        errors.push("description is empty".to_string());
    }
    if !(item.quantidade_kg > 0.0) {
        errors.push(format!("quantity must be > 0, got {}", item.quantidade_kg));
    }
    if !(item.valor_kg > 0.0) {
        errors.push(format!("unit price must be > 0, got {}", item.valor_kg));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(QuoteError::InvalidQuotation(errors))
    }
}

impl QuoteSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add_item(&mut self, item: LineItem) -> Result<usize> {
        check_item(&item)?;
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    /// Mark `index` as being edited and return the current values.
    pub fn begin_edit(&mut self, index: usize) -> Option<&LineItem> {
        let item = self.items.get(index)?;
        self.editing = Some(index);
        Some(item)
    }

    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    /// Replace the item under edit and leave edit mode.
    pub fn update_item(&mut self, item: LineItem) -> Result<()> {
        let index = self
            .editing
            .filter(|&i| i < self.items.len())
            .ok_or_else(|| QuoteError::InvalidQuotation(vec!["no item is being edited".into()]))?;
        check_item(&item)?;
        self.items[index] = item;
        self.editing = None;
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Remove and return the item at `index`. An edit in progress follows
    /// its item, or ends when that item is removed.
    pub fn remove_item(&mut self, index: usize) -> Option<LineItem> {
        if index >= self.items.len() {
            return None;
        }
        self.editing = match self.editing {
            Some(e) if e == index => None,
            Some(e) if e > index => Some(e - 1),
            other => other,
        };
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.editing = None;
    }

    /// Sum of quantity x unit price over the current items.
    pub fn goods_total(&self) -> f64 {
        Totals::compute(&self.items, 0.0, 0.0).valor_mercadoria
    }

    /// Hand the collected items over, leaving the session empty.
    pub fn take_items(&mut self) -> Vec<LineItem> {
        self.editing = None;
        std::mem::take(&mut self.items)
    }
}
