//! The cart ledger: line items, quantities and derived totals.
//!
//! The ledger is a plain in-memory value. Persistence and observer
//! notification are layered on top by [`crate::CartSession`]; every mutation
//! here reports what changed so that layer knows whether to act.

use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::{Money, ProductRef};

/// One product/quantity pair in the cart.
///
/// `unit_price` and `stock` are captured from the product record when the
/// line is first created, so the price a shopper saw is the price they order
/// at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_ref: ProductRef,
    pub title: String,
    pub unit_price: Money,
    /// Always at least 1 while the line is in a ledger.
    pub quantity: u32,
    /// Stock on hand when the line was added; caps quantity updates.
    pub stock: Option<u32>,
    pub image: Option<String>,
}

impl LineItem {
    /// Start a line for `product` with the given quantity.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_ref: product.id.clone(),
            title: product.title.clone(),
            unit_price: product.price,
            quantity,
            stock: product.stock,
            image: product.primary_image().map(str::to_owned),
        }
    }

    /// `unit_price * quantity`, unrounded.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// The persisted form of a ledger: its lines, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerSnapshot(Vec<LineItem>);

impl LedgerSnapshot {
    /// Wrap a sequence of lines.
    #[must_use]
    pub const fn new(lines: Vec<LineItem>) -> Self {
        Self(lines)
    }

    /// The lines in ledger order.
    #[must_use]
    pub fn lines(&self) -> &[LineItem] {
        &self.0
    }

    /// Consume the snapshot.
    #[must_use]
    pub fn into_lines(self) -> Vec<LineItem> {
        self.0
    }
}

/// What a ledger mutation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerChange {
    /// A new line was appended.
    Added {
        product_ref: ProductRef,
        quantity: u32,
    },
    /// An existing line's quantity changed.
    QuantityChanged {
        product_ref: ProductRef,
        from: u32,
        to: u32,
    },
    /// A line was removed.
    Removed { product_ref: ProductRef },
    /// Every line was removed.
    Cleared,
}

/// Ordered cart contents, unique by product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartLedger {
    lines: Vec<LineItem>,
}

impl CartLedger {
    /// An empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Rebuild a ledger from a stored snapshot.
    ///
    /// Zero-quantity lines are dropped and duplicate products are merged
    /// into the first occurrence, so a damaged snapshot still yields a ledger
    /// that honors its invariants.
    #[must_use]
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new();
        for line in snapshot.into_lines() {
            if line.quantity == 0 {
                continue;
            }
            match ledger.position(&line.product_ref) {
                Some(idx) => {
                    if let Some(existing) = ledger.lines.get_mut(idx) {
                        existing.quantity = existing.quantity.saturating_add(line.quantity);
                    }
                }
                None => ledger.lines.push(line),
            }
        }
        ledger
    }

    /// Copy the current lines out for persistence.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::new(self.lines.clone())
    }

    /// Add `quantity` units of `product`.
    ///
    /// Accumulates onto an existing line for the same product. The line
    /// never grows past the stock captured for it; a zero quantity, or an
    /// add with no stock left, is a no-op.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Option<LedgerChange> {
        if quantity == 0 {
            return None;
        }

        if let Some(line) = self.line_mut(&product.id) {
            let from = line.quantity;
            let to = cap_to_stock(from.saturating_add(quantity), line.stock);
            if to <= from {
                return None;
            }
            line.quantity = to;
            return Some(LedgerChange::QuantityChanged {
                product_ref: product.id.clone(),
                from,
                to,
            });
        }

        let quantity = cap_to_stock(quantity, product.stock);
        if quantity == 0 {
            return None;
        }
        self.lines.push(LineItem::from_product(product, quantity));
        Some(LedgerChange::Added {
            product_ref: product.id.clone(),
            quantity,
        })
    }

    /// Set a line's quantity.
    ///
    /// A quantity of zero or less removes the line. Requests above the
    /// captured stock count are clamped to it. Unknown products are ignored.
    pub fn update_quantity(
        &mut self,
        product_ref: &ProductRef,
        new_quantity: i64,
    ) -> Option<LedgerChange> {
        if new_quantity <= 0 {
            return self.remove(product_ref);
        }

        let line = self.line_mut(product_ref)?;
        let to = cap_to_stock(u32::try_from(new_quantity).unwrap_or(u32::MAX), line.stock);
        if to == 0 {
            return self.remove(product_ref);
        }

        let from = line.quantity;
        if from == to {
            return None;
        }
        line.quantity = to;
        Some(LedgerChange::QuantityChanged {
            product_ref: product_ref.clone(),
            from,
            to,
        })
    }

    /// Remove a line. Removing an absent product is a no-op.
    pub fn remove(&mut self, product_ref: &ProductRef) -> Option<LedgerChange> {
        let idx = self.position(product_ref)?;
        self.lines.remove(idx);
        Some(LedgerChange::Removed {
            product_ref: product_ref.clone(),
        })
    }

    /// Remove every line.
    pub fn clear(&mut self) -> Option<LedgerChange> {
        if self.lines.is_empty() {
            return None;
        }
        self.lines.clear();
        Some(LedgerChange::Cleared)
    }

    /// Sum of `unit_price * quantity` over all lines, computed on each call.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(LineItem::line_total).sum()
    }

    /// Total units across all lines (not the number of lines).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// The lines in the order they were added.
    #[must_use]
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// The line for `product_ref`, if present.
    #[must_use]
    pub fn line(&self, product_ref: &ProductRef) -> Option<&LineItem> {
        self.lines.iter().find(|line| &line.product_ref == product_ref)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn position(&self, product_ref: &ProductRef) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| &line.product_ref == product_ref)
    }

    fn line_mut(&mut self, product_ref: &ProductRef) -> Option<&mut LineItem> {
        self.lines
            .iter_mut()
            .find(|line| &line.product_ref == product_ref)
    }
}

fn cap_to_stock(quantity: u32, stock: Option<u32>) -> u32 {
    stock.map_or(quantity, |stock| quantity.min(stock))
}
