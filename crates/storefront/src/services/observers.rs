//! Ledger observers wired into every cart session.

use medpro_core::{LedgerChange, LedgerEvent, LedgerObserver};

use crate::error::add_breadcrumb;

/// Logs each cart change and records it as a Sentry breadcrumb, so error
/// reports show what the shopper did to their cart beforehand.
#[derive(Debug, Default, Clone, Copy)]
pub struct BreadcrumbObserver;

impl LedgerObserver for BreadcrumbObserver {
    fn ledger_changed(&self, event: &LedgerEvent) {
        let cart_key = event.cart_key.to_string();
        let item_count = event.item_count.to_string();
        let subtotal = event.subtotal.to_string();

        tracing::info!(
            cart_key = %cart_key,
            change = %describe(&event.change),
            item_count = event.item_count,
            subtotal = %subtotal,
            "Cart updated"
        );

        add_breadcrumb(
            "cart",
            &describe(&event.change),
            Some(&[
                ("cart_key", cart_key.as_str()),
                ("item_count", item_count.as_str()),
                ("subtotal", subtotal.as_str()),
            ]),
        );
    }
}

/// Short human description of a change.
#[must_use]
pub fn describe(change: &LedgerChange) -> String {
    match change {
        LedgerChange::Added {
            product_ref,
            quantity,
        } => format!("Added {quantity} x {product_ref}"),
        LedgerChange::QuantityChanged {
            product_ref,
            from,
            to,
        } => format!("Changed {product_ref} from {from} to {to}"),
        LedgerChange::Removed { product_ref } => format!("Removed {product_ref}"),
        LedgerChange::Cleared => "Cleared cart".to_string(),
    }
}
