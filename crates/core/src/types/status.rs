//! Status enums for orders, payment and stock.

use serde::{Deserialize, Serialize};

/// Order lifecycle status as stored by the order backend.
///
/// Orders always enter the backend as `Pending`; later transitions are made
/// by staff in the content studio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        })
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer pays.
///
/// Only cash on delivery is offered; card payment is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "COD")]
    CashOnDelivery,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashOnDelivery => f.write_str("COD"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(Self::CashOnDelivery),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Stock availability shown next to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "remaining", rename_all = "snake_case")]
pub enum StockLevel {
    /// More than [`StockLevel::LOW_STOCK_THRESHOLD`] units on hand.
    InStock,
    /// Only a handful of units left.
    LowStock(u32),
    OutOfStock,
    /// The product record carries no stock count.
    Untracked,
}

impl StockLevel {
    /// Counts at or below this (and above zero) are reported as low stock.
    pub const LOW_STOCK_THRESHOLD: u32 = 10;

    /// Classify an optional stock count.
    #[must_use]
    pub const fn from_count(stock: Option<u32>) -> Self {
        match stock {
            None => Self::Untracked,
            Some(0) => Self::OutOfStock,
            Some(n) if n <= Self::LOW_STOCK_THRESHOLD => Self::LowStock(n),
            Some(_) => Self::InStock,
        }
    }

    /// Whether the product can be added to a cart.
    #[must_use]
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::OutOfStock)
    }

    /// Short shopper-facing label.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::InStock | Self::Untracked => "In Stock".to_string(),
            Self::LowStock(n) => format!("Only {n} left"),
            Self::OutOfStock => "Out of Stock".to_string(),
        }
    }
}
