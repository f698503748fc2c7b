//! Order assembly: turning a cart and a checkout form into an order record.
//!
//! [`build_order`] validates everything up front and either returns a
//! complete [`OrderRecord`] or a specific [`OrderError`]; it never produces a
//! partial order. Building a record has no side effects: the caller submits
//! it and clears the cart once the backend has accepted it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::CartLedger;
use crate::pricing::{PricingSettings, PricingSummary};
use crate::types::{Email, EmailError, Money, OrderStatus, PaymentMethod, ProductRef};

/// Raw checkout form input, keyed like the storefront form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub notes: Option<String>,
}

/// A required checkout form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Email,
    FirstName,
    LastName,
    Phone,
    Address,
    City,
    State,
    ZipCode,
}

impl FormField {
    /// The form key, as the shopper-facing form names it.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::City => "city",
            Self::State => "state",
            Self::ZipCode => "zipCode",
        }
    }
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Why an order could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A line's product has no usable identifier.
    #[error("product ID not found for item {index}: {title}")]
    MissingProductIdentifier {
        /// Position of the offending line in the cart.
        index: usize,
        /// Title of the offending line, for the shopper-facing message.
        title: String,
    },

    /// A required form field is blank.
    #[error("missing required field: {field}")]
    IncompleteForm {
        /// The first blank field, in form order.
        field: FormField,
    },

    /// The email field is filled in but malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Who placed the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Where the order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// One ordered product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_ref: ProductRef,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// Exactly `unit_price * quantity`.
    pub line_total: Money,
}

/// Money breakdown of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPricing {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

/// An order ready for submission. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    customer: Customer,
    shipping_address: ShippingAddress,
    items: Vec<OrderItem>,
    payment_method: PaymentMethod,
    status: OrderStatus,
    pricing: OrderPricing,
    notes: Option<String>,
    order_date: DateTime<Utc>,
}

impl OrderRecord {
    #[must_use]
    pub const fn customer(&self) -> &Customer {
        &self.customer
    }

    #[must_use]
    pub const fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    #[must_use]
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    #[must_use]
    pub const fn pricing(&self) -> &OrderPricing {
        &self.pricing
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    #[must_use]
    pub const fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }
}

/// Build an order from the cart, the checkout form and pricing settings.
///
/// Checks run in a fixed order: empty cart, product identifiers, then form
/// fields in form order, then email syntax.
///
/// # Errors
///
/// Returns the first [`OrderError`] encountered; nothing is built in that case.
pub fn build_order(
    ledger: &CartLedger,
    form: &CheckoutForm,
    settings: &PricingSettings,
    now: DateTime<Utc>,
) -> Result<OrderRecord, OrderError> {
    if ledger.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    if let Some((index, line)) = ledger
        .lines()
        .iter()
        .enumerate()
        .find(|(_, line)| line.product_ref.is_blank())
    {
        return Err(OrderError::MissingProductIdentifier {
            index,
            title: line.title.clone(),
        });
    }

    let required = [
        (FormField::Email, &form.email),
        (FormField::FirstName, &form.first_name),
        (FormField::LastName, &form.last_name),
        (FormField::Phone, &form.phone),
        (FormField::Address, &form.address),
        (FormField::City, &form.city),
        (FormField::State, &form.state),
        (FormField::ZipCode, &form.zip_code),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(OrderError::IncompleteForm { field: *field });
    }
    let email = Email::parse(&form.email)?;

    let items: Vec<OrderItem> = ledger
        .lines()
        .iter()
        .map(|line| OrderItem {
            product_ref: line.product_ref.clone(),
            title: line.title.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total(),
        })
        .collect();

    let subtotal: Money = items.iter().map(|item| item.line_total).sum();
    let summary = PricingSummary::compute(subtotal, settings);

    Ok(OrderRecord {
        customer: Customer {
            email,
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            phone: form.phone.trim().to_string(),
        },
        shipping_address: ShippingAddress {
            address: form.address.trim().to_string(),
            city: form.city.trim().to_string(),
            state: form.state.trim().to_string(),
            zip_code: form.zip_code.trim().to_string(),
        },
        items,
        payment_method: PaymentMethod::CashOnDelivery,
        status: OrderStatus::Pending,
        pricing: OrderPricing {
            subtotal: summary.subtotal,
            shipping: summary.shipping,
            tax: summary.tax,
            total: summary.total,
        },
        notes: form
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_owned),
        order_date: now,
    })
}
