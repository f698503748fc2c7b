//! MedPro Core - cart, pricing and order assembly.
//!
//! This crate holds the storefront's domain logic:
//! - the cart ledger and its per-shopper session wrapper
//! - shipping and tax policy
//! - assembly of immutable order records from a cart and a checkout form
//! - the traits the storefront implements for its external collaborators
//!
//! # Architecture
//!
//! The core crate contains only types, pure logic and traits - no I/O, no
//! HTTP clients. Persistence and the content backend are reached through the
//! traits in [`store`] and [`sources`].
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails and statuses
//! - [`product`] - Catalog product records
//! - [`ledger`] - Line items and the cart ledger
//! - [`session`] - Cart session with persistence and observers
//! - [`pricing`] - Shipping and tax policy
//! - [`order`] - Checkout form validation and order records
//! - [`store`] - Ledger persistence contract
//! - [`sources`] - Product, settings and order sink contracts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ledger;
pub mod order;
pub mod pricing;
pub mod product;
pub mod session;
pub mod sources;
pub mod store;
pub mod types;

pub use ledger::{CartLedger, LedgerChange, LedgerSnapshot, LineItem};
pub use order::{
    CheckoutForm, Customer, FormField, OrderError, OrderItem, OrderPricing, OrderRecord,
    ShippingAddress, build_order,
};
pub use pricing::{
    PricingSettings, PricingSummary, ShippingCharges, TaxSettings, compute_shipping, compute_tax,
};
pub use product::Product;
pub use session::{CartSession, LedgerEvent, LedgerObserver};
pub use sources::{
    OrderConfirmation, OrderSink, ProductQuery, ProductSource, SettingsSource,
    SettingsUnavailable, SinkError, SourceError, resolve_pricing,
};
pub use store::{LedgerStore, StoreError};
pub use types::*;
