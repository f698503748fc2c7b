//! Conversions between Sanity documents and core types.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use medpro_core::{
    Money, OrderNumber, OrderRecord, PricingSettings, Product, ProductRef, ShippingCharges,
    TaxSettings,
};

use super::types::{
    AddressDocument, CustomerDocument, OrderDocument, OrderItemDocument, PricingDocument,
    Reference, SanityProduct, SanityStoreSettings,
};

const ORDER_NUMBER_PREFIX: &str = "MP";
const ORDER_SUFFIX_LEN: usize = 6;

/// Why a product document could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSkip {
    MissingTitle,
    MissingPrice,
    NegativePrice,
}

impl std::fmt::Display for ProductSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "missing title"),
            Self::MissingPrice => write!(f, "missing or non-finite price"),
            Self::NegativePrice => write!(f, "negative price"),
        }
    }
}

pub fn convert_product(raw: SanityProduct) -> Result<Product, ProductSkip> {
    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ProductSkip::MissingTitle)?;
    let price = raw
        .price
        .and_then(Money::from_f64)
        .ok_or(ProductSkip::MissingPrice)?;
    if price.is_negative() {
        return Err(ProductSkip::NegativePrice);
    }

    Ok(Product {
        id: ProductRef::new(raw.id),
        title,
        slug: raw.slug.filter(|s| !s.is_empty()),
        price,
        original_price: raw
            .original_price
            .and_then(Money::from_f64)
            .filter(|m| !m.is_negative()),
        stock: raw.stock.and_then(convert_stock),
        images: raw.images.unwrap_or_default().into_iter().flatten().collect(),
        is_featured: raw.is_featured.unwrap_or(false),
        brand: non_blank(raw.brand),
        material: non_blank(raw.material),
        category: non_blank(raw.category),
    })
}

/// Stock counts are authored as plain numbers; negatives mean none left.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn convert_stock(stock: f64) -> Option<u32> {
    if !stock.is_finite() {
        return None;
    }
    Some(stock.clamp(0.0, f64::from(u32::MAX)).floor() as u32)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn convert_settings(raw: SanityStoreSettings) -> PricingSettings {
    let shipping = raw.shipping_charges.map(|s| ShippingCharges {
        free_shipping_threshold: s.free_shipping_threshold.and_then(Money::from_f64),
        fixed_charge: s.fixed_charge.and_then(Money::from_f64),
    });
    let tax = raw.tax_settings.map(|t| TaxSettings {
        tax_percentage: t.tax_percentage.and_then(Decimal::from_f64),
        tax_label: t.tax_label,
    });
    PricingSettings::from_parts(shipping, tax)
}

/// Build the `order` document for a record.
pub fn convert_order(order: &OrderRecord, order_number: &OrderNumber) -> OrderDocument {
    let customer = order.customer();
    let address = order.shipping_address();
    let pricing = order.pricing();

    OrderDocument {
        doc_type: "order",
        order_number: order_number.to_string(),
        customer: CustomerDocument {
            email: customer.email.to_string(),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            phone: customer.phone.clone(),
        },
        shipping_address: AddressDocument {
            address: address.address.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            zip_code: address.zip_code.clone(),
        },
        items: order
            .items()
            .iter()
            .map(|item| OrderItemDocument {
                key: uuid::Uuid::new_v4().simple().to_string(),
                product: Reference {
                    reference: item.product_ref.to_string(),
                    ref_type: "reference",
                },
                quantity: item.quantity,
                price: item.unit_price.amount(),
                total: item.line_total.amount(),
            })
            .collect(),
        payment_method: order.payment_method(),
        status: order.status(),
        pricing: PricingDocument {
            subtotal: pricing.subtotal.amount(),
            shipping: pricing.shipping.amount(),
            tax: pricing.tax.amount(),
            total: pricing.total.amount(),
        },
        notes: order.notes().unwrap_or_default().to_string(),
        order_date: order.order_date(),
    }
}

/// Human-facing order number: `MP-YYYYMMDD-XXXXXX`.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>) -> OrderNumber {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ORDER_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    OrderNumber::new(format!(
        "{ORDER_NUMBER_PREFIX}-{}-{suffix}",
        now.format("%Y%m%d")
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use medpro_core::{CartLedger, CheckoutForm, build_order};

    use super::*;
    use crate::sanity::types::{SanityShippingCharges, SanityTaxSettings};

    fn raw(price: Option<f64>) -> SanityProduct {
        SanityProduct {
            id: "scalpel-10".to_string(),
            title: Some("Scalpel #10".to_string()),
            slug: Some("scalpel-10".to_string()),
            price,
            original_price: Some(19.99),
            stock: Some(4.0),
            images: Some(vec![None, Some("https://cdn.sanity.io/a.jpg".to_string())]),
            is_featured: None,
            brand: Some("  ".to_string()),
            material: None,
            category: Some("Surgical".to_string()),
        }
    }

    #[test]
    fn test_convert_product() {
        let product = convert_product(raw(Some(12.5))).unwrap();
        assert_eq!(product.id.as_str(), "scalpel-10");
        assert_eq!(product.price, Money::from_cents(1_250));
        assert_eq!(product.original_price, Some(Money::from_cents(1_999)));
        assert_eq!(product.stock, Some(4));
        assert_eq!(product.images, vec!["https://cdn.sanity.io/a.jpg".to_string()]);
        assert!(!product.is_featured);
        assert_eq!(product.brand, None);
        assert_eq!(product.brand_or_default(), "MedPro");
    }

    #[test]
    fn test_convert_product_rejects_bad_price() {
        assert_eq!(
            convert_product(raw(None)).unwrap_err(),
            ProductSkip::MissingPrice
        );
        assert_eq!(
            convert_product(raw(Some(-1.0))).unwrap_err(),
            ProductSkip::NegativePrice
        );
    }

    #[test]
    fn test_convert_stock() {
        assert_eq!(convert_stock(3.7), Some(3));
        assert_eq!(convert_stock(-2.0), Some(0));
        assert_eq!(convert_stock(f64::NAN), None);
    }

    #[test]
    fn test_convert_settings_partial() {
        let settings = convert_settings(SanityStoreSettings {
            shipping_charges: Some(SanityShippingCharges {
                free_shipping_threshold: Some(300.0),
                fixed_charge: None,
            }),
            tax_settings: Some(SanityTaxSettings {
                tax_percentage: Some(150.0),
                tax_label: Some("GST".to_string()),
            }),
        });
        assert_eq!(settings.free_shipping_threshold, Money::from_cents(30_000));
        assert_eq!(settings.fixed_shipping_charge, Money::from_cents(2_500));
        assert_eq!(settings.tax_percentage, Decimal::from(8));
        assert_eq!(settings.tax_label, "GST");
    }

    #[test]
    fn test_convert_settings_empty_document() {
        assert_eq!(
            convert_settings(SanityStoreSettings::default()),
            PricingSettings::fallback()
        );
    }

    #[test]
    fn test_convert_order_document() {
        let mut ledger = CartLedger::new();
        let product = convert_product(raw(Some(12.5))).unwrap();
        ledger.add(&product, 2);
        let form = CheckoutForm {
            email: "nurse@clinic.example".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            phone: "555-0100".to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            notes: None,
        };
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap();
        let order = build_order(&ledger, &form, &PricingSettings::fallback(), now).unwrap();

        let doc = convert_order(&order, &OrderNumber::new("MP-20260304-ABC123"));
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["_type"], "order");
        assert_eq!(json["orderNumber"], "MP-20260304-ABC123");
        assert_eq!(json["paymentMethod"], "COD");
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["notes"], "");
        assert_eq!(json["items"][0]["product"]["_ref"], "scalpel-10");
        assert_eq!(json["items"][0]["product"]["_type"], "reference");
        assert_eq!(json["items"][0]["price"], 12.5);
        assert_eq!(json["items"][0]["total"], 25.0);
        assert_eq!(json["pricing"]["subtotal"], 25.0);
        assert_eq!(json["pricing"]["shipping"], 25.0);
        assert_eq!(json["pricing"]["tax"], 2.0);
        assert_eq!(json["pricing"]["total"], 52.0);
        assert_eq!(json["items"][0]["_key"].as_str().unwrap().len(), 32);
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 8, 30, 0).unwrap();
        let number = generate_order_number(now);
        let parts: Vec<&str> = number.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "MP");
        assert_eq!(parts[1], "20261017");
        assert_eq!(parts[2].len(), 6);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }
}
