//! # Validation Module
//!
//! Input checks that run before the cart or an order changes.
//!
//! ## Where Each Check Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product page "Add to cart"                                            │
//! │  └── validate_add_quantity(product, in_cart, n)                        │
//! │        inactive → ProductUnavailable                                   │
//! │        stock 0  → OutOfStock                                           │
//! │        n > available_to_add → InsufficientStock                        │
//! │                                                                         │
//! │  Checkout form submit                                                  │
//! │  └── validate_checkout_form(form)                                      │
//! │        name, email (@), phone, street, city, province, postal code     │
//! │                                                                         │
//! │  SQLite CHECK / NOT NULL constraints back these up at write time       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::pricing::MAX_DISCOUNT_PERCENTAGE;
use crate::types::{CheckoutForm, Product};

pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantities must be at least 1.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

pub fn validate_discount_percentage(percent: i64) -> ValidationResult<u8> {
    if !(0..=MAX_DISCOUNT_PERCENTAGE as i64).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: "discount_percentage".to_string(),
            min: 0,
            max: MAX_DISCOUNT_PERCENTAGE as i64,
        });
    }
    Ok(percent as u8)
}

/// Checks that `requested` more units of `product` fit alongside the
/// `in_cart` units already there.
///
/// ```rust
/// use pharmaline_core::money::Money;
/// use pharmaline_core::types::Product;
/// use pharmaline_core::validation::validate_add_quantity;
///
/// let p = Product::new("p1", "CETI-10", "Cetirizine 10mg", Money::from_centavos(900))
///     .with_stock(10)
///     .with_max_order_quantity(3);
/// assert!(validate_add_quantity(&p, 1, 2).is_ok());
/// assert!(validate_add_quantity(&p, 1, 3).is_err());
/// ```
pub fn validate_add_quantity(product: &Product, in_cart: i64, requested: i64) -> ValidationResult<()> {
    validate_quantity(requested)?;

    if !product.is_active {
        return Err(ValidationError::ProductUnavailable {
            sku: product.sku.clone(),
        });
    }

    if !product.is_in_stock() {
        return Err(ValidationError::OutOfStock {
            sku: product.sku.clone(),
        });
    }

    let remaining_stock = product.stock_quantity - in_cart;
    let cap = product.max_order_quantity.unwrap_or(product.stock_quantity);
    let available = remaining_stock.min(cap).max(0);

    if requested > available {
        return Err(ValidationError::InsufficientStock {
            sku: product.sku.clone(),
            available,
            requested,
        });
    }

    Ok(())
}

/// Checks a line's new absolute quantity against the product limits.
pub fn validate_line_quantity(product: &Product, quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Ok(());
    }
    let limit = product.purchase_limit();
    if quantity > limit {
        return Err(ValidationError::InsufficientStock {
            sku: product.sku.clone(),
            available: limit,
            requested: quantity,
        });
    }
    Ok(())
}

// =============================================================================
// Checkout Form
// =============================================================================

/// Checks every required checkout field, reporting the first failure.
pub fn validate_checkout_form(form: &CheckoutForm) -> ValidationResult<()> {
    require("customer_name", &form.customer_name)?;
    validate_email(&form.customer_email)?;
    require("customer_phone", &form.customer_phone)?;

    let address = &form.shipping_address;
    require("address_line1", &address.address_line1)?;
    require("city", &address.city)?;
    require("province", &address.province)?;
    require("postal_code", &address.postal_code)?;

    if let Some(notes) = &form.notes {
        if notes.chars().count() > 1000 {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: 1000,
            });
        }
    }

    Ok(())
}

pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::required("customer_email"));
    }
    if !email.contains('@') {
        return Err(ValidationError::InvalidFormat {
            field: "customer_email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }
    Ok(())
}

fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
