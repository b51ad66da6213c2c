//! Money rules shared by cart, checkout and payments.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::ServiceError;

/// 18% GST
pub const DEFAULT_TAX_RATE: Decimal = dec!(0.18);
pub const MAX_PAYMENT_AMOUNT: Decimal = dec!(999999999);

/// Rounds to 2 decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
}

impl OrderTotals {
    /// Sums line totals and applies the flat tax rate and service fee.
    pub fn compute<I>(line_totals: I, tax_rate: Decimal, service_fee: Decimal) -> Self
    where
        I: IntoIterator<Item = Decimal>,
    {
        let subtotal = round_money(line_totals.into_iter().sum());
        let tax_amount = round_money(subtotal * tax_rate);
        let service_fee = round_money(service_fee);
        Self {
            subtotal,
            tax_amount,
            service_fee,
            total_amount: subtotal + tax_amount + service_fee,
        }
    }

    /// Totals without tax or fee, used for migrated legacy purchases.
    pub fn untaxed(subtotal: Decimal) -> Self {
        let subtotal = round_money(subtotal);
        Self {
            subtotal,
            tax_amount: Decimal::ZERO,
            service_fee: Decimal::ZERO,
            total_amount: subtotal,
        }
    }
}

pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    round_money(price * Decimal::from(quantity))
}

/// `ORD-YYYYMMDD-XXXXXXXX`
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    format!("ORD-{}-{}", now.format("%Y%m%d"), random_suffix())
}

/// `TXN-YYYYMMDDHHMMSS-XXXXXXXX`
pub fn generate_transaction_id(now: DateTime<Utc>) -> String {
    format!("TXN-{}-{}", now.format("%Y%m%d%H%M%S"), random_suffix())
}

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase()
}

pub fn validate_payment_amount(amount: Decimal) -> Result<Decimal, ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Payment amount must be greater than zero".to_string(),
        ));
    }
    if amount > MAX_PAYMENT_AMOUNT {
        return Err(ServiceError::ValidationError(
            "Payment amount is too large".to_string(),
        ));
    }
    Ok(amount)
}

/// Resolves the amount to refund against what is still refundable.
///
/// `None` refunds the full remaining balance.
pub fn calculate_refund_amount(
    amount: Decimal,
    refunded_amount: Decimal,
    requested: Option<Decimal>,
) -> Result<Decimal, ServiceError> {
    let max_refundable = amount - refunded_amount;
    match requested {
        None => {
            if max_refundable <= Decimal::ZERO {
                return Err(ServiceError::InvalidOperation(
                    "Payment has already been fully refunded".to_string(),
                ));
            }
            Ok(max_refundable)
        }
        Some(requested) if requested <= Decimal::ZERO => Err(ServiceError::ValidationError(
            "Refund amount must be greater than zero".to_string(),
        )),
        Some(requested) if requested > max_refundable => {
            Err(ServiceError::ValidationError(format!(
                "Refund amount exceeds available balance. Max refundable: {}",
                max_refundable
            )))
        }
        Some(requested) => Ok(requested),
    }
}

/// Formats an amount as `Rs. 1,234.56`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!(
        "Rs. {}{}.{}",
        if negative { "-" } else { "" },
        grouped,
        fraction
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn totals_apply_flat_tax() {
        let totals = OrderTotals::compute(
            vec![dec!(100.00), dec!(250.50)],
            DEFAULT_TAX_RATE,
            Decimal::ZERO,
        );
        assert_eq!(totals.subtotal, dec!(350.50));
        assert_eq!(totals.tax_amount, dec!(63.09));
        assert_eq!(totals.service_fee, Decimal::ZERO);
        assert_eq!(totals.total_amount, dec!(413.59));
    }

    #[test]
    fn tax_rounds_half_up() {
        // 0.25 * 0.18 = 0.045
        let totals = OrderTotals::compute(vec![dec!(0.25)], DEFAULT_TAX_RATE, Decimal::ZERO);
        assert_eq!(totals.tax_amount, dec!(0.05));
        assert_eq!(totals.total_amount, dec!(0.30));
    }

    #[test]
    fn untaxed_totals_equal_subtotal() {
        let totals = OrderTotals::untaxed(dec!(499.999));
        assert_eq!(totals.subtotal, dec!(500.00));
        assert_eq!(totals.total_amount, dec!(500.00));
        assert_eq!(totals.tax_amount, Decimal::ZERO);
    }

    #[test]
    fn identifiers_follow_format() {
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 3, 9, 14, 5, 7).unwrap();

        let order_number = generate_order_number(now);
        assert!(order_number.starts_with("ORD-20240309-"));
        let suffix = &order_number["ORD-20240309-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));

        let txn = generate_transaction_id(now);
        assert!(txn.starts_with("TXN-20240309140507-"));
        assert_eq!(txn.len(), "TXN-20240309140507-".len() + 8);
    }

    #[test]
    fn payment_amount_bounds() {
        assert!(validate_payment_amount(dec!(0)).is_err());
        assert!(validate_payment_amount(dec!(-5)).is_err());
        assert!(validate_payment_amount(dec!(1000000000)).is_err());
        assert_eq!(validate_payment_amount(dec!(999999999)).unwrap(), dec!(999999999));
    }

    #[test]
    fn refund_amount_rules() {
        assert_eq!(
            calculate_refund_amount(dec!(100), dec!(30), None).unwrap(),
            dec!(70)
        );
        assert_eq!(
            calculate_refund_amount(dec!(100), dec!(30), Some(dec!(20))).unwrap(),
            dec!(20)
        );
        assert!(calculate_refund_amount(dec!(100), dec!(30), Some(dec!(71))).is_err());
        assert!(calculate_refund_amount(dec!(100), dec!(30), Some(dec!(0))).is_err());
        assert!(calculate_refund_amount(dec!(100), dec!(100), None).is_err());
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(dec!(1234.56)), "Rs. 1,234.56");
        assert_eq!(format_currency(dec!(0)), "Rs. 0.00");
        assert_eq!(format_currency(dec!(999)), "Rs. 999.00");
        assert_eq!(format_currency(dec!(1234567.891)), "Rs. 1,234,567.89");
        assert_eq!(format_currency(dec!(-1500)), "Rs. -1,500.00");
    }

    proptest! {
        #[test]
        fn total_is_subtotal_plus_tax(cents in proptest::collection::vec(1i64..10_000_000, 1..10)) {
            let lines: Vec<Decimal> = cents.iter().map(|c| Decimal::new(*c, 2)).collect();
            let totals = OrderTotals::compute(lines.clone(), DEFAULT_TAX_RATE, Decimal::ZERO);
            let subtotal: Decimal = lines.iter().copied().sum();
            prop_assert_eq!(totals.subtotal, subtotal);
            prop_assert_eq!(totals.tax_amount, round_money(subtotal * DEFAULT_TAX_RATE));
            prop_assert_eq!(totals.total_amount, totals.subtotal + totals.tax_amount);
            prop_assert!(totals.total_amount.scale() <= 2);
        }
    }
}
