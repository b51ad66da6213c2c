use factory_infohub::services::{
    pricing::{calculate_refund_amount, format_currency, round_money, OrderTotals},
    slug::{next_free_slug, slugify},
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

proptest! {
    #[test]
    fn refunds_never_exceed_the_payment(
        amount_cents in 1i64..100_000_000,
        refunded_pct in 0u32..=100,
        requested_cents in proptest::option::of(1i64..200_000_000),
    ) {
        let amount = Decimal::new(amount_cents, 2);
        let refunded = round_money(amount * Decimal::from(refunded_pct) / dec!(100));
        let requested = requested_cents.map(|c| Decimal::new(c, 2));

        if let Ok(refund) = calculate_refund_amount(amount, refunded, requested) {
            prop_assert!(refund > Decimal::ZERO);
            prop_assert!(refunded + refund <= amount);
        }
    }

    #[test]
    fn totals_are_rounded_and_consistent(
        lines in proptest::collection::vec(1i64..50_000_000, 1..20),
        fee_cents in 0i64..100_000,
    ) {
        let totals = OrderTotals::compute(
            lines.iter().map(|c| Decimal::new(*c, 2)),
            dec!(0.18),
            Decimal::new(fee_cents, 2),
        );
        prop_assert_eq!(totals.tax_amount, round_money(totals.tax_amount));
        prop_assert_eq!(
            totals.total_amount,
            totals.subtotal + totals.tax_amount + totals.service_fee
        );
        prop_assert!(totals.tax_amount <= totals.subtotal);
    }

    #[test]
    fn currency_always_shows_two_decimals(cents in 0i64..1_000_000_000_000) {
        let text = format_currency(Decimal::new(cents, 2));
        prop_assert!(text.starts_with("Rs. "));
        let (_, fraction) = text.rsplit_once('.').unwrap();
        prop_assert_eq!(fraction.len(), 2);
    }

    #[test]
    fn slugs_are_url_safe(name in "\\PC{0,60}") {
        let slug = slugify(&name);
        prop_assert!(!slug.is_empty());
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
    }

    #[test]
    fn numbered_slugs_avoid_every_taken_value(taken_count in 0usize..15) {
        let mut taken: HashSet<String> = HashSet::new();
        taken.insert("mill".to_string());
        for i in 1..taken_count {
            taken.insert(format!("mill-{i}"));
        }
        let slug = next_free_slug("mill", |candidate| taken.contains(candidate));
        prop_assert!(!taken.contains(&slug));
    }
}
