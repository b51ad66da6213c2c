//! Plain-text email bodies.

use rust_decimal::Decimal;

use super::EmailMessage;
use crate::entities::commerce::{order, order_item};
use crate::services::pricing::format_currency;

const SIGN_OFF: &str = "Best regards,\nFactory InfoHub Team";
const NOT_SPECIFIED: &str = "Not specified";

/// Factory fields rendered into a details email. Empty fields print as "Not specified".
#[derive(Debug, Clone, Default)]
pub struct FactoryDetails {
    pub name: String,
    pub category: String,
    pub location: String,
    pub factory_type: String,
    pub production_capacity: String,
    pub employee_count: Option<i32>,
    pub established_year: Option<i32>,
    pub annual_turnover: Option<Decimal>,
    pub contact_person: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub website: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
}

fn or_unspecified(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_SPECIFIED
    } else {
        value
    }
}

fn opt_or_unspecified<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn order_confirmation(
    order: &order::Model,
    items: &[order_item::Model],
    tax_rate: Decimal,
) -> EmailMessage {
    let subject = format!("Order Confirmation - {}", order.order_number);

    let mut body = format!("Order Confirmation - {}\n\n", order.order_number);
    body.push_str(&format!("Dear {},\n\n", order.customer_name));
    body.push_str("Thank you for your order! We're pleased to confirm your purchase.\n\n");
    body.push_str("Order Details:\n");
    body.push_str(&format!("Order Number: {}\n", order.order_number));
    body.push_str(&format!(
        "Date: {}\n\n",
        order.created_at.format("%B %d, %Y")
    ));

    body.push_str("Items:\n");
    for item in items {
        body.push_str(&format!("- {} x{}\n", item.factory_name, item.quantity));
        body.push_str(&format!(
            "  Price: {}\n",
            format_currency(item.price_at_purchase)
        ));
        body.push_str(&format!("  Total: {}\n\n", format_currency(item.total_price)));
    }

    let tax_percent = (tax_rate * Decimal::ONE_HUNDRED).normalize();
    body.push_str(&format!("Subtotal: {}\n", format_currency(order.subtotal)));
    body.push_str(&format!(
        "Tax ({}%): {}\n",
        tax_percent,
        format_currency(order.tax_amount)
    ));
    body.push_str(&format!(
        "Service Fee: {}\n",
        format_currency(order.service_fee)
    ));
    body.push_str(&format!(
        "Total Amount: {}\n\n",
        format_currency(order.total_amount)
    ));
    body.push_str(&format!(
        "Payment Status: {}\n",
        title_case(&order.payment_status.to_string())
    ));
    body.push_str(&format!(
        "Order Status: {}\n\n",
        title_case(&order.status.to_string())
    ));
    body.push_str("Factory details will be sent to your email shortly.\n\n");
    body.push_str(SIGN_OFF);

    EmailMessage {
        to: order.customer_email.clone(),
        subject,
        body,
    }
}

/// Subject for a details email. Bulk emails name the factory count and order.
pub fn factory_details_subject(
    factories: &[FactoryDetails],
    order_number: Option<&str>,
    is_bulk: bool,
) -> String {
    if is_bulk {
        match order_number {
            Some(number) => format!(
                "Factory Details - {} Factory(ies) - Order {}",
                factories.len(),
                number
            ),
            None => format!("Factory Details - {} Factory(ies)", factories.len()),
        }
    } else {
        let name = factories.first().map(|f| f.name.as_str()).unwrap_or("");
        format!("Factory Details: {}", name)
    }
}

pub fn factory_details_body(
    user_name: &str,
    factories: &[FactoryDetails],
    order_number: Option<&str>,
    is_bulk: bool,
) -> String {
    let mut body = format!("Factory Details - {}\n\n", user_name);
    if let Some(number) = order_number {
        body.push_str(&format!("Order Number: {}\n\n", number));
    }
    if is_bulk {
        body.push_str(&format!("Total Factories: {}\n\n", factories.len()));
    }

    for (i, factory) in factories.iter().enumerate() {
        body.push_str(&format!("--- Factory {}: {} ---\n", i + 1, factory.name));
        body.push_str(&format!("Category: {}\n", or_unspecified(&factory.category)));
        body.push_str(&format!("Location: {}\n", or_unspecified(&factory.location)));
        body.push_str(&format!("Type: {}\n", or_unspecified(&factory.factory_type)));
        body.push_str(&format!(
            "Production Capacity: {}\n",
            or_unspecified(&factory.production_capacity)
        ));
        body.push_str(&format!(
            "Employee Count: {}\n",
            opt_or_unspecified(factory.employee_count)
        ));
        body.push_str(&format!(
            "Established: {}\n",
            opt_or_unspecified(factory.established_year)
        ));
        body.push_str(&format!(
            "Annual Turnover: {}\n\n",
            factory
                .annual_turnover
                .map(format_currency)
                .unwrap_or_else(|| NOT_SPECIFIED.to_string())
        ));

        body.push_str("Contact Information:\n");
        body.push_str(&format!(
            "Contact Person: {}\n",
            or_unspecified(&factory.contact_person)
        ));
        body.push_str(&format!("Phone: {}\n", or_unspecified(&factory.contact_phone)));
        body.push_str(&format!("Email: {}\n", or_unspecified(&factory.contact_email)));
        body.push_str(&format!("Website: {}\n\n", or_unspecified(&factory.website)));

        body.push_str("Address:\n");
        body.push_str(&format!("{}\n", factory.address));
        body.push_str(&format!(
            "{}, {} - {}\n",
            factory.city, factory.state, factory.pincode
        ));
        body.push_str(&format!("{}\n\n", factory.country));
    }

    body.push_str("This information is confidential and intended solely for your use.\n\n");
    body.push_str(SIGN_OFF);
    body
}

pub fn factory_details(
    to: &str,
    user_name: &str,
    factories: &[FactoryDetails],
    order_number: Option<&str>,
) -> EmailMessage {
    let is_bulk = factories.len() > 1 || order_number.is_some();
    EmailMessage {
        to: to.to_string(),
        subject: factory_details_subject(factories, order_number, is_bulk),
        body: factory_details_body(user_name, factories, order_number, is_bulk),
    }
}

/// Carries the raw reset token; only its digest is stored.
pub fn password_reset(to: &str, username: &str, token: &str, valid_minutes: i64) -> EmailMessage {
    let mut body = format!("Hello {},\n\n", username);
    body.push_str("We received a request to reset your Factory InfoHub password.\n\n");
    body.push_str(&format!("Reset token: {}\n\n", token));
    body.push_str(&format!(
        "The token can be used once and expires in {} minutes.\n",
        valid_minutes
    ));
    body.push_str("If you did not ask for a reset, you can ignore this email.\n\n");
    body.push_str(SIGN_OFF);
    EmailMessage {
        to: to.to_string(),
        subject: "Password Reset - Factory InfoHub".to_string(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::commerce::order::OrderStatus;
    use crate::entities::commerce::payment::PaymentStatus;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_order() -> order::Model {
        let created = Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap();
        order::Model {
            id: Uuid::new_v4(),
            order_number: "ORD-20240502-AB12CD34".into(),
            user_id: Uuid::new_v4(),
            customer_name: "Asha Rao".into(),
            customer_email: "asha@example.com".into(),
            customer_phone: String::new(),
            subtotal: dec!(1500.00),
            tax_amount: dec!(270.00),
            service_fee: dec!(0.00),
            total_amount: dec!(1770.00),
            status: OrderStatus::Completed,
            payment_status: PaymentStatus::Completed,
            payment_method: "upi".into(),
            notes: String::new(),
            tracking_number: None,
            migrated_from_purchase: false,
            created_at: created,
            updated_at: created,
            completed_at: Some(created),
        }
    }

    #[test]
    fn order_confirmation_lists_items_and_totals() {
        let order = sample_order();
        let items = vec![order_item::Model {
            id: Uuid::new_v4(),
            order_id: order.id,
            factory_id: Some(Uuid::new_v4()),
            factory_name: "Pune Steel Works".into(),
            quantity: 3,
            price_at_purchase: dec!(500.00),
            total_price: dec!(1500.00),
            created_at: order.created_at,
        }];

        let message = order_confirmation(&order, &items, dec!(0.18));
        let body = message.body;
        assert_eq!(message.to, "asha@example.com");
        assert_eq!(message.subject, "Order Confirmation - ORD-20240502-AB12CD34");
        assert!(body.contains("Dear Asha Rao,"));
        assert!(body.contains("Date: May 02, 2024"));
        assert!(body.contains("- Pune Steel Works x3\n  Price: Rs. 500.00\n  Total: Rs. 1,500.00"));
        assert!(body.contains("Tax (18%): Rs. 270.00"));
        assert!(body.contains("Total Amount: Rs. 1,770.00"));
        assert!(body.contains("Payment Status: Completed"));
        assert!(body.ends_with("Best regards,\nFactory InfoHub Team"));
    }

    #[test]
    fn bulk_subject_names_count_and_order() {
        let factories = vec![
            FactoryDetails {
                name: "A".into(),
                ..Default::default()
            },
            FactoryDetails {
                name: "B".into(),
                ..Default::default()
            },
        ];
        assert_eq!(
            factory_details_subject(&factories, Some("ORD-1"), true),
            "Factory Details - 2 Factory(ies) - Order ORD-1"
        );
        assert_eq!(
            factory_details_subject(&factories[..1], None, false),
            "Factory Details: A"
        );
    }

    #[test]
    fn missing_fields_print_not_specified() {
        let factories = vec![FactoryDetails {
            name: "Kanpur Leather".into(),
            city: "Kanpur".into(),
            state: "Uttar Pradesh".into(),
            pincode: "208001".into(),
            country: "India".into(),
            ..Default::default()
        }];
        let message = factory_details("buyer@example.com", "buyer", &factories, None);

        assert_eq!(message.subject, "Factory Details: Kanpur Leather");
        assert!(message.body.contains("--- Factory 1: Kanpur Leather ---"));
        assert!(message.body.contains("Type: Not specified"));
        assert!(message.body.contains("Employee Count: Not specified"));
        assert!(message.body.contains("Kanpur, Uttar Pradesh - 208001"));
        assert!(message
            .body
            .contains("This information is confidential and intended solely for your use."));
    }

    #[test]
    fn password_reset_names_the_token_and_expiry() {
        let message = password_reset("asha@example.com", "asha", "Ab12Cd34", 60);
        assert_eq!(message.subject, "Password Reset - Factory InfoHub");
        assert!(message.body.starts_with("Hello asha,"));
        assert!(message.body.contains("Reset token: Ab12Cd34\n"));
        assert!(message.body.contains("expires in 60 minutes"));
    }
}
