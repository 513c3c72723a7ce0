use uuid::Uuid;

use super::{error::ApiError, form::OrderForm, schema::Order};
use crate::constants::CASH_ON_DELIVERY;

/// Money is kept in `f64` like the rest of the catalog, but totals are settled in whole cents.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.).round() / 100.
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A validated checkout. Client supplied prices and totals are not part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub phone_number: String,
    pub address: String,
    pub lines: Vec<OrderLine>,
    pub payment_method: String,
    pub delivery_charge: f64,
}

impl OrderDraft {
    pub fn from_form(form: &OrderForm, delivery_charge: f64) -> Result<Self, ApiError> {
        form.validate()?;

        Ok(Self {
            phone_number: form.phone_number.trim().to_string(),
            address: form.address.trim().to_string(),
            lines: form
                .items
                .iter()
                .map(|item| OrderLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
            payment_method: CASH_ON_DELIVERY.to_string(),
            delivery_charge,
        })
    }
}

/// A line after its product was locked in, priced at the product's price at that moment.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub delivery_charge: f64,
    pub total_amount: f64,
}

impl From<&Order> for OrderTotals {
    fn from(order: &Order) -> Self {
        Self {
            subtotal: order.subtotal,
            delivery_charge: order.delivery_charge,
            total_amount: order.total_amount,
        }
    }
}

impl OrderTotals {
    pub fn compute(lines: &[PricedLine], delivery_charge: f64) -> Self {
        let subtotal = round_money(
            lines
                .iter()
                .map(|line| line.unit_price * f64::from(line.quantity))
                .sum(),
        );
        let delivery_charge = round_money(delivery_charge);

        Self {
            subtotal,
            delivery_charge,
            total_amount: round_money(subtotal + delivery_charge),
        }
    }

    /// The client's figures are advisory; a mismatch usually means a stale cart.
    pub fn report_mismatch(&self, form: &OrderForm) {
        let claimed = [
            ("subtotal", form.subtotal, self.subtotal),
            ("deliveryCharge", form.delivery_charge, self.delivery_charge),
            ("totalAmount", form.total_amount, self.total_amount),
        ];
        for (field, client, server) in claimed {
            if let Some(client) = client {
                if round_money(client) != server {
                    log::warn!("Order {field} from client was {client}, charging {server}");
                }
            }
        }

        for item in &form.items {
            if let Some(price) = item.current_unit_price {
                log::debug!("Client priced product {} at {price}", item.product_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::OrderLineForm;

    fn line(price: f64, quantity: i32) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            product_name: "Cumin".into(),
            quantity,
            unit_price: price,
        }
    }

    #[test]
    fn totals_include_delivery() {
        let totals = OrderTotals::compute(&[line(10.5, 2), line(0.1, 3)], 60.);
        assert_eq!(totals.subtotal, 21.3);
        assert_eq!(totals.delivery_charge, 60.);
        assert_eq!(totals.total_amount, 81.3);
    }

    #[test]
    fn draft_ignores_client_prices() {
        let form = OrderForm {
            phone_number: " 01700000000 ".into(),
            address: "Dhaka".into(),
            items: vec![OrderLineForm {
                product_id: Uuid::nil(),
                quantity: 3,
                current_unit_price: Some(0.01),
            }],
            subtotal: Some(0.03),
            delivery_charge: Some(0.),
            total_amount: Some(0.03),
            payment_method: None,
            order_status: None,
        };
        let draft = OrderDraft::from_form(&form, 60.).unwrap();

        assert_eq!(draft.phone_number, "01700000000");
        assert_eq!(draft.payment_method, CASH_ON_DELIVERY);
        assert_eq!(draft.delivery_charge, 60.);
        assert_eq!(
            draft.lines,
            vec![OrderLine {
                product_id: Uuid::nil(),
                quantity: 3
            }]
        );
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let form = OrderForm {
            phone_number: "1".into(),
            address: "a".into(),
            items: vec![OrderLineForm {
                product_id: Uuid::nil(),
                quantity: 0,
                current_unit_price: None,
            }],
            subtotal: None,
            delivery_charge: None,
            total_amount: None,
            payment_method: None,
            order_status: None,
        };
        assert!(matches!(
            OrderDraft::from_form(&form, 60.),
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
