//! The order aggregate.
//!
//! An order is written once as a single document and never edited. It copies
//! the city name, slot label, address text and food details in at creation
//! time, so later edits to reference data do not rewrite history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AddressId, CityId, FoodId, Money, OrderId, OrderTimestamp, TimeSlotId, UserId};

/// One line of an order: a food, how many, and the chosen customisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    #[serde(rename = "Food_ID")]
    pub food_id: FoodId,
    #[serde(rename = "Food_Name", default)]
    pub food_name: String,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
    #[serde(rename = "Option_Key", default, skip_serializing_if = "Option::is_none")]
    pub option_key: Option<String>,
    #[serde(rename = "Option_Value", default, skip_serializing_if = "Option::is_none")]
    pub option_value: Option<String>,
    #[serde(rename = "Unit_Price")]
    pub unit_price: Money,
    #[serde(rename = "Line_Total")]
    pub line_total: Money,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "Order_ID")]
    pub id: OrderId,
    #[serde(rename = "Order_Date", default)]
    pub created_at: OrderTimestamp,
    #[serde(rename = "User_ID")]
    pub user_id: UserId,
    #[serde(rename = "City_ID")]
    pub city_id: CityId,
    #[serde(rename = "City_Name", default)]
    pub city_name: String,
    #[serde(rename = "Time_Slot_ID")]
    pub time_slot_id: TimeSlotId,
    #[serde(rename = "Time_Slot", default)]
    pub time_slot_label: String,
    #[serde(rename = "Address_ID")]
    pub address_id: AddressId,
    #[serde(rename = "Address", default)]
    pub address_text: String,
    #[serde(rename = "Total_Price")]
    pub total_price: Money,
    #[serde(rename = "Items", default)]
    pub items: BTreeMap<String, OrderLineItem>,
}

impl Order {
    /// Short human-readable list of what was ordered, e.g. `Burger × 2, Salad × 1`.
    #[must_use]
    pub fn items_summary(&self) -> String {
        if self.items.is_empty() {
            return "(no items)".to_string();
        }
        self.items
            .values()
            .map(|item| format!("{} × {}", item.food_name, item.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Sum of the stored line totals. `None` if it overflows.
    #[must_use]
    pub fn line_total_sum(&self) -> Option<Money> {
        Money::checked_sum(self.items.values().map(|item| item.line_total))
    }
}

/// Map key for the `index`-th line item of an order.
#[must_use]
pub fn line_item_key(index: usize) -> String {
    format!("item_{index:03}")
}

/// Select the orders placed by `user_id` from a full collection scan.
///
/// Pure: the input is not modified and the same input always yields the
/// same output.
#[must_use]
pub fn orders_for_user(
    orders: &BTreeMap<String, Order>,
    user_id: &UserId,
) -> BTreeMap<String, Order> {
    orders
        .iter()
        .filter(|(_, order)| &order.user_id == user_id)
        .map(|(key, order)| (key.clone(), order.clone()))
        .collect()
}

/// Order a list newest first by creation time.
///
/// Timestamps that do not parse sort after all parseable ones, falling back
/// to their raw text so the order is still deterministic.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        let (pa, pb) = (a.created_at.parse(), b.created_at.parse());
        pb.cmp(&pa)
            .then_with(|| b.created_at.as_str().cmp(a.created_at.as_str()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// The most recent order, if any.
#[must_use]
pub fn latest_order<'a, I>(orders: I) -> Option<&'a Order>
where
    I: IntoIterator<Item = &'a Order>,
{
    orders.into_iter().max_by(|a, b| {
        a.created_at
            .parse()
            .cmp(&b.created_at.parse())
            .then_with(|| a.created_at.as_str().cmp(b.created_at.as_str()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn order(id: &str, user: &str, created_at: &str) -> Order {
        Order {
            id: OrderId::new(id),
            created_at: OrderTimestamp::new(created_at),
            user_id: UserId::new(user),
            city_id: CityId::new("c1"),
            city_name: "North".into(),
            time_slot_id: TimeSlotId::new("s1"),
            time_slot_label: "11:45–12:15".into(),
            address_id: AddressId::new("a1"),
            address_text: "123 Main St".into(),
            total_price: Money::ZERO,
            items: BTreeMap::new(),
        }
    }

    fn collection(orders: Vec<Order>) -> BTreeMap<String, Order> {
        orders
            .into_iter()
            .map(|o| (o.id.to_string(), o))
            .collect()
    }

    #[test]
    fn test_orders_for_user_filters_and_is_idempotent() {
        let all = collection(vec![
            order("o1", "u1", "01/02/2026 09:00:00"),
            order("o2", "u2", "01/02/2026 09:10:00"),
            order("o3", "u1", "02/02/2026 09:00:00"),
        ]);
        let user = UserId::new("u1");

        let first = orders_for_user(&all, &user);
        let second = orders_for_user(&all, &user);

        assert_eq!(first.len(), 2);
        assert!(first.values().all(|o| o.user_id == user));
        assert_eq!(first, second);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_orders_for_unknown_user_is_empty() {
        let all = collection(vec![order("o1", "u1", "01/02/2026 09:00:00")]);
        assert!(orders_for_user(&all, &UserId::new("nobody")).is_empty());
    }

    #[test]
    fn test_sort_newest_first_is_chronological_not_lexical() {
        // Lexically "31/01" > "01/02", chronologically it is earlier
        let mut orders = vec![
            order("jan", "u1", "31/01/2026 09:00:00"),
            order("feb", "u1", "01/02/2026 08:00:00"),
            order("bad", "u1", "not a date"),
        ];
        sort_newest_first(&mut orders);
        let ids: Vec<_> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["feb", "jan", "bad"]);
    }

    #[test]
    fn test_latest_order() {
        let orders = [
            order("jan", "u1", "31/01/2026 09:00:00"),
            order("feb", "u1", "01/02/2026 08:00:00"),
        ];
        assert_eq!(latest_order(&orders).unwrap().id.as_str(), "feb");
        assert!(latest_order(&Vec::<Order>::new()).is_none());
    }

    #[test]
    fn test_items_summary() {
        let mut o = order("o1", "u1", "01/02/2026 09:00:00");
        assert_eq!(o.items_summary(), "(no items)");
        o.items.insert(
            line_item_key(0),
            OrderLineItem {
                food_id: FoodId::new("f1"),
                food_name: "Burger".into(),
                quantity: 2,
                option_key: None,
                option_value: None,
                unit_price: Money::from_cents(850),
                line_total: Money::from_cents(1700),
            },
        );
        assert_eq!(o.items_summary(), "Burger × 2");
        assert_eq!(o.line_total_sum(), Some(Money::from_cents(1700)));
    }

    #[test]
    fn test_missing_items_reads_as_empty() {
        let json = r#"{
            "Order_ID": "o1", "Order_Date": "01/02/2026 09:00:00", "User_ID": "u1",
            "City_ID": "c1", "Time_Slot_ID": "s1", "Address_ID": "a1", "Total_Price": 0
        }"#;
        let parsed: Order = serde_json::from_str(json).unwrap();
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.user_id.as_str(), "u1");
    }
}
