//! Order assembly.
//!
//! [`build_order`] turns the customer's selections into the document that
//! gets written. It does no I/O and reads no clock.

use std::collections::BTreeMap;

use thiserror::Error;
use tuckbox_core::{
    City, DeliveryAddress, Food, Money, Order, OrderId, OrderLineItem, OrderTimestamp, TimeSlot,
    UserId, line_item_key,
};

/// Why an order could not be assembled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderBuildError {
    #[error("order has no user")]
    MissingUser,

    #[error("order has no items with a quantity above zero")]
    NoItems,

    #[error("{option:?} is not an option for {food}")]
    InvalidOption { food: String, option: String },

    #[error("delivery address belongs to another user")]
    AddressNotOwned,

    #[error("order total is too large")]
    TotalOverflow,
}

/// Where and when the order goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSelection {
    pub city: City,
    pub time_slot: TimeSlot,
    pub address: DeliveryAddress,
}

/// One row of the order form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    pub food: Food,
    pub quantity: u32,
    /// Chosen customisation; `None` or empty for "no preference"
    pub option_value: Option<String>,
}

impl LineRequest {
    #[must_use]
    pub const fn new(food: Food, quantity: u32, option_value: Option<String>) -> Self {
        Self {
            food,
            quantity,
            option_value,
        }
    }
}

/// Assemble an order document.
///
/// Lines with quantity zero are skipped; the rest are numbered in request
/// order. Names, prices and the option are copied from the food as it is
/// now. The total is the decimal sum of `unit_price × quantity`.
///
/// # Errors
///
/// Returns `MissingUser` for an empty user id, `AddressNotOwned` if the
/// address is someone else's, `InvalidOption` for a choice outside the
/// food's options, `NoItems` if no line has a positive quantity, and
/// `TotalOverflow` if a line total or the order total cannot be represented.
pub fn build_order(
    id: OrderId,
    user_id: &UserId,
    selection: &OrderSelection,
    lines: &[LineRequest],
    created_at: OrderTimestamp,
) -> Result<Order, OrderBuildError> {
    if user_id.is_empty() {
        return Err(OrderBuildError::MissingUser);
    }
    if &selection.address.owner != user_id {
        return Err(OrderBuildError::AddressNotOwned);
    }

    let mut items = BTreeMap::new();
    for line in lines.iter().filter(|line| line.quantity > 0) {
        let option_value = line
            .option_value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(choice) = option_value
            && !line.food.accepts_option(choice)
        {
            return Err(OrderBuildError::InvalidOption {
                food: line.food.name.clone(),
                option: choice.to_string(),
            });
        }

        let item = OrderLineItem {
            food_id: line.food.id.clone(),
            food_name: line.food.name.clone(),
            quantity: line.quantity,
            option_key: line.food.option_key.clone(),
            option_value: option_value.map(str::to_string),
            unit_price: line.food.unit_price,
            line_total: line
                .food
                .unit_price
                .times(line.quantity)
                .ok_or(OrderBuildError::TotalOverflow)?,
        };
        items.insert(line_item_key(items.len()), item);
    }

    if items.is_empty() {
        return Err(OrderBuildError::NoItems);
    }

    let total_price = Money::checked_sum(items.values().map(|item| item.line_total))
        .ok_or(OrderBuildError::TotalOverflow)?;

    Ok(Order {
        id,
        created_at,
        user_id: user_id.clone(),
        city_id: selection.city.id.clone(),
        city_name: selection.city.name.clone(),
        time_slot_id: selection.time_slot.id.clone(),
        time_slot_label: selection.time_slot.label.clone(),
        address_id: selection.address.id.clone(),
        address_text: selection.address.text.clone(),
        total_price,
        items,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use tuckbox_core::{AddressId, CityId, FoodId, TimeSlotId};

    use super::*;

    pub(crate) fn food(id: &str, name: &str, cents: u32) -> Food {
        Food {
            id: FoodId::new(id),
            name: name.to_string(),
            description: String::new(),
            unit_price: Money::from_cents(cents),
            option_key: None,
            option_values: Vec::new(),
        }
    }

    pub(crate) fn salad() -> Food {
        Food {
            option_key: Some("Dressing".to_string()),
            option_values: vec!["Ranch".to_string(), "Vinaigrette".to_string()],
            ..food("f2", "Salad", 1200)
        }
    }

    pub(crate) fn selection(owner: &str) -> OrderSelection {
        OrderSelection {
            city: City {
                id: CityId::new("c1"),
                name: "North".to_string(),
            },
            time_slot: TimeSlot {
                id: TimeSlotId::new("s1"),
                label: "11:45–12:15".to_string(),
            },
            address: DeliveryAddress {
                id: AddressId::new("a1"),
                owner: UserId::new(owner),
                text: "123 Main St".to_string(),
            },
        }
    }

    fn build(lines: &[LineRequest]) -> Result<Order, OrderBuildError> {
        build_order(
            OrderId::new("o1"),
            &UserId::new("u1"),
            &selection("u1"),
            lines,
            OrderTimestamp::new("04/05/2026 09:30:00"),
        )
    }

    #[test]
    fn test_single_burger_scenario() {
        let order = build(&[LineRequest::new(food("f1", "Burger", 850), 2, None)]).unwrap();

        assert_eq!(order.total_price, Money::from_cents(1700));
        assert_eq!(order.items.len(), 1);
        let item = &order.items["item_000"];
        assert_eq!(item.food_name, "Burger");
        assert_eq!(item.line_total, Money::from_cents(1700));
        assert_eq!(order.city_name, "North");
        assert_eq!(order.time_slot_label, "11:45–12:15");
        assert_eq!(order.address_text, "123 Main St");
    }

    #[test]
    fn test_zero_quantities_are_no_items() {
        let result = build(&[
            LineRequest::new(food("f1", "Burger", 850), 0, None),
            LineRequest::new(salad(), 0, Some("Ranch".to_string())),
        ]);
        assert_eq!(result, Err(OrderBuildError::NoItems));
        assert_eq!(build(&[]), Err(OrderBuildError::NoItems));
    }

    #[test]
    fn test_total_is_independent_of_line_order() {
        let lines = vec![
            LineRequest::new(food("f1", "Burger", 850), 2, None),
            LineRequest::new(salad(), 3, Some("Ranch".to_string())),
            LineRequest::new(food("f3", "Juice", 333), 7, None),
        ];
        let mut reversed = lines.clone();
        reversed.reverse();

        let forward = build(&lines).unwrap();
        let backward = build(&reversed).unwrap();

        // 17.00 + 36.00 + 23.31
        assert_eq!(forward.total_price, Money::from_cents(7631));
        assert_eq!(forward.total_price, backward.total_price);
        assert_eq!(Some(forward.total_price), forward.line_total_sum());
    }

    #[test]
    fn test_oversized_store_price_is_refused() {
        let mut pricey = food("f9", "Truffle", 100);
        pricey.unit_price = serde_json::from_str("50000000000000000000000000000").unwrap();

        assert_eq!(
            build(&[LineRequest::new(pricey.clone(), 3, None)]),
            Err(OrderBuildError::TotalOverflow)
        );
        // each line fits, the total does not
        assert_eq!(
            build(&[
                LineRequest::new(pricey.clone(), 1, None),
                LineRequest::new(pricey, 1, None),
            ]),
            Err(OrderBuildError::TotalOverflow)
        );
    }

    #[test]
    fn test_skipped_lines_do_not_leave_key_gaps() {
        let order = build(&[
            LineRequest::new(food("f1", "Burger", 850), 0, None),
            LineRequest::new(salad(), 1, None),
            LineRequest::new(food("f3", "Juice", 333), 1, None),
        ])
        .unwrap();
        let keys: Vec<_> = order.items.keys().cloned().collect();
        assert_eq!(keys, ["item_000", "item_001"]);
    }

    #[test]
    fn test_option_snapshot_and_validation() {
        let order = build(&[LineRequest::new(salad(), 1, Some(" Ranch ".to_string()))]).unwrap();
        let item = &order.items["item_000"];
        assert_eq!(item.option_key.as_deref(), Some("Dressing"));
        assert_eq!(item.option_value.as_deref(), Some("Ranch"));

        let blank = build(&[LineRequest::new(salad(), 1, Some(String::new()))]).unwrap();
        assert!(blank.items["item_000"].option_value.is_none());

        let result = build(&[LineRequest::new(salad(), 1, Some("Gravy".to_string()))]);
        assert!(matches!(
            result,
            Err(OrderBuildError::InvalidOption { ref option, .. }) if option == "Gravy"
        ));
    }

    #[test]
    fn test_missing_user_and_foreign_address() {
        let lines = [LineRequest::new(food("f1", "Burger", 850), 1, None)];
        let ts = OrderTimestamp::new("04/05/2026 09:30:00");

        let result = build_order(
            OrderId::new("o1"),
            &UserId::new(""),
            &selection(""),
            &lines,
            ts.clone(),
        );
        assert_eq!(result, Err(OrderBuildError::MissingUser));

        let result = build_order(
            OrderId::new("o1"),
            &UserId::new("u1"),
            &selection("u2"),
            &lines,
            ts,
        );
        assert_eq!(result, Err(OrderBuildError::AddressNotOwned));
    }
}
