//! Menu, address and order commands.
//!
//! # Usage
//!
//! ```bash
//! # List delivery cities (no sign-in needed)
//! tuckbox cities
//!
//! # Show the full order form, including saved addresses when signed in
//! tuckbox --email ana@example.nz --password '...' menu
//!
//! # Save a delivery address
//! tuckbox --google add-address "12 Queen St, Auckland"
//!
//! # Place an order: FOOD_ID=QTY or FOOD_ID=QTY:OPTION, repeatable
//! tuckbox --email ana@example.nz --password '...' order \
//!     --city akl --slot s1 --address 3f2a... --item f1=2 --item f2=1:Ranch
//! ```

use std::io::Write;

use chrono::Utc;
use tuckbox_client::flows::{self, OrderForm, OrderMenu, OrderPlacement};
use tuckbox_client::store::LineRequest;
use tuckbox_core::{City, DeliveryAddress, Food, Order, TimeSlot};

use super::{AuthArgs, CommandError, Context};

/// One `--item` argument before it is matched against the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemArg {
    pub food: String,
    pub quantity: u32,
    pub option: Option<String>,
}

/// Parse `FOOD_ID=QTY[:OPTION]`.
///
/// # Errors
///
/// Returns a message for clap to show if the shape or quantity is wrong.
pub fn parse_item(raw: &str) -> Result<ItemArg, String> {
    let (food, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FOOD_ID=QTY[:OPTION], got {raw:?}"))?;
    let food = food.trim();
    if food.is_empty() {
        return Err("food id is empty".to_string());
    }

    let (quantity, option) = match rest.split_once(':') {
        Some((qty, option)) => (qty, Some(option.trim().to_string())),
        None => (rest, None),
    };
    let quantity = quantity
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad quantity {quantity:?}: {e}"))?;

    Ok(ItemArg {
        food: food.to_string(),
        quantity,
        option: option.filter(|o| !o.is_empty()),
    })
}

/// Arguments of the `order` command.
#[derive(Debug, Clone, Default)]
pub struct OrderArgs {
    pub city: Option<String>,
    pub slot: Option<String>,
    pub address: Option<String>,
    pub items: Vec<ItemArg>,
}

/// `tuckbox cities`
///
/// # Errors
///
/// Returns the store error if the cities cannot be read.
pub async fn cities(
    ctx: &mut Context,
    auth: &AuthArgs,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    ctx.sign_in_if_requested(auth).await?;
    let mut cities: Vec<City> = ctx
        .gateway
        .get_cities(ctx.sessions.session())
        .await?
        .into_values()
        .collect();
    cities.sort_by(|a, b| a.name.cmp(&b.name));

    if cities.is_empty() {
        writeln!(out, "No delivery cities yet.")?;
    }
    for city in &cities {
        writeln!(out, "{:<12} {}", city.id.as_str(), city.name)?;
    }
    Ok(())
}

/// `tuckbox menu`
///
/// # Errors
///
/// Returns the store error if the cities cannot be read.
pub async fn menu(
    ctx: &mut Context,
    auth: &AuthArgs,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    ctx.sign_in_if_requested(auth).await?;
    let menu = flows::load_order_menu(&ctx.gateway, ctx.sessions.session()).await?;
    write_menu(out, &menu, ctx.sessions.is_authenticated())?;
    Ok(())
}

/// `tuckbox add-address TEXT`
///
/// # Errors
///
/// Returns sign-in failures, or the order error for a blank address or a
/// failed write.
pub async fn add_address(
    ctx: &mut Context,
    auth: &AuthArgs,
    text: &str,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    ctx.sign_in(auth).await?;
    let address = flows::add_address(&ctx.gateway, ctx.sessions.session(), text).await?;
    writeln!(out, "Saved address {}: {}", address.id, address.text)?;
    Ok(())
}

/// `tuckbox order ...`
///
/// Choices are matched against the live menu by id, or by name ignoring
/// case. An omitted city, slot or address is passed through as "not
/// chosen" so the placement rules report it.
///
/// # Errors
///
/// Returns sign-in failures, `UnknownChoice` for a value not on the menu,
/// or the order error.
pub async fn order(
    ctx: &mut Context,
    auth: &AuthArgs,
    args: OrderArgs,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    ctx.sign_in(auth).await?;
    let session = ctx.sessions.session();
    let menu = flows::load_order_menu(&ctx.gateway, session).await?;
    let form = build_form(&menu, args)?;

    let placement = OrderPlacement::new(&ctx.gateway, ctx.config.client.business.cutoff_policy());
    let order = placement.place(session, form, Utc::now()).await?;

    writeln!(out, "Order placed.")?;
    write_order(out, &order)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Matching arguments against the menu
// ─────────────────────────────────────────────────────────────────────────────

fn build_form(menu: &OrderMenu, args: OrderArgs) -> Result<OrderForm, CommandError> {
    let city = args
        .city
        .map(|value| {
            find(&menu.cities, "city", &value, |c: &City| {
                (c.id.as_str(), c.name.as_str())
            })
        })
        .transpose()?;
    let time_slot = args
        .slot
        .map(|value| {
            find(&menu.time_slots, "time slot", &value, |s: &TimeSlot| {
                (s.id.as_str(), s.label.as_str())
            })
        })
        .transpose()?;
    let address = args
        .address
        .map(|value| {
            find(&menu.addresses, "saved address", &value, |a: &DeliveryAddress| {
                (a.id.as_str(), a.text.as_str())
            })
        })
        .transpose()?;

    let lines = args
        .items
        .into_iter()
        .map(|item| {
            let food = find(&menu.foods, "food", &item.food, |f: &Food| {
                (f.id.as_str(), f.name.as_str())
            })?;
            Ok(LineRequest::new(food, item.quantity, item.option))
        })
        .collect::<Result<Vec<_>, CommandError>>()?;

    Ok(OrderForm {
        city,
        time_slot,
        address,
        lines,
    })
}

/// Find by exact id first, then by case-insensitive name.
pub(super) fn find<T: Clone>(
    choices: &[T],
    kind: &'static str,
    value: &str,
    keys: impl Fn(&T) -> (&str, &str),
) -> Result<T, CommandError> {
    let value = value.trim();
    choices
        .iter()
        .find(|&c| keys(c).0 == value)
        .or_else(|| {
            choices
                .iter()
                .find(|&c| keys(c).1.eq_ignore_ascii_case(value))
        })
        .cloned()
        .ok_or_else(|| CommandError::UnknownChoice {
            kind,
            value: value.to_string(),
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn write_menu(out: &mut impl Write, menu: &OrderMenu, signed_in: bool) -> std::io::Result<()> {
    writeln!(out, "Cities:")?;
    for city in &menu.cities {
        writeln!(out, "  {:<12} {}", city.id.as_str(), city.name)?;
    }

    writeln!(out, "Delivery times:")?;
    if menu.time_slots.is_empty() {
        writeln!(out, "  (none available)")?;
    }
    for slot in &menu.time_slots {
        writeln!(out, "  {:<12} {}", slot.id.as_str(), slot.label)?;
    }

    writeln!(out, "Food:")?;
    if menu.foods.is_empty() {
        writeln!(out, "  (none available)")?;
    }
    for food in &menu.foods {
        writeln!(out, "  {:<12} {} {}", food.id.as_str(), food.name, food.unit_price)?;
        if let Some(key) = &food.option_key
            && let Some(default) = food.default_option()
        {
            writeln!(
                out,
                "  {:<12}   {key}: {} (default {default})",
                "",
                food.option_values.join(", ")
            )?;
        }
    }

    if signed_in {
        writeln!(out, "Saved addresses:")?;
        if menu.addresses.is_empty() {
            writeln!(out, "  (none; add one with `tuckbox add-address`)")?;
        }
        for address in &menu.addresses {
            writeln!(out, "  {}  {}", address.id, address.text)?;
        }
    }
    Ok(())
}

/// Print one order as a short receipt.
pub(crate) fn write_order(out: &mut impl Write, order: &Order) -> std::io::Result<()> {
    writeln!(out, "Order {} ({})", order.id, order.created_at)?;
    writeln!(
        out,
        "  {} / {} / {}",
        order.city_name, order.time_slot_label, order.address_text
    )?;
    for item in order.items.values() {
        let option = match (&item.option_key, &item.option_value) {
            (Some(key), Some(value)) => format!(" ({key}: {value})"),
            (None, Some(value)) => format!(" ({value})"),
            _ => String::new(),
        };
        writeln!(
            out,
            "  {} × {}{option}  {}",
            item.food_name, item.quantity, item.line_total
        )?;
    }
    writeln!(out, "  Total {}", order.total_price)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use tuckbox_core::{
        AddressId, CityId, FoodId, Money, OrderId, OrderLineItem, OrderTimestamp, TimeSlotId,
        UserId,
    };

    use super::*;

    #[test]
    fn test_parse_item() {
        assert_eq!(
            parse_item("f1=2").unwrap(),
            ItemArg {
                food: "f1".to_string(),
                quantity: 2,
                option: None
            }
        );
        assert_eq!(
            parse_item("f2=1:Ranch").unwrap().option.as_deref(),
            Some("Ranch")
        );
        assert_eq!(parse_item("f2=1:").unwrap().option, None);
        assert!(parse_item("f1").is_err());
        assert!(parse_item("=2").is_err());
        assert!(parse_item("f1=-1").is_err());
        assert!(parse_item("f1=two").is_err());
    }

    fn menu() -> OrderMenu {
        OrderMenu {
            cities: vec![City {
                id: CityId::new("akl"),
                name: "Auckland".to_string(),
            }],
            time_slots: vec![TimeSlot {
                id: TimeSlotId::new("s1"),
                label: "11:45-12:15".to_string(),
            }],
            foods: vec![Food {
                id: FoodId::new("f1"),
                name: "Burger".to_string(),
                description: String::new(),
                unit_price: Money::from_cents(1250),
                option_key: None,
                option_values: Vec::new(),
            }],
            addresses: vec![DeliveryAddress {
                id: AddressId::new("a1"),
                owner: UserId::new("u1"),
                text: "12 Queen St".to_string(),
            }],
        }
    }

    #[test]
    fn test_build_form_matches_id_or_name() {
        let form = build_form(
            &menu(),
            OrderArgs {
                city: Some("auckland".to_string()),
                slot: Some("s1".to_string()),
                address: Some("a1".to_string()),
                items: vec![parse_item("Burger=2").unwrap()],
            },
        )
        .unwrap();
        assert_eq!(form.city.unwrap().id, CityId::new("akl"));
        assert_eq!(form.time_slot.unwrap().label, "11:45-12:15");
        assert_eq!(form.address.unwrap().text, "12 Queen St");
        assert_eq!(form.lines[0].food.id, FoodId::new("f1"));
        assert_eq!(form.lines[0].quantity, 2);
    }

    #[test]
    fn test_build_form_leaves_omitted_choices_empty() {
        let form = build_form(&menu(), OrderArgs::default()).unwrap();
        assert!(form.city.is_none() && form.time_slot.is_none() && form.address.is_none());
        assert!(form.lines.is_empty());
    }

    #[test]
    fn test_build_form_rejects_unknown_food() {
        let err = build_form(
            &menu(),
            OrderArgs {
                items: vec![parse_item("pizza=1").unwrap()],
                ..OrderArgs::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::UnknownChoice { kind: "food", .. }));
    }

    #[test]
    fn test_menu_hides_addresses_when_anonymous() {
        let mut out = Vec::new();
        write_menu(&mut out, &menu(), false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Burger $12.50"));
        assert!(!text.contains("Saved addresses"));

        let mut out = Vec::new();
        write_menu(&mut out, &menu(), true).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("12 Queen St"));
    }

    #[test]
    fn test_write_order_receipt() {
        let mut items = BTreeMap::new();
        items.insert(
            "Item_1".to_string(),
            OrderLineItem {
                food_id: FoodId::new("f2"),
                food_name: "Salad".to_string(),
                quantity: 2,
                option_key: Some("Dressing".to_string()),
                option_value: Some("Ranch".to_string()),
                unit_price: Money::from_cents(900),
                line_total: Money::from_cents(1800),
            },
        );
        let order = Order {
            id: OrderId::new("o1"),
            created_at: OrderTimestamp::new("04/05/2026 09:15:00"),
            user_id: UserId::new("u1"),
            city_id: CityId::new("akl"),
            city_name: "Auckland".to_string(),
            time_slot_id: TimeSlotId::new("s1"),
            time_slot_label: "11:45-12:15".to_string(),
            address_id: AddressId::new("a1"),
            address_text: "12 Queen St".to_string(),
            total_price: Money::from_cents(1800),
            items,
        };

        let mut out = Vec::new();
        write_order(&mut out, &order).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Order o1 (04/05/2026 09:15:00)"));
        assert!(text.contains("Salad × 2 (Dressing: Ranch)  $18.00"));
        assert!(text.contains("Total $18.00"));
    }
}
