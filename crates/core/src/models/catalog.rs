//! Reference data: cities, delivery time slots and the food menu.
//!
//! These collections are maintained by the kitchen and are read-only from
//! the client's perspective.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{CityId, FoodId, Money, TimeSlotId};

/// A city the kitchen delivers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    #[serde(rename = "City_ID")]
    pub id: CityId,
    #[serde(rename = "City_Name", default)]
    pub name: String,
}

/// A delivery window such as `11:45–12:15`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(rename = "TimeSlot_ID")]
    pub id: TimeSlotId,
    #[serde(rename = "Time_Slot", default)]
    pub label: String,
}

/// A menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    #[serde(rename = "Food_ID")]
    pub id: FoodId,
    #[serde(rename = "Food_Name", default)]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Price")]
    pub unit_price: Money,
    /// What the customisation is called (e.g. "dressing"), if the item has one.
    #[serde(
        rename = "Option_Key",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub option_key: Option<String>,
    /// The closed set of valid customisations, in display order.
    #[serde(rename = "Option_Values", default, deserialize_with = "null_as_empty")]
    pub option_values: Vec<String>,
}

impl Food {
    /// Whether `choice` is an acceptable customisation for this item.
    ///
    /// An empty choice is always accepted.
    #[must_use]
    pub fn accepts_option(&self, choice: &str) -> bool {
        choice.is_empty() || self.option_values.iter().any(|v| v == choice)
    }

    /// The option preselected on the order form.
    #[must_use]
    pub fn default_option(&self) -> Option<&str> {
        self.option_values.first().map(String::as_str)
    }
}

fn blank_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(d)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value: Option<Vec<String>> = Option::deserialize(d)?;
    Ok(value.unwrap_or_default())
}
