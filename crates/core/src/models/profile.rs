//! The signed-in user's profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::City;
use crate::types::{CityId, Email, UserId};

/// Profile document stored at `Users/{uid}` and mirrored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "User_ID")]
    pub user_id: UserId,
    #[serde(rename = "User_Email", default)]
    pub email: String,
    #[serde(rename = "First_Name", default)]
    pub first_name: String,
    #[serde(rename = "Last_Name", default)]
    pub last_name: String,
    #[serde(rename = "Mobile", default)]
    pub mobile: String,
    #[serde(rename = "City_ID", default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<CityId>,
    #[serde(rename = "City_Name", default, skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(rename = "Delivery_Address", default)]
    pub address_text: String,
    #[serde(rename = "Created_At")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "Updated_At")]
    pub updated_at: DateTime<Utc>,
}

/// Editable profile fields, as entered on the update form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
    pub address_text: String,
    pub city: Option<City>,
}

impl UserProfile {
    /// A fresh profile for a just-registered user.
    #[must_use]
    pub fn new(
        user_id: UserId,
        email: &Email,
        first_name: &str,
        last_name: &str,
        mobile: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            email: email.as_str().to_owned(),
            first_name: first_name.trim().to_owned(),
            last_name: last_name.trim().to_owned(),
            mobile: mobile.trim().to_owned(),
            city_id: None,
            city_name: None,
            address_text: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply form changes, trimming text and bumping `updated_at`.
    ///
    /// The city is only replaced when one was chosen; leaving the picker
    /// empty keeps the stored city.
    pub fn apply(&mut self, changes: ProfileChanges, now: DateTime<Utc>) {
        self.first_name = changes.first_name.trim().to_owned();
        self.last_name = changes.last_name.trim().to_owned();
        self.mobile = changes.mobile.trim().to_owned();
        self.address_text = changes.address_text.trim().to_owned();
        if let Some(city) = changes.city {
            self.city_id = Some(city.id);
            self.city_name = Some(city.name);
        }
        self.updated_at = now;
    }

    /// `First Last`, or whichever part is present.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}
