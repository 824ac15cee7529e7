//! Per-user delivery addresses.

use serde::{Deserialize, Serialize};

use crate::types::{AddressId, UserId};

/// A delivery address owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    #[serde(rename = "Address_ID")]
    pub id: AddressId,
    #[serde(rename = "UsersUser_ID")]
    pub owner: UserId,
    #[serde(rename = "Address", default)]
    pub text: String,
}

impl DeliveryAddress {
    /// Create a new address with a freshly generated id.
    ///
    /// Returns `None` if the text is blank after trimming.
    #[must_use]
    pub fn create(owner: UserId, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            id: AddressId::generate(),
            owner,
            text: text.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_trims_and_rejects_blank() {
        let owner = UserId::new("u1");
        assert!(DeliveryAddress::create(owner.clone(), "   ").is_none());

        let address = DeliveryAddress::create(owner.clone(), " 123 Main St ");
        assert!(address.as_ref().is_some_and(|a| a.text == "123 Main St"));
        assert!(address.is_some_and(|a| a.owner == owner && !a.id.is_empty()));
    }
}
