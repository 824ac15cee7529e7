//! Placing orders and managing delivery addresses.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};
use tuckbox_core::{City, CutoffPolicy, DeliveryAddress, Food, Order, TimeSlot};

use crate::auth::Session;
use crate::store::{LineRequest, OrderBuildError, OrderSelection, RemoteDataGateway, StoreError};

/// A required picker left empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    City,
    TimeSlot,
    Address,
}

impl Selection {
    const fn label(self) -> &'static str {
        match self {
            Self::City => "a city",
            Self::TimeSlot => "a delivery time",
            Self::Address => "a delivery address",
        }
    }
}

/// Why an order (or address) was not saved.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("missing selection: {0:?}")]
    MissingSelection(Selection),

    #[error("orders close at {cutoff}")]
    PastCutoff { cutoff: String },

    #[error("no items selected")]
    NoItems,

    #[error("{option:?} is not an option for {food}")]
    InvalidOption { food: String, option: String },

    #[error("address is blank")]
    BlankAddress,

    #[error("order total is too large")]
    TotalTooLarge,

    #[error(transparent)]
    Store(StoreError),
}

impl OrderError {
    /// Text suitable for showing to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotSignedIn => "Please sign in to place an order.".to_string(),
            Self::MissingSelection(which) => format!("Please choose {}.", which.label()),
            Self::PastCutoff { cutoff } => {
                format!("Sorry, orders for today closed at {cutoff}.")
            }
            Self::NoItems => "Please add at least one item to your order.".to_string(),
            Self::InvalidOption { food, option } => {
                format!("\"{option}\" is not available for {food}.")
            }
            Self::BlankAddress => "Please enter a delivery address.".to_string(),
            Self::TotalTooLarge => {
                "That order is too large to price. Please reduce the quantities.".to_string()
            }
            Self::Store(_) => "We couldn't save that. Please try again.".to_string(),
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Order(OrderBuildError::NoItems) => Self::NoItems,
            StoreError::Order(OrderBuildError::InvalidOption { food, option }) => {
                Self::InvalidOption { food, option }
            }
            StoreError::Order(OrderBuildError::TotalOverflow) => Self::TotalTooLarge,
            other => Self::Store(other),
        }
    }
}

/// Everything the customer picked on the order form.
#[derive(Debug, Clone, Default)]
pub struct OrderForm {
    pub city: Option<City>,
    pub time_slot: Option<TimeSlot>,
    pub address: Option<DeliveryAddress>,
    pub lines: Vec<LineRequest>,
}

/// Choices offered on the order form, each sorted by display name.
#[derive(Debug, Clone, Default)]
pub struct OrderMenu {
    pub cities: Vec<City>,
    pub time_slots: Vec<TimeSlot>,
    pub foods: Vec<Food>,
    pub addresses: Vec<DeliveryAddress>,
}

/// Load the order form's pickers.
///
/// Time slots and foods degrade to empty; addresses are only loaded when
/// signed in and also degrade to empty.
///
/// # Errors
///
/// Returns the store error if the cities cannot be read.
#[instrument(skip_all, fields(authenticated = session.is_some()))]
pub async fn load_order_menu(
    gateway: &RemoteDataGateway,
    session: Option<&Session>,
) -> Result<OrderMenu, StoreError> {
    let mut cities: Vec<City> = gateway.get_cities(session).await?.into_values().collect();
    let mut time_slots: Vec<TimeSlot> = gateway.get_time_slots(session).await.into_values().collect();
    let mut foods: Vec<Food> = gateway.get_foods(session).await.into_values().collect();

    let mut addresses: Vec<DeliveryAddress> = match session {
        Some(session) => match gateway.get_user_addresses(session, session.user_id()).await {
            Ok(map) => map.into_values().collect(),
            Err(e) => {
                warn!(error = %e, "could not load addresses");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    cities.sort_by(|a, b| a.name.cmp(&b.name));
    time_slots.sort_by(|a, b| a.label.cmp(&b.label));
    foods.sort_by(|a, b| a.name.cmp(&b.name));
    addresses.sort_by(|a, b| a.text.cmp(&b.text));

    Ok(OrderMenu {
        cities,
        time_slots,
        foods,
        addresses,
    })
}

/// Save a new delivery address for the signed-in user.
///
/// # Errors
///
/// Returns `NotSignedIn`, `BlankAddress`, or the store error.
pub async fn add_address(
    gateway: &RemoteDataGateway,
    session: Option<&Session>,
    text: &str,
) -> Result<DeliveryAddress, OrderError> {
    let session = session.ok_or(OrderError::NotSignedIn)?;
    let address =
        DeliveryAddress::create(session.user_id().clone(), text).ok_or(OrderError::BlankAddress)?;
    gateway
        .upsert_user_address(session, session.user_id(), &address)
        .await?;
    info!(address_id = %address.id, "address added");
    Ok(address)
}

/// Applies the business rules and hands valid orders to the gateway.
pub struct OrderPlacement<'a> {
    gateway: &'a RemoteDataGateway,
    policy: CutoffPolicy,
}

impl<'a> OrderPlacement<'a> {
    #[must_use]
    pub const fn new(gateway: &'a RemoteDataGateway, policy: CutoffPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Validate and place an order at instant `now`.
    ///
    /// Checks run in order: signed in, selections present, before cutoff,
    /// at least one item. Nothing is sent to the store unless all pass.
    ///
    /// # Errors
    ///
    /// Returns the first rule violated, or the store error from the write.
    #[instrument(skip_all)]
    pub async fn place(
        &self,
        session: Option<&Session>,
        form: OrderForm,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let session = session.ok_or(OrderError::NotSignedIn)?;

        let city = form
            .city
            .ok_or(OrderError::MissingSelection(Selection::City))?;
        let time_slot = form
            .time_slot
            .ok_or(OrderError::MissingSelection(Selection::TimeSlot))?;
        let address = form
            .address
            .ok_or(OrderError::MissingSelection(Selection::Address))?;

        if !self.policy.allows(now) {
            return Err(OrderError::PastCutoff {
                cutoff: self.policy.cutoff_label(),
            });
        }

        if !form.lines.iter().any(|line| line.quantity > 0) {
            return Err(OrderError::NoItems);
        }

        let selection = OrderSelection {
            city,
            time_slot,
            address,
        };
        let created_at = self.policy.zone().order_timestamp(now);

        let order = self
            .gateway
            .place_order(
                Some(session),
                session.user_id(),
                &selection,
                &form.lines,
                created_at,
            )
            .await?;

        info!(order_id = %order.id, total = %order.total_price, "order placed");
        Ok(order)
    }
}
