//! Order history and the current order.

use tuckbox_core::{Order, latest_order, sort_newest_first};

use super::ordering::OrderError;
use crate::auth::Session;
use crate::store::RemoteDataGateway;

/// The signed-in user's orders, newest first.
///
/// # Errors
///
/// Returns `NotSignedIn`, or the store error if the orders cannot be read.
pub async fn order_history(
    gateway: &RemoteDataGateway,
    session: Option<&Session>,
) -> Result<Vec<Order>, OrderError> {
    let session = session.ok_or(OrderError::NotSignedIn)?;
    let mut orders: Vec<Order> = gateway
        .get_orders_for_user(Some(session), session.user_id())
        .await?
        .into_values()
        .collect();
    sort_newest_first(&mut orders);
    Ok(orders)
}

/// The signed-in user's most recent order, if any.
///
/// # Errors
///
/// Same as [`order_history`].
pub async fn current_order(
    gateway: &RemoteDataGateway,
    session: Option<&Session>,
) -> Result<Option<Order>, OrderError> {
    let orders = order_history(gateway, session).await?;
    Ok(latest_order(&orders).cloned())
}
