//! Order history commands.
//!
//! # Usage
//!
//! ```bash
//! # Every order, newest first
//! tuckbox --email ana@example.nz --password '...' history
//!
//! # Just the latest order
//! tuckbox --google current
//! ```

use std::io::Write;

use tuckbox_client::flows;
use tuckbox_core::Order;

use super::ordering::write_order;
use super::{AuthArgs, CommandError, Context};

/// `tuckbox history`
///
/// # Errors
///
/// Returns sign-in failures or the order error.
pub async fn history(
    ctx: &mut Context,
    auth: &AuthArgs,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    ctx.sign_in(auth).await?;
    let orders = flows::order_history(&ctx.gateway, ctx.sessions.session()).await?;
    write_history(out, &orders)?;
    Ok(())
}

/// `tuckbox current`
///
/// # Errors
///
/// Returns sign-in failures or the order error.
pub async fn current(
    ctx: &mut Context,
    auth: &AuthArgs,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    ctx.sign_in(auth).await?;
    match flows::current_order(&ctx.gateway, ctx.sessions.session()).await? {
        Some(order) => write_order(out, &order)?,
        None => writeln!(out, "You have not placed any orders yet.")?,
    }
    Ok(())
}

fn write_history(out: &mut impl Write, orders: &[Order]) -> std::io::Result<()> {
    if orders.is_empty() {
        return writeln!(out, "You have not placed any orders yet.");
    }
    for order in orders {
        writeln!(
            out,
            "{}  {:<10} {}  {}",
            order.created_at,
            order.total_price.to_string(),
            order.city_name,
            order.items_summary()
        )?;
    }
    Ok(())
}
