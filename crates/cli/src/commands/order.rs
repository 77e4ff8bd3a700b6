//! `invctl order …`

use std::io::Write;

use checkout::{CartItem, PlaceOrder};
use doc_store::DocumentStore;
use domain::{Money, Order, OrderFilter, OrderId, TransitionRequest};

use crate::app::App;
use crate::args::{ItemArg, OrderCommand};
use crate::error::CliError;
use crate::render;

pub async fn run<S>(
    app: &App<S>,
    command: OrderCommand,
    out: &mut dyn Write,
) -> Result<(), CliError>
where
    S: DocumentStore + Clone,
{
    match command {
        OrderCommand::Place {
            user,
            items,
            tax,
            shipping,
            discount,
            payment,
            address,
            notes,
        } => {
            let items = items.into_iter().map(cart_item).collect();
            let mut request = PlaceOrder::new(user, items, payment, address)
                .with_discount(Money::from_cents(discount));
            if let Some(tax) = tax {
                request = request.with_tax(Money::from_cents(tax));
            }
            if let Some(shipping) = shipping {
                request = request.with_shipping_cost(Money::from_cents(shipping));
            }
            request.notes = notes;
            request.placed_by = app.operator();

            let order = app.checkout.place_order(request).await?;
            render::order(out, &order)?;
        }
        OrderCommand::Show { order } => {
            let order = resolve(app, &order).await?;
            render::order(out, &order)?;
        }
        OrderCommand::List {
            user,
            status,
            offset,
            limit,
        } => {
            let filter = OrderFilter {
                user_id: user,
                status,
                ..OrderFilter::default()
            }
            .page(offset, limit);
            for order in app.orders.list(&filter).await? {
                render::order_line(out, &order)?;
            }
        }
        OrderCommand::Transition {
            order,
            status,
            note,
            carrier,
            tracking,
        } => {
            let order = resolve(app, &order).await?;
            let mut request = TransitionRequest::to(status)
                .updated_by(app.operator())
                .tracking(carrier, tracking);
            request.note = note;
            let order = app.orders.transition(order.id(), request).await?;
            render::order(out, &order)?;
        }
        OrderCommand::Cancel { order, reason } => {
            let order = resolve(app, &order).await?;
            let order = app
                .orders
                .cancel_order(order.id(), reason, app.operator())
                .await?;
            render::order(out, &order)?;
        }
        OrderCommand::Ledger { order } => {
            let order = resolve(app, &order).await?;
            for tx in app.ledger.log().for_order(order.id()).await? {
                render::transaction(out, &tx)?;
            }
        }
    }
    Ok(())
}

fn cart_item(item: ItemArg) -> CartItem {
    let line = CartItem::new(item.product_id, item.quantity);
    match item.unit_price_cents {
        Some(cents) => line.with_price(Money::from_cents(cents)),
        None => line,
    }
}

/// Looks an order up by id, falling back to order number.
pub(crate) async fn resolve<S>(app: &App<S>, reference: &str) -> Result<Order, CliError>
where
    S: DocumentStore + Clone,
{
    let order = match reference.parse::<OrderId>() {
        Ok(id) => app.orders.get(id).await?,
        Err(_) => app.orders.get_by_number(reference.trim()).await?,
    };
    Ok(order)
}
