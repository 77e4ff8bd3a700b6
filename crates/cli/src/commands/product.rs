//! `invctl product …`

use std::io::Write;

use doc_store::DocumentStore;
use domain::{DomainError, LedgerEntry, Money, NewProduct, Product, ProductId, TransactionType};

use crate::app::App;
use crate::args::{ProductCommand, StatusArg};
use crate::error::CliError;
use crate::render;

pub async fn run<S>(
    app: &App<S>,
    command: ProductCommand,
    out: &mut dyn Write,
) -> Result<(), CliError>
where
    S: DocumentStore + Clone,
{
    match command {
        ProductCommand::Add {
            name,
            sku,
            price,
            quantity,
            reorder_point,
            reorder_quantity,
        } => {
            let input = NewProduct::new(name, sku, Money::from_cents(price))
                .with_quantity(quantity)
                .with_reorder(reorder_point, reorder_quantity);
            let product = app.catalog.create(input).await?;
            render::product(out, &product)?;
        }
        ProductCommand::Show { product } => {
            let product = resolve(app, &product).await?;
            render::product(out, &product)?;
        }
        ProductCommand::List { offset, limit } => {
            for product in app.catalog.list(offset, limit).await? {
                render::product_line(out, &product)?;
            }
        }
        ProductCommand::Adjust {
            product,
            delta,
            kind,
            notes,
        } => {
            if matches!(kind, TransactionType::Sale | TransactionType::Return) {
                return Err(CliError::Usage(format!(
                    "{kind} entries are written by order placement and cancellation"
                )));
            }
            let mut entry = LedgerEntry::new(kind).performed_by(app.operator());
            if let Some(notes) = notes {
                entry = entry.notes(notes);
            }
            let product = app.ledger.adjust(product, delta, entry).await?;
            render::product(out, &product)?;
        }
        ProductCommand::Release {
            product,
            quantity,
            order,
            notes,
        } => {
            let mut entry = LedgerEntry::new(TransactionType::Return).performed_by(app.operator());
            if let Some(order) = order {
                let order = super::order::resolve(app, &order).await?;
                entry = entry
                    .for_order(order.id())
                    .notes(format!("Manual release for order {}", order.order_number()));
            }
            if let Some(notes) = notes {
                entry = entry.notes(notes);
            }
            let product = app.ledger.release(product, quantity, entry).await?;
            render::product(out, &product)?;
        }
        ProductCommand::SetStatus { product, status } => {
            let status = match status {
                StatusArg::Manual(status) => Some(status),
                StatusArg::Auto => None,
            };
            let product = app.ledger.set_availability(product, status).await?;
            render::product(out, &product)?;
        }
        ProductCommand::History { product, limit } => {
            let product = app.catalog.get(product).await?;
            for tx in app.ledger.log().for_product(product.id(), limit).await? {
                render::transaction(out, &tx)?;
            }
        }
        ProductCommand::Summary { product } => {
            let product = app.catalog.get(product).await?;
            let summary = app.ledger.log().summary(product.id()).await?;
            render::summary(out, &summary)?;
        }
    }
    Ok(())
}

/// Looks a product up by id, falling back to SKU.
async fn resolve<S>(app: &App<S>, reference: &str) -> Result<Product, CliError>
where
    S: DocumentStore + Clone,
{
    if let Ok(id) = reference.parse::<ProductId>() {
        return Ok(app.catalog.get(id).await?);
    }
    app.catalog
        .find_by_sku(reference)
        .await?
        .ok_or_else(|| DomainError::not_found("product", reference).into())
}
