//! Plain-text output.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use domain::{InventoryTransaction, Order, Product, TransactionSummary, User};

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn product(out: &mut dyn Write, product: &Product) -> io::Result<()> {
    let inventory = product.inventory();
    writeln!(out, "product {}", product.id())?;
    writeln!(out, "  name:      {}", product.name())?;
    writeln!(out, "  sku:       {}", product.sku())?;
    writeln!(out, "  price:     {}", product.price())?;
    writeln!(
        out,
        "  stock:     quantity={} reserved={} available={}",
        inventory.quantity(),
        inventory.reserved(),
        inventory.available()
    )?;
    writeln!(out, "  status:    {}", inventory.status())?;
    writeln!(
        out,
        "  reorder:   point={} quantity={}{}",
        inventory.reorder_point(),
        inventory.reorder_quantity(),
        if product.needs_reorder() { " (reorder now)" } else { "" }
    )?;
    let sales = product.sales_stats();
    write!(out, "  sales:     sold={} revenue={}", sales.total_sold, sales.revenue)?;
    if let Some(at) = sales.last_sold_at {
        write!(out, " last={}", timestamp(at))?;
    }
    writeln!(out)
}

pub fn product_line(out: &mut dyn Write, product: &Product) -> io::Result<()> {
    writeln!(
        out,
        "{}  {}  {}  {}  available={}  {}",
        product.id(),
        product.sku(),
        product.name(),
        product.price(),
        product.inventory().available(),
        product.inventory().status()
    )
}

pub fn transaction(out: &mut dyn Write, tx: &InventoryTransaction) -> io::Result<()> {
    write!(
        out,
        "{}  {:<10}  {:+}  {} -> {}",
        timestamp(tx.created_at),
        tx.kind.as_str(),
        tx.quantity,
        tx.quantity_before,
        tx.quantity_after
    )?;
    if let Some(order_id) = tx.order_id {
        write!(out, "  order={order_id}")?;
    }
    if let Some(by) = &tx.performed_by {
        write!(out, "  by={by}")?;
    }
    if let Some(notes) = &tx.notes {
        write!(out, "  {notes}")?;
    }
    writeln!(out)
}

pub fn summary(out: &mut dyn Write, summary: &TransactionSummary) -> io::Result<()> {
    writeln!(out, "product {}", summary.product_id)?;
    for (kind, totals) in &summary.by_type {
        writeln!(
            out,
            "  {:<10}  count={}  net={:+}",
            kind.as_str(),
            totals.count,
            totals.net_quantity
        )?;
    }
    writeln!(out, "  net change: {:+}", summary.net_change)
}

pub fn user(out: &mut dyn Write, user: &User) -> io::Result<()> {
    let stats = user.stats();
    writeln!(out, "user {}", user.id())?;
    writeln!(out, "  name:   {}", user.name())?;
    writeln!(out, "  email:  {}", user.email())?;
    write!(
        out,
        "  orders: {} spent={}",
        stats.total_orders, stats.total_spent
    )?;
    if let Some(at) = stats.last_order_date {
        write!(out, " last={}", timestamp(at))?;
    }
    writeln!(out)
}

pub fn order(out: &mut dyn Write, order: &Order) -> io::Result<()> {
    writeln!(out, "order {} ({})", order.order_number(), order.id())?;
    writeln!(out, "  status:   {}", order.status())?;
    writeln!(
        out,
        "  customer: {} <{}>",
        order.customer().name,
        order.customer().email
    )?;
    for item in order.items() {
        write!(
            out,
            "  item:     {} x{} @ {}",
            item.sku, item.quantity, item.price
        )?;
        if !item.discount.is_zero() {
            write!(out, " -{}", item.discount)?;
        }
        writeln!(out, " = {}", item.subtotal)?;
    }

    let pricing = order.pricing();
    writeln!(out, "  subtotal: {}", pricing.subtotal)?;
    if !pricing.discount.is_zero() {
        writeln!(out, "  discount: {}", pricing.discount)?;
    }
    writeln!(out, "  tax:      {}", pricing.tax)?;
    writeln!(out, "  shipping: {}", pricing.shipping)?;
    writeln!(out, "  total:    {}", pricing.total)?;

    let shipping = order.shipping();
    writeln!(out, "  ship to:  {}", shipping.address)?;
    if let Some(carrier) = &shipping.carrier {
        writeln!(
            out,
            "  carrier:  {} {}",
            carrier,
            shipping.tracking_number.as_deref().unwrap_or("")
        )?;
    }
    writeln!(out, "  payment:  {}", order.payment().method)?;
    if let Some(notes) = order.notes() {
        writeln!(out, "  notes:    {notes}")?;
    }

    for change in order.status_history() {
        write!(out, "  history:  {} {}", timestamp(change.timestamp), change.status)?;
        if let Some(by) = &change.updated_by {
            write!(out, " by {by}")?;
        }
        if let Some(note) = &change.note {
            write!(out, ": {note}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn order_line(out: &mut dyn Write, order: &Order) -> io::Result<()> {
    writeln!(
        out,
        "{}  {}  {:<10}  items={}  total={}  {}",
        order.order_number(),
        order.id(),
        order.status().as_str(),
        order.unit_count(),
        order.pricing().total,
        timestamp(order.created_at())
    )
}
