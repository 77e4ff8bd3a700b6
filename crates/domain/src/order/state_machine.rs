//! Status transitions of placed orders and their side effects.

use common::SharedClock;
use doc_store::DocumentStore;

use super::model::{Order, TransitionRequest};
use super::repository::{OrderFilter, OrderRepository};
use super::status::OrderStatus;
use crate::collections::ORDERS;
use crate::error::{DomainError, Result};
use crate::ids::OrderId;
use crate::ledger::{LedgerEntry, StockLedger};
use crate::persistence::{Updated, update_with_retry};
use crate::settings::{AuditPolicy, OrderSettings};
use crate::transaction_log::TransactionType;
use crate::user::UserDirectory;

/// Drives orders through their lifecycle.
///
/// A transition first claims the new status on the order document with a
/// compare-and-set, then runs the side effects of the target status. Only
/// the caller that wins the claim runs them, so concurrent cancellations of
/// one order release its stock once.
#[derive(Clone)]
pub struct OrderStateMachine<S> {
    orders: OrderRepository<S>,
    ledger: StockLedger<S>,
    users: UserDirectory<S>,
    clock: SharedClock,
    settings: OrderSettings,
}

impl<S: DocumentStore + Clone> OrderStateMachine<S> {
    pub fn new(
        store: S,
        ledger: StockLedger<S>,
        clock: SharedClock,
        settings: OrderSettings,
    ) -> Self {
        Self {
            orders: OrderRepository::new(store.clone()),
            users: UserDirectory::new(store, clock.clone())
                .with_max_write_attempts(settings.max_write_attempts),
            ledger,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &OrderSettings {
        &self.settings
    }

    /// Retrieves an order by id.
    pub async fn get(&self, id: OrderId) -> Result<Order> {
        self.orders.get(id).await
    }

    /// Retrieves an order by its order number.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Order> {
        self.orders.get_by_number(order_number).await
    }

    /// Lists orders, newest first.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        self.orders.list(filter).await
    }

    /// Moves an order to `request.to` and runs the side effects.
    ///
    /// Fails with `InvalidTransition` if the edge is not allowed. If the
    /// status was recorded but a side effect failed, returns
    /// `SideEffectFailed` after attempting every step.
    ///
    /// The status is not rolled back, and CANCELLED has no outgoing edge to
    /// retry from. A failed release on cancellation leaves its units
    /// reserved until they are returned with [`StockLedger::release`] for
    /// the order.
    #[tracing::instrument(skip(self, request), fields(to = %request.to))]
    pub async fn transition(&self, order_id: OrderId, request: TransitionRequest) -> Result<Order> {
        let policy = self.settings.cancellation_policy;
        let claim = request.clone();
        let Updated { before, after } = update_with_retry(
            self.orders.store(),
            self.clock.as_ref(),
            ORDERS,
            "order",
            order_id.into(),
            self.settings.max_write_attempts,
            move |order: &mut Order, now| {
                if !order.status().permits(claim.to, policy) {
                    return Err(DomainError::InvalidTransition {
                        order_number: order.order_number().to_string(),
                        from: order.status(),
                        to: claim.to,
                    });
                }
                order.record_transition(&claim, now);
                Ok(())
            },
        )
        .await
        .inspect_err(|err| {
            if let DomainError::InvalidTransition { from, to, .. } = err {
                tracing::info!(%from, %to, "transition rejected");
            }
        })?;

        metrics::counter!("order_transitions_total", "to" => request.to.as_str()).increment(1);
        tracing::info!(
            order_number = after.order_number(),
            from = %before.status(),
            to = %after.status(),
            "order status changed"
        );

        let failures = self.run_side_effects(&after, &request).await;
        if failures.is_empty() {
            return Ok(after);
        }

        Err(DomainError::SideEffectFailed {
            order_number: after.order_number().to_string(),
            status: after.status(),
            failures,
        })
    }

    /// Cancels an order and releases its reserved stock.
    ///
    /// Whether SHIPPED orders can be cancelled follows the configured
    /// [`crate::CancellationPolicy`]; DELIVERED orders never can.
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        reason: Option<String>,
        cancelled_by: Option<String>,
    ) -> Result<Order> {
        let mut request = TransitionRequest::to(OrderStatus::Cancelled).updated_by(cancelled_by);
        request.note = reason;
        self.transition(order_id, request).await
    }

    async fn run_side_effects(&self, order: &Order, request: &TransitionRequest) -> Vec<String> {
        let mut failures = Vec::new();
        match order.status() {
            OrderStatus::Cancelled => {
                for item in order.items() {
                    let entry = LedgerEntry::new(TransactionType::Return)
                        .for_order(order.id())
                        .notes(format!("Order {} cancelled", order.order_number()))
                        .performed_by(request.updated_by.clone());
                    // Stock goes back even when the audit log is down.
                    if let Err(err) = self
                        .ledger
                        .release_with_policy(
                            item.product_id,
                            item.quantity,
                            entry,
                            AuditPolicy::BestEffort,
                        )
                        .await
                    {
                        failures.push(self.side_effect_failed(
                            order,
                            format!(
                                "release {} x{} of product {} (still reserved)",
                                item.sku, item.quantity, item.product_id
                            ),
                            &err,
                        ));
                    }
                }
            }
            OrderStatus::Delivered => {
                let delivered_at = order.completed_at().unwrap_or_else(|| self.clock.now());
                for item in order.items() {
                    if let Err(err) = self
                        .ledger
                        .record_sale(item.product_id, item.quantity, item.subtotal, delivered_at)
                        .await
                    {
                        failures.push(self.side_effect_failed(
                            order,
                            format!("sales stats for {}", item.sku),
                            &err,
                        ));
                    }
                }
                if let Err(err) = self
                    .users
                    .record_order(order.user_id(), order.pricing().total, delivered_at)
                    .await
                {
                    failures.push(self.side_effect_failed(
                        order,
                        format!("order stats for user {}", order.user_id()),
                        &err,
                    ));
                }
            }
            _ => {}
        }
        failures
    }

    fn side_effect_failed(&self, order: &Order, step: String, err: &DomainError) -> String {
        metrics::counter!("order_side_effect_failures_total").increment(1);
        tracing::error!(
            order_number = order.order_number(),
            status = %order.status(),
            step = %step,
            error = %err,
            "order side effect failed"
        );
        format!("{step}: {err}")
    }
}
