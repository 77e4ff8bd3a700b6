//! Integration tests for order status transitions and their side effects.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use common::{Clock, FixedClock, SharedClock};
use doc_store::{DocumentStore, InMemoryDocumentStore};
use domain::collections::{INVENTORY_TRANSACTIONS, PRODUCTS};
use domain::{
    CancellationPolicy, CustomerSnapshot, DomainError, ErrorKind, LedgerEntry, LedgerSettings,
    LineItem, Money, NewProduct, NewUser, Order, OrderDraft, OrderFilter, OrderId,
    OrderRepository, OrderSettings, OrderStateMachine, OrderStatus, PaymentInfo, Pricing,
    ProductCatalog, ProductId, ShippingInfo, StockLedger, TransactionType, TransitionRequest,
    UserDirectory, UserId,
};
use futures_util::future::join_all;

struct Fixture {
    store: InMemoryDocumentStore,
    clock: FixedClock,
    catalog: ProductCatalog<InMemoryDocumentStore>,
    ledger: StockLedger<InMemoryDocumentStore>,
    users: UserDirectory<InMemoryDocumentStore>,
    orders: OrderRepository<InMemoryDocumentStore>,
    machine: OrderStateMachine<InMemoryDocumentStore>,
}

fn fixture(policy: CancellationPolicy) -> Fixture {
    let store = InMemoryDocumentStore::new();
    let fixed = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    let clock: SharedClock = Arc::new(fixed.clone());
    let ledger = StockLedger::new(store.clone(), clock.clone(), LedgerSettings::default());
    let settings = OrderSettings {
        cancellation_policy: policy,
        ..OrderSettings::default()
    };
    Fixture {
        catalog: ProductCatalog::new(store.clone(), clock.clone()),
        users: UserDirectory::new(store.clone(), clock.clone()),
        orders: OrderRepository::new(store.clone()),
        machine: OrderStateMachine::new(store.clone(), ledger.clone(), clock, settings),
        ledger,
        clock: fixed,
        store,
    }
}

async fn product(fx: &Fixture, sku: &str, price_cents: i64, quantity: u32) -> ProductId {
    fx.catalog
        .create(NewProduct::new(sku, sku, Money::from_cents(price_cents)).with_quantity(quantity))
        .await
        .unwrap()
        .id()
}

async fn user(fx: &Fixture) -> UserId {
    fx.users
        .create(NewUser::new("Ada", "ada@example.com"))
        .await
        .unwrap()
        .id()
}

/// Reserves each line and stores a PENDING order for it.
async fn pending_order(fx: &Fixture, user_id: UserId, lines: &[(ProductId, u32)]) -> Order {
    let order_id = OrderId::new();
    let mut items = Vec::new();
    for &(product_id, quantity) in lines {
        let product = fx
            .ledger
            .reserve(
                product_id,
                quantity,
                LedgerEntry::new(TransactionType::Sale).for_order(order_id),
            )
            .await
            .unwrap();
        items.push(LineItem::snapshot(&product, quantity, None, Money::zero()).unwrap());
    }
    let subtotal: Money = items.iter().map(|i| i.subtotal).sum();
    let draft = OrderDraft {
        id: order_id,
        user_id,
        customer: CustomerSnapshot {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        },
        items,
        pricing: Pricing::new(
            subtotal,
            Money::zero(),
            subtotal.basis_points(1000).unwrap(),
            Money::zero(),
        )
        .unwrap(),
        payment: PaymentInfo {
            method: "card".to_string(),
            reference: None,
        },
        shipping: ShippingInfo::to("1 Main St"),
        notes: None,
    };
    let order = draft.into_pending(
        format!("ORD-20240301-{:04}", fx.store.increment_counter("test").await.unwrap()),
        fx.clock_now(),
        None,
    );
    fx.orders.insert(&order).await.unwrap();
    order
}

impl Fixture {
    fn clock_now(&self) -> chrono::DateTime<Utc> {
        self.clock.now()
    }

    async fn walk(&self, id: OrderId, path: &[OrderStatus]) -> Order {
        let mut last = None;
        for &status in path {
            self.clock.advance(Duration::minutes(1));
            last = Some(
                self.machine
                    .transition(id, TransitionRequest::to(status))
                    .await
                    .unwrap(),
            );
        }
        last.unwrap()
    }

    async fn available(&self, id: ProductId) -> i64 {
        self.ledger.levels(id).await.unwrap().available()
    }
}

#[tokio::test]
async fn happy_path_to_delivery_accrues_stats() {
    let fx = fixture(CancellationPolicy::BeforeShipment);
    let user_id = user(&fx).await;
    let widget = product(&fx, "W-1", 1000, 10).await;
    let gadget = product(&fx, "G-1", 250, 10).await;
    let order = pending_order(&fx, user_id, &[(widget, 2), (gadget, 4)]).await;

    let delivered = fx
        .walk(
            order.id(),
            &[
                OrderStatus::Confirmed,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
            ],
        )
        .await;

    assert_eq!(delivered.status(), OrderStatus::Delivered);
    assert!(delivered.completed_at().is_some());
    assert!(delivered.shipping().shipped_at.is_some());
    let history: Vec<_> = delivered.status_history().iter().map(|c| c.status).collect();
    assert_eq!(
        history,
        vec![
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ]
    );

    let widget_stats = fx.catalog.get(widget).await.unwrap().sales_stats().clone();
    assert_eq!(widget_stats.total_sold, 2);
    assert_eq!(widget_stats.revenue, Money::from_cents(2000));
    let gadget_stats = fx.catalog.get(gadget).await.unwrap().sales_stats().clone();
    assert_eq!(gadget_stats.total_sold, 4);
    assert_eq!(gadget_stats.revenue, Money::from_cents(1000));

    let stats = fx.users.get(user_id).await.unwrap().stats().clone();
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.total_spent, order.pricing().total);
    assert_eq!(stats.last_order_date, delivered.completed_at());

    // Delivered units stay reserved; available is not restored.
    assert_eq!(fx.available(widget).await, 8);
}

#[tokio::test]
async fn pending_cannot_jump_to_delivered() {
    let fx = fixture(CancellationPolicy::BeforeShipment);
    let user_id = user(&fx).await;
    let widget = product(&fx, "W-1", 1000, 10).await;
    let order = pending_order(&fx, user_id, &[(widget, 1)]).await;

    let err = fx
        .machine
        .transition(order.id(), TransitionRequest::to(OrderStatus::Delivered))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Delivered,
            ..
        }
    ));

    let stored = fx.machine.get(order.id()).await.unwrap();
    assert_eq!(stored, order);
}

#[tokio::test]
async fn terminal_statuses_reject_every_transition() {
    let fx = fixture(CancellationPolicy::AllowAfterShipment);
    let user_id = user(&fx).await;
    let widget = product(&fx, "W-1", 1000, 10).await;

    let cancelled = pending_order(&fx, user_id, &[(widget, 1)]).await;
    fx.walk(cancelled.id(), &[OrderStatus::Cancelled]).await;

    let refunded = pending_order(&fx, user_id, &[(widget, 1)]).await;
    fx.walk(
        refunded.id(),
        &[
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Refunded,
        ],
    )
    .await;

    for id in [cancelled.id(), refunded.id()] {
        for to in OrderStatus::ALL {
            let err = fx
                .machine
                .transition(id, TransitionRequest::to(to))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        }
    }
}

#[tokio::test]
async fn cancelling_releases_every_line_and_logs_returns() {
    let fx = fixture(CancellationPolicy::BeforeShipment);
    let user_id = user(&fx).await;
    let widget = product(&fx, "W-1", 1000, 2).await;
    let gadget = product(&fx, "G-1", 500, 5).await;
    let order = pending_order(&fx, user_id, &[(widget, 2), (gadget, 3)]).await;
    assert_eq!(fx.available(widget).await, 0);

    let cancelled = fx
        .machine
        .cancel_order(order.id(), Some("customer request".to_string()), None)
        .await
        .unwrap();

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at().is_some());
    assert_eq!(
        cancelled.status_history().last().and_then(|c| c.note.as_deref()),
        Some("customer request")
    );
    assert_eq!(fx.available(widget).await, 2);
    assert_eq!(fx.available(gadget).await, 5);
    assert_eq!(fx.ledger.levels(widget).await.unwrap().reserved(), 0);

    let records = fx.ledger.log().for_order(order.id()).await.unwrap();
    let returns: Vec<_> = records
        .iter()
        .filter(|t| t.kind == TransactionType::Return)
        .map(|t| (t.product_id, t.quantity))
        .collect();
    assert_eq!(returns, vec![(widget, 2), (gadget, 3)]);
}

#[tokio::test]
async fn shipped_orders_follow_cancellation_policy() {
    let strict = fixture(CancellationPolicy::BeforeShipment);
    let user_id = user(&strict).await;
    let widget = product(&strict, "W-1", 1000, 5).await;
    let order = pending_order(&strict, user_id, &[(widget, 2)]).await;
    strict
        .walk(
            order.id(),
            &[OrderStatus::Confirmed, OrderStatus::Processing, OrderStatus::Shipped],
        )
        .await;

    let err = strict.machine.cancel_order(order.id(), None, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let err = strict
        .machine
        .transition(order.id(), TransitionRequest::to(OrderStatus::Cancelled))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(strict.available(widget).await, 3);

    let lenient = fixture(CancellationPolicy::AllowAfterShipment);
    let user_id = user(&lenient).await;
    let widget = product(&lenient, "W-1", 1000, 5).await;
    let order = pending_order(&lenient, user_id, &[(widget, 2)]).await;
    lenient
        .walk(
            order.id(),
            &[OrderStatus::Confirmed, OrderStatus::Processing, OrderStatus::Shipped],
        )
        .await;
    lenient.machine.cancel_order(order.id(), None, None).await.unwrap();
    assert_eq!(lenient.available(widget).await, 5);
}

#[tokio::test]
async fn delivered_orders_can_never_be_cancelled() {
    let fx = fixture(CancellationPolicy::AllowAfterShipment);
    let user_id = user(&fx).await;
    let widget = product(&fx, "W-1", 1000, 5).await;
    let order = pending_order(&fx, user_id, &[(widget, 1)]).await;
    fx.walk(
        order.id(),
        &[
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ],
    )
    .await;

    let err = fx.machine.cancel_order(order.id(), None, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn shipping_records_carrier_and_tracking() {
    let fx = fixture(CancellationPolicy::BeforeShipment);
    let user_id = user(&fx).await;
    let widget = product(&fx, "W-1", 1000, 5).await;
    let order = pending_order(&fx, user_id, &[(widget, 1)]).await;
    fx.walk(order.id(), &[OrderStatus::Confirmed, OrderStatus::Processing])
        .await;

    let shipped = fx
        .machine
        .transition(
            order.id(),
            TransitionRequest::to(OrderStatus::Shipped)
                .note("left warehouse")
                .updated_by(Some("ops".to_string()))
                .tracking(Some("UPS".to_string()), Some("1Z999".to_string())),
        )
        .await
        .unwrap();

    assert_eq!(shipped.shipping().carrier.as_deref(), Some("UPS"));
    assert_eq!(shipped.shipping().tracking_number.as_deref(), Some("1Z999"));
    let last = shipped.status_history().last().unwrap();
    assert_eq!(last.updated_by.as_deref(), Some("ops"));
    assert_eq!(last.timestamp, shipped.shipping().shipped_at.unwrap());
}

#[tokio::test]
async fn failed_side_effects_are_reported_after_the_status_change() {
    let fx = fixture(CancellationPolicy::BeforeShipment);
    let user_id = user(&fx).await;
    let widget = product(&fx, "W-1", 1000, 5).await;
    let order = pending_order(&fx, user_id, &[(widget, 2)]).await;

    fx.store.set_collection_unavailable(PRODUCTS, true);
    let err = fx.machine.cancel_order(order.id(), None, None).await.unwrap_err();
    fx.store.set_collection_unavailable(PRODUCTS, false);

    match &err {
        DomainError::SideEffectFailed {
            status, failures, ..
        } => {
            assert_eq!(*status, OrderStatus::Cancelled);
            assert_eq!(failures.len(), 1);
            assert!(failures[0].contains(&widget.to_string()));
            assert!(failures[0].contains("still reserved"));
        }
        other => panic!("expected SideEffectFailed, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(
        fx.machine.get(order.id()).await.unwrap().status(),
        OrderStatus::Cancelled
    );
}

#[tokio::test]
async fn audit_log_outage_does_not_block_cancellation() {
    let fx = fixture(CancellationPolicy::BeforeShipment);
    let user_id = user(&fx).await;
    let widget = product(&fx, "W-1", 1000, 5).await;
    let order = pending_order(&fx, user_id, &[(widget, 2)]).await;

    fx.store.set_collection_unavailable(INVENTORY_TRANSACTIONS, true);
    fx.machine.cancel_order(order.id(), None, None).await.unwrap();
    assert_eq!(fx.available(widget).await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancellations_release_once() {
    let fx = fixture(CancellationPolicy::BeforeShipment);
    let user_id = user(&fx).await;
    let widget = product(&fx, "W-1", 1000, 10).await;
    let order = pending_order(&fx, user_id, &[(widget, 4)]).await;
    assert_eq!(fx.available(widget).await, 6);

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let machine = fx.machine.clone();
            let id = order.id();
            tokio::spawn(async move { machine.cancel_order(id, None, None).await })
        })
        .collect();
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::InvalidTransition)
    );
    assert_eq!(fx.available(widget).await, 10);
    assert_eq!(fx.ledger.levels(widget).await.unwrap().reserved(), 0);
}

#[tokio::test]
async fn lists_orders_by_user_and_status_newest_first() {
    let fx = fixture(CancellationPolicy::BeforeShipment);
    let ada = user(&fx).await;
    let grace = fx
        .users
        .create(NewUser::new("Grace", "grace@example.com"))
        .await
        .unwrap()
        .id();
    let widget = product(&fx, "W-1", 1000, 20).await;

    let first = pending_order(&fx, ada, &[(widget, 1)]).await;
    fx.clock.advance(Duration::minutes(5));
    let second = pending_order(&fx, ada, &[(widget, 1)]).await;
    fx.clock.advance(Duration::minutes(5));
    pending_order(&fx, grace, &[(widget, 1)]).await;
    fx.walk(first.id(), &[OrderStatus::Confirmed]).await;

    let adas = fx
        .machine
        .list(&OrderFilter::default().for_user(ada))
        .await
        .unwrap();
    let ids: Vec<_> = adas.iter().map(|o| o.id()).collect();
    assert_eq!(ids, vec![second.id(), first.id()]);

    let confirmed = fx
        .machine
        .list(&OrderFilter::default().with_status(OrderStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id(), first.id());

    let page = fx
        .machine
        .list(&OrderFilter::default().page(1, 1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id(), second.id());

    let by_number = fx.machine.get_by_number(second.order_number()).await.unwrap();
    assert_eq!(by_number.id(), second.id());
    assert_eq!(
        fx.machine.get_by_number("ORD-19990101-0001").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}
