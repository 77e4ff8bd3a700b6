//! Order orchestrator for placing multi-line orders.

use common::SharedClock;
use doc_store::DocumentStore;
use domain::{
    AuditPolicy, CustomerSnapshot, DomainError, LedgerEntry, LineItem, Money, Order, OrderDraft,
    OrderId, OrderNumberGenerator, OrderRepository, OrderSettings, Pricing, ProductCatalog,
    Result, ShippingInfo, StockLedger, TransactionType, User, UserDirectory,
};

use crate::cart::PlaceOrder;
use crate::reservations::Reservations;

/// Attempts at finding an unused order number before giving up.
const ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// Places orders with all-or-nothing stock reservation.
///
/// Each line is reserved through the [`StockLedger`] independently; there
/// is no cross-product transaction. Instead, a failure at any point after
/// the first reservation releases every line reserved so far.
#[derive(Clone)]
pub struct OrderOrchestrator<S> {
    catalog: ProductCatalog<S>,
    ledger: StockLedger<S>,
    users: UserDirectory<S>,
    orders: OrderRepository<S>,
    numbers: OrderNumberGenerator<S>,
    clock: SharedClock,
    settings: OrderSettings,
}

impl<S> OrderOrchestrator<S>
where
    S: DocumentStore + Clone,
{
    /// Creates a new orchestrator.
    pub fn new(
        store: S,
        ledger: StockLedger<S>,
        clock: SharedClock,
        settings: OrderSettings,
    ) -> Self {
        Self {
            catalog: ProductCatalog::new(store.clone(), clock.clone()),
            users: UserDirectory::new(store.clone(), clock.clone())
                .with_max_write_attempts(settings.max_write_attempts),
            orders: OrderRepository::new(store.clone()),
            numbers: OrderNumberGenerator::new(store, clock.clone()),
            ledger,
            clock,
            settings,
        }
    }

    /// Places an order and returns it in PENDING status.
    ///
    /// On failure nothing stays reserved and no order is stored.
    #[tracing::instrument(
        skip(self, request),
        fields(user_id = %request.user_id, lines = request.items.len())
    )]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order> {
        let started = std::time::Instant::now();
        request.validate()?;
        let user = self.users.get(request.user_id).await?;

        let order_id = OrderId::new();
        let mut reservations = Reservations::new();
        let result = self
            .try_place(order_id, &request, &user, &mut reservations)
            .await;

        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(order) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_number = order.order_number(),
                    total = %order.pricing().total,
                    "order placed"
                );
                Ok(order)
            }
            Err(err) => {
                self.roll_back(order_id, &reservations, &err, request.placed_by.clone())
                    .await;
                Err(err)
            }
        }
    }

    async fn try_place(
        &self,
        order_id: OrderId,
        request: &PlaceOrder,
        user: &User,
        reservations: &mut Reservations,
    ) -> Result<Order> {
        let mut items = Vec::with_capacity(request.items.len());
        let mut subtotal = Money::zero();

        for line in &request.items {
            let product = self.catalog.get(line.product_id).await?;

            let unit_price = line.unit_price.unwrap_or_else(|| product.price());
            if line.discount > unit_price {
                return Err(DomainError::validation(format!(
                    "discount {} on {} exceeds unit price {}",
                    line.discount,
                    product.sku(),
                    unit_price
                )));
            }

            LineItem::subtotal_for(unit_price, line.discount, line.quantity)?;

            let available = product.inventory().available();
            if available < i64::from(line.quantity) {
                return Err(DomainError::InsufficientStock {
                    product_id: product.id(),
                    available,
                    requested: line.quantity,
                });
            }

            let entry = LedgerEntry::new(TransactionType::Sale)
                .for_order(order_id)
                .notes("Order placement")
                .performed_by(request.placed_by.clone());
            let reserved = self
                .ledger
                .reserve(line.product_id, line.quantity, entry)
                .await?;
            reservations.record(line.product_id, line.quantity);

            let item =
                LineItem::snapshot(&reserved, line.quantity, line.unit_price, line.discount)?;
            subtotal = subtotal.checked_add(item.subtotal).ok_or_else(|| {
                DomainError::validation(format!("order subtotal is out of range at {}", item.sku))
            })?;
            items.push(item);
        }

        if request.discount > subtotal {
            return Err(DomainError::validation(format!(
                "order discount {} exceeds subtotal {}",
                request.discount, subtotal
            )));
        }
        let tax = match request.tax {
            Some(tax) => tax,
            None => subtotal
                .basis_points(self.settings.default_tax_rate_bps)
                .ok_or_else(|| {
                    DomainError::validation("tax on the order subtotal is out of range")
                })?,
        };
        let shipping = request.shipping_cost.unwrap_or_else(Money::zero);

        let draft = OrderDraft {
            id: order_id,
            user_id: user.id(),
            customer: CustomerSnapshot {
                name: user.name().to_string(),
                email: user.email().to_string(),
            },
            items,
            pricing: Pricing::new(subtotal, request.discount, tax, shipping)?,
            payment: request.payment.clone(),
            shipping: ShippingInfo::to(request.shipping_address.trim()),
            notes: request.notes.clone(),
        };

        self.persist(draft, request.placed_by.clone()).await
    }

    /// Stores the order under a fresh number, retrying if the number is taken.
    async fn persist(&self, draft: OrderDraft, placed_by: Option<String>) -> Result<Order> {
        let mut last_taken = None;
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let number = self.numbers.next().await?;
            let order = draft
                .clone()
                .into_pending(number.clone(), self.clock.now(), placed_by.clone());
            match self.orders.insert(&order).await {
                Ok(()) => return Ok(order),
                Err(DomainError::DuplicateKey { .. }) => {
                    tracing::warn!(order_number = %number, "order number already taken, retrying");
                    last_taken = Some(number);
                }
                Err(err) => return Err(err),
            }
        }
        Err(DomainError::DuplicateKey {
            entity: "order number".to_string(),
            key: last_taken.unwrap_or_default(),
        })
    }

    /// Releases everything reserved in a failed attempt, newest first.
    async fn roll_back(
        &self,
        order_id: OrderId,
        reservations: &Reservations,
        cause: &DomainError,
        placed_by: Option<String>,
    ) {
        if reservations.is_empty() {
            return;
        }

        metrics::counter!("order_placement_rollbacks_total").increment(1);
        tracing::warn!(
            %order_id,
            lines = reservations.len(),
            error = %cause,
            "order placement failed, releasing reservations"
        );

        for (product_id, quantity) in reservations.to_release() {
            let entry = LedgerEntry::new(TransactionType::Return)
                .for_order(order_id)
                .notes("Order placement rolled back")
                .performed_by(placed_by.clone());
            if let Err(err) = self
                .ledger
                .release_with_policy(product_id, quantity, entry, AuditPolicy::BestEffort)
                .await
            {
                metrics::counter!("order_rollback_release_failures_total").increment(1);
                tracing::error!(
                    %order_id,
                    %product_id,
                    quantity,
                    error = %err,
                    "failed to release reservation during rollback"
                );
            }
        }
    }
}
