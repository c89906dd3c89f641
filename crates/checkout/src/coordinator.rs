//! Checkout coordinator for placing orders.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{CustomerId, ProductId};
use domain::{LineItemRequest, PricingPolicy, merge_requests};
use order_store::CheckoutStore;

use crate::adjuster::{AdjustmentReport, InventoryAdjuster};
use crate::assembler::{OrderAssembler, OrderView};
use crate::cart::{CartReconciler, CartReconciliation};
use crate::error::{CheckoutError, Result};
use crate::locks::ProductLocks;
use crate::state::PlacementState;
use crate::tracker::PlacementTracker;
use crate::validator::InventoryValidator;
use crate::writer::{OrderDetails, OrderWriter};

/// A request to turn a cart into an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    pub items: Vec<LineItemRequest>,
    pub details: OrderDetails,
}

impl PlaceOrder {
    pub fn new(customer_id: CustomerId, items: Vec<LineItemRequest>) -> Self {
        Self {
            customer_id,
            items,
            details: OrderDetails::default(),
        }
    }

    pub fn with_details(mut self, details: OrderDetails) -> Self {
        self.details = details;
        self
    }
}

/// Everything known about a successful placement.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: OrderView,
    pub adjustments: AdjustmentReport,
    pub cart: CartReconciliation,
    pub trail: Vec<PlacementState>,
}

/// Orchestrates order placement.
///
/// Steps run strictly in order: validate, price, write, adjust inventory,
/// reconcile cart, assemble. Only the write has a compensating action; the
/// steps after it degrade gracefully because the order is already committed.
///
/// Products are locked from the stock lookup until their decrements are
/// applied, so concurrent placements for the same product are serialized and
/// the second one validates against the stock the first one left.
pub struct CheckoutCoordinator<S> {
    validator: InventoryValidator<S>,
    writer: OrderWriter<S>,
    adjuster: InventoryAdjuster<S>,
    cart: CartReconciler<S>,
    assembler: OrderAssembler<S>,
    pricing: PricingPolicy,
    locks: ProductLocks,
}

impl<S> CheckoutCoordinator<S>
where
    S: CheckoutStore + Clone,
{
    /// Creates a new coordinator over `store`.
    pub fn new(store: S, pricing: PricingPolicy) -> Self {
        Self {
            validator: InventoryValidator::new(store.clone()),
            writer: OrderWriter::new(store.clone()),
            adjuster: InventoryAdjuster::new(store.clone()),
            cart: CartReconciler::new(store.clone()),
            assembler: OrderAssembler::new(store),
            pricing,
            locks: ProductLocks::new(),
        }
    }

    /// Returns the pricing policy in use.
    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Places an order, running every step on the caller's task.
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<PlacedOrder> {
        self.run(cmd, &PlacementTracker::new()).await
    }

    /// Places an order on a separate task, waiting at most `deadline`.
    ///
    /// The placement does not depend on the caller staying around. If the
    /// deadline elapses before writing begins, the placement is stopped and
    /// `DeadlineExceeded { committed: false }` is returned. If the write is in
    /// flight, this waits for it to settle: a committed order keeps running
    /// in the background and the caller gets `DeadlineExceeded { committed: true }`,
    /// while a failed write is reported as the failure it was.
    pub async fn place_order_within(
        self: &Arc<Self>,
        cmd: PlaceOrder,
        deadline: Duration,
    ) -> Result<PlacedOrder>
    where
        S: 'static,
    {
        let tracker = PlacementTracker::new();
        let coordinator = Arc::clone(self);
        let run_tracker = tracker.clone();
        let mut handle = tokio::spawn(async move { coordinator.run(cmd, &run_tracker).await });

        match tokio::time::timeout(deadline, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(CheckoutError::Internal(join_error.to_string())),
            Err(_) => {
                let committed = tokio::select! {
                    biased;
                    committed = tracker.abandon_or_await_write() => committed,
                    joined = &mut handle => {
                        return joined.unwrap_or_else(|join_error| {
                            Err(CheckoutError::Internal(join_error.to_string()))
                        });
                    }
                };
                let state = tracker.state().await;
                if committed {
                    metrics::counter!("checkout_assembly_failures_total").increment(1);
                    tracing::error!(
                        %state,
                        "placement deadline exceeded after commit, finishing in background"
                    );
                } else {
                    tracing::warn!(%state, "placement deadline exceeded, no order committed");
                }
                Err(CheckoutError::DeadlineExceeded { committed })
            }
        }
    }

    #[tracing::instrument(skip(self, cmd, tracker), fields(customer_id = %cmd.customer_id))]
    async fn run(&self, cmd: PlaceOrder, tracker: &PlacementTracker) -> Result<PlacedOrder> {
        metrics::counter!("checkout_placements_total").increment(1);
        let started = Instant::now();
        let PlaceOrder {
            customer_id,
            items,
            details,
        } = cmd;

        // 1. Validate addresses, then the cart under the products' locks
        tracing::info!(step = %PlacementState::Validating, "placement step started");
        let product_ids: Vec<ProductId> = match merge_requests(&items) {
            Ok(merged) => merged.into_iter().map(|r| r.product_id).collect(),
            Err(reason) => return self.reject(tracker, reason.into()).await,
        };
        if let Err(e) = self
            .validator
            .validate_addresses(customer_id, &details.address_ids())
            .await
        {
            return self.reject(tracker, e).await;
        }
        let guard = self.locks.acquire(&product_ids).await;

        let cart = match self.validator.validate(&items).await {
            Ok(cart) => cart,
            Err(e) => return self.reject(tracker, e).await,
        };

        // 2. Price
        tracker.advance(PlacementState::Pricing).await?;
        let pricing = self.pricing.price(cart.items());

        // 3. Write, with compensation inside the writer
        if let Err(e) = tracker.advance(PlacementState::Writing).await {
            tracing::info!("placement abandoned before writing");
            return Err(e);
        }
        tracing::info!(step = %PlacementState::Writing, total = %pricing.total_amount, "placement step started");
        let order = match self
            .writer
            .create_order(customer_id, cart.items(), &pricing, &details)
            .await
        {
            Ok(order) => {
                tracker.record_write(true);
                order
            }
            Err(e) => {
                tracker.record_write(false);
                tracker.advance(PlacementState::Failed).await?;
                metrics::counter!("checkout_placements_failed").increment(1);
                tracing::warn!(error = %e, "order write failed");
                return Err(e);
            }
        };

        // 4. Adjust inventory, then release the locks
        tracker.advance(PlacementState::AdjustingInventory).await?;
        let adjustments = self.adjuster.apply(cart.adjustments()).await;
        drop(guard);
        if !adjustments.is_complete() {
            tracing::warn!(
                order_id = %order.id,
                order_number = %order.order_number,
                failed = ?adjustments.failed_ids(),
                "order committed with unapplied inventory adjustments"
            );
        }

        // 5. Reconcile the cart
        tracker.advance(PlacementState::ReconcilingCart).await?;
        let cart_outcome = self
            .cart
            .clear_purchased_items(customer_id, &cart.product_ids())
            .await;

        // 6. Assemble the response
        tracker.advance(PlacementState::Assembling).await?;
        let view = match self.assembler.assemble(order.id).await {
            Ok(view) => view,
            Err(e) => {
                tracker.advance(PlacementState::Failed).await?;
                metrics::counter!("checkout_assembly_failures_total").increment(1);
                tracing::error!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    error = %e,
                    "order committed but could not be assembled"
                );
                return Err(CheckoutError::AssemblyFailed {
                    order_id: order.id,
                    order_number: order.order_number,
                    source: Box::new(e),
                });
            }
        };

        tracker.advance(PlacementState::Done).await?;
        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_placement_duration_seconds").record(duration);
        metrics::counter!("checkout_placements_completed").increment(1);
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            duration,
            "order placed"
        );

        Ok(PlacedOrder {
            order: view,
            adjustments,
            cart: cart_outcome,
            trail: tracker.trail().await,
        })
    }

    async fn reject(&self, tracker: &PlacementTracker, error: CheckoutError) -> Result<PlacedOrder> {
        tracker.advance(PlacementState::Rejected).await?;
        metrics::counter!("checkout_placements_rejected", "reason" => error.kind()).increment(1);
        tracing::info!(reason = error.kind(), error = %error, "order rejected");
        Err(error)
    }
}
