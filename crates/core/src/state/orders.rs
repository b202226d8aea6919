//! Order tracker.
//!
//! Orders live in exactly one of five per-chain buckets (pending,
//! presignature pending, fulfilled, expired, cancelled). Every status change
//! removes the order from all buckets before inserting it into the bucket of
//! its new status, so an id never shows up twice for a chain.

use crate::domain::{
    ApiAdditionalInfo, ChainId, Order, OrderBucket, OrderId, OrderObject, OrderStatus,
    SafeMultisigTransaction,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::outcome::Outcome;

/// order id => order
pub type OrdersMap = HashMap<OrderId, OrderObject>;

/// Settlement data for one order of a batch fulfillment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfilledOrderInfo {
    pub id: OrderId,
    pub fulfillment_time: String,
    pub transaction_hash: String,
    #[serde(default)]
    pub api_additional_info: Option<ApiAdditionalInfo>,
}

/// Events handled by the order tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OrderAction {
    AddPending {
        chain_id: ChainId,
        id: OrderId,
        order: Order,
    },
    PreSign {
        chain_id: ChainId,
        ids: Vec<OrderId>,
    },
    UpdatePresignGnosisSafeTx {
        chain_id: ChainId,
        order_id: OrderId,
        safe_transaction: SafeMultisigTransaction,
    },
    Remove {
        chain_id: ChainId,
        id: OrderId,
    },
    Fulfill {
        chain_id: ChainId,
        id: OrderId,
        fulfillment_time: String,
        transaction_hash: String,
    },
    FulfillBatch {
        chain_id: ChainId,
        orders_data: Vec<FulfilledOrderInfo>,
    },
    Expire {
        chain_id: ChainId,
        id: OrderId,
    },
    ExpireBatch {
        chain_id: ChainId,
        ids: Vec<OrderId>,
    },
    RequestCancellation {
        chain_id: ChainId,
        id: OrderId,
    },
    Cancel {
        chain_id: ChainId,
        id: OrderId,
    },
    CancelBatch {
        chain_id: ChainId,
        ids: Vec<OrderId>,
    },
    Clear {
        chain_id: ChainId,
    },
    UpdateLastCheckedBlock {
        chain_id: ChainId,
        last_checked_block: u64,
    },
    SetUnfillable {
        chain_id: ChainId,
        id: OrderId,
        is_unfillable: bool,
    },
}

impl OrderAction {
    pub fn chain_id(&self) -> ChainId {
        match self {
            OrderAction::AddPending { chain_id, .. }
            | OrderAction::PreSign { chain_id, .. }
            | OrderAction::UpdatePresignGnosisSafeTx { chain_id, .. }
            | OrderAction::Remove { chain_id, .. }
            | OrderAction::Fulfill { chain_id, .. }
            | OrderAction::FulfillBatch { chain_id, .. }
            | OrderAction::Expire { chain_id, .. }
            | OrderAction::ExpireBatch { chain_id, .. }
            | OrderAction::RequestCancellation { chain_id, .. }
            | OrderAction::Cancel { chain_id, .. }
            | OrderAction::CancelBatch { chain_id, .. }
            | OrderAction::Clear { chain_id }
            | OrderAction::UpdateLastCheckedBlock { chain_id, .. }
            | OrderAction::SetUnfillable { chain_id, .. } => *chain_id,
        }
    }
}

/// Orders of one chain, partitioned by status.
///
/// Buckets missing from older persisted state deserialize as empty, and an
/// absent `lastCheckedBlock` is filled in on the next mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersStateNetwork {
    #[serde(default)]
    pending: OrdersMap,
    #[serde(default)]
    presignature_pending: OrdersMap,
    #[serde(default)]
    fulfilled: OrdersMap,
    #[serde(default)]
    expired: OrdersMap,
    #[serde(default)]
    cancelled: OrdersMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_checked_block: Option<u64>,
}

impl OrdersStateNetwork {
    /// Empty buckets, scanning from the chain's deployment block
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            last_checked_block: Some(chain_id.deployment_block()),
            ..Self::default()
        }
    }

    pub fn bucket(&self, bucket: OrderBucket) -> &OrdersMap {
        match bucket {
            OrderBucket::Pending => &self.pending,
            OrderBucket::PresignaturePending => &self.presignature_pending,
            OrderBucket::Fulfilled => &self.fulfilled,
            OrderBucket::Expired => &self.expired,
            OrderBucket::Cancelled => &self.cancelled,
        }
    }

    fn bucket_mut(&mut self, bucket: OrderBucket) -> &mut OrdersMap {
        match bucket {
            OrderBucket::Pending => &mut self.pending,
            OrderBucket::PresignaturePending => &mut self.presignature_pending,
            OrderBucket::Fulfilled => &mut self.fulfilled,
            OrderBucket::Expired => &mut self.expired,
            OrderBucket::Cancelled => &mut self.cancelled,
        }
    }

    pub fn last_checked_block(&self) -> Option<u64> {
        self.last_checked_block
    }

    /// Bucket currently holding `id`, searched in [`OrderBucket::SEARCH_ORDER`]
    pub fn bucket_of(&self, id: &OrderId) -> Option<OrderBucket> {
        OrderBucket::SEARCH_ORDER
            .into_iter()
            .find(|bucket| self.bucket(*bucket).contains_key(id))
    }

    pub fn find(&self, id: &OrderId) -> Option<&OrderObject> {
        self.bucket_of(id).and_then(|bucket| self.bucket(bucket).get(id))
    }

    fn find_mut(&mut self, id: &OrderId) -> Option<&mut OrderObject> {
        let bucket = self.bucket_of(id)?;
        self.bucket_mut(bucket).get_mut(id)
    }

    /// Deletes `id` from every bucket, returning the entry the search order
    /// finds first
    fn remove_by_id(&mut self, id: &OrderId) -> Option<OrderObject> {
        OrderBucket::SEARCH_ORDER
            .into_iter()
            .map(|bucket| self.bucket_mut(bucket).remove(id))
            .fold(None, |found, removed| found.or(removed))
    }

    fn insert(&mut self, bucket: OrderBucket, object: OrderObject) {
        self.bucket_mut(bucket).insert(object.id.clone(), object);
    }

    /// Moves an order into the bucket of `status`, applying `update` on the way
    fn transition<F>(&mut self, id: &OrderId, status: OrderStatus, update: F) -> Outcome
    where
        F: FnOnce(&mut Order),
    {
        let Some(mut object) = self.remove_by_id(id) else {
            return Outcome::Ignored;
        };

        object.order.status = status;
        update(&mut object.order);
        debug!("Order {} moved to {}", id, status.bucket().name());
        self.insert(status.bucket(), object);
        Outcome::Applied
    }

    fn update_in_place<F>(&mut self, id: &OrderId, update: F) -> Outcome
    where
        F: FnOnce(&mut Order),
    {
        match self.find_mut(id) {
            Some(object) => {
                update(&mut object.order);
                Outcome::Applied
            }
            None => Outcome::Ignored,
        }
    }

    /// Number of orders across all buckets
    pub fn len(&self) -> usize {
        OrderBucket::SEARCH_ORDER
            .iter()
            .map(|bucket| self.bucket(*bucket).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// chain id => orders of that chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrdersState {
    chains: HashMap<ChainId, OrdersStateNetwork>,
}

impl OrdersState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(&self, chain_id: ChainId) -> Option<&OrdersStateNetwork> {
        self.chains.get(&chain_id)
    }

    pub fn find(&self, chain_id: ChainId, id: &OrderId) -> Option<&OrderObject> {
        self.chains.get(&chain_id)?.find(id)
    }

    pub fn bucket(&self, chain_id: ChainId, bucket: OrderBucket) -> Option<&OrdersMap> {
        self.chains.get(&chain_id).map(|network| network.bucket(bucket))
    }

    /// Block the poller should resume scanning from
    pub fn last_checked_block(&self, chain_id: ChainId) -> u64 {
        self.chains
            .get(&chain_id)
            .and_then(OrdersStateNetwork::last_checked_block)
            .unwrap_or_else(|| chain_id.deployment_block())
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.chains.keys().copied()
    }

    /// Whether the chain has state and a recorded last checked block. Any
    /// event for a chain that is not yet seeded changes state.
    pub fn is_seeded(&self, chain_id: ChainId) -> bool {
        self.chains
            .get(&chain_id)
            .map_or(false, |network| network.last_checked_block.is_some())
    }

    /// Seeds missing chain state and backfills a missing last checked block
    fn ensure_chain(&mut self, chain_id: ChainId) -> &mut OrdersStateNetwork {
        let network = self
            .chains
            .entry(chain_id)
            .or_insert_with(|| OrdersStateNetwork::new(chain_id));
        if network.last_checked_block.is_none() {
            network.last_checked_block = Some(chain_id.deployment_block());
        }
        network
    }

    /// Applies one event in place
    pub fn reduce(&mut self, action: OrderAction) -> Outcome {
        let network = self.ensure_chain(action.chain_id());

        match action {
            OrderAction::AddPending { id, order, .. } => {
                let bucket = match order.status {
                    OrderStatus::PresignaturePending => OrderBucket::PresignaturePending,
                    _ => OrderBucket::Pending,
                };
                network.remove_by_id(&id);
                debug!("Adding order {} to {}", id, bucket.name());
                network.insert(bucket, OrderObject { id, order });
                Outcome::Applied
            }

            OrderAction::PreSign { ids, .. } => ids.iter().fold(Outcome::Ignored, |outcome, id| {
                outcome.merge(network.transition(id, OrderStatus::Pending, |_| {}))
            }),

            OrderAction::UpdatePresignGnosisSafeTx {
                order_id,
                safe_transaction,
                ..
            } => network.update_in_place(&order_id, |order| {
                order.presign_gnosis_safe_tx = Some(safe_transaction);
            }),

            OrderAction::Remove { id, .. } => match network.remove_by_id(&id) {
                Some(_) => Outcome::Applied,
                None => Outcome::Ignored,
            },

            OrderAction::Fulfill {
                id,
                fulfillment_time,
                transaction_hash,
                ..
            } => network.transition(&id, OrderStatus::Fulfilled, |order| {
                order.fulfillment_time = Some(fulfillment_time);
                order.fulfilled_transaction_hash = Some(transaction_hash);
                order.is_cancelling = false;
            }),

            OrderAction::FulfillBatch { orders_data, .. } => {
                orders_data
                    .into_iter()
                    .fold(Outcome::Ignored, |outcome, info| {
                        let FulfilledOrderInfo {
                            id,
                            fulfillment_time,
                            transaction_hash,
                            api_additional_info,
                        } = info;
                        outcome.merge(network.transition(&id, OrderStatus::Fulfilled, |order| {
                            order.fulfillment_time = Some(fulfillment_time);
                            order.fulfilled_transaction_hash = Some(transaction_hash);
                            order.is_cancelling = false;
                            order.api_additional_info = api_additional_info;
                        }))
                    })
            }

            OrderAction::Expire { id, .. } => network.transition(&id, OrderStatus::Expired, |order| {
                order.is_cancelling = false;
            }),

            OrderAction::ExpireBatch { ids, .. } => {
                ids.iter().fold(Outcome::Ignored, |outcome, id| {
                    outcome.merge(network.transition(id, OrderStatus::Expired, |order| {
                        order.is_cancelling = false;
                    }))
                })
            }

            OrderAction::RequestCancellation { id, .. } => {
                network.update_in_place(&id, |order| order.is_cancelling = true)
            }

            OrderAction::Cancel { id, .. } => {
                network.transition(&id, OrderStatus::Cancelled, |order| {
                    order.is_cancelling = false;
                })
            }

            OrderAction::CancelBatch { ids, .. } => {
                ids.iter().fold(Outcome::Ignored, |outcome, id| {
                    outcome.merge(network.transition(id, OrderStatus::Cancelled, |order| {
                        order.is_cancelling = false;
                    }))
                })
            }

            OrderAction::UpdateLastCheckedBlock {
                last_checked_block, ..
            } => {
                network.last_checked_block = Some(last_checked_block);
                Outcome::Applied
            }

            OrderAction::SetUnfillable {
                id, is_unfillable, ..
            } => network.update_in_place(&id, |order| order.is_unfillable = is_unfillable),

            OrderAction::Clear { chain_id } => {
                debug!("Clearing orders on chain {}", chain_id);
                *network = OrdersStateNetwork {
                    last_checked_block: network.last_checked_block,
                    ..OrdersStateNetwork::default()
                };
                Outcome::Applied
            }
        }
    }

    /// Copy-on-write form of [`OrdersState::reduce`]
    pub fn reduced(mut self, action: OrderAction) -> (Self, Outcome) {
        let outcome = self.reduce(action);
        (self, outcome)
    }
}
