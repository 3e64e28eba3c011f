//! The shared plan cache.
//!
//! Plans are keyed by query type and tracking mode. Each key owns one
//! build slot: the first caller builds while holding the slot lock, so
//! concurrent callers for the same key block and then reuse the winner's
//! plan. A failed build caches nothing; planning failures are
//! deterministic, so the next caller fails the same way without any
//! retry bookkeeping.

use crate::plan::CompiledQueryPlan;
use crate::query::{CompiledQuery, TrackingMode};
use docstore_core::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

type PlanKey = (TypeId, TrackingMode);

struct Slot {
    cell: Mutex<Option<Arc<dyn Any + Send + Sync>>>,
}

/// Cache of built plans, shared by every session of one client.
///
/// An explicitly constructed value, owned by the client instance rather
/// than a process-wide static, so independent clients never share plans.
#[derive(Default)]
pub struct PlanCache {
    slots: Mutex<HashMap<PlanKey, Arc<Slot>>>,
}

impl PlanCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the plan for `(Q, tracking)`, building it with `build` on a
    /// miss. Losing racers block until the winner finishes, then share
    /// its plan.
    pub fn get_or_build<Q, F>(
        &self,
        tracking: TrackingMode,
        build: F,
    ) -> Result<Arc<CompiledQueryPlan<Q>>>
    where
        Q: CompiledQuery,
        F: FnOnce() -> Result<Arc<CompiledQueryPlan<Q>>>,
    {
        let slot = self.slot_for((TypeId::of::<Q>(), tracking));

        let mut cell = slot.cell.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cell.as_ref() {
            return downcast_plan::<Q>(Arc::clone(cached));
        }

        let plan = build()?;
        *cell = Some(plan.clone() as Arc<dyn Any + Send + Sync>);
        tracing::debug!(
            query = plan.query_name(),
            tracking = ?tracking,
            "cached compiled query plan"
        );
        Ok(plan)
    }

    /// The cached plan for `(Q, tracking)`, if one was built.
    pub fn get<Q: CompiledQuery>(
        &self,
        tracking: TrackingMode,
    ) -> Option<Arc<CompiledQueryPlan<Q>>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.get(&(TypeId::of::<Q>(), tracking))?;
        let cell = slot.cell.lock().unwrap_or_else(PoisonError::into_inner);
        cell.as_ref()
            .cloned()
            .and_then(|any| downcast_plan::<Q>(any).ok())
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| {
                slot.cell
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached plan.
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.clear();
    }

    fn slot_for(&self, key: PlanKey) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_insert_with(|| {
            Arc::new(Slot {
                cell: Mutex::new(None),
            })
        }))
    }
}

fn downcast_plan<Q: CompiledQuery>(
    any: Arc<dyn Any + Send + Sync>,
) -> Result<Arc<CompiledQueryPlan<Q>>> {
    any.downcast::<CompiledQueryPlan<Q>>().map_err(|_| {
        Error::Custom(format!(
            "plan cache slot holds a foreign plan for {}",
            Q::QUERY_NAME
        ))
    })
}
