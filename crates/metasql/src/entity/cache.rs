//! Process-wide descriptor cache.
//!
//! Append-only: an entry is written once per type and never replaced. Two
//! threads racing on first use may both build a descriptor; the first insert
//! wins and both get the same `Arc` back. Shapes are deterministic, so the
//! loser's copy is identical anyway.

use super::{Entity, EntityDescriptor};
use crate::error::OrmResult;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

type DescriptorMap = HashMap<TypeId, Arc<EntityDescriptor>>;

fn cache() -> &'static RwLock<DescriptorMap> {
    static CACHE: OnceLock<RwLock<DescriptorMap>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

pub(super) fn descriptor_for<T: Entity>() -> OrmResult<Arc<EntityDescriptor>> {
    let key = TypeId::of::<T>();

    if let Some(hit) = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(Arc::clone(hit));
    }

    // Build outside the lock; invalid shapes are not cached and fail again on
    // the next call.
    let built = Arc::new(EntityDescriptor::from_shape(&T::shape())?);
    tracing::debug!(entity = built.type_name(), table = %built.table(), "metasql descriptor cached");

    let mut map = cache().write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(map.entry(key).or_insert(built)))
}

/// Number of cached descriptors.
pub fn cached_descriptor_count() -> usize {
    cache().read().unwrap_or_else(PoisonError::into_inner).len()
}
