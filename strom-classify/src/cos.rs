//! Class-of-service descriptors: where a classified packet goes.

use std::fmt;

use strom_core::alloc::PoolId;
use strom_core::queue::QueueId;

use crate::rule::PmrRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CosId(pub u32);

impl CosId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CosId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to do when the class's pool cannot take the packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DropPolicy {
    /// Drop, as the pool would.
    #[default]
    Pool,
    /// Deliver the packet in the pool it arrived in.
    Never,
}

/// Creation parameters. A class without a queue or a pool drops everything
/// assigned to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CosParams {
    pub queue: Option<QueueId>,
    pub pool: Option<PoolId>,
    pub drop_policy: DropPolicy,
}

impl CosParams {
    pub fn new(queue: QueueId, pool: PoolId) -> Self {
        Self {
            queue: Some(queue),
            pool: Some(pool),
            drop_policy: DropPolicy::Pool,
        }
    }
}

/// Snapshot of one class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CosInfo {
    pub id: CosId,
    pub name: String,
    pub queue: Option<QueueId>,
    pub pool: Option<PoolId>,
    pub drop_policy: DropPolicy,
    pub group: u32,
    pub headroom: u32,
    /// Rule tested after this class matched, and the class it leads to.
    pub link: Option<(PmrRef, CosId)>,
}

#[derive(Clone, Debug)]
pub(crate) struct CosEntry {
    pub(crate) name: String,
    pub(crate) queue: Option<QueueId>,
    pub(crate) pool: Option<PoolId>,
    pub(crate) drop_policy: DropPolicy,
    /// Scheduling group tag handed to the scheduler above.
    pub(crate) group: u32,
    pub(crate) headroom: u32,
    pub(crate) link: Option<(PmrRef, CosId)>,
}

impl CosEntry {
    pub(crate) fn new(name: &str, params: &CosParams) -> Self {
        Self {
            name: name.to_owned(),
            queue: params.queue,
            pool: params.pool,
            drop_policy: params.drop_policy,
            group: 0,
            headroom: 0,
            link: None,
        }
    }

    pub(crate) fn info(&self, id: CosId) -> CosInfo {
        CosInfo {
            id,
            name: self.name.clone(),
            queue: self.queue,
            pool: self.pool,
            drop_policy: self.drop_policy,
            group: self.group,
            headroom: self.headroom,
            link: self.link,
        }
    }
}
