//! Collectors for the first four pipeline stages.
//!
//! Each collector runs one filtered scan and hands a compact result to the
//! next stage. Identifier sets are shared through `Arc` so that scan
//! predicates, which must be `'static`, can consult them on the decoder
//! thread.

use crate::entity::{Entity, EntityFilter};
use crate::source::{EntitySource, SourceError};

mod admin;
mod geometry;
mod nodes;

pub use admin::{AdminRelationCollector, AdminRelationData, AdminRelations, build_boundaries};
pub use geometry::{WayGeometry, WayGeometryCollector};
pub use nodes::{
    AwaitingMembers, AwaitingWays, NodeCoordinateCollector, RequiredNodeCollector, RequiredNodes,
};

/// Run one scan and feed every entity to `visit`, stopping at the first error.
fn for_each_entity<S, F>(source: &S, filter: &EntityFilter, mut visit: F) -> Result<(), SourceError>
where
    S: EntitySource + ?Sized,
    F: FnMut(Entity),
{
    for entity in source.scan(filter)? {
        visit(entity?);
    }
    Ok(())
}
