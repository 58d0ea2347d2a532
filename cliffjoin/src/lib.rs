//! Distance-bounded association of climbing areas with cliff
//! footprints.
//!
//! Two independent passes with different semantics:
//!
//! - **Association (tight)**: each area is paired with its single
//!   nearest footprint within `d_assoc`, then pairs are grouped and
//!   summed per footprint. Approximates "which wall does this named
//!   area describe". Areas with no footprint in reach are dropped;
//!   footprints with no areas get a zero record, so the output is a
//!   left outer join from the footprint side.
//! - **Vicinity (loose)**: every area within `d_vicinity` of a
//!   footprint contributes, with no best-match restriction.
//!   Approximates how much recreation happens near the wall at all,
//!   regardless of attribution.
//!
//! Both passes see only areas with at least one rock route;
//! boulder-only areas never enter the join.

mod join;

pub use crate::join::{join, AreaPoint, CliffShape, JoinParams, JoinedCliff};
