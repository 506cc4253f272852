//! Pose hierarchy engine for articulated hands.
//!
//! A hand is a fixed 21-bone topology whose bones may be only partially present in a given
//! skeleton. Tracked poses flow through a [`PoseCache`] that keeps relative, absolute and
//! absolute-scaled representations coherent, optionally through [`PoseFilterChain`]s, and are
//! finally applied to the present bones of a [`SkeletonHierarchy`].
//!
//! This crate is engine-agnostic: rendering, input and persistence belong to the embedding
//! application.

#![forbid(unsafe_code)]

mod error;
mod events;
mod fixed_id_set;
mod ids;
mod pose;
mod runtime;
mod topology;

pub use error::*;
pub use events::*;
pub use fixed_id_set::*;
pub use ids::*;
pub use pose::*;
pub use runtime::*;
pub use topology::*;
