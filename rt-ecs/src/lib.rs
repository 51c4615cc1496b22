//! Sparse-array ECS core.
//!
//! Entities are generational handles ([`Entity`]) into a [`Registry`]. Components live in
//! per-type [`SparseSet`](storage::SparseSet) storage; multi-component queries run through
//! [`Registry::view`], which iterates the smallest involved storage and probes the rest.

mod entity;
mod error;
mod registry;
mod storage;
mod view;

pub use entity::Entity;
pub use error::EcsError;
pub use registry::{Component, ComponentRef, ComponentRefMut, Registry};
pub use storage::SparseSet;
pub use view::{View, ViewIter, ViewQuery};
