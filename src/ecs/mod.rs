//! Entity Component System (ECS) implementation
//!
//! Entities are plain ids, components live in packed per-type pools, and
//! systems are matched to entities by signature at one synchronization point
//! per frame.

pub mod commands;
pub mod component;
pub mod entity;
pub mod error;
pub mod events;
pub mod registry;
pub mod signature;
pub mod system;

pub use commands::CommandBuffer;
pub use component::{Component, ComponentPool, ComponentStorage};
pub use entity::{Entity, EntityId};
pub use error::EcsError;
pub use events::{Event, EventBus};
pub use registry::Registry;
pub use signature::{ComponentId, ComponentTypes, Requirements, Signature, MAX_COMPONENTS};
pub use system::{RenderContext, System, UpdateContext};
