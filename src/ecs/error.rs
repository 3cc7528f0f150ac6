//! Errors raised by the registry when a caller breaks an access contract

use thiserror::Error;

use super::Entity;
use super::signature::MAX_COMPONENTS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcsError {
    #[error("{entity} has no `{component}` component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },
    #[error("system `{0}` is not registered")]
    MissingSystem(&'static str),
    #[error("system `{0}` is already registered")]
    SystemAlreadyRegistered(&'static str),
    #[error("system `{0}` is running and cannot be borrowed from its own pass")]
    SystemBusy(&'static str),
    #[error("no entity is tagged `{0}`")]
    TagNotFound(String),
    #[error("group `{0}` does not exist")]
    GroupNotFound(String),
    #[error("{0} is not alive")]
    DeadEntity(Entity),
    #[error("cannot register `{0}`: all {MAX_COMPONENTS} component slots are in use")]
    ComponentLimit(&'static str),
}
