use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum EcsError {
    #[error("entity index space exhausted")]
    RegistryFull,
    #[error("stale entity handle")]
    StaleEntity,
    #[error("component missing on entity")]
    ComponentMissing,
    #[error("component type not registered")]
    ComponentTypeUnregistered,
}
