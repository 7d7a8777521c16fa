//! The errors that can occur while wiring blueprints together.
use crate::dependency::DependencyKey;

/// The error returned when mounting, flattening or invoking blueprints goes wrong.
///
/// None of these failures is transient: they all point at a bug in the way
/// blueprints have been composed or provided.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WiringError {
    #[error(transparent)]
    AlreadySealed(#[from] BlueprintAlreadySealed),
    #[error(transparent)]
    CyclicMount(#[from] CyclicMount),
    #[error(transparent)]
    MissingDependency(#[from] MissingDependency),
    #[error(transparent)]
    DependencyTypeMismatch(#[from] DependencyTypeMismatch),
}

/// A blueprint was consumed twice.
///
/// Each blueprint can be consumed exactly once: either by the parent it's mounted
/// under or by invoking its own factory.
/// `owner` records who consumed it first; when that happened several mount
/// levels deep it reads as a chain, e.g. `api => v1 => users`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{caller} cannot invoke {blueprint} because it was already invoked by {owner}")]
pub struct BlueprintAlreadySealed {
    /// Who tried to consume the blueprint.
    pub caller: String,
    /// The name of the blueprint.
    pub blueprint: String,
    /// Who consumed the blueprint first.
    pub owner: String,
}

/// A blueprint is mounted, directly or transitively, under itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{blueprint}` is mounted under itself: {}", .cycle.join(" => "))]
pub struct CyclicMount {
    /// The blueprint that closes the cycle.
    pub blueprint: String,
    /// The names of the blueprints along the cycle.
    /// The first and the last element are the same blueprint.
    pub cycle: Vec<String>,
}

/// The dependency-injection host didn't supply a value for one of the factory's keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No value was provided for `{key}` (`{type_name}`), required to build `{component}`")]
pub struct MissingDependency {
    pub key: DependencyKey,
    pub type_name: &'static str,
    pub component: &'static str,
}

/// The dependency-injection host supplied a value of the wrong type for one of the factory's keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("The value provided for `{key}` is not a `{expected}`")]
pub struct DependencyTypeMismatch {
    pub key: DependencyKey,
    pub expected: &'static str,
}
