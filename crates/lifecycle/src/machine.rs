//! Type-level description of one lifecycle.

use core::fmt::Debug;
use core::hash::Hash;

/// A closed, finite set of names (states or events).
///
/// Implemented by plain fieldless enums. `all()` lists every variant in
/// declaration order; `name()` is the stable snake_case name used in logs,
/// history records and downstream notifications.
pub trait Label: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn all() -> &'static [Self];

    fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|label| label.name() == name)
    }
}

/// Binds together the types one lifecycle operates on.
pub trait Machine: Sized + Send + Sync + 'static {
    type State: Label;
    type Event: Label;
    /// Typed payload of the entity (read by guards, mutated by hooks).
    type Data: Clone + Debug + Send + Sync + 'static;
    /// Collaborators handed to guards and hooks on every `fire`.
    type Services: Send + Sync + 'static;

    /// Stable entity type name used in logs and notifications.
    const ENTITY_TYPE: &'static str;
}
