//! The entity under lifecycle control.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use resale_core::{AggregateRoot, EntityId};

use crate::machine::{Label, Machine};

/// Ad hoc marker value consulted by guards (e.g. a listing hold).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Text(String),
}

/// Ad hoc booleans/strings attached to an entity.
///
/// Written by hooks or external collaborators, read by guards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(BTreeMap<String, FlagValue>);

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.0.insert(key.into(), FlagValue::Bool(value));
    }

    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), FlagValue::Text(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.0.get(key)
    }

    /// `true` for `Bool(true)` and for non-empty text.
    pub fn is_set(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(FlagValue::Bool(b)) => *b,
            Some(FlagValue::Text(s)) => !s.is_empty(),
            None => false,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(FlagValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FlagValue> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Set-once "first entered" instants for the states that carry them.
#[derive(Clone, PartialEq, Eq)]
pub struct FirstArrivals<S: Label> {
    stamps: HashMap<S, DateTime<Utc>>,
}

impl<S: Label> FirstArrivals<S> {
    pub fn new() -> Self {
        Self {
            stamps: HashMap::new(),
        }
    }

    pub fn get(&self, state: S) -> Option<DateTime<Utc>> {
        self.stamps.get(&state).copied()
    }

    /// Records `at` for `state` unless a value is already present.
    ///
    /// Returns whether a stamp was written.
    pub fn stamp(&mut self, state: S, at: DateTime<Utc>) -> bool {
        if self.stamps.contains_key(&state) {
            return false;
        }
        self.stamps.insert(state, at);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (S, DateTime<Utc>)> + '_ {
        self.stamps.iter().map(|(s, at)| (*s, *at))
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

impl<S: Label> Default for FirstArrivals<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Label> fmt::Debug for FirstArrivals<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.stamps.iter().map(|(s, at)| (s.name(), at)))
            .finish()
    }
}

impl<S: Label> FromIterator<(S, DateTime<Utc>)> for FirstArrivals<S> {
    fn from_iter<I: IntoIterator<Item = (S, DateTime<Utc>)>>(iter: I) -> Self {
        let mut arrivals = Self::new();
        for (state, at) in iter {
            arrivals.stamp(state, at);
        }
        arrivals
    }
}

/// A lifecycle-managed entity.
///
/// `state` is only ever changed by the engine; hooks receive `&mut Subject`
/// and may touch flags and data but have no way to assign a state.
pub struct Subject<M: Machine> {
    id: EntityId,
    state: M::State,
    version: u64,
    first_arrivals: FirstArrivals<M::State>,
    flags: Flags,
    data: M::Data,
    /// State and instant of creation, when known.
    origin: Option<(M::State, DateTime<Utc>)>,
}

impl<M: Machine> Subject<M> {
    /// A fresh, never-transitioned entity.
    pub fn new(id: EntityId, initial: M::State, data: M::Data) -> Self {
        Self {
            id,
            state: initial,
            version: 0,
            first_arrivals: FirstArrivals::new(),
            flags: Flags::new(),
            data,
            origin: None,
        }
    }

    /// Rebuild a persisted entity (storage adapters only).
    pub fn restore(
        id: EntityId,
        state: M::State,
        version: u64,
        first_arrivals: FirstArrivals<M::State>,
        flags: Flags,
        data: M::Data,
    ) -> Self {
        Self {
            id,
            state,
            version,
            first_arrivals,
            flags,
            data,
            origin: None,
        }
    }

    /// Record where the entity started, so time spent in its initial state
    /// is counted by [`crate::History`].
    pub fn with_origin(mut self, state: M::State, created_at: DateTime<Utc>) -> Self {
        self.origin = Some((state, created_at));
        self
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn state(&self) -> M::State {
        self.state
    }

    /// Number of committed transitions.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn first_arrivals(&self) -> &FirstArrivals<M::State> {
        &self.first_arrivals
    }

    pub fn first_arrival(&self, state: M::State) -> Option<DateTime<Utc>> {
        self.first_arrivals.get(state)
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    pub fn data(&self) -> &M::Data {
        &self.data
    }

    pub fn origin(&self) -> Option<(M::State, DateTime<Utc>)> {
        self.origin
    }

    pub fn data_mut(&mut self) -> &mut M::Data {
        &mut self.data
    }

    pub(crate) fn set_state(&mut self, state: M::State) {
        self.state = state;
    }

    pub(crate) fn first_arrivals_mut(&mut self) -> &mut FirstArrivals<M::State> {
        &mut self.first_arrivals
    }

    pub(crate) fn advance_version(&mut self) {
        self.version += 1;
    }
}

impl<M: Machine> Clone for Subject<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: self.state,
            version: self.version,
            first_arrivals: self.first_arrivals.clone(),
            flags: self.flags.clone(),
            data: self.data.clone(),
            origin: self.origin,
        }
    }
}

impl<M: Machine> fmt::Debug for Subject<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("entity_type", &M::ENTITY_TYPE)
            .field("id", &self.id)
            .field("state", &self.state.name())
            .field("version", &self.version)
            .field("first_arrivals", &self.first_arrivals)
            .field("flags", &self.flags)
            .field("data", &self.data)
            .field("origin", &self.origin.map(|(state, at)| (state.name(), at)))
            .finish()
    }
}

impl<M: Machine> AggregateRoot for Subject<M> {
    type Id = EntityId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
