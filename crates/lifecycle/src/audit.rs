//! Audit trail: one append-only record per committed transition, plus
//! set-once first-arrival stamping.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use resale_core::{EntityId, RecordId};

use crate::invocation::Invocation;
use crate::machine::{Label, Machine};
use crate::subject::Subject;

/// Immutable history entry written in the same commit as the state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord<S> {
    pub id: RecordId,
    pub entity_id: EntityId,
    /// State after the transition.
    pub state: S,
    /// Name of the event that caused it.
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Builds audit artifacts for the engine.
pub struct AuditRecorder;

impl AuditRecorder {
    /// History record describing `subject` after the transition.
    pub fn record<M: Machine>(
        subject: &Subject<M>,
        invocation: &Invocation<M::Event>,
        now: DateTime<Utc>,
    ) -> HistoryRecord<M::State> {
        HistoryRecord {
            id: RecordId::new(),
            entity_id: subject.id(),
            state: subject.state(),
            event: invocation.event().name().to_string(),
            source: invocation.source().map(str::to_string),
            created_at: now,
        }
    }

    /// Stamp the subject's current state if it has never been stamped.
    pub(crate) fn stamp_first_arrival<M: Machine>(
        subject: &mut Subject<M>,
        now: DateTime<Utc>,
    ) -> bool {
        let state = subject.state();
        let stamped = subject.first_arrivals_mut().stamp(state, now);
        if stamped {
            tracing::debug!(entity_id = %subject.id(), state = state.name(), "first arrival stamped");
        }
        stamped
    }
}

/// Ordered history of one entity.
///
/// Creation writes no record; the optional origin stands in for it so the
/// initial state still has an entry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History<S> {
    records: Vec<HistoryRecord<S>>,
    origin: Option<(S, DateTime<Utc>)>,
}

impl<S: Label> History<S> {
    /// Sorts by `(created_at, id)`; record ids are time-ordered so ties on
    /// the timestamp keep insertion order.
    pub fn from_records(mut records: Vec<HistoryRecord<S>>) -> Self {
        records.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Self {
            records,
            origin: None,
        }
    }

    /// The entity was created in `state` at `at`, before the first record.
    pub fn with_origin(mut self, state: S, at: DateTime<Utc>) -> Self {
        self.origin = Some((state, at));
        self
    }

    pub fn origin(&self) -> Option<(S, DateTime<Utc>)> {
        self.origin
    }

    pub fn records(&self) -> &[HistoryRecord<S>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn current_state(&self) -> Option<S> {
        self.records
            .last()
            .map(|r| r.state)
            .or(self.origin.map(|(state, _)| state))
    }

    fn origin_in(&self, state: S) -> Option<DateTime<Utc>> {
        self.origin
            .filter(|(origin, _)| *origin == state)
            .map(|(_, at)| at)
    }

    pub fn first_entered(&self, state: S) -> Option<DateTime<Utc>> {
        self.origin_in(state).or_else(|| {
            self.records
                .iter()
                .find(|r| r.state == state)
                .map(|r| r.created_at)
        })
    }

    pub fn last_entered(&self, state: S) -> Option<DateTime<Utc>> {
        self.records
            .iter()
            .rev()
            .find(|r| r.state == state)
            .map(|r| r.created_at)
            .or_else(|| self.origin_in(state))
    }

    /// Total time spent in `state`, counting the open interval up to `now`
    /// when the entity is still there. Re-affirmations do not restart the
    /// interval.
    pub fn time_in_state(&self, state: S, now: DateTime<Utc>) -> Duration {
        let mut total = Duration::zero();
        let mut entered = self.origin_in(state);

        for record in &self.records {
            match (record.state == state, entered) {
                (true, None) => entered = Some(record.created_at),
                (false, Some(since)) => {
                    total += record.created_at - since;
                    entered = None;
                }
                _ => {}
            }
        }
        if let Some(since) = entered {
            total += now - since;
        }
        total
    }

    /// `(state, event, at)` triples in order.
    pub fn timeline(&self) -> Vec<(S, &str, DateTime<Utc>)> {
        self.records
            .iter()
            .map(|r| (r.state, r.event.as_str(), r.created_at))
            .collect()
    }
}

impl<S> IntoIterator for History<S> {
    type Item = HistoryRecord<S>;
    type IntoIter = std::vec::IntoIter<HistoryRecord<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::Stage;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    fn record(entity_id: EntityId, state: Stage, event: &str, minute: u32) -> HistoryRecord<Stage> {
        HistoryRecord {
            id: RecordId::new(),
            entity_id,
            state,
            event: event.to_string(),
            source: None,
            created_at: at(minute),
        }
    }

    #[test]
    fn history_is_ordered_by_creation_time() {
        let id = EntityId::new();
        let history = History::from_records(vec![
            record(id, Stage::Listed, "release", 5),
            record(id, Stage::Stockroom, "receive", 1),
        ]);

        assert_eq!(history.current_state(), Some(Stage::Listed));
        assert_eq!(history.first_entered(Stage::Stockroom), Some(at(1)));
    }

    #[test]
    fn time_in_state_sums_visits_and_open_interval() {
        let id = EntityId::new();
        let history = History::from_records(vec![
            record(id, Stage::Listed, "release", 0),
            record(id, Stage::Listed, "release", 3),
            record(id, Stage::Stockroom, "delist", 10),
            record(id, Stage::Listed, "release", 20),
        ]);

        assert_eq!(history.time_in_state(Stage::Listed, at(25)), Duration::minutes(15));
        assert_eq!(history.time_in_state(Stage::Stockroom, at(25)), Duration::minutes(10));
        assert_eq!(history.last_entered(Stage::Listed), Some(at(20)));
        assert_eq!(history.timeline().len(), 4);
    }

    #[test]
    fn origin_opens_the_first_interval() {
        let id = EntityId::new();
        let history = History::from_records(vec![
            record(id, Stage::ReadyToList, "prepare", 30),
            record(id, Stage::Stockroom, "release", 40),
        ])
        .with_origin(Stage::Stockroom, at(0));

        assert_eq!(history.time_in_state(Stage::Stockroom, at(45)), Duration::minutes(35));
        assert_eq!(history.time_in_state(Stage::ReadyToList, at(45)), Duration::minutes(10));
        assert_eq!(history.first_entered(Stage::Stockroom), Some(at(0)));
        assert_eq!(history.last_entered(Stage::Stockroom), Some(at(40)));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn origin_alone_answers_for_an_untouched_entity() {
        let history = History::<Stage>::from_records(Vec::new()).with_origin(Stage::Drafted, at(5));

        assert!(history.is_empty());
        assert_eq!(history.current_state(), Some(Stage::Drafted));
        assert_eq!(history.time_in_state(Stage::Drafted, at(9)), Duration::minutes(4));
        assert_eq!(history.time_in_state(Stage::Listed, at(9)), Duration::zero());
    }
}
