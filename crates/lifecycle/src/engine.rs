//! The transition pipeline.

use std::fmt;
use std::sync::Arc;

use resale_core::{EntityId, ExpectedVersion};
use resale_events::StateChanged;
use resale_observability::{ErrorSink, TracingErrorSink};

use crate::audit::{AuditRecorder, History, HistoryRecord};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::LifecycleError;
use crate::hooks::{ExecutedHook, HookContext, HookFn, Named, Phase};
use crate::invocation::Invocation;
use crate::lifecycle::Lifecycle;
use crate::machine::{Label, Machine};
use crate::notifier::{AfterCommitOutcome, CommitNotifier};
use crate::registry::{EnterStep, STAMP_FIRST_ARRIVAL};
use crate::store::SubjectStore;
use crate::subject::Subject;

/// A transition that has been durably committed.
pub struct Committed<M: Machine> {
    /// The entity as persisted.
    pub subject: Subject<M>,
    pub invocation: Invocation<M::Event>,
    pub from: M::State,
    pub to: M::State,
    /// Index of the selected rule within the event's rule list.
    pub rule_index: usize,
    pub record: HistoryRecord<M::State>,
    /// Pre-commit steps in the order they ran.
    pub executed: Vec<ExecutedHook>,
}

impl<M: Machine> Committed<M> {
    pub fn event(&self) -> M::Event {
        self.invocation.event()
    }

    pub fn is_reentry(&self) -> bool {
        self.from == self.to
    }

    /// Notification payload for downstream consumers.
    pub fn state_changed(&self) -> StateChanged {
        StateChanged {
            event_kind: self.event().name().to_string(),
            entity_id: self.subject.id(),
            entity_type: M::ENTITY_TYPE.to_string(),
            previous_state: self.from.name().to_string(),
            new_state: self.to.name().to_string(),
            version: self.subject.version(),
            source: self.invocation.source().map(str::to_string),
            occurred_at: self.record.created_at,
        }
    }
}

impl<M: Machine> fmt::Debug for Committed<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Committed")
            .field("subject", &self.subject)
            .field("event", &self.event().name())
            .field("from", &self.from.name())
            .field("to", &self.to.name())
            .field("rule_index", &self.rule_index)
            .field("record", &self.record)
            .field("executed", &self.executed)
            .finish()
    }
}

/// Outcome of a successful `fire`: the commit, then what happened to each
/// after-commit hook.
pub struct Fired<M: Machine> {
    pub committed: Committed<M>,
    pub after_commit: Vec<AfterCommitOutcome>,
}

impl<M: Machine> Fired<M> {
    pub fn state(&self) -> M::State {
        self.committed.to
    }

    pub fn subject(&self) -> &Subject<M> {
        &self.committed.subject
    }

    pub fn notifications_ok(&self) -> bool {
        self.after_commit.iter().all(AfterCommitOutcome::is_ok)
    }

    pub fn failed_after_commit(&self) -> Vec<&AfterCommitOutcome> {
        self.after_commit.iter().filter(|o| !o.is_ok()).collect()
    }
}

impl<M: Machine> fmt::Debug for Fired<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fired")
            .field("committed", &self.committed)
            .field("after_commit", &self.after_commit)
            .finish()
    }
}

/// Fires events of one lifecycle against entities in `St`.
pub struct LifecycleEngine<M: Machine, St> {
    lifecycle: Arc<Lifecycle<M>>,
    store: St,
    clock: Arc<dyn Clock>,
    errors: Arc<dyn ErrorSink>,
    config: EngineConfig,
}

impl<M, St> LifecycleEngine<M, St>
where
    M: Machine,
    St: SubjectStore<M>,
{
    pub fn new(lifecycle: Arc<Lifecycle<M>>, store: St) -> Self {
        Self {
            lifecycle,
            store,
            clock: Arc::new(SystemClock),
            errors: Arc::new(TracingErrorSink),
            config: EngineConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_error_sink(mut self, errors: Arc<dyn ErrorSink>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lifecycle(&self) -> &Lifecycle<M> {
        &self.lifecycle
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Persist a new entity in `initial` state.
    ///
    /// No history record is written and no hooks run: creation is not a
    /// transition. A stamped initial state is stamped here, and the creation
    /// instant is kept as the subject's origin.
    pub fn create(
        &self,
        id: EntityId,
        initial: M::State,
        data: M::Data,
    ) -> Result<Subject<M>, LifecycleError> {
        self.lifecycle.ensure_state(initial)?;

        let now = self.clock.now();
        let mut subject = Subject::new(id, initial, data).with_origin(initial, now);
        if self
            .lifecycle
            .states()
            .hooks(initial)
            .is_some_and(|entry| entry.stamps_first_arrival())
        {
            AuditRecorder::stamp_first_arrival(&mut subject, now);
        }

        self.store.insert(&subject)?;
        tracing::debug!(
            entity_type = M::ENTITY_TYPE,
            entity_id = %id,
            state = initial.name(),
            "entity created"
        );
        Ok(subject)
    }

    pub fn load(&self, id: EntityId) -> Result<Subject<M>, LifecycleError> {
        self.store.load(id)?.ok_or(LifecycleError::NotFound(id))
    }

    /// Committed history of `id`, opened at its creation when known.
    pub fn history(&self, id: EntityId) -> Result<History<M::State>, LifecycleError> {
        let history = History::from_records(self.store.history(id)?);
        Ok(match self.store.load(id)?.and_then(|subject| subject.origin()) {
            Some((state, at)) => history.with_origin(state, at),
            None => history,
        })
    }

    /// Events whose rules accept the entity's state and at least one of whose
    /// candidate guards currently passes.
    pub fn permitted_events(
        &self,
        id: EntityId,
        services: &M::Services,
    ) -> Result<Vec<M::Event>, LifecycleError> {
        let subject = self.load(id)?;
        self.lifecycle.ensure_state(subject.state())?;
        let now = self.clock.now();

        let mut permitted = Vec::new();
        for entry in self.lifecycle.table().entries() {
            let invocation = Invocation::new(entry.event());
            if entry.select(&subject, &invocation, services, now)?.is_some() {
                permitted.push(entry.event());
            }
        }
        Ok(permitted)
    }

    /// Whether `fire` would currently select a rule. Guards run, hooks do not.
    pub fn can_fire(
        &self,
        id: EntityId,
        invocation: &Invocation<M::Event>,
        services: &M::Services,
    ) -> Result<bool, LifecycleError> {
        let entry = self.lifecycle.event(invocation.event())?;
        let subject = self.load(id)?;
        self.lifecycle.ensure_state(subject.state())?;
        Ok(entry
            .select(&subject, invocation, services, self.clock.now())?
            .is_some())
    }

    /// Fire an event given by name.
    pub fn fire_named(
        &self,
        id: EntityId,
        event: &str,
        source: Option<&str>,
        services: &M::Services,
    ) -> Result<Fired<M>, LifecycleError> {
        let mut invocation = Invocation::new(self.lifecycle.parse_event(event)?);
        if let Some(source) = source {
            invocation = invocation.with_source(source);
        }
        self.fire(id, invocation, services)
    }

    /// Run the full transition pipeline for one event.
    ///
    /// On `Err` the entity and its history are exactly as before the call.
    /// On `Ok` the transition is committed; after-commit failures are in
    /// [`Fired::after_commit`] and never turn the result into an error.
    pub fn fire(
        &self,
        id: EntityId,
        invocation: Invocation<M::Event>,
        services: &M::Services,
    ) -> Result<Fired<M>, LifecycleError> {
        let event = invocation.event();
        let span = tracing::info_span!(
            "lifecycle.fire",
            engine = %self.config.name,
            entity_type = M::ENTITY_TYPE,
            entity_id = %id,
            event = event.name(),
            source = invocation.source().unwrap_or("-"),
        );
        let _entered = span.enter();

        let entry = self.lifecycle.event(event)?;

        let lock = self.store.lock(id, self.config.lock_timeout)?;
        let current = self.load(id)?;
        let from = current.state();
        self.lifecycle.ensure_state(from)?;

        let now = self.clock.now();
        let (rule_index, rule) = match entry.select(&current, &invocation, services, now)? {
            Some(selected) => selected,
            None => {
                tracing::debug!(state = from.name(), "no applicable transition");
                return Err(LifecycleError::NoApplicableTransition {
                    event: event.name(),
                    state: from.name(),
                });
            }
        };
        let to = rule.rule.to();
        self.lifecycle.ensure_state(to)?;
        tracing::debug!(from = from.name(), to = to.name(), rule = rule_index, "rule selected");

        // Every mutation happens on the working copy; returning early drops
        // it and leaves the stored row untouched.
        let mut working = current.clone();
        let mut executed = Vec::new();
        let ctx = HookContext {
            services,
            invocation: &invocation,
            from,
            to,
            now,
        };
        let states = self.lifecycle.states();

        run_all(&entry.before, Phase::Before, event, &mut working, &ctx, &mut executed)?;
        if let Some(state) = states.hooks(from) {
            run_all(&state.exit, Phase::Exit, event, &mut working, &ctx, &mut executed)?;
        }

        working.set_state(to);

        if let Some(state) = states.hooks(to) {
            run_all(
                &state.before_enter,
                Phase::BeforeEnter,
                event,
                &mut working,
                &ctx,
                &mut executed,
            )?;
            for step in &state.enter {
                match step {
                    EnterStep::Hook(hook) => {
                        run_hook(hook, Phase::Enter, event, &mut working, &ctx, &mut executed)?
                    }
                    EnterStep::StampFirstArrival => {
                        AuditRecorder::stamp_first_arrival(&mut working, now);
                        executed.push(ExecutedHook::new(Phase::Enter, STAMP_FIRST_ARRIVAL));
                    }
                }
            }
        }

        run_all(&entry.after, Phase::After, event, &mut working, &ctx, &mut executed)?;
        if let Some(hook) = &rule.hook {
            run_hook(hook, Phase::Rule, event, &mut working, &ctx, &mut executed)?;
        }

        working.advance_version();
        let record = AuditRecorder::record(&working, &invocation, now);
        self.store
            .commit(&working, record.clone(), ExpectedVersion::Exact(current.version()))
            .inspect_err(|err| tracing::warn!(error = %err, "commit failed; transition rolled back"))?;
        drop(lock);

        tracing::info!(
            from = from.name(),
            to = to.name(),
            version = working.version(),
            hooks = executed.len(),
            "transition committed"
        );

        let committed = Committed {
            subject: working,
            invocation,
            from,
            to,
            rule_index,
            record,
            executed,
        };
        let after_commit = CommitNotifier::new(&*self.errors, self.config.catch_after_commit_panics)
            .notify(&entry.after_commit, &committed, services);

        Ok(Fired {
            committed,
            after_commit,
        })
    }
}

fn run_all<M: Machine>(
    hooks: &[Named<HookFn<M>>],
    phase: Phase,
    event: M::Event,
    working: &mut Subject<M>,
    ctx: &HookContext<'_, M>,
    executed: &mut Vec<ExecutedHook>,
) -> Result<(), LifecycleError> {
    hooks
        .iter()
        .try_for_each(|hook| run_hook(hook, phase, event, working, ctx, executed))
}

fn run_hook<M: Machine>(
    hook: &Named<HookFn<M>>,
    phase: Phase,
    event: M::Event,
    working: &mut Subject<M>,
    ctx: &HookContext<'_, M>,
    executed: &mut Vec<ExecutedHook>,
) -> Result<(), LifecycleError> {
    (hook.f)(working, ctx).map_err(|err| {
        tracing::warn!(
            phase = phase.as_str(),
            hook = hook.name,
            error = %err,
            "hook failed; transition rolled back"
        );
        LifecycleError::HookFailure {
            event: event.name(),
            phase,
            hook: hook.name,
            source: err.into(),
        }
    })?;
    executed.push(ExecutedHook::new(phase, hook.name));
    Ok(())
}
