//! Wiring: the item lifecycle engine with bus notifications and the job
//! queue, assembled from [`Settings`].

use std::sync::Arc;

use anyhow::Context;

use resale_events::{EventBus, InMemoryEventBus, Subscription};
use resale_items::{InMemoryCollaborators, ItemMachine, ItemServices, item_lifecycle};
use resale_lifecycle::{BuildError, Clock, InMemorySubjectStore, LifecycleEngine, SystemClock};
use resale_observability::{ErrorSink, TracingErrorSink};

use crate::config::Settings;
use crate::event_bus::{BusNotificationSink, StateChangedEnvelope};
use crate::jobs::{
    InMemoryJobStore, JobStoreError, JobStoreQueue, RelistCheckRunner, RelistRunSummary,
    RetryPolicy,
};

pub type ItemStore = InMemorySubjectStore<ItemMachine>;
pub type ItemEngine = LifecycleEngine<ItemMachine, Arc<ItemStore>>;
pub type ItemBus = InMemoryEventBus<StateChangedEnvelope>;

/// A fully wired item engine and the adapters behind its services.
pub struct ItemRuntime {
    pub engine: ItemEngine,
    pub services: ItemServices,
    pub bus: Arc<ItemBus>,
    pub jobs: Arc<InMemoryJobStore>,
    clock: Arc<dyn Clock>,
}

pub struct ItemRuntimeBuilder {
    settings: Settings,
    clock: Arc<dyn Clock>,
    errors: Arc<dyn ErrorSink>,
    retry_policy: RetryPolicy,
}

impl ItemRuntimeBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            clock: Arc::new(SystemClock),
            errors: Arc::new(TracingErrorSink),
            retry_policy: RetryPolicy::default(),
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

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Lookups and commands come from `collaborators`; notifications go to
    /// an in-memory bus and relist checks to an in-memory job store.
    pub fn build(self, collaborators: &InMemoryCollaborators) -> Result<ItemRuntime, BuildError> {
        let lifecycle = Arc::new(item_lifecycle()?);

        let bus = Arc::new(ItemBus::new());
        let jobs = InMemoryJobStore::arc();

        let mut services = collaborators.services();
        services.notifications = Arc::new(BusNotificationSink::new(bus.clone()));
        services.jobs = Arc::new(
            JobStoreQueue::new(jobs.clone())
                .with_retry_policy(self.retry_policy)
                .with_clock(self.clock.clone()),
        );
        services.relist_check_delay = self.settings.relist_check_delay;
        services.return_window = self.settings.return_window;

        let engine = LifecycleEngine::new(lifecycle, Arc::new(ItemStore::new()))
            .with_clock(self.clock.clone())
            .with_error_sink(self.errors)
            .with_config(self.settings.engine.clone());

        tracing::info!(
            engine = %self.settings.engine.name,
            states = engine.lifecycle().states().len(),
            events = engine.lifecycle().table().events().len(),
            "item runtime ready"
        );

        Ok(ItemRuntime {
            engine,
            services,
            bus,
            jobs,
            clock: self.clock,
        })
    }
}

impl ItemRuntime {
    pub fn builder(settings: Settings) -> ItemRuntimeBuilder {
        ItemRuntimeBuilder::new(settings)
    }

    /// Load settings from the environment, install logging and build.
    pub fn from_env(collaborators: &InMemoryCollaborators) -> anyhow::Result<Self> {
        let settings = Settings::from_env().context("loading RESALE_* settings")?;
        crate::init_logging(&settings);
        Self::builder(settings)
            .build(collaborators)
            .context("building the item lifecycle")
    }

    /// Receive every state change committed from now on.
    pub fn subscribe(&self) -> Subscription<StateChangedEnvelope> {
        self.bus.subscribe()
    }

    pub fn relist_runner(&self) -> RelistCheckRunner<'_, Arc<InMemoryJobStore>, Arc<ItemStore>> {
        RelistCheckRunner::new(&self.jobs, &self.engine, &self.services)
    }

    /// Run every relist check due at the runtime clock's current time.
    pub fn run_due_relist_checks(&self) -> Result<RelistRunSummary, JobStoreError> {
        self.relist_runner().run_due(self.clock.now())
    }
}
