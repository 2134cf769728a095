use std::sync::Arc;

use matcher::Ranker;
use store::DonationStore;

use crate::claims::ClaimCoordinator;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::donations::DonationIntake;
use crate::error::EngineError;
use crate::lifecycle::Lifecycle;
use crate::matching::MatchingOrchestrator;
use crate::recipients::RecipientDirectory;

/// All engine components wired to one store and one clock.
///
/// Cheap to share behind an `Arc`; every component is `Send + Sync`.
pub struct Engine {
    store: Arc<dyn DonationStore>,
    donations: DonationIntake,
    lifecycle: Lifecycle,
    matching: Arc<MatchingOrchestrator>,
    claims: ClaimCoordinator,
    recipients: Arc<RecipientDirectory>,
}

impl Engine {
    /// Build the configured store and wire the engine on the system clock.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let backend = config
            .store
            .backend_config()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let store = backend.build()?;
        Self::new(store, config, Arc::new(SystemClock))
    }

    pub fn new(
        store: Arc<dyn DonationStore>,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let ranker = Ranker::new(config.matcher.clone())?;
        let matching = Arc::new(MatchingOrchestrator::new(
            Arc::clone(&store),
            ranker,
            config.rate_limit.clone(),
            Arc::clone(&clock),
        ));
        let recipients = Arc::new(RecipientDirectory::new(
            Arc::clone(&store),
            Arc::clone(&clock),
        ));

        Ok(Self {
            donations: DonationIntake::new(Arc::clone(&store), Arc::clone(&clock)),
            lifecycle: Lifecycle::new(
                Arc::clone(&store),
                Arc::clone(&matching),
                Arc::clone(&clock),
            ),
            claims: ClaimCoordinator::new(Arc::clone(&store), Arc::clone(&recipients), clock),
            matching,
            recipients,
            store,
        })
    }

    pub fn donations(&self) -> &DonationIntake {
        &self.donations
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn matching(&self) -> &MatchingOrchestrator {
        &self.matching
    }

    pub fn claims(&self) -> &ClaimCoordinator {
        &self.claims
    }

    pub fn recipients(&self) -> &RecipientDirectory {
        &self.recipients
    }

    pub fn store(&self) -> &Arc<dyn DonationStore> {
        &self.store
    }
}
