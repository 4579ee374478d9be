//! Checkpointing the arbiter into a store and rebuilding it from one.
//!
//! Records are bincode-encoded and handed to the `poi-store` traits as
//! opaque bytes. Scalars that belong to no table (the next request id, the
//! pause flag, the minimum stake and the treasury books) travel together
//! under one meta key.

use std::sync::Arc;

use poi_registry::{Model, ModelRegistry};
use poi_staking::{DelegationPosition, SlashRecord, StakeLedger, ValidatorStake};
use poi_store::ArbiterStore;
use poi_store_lmdb::LmdbEnvironment;
use poi_types::Clock;
use poi_verification::{
    Challenge, DisputeResolver, InferenceRequest, RequestRecord, TrustScores, VerificationResult,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::arbiter::{lock, Arbiter, Engines};
use crate::config::{ArbiterConfig, StoreBackend};
use crate::tracing_spans;
use crate::treasury::Treasury;
use crate::ArbiterError;

const STATE_KEY: &str = "arbiter.state";

#[derive(Serialize, Deserialize)]
struct ArbiterState {
    next_request_id: u64,
    paused: bool,
    minimum_stake: u128,
    treasury: Treasury,
}

/// What a checkpoint wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckpointStats {
    pub models: usize,
    pub validators: usize,
    pub requests: usize,
    pub results: usize,
    pub challenges: usize,
    pub agents: usize,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ArbiterError> {
    bincode::serialize(value).map_err(|e| ArbiterError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ArbiterError> {
    bincode::deserialize(bytes).map_err(|e| ArbiterError::Serialization(e.to_string()))
}

/// Open the durable store the configuration asks for. The memory backend has none.
pub fn open_store(config: &ArbiterConfig) -> Result<Option<LmdbEnvironment>, ArbiterError> {
    match config.store {
        StoreBackend::Memory => Ok(None),
        StoreBackend::Lmdb => {
            poi_store_lmdb::check_data_dir(&config.data_dir).map_err(ArbiterError::Config)?;
            let env = LmdbEnvironment::open_default(&config.data_dir)?;
            let report = poi_store_lmdb::check_integrity(env.env())?;
            for problem in &report.errors {
                tracing::warn!(error = %problem, "LMDB integrity problem");
            }
            tracing::info!(
                path = %config.data_dir.display(),
                databases = report.databases_checked,
                entries = report.total_entries,
                healthy = report.is_healthy(),
                "LMDB store opened"
            );
            Ok(Some(env))
        }
    }
}

impl Arbiter {
    /// Write every engine's state to `store`.
    ///
    /// Waits for in-flight operations to finish and blocks new ones until
    /// the snapshot is written, so the stored state is consistent.
    pub fn checkpoint<S: ArbiterStore + ?Sized>(&self, store: &S) -> Result<CheckpointStats, ArbiterError> {
        let span = tracing_spans::persistence_span("checkpoint");
        let _enter = span.enter();
        let _gate = self.gate.write().unwrap_or_else(std::sync::PoisonError::into_inner);

        let slots: Vec<_> = self
            .requests
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut stats = CheckpointStats::default();

        for slot in &slots {
            let record = lock(slot);
            let id = record.id();
            store.put_request(id, &encode(&record.request)?)?;
            for (index, result) in record.results.iter().enumerate() {
                let index = u32::try_from(index).map_err(|_| ArbiterError::Overflow)?;
                store.put_result(id, index, &encode(result)?)?;
                stats.results += 1;
            }
            stats.requests += 1;
        }

        {
            let disputes = lock(&self.disputes);
            for challenge in disputes.challenges() {
                store.put_challenge(challenge.id, &encode(challenge)?)?;
                stats.challenges += 1;
            }
        }

        {
            let registry = lock(&self.registry);
            for model in registry.models() {
                store.put_model(&model.model_id, &encode(model)?)?;
                stats.models += 1;
            }
        }

        let minimum_stake = {
            let ledger = lock(&self.ledger);
            for entry in ledger.stakes() {
                store.put_stake(&entry.validator, &encode(entry)?)?;
                stats.validators += 1;
            }
            let delegations: Vec<DelegationPosition> = ledger.delegations().collect();
            store.put_delegations(&encode(&delegations)?)?;
            for (seq, record) in ledger.slash_log().iter().enumerate() {
                store.put_slash(seq as u64, &encode(record)?)?;
            }
            ledger.minimum_stake()
        };

        {
            let trust = lock(&self.trust);
            for (agent, score) in trust.scores() {
                store.put_score(agent, score)?;
                stats.agents += 1;
            }
        }

        let state = ArbiterState {
            next_request_id: self.next_request_id.load(std::sync::atomic::Ordering::SeqCst),
            paused: self.is_paused(),
            minimum_stake,
            treasury: lock(&self.treasury).clone(),
        };
        store.put_meta(STATE_KEY, &encode(&state)?)?;

        tracing::info!(
            models = stats.models,
            validators = stats.validators,
            requests = stats.requests,
            challenges = stats.challenges,
            "checkpoint written"
        );
        Ok(stats)
    }

    /// Rebuild an arbiter from a checkpoint. An empty store yields a fresh arbiter.
    pub fn restore<S: ArbiterStore + ?Sized>(
        config: ArbiterConfig,
        clock: Arc<dyn Clock>,
        store: &S,
    ) -> Result<Self, ArbiterError> {
        let span = tracing_spans::persistence_span("restore");
        let _enter = span.enter();
        config.validate()?;
        let params = config.params.clone();

        let state: ArbiterState = match store.get_meta(STATE_KEY) {
            Ok(bytes) => decode(&bytes)?,
            Err(e) if e.is_not_found() => {
                tracing::info!("no checkpoint found, starting fresh");
                return Self::new(config, clock);
            }
            Err(e) => return Err(e.into()),
        };

        let mut models = Vec::new();
        for (_, bytes) in store.iter_models()? {
            models.push(decode::<Model>(&bytes)?);
        }

        let mut stakes = Vec::new();
        for (_, bytes) in store.iter_stakes()? {
            stakes.push(decode::<ValidatorStake>(&bytes)?);
        }
        let delegations: Vec<DelegationPosition> = match store.get_delegations()? {
            Some(bytes) => decode(&bytes)?,
            None => Vec::new(),
        };
        let mut slash_log = Vec::new();
        for bytes in store.iter_slashes()? {
            slash_log.push(decode::<SlashRecord>(&bytes)?);
        }

        let mut requests = Vec::new();
        for (id, bytes) in store.iter_requests()? {
            let request: InferenceRequest = decode(&bytes)?;
            let mut record = RequestRecord::new(request);
            for bytes in store.iter_results(id)? {
                record.results.push(decode::<VerificationResult>(&bytes)?);
            }
            requests.push(record);
        }

        let mut challenges = Vec::new();
        for (_, bytes) in store.iter_challenges()? {
            challenges.push(decode::<Challenge>(&bytes)?);
        }

        let trust = TrustScores::from_scores(params.initial_trust, params.max_trust, store.iter_scores()?);

        tracing::info!(
            models = models.len(),
            validators = stakes.len(),
            requests = requests.len(),
            challenges = challenges.len(),
            "checkpoint loaded"
        );

        let engines = Engines {
            registry: ModelRegistry::from_models(models),
            ledger: StakeLedger::from_parts(state.minimum_stake, stakes, delegations, slash_log),
            trust,
            disputes: DisputeResolver::from_parts(config.arbitrator_principals(), challenges),
            treasury: state.treasury,
            requests,
            next_request_id: state.next_request_id,
            paused: state.paused,
        };
        Self::assemble(config, clock, engines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poi_nullables::{NullClock, NullStore};
    use poi_types::{ModelId, Principal};

    #[test]
    fn memory_backend_has_no_store() {
        assert!(open_store(&ArbiterConfig::default()).unwrap().is_none());
    }

    #[test]
    fn open_store_lmdb_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = ArbiterConfig {
            store: StoreBackend::Lmdb,
            data_dir: dir.path().join("db"),
            ..ArbiterConfig::default()
        };
        let clock = Arc::new(NullClock::new(10));
        {
            let env = open_store(&config).unwrap().unwrap();
            let arbiter = Arbiter::new(config.clone(), clock.clone()).unwrap();
            arbiter.stake(&Principal::new("v1"), 4_000).unwrap();
            arbiter.checkpoint(&env).unwrap();
        }
        let env = open_store(&config).unwrap().unwrap();
        let restored = Arbiter::restore(config, clock, &env).unwrap();
        assert_eq!(restored.get_stake(&Principal::new("v1")).unwrap().self_stake, 4_000);
    }

    #[test]
    fn empty_store_restores_fresh_arbiter() {
        let store = NullStore::new();
        let clock = Arc::new(NullClock::new(0));
        let arbiter = Arbiter::restore(ArbiterConfig::default(), clock, &store).unwrap();
        assert_eq!(arbiter.request_count(), 0);
        assert!(!arbiter.is_paused());
    }

    #[test]
    fn checkpoint_round_trips_models_and_stake() {
        let store = NullStore::new();
        let clock = Arc::new(NullClock::new(10));
        let admin = Principal::new("admin");
        let arbiter = Arbiter::new(ArbiterConfig::default(), clock.clone()).unwrap();
        arbiter
            .register_model(&admin, ModelId::new("m"), Principal::new("owner"), 7)
            .unwrap();
        arbiter.stake(&Principal::new("v1"), 5_000).unwrap();
        arbiter.set_minimum_stake(&admin, 2_000).unwrap();
        arbiter.pause(&admin).unwrap();

        let stats = arbiter.checkpoint(&store).unwrap();
        assert_eq!(stats.models, 1);
        assert_eq!(stats.validators, 1);

        let restored = Arbiter::restore(ArbiterConfig::default(), clock, &store).unwrap();
        assert_eq!(restored.get_model(&ModelId::new("m")).unwrap().verification_fee, 7);
        assert_eq!(restored.get_stake(&Principal::new("v1")).unwrap().self_stake, 5_000);
        assert_eq!(restored.minimum_stake(), 2_000);
        assert!(restored.is_paused());
    }
}
