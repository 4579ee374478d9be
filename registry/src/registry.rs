//! The registry engine.

use crate::error::RegistryError;
use crate::model::{Model, ReportedMetrics};
use poi_types::{ModelId, Principal, Timestamp, BPS_DENOMINATOR};
use std::collections::HashMap;

/// All registered models, keyed by id.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<ModelId, Model>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted records.
    pub fn from_models(models: impl IntoIterator<Item = Model>) -> Self {
        Self {
            models: models.into_iter().map(|m| (m.model_id.clone(), m)).collect(),
        }
    }

    /// Register a new, active model with zeroed counters.
    pub fn register(
        &mut self,
        model_id: ModelId,
        owner: Principal,
        verification_fee: u128,
        now: Timestamp,
    ) -> Result<&Model, RegistryError> {
        if self.models.contains_key(&model_id) {
            return Err(RegistryError::DuplicateModel(model_id));
        }
        if verification_fee == 0 {
            return Err(RegistryError::InvalidFee);
        }
        tracing::info!(model = %model_id, owner = %owner, fee = verification_fee, "model registered");
        let model = Model::new(model_id.clone(), owner, verification_fee, now);
        Ok(self.models.entry(model_id).or_insert(model))
    }

    pub fn get(&self, model_id: &ModelId) -> Result<&Model, RegistryError> {
        self.models
            .get(model_id)
            .ok_or_else(|| RegistryError::NotFound(model_id.clone()))
    }

    /// Whether the model exists and accepts new requests.
    pub fn is_active(&self, model_id: &ModelId) -> bool {
        self.models.get(model_id).is_some_and(|m| m.active)
    }

    /// Publish owner-reported metrics. Accuracy and uptime are basis points.
    pub fn update_metrics(
        &mut self,
        model_id: &ModelId,
        caller: &Principal,
        accuracy_bps: u32,
        latency_ms: u64,
        uptime_bps: u32,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        let model = self.owned_mut(model_id, caller)?;
        if accuracy_bps > BPS_DENOMINATOR {
            return Err(RegistryError::OutOfRange {
                field: "accuracy",
                value: accuracy_bps,
            });
        }
        if uptime_bps > BPS_DENOMINATOR {
            return Err(RegistryError::OutOfRange {
                field: "uptime",
                value: uptime_bps,
            });
        }
        model.reported = Some(ReportedMetrics {
            accuracy_bps,
            latency_ms,
            uptime_bps,
            reported_at: now,
        });
        Ok(())
    }

    /// Change the verification fee. Only the owner may do this.
    pub fn set_fee(
        &mut self,
        model_id: &ModelId,
        caller: &Principal,
        verification_fee: u128,
    ) -> Result<(), RegistryError> {
        if verification_fee == 0 {
            return Err(RegistryError::InvalidFee);
        }
        let model = self.owned_mut(model_id, caller)?;
        model.verification_fee = verification_fee;
        Ok(())
    }

    /// Activate or deactivate a model. Open requests are unaffected.
    pub fn set_active(
        &mut self,
        model_id: &ModelId,
        caller: &Principal,
        active: bool,
    ) -> Result<(), RegistryError> {
        let model = self.owned_mut(model_id, caller)?;
        model.active = active;
        tracing::info!(model = %model_id, active, "model activation changed");
        Ok(())
    }

    /// Count a newly opened request against the model.
    pub fn record_inference(&mut self, model_id: &ModelId) -> Result<(), RegistryError> {
        let model = self.get_mut(model_id)?;
        model.total_inferences = model
            .total_inferences
            .checked_add(1)
            .ok_or_else(|| RegistryError::Overflow(model_id.clone()))?;
        model.recompute_accuracy();
        Ok(())
    }

    /// Record a finalized verdict. Only verified verdicts move the success counter.
    pub fn record_outcome(&mut self, model_id: &ModelId, verified: bool) -> Result<(), RegistryError> {
        let model = self.get_mut(model_id)?;
        if verified {
            model.successful_verifications = model
                .successful_verifications
                .checked_add(1)
                .ok_or_else(|| RegistryError::Overflow(model_id.clone()))?;
        }
        model.recompute_accuracy();
        Ok(())
    }

    /// Whether [`Self::record_outcome`] would succeed, without recording anything.
    pub fn check_outcome(&self, model_id: &ModelId, verified: bool) -> Result<(), RegistryError> {
        let model = self.get(model_id)?;
        if verified && model.successful_verifications == u64::MAX {
            return Err(RegistryError::Overflow(model_id.clone()));
        }
        Ok(())
    }

    /// Undo a success after the verdict was overturned by a challenge.
    pub fn revoke_success(&mut self, model_id: &ModelId) -> Result<(), RegistryError> {
        let model = self.get_mut(model_id)?;
        model.successful_verifications = model.successful_verifications.saturating_sub(1);
        model.recompute_accuracy();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    fn get_mut(&mut self, model_id: &ModelId) -> Result<&mut Model, RegistryError> {
        self.models
            .get_mut(model_id)
            .ok_or_else(|| RegistryError::NotFound(model_id.clone()))
    }

    fn owned_mut(&mut self, model_id: &ModelId, caller: &Principal) -> Result<&mut Model, RegistryError> {
        let model = self.get_mut(model_id)?;
        if model.owner != *caller {
            return Err(RegistryError::Unauthorized {
                model: model_id.clone(),
                caller: caller.to_string(),
            });
        }
        Ok(model)
    }
}
