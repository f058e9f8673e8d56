use std::sync::Arc;

use actix_web::web;
use moka::future::Cache;
use tracing::{debug, info, instrument, warn};

use crate::error::AppError;
use crate::model::student::{SampleFingerprint, StoredSample};
use crate::store::Store;
use crate::vision::{FaceSample, LbphError, LbphModel, LbphParams};

/// Fits the LBPH recognizer over every stored face sample.
///
/// With caching on, a fitted model is reused for as long as the store's
/// [`SampleFingerprint`] is unchanged. Any capture, overwrite or deletion of
/// a sampled student moves the fingerprint, so callers always see a model
/// equal to a fresh fit.
pub struct RecognizerTrainer {
    params: LbphParams,
    cache: Option<Cache<SampleFingerprint, Arc<LbphModel>>>,
}

impl RecognizerTrainer {
    pub fn new(params: LbphParams, cache_enabled: bool) -> Self {
        let cache = cache_enabled.then(|| Cache::builder().max_capacity(4).build());
        Self { params, cache }
    }

    #[instrument(name = "recognizer_model", skip_all)]
    pub async fn model(&self, store: &dyn Store) -> Result<Arc<LbphModel>, AppError> {
        let Some(cache) = &self.cache else {
            return self.train(store).await;
        };

        let fingerprint = store.sample_fingerprint().await?;
        if fingerprint.samples == 0 {
            return Err(AppError::NotTrained);
        }
        if let Some(model) = cache.get(&fingerprint).await {
            debug!(samples = fingerprint.samples, "Recognizer served from cache");
            return Ok(model);
        }

        let model = self.train(store).await?;
        cache.insert(fingerprint, model.clone()).await;
        Ok(model)
    }

    /// Always fits a fresh model, bypassing the cache.
    pub async fn train(&self, store: &dyn Store) -> Result<Arc<LbphModel>, AppError> {
        let stored = store.face_samples().await?;
        let params = self.params;

        let model = web::block(move || fit(params, stored)).await??;
        info!(samples = model.len(), "Recognizer trained");
        Ok(Arc::new(model))
    }
}

// One bad row is skipped, never fatal for the rest.
fn fit(params: LbphParams, stored: Vec<StoredSample>) -> Result<LbphModel, AppError> {
    let mut model = LbphModel::new(params)?;
    for row in stored {
        let added = FaceSample::decode(&row.face_image)
            .map_err(|e| e.to_string())
            .and_then(|sample| {
                model
                    .add(row.student_id, &sample)
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = added {
            warn!(student_id = row.student_id, %error, "Skipping unreadable face sample");
        }
    }

    if model.is_empty() {
        return Err(LbphError::Empty.into());
    }
    Ok(model)
}
