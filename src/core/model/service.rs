use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::model::{
    ApiModel, HostedApiModel, LoadState, LocalModel, LocalServerModel, ModelManager, QueuedRequest,
};

/// Owns both backends and the queue of requests deferred while the local model
/// loads.
pub struct ModelService {
    local: LocalServerModel,
    api: HostedApiModel,
    deferred: Mutex<VecDeque<QueuedRequest>>,
}

impl ModelService {
    pub fn new(config: &Config) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &Config) -> Self {
        Self {
            local: LocalServerModel::new(client.clone(), config.local_model.clone()),
            api: HostedApiModel::new(client, config.api_model.clone()),
            deferred: Mutex::new(VecDeque::new()),
        }
    }

    /// Spawn the local loader; once it settles, deferred requests are released.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.local.load(cancel).await;
            service.release_deferred();
        })
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<QueuedRequest>> {
        self.deferred
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release_deferred(&self) {
        let mut queue = self.queue();
        if queue.is_empty() {
            return;
        }

        let now = Utc::now();
        match self.local.state() {
            LoadState::Ready => {
                for request in queue.drain(..) {
                    let waited = now.signed_duration_since(request.queued_at);
                    info!(
                        mode = request.mode.as_str(),
                        turns = request.messages.len(),
                        waited_ms = waited.num_milliseconds(),
                        "releasing deferred request"
                    );
                }
            }
            LoadState::Failed(reason) => {
                warn!(count = queue.len(), %reason, "dropping deferred requests");
                queue.clear();
            }
            LoadState::Loading => {}
        }
    }
}

impl ModelManager for ModelService {
    fn local_model(&self) -> &dyn LocalModel {
        &self.local
    }

    fn api_model(&self) -> &dyn ApiModel {
        &self.api
    }

    fn queue_message(&self, request: QueuedRequest) {
        self.queue().push_back(request);
        // The loader may have settled between the caller's check and now
        if !self.local.state().is_loading() {
            self.release_deferred();
        }
    }

    fn deferred_len(&self) -> usize {
        self.queue().len()
    }
}
