use std::{str::FromStr, sync::Arc};

use shared::protocol::ProgressUpdateRequest;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    api::Backend,
    document::{Document, Toast},
};

pub const PROGRESS_SAVE_FAILED: &str = "Ошибка сохранения прогресса";

/// How a per-answer progress save relates to advancing the lesson. Neither
/// variant lets a failed save stop the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressSavePolicy {
    /// Fire the save on a detached task and move on immediately.
    #[default]
    BestEffort,
    /// Wait for the save to settle (success or failure) before moving on.
    AwaitThenContinue,
}

impl FromStr for ProgressSavePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(Self::BestEffort),
            "await_then_continue" | "await" => Ok(Self::AwaitThenContinue),
            other => Err(format!("unknown progress policy '{other}'")),
        }
    }
}

pub struct ProgressReporter {
    backend: Backend,
    document: Arc<dyn Document>,
    policy: ProgressSavePolicy,
    pending: Vec<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn new(backend: Backend, document: Arc<dyn Document>, policy: ProgressSavePolicy) -> Self {
        Self {
            backend,
            document,
            policy,
            pending: Vec::new(),
        }
    }

    pub fn policy(&self) -> ProgressSavePolicy {
        self.policy
    }

    pub async fn record(&mut self, update: ProgressUpdateRequest) {
        match self.policy {
            ProgressSavePolicy::BestEffort => {
                self.pending.retain(|handle| !handle.is_finished());
                let backend = self.backend.clone();
                let document = Arc::clone(&self.document);
                self.pending.push(tokio::spawn(async move {
                    save(&backend, document.as_ref(), update).await;
                }));
            }
            ProgressSavePolicy::AwaitThenContinue => {
                save(&self.backend, self.document.as_ref(), update).await;
            }
        }
    }

    /// Saves still in flight.
    pub fn pending(&self) -> usize {
        self.pending
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Waits for every detached save to settle.
    pub async fn drain(&mut self) {
        for handle in self.pending.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "progress: save task aborted");
            }
        }
    }
}

async fn save(backend: &Backend, document: &dyn Document, update: ProgressUpdateRequest) {
    match backend.update_progress(&update).await {
        Ok(response) => {
            debug!(
                word_id = update.word_id.0,
                is_correct = update.is_correct,
                saved = response.success,
                "progress: word progress saved"
            );
        }
        Err(err) => {
            warn!(
                word_id = update.word_id.0,
                lesson_id = update.lesson_id.0,
                error = %err,
                "progress: save failed, continuing"
            );
            document.toast(Toast::error(PROGRESS_SAVE_FAILED));
        }
    }
}
