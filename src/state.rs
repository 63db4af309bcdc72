//! Application state: the problem session service and the per-user progress store.
//!
//! This module owns the wiring:
//!   - config (TOML or defaults)
//!   - optional OpenAI text generator
//!   - problem repository (in-memory)
//!   - progress storage (memory or one-file-per-key)

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_app_config_from_env, AppConfig, StorageKind};
use crate::generator::TextGenerator;
use crate::openai::OpenAI;
use crate::progress::UserProgressStore;
use crate::session::ProblemSessionService;
use crate::storage::{FileStorage, MemoryStorage, ProgressStorage};
use crate::store::{MemoryRepository, ProblemRepository};

#[derive(Clone)]
pub struct AppState {
    pub sessions: ProblemSessionService,
    pub progress: UserProgressStore,
}

impl AppState {
    /// Build state from env: load config, init OpenAI, pick progress storage.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();

        let generator: Option<Arc<dyn TextGenerator>> =
            match OpenAI::from_env(&cfg.prompts.tutor_system) {
                Some(oa) => {
                    info!(target: "mathpractice_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
                    Some(Arc::new(oa))
                }
                None => {
                    info!(target: "mathpractice_backend", "OpenAI disabled (no OPENAI_API_KEY). Serving fallback problems and canned feedback.");
                    None
                }
            };

        let storage: Arc<dyn ProgressStorage> = match cfg.progress.storage {
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
            StorageKind::File => {
                info!(target: "progress", dir = %cfg.progress.dir.display(), "Persisting progress to files");
                Arc::new(FileStorage::new(&cfg.progress.dir))
            }
        };

        Self::from_parts(&cfg, Arc::new(MemoryRepository::new()), generator, storage)
    }

    pub fn from_parts(
        cfg: &AppConfig,
        repo: Arc<dyn ProblemRepository>,
        generator: Option<Arc<dyn TextGenerator>>,
        storage: Arc<dyn ProgressStorage>,
    ) -> Self {
        Self {
            sessions: ProblemSessionService::new(repo, generator, cfg.prompts.clone(), cfg.feedback.clone()),
            progress: UserProgressStore::new(storage),
        }
    }
}
