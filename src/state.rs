// Shared state management for models
use crate::models::{ModelLoader, QuestionAnswerer};
use log::info;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The two models bundled with the filesystem variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Nlp1,
    Nlp2,
}

impl ModelType {
    pub const ALL: [ModelType; 2] = [ModelType::Nlp1, ModelType::Nlp2];

    /// Maps a request selector onto a model, `None` when it names neither.
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector {
            "nlp1" => Some(Self::Nlp1),
            "nlp2" => Some(Self::Nlp2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nlp1 => "nlp1",
            Self::Nlp2 => "nlp2",
        }
    }

    /// Directory name of this model, both in the bundle and on the volume.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Nlp1 => "model1",
            Self::Nlp2 => "model2",
        }
    }
}

pub struct LoadedModel {
    /// Reported back to the caller; `None` for single-model deployments.
    pub model_type: Option<ModelType>,
    pub model: Arc<dyn QuestionAnswerer>,
}

pub trait ModelProvider: Send + Sync {
    fn acquire(&self, selector: Option<&str>) -> anyhow::Result<LoadedModel>;
}

/// Loads a fresh tokenizer + model pair from the shared volume per request.
pub struct EfsProvider<L> {
    mount_dir: PathBuf,
    loader: L,
}

impl<L: ModelLoader> EfsProvider<L> {
    pub fn new(mount_dir: impl Into<PathBuf>, loader: L) -> Self {
        Self {
            mount_dir: mount_dir.into(),
            loader,
        }
    }

    pub fn model_dir(&self, model_type: ModelType) -> PathBuf {
        self.mount_dir.join(model_type.dir_name())
    }
}

impl<L: ModelLoader> ModelProvider for EfsProvider<L> {
    fn acquire(&self, selector: Option<&str>) -> anyhow::Result<LoadedModel> {
        let model_type = match selector.and_then(ModelType::from_selector) {
            Some(ModelType::Nlp1) => {
                info!("NLP Model Version 1 loaded");
                ModelType::Nlp1
            }
            Some(ModelType::Nlp2) => {
                info!("NLP Model Version 2 loaded");
                ModelType::Nlp2
            }
            None => {
                info!("No model specified, loading version 1.");
                ModelType::Nlp1
            }
        };
        let model = self.loader.load(&self.model_dir(model_type))?;
        Ok(LoadedModel {
            model_type: Some(model_type),
            model,
        })
    }
}

/// Hands out the single pair built at cold start to every invocation.
pub struct WarmProvider {
    model: Arc<dyn QuestionAnswerer>,
}

impl WarmProvider {
    pub fn new(model: Arc<dyn QuestionAnswerer>) -> Self {
        Self { model }
    }
}

impl ModelProvider for WarmProvider {
    fn acquire(&self, _selector: Option<&str>) -> anyhow::Result<LoadedModel> {
        Ok(LoadedModel {
            model_type: None,
            model: Arc::clone(&self.model),
        })
    }
}

pub struct AppState {
    pub provider: Arc<dyn ModelProvider>,
    pub service_name: String,
    cold_start: AtomicBool,
}

impl AppState {
    pub fn new(provider: Arc<dyn ModelProvider>, service_name: impl Into<String>) -> Self {
        Self {
            provider,
            service_name: service_name.into(),
            cold_start: AtomicBool::new(true),
        }
    }

    /// True exactly once, for the first invocation of the process.
    pub fn take_cold_start(&self) -> bool {
        self.cold_start.swap(false, Ordering::SeqCst)
    }
}
