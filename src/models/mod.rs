// Model artifacts and the question answering seam
use anyhow::bail;
use candle::Device;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod bert;

use bert::BertQaModel;

pub const WEIGHTS_PTH: &str = "pytorch_model.bin";
pub const WEIGHTS_SAFETENSORS: &str = "model.safetensors";
pub const CONFIG: &str = "config.json";
pub const TOKENIZER: &str = "tokenizer.json";
pub const TOKENIZER_CONFIG: &str = "tokenizer_config.json";

/// Anything that can pull an answer span for `question` out of `context`.
pub trait QuestionAnswerer: Send + Sync {
    fn answer(&self, question: &str, context: &str) -> anyhow::Result<String>;
}

/// Builds a tokenizer + model pair from a directory of artifacts.
pub trait ModelLoader: Send + Sync {
    fn load(&self, model_dir: &Path) -> anyhow::Result<Arc<dyn QuestionAnswerer>>;
}

pub struct BertLoader {
    device: Device,
}

impl BertLoader {
    pub fn new(device: Device) -> Self {
        Self { device }
    }
}

impl Default for BertLoader {
    fn default() -> Self {
        Self::new(Device::Cpu)
    }
}

impl ModelLoader for BertLoader {
    fn load(&self, model_dir: &Path) -> anyhow::Result<Arc<dyn QuestionAnswerer>> {
        let model = BertQaModel::load(model_dir, self.device.clone())?;
        Ok(Arc::new(model))
    }
}

/// The artifact files found in one model directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub weights: PathBuf,
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub tokenizer_config: Option<PathBuf>,
}

impl ModelFiles {
    /// Resolves the artifacts in `dir`. Safetensors weights win over a
    /// PyTorch checkpoint when both are present.
    pub fn locate(dir: &Path) -> anyhow::Result<Self> {
        let weights = [WEIGHTS_SAFETENSORS, WEIGHTS_PTH]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file());
        let Some(weights) = weights else {
            bail!(
                "no model weights ({WEIGHTS_SAFETENSORS} or {WEIGHTS_PTH}) in {}",
                dir.display()
            );
        };

        let config = required(dir, CONFIG)?;
        let tokenizer = required(dir, TOKENIZER)?;
        let tokenizer_config = Some(dir.join(TOKENIZER_CONFIG)).filter(|path| path.is_file());

        Ok(Self {
            weights,
            config,
            tokenizer,
            tokenizer_config,
        })
    }

    pub fn is_safetensors(&self) -> bool {
        self.weights.extension().is_some_and(|ext| ext == "safetensors")
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        [&self.weights, &self.config, &self.tokenizer]
            .into_iter()
            .map(PathBuf::as_path)
            .chain(self.tokenizer_config.as_deref())
    }
}

fn required(dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    if !path.is_file() {
        bail!("missing model file {}", path.display());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "qa-handlers-files-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn locate_prefers_safetensors() {
        let dir = scratch("prefer");
        for name in [WEIGHTS_PTH, WEIGHTS_SAFETENSORS, CONFIG, TOKENIZER] {
            fs::write(dir.join(name), b"x").unwrap();
        }

        let files = ModelFiles::locate(&dir).unwrap();
        assert!(files.is_safetensors());
        assert_eq!(files.tokenizer_config, None);
        assert_eq!(files.paths().count(), 3);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn locate_reports_missing_tokenizer() {
        let dir = scratch("missing");
        for name in [WEIGHTS_PTH, CONFIG, TOKENIZER_CONFIG] {
            fs::write(dir.join(name), b"x").unwrap();
        }

        let err = ModelFiles::locate(&dir).unwrap_err();
        assert!(err.to_string().contains(TOKENIZER));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn locate_requires_weights() {
        let dir = scratch("weights");
        let err = ModelFiles::locate(&dir).unwrap_err();
        assert!(err.to_string().contains("no model weights"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
