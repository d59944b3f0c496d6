// Command line and environment configuration for the handler binaries
use clap::{Args, Parser};
use std::path::PathBuf;

use crate::models::{CONFIG, TOKENIZER, TOKENIZER_CONFIG, WEIGHTS_PTH};
use crate::store::Artifact;

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    #[arg(long, env = "QA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Name stamped on every log line of the service.
    #[arg(long, env = "POWERTOOLS_SERVICE_NAME", default_value = "inference")]
    pub service_name: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Question answering over models staged on a shared volume", long_about = None)]
pub struct EfsArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    /// Directory holding the bundled `model1/` and `model2/` artifacts.
    #[arg(long, env = "QA_BUNDLE_DIR", default_value = ".")]
    pub bundle_dir: PathBuf,

    /// Mount point of the shared volume.
    #[arg(long, env = "QA_MOUNT_DIR", default_value = "/mnt/lambda")]
    pub mount_dir: PathBuf,

    /// Serve straight from a volume that was populated ahead of time.
    #[arg(long, env = "QA_SKIP_STAGING")]
    pub skip_staging: bool,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Question answering over a model downloaded from S3", long_about = None)]
pub struct S3Args {
    #[command(flatten)]
    pub server: ServerArgs,

    #[arg(long, env = "S3_MODEL_BUCKET_NAME")]
    pub bucket: String,

    #[arg(long, env = "S3_NLP1_MODEL")]
    pub model_key: String,

    #[arg(long, env = "S3_NLP1_CONFIG")]
    pub config_key: String,

    #[arg(long, env = "S3_NLP1_TOKENIZER")]
    pub tokenizer_key: String,

    #[arg(long, env = "S3_NLP1_TOKENIZER_CONFIG")]
    pub tokenizer_config_key: String,

    /// Local scratch directory the artifacts are downloaded into.
    #[arg(long, env = "QA_SCRATCH_DIR", default_value = "/tmp/nlp1")]
    pub scratch_dir: PathBuf,

    /// Read objects from `<dir>/<bucket>/<key>` instead of S3.
    #[arg(long, env = "QA_LOCAL_STORE")]
    pub local_store: Option<PathBuf>,
}

impl S3Args {
    pub fn artifacts(&self) -> Vec<Artifact> {
        vec![
            Artifact::new(&self.model_key, WEIGHTS_PTH),
            Artifact::new(&self.config_key, CONFIG),
            Artifact::new(&self.tokenizer_key, TOKENIZER),
            Artifact::new(&self.tokenizer_config_key, TOKENIZER_CONFIG),
        ]
    }
}
