use anyhow::{Context, Result};
use clap::Parser;
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use log::{info, warn};
use qa_handlers::logging;
use qa_handlers::models::{CONFIG, TOKENIZER, TOKENIZER_CONFIG, WEIGHTS_PTH, WEIGHTS_SAFETENSORS};
use std::fs;
use std::path::{Path, PathBuf};

/// Pulls a question answering checkpoint from the Hugging Face Hub into a
/// bundle directory (`model1/`, `model2/`) ready for staging or upload.
#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
struct Args {
    /// Hub repository, e.g. `deepset/bert-base-cased-squad2`.
    repo: String,

    /// Destination directory.
    dest: PathBuf,

    #[arg(long, default_value = "main")]
    revision: String,
}

fn main() -> Result<()> {
    logging::init("model_fetcher");
    let args = Args::parse();
    info!("Fetching {}@{} into {}", args.repo, args.revision, args.dest.display());

    // start loading the model from the repo
    let repo = Repo::with_revision(args.repo.clone(), RepoType::Model, args.revision.clone());
    let api = Api::new()?;
    let api = api.repo(repo);

    fs::create_dir_all(&args.dest)?;
    for name in [CONFIG, TOKENIZER] {
        let cached = api.get(name).with_context(|| format!("fetching {name}"))?;
        place(&cached, &args.dest.join(name))?;
    }

    match api.get(TOKENIZER_CONFIG) {
        Ok(cached) => place(&cached, &args.dest.join(TOKENIZER_CONFIG))?,
        Err(err) => warn!("no {TOKENIZER_CONFIG} in {}: {err}", args.repo),
    }

    let (cached, name) = match api.get(WEIGHTS_SAFETENSORS) {
        Ok(cached) => (cached, WEIGHTS_SAFETENSORS),
        Err(_) => (
            api.get(WEIGHTS_PTH)
                .with_context(|| format!("no weights in {}", args.repo))?,
            WEIGHTS_PTH,
        ),
    };
    place(&cached, &args.dest.join(name))?;

    info!("Saved {} to {}", args.repo, args.dest.display());
    Ok(())
}

fn place(cached: &Path, dest: &Path) -> Result<()> {
    fs::copy(cached, dest)
        .with_context(|| format!("copying {} to {}", cached.display(), dest.display()))?;
    info!("Wrote {}", dest.display());
    Ok(())
}
