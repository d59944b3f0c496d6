// Handler serving one model downloaded from S3 at cold start
use actix_web::web;
use anyhow::Result;
use clap::Parser;
use qa_handlers::api::serve;
use qa_handlers::config::S3Args;
use qa_handlers::logging;
use qa_handlers::models::{BertLoader, ModelLoader};
use qa_handlers::state::{AppState, WarmProvider};
use qa_handlers::store::{download_artifacts, LocalDirStore, S3Store};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<()> {
    let args = S3Args::parse();
    logging::init(&args.server.service_name);

    let artifacts = args.artifacts();
    match &args.local_store {
        Some(root) => {
            let store = LocalDirStore::new(root);
            download_artifacts(&store, &args.bucket, &artifacts, &args.scratch_dir).await?;
        }
        None => {
            let store = S3Store::from_env().await;
            download_artifacts(&store, &args.bucket, &artifacts, &args.scratch_dir).await?;
        }
    }

    // Built once here, every warm invocation reuses it.
    let model = BertLoader::default().load(&args.scratch_dir)?;
    let shared_state = web::Data::new(AppState::new(
        Arc::new(WarmProvider::new(model)),
        args.server.service_name.clone(),
    ));

    serve(shared_state, &args.server).await?;
    Ok(())
}
