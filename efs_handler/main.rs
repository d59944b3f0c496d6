// Handler serving two models from a mounted shared volume
use actix_web::web;
use anyhow::Result;
use clap::Parser;
use log::info;
use qa_handlers::api::serve;
use qa_handlers::config::EfsArgs;
use qa_handlers::logging;
use qa_handlers::models::BertLoader;
use qa_handlers::staging::stage_bundled_models;
use qa_handlers::state::{AppState, EfsProvider};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<()> {
    let args = EfsArgs::parse();
    logging::init(&args.server.service_name);

    // Demo bootstrap: a volume provisioned ahead of time can skip the copy.
    if args.skip_staging {
        info!(
            "Skipping staging, serving models already under {}",
            args.mount_dir.display()
        );
    } else {
        stage_bundled_models(&args.bundle_dir, &args.mount_dir)?;
    }

    let provider = EfsProvider::new(args.mount_dir.clone(), BertLoader::default());
    let shared_state = web::Data::new(AppState::new(
        Arc::new(provider),
        args.server.service_name.clone(),
    ));

    serve(shared_state, &args.server).await?;
    Ok(())
}
