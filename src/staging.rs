// Copies bundled model artifacts onto the shared volume at cold start
use anyhow::Context;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::ModelFiles;
use crate::state::ModelType;

/// Stages `<bundle_dir>/model1` and `<bundle_dir>/model2` under `mount_dir`.
/// Returns the number of files actually copied.
pub fn stage_bundled_models(bundle_dir: &Path, mount_dir: &Path) -> anyhow::Result<usize> {
    info!("Copying model files");
    let mut copied = 0;
    for model_type in ModelType::ALL {
        copied += stage_model(
            &bundle_dir.join(model_type.dir_name()),
            &mount_dir.join(model_type.dir_name()),
        )?;
    }
    info!("Staged {copied} model files into {}", mount_dir.display());
    Ok(copied)
}

/// Copies every artifact of one model into `dest`, replacing whatever the
/// volume held before. Each file goes through a `.part` sibling and a rename,
/// so a reader never sees a half-written artifact.
pub fn stage_model(source: &Path, dest: &Path) -> anyhow::Result<usize> {
    let files = ModelFiles::locate(source)?;
    fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;

    let mut copied = 0;
    for file in files.paths() {
        let Some(name) = file.file_name() else {
            continue;
        };
        let target = dest.join(name);
        let mut partial = target.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        fs::copy(file, &partial)
            .with_context(|| format!("copying {} to {}", file.display(), partial.display()))?;
        fs::rename(&partial, &target)
            .with_context(|| format!("moving {} into place", target.display()))?;
        debug!("staged {}", target.display());
        copied += 1;
    }
    Ok(copied)
}
