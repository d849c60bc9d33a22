//! Moving finished media into place.
//!
//! Assembly scratch space usually lives on a temp filesystem while the
//! project tree does not, so a plain rename can fail with EXDEV.

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// EXDEV on Linux and macOS.
const CROSS_DEVICE_ERRNO: i32 = 18;

/// Move `src` to `dst`, creating the destination directory and replacing any
/// existing file. Falls back to copy + delete across filesystems.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    ensure_parent(dst).await?;

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(CROSS_DEVICE_ERRNO) => {
            debug!(src = %src.display(), dst = %dst.display(), "Rename crosses filesystems, copying");
            copy_across(src, dst).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Create the parent directory of `path` if it is missing.
pub async fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}

async fn copy_across(src: &Path, dst: &Path) -> MediaResult<()> {
    // Stage next to the destination so the final step is a same-device rename
    let partial = dst.with_extension("partial");
    fs::copy(src, &partial).await?;

    if let Err(e) = fs::rename(&partial, dst).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(src).await {
        warn!(src = %src.display(), "Moved file but could not remove source: {}", e);
    }
    Ok(())
}
