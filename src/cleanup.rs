use std::{fs, path::PathBuf, thread, time::Duration};

use tracing::{debug, warn};

/// Deletes spooled files once `delay` has elapsed.
///
/// Runs on a detached thread so removal neither needs a timer-enabled
/// runtime nor dies with it. Failures are logged and swallowed.
pub(crate) fn schedule(paths: Vec<PathBuf>, delay: Duration) {
    if paths.is_empty() {
        return;
    }

    debug!("removing {} spooled files in {:?}", paths.len(), delay);

    let spawned = thread::Builder::new()
        .name("form-spool-cleanup".into())
        .spawn(move || {
            thread::sleep(delay);
            remove(&paths);
        });

    if let Err(e) = spawned {
        warn!("failed to spawn cleanup thread: {}", e);
    }
}

fn remove(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!("failed to remove {}: {}", path.display(), e);
        }
    }
}
