use std::fs;
use std::path::Path;

use log::info;

use crate::errors::{Error, Result};

/// Rewrites the texture name on an atlas file's second line from `.sct`
/// to `.png`, in place.
///
/// Returns `Ok(true)` when the file was rewritten, `Ok(false)` when the
/// second line already names a `.png`. Files with fewer than two lines
/// fail with [`Error::MissingSecondLine`]; a second line naming neither
/// extension fails with [`Error::MissingExtension`]. Both are treated
/// as per-file warnings by the batch pass.
pub fn process_atlas_file(path: &Path) -> Result<bool> {
    let content = fs::read_to_string(path)?;

    let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();

    if lines.len() < 2 {
        return Err(Error::MissingSecondLine);
    }

    if lines[1].contains(".sct") {
        lines[1] = lines[1].replace(".sct", ".png");
        fs::write(path, lines.concat())?;

        info!("rewrote texture line in {}", path.display());

        return Ok(true);
    }

    if lines[1].contains(".png") {
        return Ok(false);
    }

    Err(Error::MissingExtension)
}
