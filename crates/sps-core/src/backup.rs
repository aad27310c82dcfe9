use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::error::{CoreError, Result};

/// Zips a file, or a directory tree, to `<name>_<YYYYmmdd-HHMMSS>.zip` next to
/// it. The source is left untouched.
pub fn zip_backup(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(CoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("nothing to back up at {}", path.display()),
        )));
    }
    let parent = path.parent().unwrap_or(Path::new("."));
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("backup");
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let dest = parent.join(format!("{}_{}.zip", name, ts));

    let file = fs::File::create(&dest)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    if path.is_file() {
        let entry = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        zip.start_file(entry, options)?;
        zip.write_all(&fs::read(path)?)?;
    } else {
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            let p = entry.path();
            let Ok(rel) = p.strip_prefix(path) else {
                continue;
            };
            if rel.as_os_str().is_empty() || p == dest {
                continue;
            }
            let rel = rel.to_string_lossy().replace('\\', "/");
            if p.is_dir() {
                zip.add_directory(rel, options)?;
            } else {
                zip.start_file(rel, options)?;
                zip.write_all(&fs::read(p)?)?;
            }
        }
    }
    zip.finish()?;
    tracing::info!(source = %path.display(), dest = %dest.display(), "zip backup written");
    Ok(dest)
}
