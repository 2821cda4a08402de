use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::WriteError;

/// Write `html` to `path` in one piece: a sibling `.tmp` file is written and
/// then renamed over `path`, so readers never see a partial report.
pub fn write_report(path: &Path, html: &str) -> Result<(), WriteError> {
    let fail = |source: std::io::Error| WriteError {
        path: path.to_path_buf(),
        source,
    };

    let tmp = temp_path(path).ok_or_else(|| {
        fail(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "output path has no file name",
        ))
    })?;

    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(html.as_bytes())?;
        file.sync_all()
    });
    if let Err(source) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(fail(source));
    }
    Ok(())
}

fn temp_path(path: &Path) -> Option<PathBuf> {
    let mut name = path.file_name()?.to_os_string();
    name.push(".tmp");
    Some(path.with_file_name(name))
}
