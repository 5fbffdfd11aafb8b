use std::fs;
use std::io::Write;

use camino::Utf8Path;

use crate::error::IsaError;

pub fn read_text(path: &Utf8Path) -> Result<String, IsaError> {
    fs::read_to_string(path.as_std_path())
        .map_err(|err| IsaError::Filesystem(format!("read {path}: {err}")))
}

/// Writes `content` through a temp file in the destination directory, then renames it into place.
pub fn write_atomic(path: &Utf8Path, content: &str) -> Result<(), IsaError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| IsaError::Filesystem(format!("create {parent}: {err}")))?;
    let mut temp = tempfile::Builder::new()
        .prefix("isa-design")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| IsaError::Filesystem(err.to_string()))?;
    temp.write_all(content.as_bytes())
        .map_err(|err| IsaError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| IsaError::Filesystem(format!("persist {path}: {err}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let target = root.join("nested").join("out.json");
        write_atomic(&target, "{}").unwrap();
        write_atomic(&target, "[]").unwrap();
        assert_eq!(read_text(&target).unwrap(), "[]");
    }
}
