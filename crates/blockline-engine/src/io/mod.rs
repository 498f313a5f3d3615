use crate::workspace::Workspace;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid workspace file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid workspace directory: {0}")]
    InvalidWorkspaceDir(String),
}

/// Read a JSON workspace file
pub fn load_workspace(path: &Path) -> Result<Workspace, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(IoError::Io)?;
    serde_json::from_str(&content).map_err(|source| IoError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a workspace as pretty-printed JSON
pub fn save_workspace(path: &Path, workspace: &Workspace) -> Result<(), IoError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    let content = serde_json::to_string_pretty(workspace).map_err(|source| IoError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(IoError::Io)
}

/// Scan for workspace files (`.json`) below `dir`
pub fn scan_workspace_files(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !dir.exists() {
        return Err(IoError::InvalidWorkspaceDir(
            "workspace directory not found".to_string(),
        ));
    }

    let mut files = Vec::new();
    scan_directory_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && ext == "json"
        {
            files.push(path);
        }
    }

    Ok(())
}

/// Check that `path` is a readable workspace file without keeping the result
pub fn validate_workspace_file(path: &Path) -> Result<(), IoError> {
    if !path.is_file() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    load_workspace(path).map(|_| ())
}
