use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Component, Path, PathBuf};

// @module: File and path utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file, creating parent directories on demand
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Base name without the last extension, e.g. `a/b/post.en.md` -> `post.en`
    pub fn file_name_without_extension<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(anyhow!("Empty path"));
        }
        let name = path
            .file_name()
            .ok_or_else(|| anyhow!("Path has no file name: {:?}", path))?
            .to_string_lossy();

        match name.rfind('.') {
            Some(pos) => Ok(name[..pos].to_string()),
            None => Ok(name.to_string()),
        }
    }

    /// Render a path with forward slashes regardless of platform
    pub fn to_forward_slash<P: AsRef<Path>>(path: P) -> String {
        path.as_ref()
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                Component::RootDir => Some(String::new()),
                Component::ParentDir => Some("..".to_string()),
                Component::CurDir | Component::Prefix(_) => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Expand a leading `~` to the user's home directory
    pub fn expand_home<P: AsRef<Path>>(path: P) -> PathBuf {
        let path = path.as_ref();
        match path.strip_prefix("~") {
            Ok(rest) => match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => path.to_path_buf(),
            },
            Err(_) => path.to_path_buf(),
        }
    }

    /// Lexically clean a path: drop `.` components and fold `..` into the
    /// preceding component when there is one. Does not touch the filesystem.
    pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
        let mut out = PathBuf::new();
        for component in path.as_ref().components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    let can_pop = matches!(
                        out.components().next_back(),
                        Some(Component::Normal(_))
                    );
                    if can_pop {
                        out.pop();
                    } else if !out.has_root() {
                        out.push("..");
                    }
                }
                other => out.push(other.as_os_str()),
            }
        }
        out
    }

    /// Absolute, lexically normalized form of a path
    pub fn absolute<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        let absolute = std::path::absolute(path.as_ref())
            .with_context(|| format!("Failed to resolve absolute path: {:?}", path.as_ref()))?;
        Ok(Self::normalize(absolute))
    }
}
