use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::descriptor::LayoutDescriptor;
use crate::parse::{parse_layout, peek_extends};
use crate::registry::LayoutRegistry;
use crate::{LayoutError, Result};

const DEFAULT_WORKSPACE_PATH: &str = ".config/statepad";

/// Directory of user layout files.
pub struct LayoutWorkspace {
    path: PathBuf,
}

impl LayoutWorkspace {
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_owned(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        } else if !path.is_dir() {
            return Err(LayoutError::PathIsNotDirectory(path.display().to_string()));
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_path() -> Result<PathBuf> {
        let path = std::env::var("HOME")
            .map(PathBuf::from)
            .map(|p| p.join(DEFAULT_WORKSPACE_PATH))
            .map_err(|_| LayoutError::EnvVarNotSet("HOME".to_string()))?;

        Ok(path)
    }

    /// `*.yaml` and `*.yml` files, sorted by name.
    pub fn layout_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
            if is_yaml && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parses every layout file and registers it. A file may extend a
    /// layout defined in another file regardless of file order.
    pub fn load_into(&self, registry: &mut LayoutRegistry) -> Result<Vec<Arc<LayoutDescriptor>>> {
        let mut pending = Vec::new();
        for path in self.layout_files()? {
            let input = std::fs::read_to_string(&path)?;
            let (name, base) = peek_extends(&input)?;
            log::debug!("found layout {name} in {}", path.display());
            pending.push((base, input));
        }

        let mut loaded = Vec::new();
        while !pending.is_empty() {
            let before = pending.len();
            let mut blocked = Vec::new();
            for (base, input) in pending {
                let ready = base.as_deref().map_or(true, |b| registry.contains(b));
                if ready {
                    let layout = parse_layout(&input, registry)?;
                    loaded.push(registry.register(layout)?);
                } else {
                    blocked.push((base, input));
                }
            }
            if blocked.len() == before {
                let missing = blocked
                    .into_iter()
                    .find_map(|(base, _)| base)
                    .unwrap_or_default();
                return Err(LayoutError::UnknownLayout(missing));
            }
            pending = blocked;
        }
        Ok(loaded)
    }
}
