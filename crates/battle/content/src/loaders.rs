//! JSON loaders for definition files.

use std::path::Path;

use battle_core::{CombatantDefinition, StatusEffectDefinition};

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper to read file contents with a path-bearing error.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read file {}: {}", path.display(), e))
}

/// Collects the `.json` files of a directory, sorted by file name so load
/// order (and duplicate-name reporting) is stable across platforms.
fn json_files(dir: &Path) -> LoadResult<Vec<std::path::PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("failed to read directory {}: {}", dir.display(), e))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Loader for combatant definition files.
pub struct UnitLoader;

impl UnitLoader {
    /// Parses one combatant definition from a JSON file.
    pub fn load(path: &Path) -> LoadResult<CombatantDefinition> {
        let json = read_file(path)?;
        serde_json::from_str(&json)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", path.display(), e))
    }

    /// Loads every `*.json` definition in a directory.
    pub fn load_dir(dir: &Path) -> LoadResult<Vec<CombatantDefinition>> {
        json_files(dir)?.iter().map(|path| Self::load(path)).collect()
    }
}

/// Loader for status-effect definition files.
pub struct StatusEffectLoader;

impl StatusEffectLoader {
    /// Parses one status-effect definition from a JSON file.
    pub fn load(path: &Path) -> LoadResult<StatusEffectDefinition> {
        let json = read_file(path)?;
        serde_json::from_str(&json)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", path.display(), e))
    }

    /// Loads every `*.json` definition in a directory.
    pub fn load_dir(dir: &Path) -> LoadResult<Vec<StatusEffectDefinition>> {
        json_files(dir)?.iter().map(|path| Self::load(path)).collect()
    }
}
