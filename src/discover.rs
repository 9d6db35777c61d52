//! Input discovery for batch translation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::engine::{TranslationUnit, UnitKind};
use crate::error::TranslateResult;

/// Directories never worth descending into.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", ".git", "dbt_packages", "logs"];

/// A file selected for translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: UnitKind,
}

impl SourceFile {
    /// Unit name: the file stem.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn load(&self) -> TranslateResult<TranslationUnit> {
        let sql = fs::read_to_string(&self.path)?;
        Ok(TranslationUnit {
            name: self.name(),
            sql,
            kind: self.kind,
        })
    }
}

/// Files found under the requested paths.
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<SourceFile>,
    /// Files left out because their name contains an ignored keyword.
    pub skipped: Vec<PathBuf>,
}

impl Discovery {
    pub fn blocks(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter().filter(|f| f.kind == UnitKind::Block)
    }
}

/// Collect `.sql` files under `paths`. Explicit file arguments are taken as
/// they are; directories are walked recursively.
pub fn discover(paths: &[PathBuf], config: &Config) -> Discovery {
    let mut discovery = Discovery::default();
    for path in paths {
        if path.is_dir() {
            walk(path, config, &mut discovery);
        } else {
            add_file(path, config, &mut discovery);
        }
    }
    discovery.files.sort_by(|a, b| a.path.cmp(&b.path));
    discovery.files.dedup();
    debug!(
        files = discovery.files.len(),
        skipped = discovery.skipped.len(),
        "discovered inputs"
    );
    discovery
}

fn walk(dir: &Path, config: &Config, discovery: &mut Discovery) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if SKIPPED_DIRS.contains(&name) {
                continue;
            }
            walk(&path, config, discovery);
        } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("sql")) {
            add_file(&path, config, discovery);
        }
    }
}

fn add_file(path: &Path, config: &Config, discovery: &mut Discovery) {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if config.is_ignored(file_name) {
        discovery.skipped.push(path.to_path_buf());
        return;
    }
    discovery.files.push(SourceFile {
        path: path.to_path_buf(),
        kind: unit_kind(path, &config.blocks_dir),
    });
}

/// A file anywhere below a directory named `blocks_dir` is a block.
pub fn unit_kind(path: &Path, blocks_dir: &str) -> UnitKind {
    let in_blocks = path
        .parent()
        .into_iter()
        .flat_map(Path::ancestors)
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .any(|name| name.eq_ignore_ascii_case(blocks_dir));
    if in_blocks { UnitKind::Block } else { UnitKind::Model }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dbtshift-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_unit_kind() {
        assert_eq!(unit_kind(Path::new("repo/Blocks/base.sql"), "blocks"), UnitKind::Block);
        assert_eq!(unit_kind(Path::new("repo/blocks/x/y.sql"), "blocks"), UnitKind::Block);
        assert_eq!(unit_kind(Path::new("repo/reports/blocks.sql"), "blocks"), UnitKind::Model);
    }

    #[test]
    fn test_discover_walks_and_filters() {
        let root = scratch_dir("walk");
        fs::create_dir_all(root.join("blocks")).unwrap();
        fs::create_dir_all(root.join("reports/target")).unwrap();
        fs::write(root.join("blocks/base.sql"), "SELECT 1").unwrap();
        fs::write(root.join("reports/visits.sql"), "SELECT 2").unwrap();
        fs::write(root.join("reports/visits_old.sql"), "SELECT 3").unwrap();
        fs::write(root.join("reports/notes.txt"), "not sql").unwrap();
        fs::write(root.join("reports/target/built.sql"), "SELECT 4").unwrap();

        let config = Config::builder().ignore("_OLD").build();
        let found = discover(&[root.clone()], &config);

        let names: Vec<String> = found.files.iter().map(SourceFile::name).collect();
        assert_eq!(names, vec!["base", "visits"]);
        assert_eq!(found.blocks().count(), 1);
        assert_eq!(found.skipped.len(), 1);

        let unit = found.files[1].load().unwrap();
        assert_eq!(unit.sql, "SELECT 2");
        assert_eq!(unit.kind, UnitKind::Model);

        let _ = fs::remove_dir_all(&root);
    }
}
