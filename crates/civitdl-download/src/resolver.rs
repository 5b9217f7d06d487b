//! Pattern-driven on-disk targets.

use std::path::{Path, PathBuf};

use civitdl_core::{
    Candidate, CatalogModel, PathData, PatternError, ResolvedTarget, expand_pattern, slugify,
};

/// Resolves candidates and models to paths under the save root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    save_root: PathBuf,
    version_pattern: String,
    model_info_pattern: String,
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|c| !c.is_empty())
        .fold(root.to_path_buf(), |acc, c| acc.join(c))
}

/// `<versionId>_<slug(name)>`.
pub(crate) fn version_file_name(version_id: u64, name: &str) -> String {
    format!("{version_id}_{}", slugify(name))
}

impl PathResolver {
    pub fn new(
        save_root: impl Into<PathBuf>,
        version_pattern: impl Into<String>,
        model_info_pattern: impl Into<String>,
    ) -> Self {
        Self {
            save_root: save_root.into(),
            version_pattern: version_pattern.into(),
            model_info_pattern: model_info_pattern.into(),
        }
    }

    pub fn save_root(&self) -> &Path {
        &self.save_root
    }

    /// Target directory and intended file path for a candidate.
    pub fn resolve(&self, candidate: &Candidate) -> Result<ResolvedTarget, PatternError> {
        let relative_dir =
            expand_pattern(&self.version_pattern, &PathData::from_candidate(candidate))?;
        let absolute_dir = join_relative(&self.save_root, &relative_dir);
        let file_path =
            absolute_dir.join(version_file_name(candidate.version_id(), &candidate.file.name));
        Ok(ResolvedTarget {
            relative_dir,
            absolute_dir,
            file_path,
        })
    }

    /// `<expand(modelInfoPattern)>/<modelId>-<slug(modelName)>.json`.
    pub fn model_info_path(&self, model: &CatalogModel) -> Result<PathBuf, PatternError> {
        let relative = expand_pattern(&self.model_info_pattern, &PathData::from_model(model))?;
        Ok(join_relative(&self.save_root, &relative)
            .join(format!("{}-{}.json", model.id, slugify(&model.name))))
    }
}
