//! File- and model-level candidate predicates.

use std::sync::Arc;

use civitdl_core::{Candidate, CatalogModel, FilterOptions, ModelFile, ModelVersion};

const REQUIRED_FORMAT: &str = "safetensor";
const CHECKPOINT_TYPE: &str = "checkpoint";

/// Why a file or version was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingCrc32,
    Format(String),
    NotPrimary,
    NotPruned,
    NotFp16,
    FilenameBlacklisted(String),
    BaseModelBlacklisted(String),
    ModelType(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCrc32 => write!(f, "no CRC32 hash"),
            Self::Format(format) => write!(f, "format '{format}' is not {REQUIRED_FORMAT}"),
            Self::NotPrimary => write!(f, "not the primary file"),
            Self::NotPruned => write!(f, "checkpoint is not pruned"),
            Self::NotFp16 => write!(f, "checkpoint is not fp16"),
            Self::FilenameBlacklisted(s) => write!(f, "filename contains '{s}'"),
            Self::BaseModelBlacklisted(s) => write!(f, "base model contains '{s}'"),
            Self::ModelType(t) => write!(f, "model type '{t}' not selected"),
        }
    }
}

/// Applies [`FilterOptions`] to catalog records.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    options: FilterOptions,
    ignore_filenames: Vec<String>,
    ignore_base_models: Vec<String>,
}

fn lowered(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn first_contained<'a>(haystack: &str, needles: &'a [String]) -> Option<&'a String> {
    let haystack = haystack.to_lowercase();
    needles.iter().find(|n| haystack.contains(n.as_str()))
}

impl CandidateFilter {
    pub fn new(options: FilterOptions) -> Self {
        let ignore_filenames = lowered(&options.ignore_filename_strings);
        let ignore_base_models = lowered(&options.ignore_base_models);
        Self {
            options,
            ignore_filenames,
            ignore_base_models,
        }
    }

    /// Model-level check against the selected model types.
    pub fn check_model(&self, model: &CatalogModel) -> Result<(), Rejection> {
        if self.options.model_types.is_empty()
            || self
                .options
                .model_types
                .iter()
                .any(|t| t.trim().eq_ignore_ascii_case(&model.model_type))
        {
            Ok(())
        } else {
            Err(Rejection::ModelType(model.model_type.clone()))
        }
    }

    /// Version-level base-model blacklist.
    pub fn check_version(&self, version: &ModelVersion) -> Result<(), Rejection> {
        match first_contained(&version.base_model, &self.ignore_base_models) {
            Some(hit) => Err(Rejection::BaseModelBlacklisted(hit.clone())),
            None => Ok(()),
        }
    }

    /// File-level predicates, in order.
    pub fn check_file(&self, model_type: &str, file: &ModelFile) -> Result<(), Rejection> {
        if file.hashes.crc32().is_none() {
            return Err(Rejection::MissingCrc32);
        }

        let format = file.metadata.format.as_deref().unwrap_or_default();
        if !format.trim().eq_ignore_ascii_case(REQUIRED_FORMAT) {
            return Err(Rejection::Format(format.to_string()));
        }

        if self.options.primary_only && !file.primary {
            return Err(Rejection::NotPrimary);
        }

        if model_type.eq_ignore_ascii_case(CHECKPOINT_TYPE) {
            let size = file.metadata.size.as_deref().unwrap_or_default();
            if self.options.pruned && !size.eq_ignore_ascii_case("pruned") {
                return Err(Rejection::NotPruned);
            }
            let fp = file.metadata.fp.as_deref().unwrap_or_default();
            if self.options.fp16 && !fp.eq_ignore_ascii_case("fp16") {
                return Err(Rejection::NotFp16);
            }
        }

        if let Some(hit) = first_contained(&file.name, &self.ignore_filenames) {
            return Err(Rejection::FilenameBlacklisted(hit.clone()));
        }

        Ok(())
    }

    /// Every candidate of `model` that passes all predicates, in catalog
    /// order.
    pub fn candidates(&self, model: &Arc<CatalogModel>) -> Vec<Candidate> {
        if let Err(reason) = self.check_model(model) {
            tracing::debug!(target: "civitdl.download", model_id = model.id, %reason, "model rejected");
            return Vec::new();
        }

        let mut out = Vec::new();
        for version in &model.model_versions {
            if let Err(reason) = self.check_version(version) {
                tracing::debug!(target: "civitdl.download", version_id = version.id, %reason, "version rejected");
                continue;
            }
            for file in &version.files {
                match self.check_file(&model.model_type, file) {
                    Ok(()) => out.push(Candidate::new(
                        Arc::clone(model),
                        version.clone(),
                        file.clone(),
                    )),
                    Err(reason) => tracing::debug!(
                        target: "civitdl.download",
                        version_id = version.id,
                        file = %file.name,
                        %reason,
                        "file rejected"
                    ),
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civitdl_core::{FileHashes, FileMetadata};

    fn file(name: &str) -> ModelFile {
        ModelFile {
            id: 1,
            name: name.into(),
            primary: true,
            metadata: FileMetadata {
                fp: Some("fp16".into()),
                size: Some("pruned".into()),
                format: Some("SafeTensor".into()),
            },
            hashes: FileHashes {
                crc32: Some("DEADBEEF".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_crc32_rejected_regardless_of_flags() {
        let filter = CandidateFilter::new(FilterOptions::default());
        let mut f = file("a.safetensors");
        f.hashes.crc32 = Some("  ".into());
        assert_eq!(filter.check_file("LORA", &f), Err(Rejection::MissingCrc32));
    }

    #[test]
    fn test_format_must_be_safetensor() {
        let filter = CandidateFilter::new(FilterOptions::default());
        let mut f = file("a.ckpt");
        f.metadata.format = Some("PickleTensor".into());
        assert!(matches!(filter.check_file("LORA", &f), Err(Rejection::Format(_))));
    }

    #[test]
    fn test_checkpoint_pruned_and_fp16() {
        let filter = CandidateFilter::new(FilterOptions {
            pruned: true,
            fp16: true,
            ..Default::default()
        });
        let mut f = file("a.safetensors");
        assert!(filter.check_file("Checkpoint", &f).is_ok());

        f.metadata.size = Some("full".into());
        assert_eq!(filter.check_file("Checkpoint", &f), Err(Rejection::NotPruned));
        // Only checkpoints are held to the size class.
        assert!(filter.check_file("LORA", &f).is_ok());

        f.metadata.size = Some("pruned".into());
        f.metadata.fp = Some("fp32".into());
        assert_eq!(filter.check_file("Checkpoint", &f), Err(Rejection::NotFp16));
    }

    #[test]
    fn test_primary_only() {
        let filter = CandidateFilter::new(FilterOptions {
            primary_only: true,
            ..Default::default()
        });
        let mut f = file("a.safetensors");
        f.primary = false;
        assert_eq!(filter.check_file("LORA", &f), Err(Rejection::NotPrimary));
    }

    #[test]
    fn test_blacklists_are_case_insensitive() {
        let filter = CandidateFilter::new(FilterOptions {
            ignore_filename_strings: vec!["INPAINT".into()],
            ignore_base_models: vec!["sdxl".into()],
            ..Default::default()
        });
        assert!(matches!(
            filter.check_file("LORA", &file("toon-inpainting.safetensors")),
            Err(Rejection::FilenameBlacklisted(_))
        ));

        let version = ModelVersion {
            base_model: "SDXL 1.0".into(),
            ..Default::default()
        };
        assert!(filter.check_version(&version).is_err());
    }

    #[test]
    fn test_candidates_walks_versions_and_files() {
        let filter = CandidateFilter::new(FilterOptions {
            model_types: vec!["checkpoint".into()],
            ignore_base_models: vec!["pony".into()],
            ..Default::default()
        });
        let mut bad = file("b.safetensors");
        bad.hashes.crc32 = None;
        let model = Arc::new(CatalogModel {
            id: 10,
            model_type: "Checkpoint".into(),
            model_versions: vec![
                ModelVersion {
                    id: 100,
                    base_model: "SD1.5".into(),
                    files: vec![file("a.safetensors"), bad],
                    ..Default::default()
                },
                ModelVersion {
                    id: 101,
                    base_model: "Pony".into(),
                    files: vec![file("c.safetensors")],
                    ..Default::default()
                },
            ],
            ..Default::default()
        });

        let out = filter.candidates(&model);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].version_id(), 100);

        let lora = Arc::new(CatalogModel {
            model_type: "LORA".into(),
            ..(*model).clone()
        });
        assert!(filter.candidates(&lora).is_empty());
    }
}
