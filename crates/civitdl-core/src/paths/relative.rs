use std::path::{Component, Path};

/// Express `dir` relative to `save_root`, using `/` separators.
///
/// When `dir` is not under `save_root` a warning is logged and the
/// absolute path is returned instead.
pub fn relative_folder(save_root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(save_root) {
        Ok(rel) => rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => {
            tracing::warn!(
                target: "civitdl.download",
                root = %save_root.display(),
                dir = %dir.display(),
                "cannot relativize folder, storing absolute path"
            );
            dir.to_string_lossy().into_owned()
        }
    }
}
