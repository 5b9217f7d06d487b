use super::error::PatternError;
use super::slug::slugify;
use crate::domain::{Candidate, CatalogModel};

const UNKNOWN_CREATOR: &str = "unknown_creator";
const UNKNOWN_BASE_MODEL: &str = "unknown_baseModel";

/// Values available to path patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathData {
    pub model_id: u64,
    pub model_name: String,
    pub model_type: String,
    pub creator_name: Option<String>,
    pub version_id: u64,
    pub version_name: String,
    pub base_model: Option<String>,
}

enum Value<'a> {
    Number(u64),
    Text(&'a str),
}

impl PathData {
    pub fn from_candidate(candidate: &Candidate) -> Self {
        let mut data = Self::from_model(&candidate.model);
        data.version_id = candidate.version.id;
        data.version_name.clone_from(&candidate.version.name);
        data.base_model = Some(candidate.version.base_model.clone()).filter(|b| !b.is_empty());
        data
    }

    /// Model-scoped data; version fields stay empty.
    pub fn from_model(model: &CatalogModel) -> Self {
        Self {
            model_id: model.id,
            model_name: model.name.clone(),
            model_type: model.model_type.clone(),
            creator_name: model.creator_name().map(str::to_string),
            ..Self::default()
        }
    }

    fn lookup(&self, key: &str) -> Option<Value<'_>> {
        Some(match key {
            "modelId" => Value::Number(self.model_id),
            "modelName" => Value::Text(&self.model_name),
            "modelType" => Value::Text(&self.model_type),
            "creatorName" => Value::Text(
                self.creator_name
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .unwrap_or(UNKNOWN_CREATOR),
            ),
            "versionId" => Value::Number(self.version_id),
            "versionName" => Value::Text(&self.version_name),
            "baseModel" => Value::Text(
                self.base_model
                    .as_deref()
                    .filter(|b| !b.is_empty())
                    .unwrap_or(UNKNOWN_BASE_MODEL),
            ),
            _ => return None,
        })
    }
}

/// Expand a brace pattern such as `{modelType}/{modelName}/{baseModel}`.
///
/// String values are slugged before substitution. The result is a relative
/// path with `/` separators; empty, `.` and `..` components are dropped.
pub fn expand_pattern(pattern: &str, data: &PathData) -> Result<String, PatternError> {
    if pattern.trim().is_empty() {
        return Err(PatternError::Empty);
    }

    let mut expanded = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        expanded.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| PatternError::Unterminated(pattern.to_string()))?;
        let key = after[..close].trim();
        match data.lookup(key) {
            Some(Value::Number(n)) => expanded.push_str(&n.to_string()),
            Some(Value::Text(s)) => expanded.push_str(&slugify(s)),
            None => return Err(PatternError::UnknownPlaceholder(key.to_string())),
        }
        rest = &after[close + 1..];
    }
    expanded.push_str(rest);

    Ok(expanded
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "." && *c != "..")
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> PathData {
        PathData {
            model_id: 10,
            model_name: "toon".into(),
            model_type: "CKPT".into(),
            creator_name: None,
            version_id: 100,
            version_name: "v1 final".into(),
            base_model: Some("SD1.5".into()),
        }
    }

    #[test]
    fn expands_default_version_pattern() {
        let out = expand_pattern("{modelType}/{modelName}/{baseModel}", &data()).unwrap();
        assert_eq!(out, "CKPT/toon/SD1.5");
    }

    #[test]
    fn numbers_are_not_slugged_and_strings_are() {
        let out = expand_pattern("{modelId}-{versionName}/{versionId}", &data()).unwrap();
        assert_eq!(out, "10-v1_final/100");
    }

    #[test]
    fn applies_defaults() {
        let mut d = data();
        d.base_model = None;
        let out = expand_pattern("{creatorName}/{baseModel}", &d).unwrap();
        assert_eq!(out, "unknown_creator/unknown_baseModel");
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        assert_eq!(
            expand_pattern("{modelType}/{nope}", &data()),
            Err(PatternError::UnknownPlaceholder("nope".into()))
        );
        assert!(matches!(
            expand_pattern("{modelType", &data()),
            Err(PatternError::Unterminated(_))
        ));
        assert_eq!(expand_pattern("  ", &data()), Err(PatternError::Empty));
    }

    #[test]
    fn traversal_components_are_dropped() {
        let out = expand_pattern("../{modelType}/./x//", &data()).unwrap();
        assert_eq!(out, "CKPT/x");
    }
}
