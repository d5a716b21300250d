//! Package manifest validation

use crate::manifest::PackageManifest;

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid package name format
    InvalidPackageName(String),
    /// Invalid version
    InvalidVersion(String),
    /// Invalid dependency specification
    InvalidDependency { name: String, reason: String },
    /// Empty or absolute skip/detach prefix
    InvalidPrefix { field: String, reason: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidPackageName(name) => {
                write!(f, "Invalid package name: {}", name)
            }
            ValidationError::InvalidVersion(version) => {
                write!(f, "Invalid version: {}", version)
            }
            ValidationError::InvalidDependency { name, reason } => {
                write!(f, "Invalid dependency '{}': {}", name, reason)
            }
            ValidationError::InvalidPrefix { field, reason } => {
                write!(f, "Invalid '{}' entry: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Package manifest validator
pub struct Validator;

impl Validator {
    /// Validate package manifest
    pub fn validate(manifest: &PackageManifest) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_package_name(&manifest.name) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_version(&manifest.version) {
            errors.push(e);
        }

        for (name, range) in manifest.dependencies() {
            if name.is_empty() {
                errors.push(ValidationError::InvalidDependency {
                    name: name.to_string(),
                    reason: "name cannot be empty".to_string(),
                });
            } else if range.trim().is_empty() {
                errors.push(ValidationError::InvalidDependency {
                    name: name.to_string(),
                    reason: "version range cannot be empty".to_string(),
                });
            }
        }

        errors.extend(Self::validate_prefixes("skip", manifest.skip.as_ref().map(|p| p.to_vec())));
        errors.extend(Self::validate_prefixes(
            "detach",
            manifest.detach.as_ref().map(|p| p.to_vec()),
        ));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate package name format
    ///
    /// The name becomes a directory and file-name component of the output
    /// trees, so separators are limited to a single npm-style scope.
    pub fn validate_package_name(name: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::InvalidPackageName(
                "Package name cannot be empty".to_string(),
            ));
        }

        if name.starts_with('.') {
            return Err(ValidationError::InvalidPackageName(format!(
                "'{}' cannot start with '.'",
                name
            )));
        }

        let stray_at = name.rfind('@').is_some_and(|i| i > 0);
        if stray_at || name.chars().any(|c| c.is_whitespace() || c == '\\') {
            return Err(ValidationError::InvalidPackageName(format!(
                "'{}' contains whitespace, '\\' or a stray '@'",
                name
            )));
        }

        let slashes = name.matches('/').count();
        if slashes > 1 || (slashes == 1 && !name.starts_with('@')) {
            return Err(ValidationError::InvalidPackageName(format!(
                "'{}' may only contain '/' after an @scope",
                name
            )));
        }

        Ok(())
    }

    /// Validate version string (semver)
    pub fn validate_version(version: &str) -> Result<(), ValidationError> {
        semver::Version::parse(version)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidVersion(format!("'{}': {}", version, e)))
    }

    fn validate_prefixes(field: &str, prefixes: Option<Vec<String>>) -> Vec<ValidationError> {
        prefixes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|prefix| {
                if prefix.is_empty() {
                    Some(ValidationError::InvalidPrefix {
                        field: field.to_string(),
                        reason: "empty prefix matches every file".to_string(),
                    })
                } else if prefix.starts_with('/') {
                    Some(ValidationError::InvalidPrefix {
                        field: field.to_string(),
                        reason: format!("'{}' must be relative to the package root", prefix),
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::PathList;
    use rstest::rstest;

    #[rstest]
    #[case("app", true)]
    #[case("my-lib_2", true)]
    #[case("@scope/pkg", true)]
    #[case("", false)]
    #[case(".hidden", false)]
    #[case("a b", false)]
    #[case("a/b", false)]
    #[case("a@b", false)]
    #[case("@scope/a/b", false)]
    fn test_package_names(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(Validator::validate_package_name(name).is_ok(), valid);
    }

    #[rstest]
    #[case("1.0.0", true)]
    #[case("2.0.0-beta.1", true)]
    #[case("1.0", false)]
    #[case("latest", false)]
    fn test_versions(#[case] version: &str, #[case] valid: bool) {
        assert_eq!(Validator::validate_version(version).is_ok(), valid);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut manifest = PackageManifest::new("", "x");
        manifest.skip = Some(PathList::Many(vec!["".to_string(), "/abs".to_string()]));

        let errors = Validator::validate(&manifest).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_valid_manifest() {
        let mut manifest = PackageManifest::new("app", "1.0.0");
        manifest.detach = Some(PathList::One("res/".to_string()));
        assert!(Validator::validate(&manifest).is_ok());
    }
}
