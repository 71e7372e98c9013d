//! Descriptor-set validation
//!
//! Shape checks over a set of loaded descriptors. Unknown dependency
//! names are deliberately not validated here: graph resolution owns that
//! error and reports it with the full reference chain.

use crate::descriptor::{ModuleDescriptor, ModuleKind};
use std::collections::HashSet;

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Module name is empty or contains characters outside [A-Za-z0-9_-]
    InvalidModuleName(String),
    /// Two descriptors share a name
    DuplicateModule(String),
    /// Module lists itself as a dependency
    SelfDependency { module: String, list: &'static str },
    /// External modules cannot have implementation dependencies
    ExternalWithPrivateDependencies(String),
    /// Module confesses a cycle on itself
    SelfConfession(String),
    /// Prebuilt library not listed among the module's public libraries
    UnknownPrebuiltLibrary { module: String, library: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidModuleName(name) => {
                write!(f, "Invalid module name: '{}'", name)
            }
            ValidationError::DuplicateModule(name) => {
                write!(f, "Duplicate module name: '{}'", name)
            }
            ValidationError::SelfDependency { module, list } => {
                write!(f, "Module '{}' lists itself in {}", module, list)
            }
            ValidationError::ExternalWithPrivateDependencies(name) => {
                write!(
                    f,
                    "External module '{}' declares private dependencies but has no implementation",
                    name
                )
            }
            ValidationError::SelfConfession(name) => {
                write!(f, "Module '{}' declares a circular dependency on itself", name)
            }
            ValidationError::UnknownPrebuiltLibrary { module, library } => {
                write!(
                    f,
                    "Module '{}' marks '{}' as prebuilt but does not list it as a public library",
                    module, library
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Descriptor-set validator
pub struct Validator;

impl Validator {
    /// Validate a set of descriptors, collecting every error rather than
    /// stopping at the first.
    pub fn validate(descriptors: &[ModuleDescriptor]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for descriptor in descriptors {
            if !Self::is_valid_name(&descriptor.name) {
                errors.push(ValidationError::InvalidModuleName(descriptor.name.clone()));
            }
            if !seen.insert(descriptor.name.as_str()) {
                errors.push(ValidationError::DuplicateModule(descriptor.name.clone()));
            }
            errors.extend(Self::validate_descriptor(descriptor));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_descriptor(descriptor: &ModuleDescriptor) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let lists: [(&'static str, &[String]); 5] = [
            ("public_dependencies", &descriptor.public_dependencies),
            ("private_dependencies", &descriptor.private_dependencies),
            ("dynamically_loaded", &descriptor.dynamically_loaded),
            (
                "public_include_path_modules",
                &descriptor.public_include_path_modules,
            ),
            (
                "private_include_path_modules",
                &descriptor.private_include_path_modules,
            ),
        ];
        for (list, names) in lists {
            if names.iter().any(|n| n == &descriptor.name) {
                errors.push(ValidationError::SelfDependency {
                    module: descriptor.name.clone(),
                    list,
                });
            }
        }

        if descriptor.kind == ModuleKind::External && !descriptor.private_dependencies.is_empty() {
            errors.push(ValidationError::ExternalWithPrivateDependencies(
                descriptor.name.clone(),
            ));
        }

        if descriptor.confesses_cycle_on(&descriptor.name) {
            errors.push(ValidationError::SelfConfession(descriptor.name.clone()));
        }

        for library in &descriptor.prebuilt_libraries {
            if !descriptor.public_libraries.contains(library) {
                errors.push(ValidationError::UnknownPrebuiltLibrary {
                    module: descriptor.name.clone(),
                    library: library.clone(),
                });
            }
        }

        errors
    }

    fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_set() {
        let descriptors = vec![
            ModuleDescriptor::new("Core"),
            ModuleDescriptor::new("Engine"),
        ];
        assert!(Validator::validate(&descriptors).is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let descriptors = vec![ModuleDescriptor::new("")];
        let errors = Validator::validate(&descriptors).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidModuleName(String::new())));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let descriptors = vec![ModuleDescriptor::new("Core"), ModuleDescriptor::new("Core")];
        let errors = Validator::validate(&descriptors).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateModule("Core".into())]);
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut descriptor = ModuleDescriptor::new("Core");
        descriptor.private_dependencies.push("Core".to_string());
        let errors = Validator::validate(&[descriptor]).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::SelfDependency {
                module: "Core".into(),
                list: "private_dependencies",
            }]
        );
    }

    #[test]
    fn test_external_with_private_deps_rejected() {
        let mut descriptor = ModuleDescriptor::new("zlib");
        descriptor.kind = ModuleKind::External;
        descriptor.private_dependencies.push("Core".to_string());
        let errors = Validator::validate(&[descriptor]).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ExternalWithPrivateDependencies("zlib".into())]
        );
    }

    #[test]
    fn test_self_confession_rejected() {
        let mut descriptor = ModuleDescriptor::new("Engine");
        descriptor.circular_dependencies.push("Engine".to_string());
        let errors = Validator::validate(&[descriptor]).unwrap_err();
        assert_eq!(errors, vec![ValidationError::SelfConfession("Engine".into())]);
    }

    #[test]
    fn test_prebuilt_must_be_public_library() {
        let mut descriptor = ModuleDescriptor::new("PhysX");
        descriptor.prebuilt_libraries.push("PhysX_64.lib".to_string());
        let errors = Validator::validate(&[descriptor.clone()]).unwrap_err();
        assert_eq!(errors.len(), 1);

        descriptor.public_libraries.push("PhysX_64.lib".to_string());
        assert!(Validator::validate(&[descriptor]).is_ok());
    }

    #[test]
    fn test_unknown_dependency_is_not_a_validation_error() {
        // Graph resolution reports missing modules with the full chain.
        let mut descriptor = ModuleDescriptor::new("Engine");
        descriptor.public_dependencies.push("DoesNotExist".to_string());
        assert!(Validator::validate(&[descriptor]).is_ok());
    }
}
