//! Profile registry -- the named set of strategy profiles a planner can use.

use std::collections::BTreeMap;

use super::{ProfileError, StrategyProfile, builtin_profiles};

/// A collection of validated [`StrategyProfile`]s, keyed by id.
///
/// # Example
///
/// ```ignore
/// let mut registry = ProfileRegistry::with_builtins();
/// registry.register(custom_profile)?;
/// let profile = registry.get("budget-friendly").unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, StrategyProfile>,
}

impl ProfileRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry preloaded with the built-in profiles.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            registry.profiles.insert(profile.id.clone(), profile);
        }
        registry
    }

    /// Register a profile after validating it.
    ///
    /// A profile with the same id is replaced and the old one is returned.
    pub fn register(
        &mut self,
        profile: StrategyProfile,
    ) -> Result<Option<StrategyProfile>, ProfileError> {
        profile.validate()?;
        Ok(self.profiles.insert(profile.id.clone(), profile))
    }

    /// Look up a profile by id.
    pub fn get(&self, id: &str) -> Option<&StrategyProfile> {
        self.profiles.get(id)
    }

    /// Profile ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StrategyProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::tests::sample_profile;

    #[test]
    fn builtins_are_registered() {
        let registry = ProfileRegistry::with_builtins();
        assert_eq!(registry.len(), 4);
        assert!(registry.get("little-guys").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = ProfileRegistry::new();
        assert!(registry.is_empty());

        let first = sample_profile();
        assert!(registry.register(first.clone()).unwrap().is_none());

        let mut second = sample_profile();
        second.name = "Replacement".to_string();
        let old = registry.register(second).unwrap();
        assert_eq!(old.map(|p| p.name), Some(first.name));
        assert_eq!(registry.get("test").unwrap().name, "Replacement");
    }

    #[test]
    fn register_rejects_invalid_profile() {
        let mut registry = ProfileRegistry::new();
        let mut bad = sample_profile();
        bad.constraints.max_correction_passes = 7;
        assert!(registry.register(bad).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn ids_are_sorted() {
        let registry = ProfileRegistry::with_builtins();
        assert_eq!(
            registry.ids(),
            vec!["all-inclusive", "budget-friendly", "little-guys", "proportional"]
        );
    }
}
