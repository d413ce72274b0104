//! Feature gate: which features generate code, and through which wrappers.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::ConfigError;
use crate::wrapper::WrapperKind;

/// Decision for one feature, made at begin-feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDecision {
    /// Feature is on the allow-list.
    pub supported: bool,

    /// Wrapper kinds allowed to see the feature; `None` means all of them.
    pub restriction: Option<Vec<WrapperKind>>,
}

impl FeatureDecision {
    /// Decision for a feature that is not generated.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            restriction: None,
        }
    }

    /// Whether a wrapper of `kind` takes part in the feature.
    pub fn admits(&self, kind: WrapperKind) -> bool {
        self.supported
            && self
                .restriction
                .as_ref()
                .map_or(true, |kinds| kinds.contains(&kind))
    }
}

/// Allow-list of features, per-feature wrapper restrictions and the type
/// names the registry keeps even for unsupported features.
#[derive(Debug, Clone, Default)]
pub struct FeatureGate {
    supported: Vec<String>,
    supported_set: HashSet<String>,
    restrictions: HashMap<String, Vec<WrapperKind>>,
    exceptions: BTreeSet<String>,
}

impl FeatureGate {
    /// Build a gate from an allow-list.
    pub fn new(supported: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut gate = Self::default();
        for name in supported {
            gate.add_supported(name);
        }
        gate
    }

    /// Add a feature to the allow-list. Adding it twice has no effect.
    pub fn add_supported(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.supported_set.insert(name.clone()) {
            self.supported.push(name);
        }
    }

    /// Restrict a supported feature to the given wrapper kinds.
    pub fn restrict(
        &mut self,
        feature: impl Into<String>,
        kinds: impl IntoIterator<Item = WrapperKind>,
    ) -> Result<(), ConfigError> {
        let feature = feature.into();
        if !self.supported_set.contains(&feature) {
            return Err(ConfigError::RestrictionForUnsupportedFeature { feature });
        }
        self.restrictions
            .insert(feature, kinds.into_iter().collect());
        Ok(())
    }

    /// Builder form of [`FeatureGate::restrict`].
    pub fn with_restriction(
        mut self,
        feature: impl Into<String>,
        kinds: impl IntoIterator<Item = WrapperKind>,
    ) -> Result<Self, ConfigError> {
        self.restrict(feature, kinds)?;
        Ok(self)
    }

    /// Replace the registry exception set.
    pub fn with_exceptions(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exceptions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Decide how a feature is processed.
    pub fn evaluate(&self, feature: &str) -> FeatureDecision {
        if !self.supported_set.contains(feature) {
            return FeatureDecision::unsupported();
        }
        FeatureDecision {
            supported: true,
            restriction: self.restrictions.get(feature).cloned(),
        }
    }

    pub fn is_supported(&self, feature: &str) -> bool {
        self.supported_set.contains(feature)
    }

    /// Whether a type name is kept in the registry regardless of its feature.
    pub fn is_exception(&self, type_name: &str) -> bool {
        self.exceptions.contains(type_name)
    }

    /// Supported features in insertion order.
    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    /// Registry exception set.
    pub fn exceptions(&self) -> &BTreeSet<String> {
        &self.exceptions
    }

    /// Restriction of a feature, if any.
    pub fn restriction(&self, feature: &str) -> Option<&[WrapperKind]> {
        self.restrictions.get(feature).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_feature() {
        let gate = FeatureGate::new(["VK_VERSION_1_0"]);
        let decision = gate.evaluate("VK_EXT_unknown");

        assert!(!decision.supported);
        assert!(!decision.admits(WrapperKind::Encoder));
    }

    #[test]
    fn test_unrestricted_feature_admits_all() {
        let gate = FeatureGate::new(["VK_VERSION_1_0"]);
        let decision = gate.evaluate("VK_VERSION_1_0");

        assert!(WrapperKind::ALL.iter().all(|k| decision.admits(*k)));
    }

    #[test]
    fn test_restricted_feature() {
        let gate = FeatureGate::new(["VK_VERSION_1_0", "VK_EXT_debug_utils"])
            .with_restriction("VK_EXT_debug_utils", [WrapperKind::Dispatch])
            .unwrap();
        let decision = gate.evaluate("VK_EXT_debug_utils");

        assert!(decision.admits(WrapperKind::Dispatch));
        assert!(!decision.admits(WrapperKind::Encoder));
        assert_eq!(gate.restriction("VK_VERSION_1_0"), None);
    }

    #[test]
    fn test_restriction_requires_supported_feature() {
        let err = FeatureGate::new(["VK_VERSION_1_0"])
            .with_restriction("VK_KHR_win32_surface", [WrapperKind::Dispatch])
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::RestrictionForUnsupportedFeature { feature } if feature == "VK_KHR_win32_surface"
        ));
    }

    #[test]
    fn test_supported_keeps_order_without_duplicates() {
        let mut gate = FeatureGate::new(["b", "a"]);
        gate.add_supported("b");

        assert_eq!(gate.supported(), ["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_exceptions() {
        let gate = FeatureGate::default().with_exceptions(["int", "double"]);

        assert!(gate.is_exception("int"));
        assert!(!gate.is_exception("float"));
        assert_eq!(gate.exceptions().len(), 2);
    }
}
