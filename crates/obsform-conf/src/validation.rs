use std::collections::HashMap;

use serde::Deserialize;

/// Severity override for a validation finding code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Off,
    Error,
    Warning,
}

/// Configuration for the built-in record validator.
///
/// Every validation rule reports with its own default severity. Individual
/// finding codes can be re-graded or switched off:
///
/// ```toml
/// [validation]
/// allow_future_dates_by_default = true
///
/// [validation.severity]
/// minMaxRange = "off"
/// allowDecimal = "warning"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct ValidationConfig {
    /// Map of finding codes to severity levels.
    pub severity: HashMap<String, FindingSeverity>,
    /// Whether date controls without an explicit `allowFutureDates` property
    /// accept dates after today.
    pub allow_future_dates_by_default: bool,
}

impl ValidationConfig {
    /// Resolve the severity for a finding code, falling back to the rule's
    /// own default when the code is not configured.
    ///
    /// ```
    /// # use obsform_conf::{FindingSeverity, ValidationConfig};
    /// # use std::collections::HashMap;
    /// let mut severity = HashMap::new();
    /// severity.insert("minMaxRange".to_string(), FindingSeverity::Off);
    ///
    /// let config = ValidationConfig { severity, ..Default::default() };
    ///
    /// assert_eq!(config.severity_for("minMaxRange", FindingSeverity::Warning), FindingSeverity::Off);
    /// assert_eq!(config.severity_for("mandatory", FindingSeverity::Error), FindingSeverity::Error);
    /// ```
    #[must_use]
    pub fn severity_for(&self, code: &str, default: FindingSeverity) -> FindingSeverity {
        if let Some(&severity) = self.severity.get(code) {
            return severity;
        }

        // `config` may fold table keys to lowercase
        self.severity
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(code))
            .map_or(default, |(_, &severity)| severity)
    }

    /// Check if a finding code should be reported at all.
    #[must_use]
    pub fn is_enabled(&self, code: &str) -> bool {
        self.severity_for(code, FindingSeverity::Error) != FindingSeverity::Off
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_default() {
        let config = ValidationConfig::default();
        assert_eq!(
            config.severity_for("mandatory", FindingSeverity::Error),
            FindingSeverity::Error
        );
        assert_eq!(
            config.severity_for("minMaxRange", FindingSeverity::Warning),
            FindingSeverity::Warning
        );
    }

    #[test]
    fn test_severity_override() {
        let mut severity = HashMap::new();
        severity.insert("allowDecimal".to_string(), FindingSeverity::Warning);
        severity.insert("minMaxRange".to_string(), FindingSeverity::Off);

        let config = ValidationConfig {
            severity,
            ..Default::default()
        };

        assert_eq!(
            config.severity_for("allowDecimal", FindingSeverity::Error),
            FindingSeverity::Warning
        );
        assert_eq!(
            config.severity_for("minMaxRange", FindingSeverity::Warning),
            FindingSeverity::Off
        );
    }

    #[test]
    fn test_is_enabled() {
        let mut severity = HashMap::new();
        severity.insert("mandatory".to_string(), FindingSeverity::Off);

        let config = ValidationConfig {
            severity,
            ..Default::default()
        };

        assert!(!config.is_enabled("mandatory"));
        assert!(config.is_enabled("allowRange"));
    }

    #[test]
    fn test_deserialize_validation_config() {
        let toml = r#"
            allow_future_dates_by_default = true

            [severity]
            mandatory = "warning"
            minMaxRange = "off"
        "#;

        let config: ValidationConfig = toml::from_str(toml).unwrap();
        assert!(config.allow_future_dates_by_default);
        assert_eq!(
            config.severity.get("mandatory"),
            Some(&FindingSeverity::Warning)
        );
        assert_eq!(
            config.severity.get("minMaxRange"),
            Some(&FindingSeverity::Off)
        );
    }
}
