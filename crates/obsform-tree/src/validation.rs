use std::sync::Arc;

use obsform_conf::FindingSeverity;
use obsform_conf::ValidationConfig;
use obsform_model::Concept;
use obsform_model::Finding;
use obsform_model::Interpretation;
use serde_json::Value;

use crate::DataSource;
use crate::Record;
use crate::ValueMapper;

/// Stable finding codes. The UI owns the wording.
pub mod codes {
    pub const MANDATORY: &str = "mandatory";
    pub const ALLOW_DECIMAL: &str = "allowDecimal";
    pub const ALLOW_RANGE: &str = "allowRange";
    pub const MIN_MAX_RANGE: &str = "minMaxRange";
    pub const ALLOW_FUTURE_DATES: &str = "allowFutureDates";
}

/// Attaches findings to the value-holding records of a tree.
#[derive(Clone, Debug, Default)]
pub struct Validator {
    config: ValidationConfig,
    today: Option<String>,
}

impl Validator {
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            today: None,
        }
    }

    /// The current date as `YYYY-MM-DD`. Without it dates are not checked
    /// against the future.
    #[must_use]
    pub fn with_today(self, today: impl Into<String>) -> Self {
        Self {
            today: Some(today.into()),
            ..self
        }
    }

    /// A copy of `root` with fresh findings on every active leaf. Previous
    /// findings are replaced; removed records are left as they are.
    #[must_use]
    pub fn validate(&self, root: &Record) -> Record {
        if !root.is_active() {
            return root.clone();
        }

        match root.mapper() {
            Some(ValueMapper::Obs | ValueMapper::ObsList) => self.validate_leaf(root),
            Some(ValueMapper::ObsGroup) | None => {
                let children = root
                    .children()
                    .iter()
                    .map(|child| Arc::new(self.validate(child)))
                    .collect();
                root.with_children(children)
            }
        }
    }

    fn validate_leaf(&self, record: &Record) -> Record {
        let mut findings = Vec::new();
        let control = record.control();

        if control.properties.mandatory && !record.has_value() {
            findings.extend(self.finding(codes::MANDATORY, FindingSeverity::Error));
        }

        let value = record.computed_value();
        let mut abnormal = None;
        if let (Some(concept), Some(ValueMapper::Obs)) = (control.concept.as_ref(), record.mapper()) {
            if concept.is_numeric() {
                if let Some(number) = numeric_value(&value) {
                    findings.extend(self.check_number(concept, number));
                    abnormal = Some(outside(number, concept.low_normal, concept.hi_normal));
                }
            } else if concept.is_date() {
                let allowed = control
                    .properties
                    .allow_future_dates
                    .unwrap_or(self.config.allow_future_dates_by_default);
                if !allowed && self.is_future(&value) {
                    findings.extend(self.finding(codes::ALLOW_FUTURE_DATES, FindingSeverity::Error));
                }
            }
        }

        if !findings.is_empty() {
            tracing::trace!(path = %record.path(), findings = findings.len(), "validated record");
        }

        let record = record.with_errors(findings);
        match abnormal {
            Some(abnormal) if self.config.is_enabled(codes::MIN_MAX_RANGE) => {
                flag_abnormal(record, abnormal)
            }
            _ => record,
        }
    }

    fn check_number(&self, concept: &Concept, number: f64) -> Vec<Finding> {
        let mut findings = Vec::new();

        if concept.allow_decimal == Some(false) && number.fract().abs() > f64::EPSILON {
            findings.extend(self.finding(codes::ALLOW_DECIMAL, FindingSeverity::Error));
        }
        if outside(number, concept.low_absolute, concept.hi_absolute) {
            findings.extend(self.finding(codes::ALLOW_RANGE, FindingSeverity::Error));
        }
        if outside(number, concept.low_normal, concept.hi_normal) {
            findings.extend(self.finding(codes::MIN_MAX_RANGE, FindingSeverity::Warning));
        }

        findings
    }

    fn is_future(&self, value: &Value) -> bool {
        let (Some(today), Some(date)) = (self.today.as_deref(), value.as_str()) else {
            return false;
        };
        match (date.get(..10), today.get(..10)) {
            (Some(date), Some(today)) => date > today,
            _ => false,
        }
    }

    fn finding(&self, code: &str, default: FindingSeverity) -> Option<Finding> {
        match self.config.severity_for(code, default) {
            FindingSeverity::Off => None,
            FindingSeverity::Error => Some(Finding::error(code)),
            FindingSeverity::Warning => Some(Finding::warning(code)),
        }
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn outside(number: f64, low: Option<f64>, high: Option<f64>) -> bool {
    low.is_some_and(|low| number < low) || high.is_some_and(|high| number > high)
}

/// Keep the observation's abnormal interpretation in step with the value.
fn flag_abnormal(record: Record, abnormal: bool) -> Record {
    let current = match record.data_source() {
        Some(DataSource::Single(obs)) => obs.interpretation,
        _ => return record,
    };
    let wanted = abnormal.then_some(Interpretation::Abnormal);
    if current == wanted {
        return record;
    }
    record.with_interpretation(wanted).unwrap_or(record)
}
