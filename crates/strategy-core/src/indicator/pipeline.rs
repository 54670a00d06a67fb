//! Registered indicators keyed by bar type.

use std::collections::HashMap;

use model::{Bar, BarType};
use tracing::{debug, warn};

use super::{Indicator, IndicatorBinding};
use crate::error::{ensure_label, StrategyError};

struct Registration {
    label: String,
    binding: IndicatorBinding,
    indicator: Box<dyn Indicator>,
}

/// Indicators fed from bar updates, in registration order per bar type.
#[derive(Default)]
pub struct IndicatorPipeline {
    by_bar_type: HashMap<BarType, Vec<Registration>>,
    /// Label to the bar type it was registered under.
    labels: HashMap<String, BarType>,
}

impl IndicatorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an indicator for a bar type under a unique label.
    pub fn register(
        &mut self,
        bar_type: BarType,
        indicator: Box<dyn Indicator>,
        binding: IndicatorBinding,
        label: impl Into<String>,
    ) -> Result<(), StrategyError> {
        let label = label.into();
        ensure_label(&label, "indicator label")?;
        if self.labels.contains_key(&label) {
            return Err(StrategyError::DuplicateIndicatorLabel(label));
        }

        debug!(
            label = %label,
            bar_type = %bar_type,
            indicator = indicator.name(),
            fields = ?binding.fields(),
            "registered indicator"
        );

        self.labels.insert(label.clone(), bar_type.clone());
        self.by_bar_type
            .entry(bar_type)
            .or_default()
            .push(Registration {
                label,
                binding,
                indicator,
            });
        Ok(())
    }

    /// Feed a bar to every indicator bound to its bar type.
    ///
    /// A failing indicator is logged and skipped. Returns how many failed.
    pub fn update(&mut self, bar_type: &BarType, bar: &Bar) -> usize {
        let Some(registrations) = self.by_bar_type.get_mut(bar_type) else {
            return 0;
        };

        let mut failures = 0;
        for registration in registrations.iter_mut() {
            let inputs = registration.binding.extract(bar);
            if let Err(e) = registration.indicator.update(&inputs) {
                warn!(label = %registration.label, error = %e, "indicator update failed");
                failures += 1;
            }
        }
        failures
    }

    /// Reset every registered indicator.
    pub fn reset_all(&mut self) {
        for registration in self.by_bar_type.values_mut().flatten() {
            registration.indicator.reset();
        }
    }

    /// Indicators registered for a bar type, in registration order.
    pub fn indicators(&self, bar_type: &BarType) -> Result<Vec<&dyn Indicator>, StrategyError> {
        match self.by_bar_type.get(bar_type) {
            Some(registrations) if !registrations.is_empty() => Ok(registrations
                .iter()
                .map(|r| r.indicator.as_ref())
                .collect()),
            _ => Err(StrategyError::NoIndicators(bar_type.to_string())),
        }
    }

    /// Indicator registered under `label`.
    pub fn indicator(&self, label: &str) -> Result<&dyn Indicator, StrategyError> {
        self.labels
            .get(label)
            .and_then(|bar_type| self.by_bar_type.get(bar_type))
            .and_then(|registrations| registrations.iter().find(|r| r.label == label))
            .map(|r| r.indicator.as_ref())
            .ok_or_else(|| StrategyError::IndicatorNotFound(label.to_string()))
    }

    /// Binding used for the indicator registered under `label`.
    pub fn binding(&self, label: &str) -> Result<&IndicatorBinding, StrategyError> {
        self.labels
            .get(label)
            .and_then(|bar_type| self.by_bar_type.get(bar_type))
            .and_then(|registrations| registrations.iter().find(|r| r.label == label))
            .map(|r| &r.binding)
            .ok_or_else(|| StrategyError::IndicatorNotFound(label.to_string()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
