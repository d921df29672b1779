use serde::{Deserialize, Serialize};

/// Semantic view of a single plugin parameter.
///
/// `value` is refreshed from the live native store every time the list is
/// requested, so it reflects automation applied outside the host as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginParameter {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub unit: Option<String>,
    pub group: Option<String>,
    pub read_only: bool,
}

impl PluginParameter {
    pub fn normalised(&self) -> f64 {
        if (self.max - self.min).abs() <= f64::EPSILON {
            0.0
        } else {
            (self.value - self.min) / (self.max - self.min)
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if self.min <= self.max {
            value.clamp(self.min, self.max)
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(value: f64) -> PluginParameter {
        PluginParameter {
            id: "mix".into(),
            name: "Mix".into(),
            value,
            min: -12.0,
            max: 12.0,
            unit: Some("dB".into()),
            group: None,
            read_only: false,
        }
    }

    #[test]
    fn normalised_maps_range() {
        assert!((param(0.0).normalised() - 0.5).abs() < 1e-9);
        assert!((param(12.0).normalised() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clamp_respects_bounds() {
        let p = param(0.0);
        assert_eq!(p.clamp(40.0), 12.0);
        assert_eq!(p.clamp(-40.0), -12.0);
    }
}
