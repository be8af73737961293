//! Status labels for averages on the 1 to 5 scale.

use serde::{Deserialize, Serialize};

/// The discrete status of an average.
///
/// The breakpoints are lower-bound inclusive:
///
/// | Average     | Status             |
/// |-------------|--------------------|
/// | >= 4.5      | `Excellent`        |
/// | >= 4.0      | `Good`             |
/// | >= 3.0      | `Regular`          |
/// | >= 2.0      | `NeedsImprovement` |
/// | below 2.0   | `Critical`         |
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Excellent,
    Good,
    Regular,
    NeedsImprovement,
    Critical,
}

const BREAKPOINTS: [(f64, StatusLevel); 4] = [
    (4.5, StatusLevel::Excellent),
    (4.0, StatusLevel::Good),
    (3.0, StatusLevel::Regular),
    (2.0, StatusLevel::NeedsImprovement),
];

impl StatusLevel {
    pub fn from_average(average: f64) -> StatusLevel {
        BREAKPOINTS
            .iter()
            .find(|(threshold, _)| average >= *threshold)
            .map(|(_, status)| *status)
            .unwrap_or(StatusLevel::Critical)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusLevel::Excellent => "Excellent",
            StatusLevel::Good => "Good",
            StatusLevel::Regular => "Regular",
            StatusLevel::NeedsImprovement => "Needs improvement",
            StatusLevel::Critical => "Critical",
        }
    }

    /// The color used by the renderers to show the severity.
    pub fn color(&self) -> &'static str {
        match self {
            StatusLevel::Excellent => "#1b7f3b",
            StatusLevel::Good => "#4caf50",
            StatusLevel::Regular => "#f9a825",
            StatusLevel::NeedsImprovement => "#ef6c00",
            StatusLevel::Critical => "#c62828",
        }
    }

    /// Regular and below call for capacity building.
    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            StatusLevel::Regular | StatusLevel::NeedsImprovement | StatusLevel::Critical
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_lower_inclusive() {
        assert_eq!(StatusLevel::from_average(4.5), StatusLevel::Excellent);
        assert_eq!(StatusLevel::from_average(4.0), StatusLevel::Good);
        assert_eq!(StatusLevel::from_average(3.0), StatusLevel::Regular);
        assert_eq!(StatusLevel::from_average(2.0), StatusLevel::NeedsImprovement);
        assert_eq!(StatusLevel::from_average(1.99), StatusLevel::Critical);
    }

    #[test]
    fn just_below_a_boundary() {
        assert_eq!(StatusLevel::from_average(4.499999), StatusLevel::Good);
        assert_eq!(StatusLevel::from_average(3.999), StatusLevel::Regular);
        assert_eq!(StatusLevel::from_average(0.0), StatusLevel::Critical);
        assert_eq!(StatusLevel::from_average(5.0), StatusLevel::Excellent);
    }

    #[test]
    fn labels() {
        assert_eq!(StatusLevel::from_average(4.5).label(), "Excellent");
        assert_eq!(StatusLevel::from_average(4.0).label(), "Good");
        assert_eq!(StatusLevel::from_average(3.0).label(), "Regular");
        assert_eq!(StatusLevel::from_average(2.0).label(), "Needs improvement");
        assert_eq!(StatusLevel::from_average(1.0).label(), "Critical");
    }

    #[test]
    fn attention() {
        assert!(!StatusLevel::Good.needs_attention());
        assert!(StatusLevel::Regular.needs_attention());
        assert!(StatusLevel::Critical.needs_attention());
    }
}
