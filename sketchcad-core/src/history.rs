/// Append-only log of the operations performed in the viewer
use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::polygon::Point2D;

/// Points shown per profile in the one-line summary.
const DISPLAY_PROFILE_POINTS: usize = 4;

/// One recorded operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Feature {
    LoadSample { name: String },
    ImportStl { name: String },
    Extrude { depth: f32, profile: Vec<Point2D> },
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::LoadSample { name } => write!(f, "load-sample({name})"),
            Feature::ImportStl { name } => write!(f, "import-stl({name})"),
            Feature::Extrude { depth, profile } => {
                write!(f, "extrude({depth}mm, [")?;
                for (i, p) in profile.iter().take(DISPLAY_PROFILE_POINTS).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "({}, {})", p.x, p.y)?;
                }
                if profile.len() > DISPLAY_PROFILE_POINTS {
                    write!(f, ", …")?;
                }
                write!(f, "])")
            }
        }
    }
}

/// Ordered feature log. Entries are never edited or removed, and nothing
/// reads them back to rebuild the scene.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FeatureHistory {
    entries: Vec<Feature>,
}

impl FeatureHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, feature: Feature) {
        self.entries.push(feature);
    }

    pub fn entries(&self) -> &[Feature] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Feature> {
        self.entries.last()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for FeatureHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Features: ")?;
        for (i, feature) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, " → ")?;
            }
            write!(f, "{feature}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point2D> {
        [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0)]
            .iter()
            .map(|&(x, y)| Point2D::new(x, y))
            .collect()
    }

    #[test]
    fn test_records_in_order() {
        let mut history = FeatureHistory::new();
        history.record(Feature::LoadSample {
            name: "cube_ascii.stl".into(),
        });
        history.record(Feature::Extrude {
            depth: 20.0,
            profile: square(),
        });

        assert_eq!(history.len(), 2);
        assert!(matches!(history.entries()[0], Feature::LoadSample { .. }));
        assert!(matches!(history.last(), Some(Feature::Extrude { .. })));
    }

    #[test]
    fn test_json_is_tagged_by_type() {
        let mut history = FeatureHistory::new();
        history.record(Feature::ImportStl {
            name: "part.stl".into(),
        });
        assert_eq!(
            history.to_json().unwrap(),
            r#"[{"type":"import-stl","name":"part.stl"}]"#
        );
    }

    #[test]
    fn test_display_truncates_but_data_does_not() {
        let feature = Feature::Extrude {
            depth: 20.0,
            profile: square(),
        };
        assert_eq!(
            feature.to_string(),
            "extrude(20mm, [(-1, -1), (1, -1), (1, 1), (-1, 1), …])"
        );

        let mut history = FeatureHistory::new();
        history.record(feature);
        let json = history.to_json().unwrap();
        assert_eq!(json.matches("\"x\"").count(), 5);
    }
}
