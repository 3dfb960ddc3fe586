//! Skill map content: the sections, units and nodes a graph is built from.
//!
//! Maps are plain data. They can be loaded from a TOML or JSON file, or taken
//! from the bundled default map.

use crate::types::*;
use crate::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cached default map - built once and reused across all operations
static DEFAULT_MAP: Lazy<MapDefinition> = Lazy::new(build_default_map);

/// Node as it appears in map content (state is derived later)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub exercise: Option<Exercise>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitDef {
    pub title: String,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SectionDef {
    pub title: String,
    #[serde(default)]
    pub units: Vec<UnitDef>,
}

/// The complete map content
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct MapDefinition {
    #[serde(default)]
    pub sections: Vec<SectionDef>,
}

/// Get a reference to the cached default map
pub fn get_default_map() -> &'static MapDefinition {
    &DEFAULT_MAP
}

fn exercise(id: &str, title: &str, categories: &[&str]) -> Option<Exercise> {
    Some(Exercise {
        id: id.into(),
        title: title.into(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
    })
}

fn node(id: &str, kind: NodeKind, exercise: Option<Exercise>) -> NodeDef {
    NodeDef {
        id: id.into(),
        kind,
        exercise,
    }
}

/// Builds the bundled map shipped with the app
///
/// **Note**: prefer `get_default_map()`, which returns a cached reference.
pub fn build_default_map() -> MapDefinition {
    use NodeKind::*;

    MapDefinition {
        sections: vec![
            SectionDef {
                title: "Foundations".into(),
                units: vec![
                    UnitDef {
                        title: "Wake up the body".into(),
                        nodes: vec![
                            node(
                                "squat_basics",
                                Lesson,
                                exercise("air_squat", "Air Squats", &["legs", "bodyweight"]),
                            ),
                            node(
                                "pushup_basics",
                                Lesson,
                                exercise("incline_pushup", "Incline Push-ups", &["push", "upper_body"]),
                            ),
                            node(
                                "plank_practice",
                                Practice,
                                exercise("plank_hold", "Plank Hold", &["core", "isometric"]),
                            ),
                            node("foundations_chest", Chest, None),
                            node(
                                "foundations_boss",
                                Boss,
                                exercise("burpee_ladder", "Burpee Ladder", &["full_body", "vo2"]),
                            ),
                        ],
                    },
                    UnitDef {
                        title: "Mobility".into(),
                        nodes: vec![
                            node(
                                "hip_cars",
                                Lesson,
                                exercise("hip_cars", "Hip CARs", &["mobility", "hip"]),
                            ),
                            node(
                                "shoulder_cars",
                                Lesson,
                                exercise("shoulder_cars", "Shoulder CARs", &["mobility", "shoulder"]),
                            ),
                            node(
                                "mobility_flow",
                                Practice,
                                exercise("mobility_flow", "Full-body Flow", &["mobility"]),
                            ),
                        ],
                    },
                ],
            },
            SectionDef {
                title: "Conditioning".into(),
                units: vec![UnitDef {
                    title: "Intervals".into(),
                    nodes: vec![
                        node(
                            "jumping_jacks",
                            Lesson,
                            exercise("jumping_jacks", "Jumping Jacks", &["vo2", "bodyweight"]),
                        ),
                        node(
                            "mountain_climbers",
                            Lesson,
                            exercise("mountain_climbers", "Mountain Climbers", &["vo2", "core"]),
                        ),
                        node("conditioning_chest", Chest, None),
                        node(
                            "conditioning_boss",
                            Boss,
                            exercise("emom_burpees", "5-Min EMOM: Burpees", &["vo2", "full_body"]),
                        ),
                    ],
                }],
            },
        ],
    }
}

impl MapDefinition {
    /// Load a map from a file
    ///
    /// Files ending in `.json` are parsed as JSON, anything else as TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let map: MapDefinition = if is_json {
            serde_json::from_str(&contents)?
        } else {
            toml::from_str(&contents)?
        };

        tracing::info!(
            "Loaded map from {:?} ({} sections)",
            path,
            map.sections.len()
        );
        Ok(map)
    }

    /// Total number of nodes across all sections
    pub fn node_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.units)
            .map(|u| u.nodes.len())
            .sum()
    }

    /// Check the content for problems that don't prevent building a graph
    ///
    /// Returns a list of warnings, or empty Vec if the content looks sane.
    /// Empty units and duplicate ids are rejected by `ProgressionGraph::build`.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (s_idx, section) in self.sections.iter().enumerate() {
            if section.title.trim().is_empty() {
                warnings.push(format!("Section {} has empty title", s_idx + 1));
            }

            for (u_idx, unit) in section.units.iter().enumerate() {
                if unit.title.trim().is_empty() {
                    warnings.push(format!(
                        "Section {}, unit {} has empty title",
                        s_idx + 1,
                        u_idx + 1
                    ));
                }

                for node in &unit.nodes {
                    if node.id.trim().is_empty() {
                        warnings.push(format!(
                            "Section {}, unit {} has a node with empty ID",
                            s_idx + 1,
                            u_idx + 1
                        ));
                    }
                    if let Some(ref ex) = node.exercise {
                        if ex.id.is_empty() || ex.title.is_empty() {
                            warnings.push(format!(
                                "Node '{}' has an exercise with empty id or title",
                                node.id
                            ));
                        }
                    }
                }
            }
        }

        warnings
    }
}
