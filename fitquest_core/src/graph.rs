//! Progression graph: node unlock states and the completion rule.
//!
//! Unlocking is a strictly linear chain inside each unit:
//! - Node 0 of the first unit of the first section starts available
//! - Node i becomes available once node i-1 of the same unit is completed
//! - Nothing crosses unit or section boundaries
//!
//! The first node of every later unit therefore stays locked in this model.

use crate::map::MapDefinition;
use crate::{Error, Node, NodeState, Result, Section, SelectResult, Unit, UnitLabel};
use std::collections::HashMap;

/// Position of a node inside the section/unit tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodePos {
    section: usize,
    unit: usize,
    index: usize,
}

/// The skill map with derived node states
#[derive(Clone, Debug)]
pub struct ProgressionGraph {
    sections: Vec<Section>,
    index: HashMap<String, NodePos>,
}

/// Linear unlock rule for node `index` of a unit
fn derive_state(nodes: &[Node], index: usize, is_first_unit: bool) -> NodeState {
    let current = nodes[index].state;
    if current != NodeState::Locked {
        // Monotonic: never re-lock
        return current;
    }

    let unlocked = if index == 0 {
        is_first_unit
    } else {
        nodes[index - 1].state == NodeState::Completed
    };

    if unlocked {
        NodeState::Available
    } else {
        NodeState::Locked
    }
}

impl ProgressionGraph {
    /// Build a graph from sections, deriving every node's initial state
    ///
    /// Incoming node states are ignored; every node starts locked and the
    /// linear unlock rule decides what becomes available.
    pub fn build(sections: Vec<Section>) -> Result<Self> {
        if sections.is_empty() {
            return Err(Error::Config("Map has no sections".into()));
        }

        let mut sections = sections;
        let mut index = HashMap::new();

        for (s_idx, section) in sections.iter_mut().enumerate() {
            if section.units.is_empty() {
                return Err(Error::Config(format!(
                    "Section '{}' has no units",
                    section.title
                )));
            }

            for (u_idx, unit) in section.units.iter_mut().enumerate() {
                if unit.nodes.is_empty() {
                    return Err(Error::Config(format!(
                        "Unit '{}' (section {}, unit {}) has no nodes",
                        unit.label.title,
                        s_idx + 1,
                        u_idx + 1
                    )));
                }

                for (n_idx, node) in unit.nodes.iter_mut().enumerate() {
                    let pos = NodePos {
                        section: s_idx,
                        unit: u_idx,
                        index: n_idx,
                    };
                    if index.insert(node.id.clone(), pos).is_some() {
                        return Err(Error::Config(format!("Duplicate node id '{}'", node.id)));
                    }
                    node.state = NodeState::Locked;
                    node.stars = 0;
                }

                let is_first_unit = s_idx == 0 && u_idx == 0;
                for n_idx in 0..unit.nodes.len() {
                    let derived = derive_state(&unit.nodes, n_idx, is_first_unit);
                    unit.nodes[n_idx].state = derived;
                }
            }
        }

        tracing::debug!(
            "Built progression graph: {} sections, {} nodes",
            sections.len(),
            index.len()
        );

        Ok(Self { sections, index })
    }

    /// Build a graph from map content
    pub fn from_definition(map: &MapDefinition) -> Result<Self> {
        let sections = map
            .sections
            .iter()
            .enumerate()
            .map(|(s_idx, section)| Section {
                title: section.title.clone(),
                units: section
                    .units
                    .iter()
                    .enumerate()
                    .map(|(u_idx, unit)| Unit {
                        label: UnitLabel {
                            section_number: s_idx + 1,
                            unit_number: u_idx + 1,
                            title: unit.title.clone(),
                        },
                        nodes: unit
                            .nodes
                            .iter()
                            .map(|n| Node::new(n.id.clone(), n.kind, n.exercise.clone()))
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self::build(sections)
    }

    fn position(&self, id: &str) -> Result<NodePos> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn unit_mut(&mut self, pos: NodePos) -> &mut Unit {
        &mut self.sections[pos.section].units[pos.unit]
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Result<&Node> {
        let pos = self.position(id)?;
        Ok(&self.sections[pos.section].units[pos.unit].nodes[pos.index])
    }

    /// Decide what tapping a node does. Pure query.
    pub fn select(&self, id: &str) -> Result<SelectResult> {
        let node = self.node(id)?;
        let result = match (&node.state, &node.exercise) {
            (NodeState::Locked, _) => SelectResult::Blocked,
            (_, None) => SelectResult::NoExercise,
            (_, Some(exercise)) => SelectResult::Ready(exercise.clone()),
        };
        tracing::debug!("Selected node {}: {:?}", id, result);
        Ok(result)
    }

    /// Mark a node completed and unlock its successor in the same unit
    ///
    /// Stars keep the best result. Completing a locked node is rejected and
    /// leaves the graph untouched.
    pub fn mark_completed(&mut self, id: &str, stars: u8) -> Result<()> {
        let pos = self.position(id)?;
        let is_first_unit = pos.section == 0 && pos.unit == 0;
        let unit = self.unit_mut(pos);

        let node = &mut unit.nodes[pos.index];
        if node.state == NodeState::Locked {
            return Err(Error::InvalidState {
                node_id: id.to_string(),
                state: node.state,
            });
        }

        node.state = NodeState::Completed;
        node.stars = node.stars.max(stars);
        tracing::info!("Completed node {} ({} stars)", id, node.stars);

        let next = pos.index + 1;
        if next < unit.nodes.len() {
            let before = unit.nodes[next].state;
            let after = derive_state(&unit.nodes, next, is_first_unit);
            if before != after {
                unit.nodes[next].state = after;
                tracing::debug!("Unlocked node {}", unit.nodes[next].id);
            }
        }

        Ok(())
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// All nodes in presentation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.sections
            .iter()
            .flat_map(|s| &s.units)
            .flat_map(|u| &u.nodes)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn total_stars(&self) -> u32 {
        self.nodes().map(|n| n.stars as u32).sum()
    }

    pub fn completed_count(&self) -> usize {
        self.nodes()
            .filter(|n| n.state == NodeState::Completed)
            .count()
    }

    /// First available node in presentation order, if any
    pub fn next_available(&self) -> Option<&Node> {
        self.nodes().find(|n| n.state == NodeState::Available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{build_default_map, NodeDef, SectionDef, UnitDef};
    use crate::{Exercise, NodeKind};

    fn exercise(id: &str) -> Option<Exercise> {
        Some(Exercise {
            id: id.into(),
            title: id.to_uppercase(),
            categories: vec!["test".into()],
        })
    }

    fn unit(title: &str, ids: &[&str]) -> UnitDef {
        UnitDef {
            title: title.into(),
            nodes: ids
                .iter()
                .map(|id| NodeDef {
                    id: id.to_string(),
                    kind: NodeKind::Lesson,
                    exercise: exercise(id),
                })
                .collect(),
        }
    }

    fn graph(sections: Vec<Vec<UnitDef>>) -> ProgressionGraph {
        let map = MapDefinition {
            sections: sections
                .into_iter()
                .enumerate()
                .map(|(i, units)| SectionDef {
                    title: format!("Section {}", i + 1),
                    units,
                })
                .collect(),
        };
        ProgressionGraph::from_definition(&map).unwrap()
    }

    fn abc() -> ProgressionGraph {
        graph(vec![vec![unit("U", &["a", "b", "c"])]])
    }

    fn state(g: &ProgressionGraph, id: &str) -> NodeState {
        g.node(id).unwrap().state
    }

    #[test]
    fn test_only_first_node_starts_available() {
        let g = graph(vec![
            vec![unit("U1", &["a", "b"]), unit("U2", &["c", "d"])],
            vec![unit("U3", &["e"])],
        ]);

        let available: Vec<_> = g
            .nodes()
            .filter(|n| n.state == NodeState::Available)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(available, vec!["a"]);
        assert_eq!(g.len(), 5);
    }

    #[test]
    fn test_default_map_builds() {
        let g = ProgressionGraph::from_definition(&build_default_map()).unwrap();
        assert_eq!(g.next_available().unwrap().id, "squat_basics");
        assert_eq!(g.sections()[1].units[0].label.section_number, 2);
    }

    #[test]
    fn test_build_ignores_incoming_state() {
        let mut node = Node::new("a", NodeKind::Lesson, exercise("a"));
        node.state = NodeState::Completed;
        node.stars = 3;
        let mut second = Node::new("b", NodeKind::Lesson, None);
        second.state = NodeState::Available;

        let g = ProgressionGraph::build(vec![Section {
            title: "S".into(),
            units: vec![Unit {
                label: UnitLabel {
                    section_number: 1,
                    unit_number: 1,
                    title: "U".into(),
                },
                nodes: vec![node, second],
            }],
        }])
        .unwrap();

        assert_eq!(state(&g, "a"), NodeState::Available);
        assert_eq!(g.node("a").unwrap().stars, 0);
        assert_eq!(state(&g, "b"), NodeState::Locked);
    }

    #[test]
    fn test_empty_unit_rejected() {
        let map = MapDefinition {
            sections: vec![SectionDef {
                title: "S".into(),
                units: vec![unit("U1", &["a"]), unit("Empty", &[])],
            }],
        };
        assert!(matches!(
            ProgressionGraph::from_definition(&map),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_duplicate_id_across_sections_rejected() {
        let map = MapDefinition {
            sections: vec![
                SectionDef {
                    title: "S1".into(),
                    units: vec![unit("U1", &["a", "b"])],
                },
                SectionDef {
                    title: "S2".into(),
                    units: vec![unit("U2", &["c", "a"])],
                },
            ],
        };
        let err = ProgressionGraph::from_definition(&map).unwrap_err();
        assert!(err.to_string().contains("Duplicate node id 'a'"));
    }

    #[test]
    fn test_empty_map_rejected() {
        assert!(matches!(
            ProgressionGraph::from_definition(&MapDefinition::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_unknown_node_not_found() {
        let mut g = abc();
        assert!(matches!(g.node("zzz"), Err(Error::NotFound(_))));
        assert!(matches!(g.select("zzz"), Err(Error::NotFound(_))));
        assert!(matches!(g.mark_completed("zzz", 1), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_select_results() {
        let map = MapDefinition {
            sections: vec![SectionDef {
                title: "S".into(),
                units: vec![UnitDef {
                    title: "U".into(),
                    nodes: vec![
                        NodeDef {
                            id: "chest".into(),
                            kind: NodeKind::Chest,
                            exercise: None,
                        },
                        NodeDef {
                            id: "b".into(),
                            kind: NodeKind::Lesson,
                            exercise: exercise("b"),
                        },
                    ],
                }],
            }],
        };
        let mut g = ProgressionGraph::from_definition(&map).unwrap();

        assert_eq!(g.select("chest").unwrap(), SelectResult::NoExercise);
        assert_eq!(g.select("b").unwrap(), SelectResult::Blocked);

        g.mark_completed("chest", 0).unwrap();
        assert_eq!(g.select("b").unwrap(), SelectResult::Ready(exercise("b").unwrap()));
    }

    #[test]
    fn test_select_completed_node_does_not_regress() {
        let mut g = abc();
        g.mark_completed("a", 2).unwrap();

        assert!(matches!(g.select("a").unwrap(), SelectResult::Ready(_)));
        assert_eq!(state(&g, "a"), NodeState::Completed);
        assert_eq!(g.node("a").unwrap().stars, 2);
    }

    #[test]
    fn test_stars_keep_best() {
        let mut g = abc();
        g.mark_completed("a", 2).unwrap();
        g.mark_completed("a", 1).unwrap();
        assert_eq!(g.node("a").unwrap().stars, 2);

        g.mark_completed("a", 3).unwrap();
        assert_eq!(g.node("a").unwrap().stars, 3);
    }

    #[test]
    fn test_complete_locked_node_fails_unchanged() {
        let mut g = abc();
        let before: Vec<Node> = g.nodes().cloned().collect();

        let err = g.mark_completed("b", 3).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                state: NodeState::Locked,
                ..
            }
        ));

        let after: Vec<Node> = g.nodes().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_completion_unlocks_only_successor() {
        let mut g = abc();
        g.mark_completed("a", 1).unwrap();

        assert_eq!(state(&g, "a"), NodeState::Completed);
        assert_eq!(g.node("a").unwrap().stars, 1);
        assert_eq!(state(&g, "b"), NodeState::Available);
        assert_eq!(state(&g, "c"), NodeState::Locked);
    }

    #[test]
    fn test_recompleting_leaves_completed_successor() {
        let mut g = abc();
        g.mark_completed("a", 1).unwrap();
        g.mark_completed("b", 1).unwrap();
        g.mark_completed("a", 3).unwrap();

        assert_eq!(state(&g, "b"), NodeState::Completed);
        assert_eq!(state(&g, "c"), NodeState::Available);
    }

    #[test]
    fn test_recompleting_leaves_available_successor() {
        let mut g = abc();
        g.mark_completed("a", 1).unwrap();
        assert_eq!(state(&g, "b"), NodeState::Available);

        g.mark_completed("a", 2).unwrap();

        assert_eq!(state(&g, "a"), NodeState::Completed);
        assert_eq!(g.node("a").unwrap().stars, 2);
        assert_eq!(state(&g, "b"), NodeState::Available);
        assert_eq!(g.node("b").unwrap().stars, 0);
        assert_eq!(state(&g, "c"), NodeState::Locked);
    }

    #[test]
    fn test_last_node_of_unit_unlocks_nothing() {
        let mut g = graph(vec![vec![unit("U1", &["a"]), unit("U2", &["b"])]]);
        g.mark_completed("a", 1).unwrap();

        assert_eq!(state(&g, "b"), NodeState::Locked);
        assert_eq!(g.next_available(), None);
    }

    #[test]
    fn test_later_units_stay_locked() {
        let mut g = graph(vec![
            vec![unit("U1", &["a", "b"])],
            vec![unit("U2", &["c", "d"])],
        ]);
        g.mark_completed("a", 1).unwrap();
        g.mark_completed("b", 1).unwrap();

        assert_eq!(state(&g, "c"), NodeState::Locked);
        assert_eq!(g.select("c").unwrap(), SelectResult::Blocked);
        assert!(g.mark_completed("c", 1).is_err());
    }

    #[test]
    fn test_totals() {
        let mut g = abc();
        g.mark_completed("a", 2).unwrap();
        g.mark_completed("b", 3).unwrap();

        assert_eq!(g.completed_count(), 2);
        assert_eq!(g.total_stars(), 5);
        assert_eq!(g.next_available().unwrap().id, "c");
    }
}
