// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON serialization for skeleton results.
//!
//! Points are flattened into plain coordinate fields, so the format does not
//! depend on nalgebra's serde support.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::output::*;

/// Serializable representation of a [`Skeleton`].
#[derive(Debug, Serialize, Deserialize)]
pub struct SkeletonSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub arcs: Vec<[usize; 2]>,
    pub levels: Vec<LevelSnapshot>,
    pub stats: SkeletonStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reflex: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub kind: LevelEventKind,
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub chains: usize,
}

impl Skeleton {
    /// Serializes the skeleton to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot())?)
    }

    /// Restores a skeleton from [`Skeleton::to_json`] output.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: SkeletonSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Creates a serializable snapshot of the skeleton.
    pub fn to_snapshot(&self) -> SkeletonSnapshot {
        SkeletonSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeSnapshot {
                    x: n.point.x,
                    y: n.point.y,
                    height: n.height,
                    reflex: n.reflex,
                })
                .collect(),
            arcs: self.arcs.iter().map(|a| [a.from, a.to]).collect(),
            levels: self
                .levels
                .iter()
                .map(|l| LevelSnapshot {
                    kind: l.kind,
                    x: l.point.x,
                    y: l.point.y,
                    height: l.height,
                    chains: l.chains,
                })
                .collect(),
            stats: self.stats.clone(),
        }
    }

    fn from_snapshot(snapshot: SkeletonSnapshot) -> Self {
        Self {
            nodes: snapshot
                .nodes
                .into_iter()
                .map(|n| SkeletonNode {
                    point: Point2::new(n.x, n.y),
                    height: n.height,
                    reflex: n.reflex,
                })
                .collect(),
            arcs: snapshot
                .arcs
                .into_iter()
                .map(|[from, to]| SkeletonArc { from, to })
                .collect(),
            levels: snapshot
                .levels
                .into_iter()
                .map(|l| LevelRecord {
                    kind: l.kind,
                    point: Point2::new(l.x, l.y),
                    height: l.height,
                    chains: l.chains,
                })
                .collect(),
            stats: snapshot.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sample() -> Skeleton {
        let mut skeleton = Skeleton::default();
        let a = skeleton.add_node(Point2::new(0.0, 0.0), 0.0, false);
        let b = skeleton.add_node(Point2::new(3.0, 0.0), 0.0, true);
        let c = skeleton.add_node(Point2::new(1.5, 1.0), 1.0, false);
        skeleton.add_arc(a, c);
        skeleton.add_arc(b, c);
        skeleton.levels.push(LevelRecord {
            kind: LevelEventKind::MultiEdge,
            point: Point2::new(1.5, 1.0),
            height: 1.0,
            chains: 1,
        });
        skeleton.stats.iterations = 1;
        skeleton
    }

    #[test]
    fn json_layout() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(value["nodes"][1]["reflex"], true);
        assert!(value["nodes"][0].get("reflex").is_none());
        assert_eq!(value["arcs"][1], serde_json::json!([1, 2]));
        assert_eq!(value["levels"][0]["kind"], "multi_edge");
        assert_eq!(value["stats"]["iterations"], 1);
    }

    #[test]
    fn restores_from_json() {
        let skeleton = sample();
        let restored = Skeleton::from_json(&skeleton.to_json().unwrap()).unwrap();
        assert_eq!(restored, skeleton);
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = Skeleton::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(!err.is_internal());
    }
}
