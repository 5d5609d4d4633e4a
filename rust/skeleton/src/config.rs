// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simulation tolerances, loaded from defaults, serde or the environment.

use serde::{Deserialize, Serialize};

/// Numerical tolerances and the watchdog limit for one skeleton run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonConfig {
    /// Tolerance for side tests, height levels and coincident event points.
    pub epsilon: f64,
    /// Maximum number of main-loop iterations before the run is aborted.
    pub max_iterations: usize,
    /// Dot product of two edge directions below which a new vertex's
    /// bisector is re-derived from its neighbours.
    pub antiparallel_threshold: f64,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-10,
            max_iterations: 10_000,
            antiparallel_threshold: -0.97,
        }
    }
}

impl SkeletonConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            epsilon: env_or("ROOF_SKELETON_EPSILON", defaults.epsilon),
            max_iterations: env_or("ROOF_SKELETON_MAX_ITERATIONS", defaults.max_iterations),
            antiparallel_threshold: env_or(
                "ROOF_SKELETON_ANTIPARALLEL_THRESHOLD",
                defaults.antiparallel_threshold,
            ),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(fallback)
}
