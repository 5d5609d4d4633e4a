// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for skeleton and roof operations.

use crate::keys::{EdgeKey, LavKey, VertexKey};

/// Result type alias for skeleton operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while computing a straight skeleton or a roof.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The footprint cannot be processed (too few points, closed ring,
    /// non-horizontal, zero area).
    #[error("invalid polygon: {0}")]
    InvalidPolygon(String),

    /// Roof pitch outside `[0, 90)` degrees or not finite.
    #[error("invalid roof pitch: {0} degrees")]
    InvalidPitch(f64),

    /// A lookup or structural check that must hold during the simulation
    /// failed. Indicates an algorithm bug or an unhandled degeneracy.
    #[error("internal invariant violated: {context}{}", describe_site(.event, .point, .height))]
    InternalInvariantViolation {
        context: String,
        event: Option<&'static str>,
        point: Option<(f64, f64)>,
        height: Option<f64>,
    },

    /// The main loop did not drain the event queue within the watchdog limit.
    #[error("iteration limit of {limit} exceeded at height {height}")]
    IterationLimitExceeded { limit: usize, height: f64 },

    /// Vertex key not found in the arena.
    #[error("vertex not found: {0:?}")]
    VertexNotFound(VertexKey),

    /// Edge key not found in the arena.
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeKey),

    /// LAV key not found in the arena.
    #[error("active vertex loop not found: {0:?}")]
    LavNotFound(LavKey),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Builds an invariant violation with no event context.
    pub(crate) fn invariant(context: impl Into<String>) -> Self {
        Error::InternalInvariantViolation {
            context: context.into(),
            event: None,
            point: None,
            height: None,
        }
    }

    /// Attaches event context to an invariant violation. Other variants are
    /// returned unchanged.
    pub(crate) fn at_event(self, event: &'static str, point: (f64, f64), height: f64) -> Self {
        match self {
            Error::InternalInvariantViolation { context, .. } => Error::InternalInvariantViolation {
                context,
                event: Some(event),
                point: Some(point),
                height: Some(height),
            },
            other => other,
        }
    }

    /// Returns `true` when the error points at a defect in the simulation
    /// rather than at the caller's input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::InternalInvariantViolation { .. }
                | Error::IterationLimitExceeded { .. }
                | Error::VertexNotFound(_)
                | Error::EdgeNotFound(_)
                | Error::LavNotFound(_)
        )
    }
}

fn describe_site(
    event: &Option<&'static str>,
    point: &Option<(f64, f64)>,
    height: &Option<f64>,
) -> String {
    let mut out = String::new();
    if let Some(event) = event {
        out.push_str(&format!(" (event {event}"));
        if let Some((x, y)) = point {
            out.push_str(&format!(" at ({x}, {y})"));
        }
        if let Some(h) = height {
            out.push_str(&format!(", height {h}"));
        }
        out.push(')');
    }
    out
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_is_not_internal() {
        assert!(!Error::InvalidPolygon("too few points".into()).is_internal());
        assert!(!Error::InvalidPitch(95.0).is_internal());
    }

    #[test]
    fn invariant_carries_event_site() {
        let err = Error::invariant("vertex not in lav").at_event("multi-split", (1.0, 2.0), 0.5);
        assert!(err.is_internal());

        let msg = err.to_string();
        assert!(msg.contains("vertex not in lav"));
        assert!(msg.contains("multi-split"));
        assert!(msg.contains("(1, 2)"));
        assert!(msg.contains("height 0.5"));
    }

    #[test]
    fn at_event_leaves_other_variants_alone() {
        let err = Error::IterationLimitExceeded { limit: 3, height: 1.0 }.at_event("pick", (0.0, 0.0), 1.0);
        assert!(matches!(err, Error::IterationLimitExceeded { limit: 3, .. }));
    }
}
