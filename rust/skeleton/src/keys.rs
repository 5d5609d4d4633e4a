// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based skeleton storage.
//!
//! Edges, wavefront vertices and active vertex loops (LAVs) are addressed by
//! generational `slotmap` keys. A retired vertex keeps its key, so queued
//! events that still reference it can detect that they went stale.

use slotmap::new_key_type;

new_key_type! {
    /// Key for an original footprint edge.
    pub struct EdgeKey;

    /// Key for a wavefront vertex (initial corner or event-born vertex).
    pub struct VertexKey;

    /// Key for an active vertex loop.
    pub struct LavKey;
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::{Key, SlotMap};

    #[test]
    fn keys_stay_distinct_after_removal() {
        let mut map: SlotMap<VertexKey, u32> = SlotMap::with_key();
        let a = map.insert(1);
        map.remove(a);
        let b = map.insert(2);

        assert_ne!(a, b);
        assert!(!map.contains_key(a));
        assert!(map.contains_key(b));
    }

    #[test]
    fn default_key_is_null() {
        assert!(LavKey::default().is_null());
        assert!(EdgeKey::null().is_null());
    }
}
