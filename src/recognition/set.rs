use serde::{Deserialize, Serialize};

use crate::output::DetectionEvent;
use crate::recognition::identity::Identity;

/// How many objects can be recognized at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMode {
    /// One entry, replaced wholesale by each new identity.
    Single,
    /// Any number of entries in first-seen order.
    #[default]
    Multi,
}

/// A currently recognized object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedEntry {
    pub identity: Identity,
    /// Most recent detection for this identity.
    pub event: DetectionEvent,
    /// Bumped on every sighting; an expiry only applies to the generation it
    /// was scheduled for.
    pub generation: u64,
    pub sightings: u64,
}

/// Outcome of [`RecognizedSet::observe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sighting {
    Inserted {
        generation: u64,
        /// Entry displaced in single mode.
        evicted: Option<Identity>,
    },
    Refreshed {
        generation: u64,
    },
}

impl Sighting {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Inserted { generation, .. } | Self::Refreshed { generation } => *generation,
        }
    }
}

/// Ordered identity-keyed collection with generation-checked removal.
///
/// Holds no timers itself; the manager schedules one per entry and calls
/// [`expire`](Self::expire) with the generation it captured.
#[derive(Debug, Clone)]
pub struct RecognizedSet {
    mode: RecognitionMode,
    entries: Vec<RecognizedEntry>,
    next_generation: u64,
}

impl RecognizedSet {
    pub fn new(mode: RecognitionMode) -> Self {
        Self {
            mode,
            entries: Vec::new(),
            next_generation: 1,
        }
    }

    pub fn mode(&self) -> RecognitionMode {
        self.mode
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Record a sighting: refresh in place if present, otherwise append
    /// (or replace, in single mode).
    pub fn observe(&mut self, identity: Identity, event: DetectionEvent) -> Sighting {
        let generation = self.bump();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.identity == identity) {
            entry.event = event;
            entry.generation = generation;
            entry.sightings += 1;
            return Sighting::Refreshed { generation };
        }

        let evicted = match self.mode {
            RecognitionMode::Single => self.entries.pop().map(|e| e.identity),
            RecognitionMode::Multi => None,
        };
        self.entries.push(RecognizedEntry {
            identity,
            event,
            generation,
            sightings: 1,
        });
        Sighting::Inserted {
            generation,
            evicted,
        }
    }

    /// Remove `identity` if it has not been seen since `generation`.
    pub fn expire(&mut self, identity: &Identity, generation: u64) -> bool {
        match self.entries.iter().position(|e| &e.identity == identity) {
            Some(idx) if self.entries[idx].generation == generation => {
                self.entries.remove(idx);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, identity: &Identity) -> Option<&RecognizedEntry> {
        self.entries.iter().find(|e| &e.identity == identity)
    }

    pub fn entries(&self) -> &[RecognizedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::output::Symbology;

    fn code(value: &str) -> DetectionEvent {
        DetectionEvent::code(Symbology::Qr, value, Rect::new(0.1, 0.1, 0.2, 0.2))
    }

    fn observe(set: &mut RecognizedSet, value: &str) -> Sighting {
        set.observe(Identity::new(value), code(value))
    }

    fn identities(set: &RecognizedSet) -> Vec<String> {
        set.entries().iter().map(|e| e.identity.to_string()).collect()
    }

    #[test]
    fn multi_mode_keeps_first_seen_order() {
        let mut set = RecognizedSet::new(RecognitionMode::Multi);
        observe(&mut set, "B");
        observe(&mut set, "A");
        observe(&mut set, "C");
        observe(&mut set, "B");
        assert_eq!(identities(&set), vec!["B", "A", "C"]);
    }

    #[test]
    fn repeat_sighting_refreshes_in_place() {
        let mut set = RecognizedSet::new(RecognitionMode::Multi);
        let first = observe(&mut set, "A");
        let moved = DetectionEvent::code(Symbology::Qr, "A", Rect::new(0.5, 0.5, 0.2, 0.2));
        let second = set.observe(Identity::new("A"), moved.clone());

        assert!(matches!(second, Sighting::Refreshed { .. }));
        assert!(second.generation() > first.generation());
        let entry = set.get(&Identity::new("A")).unwrap();
        assert_eq!(entry.event, moved);
        assert_eq!(entry.sightings, 2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn stale_generation_does_not_remove() {
        let mut set = RecognizedSet::new(RecognitionMode::Multi);
        let first = observe(&mut set, "A");
        let second = observe(&mut set, "A");
        assert!(!set.expire(&Identity::new("A"), first.generation()));
        assert_eq!(set.len(), 1);
        assert!(set.expire(&Identity::new("A"), second.generation()));
        assert!(set.is_empty());
    }

    #[test]
    fn expiring_absent_identity_is_a_no_op() {
        let mut set = RecognizedSet::new(RecognitionMode::Multi);
        assert!(!set.expire(&Identity::new("ghost"), 1));
    }

    #[test]
    fn single_mode_replaces_wholesale() {
        let mut set = RecognizedSet::new(RecognitionMode::Single);
        observe(&mut set, "A");
        let sighting = observe(&mut set, "B");
        assert_eq!(
            sighting,
            Sighting::Inserted {
                generation: sighting.generation(),
                evicted: Some(Identity::new("A")),
            }
        );
        assert_eq!(identities(&set), vec!["B"]);
    }

    #[test]
    fn single_mode_refreshes_same_identity() {
        let mut set = RecognizedSet::new(RecognitionMode::Single);
        observe(&mut set, "A");
        assert!(matches!(observe(&mut set, "A"), Sighting::Refreshed { .. }));
        assert_eq!(set.len(), 1);
    }
}
