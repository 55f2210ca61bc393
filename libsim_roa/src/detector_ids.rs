use fxhash::FxHashMap;

/// DetectorIdTable translates the (sparse) detector IDs of the geometry into the dense IDs used
/// in the ROA output.
///
/// Dense IDs start at 1 and are handed out in the order detectors are first seen. Once assigned,
/// an ID never changes for the remainder of the run.
#[derive(Debug, Clone, Default)]
pub struct DetectorIdTable {
    map: FxHashMap<u32, u32>,
}

impl DetectorIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the dense ID for a raw detector ID, assigning the next free one if it is new
    pub fn remap(&mut self, raw_id: u32) -> u32 {
        let next_id = self.map.len() as u32 + 1;
        *self.map.entry(raw_id).or_insert(next_id)
    }

    /// Lookup without assignment
    pub fn get(&self, raw_id: u32) -> Option<u32> {
        self.map.get(&raw_id).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The (raw, dense) pairs sorted by dense ID
    pub fn entries(&self) -> Vec<(u32, u32)> {
        let mut entries: Vec<(u32, u32)> = self.map.iter().map(|(r, d)| (*r, *d)).collect();
        entries.sort_by_key(|(_, dense)| *dense);
        entries
    }
}
