use crate::attacks::AttackTables;
use crate::eval::Score;
use crate::moves::{Move, NO_MOVE};
use crate::position::Position;
use crate::types::MAX_DEPTH;

pub const DEFAULT_TT_MB: usize = 128;
pub const MIN_TT_MB: usize = 4;
pub const MAX_TT_MB: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bound {
    #[default]
    None,
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Entry {
    pub key: u64,
    pub score: Score,
    pub depth: u8,
    pub bound: Bound,
    pub mv: Move,
}

pub struct PVLine {
    pub moves: [Move; MAX_DEPTH],
    pub depth: usize,
}

// Fixed-capacity key -> search-result cache. Capacity comes from a memory
// budget divided by the entry size and is not forced to a power of two;
// slots are overwritten in place, never freed individually.
pub struct TranspositionTable {
    entries: Vec<Entry>,
    size_mb: usize,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let clamped = size_mb.clamp(MIN_TT_MB, MAX_TT_MB);
        Self {
            entries: vec![Entry::default(); Self::entry_count(clamped)],
            size_mb: clamped,
        }
    }

    fn entry_count(size_mb: usize) -> usize {
        let bytes = size_mb * 1024 * 1024;
        (bytes / std::mem::size_of::<Entry>()).max(1)
    }

    pub fn current_size_mb(&self) -> usize {
        self.size_mb
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    // Recomputes capacity for the new budget and discards all entries.
    pub fn resize(&mut self, size_mb: usize) {
        self.size_mb = size_mb.clamp(MIN_TT_MB, MAX_TT_MB);
        self.entries = vec![Entry::default(); Self::entry_count(self.size_mb)];
    }

    pub fn clear(&mut self) {
        self.entries.fill(Entry::default());
    }

    #[inline(always)]
    fn index(&self, key: u64) -> usize {
        (key % self.entries.len() as u64) as usize
    }

    // Hits only on an exact key match; a mismatching occupant is a silent
    // miss with no secondary verification.
    pub fn probe(&self, key: u64) -> Option<Entry> {
        let entry = self.entries[self.index(key)];
        if entry.key == 0 || entry.key != key {
            return None;
        }
        Some(entry)
    }

    // Depth-preferred replacement: a deeper entry under a different key
    // survives; everything else is overwritten unconditionally.
    pub fn store(&mut self, key: u64, depth: u8, score: Score, bound: Bound, mv: Move) {
        let index = self.index(key);
        let entry = &mut self.entries[index];
        if entry.key != 0 && entry.key != key && entry.depth > depth {
            return;
        }
        *entry = Entry {
            key,
            score,
            depth,
            bound,
            mv: Move(mv.raw()),
        };
    }

    // Reconstructs the principal variation by walking stored moves, undoing
    // everything before returning. Stops at the first miss, null move,
    // illegal move or the depth bound.
    pub fn pv_line(
        &self,
        position: &mut Position,
        tables: &AttackTables,
        max_depth: usize,
    ) -> PVLine {
        let mut line = PVLine {
            moves: [NO_MOVE; MAX_DEPTH],
            depth: 0,
        };
        while line.depth < max_depth.min(MAX_DEPTH) {
            let entry = match self.probe(position.key()) {
                Some(entry) => entry,
                None => break,
            };
            if entry.mv == NO_MOVE || !position.do_move(tables, entry.mv) {
                break;
            }
            line.moves[line.depth] = entry.mv;
            line.depth += 1;
        }
        for _ in 0..line.depth {
            position.undo_move();
        }
        line
    }
}
