use vigil_ir::state::GlobalState;

/// Cartesian product of per-variable candidate index sets.
///
/// Yields states in odometer order: the last variable varies fastest. An
/// empty candidate set makes the whole product empty.
pub struct CandidateProduct<'a> {
    sets: &'a [Vec<u32>],
    cursor: Vec<usize>,
    done: bool,
}

impl<'a> CandidateProduct<'a> {
    pub fn new(sets: &'a [Vec<u32>]) -> Self {
        Self {
            sets,
            cursor: vec![0; sets.len()],
            done: sets.iter().any(Vec::is_empty),
        }
    }

    /// Number of states the product yields, saturating.
    pub fn size(sets: &[Vec<u32>]) -> usize {
        sets.iter()
            .fold(1usize, |acc, set| acc.saturating_mul(set.len()))
    }
}

impl Iterator for CandidateProduct<'_> {
    type Item = GlobalState;

    fn next(&mut self) -> Option<GlobalState> {
        if self.done {
            return None;
        }
        let indices: Vec<u32> = self
            .cursor
            .iter()
            .zip(self.sets)
            .map(|(&pos, set)| set[pos])
            .collect();

        let mut slot = self.sets.len();
        loop {
            if slot == 0 {
                self.done = true;
                break;
            }
            slot -= 1;
            self.cursor[slot] += 1;
            if self.cursor[slot] < self.sets[slot].len() {
                break;
            }
            self.cursor[slot] = 0;
        }
        Some(GlobalState::from_indices(indices))
    }
}
