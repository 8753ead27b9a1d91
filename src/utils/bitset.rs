//! Growable bitset used for membership masks and available-module sets

/// A growable set of small integers backed by 64-bit words.
///
/// Indices are arena positions (module index, chunk group index), so the set
/// stays dense and set operations are word-wise.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

// Equality ignores trailing empty words
impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.trimmed() == other.trimmed()
    }
}

impl Eq for BitSet {}

impl std::hash::Hash for BitSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.trimmed().hash(state);
    }
}

const WORD_BITS: usize = 64;

impl BitSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with room for `bits` indices
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(WORD_BITS)],
        }
    }

    /// Insert an index, returning `true` if it was not present
    pub fn insert(&mut self, index: usize) -> bool {
        let (word, bit) = (index / WORD_BITS, index % WORD_BITS);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        !was_set
    }

    /// Remove an index, returning `true` if it was present
    pub fn remove(&mut self, index: usize) -> bool {
        let (word, bit) = (index / WORD_BITS, index % WORD_BITS);
        match self.words.get_mut(word) {
            Some(w) => {
                let mask = 1u64 << bit;
                let was_set = *w & mask != 0;
                *w &= !mask;
                was_set
            }
            None => false,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        let (word, bit) = (index / WORD_BITS, index % WORD_BITS);
        self.words
            .get(word)
            .is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// In-place union
    pub fn union_with(&mut self, other: &BitSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    /// In-place intersection
    pub fn intersect_with(&mut self, other: &BitSet) {
        for (i, a) in self.words.iter_mut().enumerate() {
            *a &= other.words.get(i).copied().unwrap_or(0);
        }
    }

    fn trimmed(&self) -> &[u64] {
        let len = self.words.iter().rposition(|w| *w != 0).map_or(0, |i| i + 1);
        &self.words[..len]
    }

    /// Number of set bits
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Iterate set indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut set = BitSet::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

impl Extend<usize> for BitSet {
    fn extend<T: IntoIterator<Item = usize>>(&mut self, iter: T) {
        for index in iter {
            self.insert(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_and_contains_across_words() {
        let mut set = BitSet::with_capacity(10);
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert!(set.insert(130));
        assert!(set.contains(3));
        assert!(set.contains(130));
        assert!(!set.contains(64));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 130]);
    }

    #[test]
    fn test_union_and_intersection() {
        let mut a: BitSet = [1, 2, 70].into_iter().collect();
        let b: BitSet = [2, 70, 200].into_iter().collect();

        let mut union = a.clone();
        union.union_with(&b);
        assert_eq!(union.iter().collect::<Vec<_>>(), vec![1, 2, 70, 200]);

        a.intersect_with(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![2, 70]);
    }

    #[test]
    fn test_remove() {
        let mut set: BitSet = [5, 9].into_iter().collect();
        assert!(set.remove(5));
        assert!(!set.remove(5));
        assert!(!set.remove(1000));
        assert!(!set.is_empty());
        set.remove(9);
        assert!(set.is_empty());
    }

    #[test]
    fn test_equality_ignores_capacity() {
        let mut wide = BitSet::with_capacity(500);
        wide.insert(4);
        let narrow: BitSet = [4].into_iter().collect();
        assert_eq!(wide, narrow);
        assert_ne!(wide, BitSet::new());
    }
}
