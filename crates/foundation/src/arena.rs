/// Reusable scratch accumulators for one worker task.
///
/// Tile builds grow many `Vec<f64>` columns that are discarded once packed.
/// Returning them here lets the next build reuse the allocations. `take`
/// hands out the smallest free vector whose capacity covers the request, so
/// large columns are not wasted on small attributes.
#[derive(Debug, Default)]
pub struct ScratchPool {
    free: Vec<Vec<f64>>,
    max_retained: usize,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::with_max_retained(64)
    }

    pub fn with_max_retained(max_retained: usize) -> Self {
        ScratchPool {
            free: Vec::new(),
            max_retained,
        }
    }

    /// An empty vector with at least `capacity` reserved.
    pub fn take(&mut self, capacity: usize) -> Vec<f64> {
        let best = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, v)| v.capacity() >= capacity)
            .min_by_key(|(_, v)| v.capacity())
            .map(|(i, _)| i);
        match best {
            Some(i) => self.free.swap_remove(i),
            None => {
                let mut v = self.free.pop().unwrap_or_default();
                v.reserve(capacity);
                v
            }
        }
    }

    /// Return a vector to the pool; its contents are discarded.
    pub fn give(&mut self, mut v: Vec<f64>) {
        if self.free.len() >= self.max_retained || v.capacity() == 0 {
            return;
        }
        v.clear();
        self.free.push(v);
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::ScratchPool;

    #[test]
    fn reuses_smallest_fitting_allocation() {
        let mut pool = ScratchPool::new();
        pool.give(Vec::with_capacity(1024));
        pool.give(Vec::with_capacity(16));
        assert_eq!(pool.len(), 2);

        let v = pool.take(10);
        assert!(v.capacity() >= 10 && v.capacity() < 1024);
        assert!(v.is_empty());
        assert_eq!(pool.len(), 1);

        let big = pool.take(512);
        assert!(big.capacity() >= 1024);
        assert!(pool.is_empty());
    }

    #[test]
    fn given_vectors_come_back_cleared() {
        let mut pool = ScratchPool::new();
        pool.give(vec![1.0, 2.0, 3.0]);
        let v = pool.take(2);
        assert!(v.is_empty());
        assert!(v.capacity() >= 3);
    }

    #[test]
    fn retention_is_bounded() {
        let mut pool = ScratchPool::with_max_retained(1);
        pool.give(Vec::with_capacity(4));
        pool.give(Vec::with_capacity(4));
        assert_eq!(pool.len(), 1);
    }
}
