/// An ascending table of fixed item sizes, the `nova-pool` analogue of the slab-class table
/// in the original `NovaMemManager`: every allocation request is rounded up to the smallest
/// class whose size can hold it.
#[derive(Debug, Clone)]
pub struct SizeClasses(Vec<usize>);

impl SizeClasses {
    /// `sizes` must be non-empty, strictly increasing, and every entry must be nonzero.
    pub fn new(sizes: Vec<usize>) -> Result<Self, InvalidSizeClasses> {
        if sizes.is_empty() {
            return Err(InvalidSizeClasses::Empty);
        }
        if sizes.iter().any(|&size| size == 0) {
            return Err(InvalidSizeClasses::ZeroSize);
        }
        if !sizes.is_sorted_by(|a, b| a < b) {
            return Err(InvalidSizeClasses::NotStrictlyIncreasing);
        }

        Ok(Self(sizes))
    }

    /// The power-of-two growth table the LTC uses by default, from `min_size` up to and
    /// including `max_size`.
    pub fn power_of_two(min_size: usize, max_size: usize) -> Result<Self, InvalidSizeClasses> {
        if min_size == 0 || max_size < min_size {
            return Err(InvalidSizeClasses::ZeroSize);
        }

        let mut sizes = Vec::new();
        let mut size = min_size;
        while size < max_size {
            sizes.push(size);
            size = size.saturating_mul(2);
        }
        sizes.push(max_size);

        Self::new(sizes)
    }

    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn class_size(&self, class_id: usize) -> Option<usize> {
        self.0.get(class_id).copied()
    }

    /// The id of the smallest class whose size is at least `requested_size`, if any class is
    /// large enough.
    #[must_use]
    pub fn class_for(&self, requested_size: usize) -> Option<usize> {
        let index = self.0.partition_point(|&size| size < requested_size);
        (index < self.0.len()).then_some(index)
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum InvalidSizeClasses {
    #[error("a slab class table must have at least one size class")]
    Empty,
    #[error("slab class sizes must be nonzero")]
    ZeroSize,
    #[error("slab class sizes must be strictly increasing")]
    NotStrictlyIncreasing,
}
