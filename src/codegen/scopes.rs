use tracing::trace;

use crate::codegen::Error;

/// Records how many words the declarations of each open scope take.
///
/// There is a single stack frame, so an entity's offset from the stack base
/// is the total size of everything declared before it, in every open scope.
pub struct ScopeSizes {
    sizes: Vec<i16>,
}

impl ScopeSizes {
    pub fn new() -> ScopeSizes {
        ScopeSizes { sizes: Vec::new() }
    }

    pub fn open(&mut self) {
        self.sizes.push(0);
    }

    /// Closes the innermost scope, returning its size.
    ///
    /// # Panics
    ///
    /// If no scope is open.
    pub fn close(&mut self) -> i16 {
        self.sizes.pop().expect("no scope to close")
    }

    /// Number of words taken by the innermost scope.
    pub fn local_size(&self) -> i16 {
        self.sizes.last().copied().unwrap_or(0)
    }

    /// Number of words taken by every open scope.
    pub fn total_size(&self) -> i16 {
        // Each addition is checked against the total, so this can't overflow.
        self.sizes.iter().sum()
    }

    pub fn depth(&self) -> usize {
        self.sizes.len()
    }

    /// Reserves `size` words in the innermost scope, returning their offset.
    ///
    /// If the stack would grow past the addressable range, the scope is
    /// saturated and an error returned.
    ///
    /// # Panics
    ///
    /// If no scope is open.
    pub fn allocate(&mut self, size: u8) -> Result<i16, Error> {
        let offset = self.total_size();
        let local = self.sizes.last_mut().expect("no scope to allocate in");
        match offset.checked_add(i16::from(size)) {
            Some(_) => {
                *local += i16::from(size);
                trace!(offset, size, "allocated");
                Ok(offset)
            }
            None => {
                *local += i16::MAX - offset;
                Err(Error::ScopeTooLarge)
            }
        }
    }
}

impl Default for ScopeSizes {
    fn default() -> Self {
        ScopeSizes::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_span_every_open_scope() {
        let mut s = ScopeSizes::new();
        s.open();
        assert_eq!(s.allocate(1), Ok(0));
        assert_eq!(s.allocate(1), Ok(1));
        s.open();
        assert_eq!(s.allocate(1), Ok(2));
        assert_eq!((s.local_size(), s.total_size()), (1, 3));
        assert_eq!(s.close(), 1);
        assert_eq!(s.allocate(1), Ok(2));
        assert_eq!(s.close(), 3);
        assert_eq!(s.depth(), 0);
    }

    #[test]
    fn overflow_saturates() {
        let mut s = ScopeSizes::new();
        s.open();
        for _ in 0..i16::MAX {
            s.allocate(1).unwrap();
        }
        assert_eq!(s.allocate(1), Err(Error::ScopeTooLarge));
        assert_eq!(s.local_size(), i16::MAX);
        s.open();
        assert_eq!(s.allocate(1), Err(Error::ScopeTooLarge));
        assert_eq!(s.total_size(), i16::MAX);
    }
}
