//! Transaction sequence allocation

use zigcoord_core::Tsn;

/// Hands out 8-bit transaction ids, wrapping modulo 256
///
/// The allocator has no notion of which ids are still in flight; callers
/// that need collision freedom use [`SequenceAllocator::next_free`].
#[derive(Clone, Debug, Default)]
pub struct SequenceAllocator {
    last: u8,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        SequenceAllocator { last: 0 }
    }

    /// Start so that the first id handed out is `first`
    pub fn starting_at(first: Tsn) -> Self {
        SequenceAllocator {
            last: first.0.wrapping_sub(1),
        }
    }

    /// Next id, unconditionally
    pub fn next(&mut self) -> Tsn {
        self.last = self.last.wrapping_add(1);
        Tsn(self.last)
    }

    /// Next id for which `in_use` is false, or `None` if all 256 are taken
    pub fn next_free(&mut self, in_use: impl Fn(Tsn) -> bool) -> Option<Tsn> {
        for _ in 0..=u8::MAX as usize {
            let tsn = self.next();
            if !in_use(tsn) {
                return Some(tsn);
            }
        }
        None
    }

    /// Most recently issued id
    pub fn last(&self) -> Tsn {
        Tsn(self.last)
    }
}
