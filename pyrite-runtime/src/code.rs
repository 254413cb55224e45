// The process-wide code buffer.
//
// Assembled blocks are appended and never move or shrink; a fragment keeps
// the (offset, length) of its blob for the lifetime of the process. The
// buffer grows in fixed-size blocks so reserved capacity and used bytes can
// be reported separately.

const BLOCK_SIZE: usize = 64 * 1024;

pub struct CodeBuffer {
    data: Vec<u8>,
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    /// Append a blob, returning its stable offset.
    pub fn append(&mut self, blob: &[u8]) -> usize {
        let offset = self.data.len();
        if self.data.len() + blob.len() > self.data.capacity() {
            let shortfall = self.data.len() + blob.len() - self.data.capacity();
            let blocks = shortfall.div_ceil(BLOCK_SIZE);
            self.data
                .reserve_exact(self.data.capacity() - self.data.len() + blocks * BLOCK_SIZE);
        }
        self.data.extend_from_slice(blob);
        offset
    }

    pub fn get(&self, offset: usize, length: usize) -> Option<&[u8]> {
        self.data.get(offset..offset + length)
    }

    /// Total reserved capacity in bytes.
    pub fn total_size(&self) -> usize {
        self.data.capacity()
    }

    /// Bytes of assembled code currently stored.
    pub fn used_size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_offsets_are_stable() {
        let mut buffer = CodeBuffer::new();
        let a = buffer.append(&[1, 2, 3]);
        let b = buffer.append(&[4, 5]);
        assert_eq!(a, 0);
        assert_eq!(b, 3);
        assert_eq!(buffer.get(a, 3), Some(&[1u8, 2, 3][..]));
        assert_eq!(buffer.get(b, 2), Some(&[4u8, 5][..]));
        assert_eq!(buffer.used_size(), 5);
        assert!(buffer.total_size() >= 5);
    }
}
