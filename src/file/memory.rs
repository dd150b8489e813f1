use super::Backend;
use crate::Result;

/// Input file backed by Memory
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a new memory backend
    ///
    /// ## Arguments
    /// * 'data' - The data buffer to consume
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        if offset_end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_memory() {
        let mut data = vec![0xCC_u8; 64];
        data[10..14].copy_from_slice(b"XEX2");

        let memory = Memory::new(data);

        assert_eq!(memory.len(), 64);
        assert_eq!(memory.data()[0], 0xCC);
        assert_eq!(memory.data_slice(10, 4).unwrap(), b"XEX2");
        assert!(memory.data_slice(60, 8).is_err());
    }

    #[test]
    fn test_memory_offset_overflow() {
        let memory = Memory::new(vec![0x00; 100]);

        let result = memory.data_slice(usize::MAX, 1);
        assert!(matches!(result, Err(Error::OutOfBounds { .. })));

        let result = memory.data_slice(99, 2);
        assert!(matches!(result, Err(Error::OutOfBounds { .. })));

        let empty: &[u8] = &[];
        assert_eq!(memory.data_slice(100, 0).unwrap(), empty);
    }
}
