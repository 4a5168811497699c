//! The `#GUID` heap, ECMA-335 II.24.2.5.

use crate::{Error::OutOfBounds, Result};

/// View over the `#GUID` heap, a sequence of 16-byte GUIDs addressed by 1-based index
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Create a view over the heap
    ///
    /// # Errors
    /// Returns an error if the heap is not a multiple of 16 bytes.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() % 16 != 0 {
            return Err(malformed_error!(
                "#GUID heap size {} is not a multiple of 16",
                data.len()
            ));
        }

        Ok(Guid { data })
    }

    /// Get the GUID at the 1-based `index`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for index 0 or an index past the heap.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index < 1 || index * 16 > self.data.len() {
            return Err(OutOfBounds);
        }

        let start = (index - 1) * 16;
        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[start..start + 16]);

        Ok(uguid::Guid::from_bytes(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data : [u8; 32] = [
            0x8e, 0x90, 0x37, 0xd4, 0xe6, 0x65, 0x7c, 0x48, 0x97, 0x35, 0x7b, 0xdf, 0xf6, 0x99, 0xbe, 0xa5,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];

        let guids = Guid::from(&data).unwrap();

        assert_eq!(
            guids.get(1).unwrap(),
            uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5")
        );
        assert_eq!(
            guids.get(2).unwrap(),
            uguid::guid!("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa")
        );
        assert!(guids.get(0).is_err());
        assert!(guids.get(3).is_err());
    }

    #[test]
    fn bad_size() {
        assert!(Guid::from(&[0u8; 15]).is_err());
    }
}
