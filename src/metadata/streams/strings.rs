//! The `#Strings` heap, ECMA-335 II.24.2.3.

use std::{ffi::CStr, str};

use crate::{Error::OutOfBounds, Result};

/// View over the `#Strings` heap, a sequence of null-terminated UTF-8 strings
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Create a view over the heap
    ///
    /// # Errors
    /// Returns an error if the heap is empty or does not start with the empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #String heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Get the string starting at byte `index`
    ///
    /// # Errors
    /// Returns an error if the index is out of range, or the string is unterminated or not
    /// valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        CStr::from_bytes_until_nul(&self.data[index..])
            .ok()
            .and_then(|result| result.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let data = b"\0<Module>\0Terraria\0Projectile\0ai\0";

        let str_view = Strings::from(data).unwrap();

        assert_eq!(str_view.get(0).unwrap(), "");
        assert_eq!(str_view.get(1).unwrap(), "<Module>");
        assert_eq!(str_view.get(10).unwrap(), "Terraria");
        assert_eq!(str_view.get(19).unwrap(), "Projectile");
        assert_eq!(str_view.get(30).unwrap(), "ai");
        assert_eq!(str_view.get(31).unwrap(), "i");
        assert!(str_view.get(data.len()).is_err());
    }

    #[test]
    fn invalid_heap() {
        assert!(Strings::from(b"").is_err());
        assert!(Strings::from(b"A\0").is_err());

        let unterminated = Strings::from(b"\0abc").unwrap();
        assert!(unterminated.get(1).is_err());
    }
}
