use crate::{
    file::io::{pad_to, push_le, read_le},
    Error::OutOfBounds,
    Result,
};

/// Names of the streams a metadata root may carry
pub const STREAM_NAMES: [&str; 6] = ["#Strings", "#US", "#Blob", "#GUID", "#~", "#-"];

/// One entry of the stream directory that follows the metadata root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Parse a stream header from the start of `data`
    ///
    /// # Errors
    /// Returns an error if the data is truncated or the stream name is unknown.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(OutOfBounds);
        }

        let mut name = String::with_capacity(32);
        for counter in 0..std::cmp::min(32, data.len() - 8) {
            let name_char = read_le::<u8>(&data[8 + counter..])?;
            if name_char == 0 {
                break;
            }

            name.push(char::from(name_char));
        }

        if !STREAM_NAMES.iter().any(|valid_name| name == *valid_name) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }

    /// Size of this header once encoded
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }

    /// Append the encoded header to `buffer`
    pub fn encode(&self, buffer: &mut Vec<u8>) {
        push_le(buffer, self.offset);
        push_le(buffer, self.size);
        buffer.extend_from_slice(self.name.as_bytes());
        buffer.push(0);
        pad_to(buffer, 4);
    }
}
