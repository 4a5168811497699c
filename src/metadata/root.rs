//! The metadata root (`BSJB` header), ECMA-335 II.24.2.1.
//!
//! The root is followed by the stream directory. When the serializer rebuilds the metadata it
//! keeps the version string, flags and stream order of the original root and only rewrites
//! the stream offsets and sizes.

use crate::{
    file::io::{push_le, read_le, read_le_at},
    metadata::streams::StreamHeader,
    Error::OutOfBounds,
    Result,
};

/// The magic signature of the metadata root, `BSJB`
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The metadata root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Magic signature, [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version, usually 1
    pub major_version: u16,
    /// Minor version, usually 1
    pub minor_version: u16,
    /// Reserved, always 0
    pub reserved: u32,
    /// Length of the padded version string
    pub length: u32,
    /// Version string, without its padding
    pub version: String,
    /// The padded version string as stored
    pub version_raw: Vec<u8>,
    /// Reserved flags
    pub flags: u16,
    /// Number of streams
    pub stream_number: u16,
    /// The stream directory
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the metadata root from the start of the metadata
    ///
    /// # Errors
    /// Returns an error if the root is truncated, has a bad signature or describes streams
    /// outside of the metadata.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 36 {
            return Err(OutOfBounds);
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let length = read_le_at::<u32>(data, &mut 12)?;
        let Some(version_end) = (length as usize).checked_add(16) else {
            return Err(malformed_error!("Version string length overflows - {}", length));
        };
        if version_end + 4 > data.len() {
            return Err(OutOfBounds);
        }

        let version_raw = data[16..version_end].to_vec();
        let version = version_raw
            .iter()
            .take_while(|byte| **byte != 0)
            .map(|byte| char::from(*byte))
            .collect::<String>();

        let mut cursor = version_end;
        let flags = read_le_at::<u16>(data, &mut cursor)?;
        let stream_number = read_le_at::<u16>(data, &mut cursor)?;
        if stream_number == 0 || stream_number > 6 {
            return Err(malformed_error!("Invalid stream count - {}", stream_number));
        }

        let mut stream_headers = Vec::with_capacity(stream_number as usize);
        let mut stream_offset = cursor;
        for _ in 0..stream_number {
            if stream_offset > data.len() {
                return Err(OutOfBounds);
            }

            let new_stream = StreamHeader::from(&data[stream_offset..])?;
            match new_stream.offset.checked_add(new_stream.size) {
                Some(range) if range as usize <= data.len() => {}
                Some(_) => return Err(OutOfBounds),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        new_stream.offset,
                        new_stream.size
                    ))
                }
            }

            stream_offset += new_stream.encoded_len();
            stream_headers.push(new_stream);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            reserved: read_le::<u32>(&data[8..])?,
            length,
            version,
            version_raw,
            flags,
            stream_number,
            stream_headers,
        })
    }

    /// Find a stream header by name
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }

    /// Size of the root plus the stream directory for the given headers
    #[must_use]
    pub fn encoded_len(&self, headers: &[StreamHeader]) -> usize {
        20 + self.version_raw.len() + headers.iter().map(StreamHeader::encoded_len).sum::<usize>()
    }

    /// Encode the root with a replacement stream directory
    ///
    /// # Errors
    /// Returns an error if there are more stream headers than fit the count field.
    pub fn encode(&self, headers: &[StreamHeader]) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.encoded_len(headers));

        push_le(&mut buffer, self.signature);
        push_le(&mut buffer, self.major_version);
        push_le(&mut buffer, self.minor_version);
        push_le(&mut buffer, self.reserved);
        push_le(&mut buffer, self.length);
        buffer.extend_from_slice(&self.version_raw);
        push_le(&mut buffer, self.flags);
        push_le(
            &mut buffer,
            u16::try_from(headers.len()).map_err(|_| malformed_error!("Too many streams"))?,
        );

        for header in headers {
            header.encode(&mut buffer);
        }

        Ok(buffer)
    }
}
