//! Serialization of a modified module back to a PE image.
//!
//! The original image is kept byte for byte. Everything that changed goes into one new
//! section appended at the end of the file:
//!
//! 1. every modified method body, re-encoded with a fresh header and exception sections,
//! 2. a complete copy of the metadata, where the `#Blob` heap has the new local signatures
//!    appended and the tables stream has the new `StandAloneSig` rows appended and the
//!    `MethodDef` RVAs of the modified bodies pointed at the new section.
//!
//! The CLI header is then pointed at the new metadata, and the section count, image size,
//! initialized data size and checksum of the PE headers are updated. No row is removed or
//! reordered and no heap entry moves, so every token and heap index in the image stays
//! valid. The old metadata and the old bodies stay in place, unreferenced.
//!
//! A module without modified bodies serializes to exactly the bytes it was loaded from.

use std::path::Path;

use crate::{
    file::{
        io::{align_up, pad_to, push_le, read_le, write_le_at},
        SECTION_HEADER_SIZE,
    },
    metadata::{
        cor20header::META_DATA_DIRECTORY_OFFSET,
        signatures::extend_local_var_signature,
        streams::{append_blob, StreamHeader},
        tables::{MethodDefRaw, TableId, HEAP_LARGE_BLOB},
        token::Token,
    },
    module::{Module, Output},
    Error::SerializationFailed,
    Result,
};

/// Name of the appended section
pub const PATCH_SECTION_NAME: [u8; 8] = *b".patch\0\0";

/// `IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_READ`
const PATCH_SECTION_CHARACTERISTICS: u32 = 0x0000_0040 | 0x4000_0000;

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| SerializationFailed(format!("{what} exceeds 4GB")))
}

/// Compute the PE checksum of `data`, skipping the 4-byte field at `checksum_offset`
#[must_use]
pub fn pe_checksum(data: &[u8], checksum_offset: usize) -> u32 {
    let mut checksum: u64 = 0;

    let mut offset = 0;
    while offset < data.len() {
        if offset >= checksum_offset && offset < checksum_offset + 4 {
            offset += 2;
            continue;
        }

        let word = if offset + 1 < data.len() {
            u64::from(u16::from_le_bytes([data[offset], data[offset + 1]]))
        } else {
            u64::from(data[offset])
        };

        checksum += word;
        if checksum > 0xFFFF {
            checksum = (checksum & 0xFFFF) + (checksum >> 16);
        }

        offset += 2;
    }

    checksum += data.len() as u64;
    while checksum > 0xFFFF {
        checksum = (checksum & 0xFFFF) + (checksum >> 16);
    }

    #[allow(clippy::cast_possible_truncation)]
    let checksum = checksum as u32;
    checksum
}

/// Where the new section goes
struct Placement {
    virtual_address: u32,
    pointer_to_raw_data: usize,
}

impl Module {
    fn plan_section(&self) -> Result<Placement> {
        let layout = self.file.layout();

        let header_end = layout.section_table_end() + SECTION_HEADER_SIZE;
        let first_raw = self
            .file
            .sections()
            .filter(|section| section.size_of_raw_data > 0)
            .map(|section| section.pointer_to_raw_data as usize)
            .min()
            .unwrap_or(layout.size_of_headers as usize);
        if header_end > first_raw.min(layout.size_of_headers as usize) {
            return Err(SerializationFailed(
                "no room in the PE headers for another section header".to_string(),
            ));
        }

        let image_end = self
            .file
            .sections()
            .map(|section| {
                section.virtual_address as usize
                    + section.virtual_size.max(section.size_of_raw_data) as usize
            })
            .max()
            .unwrap_or(layout.size_of_headers as usize);

        Ok(Placement {
            virtual_address: to_u32(
                align_up(image_end, layout.section_alignment as usize),
                "section RVA",
            )?,
            pointer_to_raw_data: align_up(self.file.len(), layout.file_alignment as usize),
        })
    }

    /// Rebuild the metadata with `tables` and `blob` replacing the originals
    fn build_metadata(&self, blob: &[u8]) -> Result<Vec<u8>> {
        let tables = self.tables.encode()?;

        let mut streams = Vec::with_capacity(self.root.stream_headers.len());
        for header in &self.root.stream_headers {
            let mut data = match header.name.as_str() {
                "#~" => tables.clone(),
                "#Blob" => blob.to_vec(),
                name => self.heap(name)?.to_vec(),
            };
            pad_to(&mut data, 4);
            streams.push((header.name.clone(), data));
        }

        let mut offset = self.root.encoded_len(&self.root.stream_headers);
        let mut headers = Vec::with_capacity(streams.len());
        for (name, data) in &streams {
            headers.push(StreamHeader {
                offset: to_u32(offset, "metadata")?,
                size: to_u32(data.len(), "metadata stream")?,
                name: name.clone(),
            });
            offset += data.len();
        }

        let mut metadata = self.root.encode(&headers)?;
        for (_, data) in streams {
            metadata.extend_from_slice(&data);
        }

        Ok(metadata)
    }

    /// Serialize the module into a complete PE image.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidBranch`] if a modified body refers to an instruction
    /// it does not contain, or [`crate::Error::SerializationFailed`] if the image cannot be
    /// laid out.
    pub fn to_bytes(mut self) -> Result<Vec<u8>> {
        if self.dirty.is_empty() {
            return Ok(self.file.data().to_vec());
        }

        if self.cor20.is_strong_name_signed() {
            log::warn!("The image is strong-name signed, the signature will no longer verify");
        }

        let placement = self.plan_section()?;
        let mut blob = self.heap("#Blob")?.to_vec();
        let mut section = Vec::new();
        let mut relaxed = 0;

        let dirty = std::mem::take(&mut self.dirty);
        for token in &dirty {
            let Some(body) = self.bodies.get(token) else {
                continue;
            };

            let mut local_sig_token = body.local_sig_token();
            if !body.added_locals().is_empty() {
                let added = body
                    .added_locals()
                    .iter()
                    .map(|local| local.ty.clone())
                    .collect::<Vec<_>>();
                let signature =
                    extend_local_var_signature(self.local_signature(local_sig_token)?, &added)?;
                let index = append_blob(&mut blob, &signature)?;
                let rid = self
                    .tables
                    .table_mut(TableId::StandAloneSig)
                    .push(&[index])?;
                local_sig_token = Token::from_parts(TableId::StandAloneSig, rid).value();
            }

            let (encoded, body_relaxed) = body.encode(local_sig_token)?;
            relaxed += body_relaxed;

            pad_to(&mut section, 4);
            let rva = placement.virtual_address + to_u32(section.len(), "patch section")?;
            section.extend_from_slice(&encoded);

            let row = self
                .tables
                .table_mut(TableId::MethodDef)
                .row_mut(token.row())
                .ok_or_else(|| malformed_error!("MethodDef row {} does not exist", token.row()))?;
            row[MethodDefRaw::RVA_COLUMN] = rva;

            log::debug!(
                "Re-encoded {} ({} bytes at RVA 0x{:X})",
                self.qualified_method_name(*token),
                encoded.len(),
                rva
            );
        }

        self.tables.widen_heap(HEAP_LARGE_BLOB, blob.len());
        let metadata = self.build_metadata(&blob)?;

        pad_to(&mut section, 4);
        let metadata_rva = placement.virtual_address + to_u32(section.len(), "patch section")?;
        let metadata_size = to_u32(metadata.len(), "metadata")?;
        section.extend_from_slice(&metadata);

        let layout = *self.file.layout();
        let virtual_size = to_u32(section.len(), "patch section")?;
        let raw_size = align_up(section.len(), layout.file_alignment as usize);

        let mut image = self.file.data().to_vec();
        image.resize(placement.pointer_to_raw_data, 0);
        image.extend_from_slice(&section);
        image.resize(placement.pointer_to_raw_data + raw_size, 0);

        let mut header = Vec::with_capacity(SECTION_HEADER_SIZE);
        header.extend_from_slice(&PATCH_SECTION_NAME);
        push_le(&mut header, virtual_size);
        push_le(&mut header, placement.virtual_address);
        push_le(&mut header, to_u32(raw_size, "patch section")?);
        push_le(&mut header, to_u32(placement.pointer_to_raw_data, "image")?);
        push_le(&mut header, 0_u32);
        push_le(&mut header, 0_u32);
        push_le(&mut header, 0_u16);
        push_le(&mut header, 0_u16);
        push_le(&mut header, PATCH_SECTION_CHARACTERISTICS);
        let table_end = layout.section_table_end();
        image[table_end..table_end + SECTION_HEADER_SIZE].copy_from_slice(&header);

        let initialized = read_le::<u32>(&image[layout.size_of_initialized_data_offset()..])?;
        let size_of_image = to_u32(
            align_up(
                (placement.virtual_address + virtual_size) as usize,
                layout.section_alignment as usize,
            ),
            "image",
        )?;

        write_le_at(
            &mut image,
            &mut layout.number_of_sections_offset(),
            layout.number_of_sections + 1,
        )?;
        write_le_at(
            &mut image,
            &mut layout.size_of_initialized_data_offset(),
            initialized.saturating_add(to_u32(raw_size, "patch section")?),
        )?;
        write_le_at(&mut image, &mut layout.size_of_image_offset(), size_of_image)?;

        let mut cursor = self.cor20_offset + META_DATA_DIRECTORY_OFFSET;
        write_le_at(&mut image, &mut cursor, metadata_rva)?;
        write_le_at(&mut image, &mut cursor, metadata_size)?;

        let checksum_offset = layout.checksum_offset();
        write_le_at(&mut image, &mut checksum_offset.clone(), 0_u32)?;
        let checksum = pe_checksum(&image, checksum_offset);
        write_le_at(&mut image, &mut checksum_offset.clone(), checksum)?;

        log::info!(
            "Rewrote {} method bodies ({} branches relaxed), metadata moved to RVA 0x{:X}",
            dirty.len(),
            relaxed,
            metadata_rva
        );

        Ok(image)
    }

    /// Serialize the module and atomically replace `path` with the result.
    ///
    /// Returns the size of the written image. On failure `path` is left untouched.
    ///
    /// # Errors
    /// See [`Module::to_bytes`], plus any I/O error while writing.
    pub fn write(self, path: &Path) -> Result<usize> {
        let image = self.to_bytes()?;

        let mut output = Output::create(path, image.len())?;
        output.write_at(0, &image)?;
        output.finalize()?;

        Ok(image.len())
    }
}
