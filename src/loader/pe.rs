//! Portable PE resource reader
//!
//! Reads the DOS, COFF and optional headers plus the section table, then
//! walks at most two levels of the resource directory. Only the bytes needed
//! for a query are read; the file handle is closed when the view drops.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::{ModuleLoader, ResourceView};
use crate::error::ErrorCode;
use crate::models::ResourceType;

pub(crate) const DOS_MAGIC: &[u8; 2] = b"MZ";
pub(crate) const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
const DOS_HEADER_SIZE: usize = 64;
pub(crate) const LFANEW_OFFSET: usize = 0x3C;
pub(crate) const COFF_HEADER_SIZE: usize = 20;
pub(crate) const SECTION_HEADER_SIZE: usize = 40;
const MAX_SECTIONS: u16 = 96;

pub(crate) const PE32_MAGIC: u16 = 0x10B;
pub(crate) const PE32_PLUS_MAGIC: u16 = 0x20B;

pub(crate) const RESOURCE_DIRECTORY_INDEX: usize = 2;
pub(crate) const DATA_DIRECTORY_SIZE: usize = 8;

pub(crate) const RESOURCE_DIRECTORY_SIZE: usize = 16;
pub(crate) const RESOURCE_ENTRY_SIZE: usize = 8;
pub(crate) const HIGH_BIT: u32 = 0x8000_0000;

/// Loader backed by [`PeView`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PeLoader;

impl ModuleLoader for PeLoader {
    type View = PeView<File>;

    fn open_resource_view(&self, path: &Path) -> Result<Self::View, ErrorCode> {
        let file = File::open(path).map_err(|e| ErrorCode::from(&e))?;
        PeView::parse(file)
    }

    fn name(&self) -> &'static str {
        "pe"
    }
}

#[derive(Debug, Clone, Copy)]
struct Section {
    virtual_address: u32,
    virtual_size: u32,
    raw_size: u32,
    raw_pointer: u32,
}

#[derive(Debug, Clone, Copy)]
struct DataDirectory {
    rva: u32,
    size: u32,
}

/// Parsed headers of a module image
#[derive(Debug)]
pub struct PeView<R> {
    reader: R,
    sections: Vec<Section>,
    resources: Option<DataDirectory>,
}

impl<R: Read + Seek> PeView<R> {
    /// Validate the image headers and read the section table.
    ///
    /// Malformed or truncated headers yield `ERROR_BAD_EXE_FORMAT`; other
    /// I/O failures carry the Windows error number for their cause.
    pub fn parse(mut reader: R) -> Result<Self, ErrorCode> {
        let mut dos = [0u8; DOS_HEADER_SIZE];
        read_at(&mut reader, 0, &mut dos).map_err(|e| ErrorCode::from(&e))?;
        if &dos[..2] != DOS_MAGIC {
            return Err(ErrorCode::BAD_EXE_FORMAT);
        }
        let nt_offset = u64::from(le_u32(&dos, LFANEW_OFFSET));

        let mut nt = [0u8; 4 + COFF_HEADER_SIZE];
        read_at(&mut reader, nt_offset, &mut nt).map_err(|e| ErrorCode::from(&e))?;
        if &nt[..4] != PE_SIGNATURE {
            return Err(ErrorCode::BAD_EXE_FORMAT);
        }
        let section_count = le_u16(&nt, 4 + 2);
        let optional_size = usize::from(le_u16(&nt, 4 + 16));
        if section_count > MAX_SECTIONS {
            return Err(ErrorCode::BAD_EXE_FORMAT);
        }

        let optional_offset = nt_offset + nt.len() as u64;
        let mut optional = vec![0u8; optional_size];
        read_at(&mut reader, optional_offset, &mut optional).map_err(|e| ErrorCode::from(&e))?;
        let resources = resource_directory(&optional)?;

        let table_offset = optional_offset + optional_size as u64;
        let mut table = vec![0u8; usize::from(section_count) * SECTION_HEADER_SIZE];
        read_at(&mut reader, table_offset, &mut table).map_err(|e| ErrorCode::from(&e))?;
        let sections = table
            .chunks_exact(SECTION_HEADER_SIZE)
            .map(|raw| Section {
                virtual_size: le_u32(raw, 8),
                virtual_address: le_u32(raw, 12),
                raw_size: le_u32(raw, 16),
                raw_pointer: le_u32(raw, 20),
            })
            .collect();

        Ok(Self {
            reader,
            sections,
            resources,
        })
    }

    /// Number of sections in the image
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Whether the image declares a resource directory at all
    pub fn has_resource_directory(&self) -> bool {
        self.resources.is_some()
    }

    fn rva_to_offset(&self, rva: u32) -> Option<u64> {
        self.sections.iter().find_map(|s| {
            let start = u64::from(s.virtual_address);
            let span = u64::from(s.virtual_size.max(s.raw_size));
            let rva = u64::from(rva);
            (rva >= start && rva < start + span)
                .then(|| u64::from(s.raw_pointer) + (rva - start))
        })
    }

    fn read_directory_counts(&mut self, offset: u64) -> Result<(u16, u16), ErrorCode> {
        let mut header = [0u8; RESOURCE_DIRECTORY_SIZE];
        read_at(&mut self.reader, offset, &mut header).map_err(query_error)?;
        Ok((le_u16(&header, 12), le_u16(&header, 14)))
    }
}

impl<R: Read + Seek> ResourceView for PeView<R> {
    fn has_resource_of_type(&mut self, kind: ResourceType) -> Result<bool, ErrorCode> {
        let Some(directory) = self.resources else {
            return Ok(false);
        };
        let base = self
            .rva_to_offset(directory.rva)
            .ok_or(ErrorCode::INVALID_DATA)?;

        let (named, ids) = self.read_directory_counts(base)?;
        if ids == 0 {
            return Ok(false);
        }

        // Integer-id entries follow the named ones
        let first_id =
            base + (RESOURCE_DIRECTORY_SIZE + usize::from(named) * RESOURCE_ENTRY_SIZE) as u64;
        let mut entries = vec![0u8; usize::from(ids) * RESOURCE_ENTRY_SIZE];
        read_at(&mut self.reader, first_id, &mut entries).map_err(query_error)?;

        for entry in entries.chunks_exact(RESOURCE_ENTRY_SIZE) {
            let name = le_u32(entry, 0);
            if name & HIGH_BIT != 0 || name != u32::from(kind.id()) {
                continue;
            }
            let target = le_u32(entry, 4);
            if target & HIGH_BIT == 0 {
                return Err(ErrorCode::INVALID_DATA);
            }
            let relative = target & !HIGH_BIT;
            if relative >= directory.size {
                return Err(ErrorCode::INVALID_DATA);
            }
            let (named, ids) = self.read_directory_counts(base + u64::from(relative))?;
            return Ok(named > 0 || ids > 0);
        }

        Ok(false)
    }
}

/// Locate the resource data directory in the optional header
fn resource_directory(optional: &[u8]) -> Result<Option<DataDirectory>, ErrorCode> {
    if optional.len() < 2 {
        return Err(ErrorCode::BAD_EXE_FORMAT);
    }
    let (count_offset, directories_offset) = match le_u16(optional, 0) {
        PE32_MAGIC => (92, 96),
        PE32_PLUS_MAGIC => (108, 112),
        _ => return Err(ErrorCode::BAD_EXE_FORMAT),
    };
    if optional.len() < count_offset + 4 {
        return Err(ErrorCode::BAD_EXE_FORMAT);
    }

    let count = le_u32(optional, count_offset) as usize;
    let entry = directories_offset + RESOURCE_DIRECTORY_INDEX * DATA_DIRECTORY_SIZE;
    if count <= RESOURCE_DIRECTORY_INDEX || optional.len() < entry + DATA_DIRECTORY_SIZE {
        return Ok(None);
    }

    let rva = le_u32(optional, entry);
    let size = le_u32(optional, entry + 4);
    if rva == 0 || size == 0 {
        return Ok(None);
    }
    Ok(Some(DataDirectory { rva, size }))
}

fn query_error(err: io::Error) -> ErrorCode {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ErrorCode::INVALID_DATA
    } else {
        ErrorCode::from(&err)
    }
}

fn read_at<R: Read + Seek>(reader: &mut R, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(buf)
}

fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
