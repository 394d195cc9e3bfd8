//! Synthetic module images shared by unit and integration tests

use crate::loader::pe::{
    COFF_HEADER_SIZE, DATA_DIRECTORY_SIZE, DOS_MAGIC, HIGH_BIT, LFANEW_OFFSET, PE32_MAGIC,
    PE32_PLUS_MAGIC, PE_SIGNATURE, RESOURCE_DIRECTORY_INDEX, RESOURCE_DIRECTORY_SIZE,
    RESOURCE_ENTRY_SIZE, SECTION_HEADER_SIZE,
};

/// File offset of the `.rsrc` section in [`pe_image`] output
pub const RSRC_FILE_OFFSET: usize = 0x200;
/// Virtual address of the `.rsrc` section in [`pe_image`] output
pub const RSRC_RVA: u32 = 0x1000;

/// Minimal image: one `.rsrc` section holding a two-level directory with
/// `names` entries under each `(type_id, names)` pair.
///
/// `plus` selects PE32+ over PE32. An empty `types` slice leaves the
/// resource data directory unset.
pub fn pe_image(plus: bool, types: &[(u16, u16)]) -> Vec<u8> {
    let rsrc = resource_section(types);
    let optional_size: u16 = if plus { 240 } else { 224 };

    let mut out = vec![0u8; 0x40];
    out[..2].copy_from_slice(DOS_MAGIC);
    out[LFANEW_OFFSET..LFANEW_OFFSET + 4].copy_from_slice(&0x40u32.to_le_bytes());

    out.extend_from_slice(PE_SIGNATURE);
    let mut coff = [0u8; COFF_HEADER_SIZE];
    coff[0..2].copy_from_slice(&0x8664u16.to_le_bytes());
    coff[2..4].copy_from_slice(&1u16.to_le_bytes());
    coff[16..18].copy_from_slice(&optional_size.to_le_bytes());
    out.extend_from_slice(&coff);

    let mut optional = vec![0u8; usize::from(optional_size)];
    let (magic, count_at, dirs_at) = if plus {
        (PE32_PLUS_MAGIC, 108, 112)
    } else {
        (PE32_MAGIC, 92, 96)
    };
    optional[0..2].copy_from_slice(&magic.to_le_bytes());
    optional[count_at..count_at + 4].copy_from_slice(&16u32.to_le_bytes());
    if !types.is_empty() {
        let at = dirs_at + RESOURCE_DIRECTORY_INDEX * DATA_DIRECTORY_SIZE;
        optional[at..at + 4].copy_from_slice(&RSRC_RVA.to_le_bytes());
        optional[at + 4..at + 8].copy_from_slice(&(rsrc.len() as u32).to_le_bytes());
    }
    out.extend_from_slice(&optional);

    let mut section = [0u8; SECTION_HEADER_SIZE];
    section[..5].copy_from_slice(b".rsrc");
    section[8..12].copy_from_slice(&(rsrc.len() as u32).to_le_bytes());
    section[12..16].copy_from_slice(&RSRC_RVA.to_le_bytes());
    section[16..20].copy_from_slice(&(rsrc.len() as u32).to_le_bytes());
    section[20..24].copy_from_slice(&(RSRC_FILE_OFFSET as u32).to_le_bytes());
    out.extend_from_slice(&section);

    out.resize(RSRC_FILE_OFFSET, 0);
    out.extend_from_slice(&rsrc);
    out
}

fn directory(ids: u16) -> Vec<u8> {
    let mut header = vec![0u8; RESOURCE_DIRECTORY_SIZE];
    header[14..16].copy_from_slice(&ids.to_le_bytes());
    header
}

fn resource_section(types: &[(u16, u16)]) -> Vec<u8> {
    let mut root = directory(types.len() as u16);
    let mut subdirs = Vec::new();
    let mut next = RESOURCE_DIRECTORY_SIZE + types.len() * RESOURCE_ENTRY_SIZE;
    for &(type_id, names) in types {
        root.extend_from_slice(&u32::from(type_id).to_le_bytes());
        root.extend_from_slice(&(HIGH_BIT | next as u32).to_le_bytes());

        let mut sub = directory(names);
        for name in 0..names {
            sub.extend_from_slice(&u32::from(name + 1).to_le_bytes());
            sub.extend_from_slice(&0u32.to_le_bytes());
        }
        next += sub.len();
        subdirs.extend_from_slice(&sub);
    }
    root.extend_from_slice(&subdirs);
    root
}
