//! In-memory UMD images for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;


pub const SECTOR: usize = 2048;
pub const PVD_SECTOR: usize = 16;
pub const TERMINATOR_SECTOR: usize = 17;
pub const PATH_TABLE_EXTENT: u32 = 18;
pub const ROOT_EXTENT: u32 = 19;

const FLAG_DIRECTORY: u8 = 0x02;


/// A node of the directory hierarchy to lay out.
pub enum Node {
    File { name: String, data: Vec<u8> },
    Record { name: String, extent: u32, size: u32, flags: u8 },
    Directory { name: String, children: Vec<Node> },
}

pub fn file(name: &str, data: &[u8]) -> Node {
    Node::File { name: name.to_owned(), data: data.to_vec() }
}

/// A file record pointing at an explicit location.
pub fn record(name: &str, extent: u32, size: u32) -> Node {
    Node::Record { name: name.to_owned(), extent, size, flags: 0x00 }
}

/// A directory record pointing at an explicit location.
pub fn dir_link(name: &str, extent: u32) -> Node {
    Node::Record { name: name.to_owned(), extent, size: SECTOR as u32, flags: FLAG_DIRECTORY }
}

pub fn dir(name: &str, children: Vec<Node>) -> Node {
    Node::Directory { name: name.to_owned(), children }
}


pub fn record_length(name_length: usize) -> usize {
    33 + name_length + if name_length % 2 == 0 { 1 } else { 0 }
}

pub fn write_both_endian_u32(dst: &mut [u8], value: u32) {
    dst[0..4].copy_from_slice(&value.to_le_bytes());
    dst[4..8].copy_from_slice(&value.to_be_bytes());
}

pub fn write_both_endian_u16(dst: &mut [u8], value: u16) {
    dst[0..2].copy_from_slice(&value.to_le_bytes());
    dst[2..4].copy_from_slice(&value.to_be_bytes());
}

pub fn write_record(data: &mut [u8], at: usize, name: &[u8], extent: u32, size: u32, flags: u8) {
    let length = record_length(name.len());
    data[at] = length as u8;
    write_both_endian_u32(&mut data[at + 2..], extent);
    write_both_endian_u32(&mut data[at + 10..], size);
    data[at + 18..at + 25].copy_from_slice(&[106, 11, 24, 17, 30, 25, 36]);
    data[at + 25] = flags;
    write_both_endian_u16(&mut data[at + 28..], 1);
    data[at + 32] = name.len() as u8;
    data[at + 33..at + 33 + name.len()].copy_from_slice(name);
}


struct FlatDir<'a> {
    name: &'a str,
    parent: usize,
    children: &'a [Node],
}

/// Lays out the record positions of a directory: offsets relative to its extent, and the number of
/// sectors used. Records never cross a sector boundary.
fn pack_records(lengths: &[usize]) -> (Vec<usize>, u32) {
    let mut positions = Vec::with_capacity(lengths.len());
    let mut sector = 0;
    let mut offset = 0;
    for &length in lengths {
        if offset + length > SECTOR {
            sector += 1;
            offset = 0;
        }
        positions.push(sector * SECTOR + offset);
        offset += length;
    }
    (positions, sector as u32 + 1)
}

fn sectors_for(length: usize) -> u32 {
    length.div_ceil(SECTOR) as u32
}


/// Builds an image containing a PVD (sector 16), a set terminator (17), a Type L path table (18)
/// and the given hierarchy. Directories follow from sector 19 in breadth-first order, then the
/// file contents.
pub struct ImageBuilder {
    root: Vec<Node>,
}
impl ImageBuilder {
    pub fn new(root: Vec<Node>) -> Self {
        Self { root }
    }

    pub fn build(&self) -> Vec<u8> {
        // breadth-first, so that parents precede children in the path table
        let mut dirs = vec![FlatDir { name: "", parent: 0, children: &self.root }];
        let mut child_dirs: HashMap<(usize, usize), usize> = HashMap::new();
        let mut i = 0;
        while i < dirs.len() {
            let children = dirs[i].children;
            for (c, child) in children.iter().enumerate() {
                if let Node::Directory { name, children } = child {
                    child_dirs.insert((i, c), dirs.len());
                    dirs.push(FlatDir { name, parent: i, children });
                }
            }
            i += 1;
        }

        let mut layouts = Vec::with_capacity(dirs.len());
        for d in &dirs {
            let mut lengths = vec![record_length(1), record_length(1)];
            for child in d.children {
                let name = match child {
                    Node::File { name, .. } | Node::Record { name, .. } | Node::Directory { name, .. } => name,
                };
                lengths.push(record_length(name.len()));
            }
            layouts.push(pack_records(&lengths));
        }

        let mut next_extent = ROOT_EXTENT;
        let mut dir_extents = Vec::with_capacity(dirs.len());
        for (_, sector_count) in &layouts {
            dir_extents.push(next_extent);
            next_extent += sector_count;
        }
        let mut file_extents: HashMap<(usize, usize), u32> = HashMap::new();
        let mut total_sectors = next_extent;
        for (d, dir) in dirs.iter().enumerate() {
            for (c, child) in dir.children.iter().enumerate() {
                match child {
                    Node::File { data, .. } => {
                        file_extents.insert((d, c), total_sectors);
                        total_sectors += sectors_for(data.len());
                    },
                    Node::Record { extent, size, flags: 0x00, .. } => {
                        total_sectors = total_sectors.max(extent + sectors_for(*size as usize));
                    },
                    _ => {},
                }
            }
        }

        let mut data = vec![0u8; total_sectors as usize * SECTOR];

        // path table
        let mut path_table = Vec::new();
        for (d, dir) in dirs.iter().enumerate() {
            let name: &[u8] = if d == 0 { &[0x00] } else { dir.name.as_bytes() };
            path_table.push(name.len() as u8);
            path_table.push(0);
            path_table.extend_from_slice(&dir_extents[d].to_le_bytes());
            path_table.extend_from_slice(&(dir.parent as u16 + 1).to_le_bytes());
            path_table.extend_from_slice(name);
            if path_table.len() % 2 != 0 {
                path_table.push(0x00);
            }
        }
        let pt_start = PATH_TABLE_EXTENT as usize * SECTOR;
        data[pt_start..pt_start + path_table.len()].copy_from_slice(&path_table);

        // primary volume descriptor
        let pvd = PVD_SECTOR * SECTOR;
        data[pvd] = 0x01;
        data[pvd + 1..pvd + 6].copy_from_slice(b"CD001");
        data[pvd + 6] = 1;
        data[pvd + 0x08..pvd + 0x08 + 8].copy_from_slice(b"PSP GAME");
        data[pvd + 0x28..pvd + 0x28 + 8].copy_from_slice(b"UMD TEST");
        write_both_endian_u32(&mut data[pvd + 0x50..], total_sectors);
        write_both_endian_u16(&mut data[pvd + 0x78..], 1);
        write_both_endian_u16(&mut data[pvd + 0x7C..], 1);
        write_both_endian_u16(&mut data[pvd + 0x80..], SECTOR as u16);
        write_both_endian_u32(&mut data[pvd + 0x84..], path_table.len() as u32);
        data[pvd + 0x8C..pvd + 0x90].copy_from_slice(&PATH_TABLE_EXTENT.to_le_bytes());
        let root_size = layouts[0].1 * SECTOR as u32;
        write_record(&mut data, pvd + 0x9C, &[0x00], ROOT_EXTENT, root_size, FLAG_DIRECTORY);
        data[pvd + 0x23E..pvd + 0x23E + 8].copy_from_slice(b"PSP GAME");
        data[pvd + 0x32D..pvd + 0x32D + 16].copy_from_slice(b"2006112417302500");
        data[pvd + 0x32D + 16] = 36;

        let terminator = TERMINATOR_SECTOR * SECTOR;
        data[terminator] = 0xFF;
        data[terminator + 1..terminator + 6].copy_from_slice(b"CD001");
        data[terminator + 6] = 1;

        // directories and file contents
        for (d, dir) in dirs.iter().enumerate() {
            let (positions, sector_count) = &layouts[d];
            let extent = dir_extents[d];
            let size = sector_count * SECTOR as u32;
            let base = extent as usize * SECTOR;
            let parent_extent = dir_extents[dir.parent];
            let parent_size = layouts[dir.parent].1 * SECTOR as u32;

            write_record(&mut data, base + positions[0], &[0x00], extent, size, FLAG_DIRECTORY);
            write_record(&mut data, base + positions[1], &[0x01], parent_extent, parent_size, FLAG_DIRECTORY);
            for (c, child) in dir.children.iter().enumerate() {
                let at = base + positions[c + 2];
                match child {
                    Node::File { name, data: contents } => {
                        let file_extent = file_extents[&(d, c)];
                        write_record(&mut data, at, name.as_bytes(), file_extent, contents.len() as u32, 0x00);
                        let start = file_extent as usize * SECTOR;
                        data[start..start + contents.len()].copy_from_slice(contents);
                    },
                    Node::Record { name, extent, size, flags } => {
                        write_record(&mut data, at, name.as_bytes(), *extent, *size, *flags);
                    },
                    Node::Directory { name, .. } => {
                        let child_index = child_dirs[&(d, c)];
                        let child_size = layouts[child_index].1 * SECTOR as u32;
                        write_record(&mut data, at, name.as_bytes(), dir_extents[child_index], child_size, FLAG_DIRECTORY);
                    },
                }
            }
        }

        data
    }

    pub fn cursor(&self) -> Cursor<Vec<u8>> {
        Cursor::new(self.build())
    }
}


/// Assembles an SFO file from `(key, format, value)` triples.
pub fn build_sfo(entries: &[(&str, u16, &[u8])]) -> Vec<u8> {
    fn pad4(buf: &mut Vec<u8>) {
        while buf.len() % 4 != 0 {
            buf.push(0x00);
        }
    }

    let mut keys = Vec::new();
    let mut key_offsets = Vec::new();
    for (key, _, _) in entries {
        key_offsets.push(keys.len() as u16);
        keys.extend_from_slice(key.as_bytes());
        keys.push(0x00);
    }
    pad4(&mut keys);

    let mut values = Vec::new();
    let mut value_offsets = Vec::new();
    for (_, _, value) in entries {
        value_offsets.push(values.len() as u32);
        values.extend_from_slice(value);
        pad4(&mut values);
    }

    let key_table_offset = (0x14 + entries.len() * 0x10) as u32;
    let data_table_offset = key_table_offset + keys.len() as u32;

    let mut buf = b"\0PSF\x01\x01\x00\x00".to_vec();
    buf.extend_from_slice(&key_table_offset.to_le_bytes());
    buf.extend_from_slice(&data_table_offset.to_le_bytes());
    buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (i, (_, format, value)) in entries.iter().enumerate() {
        buf.extend_from_slice(&key_offsets[i].to_le_bytes());
        buf.extend_from_slice(&format.to_le_bytes());
        buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(value.len().next_multiple_of(4) as u32).to_le_bytes());
        buf.extend_from_slice(&value_offsets[i].to_le_bytes());
    }
    buf.extend_from_slice(&keys);
    buf.extend_from_slice(&values);
    buf
}
