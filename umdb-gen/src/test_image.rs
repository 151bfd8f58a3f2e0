//! A small fixed-layout image for the tests.
//!
//! | sector | content                 |
//! |--------|-------------------------|
//! | 16     | primary volume descriptor |
//! | 17     | set terminator          |
//! | 18     | path table              |
//! | 19     | `/`                     |
//! | 20     | `/PSP_GAME`             |
//! | 21     | `/PSP_GAME/PARAM.SFO;1` |
//! | 22     | `/UMD_DATA.BIN;1`       |


const SECTOR: usize = 2048;

pub const SAMPLE_UMD_DATA: &[u8] = b"ULJM-05001|8C3A0D95E9D1F1A8|0001|G\0\0\0\0";


fn write_both_endian_u32(dst: &mut [u8], value: u32) {
    dst[0..4].copy_from_slice(&value.to_le_bytes());
    dst[4..8].copy_from_slice(&value.to_be_bytes());
}

fn write_record(data: &mut [u8], at: usize, name: &[u8], extent: u32, size: u32, flags: u8) -> usize {
    let length = 33 + name.len() + if name.len() % 2 == 0 { 1 } else { 0 };
    data[at] = length as u8;
    write_both_endian_u32(&mut data[at + 2..], extent);
    write_both_endian_u32(&mut data[at + 10..], size);
    data[at + 25] = flags;
    data[at + 32] = name.len() as u8;
    data[at + 33..at + 33 + name.len()].copy_from_slice(name);
    at + length
}

fn write_path_table_entry(table: &mut Vec<u8>, name: &[u8], extent: u32, parent: u16) {
    table.push(name.len() as u8);
    table.push(0);
    table.extend_from_slice(&extent.to_le_bytes());
    table.extend_from_slice(&parent.to_le_bytes());
    table.extend_from_slice(name);
    if table.len() % 2 != 0 {
        table.push(0);
    }
}

pub fn build_image(sfo: &[u8], umd_data: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 23 * SECTOR];

    let mut path_table = Vec::new();
    write_path_table_entry(&mut path_table, &[0x00], 19, 1);
    write_path_table_entry(&mut path_table, b"PSP_GAME", 20, 1);
    data[18 * SECTOR..18 * SECTOR + path_table.len()].copy_from_slice(&path_table);

    let pvd = 16 * SECTOR;
    data[pvd] = 0x01;
    data[pvd + 1..pvd + 6].copy_from_slice(b"CD001");
    data[pvd + 6] = 1;
    data[pvd + 0x08..pvd + 0x08 + 8].copy_from_slice(b"PSP GAME");
    data[pvd + 0x28..pvd + 0x28 + 9].copy_from_slice(b"UMD_TITLE");
    write_both_endian_u32(&mut data[pvd + 0x50..], 23);
    data[pvd + 0x80..pvd + 0x82].copy_from_slice(&2048u16.to_le_bytes());
    data[pvd + 0x82..pvd + 0x84].copy_from_slice(&2048u16.to_be_bytes());
    write_both_endian_u32(&mut data[pvd + 0x84..], path_table.len() as u32);
    data[pvd + 0x8C..pvd + 0x90].copy_from_slice(&18u32.to_le_bytes());
    write_record(&mut data, pvd + 0x9C, &[0x00], 19, 2048, 0x02);
    data[pvd + 0x13E..pvd + 0x13E + 4].copy_from_slice(b"SCEI");
    data[pvd + 0x23E..pvd + 0x23E + 8].copy_from_slice(b"PSP GAME");
    data[pvd + 0x32D..pvd + 0x32D + 16].copy_from_slice(b"2005030112000000");
    data[pvd + 0x32D + 16] = 36;

    data[17 * SECTOR] = 0xFF;
    data[17 * SECTOR + 1..17 * SECTOR + 6].copy_from_slice(b"CD001");

    let mut at = 19 * SECTOR;
    at = write_record(&mut data, at, &[0x00], 19, 2048, 0x02);
    at = write_record(&mut data, at, &[0x01], 19, 2048, 0x02);
    at = write_record(&mut data, at, b"PSP_GAME", 20, 2048, 0x02);
    write_record(&mut data, at, b"UMD_DATA.BIN;1", 22, umd_data.len() as u32, 0x00);

    let mut at = 20 * SECTOR;
    at = write_record(&mut data, at, &[0x00], 20, 2048, 0x02);
    at = write_record(&mut data, at, &[0x01], 19, 2048, 0x02);
    write_record(&mut data, at, b"PARAM.SFO;1", 21, sfo.len() as u32, 0x00);

    data[21 * SECTOR..21 * SECTOR + sfo.len()].copy_from_slice(sfo);
    data[22 * SECTOR..22 * SECTOR + umd_data.len()].copy_from_slice(umd_data);
    data
}

/// An SFO with `TITLE`, `DISC_ID` and `PARENTAL_LEVEL`.
pub fn sample_sfo() -> Vec<u8> {
    let keys = b"TITLE\0DISC_ID\0PARENTAL_LEVEL\0\0\0\0";
    let values = b"GAME\0\0\0\0ULJM05001\0\0\0\x05\0\0\0";
    let key_table_offset: u32 = 0x14 + 3 * 0x10;
    let data_table_offset = key_table_offset + keys.len() as u32;

    let mut buf = b"\0PSF\x01\x01\x00\x00".to_vec();
    buf.extend_from_slice(&key_table_offset.to_le_bytes());
    buf.extend_from_slice(&data_table_offset.to_le_bytes());
    buf.extend_from_slice(&3u32.to_le_bytes());
    // key offset, format, length, max length, data offset
    let index: [(u16, u16, u32, u32, u32); 3] = [
        (0, 0x0204, 5, 8, 0),
        (6, 0x0204, 10, 12, 8),
        (14, 0x0404, 4, 4, 20),
    ];
    for (key_offset, format, length, max_length, data_offset) in index {
        buf.extend_from_slice(&key_offset.to_le_bytes());
        buf.extend_from_slice(&format.to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&max_length.to_le_bytes());
        buf.extend_from_slice(&data_offset.to_le_bytes());
    }
    buf.extend_from_slice(keys);
    buf.extend_from_slice(values);
    buf
}
