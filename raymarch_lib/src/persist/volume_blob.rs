use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use byteorder::{LittleEndian, WriteBytesExt};
use memmap::MmapOptions;
use nalgebra::vector;
use nom::{
    bytes::complete::tag,
    number::complete::{le_f32, le_u32, le_u8},
    sequence::tuple,
    IResult,
};

use crate::{
    common::ValueRange,
    error::format_err,
    volumetric::{ScalarEncoding, VolumeInfo, VolumeResource},
    Result,
};

pub const VOLUME_MAGIC: &[u8; 5] = b"RMVOL";
pub const VOLUME_VERSION: u8 = 1;

/// magic, version, dims, spacing, bits, signed, float, range
pub const VOLUME_HEADER_LEN: usize = 5 + 1 + 3 * 4 + 3 * 4 + 3 + 2 * 4;

type RawHeader = (u8, (u32, u32, u32), (f32, f32, f32), (u8, u8, u8), (f32, f32));

fn header(s: &[u8]) -> IResult<&[u8], RawHeader> {
    let (s, _) = tag(&VOLUME_MAGIC[..])(s)?;
    tuple((
        le_u8,
        tuple((le_u32, le_u32, le_u32)),
        tuple((le_f32, le_f32, le_f32)),
        tuple((le_u8, le_u8, le_u8)),
        tuple((le_f32, le_f32)),
    ))(s)
}

fn flag(value: u8, name: &str) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        v => Err(format_err(format!("{name} flag must be 0 or 1, got {v}"))),
    }
}

/// Parse the header, returns the grid description and where voxel data starts
pub fn read_volume_header(bytes: &[u8]) -> Result<(VolumeInfo, usize)> {
    let (_, (version, dims, spacing, (bits, signed, float), range)) =
        header(bytes).map_err(|_| format_err("malformed volume header"))?;

    if version != VOLUME_VERSION {
        return Err(format_err(format!("unsupported volume version {version}")));
    }

    let info = VolumeInfo {
        dims: vector![dims.0 as usize, dims.1 as usize, dims.2 as usize],
        spacing: vector![spacing.0, spacing.1, spacing.2],
        encoding: ScalarEncoding {
            bits,
            signed: flag(signed, "signed")?,
            float: flag(float, "float")?,
            range: ValueRange::new(range.0, range.1),
        },
    };
    Ok((info, VOLUME_HEADER_LEN))
}

/// Load a volume blob, the data is validated like [`VolumeResource::load`]
pub fn read_volume(bytes: &[u8]) -> Result<VolumeResource> {
    let (info, offset) = read_volume_header(bytes)?;
    let raw = bytes[offset..].to_vec();
    VolumeResource::load(raw, info.dims, info.spacing, info.encoding)
}

/// Memory map `path` and load the volume blob it holds
pub fn read_volume_file<P: AsRef<Path>>(path: P) -> Result<VolumeResource> {
    let file = File::open(path.as_ref())?;
    // Safety: file is only read, the map is dropped before returning
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    log::debug!("Mapped {} ({} bytes)", path.as_ref().display(), mmap.len());
    read_volume(&mmap[..])
}

/// Write header and raw voxel bytes, `raw` must match `info`
pub fn write_volume_parts<W: Write>(w: &mut W, info: &VolumeInfo, raw: &[u8]) -> Result<()> {
    let expected = info.voxel_count() * info.encoding.bytes_per_voxel();
    if raw.len() != expected {
        return Err(format_err(format!(
            "data length mismatch: expected {expected} bytes, got {}",
            raw.len()
        )));
    }
    let dims_fit = info.dims.iter().all(|&d| u32::try_from(d).is_ok());
    if !dims_fit {
        return Err(format_err(format!("dimensions {:?} do not fit u32", info.dims)));
    }

    w.write_all(VOLUME_MAGIC)?;
    w.write_u8(VOLUME_VERSION)?;
    for d in info.dims.iter() {
        w.write_u32::<LittleEndian>(*d as u32)?;
    }
    for s in info.spacing.iter() {
        w.write_f32::<LittleEndian>(*s)?;
    }
    let enc = &info.encoding;
    w.write_u8(enc.bits)?;
    w.write_u8(enc.signed as u8)?;
    w.write_u8(enc.float as u8)?;
    w.write_f32::<LittleEndian>(enc.range.low)?;
    w.write_f32::<LittleEndian>(enc.range.high)?;
    w.write_all(raw)?;
    Ok(())
}

pub fn write_volume<W: Write>(w: &mut W, volume: &VolumeResource) -> Result<()> {
    volume.with_raw(|info, raw| write_volume_parts(w, info, raw))
}

pub fn write_volume_file<P: AsRef<Path>>(path: P, volume: &VolumeResource) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_volume(&mut w, volume)?;
    w.flush()?;
    Ok(())
}
