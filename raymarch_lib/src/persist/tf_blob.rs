use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use nom::{
    bytes::complete::tag,
    combinator::all_consuming,
    error::{Error, ErrorKind},
    multi::count,
    number::complete::{le_f32, le_u32, le_u8},
    sequence::tuple,
    IResult,
};

use crate::{
    color,
    error::format_err,
    transfer_function::{ControlPoint, TransferFunction},
    Result,
};

pub const TF_MAGIC: &[u8; 4] = b"RMTF";
pub const TF_VERSION: u8 = 1;

fn control_point(s: &[u8]) -> IResult<&[u8], ControlPoint> {
    let (s, (scalar, r, g, b, a)) = tuple((le_f32, le_f32, le_f32, le_f32, le_f32))(s)?;
    Ok((s, ControlPoint::new(scalar, color::new(r, g, b, a))))
}

fn blob(s: &[u8]) -> IResult<&[u8], (u8, Vec<ControlPoint>)> {
    let (s, _) = tag(&TF_MAGIC[..])(s)?;
    let (s, version) = le_u8(s)?;
    let (s, n) = le_u32(s)?;
    // Each record is 5 floats
    if (n as usize).checked_mul(20) != Some(s.len()) {
        return Err(nom::Err::Error(Error::new(s, ErrorKind::Count)));
    }
    let (s, points) = all_consuming(count(control_point, n as usize))(s)?;
    Ok((s, (version, points)))
}

/// Control points in order, range parameters are not stored
pub fn write_transfer_function<W: Write>(w: &mut W, tf: &TransferFunction) -> Result<()> {
    let points = tf.control_points();
    let n = u32::try_from(points.len())
        .map_err(|_| format_err("too many control points"))?;

    w.write_all(TF_MAGIC)?;
    w.write_u8(TF_VERSION)?;
    w.write_u32::<LittleEndian>(n)?;
    for p in points {
        w.write_f32::<LittleEndian>(p.scalar)?;
        for c in p.color.iter() {
            w.write_f32::<LittleEndian>(*c)?;
        }
    }
    Ok(())
}

/// Malformed blobs fail with `Format`, invalid curves with `Validation`.
/// A blob without points yields an empty transfer function.
pub fn read_transfer_function(bytes: &[u8]) -> Result<TransferFunction> {
    let (_, (version, points)) =
        blob(bytes).map_err(|_| format_err("malformed transfer function blob"))?;
    if version != TF_VERSION {
        return Err(format_err(format!(
            "unsupported transfer function version {version}"
        )));
    }
    if points.is_empty() {
        return Ok(TransferFunction::new());
    }
    TransferFunction::from_points(points)
}
