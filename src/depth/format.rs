// SPDX-License-Identifier: GPL-3.0-only

//! Binary DepthImage container
//!
//! Layout (all integers and floats little-endian):
//!
//! ```text
//! magic "SOVA" | type "DI" | version "1.0"
//! width i32 | height i32 | depth_scale f32 | intrinsics JSON
//! [has_plane bool, (len i32, bytes)?] x 4   (depth, color, colorized, confidence)
//! measurements JSON (reserved)
//! ```
//!
//! Strings are length-prefixed with a 7-bit variable-length integer followed
//! by UTF-8 bytes, the .NET `BinaryWriter` convention used by the files this
//! format has to stay compatible with.

use super::{DepthImage, Intrinsics, Plane, grid_pixel_count};
use crate::constants::depth_file;
use crate::errors::{ImageError, ImageResult};
use std::io::{self, Read, Write};

/// Write an image to `writer`
pub fn write_image<W: Write>(image: &DepthImage, writer: &mut W) -> ImageResult<()> {
    let intrinsics_json = image
        .intrinsics()
        .to_json()
        .map_err(|e| ImageError::Format(format!("intrinsics encoding failed: {}", e)))?;

    write_string(writer, depth_file::MAGIC)?;
    write_string(writer, depth_file::TYPE)?;
    write_string(writer, depth_file::VERSION)?;

    write_i32(writer, dimension_to_i32(image.width())?)?;
    write_i32(writer, dimension_to_i32(image.height())?)?;
    writer.write_all(&image.depth_scale().to_le_bytes())?;
    write_string(writer, &intrinsics_json)?;

    let depth_bytes: Vec<u8> = image
        .depth()
        .iter()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    write_plane(writer, Some(&depth_bytes))?;
    write_plane(writer, image.color())?;
    write_plane(writer, image.colorized())?;
    write_plane(writer, image.confidence())?;

    write_string(writer, depth_file::EMPTY_MEASUREMENTS)?;
    Ok(())
}

/// Read an image from `reader`
///
/// Nothing is constructed until every field has been read and validated.
pub fn read_image<R: Read>(reader: &mut R) -> ImageResult<DepthImage> {
    let magic = read_string(reader)?;
    if magic != depth_file::MAGIC {
        return Err(ImageError::Format(format!("bad magic {:?}", magic)));
    }
    let kind = read_string(reader)?;
    if kind != depth_file::TYPE {
        return Err(ImageError::Format(format!("unexpected type {:?}", kind)));
    }
    let version = read_string(reader)?;
    if version != depth_file::VERSION {
        return Err(ImageError::Format(format!(
            "unsupported version {:?}",
            version
        )));
    }

    let width = read_dimension(reader, "width")?;
    let height = read_dimension(reader, "height")?;
    let pixel_count = grid_pixel_count(width, height)?;
    let depth_scale = f32::from_le_bytes(read_array(reader)?);
    let intrinsics = Intrinsics::from_json(&read_string(reader)?)
        .map_err(|e| ImageError::Format(format!("invalid intrinsics: {}", e)))?;

    let depth = match read_plane(reader, Plane::Depth, pixel_count)? {
        Some(bytes) => bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect(),
        None => vec![0; pixel_count],
    };
    let color = read_plane(reader, Plane::Color, pixel_count)?;
    let colorized = read_plane(reader, Plane::Colorized, pixel_count)?;
    let confidence = read_plane(reader, Plane::Confidence, pixel_count)?;

    // Older files end here without the reserved measurements string
    if let Some(first) = read_optional_byte(reader)? {
        let len = read_7bit_len(reader, Some(first))?;
        read_exact_vec(reader, len)?;
    }

    Ok(DepthImage::from_parts(
        width,
        height,
        depth_scale,
        intrinsics,
        depth,
        color,
        colorized,
        confidence,
    ))
}

/// Write a 7-bit length-prefixed UTF-8 string
pub fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let mut len = value.len();
    let mut prefix = Vec::with_capacity(5);
    while len >= 0x80 {
        prefix.push((len as u8 & 0x7f) | 0x80);
        len >>= 7;
    }
    prefix.push(len as u8);
    writer.write_all(&prefix)?;
    writer.write_all(value.as_bytes())
}

/// Read a 7-bit length-prefixed UTF-8 string
pub fn read_string<R: Read>(reader: &mut R) -> ImageResult<String> {
    let len = read_7bit_len(reader, None)?;
    let bytes = read_exact_vec(reader, len)?;
    String::from_utf8(bytes).map_err(|e| ImageError::Format(format!("invalid UTF-8: {}", e)))
}

fn read_7bit_len<R: Read>(reader: &mut R, first: Option<u8>) -> ImageResult<usize> {
    let mut value: u32 = 0;
    let mut pending = first;
    for shift in (0..35).step_by(7) {
        let byte = match pending.take() {
            Some(byte) => byte,
            None => read_array::<_, 1>(reader)?[0],
        };
        // The fifth byte may only carry the top 4 bits of a 32-bit length
        if shift == 28 && byte > 0x0f {
            return Err(ImageError::Format("string length prefix overflow".into()));
        }
        value |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(value as usize);
        }
    }
    Err(ImageError::Format("string length prefix overflow".into()))
}

fn write_i32<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

fn write_plane<W: Write>(writer: &mut W, bytes: Option<&[u8]>) -> ImageResult<()> {
    match bytes {
        Some(bytes) => {
            let len = i32::try_from(bytes.len()).map_err(|_| {
                ImageError::Format(format!("plane of {} bytes is too large", bytes.len()))
            })?;
            writer.write_all(&[1])?;
            write_i32(writer, len)?;
            writer.write_all(bytes)?;
        }
        None => writer.write_all(&[0])?,
    }
    Ok(())
}

fn read_plane<R: Read>(
    reader: &mut R,
    plane: Plane,
    pixel_count: usize,
) -> ImageResult<Option<Vec<u8>>> {
    let present = read_array::<_, 1>(reader)?[0] != 0;
    if !present {
        return Ok(None);
    }
    let len = i32::from_le_bytes(read_array(reader)?);
    let expected = plane.byte_len(pixel_count);
    if len < 0 || len as usize != expected {
        return Err(ImageError::Format(format!(
            "{} plane has {} bytes, expected {}",
            plane, len, expected
        )));
    }
    read_exact_vec(reader, expected).map(Some)
}

fn read_dimension<R: Read>(reader: &mut R, name: &str) -> ImageResult<u32> {
    let value = i32::from_le_bytes(read_array(reader)?);
    if value <= 0 {
        return Err(ImageError::Format(format!("invalid {} {}", name, value)));
    }
    Ok(value as u32)
}

fn dimension_to_i32(value: u32) -> ImageResult<i32> {
    i32::try_from(value).map_err(|_| ImageError::Format(format!("dimension {} too large", value)))
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> ImageResult<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(truncated)?;
    Ok(buf)
}

/// Read exactly `len` bytes without trusting `len` for the allocation
fn read_exact_vec<R: Read>(reader: &mut R, len: usize) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    (&mut *reader).take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(ImageError::Io(format!(
            "unexpected end of file: wanted {} bytes, got {}",
            len,
            buf.len()
        )));
    }
    Ok(buf)
}

/// Read one byte, `None` on a clean end of file
fn read_optional_byte<R: Read>(reader: &mut R) -> ImageResult<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn truncated(err: io::Error) -> ImageError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ImageError::Io("unexpected end of file".into())
    } else {
        ImageError::from(err)
    }
}
