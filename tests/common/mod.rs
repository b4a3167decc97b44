//! Fixtures shared by the integration tests

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::error::Error;
use std::fs;
use std::io::Cursor;
use std::path::Path;

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn rational(tag: Tag, values: &[(u32, u32)]) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(
            values
                .iter()
                .map(|&(num, denom)| Rational { num, denom })
                .collect(),
        ),
    }
}

/// TIFF-encoded EXIF block of a Canon EOS R5 shot taken in Beijing
fn exif_block() -> Result<Vec<u8>, Box<dyn Error>> {
    let fields = [
        ascii(Tag::Make, "Canon"),
        ascii(Tag::Model, "EOS R5"),
        ascii(Tag::DateTimeOriginal, "2024:11:06 14:30:22"),
        rational(Tag::ExposureTime, &[(1, 200)]),
        rational(Tag::FNumber, &[(28, 10)]),
        rational(Tag::FocalLength, &[(50, 1)]),
        Field {
            tag: Tag::PhotographicSensitivity,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![200]),
        },
        ascii(Tag::GPSLatitudeRef, "N"),
        rational(Tag::GPSLatitude, &[(39, 1), (54, 1), (1512, 100)]),
        ascii(Tag::GPSLongitudeRef, "E"),
        rational(Tag::GPSLongitude, &[(116, 1), (24, 1), (2663, 100)]),
    ];

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false)?;
    Ok(buf.into_inner())
}

/// Writes a small JPEG carrying EXIF camera, exposure, time and GPS tags
pub fn write_jpeg_with_exif(path: &Path) -> Result<(), Box<dyn Error>> {
    let image = RgbImage::from_pixel(32, 24, Rgb([90, 140, 200]));
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 90).encode_image(&image)?;

    let tiff = exif_block()?;
    let length = u16::try_from(2 + 6 + tiff.len())?;

    // SOI, then an APP1 "Exif" segment, then the rest of the encoded file
    let mut bytes = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    bytes.extend_from_slice(&jpeg[..2]);
    bytes.extend_from_slice(&[0xFF, 0xE1]);
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes.extend_from_slice(b"Exif\0\0");
    bytes.extend_from_slice(&tiff);
    bytes.extend_from_slice(&jpeg[2..]);

    fs::write(path, bytes)?;
    Ok(())
}

/// Writes a small PNG without any metadata
pub fn write_plain_png(path: &Path, width: u32, height: u32) -> Result<(), Box<dyn Error>> {
    RgbImage::from_pixel(width, height, Rgb([220, 180, 60])).save(path)?;
    Ok(())
}
