//! PNG decoding and image XObject embedding

use std::io::Write;

use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use formdoc_types::FormDocError;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Extract the payload of a base64 data URI (`data:image/png;base64,...`)
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>, FormDocError> {
    let payload = src
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once("base64,"))
        .map(|(_, payload)| payload)
        .ok_or_else(|| FormDocError::ResourceLoad("not a base64 data URI".to_string()))?;
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| FormDocError::ResourceLoad(format!("invalid base64 payload: {e}")))
}

/// Decode a PNG into 8-bit RGB rows
pub fn decode_png_rgb(bytes: &[u8]) -> Result<(u32, u32, Vec<u8>), FormDocError> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder
        .read_info()
        .map_err(|e| FormDocError::ResourceLoad(format!("PNG decode failed: {e}")))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| FormDocError::ResourceLoad(format!("PNG decode failed: {e}")))?;
    buf.truncate(info.buffer_size());

    let rgb = match info.color_type {
        png::ColorType::Rgb => buf,
        png::ColorType::Rgba => buf.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g]).collect(),
        png::ColorType::GrayscaleAlpha => {
            buf.chunks_exact(2).flat_map(|px| [px[0], px[0], px[0]]).collect()
        }
        other => {
            return Err(FormDocError::ResourceLoad(format!(
                "unsupported PNG color type: {other:?}"
            )))
        }
    };
    Ok((info.width, info.height, rgb))
}

/// Embed PNG bytes as a FlateDecode RGB image XObject
pub fn embed_png(pdf: &mut Document, bytes: &[u8]) -> Result<(ObjectId, u32, u32), FormDocError> {
    let (width, height, rgb) = decode_png_rgb(bytes)?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&rgb)
        .map_err(|e| FormDocError::ResourceLoad(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| FormDocError::ResourceLoad(e.to_string()))?;

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(width as i64),
            "Height" => Object::Integer(height as i64),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => "FlateDecode",
        },
        compressed,
    );
    Ok((pdf.add_object(Object::Stream(stream)), width, height))
}
