use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{Datelike, NaiveDateTime};
use exif::{Exif, In, Tag, Value};
use tracing::debug;

use crate::error::Result;

/// Model reported when the camera make/model tags are missing.
pub const UNKNOWN_MODEL: &str = "UNKNOWN";

/// Display format for photo dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Lens names some bodies report, mapped to the name used in the album.
const LENS_ALIASES: &[(&str, &str)] = &[
    ("1007", "30mm F2.8"),
    ("70-300 mm f4.5-5.6", "VR 70-300mm f4.5-5.6E"),
    ("70.0-300.0 mm f4.5-5.6", "VR 70-300mm f4.5-5.6E"),
    ("Nikon NIKKOR Z 24-70mm f4 S", "NIKKOR Z 24-70mm f4 S"),
    ("Canon EF-S 17-55mm f2.8 IS USM", "EF-S17-55mm f2.8 IS USM"),
    ("Canon EF 100mm f2.8 Macro USM", "EF100mm f2.8 Macro USM"),
    ("Canon EF 50mm f1.8 STM", "EF50mm f1.8 STM"),
];

/// Camera metadata the album keeps per photo.
#[derive(Debug, Clone, PartialEq)]
pub struct ExifFields {
    pub model: String,
    pub lens: Option<String>,
    /// `YYYY-MM-DD HH:MM`
    pub date: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub aperture: Option<f64>,
    pub shutter: Option<String>,
    pub focal_length: Option<u32>,
    pub iso: Option<u32>,
    pub flash: bool,
    pub dim: Option<(u32, u32)>,
    pub loc: Option<String>,
}

impl Default for ExifFields {
    fn default() -> Self {
        Self {
            model: UNKNOWN_MODEL.to_string(),
            lens: None,
            date: None,
            year: None,
            month: None,
            day: None,
            aperture: None,
            shutter: None,
            focal_length: None,
            iso: None,
            flash: false,
            dim: None,
            loc: None,
        }
    }
}

/// Extract EXIF fields from an image, falling back to defaults when the file
/// has no readable EXIF block.
pub fn extract_exif(path: &Path) -> ExifFields {
    match read_exif(path) {
        Ok(fields) => fields,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "no EXIF data");
            ExifFields::default()
        }
    }
}

pub fn read_exif(path: &Path) -> Result<ExifFields> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader)?;

    let mut fields = ExifFields::default();

    if let (Some(make), Some(model)) = (ascii(&exif, Tag::Make), ascii(&exif, Tag::Model)) {
        fields.model = merge_model(&make, &model);
    }
    fields.lens = ascii(&exif, Tag::LensModel).map(|lens| normalize_lens(&lens));

    if let Some(taken) = ascii(&exif, Tag::DateTimeOriginal).and_then(|s| parse_exif_date(&s)) {
        fields.date = Some(taken.format(DATE_FORMAT).to_string());
        fields.year = Some(taken.year());
        fields.month = Some(taken.month());
        fields.day = Some(taken.day());
    }

    fields.aperture = rational(&exif, Tag::FNumber)
        .or_else(|| rational(&exif, Tag::ApertureValue).map(|apex| 2f64.powf(apex / 2.0)))
        .map(|f| (f * 10.0).round() / 10.0);
    fields.shutter = rational(&exif, Tag::ExposureTime).and_then(format_shutter);
    fields.focal_length = rational(&exif, Tag::FocalLength).map(|f| f as u32);
    fields.iso = uint(&exif, Tag::PhotographicSensitivity);
    fields.flash = uint(&exif, Tag::Flash).is_some_and(|f| f & 1 == 1);
    fields.dim = uint(&exif, Tag::PixelXDimension).zip(uint(&exif, Tag::PixelYDimension));

    let lat = gps_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S");
    let lon = gps_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W");
    fields.loc = lat.zip(lon).map(|(lat, lon)| format!("{lat:.6}, {lon:.6}"));

    Ok(fields)
}

/// `Make Model`, unless the model already names the make.
pub fn merge_model(make: &str, model: &str) -> String {
    let make = make.replace('/', "");
    let model = model.replace('/', "");
    let model_words: Vec<&str> = model.split(' ').collect();
    if make.split(' ').any(|w| model_words.contains(&w)) {
        model
    } else {
        format!("{make} {model}")
    }
}

pub fn normalize_lens(lens: &str) -> String {
    let clean = lens.replace('/', "");
    LENS_ALIASES
        .iter()
        .find(|(from, _)| *from == clean)
        .map(|(_, to)| to.to_string())
        .unwrap_or(clean)
}

/// `1/N` for exposures of a tenth of a second or shorter, seconds otherwise.
pub fn format_shutter(seconds: f64) -> Option<String> {
    if seconds.is_nan() || seconds <= 0.0 {
        return None;
    }
    if seconds <= 0.1 {
        Some(format!("1/{}", (1.0 / seconds).round() as u64))
    } else {
        Some(format!("{seconds}"))
    }
}

pub fn parse_exif_date(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y:%m:%d %H:%M:%S").ok()
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(parts)) => parts
            .first()
            .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn rational(exif: &Exif, tag: Tag) -> Option<f64> {
    let value = match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Rational(v)) => v.first().map(|r| r.to_f64()),
        Some(Value::SRational(v)) => v.first().map(|r| r.to_f64()),
        _ => None,
    };
    value.filter(|f| f.is_finite())
}

fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
}

fn gps_coordinate(exif: &Exif, tag: Tag, ref_tag: Tag, negative_ref: &str) -> Option<f64> {
    let dms = match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Rational(v)) if v.len() >= 3 => [v[0].to_f64(), v[1].to_f64(), v[2].to_f64()],
        _ => return None,
    };
    let decimal = dms_to_decimal(dms);
    let negative = ascii(exif, ref_tag).is_some_and(|r| r.eq_ignore_ascii_case(negative_ref));
    Some(if negative { -decimal } else { decimal })
}

fn dms_to_decimal([deg, min, sec]: [f64; 3]) -> f64 {
    deg + min / 60.0 + sec / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_model_avoids_repeating_make() {
        assert_eq!(merge_model("Canon", "Canon EOS R5"), "Canon EOS R5");
        assert_eq!(merge_model("FUJIFILM", "X100V"), "FUJIFILM X100V");
        assert_eq!(merge_model("NIKON CORPORATION", "NIKON Z 6"), "NIKON Z 6");
        assert_eq!(merge_model("A/B", "C/D"), "AB CD");
    }

    #[test]
    fn test_normalize_lens_aliases() {
        assert_eq!(normalize_lens("Canon EF 50mm f/1.8 STM"), "EF50mm f1.8 STM");
        assert_eq!(normalize_lens("XF23mmF2 R WR"), "XF23mmF2 R WR");
    }

    #[test]
    fn test_format_shutter() {
        assert_eq!(format_shutter(1.0 / 250.0).as_deref(), Some("1/250"));
        assert_eq!(format_shutter(0.1).as_deref(), Some("1/10"));
        assert_eq!(format_shutter(0.5).as_deref(), Some("0.5"));
        assert_eq!(format_shutter(0.0), None);
    }

    #[test]
    fn test_parse_exif_date() {
        let dt = parse_exif_date("2023:07:14 18:05:09").unwrap();
        assert_eq!(dt.format(DATE_FORMAT).to_string(), "2023-07-14 18:05");
        assert!(parse_exif_date("not a date").is_none());
    }

    #[test]
    fn test_dms_to_decimal() {
        let v = dms_to_decimal([44.0, 48.0, 36.0]);
        assert!((v - 44.81).abs() < 1e-9);
    }

    #[test]
    fn test_extract_exif_without_exif_block() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plain.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();
        let fields = extract_exif(&path);
        assert_eq!(fields, ExifFields::default());
        assert_eq!(fields.model, UNKNOWN_MODEL);
    }
}
