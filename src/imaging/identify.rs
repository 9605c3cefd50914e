//! `identify` output format and parser.
//!
//! identify is asked to print one line per frame:
//!
//! ```text
//! format:PNG|width:40|height:20|exif_orientation:
//! format:JPEG|width:4000|height:3000|exif_orientation:6
//! ```
//!
//! `exif_orientation` is empty or `unknown` when the image has none.

use crate::exec::ExecError;
use serde::Serialize;
use std::path::PathBuf;

/// The `-format` template passed to identify. `\n` is expanded by the tool.
pub const IDENTIFY_FORMAT: &str =
    "format:%m|width:%w|height:%h|exif_orientation:%[EXIF:Orientation]\\n";

/// Lowercase format names this crate handles.
pub const SUPPORTED_FORMATS: &[&str] = &["png", "jpeg", "jpg", "gif", "svg"];

pub fn is_supported_format(format: &str) -> bool {
    SUPPORTED_FORMATS.contains(&format.to_ascii_lowercase().as_str())
}

/// One frame as reported by identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    /// Lowercased format name, e.g. `png`.
    pub format: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif_orientation: Option<u16>,
}

/// An identified image. Top-level fields describe the first frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub format: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif_orientation: Option<u16>,
    pub frames: Vec<FrameInfo>,
}

impl ImageInfo {
    /// Builds from parsed frames; `frames` must not be empty.
    pub fn from_frames(path: PathBuf, frames: Vec<FrameInfo>) -> Result<Self, ExecError> {
        let first = frames.first().cloned().ok_or_else(|| parse_error("no frames reported"))?;
        Ok(Self {
            path,
            format: first.format,
            width: first.width,
            height: first.height,
            exif_orientation: first.exif_orientation,
            frames,
        })
    }

    pub fn is_supported(&self) -> bool {
        is_supported_format(&self.format)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// Parses identify stdout into frames. Blank lines are ignored.
pub fn parse_identify_output(stdout: &str) -> Result<Vec<FrameInfo>, ExecError> {
    let frames = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_frame)
        .collect::<Result<Vec<_>, _>>()?;
    if frames.is_empty() {
        return Err(parse_error("no frames reported"));
    }
    Ok(frames)
}

fn parse_frame(line: &str) -> Result<FrameInfo, ExecError> {
    let mut format = None;
    let mut width = None;
    let mut height = None;
    let mut exif_orientation = None;

    for item in line.split('|') {
        let Some((key, value)) = item.split_once(':') else {
            return Err(parse_error(format!("malformed item {item:?} in {line:?}")));
        };
        let value = value.trim();
        match key.trim() {
            "format" => format = Some(value.to_ascii_lowercase()),
            "width" => width = Some(parse_dimension("width", value)?),
            "height" => height = Some(parse_dimension("height", value)?),
            "exif_orientation" => exif_orientation = value.parse::<u16>().ok(),
            // Tools may append extra keys; they are not needed here.
            _ => {}
        }
    }

    Ok(FrameInfo {
        format: format.ok_or_else(|| parse_error(format!("missing format in {line:?}")))?,
        width: width.ok_or_else(|| parse_error(format!("missing width in {line:?}")))?,
        height: height.ok_or_else(|| parse_error(format!("missing height in {line:?}")))?,
        exif_orientation,
    })
}

fn parse_dimension(key: &str, value: &str) -> Result<u32, ExecError> {
    value
        .parse()
        .map_err(|_| parse_error(format!("{key} is not a number: {value:?}")))
}

fn parse_error(reason: impl Into<String>) -> ExecError {
    ExecError::OutputParse {
        tool: "identify",
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_frame() {
        let frames = parse_identify_output("format:PNG|width:40|height:20|exif_orientation:\n").unwrap();
        assert_eq!(
            frames,
            vec![FrameInfo {
                format: "png".into(),
                width: 40,
                height: 20,
                exif_orientation: None,
            }]
        );
    }

    #[test]
    fn parses_every_frame() {
        let out = "format:GIF|width:10|height:12|exif_orientation:\n\
                   format:GIF|width:8|height:6|exif_orientation:\n\
                   format:GIF|width:4|height:4|exif_orientation:\n";
        let frames = parse_identify_output(out).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!((frames[1].width, frames[1].height), (8, 6));
    }

    #[test]
    fn reads_exif_orientation() {
        let frames =
            parse_identify_output("format:JPEG|width:4000|height:3000|exif_orientation:6").unwrap();
        assert_eq!(frames[0].exif_orientation, Some(6));
        let frames =
            parse_identify_output("format:JPEG|width:1|height:1|exif_orientation:unknown").unwrap();
        assert_eq!(frames[0].exif_orientation, None);
    }

    #[test]
    fn ignores_unknown_keys() {
        let frames = parse_identify_output("format:SVG|width:5|height:7|colorspace:sRGB").unwrap();
        assert_eq!(frames[0].format, "svg");
        assert_eq!(frames[0].exif_orientation, None);
    }

    #[test]
    fn missing_dimensions_are_errors() {
        let err = parse_identify_output("format:PNG|height:20").unwrap_err();
        assert!(err.to_string().contains("missing width"));
        assert!(matches!(err, ExecError::OutputParse { tool: "identify", .. }));
    }

    #[test]
    fn non_numeric_dimensions_are_errors() {
        let err = parse_identify_output("format:PNG|width:wide|height:20").unwrap_err();
        assert!(err.to_string().contains("width is not a number"));
    }

    #[test]
    fn malformed_items_are_errors() {
        assert!(parse_identify_output("identify: unable to open image").is_err());
        assert!(parse_identify_output("format:PNG|40x20").is_err());
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(parse_identify_output("").is_err());
        assert!(parse_identify_output("\n\n").is_err());
    }

    #[test]
    fn image_info_uses_first_frame() {
        let frames = parse_identify_output(
            "format:GIF|width:10|height:12|exif_orientation:\nformat:GIF|width:8|height:6|exif_orientation:",
        )
        .unwrap();
        let info = ImageInfo::from_frames("/tmp/anim.gif".into(), frames).unwrap();
        assert_eq!((info.width, info.height), (10, 12));
        assert_eq!(info.frame_count(), 2);
        assert!(info.is_supported());
    }

    #[test]
    fn supported_formats() {
        assert!(is_supported_format("JPEG"));
        assert!(is_supported_format("jpg"));
        assert!(!is_supported_format("tiff"));
        assert!(!is_supported_format("webp"));
    }

    #[test]
    fn serializes_without_missing_orientation() {
        let info = ImageInfo::from_frames(
            "a.png".into(),
            vec![FrameInfo {
                format: "png".into(),
                width: 1,
                height: 2,
                exif_orientation: None,
            }],
        )
        .unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["width"], 1);
        assert!(json.get("exif_orientation").is_none());
        assert_eq!(json["frames"][0]["format"], "png");
    }
}
