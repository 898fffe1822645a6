//! Calibration library
//!
//! Panels ship with a folder of LUTs and calibration images, one per
//! wavelength, named after the panel serial:
//!
//! ```text
//! slm7070_at405_P16.lut    LUT for panel 7070 at 405 nm
//! slm7070_at532_P16.lut
//! slm7070_at532_WFC.bmp    wavefront correction at 532 nm
//! linear.lut               no serial or wavelength
//! ```
//!
//! [`CalibrationLibrary::scan`] lists the folder (not recursive) and parses
//! what it can from each name.

use std::path::{Path, PathBuf};

use serde::Serialize;
use slm_hal::CalType;
use walkdir::WalkDir;

use crate::error::{Result, SlmError};

const LUT_EXTENSIONS: &[&str] = &["lut", "txt"];
const IMAGE_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "bmp"];

/// What a library file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Text LUT.
    Lut,
    /// Calibration image; the type is known when the name says `nuc` or `wfc`.
    Calibration(Option<CalType>),
}

/// One file found by [`CalibrationLibrary::scan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    /// Lower-cased file stem.
    pub name: String,
    /// Full path.
    pub path: PathBuf,
    /// LUT or image.
    pub kind: EntryKind,
    /// Panel serial from an `slm<serial>_...` name.
    pub serial: Option<u32>,
    /// Wavelength in nm from an `..._at<nm>` name.
    pub wavelength_nm: Option<u32>,
}

/// Files in one calibration folder, sorted by name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CalibrationLibrary {
    entries: Vec<LibraryEntry>,
}

impl CalibrationLibrary {
    /// List LUTs and calibration images directly inside `dir`.
    ///
    /// # Errors
    ///
    /// [`SlmError::Io`] when `dir` cannot be read.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| SlmError::Io {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(parsed) = parse_entry(entry.path()) {
                entries.push(parsed);
            }
        }
        tracing::debug!(dir = %dir.display(), files = entries.len(), "calibration library scanned");
        Ok(Self { entries })
    }

    /// Every entry, sorted by file name.
    #[must_use]
    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    /// Entry whose stem equals `name`, ignoring case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&LibraryEntry> {
        let name = name.to_ascii_lowercase();
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// LUT with the wavelength closest to `nm`.
    #[must_use]
    pub fn nearest_lut(&self, nm: u32) -> Option<&LibraryEntry> {
        self.nearest(nm, |kind| kind == EntryKind::Lut)
    }

    /// Calibration image of type `cal` with the wavelength closest to `nm`.
    #[must_use]
    pub fn nearest_calibration(&self, cal: CalType, nm: u32) -> Option<&LibraryEntry> {
        self.nearest(nm, |kind| kind == EntryKind::Calibration(Some(cal)))
    }

    fn nearest(&self, nm: u32, wanted: impl Fn(EntryKind) -> bool) -> Option<&LibraryEntry> {
        self.entries
            .iter()
            .filter(|entry| wanted(entry.kind))
            .filter_map(|entry| entry.wavelength_nm.map(|w| (w.abs_diff(nm), entry)))
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, entry)| entry)
    }
}

fn parse_entry(path: &Path) -> Option<LibraryEntry> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let name = path.file_stem()?.to_str()?.to_ascii_lowercase();
    let kind = if LUT_EXTENSIONS.contains(&extension.as_str()) {
        EntryKind::Lut
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        EntryKind::Calibration(cal_type_from_name(&name))
    } else {
        return None;
    };
    let (serial, wavelength_nm) = parse_name(&name);
    Some(LibraryEntry {
        name,
        path: path.to_path_buf(),
        kind,
        serial,
        wavelength_nm,
    })
}

/// `slm<serial>_at<nm>[_suffix]`. Either part may be missing.
fn parse_name(name: &str) -> (Option<u32>, Option<u32>) {
    let mut serial = None;
    let mut wavelength = None;
    for part in name.split('_') {
        if let Some(digits) = part.strip_prefix("slm") {
            serial = serial.or_else(|| parse_digits(digits));
        } else if let Some(digits) = part.strip_prefix("at") {
            wavelength = wavelength.or_else(|| parse_digits(digits));
        }
    }
    (serial, wavelength)
}

/// 2 to 4 ASCII digits.
fn parse_digits(digits: &str) -> Option<u32> {
    if (2..=4).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

fn cal_type_from_name(name: &str) -> Option<CalType> {
    name.split('_').find_map(|part| match part {
        "nuc" => Some(CalType::Nuc),
        "wfc" => Some(CalType::Wfc),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serial_and_wavelength_are_parsed() {
        assert_eq!(parse_name("slm7070_at532_p16"), (Some(7070), Some(532)));
        assert_eq!(parse_name("slm512_at1064"), (Some(512), Some(1064)));
        assert_eq!(parse_name("linear"), (None, None));
    }

    #[test]
    fn digit_runs_outside_two_to_four_are_ignored() {
        assert_eq!(parse_name("slm1_at12345"), (None, None));
        assert_eq!(parse_name("slm70x0_at532"), (None, Some(532)));
    }

    #[test]
    fn calibration_type_comes_from_name_parts() {
        assert_eq!(cal_type_from_name("slm7070_at532_wfc"), Some(CalType::Wfc));
        assert_eq!(cal_type_from_name("slm7070_at532_nuc"), Some(CalType::Nuc));
        assert_eq!(cal_type_from_name("slm7070_wfcx"), None);
    }

    #[test]
    fn unknown_extensions_are_skipped() {
        assert!(parse_entry(Path::new("notes.md")).is_none());
        assert!(parse_entry(Path::new("README")).is_none());
        let entry = parse_entry(Path::new("dir/SLM7070_AT405_P16.LUT")).unwrap();
        assert_eq!(entry.name, "slm7070_at405_p16");
        assert_eq!(entry.kind, EntryKind::Lut);
    }
}
