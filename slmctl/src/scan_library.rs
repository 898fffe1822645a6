//! Calibration folder listing.
//!
//! Prints every LUT and calibration image with the serial and wavelength
//! parsed from its name, then, when a wavelength is given, the entries a
//! session would pick for it.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use slm_core::{CalibrationLibrary, EntryKind, LibraryEntry};
use slm_hal::CalType;

pub fn run(dir: &Path, wavelength: Option<u32>) -> Result<()> {
    println!("{}", format!("🔍 Scanning {}...", dir.display()).cyan().bold());
    let library = CalibrationLibrary::scan(dir)
        .with_context(|| format!("scanning calibration folder {}", dir.display()))?;

    for entry in library.entries() {
        println!("  {}", describe(entry));
    }
    println!(
        "{}",
        format!("✓ {} file(s)", library.entries().len()).green().bold()
    );

    if let Some(nm) = wavelength {
        for (label, pick) in nearest(&library, nm) {
            match pick {
                Some(entry) => println!("  {label} @ {nm} nm: {}", entry.path.display()),
                None => println!("  {}", format!("⚠ no {label} for {nm} nm").yellow()),
            }
        }
    }
    Ok(())
}

/// Nearest LUT, NUC and WFC for `nm`.
pub(crate) fn nearest(library: &CalibrationLibrary, nm: u32) -> [(&'static str, Option<&LibraryEntry>); 3] {
    [
        ("LUT", library.nearest_lut(nm)),
        ("NUC", library.nearest_calibration(CalType::Nuc, nm)),
        ("WFC", library.nearest_calibration(CalType::Wfc, nm)),
    ]
}

pub(crate) fn describe(entry: &LibraryEntry) -> String {
    let kind = match entry.kind {
        EntryKind::Lut => "LUT".to_owned(),
        EntryKind::Calibration(Some(cal)) => cal.to_string(),
        EntryKind::Calibration(None) => "image".to_owned(),
    };
    let serial = entry
        .serial
        .map_or_else(|| "-".to_owned(), |s| format!("slm{s}"));
    let wavelength = entry
        .wavelength_nm
        .map_or_else(|| "-".to_owned(), |nm| format!("{nm} nm"));
    format!("{:<6} {:<10} {:<8} {}", kind, serial, wavelength, entry.name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_fake_library(dir: &TempDir) {
        for name in [
            "slm7070_at405_P16.lut",
            "slm7070_at532_P16.lut",
            "slm7070_at532_WFC.bmp",
            "linear.lut",
            "notes.md",
        ] {
            fs::write(dir.path().join(name), b"FAKE").unwrap();
        }
    }

    #[test]
    fn describes_parsed_fields() {
        let tmp = TempDir::new().unwrap();
        create_fake_library(&tmp);
        let library = CalibrationLibrary::scan(tmp.path()).unwrap();
        let lines: Vec<String> = library.entries().iter().map(describe).collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("LUT"), "{}", lines[0]);
        assert!(lines[0].ends_with("linear"), "{}", lines[0]);
        assert!(lines[3].starts_with("WFC"), "{}", lines[3]);
        assert!(lines[3].contains("slm7070"), "{}", lines[3]);
        assert!(lines[3].contains("532 nm"), "{}", lines[3]);
    }

    #[test]
    fn picks_nearest_per_kind() {
        let tmp = TempDir::new().unwrap();
        create_fake_library(&tmp);
        let library = CalibrationLibrary::scan(tmp.path()).unwrap();
        let [lut, nuc, wfc] = nearest(&library, 450);

        assert_eq!(lut.1.unwrap().name, "slm7070_at405_p16");
        assert!(nuc.1.is_none());
        assert_eq!(wfc.1.unwrap().name, "slm7070_at532_wfc");
    }

    #[test]
    fn missing_folder_fails() {
        assert!(run(Path::new("/nonexistent/calibration"), None).is_err());
    }
}
