use std::path::{Path, PathBuf};

use super::constants::{
    DEFAULT_CROP_EXTENT, DETECTOR_COLS, DETECTOR_PIXEL_SIZE_M, DETECTOR_ROWS,
};
use super::error::SettingsError;
use super::ini::IniDocument;

const DIFFRACTION_SECTION: &str = "Diffraction";
const POSITIONS_SECTION: &str = "ProbePositions";
// Older settings documents use [Scan] for the position section
const POSITIONS_SECTION_ALIAS: &str = "Scan";
const METADATA_SECTION: &str = "Metadata";

/// Structure representing the settings document for a conversion run.
/// Settings are serializable to and deserializable from the INI format
/// consumed by the beamline tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub diffraction: DiffractionSettings,
    pub positions: PositionSettings,
    pub metadata: MetadataSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffractionSettings {
    /// Name of the diffraction-reader plugin to use
    pub file_type: String,
    /// Internal HDF5 dataset path; None selects the plugin default
    pub dataset_path: Option<String>,
    pub crop_center_x: usize,
    pub crop_center_y: usize,
    pub crop_extent_x: usize,
    pub crop_extent_y: usize,
    /// Stage the cropped stack through a scratch file instead of RAM
    pub memmap_enabled: bool,
    pub scratch_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSettings {
    /// Name of the position-reader plugin to use
    pub file_type: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataSettings {
    pub probe_energy_ev: Option<f64>,
    pub detector_distance_m: Option<f64>,
}

/// Metadata values supplied on the command line; they win over the
/// settings document.
#[derive(Debug, Clone, Default)]
pub struct MetadataOverrides {
    pub probe_energy_ev: Option<f64>,
    pub detector_distance_m: Option<f64>,
}

impl Default for Settings {
    /// A usable template: XPP readers, detector-centered crop window
    fn default() -> Self {
        Self {
            diffraction: DiffractionSettings {
                file_type: String::from("LCLS_XPP"),
                dataset_path: None,
                crop_center_x: DETECTOR_COLS / 2,
                crop_center_y: DETECTOR_ROWS / 2,
                crop_extent_x: DEFAULT_CROP_EXTENT,
                crop_extent_y: DEFAULT_CROP_EXTENT,
                memmap_enabled: false,
                scratch_directory: None,
            },
            positions: PositionSettings {
                file_type: String::from("LCLS_XPP"),
            },
            metadata: MetadataSettings::default(),
        }
    }
}

impl Settings {
    /// Read the settings document from an INI file
    pub fn read_settings_file(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::BadFilePath(path.to_path_buf()));
        }
        let doc = IniDocument::read_file(path)?;
        Self::from_document(&doc)
    }

    /// Map an INI document onto typed settings. Unknown sections and keys
    /// are ignored, matching the tolerance of the upstream tooling.
    pub fn from_document(doc: &IniDocument) -> Result<Self, SettingsError> {
        let mut settings = Settings::default();
        let diff = &mut settings.diffraction;

        if let Some(value) = doc.get(DIFFRACTION_SECTION, "FileType") {
            diff.file_type = value.to_string();
        }
        if let Some(value) = doc.get(DIFFRACTION_SECTION, "DatasetPath") {
            if !value.is_empty() {
                diff.dataset_path = Some(value.to_string());
            }
        }
        if let Some(value) = doc.get(DIFFRACTION_SECTION, "CropCenterX") {
            diff.crop_center_x = parse_usize(DIFFRACTION_SECTION, "CropCenterX", value)?;
        }
        if let Some(value) = doc.get(DIFFRACTION_SECTION, "CropCenterY") {
            diff.crop_center_y = parse_usize(DIFFRACTION_SECTION, "CropCenterY", value)?;
        }
        if let Some(value) = doc.get(DIFFRACTION_SECTION, "CropExtentX") {
            diff.crop_extent_x = parse_usize(DIFFRACTION_SECTION, "CropExtentX", value)?;
        }
        if let Some(value) = doc.get(DIFFRACTION_SECTION, "CropExtentY") {
            diff.crop_extent_y = parse_usize(DIFFRACTION_SECTION, "CropExtentY", value)?;
        }
        if let Some(value) = doc.get(DIFFRACTION_SECTION, "MemmapEnabled") {
            diff.memmap_enabled = parse_bool(DIFFRACTION_SECTION, "MemmapEnabled", value)?;
        }
        if let Some(value) = doc.get(DIFFRACTION_SECTION, "ScratchDirectory") {
            if !value.is_empty() {
                diff.scratch_directory = Some(PathBuf::from(value));
            }
        }

        let position_section = if doc.section(POSITIONS_SECTION).is_some() {
            POSITIONS_SECTION
        } else {
            POSITIONS_SECTION_ALIAS
        };
        if let Some(value) = doc.get(position_section, "FileType") {
            settings.positions.file_type = value.to_string();
        }

        if let Some(value) = doc.get(METADATA_SECTION, "ProbeEnergyInElectronVolts") {
            settings.metadata.probe_energy_ev =
                Some(parse_f64(METADATA_SECTION, "ProbeEnergyInElectronVolts", value)?);
        }
        if let Some(value) = doc.get(METADATA_SECTION, "DetectorDistanceInMeters") {
            settings.metadata.detector_distance_m =
                Some(parse_f64(METADATA_SECTION, "DetectorDistanceInMeters", value)?);
        }

        Ok(settings)
    }

    /// Serialize the settings back to an INI document. Optional keys are
    /// omitted when unset so the round trip stays clean.
    pub fn to_document(&self) -> IniDocument {
        let mut doc = IniDocument::default();
        let diff = doc.section_mut(DIFFRACTION_SECTION);
        diff.set("FileType", &self.diffraction.file_type);
        if let Some(dataset) = &self.diffraction.dataset_path {
            diff.set("DatasetPath", dataset);
        }
        diff.set("CropCenterX", &self.diffraction.crop_center_x.to_string());
        diff.set("CropCenterY", &self.diffraction.crop_center_y.to_string());
        diff.set("CropExtentX", &self.diffraction.crop_extent_x.to_string());
        diff.set("CropExtentY", &self.diffraction.crop_extent_y.to_string());
        diff.set(
            "MemmapEnabled",
            if self.diffraction.memmap_enabled {
                "True"
            } else {
                "False"
            },
        );
        if let Some(scratch) = &self.diffraction.scratch_directory {
            diff.set("ScratchDirectory", &scratch.to_string_lossy());
        }

        doc.section_mut(POSITIONS_SECTION)
            .set("FileType", &self.positions.file_type);

        if let Some(energy) = self.metadata.probe_energy_ev {
            doc.section_mut(METADATA_SECTION)
                .set("ProbeEnergyInElectronVolts", &energy.to_string());
        }
        if let Some(distance) = self.metadata.detector_distance_m {
            doc.section_mut(METADATA_SECTION)
                .set("DetectorDistanceInMeters", &distance.to_string());
        }
        doc
    }

    /// Write the effective settings to an INI file
    pub fn write_settings_file(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_document().to_string())?;
        Ok(())
    }

    /// Fold command-line metadata values over the document values
    pub fn apply_overrides(&mut self, overrides: &MetadataOverrides) {
        if let Some(energy) = overrides.probe_energy_ev {
            self.metadata.probe_energy_ev = Some(energy);
        }
        if let Some(distance) = overrides.detector_distance_m {
            self.metadata.detector_distance_m = Some(distance);
        }
    }

    /// Validate the crop geometry against the detector and return the
    /// pixel window
    pub fn crop_window(&self) -> Result<CropWindow, SettingsError> {
        CropWindow::from_center_extent(
            self.diffraction.crop_center_x,
            self.diffraction.crop_center_y,
            self.diffraction.crop_extent_x,
            self.diffraction.crop_extent_y,
            DETECTOR_ROWS,
            DETECTOR_COLS,
        )
    }

    pub fn probe_energy_ev(&self) -> f64 {
        self.metadata
            .probe_energy_ev
            .unwrap_or(super::constants::DEFAULT_PROBE_ENERGY_EV)
    }

    pub fn detector_distance_m(&self) -> f64 {
        self.metadata
            .detector_distance_m
            .unwrap_or(super::constants::DEFAULT_DETECTOR_DISTANCE_M)
    }

    pub fn detector_pixel_size_m(&self) -> f64 {
        DETECTOR_PIXEL_SIZE_M
    }
}

/// A validated pixel window into detector frames.
///
/// Row/column order matches the frame layout: frames are indexed
/// `[row, column]` with CropCenterY/CropExtentY on the row axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub row0: usize,
    pub col0: usize,
    pub rows: usize,
    pub cols: usize,
}

impl CropWindow {
    pub fn from_center_extent(
        center_x: usize,
        center_y: usize,
        extent_x: usize,
        extent_y: usize,
        frame_rows: usize,
        frame_cols: usize,
    ) -> Result<Self, SettingsError> {
        if extent_x == 0 || extent_y == 0 {
            return Err(SettingsError::ZeroCropExtent);
        }
        let col0 = center_x as i64 - (extent_x / 2) as i64;
        let row0 = center_y as i64 - (extent_y / 2) as i64;
        let out_of_bounds = col0 < 0
            || row0 < 0
            || col0 + extent_x as i64 > frame_cols as i64
            || row0 + extent_y as i64 > frame_rows as i64;
        if out_of_bounds {
            return Err(SettingsError::CropOutOfBounds(
                center_x, center_y, extent_x, extent_y, frame_rows, frame_cols,
            ));
        }
        Ok(Self {
            row0: row0 as usize,
            col0: col0 as usize,
            rows: extent_y,
            cols: extent_x,
        })
    }

    /// Check that the window also fits a frame of the given shape (reader
    /// layouts may differ from the nominal detector)
    pub fn fits(&self, frame_rows: usize, frame_cols: usize) -> bool {
        self.row0 + self.rows <= frame_rows && self.col0 + self.cols <= frame_cols
    }
}

fn parse_usize(
    section: &'static str,
    key: &'static str,
    value: &str,
) -> Result<usize, SettingsError> {
    value
        .parse::<usize>()
        .map_err(|_| SettingsError::InvalidValue(section, key, value.to_string()))
}

fn parse_f64(section: &'static str, key: &'static str, value: &str) -> Result<f64, SettingsError> {
    value
        .parse::<f64>()
        .map_err(|_| SettingsError::InvalidValue(section, key, value.to_string()))
}

fn parse_bool(
    section: &'static str,
    key: &'static str,
    value: &str,
) -> Result<bool, SettingsError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(SettingsError::InvalidValue(section, key, value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ini::IniDocument;

    const XPP_TEMPLATE: &str = include_str!("../../templates/lcls_xpp.ini");
    const LCLSV2_TEMPLATE: &str = include_str!("../../templates/lclsv2.ini");

    #[test]
    fn test_xpp_template_parses() {
        let doc = IniDocument::parse(XPP_TEMPLATE).unwrap();
        let settings = Settings::from_document(&doc).unwrap();
        assert_eq!(settings.diffraction.file_type, "LCLS_XPP");
        assert_eq!(settings.positions.file_type, "LCLS_XPP");
        assert_eq!(
            settings.diffraction.dataset_path.as_deref(),
            Some("/jungfrau1M/image_img")
        );
        settings.crop_window().unwrap();
    }

    #[test]
    fn test_lclsv2_template_parses() {
        let doc = IniDocument::parse(LCLSV2_TEMPLATE).unwrap();
        let settings = Settings::from_document(&doc).unwrap();
        assert_eq!(settings.diffraction.file_type, "LCLSv2");
        assert_eq!(settings.positions.file_type, "LCLSv2");
        settings.crop_window().unwrap();
    }

    #[test]
    fn test_template_crops_fit_detector() {
        for template in [XPP_TEMPLATE, LCLSV2_TEMPLATE] {
            let doc = IniDocument::parse(template).unwrap();
            let settings = Settings::from_document(&doc).unwrap();
            assert!(settings.diffraction.crop_extent_x <= DETECTOR_COLS);
            assert!(settings.diffraction.crop_extent_y <= DETECTOR_ROWS);
            assert!(settings.diffraction.crop_center_x < DETECTOR_COLS);
            assert!(settings.diffraction.crop_center_y < DETECTOR_ROWS);
        }
    }

    #[test]
    fn test_round_trip_stable() {
        let doc = IniDocument::parse(XPP_TEMPLATE).unwrap();
        let settings = Settings::from_document(&doc).unwrap();
        let serialized = settings.to_document().to_string();
        let reparsed = Settings::from_document(&IniDocument::parse(&serialized).unwrap()).unwrap();
        assert_eq!(settings, reparsed);
        assert_eq!(serialized, reparsed.to_document().to_string());
    }

    #[test]
    fn test_scan_section_alias() {
        let doc = IniDocument::parse("[Scan]\nFileType = LCLSv2\n").unwrap();
        let settings = Settings::from_document(&doc).unwrap();
        assert_eq!(settings.positions.file_type, "LCLSv2");
    }

    #[test]
    fn test_overrides_win_over_document() {
        let doc =
            IniDocument::parse("[Metadata]\nProbeEnergyInElectronVolts = 9000.0\n").unwrap();
        let mut settings = Settings::from_document(&doc).unwrap();
        settings.apply_overrides(&MetadataOverrides {
            probe_energy_ev: Some(8800.0),
            detector_distance_m: None,
        });
        assert_eq!(settings.probe_energy_ev(), 8800.0);
        // no value anywhere falls back to the default
        assert_eq!(
            settings.detector_distance_m(),
            crate::constants::DEFAULT_DETECTOR_DISTANCE_M
        );
    }

    #[test]
    fn test_crop_window_math() {
        let window = CropWindow::from_center_extent(515, 532, 512, 512, 1064, 1030).unwrap();
        assert_eq!(window.col0, 515 - 256);
        assert_eq!(window.row0, 532 - 256);
        assert_eq!(window.rows, 512);
        assert_eq!(window.cols, 512);
        assert!(window.fits(1064, 1030));
        assert!(!window.fits(512, 512));
    }

    #[test]
    fn test_crop_window_out_of_bounds() {
        match CropWindow::from_center_extent(10, 532, 512, 512, 1064, 1030) {
            Err(SettingsError::CropOutOfBounds(..)) => (),
            other => panic!("expected CropOutOfBounds, got {other:?}"),
        }
        match CropWindow::from_center_extent(515, 532, 0, 512, 1064, 1030) {
            Err(SettingsError::ZeroCropExtent) => (),
            other => panic!("expected ZeroCropExtent, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_values_rejected() {
        let doc = IniDocument::parse("[Diffraction]\nCropCenterX = twelve\n").unwrap();
        match Settings::from_document(&doc) {
            Err(SettingsError::InvalidValue("Diffraction", "CropCenterX", _)) => (),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
        let doc = IniDocument::parse("[Diffraction]\nMemmapEnabled = maybe\n").unwrap();
        assert!(Settings::from_document(&doc).is_err());
    }
}
