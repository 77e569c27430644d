//! Readers for the LCLS XPP smalldata layout.
//!
//! XPP smalldata files carry the Jungfrau 1M image stack at
//! `/jungfrau1M/image_img` and the scan encoder channels under `/lmc/`.
//! Encoder values are recorded in micrometers.
use std::path::Path;

use ndarray::Array1;

use super::error::{DiffractionError, PositionError};
use super::frame_stack::FrameSource;
use super::plugins::{DiffractionReader, PositionReader};
use super::positions::{read_channel, ScanPositions};

pub const XPP_PLUGIN_NAME: &str = "LCLS_XPP";
pub const XPP_DIFFRACTION_DATASET: &str = "/jungfrau1M/image_img";
pub const XPP_POSITION_X_CHANNEL: &str = "/lmc/ch03";
pub const XPP_POSITION_Y_CHANNEL: &str = "/lmc/ch04";

const MICRONS_TO_METERS: f64 = 1.0e-6;

pub struct XppDiffractionReader;

impl DiffractionReader for XppDiffractionReader {
    fn name(&self) -> &'static str {
        XPP_PLUGIN_NAME
    }

    fn default_dataset_path(&self) -> &'static str {
        XPP_DIFFRACTION_DATASET
    }

    fn open_stack(
        &self,
        path: &Path,
        dataset_path: Option<&str>,
    ) -> Result<FrameSource, DiffractionError> {
        FrameSource::open(path, dataset_path.unwrap_or(XPP_DIFFRACTION_DATASET))
    }
}

pub struct XppPositionReader;

impl PositionReader for XppPositionReader {
    fn name(&self) -> &'static str {
        XPP_PLUGIN_NAME
    }

    fn read_positions(&self, path: &Path) -> Result<ScanPositions, PositionError> {
        if !path.exists() {
            return Err(PositionError::BadFilePath(path.to_path_buf()));
        }
        let file = hdf5::File::open(path)?;
        let x_um = read_channel(&file, XPP_POSITION_X_CHANNEL, path)?;
        let y_um = read_channel(&file, XPP_POSITION_Y_CHANNEL, path)?;
        ScanPositions::new(microns_to_meters(&x_um), microns_to_meters(&y_um))
    }
}

fn microns_to_meters(values: &Array1<f64>) -> Array1<f64> {
    values * MICRONS_TO_METERS
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_encoder_scaling() {
        let meters = microns_to_meters(&array![0.0, 1.0, -2.5]);
        let expected = [0.0, 1.0e-6, -2.5e-6];
        for (value, want) in meters.iter().zip(expected) {
            assert!((value - want).abs() < 1e-15);
        }
    }

    #[test]
    fn test_missing_file_rejected() {
        let reader = XppPositionReader;
        match reader.read_positions(Path::new("/nonexistent/run.h5")) {
            Err(PositionError::BadFilePath(_)) => (),
            other => panic!("expected BadFilePath, got {other:?}"),
        }
    }
}
