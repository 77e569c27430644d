use hdf5::types::VarLenUnicode;
use hdf5::File;
use ndarray::Array2;
use std::path::Path;
use std::str::FromStr;

use super::error::ProductError;
use super::initial_guess::ComplexGuess;
use super::positions::ScanPositions;
use super::settings::CropWindow;

const PATTERNS_NAME: &str = "patterns";
const POSITIONS_NAME: &str = "positions";
const PROBE_NAME: &str = "probe";
const OBJECT_NAME: &str = "object";
/// This is the version of the output format
const FORMAT_VERSION: &str = "1.0";

/// Metadata attributes stamped on the product file root
#[derive(Debug, Clone)]
pub struct ProductMetadata {
    pub product_name: String,
    pub probe_energy_ev: f64,
    pub detector_distance_m: f64,
    pub detector_pixel_size_m: f64,
    pub wavelength_m: f64,
}

fn varlen(value: &str) -> Result<VarLenUnicode, ProductError> {
    VarLenUnicode::from_str(value).map_err(|_| ProductError::InvalidString(value.to_string()))
}

fn format_version() -> String {
    format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION)
}

/// Writes the cropped diffraction stack to diffraction.h5.
// Structure
// diffraction.h5 - version, created_unix
// |---- patterns(dset, (frames, rows, cols) f32) - crop_center_x, crop_center_y,
//       crop_extent_x, crop_extent_y, frame_count
#[derive(Debug)]
pub struct DiffractionFileWriter {
    file_handle: File,
    dataset: hdf5::Dataset,
    cursor: usize,
}

impl DiffractionFileWriter {
    /// Create the writer, opening the file and preallocating the chunked
    /// pattern stack
    pub fn new(
        path: &Path,
        frames: usize,
        window: &CropWindow,
    ) -> Result<Self, ProductError> {
        let file_handle = File::create(path)?;
        file_handle
            .new_attr::<VarLenUnicode>()
            .create("version")?
            .write_scalar(&varlen(&format_version())?)?;
        file_handle
            .new_attr::<i64>()
            .create("created_unix")?
            .write_scalar(&time::OffsetDateTime::now_utc().unix_timestamp())?;

        let dataset = file_handle
            .new_dataset::<f32>()
            .shape((frames, window.rows, window.cols))
            .chunk((1, window.rows, window.cols))
            .create(PATTERNS_NAME)?;
        dataset
            .new_attr::<u64>()
            .create("crop_center_x")?
            .write_scalar(&((window.col0 + window.cols / 2) as u64))?;
        dataset
            .new_attr::<u64>()
            .create("crop_center_y")?
            .write_scalar(&((window.row0 + window.rows / 2) as u64))?;
        dataset
            .new_attr::<u64>()
            .create("crop_extent_x")?
            .write_scalar(&(window.cols as u64))?;
        dataset
            .new_attr::<u64>()
            .create("crop_extent_y")?
            .write_scalar(&(window.rows as u64))?;

        Ok(Self {
            file_handle,
            dataset,
            cursor: 0,
        })
    }

    /// Append one cropped frame to the stack
    pub fn write_frame(&mut self, frame: &Array2<f32>) -> Result<(), ProductError> {
        self.dataset
            .write_slice(frame, ndarray::s![self.cursor, .., ..])?;
        self.cursor += 1;
        Ok(())
    }

    /// Write the frame counter, consume the writer
    pub fn close(self) -> Result<(), ProductError> {
        self.dataset
            .new_attr::<u64>()
            .create("frame_count")?
            .write_scalar(&(self.cursor as u64))?;
        log::info!("{} diffraction patterns written.", self.cursor);
        drop(self.file_handle);
        Ok(())
    }
}

/// Writes the Ptychodus product input file.
// Structure
// product-in.h5 - name, version, created_unix, probe_energy_eV,
//                 detector_distance_m, detector_pixel_size_m, wavelength_m
// |---- positions
// |    |---- x(dset, meters)
// |    |---- y(dset, meters)
// |---- probe - pixel_height_m, pixel_width_m
// |    |---- real(dset)
// |    |---- imag(dset)
// |---- object - pixel_height_m, pixel_width_m
// |    |---- real(dset)
// |    |---- imag(dset)
#[derive(Debug)]
pub struct ProductFileWriter {
    file_handle: File,
}

impl ProductFileWriter {
    /// Create the writer and stamp the root metadata attributes
    pub fn new(path: &Path, metadata: &ProductMetadata) -> Result<Self, ProductError> {
        let file_handle = File::create(path)?;
        file_handle
            .new_attr::<VarLenUnicode>()
            .create("name")?
            .write_scalar(&varlen(&metadata.product_name)?)?;
        file_handle
            .new_attr::<VarLenUnicode>()
            .create("version")?
            .write_scalar(&varlen(&format_version())?)?;
        file_handle
            .new_attr::<i64>()
            .create("created_unix")?
            .write_scalar(&time::OffsetDateTime::now_utc().unix_timestamp())?;
        file_handle
            .new_attr::<f64>()
            .create("probe_energy_eV")?
            .write_scalar(&metadata.probe_energy_ev)?;
        file_handle
            .new_attr::<f64>()
            .create("detector_distance_m")?
            .write_scalar(&metadata.detector_distance_m)?;
        file_handle
            .new_attr::<f64>()
            .create("detector_pixel_size_m")?
            .write_scalar(&metadata.detector_pixel_size_m)?;
        file_handle
            .new_attr::<f64>()
            .create("wavelength_m")?
            .write_scalar(&metadata.wavelength_m)?;
        Ok(Self { file_handle })
    }

    pub fn write_positions(&self, positions: &ScanPositions) -> Result<(), ProductError> {
        let group = self.file_handle.create_group(POSITIONS_NAME)?;
        group
            .new_dataset_builder()
            .with_data(positions.x_m())
            .create("x")?;
        group
            .new_dataset_builder()
            .with_data(positions.y_m())
            .create("y")?;
        group
            .new_attr::<u64>()
            .create("count")?
            .write_scalar(&(positions.len() as u64))?;
        Ok(())
    }

    pub fn write_probe(&self, probe: &ComplexGuess) -> Result<(), ProductError> {
        self.write_complex_group(PROBE_NAME, probe)
    }

    pub fn write_object(&self, object: &ComplexGuess) -> Result<(), ProductError> {
        self.write_complex_group(OBJECT_NAME, object)
    }

    fn write_complex_group(&self, name: &str, guess: &ComplexGuess) -> Result<(), ProductError> {
        let group = self.file_handle.create_group(name)?;
        group
            .new_dataset_builder()
            .with_data(&guess.real)
            .create("real")?;
        group
            .new_dataset_builder()
            .with_data(&guess.imag)
            .create("imag")?;
        group
            .new_attr::<f64>()
            .create("pixel_height_m")?
            .write_scalar(&guess.pixel_height_m)?;
        group
            .new_attr::<f64>()
            .create("pixel_width_m")?
            .write_scalar(&guess.pixel_width_m)?;
        Ok(())
    }

    /// Consume the writer, closing the file
    pub fn close(self) -> Result<(), ProductError> {
        drop(self.file_handle);
        Ok(())
    }
}
