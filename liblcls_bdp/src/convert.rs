use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::constants::{DIFFRACTION_FILE_NAME, PRODUCT_FILE_NAME, SETTINGS_FILE_NAME};
use super::error::{ConverterError, SettingsError};
use super::frame_stack::{crop_frame, CroppedStack};
use super::initial_guess::{self, GuessGeometry};
use super::plugins::PluginRegistry;
use super::product_writer::{DiffractionFileWriter, ProductFileWriter, ProductMetadata};
use super::settings::{MetadataOverrides, Settings};
use super::worker_status::{BarColor, ConversionStage, WorkerStatus};

/// Everything one conversion run needs from the caller
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub settings_path: PathBuf,
    pub diffraction_input: PathBuf,
    pub position_input: PathBuf,
    pub product_name: String,
    pub output_dir: PathBuf,
    pub overrides: MetadataOverrides,
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub frames: usize,
    pub positions: usize,
    pub diffraction_file: PathBuf,
    pub product_file: PathBuf,
    pub settings_file: PathBuf,
}

fn require_regular_file(path: &Path) -> Result<(), ConverterError> {
    if !path.exists() {
        Err(ConverterError::MissingInput(path.to_path_buf()))
    } else if !path.is_file() {
        Err(ConverterError::NotAFile(path.to_path_buf()))
    } else {
        Ok(())
    }
}

/// The main loop of lcls-bdp.
///
/// This takes in a request (and progress channel) and performs one
/// conversion run: settings, positions, cropped diffraction stack, then the
/// three output artifacts.
pub fn convert(
    request: &ConversionRequest,
    registry: &PluginRegistry,
    tx: &Sender<WorkerStatus>,
) -> Result<ConversionSummary, ConverterError> {
    let mut settings = Settings::read_settings_file(&request.settings_path)?;
    settings.apply_overrides(&request.overrides);
    let window = settings.crop_window()?;

    let diffraction_reader = registry.diffraction_reader(&settings.diffraction.file_type)?;
    let position_reader = registry.position_reader(&settings.positions.file_type)?;

    require_regular_file(&request.diffraction_input)?;
    require_regular_file(&request.position_input)?;
    std::fs::create_dir_all(&request.output_dir)?;

    // Positions first; they are cheap and fail fast on layout mismatches
    tx.send(WorkerStatus::new(
        0.0,
        ConversionStage::Positions,
        BarColor::GREEN,
    ))?;
    let positions = position_reader.read_positions(&request.position_input)?;
    log::info!("Read {} scan positions.", positions.len());
    tx.send(WorkerStatus::new(
        1.0,
        ConversionStage::Positions,
        BarColor::GREEN,
    ))?;

    let source = diffraction_reader.open_stack(
        &request.diffraction_input,
        settings.diffraction.dataset_path.as_deref(),
    )?;
    log::info!(
        "Diffraction stack {} ({} frames): {}",
        source.dataset_path(),
        source.frame_count(),
        human_bytes::human_bytes(source.size_bytes() as f64)
    );
    if positions.len() != source.frame_count() {
        log::warn!(
            "Positions and diffraction do not agree on the number of exposures! Found {} positions, while the stack holds {} frames.",
            positions.len(),
            source.frame_count()
        );
    }
    if !window.fits(source.rows(), source.cols()) {
        return Err(ConverterError::SettingsError(SettingsError::CropOutOfBounds(
            settings.diffraction.crop_center_x,
            settings.diffraction.crop_center_y,
            settings.diffraction.crop_extent_x,
            settings.diffraction.crop_extent_y,
            source.rows(),
            source.cols(),
        )));
    }

    let mut stack = if settings.diffraction.memmap_enabled {
        let scratch_dir = settings
            .diffraction
            .scratch_directory
            .clone()
            .unwrap_or_else(|| request.output_dir.clone());
        log::info!(
            "Staging cropped frames in {}",
            scratch_dir.to_string_lossy()
        );
        CroppedStack::scratch(&scratch_dir, &request.product_name, window.rows, window.cols)?
    } else {
        CroppedStack::in_memory(source.frame_count(), window.rows, window.cols)
    };

    log::info!("Cropping diffraction patterns...");
    tx.send(WorkerStatus::new(
        0.0,
        ConversionStage::Cropping,
        BarColor::CYAN,
    ))?;
    let flush_frac: f32 = 0.01;
    let flush_every = (source.frame_count() / 100).max(1);
    let mut count = 0;
    let mut progress: f32 = 0.0;
    for index in 0..source.frame_count() {
        let frame = source.read_frame(index)?;
        stack.push_frame(&crop_frame(&frame, &window))?;
        count += 1;
        if count >= flush_every {
            count = 0;
            progress += flush_frac;
            tx.send(WorkerStatus::new(
                progress,
                ConversionStage::Cropping,
                BarColor::CYAN,
            ))?;
        }
    }
    tx.send(WorkerStatus::new(
        1.0,
        ConversionStage::Cropping,
        BarColor::CYAN,
    ))?;
    log::info!("Done with cropping.");

    tx.send(WorkerStatus::new(
        0.0,
        ConversionStage::Product,
        BarColor::MAGENTA,
    ))?;
    let frames = stack.len();
    let mean_pattern = stack.mean_pattern();

    let diffraction_file = request.output_dir.join(DIFFRACTION_FILE_NAME);
    let mut writer = DiffractionFileWriter::new(&diffraction_file, frames, &window)?;
    let mut reader = stack.into_reader()?;
    while let Some(frame) = reader.next_frame()? {
        writer.write_frame(&frame)?;
    }
    reader.finish()?;
    writer.close()?;
    tx.send(WorkerStatus::new(
        0.5,
        ConversionStage::Product,
        BarColor::MAGENTA,
    ))?;

    let geometry = GuessGeometry {
        wavelength_m: initial_guess::wavelength_m(settings.probe_energy_ev()),
        detector_distance_m: settings.detector_distance_m(),
        detector_pixel_size_m: settings.detector_pixel_size_m(),
    };
    let probe = initial_guess::probe_guess(window.rows, window.cols, &mean_pattern, &geometry);
    let object = initial_guess::object_guess(&positions, &probe);

    let product_file = request.output_dir.join(PRODUCT_FILE_NAME);
    let metadata = ProductMetadata {
        product_name: request.product_name.clone(),
        probe_energy_ev: settings.probe_energy_ev(),
        detector_distance_m: settings.detector_distance_m(),
        detector_pixel_size_m: settings.detector_pixel_size_m(),
        wavelength_m: geometry.wavelength_m,
    };
    let product = ProductFileWriter::new(&product_file, &metadata)?;
    product.write_positions(&positions)?;
    product.write_probe(&probe)?;
    product.write_object(&object)?;
    product.close()?;

    let settings_file = request.output_dir.join(SETTINGS_FILE_NAME);
    settings.write_settings_file(&settings_file)?;
    tx.send(WorkerStatus::new(
        1.0,
        ConversionStage::Product,
        BarColor::MAGENTA,
    ))?;

    log::info!(
        "Product {} written to {}.",
        request.product_name,
        request.output_dir.to_string_lossy()
    );

    Ok(ConversionSummary {
        frames,
        positions: positions.len(),
        diffraction_file,
        product_file,
        settings_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_regular_file() {
        match require_regular_file(Path::new("/nonexistent/input.h5")) {
            Err(ConverterError::MissingInput(_)) => (),
            other => panic!("expected MissingInput, got {other:?}"),
        }
        let dir = std::env::temp_dir();
        match require_regular_file(&dir) {
            Err(ConverterError::NotAFile(_)) => (),
            other => panic!("expected NotAFile, got {other:?}"),
        }
    }
}
