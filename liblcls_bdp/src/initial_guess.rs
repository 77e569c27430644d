//! Initial probe and object guesses for the product file.
//!
//! The product bundles starting estimates for the downstream reconstruction:
//! a circular-aperture probe whose power matches the mean diffraction
//! pattern, and a unit-amplitude object sized to cover the scanned region.
use ndarray::Array2;

use super::constants::HC_EV_M;
use super::positions::ScanPositions;

/// Convert photon energy to wavelength
pub fn wavelength_m(probe_energy_ev: f64) -> f64 {
    HC_EV_M / probe_energy_ev
}

/// A complex-valued guess stored as separate real and imaginary planes,
/// with its object-plane pixel pitch.
#[derive(Debug, Clone)]
pub struct ComplexGuess {
    pub real: Array2<f32>,
    pub imag: Array2<f32>,
    pub pixel_height_m: f64,
    pub pixel_width_m: f64,
}

impl ComplexGuess {
    pub fn rows(&self) -> usize {
        self.real.nrows()
    }

    pub fn cols(&self) -> usize {
        self.real.ncols()
    }

    /// Total power, sum of |value|^2
    pub fn power(&self) -> f64 {
        self.real
            .iter()
            .zip(self.imag.iter())
            .map(|(re, im)| (*re as f64).powi(2) + (*im as f64).powi(2))
            .sum()
    }
}

/// Far-field geometry linking detector pixels to object-plane pixels.
#[derive(Debug, Clone, Copy)]
pub struct GuessGeometry {
    pub wavelength_m: f64,
    pub detector_distance_m: f64,
    pub detector_pixel_size_m: f64,
}

impl GuessGeometry {
    /// Object-plane pixel pitch along an axis sampled by n detector pixels,
    /// lambda * z / (n * pixel)
    pub fn object_pixel_m(&self, n: usize) -> f64 {
        self.wavelength_m * self.detector_distance_m / (n as f64 * self.detector_pixel_size_m)
    }
}

/// Circular-aperture probe at the crop extent, power-matched to the mean
/// diffraction pattern.
pub fn probe_guess(
    rows: usize,
    cols: usize,
    mean_pattern: &Array2<f64>,
    geometry: &GuessGeometry,
) -> ComplexGuess {
    let power = mean_pattern.sum();
    let radius = (rows.min(cols) as f64) / 4.0;
    let center_row = rows as f64 / 2.0;
    let center_col = cols as f64 / 2.0;

    let mut inside = 0usize;
    let mut mask = Array2::<f32>::zeros((rows, cols));
    for ((row, col), value) in mask.indexed_iter_mut() {
        let dr = row as f64 + 0.5 - center_row;
        let dc = col as f64 + 0.5 - center_col;
        if (dr * dr + dc * dc).sqrt() <= radius {
            *value = 1.0;
            inside += 1;
        }
    }
    let amplitude = if inside > 0 {
        (power / inside as f64).sqrt() as f32
    } else {
        0.0
    };

    ComplexGuess {
        real: mask * amplitude,
        imag: Array2::zeros((rows, cols)),
        pixel_height_m: geometry.object_pixel_m(rows),
        pixel_width_m: geometry.object_pixel_m(cols),
    }
}

// Padding keeps the probe window inside the object at the scan extremes
const OBJECT_PAD_PIXELS: usize = 2;

/// Unit-amplitude object covering the scanned region plus the probe
/// footprint.
pub fn object_guess(positions: &ScanPositions, probe: &ComplexGuess) -> ComplexGuess {
    let rows = (positions.span_y_m() / probe.pixel_height_m).ceil() as usize
        + probe.rows()
        + OBJECT_PAD_PIXELS;
    let cols = (positions.span_x_m() / probe.pixel_width_m).ceil() as usize
        + probe.cols()
        + OBJECT_PAD_PIXELS;

    ComplexGuess {
        real: Array2::ones((rows, cols)),
        imag: Array2::zeros((rows, cols)),
        pixel_height_m: probe.pixel_height_m,
        pixel_width_m: probe.pixel_width_m,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn test_geometry() -> GuessGeometry {
        GuessGeometry {
            wavelength_m: wavelength_m(8800.0),
            detector_distance_m: 4.05,
            detector_pixel_size_m: 75.0e-6,
        }
    }

    #[test]
    fn test_wavelength() {
        // 8.8 keV photons are about 1.41 angstroms
        let lambda = wavelength_m(8800.0);
        assert!((lambda - 1.409e-10).abs() < 1e-13);
    }

    #[test]
    fn test_probe_power_matches_mean_pattern() {
        let mean = Array2::<f64>::from_elem((64, 64), 2.0);
        let probe = probe_guess(64, 64, &mean, &test_geometry());
        assert_eq!(probe.rows(), 64);
        assert_eq!(probe.cols(), 64);
        let expected = mean.sum();
        assert!((probe.power() - expected).abs() / expected < 1e-3);
        // corners are outside the aperture
        assert_eq!(probe.real[[0, 0]], 0.0);
        assert!(probe.real[[32, 32]] > 0.0);
    }

    #[test]
    fn test_object_covers_scan_region() {
        let geometry = test_geometry();
        let mean = Array2::<f64>::from_elem((64, 64), 1.0);
        let probe = probe_guess(64, 64, &mean, &geometry);
        let pixel = geometry.object_pixel_m(64);
        let positions = ScanPositions::new(
            array![0.0, 10.0 * pixel, 20.0 * pixel],
            array![0.0, 5.0 * pixel, 10.0 * pixel],
        )
        .unwrap();
        let object = object_guess(&positions, &probe);
        assert!(object.rows() >= probe.rows() + 10);
        assert!(object.cols() >= probe.cols() + 20);
        assert_eq!(object.real[[0, 0]], 1.0);
        assert_eq!(object.imag[[0, 0]], 0.0);
    }
}
