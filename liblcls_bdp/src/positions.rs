use ndarray::Array1;

use super::error::PositionError;

/// Scan positions in meters, one (x, y) pair per exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPositions {
    x_m: Array1<f64>,
    y_m: Array1<f64>,
}

impl ScanPositions {
    /// Pair up the x and y channels; the channels must be non-empty and of
    /// equal length
    pub fn new(x_m: Array1<f64>, y_m: Array1<f64>) -> Result<Self, PositionError> {
        if x_m.len() != y_m.len() {
            return Err(PositionError::LengthMismatch(x_m.len(), y_m.len()));
        }
        if x_m.is_empty() {
            return Err(PositionError::Empty);
        }
        Ok(Self { x_m, y_m })
    }

    pub fn len(&self) -> usize {
        self.x_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_m.is_empty()
    }

    pub fn x_m(&self) -> &Array1<f64> {
        &self.x_m
    }

    pub fn y_m(&self) -> &Array1<f64> {
        &self.y_m
    }

    /// Width of the scanned region in meters
    pub fn span_x_m(&self) -> f64 {
        span(&self.x_m)
    }

    /// Height of the scanned region in meters
    pub fn span_y_m(&self) -> f64 {
        span(&self.y_m)
    }
}

/// Read a 1-D position channel out of an open HDF5 file
pub(crate) fn read_channel(
    file: &hdf5::File,
    channel: &str,
    path: &std::path::Path,
) -> Result<Array1<f64>, PositionError> {
    if !file.link_exists(channel) {
        return Err(PositionError::MissingChannel(
            channel.to_string(),
            path.to_path_buf(),
        ));
    }
    Ok(file.dataset(channel)?.read_1d::<f64>()?)
}

fn span(values: &Array1<f64>) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values.iter() {
        min = min.min(*value);
        max = max.max(*value);
    }
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_spans() {
        let positions =
            ScanPositions::new(array![1.0e-6, 5.0e-6, 3.0e-6], array![0.0, -2.0e-6, 2.0e-6])
                .unwrap();
        assert_eq!(positions.len(), 3);
        assert!((positions.span_x_m() - 4.0e-6).abs() < 1e-12);
        assert!((positions.span_y_m() - 4.0e-6).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        match ScanPositions::new(array![1.0, 2.0], array![1.0]) {
            Err(PositionError::LengthMismatch(2, 1)) => (),
            other => panic!("expected LengthMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_rejected() {
        let empty: Array1<f64> = array![];
        match ScanPositions::new(empty.clone(), empty) {
            Err(PositionError::Empty) => (),
            other => panic!("expected Empty, got {other:?}"),
        }
    }
}
