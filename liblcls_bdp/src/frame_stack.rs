use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{s, Array2, Array3};

use super::error::DiffractionError;
use super::settings::CropWindow;

/// A frame-stack handle over an HDF5 dataset of shape (frames, rows, cols).
///
/// Frames are read one at a time so the full stack never has to be resident.
#[derive(Debug)]
pub struct FrameSource {
    _file_handle: hdf5::File, // keeps the dataset handle valid
    dataset: hdf5::Dataset,
    dataset_path: String,
    frames: usize,
    rows: usize,
    cols: usize,
}

impl FrameSource {
    /// Open a diffraction stack at the given internal dataset path
    pub fn open(path: &Path, dataset_path: &str) -> Result<Self, DiffractionError> {
        if !path.exists() {
            return Err(DiffractionError::BadFilePath(path.to_path_buf()));
        }
        let file_handle = hdf5::File::open(path)?;
        if !file_handle.link_exists(dataset_path) {
            return Err(DiffractionError::MissingDataset(
                dataset_path.to_string(),
                path.to_path_buf(),
            ));
        }
        let dataset = file_handle.dataset(dataset_path)?;
        let shape = dataset.shape();
        if shape.len() != 3 {
            return Err(DiffractionError::BadShape(dataset_path.to_string(), shape));
        }
        Ok(Self {
            _file_handle: file_handle,
            dataset,
            dataset_path: dataset_path.to_string(),
            frames: shape[0],
            rows: shape[1],
            cols: shape[2],
        })
    }

    pub fn dataset_path(&self) -> &str {
        &self.dataset_path
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// On-disk size of the stack, for operator feedback
    pub fn size_bytes(&self) -> u64 {
        self.dataset.storage_size()
    }

    /// Read a single frame, converting to f32 counts
    pub fn read_frame(&self, index: usize) -> Result<Array2<f32>, DiffractionError> {
        self.dataset
            .read_slice_2d::<f32, _>(s![index, .., ..])
            .map_err(|e| DiffractionError::UnreadableData(index, e))
    }
}

/// Extract the crop window from a full frame
pub fn crop_frame(frame: &Array2<f32>, window: &CropWindow) -> Array2<f32> {
    frame
        .slice(s![
            window.row0..window.row0 + window.rows,
            window.col0..window.col0 + window.cols
        ])
        .to_owned()
}

enum Backing {
    Memory(Array3<f32>),
    Scratch {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

/// Accumulates cropped frames plus their summed pattern.
///
/// With `MemmapEnabled` the frames are staged as little-endian f32 records in
/// a scratch file so resident memory stays bounded; otherwise the stack is a
/// preallocated in-memory array.
pub struct CroppedStack {
    backing: Backing,
    rows: usize,
    cols: usize,
    count: usize,
    sum_pattern: Array2<f64>,
}

impl CroppedStack {
    pub fn in_memory(capacity: usize, rows: usize, cols: usize) -> Self {
        Self {
            backing: Backing::Memory(Array3::zeros((capacity, rows, cols))),
            rows,
            cols,
            count: 0,
            sum_pattern: Array2::zeros((rows, cols)),
        }
    }

    /// Stage frames through `<scratch_dir>/<stem>.scratch`, creating the
    /// directory if needed
    pub fn scratch(
        scratch_dir: &Path,
        stem: &str,
        rows: usize,
        cols: usize,
    ) -> Result<Self, DiffractionError> {
        std::fs::create_dir_all(scratch_dir)?;
        let path = scratch_dir.join(format!("{stem}.scratch"));
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self {
            backing: Backing::Scratch { writer, path },
            rows,
            cols,
            count: 0,
            sum_pattern: Array2::zeros((rows, cols)),
        })
    }

    pub fn push_frame(&mut self, frame: &Array2<f32>) -> Result<(), DiffractionError> {
        let (rows, cols) = frame.dim();
        if rows != self.rows || cols != self.cols {
            return Err(DiffractionError::FrameShapeMismatch(
                rows, cols, self.rows, self.cols,
            ));
        }
        for (sum, value) in self.sum_pattern.iter_mut().zip(frame.iter()) {
            *sum += *value as f64;
        }
        match &mut self.backing {
            Backing::Memory(data) => {
                data.slice_mut(s![self.count, .., ..]).assign(frame);
            }
            Backing::Scratch { writer, .. } => {
                for value in frame.iter() {
                    writer.write_f32::<LittleEndian>(*value)?;
                }
            }
        }
        self.count += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Mean diffraction pattern over all pushed frames
    pub fn mean_pattern(&self) -> Array2<f64> {
        if self.count == 0 {
            return self.sum_pattern.clone();
        }
        &self.sum_pattern / self.count as f64
    }

    /// Finish accumulation and hand back a sequential reader over the frames
    pub fn into_reader(self) -> Result<StackReader, DiffractionError> {
        let backing = match self.backing {
            Backing::Memory(data) => ReaderBacking::Memory(data),
            Backing::Scratch { mut writer, path } => {
                writer.flush()?;
                drop(writer);
                ReaderBacking::Scratch {
                    reader: BufReader::new(File::open(&path)?),
                    path,
                }
            }
        };
        Ok(StackReader {
            backing,
            rows: self.rows,
            cols: self.cols,
            count: self.count,
            cursor: 0,
        })
    }
}

enum ReaderBacking {
    Memory(Array3<f32>),
    Scratch {
        reader: BufReader<File>,
        path: PathBuf,
    },
}

/// Sequential reader over a finished [`CroppedStack`]
pub struct StackReader {
    backing: ReaderBacking,
    rows: usize,
    cols: usize,
    count: usize,
    cursor: usize,
}

impl StackReader {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn next_frame(&mut self) -> Result<Option<Array2<f32>>, DiffractionError> {
        if self.cursor >= self.count {
            return Ok(None);
        }
        let frame = match &mut self.backing {
            ReaderBacking::Memory(data) => data.slice(s![self.cursor, .., ..]).to_owned(),
            ReaderBacking::Scratch { reader, .. } => {
                let mut buffer = vec![0.0f32; self.rows * self.cols];
                reader.read_f32_into::<LittleEndian>(&mut buffer)?;
                Array2::from_shape_vec((self.rows, self.cols), buffer)
                    .expect("scratch record length matches frame shape")
            }
        };
        self.cursor += 1;
        Ok(Some(frame))
    }

    /// Release the backing storage, deleting the scratch file if one was used
    pub fn finish(self) -> Result<(), DiffractionError> {
        if let ReaderBacking::Scratch { reader, path } = self.backing {
            drop(reader);
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CropWindow;
    use ndarray::Array2;

    fn test_frame(rows: usize, cols: usize, offset: f32) -> Array2<f32> {
        Array2::from_shape_fn((rows, cols), |(r, c)| offset + (r * cols + c) as f32)
    }

    #[test]
    fn test_crop_frame() {
        let frame = test_frame(8, 10, 0.0);
        let window = CropWindow::from_center_extent(5, 4, 4, 2, 8, 10).unwrap();
        let cropped = crop_frame(&frame, &window);
        assert_eq!(cropped.dim(), (2, 4));
        assert_eq!(cropped[[0, 0]], frame[[3, 3]]);
        assert_eq!(cropped[[1, 3]], frame[[4, 6]]);
    }

    #[test]
    fn test_in_memory_stack_round_trip() {
        let mut stack = CroppedStack::in_memory(3, 4, 5);
        for i in 0..3 {
            stack.push_frame(&test_frame(4, 5, i as f32)).unwrap();
        }
        assert_eq!(stack.len(), 3);
        let mean = stack.mean_pattern();
        assert_eq!(mean[[0, 0]], 1.0); // (0 + 1 + 2) / 3

        let mut reader = stack.into_reader().unwrap();
        for i in 0..3 {
            let frame = reader.next_frame().unwrap().unwrap();
            assert_eq!(frame, test_frame(4, 5, i as f32));
        }
        assert!(reader.next_frame().unwrap().is_none());
        reader.finish().unwrap();
    }

    #[test]
    fn test_scratch_stack_round_trip() {
        let scratch_dir =
            std::env::temp_dir().join(format!("lcls_bdp_scratch_{}", std::process::id()));
        let mut stack = CroppedStack::scratch(&scratch_dir, "round_trip", 4, 5).unwrap();
        for i in 0..3 {
            stack.push_frame(&test_frame(4, 5, i as f32)).unwrap();
        }
        let scratch_file = scratch_dir.join("round_trip.scratch");
        assert!(scratch_file.exists());

        let mut reader = stack.into_reader().unwrap();
        for i in 0..3 {
            let frame = reader.next_frame().unwrap().unwrap();
            assert_eq!(frame, test_frame(4, 5, i as f32));
        }
        assert!(reader.next_frame().unwrap().is_none());
        reader.finish().unwrap();
        assert!(!scratch_file.exists());
        let _ = std::fs::remove_dir(&scratch_dir);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut stack = CroppedStack::in_memory(1, 4, 5);
        match stack.push_frame(&test_frame(5, 4, 0.0)) {
            Err(DiffractionError::FrameShapeMismatch(5, 4, 4, 5)) => (),
            other => panic!("expected FrameShapeMismatch, got {other:?}"),
        }
    }
}
