//! # lcls_bdp
//!
//! lcls_bdp is a beamline-data-pipeline converter, written in Rust. It takes
//! diffraction data recorded at LCLS in the HDF5 format, crops the patterns
//! to the region of interest, and bundles them with scan positions and
//! initial probe/object guesses into a product that the Ptychodus
//! reconstruction application can consume.
//!
//! ## Installation
//!
//! The only method of install is from source, which is laid out below.
//!
//! ### HDF5
//!
//! Before building and running lcls_bdp, HDF5 must be installed. Typically
//! this will be installed using a package manager (homebrew, apt, etc), and
//! the Rust libraries will auto detect the location of the HDF install.
//! However, this is not always possible. Sometimes a newer version will need
//! to be installed to a custom location. If this is the case, write the
//! following snippet into the file `.cargo/config.toml` in the lcls_bdp
//! repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! Replace `/path/to/my/hdf5/install/` with the path to your HDF5
//! installation. If the input data was compressed with a custom filter (LCLS
//! smalldata is often LZO-compressed), point the `HDF5_PLUGIN_PATH`
//! environment variable at the directory holding the filter plugin before
//! running the converter; there is no redistributable LZO plugin, so such
//! files may need to be repacked with a standard codec first.
//!
//! ### Building & Install
//!
//! To build and install the converter use `cargo install --path ./lcls_bdp_cli`
//! from the top level lcls_bdp repository.
//!
//! ## Configuration
//!
//! A conversion run is driven by an INI settings document. The recognized
//! sections and keys:
//!
//! ```ini
//! [Diffraction]
//! FileType = LCLS_XPP
//! DatasetPath = /jungfrau1M/image_img
//! CropCenterX = 515
//! CropCenterY = 532
//! CropExtentX = 512
//! CropExtentY = 512
//! MemmapEnabled = False
//! ScratchDirectory = /scratch/bdp
//!
//! [ProbePositions]
//! FileType = LCLS_XPP
//!
//! [Metadata]
//! ProbeEnergyInElectronVolts = 8800.0
//! DetectorDistanceInMeters = 4.05
//! ```
//!
//! `FileType` selects a reader plugin by name (`LCLS_XPP` or `LCLSv2`); the
//! `[Scan]` section name is accepted as an alias of `[ProbePositions]`.
//! `MemmapEnabled` stages the cropped stack through a scratch file under
//! `ScratchDirectory` so large runs do not have to fit in memory. Metadata
//! values given on the command line win over the document.
//!
//! Template documents live in the `templates/` directory, and
//! `lcls-bdp new --path settings.ini` writes a fresh one.
//!
//! ## Output
//!
//! A run writes three artifacts into the output directory:
//!
//! ```text
//! diffraction.h5 - version, created_unix
//! |---- patterns(dset) - crop_center_x, crop_center_y, crop_extent_x,
//!                        crop_extent_y, frame_count
//!
//! product-in.h5 - name, version, created_unix, probe_energy_eV,
//!                 detector_distance_m, detector_pixel_size_m, wavelength_m
//! |---- positions - count
//! |    |---- x(dset)
//! |    |---- y(dset)
//! |---- probe - pixel_height_m, pixel_width_m
//! |    |---- real(dset)
//! |    |---- imag(dset)
//! |---- object - pixel_height_m, pixel_width_m
//! |    |---- real(dset)
//! |    |---- imag(dset)
//!
//! settings.ini - copy of the effective settings for the run
//! ```
pub mod constants;
pub mod convert;
pub mod error;
pub mod frame_stack;
pub mod geometry;
pub mod ini;
pub mod initial_guess;
pub mod lclsv2_file;
pub mod plugins;
pub mod positions;
pub mod product_writer;
pub mod settings;
pub mod worker_status;
pub mod xpp_file;
