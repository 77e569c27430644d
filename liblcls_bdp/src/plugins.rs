use std::path::Path;

use fxhash::FxHashMap;

use super::error::{DiffractionError, PluginError, PositionError};
use super::frame_stack::FrameSource;
use super::lclsv2_file::{LclsV2DiffractionReader, LclsV2PositionReader};
use super::positions::ScanPositions;
use super::xpp_file::{XppDiffractionReader, XppPositionReader};

/// A named strategy for opening a facility's diffraction stack layout.
///
/// The `FileType` key of the settings document selects one of these by name.
pub trait DiffractionReader: Send + Sync {
    fn name(&self) -> &'static str;
    /// Dataset path used when the settings document does not set one
    fn default_dataset_path(&self) -> &'static str;
    fn open_stack(
        &self,
        path: &Path,
        dataset_path: Option<&str>,
    ) -> Result<FrameSource, DiffractionError>;
}

/// A named strategy for extracting scan positions from a facility's layout.
pub trait PositionReader: Send + Sync {
    fn name(&self) -> &'static str;
    fn read_positions(&self, path: &Path) -> Result<ScanPositions, PositionError>;
}

/// Registry of reader plugins, keyed by the names the settings document and
/// `--list-plugins` expose.
pub struct PluginRegistry {
    diffraction: FxHashMap<String, Box<dyn DiffractionReader>>,
    positions: FxHashMap<String, Box<dyn PositionReader>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            diffraction: FxHashMap::default(),
            positions: FxHashMap::default(),
        }
    }

    /// The registry with all bundled readers registered
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register_diffraction(Box::new(XppDiffractionReader));
        registry.register_diffraction(Box::new(LclsV2DiffractionReader));
        registry.register_position(Box::new(XppPositionReader));
        registry.register_position(Box::new(LclsV2PositionReader));
        registry
    }

    pub fn register_diffraction(&mut self, reader: Box<dyn DiffractionReader>) {
        self.diffraction.insert(reader.name().to_string(), reader);
    }

    pub fn register_position(&mut self, reader: Box<dyn PositionReader>) {
        self.positions.insert(reader.name().to_string(), reader);
    }

    pub fn diffraction_reader(&self, name: &str) -> Result<&dyn DiffractionReader, PluginError> {
        self.diffraction
            .get(name)
            .map(|reader| reader.as_ref())
            .ok_or_else(|| {
                PluginError::UnknownDiffractionPlugin(
                    name.to_string(),
                    self.diffraction_names().join(", "),
                )
            })
    }

    pub fn position_reader(&self, name: &str) -> Result<&dyn PositionReader, PluginError> {
        self.positions
            .get(name)
            .map(|reader| reader.as_ref())
            .ok_or_else(|| {
                PluginError::UnknownPositionPlugin(
                    name.to_string(),
                    self.position_names().join(", "),
                )
            })
    }

    pub fn diffraction_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.diffraction.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn position_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.positions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_names() {
        let registry = PluginRegistry::standard();
        assert_eq!(registry.diffraction_names(), vec!["LCLS_XPP", "LCLSv2"]);
        assert_eq!(registry.position_names(), vec!["LCLS_XPP", "LCLSv2"]);
    }

    #[test]
    fn test_lookup_known_plugins() {
        let registry = PluginRegistry::standard();
        assert_eq!(
            registry.diffraction_reader("LCLS_XPP").unwrap().name(),
            "LCLS_XPP"
        );
        assert_eq!(
            registry.position_reader("LCLSv2").unwrap().name(),
            "LCLSv2"
        );
    }

    #[test]
    fn test_unknown_plugin_lists_available() {
        let registry = PluginRegistry::standard();
        match registry.diffraction_reader("LCLS_MEC") {
            Err(PluginError::UnknownDiffractionPlugin(name, available)) => {
                assert_eq!(name, "LCLS_MEC");
                assert!(available.contains("LCLS_XPP"));
                assert!(available.contains("LCLSv2"));
            }
            other => panic!("expected UnknownDiffractionPlugin, got {other:?}"),
        }
    }
}
