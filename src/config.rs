use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::CommandError;
use crate::session::viewport::Viewport;
use crate::utils::color::LayerColor;

/// Settings for a drafting session. Every field has a default, so an empty object is a valid configuration.
#[derive(Clone,Debug,Serialize,Deserialize,JsonSchema)]
#[serde(default)]
pub(crate) struct SessionConfig {
    /// Map view used when the session starts and when the view is reset.
    pub(crate) initial_view: Viewport,
    /// Color of unselected features in the working layer.
    pub(crate) work_color: LayerColor,
    /// Color of selected features in the working layer.
    pub(crate) selection_color: LayerColor,
    /// Color given to newly loaded reference layers, unless random colors are requested.
    pub(crate) reference_color: LayerColor,
    /// If true, each new reference layer gets a random color.
    pub(crate) random_reference_colors: bool,
    /// Seed for random reference colors. If not specified, the colors change every run.
    pub(crate) color_seed: Option<u64>,
    /// Name of the boolean column which marks selected features in the working layer.
    pub(crate) selection_column: String,
    /// Rasters are downsampled so neither side of the rendered image exceeds this many pixels.
    pub(crate) raster_max_dimension: usize,
    /// Opacity of raster overlays in the map scene.
    pub(crate) raster_opacity: f64,
    /// Directory where rendered raster overlays are written. Defaults to the system temporary directory.
    pub(crate) overlay_directory: Option<PathBuf>,
}

impl Default for SessionConfig {

    fn default() -> Self {
        Self {
            initial_view: Viewport::new(-33.4489, -70.6693, 10.0),
            work_color: LayerColor::from_rgb(0x25, 0x63, 0xeb),
            selection_color: LayerColor::from_rgb(0xef, 0x44, 0x44),
            reference_color: LayerColor::from_rgb(0x55, 0x55, 0x55),
            random_reference_colors: false,
            color_seed: None,
            selection_column: "selected".to_owned(),
            raster_max_dimension: 2048,
            raster_opacity: 0.6,
            overlay_directory: None,
        }
    }
}

impl SessionConfig {

    pub(crate) fn load<FilePath: AsRef<Path>>(path: FilePath) -> Result<Self,CommandError> {
        let source = File::open(path).map_err(|e| CommandError::ConfigRead(format!("{}",e)))?;
        let reader = BufReader::new(source);
        serde_json::from_reader(reader).map_err(|e| CommandError::ConfigRead(format!("{}",e)))
    }

    pub(crate) fn load_or_default<FilePath: AsRef<Path>>(path: Option<FilePath>) -> Result<Self,CommandError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default())
        }
    }

    pub(crate) fn overlay_directory(&self) -> PathBuf {
        self.overlay_directory.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod test {

    use super::SessionConfig;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.selection_column,"selected");
        assert_eq!(config.work_color.to_string(),"#2563EB");
        assert_eq!(config.raster_max_dimension,2048);
        assert_eq!(config.initial_view.zoom,10.0);
    }

    #[test]
    fn test_partial_config() {
        let config: SessionConfig = serde_json::from_str(r##"{"selection_column": "chosen", "reference_color": "#00ff00"}"##).unwrap();
        assert_eq!(config.selection_column,"chosen");
        assert_eq!(config.reference_color.to_string(),"#00FF00");
        assert_eq!(config.selection_color.to_string(),"#EF4444");
    }
}
