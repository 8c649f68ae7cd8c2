use std::path::PathBuf;

use clap::Args;

use super::ConfigArg;
use super::Task;
use crate::errors::CommandError;
use crate::gis::GdalBackend;
use crate::gis::RasterSettings;
use crate::gis::upload::ingest_batch;
use crate::gis::upload::UploadManifest;
use crate::progress::ProgressObserver;
use crate::session::reference::ReferencePayload;

#[derive(Args)]
/// Loads a batch of files the way an upload would, and lists the layers found and the files that could not be used.
pub(crate) struct Ingest {

    #[arg(required = true)]
    /// The uploaded files. Shapefile components sharing a name in the same folder are loaded together as one layer.
    files: Vec<PathBuf>,

    #[command(flatten)]
    config: ConfigArg,

    #[arg(long)]
    /// Folder for rendered raster images. Overrides the configuration.
    overlay_directory: Option<PathBuf>

}

impl Task for Ingest {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
        let config = self.config.load()?;
        let settings = RasterSettings {
            max_dimension: config.raster_max_dimension,
            output_directory: self.overlay_directory.unwrap_or_else(|| config.overlay_directory())
        };

        let manifest = UploadManifest::from_files(&self.files);
        let report = ingest_batch(&manifest, &mut GdalBackend, &settings, progress);

        progress.announce(&format!("Loaded {} layer(s)",report.loaded.len()));
        for (name,payload) in &report.loaded {
            match payload {
                ReferencePayload::Vector(table) => {
                    let extent = table.extent()?.map_or_else(|| "no extent".to_owned(), |extent| format!("{:?}",extent.lat_lon_bounds()));
                    progress.message(|| format!("{name}: {} feature(s), {} column(s), {extent}",table.rows.len(),table.columns.len()))
                },
                ReferencePayload::Raster(overlay) => {
                    progress.message(|| format!("{name}: image {} covering {:?}",overlay.image.display(),overlay.bounds.lat_lon_bounds()))
                },
            }
        }

        if !report.diagnostics.is_empty() {
            progress.announce(&format!("{} problem(s)",report.diagnostics.len()));
            for diagnostic in &report.diagnostics {
                progress.warning(|| format!("{}: {}",diagnostic.file,diagnostic.message))
            }
        }

        Ok(())
    }
}
