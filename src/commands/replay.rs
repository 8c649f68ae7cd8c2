use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;

use clap::Args;

use super::ConfigArg;
use super::Task;
use super::report_effect;
use crate::errors::CommandError;
use crate::gis::GdalBackend;
use crate::progress::ProgressObserver;
use crate::session::Effect;
use crate::session::Event;
use crate::session::Session;

fn load_script(path: &Path) -> Result<Vec<Event>,CommandError> {
    let source = File::open(path).map_err(|e| CommandError::ScriptRead(format!("{}",e)))?;
    let reader = BufReader::new(source);
    serde_json::from_reader(reader).map_err(|e| CommandError::ScriptRead(format!("{}",e)))
}

#[derive(Args)]
/// Replays a script of user interface events against a new session, and reports what the interface would have shown.
pub(crate) struct Replay {

    /// A JSON file containing an array of events
    script: PathBuf,

    #[command(flatten)]
    config: ConfigArg,

    #[arg(long)]
    /// A vector file to load as the working table before the script runs
    load: Option<PathBuf>,

    #[arg(long)]
    /// Saves the working table after the script runs. Paths ending in '.shp' are written as shapefiles, anything else as GeoJSON.
    save: Option<PathBuf>,

    #[arg(long)]
    /// Writes the final map scene to this file as JSON
    scene: Option<PathBuf>

}

impl Task for Replay {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
        let config = self.config.load()?;

        let mut events = Vec::new();
        if let Some(path) = self.load {
            events.push(Event::WorkingFileLoaded { path })
        }
        events.extend(load_script(&self.script)?);
        if let Some(path) = self.save {
            events.push(Event::WorkingFileSaved { path })
        }

        let mut backend = GdalBackend;
        let mut session = Session::new(config);
        let mut scene = session.render();

        progress.announce(&format!("Replaying {} event(s)",events.len()));

        for (index,event) in events.into_iter().enumerate() {
            let effects = session.apply(event, &mut backend, progress).map_err(|e| CommandError::ScriptEventFailed(index + 1, Box::new(e)))?;
            for effect in &effects {
                report_effect(effect, progress);
            }
            if effects.contains(&Effect::Rerender) {
                let next = session.render();
                for change in next.changes_since(&scene) {
                    progress.message(|| format!("  {change}"))
                }
                scene = next;
            }
        }

        progress.announce("Session");
        let selected = session.working().records().iter().filter(|record| record.is_selected()).count();
        progress.message(|| format!("Working table: {} row(s), {selected} selected, {} column(s)",session.working().len(),session.working().columns().len() + 1));
        progress.message(|| format!("Pending drawings: {}",session.pending().len()));
        for (name,layer) in session.references() {
            progress.message(|| format!("Reference layer {name} ({}, {})",layer.payload().kind(),layer.color()));
        }
        for layer in scene.layers() {
            progress.message(|| format!("Map layer {}: {} feature(s)",layer.id,layer.feature_count()));
        }
        let viewport = scene.viewport();
        progress.message(|| format!("View: [{}, {}] zoom {}",viewport.center[0],viewport.center[1],viewport.zoom));

        if let Some(path) = self.scene {
            let target = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(target, &scene)?;
        }

        Ok(())
    }
}
