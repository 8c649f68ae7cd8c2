use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FormatResult;
use std::collections::BTreeMap;
use std::path::PathBuf;

use geojson::Feature;
use geojson::FeatureCollection;
use geojson::Geometry;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::config::SessionConfig;
use crate::errors::CommandError;
use crate::gis::GisBackend;
use crate::gis::RasterSettings;
use crate::gis::VectorSource;
use crate::gis::upload::ingest_batch;
use crate::gis::upload::UploadManifest;
use crate::progress::ProgressObserver;
use crate::scene::MapScene;
use crate::table::AttributeValue;
use crate::table::ColumnType;
use crate::table::SearchSuggestion;
use crate::table::TableRow;
use crate::utils::color::LayerColor;
use crate::utils::extent::Extent;
use crate::utils::random::random_number_generator;

pub(crate) mod pending;
pub(crate) mod reference;
pub(crate) mod viewport;
pub(crate) mod working_set;

use pending::PendingDrawings;
use reference::ReferenceLayers;
use reference::ReferencePayload;
use viewport::Viewport;
use viewport::ViewportState;
use working_set::RowId;
use working_set::WorkingSet;

const SUGGESTION_LIMIT: usize = 10;

/// The drawing tool reports either a bare list of features or a whole feature collection.
#[derive(Clone,Debug,Serialize,Deserialize)]
#[serde(untagged)]
pub(crate) enum DrawingBatch {
    Collection(FeatureCollection),
    Features(Vec<Feature>)
}

impl DrawingBatch {

    pub(crate) fn into_features(self) -> Vec<Feature> {
        match self {
            Self::Collection(collection) => collection.features,
            Self::Features(features) => features
        }
    }
}

/// Something that happened in the user interface. Events are applied to the session one at a time, in order.
#[derive(Clone,Debug,Serialize,Deserialize,JsonSchema)]
#[serde(tag = "event")]
pub(crate) enum Event {
    /// Everything currently drawn on the map. The drawing tool sends all drawings on each refresh, not just new ones.
    DrawingsReported {
        #[schemars(with = "serde_json::Value")]
        features: DrawingBatch
    },
    /// The user panned or zoomed the map.
    ViewportObserved {
        center: [f64;2],
        zoom: f64
    },
    /// Returns the map to the initial view.
    ViewportReset,
    /// Moves all pending drawings into the working set.
    MergePending,
    /// Throws away all pending drawings.
    DiscardPending,
    ColumnAdded {
        name: String,
        column_type: ColumnType
    },
    /// A row typed into the table. Rows added this way have no geometry unless one is given.
    RowInserted {
        #[serde(default)]
        #[schemars(with = "Option<serde_json::Value>")]
        geometry: Option<Geometry>,
        #[serde(default)]
        values: IndexMap<String,AttributeValue>
    },
    /// Cell edits and row deletions, with rows identified by id.
    TableEdited {
        #[serde(default)]
        edited: BTreeMap<RowId,IndexMap<String,AttributeValue>>,
        #[serde(default)]
        deleted: Vec<RowId>
    },
    /// Cell edits and row deletions, with rows identified by their position in the table at the time of the edit.
    PositionalTableEdited {
        #[serde(default)]
        edited: BTreeMap<usize,IndexMap<String,AttributeValue>>,
        #[serde(default)]
        deleted: Vec<usize>
    },
    WorkColorChanged {
        color: LayerColor
    },
    ReferenceColorChanged {
        name: String,
        color: LayerColor
    },
    ReferenceRemoved {
        name: String
    },
    /// Zooms to the first feature in the layer with any value containing the query.
    ReferenceSearched {
        name: String,
        query: String
    },
    /// Lists matching features while a search query is being typed.
    SuggestionsRequested {
        name: String,
        query: String
    },
    /// Zooms to a feature picked from the suggestions, by its row in the layer.
    SuggestionChosen {
        name: String,
        row: usize
    },
    /// Zooms to show the whole layer.
    ReferenceZoomed {
        name: String
    },
    /// Zooms to the first feature in the layer whose value for the column matches.
    ObjectRequested {
        layer: String,
        column: String,
        value: String
    },
    FilesUploaded {
        files: Vec<PathBuf>
    },
    /// Replaces the working set with the contents of a vector file.
    WorkingFileLoaded {
        path: PathBuf
    },
    WorkingFileSaved {
        path: PathBuf
    }
}

/// An instruction for the user interface, produced by applying an event.
#[derive(Clone,Debug,PartialEq)]
pub(crate) enum Effect {
    Rerender,
    FitBounds(Extent),
    Notice(String),
    Warning(String),
    Diagnostic {
        file: String,
        message: String
    },
    /// Matches for a search being typed. The row of a suggestion is what `SuggestionChosen` expects.
    Suggestions(Vec<SearchSuggestion>)
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            Self::Rerender => write!(f,"rerender"),
            Self::FitBounds(extent) => {
                let [[south,west],[north,east]] = extent.lat_lon_bounds();
                write!(f,"fit bounds [[{south}, {west}], [{north}, {east}]]")
            },
            Self::Notice(message) => write!(f,"notice: {message}"),
            Self::Warning(message) => write!(f,"warning: {message}"),
            Self::Diagnostic { file, message } => write!(f,"{file}: {message}"),
            Self::Suggestions(suggestions) => {
                let suggestions: Vec<String> = suggestions.iter().map(ToString::to_string).collect();
                write!(f,"suggestions: {}",suggestions.join("; "))
            },
        }
    }
}

/// Everything the user is working on: the working set, drawings not yet merged into it, reference layers and the map view.
pub(crate) struct Session {
    config: SessionConfig,
    working: WorkingSet,
    pending: PendingDrawings,
    references: ReferenceLayers,
    viewport: ViewportState,
    work_color: LayerColor,
    random: StdRng
}

impl Session {

    pub(crate) fn new(config: SessionConfig) -> Self {
        Self {
            working: WorkingSet::new(&config.selection_column),
            pending: PendingDrawings::default(),
            references: ReferenceLayers::default(),
            viewport: ViewportState::new(config.initial_view.clone()),
            work_color: config.work_color,
            random: random_number_generator(config.color_seed),
            config
        }
    }

    pub(crate) const fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) const fn working(&self) -> &WorkingSet {
        &self.working
    }

    pub(crate) const fn pending(&self) -> &PendingDrawings {
        &self.pending
    }

    pub(crate) const fn references(&self) -> &ReferenceLayers {
        &self.references
    }

    pub(crate) const fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub(crate) const fn work_color(&self) -> LayerColor {
        self.work_color
    }

    fn raster_settings(&self) -> RasterSettings {
        RasterSettings {
            max_dimension: self.config.raster_max_dimension,
            output_directory: self.config.overlay_directory()
        }
    }

    /// Every rebuild of the map starts from the view the user last saw.
    fn rerender(&mut self, effects: &mut Vec<Effect>) {
        self.viewport.carry_over();
        effects.push(Effect::Rerender);
    }

    fn fit_to_row(&mut self, row: &TableRow, effects: &mut Vec<Effect>) -> Result<(),CommandError> {
        match &row.geometry {
            Some(geometry) => match Extent::from_geometry(geometry)? {
                Some(extent) => {
                    self.viewport.carry_over();
                    self.viewport.request_fit(extent.clone(), Some(geometry.clone()));
                    effects.push(Effect::FitBounds(extent));
                    effects.push(Effect::Rerender);
                },
                None => effects.push(Effect::Notice("The matching feature has an empty geometry.".to_owned()))
            },
            None => effects.push(Effect::Notice("The matching feature has no geometry.".to_owned()))
        }
        Ok(())
    }

    fn next_reference_color(&mut self) -> LayerColor {
        if self.config.random_reference_colors {
            LayerColor::random(&mut self.random)
        } else {
            self.config.reference_color
        }
    }

    /// Builds the map as it should be displayed now. A pending zoom request is used up by this.
    pub(crate) fn render(&mut self) -> MapScene {
        let scene = MapScene::build(self);
        _ = self.viewport.take_fit();
        scene
    }

    /// Applies one event, returning what the user interface should do about it. If an error is returned, the session is unchanged.
    pub(crate) fn apply<Backend: GisBackend, Progress: ProgressObserver>(&mut self, event: Event, backend: &mut Backend, progress: &mut Progress) -> Result<Vec<Effect>,CommandError> {
        let mut effects = Vec::new();
        match event {
            Event::DrawingsReported { features } => {
                let report = self.pending.capture(features.into_features())?;
                if report.without_geometry > 0 {
                    effects.push(Effect::Warning(format!("Ignored {} drawing(s) without a geometry.",report.without_geometry)));
                }
                if report.added > 0 {
                    effects.push(Effect::Notice(format!("{} new object(s) detected.",self.pending.len())));
                    self.rerender(&mut effects);
                }
            },
            Event::ViewportObserved { center, zoom } => self.viewport.observe(Viewport { center, zoom }),
            Event::ViewportReset => {
                self.viewport.reset();
                effects.push(Effect::Rerender);
            },
            Event::MergePending => if !self.pending.is_empty() {
                // merged into a copy, so a failure leaves both the drawings and the table as they were.
                let mut merged = self.working.clone();
                for feature in self.pending.features() {
                    _ = merged.append_feature(feature.clone())?;
                }
                self.working = merged;
                let count = self.pending.drain().len();
                effects.push(Effect::Notice(format!("Saved {count} object(s) to the table.")));
                self.rerender(&mut effects);
            },
            Event::DiscardPending => if !self.pending.is_empty() {
                _ = self.pending.drain();
                self.rerender(&mut effects);
            },
            Event::ColumnAdded { name, column_type } => if self.working.add_column(&name, column_type)? {
                effects.push(Effect::Notice(format!("Column '{}' added.",name.trim())));
            } else {
                effects.push(Effect::Warning(format!("Column '{}' already exists.",name.trim())));
            },
            Event::RowInserted { geometry, values } => {
                let has_geometry = geometry.is_some();
                _ = self.working.insert_row(geometry, values)?;
                if has_geometry {
                    self.rerender(&mut effects);
                }
            },
            Event::TableEdited { edited, deleted } => self.apply_table_edits(&edited, &deleted, &mut effects)?,
            Event::PositionalTableEdited { edited, deleted } => {
                let mut resolved = BTreeMap::new();
                for (position,changes) in edited {
                    let ids = self.working.resolve_positions(&[position])?;
                    for id in ids {
                        _ = resolved.insert(id, changes.clone());
                    }
                }
                let deleted = self.working.resolve_positions(&deleted)?;
                self.apply_table_edits(&resolved, &deleted, &mut effects)?
            },
            Event::WorkColorChanged { color } => if color != self.work_color {
                self.work_color = color;
                self.rerender(&mut effects);
            },
            Event::ReferenceColorChanged { name, color } => if self.references.set_color(&name, color)? {
                self.rerender(&mut effects);
            },
            Event::ReferenceRemoved { name } => {
                _ = self.references.remove(&name)?;
                effects.push(Effect::Notice(format!("Removed reference layer '{name}'.")));
                self.rerender(&mut effects);
            },
            Event::ReferenceSearched { name, query } => {
                let found = self.references.vector(&name)?.search(&query).cloned();
                match found {
                    Some(row) => self.fit_to_row(&row, &mut effects)?,
                    None => effects.push(Effect::Notice(format!("Nothing in '{name}' matches '{query}'.")))
                }
            },
            Event::SuggestionsRequested { name, query } => {
                let suggestions = self.references.vector(&name)?.suggest(&query, SUGGESTION_LIMIT);
                effects.push(Effect::Suggestions(suggestions));
            },
            Event::SuggestionChosen { name, row } => {
                let found = self.references.vector(&name)?.rows.get(row).cloned().ok_or(CommandError::UnknownRowPosition(row))?;
                self.fit_to_row(&found, &mut effects)?
            },
            Event::ReferenceZoomed { name } => {
                let extent = match self.references.get(&name)?.payload() {
                    ReferencePayload::Vector(table) => table.extent()?,
                    ReferencePayload::Raster(overlay) => Some(overlay.bounds.clone())
                };
                match extent {
                    Some(extent) => {
                        self.viewport.carry_over();
                        self.viewport.request_fit(extent.clone(), None);
                        effects.push(Effect::FitBounds(extent));
                        effects.push(Effect::Rerender);
                    },
                    None => effects.push(Effect::Notice(format!("'{name}' has nothing to zoom to.")))
                }
            },
            Event::ObjectRequested { layer, column, value } => {
                let found = self.references.vector(&layer)?.find_first(&column, &value)?.cloned();
                match found {
                    Some(row) => self.fit_to_row(&row, &mut effects)?,
                    None => effects.push(Effect::Notice(format!("No object in '{layer}' has {column} = '{value}'.")))
                }
            },
            Event::FilesUploaded { files } => {
                let manifest = UploadManifest::from_files(&files);
                let report = ingest_batch(&manifest, backend, &self.raster_settings(), progress);
                let count = report.loaded.len();
                for (name,payload) in report.loaded {
                    let color = self.next_reference_color();
                    _ = self.references.insert(name, payload, color);
                }
                effects.extend(report.diagnostics.into_iter().map(|diagnostic| Effect::Diagnostic {
                    file: diagnostic.file,
                    message: diagnostic.message
                }));
                if count > 0 {
                    effects.push(Effect::Notice(format!("Reference layers loaded: {}",self.references.len())));
                    self.rerender(&mut effects);
                }
            },
            Event::WorkingFileLoaded { path } => {
                progress.start_unknown_endpoint(|| format!("Loading {}.",path.display()));
                let table = backend.read_vector(&VectorSource::File(path.clone()))?;
                self.working = WorkingSet::from_table(table, &self.config.selection_column);
                progress.finish(|| "Working file loaded.");
                effects.push(Effect::Notice(format!("Loaded {} row(s) from {}.",self.working.len(),path.display())));
                self.rerender(&mut effects);
            },
            Event::WorkingFileSaved { path } => {
                progress.start_unknown_endpoint(|| format!("Saving {}.",path.display()));
                backend.write_vector(&path, &self.working.to_table())?;
                progress.finish(|| "Working file saved.");
                effects.push(Effect::Notice(format!("Saved {} row(s) to {}.",self.working.len(),path.display())));
            },
        }
        Ok(effects)
    }

    fn apply_table_edits(&mut self, edited: &BTreeMap<RowId,IndexMap<String,AttributeValue>>, deleted: &[RowId], effects: &mut Vec<Effect>) -> Result<(),CommandError> {
        // deletions are checked first, so a bad deletion doesn't leave the edits half applied.
        if let Some(missing) = deleted.iter().find(|id| self.working.get(**id).is_none()) {
            return Err(CommandError::UnknownRow(missing.to_string()))
        }
        let selection_changed = self.working.apply_edits(edited)?;
        let removed = self.working.delete(deleted)?;
        if selection_changed || removed > 0 {
            self.rerender(effects);
        }
        Ok(())
    }

}
