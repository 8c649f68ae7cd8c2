use std::path::Path;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::gis::GisBackend;
use crate::gis::RasterSettings;
use crate::gis::VectorSource;
use crate::progress::ProgressObserver;
use crate::progress::WatchableIterator as _;
use crate::session::reference::ReferencePayload;

const SHAPEFILE_REQUIRED: [&str;3] = ["shp","shx","dbf"];
const SHAPEFILE_OPTIONAL: [&str;3] = ["prj","cpg","qpj"];

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension().map(|extension| extension.to_string_lossy().to_lowercase())
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

#[derive(PartialEq,Eq,Hash)]
enum GroupKey {
    ShapefileSet(PathBuf,String),
    Single(usize)
}

enum Group {
    ShapefileSet(Vec<(String,PathBuf)>),
    Single(UploadItem)
}

/// One unit of work from an upload batch.
#[derive(Clone,Debug,PartialEq,Eq)]
pub(crate) enum UploadItem {
    Vector {
        name: String,
        source: VectorSource,
        /// Keyhole files with no features aren't worth a layer.
        skip_if_empty: bool
    },
    Raster {
        name: String,
        path: PathBuf
    },
    /// A shapefile set that can't be opened because some of its required files weren't uploaded.
    MissingComponents {
        name: String,
        missing: Vec<&'static str>
    },
    Unrecognized {
        path: PathBuf
    }
}

/// An upload batch sorted into layers. Shapefile components are grouped by their shared base name, the other formats are one file per layer.
#[derive(Debug,Default,PartialEq,Eq)]
pub(crate) struct UploadManifest {
    items: Vec<UploadItem>
}

impl UploadManifest {

    pub(crate) fn from_files(files: &[PathBuf]) -> Self {
        // groups are kept in the order their first file was seen.
        let mut groups: IndexMap<GroupKey,Group> = IndexMap::new();

        for (index,file) in files.iter().enumerate() {
            let extension = lowercase_extension(file).unwrap_or_default();
            let single = match extension.as_str() {
                "shp" | "shx" | "dbf" | "prj" | "cpg" | "qpj" => {
                    let directory = file.parent().map(Path::to_path_buf).unwrap_or_default();
                    let stem = file.file_stem().map(|stem| stem.to_string_lossy().to_lowercase()).unwrap_or_default();
                    let group = groups.entry(GroupKey::ShapefileSet(directory,stem)).or_insert_with(|| Group::ShapefileSet(Vec::new()));
                    if let Group::ShapefileSet(set) = group {
                        set.push((extension,file.clone()))
                    }
                    continue;
                },
                "tif" | "tiff" => UploadItem::Raster {
                    name: file_name(file),
                    path: file.clone()
                },
                "kml" | "geojson" | "json" | "gpkg" => UploadItem::Vector {
                    name: file_name(file),
                    source: VectorSource::File(file.clone()),
                    skip_if_empty: extension == "kml"
                },
                "kmz" => UploadItem::Vector {
                    name: file_name(file),
                    source: VectorSource::ArchiveEntry { archive: file.clone(), extension: "kml" },
                    skip_if_empty: true
                },
                "zip" => UploadItem::Vector {
                    name: file_name(file),
                    source: VectorSource::ArchiveEntry { archive: file.clone(), extension: "shp" },
                    skip_if_empty: false
                },
                _ => UploadItem::Unrecognized { path: file.clone() }
            };
            _ = groups.insert(GroupKey::Single(index), Group::Single(single));
        }

        let items = groups.into_values().map(|group| match group {
            Group::ShapefileSet(set) => Self::classify_shapefile_set(&set),
            Group::Single(item) => item
        }).collect();

        Self {
            items
        }
    }

    fn classify_shapefile_set(set: &[(String,PathBuf)]) -> UploadItem {
        let find = |extension: &str| set.iter().find(|(found,_)| found == extension).map(|(_,path)| path);
        let missing: Vec<&'static str> = SHAPEFILE_REQUIRED.into_iter().filter(|extension| find(*extension).is_none()).collect();
        match find("shp") {
            Some(shp) if missing.is_empty() => UploadItem::Vector {
                name: file_name(shp),
                source: VectorSource::File(shp.clone()),
                skip_if_empty: false
            },
            _ => {
                // name the layer the way it would have been named had the set been complete
                let base = set.iter().find(|(extension,_)| !SHAPEFILE_OPTIONAL.contains(&extension.as_str()))
                              .or_else(|| set.first())
                              .and_then(|(_,path)| path.file_stem())
                              .map(|stem| stem.to_string_lossy().into_owned())
                              .unwrap_or_default();
                UploadItem::MissingComponents {
                    name: format!("{base}.shp"),
                    missing
                }
            }
        }
    }

    pub(crate) fn items(&self) -> &[UploadItem] {
        &self.items
    }

}

/// A problem with one file or group of files in an upload.
#[derive(Clone,Debug,PartialEq,Eq)]
pub(crate) struct Diagnostic {
    pub(crate) file: String,
    pub(crate) message: String
}

#[derive(Debug,Default)]
pub(crate) struct IngestReport {
    pub(crate) loaded: Vec<(String,ReferencePayload)>,
    pub(crate) diagnostics: Vec<Diagnostic>
}

/// Loads every layer in the manifest. A failure only affects its own item, the rest of the batch is still loaded.
pub(crate) fn ingest_batch<Backend: GisBackend, Progress: ProgressObserver>(manifest: &UploadManifest, backend: &mut Backend, settings: &RasterSettings, progress: &mut Progress) -> IngestReport {
    let mut report = IngestReport::default();

    for item in manifest.items().iter().watch(progress, "Loading reference layers.", "Reference layers loaded.") {
        match item {
            UploadItem::Vector { name, source, skip_if_empty } => match backend.read_vector(source) {
                Ok(table) if *skip_if_empty && table.rows.is_empty() => report.diagnostics.push(Diagnostic {
                    file: name.clone(),
                    message: "No features found.".to_owned()
                }),
                Ok(table) => report.loaded.push((name.clone(),ReferencePayload::Vector(table))),
                Err(err) => report.diagnostics.push(Diagnostic {
                    file: name.clone(),
                    message: format!("{err}")
                })
            },
            UploadItem::Raster { name, path } => match backend.render_raster(path, settings) {
                Ok(overlay) => report.loaded.push((name.clone(),ReferencePayload::Raster(overlay))),
                Err(err) => report.diagnostics.push(Diagnostic {
                    file: name.clone(),
                    message: format!("{err}")
                })
            },
            UploadItem::MissingComponents { name, missing } => report.diagnostics.push(Diagnostic {
                file: name.clone(),
                message: format!("Shapefile is missing required components: {}",missing.iter().map(|extension| format!(".{extension}")).collect::<Vec<_>>().join(", "))
            }),
            UploadItem::Unrecognized { path } => report.diagnostics.push(Diagnostic {
                file: file_name(path),
                message: "Skipped, not a recognized vector or raster format.".to_owned()
            })
        }
    }

    report
}
