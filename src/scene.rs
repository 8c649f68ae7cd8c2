use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FormatResult;
use std::path::PathBuf;

use geojson::Feature;
use geojson::FeatureCollection;
use geojson::Geometry;
use serde::Serialize;

use crate::session::Session;
use crate::session::reference::ReferencePayload;
use crate::session::viewport::Viewport;
use crate::utils::color::LayerColor;
use crate::utils::extent::Extent;

pub(crate) const WORKING_LAYER: &str = "working";
pub(crate) const SELECTED_LAYER: &str = "working:selected";
pub(crate) const PENDING_LAYER: &str = "pending";
pub(crate) const HIGHLIGHT_LAYER: &str = "highlight";
const REFERENCE_PREFIX: &str = "reference:";

#[derive(Clone,Debug,PartialEq,Serialize)]
pub(crate) struct LayerStyle {
    pub(crate) color: LayerColor,
    pub(crate) weight: f64,
    pub(crate) fill_opacity: f64
}

impl LayerStyle {

    const fn new(color: LayerColor, weight: f64, fill_opacity: f64) -> Self {
        Self {
            color,
            weight,
            fill_opacity
        }
    }
}

#[derive(Clone,Debug,PartialEq,Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum SceneContent {
    Features {
        features: FeatureCollection
    },
    Image {
        path: PathBuf,
        bounds: [[f64;2];2],
        opacity: f64
    }
}

#[derive(Clone,Debug,PartialEq,Serialize)]
pub(crate) struct SceneLayer {
    pub(crate) id: String,
    pub(crate) style: LayerStyle,
    pub(crate) content: SceneContent
}

impl SceneLayer {

    fn features(id: String, style: LayerStyle, features: Vec<Feature>) -> Self {
        Self {
            id,
            style,
            content: SceneContent::Features {
                features: FeatureCollection {
                    bbox: None,
                    features,
                    foreign_members: None
                }
            }
        }
    }

    pub(crate) fn feature_count(&self) -> usize {
        match &self.content {
            SceneContent::Features { features } => features.features.len(),
            SceneContent::Image { .. } => 0
        }
    }

}

/// How one scene differs from the one before it.
#[derive(Clone,Debug,PartialEq,Eq)]
pub(crate) enum SceneChange {
    Added(String),
    Removed(String),
    /// Only the style changed, the layer's content can be kept.
    Restyled(String),
    Redrawn(String),
    ViewportMoved
}

impl Display for SceneChange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            Self::Added(id) => write!(f,"added {id}"),
            Self::Removed(id) => write!(f,"removed {id}"),
            Self::Restyled(id) => write!(f,"restyled {id}"),
            Self::Redrawn(id) => write!(f,"redrawn {id}"),
            Self::ViewportMoved => write!(f,"viewport moved"),
        }
    }
}

/// Everything needed to draw the map: the view, and the layers from bottom to top.
#[derive(Clone,Debug,PartialEq,Serialize)]
pub(crate) struct MapScene {
    viewport: Viewport,
    fit_bounds: Option<[[f64;2];2]>,
    #[serde(skip)]
    highlight: Option<Geometry>,
    layers: Vec<SceneLayer>
}

impl MapScene {

    pub(crate) fn build(session: &Session) -> Self {
        let config = session.config();
        let mut layers = Vec::new();

        for (name,layer) in session.references() {
            let id = format!("{REFERENCE_PREFIX}{name}");
            let style = LayerStyle::new(layer.color(), 1.0, 0.1);
            match layer.payload() {
                ReferencePayload::Vector(table) => layers.push(SceneLayer {
                    id,
                    style,
                    content: SceneContent::Features {
                        features: table.to_feature_collection()
                    }
                }),
                ReferencePayload::Raster(overlay) => layers.push(SceneLayer {
                    id,
                    style,
                    content: SceneContent::Image {
                        path: overlay.image.clone(),
                        bounds: overlay.bounds.lat_lon_bounds(),
                        opacity: config.raster_opacity
                    }
                }),
            }
        }

        let working = session.working();
        let (unselected,selected) = working.partition_for_render();
        layers.push(SceneLayer::features(
            WORKING_LAYER.to_owned(),
            LayerStyle::new(session.work_color(), 3.0, 0.4),
            unselected.into_iter().map(|record| working.record_feature(record)).collect()
        ));
        layers.push(SceneLayer::features(
            SELECTED_LAYER.to_owned(),
            LayerStyle::new(config.selection_color, 5.0, 0.7),
            selected.into_iter().map(|record| working.record_feature(record)).collect()
        ));

        if !session.pending().is_empty() {
            layers.push(SceneLayer::features(
                PENDING_LAYER.to_owned(),
                LayerStyle::new(LayerColor::from_rgb(0x16, 0xa3, 0x4a), 2.0, 0.2),
                session.pending().features().to_vec()
            ));
        }

        let viewport = session.viewport();
        let highlight = viewport.highlight().cloned();
        if let Some(geometry) = &highlight {
            layers.push(SceneLayer::features(
                HIGHLIGHT_LAYER.to_owned(),
                LayerStyle::new(LayerColor::from_rgb(0xff, 0xa5, 0x00), 4.0, 0.0),
                vec![Feature::from(geometry.clone())]
            ));
        }

        Self {
            viewport: viewport.committed().clone(),
            fit_bounds: viewport.fit_bounds().map(Extent::lat_lon_bounds),
            highlight,
            layers
        }
    }

    pub(crate) const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub(crate) const fn fit_bounds(&self) -> Option<&[[f64;2];2]> {
        self.fit_bounds.as_ref()
    }

    pub(crate) const fn highlight(&self) -> Option<&Geometry> {
        self.highlight.as_ref()
    }

    pub(crate) fn layers(&self) -> &[SceneLayer] {
        &self.layers
    }

    pub(crate) fn layer(&self, id: &str) -> Option<&SceneLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Lists the layers a renderer has to touch to get from the previous scene to this one.
    pub(crate) fn changes_since(&self, previous: &Self) -> Vec<SceneChange> {
        let mut changes = Vec::new();
        if self.viewport != previous.viewport || self.fit_bounds != previous.fit_bounds {
            changes.push(SceneChange::ViewportMoved)
        }
        for old in &previous.layers {
            if self.layer(&old.id).is_none() {
                changes.push(SceneChange::Removed(old.id.clone()))
            }
        }
        for layer in &self.layers {
            match previous.layer(&layer.id) {
                None => changes.push(SceneChange::Added(layer.id.clone())),
                Some(old) if old.content != layer.content => changes.push(SceneChange::Redrawn(layer.id.clone())),
                Some(old) if old.style != layer.style => changes.push(SceneChange::Restyled(layer.id.clone())),
                Some(_) => ()
            }
        }
        changes
    }

}
