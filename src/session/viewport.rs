use geojson::Geometry;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::utils::extent::Extent;

/// A map view: center as latitude and longitude, plus a web map zoom level.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize,JsonSchema)]
pub(crate) struct Viewport {
    pub(crate) center: [f64;2],
    pub(crate) zoom: f64
}

impl Viewport {

    pub(crate) const fn new(lat: f64, lon: f64, zoom: f64) -> Self {
        Self {
            center: [lat,lon],
            zoom
        }
    }
}

/// Tracks the view the map was last built with, and the view the user has since moved to.
pub(crate) struct ViewportState {
    initial: Viewport,
    committed: Viewport,
    observed: Viewport,
    fit_bounds: Option<Extent>,
    highlight: Option<Geometry>
}

impl ViewportState {

    pub(crate) fn new(initial: Viewport) -> Self {
        Self {
            committed: initial.clone(),
            observed: initial.clone(),
            initial,
            fit_bounds: None,
            highlight: None
        }
    }

    pub(crate) const fn committed(&self) -> &Viewport {
        &self.committed
    }

    pub(crate) const fn fit_bounds(&self) -> Option<&Extent> {
        self.fit_bounds.as_ref()
    }

    pub(crate) const fn highlight(&self) -> Option<&Geometry> {
        self.highlight.as_ref()
    }

    /// Records where the user has panned or zoomed to. This does not cause a rebuild of the map.
    pub(crate) fn observe(&mut self, viewport: Viewport) {
        self.observed = viewport
    }

    /// Called before every internal rebuild, so the map doesn't jump back to where it was first built.
    pub(crate) fn carry_over(&mut self) {
        self.committed = self.observed.clone()
    }

    pub(crate) fn reset(&mut self) {
        self.committed = self.initial.clone();
        self.observed = self.initial.clone();
        self.fit_bounds = None;
        self.highlight = None;
    }

    /// The next rebuild will zoom to these bounds and outline the geometry, if there is one.
    pub(crate) fn request_fit(&mut self, bounds: Extent, highlight: Option<Geometry>) {
        self.fit_bounds = Some(bounds);
        self.highlight = highlight;
    }

    /// Fit requests only apply to one rebuild. Once the map has been built with one, it's replaced by the view it produced.
    pub(crate) fn take_fit(&mut self) -> Option<(Extent,Option<Geometry>)> {
        let bounds = self.fit_bounds.take()?;
        let (lat,lon) = bounds.center();
        self.observed = Viewport::new(lat, lon, self.observed.zoom);
        self.committed = self.observed.clone();
        Some((bounds,self.highlight.take()))
    }

}

#[cfg(test)]
mod test {

    use super::Viewport;
    use super::ViewportState;
    use crate::utils::extent::Extent;

    #[test]
    fn test_carry_over_commits_observed_view() {
        let mut state = ViewportState::new(Viewport::new(-33.0,-70.0,10.0));
        state.observe(Viewport::new(-34.0,-71.0,12.0));
        assert_eq!(state.committed(),&Viewport::new(-33.0,-70.0,10.0));
        state.carry_over();
        assert_eq!(state.committed(),&Viewport::new(-34.0,-71.0,12.0));
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut state = ViewportState::new(Viewport::new(-33.0,-70.0,10.0));
        state.observe(Viewport::new(-34.0,-71.0,12.0));
        state.carry_over();
        state.request_fit(Extent::new(0.0,0.0,1.0,1.0), None);
        state.reset();
        assert_eq!(state.committed(),&Viewport::new(-33.0,-70.0,10.0));
        assert!(state.fit_bounds().is_none());
        // the observed view was reset too
        state.carry_over();
        assert_eq!(state.committed(),&Viewport::new(-33.0,-70.0,10.0));
    }

    #[test]
    fn test_fit_is_consumed_once() {
        let mut state = ViewportState::new(Viewport::new(-33.0,-70.0,10.0));
        state.request_fit(Extent::new(-72.0,-34.0,-70.0,-32.0), None);
        let (bounds,highlight) = state.take_fit().unwrap();
        assert_eq!(bounds.lat_lon_bounds(),[[-34.0,-72.0],[-32.0,-70.0]]);
        assert!(highlight.is_none());
        assert!(state.take_fit().is_none());
        assert_eq!(state.committed(),&Viewport::new(-33.0,-71.0,10.0));
    }
}
