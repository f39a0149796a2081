use std::sync::Mutex;

use geo::{Coord, LineString};
use netzbezug::{
    FailureReason, MapMatcher, MatchedGeometry, NoMatchFound, NoRouteFound, Router, RoutingResult,
    TransportProfile, WayProperties,
};

/// Map matcher answering from a closure and recording the geometries it was called with.
pub struct ScriptedMatcher<F> {
    matcher: F,
    properties: Vec<WayProperties>,
    calls: Mutex<Vec<LineString>>,
}

impl<F: Fn(&LineString) -> Option<MatchedGeometry>> ScriptedMatcher<F> {
    pub fn new(matcher: F) -> Self {
        Self {
            matcher,
            properties: vec![],
            calls: Mutex::new(vec![]),
        }
    }

    pub fn with_properties(mut self, properties: Vec<WayProperties>) -> Self {
        self.properties = properties;
        self
    }

    pub fn calls(&self) -> Vec<LineString> {
        self.calls.lock().unwrap().clone()
    }
}

impl<F: Fn(&LineString) -> Option<MatchedGeometry>> MapMatcher for ScriptedMatcher<F> {
    fn match_geometry(
        &self,
        geometry: &LineString,
        _: TransportProfile,
    ) -> Result<MatchedGeometry, NoMatchFound> {
        self.calls.lock().unwrap().push(geometry.clone());
        (self.matcher)(geometry).ok_or(NoMatchFound::new(FailureReason::NotFound))
    }

    fn match_with_properties(
        &self,
        geometry: &LineString,
        profile: TransportProfile,
    ) -> Result<(MatchedGeometry, Vec<WayProperties>), NoMatchFound> {
        let matched = self.match_geometry(geometry, profile)?;
        Ok((matched, self.properties.clone()))
    }
}

/// Router answering from a closure and recording the coordinates it was called with.
pub struct ScriptedRouter<F> {
    router: F,
    calls: Mutex<Vec<Vec<Coord>>>,
}

impl<F: Fn(&[Coord]) -> Option<RoutingResult>> ScriptedRouter<F> {
    pub fn new(router: F) -> Self {
        Self {
            router,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<Vec<Coord>> {
        self.calls.lock().unwrap().clone()
    }
}

impl<F: Fn(&[Coord]) -> Option<RoutingResult>> Router for ScriptedRouter<F> {
    fn route(
        &self,
        coordinates: &[Coord],
        _: TransportProfile,
        _: bool,
    ) -> Result<RoutingResult, NoRouteFound> {
        self.calls.lock().unwrap().push(coordinates.to_vec());
        (self.router)(coordinates).ok_or(NoRouteFound::new(FailureReason::NotFound))
    }
}
