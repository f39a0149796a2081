use geo::{Geometry, LineString, MultiLineString};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::geometry::is_valid_line;
use crate::profile::ProfileResult;
use crate::service::NetzbezugResult;

/// Uniquely identify an imported route (Fahrradroute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub u64);

/// Route as read from an external catalog export, before it's bound to the network.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteRecord {
    pub id: u64,
    pub name: String,
    pub geometry: Option<Geometry>,
    pub attributes: FxHashMap<String, String>,
    pub variants: Vec<VariantRecord>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariantRecord {
    pub name: String,
    pub geometry: Option<Geometry>,
}

/// Imported route (Fahrradroute) and everything derived from binding it to the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub attributes: FxHashMap<String, String>,
    /// Route geometry as imported, each line is matched independently.
    pub geometry: Option<MultiLineString>,
    pub netzbezug: Option<NetzbezugResult>,
    pub profile: Option<ProfileResult>,
    pub variants: Vec<Variant>,
}

/// Named alternative course (FahrradrouteVariante) of a route, for example a detour.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variant {
    pub name: String,
    pub geometry: Option<MultiLineString>,
    pub netzbezug: Option<NetzbezugResult>,
    pub profile: Option<ProfileResult>,
}

impl Route {
    pub fn new(id: RouteId, name: impl Into<String>, geometry: Option<MultiLineString>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: FxHashMap::default(),
            geometry,
            netzbezug: None,
            profile: None,
            variants: vec![],
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Elevation gain in meters, known once the profile was projected.
    pub fn ascent(&self) -> Option<f64> {
        self.profile.as_ref().map(|p| p.ascent)
    }

    /// Elevation loss in meters, known once the profile was projected.
    pub fn descent(&self) -> Option<f64> {
        self.profile.as_ref().map(|p| p.descent)
    }
}

impl Variant {
    pub fn new(name: impl Into<String>, geometry: Option<MultiLineString>) -> Self {
        Self {
            name: name.into(),
            geometry,
            ..Default::default()
        }
    }

    pub fn ascent(&self) -> Option<f64> {
        self.profile.as_ref().map(|p| p.ascent)
    }

    pub fn descent(&self) -> Option<f64> {
        self.profile.as_ref().map(|p| p.descent)
    }
}

impl From<RouteRecord> for Route {
    fn from(record: RouteRecord) -> Self {
        let RouteRecord {
            id,
            name,
            geometry,
            attributes,
            variants,
        } = record;

        Self {
            attributes,
            variants: variants.into_iter().map(Variant::from).collect(),
            ..Self::new(RouteId(id), name, geometry.and_then(to_lines))
        }
    }
}

impl From<VariantRecord> for Variant {
    fn from(record: VariantRecord) -> Self {
        Self::new(record.name, record.geometry.and_then(to_lines))
    }
}

/// Converts the imported geometry into the lines that can be matched.
/// Returns None if the geometry doesn't contain any valid line.
pub fn to_lines(geometry: Geometry) -> Option<MultiLineString> {
    let mut lines: Vec<LineString> = vec![];
    collect_lines(geometry, &mut lines);

    lines.retain(is_valid_line);

    if lines.is_empty() {
        debug!("Geometry doesn't contain any line");
        None
    } else {
        Some(MultiLineString::new(lines))
    }
}

fn collect_lines(geometry: Geometry, lines: &mut Vec<LineString>) {
    match geometry {
        Geometry::Line(line) => lines.push(LineString::new(vec![line.start, line.end])),
        Geometry::LineString(line) => lines.push(line),
        Geometry::MultiLineString(multi) => lines.extend(multi),
        Geometry::GeometryCollection(collection) => {
            for geometry in collection {
                collect_lines(geometry, lines);
            }
        }
        _ => (),
    }
}
