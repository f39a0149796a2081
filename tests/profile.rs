mod network;

use approx::assert_relative_eq;
use geo::{LineString, MultiLineString, coord, line_string};
use netzbezug::{
    Direction, EdgeBinding, EdgeId, LinearReference, MatchedGeometry, MatchingConfig,
    MatchingService, MatchingStatistics, NetzbezugResult, ProfileProperties, ProfileService,
    Route, RouteId, SourceWayId, Surface, Variant, WayProperties, WayType,
};
use test_log::test;

use crate::network::{GEOJSON_NETWORK, ScriptedMatcher, ScriptedRouter};

const ASPHALT_CYCLEWAY: ProfileProperties = ProfileProperties {
    surface: Surface::Asphalt,
    way_type: WayType::Cycleway,
};

const GRAVEL_ROAD: ProfileProperties = ProfileProperties {
    surface: Surface::WaterBoundGravel,
    way_type: WayType::Road,
};

fn matched(geometry: &LineString) -> Option<MatchedGeometry> {
    Some(MatchedGeometry {
        geometry: geometry.clone(),
        way_ids: vec![SourceWayId(100), SourceWayId(200)],
    })
}

fn way_properties() -> Vec<WayProperties> {
    vec![
        WayProperties::new(SourceWayId(100), LinearReference::FULL, ASPHALT_CYCLEWAY)
            .with_elevation(2.0, 0.0),
        WayProperties::new(SourceWayId(200), LinearReference::FULL, GRAVEL_ROAD)
            .with_elevation(5.0, 1.0),
    ]
}

fn bound_route(id: u64, bindings: Vec<EdgeBinding>) -> Route {
    let geometry = MultiLineString::new(vec![line_string![
        (x: 0.0, y: 0.0),
        (x: 200.0, y: 0.0),
        (x: 200.0, y: 100.0),
    ]]);

    let mut route = Route::new(RouteId(id), "Höhenweg", Some(geometry));
    route.netzbezug = Some(NetzbezugResult {
        edge_bindings: bindings,
        ..Default::default()
    });
    route
}

#[test]
fn update_profile_along_split_way() {
    let matcher = ScriptedMatcher::new(matched).with_properties(way_properties());
    let service = ProfileService::new(MatchingConfig::default(), &*GEOJSON_NETWORK, &matcher);

    let mut route = bound_route(
        1,
        vec![
            EdgeBinding::full(EdgeId(1), Direction::Forward),
            EdgeBinding::full(EdgeId(2), Direction::Forward),
            EdgeBinding::full(EdgeId(3), Direction::Forward),
        ],
    );

    let statistics = service.update_profiles(&mut route);
    assert_eq!(statistics.profiled, 1);

    // the connected bindings are matched at once
    let calls = matcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        line_string![
            (x: 0.0, y: 0.0),
            (x: 50.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 200.0, y: 0.0),
            (x: 200.0, y: 100.0),
        ]
    );

    let profile = route.profile.as_ref().unwrap();
    assert_eq!(profile.segments.len(), 2);

    assert_eq!(profile.segments[0].properties, ASPHALT_CYCLEWAY);
    assert_relative_eq!(profile.segments[0].reference.from(), 0.0);
    assert_relative_eq!(profile.segments[0].reference.to(), 2.0 / 3.0);

    assert_eq!(profile.segments[1].properties, GRAVEL_ROAD);
    assert_relative_eq!(profile.segments[1].reference.from(), 2.0 / 3.0);
    assert_relative_eq!(profile.segments[1].reference.to(), 1.0);

    assert_relative_eq!(route.ascent().unwrap(), 7.0);
    assert_relative_eq!(route.descent().unwrap(), 1.0);
}

#[test]
fn update_profile_in_reverse() {
    let matcher = ScriptedMatcher::new(matched).with_properties(way_properties());
    let service = ProfileService::new(MatchingConfig::default(), &*GEOJSON_NETWORK, &matcher);

    let mut route = bound_route(
        2,
        vec![
            EdgeBinding::full(EdgeId(3), Direction::Backward),
            EdgeBinding::full(EdgeId(2), Direction::Backward),
        ],
    );

    service.update_profiles(&mut route);

    let profile = route.profile.as_ref().unwrap();
    assert_eq!(profile.segments.len(), 2);
    assert_eq!(profile.segments[0].properties, GRAVEL_ROAD);
    assert_eq!(profile.segments[1].properties, ASPHALT_CYCLEWAY);
    assert_relative_eq!(profile.segments[1].reference.from(), 0.5);

    // half of way 100 is traversed against its direction
    assert_relative_eq!(profile.ascent, 1.0);
    assert_relative_eq!(profile.descent, 6.0);
}

#[test]
fn update_profiles_skips_courses_without_geometry_or_bindings() {
    let matcher = ScriptedMatcher::new(matched).with_properties(way_properties());
    let service = ProfileService::new(MatchingConfig::default(), &*GEOJSON_NETWORK, &matcher);

    let mut route = bound_route(3, vec![EdgeBinding::full(EdgeId(1), Direction::Forward)])
        .with_variant(Variant::new("ohne Verlauf", None))
        .with_variant(Variant::new(
            "nicht zugeordnet",
            Some(MultiLineString::new(vec![line_string![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
            ]])),
        ));

    let statistics = service.update_profiles(&mut route);

    assert_eq!(statistics.profiled, 1);
    assert_eq!(statistics.without_geometry, 1);
    assert_eq!(statistics.no_match, 1);
    assert_eq!(statistics.failed, 0);

    assert!(route.profile.is_some());
    assert_eq!(route.variants[0].profile, None);
    assert_eq!(route.variants[1].profile, None);
}

#[test]
fn update_profile_with_inconsistent_bindings() {
    let matcher = ScriptedMatcher::new(matched).with_properties(way_properties());
    let service = ProfileService::new(MatchingConfig::default(), &*GEOJSON_NETWORK, &matcher);

    let mut route = bound_route(4, vec![EdgeBinding::full(EdgeId(42), Direction::Forward)]);

    let statistics = service.update_profiles(&mut route);

    assert_eq!(statistics.inconsistent, 1);
    assert_eq!(route.profile, None);
    assert!(matcher.calls().is_empty());
}

#[test]
fn update_profile_after_matching_snapped_route() {
    // the route starts 3 meters before node 1
    let matcher = ScriptedMatcher::new(|_: &LineString| {
        Some(MatchedGeometry {
            geometry: line_string![(x: 3.0, y: 0.0), (x: 200.0, y: 0.0)],
            way_ids: vec![SourceWayId(100)],
        })
    })
    .with_properties(way_properties());
    let router = ScriptedRouter::new(|_| None);

    let matching =
        MatchingService::new(MatchingConfig::default(), &*GEOJSON_NETWORK, &matcher, &router);

    let mut route = Route::new(
        RouteId(5),
        "Uferweg",
        Some(MultiLineString::new(vec![line_string![
            (x: 3.0, y: 1.0),
            (x: 200.0, y: 1.0),
        ]])),
    );
    matching.match_route(&mut route, &mut MatchingStatistics::default());

    assert_eq!(
        route.netzbezug.as_ref().map(|n| n.edge_bindings.clone()),
        Some(vec![
            EdgeBinding::full(EdgeId(1), Direction::Forward),
            EdgeBinding::full(EdgeId(2), Direction::Forward),
        ])
    );

    let profiles = ProfileService::new(MatchingConfig::default(), &*GEOJSON_NETWORK, &matcher);
    let statistics = profiles.update_profiles(&mut route);
    assert_eq!(statistics.profiled, 1);

    // the geometry matched for the profile starts at the snapped node
    let calls = matcher.calls();
    assert_eq!(calls[1].0.first(), Some(&coord! { x: 0.0, y: 0.0 }));

    let profile = route.profile.unwrap();
    assert_eq!(profile.segments.len(), 1);
    assert_eq!(profile.segments[0].reference, LinearReference::FULL);
    assert_eq!(profile.segments[0].properties, ASPHALT_CYCLEWAY);
    assert_relative_eq!(profile.ascent, 2.0);
}
