//! End-to-end behaviour of bindings attached through a mounted provider.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use approx::assert_relative_eq;
use assert_matches::assert_matches;
use mapbind::binding::EventState;
use mapbind::headless::EngineCall;
use mapbind::mapbind_types::{
    lnglat, Element, LayerKind, LayerSpec, RenderedFeature, ScreenPoint, SourceSpec, Surface,
    TerrainSpec,
};
use mapbind::{
    Binding, ClickBinding, EventBinding, HeadlessEngine, LayerBinding, MapBindError, MapContext,
    MapEvent, MapEventKind, MapHandle, MapOptions, MapProvider, MarkerBinding, RasterDemSource,
    SourceBinding,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mount(engine: &HeadlessEngine) -> (MapProvider, MapHandle) {
    init_logger();
    let mut provider = MapProvider::new(
        MapOptions::new(lnglat!(-118.4912, 34.0119)),
        engine.factory(),
    );
    let map = provider
        .mount(Some(&Surface::new("map")))
        .expect("failed to mount")
        .expect("surface is attached");

    (provider, map)
}

fn style_loaded(engine: &HeadlessEngine, map: &MapHandle) {
    engine.set_style_loaded(true);
    map.dispatch(MapEventKind::StyleLoad);
}

fn add_layer_calls(engine: &HeadlessEngine, id: &str) -> usize {
    engine.count_calls(|call| matches!(call, EngineCall::AddLayer { spec, .. } if spec.id == id))
}

fn remove_layer_calls(engine: &HeadlessEngine, id: &str) -> usize {
    engine.count_calls(|call| matches!(call, EngineCall::RemoveLayer(layer) if layer == id))
}

#[test]
fn deferred_layer_is_added_once_after_style_load() {
    let engine = HeadlessEngine::new();
    let (mut provider, map) = mount(&engine);
    let spec = LayerSpec::new("highlighted-road", LayerKind::Line).with_source("composite", Some("road"));

    provider
        .attach(LayerBinding::new(spec.clone()).before("road-label"))
        .expect("provider is mounted");
    assert_eq!(add_layer_calls(&engine, "highlighted-road"), 0);

    style_loaded(&engine, &map);
    map.dispatch(MapEventKind::StyleData);
    map.dispatch(MapEventKind::StyleLoad);
    map.dispatch(MapEventKind::Load);

    let calls: Vec<EngineCall> = engine
        .calls()
        .iter()
        .filter(|call| matches!(call, EngineCall::AddLayer { .. }))
        .cloned()
        .collect();
    assert_eq!(
        calls,
        vec![EngineCall::AddLayer {
            spec: spec.clone(),
            before: Some("road-label".to_owned()),
        }]
    );
    assert_eq!(map.layer("highlighted-road"), Some(spec));
}

#[test]
fn duplicate_layer_id_keeps_first_layer() {
    let engine = HeadlessEngine::new().with_style_loaded();
    let (mut provider, map) = mount(&engine);

    provider
        .attach(LayerBinding::new(LayerSpec::new("foo", LayerKind::Fill)))
        .expect("provider is mounted");
    provider
        .attach(LayerBinding::new(LayerSpec::new("foo", LayerKind::Line)))
        .expect("provider is mounted");

    assert_eq!(add_layer_calls(&engine, "foo"), 1);
    assert_eq!(map.layer_order(), vec!["foo".to_owned()]);
    assert_eq!(map.layer("foo").map(|layer| layer.kind), Some(LayerKind::Fill));
}

#[derive(Debug, Clone, PartialEq)]
struct Place {
    id: String,
    title: String,
}

#[test]
fn marker_click_reports_payload_and_toggles_popup() {
    let engine = HeadlessEngine::new();
    let (_provider, map) = mount(&engine);
    let place = Place {
        id: "1".into(),
        title: "A".into(),
    };

    let clicked = Rc::new(RefCell::new(vec![]));
    let clicked_in_handler = clicked.clone();
    let map_clicks = Rc::new(Cell::new(0));
    let map_clicks_in_handler = map_clicks.clone();

    let context = MapContext::default();
    assert_matches!(
        context
            .attach(MarkerBinding::<Place>::new(lnglat!(1.0, 2.0)))
            .err(),
        Some(MapBindError::Configuration)
    );

    let _click = EventBinding::new(MapEventKind::Click, move |_: &MapHandle, _: &MapEvent| {
        map_clicks_in_handler.set(map_clicks_in_handler.get() + 1)
    })
    .attach(&map);

    let binding = MarkerBinding::new(lnglat!(1.0, 2.0))
        .with_payload(place.clone())
        .with_popup(|place: &Place, container: &mut Element| {
            container.append(Element::new("h3").with_text(place.title.as_str()))
        })
        .on_click(move |place: &Place| clicked_in_handler.borrow_mut().push(place.clone()));
    let token = binding.attach(&map);
    let marker = token.marker_id().expect("marker is created");

    map.dispatch_overlay_click(
        marker,
        MapEvent::click(ScreenPoint::new(1.0, 1.0), lnglat!(1.0, 2.0)),
    );

    assert_eq!(*clicked.borrow(), vec![place]);
    assert!(map.is_popup_open(marker));
    assert_eq!(map_clicks.get(), 0);

    binding.detach(&map, token);
    assert!(!map.has_marker(marker));
    assert!(map.marker_popup(marker).is_none());
}

#[test]
fn scoped_click_binds_once_layer_appears() {
    let engine = HeadlessEngine::new().with_style_loaded();
    let (_provider, map) = mount(&engine);
    let point = ScreenPoint::new(100.0, 100.0);
    engine.add_rendered_feature(point, RenderedFeature::new("roads").with_id(7u64));

    let clicks = Rc::new(RefCell::new(vec![]));
    let clicks_in_handler = clicks.clone();
    let binding = ClickBinding::new(move |_: &MapHandle, event: &MapEvent| {
        clicks_in_handler.borrow_mut().push(event.features.len())
    })
    .with_layer("roads");
    let token = binding.attach(&map);

    map.dispatch(MapEventKind::StyleData);
    assert_matches!(token.state(), EventState::Pending(_));
    assert_eq!(map.listener_count(MapEventKind::Click, Some("roads")), 0);

    let _roads = LayerBinding::new(LayerSpec::new("roads", LayerKind::Line)).attach(&map);
    for _ in 0..5 {
        map.dispatch(MapEventKind::StyleData);
    }

    assert_matches!(token.state(), EventState::Bound(_));
    assert_eq!(map.listener_count(MapEventKind::Click, Some("roads")), 1);

    map.dispatch(MapEvent::click(point, lnglat!(0.0, 0.0)));
    assert_eq!(*clicks.borrow(), vec![1]);

    binding.detach(&map, token);
    assert_eq!(map.listener_count(MapEventKind::Click, Some("roads")), 0);
}

#[test]
fn raster_dem_sets_terrain_after_style_load() {
    let engine = HeadlessEngine::new();
    let (mut provider, map) = mount(&engine);

    let key = provider
        .attach(SourceBinding::raster_dem(
            RasterDemSource::new("dem", "mapbox://mapbox.mapbox-terrain-dem-v1")
                .with_exaggeration(1.2),
        ))
        .expect("provider is mounted");
    assert!(!map.has_source("dem"));

    style_loaded(&engine, &map);
    map.dispatch(MapEventKind::StyleLoad);

    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::AddSource { id, .. } if id == "dem")),
        1
    );
    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::SetTerrain(Some(_)))),
        1
    );
    assert_matches!(
        map.source("dem"),
        Some(SourceSpec::RasterDem { tile_size: 512, maxzoom: 14, .. })
    );
    let terrain = map.terrain().expect("terrain is set");
    assert_eq!(terrain.source, "dem");
    assert_relative_eq!(terrain.exaggeration, 1.2);

    assert!(provider.detach(key));
    assert!(!map.has_source("dem"));
    assert_eq!(map.terrain(), None::<TerrainSpec>);
}

#[test]
fn registrations_balance_removals() {
    let engine = HeadlessEngine::new();
    let (mut provider, map) = mount(&engine);

    let mut keys = vec![];
    for round in 0..3 {
        keys.push(
            provider
                .attach(LayerBinding::new(LayerSpec::new("water", LayerKind::Fill)))
                .expect("provider is mounted"),
        );
        keys.push(
            provider
                .attach(LayerBinding::new(LayerSpec::new("water", LayerKind::Fill)))
                .expect("provider is mounted"),
        );

        if round == 1 {
            style_loaded(&engine, &map);
        }

        if round % 2 == 0 {
            for key in keys.drain(..) {
                provider.detach(key);
            }
        }
    }

    for key in keys.drain(..) {
        provider.detach(key);
    }

    assert_eq!(provider.child_count(), 0);
    assert!(!map.has_layer("water"));
    assert_eq!(
        add_layer_calls(&engine, "water"),
        remove_layer_calls(&engine, "water")
    );
}

#[test]
fn detached_bindings_never_run_deferred_work() {
    let engine = HeadlessEngine::new();
    let (mut provider, map) = mount(&engine);

    let layer = provider
        .attach(LayerBinding::new(LayerSpec::new("sky", LayerKind::Sky)))
        .expect("provider is mounted");
    let dem = provider
        .attach(SourceBinding::raster_dem(RasterDemSource::new("dem", "mapbox://dem")))
        .expect("provider is mounted");
    assert_eq!(map.pending_callbacks(), 2);

    provider.detach(layer);
    provider.detach(dem);
    assert_eq!(map.pending_callbacks(), 0);

    style_loaded(&engine, &map);
    map.dispatch(MapEventKind::Load);

    assert!(!map.has_layer("sky"));
    assert!(!map.has_source("dem"));
    assert_eq!(add_layer_calls(&engine, "sky"), 0);
}

#[test]
fn unmount_destroys_engine_and_silences_bindings() {
    let engine = HeadlessEngine::new();
    let (mut provider, map) = mount(&engine);
    let calls = Rc::new(Cell::new(0));
    let calls_in_handler = calls.clone();

    provider
        .attach(LayerBinding::new(LayerSpec::new("sky", LayerKind::Sky)))
        .expect("provider is mounted");
    provider
        .attach(EventBinding::new(MapEventKind::Idle, move |_: &MapHandle, _: &MapEvent| {
            calls_in_handler.set(calls_in_handler.get() + 1)
        }))
        .expect("provider is mounted");

    provider.unmount();
    assert!(engine.is_destroyed());
    assert_eq!(provider.child_count(), 0);
    assert_matches!(provider.context().map(), Err(MapBindError::Configuration));

    map.dispatch(MapEventKind::StyleLoad);
    map.dispatch(MapEventKind::Idle);
    assert_eq!(calls.get(), 0);
    assert_eq!(add_layer_calls(&engine, "sky"), 0);
}
