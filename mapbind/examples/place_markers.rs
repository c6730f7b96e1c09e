//! This example shows a map with user placed markers and a road highlighter. Clicks on the map
//! create places, every place becomes a marker with a popup, and clicking a road highlights it.
//!
//! The map engine here is the in-memory [`HeadlessEngine`], so the example drives it by
//! dispatching the events a real engine would fire.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use mapbind::mapbind_types::{
    lnglat, Element, Expression, LayerKind, LayerSpec, LngLat, RenderedFeature, ScreenPoint,
    Surface,
};
use mapbind::{
    ClickBinding, HeadlessEngine, LayerBinding, MapEvent, MapEventKind, MapHandle, MapOptions,
    MapProvider, MarkerBinding, OnLoadBinding, SourceBinding,
};

const ROADS_SOURCE: &str = "composite";
const ROADS_SOURCE_LAYER: &str = "road";
const HIGHLIGHT_LAYER: &str = "highlighted-road";

#[derive(Debug, Clone)]
struct Place {
    title: String,
    description: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let engine = HeadlessEngine::new();
    let mut provider = MapProvider::new(
        MapOptions::new(lnglat!(-118.4912, 34.0119)).with_zoom(14.0),
        engine.factory(),
    );
    let map = provider
        .mount(Some(&Surface::new("map")))?
        .context("drawing surface is not attached")?;

    let clicked: Rc<RefCell<Vec<LngLat>>> = Rc::default();
    let clicked_in_handler = clicked.clone();

    provider.attach(SourceBinding::vector(
        ROADS_SOURCE,
        "mapbox://mapbox.mapbox-streets-v8",
    ))?;
    provider.attach(
        LayerBinding::new(
            LayerSpec::new(HIGHLIGHT_LAYER, LayerKind::Line)
                .with_source(ROADS_SOURCE, Some(ROADS_SOURCE_LAYER))
                .with_paint("line-color", "#ff6a00")
                .with_paint("line-width", 6)
                .with_filter(Expression::id_eq("")),
        )
        .before("road-label"),
    )?;
    provider.attach(OnLoadBinding::new(|_: &MapHandle, _: &MapEvent| {
        log::info!("Map is loaded");
    }))?;
    provider.attach(ClickBinding::new(move |map: &MapHandle, event: &MapEvent| {
        if let Some(lng_lat) = event.lng_lat {
            clicked_in_handler.borrow_mut().push(lng_lat);
        }

        if let Some(point) = event.point {
            highlight_road(map, point);
        }
    }))?;

    // Style loads, a road label layer appears, then the rest of the map loads.
    engine.set_loaded(true);
    map.dispatch(MapEventKind::StyleLoad);
    map.add_layer(
        LayerSpec::new("road-label", LayerKind::Symbol)
            .with_source(ROADS_SOURCE, Some(ROADS_SOURCE_LAYER)),
        None,
    )?;
    map.dispatch(MapEventKind::StyleData);
    map.dispatch(MapEventKind::Load);

    let road_point = ScreenPoint::new(320.0, 240.0);
    engine.add_rendered_feature(
        road_point,
        RenderedFeature::new("road-label")
            .with_id(4242u64)
            .with_source(ROADS_SOURCE, Some(ROADS_SOURCE_LAYER)),
    );

    map.dispatch(MapEvent::click(road_point, lnglat!(-118.4965, 34.0101)));
    map.dispatch(MapEvent::click(
        ScreenPoint::new(120.0, 80.0),
        lnglat!(-118.4973, 34.0092),
    ));

    let places: Vec<(LngLat, Place)> = clicked
        .borrow()
        .iter()
        .enumerate()
        .map(|(index, lng_lat)| {
            let place = Place {
                title: format!("Place {}", index + 1),
                description: format!("Added at {:.4}, {:.4}", lng_lat.lng(), lng_lat.lat()),
            };
            (*lng_lat, place)
        })
        .collect();

    for (lng_lat, place) in places {
        provider.attach(
            MarkerBinding::new(lng_lat)
                .with_payload(place)
                .with_element(|_: &Place| Element::container().with_attribute("class", "pin"))
                .with_popup(|place: &Place, container: &mut Element| {
                    container.append(Element::new("h3").with_text(place.title.as_str()));
                    container.append(Element::new("p").with_text(place.description.as_str()));
                })
                .on_click(|place: &Place| log::info!("Clicked on {}", place.title)),
        )?;
    }

    log::info!(
        "Map has {} markers and layers {:?}",
        engine.marker_count(),
        map.layer_order()
    );

    provider.unmount();
    Ok(())
}

fn highlight_road(map: &MapHandle, point: ScreenPoint) {
    let road = map
        .query_rendered_features(point, None)
        .into_iter()
        .find(|feature| {
            feature.source.as_deref() == Some(ROADS_SOURCE)
                && feature.source_layer.as_deref() == Some(ROADS_SOURCE_LAYER)
        });

    // Clicks away from roads keep the current highlight.
    let Some(id) = road.and_then(|road| road.id) else {
        return;
    };

    log::info!("Highlighting road {id:?}");
    map.set_filter(HIGHLIGHT_LAYER, Some(Expression::id_eq(id)));
}
