//! Route maps as self-contained Leaflet pages.
//!
//! The map data is serialized to JSON and embedded into a static page template,
//! the page itself does all the drawing.

use crate::algo::{congestion::HotspotSet, Route};
use crate::datastr::{
    graph::{EdgeId, Graph, RoadNetwork},
    graph_store::Snapshot,
};
use crate::error::Result;
use serde::Serialize;
use std::{fs, path::Path};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct Line {
    path: Vec<(f64, f64)>,
    label: String,
}

#[derive(Debug, Serialize)]
struct Marker {
    position: (f64, f64),
    label: String,
}

#[derive(Debug, Serialize)]
struct MapData {
    center: (f64, f64),
    edges: Vec<Line>,
    hotspots: Vec<Line>,
    route: Option<Line>,
    markers: Vec<Marker>,
}

fn edge_line(network: &RoadNetwork, snapshot: &Snapshot, edge: EdgeId) -> Option<Line> {
    let from = network.coords(network.tail(edge))?;
    let to = network.coords(network.head(edge))?;
    Some(Line {
        path: vec![(from.lat, from.lon), (to.lat, to.lon)],
        label: format!("{} (weight: {})", network.edge_label(edge), snapshot.weight(edge)),
    })
}

fn map_data(network: &RoadNetwork, snapshot: &Snapshot, route: Option<&Route>, hotspots: &HotspotSet) -> MapData {
    let edges = (0..network.num_arcs() as EdgeId).filter_map(|edge| edge_line(network, snapshot, edge)).collect();
    let hotspots = hotspots.edges().iter().filter_map(|&edge| edge_line(network, snapshot, edge)).collect();

    let route_points: Vec<(f64, f64)> = route
        .map(|route| route.nodes.iter().filter_map(|&node| network.coords(node)).map(|c| (c.lat, c.lon)).collect())
        .unwrap_or_default();

    let mut markers = Vec::new();
    if let (Some(&start), Some(&end)) = (route_points.first(), route_points.last()) {
        markers.push(Marker {
            position: start,
            label: "Start".to_string(),
        });
        markers.push(Marker {
            position: end,
            label: "End".to_string(),
        });
    }

    let center = route_points
        .first()
        .copied()
        .or_else(|| (0..network.num_nodes() as u32).find_map(|node| network.coords(node)).map(|c| (c.lat, c.lon)))
        .unwrap_or((0.0, 0.0));

    let route = route.filter(|_| !route_points.is_empty()).map(|route| Line {
        label: format!("Route (cost: {:.2})", route.cost),
        path: route_points,
    });

    MapData {
        center,
        edges,
        hotspots,
        route,
        markers,
    }
}

/// Render the page for the given route and hotspots.
pub fn render_route_map(network: &RoadNetwork, snapshot: &Snapshot, route: Option<&Route>, hotspots: &HotspotSet) -> Result<String> {
    if !network.has_all_coords() {
        warn!("some nodes have no coordinates, their edges are left out of the map");
    }
    let data = serde_json::to_string(&map_data(network, snapshot, route, hotspots))?;
    Ok(PAGE_TEMPLATE.replace("{{MAP_DATA}}", &data))
}

/// Write the map page to `path`, replacing any existing file.
pub fn write_route_map(network: &RoadNetwork, snapshot: &Snapshot, route: Option<&Route>, hotspots: &HotspotSet, path: &Path) -> Result<()> {
    fs::write(path, render_route_map(network, snapshot, route, hotspots)?)?;
    info!(path = %path.display(), "map saved, open it in a browser to view");
    Ok(())
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>routeiq route map</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
const data = {{MAP_DATA}};
const map = L.map('map').setView(data.center, 14);
L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
  attribution: '&copy; OpenStreetMap contributors'
}).addTo(map);
for (const edge of data.edges) {
  L.polyline(edge.path, { color: 'gray', weight: 2, opacity: 0.5 }).bindTooltip(edge.label).addTo(map);
}
if (data.route) {
  L.polyline(data.route.path, { color: 'blue', weight: 5, opacity: 0.8 }).bindTooltip(data.route.label).addTo(map);
}
for (const marker of data.markers) {
  L.marker(marker.position).bindPopup(marker.label).addTo(map);
}
for (const hotspot of data.hotspots) {
  L.polyline(hotspot.path, { color: 'red', weight: 4, opacity: 0.7 }).bindTooltip('Hotspot ' + hotspot.label).addTo(map);
}
</script>
</body>
</html>
"#;
