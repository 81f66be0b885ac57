//! HERE Traffic Flow (v6.3, `flow.json`) as a traffic source.
//!
//! Every flow item (`RWS -> RW -> FIS -> FI`) becomes one segment from the first to the last point
//! of its shape. Nodes are named after their rounded position, so segments sharing an endpoint
//! share a node. The jam factor of the current flow (`CF[0].JF`, 0 to 10) is used as weight.

use super::*;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://traffic.ls.hereapi.com/traffic/6.3/flow.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HereSource {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl HereSource {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::DataSourceUnavailable("no HERE API key configured".to_string()));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(HereSource {
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

impl TrafficSource for HereSource {
    fn name(&self) -> &str {
        "here"
    }

    fn fetch(&self, area: &Area) -> Result<Vec<Segment>> {
        let bbox = area
            .bbox
            .ok_or_else(|| Error::DataSourceUnavailable(format!("HERE flow data needs a bounding box, got only the city {}", area.city)))?;

        let bbox_param = format!("{},{};{},{}", bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon);
        let response: FlowResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("apiKey", self.api_key.as_str()), ("bbox", bbox_param.as_str()), ("responseattributes", "sh,fc")])
            .send()?
            .error_for_status()?
            .json()?;

        let segments = response.into_segments();
        debug!(city = %area.city, segments = segments.len(), "fetched HERE flow data");
        Ok(segments)
    }
}

/// Parse a raw `flow.json` body.
pub fn parse_flow(body: &str) -> Result<Vec<Segment>> {
    let response: FlowResponse = serde_json::from_str(body)?;
    Ok(response.into_segments())
}

#[derive(Debug, Default, Deserialize)]
struct FlowResponse {
    #[serde(rename = "RWS", default)]
    roadway_sets: Vec<RoadwaySet>,
}

#[derive(Debug, Default, Deserialize)]
struct RoadwaySet {
    #[serde(rename = "RW", default)]
    roadways: Vec<Roadway>,
}

#[derive(Debug, Default, Deserialize)]
struct Roadway {
    #[serde(rename = "FIS", default)]
    flow_item_sets: Vec<FlowItemSet>,
}

#[derive(Debug, Default, Deserialize)]
struct FlowItemSet {
    #[serde(rename = "FI", default)]
    flow_items: Vec<FlowItem>,
}

#[derive(Debug, Default, Deserialize)]
struct FlowItem {
    #[serde(rename = "SHP", default)]
    shape: Vec<Shape>,
    #[serde(rename = "CF", default)]
    current_flow: Vec<CurrentFlow>,
}

/// Shapes come either as plain point strings or wrapped in an object with a `value` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Shape {
    Plain(String),
    Wrapped { value: Vec<String> },
}

impl Shape {
    fn points(&self) -> impl Iterator<Item = &str> {
        let strings: &[String] = match self {
            Shape::Plain(s) => std::slice::from_ref(s),
            Shape::Wrapped { value } => value,
        };
        strings.iter().flat_map(|s| s.split_whitespace())
    }
}

#[derive(Debug, Deserialize)]
struct CurrentFlow {
    #[serde(rename = "JF", default = "default_jam_factor")]
    jam_factor: f64,
}

fn default_jam_factor() -> f64 {
    1.0
}

fn parse_point(point: &str) -> Option<Coordinates> {
    let (lat, lon) = point.split_once(',')?;
    let coords = Coordinates::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?);
    Some(coords).filter(Coordinates::is_valid)
}

fn node_name(coords: Coordinates) -> String {
    format!("{:.5},{:.5}", coords.lat, coords.lon)
}

impl FlowResponse {
    fn into_segments(self) -> Vec<Segment> {
        let items = self
            .roadway_sets
            .into_iter()
            .flat_map(|rws| rws.roadways)
            .flat_map(|rw| rw.flow_item_sets)
            .flat_map(|fis| fis.flow_items);

        let mut segments = Vec::new();
        for item in items {
            // only the first shape of an item is used
            let points: Vec<Coordinates> = match item.shape.first() {
                Some(shape) => shape.points().filter_map(parse_point).collect(),
                None => continue,
            };
            let (from_pos, to_pos) = match (points.first(), points.last()) {
                (Some(&first), Some(&last)) if points.len() >= 2 => (first, last),
                _ => continue,
            };
            let weight = item.current_flow.first().map_or_else(default_jam_factor, |cf| cf.jam_factor);
            if !weight.is_finite() || weight < 0.0 {
                debug!(weight, "skipping flow item without usable jam factor");
                continue;
            }

            segments.push(Segment {
                from: node_name(from_pos),
                to: node_name(to_pos),
                weight,
                free_flow: None,
                from_pos: Some(from_pos),
                to_pos: Some(to_pos),
            });
        }
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOW: &str = r#"{
        "RWS": [{
            "RW": [{
                "FIS": [{
                    "FI": [
                        {
                            "SHP": [{ "value": ["52.52000,13.40500 52.52030,13.40550 ", "52.52050,13.40600 "], "FC": 3 }],
                            "CF": [{ "JF": 2.5, "SP": 30.0 }]
                        },
                        {
                            "SHP": ["52.52050,13.40600 52.52100,13.40700"],
                            "CF": [{ "SP": 45.0 }]
                        },
                        {
                            "SHP": [{ "value": ["52.52100,13.40700"] }],
                            "CF": [{ "JF": 4.0 }]
                        },
                        { "CF": [{ "JF": 7.0 }] },
                        {
                            "SHP": [{ "value": ["52.52100,13.40700 52.52150,13.40800"] }],
                            "CF": [{ "JF": -1.0 }]
                        }
                    ]
                }]
            }]
        }]
    }"#;

    #[test]
    fn parses_flow_items_into_segments() {
        let segments = parse_flow(FLOW).unwrap();
        assert_eq!(segments.len(), 2);

        assert_eq!(segments[0].from, "52.52000,13.40500");
        assert_eq!(segments[0].to, "52.52050,13.40600");
        assert_eq!(segments[0].weight, 2.5);
        assert_eq!(segments[0].to_pos, Some(Coordinates::new(52.5205, 13.406)));

        // shared endpoint means shared node
        assert_eq!(segments[1].from, segments[0].to);
        assert_eq!(segments[1].weight, 1.0);
    }

    #[test]
    fn empty_or_malformed_bodies() {
        assert!(parse_flow("{}").unwrap().is_empty());
        assert!(matches!(parse_flow("<html>"), Err(Error::Json(_))));
    }

    #[test]
    fn needs_key_and_bounding_box() {
        assert!(matches!(HereSource::new(" "), Err(Error::DataSourceUnavailable(_))));
        let source = HereSource::new("key").unwrap();
        assert!(matches!(source.fetch(&Area::city("Berlin")), Err(Error::DataSourceUnavailable(_))));
    }

    #[test]
    fn fallback_covers_unreachable_endpoint() {
        let source = WithMockFallback::new(HereSource::with_endpoint("key", "http://127.0.0.1:9/flow.json").unwrap());
        let bbox = BoundingBox::around(Coordinates::new(52.52, 13.40), Coordinates::new(52.53, 13.41));
        assert_eq!(source.fetch(&Area::bbox("Berlin", bbox)).unwrap(), MockSource.segments());
    }
}
