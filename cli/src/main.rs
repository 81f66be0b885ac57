//! `routeiq`: find the shortest, least congested route through a city.

use anyhow::{bail, Context, Result};
use clap::Parser;
use routeiq::{
    algo::{comparison, congestion::CongestionModel, Algorithm, Query, Route, SearchContext},
    config::RouterConfig,
    datastr::graph::{Coordinates, Mode, NodeId, RoadNetwork},
    datastr::graph_store::Snapshot,
    export,
    import::{build_network, here::HereSource, Area, BoundingBox, MockSource, TrafficSource, WithMockFallback},
    io::{
        alerts::{Alert, AlertRegistry, JsonAlertFile},
        history::{HistoricalLog, HistoricalSnapshot, JsonHistoryFile},
    },
    poller::Poller,
    Error, SearchError,
};
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{filter::Directive, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "routeiq")]
#[command(about = "Find the shortest, least congested path in a city")]
#[command(version)]
struct Cli {
    /// Start node id
    #[arg(long)]
    from: Option<String>,

    /// End node id
    #[arg(long)]
    to: Option<String>,

    /// Start latitude (alternative to --from)
    #[arg(long, allow_negative_numbers = true)]
    from_lat: Option<f64>,

    /// Start longitude (alternative to --from)
    #[arg(long, allow_negative_numbers = true)]
    from_lon: Option<f64>,

    /// End latitude (alternative to --to)
    #[arg(long, allow_negative_numbers = true)]
    to_lat: Option<f64>,

    /// End longitude (alternative to --to)
    #[arg(long, allow_negative_numbers = true)]
    to_lon: Option<f64>,

    /// Path finding algorithm: dijkstra or astar
    #[arg(long, default_value = "dijkstra")]
    algorithm: Algorithm,

    /// Avoid congestion hotspots if possible
    #[arg(long)]
    avoid_hotspots: bool,

    /// Transport mode: car, bike or public
    #[arg(long, default_value = "car")]
    mode: Mode,

    /// Run Dijkstra and A* concurrently and compare them
    #[arg(long)]
    compare_algorithms: bool,

    /// Traffic polling interval in seconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// City name for the traffic source
    #[arg(long)]
    city: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Abandon a search after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Write an HTML map of the route
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = "route_map.html")]
    visualize: Option<PathBuf>,

    /// Append the current weights to the traffic history
    #[arg(long)]
    record_snapshot: bool,

    /// Print average weights per edge over the traffic history
    #[arg(long)]
    historical_report: bool,

    /// Register an alert for an edge
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    add_alert: Option<Vec<String>>,

    /// Remove the alert for an edge
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    remove_alert: Option<Vec<String>>,

    /// List all registered alerts
    #[arg(long)]
    list_alerts: bool,
}

enum Endpoints {
    Named(String, String),
    Positions(Coordinates, Coordinates),
}

impl Cli {
    fn endpoints(&self) -> Result<Option<Endpoints>> {
        match (&self.from, &self.to, self.from_lat, self.from_lon, self.to_lat, self.to_lon) {
            (Some(from), Some(to), None, None, None, None) => Ok(Some(Endpoints::Named(from.clone(), to.clone()))),
            (None, None, Some(from_lat), Some(from_lon), Some(to_lat), Some(to_lon)) => Ok(Some(Endpoints::Positions(
                Coordinates::new(from_lat, from_lon),
                Coordinates::new(to_lat, to_lon),
            ))),
            (None, None, None, None, None, None) => Ok(None),
            _ => bail!("provide either --from and --to (node ids) or --from-lat, --from-lon, --to-lat and --to-lon (coordinates)"),
        }
    }

    fn has_management_command(&self) -> bool {
        self.add_alert.is_some() || self.remove_alert.is_some() || self.list_alerts || self.historical_report
    }
}

fn main() -> ExitCode {
    let filter = match "routeiq=info".parse::<Directive>() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = RouterConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(city) = &cli.city {
        config.city = city.clone();
    }
    if let Some(secs) = cli.poll_interval {
        config.poll_interval_secs = secs;
    }
    if let Some(ms) = cli.timeout_ms {
        config.search_timeout_ms = Some(ms);
    }
    config.validate()?;

    manage_alerts(&cli, &config)?;
    if cli.historical_report {
        print_historical_report(&config)?;
    }

    let endpoints = match cli.endpoints()? {
        Some(endpoints) => endpoints,
        None if cli.has_management_command() => return Ok(ExitCode::SUCCESS),
        None => bail!("no route requested, provide --from/--to or coordinates"),
    };

    let source = traffic_source(&config);
    let area = match &endpoints {
        Endpoints::Named(..) => Area::city(&config.city),
        Endpoints::Positions(from, to) => Area::bbox(&config.city, BoundingBox::around(*from, *to)),
    };
    let segments = source.fetch(&area)?;
    let store = Arc::new(build_network(&segments, config.mode_multipliers)?);
    info!(source = source.name(), segments = segments.len(), "road network loaded");

    let mut poller = Poller::new(store.clone(), source.clone(), vec![area], config.poll_interval());
    poller.start()?;

    let network = store.network();
    let (from, to) = resolve(network, &endpoints)?;
    let query = Query::new(from, to).with_mode(cli.mode).avoiding_hotspots(cli.avoid_hotspots);
    let model = config.congestion_model()?;
    let snapshot = store.snapshot();
    let ctx = SearchContext::new(network, &snapshot, &model).with_timeout(config.search_timeout());

    let outcome = if cli.compare_algorithms {
        let comparison = comparison::compare(&ctx, &query)?;
        println!("--- Parallel Pathfinding Results ---");
        for run in [&comparison.dijkstra, &comparison.astar] {
            match &run.outcome {
                Ok(route) => println!(
                    "{:<9} Path: {}, Cost: {}, Time: {:.4}s",
                    format!("{}:", run.algorithm),
                    route.describe(network),
                    route.cost,
                    run.elapsed.as_secs_f64()
                ),
                Err(e) => println!("{:<9} {}, Time: {:.4}s", format!("{}:", run.algorithm), e, run.elapsed.as_secs_f64()),
            }
        }
        if !comparison.costs_agree(1e-9) {
            warn!("algorithms disagree on the route cost");
        }
        comparison.dijkstra.outcome
    } else {
        let outcome = cli.algorithm.run(&ctx, &query);
        if let Ok(route) = &outcome {
            print_route(network, route, cli.avoid_hotspots);
        }
        outcome
    };

    print_hotspots(network, &snapshot, &model, &config)?;

    if cli.record_snapshot {
        let mut history = JsonHistoryFile::new(&config.history_file);
        history.record(HistoricalSnapshot::capture(network, &snapshot, chrono::Utc::now()))?;
        println!("Snapshot recorded to {}", history.path().display());
    }

    if let Some(path) = &cli.visualize {
        let hotspots = model.classify(network, &snapshot);
        export::write_route_map(network, &snapshot, outcome.as_ref().ok(), &hotspots, path)?;
        println!("Map saved to {}. Open it in your browser to view.", path.display());
    }

    poller.stop()?;

    match outcome {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(SearchError::Timeout) => {
            println!("Search timed out before a route was found.");
            Ok(ExitCode::from(1))
        }
        Err(e) => {
            println!("No route found: {}", e);
            Ok(ExitCode::from(1))
        }
    }
}

fn traffic_source(config: &RouterConfig) -> Arc<dyn TrafficSource> {
    match config.here_api_key.as_deref().map(HereSource::new) {
        Some(Ok(here)) => Arc::new(WithMockFallback::new(here)),
        Some(Err(e)) => {
            warn!(error = %e, "HERE source unavailable, using mock data");
            Arc::new(MockSource)
        }
        None => Arc::new(MockSource),
    }
}

fn resolve(network: &RoadNetwork, endpoints: &Endpoints) -> Result<(NodeId, NodeId), Error> {
    match endpoints {
        Endpoints::Named(from, to) => Ok((network.resolve(from)?, network.resolve(to)?)),
        Endpoints::Positions(from, to) => {
            let closest = |position: &Coordinates| {
                if !position.is_valid() {
                    return Err(Error::InvalidCoordinates(position.to_string()));
                }
                network
                    .closest_node(*position)
                    .ok_or_else(|| Error::InvalidCoordinates(format!("no node with coordinates near {}", position)))
            };
            Ok((closest(from)?, closest(to)?))
        }
    }
}

fn print_route(network: &RoadNetwork, route: &Route, avoid_hotspots: bool) {
    if avoid_hotspots && !route.hotspots.is_empty() {
        println!("No path avoiding all hotspots. Showing the least congested route.");
    }
    println!("Path: {}", route.describe(network));
    println!("Total cost: {}", route.cost);
}

fn print_hotspots(network: &RoadNetwork, snapshot: &Snapshot, model: &CongestionModel, config: &RouterConfig) -> Result<()> {
    let alerts = JsonAlertFile::new(&config.alerts_file).list()?;
    let report = model.hotspot_report(network, snapshot, &alerts);
    if report.is_empty() {
        println!("No congestion hotspots detected.");
        return Ok(());
    }

    println!("Congestion hotspots:");
    for entry in &report {
        println!("  {} -> {} (weight: {}, base: {}, ratio: {:.2})", entry.from, entry.to, entry.current_weight, entry.base_weight, entry.ratio);
    }
    for entry in report.iter().filter(|entry| entry.alerted) {
        println!("ALERT: congestion on {} -> {}", entry.from, entry.to);
    }
    Ok(())
}

fn alert_arg(values: &[String]) -> Result<Alert> {
    match values {
        [from, to] => Ok(Alert::new(from, to)),
        _ => bail!("an alert needs exactly a FROM and a TO node"),
    }
}

fn manage_alerts(cli: &Cli, config: &RouterConfig) -> Result<()> {
    let mut registry = JsonAlertFile::new(&config.alerts_file);

    if let Some(values) = &cli.add_alert {
        let alert = alert_arg(values)?;
        if registry.add(alert.clone())? {
            println!("Alert added for {} -> {}", alert.from, alert.to);
        } else {
            println!("Alert for {} -> {} already exists", alert.from, alert.to);
        }
    }
    if let Some(values) = &cli.remove_alert {
        let alert = alert_arg(values)?;
        if registry.remove(&alert)? {
            println!("Alert removed for {} -> {}", alert.from, alert.to);
        } else {
            println!("No alert for {} -> {}", alert.from, alert.to);
        }
    }
    if cli.list_alerts {
        let alerts = registry.list()?;
        if alerts.is_empty() {
            println!("No alerts set.");
        }
        for alert in alerts {
            println!("  {} -> {}", alert.from, alert.to);
        }
    }
    Ok(())
}

fn print_historical_report(config: &RouterConfig) -> Result<()> {
    let history = JsonHistoryFile::new(&config.history_file);
    let report = history.report()?;
    if report.is_empty() {
        println!("No historical traffic data recorded yet.");
        return Ok(());
    }
    println!("Average weight per edge over {} snapshots:", history.snapshots()?.len());
    for (edge, weight) in report {
        println!("  {}: {:.2}", edge, weight);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn endpoints_need_a_complete_pair() {
        let cli = Cli::parse_from(["routeiq", "--from", "A", "--to", "F", "--mode", "bike", "--algorithm", "astar"]);
        assert!(matches!(cli.endpoints().unwrap(), Some(Endpoints::Named(..))));
        assert_eq!(cli.mode, Mode::Bike);
        assert_eq!(cli.algorithm, Algorithm::AStar);

        let cli = Cli::parse_from(["routeiq", "--from-lat", "52.52", "--from-lon", "-13.4", "--to-lat", "52.53", "--to-lon", "13.41"]);
        assert!(matches!(cli.endpoints().unwrap(), Some(Endpoints::Positions(..))));

        let cli = Cli::parse_from(["routeiq", "--from", "A", "--to-lat", "52.53"]);
        assert!(cli.endpoints().is_err());

        let cli = Cli::parse_from(["routeiq", "--list-alerts"]);
        assert!(cli.endpoints().unwrap().is_none());
        assert!(cli.has_management_command());
    }

    #[test]
    fn optional_visualize_file() {
        let cli = Cli::parse_from(["routeiq", "--from", "A", "--to", "F", "--visualize"]);
        assert_eq!(cli.visualize, Some(PathBuf::from("route_map.html")));
        let cli = Cli::parse_from(["routeiq", "--visualize", "out.html", "--add-alert", "B", "D"]);
        assert_eq!(cli.visualize, Some(PathBuf::from("out.html")));
        assert_eq!(cli.add_alert, Some(vec!["B".to_string(), "D".to_string()]));
    }

    #[test]
    fn coordinates_resolve_to_closest_nodes() {
        let store = build_network(&MockSource.segments(), Default::default()).unwrap();
        let network = store.network();
        let (from, to) = resolve(network, &Endpoints::Positions(Coordinates::new(52.52001, 13.40501), Coordinates::new(52.5224, 13.4099))).unwrap();
        assert_eq!(network.node_name(from), "A");
        assert_eq!(network.node_name(to), "F");

        assert!(matches!(
            resolve(network, &Endpoints::Positions(Coordinates::new(95.0, 13.4), Coordinates::new(52.5, 13.4))),
            Err(Error::InvalidCoordinates(_))
        ));
        assert!(matches!(resolve(network, &Endpoints::Named("A".into(), "Z".into())), Err(Error::InvalidNode(_))));
    }
}
