//! Road network graph types.
//!
//! The topology of a road network never changes after construction.
//! Only the current weight of each edge does, and those weights live in the
//! [`GraphStore`](crate::datastr::graph_store::GraphStore), not in the graph itself.

use nav_types::WGS84;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub mod road_network;

pub use self::road_network::{NetworkBuilder, RoadNetwork};

/// Node ids are 32bit unsigned ints
pub type NodeId = u32;
/// Edge ids are 32bit unsigned ints, numbered in first-out order
pub type EdgeId = u32;
/// Travel costs are floats, since traffic feeds deliver fractional congestion values
pub type Weight = f64;
/// Tentative distance of nodes which were not reached yet.
pub const INFINITY: Weight = f64::INFINITY;

/// Transport modes with their own cost multiplier per edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Car,
    Bike,
    Public,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Car, Mode::Bike, Mode::Public];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Car => "car",
            Mode::Bike => "bike",
            Mode::Public => "public",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .iter()
            .copied()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown mode {:?}, expected one of car, bike, public", s))
    }
}

/// Cost multiplier table keyed by transport mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeMultipliers {
    pub car: f64,
    pub bike: f64,
    pub public: f64,
}

impl Default for ModeMultipliers {
    fn default() -> Self {
        ModeMultipliers {
            car: 1.0,
            bike: 2.5,
            public: 1.4,
        }
    }
}

impl ModeMultipliers {
    pub fn uniform(factor: f64) -> Self {
        ModeMultipliers {
            car: factor,
            bike: factor,
            public: factor,
        }
    }

    pub fn get(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Car => self.car,
            Mode::Bike => self.bike,
            Mode::Public => self.public,
        }
    }

    /// Multipliers have to be finite and strictly positive, otherwise costs could vanish or turn negative.
    pub fn validate(&self) -> Result<(), String> {
        for mode in Mode::ALL {
            let factor = self.get(mode);
            if !factor.is_finite() || factor <= 0.0 {
                return Err(format!("multiplier for {} must be finite and positive, got {}", mode, factor));
            }
        }
        Ok(())
    }
}

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinates { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great circle distance in meters.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        self.as_wgs84().distance(&other.as_wgs84())
    }

    fn as_wgs84(&self) -> WGS84<f64> {
        WGS84::from_degrees_and_meters(self.lat, self.lon, 0.0)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// Outgoing link of a node.
/// No behaviour, just a pure data struct.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Link {
    pub edge: EdgeId,
    pub node: NodeId,
}

/// Base trait for graphs.
pub trait Graph {
    fn num_nodes(&self) -> usize;
    fn num_arcs(&self) -> usize;
    fn degree(&self, node: NodeId) -> usize;
}
