/*!
lash-routing
=====

This crate computes deadlock-free unicast routing for switched fabrics, such as an InfiniBand subnet, with the LASH (layered shortest path) algorithm.
Every pair of switches is routed through a shortest path and given a lane, so that no lane holds a cycle of channel dependencies.

# Usage

A [Topology](topology::Topology) describes the switches, their links and the addresses they host. It can be built programmatically
with [NeighboursLists](topology::neighbourslists::NeighboursLists), read from an adjacency file, or be one of the predefined [Cartesian](topology::cartesian::Cartesian)
meshes and tori.

```ignore
use lash_routing::prelude::*;
let topology = new_topology(&ConfigurationValue::parse_toml("kind = \"Torus\"\nsides = [4,4]\n")?)?;
let outcome = Lash::new(LashConfig::default()).run(topology.as_ref())?;
let port = outcome.forwarding_tables().port(0,9);
let service_level = outcome.service_level(0,5);
```

A failed run returns an [Error](error::Error) and produces no table. When the error [is_insufficient_lanes](error::Error::is_insufficient_lanes)
the fabric has not enough lanes for LASH and another engine should be used.

# Configuration

The run is configured by a `Lash` object, see [LashConfig::new](routing::LashConfig::new). Topologies are configured as described in [new_topology](topology::new_topology).
Both can be written in TOML files, see the [config] module.

# Binary

The `lash` binary reads a topology file and writes the forwarding tables and the lane of each pair of switches. Run `lash --help` for its options.
*/

pub mod error;
pub mod config;
pub mod matrix;
pub mod topology;
pub mod routing;

pub use crate::config::ConfigurationValue;
pub use crate::error::{Error,ErrorKind};
pub use crate::routing::{Lash,LashConfig,LashOutcome};

/// Some things most uses of the crate will use.
pub mod prelude
{
	pub use crate::config::ConfigurationValue;
	pub use crate::error::{Error,ErrorKind};
	pub use crate::topology::prelude::*;
	pub use crate::topology::neighbourslists::NeighboursLists;
	pub use crate::topology::cartesian::Cartesian;
	pub use crate::routing::prelude::*;
}
