/*!

A Topology describes how the switches of the fabric are connected and which addresses they host. It is the input of the routing engines.

see [`new_topology`](fn.new_topology.html) for documentation on the configuration syntax of predefined topologies.

*/

pub mod neighbourslists;
pub mod cartesian;

use std::collections::HashSet;

use log::warn;

use self::cartesian::Cartesian;
use self::neighbourslists::NeighboursLists;
use crate::config::ConfigurationValue;
use crate::error::Error;

/// Some things most uses of the topology module will use.
pub mod prelude
{
	pub use super::{Topology,Location,NeighbourSwitchIteratorItem,SwitchId,Address,LOCAL_PORT,MAXIMUM_LANES,new_topology};
}

///Stable identifier of a switch, given by whoever discovered the fabric.
pub type SwitchId = u64;
///Externally visible destination address, such as a LID.
pub type Address = u32;

///The port of a switch that delivers to the switch itself.
pub const LOCAL_PORT: usize = 0;
///Maximum number of data lanes any link may advertise.
pub const MAXIMUM_LANES: usize = 15;

///What is at the other side of a switch port.
///None is used for disconnected ports.
#[derive(Clone,Debug,Hash,Eq,PartialEq)]
pub enum Location
{
	SwitchPort{
		switch_id: SwitchId,
		port: usize,
	},
	Endpoint(Address),
	None,
}

///Item for iterators of neighbour switches.
#[derive(Debug)]
pub struct NeighbourSwitchIteratorItem
{
	///Port of the current switch that goes to the neighbour.
	pub port: usize,
	///The identifier of the neighbour switch.
	pub neighbour_switch: SwitchId,
	///The port of the neighbour switch corresponding to the same physical link.
	pub neighbour_port: usize,
}

///A topology of switches.
///Physical ports of a switch are numbered from 1 to `ports(switch_id)`, both inclusive. Port 0 is [LOCAL_PORT].
pub trait Topology : std::fmt::Debug
{
	///The switches of the fabric, in the order the routing should index them.
	fn switch_ids(&self) -> Vec<SwitchId>;
	///Number of physical ports of the switch.
	fn ports(&self, switch_id:SwitchId) -> usize;
	///What is connected to a port. Out of range ports and unknown switches give `Location::None`.
	fn neighbour(&self, switch_id:SwitchId, port:usize) -> Location;
	///Number of data lanes the link at the port is operating with.
	fn operational_lanes(&self, switch_id:SwitchId, port:usize) -> usize;
	///The addresses reached through this switch together with the port that delivers them.
	///The address of the switch itself should use [LOCAL_PORT].
	fn addresses(&self, switch_id:SwitchId) -> Vec<(Address,usize)>;

	///Iterate over the neighbour switches, skipping non-connected ports and ports towards endpoints.
	fn neighbour_switch_iter<'a>(&'a self, switch_id:SwitchId) -> Box<dyn Iterator<Item=NeighbourSwitchIteratorItem> + 'a>
	{
		let np = self.ports(switch_id);
		let iterator = (1..=np).filter_map(move |port|{
			match self.neighbour(switch_id,port)
			{
				Location::SwitchPort{switch_id:neighbour_switch,port:neighbour_port} => Some(NeighbourSwitchIteratorItem{port,neighbour_switch,neighbour_port}),
				_ => None,
			}
		});
		Box::new(iterator)
	}

	/**
	The number of lanes usable by the whole fabric: the minimum of the lanes operated by the switch to switch links, capped at [MAXIMUM_LANES].
	A fabric without links can use all of them.
	**/
	fn lane_budget(&self) -> usize
	{
		let mut budget = MAXIMUM_LANES;
		for switch_id in self.switch_ids()
		{
			for item in self.neighbour_switch_iter(switch_id)
			{
				budget = budget.min(self.operational_lanes(switch_id,item.port));
			}
		}
		budget
	}

	///Check that every switch to switch link returns to the same port and that the addresses are not repeated.
	fn check_consistency(&self) -> Result<(),Error>
	{
		let ids = self.switch_ids();
		let known : HashSet<SwitchId> = ids.iter().cloned().collect();
		if known.len()!=ids.len()
		{
			return Err(crate::error!(topology_error).with_message("repeated switch identifiers".to_string()));
		}
		let mut seen_addresses = HashSet::new();
		for &switch_id in ids.iter()
		{
			for NeighbourSwitchIteratorItem{port,neighbour_switch,neighbour_port} in self.neighbour_switch_iter(switch_id)
			{
				if !known.contains(&neighbour_switch)
				{
					return Err(crate::error!(topology_error).with_message(format!("port {} of switch {} goes to unknown switch {}",port,switch_id,neighbour_switch)));
				}
				match self.neighbour(neighbour_switch,neighbour_port)
				{
					Location::SwitchPort{switch_id:back_switch,port:back_port} if back_switch==switch_id && back_port==port => (),
					other => return Err(crate::error!(topology_error).with_message(format!("Non-matching port ({},{}) to ({},{}) returns to {:?}.",switch_id,port,neighbour_switch,neighbour_port,other))),
				}
			}
			let np = self.ports(switch_id);
			for (address,port) in self.addresses(switch_id)
			{
				if port>np
				{
					return Err(crate::error!(topology_error).with_message(format!("address {} at switch {} uses port {} of {}",address,switch_id,port,np)));
				}
				if !seen_addresses.insert(address)
				{
					return Err(crate::error!(topology_error).with_message(format!("address {} is hosted twice",address)));
				}
			}
			if self.neighbour_switch_iter(switch_id).next().is_none() && ids.len()>1
			{
				warn!("switch {} has no link to other switches",switch_id);
			}
		}
		Ok(())
	}
}

/**
Build a topology.

### Mesh example
A [Cartesian] mesh of 4x4 switches. Switches in the periphery have un-connected ports.
```ignore
Mesh{
	sides: [4,4],
	endpoints_per_switch: 1,//optional, defaults to 0
	lanes: 8,//optional lanes operated by every link, defaults to the maximum
}
```

### Torus example
A [Cartesian] torus, with the same fields as the mesh. A `Torus{sides:[5]}` is a ring of 5 switches.

### File example
A [file](NeighboursLists) with the adjacencies. See [NeighboursLists::parse] for its format.
```ignore
File{
	filename: "/path/to/fabric",
}
```
*/
pub fn new_topology(cv:&ConfigurationValue) -> Result<Box<dyn Topology>,Error>
{
	if let &ConfigurationValue::Object(ref cv_name, ref _cv_pairs)=cv
	{
		match cv_name.as_str()
		{
			"Mesh" | "Torus" => Ok(Box::new(Cartesian::new(cv)?)),
			"File" => Ok(Box::new(NeighboursLists::new_cfg(cv)?)),
			_ => Err(crate::error!(configuration_error).with_message(format!("Unknown topology {}",cv_name))),
		}
	}
	else
	{
		Err(crate::error!(configuration_error).with_message("Trying to create a topology from a non-Object".to_string()))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn lane_budget_is_minimum_over_links()
	{
		let mut topology = NeighboursLists::new();
		topology.add_switch(10,2,8).unwrap();
		topology.add_switch(20,2,8).unwrap();
		topology.add_switch(30,1,2).unwrap();
		topology.link(10,1,20,1).unwrap();
		topology.link(20,2,30,1).unwrap();
		//The port towards 30 is also limited by the far side.
		topology.set_port_lanes(20,2,4).unwrap();
		assert_eq!(topology.lane_budget(),2);
		topology.check_consistency().expect("consistent");
	}
	#[test]
	fn lane_budget_is_capped()
	{
		let mut topology = NeighboursLists::new();
		topology.add_switch(1,1,100).unwrap();
		topology.add_switch(2,1,100).unwrap();
		topology.link(1,1,2,1).unwrap();
		assert_eq!(topology.lane_budget(),MAXIMUM_LANES);
	}
	#[test]
	fn unknown_topology_is_a_configuration_error()
	{
		let cv = ConfigurationValue::Object("Dragonfly".to_string(),vec![]);
		let err = new_topology(&cv).unwrap_err();
		assert_eq!(err.kind,crate::error::ErrorKind::ConfigurationError);
	}
}
