/*!

Per-run model of the switches. Switches are referred by their internal index, from 0 to the number of switches, which is assigned when the run starts.
The mapping from the identifiers of the topology to these indices is owned by the [Fabric], so nothing is written back into the topology.

*/

use std::collections::HashMap;

use log::{debug,trace};

use crate::error::Error;
use crate::topology::prelude::*;

///A link leaving a switch. A physical port towards another switch.
#[derive(Debug,Clone)]
pub struct Link
{
	///Internal index of the switch at the other side.
	pub neighbour: usize,
	///Physical port of this switch used by the link.
	pub physical_port: usize,
	///Index of the link in the neighbour that returns here, when there is one.
	pub reverse_link: Option<usize>,
}

///What a switch does with traffic towards another switch.
#[derive(Debug,Clone,Copy,Default,PartialEq,Eq)]
pub struct RoutingEntry
{
	///Index into the links of the switch. `None` while not known or when the destination is unreachable.
	pub out_link: Option<usize>,
	///The lane given to the pair, once assigned.
	pub lane: Option<usize>,
}

#[derive(Debug,Clone)]
pub struct Switch
{
	pub index: usize,
	pub id: SwitchId,
	pub num_ports: usize,
	links: Vec<Link>,
	///Entry `t` tells how to go towards the switch of index `t`.
	pub routing_table: Vec<RoutingEntry>,
}

impl Switch
{
	pub fn links(&self) -> &[Link]
	{
		&self.links
	}
	pub fn link(&self, link:usize) -> &Link
	{
		&self.links[link]
	}
	///The physical port used by an internal link.
	pub fn physical_port(&self, link:usize) -> usize
	{
		self.links[link].physical_port
	}
	///First link from this switch into `neighbour`, if any.
	pub fn link_to(&self, neighbour:usize) -> Option<usize>
	{
		self.links.iter().position(|l|l.neighbour==neighbour)
	}
}

///The switches of a run together with the index of their identifiers.
#[derive(Debug,Clone)]
pub struct Fabric
{
	switches: Vec<Switch>,
	capacity: usize,
	index_of: HashMap<SwitchId,usize>,
}

impl Fabric
{
	///An empty fabric able to hold `num_switches` switches.
	pub fn with_capacity(num_switches:usize) -> Result<Fabric,Error>
	{
		let mut switches = Vec::new();
		switches.try_reserve_exact(num_switches)?;
		let mut index_of = HashMap::new();
		index_of.try_reserve(num_switches)?;
		Ok(Fabric{
			switches,
			capacity: num_switches,
			index_of,
		})
	}
	///Read all the switches and switch to switch links of the topology.
	pub fn from_topology(topology:&dyn Topology) -> Result<Fabric,Error>
	{
		let ids = topology.switch_ids();
		let mut fabric = Fabric::with_capacity(ids.len())?;
		for &id in ids.iter()
		{
			fabric.create_switch(id,topology.ports(id))?;
		}
		for &id in ids.iter()
		{
			let source = fabric.index_of[&id];
			for NeighbourSwitchIteratorItem{port,neighbour_switch,..} in topology.neighbour_switch_iter(id)
			{
				let target = fabric.index(neighbour_switch).ok_or_else(||crate::error!(topology_error).with_message(format!("port {} of switch {} goes to unknown switch {}",port,id,neighbour_switch)))?;
				fabric.connect(source,target,port)?;
			}
		}
		debug!("fabric of {} switches and {} links",fabric.len(),fabric.switches.iter().map(|s|s.links.len()).sum::<usize>());
		Ok(fabric)
	}
	///Allocate a new switch. Its routing table has an entry for every switch the fabric can hold.
	pub fn create_switch(&mut self, id:SwitchId, port_count:usize) -> Result<usize,Error>
	{
		if self.switches.len()>=self.capacity
		{
			return Err(crate::error!(topology_error).with_message(format!("fabric is full with {} switches",self.capacity)));
		}
		if self.index_of.contains_key(&id)
		{
			return Err(crate::error!(topology_error).with_message(format!("switch {} created twice",id)));
		}
		let index = self.switches.len();
		let mut routing_table = Vec::new();
		routing_table.try_reserve_exact(self.capacity)?;
		routing_table.resize(self.capacity,RoutingEntry::default());
		let mut links = Vec::new();
		links.try_reserve(port_count)?;
		self.switches.push(Switch{
			index,
			id,
			num_ports: port_count,
			links,
			routing_table,
		});
		self.index_of.insert(id,index);
		Ok(index)
	}
	///Record that `local_port` of `source` leads to `target`. Links to itself are ignored.
	pub fn connect(&mut self, source:usize, target:usize, local_port:usize) -> Result<(),Error>
	{
		let n = self.switches.len();
		if source>=n || target>=n
		{
			return Err(crate::error!(topology_error).with_message(format!("cannot connect {} to {} with {} switches",source,target,n)));
		}
		if local_port==LOCAL_PORT || local_port>self.switches[source].num_ports
		{
			return Err(crate::error!(topology_error).with_message(format!("switch {} has no port {}",self.switches[source].id,local_port)));
		}
		if source==target
		{
			debug!("ignoring port {} of switch {} connected to itself",local_port,self.switches[source].id);
			return Ok(());
		}
		let new_link = self.switches[source].links.len();
		//Pair with the first link of the target coming back here that is still unpaired.
		let reverse_link = self.switches[target].links.iter().position(|l|l.neighbour==source && l.reverse_link.is_none());
		if let Some(reverse) = reverse_link
		{
			self.switches[target].links[reverse].reverse_link = Some(new_link);
		}
		self.switches[source].links.push(Link{
			neighbour: target,
			physical_port: local_port,
			reverse_link,
		});
		trace!("connect {} -> {} through port {}",source,target,local_port);
		Ok(())
	}
	pub fn len(&self) -> usize
	{
		self.switches.len()
	}
	pub fn is_empty(&self) -> bool
	{
		self.switches.is_empty()
	}
	///Internal index of a switch identifier.
	pub fn index(&self, id:SwitchId) -> Option<usize>
	{
		self.index_of.get(&id).cloned()
	}
	pub fn switch(&self, index:usize) -> &Switch
	{
		&self.switches[index]
	}
	pub fn switch_mut(&mut self, index:usize) -> &mut Switch
	{
		&mut self.switches[index]
	}
	pub fn switches(&self) -> &[Switch]
	{
		&self.switches
	}
	///The switch reached from `source` through its link `link`.
	pub fn next_switch(&self, source:usize, link:usize) -> usize
	{
		self.switches[source].links[link].neighbour
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::topology::neighbourslists::NeighboursLists;
	#[test]
	fn connect_pairs_reverse_links()
	{
		let mut fabric = Fabric::with_capacity(2).unwrap();
		let a = fabric.create_switch(10,4).unwrap();
		let b = fabric.create_switch(20,4).unwrap();
		fabric.connect(a,b,3).unwrap();
		assert_eq!(fabric.switch(a).link(0).reverse_link,None);
		fabric.connect(b,a,1).unwrap();
		assert_eq!(fabric.switch(a).link(0).reverse_link,Some(0));
		assert_eq!(fabric.switch(b).link(0).reverse_link,Some(0));
		assert_eq!(fabric.switch(a).physical_port(0),3);
		assert_eq!(fabric.switch(b).link_to(a),Some(0));
		assert_eq!(fabric.switch(a).routing_table.len(),2);
	}
	#[test]
	fn connect_checks_bounds()
	{
		let mut fabric = Fabric::with_capacity(2).unwrap();
		let a = fabric.create_switch(10,2).unwrap();
		assert!(fabric.connect(a,5,1).is_err());
		let b = fabric.create_switch(20,2).unwrap();
		assert!(fabric.connect(a,b,3).is_err());
		assert!(fabric.connect(a,b,LOCAL_PORT).is_err());
		assert!(fabric.create_switch(30,2).is_err());
		//Self links are not links.
		fabric.connect(a,a,1).unwrap();
		assert!(fabric.switch(a).links().is_empty());
	}
	#[test]
	fn from_topology_maps_identifiers()
	{
		let mut topology = NeighboursLists::new();
		topology.add_switch(700,2,4).unwrap();
		topology.add_switch(300,2,4).unwrap();
		topology.add_switch(500,2,4).unwrap();
		topology.link(700,1,300,2).unwrap();
		topology.link(300,1,500,2).unwrap();
		let fabric = Fabric::from_topology(&topology).unwrap();
		assert_eq!(fabric.index(700),Some(0));
		assert_eq!(fabric.index(300),Some(1));
		assert_eq!(fabric.index(500),Some(2));
		assert_eq!(fabric.index(1),None);
		let middle = fabric.switch(1);
		assert_eq!(middle.links().len(),2);
		assert_eq!(fabric.next_switch(1,0),2);
		assert_eq!(middle.physical_port(0),1);
		assert_eq!(fabric.next_switch(1,1),0);
		assert_eq!(middle.physical_port(1),2);
	}
}
