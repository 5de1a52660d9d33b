/*!

Forwarding tables: for every switch, the physical port to use towards each destination address.

*/

use std::collections::BTreeMap;

use log::debug;

use super::switch::Fabric;
use crate::error::Error;
use crate::topology::prelude::*;

///Someone that takes the forwarding tables of the switches, such as the programmer of the hardware.
pub trait ForwardingTableConsumer
{
	///Receive the complete table of a switch. Called once per switch.
	fn write_table(&mut self, switch_id:SwitchId, table:&BTreeMap<Address,usize>) -> Result<(),Error>;
}

///The forwarding tables of all the switches, indexed by switch identifier.
#[derive(Debug,Clone,Default,PartialEq,Eq)]
pub struct ForwardingTables
{
	tables: BTreeMap<SwitchId,BTreeMap<Address,usize>>,
}

impl ForwardingTables
{
	pub fn new() -> ForwardingTables
	{
		ForwardingTables::default()
	}
	/**
	Build the tables from routing tables already filled. `hosted[h]` holds the addresses of the switch of index `h` with the ports delivering them.
	A switch sends the traffic towards an address hosted by itself through the declared port, and towards an address hosted elsewhere through the
	first hop to the hosting switch. Addresses whose hosting switch is unreachable are left out.
	**/
	pub fn populate(fabric:&Fabric, hosted:&[Vec<(Address,usize)>]) -> ForwardingTables
	{
		let mut tables = BTreeMap::new();
		for switch in fabric.switches()
		{
			let mut table = BTreeMap::new();
			for (host,addresses) in hosted.iter().enumerate()
			{
				let port = if host==switch.index
				{
					None
				}
				else
				{
					match switch.routing_table[host].out_link
					{
						Some(link) => Some(switch.physical_port(link)),
						None => continue,
					}
				};
				for &(address,local_port) in addresses.iter()
				{
					table.insert(address,port.unwrap_or(local_port));
				}
			}
			debug!("switch {} forwards {} addresses",switch.id,table.len());
			tables.insert(switch.id,table);
		}
		ForwardingTables{tables}
	}
	pub fn table(&self, switch_id:SwitchId) -> Option<&BTreeMap<Address,usize>>
	{
		self.tables.get(&switch_id)
	}
	///The port of `switch_id` towards `address`.
	pub fn port(&self, switch_id:SwitchId, address:Address) -> Option<usize>
	{
		self.tables.get(&switch_id).and_then(|t|t.get(&address)).cloned()
	}
	pub fn iter(&self) -> impl Iterator<Item=(&SwitchId,&BTreeMap<Address,usize>)>
	{
		self.tables.iter()
	}
	pub fn len(&self) -> usize
	{
		self.tables.len()
	}
	pub fn is_empty(&self) -> bool
	{
		self.tables.is_empty()
	}
	///Give every table to the consumer, stopping at its first error.
	pub fn write_to(&self, consumer:&mut dyn ForwardingTableConsumer) -> Result<(),Error>
	{
		for (&switch_id,table) in self.tables.iter()
		{
			consumer.write_table(switch_id,table)?;
		}
		Ok(())
	}
}

impl ForwardingTableConsumer for ForwardingTables
{
	fn write_table(&mut self, switch_id:SwitchId, table:&BTreeMap<Address,usize>) -> Result<(),Error>
	{
		self.tables.insert(switch_id,table.clone());
		Ok(())
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use super::super::spanning_tree::generate_routing_function;
	use crate::topology::cartesian::Cartesian;
	#[test]
	fn chain_with_endpoints()
	{
		//0-1-2 with one endpoint per switch. Addresses: switch i is 1+2i, its endpoint 2+2i at port 3.
		let topology = Cartesian::with_sides(&[3],false,1,4);
		let mut fabric = Fabric::from_topology(&topology).unwrap();
		generate_routing_function(&mut fabric);
		let hosted : Vec<_> = topology.switch_ids().into_iter().map(|id|topology.addresses(id)).collect();
		let tables = ForwardingTables::populate(&fabric,&hosted);
		assert_eq!(tables.len(),3);
		assert_eq!(tables.port(0,1),Some(LOCAL_PORT));
		assert_eq!(tables.port(0,2),Some(3));
		//Upwards in the only dimension is port 2.
		assert_eq!(tables.port(0,5),Some(2));
		assert_eq!(tables.port(0,6),Some(2));
		assert_eq!(tables.port(2,1),Some(1));
		assert_eq!(tables.table(1).map(|t|t.len()),Some(6));
	}
	#[test]
	fn unreachable_hosts_are_skipped()
	{
		let mut fabric = Fabric::with_capacity(2).unwrap();
		fabric.create_switch(10,2).unwrap();
		fabric.create_switch(20,2).unwrap();
		let hosted = vec![vec![(100,LOCAL_PORT)],vec![(200,LOCAL_PORT),(201,2)]];
		let tables = ForwardingTables::populate(&fabric,&hosted);
		assert_eq!(tables.port(10,100),Some(LOCAL_PORT));
		assert_eq!(tables.port(10,200),None);
		assert_eq!(tables.port(20,201),Some(2));
		let mut copy = ForwardingTables::new();
		tables.write_to(&mut copy).unwrap();
		assert_eq!(copy,tables);
	}
}
