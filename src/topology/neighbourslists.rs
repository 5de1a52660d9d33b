
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use log::debug;

use super::prelude::*;
use crate::config::ConfigurationValue;
use crate::error::Error;
use crate::match_object;

#[derive(Debug,Clone)]
struct PortDescription
{
	location: Location,
	lanes: usize,
}

#[derive(Debug,Clone)]
struct SwitchDescription
{
	id: SwitchId,
	///Index `p` holds the physical port `p+1`.
	ports: Vec<PortDescription>,
	addresses: Vec<(Address,usize)>,
}

/**
A topology given by explicit lists of ports. It can be built by calls to [add_switch](NeighboursLists::add_switch) and [link](NeighboursLists::link)
or read from a file, see [parse](NeighboursLists::parse).
**/
#[derive(Debug,Clone,Default)]
pub struct NeighboursLists
{
	switches: Vec<SwitchDescription>,
	index: HashMap<SwitchId,usize>,
}

impl Topology for NeighboursLists
{
	fn switch_ids(&self) -> Vec<SwitchId>
	{
		self.switches.iter().map(|s|s.id).collect()
	}
	fn ports(&self, switch_id:SwitchId) -> usize
	{
		self.description(switch_id).map(|s|s.ports.len()).unwrap_or(0)
	}
	fn neighbour(&self, switch_id:SwitchId, port:usize) -> Location
	{
		if port==LOCAL_PORT
		{
			return Location::None;
		}
		self.description(switch_id).and_then(|s|s.ports.get(port-1)).map(|p|p.location.clone()).unwrap_or(Location::None)
	}
	fn operational_lanes(&self, switch_id:SwitchId, port:usize) -> usize
	{
		if port==LOCAL_PORT
		{
			return 0;
		}
		self.description(switch_id).and_then(|s|s.ports.get(port-1)).map(|p|p.lanes).unwrap_or(0)
	}
	fn addresses(&self, switch_id:SwitchId) -> Vec<(Address,usize)>
	{
		self.description(switch_id).map(|s|s.addresses.clone()).unwrap_or_default()
	}
}

impl NeighboursLists
{
	pub fn new() -> NeighboursLists
	{
		NeighboursLists::default()
	}
	fn description(&self, switch_id:SwitchId) -> Option<&SwitchDescription>
	{
		self.index.get(&switch_id).map(|&i|&self.switches[i])
	}
	fn port_mut(&mut self, switch_id:SwitchId, port:usize) -> Result<&mut PortDescription,Error>
	{
		let &i = self.index.get(&switch_id).ok_or_else(||crate::error!(topology_error).with_message(format!("unknown switch {}",switch_id)))?;
		let switch = &mut self.switches[i];
		let num_ports = switch.ports.len();
		if port==LOCAL_PORT || port>num_ports
		{
			return Err(crate::error!(topology_error).with_message(format!("switch {} has no port {} (ports 1..={})",switch_id,port,num_ports)));
		}
		Ok(&mut switch.ports[port-1])
	}
	///Add a switch with all its ports disconnected and operating `lanes` lanes.
	pub fn add_switch(&mut self, id:SwitchId, ports:usize, lanes:usize) -> Result<(),Error>
	{
		if self.index.contains_key(&id)
		{
			return Err(crate::error!(topology_error).with_message(format!("switch {} added twice",id)));
		}
		self.index.insert(id,self.switches.len());
		self.switches.push(SwitchDescription{
			id,
			ports: vec![PortDescription{location:Location::None,lanes};ports],
			addresses: vec![],
		});
		Ok(())
	}
	///Connect a single direction. Normally you want [link](NeighboursLists::link).
	pub fn connect(&mut self, switch_id:SwitchId, port:usize, neighbour_switch:SwitchId, neighbour_port:usize) -> Result<(),Error>
	{
		if !self.index.contains_key(&neighbour_switch)
		{
			return Err(crate::error!(topology_error).with_message(format!("unknown switch {}",neighbour_switch)));
		}
		self.port_mut(switch_id,port)?.location = Location::SwitchPort{switch_id:neighbour_switch,port:neighbour_port};
		Ok(())
	}
	///Put a bidirectional link between two switch ports.
	pub fn link(&mut self, a:SwitchId, port_a:usize, b:SwitchId, port_b:usize) -> Result<(),Error>
	{
		self.connect(a,port_a,b,port_b)?;
		self.connect(b,port_b,a,port_a)
	}
	pub fn set_port_lanes(&mut self, switch_id:SwitchId, port:usize, lanes:usize) -> Result<(),Error>
	{
		self.port_mut(switch_id,port)?.lanes = lanes;
		Ok(())
	}
	///Make `address` reachable through `port` of the switch. Use [LOCAL_PORT] for the address of the switch itself.
	pub fn add_address(&mut self, address:Address, switch_id:SwitchId, port:usize) -> Result<(),Error>
	{
		if port!=LOCAL_PORT
		{
			self.port_mut(switch_id,port)?.location = Location::Endpoint(address);
		}
		let &i = self.index.get(&switch_id).ok_or_else(||crate::error!(topology_error).with_message(format!("unknown switch {}",switch_id)))?;
		self.switches[i].addresses.push((address,port));
		Ok(())
	}
	/**
	Read a topology from text. Each line is one of
	```ignore
	# comment
	SWITCH <id> <ports> [lanes]
	LINK <id> <port> <id> <port>
	LANES <id> <port> <lanes>
	ADDRESS <address> <id> <port>
	```
	Switches must be declared before being used. When `lanes` is omitted the ports operate [MAXIMUM_LANES] lanes.
	**/
	pub fn parse(text:&str) -> Result<NeighboursLists,Error>
	{
		let mut topology = NeighboursLists::new();
		for (line_index,line) in text.lines().enumerate()
		{
			let line = match line.find('#')
			{
				Some(position) => &line[..position],
				None => line,
			};
			let mut words = line.split_whitespace();
			let command = match words.next()
			{
				Some(command) => command,
				None => continue,
			};
			let numbers : Vec<u64> = words.map(|w|w.parse::<u64>().map_err(|e|crate::error!(topology_error).with_message(format!("line {}: bad number {}: {}",line_index+1,w,e)))).collect::<Result<_,_>>()?;
			let arity_error = || crate::error!(topology_error).with_message(format!("line {}: wrong number of arguments for {}",line_index+1,command));
			match (command,numbers.as_slice())
			{
				("SWITCH",&[id,ports]) => topology.add_switch(id,ports as usize,MAXIMUM_LANES)?,
				("SWITCH",&[id,ports,lanes]) => topology.add_switch(id,ports as usize,lanes as usize)?,
				("LINK",&[a,port_a,b,port_b]) => topology.link(a,port_a as usize,b,port_b as usize)?,
				("LANES",&[id,port,lanes]) => topology.set_port_lanes(id,port as usize,lanes as usize)?,
				("ADDRESS",&[address,id,port]) =>
				{
					let address = Address::try_from(address).map_err(|_|crate::error!(topology_error).with_message(format!("line {}: address {} out of range",line_index+1,address)))?;
					topology.add_address(address,id,port as usize)?
				},
				("SWITCH",_) | ("LINK",_) | ("LANES",_) | ("ADDRESS",_) => return Err(arity_error()),
				_ => return Err(crate::error!(topology_error).with_message(format!("line {}: unknown command {}",line_index+1,command))),
			}
		}
		debug!("read topology with {} switches",topology.switches.len());
		Ok(topology)
	}
	pub fn load<P:AsRef<Path>>(path:P) -> Result<NeighboursLists,Error>
	{
		let text = fs::read_to_string(path.as_ref()).map_err(|e|crate::error!(io,e).with_message(format!("cannot read {}: {}",path.as_ref().display(),e)))?;
		NeighboursLists::parse(&text)
	}
	pub fn new_cfg(cv:&ConfigurationValue) -> Result<NeighboursLists,Error>
	{
		let mut filename=None;
		match_object!(cv,"File",value,
			"filename" => filename=Some(value.as_str()?.to_string()),
		);
		let filename=filename.ok_or_else(||crate::error!(configuration_error).with_message("File requires a filename".to_string()))?;
		NeighboursLists::load(filename)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn parse_small_fabric()
	{
		let text = "
# two switches with a host each
SWITCH 100 3 4
SWITCH 200 3
LINK 100 1 200 2
ADDRESS 1 100 0
ADDRESS 2 200 0
ADDRESS 7 100 3 # host
LANES 200 2 2
";
		let topology = NeighboursLists::parse(text).expect("parses");
		assert_eq!(topology.switch_ids(),vec![100,200]);
		assert_eq!(topology.neighbour(100,1),Location::SwitchPort{switch_id:200,port:2});
		assert_eq!(topology.neighbour(200,2),Location::SwitchPort{switch_id:100,port:1});
		assert_eq!(topology.neighbour(100,3),Location::Endpoint(7));
		assert_eq!(topology.neighbour(100,2),Location::None);
		assert_eq!(topology.addresses(100),vec![(1,LOCAL_PORT),(7,3)]);
		assert_eq!(topology.lane_budget(),2);
		topology.check_consistency().expect("consistent");
	}
	#[test]
	fn parse_rejects_unknown_switch()
	{
		let err = NeighboursLists::parse("SWITCH 1 2\nLINK 1 1 2 1\n").unwrap_err();
		assert_eq!(err.kind,crate::error::ErrorKind::TopologyError);
	}
	#[test]
	fn parse_rejects_bad_port()
	{
		assert!(NeighboursLists::parse("SWITCH 1 2\nSWITCH 2 2\nLINK 1 3 2 1\n").is_err());
		assert!(NeighboursLists::parse("SWITCH 1 2\nSWITCH 2 2\nLINK 1 0 2 1\n").is_err());
		assert!(NeighboursLists::parse("SWITCH 1 2 3 4\n").is_err());
	}
	#[test]
	fn one_way_link_is_inconsistent()
	{
		let mut topology = NeighboursLists::new();
		topology.add_switch(1,1,4).unwrap();
		topology.add_switch(2,1,4).unwrap();
		topology.connect(1,1,2,1).unwrap();
		assert!(topology.check_consistency().is_err());
	}
}
