
use super::prelude::*;
use crate::config::ConfigurationValue;
use crate::error::Error;
use crate::match_object;

///Coordinates of switches in an orthohedron.
#[derive(Debug,Clone)]
pub struct CartesianData
{
	pub sides: Vec<usize>,
	pub size: usize,
}

impl CartesianData
{
	pub fn new(sides:&[usize]) -> CartesianData
	{
		CartesianData{
			sides: sides.to_vec(),
			size: sides.iter().product(),
		}
	}
	pub fn unpack(&self, index:usize) -> Vec<usize>
	{
		let mut r = Vec::with_capacity(self.sides.len());
		let mut rest = index;
		for side in self.sides.iter()
		{
			r.push(rest%side);
			rest/=side;
		}
		r
	}
	pub fn pack(&self, coordinates:&[usize]) -> usize
	{
		let mut r = 0;
		let mut product = 1;
		for (i,side) in self.sides.iter().enumerate()
		{
			r+=coordinates[i]*product;
			product*=side;
		}
		r
	}
}

/**
Mesh or torus of switches. Switch `i` has identifier `i`.
The ports `2d+1` and `2d+2` go respectively to the lower and upper neighbours in dimension `d`. In a mesh the ports at the border are disconnected.
After the switch ports come `endpoints_per_switch` ports to endpoints.
Addresses are given consecutively from 1: first the switch itself, then its endpoints.
**/
#[derive(Debug,Clone)]
pub struct Cartesian
{
	cartesian_data: CartesianData,
	wrap_around: bool,
	endpoints_per_switch: usize,
	lanes: usize,
}

impl Topology for Cartesian
{
	fn switch_ids(&self) -> Vec<SwitchId>
	{
		(0..self.cartesian_data.size as SwitchId).collect()
	}
	fn ports(&self, switch_id:SwitchId) -> usize
	{
		if (switch_id as usize) < self.cartesian_data.size
		{
			2*self.cartesian_data.sides.len()+self.endpoints_per_switch
		}
		else
		{
			0
		}
	}
	fn neighbour(&self, switch_id:SwitchId, port:usize) -> Location
	{
		let index = switch_id as usize;
		if port==LOCAL_PORT || port>self.ports(switch_id)
		{
			return Location::None;
		}
		let m = self.cartesian_data.sides.len();
		let offset = port-1;
		if offset>=2*m
		{
			return Location::Endpoint(self.address_of(index,1+offset-2*m));
		}
		let dimension = offset/2;
		let upwards = offset%2==1;
		let side = self.cartesian_data.sides[dimension];
		let mut coordinates = self.cartesian_data.unpack(index);
		let c = coordinates[dimension];
		let new_c = if upwards
		{
			if c+1<side { c+1 } else if self.wrap_around { 0 } else { return Location::None }
		}
		else
		{
			if c>0 { c-1 } else if self.wrap_around { side-1 } else { return Location::None }
		};
		coordinates[dimension] = new_c;
		let neighbour_port = if upwards { 2*dimension+1 } else { 2*dimension+2 };
		Location::SwitchPort{
			switch_id: self.cartesian_data.pack(&coordinates) as SwitchId,
			port: neighbour_port,
		}
	}
	fn operational_lanes(&self, switch_id:SwitchId, port:usize) -> usize
	{
		if port==LOCAL_PORT || port>self.ports(switch_id) { 0 } else { self.lanes }
	}
	fn addresses(&self, switch_id:SwitchId) -> Vec<(Address,usize)>
	{
		let index = switch_id as usize;
		if index>=self.cartesian_data.size
		{
			return vec![];
		}
		let first_endpoint_port = 2*self.cartesian_data.sides.len()+1;
		let mut r = vec![(self.address_of(index,0),LOCAL_PORT)];
		for k in 0..self.endpoints_per_switch
		{
			r.push( (self.address_of(index,k+1),first_endpoint_port+k) );
		}
		r
	}
}

impl Cartesian
{
	pub fn new(cv:&ConfigurationValue) -> Result<Cartesian,Error>
	{
		let (name,wrap_around) = match cv
		{
			ConfigurationValue::Object(name,_) if name=="Torus" => ("Torus",true),
			_ => ("Mesh",false),
		};
		let mut sides:Option<Vec<usize>>=None;
		let mut endpoints_per_switch=0;
		let mut lanes=MAXIMUM_LANES;
		match_object!(cv,name,value,
			"sides" => sides=Some(value.as_array()?.iter().map(|v|v.as_usize()).collect::<Result<_,_>>()?),
			"endpoints_per_switch" => endpoints_per_switch=value.as_usize()?,
			"lanes" => lanes=value.as_usize()?,
		);
		let sides=sides.ok_or_else(||crate::error!(configuration_error).with_message(format!("{} requires sides",name)))?;
		if sides.is_empty() || sides.contains(&0)
		{
			return Err(crate::error!(configuration_error).with_message(format!("bad sides {:?} for {}",sides,name)));
		}
		Ok(Cartesian::with_sides(&sides,wrap_around,endpoints_per_switch,lanes))
	}
	pub fn with_sides(sides:&[usize], wrap_around:bool, endpoints_per_switch:usize, lanes:usize) -> Cartesian
	{
		Cartesian{
			cartesian_data: CartesianData::new(sides),
			wrap_around,
			endpoints_per_switch,
			lanes,
		}
	}
	pub fn mesh(sides:&[usize]) -> Cartesian
	{
		Cartesian::with_sides(sides,false,0,MAXIMUM_LANES)
	}
	pub fn torus(sides:&[usize]) -> Cartesian
	{
		Cartesian::with_sides(sides,true,0,MAXIMUM_LANES)
	}
	pub fn cartesian_data(&self) -> &CartesianData
	{
		&self.cartesian_data
	}
	fn address_of(&self, index:usize, offset:usize) -> Address
	{
		(1+index*(1+self.endpoints_per_switch)+offset) as Address
	}
}
