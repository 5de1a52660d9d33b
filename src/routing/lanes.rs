/*!

Lanes and the assignment of switch pairs to them.

A [Route] joins two switches in both directions and lives in a single lane. The pairs are visited in order and each one is given the first lane
in which both directions can be added without closing a cycle in the dependency graph of the lane.

*/

use indicatif::ProgressBar;
use itertools::Itertools;
use log::{debug,info};

use super::cdg::{ChannelDependencyGraph,Hop};
use super::spanning_tree::route_hops;
use super::switch::Fabric;
use crate::error::Error;

///An unordered switch pair with its paths in both directions.
#[derive(Debug,Clone)]
pub struct Route
{
	///Internal indices, with `a<b`.
	pub a: usize,
	pub b: usize,
	///Hops from `a` to `b`.
	pub forward: Vec<Hop>,
	///Hops from `b` to `a`.
	pub backward: Vec<Hop>,
	///The lane holding the route. Only `None` before the assignment.
	pub lane: Option<usize>,
}

///The dependency graphs of all the lanes and how many routes each one holds.
#[derive(Debug,Clone)]
pub struct LaneSet
{
	graphs: Vec<ChannelDependencyGraph>,
	route_counts: Vec<usize>,
}

impl LaneSet
{
	pub fn new(num_lanes:usize) -> Result<LaneSet,Error>
	{
		let mut graphs = Vec::new();
		graphs.try_reserve_exact(num_lanes)?;
		graphs.resize_with(num_lanes,ChannelDependencyGraph::new);
		Ok(LaneSet{
			graphs,
			route_counts: vec![0;num_lanes],
		})
	}
	pub fn num_lanes(&self) -> usize
	{
		self.graphs.len()
	}
	pub fn route_counts(&self) -> &[usize]
	{
		&self.route_counts
	}
	pub fn graph(&self, lane:usize) -> &ChannelDependencyGraph
	{
		&self.graphs[lane]
	}
	///Number of lanes holding some route.
	pub fn lanes_used(&self) -> usize
	{
		self.route_counts.iter().filter(|&&c|c>0).count()
	}
	/**
	Try to put both directions of the route into `lane`. On success the dependencies are committed into the lane, its count is increased and `true` is returned.
	If any direction closes a cycle the trial is undone and `false` is returned.
	This does not modify the route nor removes it from other lanes.
	**/
	pub fn try_insert(&mut self, route:&Route, lane:usize) -> Result<bool,Error>
	{
		let graph = &mut self.graphs[lane];
		let forward_start = graph.add_route(&route.forward);
		let backward_start = graph.add_route(&route.backward);
		let cycle = forward_start.map(|start|graph.has_cycle_from(start)).unwrap_or(false)
			|| backward_start.map(|start|graph.has_cycle_from(start)).unwrap_or(false);
		if cycle
		{
			graph.remove_route(&route.backward)?;
			graph.remove_route(&route.forward)?;
			Ok(false)
		}
		else
		{
			graph.commit_route(&route.forward);
			graph.commit_route(&route.backward);
			self.route_counts[lane] += 1;
			Ok(true)
		}
	}
	///Take out of `lane` the contribution of a committed route.
	pub fn remove(&mut self, route:&Route, lane:usize) -> Result<(),Error>
	{
		if self.route_counts[lane]==0
		{
			return Err(crate::error!(internal_invariant_violation).with_message(format!("lane {} has no routes to remove",lane)));
		}
		let graph = &mut self.graphs[lane];
		graph.remove_route(&route.forward)?;
		graph.remove_route(&route.backward)?;
		self.route_counts[lane] -= 1;
		Ok(())
	}
	///Check every lane has an acyclic graph without uncommitted entries.
	pub fn verify(&mut self) -> Result<(),Error>
	{
		for (lane,graph) in self.graphs.iter_mut().enumerate()
		{
			if graph.has_temporary()
			{
				return Err(crate::error!(internal_invariant_violation).with_message(format!("lane {} has uncommitted dependencies",lane)));
			}
			if !graph.is_acyclic()
			{
				return Err(crate::error!(internal_invariant_violation).with_message(format!("lane {} has a cyclic dependency graph",lane)));
			}
		}
		Ok(())
	}
}

///The routes between every pair of switches that reach each other, and the number of pairs left out.
pub fn collect_routes(fabric:&Fabric) -> Result<(Vec<Route>,usize),Error>
{
	let n = fabric.len();
	let mut routes = Vec::new();
	routes.try_reserve(n*n.saturating_sub(1)/2)?;
	let mut unreachable = 0;
	for (a,b) in (0..n).tuple_combinations()
	{
		match (route_hops(fabric,a,b),route_hops(fabric,b,a))
		{
			(Some(forward),Some(backward)) => routes.push(Route{a,b,forward,backward,lane:None}),
			_ =>
			{
				info!("no route between switches {} and {}",fabric.switch(a).id,fabric.switch(b).id);
				unreachable += 1;
			},
		}
	}
	Ok((routes,unreachable))
}

/**
Give a lane to every route, trying lanes from 0 upwards. The lane is also written into the routing tables of both end switches.
Fails with `InsufficientLanes` if some route cannot be placed in any lane of the set.
**/
pub fn assign_lanes(fabric:&mut Fabric, routes:&mut [Route], lanes:&mut LaneSet, progress:&ProgressBar) -> Result<(),Error>
{
	let num_lanes = lanes.num_lanes();
	for route in routes.iter_mut()
	{
		let mut assigned = None;
		for lane in 0..num_lanes
		{
			if lanes.try_insert(route,lane)?
			{
				assigned = Some(lane);
				break;
			}
		}
		let lane = match assigned
		{
			Some(lane) => lane,
			None =>
			{
				progress.abandon();
				return Err(crate::error!(insufficient_lanes,num_lanes).with_message(format!("switches {} and {} cannot be routed without a cycle in any of the {} lanes",fabric.switch(route.a).id,fabric.switch(route.b).id,num_lanes)));
			},
		};
		debug!("pair ({},{}) in lane {}",route.a,route.b,lane);
		route.lane = Some(lane);
		fabric.switch_mut(route.a).routing_table[route.b].lane = Some(lane);
		fabric.switch_mut(route.b).routing_table[route.a].lane = Some(lane);
		progress.inc(1);
	}
	progress.finish_and_clear();
	Ok(())
}

#[cfg(test)]
mod tests
{
	use super::*;
	use super::super::spanning_tree::generate_routing_function;
	use crate::topology::cartesian::Cartesian;
	fn routed_fabric(topology:&Cartesian) -> (Fabric,Vec<Route>)
	{
		let mut fabric = Fabric::from_topology(topology).unwrap();
		generate_routing_function(&mut fabric);
		let (routes,unreachable) = collect_routes(&fabric).unwrap();
		assert_eq!(unreachable,0);
		(fabric,routes)
	}
	#[test]
	fn line_needs_one_lane()
	{
		let (mut fabric,mut routes) = routed_fabric(&Cartesian::mesh(&[4]));
		assert_eq!(routes.len(),6);
		let mut lanes = LaneSet::new(1).unwrap();
		assign_lanes(&mut fabric,&mut routes,&mut lanes,&ProgressBar::hidden()).expect("a line is a tree");
		assert_eq!(lanes.route_counts(),&[6]);
		lanes.verify().unwrap();
		assert!(routes.iter().all(|r|r.lane==Some(0)));
		assert_eq!(fabric.switch(3).routing_table[0].lane,Some(0));
	}
	#[test]
	fn ring_of_five_needs_two_lanes()
	{
		let (mut fabric,mut routes) = routed_fabric(&Cartesian::torus(&[5]));
		let mut one = LaneSet::new(1).unwrap();
		let err = assign_lanes(&mut fabric.clone(),&mut routes.clone(),&mut one,&ProgressBar::hidden()).unwrap_err();
		assert_eq!(err.kind,crate::error::ErrorKind::InsufficientLanes{lanes:1});
		let mut two = LaneSet::new(2).unwrap();
		assign_lanes(&mut fabric,&mut routes,&mut two,&ProgressBar::hidden()).expect("two lanes are enough");
		assert_eq!(two.lanes_used(),2);
		assert_eq!(two.route_counts().iter().sum::<usize>(),10);
		two.verify().unwrap();
	}
	#[test]
	fn rejected_trial_leaves_lane_untouched()
	{
		let (_fabric,routes) = routed_fabric(&Cartesian::torus(&[5]));
		let mut lanes = LaneSet::new(1).unwrap();
		let mut inserted : Vec<&Route> = vec![];
		let mut rejected = None;
		for route in routes.iter()
		{
			let before = lanes.graph(0).num_vertices();
			if lanes.try_insert(route,0).unwrap()
			{
				inserted.push(route);
			}
			else
			{
				assert_eq!(lanes.graph(0).num_vertices(),before);
				rejected = Some(route);
				break;
			}
		}
		let rejected = rejected.expect("some route must close the ring");
		lanes.verify().unwrap();
		assert_eq!(lanes.route_counts(),&[inserted.len()]);
		for &hop in rejected.forward.iter().chain(rejected.backward.iter())
		{
			//Only the committed route directions remain counted.
			let committed = inserted.iter().map(|r|r.forward.iter().chain(r.backward.iter()).filter(|&&h|h==hop).count()).sum::<usize>();
			assert_eq!(lanes.graph(0).usage(hop),committed);
		}
	}
	#[test]
	fn remove_frees_lane()
	{
		let (_fabric,routes) = routed_fabric(&Cartesian::mesh(&[3,2]));
		let mut lanes = LaneSet::new(2).unwrap();
		assert!(lanes.try_insert(&routes[0],1).unwrap());
		assert_eq!(lanes.route_counts(),&[0,1]);
		lanes.remove(&routes[0],1).unwrap();
		assert_eq!(lanes.route_counts(),&[0,0]);
		assert!(lanes.graph(1).is_empty());
		assert!(lanes.remove(&routes[0],1).is_err());
	}
}
