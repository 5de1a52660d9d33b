/*!

Channel dependency graph of a lane.

Each vertex is a directed hop `(u,v)` between neighbour switches. There is a dependency from the vertex `(u,v)` to `(v,w)` when some route using the lane
goes through `u`, `v` and `w` consecutively. A lane is free of deadlock as long as its graph has no cycles.

Vertices live in an arena and are referred by handle. They keep how many route directions use them, and every dependency keeps how many route directions
produce it. Vertices and dependencies created while trying a route are temporary until [commit_route](ChannelDependencyGraph::commit_route) is called.
[remove_route](ChannelDependencyGraph::remove_route) undoes [add_route](ChannelDependencyGraph::add_route) either on a rejected trial or when a route leaves the lane.

*/

use std::collections::HashMap;

use log::trace;
use slab::Slab;

use crate::error::Error;

///A directed hop between two switches, by internal index.
pub type Hop = (usize,usize);

#[derive(Debug,Clone)]
struct Dependency
{
	///Handle of the vertex depended on.
	target: usize,
	///Number of route directions using the two vertices consecutively.
	num_used: usize,
	temporary: bool,
}

#[derive(Debug,Clone)]
struct CdgVertex
{
	hop: Hop,
	dependencies: Vec<Dependency>,
	///Number of route directions using the hop.
	num_using: usize,
	temporary: bool,
	//Scratch state of the cycle search.
	visiting_number: usize,
	seen: bool,
}

#[derive(Debug,Clone,Default)]
pub struct ChannelDependencyGraph
{
	vertices: Slab<CdgVertex>,
	index: HashMap<Hop,usize>,
}

impl ChannelDependencyGraph
{
	pub fn new() -> ChannelDependencyGraph
	{
		ChannelDependencyGraph::default()
	}
	pub fn num_vertices(&self) -> usize
	{
		self.vertices.len()
	}
	pub fn is_empty(&self) -> bool
	{
		self.vertices.is_empty()
	}
	///Handle of the vertex of a hop, if it exists.
	pub fn vertex(&self, hop:Hop) -> Option<usize>
	{
		self.index.get(&hop).cloned()
	}
	///Number of route directions through the hop.
	pub fn usage(&self, hop:Hop) -> usize
	{
		self.vertex(hop).map(|v|self.vertices[v].num_using).unwrap_or(0)
	}
	///Number of route directions using `from` followed by `to`.
	pub fn dependency_usage(&self, from:Hop, to:Hop) -> usize
	{
		match (self.vertex(from),self.vertex(to))
		{
			(Some(f),Some(t)) => self.vertices[f].dependencies.iter().find(|d|d.target==t).map(|d|d.num_used).unwrap_or(0),
			_ => 0,
		}
	}
	///Whether some vertex or dependency has not been committed.
	pub fn has_temporary(&self) -> bool
	{
		self.vertices.iter().any(|(_,v)|v.temporary || v.dependencies.iter().any(|d|d.temporary))
	}
	fn get_or_create(&mut self, hop:Hop) -> usize
	{
		if let Some(&handle) = self.index.get(&hop)
		{
			return handle;
		}
		let handle = self.vertices.insert(CdgVertex{
			hop,
			dependencies: vec![],
			num_using: 0,
			temporary: true,
			visiting_number: 0,
			seen: false,
		});
		self.index.insert(hop,handle);
		trace!("created cdg vertex {:?}",hop);
		handle
	}
	/**
	Insert the dependencies of a route direction given as its sequence of hops.
	Returns the handle of the vertex of the first hop, from where the cycle search should start. `None` for an empty route.
	**/
	pub fn add_route(&mut self, hops:&[Hop]) -> Option<usize>
	{
		let mut first = None;
		let mut previous : Option<usize> = None;
		for &hop in hops
		{
			let current = self.get_or_create(hop);
			self.vertices[current].num_using += 1;
			if let Some(previous) = previous
			{
				let vertex = &mut self.vertices[previous];
				match vertex.dependencies.iter_mut().find(|d|d.target==current)
				{
					Some(dependency) => dependency.num_used += 1,
					None => vertex.dependencies.push(Dependency{
						target: current,
						num_used: 1,
						temporary: true,
					}),
				}
			}
			else
			{
				first = Some(current);
			}
			previous = Some(current);
		}
		first
	}
	///Make permanent every vertex and dependency along the route.
	pub fn commit_route(&mut self, hops:&[Hop])
	{
		let mut previous : Option<usize> = None;
		for &hop in hops
		{
			let current = match self.index.get(&hop)
			{
				Some(&handle) => handle,
				None => continue,
			};
			self.vertices[current].temporary = false;
			if let Some(previous) = previous
			{
				for dependency in self.vertices[previous].dependencies.iter_mut()
				{
					if dependency.target==current
					{
						dependency.temporary = false;
					}
				}
			}
			previous = Some(current);
		}
	}
	/**
	Undo one [add_route](ChannelDependencyGraph::add_route) of the same hops. Counters are decremented, and dependencies and vertices are
	freed when no route direction uses them anymore. This restores the graph to its state before the route was added.
	**/
	pub fn remove_route(&mut self, hops:&[Hop]) -> Result<(),Error>
	{
		let mut handles = Vec::with_capacity(hops.len());
		for &hop in hops
		{
			match self.index.get(&hop)
			{
				Some(&handle) => handles.push(handle),
				None => return Err(crate::error!(internal_invariant_violation).with_message(format!("removing route through missing cdg vertex {:?}",hop))),
			}
		}
		for pair in handles.windows(2)
		{
			let (from,to) = (pair[0],pair[1]);
			let vertex = &mut self.vertices[from];
			let position = vertex.dependencies.iter().position(|d|d.target==to)
				.ok_or_else(||crate::error!(internal_invariant_violation).with_message(format!("removing missing cdg dependency from {:?}",vertex.hop)))?;
			let dependency = &mut vertex.dependencies[position];
			dependency.num_used -= 1;
			if dependency.num_used==0
			{
				vertex.dependencies.swap_remove(position);
			}
		}
		for &handle in handles.iter()
		{
			let vertex = &mut self.vertices[handle];
			if vertex.num_using==0
			{
				return Err(crate::error!(internal_invariant_violation).with_message(format!("usage underflow at cdg vertex {:?}",vertex.hop)));
			}
			vertex.num_using -= 1;
		}
		for &handle in handles.iter()
		{
			//A hop repeated in the route would be freed in the first visit.
			if !self.vertices.contains(handle)
			{
				continue;
			}
			let vertex = &self.vertices[handle];
			if vertex.num_using==0
			{
				if !vertex.dependencies.is_empty()
				{
					return Err(crate::error!(internal_invariant_violation).with_message(format!("unused cdg vertex {:?} keeps dependencies",vertex.hop)));
				}
				let hop = vertex.hop;
				self.vertices.remove(handle);
				self.index.remove(&hop);
				trace!("freed cdg vertex {:?}",hop);
			}
		}
		Ok(())
	}
	/**
	Depth first search from `start` looking for a cycle reachable from it.
	Vertices get visiting numbers equal to their depth in the search. Reaching a vertex with a lower visiting number that has not been fully explored closes a cycle.
	The marks are cleared before returning.
	**/
	pub fn has_cycle_from(&mut self, start:usize) -> bool
	{
		let mut touched = vec![start];
		//Stack of (vertex, index of the next dependency to follow).
		let mut stack : Vec<(usize,usize)> = vec![(start,0)];
		self.vertices[start].visiting_number = 1;
		let mut found = false;
		while let Some(&(current,next)) = stack.last()
		{
			let target = self.vertices[current].dependencies.get(next).map(|d|d.target);
			match target
			{
				Some(target) =>
				{
					if let Some(top) = stack.last_mut()
					{
						top.1 += 1;
					}
					let depth = stack.len()+1;
					let vertex = &mut self.vertices[target];
					if vertex.visiting_number==0
					{
						vertex.visiting_number = depth;
						touched.push(target);
						stack.push((target,0));
					}
					else if vertex.visiting_number<depth && !vertex.seen
					{
						found = true;
						break;
					}
				},
				None =>
				{
					self.vertices[current].seen = true;
					stack.pop();
				},
			}
		}
		for handle in touched
		{
			let vertex = &mut self.vertices[handle];
			vertex.visiting_number = 0;
			vertex.seen = false;
		}
		found
	}
	///Check every vertex for cycles.
	pub fn is_acyclic(&mut self) -> bool
	{
		let handles : Vec<usize> = self.vertices.iter().map(|(handle,_)|handle).collect();
		handles.into_iter().all(|handle|!self.has_cycle_from(handle))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn route_counters()
	{
		let mut cdg = ChannelDependencyGraph::new();
		let route = [(0,1),(1,2),(2,3)];
		let start = cdg.add_route(&route);
		assert_eq!(start,cdg.vertex((0,1)));
		cdg.add_route(&route[1..]);
		assert_eq!(cdg.usage((0,1)),1);
		assert_eq!(cdg.usage((1,2)),2);
		assert_eq!(cdg.dependency_usage((1,2),(2,3)),2);
		assert_eq!(cdg.dependency_usage((0,1),(1,2)),1);
		assert_eq!(cdg.dependency_usage((0,1),(2,3)),0);
		assert!(cdg.has_temporary());
		cdg.commit_route(&route);
		assert!(!cdg.has_temporary());
		cdg.remove_route(&route[1..]).unwrap();
		assert_eq!(cdg.usage((1,2)),1);
		cdg.remove_route(&route).unwrap();
		assert!(cdg.is_empty());
		assert!(cdg.remove_route(&route).is_err());
	}
	#[test]
	fn rollback_restores_previous_state()
	{
		let mut cdg = ChannelDependencyGraph::new();
		let committed = [(0,1),(1,2)];
		cdg.add_route(&committed);
		cdg.commit_route(&committed);
		let trial = [(0,1),(1,2),(2,3)];
		cdg.add_route(&trial);
		assert_eq!(cdg.num_vertices(),3);
		assert_eq!(cdg.dependency_usage((0,1),(1,2)),2);
		cdg.remove_route(&trial).unwrap();
		assert_eq!(cdg.num_vertices(),2);
		assert_eq!(cdg.vertex((2,3)),None);
		assert_eq!(cdg.dependency_usage((0,1),(1,2)),1);
		assert_eq!(cdg.usage((0,1)),1);
		assert!(!cdg.has_temporary());
	}
	#[test]
	fn detects_cycle_of_ring_routes()
	{
		let mut cdg = ChannelDependencyGraph::new();
		//Routes of length 2 around a ring of 3 switches, all clockwise.
		let routes = [[(0,1),(1,2)],[(1,2),(2,0)],[(2,0),(0,1)]];
		for route in routes[..2].iter()
		{
			let start = cdg.add_route(route).unwrap();
			assert!(!cdg.has_cycle_from(start));
			cdg.commit_route(route);
		}
		assert!(cdg.is_acyclic());
		let start = cdg.add_route(&routes[2]).unwrap();
		assert!(cdg.has_cycle_from(start));
		//The marks are reset, so the answer is repeated.
		assert!(cdg.has_cycle_from(start));
		assert!(!cdg.is_acyclic());
		cdg.remove_route(&routes[2]).unwrap();
		assert!(cdg.is_acyclic());
	}
	#[test]
	fn shared_suffix_is_not_a_cycle()
	{
		//Two branches joining: a DAG where a vertex is reached twice.
		let mut cdg = ChannelDependencyGraph::new();
		cdg.add_route(&[(0,1),(1,2),(2,3)]);
		cdg.add_route(&[(0,1),(1,4),(4,2)]);
		cdg.add_route(&[(4,2),(2,3)]);
		let start = cdg.vertex((0,1)).unwrap();
		assert!(!cdg.has_cycle_from(start));
		assert!(cdg.is_acyclic());
	}
}
