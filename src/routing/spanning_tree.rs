/*!

Shortest-path trees and the routing function built from them.

A breadth first search from each switch gives a spanning tree of the switches reachable from it. Ties are broken by the order of the links, so the tree is deterministic.
Every tree is then used to fill the routing tables of all its switches towards their descendants: the link towards the child whose subtree holds the destination.
A table slot that is already filled is kept, so the first tree giving a route wins.

*/

use std::collections::VecDeque;

use super::switch::Fabric;

///A breadth-first spanning tree.
#[derive(Debug,Clone)]
pub struct ShortestPathTree
{
	pub root: usize,
	///Switches in the order they were reached. Starts with the root.
	pub order: Vec<usize>,
	///For every reached switch other than the root, its parent and the link of the parent into it.
	pub parent: Vec<Option<(usize,usize)>>,
	///Distance in hops from the root. `None` for unreached switches.
	pub depth: Vec<Option<usize>>,
}

impl ShortestPathTree
{
	pub fn contains(&self, switch:usize) -> bool
	{
		self.depth[switch].is_some()
	}
}

///Breadth first search from `root`. Switches not reachable from the root are left out of the tree.
pub fn shortest_path_tree(fabric:&Fabric, root:usize) -> ShortestPathTree
{
	let n = fabric.len();
	let mut parent = vec![None;n];
	let mut depth = vec![None;n];
	let mut order = Vec::with_capacity(n);
	let mut queue = VecDeque::with_capacity(n);
	depth[root] = Some(0);
	queue.push_back(root);
	while let Some(current) = queue.pop_front()
	{
		order.push(current);
		let current_depth = depth[current].map(|d|d+1);
		for (link_index,link) in fabric.switch(current).links().iter().enumerate()
		{
			let next = link.neighbour;
			if depth[next].is_none()
			{
				depth[next] = current_depth;
				parent[next] = Some((current,link_index));
				queue.push_back(next);
			}
		}
	}
	ShortestPathTree{
		root,
		order,
		parent,
		depth,
	}
}

/**
Write into the routing tables the routes given by the tree. For each switch `d` of the tree and each ancestor `a` of `d`,
the entry of `a` towards `d` becomes the link from `a` into the branch holding `d`, unless the entry was already set.
Returns the number of entries written.
**/
pub fn fill_routing_tables(fabric:&mut Fabric, tree:&ShortestPathTree) -> usize
{
	let mut written = 0;
	for &destination in tree.order.iter().skip(1)
	{
		let mut child = destination;
		while let Some((ancestor,link)) = tree.parent[child]
		{
			let entry = &mut fabric.switch_mut(ancestor).routing_table[destination];
			if entry.out_link.is_none()
			{
				entry.out_link = Some(link);
				written += 1;
			}
			child = ancestor;
		}
	}
	written
}

///Build the complete routing function, using every switch as root once.
pub fn generate_routing_function(fabric:&mut Fabric)
{
	for root in 0..fabric.len()
	{
		let tree = shortest_path_tree(fabric,root);
		fill_routing_tables(fabric,&tree);
	}
}

///The sequence of hops `(u,v)` from `source` to `target` following the routing tables.
///`None` if some switch in the way has no route, including unreachable targets.
pub fn route_hops(fabric:&Fabric, source:usize, target:usize) -> Option<Vec<(usize,usize)>>
{
	let mut hops = vec![];
	let mut current = source;
	while current!=target
	{
		//A loop in the tables would be a broken routing function.
		if hops.len()>=fabric.len()
		{
			return None;
		}
		let link = fabric.switch(current).routing_table[target].out_link?;
		let next = fabric.next_switch(current,link);
		hops.push((current,next));
		current = next;
	}
	Some(hops)
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::topology::cartesian::Cartesian;
	use crate::topology::neighbourslists::NeighboursLists;
	#[test]
	fn tree_of_a_line()
	{
		let fabric = Fabric::from_topology(&Cartesian::mesh(&[4])).unwrap();
		let tree = shortest_path_tree(&fabric,1);
		assert_eq!(tree.order,vec![1,0,2,3]);
		assert_eq!(tree.depth,vec![Some(1),Some(0),Some(1),Some(2)]);
		assert_eq!(tree.parent[3],Some((2,1)));
	}
	#[test]
	fn ties_follow_port_order()
	{
		//A square 0-1-3-2-0. From 0 both 1 and 2 lead to 3.
		let fabric = Fabric::from_topology(&Cartesian::mesh(&[2,2])).unwrap();
		let tree = shortest_path_tree(&fabric,0);
		//Port 2 (upwards in dimension 0) goes to 1 and is enumerated before port 4 to 2.
		assert_eq!(tree.order,vec![0,1,2,3]);
		assert_eq!(tree.parent[3].map(|(p,_)|p),Some(1));
	}
	#[test]
	fn unreachable_switches_are_absent()
	{
		let mut topology = NeighboursLists::new();
		for id in 0..4
		{
			topology.add_switch(id,2,4).unwrap();
		}
		topology.link(0,1,1,1).unwrap();
		topology.link(2,1,3,1).unwrap();
		let mut fabric = Fabric::from_topology(&topology).unwrap();
		let tree = shortest_path_tree(&fabric,0);
		assert_eq!(tree.order,vec![0,1]);
		assert!(!tree.contains(2));
		generate_routing_function(&mut fabric);
		assert!(route_hops(&fabric,0,1).is_some());
		assert!(route_hops(&fabric,0,2).is_none());
		assert!(route_hops(&fabric,3,1).is_none());
	}
	#[test]
	fn routes_are_shortest()
	{
		let torus = Cartesian::torus(&[4,3]);
		let mut fabric = Fabric::from_topology(&torus).unwrap();
		generate_routing_function(&mut fabric);
		for source in 0..fabric.len()
		{
			let tree = shortest_path_tree(&fabric,source);
			for target in 0..fabric.len()
			{
				let hops = route_hops(&fabric,source,target).expect("connected");
				assert_eq!(Some(hops.len()),tree.depth[target],"route {}->{} is not minimal",source,target);
			}
		}
	}
	#[test]
	fn unique_path_first_hop()
	{
		//A star of centre 0 with a tail 3-4: the path 1->4 is unique.
		let mut topology = NeighboursLists::new();
		for id in 0..5
		{
			topology.add_switch(id,4,4).unwrap();
		}
		topology.link(0,1,1,1).unwrap();
		topology.link(0,2,2,1).unwrap();
		topology.link(0,3,3,1).unwrap();
		topology.link(3,2,4,1).unwrap();
		let mut fabric = Fabric::from_topology(&topology).unwrap();
		generate_routing_function(&mut fabric);
		let hops = route_hops(&fabric,1,4).unwrap();
		assert_eq!(hops,vec![(1,0),(0,3),(3,4)]);
		let link = fabric.switch(0).routing_table[4].out_link.unwrap();
		assert_eq!(fabric.switch(0).physical_port(link),3);
	}
}
