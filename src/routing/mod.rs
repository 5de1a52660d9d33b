/*!

The LASH routing engine.

LASH (layered shortest path) routes every pair of switches through a shortest path and avoids deadlock by placing each pair in a lane whose channel dependency
graph stays acyclic. A run goes through these phases:

1. The switches and links of the [Topology] are read into a [Fabric](switch::Fabric).
2. Each switch is the root of a breadth first tree, and the trees give the [routing function](spanning_tree::generate_routing_function).
3. Every pair of switches is given the [first lane](lanes::assign_lanes) where it closes no cycle. If some pair fits in no lane the run fails.
4. The routes are [moved between lanes](balance::Balancer) to even their number.
5. The [forwarding tables](forwarding::ForwardingTables) are built.

A run either gives all the forwarding tables or an error. Nothing is given to a [ForwardingTableConsumer] until the caller commits a successful outcome.

```ignore
let lash = Lash::new(LashConfig::new(&cv)?);
match lash.run(topology.as_ref())
{
	Ok(outcome) => outcome.commit(&mut programmer)?,
	Err(error) if error.is_insufficient_lanes() => fall_back_to_other_engine(),
	Err(error) => return Err(error),
}
```

*/

pub mod switch;
pub mod spanning_tree;
pub mod cdg;
pub mod lanes;
pub mod balance;
pub mod forwarding;

use std::collections::HashMap;
use std::fmt::{Display,Formatter};

use indicatif::ProgressBar;
use log::{debug,info,warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use self::balance::{BalanceTermination,Balancer};
use self::forwarding::{ForwardingTableConsumer,ForwardingTables};
use self::lanes::{LaneSet,Route,assign_lanes,collect_routes};
use self::spanning_tree::generate_routing_function;
use self::switch::Fabric;
use crate::config::ConfigurationValue;
use crate::error::{Error,ErrorKind};
use crate::match_object;
use crate::topology::prelude::*;

/// Some things most uses of the routing module will use.
pub mod prelude
{
	pub use super::{Lash,LashConfig,LashOutcome,LashStatistics,RunPhase};
	pub use super::balance::BalanceTermination;
	pub use super::forwarding::{ForwardingTableConsumer,ForwardingTables};
}

///Parameters of a LASH run.
#[derive(Debug,Clone,PartialEq)]
pub struct LashConfig
{
	///Use at most this number of lanes. By default use all the lanes of the fabric.
	pub lanes: Option<usize>,
	///The first service level to report. The lanes below it are left to other uses.
	pub start_lane: usize,
	///Stop balancing when the most and least loaded lanes differ in less than this number of routes.
	pub balance_threshold: usize,
	pub balance: bool,
	///Seed of the generator used while balancing.
	pub seed: u64,
	///Maximum number of balancing trials. By default the number of routed pairs times the number of lanes.
	pub max_balance_trials: Option<usize>,
	///Whether to draw a progress bar over the lane assignment.
	pub progress: bool,
}

impl Default for LashConfig
{
	fn default() -> LashConfig
	{
		LashConfig{
			lanes: None,
			start_lane: 0,
			balance_threshold: 6,
			balance: true,
			seed: 0,
			max_balance_trials: None,
			progress: false,
		}
	}
}

impl LashConfig
{
	/**
	Read the configuration from a `Lash` object. Every field is optional.
	```ignore
	Lash{
		lanes: 4,
		start_lane: 1,
		balance_threshold: 6,
		balance: true,
		seed: 0,
		max_balance_trials: 100000,
		progress: false,
	}
	```
	**/
	pub fn new(cv:&ConfigurationValue) -> Result<LashConfig,Error>
	{
		let mut config = LashConfig::default();
		match_object!(cv,"Lash",value,
			"lanes" => config.lanes=Some(value.as_usize()?),
			"start_lane" => config.start_lane=value.as_usize()?,
			"balance_threshold" => config.balance_threshold=value.as_usize()?,
			"balance" => config.balance=value.as_bool()?,
			"seed" => config.seed=value.as_usize()? as u64,
			"max_balance_trials" => config.max_balance_trials=Some(value.as_usize()?),
			"progress" => config.progress=value.as_bool()?,
		);
		if config.lanes==Some(0)
		{
			return Err(crate::error!(configuration_error).with_message("lanes must be at least 1".to_string()));
		}
		if config.start_lane>=MAXIMUM_LANES
		{
			return Err(crate::error!(configuration_error).with_message(format!("start_lane {} leaves no lane out of {}",config.start_lane,MAXIMUM_LANES)));
		}
		Ok(config)
	}
}

///The phases of a run, in order. A run ends either in `Done` or in `Failed`.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum RunPhase
{
	Init,
	BuildTopology,
	AllocateStructures,
	ComputeShortestPaths,
	AssignLanes,
	BalanceLanes,
	PopulateForwardingTables,
	Done,
	Failed,
}

impl Display for RunPhase
{
	fn fmt(&self, formatter:&mut Formatter) -> std::fmt::Result
	{
		write!(formatter,"{:?}",self)
	}
}

///Numbers describing a successful run.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct LashStatistics
{
	pub switches: usize,
	///Pairs of switches routed in both directions.
	pub routed_pairs: usize,
	///Pairs of switches without a route in some direction.
	pub unreachable_pairs: usize,
	///Number of lanes the run was allowed to use.
	pub lane_budget: usize,
	///Number of lanes holding some route.
	pub lanes_used: usize,
	pub routes_per_lane_before_balancing: Vec<usize>,
	pub routes_per_lane: Vec<usize>,
	pub balance_moves: usize,
	pub balance_trials: usize,
	pub balance_termination: BalanceTermination,
}

///Everything computed by a successful run.
#[derive(Debug,Clone)]
pub struct LashOutcome
{
	start_lane: usize,
	fabric: Fabric,
	routes: Vec<Route>,
	lanes: LaneSet,
	///Index of the switch hosting each address.
	address_hosts: HashMap<Address,usize>,
	forwarding_tables: ForwardingTables,
	statistics: LashStatistics,
}

impl LashOutcome
{
	pub fn statistics(&self) -> &LashStatistics
	{
		&self.statistics
	}
	pub fn forwarding_tables(&self) -> &ForwardingTables
	{
		&self.forwarding_tables
	}
	///The lane of the route between two switches. `None` for unknown or unreachable switches and for a switch with itself.
	pub fn lane(&self, source:SwitchId, destination:SwitchId) -> Option<usize>
	{
		let source = self.fabric.index(source)?;
		let destination = self.fabric.index(destination)?;
		self.fabric.switch(source).routing_table[destination].lane
	}
	///The service level to use from a switch to another. Pairs without lane use the first service level.
	pub fn service_level(&self, source:SwitchId, destination:SwitchId) -> usize
	{
		self.start_lane + self.lane(source,destination).unwrap_or(0)
	}
	///The service level for traffic between two addresses, given by the switches hosting them.
	pub fn service_level_for_addresses(&self, source:Address, destination:Address) -> usize
	{
		match (self.address_hosts.get(&source),self.address_hosts.get(&destination))
		{
			(Some(&s),Some(&d)) => self.start_lane + self.fabric.switch(s).routing_table[d].lane.unwrap_or(0),
			_ => self.start_lane,
		}
	}
	///Iterate over the routed pairs of switches as `(a,b,lane)`. The lane is the same in both directions.
	pub fn pair_lanes<'a>(&'a self) -> impl Iterator<Item=(SwitchId,SwitchId,usize)> + 'a
	{
		self.routes.iter().filter_map(move |route|{
			route.lane.map(|lane|(self.fabric.switch(route.a).id,self.fabric.switch(route.b).id,lane))
		})
	}
	/**
	Check the lanes of the outcome. Every lane must have an acyclic dependency graph without uncommitted entries, and the number of routes using
	each hop must match the routes assigned to the lane.
	**/
	pub fn verify(&mut self) -> Result<(),Error>
	{
		self.lanes.verify()?;
		let mut usage : Vec<HashMap<(usize,usize),usize>> = vec![HashMap::new();self.lanes.num_lanes()];
		for route in self.routes.iter()
		{
			let lane = route.lane.ok_or_else(||crate::error!(internal_invariant_violation).with_message(format!("pair ({},{}) has no lane",route.a,route.b)))?;
			for &hop in route.forward.iter().chain(route.backward.iter())
			{
				*usage[lane].entry(hop).or_insert(0) += 1;
			}
		}
		for (lane,hops) in usage.iter().enumerate()
		{
			let graph = self.lanes.graph(lane);
			if graph.num_vertices()!=hops.len()
			{
				return Err(crate::error!(internal_invariant_violation).with_message(format!("lane {} has {} vertices for {} hops",lane,graph.num_vertices(),hops.len())));
			}
			for (&hop,&count) in hops.iter()
			{
				if graph.usage(hop)!=count
				{
					return Err(crate::error!(internal_invariant_violation).with_message(format!("hop {:?} of lane {} is used {} times but counts {}",hop,lane,count,graph.usage(hop))));
				}
			}
		}
		Ok(())
	}
	///Give the forwarding tables to the consumer.
	pub fn commit(&self, consumer:&mut dyn ForwardingTableConsumer) -> Result<(),Error>
	{
		self.forwarding_tables.write_to(consumer)
	}
}

///The LASH routing engine.
#[derive(Debug,Clone,Default)]
pub struct Lash
{
	config: LashConfig,
}

impl Lash
{
	pub fn new(config:LashConfig) -> Lash
	{
		Lash{config}
	}
	pub fn new_cfg(cv:&ConfigurationValue) -> Result<Lash,Error>
	{
		Ok(Lash::new(LashConfig::new(cv)?))
	}
	pub fn config(&self) -> &LashConfig
	{
		&self.config
	}
	/**
	Compute the routing of the topology. Nothing outside the returned outcome is modified, either on success or on failure.
	Errors from broken internal counters are reported as `InsufficientLanes`, so the caller can use some other engine.
	**/
	pub fn run(&self, topology:&dyn Topology) -> Result<LashOutcome,Error>
	{
		let mut phase = RunPhase::Init;
		let mut budget = 0;
		match self.run_phases(topology,&mut phase,&mut budget)
		{
			Ok(outcome) =>
			{
				advance(&mut phase,RunPhase::Done);
				Ok(outcome)
			},
			Err(error) =>
			{
				let failed_at = phase;
				advance(&mut phase,RunPhase::Failed);
				warn!("LASH failed during {}: {}",failed_at,error);
				if error.kind==ErrorKind::InternalInvariantViolation
				{
					debug_assert!(false,"{}",error);
					return Err(crate::error!(insufficient_lanes,budget).with_message(format!("degraded from {}",error)));
				}
				Err(error)
			},
		}
	}
	fn run_phases(&self, topology:&dyn Topology, phase:&mut RunPhase, budget:&mut usize) -> Result<LashOutcome,Error>
	{
		advance(phase,RunPhase::BuildTopology);
		topology.check_consistency()?;
		let fabric_budget = topology.lane_budget();
		*budget = fabric_budget.saturating_sub(self.config.start_lane);
		if let Some(lanes) = self.config.lanes
		{
			*budget = (*budget).min(lanes);
		}
		let budget = *budget;
		info!("lane budget of {} (fabric operates {}, starting at lane {})",budget,fabric_budget,self.config.start_lane);
		let mut fabric = Fabric::from_topology(topology)?;
		let mut hosted = Vec::new();
		hosted.try_reserve_exact(fabric.len())?;
		hosted.resize(fabric.len(),vec![]);
		let mut address_hosts = HashMap::new();
		for switch_id in topology.switch_ids()
		{
			let index = fabric.index(switch_id).ok_or_else(||crate::error!(internal_invariant_violation).with_message(format!("switch {} missing from the fabric",switch_id)))?;
			for (address,port) in topology.addresses(switch_id)
			{
				address_hosts.insert(address,index);
				hosted[index].push((address,port));
			}
		}

		advance(phase,RunPhase::AllocateStructures);
		let mut lanes = LaneSet::new(budget)?;

		advance(phase,RunPhase::ComputeShortestPaths);
		generate_routing_function(&mut fabric);
		let (mut routes,unreachable_pairs) = collect_routes(&fabric)?;
		if unreachable_pairs>0
		{
			info!("{} pairs of switches cannot reach each other",unreachable_pairs);
		}

		advance(phase,RunPhase::AssignLanes);
		let progress = if self.config.progress { ProgressBar::new(routes.len() as u64) } else { ProgressBar::hidden() };
		assign_lanes(&mut fabric,&mut routes,&mut lanes,&progress)?;
		let routes_per_lane_before_balancing = lanes.route_counts().to_vec();
		info!("{} lanes used, routes per lane {:?}",lanes.lanes_used(),routes_per_lane_before_balancing);

		advance(phase,RunPhase::BalanceLanes);
		let report = if self.config.balance
		{
			let mut rng = StdRng::seed_from_u64(self.config.seed);
			let mut balancer = Balancer{
				threshold: self.config.balance_threshold,
				max_trials: self.config.max_balance_trials.unwrap_or(routes.len()*budget),
				rng: &mut rng,
			};
			let report = balancer.balance(&mut fabric,&mut routes,&mut lanes)?;
			info!("routes per lane after balancing {:?}",lanes.route_counts());
			report
		}
		else
		{
			balance::BalanceReport{
				moves: 0,
				trials: 0,
				termination: BalanceTermination::Disabled,
			}
		};

		advance(phase,RunPhase::PopulateForwardingTables);
		let forwarding_tables = ForwardingTables::populate(&fabric,&hosted);

		let statistics = LashStatistics{
			switches: fabric.len(),
			routed_pairs: routes.len(),
			unreachable_pairs,
			lane_budget: budget,
			lanes_used: lanes.lanes_used(),
			routes_per_lane_before_balancing,
			routes_per_lane: lanes.route_counts().to_vec(),
			balance_moves: report.moves,
			balance_trials: report.trials,
			balance_termination: report.termination,
		};
		Ok(LashOutcome{
			start_lane: self.config.start_lane,
			fabric,
			routes,
			lanes,
			address_hosts,
			forwarding_tables,
			statistics,
		})
	}
}

fn advance(phase:&mut RunPhase, next:RunPhase)
{
	debug!("LASH phase {} -> {}",phase,next);
	*phase = next;
}
