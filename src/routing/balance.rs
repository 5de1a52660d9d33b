/*!

Balancing the number of routes in each lane.

Routes are moved from the most loaded lane into the least loaded one while that keeps the target lane acyclic. Every round shuffles the routes of the most
loaded lane with a seeded generator and tries them in that order, so two runs with the same seed do the same moves. A route that cannot move is marked
as rejected and not retried until the balancing target changes. The balancing stops when the gap between the extreme lanes is below the threshold, when
a round finishes without moves or after a maximum number of trials.

*/

use itertools::{Itertools,MinMaxResult};
use log::{debug,info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::lanes::{LaneSet,Route};
use super::switch::Fabric;
use crate::error::Error;
use crate::matrix::Matrix;

///State of a route with respect to a lane during the balancing.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum TrialMarker
{
	Unassigned,
	Assigned,
	///Assigned here, but failed to move in the current round.
	Rejected,
}

///Why the balancing finished.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum BalanceTermination
{
	///The gap got below the threshold. Also when there are less than two lanes.
	Balanced,
	///The gap is one but the threshold asks for less. Any move would just swap the extreme lanes.
	Optimal,
	///A whole round was tried without any move.
	TrialsExhausted,
	///The maximum number of trials was reached.
	IterationCap,
	///The balancing was not requested.
	Disabled,
}

#[derive(Debug,Clone,PartialEq,Eq)]
pub struct BalanceReport
{
	pub moves: usize,
	pub trials: usize,
	pub termination: BalanceTermination,
}

///The least and most loaded lanes. Ties are resolved to the lowest index.
fn extreme_lanes(counts:&[usize]) -> (usize,usize)
{
	match counts.iter().position_minmax()
	{
		MinMaxResult::NoElements => (0,0),
		MinMaxResult::OneElement(lane) => (lane,lane),
		MinMaxResult::MinMax(min_lane,_) =>
		{
			//position_minmax picks the last maximum.
			let max_count = counts.iter().max().cloned().unwrap_or(0);
			let max_lane = counts.iter().position(|&c|c==max_count).unwrap_or(0);
			(min_lane,max_lane)
		},
	}
}

pub struct Balancer<'a>
{
	pub threshold: usize,
	pub max_trials: usize,
	pub rng: &'a mut StdRng,
}

impl<'a> Balancer<'a>
{
	/**
	Balance the lanes. `routes` must be already assigned, with `lanes` holding their dependencies.
	The routing tables of the fabric are updated with the new lanes.
	**/
	pub fn balance(&mut self, fabric:&mut Fabric, routes:&mut [Route], lanes:&mut LaneSet) -> Result<BalanceReport,Error>
	{
		let num_lanes = lanes.num_lanes();
		if num_lanes<2
		{
			return Ok(BalanceReport{
				moves: 0,
				trials: 0,
				termination: BalanceTermination::Balanced,
			});
		}
		let mut markers = Matrix::try_constant(TrialMarker::Unassigned,routes.len(),num_lanes)?;
		for (index,route) in routes.iter().enumerate()
		{
			let lane = route.lane.ok_or_else(||crate::error!(internal_invariant_violation).with_message(format!("balancing unassigned pair ({},{})",route.a,route.b)))?;
			*markers.get_mut(index,lane) = TrialMarker::Assigned;
		}
		let mut moves = 0;
		let mut trials = 0;
		let (mut min_lane,mut max_lane) = extreme_lanes(lanes.route_counts());
		let termination = 'rounds: loop
		{
			let counts = lanes.route_counts();
			let gap = counts[max_lane]-counts[min_lane];
			if gap<self.threshold
			{
				break BalanceTermination::Balanced;
			}
			if gap<=1
			{
				break BalanceTermination::Optimal;
			}
			let mut worklist : Vec<usize> = (0..routes.len()).filter(|&index|*markers.get(index,max_lane)==TrialMarker::Assigned).collect();
			worklist.shuffle(&mut *self.rng);
			let budget = counts[max_lane];
			debug!("balancing round from lane {} ({} routes) to lane {} ({} routes) with {} candidates",max_lane,counts[max_lane],min_lane,counts[min_lane],worklist.len());
			let mut moved_in_round = false;
			for &index in worklist.iter().take(budget)
			{
				if trials>=self.max_trials
				{
					break 'rounds BalanceTermination::IterationCap;
				}
				trials += 1;
				if lanes.try_insert(&routes[index],min_lane)?
				{
					lanes.remove(&routes[index],max_lane)?;
					let route = &mut routes[index];
					route.lane = Some(min_lane);
					fabric.switch_mut(route.a).routing_table[route.b].lane = Some(min_lane);
					fabric.switch_mut(route.b).routing_table[route.a].lane = Some(min_lane);
					*markers.get_mut(index,max_lane) = TrialMarker::Unassigned;
					*markers.get_mut(index,min_lane) = TrialMarker::Assigned;
					moves += 1;
					moved_in_round = true;
					debug!("moved pair ({},{}) from lane {} to lane {}",route.a,route.b,max_lane,min_lane);
					let (new_min,new_max) = extreme_lanes(lanes.route_counts());
					if new_min!=min_lane || new_max!=max_lane
					{
						//The target moved, so previous rejections no longer apply.
						for lane in [max_lane,new_max].iter()
						{
							for row in 0..routes.len()
							{
								let marker = markers.get_mut(row,*lane);
								if *marker==TrialMarker::Rejected
								{
									*marker = TrialMarker::Assigned;
								}
							}
						}
						min_lane = new_min;
						max_lane = new_max;
						continue 'rounds;
					}
					let counts = lanes.route_counts();
					if counts[max_lane]-counts[min_lane]<self.threshold
					{
						continue 'rounds;
					}
				}
				else
				{
					*markers.get_mut(index,max_lane) = TrialMarker::Rejected;
				}
			}
			if !moved_in_round
			{
				break BalanceTermination::TrialsExhausted;
			}
			//Moves were done but the round ran out of candidates while keeping the same extremes.
			let remaining = (0..routes.len()).any(|index|*markers.get(index,max_lane)==TrialMarker::Assigned);
			if !remaining
			{
				break BalanceTermination::TrialsExhausted;
			}
		};
		info!("lane balancing finished with {} moves in {} trials ({:?})",moves,trials,termination);
		Ok(BalanceReport{
			moves,
			trials,
			termination,
		})
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use indicatif::ProgressBar;
	use rand::SeedableRng;
	use super::super::lanes::{assign_lanes,collect_routes};
	use super::super::spanning_tree::generate_routing_function;
	use crate::topology::cartesian::Cartesian;
	fn assigned(sides:&[usize], num_lanes:usize) -> (Fabric,Vec<Route>,LaneSet)
	{
		let mut fabric = Fabric::from_topology(&Cartesian::torus(sides)).unwrap();
		generate_routing_function(&mut fabric);
		let (mut routes,_) = collect_routes(&fabric).unwrap();
		let mut lanes = LaneSet::new(num_lanes).unwrap();
		assign_lanes(&mut fabric,&mut routes,&mut lanes,&ProgressBar::hidden()).unwrap();
		(fabric,routes,lanes)
	}
	#[test]
	fn extremes_prefer_lowest_index()
	{
		assert_eq!(extreme_lanes(&[3,1,3,1]),(1,0));
		assert_eq!(extreme_lanes(&[2,2]),(0,0));
		assert_eq!(extreme_lanes(&[5]),(0,0));
	}
	#[test]
	fn balancing_reduces_gap()
	{
		let (mut fabric,mut routes,mut lanes) = assigned(&[4,4],8);
		let counts_before = lanes.route_counts().to_vec();
		//The greedy assignment loads the first lane.
		assert!(counts_before[0]>counts_before[7]);
		let mut rng = StdRng::seed_from_u64(3);
		let mut balancer = Balancer{ threshold:2, max_trials:100_000, rng:&mut rng };
		let report = balancer.balance(&mut fabric,&mut routes,&mut lanes).unwrap();
		lanes.verify().unwrap();
		let counts = lanes.route_counts();
		assert_eq!(counts.iter().sum::<usize>(),counts_before.iter().sum::<usize>());
		let gap = counts.iter().max().unwrap()-counts.iter().min().unwrap();
		if report.termination==BalanceTermination::Balanced
		{
			assert!(gap<2,"gap {} with counts {:?}",gap,counts);
		}
		assert!(report.moves>0);
		for route in routes.iter()
		{
			let lane = route.lane.unwrap();
			assert_eq!(fabric.switch(route.a).routing_table[route.b].lane,Some(lane));
			assert_eq!(fabric.switch(route.b).routing_table[route.a].lane,Some(lane));
		}
		for lane in 0..lanes.num_lanes()
		{
			assert_eq!(routes.iter().filter(|r|r.lane==Some(lane)).count(),counts[lane]);
		}
	}
	#[test]
	fn trial_cap_stops_balancing()
	{
		let (mut fabric,mut routes,mut lanes) = assigned(&[4,4],8);
		let mut rng = StdRng::seed_from_u64(3);
		let mut balancer = Balancer{ threshold:1, max_trials:3, rng:&mut rng };
		let report = balancer.balance(&mut fabric,&mut routes,&mut lanes).unwrap();
		assert!(report.trials<=3);
		assert_eq!(report.termination,BalanceTermination::IterationCap);
		lanes.verify().unwrap();
	}
	#[test]
	fn same_seed_same_moves()
	{
		let run = |seed:u64|{
			let (mut fabric,mut routes,mut lanes) = assigned(&[3,4],8);
			let mut rng = StdRng::seed_from_u64(seed);
			let mut balancer = Balancer{ threshold:1, max_trials:10_000, rng:&mut rng };
			let report = balancer.balance(&mut fabric,&mut routes,&mut lanes).unwrap();
			(report,routes.iter().map(|r|r.lane).collect::<Vec<_>>())
		};
		assert_eq!(run(11),run(11));
	}
	#[test]
	fn without_lanes_there_is_nothing_to_balance()
	{
		let mut fabric = Fabric::with_capacity(1).unwrap();
		fabric.create_switch(1,2).unwrap();
		let mut lanes = LaneSet::new(0).unwrap();
		let mut rng = StdRng::seed_from_u64(0);
		let mut balancer = Balancer{ threshold:6, max_trials:10, rng:&mut rng };
		let report = balancer.balance(&mut fabric,&mut [],&mut lanes).unwrap();
		assert_eq!(report,BalanceReport{ moves:0, trials:0, termination:BalanceTermination::Balanced });
	}
	#[test]
	fn gap_of_one_is_optimal()
	{
		let mut fabric = Fabric::from_topology(&Cartesian::torus(&[5])).unwrap();
		generate_routing_function(&mut fabric);
		let (all,_) = collect_routes(&fabric).unwrap();
		let short = all.iter().find(|r|r.forward.len()==1).unwrap().clone();
		let mut routes = vec![short;5];
		let mut lanes = LaneSet::new(2).unwrap();
		for (index,route) in routes.iter_mut().enumerate()
		{
			let lane = if index<3 { 0 } else { 1 };
			assert!(lanes.try_insert(route,lane).unwrap());
			route.lane = Some(lane);
		}
		let mut rng = StdRng::seed_from_u64(0);
		let mut balancer = Balancer{ threshold:1, max_trials:100, rng:&mut rng };
		let report = balancer.balance(&mut fabric,&mut routes,&mut lanes).unwrap();
		assert_eq!(report,BalanceReport{ moves:0, trials:0, termination:BalanceTermination::Optimal });
		assert_eq!(lanes.route_counts(),&[3,2]);
	}
	#[test]
	fn rejected_pair_is_retried_when_the_target_lane_changes()
	{
		//In a ring of 5 the five pairs at distance 2 close a cycle in a lane, any four of them do not.
		let mut fabric = Fabric::from_topology(&Cartesian::torus(&[5])).unwrap();
		generate_routing_function(&mut fabric);
		let (all,_) = collect_routes(&fabric).unwrap();
		let long : Vec<Route> = all.iter().filter(|r|r.forward.len()==2).cloned().collect();
		let short = all.iter().find(|r|r.forward.len()==1).unwrap().clone();
		assert_eq!(long.len(),5);
		for seed in 0..20
		{
			//Lane 0 holds copies of the last long pair and one short pair. Lane 1 holds the other long pairs and rejects those copies.
			let mut routes = vec![];
			let mut layout = vec![];
			for _ in 0..9
			{
				routes.push(long[4].clone());
				layout.push(0);
			}
			routes.push(short.clone());
			layout.push(0);
			for route in long[..4].iter()
			{
				routes.push(route.clone());
				layout.push(1);
			}
			for _ in 0..4
			{
				routes.push(short.clone());
				layout.push(2);
			}
			let mut lanes = LaneSet::new(3).unwrap();
			for (route,&lane) in routes.iter_mut().zip(layout.iter())
			{
				assert!(lanes.try_insert(route,lane).unwrap());
				route.lane = Some(lane);
			}
			assert_eq!(lanes.route_counts(),&[10,4,4]);
			let mut rng = StdRng::seed_from_u64(seed);
			let mut balancer = Balancer{ threshold:2, max_trials:1000, rng:&mut rng };
			let report = balancer.balance(&mut fabric.clone(),&mut routes,&mut lanes).unwrap();
			//Moving the short pair into lane 1 makes lane 2 the least loaded, and a copy rejected by lane 1 must then move into lane 2.
			assert_eq!(lanes.route_counts(),&[8,5,5],"seed {}",seed);
			assert_eq!(routes[..9].iter().filter(|r|r.lane==Some(2)).count(),1,"seed {}",seed);
			assert_eq!(routes[9].lane,Some(1));
			assert_eq!(report.moves,2);
			assert_eq!(report.termination,BalanceTermination::TrialsExhausted);
			lanes.verify().unwrap();
		}
	}
}
