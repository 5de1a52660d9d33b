use std::env;
use std::fs::File;
use std::io::{self,BufWriter,Write};
use std::process;

use getopts::Options;
use log::info;

use lash_routing::prelude::*;

fn print_usage(program:&str, opts:&Options)
{
	let brief = format!("Usage: {} [options]\nCompute LASH routing for a fabric and write its forwarding tables.", program);
	print!("{}", opts.usage(&brief));
}

///Split a configuration file into the `Lash` object and the optional topology it embeds.
fn split_config(cv:ConfigurationValue) -> Result<(ConfigurationValue,Option<ConfigurationValue>),Error>
{
	match cv
	{
		ConfigurationValue::Object(name,pairs) =>
		{
			let (topology,rest) : (Vec<_>,Vec<_>) = pairs.into_iter().partition(|(key,_)|key=="topology");
			Ok((ConfigurationValue::Object(name,rest),topology.into_iter().next().map(|(_,value)|value)))
		},
		_ => Err(lash_routing::error!(configuration_error).with_message("the configuration file must be a table".to_string())),
	}
}

fn parse_number<T:std::str::FromStr>(option:&str, text:&str) -> Result<T,Error>
{
	text.parse::<T>().map_err(|_|lash_routing::error!(configuration_error).with_message(format!("option --{} expects a number, not {}",option,text)))
}

fn write_outcome(output:&mut dyn Write, outcome:&LashOutcome) -> io::Result<()>
{
	let statistics = outcome.statistics();
	writeln!(output,"# LASH routing computed on {}",chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
	writeln!(output,"# switches {} routed pairs {} unreachable pairs {}",statistics.switches,statistics.routed_pairs,statistics.unreachable_pairs)?;
	writeln!(output,"# lane budget {} lanes used {} routes per lane {:?}",statistics.lane_budget,statistics.lanes_used,statistics.routes_per_lane)?;
	writeln!(output,"# balancing {:?} after {} moves in {} trials",statistics.balance_termination,statistics.balance_moves,statistics.balance_trials)?;
	for (switch_id,table) in outcome.forwarding_tables().iter()
	{
		writeln!(output,"SWITCH {}",switch_id)?;
		for (address,port) in table.iter()
		{
			writeln!(output,"\t{} {}",address,port)?;
		}
	}
	for (a,b,_lane) in outcome.pair_lanes()
	{
		writeln!(output,"SL {} {} {}",a,b,outcome.service_level(a,b))?;
	}
	output.flush()
}

fn run(args:&[String]) -> Result<(),Error>
{
	let program = args[0].clone();
	let mut opts = Options::new();
	opts.optopt("t","topology","adjacency file of the fabric","FILE");
	opts.optopt("c","config","TOML file with the Lash configuration, possibly with a topology table","FILE");
	opts.optopt("s","seed","seed of the lane balancing","SEED");
	opts.optopt("l","lanes","maximum number of lanes to use","LANES");
	opts.optflag("","no-balance","do not balance the lanes");
	opts.optopt("o","output","write the tables to FILE instead of the standard output","FILE");
	opts.optflag("h","help","print this help menu");
	let matches = opts.parse(&args[1..]).map_err(|f|lash_routing::error!(configuration_error).with_message(f.to_string()))?;
	if matches.opt_present("h")
	{
		print_usage(&program,&opts);
		return Ok(());
	}
	let (lash_cv,topology_cv) = match matches.opt_str("c")
	{
		Some(path) => split_config(ConfigurationValue::load(path)?)?,
		None => (ConfigurationValue::Object("Lash".to_string(),vec![]),None),
	};
	let mut config = LashConfig::new(&lash_cv)?;
	if let Some(seed) = matches.opt_str("s")
	{
		config.seed = parse_number("seed",&seed)?;
	}
	if let Some(lanes) = matches.opt_str("l")
	{
		config.lanes = Some(parse_number("lanes",&lanes)?);
	}
	if matches.opt_present("no-balance")
	{
		config.balance = false;
	}
	let topology : Box<dyn Topology> = match (matches.opt_str("t"),topology_cv)
	{
		(Some(path),_) => Box::new(NeighboursLists::load(path)?),
		(None,Some(cv)) => new_topology(&cv)?,
		(None,None) =>
		{
			print_usage(&program,&opts);
			return Err(lash_routing::error!(configuration_error).with_message("no topology given".to_string()));
		},
	};
	info!("computing LASH with {:?}",config);
	let outcome = Lash::new(config).run(topology.as_ref())?;
	let written = match matches.opt_str("o")
	{
		Some(path) =>
		{
			let file = File::create(&path).map_err(|e|lash_routing::error!(io,e).with_message(format!("cannot create {}: {}",path,e)))?;
			write_outcome(&mut BufWriter::new(file),&outcome)
		},
		None => write_outcome(&mut io::stdout().lock(),&outcome),
	};
	written.map_err(|e|lash_routing::error!(io,e))
}

fn main()
{
	env_logger::init();
	let args: Vec<String> = env::args().collect();
	if let Err(error) = run(&args)
	{
		eprintln!("lash: {}",error);
		process::exit(1);
	}
}
