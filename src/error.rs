/*!

Errors raised while computing the routing tables.

Errors are built with the [error](crate::error!) macro, which records where they were raised.

```ignore
return Err(error!(insufficient_lanes,budget).with_message(format!("pair ({},{}) cannot be routed",a,b)));
```

*/

use std::fmt::{Display,Formatter};

///Place in the source where an error was raised.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct SourceLocation
{
	pub file: &'static str,
	pub line: u32,
	pub column: u32,
}

impl Display for SourceLocation
{
	fn fmt(&self, formatter:&mut Formatter) -> std::fmt::Result
	{
		write!(formatter,"{}:{}:{}",self.file,self.line,self.column)
	}
}

#[derive(Debug,Clone,PartialEq,Eq)]
pub enum ErrorKind
{
	///Some per-run structure could not be reserved.
	AllocationFailure,
	///Some switch pair produced a cycle in every lane of the budget.
	InsufficientLanes{
		lanes: usize,
	},
	///Some internal counter got out of sync. This is a bug in the library.
	InternalInvariantViolation,
	///A configuration value was missing or out of range.
	ConfigurationError,
	///The topology references switches or ports that do not exist, or its links do not return.
	TopologyError,
	///Could not read some input file.
	Io,
}

#[derive(Debug,Clone)]
pub struct Error
{
	pub source_location: SourceLocation,
	pub kind: ErrorKind,
	pub message: Option<String>,
}

impl Error
{
	pub fn new(source_location:SourceLocation, kind:ErrorKind) -> Error
	{
		Error{
			source_location,
			kind,
			message: None,
		}
	}
	pub fn with_message(mut self, message:String) -> Error
	{
		self.message = Some(message);
		self
	}
	///Whether the caller should fall back to another routing engine.
	pub fn is_insufficient_lanes(&self) -> bool
	{
		matches!(self.kind,ErrorKind::InsufficientLanes{..})
	}
}

impl Display for ErrorKind
{
	fn fmt(&self, formatter:&mut Formatter) -> std::fmt::Result
	{
		match self
		{
			ErrorKind::AllocationFailure => write!(formatter,"allocation failure"),
			ErrorKind::InsufficientLanes{lanes} => write!(formatter,"insufficient lanes (budget of {})",lanes),
			ErrorKind::InternalInvariantViolation => write!(formatter,"internal invariant violation"),
			ErrorKind::ConfigurationError => write!(formatter,"configuration error"),
			ErrorKind::TopologyError => write!(formatter,"topology error"),
			ErrorKind::Io => write!(formatter,"input/output error"),
		}
	}
}

impl Display for Error
{
	fn fmt(&self, formatter:&mut Formatter) -> std::fmt::Result
	{
		write!(formatter,"{} at {}",self.kind,self.source_location)?;
		if let Some(message) = &self.message
		{
			write!(formatter,": {}",message)?;
		}
		Ok(())
	}
}

impl std::error::Error for Error {}

impl From<std::collections::TryReserveError> for Error
{
	fn from(err:std::collections::TryReserveError) -> Error
	{
		crate::error!(allocation_failure).with_message(format!("{}",err))
	}
}

#[macro_export]
macro_rules! source_location
{
	() => {
		$crate::error::SourceLocation{
			file: file!(),
			line: line!(),
			column: column!(),
		}
	};
}

///Build an [Error] with the location of the call.
#[macro_export]
macro_rules! error
{
	(allocation_failure) => {
		$crate::error::Error::new($crate::source_location!(),$crate::error::ErrorKind::AllocationFailure)
	};
	(insufficient_lanes,$lanes:expr) => {
		$crate::error::Error::new($crate::source_location!(),$crate::error::ErrorKind::InsufficientLanes{lanes:$lanes})
	};
	(internal_invariant_violation) => {
		$crate::error::Error::new($crate::source_location!(),$crate::error::ErrorKind::InternalInvariantViolation)
	};
	(configuration_error) => {
		$crate::error::Error::new($crate::source_location!(),$crate::error::ErrorKind::ConfigurationError)
	};
	(topology_error) => {
		$crate::error::Error::new($crate::source_location!(),$crate::error::ErrorKind::TopologyError)
	};
	(io,$err:expr) => {
		$crate::error::Error::new($crate::source_location!(),$crate::error::ErrorKind::Io).with_message(format!("{}",$err))
	};
}
