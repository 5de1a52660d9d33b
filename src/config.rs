/*!

Configuration values.

Every configurable element of the crate is built from a [ConfigurationValue::Object], whose name selects the kind of element and
whose pairs are its fields. For example a LASH run capped to 4 lanes is described by

```ignore
Lash{
	lanes: 4,
	balance_threshold: 2,
	seed: 7,
}
```

Configuration files are written in TOML. A table with a `kind` entry becomes an object of that name, so the example above reads

```toml
kind = "Lash"
lanes = 4
balance_threshold = 2
seed = 7
```

*/

use std::fs;
use std::path::Path;

use crate::error::Error;

#[derive(Debug,Clone,PartialEq)]
pub enum ConfigurationValue
{
	Literal(String),
	Number(f64),
	Object(String,Vec<(String,ConfigurationValue)>),
	Array(Vec<ConfigurationValue>),
	True,
	False,
}

impl ConfigurationValue
{
	pub fn as_bool(&self) -> Result<bool,Error>
	{
		match self
		{
			&ConfigurationValue::True => Ok(true),
			&ConfigurationValue::False => Ok(false),
			_ => Err(crate::error!(configuration_error).with_message(format!("expected a bool, got {:?}",self))),
		}
	}
	pub fn as_f64(&self) -> Result<f64,Error>
	{
		match self
		{
			&ConfigurationValue::Number(x) => Ok(x),
			_ => Err(crate::error!(configuration_error).with_message(format!("expected a number, got {:?}",self))),
		}
	}
	pub fn as_usize(&self) -> Result<usize,Error>
	{
		match self
		{
			&ConfigurationValue::Number(x) if x>=0.0 && x.fract()==0.0 => Ok(x as usize),
			_ => Err(crate::error!(configuration_error).with_message(format!("expected a non-negative integer, got {:?}",self))),
		}
	}
	pub fn as_str(&self) -> Result<&str,Error>
	{
		match self
		{
			&ConfigurationValue::Literal(ref s) => Ok(s.as_str()),
			_ => Err(crate::error!(configuration_error).with_message(format!("expected a literal, got {:?}",self))),
		}
	}
	pub fn as_array(&self) -> Result<&Vec<ConfigurationValue>,Error>
	{
		match self
		{
			&ConfigurationValue::Array(ref a) => Ok(a),
			_ => Err(crate::error!(configuration_error).with_message(format!("expected an array, got {:?}",self))),
		}
	}
	///Build from a TOML value. Tables need a `kind` entry to be named.
	pub fn from_toml(value:&toml::Value) -> Result<ConfigurationValue,Error>
	{
		Ok(match value
		{
			toml::Value::String(s) => ConfigurationValue::Literal(s.clone()),
			toml::Value::Integer(x) => ConfigurationValue::Number(*x as f64),
			toml::Value::Float(x) => ConfigurationValue::Number(*x),
			toml::Value::Boolean(true) => ConfigurationValue::True,
			toml::Value::Boolean(false) => ConfigurationValue::False,
			toml::Value::Datetime(d) => ConfigurationValue::Literal(d.to_string()),
			toml::Value::Array(a) => ConfigurationValue::Array(a.iter().map(ConfigurationValue::from_toml).collect::<Result<_,_>>()?),
			toml::Value::Table(table) =>
			{
				let name = match table.get("kind")
				{
					Some(toml::Value::String(kind)) => kind.clone(),
					Some(other) => return Err(crate::error!(configuration_error).with_message(format!("the kind of a table must be a string, not {}",other))),
					None => return Err(crate::error!(configuration_error).with_message(format!("table without kind: {}",value))),
				};
				let mut pairs = Vec::with_capacity(table.len());
				for (key,inner) in table.iter()
				{
					if key!="kind"
					{
						pairs.push( (key.clone(),ConfigurationValue::from_toml(inner)?) );
					}
				}
				ConfigurationValue::Object(name,pairs)
			}
		})
	}
	pub fn parse_toml(text:&str) -> Result<ConfigurationValue,Error>
	{
		let table : toml::Table = toml::from_str(text).map_err(|e|crate::error!(configuration_error).with_message(format!("cannot parse toml: {}",e)))?;
		ConfigurationValue::from_toml(&toml::Value::Table(table))
	}
	pub fn load<P:AsRef<Path>>(path:P) -> Result<ConfigurationValue,Error>
	{
		let text = fs::read_to_string(path.as_ref()).map_err(|e|crate::error!(io,e).with_message(format!("cannot read {}: {}",path.as_ref().display(),e)))?;
		ConfigurationValue::parse_toml(&text)
	}
}

/**
Iterate over the fields of an object, running the arm of the matching key.
Must be used inside a function returning `Result<_,Error>`. Unknown fields, non-objects and objects of other name are configuration errors.
```ignore
match_object!(cv,"Lash",value,
	"lanes" => lanes=Some(value.as_usize()?),
);
```
**/
#[macro_export]
macro_rules! match_object
{
	($cv:expr, $name:expr, $valueid:ident, $($key:expr => $arm:expr),* $(,)?) => {{
		if let &$crate::config::ConfigurationValue::Object(ref cv_name, ref cv_pairs)=$cv
		{
			if cv_name!=$name
			{
				return Err($crate::error!(configuration_error).with_message(format!("A {} must be created from a `{}` object not `{}`",$name,$name,cv_name)));
			}
			for &(ref name,ref $valueid) in cv_pairs
			{
				match name.as_str()
				{
					$( $key => $arm, )*
					"legend_name" => (),
					_ => return Err($crate::error!(configuration_error).with_message(format!("Nothing to do with field {} in {}",name,$name))),
				}
			}
		}
		else
		{
			return Err($crate::error!(configuration_error).with_message(format!("Trying to create a {} from a non-Object",$name)));
		}
	}};
}
