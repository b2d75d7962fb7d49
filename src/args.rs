//! Typed arguments read from a URL query string.
//!
//! Every declared argument always ends up in the result: values that are missing, fail to coerce to the
//! declared type, or fall outside the declared choices are replaced by the default.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::Serialize;
use url::{Url, form_urlencoded};

/// Type an argument's raw query value is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Int,
    Float,
}

/// A parsed argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    String(String),
    Int(i64),
    Float(f64),
}

impl ArgValue {
    pub fn arg_type(&self) -> ArgType {
        match self {
            ArgValue::String(_) => ArgType::String,
            ArgValue::Int(_) => ArgType::Int,
            ArgValue::Float(_) => ArgType::Float,
        }
    }

    /// Coerce a raw query value, `None` if it does not parse as the requested type.
    fn coerce(raw: &str, ty: ArgType) -> Option<Self> {
        match ty {
            ArgType::String => Some(ArgValue::String(raw.to_string())),
            ArgType::Int => raw.trim().parse().ok().map(ArgValue::Int),
            ArgType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ArgValue::Float),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::String(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::String(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(value.into())
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

#[derive(Debug, Clone)]
struct Argument {
    name: String,
    default: ArgValue,
    ty: ArgType,
    choices: Option<Vec<ArgValue>>,
}

/// Declares arguments, then extracts them from a query string.
///
/// ```
/// use beatsocket::{ArgType, ArgumentParser};
///
/// let mut parser = ArgumentParser::new();
/// parser.add_argument("x", 5, ArgType::Int, None);
/// parser.add_argument("mode", "a", ArgType::String, Some(vec!["a".into(), "b".into()]));
///
/// let args = parser.parse_query("?x=7&mode=z");
/// assert_eq!(args.get_int("x"), Some(7));
/// assert_eq!(args.get_str("mode"), Some("a"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArgumentParser {
    arguments: Vec<Argument>,
}

impl ArgumentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an argument. Declaring a name twice keeps the last declaration.
    pub fn add_argument(
        &mut self,
        name: &str,
        default: impl Into<ArgValue>,
        ty: ArgType,
        choices: Option<Vec<ArgValue>>,
    ) -> &mut Self {
        self.arguments.retain(|arg| arg.name != name);
        self.arguments.push(Argument {
            name: name.to_string(),
            default: default.into(),
            ty,
            choices,
        });
        self
    }

    /// Extract the declared arguments from the query string of a URL.
    pub fn parse_url(&self, url: &Url) -> Args {
        self.parse_query(url.query().unwrap_or_default())
    }

    /// Extract the declared arguments from a raw query string, with or without its leading `?`.
    pub fn parse_query(&self, query: &str) -> Args {
        let params = query_params(query);

        let values = self
            .arguments
            .iter()
            .map(|arg| {
                let value = params
                    .get(arg.name.as_str())
                    .and_then(|raw| match ArgValue::coerce(raw, arg.ty) {
                        Some(value) => Some(value),
                        None => {
                            debug!("Argument {}={:?} is not a valid {:?}, using default", arg.name, raw, arg.ty);
                            None
                        }
                    })
                    .filter(|value| match &arg.choices {
                        Some(choices) if !choices.contains(value) => {
                            debug!("Argument {}={:?} is not an allowed choice, using default", arg.name, value);
                            false
                        }
                        _ => true,
                    })
                    .unwrap_or_else(|| arg.default.clone());

                (arg.name.clone(), value)
            })
            .collect();

        let args = Args { values };
        debug!("Parsed args: {}", serde_json::to_string(&args).unwrap_or_default());
        args
    }
}

/// Extract arguments whose types are inferred from their defaults.
///
/// Strings stay strings, integer defaults parse as integers and float defaults as floats.
pub fn parse_defaults<'a, I, V>(defaults: I, query: &str) -> Args
where
    I: IntoIterator<Item = (&'a str, V)>,
    V: Into<ArgValue>,
{
    let mut parser = ArgumentParser::new();
    for (name, default) in defaults {
        let default = default.into();
        let ty = default.arg_type();
        parser.add_argument(name, default, ty, None);
    }
    parser.parse_query(query)
}

/// Query parameters, keeping the first value of repeated keys.
fn query_params(query: &str) -> HashMap<String, String> {
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut params = HashMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    params
}

/// Fully populated arguments, one value per declared name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Args {
    values: BTreeMap<String, ArgValue>,
}

impl Args {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ArgValue::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(ArgValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Float value of an argument, integers are widened.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(ArgValue::Float(value)) => Some(*value),
            Some(ArgValue::Int(value)) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}
