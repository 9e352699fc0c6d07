use crate::router::ParamVec;
use crate::spec::{ParamType, ParameterSpec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Identifying attribute assumed when a converter does not name its own.
pub const DEFAULT_IDENTIFIER: &str = "id";

/// A domain record loaded by a [`Converter`].
///
/// The resolver only holds it for the duration of one request; the handler
/// reads it as JSON or deserializes it into its own type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    entity: String,
    id: String,
    data: Value,
}

impl EntityRecord {
    pub fn new(entity: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        EntityRecord {
            entity: entity.into(),
            id: id.into(),
            data,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    /// Deserialize the record into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the shapes do not line up.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Pluggable lookup of entity records by identifier.
///
/// `Ok(None)` means "no such record" and turns the request into a not-found
/// outcome. `Err` is reserved for store failures.
pub trait Converter: Send + Sync {
    /// Name of the entity's identifying attribute. A path variable with this
    /// name is converted by convention.
    fn identifier(&self) -> &str {
        DEFAULT_IDENTIFIER
    }

    fn convert(&self, entity: &str, id: &str) -> anyhow::Result<Option<EntityRecord>>;
}

impl<F> Converter for F
where
    F: Fn(&str, &str) -> anyhow::Result<Option<EntityRecord>> + Send + Sync,
{
    fn convert(&self, entity: &str, id: &str) -> anyhow::Result<Option<EntityRecord>> {
        self(entity, id)
    }
}

/// Converters keyed by entity type.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn Converter>>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entities: Vec<&String> = self.converters.keys().collect();
        entities.sort();
        f.debug_struct("ConverterRegistry")
            .field("entities", &entities)
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `converter` for `entity`, replacing any previous one.
    pub fn register(&mut self, entity: impl Into<String>, converter: Arc<dyn Converter>) {
        let entity = entity.into();
        if self.converters.insert(entity.clone(), converter).is_some() {
            warn!(entity = %entity, "Replaced existing converter");
        }
    }

    pub fn get(&self, entity: &str) -> Option<&Arc<dyn Converter>> {
        self.converters.get(entity)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.converters.contains_key(entity)
    }
}

/// A handler argument after resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BoundValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Entity(EntityRecord),
    /// Entity parameter whose lookup was skipped because no variable named
    /// the identifying attribute; carries the variable named like the
    /// parameter, if the route bound one.
    Unresolved(Option<String>),
}

impl BoundValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BoundValue::Str(s) => Some(s),
            BoundValue::Unresolved(raw) => raw.as_deref(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BoundValue::Int(v) => Some(*v),
            BoundValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            BoundValue::UInt(v) => Some(*v),
            BoundValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BoundValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BoundValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRecord> {
        match self {
            BoundValue::Entity(record) => Some(record),
            _ => None,
        }
    }
}

/// Per-request failure while building a handler's arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A raw value could not be coerced to the declared primitive type
    Coercion {
        parameter: String,
        variable: String,
        value: String,
        expected: String,
    },
    /// The variable a parameter reads from was not bound
    MissingVariable { parameter: String, variable: String },
    /// A typed request view rejected the arguments
    Rejected { handler: String, message: String },
    /// The converter found no record for the identifier
    EntityNotFound {
        parameter: String,
        entity: String,
        id: String,
    },
    /// The converter itself failed
    Converter {
        parameter: String,
        entity: String,
        message: String,
    },
    /// No converter is registered for the entity type
    MissingConverter { parameter: String, entity: String },
}

impl ResolveError {
    /// Whether this is a client-side binding failure (bad request).
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            ResolveError::Coercion { .. }
                | ResolveError::MissingVariable { .. }
                | ResolveError::Rejected { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::EntityNotFound { .. })
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Coercion {
                parameter,
                variable,
                value,
                expected,
            } => write!(
                f,
                "parameter '{}': value '{}' of '{}' is not a valid {}",
                parameter, value, variable, expected
            ),
            ResolveError::MissingVariable {
                parameter,
                variable,
            } => write!(
                f,
                "parameter '{}': variable '{}' is not bound",
                parameter, variable
            ),
            ResolveError::Rejected { handler, message } => {
                write!(f, "request rejected by '{}': {}", handler, message)
            }
            ResolveError::EntityNotFound {
                parameter,
                entity,
                id,
            } => write!(
                f,
                "{} with identifier '{}' not found (parameter '{}')",
                entity, id, parameter
            ),
            ResolveError::Converter {
                parameter,
                entity,
                message,
            } => write!(
                f,
                "loading {} for parameter '{}' failed: {}",
                entity, parameter, message
            ),
            ResolveError::MissingConverter { parameter, entity } => write!(
                f,
                "no converter registered for {} (parameter '{}')",
                entity, parameter
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

fn lookup<'a>(bindings: &'a ParamVec, name: &str) -> Option<&'a str> {
    bindings
        .iter()
        .rfind(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.as_str())
}

fn coerce(spec: &ParameterSpec, variable: &str, raw: &str) -> Result<BoundValue, ResolveError> {
    let fail = || ResolveError::Coercion {
        parameter: spec.name.clone(),
        variable: variable.to_string(),
        value: raw.to_string(),
        expected: spec.declared_type.to_string(),
    };
    match &spec.declared_type {
        ParamType::Str => Ok(BoundValue::Str(raw.to_string())),
        ParamType::Int => raw.parse().map(BoundValue::Int).map_err(|_| fail()),
        ParamType::UInt => raw.parse().map(BoundValue::UInt).map_err(|_| fail()),
        ParamType::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(BoundValue::Float)
            .ok_or_else(fail),
        ParamType::Bool => match raw {
            "true" | "1" => Ok(BoundValue::Bool(true)),
            "false" | "0" => Ok(BoundValue::Bool(false)),
            _ => Err(fail()),
        },
        // entity parameters never reach coercion
        ParamType::Entity(_) => Err(fail()),
    }
}

fn resolve_entity(
    spec: &ParameterSpec,
    entity: &str,
    bindings: &ParamVec,
    converters: &ConverterRegistry,
) -> Result<BoundValue, ResolveError> {
    let converter = converters
        .get(entity)
        .ok_or_else(|| ResolveError::MissingConverter {
            parameter: spec.name.clone(),
            entity: entity.to_string(),
        })?;

    let (variable, id) = match spec.source_variable.as_deref() {
        Some(mapped) => {
            let id = lookup(bindings, mapped).ok_or_else(|| ResolveError::MissingVariable {
                parameter: spec.name.clone(),
                variable: mapped.to_string(),
            })?;
            (mapped, id)
        }
        None => match lookup(bindings, converter.identifier()) {
            Some(id) => (converter.identifier(), id),
            None => {
                debug!(
                    parameter = %spec.name,
                    entity = %entity,
                    identifier = %converter.identifier(),
                    "No identifier variable bound, passing through unresolved"
                );
                return Ok(BoundValue::Unresolved(
                    lookup(bindings, &spec.name).map(str::to_string),
                ));
            }
        },
    };

    match converter.convert(entity, id) {
        Ok(Some(record)) => {
            debug!(parameter = %spec.name, entity = %entity, variable = %variable, id = %id, "Entity resolved");
            Ok(BoundValue::Entity(record))
        }
        Ok(None) => Err(ResolveError::EntityNotFound {
            parameter: spec.name.clone(),
            entity: entity.to_string(),
            id: id.to_string(),
        }),
        Err(err) => Err(ResolveError::Converter {
            parameter: spec.name.clone(),
            entity: entity.to_string(),
            message: format!("{err:#}"),
        }),
    }
}

/// Bind every declared parameter of a matched route.
///
/// Primitive parameters read their source variable from `bindings`, falling
/// back to the raw request parameters in `query`. Entity parameters go
/// through the converter registered for their type.
///
/// # Errors
///
/// The first [`ResolveError`] encountered, in parameter order.
pub fn resolve_parameters(
    parameters: &[ParameterSpec],
    bindings: &ParamVec,
    query: &ParamVec,
    converters: &ConverterRegistry,
) -> Result<Vec<(String, BoundValue)>, ResolveError> {
    let mut values = Vec::with_capacity(parameters.len());
    for spec in parameters {
        let value = match &spec.declared_type {
            ParamType::Entity(entity) => resolve_entity(spec, entity, bindings, converters)?,
            _ => {
                let variable = spec.source_variable.as_deref().unwrap_or(&spec.name);
                let raw = lookup(bindings, variable)
                    .or_else(|| lookup(query, variable))
                    .ok_or_else(|| ResolveError::MissingVariable {
                        parameter: spec.name.clone(),
                        variable: variable.to_string(),
                    })?;
                coerce(spec, variable, raw)?
            }
        };
        values.push((spec.name.clone(), value));
    }
    Ok(values)
}
