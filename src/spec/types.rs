use crate::router::PathMatcher;
use http::Method;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Declared type of a handler parameter.
///
/// Primitive variants are coerced from the raw path-variable string. `Entity`
/// names an entity type whose records are loaded through a registered
/// [`Converter`](crate::resolver::Converter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Str,
    Int,
    UInt,
    Float,
    Bool,
    Entity(String),
}

impl ParamType {
    pub fn is_entity(&self) -> bool {
        matches!(self, ParamType::Entity(_))
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Str => write!(f, "string"),
            ParamType::Int => write!(f, "integer"),
            ParamType::UInt => write!(f, "unsigned integer"),
            ParamType::Float => write!(f, "float"),
            ParamType::Bool => write!(f, "boolean"),
            ParamType::Entity(name) => write!(f, "entity {}", name),
        }
    }
}

/// One handler argument, as derived from the handler signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub declared_type: ParamType,
    /// Variable the value is read from.
    ///
    /// `None` means the parameter name for primitives and the converter's
    /// identifying attribute for entities. An explicit value on an entity
    /// parameter forces conversion from that variable.
    pub source_variable: Option<String>,
}

impl ParameterSpec {
    pub fn primitive(name: impl Into<String>, declared_type: ParamType) -> Self {
        ParameterSpec {
            name: name.into(),
            declared_type,
            source_variable: None,
        }
    }

    pub fn entity(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        ParameterSpec {
            name: name.into(),
            declared_type: ParamType::Entity(entity_type.into()),
            source_variable: None,
        }
    }

    /// Read the value from `variable` instead of the conventional source.
    #[must_use]
    pub fn mapped_from(mut self, variable: impl Into<String>) -> Self {
        self.source_variable = Some(variable.into());
        self
    }
}

/// Routing metadata attached to a handler declaration.
///
/// This is the plain-data form of a route annotation: a path pattern with
/// `{variable}` placeholders, an optional name used for reverse lookup,
/// per-variable regex requirements, default values and allowed methods.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteMetadata {
    pub pattern: String,
    pub name: Option<String>,
    pub requirements: BTreeMap<String, String>,
    pub defaults: BTreeMap<String, String>,
    /// Allowed methods; empty allows any method.
    pub methods: Vec<Method>,
}

impl RouteMetadata {
    pub fn new(pattern: impl Into<String>) -> Self {
        RouteMetadata {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn requirement(mut self, variable: impl Into<String>, regex: impl Into<String>) -> Self {
        self.requirements.insert(variable.into(), regex.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, variable: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(variable.into(), value.into());
        self
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }
}

/// A handler as seen by the extractor: identifier, attached routes and
/// declared parameters. A descriptor with no routes is not routable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub id: String,
    pub routes: Vec<RouteMetadata>,
    pub parameters: Vec<ParameterSpec>,
}

impl HandlerDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        HandlerDescriptor {
            id: id.into(),
            routes: Vec::new(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn route(mut self, route: RouteMetadata) -> Self {
        self.routes.push(route);
        self
    }

    #[must_use]
    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.parameters.push(param);
        self
    }
}

/// Normalized, immutable route produced by extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub pattern: String,
    pub name: Option<String>,
    pub requirements: BTreeMap<String, String>,
    pub defaults: BTreeMap<String, String>,
    pub methods: Vec<Method>,
    pub handler_name: Arc<str>,
    pub parameters: Arc<[ParameterSpec]>,
    /// Placeholder names in pattern order.
    pub variables: Vec<Arc<str>>,
}

impl RouteDefinition {
    /// Whether `method` is accepted by this route.
    #[inline]
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    /// Human-readable method list, `ANY` when unrestricted.
    pub fn methods_label(&self) -> String {
        if self.methods.is_empty() {
            return "ANY".to_string();
        }
        self.methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// A route definition paired with its compiled path matcher.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub definition: Arc<RouteDefinition>,
    pub matcher: PathMatcher,
}

/// Ordered route table. Declaration order is match precedence.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
    by_name: HashMap<String, usize>,
}

impl RouteTable {
    pub(crate) fn new(routes: Vec<CompiledRoute>, by_name: HashMap<String, usize>) -> Self {
        RouteTable { routes, by_name }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRoute> {
        self.routes.iter()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.routes.iter().map(|r| &r.definition)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Look up a route by its explicit name.
    pub fn get(&self, name: &str) -> Option<&CompiledRoute> {
        self.by_name.get(name).and_then(|&idx| self.routes.get(idx))
    }
}
