use super::build::ConfigurationError;
use super::types::{HandlerDescriptor, RouteMetadata};
use anyhow::Context;
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Route declarations read from a YAML or JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteFile {
    #[serde(default)]
    pub routes: Vec<RouteDeclaration>,
}

/// One declaration in a [`RouteFile`], attached to the handler it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDeclaration {
    #[serde(default)]
    pub name: Option<String>,
    pub path: String,
    pub handler: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub requirements: BTreeMap<String, String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl RouteDeclaration {
    /// Convert into route metadata, validating the method list.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidMethod`] if a method is not a valid token.
    pub fn to_metadata(&self) -> Result<RouteMetadata, ConfigurationError> {
        let methods = self
            .methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| {
                    ConfigurationError::InvalidMethod {
                        handler: self.handler.clone(),
                        method: m.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouteMetadata {
            pattern: self.path.clone(),
            name: self.name.clone(),
            requirements: self.requirements.clone(),
            defaults: self.defaults.clone(),
            methods,
        })
    }
}

impl RouteFile {
    /// One descriptor per handler named in the file, in first-mention order,
    /// with no declared parameters. Used when only the table is needed.
    ///
    /// # Errors
    ///
    /// Propagates [`RouteDeclaration::to_metadata`] failures.
    pub fn into_descriptors(self) -> Result<Vec<HandlerDescriptor>, ConfigurationError> {
        let mut descriptors: Vec<HandlerDescriptor> = Vec::new();
        for decl in &self.routes {
            if !descriptors.iter().any(|d| d.id == decl.handler) {
                descriptors.push(HandlerDescriptor::new(decl.handler.as_str()));
            }
        }
        apply_route_file(&mut descriptors, &self)?;
        Ok(descriptors)
    }
}

/// Parse route declarations from a string. `yaml` selects YAML over JSON.
///
/// # Errors
///
/// Returns an error if the content does not deserialize into a [`RouteFile`].
pub fn parse_route_file(content: &str, yaml: bool) -> anyhow::Result<RouteFile> {
    let file: RouteFile = if yaml {
        serde_yaml::from_str(content).context("invalid YAML route file")?
    } else {
        serde_json::from_str(content).context("invalid JSON route file")?
    };
    Ok(file)
}

/// Load route declarations from disk, choosing the format by extension
/// (`.yaml`/`.yml` for YAML, anything else for JSON).
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_route_file(file_path: impl AsRef<Path>) -> anyhow::Result<RouteFile> {
    let file_path = file_path.as_ref();
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read route file {}", file_path.display()))?;
    let yaml = matches!(
        file_path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let file = parse_route_file(&content, yaml)?;
    tracing::info!(
        path = %file_path.display(),
        declarations = file.routes.len(),
        "Route file loaded"
    );
    Ok(file)
}

/// Attach each declaration in `file` to the descriptor it names.
///
/// Declarations are appended after any routes the descriptor already
/// carries, in file order.
///
/// # Errors
///
/// [`ConfigurationError::UnknownHandler`] for a declaration naming no
/// descriptor, [`ConfigurationError::InvalidMethod`] for a bad method.
pub fn apply_route_file(
    descriptors: &mut [HandlerDescriptor],
    file: &RouteFile,
) -> Result<(), ConfigurationError> {
    for decl in &file.routes {
        let meta = decl.to_metadata()?;
        let descriptor = descriptors
            .iter_mut()
            .find(|d| d.id == decl.handler)
            .ok_or_else(|| ConfigurationError::UnknownHandler {
                handler: decl.handler.clone(),
            })?;
        descriptor.routes.push(meta);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
routes:
  - name: post_show
    path: /posts/{id}
    handler: show_post
    methods: [get, HEAD]
    requirements: { id: '\d+' }
  - path: /posts/{id}/edit
    handler: edit_post
    defaults: { _format: html }
"#;

    #[test]
    fn test_parse_yaml() {
        let file = parse_route_file(YAML, true).unwrap();
        assert_eq!(file.routes.len(), 2);
        let meta = file.routes[0].to_metadata().unwrap();
        assert_eq!(meta.methods, vec![Method::GET, Method::HEAD]);
        assert_eq!(meta.requirements.get("id").map(String::as_str), Some(r"\d+"));
        assert_eq!(file.routes[1].name, None);
    }

    #[test]
    fn test_parse_json() {
        let file = parse_route_file(
            r#"{"routes":[{"path":"/","handler":"home","name":"home"}]}"#,
            false,
        )
        .unwrap();
        assert_eq!(file.routes[0].handler, "home");
    }

    #[test]
    fn test_apply_unknown_handler() {
        let file = parse_route_file(YAML, true).unwrap();
        let mut descriptors = vec![HandlerDescriptor::new("show_post")];
        assert_eq!(
            apply_route_file(&mut descriptors, &file),
            Err(ConfigurationError::UnknownHandler {
                handler: "edit_post".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_method() {
        let decl = RouteDeclaration {
            name: None,
            path: "/".to_string(),
            handler: "h".to_string(),
            methods: vec!["GE T".to_string()],
            requirements: BTreeMap::new(),
            defaults: BTreeMap::new(),
        };
        assert!(matches!(
            decl.to_metadata(),
            Err(ConfigurationError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn test_into_descriptors() {
        let descriptors = parse_route_file(YAML, true).unwrap().into_descriptors().unwrap();
        let ids: Vec<&str> = descriptors.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["show_post", "edit_post"]);
        assert_eq!(descriptors[0].routes.len(), 1);
    }
}
