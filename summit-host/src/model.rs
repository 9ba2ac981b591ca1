//! Application model

use crate::error::{HostError, Result};
use crate::graph::ResourceDependencyGraph;
use crate::resource::{EnvironmentEdit, Resource};
use std::collections::{BTreeMap, HashSet};

/// Collects resources before the model is validated
#[derive(Debug, Default)]
pub struct AppModelBuilder {
    resources: Vec<Resource>,
}

impl AppModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resource: Resource) -> &mut Self {
        self.resources.push(resource);
        self
    }

    pub fn with(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Validate names, references and waits, then freeze the model
    pub fn build(self) -> Result<AppModel> {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.name()) {
                return Err(HostError::DuplicateResource(resource.name().to_string()));
            }
        }

        for resource in &self.resources {
            if let Some(missing) = resource.references().iter().find(|r| !seen.contains(r.as_str())) {
                return Err(HostError::UnknownResource {
                    resource: resource.name().to_string(),
                    missing: missing.clone(),
                });
            }
        }

        let graph = ResourceDependencyGraph::build(&self.resources)?;

        Ok(AppModel {
            resources: self.resources,
            graph,
        })
    }
}

/// A validated set of resources and the order they may start in
#[derive(Debug)]
pub struct AppModel {
    resources: Vec<Resource>,
    graph: ResourceDependencyGraph,
}

impl AppModel {
    pub fn builder() -> AppModelBuilder {
        AppModelBuilder::new()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name() == name)
    }

    pub fn graph(&self) -> &ResourceDependencyGraph {
        &self.graph
    }

    /// Environment a resource is launched with
    ///
    /// Starts from the resource's own variables, adds
    /// `services__{source}__{endpoint}__0` for each referenced endpoint with a
    /// fixed port, then applies the resource's environment edits.
    pub fn environment(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let resource = self.resource(name).ok_or_else(|| HostError::UnknownResource {
            resource: name.to_string(),
            missing: name.to_string(),
        })?;

        let mut environment = resource.environment().clone();

        for source in resource.references() {
            let Some(source) = self.resource(source) else {
                continue;
            };
            for endpoint in source.endpoints() {
                if let Some(url) = endpoint.url() {
                    environment.insert(
                        format!("services__{}__{}__0", source.name(), endpoint.name),
                        url,
                    );
                }
            }
        }

        for edit in &resource.environment_edits {
            match edit {
                EnvironmentEdit::RemovePrefix(prefix) => {
                    environment.retain(|key, _| !key.starts_with(prefix.as_str()));
                }
            }
        }

        Ok(environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_rejected() {
        let err = AppModel::builder()
            .with(Resource::project("api", "../Api"))
            .with(Resource::project("api", "../Other"))
            .build()
            .unwrap_err();
        assert_eq!(err, HostError::DuplicateResource("api".to_string()));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let err = AppModel::builder()
            .with(Resource::project("web", "../Web").with_reference("api"))
            .build()
            .unwrap_err();
        assert!(matches!(err, HostError::UnknownResource { .. }));
    }

    #[test]
    fn test_reference_environment() {
        let model = AppModel::builder()
            .with(Resource::project("api", "../Api").with_http_endpoint(5001))
            .with(Resource::project("web", "../Web").with_reference("api"))
            .build()
            .unwrap();

        let env = model.environment("web").unwrap();
        assert_eq!(
            env.get("services__api__http__0").map(String::as_str),
            Some("http://localhost:5001")
        );
    }

    #[test]
    fn test_eureka_reference_strips_direct_service_variables() {
        let mut builder = AppModel::builder();
        builder
            .add(Resource::project("api", "../Api").with_http_endpoint(5001))
            .add(Resource::project("other", "../Other").with_http_endpoint(5002))
            .add(
                Resource::project("web", "../Web")
                    .with_environment("services__api__http__0", "http://stale")
                    .with_reference("other")
                    .with_eureka_reference("api"),
            );
        let model = builder.build().unwrap();

        let env = model.environment("web").unwrap();
        assert!(!env.keys().any(|k| k.starts_with("services__api__")));
        assert!(env.contains_key("services__other__http__0"));
        assert_eq!(
            env.get("Eureka__Client__RegistryFetchIntervalSeconds").map(String::as_str),
            Some("3")
        );
    }
}
