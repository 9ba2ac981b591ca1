//! Wait-for dependency graph

use crate::error::{HostError, Result};
use crate::resource::Resource;
use std::collections::{HashMap, HashSet};

/// Which resources wait for which, validated to be acyclic
#[derive(Debug, Clone, Default)]
pub struct ResourceDependencyGraph {
    order: Vec<String>,
    upstream: HashMap<String, Vec<String>>,
    downstream: HashMap<String, Vec<String>>,
}

impl ResourceDependencyGraph {
    /// Build the graph, rejecting unknown names and cycles
    pub fn build(resources: &[Resource]) -> Result<Self> {
        let names: HashSet<&str> = resources.iter().map(Resource::name).collect();

        let mut upstream = HashMap::new();
        let mut downstream: HashMap<String, Vec<String>> = HashMap::new();

        for resource in resources {
            for dependency in resource.waits_for() {
                if !names.contains(dependency.as_str()) {
                    return Err(HostError::UnknownResource {
                        resource: resource.name().to_string(),
                        missing: dependency.clone(),
                    });
                }
                downstream
                    .entry(dependency.clone())
                    .or_default()
                    .push(resource.name().to_string());
            }
            upstream.insert(resource.name().to_string(), resource.waits_for().to_vec());
        }

        let graph = Self {
            order: resources.iter().map(|r| r.name().to_string()).collect(),
            upstream,
            downstream,
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(HostError::DependencyCycle(cycle));
        }

        Ok(graph)
    }

    /// Resources `name` waits for
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.upstream.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Resources waiting for `name`
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.downstream.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every resource after everything it waits for, otherwise in
    /// declaration order
    pub fn startup_order(&self) -> Vec<String> {
        let mut remaining: HashMap<&str, usize> = self
            .order
            .iter()
            .map(|name| (name.as_str(), self.dependencies_of(name).len()))
            .collect();
        let mut order = Vec::with_capacity(self.order.len());

        while order.len() < self.order.len() {
            let Some(next) = self
                .order
                .iter()
                .find(|name| remaining.get(name.as_str()) == Some(&0))
            else {
                break;
            };

            remaining.remove(next.as_str());
            for dependent in self.dependents_of(next) {
                if let Some(count) = remaining.get_mut(dependent.as_str()) {
                    *count -= 1;
                }
            }
            order.push(next.clone());
        }

        order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            graph: &'a ResourceDependencyGraph,
            name: &'a str,
            marks: &mut HashMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(name) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(name.to_string());
                    return Some(cycle);
                }
                None => {}
            }

            marks.insert(name, Mark::Visiting);
            path.push(name);
            for dependency in graph.dependencies_of(name) {
                if let Some(cycle) = visit(graph, dependency, marks, path) {
                    return Some(cycle);
                }
            }
            path.pop();
            marks.insert(name, Mark::Done);
            None
        }

        let mut marks = HashMap::new();
        let mut path = Vec::new();
        self.order
            .iter()
            .find_map(|name| visit(self, name, &mut marks, &mut path))
    }
}
