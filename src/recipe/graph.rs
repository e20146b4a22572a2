// src/recipe/graph.rs

//! Layer inheritance graph
//!
//! Tracks which layers each recipe inherits from and orders them so every
//! base is finished before the layers built on it.
//!
//! # Example
//!
//! ```
//! use pkgmeta::recipe::graph::LayerGraph;
//!
//! let mut graph = LayerGraph::new();
//! graph.add_layer("PythonPackage", &["PackageBase"]);
//! graph.add_layer("py-numpy", &["PythonPackage"]);
//! graph.add_layer("PackageBase", &[]);
//!
//! let order = graph.topological_sort().unwrap();
//! assert_eq!(order, vec!["PackageBase", "PythonPackage", "py-numpy"]);
//! ```

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A directed graph from each layer to its bases
#[derive(Debug, Default, Clone)]
pub struct LayerGraph {
    /// Key: layer name, Value: the layers it inherits from
    edges: BTreeMap<String, BTreeSet<String>>,
    /// Key: layer name, Value: the layers inheriting from it
    reverse_edges: BTreeMap<String, BTreeSet<String>>,
}

impl LayerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer with its bases
    ///
    /// If the layer already exists, this merges the bases.
    pub fn add_layer(&mut self, name: &str, bases: &[&str]) {
        self.edges.entry(name.to_string()).or_default();
        self.reverse_edges.entry(name.to_string()).or_default();

        for base in bases {
            self.edges
                .entry(name.to_string())
                .or_default()
                .insert(base.to_string());
            self.edges.entry(base.to_string()).or_default();
            self.reverse_edges
                .entry(base.to_string())
                .or_default()
                .insert(name.to_string());
        }
    }

    pub fn layer_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Direct bases of a layer
    pub fn bases(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(name)
    }

    /// Layers that directly inherit from this one
    pub fn dependents(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.reverse_edges.get(name)
    }

    /// Order layers so bases come before the layers inheriting from them
    ///
    /// Kahn's algorithm; ties are broken by name so the order is stable.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        let mut in_degrees: BTreeMap<&str, usize> = self
            .edges
            .iter()
            .map(|(name, bases)| (name.as_str(), bases.len()))
            .collect();

        let mut queue: VecDeque<&str> = in_degrees
            .iter()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut result = Vec::with_capacity(self.edges.len());

        while let Some(node) = queue.pop_front() {
            result.push(node.to_string());

            if let Some(dependents) = self.reverse_edges.get(node) {
                for dependent in dependents {
                    if let Some(deg) = in_degrees.get_mut(dependent.as_str()) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        if result.len() != self.edges.len() {
            let cycle = self
                .find_cycle()
                .map(|c| c.join(" -> "))
                .unwrap_or_default();
            return Err(Error::CircularInheritance(format!(
                "Inheritance cycle detected: {}",
                cycle
            )));
        }

        Ok(result)
    }

    /// Find one inheritance cycle, listed from its first layer back to itself
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = BTreeSet::new();
        let mut path = Vec::new();

        for start in self.edges.keys() {
            if !visited.contains(start.as_str()) {
                if let Some(cycle) = self.find_cycle_dfs(start, &mut visited, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn find_cycle_dfs<'a>(
        &'a self,
        node: &'a str,
        visited: &mut BTreeSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        path.push(node);

        if let Some(bases) = self.edges.get(node) {
            for base in bases {
                if let Some(start) = path.iter().position(|p| *p == base.as_str()) {
                    let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                    cycle.push(base.clone());
                    return Some(cycle);
                }
                if !visited.contains(base.as_str()) {
                    if let Some(cycle) = self.find_cycle_dfs(base, visited, path) {
                        return Some(cycle);
                    }
                }
            }
        }

        path.pop();
        None
    }

    /// All layers a given layer transitively inherits from
    pub fn ancestors(&self, name: &str) -> BTreeSet<String> {
        let mut ancestors = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        if let Some(direct) = self.edges.get(name) {
            queue.extend(direct.iter().map(String::as_str));
        }

        while let Some(base) = queue.pop_front() {
            if ancestors.insert(base.to_string()) {
                if let Some(indirect) = self.edges.get(base) {
                    queue.extend(indirect.iter().map(String::as_str));
                }
            }
        }

        ancestors
    }
}
