//! Dependency graph over the request's input files.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{Graph, NodeIndex};
use prost_types::FileDescriptorProto;

use crate::error::GeneratorError;

/// `FileGraph` builds a graph of the request's files whose edges correspond
/// to imports, so that files can be processed dependencies-first and a
/// missing import is caught before any emission starts.
#[derive(Debug)]
pub struct FileGraph {
    graph: Graph<String, ()>,
}

impl FileGraph {
    pub fn new(files: &[FileDescriptorProto]) -> Result<FileGraph, GeneratorError> {
        let mut index: HashMap<String, NodeIndex> = HashMap::new();
        let mut graph = Graph::new();

        for file in files {
            let name = file.name().to_string();
            let node = graph.add_node(name.clone());
            index.insert(name, node);
        }
        for file in files {
            let from = index[file.name()];
            for dependency in &file.dependency {
                let to = match index.get(dependency.as_str()) {
                    Some(to) => *to,
                    None => {
                        return Err(GeneratorError::MissingDependency {
                            file: file.name().to_string(),
                            import_: dependency.clone(),
                        })
                    }
                };
                graph.add_edge(from, to, ());
            }
        }

        Ok(FileGraph { graph })
    }

    /// The input files ordered dependencies-first. Import cycles cannot be
    /// produced by a conforming compiler front-end.
    pub fn ordered(&self) -> Vec<&str> {
        let mut sorted = toposort(&self.graph, None)
            .unwrap_or_else(|_| panic!("import cycle in the request's file list"));
        sorted.reverse();
        sorted
            .into_iter()
            .map(|node| self.graph[node].as_str())
            .collect()
    }

}
