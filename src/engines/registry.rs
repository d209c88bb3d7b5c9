// registry.rs - Engine registry for looking up report parsers by name

use std::collections::HashMap;

use super::traits::SearchEngine;
use super::{CrossmatchEngine, DecypherEngine, NcbiEngine, WuBlastEngine, WuBlastXEngine};

/// Registry of the built-in search engines
pub struct EngineRegistry {
    engines: HashMap<String, Box<dyn SearchEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            engines: HashMap::new(),
        };

        registry.register_engine("crossmatch", Box::new(CrossmatchEngine));
        registry.register_engine("ncbi", Box::new(NcbiEngine));
        registry.register_engine("rmblast", Box::new(NcbiEngine));
        registry.register_engine("wublast", Box::new(WuBlastEngine));
        registry.register_engine("wublastx", Box::new(WuBlastXEngine));
        registry.register_engine("decypher", Box::new(DecypherEngine));

        registry
    }

    /// Register an engine under `name`, replacing any previous entry
    pub fn register_engine(&mut self, name: &str, engine: Box<dyn SearchEngine>) {
        self.engines.insert(name.to_string(), engine);
    }

    pub fn get_engine(&self, name: &str) -> Option<&dyn SearchEngine> {
        self.engines.get(name).map(|e| e.as_ref())
    }

    pub fn has_engine(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    /// `(registered name, description)` pairs sorted by name
    pub fn list_engines(&self) -> Vec<(&str, &str)> {
        self.sorted_names()
            .into_iter()
            .filter_map(|name| self.engines.get(name).map(|engine| (name, engine.description())))
            .collect()
    }

    pub fn get_engine_names(&self) -> Vec<&str> {
        self.sorted_names()
    }

    fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.engines.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
