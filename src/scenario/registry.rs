use std::collections::HashMap;

use crate::error::{ApiStepsError, Result};
use crate::format::DataFormat;
use crate::pathfinder::{HtmlPathFinder, JsonPathFinder, PathFinder, XmlPathFinder, YamlPathFinder};
use crate::serializer::{JsonSerializer, Serializer, YamlSerializer};

/// Per-format path finders and serializers a context dispatches to.
#[derive(Debug)]
pub struct FormatRegistry {
    finders: HashMap<DataFormat, Box<dyn PathFinder>>,
    serializers: HashMap<DataFormat, Box<dyn Serializer>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl FormatRegistry {
    pub fn empty() -> Self {
        Self { finders: HashMap::new(), serializers: HashMap::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_finder(DataFormat::Json, Box::new(JsonPathFinder));
        registry.register_finder(DataFormat::Yaml, Box::new(YamlPathFinder));
        registry.register_finder(DataFormat::Xml, Box::new(XmlPathFinder));
        registry.register_finder(DataFormat::Html, Box::new(HtmlPathFinder));
        registry.register_serializer(DataFormat::Json, Box::new(JsonSerializer));
        registry.register_serializer(DataFormat::Yaml, Box::new(YamlSerializer));
        registry
    }

    pub fn register_finder(&mut self, format: DataFormat, finder: Box<dyn PathFinder>) {
        self.finders.insert(format, finder);
    }

    pub fn register_serializer(&mut self, format: DataFormat, serializer: Box<dyn Serializer>) {
        self.serializers.insert(format, serializer);
    }

    pub fn finder(&self, format: DataFormat) -> Result<&dyn PathFinder> {
        self.finders
            .get(&format)
            .map(|f| f.as_ref())
            .ok_or_else(|| ApiStepsError::InvalidArgument(format!("no path finder for {}", format)))
    }

    pub fn serializer(&self, format: DataFormat) -> Result<&dyn Serializer> {
        self.serializers
            .get(&format)
            .map(|s| s.as_ref())
            .ok_or_else(|| ApiStepsError::InvalidArgument(format!("no serializer for {}", format)))
    }
}
