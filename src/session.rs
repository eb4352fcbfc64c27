use crate::dataset::{Dataset, DatasetError};
use std::collections::HashMap;
use std::path::Path;

/// Session-scoped options: string keys and values with exact-match lookup,
/// seeded with the default categorical parameterization.
#[derive(Debug, Clone)]
pub struct Options {
    values: HashMap<String, String>,
}

impl Options {
    fn new() -> Self {
        let mut values = HashMap::new();
        values.insert("params".to_string(), "centerpoint".to_string());
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

/// Explicit process state passed into every entry point: the dataset
/// registry and the option bag. Only the registry outlives a model fit.
pub struct Session {
    datasets: Vec<Dataset>,
    options: Options,
}

impl Session {
    pub fn new() -> Self {
        Self {
            datasets: Vec::new(),
            options: Options::new(),
        }
    }

    /// Import a delimited file and register it under `handle`.
    pub fn import(
        &mut self,
        handle: &str,
        path: impl AsRef<Path>,
        delimiter: u8,
    ) -> Result<&Dataset, DatasetError> {
        let ds = Dataset::from_delimited(handle, path, delimiter)?;
        Ok(self.insert(ds))
    }

    pub fn insert(&mut self, ds: Dataset) -> &Dataset {
        self.datasets.push(ds);
        &self.datasets[self.datasets.len() - 1]
    }

    /// Look a dataset up by handle; the earliest registration wins.
    pub fn dataset(&self, handle: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|ds| ds.handle() == handle)
    }

    pub fn dataset_mut(&mut self, handle: &str) -> Option<&mut Dataset> {
        self.datasets.iter_mut().find(|ds| ds.handle() == handle)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
