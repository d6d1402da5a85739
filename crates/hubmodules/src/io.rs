use hubsession::{ModuleFactory, ModuleMetadata, ParameterDefinition, PortDefinition};

/// Reads a data set from disk and emits its grid
pub struct ReaderFactory;

impl ModuleFactory for ReaderFactory {
    fn type_name(&self) -> &str {
        "Reader"
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            description: "Read a data set from a file".to_string(),
            category: "io".to_string(),
            inputs: vec![],
            outputs: vec![
                PortDefinition::new("grid_out", "grid of the data set"),
                PortDefinition::new("data_out", "first data field"),
            ],
            parameters: vec![
                ParameterDefinition::new("filename", "", "file to read"),
                ParameterDefinition::new("first_step", 0i64, "first timestep to read"),
                ParameterDefinition::new("last_step", -1i64, "last timestep to read, -1 for all"),
                ParameterDefinition::new("step_increment", 1i64, "read every n-th timestep"),
            ],
        }
    }
}

/// Writes incoming objects to disk
pub struct WriterFactory;

impl ModuleFactory for WriterFactory {
    fn type_name(&self) -> &str {
        "Writer"
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            description: "Write incoming objects to a file".to_string(),
            category: "io".to_string(),
            inputs: vec![PortDefinition::new("data_in", "objects to write")],
            outputs: vec![],
            parameters: vec![
                ParameterDefinition::new("filename", "", "file to write"),
                ParameterDefinition::new("overwrite", 0i64, "replace an existing file"),
            ],
        }
    }
}
