use hubsession::{ModuleFactory, ModuleMetadata, ParameterDefinition, PortDefinition};

/// Extracts a surface of constant value
pub struct IsoSurfaceFactory;

impl ModuleFactory for IsoSurfaceFactory {
    fn type_name(&self) -> &str {
        "IsoSurface"
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            description: "Extract an isosurface".to_string(),
            category: "filter".to_string(),
            inputs: vec![
                PortDefinition::new("data_in", "scalar field to contour"),
                PortDefinition::new("mapdata_in", "field mapped onto the surface"),
            ],
            outputs: vec![PortDefinition::new("data_out", "isosurface")],
            parameters: vec![
                ParameterDefinition::new("isovalue", 0.0, "value of the surface"),
                ParameterDefinition::new("isopoint", vec![0.0, 0.0, 0.0], "point on the surface"),
                ParameterDefinition::new("point_or_value", 1i64, "pick surface by point (0) or value (1)"),
            ],
        }
    }
}

/// Maps scalar data to colors
pub struct ColorFactory;

impl ModuleFactory for ColorFactory {
    fn type_name(&self) -> &str {
        "Color"
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            description: "Map scalar data to colors".to_string(),
            category: "filter".to_string(),
            inputs: vec![PortDefinition::new("data_in", "scalar field")],
            outputs: vec![
                PortDefinition::new("color_out", "color map texture"),
                PortDefinition::new("data_out", "data with attached colors"),
            ],
            parameters: vec![
                ParameterDefinition::new("min", 0.0, "lower end of the value range"),
                ParameterDefinition::new("max", 1.0, "upper end of the value range"),
                ParameterDefinition::new("map", 0i64, "color map"),
                ParameterDefinition::new("steps", 32i64, "number of color steps"),
                ParameterDefinition::new("range", vec![0i64, 0i64], "timesteps used for auto range"),
            ],
        }
    }
}
