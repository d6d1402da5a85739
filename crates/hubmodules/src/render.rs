use hubsession::{ModuleFactory, ModuleMetadata, ParameterDefinition, PortDefinition};

pub struct RendererFactory;

impl ModuleFactory for RendererFactory {
    fn type_name(&self) -> &str {
        "Renderer"
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            description: "Display geometry".to_string(),
            category: "render".to_string(),
            inputs: vec![PortDefinition::new("data_in", "geometry to display")],
            outputs: vec![],
            parameters: vec![
                ParameterDefinition::new("background", vec![0.0, 0.0, 0.0], "background color"),
                ParameterDefinition::new("continuous_rendering", 0i64, "render every frame"),
                ParameterDefinition::new("title", "Renderer", "window title"),
            ],
        }
    }
}
