mod settings;

pub use settings::{
    PlaygroundConfig, RenderConfig, TomlPlaygroundConfig, TomlRenderConfig, EXAMPLE_CONFIG,
};
