pub mod config;
pub mod engine;
pub mod events;
pub mod scan;
pub mod processing {
    pub mod color;
    pub mod layout;
    pub mod resize;
}
pub mod render {
    pub mod loader;
    pub mod surface;
}
pub mod tasks {
    pub mod control;
    pub mod frames;
    pub mod settings_watch;
}

pub use config::{AppConfig, EngineOptions, SceneSettings};
pub use engine::Engine;
pub use events::{ControlCommand, EngineStatus, Phase, StepDirection, Transport};
pub use render::loader::{Decoder, FileDecoder};
pub use render::surface::{Surface, Texture};
