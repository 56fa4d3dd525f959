pub mod args;
pub mod info;
pub mod options;
pub mod presets;
pub mod supervisor;
