pub mod artwork;
pub mod assets;
pub mod cli;
pub mod config;
pub mod engine;
pub mod gallery;
pub mod input;
pub mod material;
pub mod mesh;
pub mod renderer;
pub mod texture;
