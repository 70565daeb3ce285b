//! Rigforge Core - deterministic rig compilation.
//!
//! This crate turns a validated rig scene into a binary artifact:
//!
//! - **Tessellation**: fixed-recipe shapes and implicit surfaces
//! - **UV generation**: versioned, shape-aware generators
//! - **Influences**: layered weight sources reduced to four canonical slots
//! - **Skinning**: linear blend and dual-quaternion pose baking
//! - **Serialization**: one 64-bit to 32-bit narrowing into a padded buffer
//!
//! Identical input produces byte-identical output, with or without the
//! rayon pool.
//!
//! # Example
//!
//! ```ignore
//! use rigforge_core::{compile_scene, CompileOptions, Scene};
//!
//! let scene: Scene = serde_json::from_str(&json)?;
//! let compiled = compile_scene(&scene, &CompileOptions::default())?;
//! println!("{} bytes, {} advisories",
//!     compiled.artifact.byte_length,
//!     compiled.advisories.len());
//! ```

pub mod advisory;
pub mod armature;
pub mod compile;
pub mod config;
pub mod error;
pub mod influence;
pub mod inspect;
pub mod mesh;
pub mod scene;
pub mod serialize;
pub mod skinning;
pub mod tessellation;
pub mod uv;

// Re-export commonly used types
pub use advisory::{Advisory, AdvisoryCode};
pub use compile::{bake_scene, compile_scene, CompiledScene};
pub use config::{CompileOptions, PrimitiveSplit};
pub use error::{CompileError, CompileResult};
pub use inspect::{inspect_mesh, MeshReport};
pub use mesh::Mesh;
pub use scene::{Armature, Binding, MeshDef, Pose, Scene, Solver};
pub use serialize::Artifact;
