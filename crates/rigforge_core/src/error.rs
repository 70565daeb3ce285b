//! Error types for the compilation pipeline.
//!
//! Each stage has its own error enum. The driver wraps them in
//! [`CompileError`] together with the mesh, binding, or bone they concern.

use thiserror::Error;

/// Errors raised while tessellating primitives.
///
/// With validated input these are effectively unreachable; most variants
/// guard against malformed implicit-surface descriptors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TessellationError {
    #[error("unknown tessellation profile: {0:?}")]
    UnknownProfile(String),

    #[error("unknown field function: {0:?}")]
    UnknownField(String),

    #[error("field {field} requires a height")]
    MissingHeight { field: String },

    #[error("implicit grid needs at least 2 samples per axis, got {nx}x{ny}x{nz}")]
    GridTooSmall { nx: usize, ny: usize, nz: usize },

    #[error("implicit grid has {cells} cells, limit is {limit}")]
    TooManyCells { cells: usize, limit: usize },

    #[error("implicit domain must have min < max on every axis")]
    InvalidDomain,

    #[error("primitive {primitive}: expected {expected} vertices, produced {actual}")]
    CountMismatch {
        primitive: String,
        expected: usize,
        actual: usize,
    },

    #[error("mesh has {0} vertices, more than 32-bit indices can address")]
    TooManyVertices(usize),
}

/// Errors raised while generating UV channels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UvError {
    #[error("unknown UV generator: {0:?}")]
    UnknownGenerator(String),

    #[error("invalid UV channel name {0:?} (expected uv<N>)")]
    InvalidChannelName(String),

    #[error("channel {channel}: generator {generator} does not support {shape} primitives")]
    UnsupportedShape {
        channel: String,
        generator: String,
        shape: String,
    },
}

/// Errors raised while resolving armatures and skin influences.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("unknown mesh: {0}")]
    UnknownMesh(String),

    #[error("unknown armature: {0}")]
    UnknownArmature(String),

    #[error("unknown bone: {0}")]
    UnknownBone(String),

    #[error("unknown primitive: {0}")]
    UnknownPrimitive(String),

    #[error("primitive {primitive} references unknown material {material}")]
    UnknownMaterial { primitive: String, material: String },

    #[error("mesh {0} has more than one binding")]
    DuplicateBinding(String),

    #[error("duplicate bone id: {0}")]
    DuplicateBone(String),

    #[error("bone {bone} names unknown parent {parent}")]
    UnknownParent { bone: String, parent: String },

    #[error("bone {0} is part of a parent cycle")]
    ParentCycle(String),

    #[error("armature must have exactly one root bone, found {0}")]
    RootCount(usize),

    #[error("armature has {0} bones, joint indices are limited to 16 bits")]
    TooManyBones(usize),

    #[error("external weights target primitive {actual}, expected {expected}")]
    ExternalPrimitive { expected: String, actual: String },

    #[error("external weights for {primitive} declare {declared} vertices, primitive has {actual}")]
    ExternalVertexCount {
        primitive: String,
        declared: usize,
        actual: usize,
    },

    #[error("vertex {vertex} is out of range for primitive {primitive} ({count} vertices)")]
    VertexOutOfRange {
        primitive: String,
        vertex: usize,
        count: usize,
    },

    #[error("gradient range on {primitive} is empty ({start}..{end})")]
    EmptyGradientRange {
        primitive: String,
        start: f64,
        end: f64,
    },
}

/// Errors raised by the skinning solvers before any vertex is evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("unknown pose: {0}")]
    UnknownPose(String),

    #[error("pose references unknown bone {0}")]
    UnknownPoseBone(String),

    #[error("bone {bone} has a non-finite or near-zero pose rotation")]
    InvalidQuaternion { bone: String },

    #[error("bone {bone} has non-finite pose translation or scale")]
    NonFinite { bone: String },

    #[error("bone {bone} is not rigid; dual-quaternion skinning requires rotation and translation only")]
    NonRigid { bone: String },

    #[error("blended dual quaternion at vertex {vertex} has zero rotation")]
    DegenerateBlend { vertex: usize },
}

/// Top-level compilation error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Options(#[from] TessellationError),

    #[error(transparent)]
    Scene(#[from] ResolveError),

    #[error(transparent)]
    Pose(#[from] SolverError),

    #[error("mesh {mesh}: {source}")]
    Tessellation {
        mesh: String,
        #[source]
        source: TessellationError,
    },

    #[error("mesh {mesh}: {source}")]
    Uv {
        mesh: String,
        #[source]
        source: UvError,
    },

    #[error("binding {mesh} -> {armature}: {source}")]
    Influence {
        mesh: String,
        armature: String,
        #[source]
        source: ResolveError,
    },

    #[error("binding {mesh} -> {armature}: {source}")]
    Solver {
        mesh: String,
        armature: String,
        #[source]
        source: SolverError,
    },
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;
