use crate::{ModelId, ModelName};
use glam::Vec3;
use std::path::PathBuf;

/// The on-disk formats a model can be stored in. Each format is handled by one registered parser,
/// and each file extension maps to exactly one format.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ModelFormat {
    ThreeDo,
    S3o,
    Obj,
    // Anything handed to a general purpose importer (collada, lightwave, blender, ...)
    Assimp,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 4] = [
        ModelFormat::ThreeDo,
        ModelFormat::S3o,
        ModelFormat::Obj,
        ModelFormat::Assimp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelFormat::ThreeDo => "3DO",
            ModelFormat::S3o => "S3O",
            ModelFormat::Obj => "OBJ",
            ModelFormat::Assimp => "ASS",
        }
    }

    /// Lower-case extensions a parser for this format is registered under by default
    pub fn default_extensions(self) -> &'static [&'static str] {
        match self {
            ModelFormat::ThreeDo => &["3do"],
            ModelFormat::S3o => &["s3o"],
            ModelFormat::Obj => &["obj"],
            ModelFormat::Assimp => &["dae", "lwo", "blend", "3ds", "ase", "fbx", "x"],
        }
    }
}

/// A node in a model's piece hierarchy. Offsets are relative to the parent piece.
#[derive(Clone, Debug, Default)]
pub struct ModelPiece {
    pub name: String,
    pub offset: Vec3,
    pub vertices: Vec<Vec3>,
    pub children: Vec<ModelPiece>,
}

impl ModelPiece {
    pub fn new(name: impl Into<String>) -> Self {
        ModelPiece {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_offset(
        mut self,
        offset: Vec3,
    ) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_vertices(
        mut self,
        vertices: Vec<Vec3>,
    ) -> Self {
        self.vertices = vertices;
        self
    }

    pub fn with_child(
        mut self,
        child: ModelPiece,
    ) -> Self {
        self.children.push(child);
        self
    }

    /// Number of pieces in this subtree, including this one
    pub fn piece_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| child.piece_count())
            .sum::<usize>()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
            + self
                .children
                .iter()
                .map(|child| child.vertex_count())
                .sum::<usize>()
    }
}

/// A parsed model. Parsers fill in the piece tree and textures, the loader stamps the id, name,
/// path and format when the model is inserted into the cache. After that the model is shared
/// read-only.
#[derive(Debug)]
pub struct Model {
    pub id: ModelId,
    pub name: ModelName,
    pub path: PathBuf,
    pub format: ModelFormat,

    pub root: ModelPiece,
    pub textures: Vec<String>,

    // Bounds of all vertices in model space
    pub mins: Vec3,
    pub maxs: Vec3,
    pub radius: f32,
    pub height: f32,
    pub relative_mid_pos: Vec3,
}

impl Model {
    pub fn new(
        format: ModelFormat,
        root: ModelPiece,
    ) -> Self {
        let mut model = Model {
            id: ModelId::INVALID,
            name: ModelName::new(""),
            path: PathBuf::default(),
            format,
            root,
            textures: Vec::default(),
            mins: Vec3::ZERO,
            maxs: Vec3::ZERO,
            radius: 0.0,
            height: 0.0,
            relative_mid_pos: Vec3::ZERO,
        };
        model.update_bounds();
        model
    }

    pub fn with_textures(
        mut self,
        textures: Vec<String>,
    ) -> Self {
        self.textures = textures;
        self
    }

    pub fn piece_count(&self) -> usize {
        self.root.piece_count()
    }

    /// Depth-first iteration over every piece, root first
    pub fn pieces(&self) -> ModelPieceIter<'_> {
        ModelPieceIter {
            stack: vec![&self.root],
        }
    }

    pub fn find_piece(
        &self,
        name: &str,
    ) -> Option<&ModelPiece> {
        self.pieces().find(|piece| piece.name == name)
    }

    /// Recomputes mins/maxs/radius/height/relative_mid_pos from the piece tree. A model without
    /// vertices gets zero bounds.
    pub fn update_bounds(&mut self) {
        let mut mins = Vec3::splat(f32::MAX);
        let mut maxs = Vec3::splat(f32::MIN);
        let mut found_vertex = false;

        let mut stack = vec![(&self.root, self.root.offset)];
        while let Some((piece, position)) = stack.pop() {
            for vertex in &piece.vertices {
                let v = *vertex + position;
                mins = mins.min(v);
                maxs = maxs.max(v);
                found_vertex = true;
            }

            for child in &piece.children {
                stack.push((child, position + child.offset));
            }
        }

        if !found_vertex {
            mins = Vec3::ZERO;
            maxs = Vec3::ZERO;
        }

        self.mins = mins;
        self.maxs = maxs;
        self.radius = ((maxs - mins) * 0.5).length();
        self.height = maxs.y;
        self.relative_mid_pos = (maxs + mins) * 0.5;
    }
}

pub struct ModelPieceIter<'a> {
    stack: Vec<&'a ModelPiece>,
}

impl<'a> Iterator for ModelPieceIter<'a> {
    type Item = &'a ModelPiece;

    fn next(&mut self) -> Option<Self::Item> {
        let piece = self.stack.pop()?;
        // Reversed so children come out in declaration order
        self.stack.extend(piece.children.iter().rev());
        Some(piece)
    }
}
