use glam::Vec3;
use std::path::Path;
use trove::loader::{Model, ModelFormat, ModelParser, ModelPiece, ParseError};

// Reads the subset of wavefront .obj the demo data uses. Every "o" line starts a new piece under
// the root, "v" lines add vertices to the current piece and "usemtl" names a texture.
pub struct ObjParser;

impl ObjParser {
    fn parse_vertex<'a>(
        line_number: usize,
        mut values: impl Iterator<Item = &'a str>,
    ) -> Result<Vec3, ParseError> {
        let mut vertex = [0.0; 3];
        for component in &mut vertex {
            let value = values
                .next()
                .ok_or_else(|| format!("Line {}: vertex has less than 3 components", line_number))?;
            *component = value
                .parse::<f32>()
                .map_err(|e| format!("Line {}: {:?} is not a number: {}", line_number, value, e))?;
        }

        Ok(Vec3::from(vertex))
    }

    pub fn parse_str(
        root_name: &str,
        contents: &str,
    ) -> Result<Model, ParseError> {
        let mut root = ModelPiece::new(root_name);
        let mut pieces: Vec<ModelPiece> = Vec::default();
        let mut textures = Vec::default();

        for (index, line) in contents.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("o") => {
                    let name = tokens.next().unwrap_or("piece");
                    pieces.push(ModelPiece::new(name));
                }
                Some("v") => {
                    let vertex = Self::parse_vertex(index + 1, tokens)?;
                    match pieces.last_mut() {
                        Some(piece) => piece.vertices.push(vertex),
                        None => root.vertices.push(vertex),
                    }
                }
                Some("usemtl") => {
                    if let Some(texture) = tokens.next() {
                        textures.push(texture.to_string());
                    }
                }
                // Comments, faces, normals, uvs etc. don't matter here
                _ => {}
            }
        }

        root.children = pieces;
        Ok(Model::new(ModelFormat::Obj, root).with_textures(textures))
    }
}

impl ModelParser for ObjParser {
    #[profiling::function]
    fn parse(
        &self,
        path: &Path,
    ) -> Result<Model, ParseError> {
        let contents = std::fs::read_to_string(path)?;
        let root_name = path
            .file_stem()
            .map(|x| x.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse_str(&root_name, &contents)
    }
}
