//! Plain-text indexed triangle meshes:
//!
//! ```text
//! VertexCount: 3
//! TriangleCount: 1
//! VertexList (pos, normal)
//! {
//!     0 0 0  0 0 -1
//!     ...
//! }
//! TriangleList
//! {
//!     0 1 2
//! }
//! ```

use std::path::Path;
use std::str::FromStr;

use super::{IndexData, MeshData};
use crate::error::AssetError;
use crate::renderer::Vertex;

const PREALLOCATE_LIMIT: usize = 1 << 16;

pub fn load_text_mesh(path: impl AsRef<Path>) -> Result<MeshData<Vertex>, AssetError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_text_mesh(&contents).map_err(|reason| AssetError::MeshParse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parses the text format from an in-memory string. Vertices get zero
/// texture coordinates and tangents, the format does not carry them.
pub fn parse_text_mesh(source: &str) -> Result<MeshData<Vertex>, String> {
    let mut tokens = Tokens::new(source);

    tokens.expect_label("VertexCount:")?;
    let vertex_count: usize = tokens.parse("vertex count")?;
    tokens.expect_label("TriangleCount:")?;
    let triangle_count: usize = tokens.parse("triangle count")?;

    let index_count = triangle_count
        .checked_mul(3)
        .ok_or_else(|| format!("triangle count {triangle_count} is too large"))?;

    // Counts come from the file, so storage grows with the tokens actually read.
    tokens.skip_past("{")?;
    let mut vertices = Vec::with_capacity(vertex_count.min(PREALLOCATE_LIMIT));
    for _ in 0..vertex_count {
        let mut position = [0.0f32; 3];
        let mut normal = [0.0f32; 3];
        for component in position.iter_mut() {
            *component = tokens.parse("vertex position")?;
        }
        for component in normal.iter_mut() {
            *component = tokens.parse("vertex normal")?;
        }
        vertices.push(Vertex {
            position,
            normal,
            ..Vertex::default()
        });
    }

    tokens.skip_past("}")?;
    tokens.skip_past("{")?;
    let mut indices = Vec::with_capacity(index_count.min(PREALLOCATE_LIMIT));
    for _ in 0..index_count {
        let index: u32 = tokens.parse("triangle index")?;
        if index as usize >= vertex_count {
            return Err(format!(
                "index {index} out of range for {vertex_count} vertices"
            ));
        }
        indices.push(index);
    }

    Ok(MeshData::new(vertices, IndexData::U32(indices)))
}

struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            inner: source.split_whitespace(),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str, String> {
        self.inner
            .next()
            .ok_or_else(|| format!("unexpected end of file while reading {what}"))
    }

    fn expect_label(&mut self, label: &str) -> Result<(), String> {
        let token = self.next(label)?;
        if token == label {
            Ok(())
        } else {
            Err(format!("expected `{label}`, found `{token}`"))
        }
    }

    fn skip_past(&mut self, marker: &str) -> Result<(), String> {
        loop {
            if self.next(marker)? == marker {
                return Ok(());
            }
        }
    }

    fn parse<T: FromStr>(&mut self, what: &str) -> Result<T, String> {
        let token = self.next(what)?;
        token
            .parse()
            .map_err(|_| format!("invalid {what} `{token}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "VertexCount: 3
TriangleCount: 1
VertexList (pos, normal)
{
    0.0 0.0 0.0 0.0 0.0 -1.0
    0.0 1.0 0.0 0.0 0.0 -1.0
    1.0 0.0 0.0 0.0 0.0 -1.0
}
TriangleList
{
    0 1 2
}
";

    #[test]
    fn parses_single_triangle() {
        let mesh = parse_text_mesh(TRIANGLE).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, IndexData::U32(vec![0, 1, 2]));
        assert_eq!(mesh.vertices[1].position, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices[2].normal, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn rejects_truncated_vertex_list() {
        let truncated = "VertexCount: 3\nTriangleCount: 1\nVertexList (pos, normal)\n{\n0 0 0 0 0 1\n";
        let err = parse_text_mesh(truncated).unwrap_err();
        assert!(err.contains("unexpected end"), "{err}");
    }

    #[test]
    fn rejects_out_of_range_index() {
        let broken = TRIANGLE.replace("0 1 2", "0 1 7");
        assert!(parse_text_mesh(&broken).is_err());
    }

    #[test]
    fn huge_vertex_count_fails_without_allocating() {
        let corrupt = TRIANGLE.replace("VertexCount: 3", "VertexCount: 18446744073709551615");
        let err = parse_text_mesh(&corrupt).unwrap_err();
        assert!(err.contains("unexpected end") || err.contains("invalid"), "{err}");
    }

    #[test]
    fn overflowing_triangle_count_is_a_parse_error() {
        let corrupt = TRIANGLE.replace("TriangleCount: 1", "TriangleCount: 9223372036854775807");
        let err = parse_text_mesh(&corrupt).unwrap_err();
        assert!(err.contains("too large"), "{err}");
    }

    #[test]
    fn missing_file_is_reported_as_missing() {
        let err = load_text_mesh("definitely/not/here/skull.txt").unwrap_err();
        assert!(err.is_missing_file());
    }
}
