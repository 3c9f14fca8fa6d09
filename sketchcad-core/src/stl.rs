/// STL codec: binary and ASCII decoding, binary and ASCII encoding
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::{all_consuming, cut, opt},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16},
    sequence::{preceded, terminated},
    IResult,
};
use tracing::debug;

use crate::config::{STL_HEADER_LEN, STL_HEADER_TEXT, STL_PREAMBLE_LEN, STL_RECORD_LEN};
use crate::error::{Error, Result};
use crate::geometry::{Mesh, Triangle};

/// Framing of an STL byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    Ascii,
    Binary,
}

/// Pick the framing of `data`.
///
/// Text starting with `solid` is ASCII, unless its length is exactly what a
/// binary file with the same header would need: binary exporters often write
/// `solid` into the free-form header too.
pub fn detect_format(data: &[u8]) -> StlFormat {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if !data[start..].starts_with(b"solid") {
        return StlFormat::Binary;
    }
    match binary_size(data) {
        Some(expected) if expected == data.len() => StlFormat::Binary,
        _ => StlFormat::Ascii,
    }
}

/// Detect the framing and decode an STL file.
///
/// Any framing error aborts the whole decode, no partial mesh is returned.
pub fn decode(data: &[u8]) -> Result<Mesh> {
    let format = detect_format(data);
    debug!(?format, bytes = data.len(), "decoding STL");
    match format {
        StlFormat::Binary => parse_binary_stl(data),
        StlFormat::Ascii => {
            let text = std::str::from_utf8(data)
                .map_err(|e| Error::malformed(format!("ASCII STL is not valid UTF-8: {e}")))?;
            parse_ascii_stl(text)
        }
    }
}

/// Byte length a binary STL with the header count found in `data` must have.
fn binary_size(data: &[u8]) -> Option<usize> {
    let count = data.get(STL_HEADER_LEN..STL_PREAMBLE_LEN)?;
    let count = u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize;
    count
        .checked_mul(STL_RECORD_LEN)?
        .checked_add(STL_PREAMBLE_LEN)
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh> {
    if data.len() < STL_PREAMBLE_LEN {
        return Err(Error::malformed(format!(
            "binary STL needs at least {STL_PREAMBLE_LEN} bytes, got {}",
            data.len()
        )));
    }

    // Triangle count (4 bytes, little-endian) follows the 80-byte header
    let count_bytes = &data[STL_HEADER_LEN..STL_PREAMBLE_LEN];
    let declared =
        u32::from_le_bytes([count_bytes[0], count_bytes[1], count_bytes[2], count_bytes[3]]) as usize;
    let records = &data[STL_PREAMBLE_LEN..];

    let available = records.len() / STL_RECORD_LEN;
    if records.len() % STL_RECORD_LEN != 0 {
        return Err(Error::malformed(format!(
            "truncated record: {} trailing bytes after {available} complete triangles",
            records.len() % STL_RECORD_LEN
        )));
    }
    if available != declared {
        return Err(Error::malformed(format!(
            "header declares {declared} triangles but the data holds {available}"
        )));
    }

    let parsed: IResult<&[u8], Vec<Triangle>> =
        all_consuming(count(binary_record, declared))(records);
    match parsed {
        Ok((_, triangles)) => Ok(Mesh { triangles }),
        Err(e) => Err(Error::malformed(format!("unreadable triangle record: {e}"))),
    }
}

fn le_vector3(input: &[u8]) -> IResult<&[u8], [f32; 3]> {
    let (input, x) = le_f32(input)?;
    let (input, y) = le_f32(input)?;
    let (input, z) = le_f32(input)?;
    Ok((input, [x, y, z]))
}

fn binary_record(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, [nx, ny, nz]) = le_vector3(input)?;
    let (input, vertices) = count(le_vector3, 3)(input)?;
    // Attribute byte count, ignored
    let (input, _) = le_u16(input)?;

    let vertices = [vertices[0], vertices[1], vertices[2]].map(|[x, y, z]| Point3::new(x, y, z));
    Ok((input, Triangle::with_normal(Vector3::new(nx, ny, nz), vertices)))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let line = line_number(input, e.input);
            let near: String = e.input.trim_start().chars().take(24).collect();
            Err(Error::malformed(format!(
                "ASCII STL parse error on line {line} near {near:?}"
            )))
        }
        Err(nom::Err::Incomplete(_)) => Err(Error::malformed("ASCII STL ended early")),
    }
}

fn line_number(input: &str, rest: &str) -> usize {
    let consumed = input.len() - rest.len();
    let rest_start = consumed + (rest.len() - rest.trim_start().len());
    input[..rest_start].matches('\n').count() + 1
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = all_consuming(terminated(
        opt(preceded(multispace1, take_till(|c: char| c == '\n' || c == '\r'))),
        multispace0,
    ))(input)?;

    Ok((input, Mesh { triangles }))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    // Past this point a bad token is an error, not the end of the facet list.
    cut(parse_facet_body)(input)
}

fn parse_facet_body(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, [nx, ny, nz]) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input)?;
    let (input, v2) = parse_vertex(input)?;
    let (input, v3) = parse_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::with_normal(Vector3::new(nx, ny, nz), [v1, v2, v3])))
}

fn parse_vertex(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, [x, y, z]) = parse_vector3(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn parse_vector3(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, _) = multispace1(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, [x, y, z]))
}

/// Encode a mesh as binary STL, the export format.
pub fn encode(mesh: &Mesh) -> Vec<u8> {
    let mut data = Vec::with_capacity(STL_PREAMBLE_LEN + mesh.len() * STL_RECORD_LEN);

    let mut header = [0u8; STL_HEADER_LEN];
    header[..STL_HEADER_TEXT.len()].copy_from_slice(STL_HEADER_TEXT);
    data.extend_from_slice(&header);
    data.extend_from_slice(&(mesh.len() as u32).to_le_bytes());

    for triangle in &mesh.triangles {
        for component in triangle.normal.iter() {
            data.extend_from_slice(&component.to_le_bytes());
        }
        for vertex in &triangle.vertices {
            for component in vertex.coords.iter() {
                data.extend_from_slice(&component.to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }

    data
}

/// Encode a mesh as ASCII STL under the solid name `name`.
pub fn encode_ascii(mesh: &Mesh, name: &str) -> String {
    let mut out = String::with_capacity(mesh.len() * 256);
    out.push_str(&format!("solid {name}\n"));
    for t in &mesh.triangles {
        let n = t.normal;
        out.push_str(&format!("  facet normal {:e} {:e} {:e}\n", n.x, n.y, n.z));
        out.push_str("    outer loop\n");
        for v in &t.vertices {
            out.push_str(&format!("      vertex {:e} {:e} {:e}\n", v.x, v.y, v.z));
        }
        out.push_str("    endloop\n  endfacet\n");
    }
    out.push_str(&format!("endsolid {name}\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ONE_FACET: &str = "solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid tri
";

    fn assert_same_mesh(a: &Mesh, b: &Mesh) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.triangles.iter().zip(&b.triangles) {
            assert_relative_eq!(x.normal, y.normal, epsilon = 1e-4);
            for (p, q) in x.vertices.iter().zip(&y.vertices) {
                assert_relative_eq!(*p, *q, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 0);
    }

    #[test]
    fn test_binary_round_trip() {
        let cube = Mesh::cube(3.5);
        let bytes = encode(&cube);
        assert_eq!(bytes.len(), 84 + 12 * 50);
        assert_eq!(detect_format(&bytes), StlFormat::Binary);
        assert_same_mesh(&cube, &decode(&bytes).unwrap());
    }

    #[test]
    fn test_ascii_round_trip() {
        let cube = Mesh::cube(0.125);
        let text = encode_ascii(&cube, "cube");
        assert_eq!(detect_format(text.as_bytes()), StlFormat::Ascii);
        assert_same_mesh(&cube, &decode(text.as_bytes()).unwrap());
    }

    #[test]
    fn test_ascii_layout() {
        let mesh = decode(ONE_FACET.as_bytes()).unwrap();
        let expected = ONE_FACET.replace(" 0", " 0e0").replace(" 1", " 1e0");
        assert_eq!(encode_ascii(&mesh, "tri"), expected);
    }

    #[test]
    fn test_parse_ascii_facet() {
        let mesh = decode(ONE_FACET.as_bytes()).unwrap();
        assert_eq!(mesh.len(), 1);
        assert_eq!(mesh.triangles[0].normal, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.triangles[0].vertices[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ascii_without_name_or_trailing_newline() {
        let text = ONE_FACET
            .replace("endsolid tri\n", "endsolid")
            .replace("solid tri", "solid");
        assert_eq!(decode(text.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_ascii_bad_number_reports_line() {
        let text = ONE_FACET.replace("vertex 1 0 0", "vertex 1 zero 0");
        match decode(text.as_bytes()) {
            Err(Error::MalformedMesh { reason }) => assert!(reason.contains("line 5"), "{reason}"),
            other => panic!("expected MalformedMesh, got {other:?}"),
        }
    }

    #[test]
    fn test_ascii_missing_endsolid_is_malformed() {
        let text = ONE_FACET.replace("endsolid tri\n", "");
        assert!(matches!(decode(text.as_bytes()), Err(Error::MalformedMesh { .. })));
    }

    #[test]
    fn test_truncated_binary_is_malformed() {
        let bytes = encode(&Mesh::cube(1.0));
        let truncated = &bytes[..bytes.len() - 20];
        assert!(matches!(decode(truncated), Err(Error::MalformedMesh { .. })));
        assert!(matches!(decode(&bytes[..40]), Err(Error::MalformedMesh { .. })));
    }

    #[test]
    fn test_count_mismatch_is_malformed() {
        let mut bytes = encode(&Mesh::cube(1.0));
        bytes[80..84].copy_from_slice(&13u32.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(Error::MalformedMesh { .. })));
    }

    #[test]
    fn test_binary_with_solid_header_is_binary() {
        let mut bytes = encode(&Mesh::cube(1.0));
        bytes[..STL_HEADER_LEN].fill(b' ');
        bytes[..11].copy_from_slice(b"solid cube ");
        assert_eq!(detect_format(&bytes), StlFormat::Binary);
        assert_eq!(decode(&bytes).unwrap().len(), 12);
    }
}
