//! Preview exports: height fields and band colours as PNG, meshes as OBJ.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::compositor::ColorMap;
use crate::error::Result;
use crate::heightfield::HeightField;
use crate::mesh::TerrainMesh;

/// Greyscale image of `field`, black at 0 and white at 1. Values outside [0,1] are clamped.
pub fn render_height_field(field: &HeightField) -> GrayImage {
    let size = field.size as u32;
    let mut img: GrayImage = ImageBuffer::new(size, size);
    for (x, y, value) in field.iter() {
        let level = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        img.put_pixel(x as u32, y as u32, Luma([level]));
    }
    img
}

/// Visible region of `field` only, border stripped.
pub fn render_height_interior(field: &HeightField) -> GrayImage {
    let size = field.interior_size() as u32;
    let mut img: GrayImage = ImageBuffer::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let value = field.get(field.border + x as usize, field.border + y as usize);
            img.put_pixel(x, y, Luma([(value.clamp(0.0, 1.0) * 255.0).round() as u8]));
        }
    }
    img
}

/// Band colours; cells below every band are black.
pub fn render_color_map(colors: &ColorMap) -> RgbImage {
    let size = colors.size as u32;
    let mut img: RgbImage = ImageBuffer::new(size, size);
    for y in 0..colors.size {
        for x in 0..colors.size {
            let color = colors.get(x, y).unwrap_or([0, 0, 0]);
            img.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }
    img
}

pub fn export_height_field(field: &HeightField, path: impl AsRef<Path>) -> Result<()> {
    render_height_field(field).save(path)?;
    Ok(())
}

/// Like [`export_height_field`] but writes only the visible region.
pub fn export_height_interior(field: &HeightField, path: impl AsRef<Path>) -> Result<()> {
    render_height_interior(field).save(path)?;
    Ok(())
}

pub fn export_color_map(colors: &ColorMap, path: impl AsRef<Path>) -> Result<()> {
    render_color_map(colors).save(path)?;
    Ok(())
}

/// Falloff masks are plain height fields; white is full suppression.
pub fn export_falloff(mask: &HeightField, path: impl AsRef<Path>) -> Result<()> {
    export_height_field(mask, path)
}

/// Write `mesh` as Wavefront OBJ with positions, UVs and normals.
pub fn write_obj<W: Write>(mesh: &TerrainMesh, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "# terrain mesh, LOD {}", mesh.lod)?;
    for p in &mesh.positions {
        writeln!(out, "v {} {} {}", p[0], p[1], p[2])?;
    }
    for uv in &mesh.uvs {
        writeln!(out, "vt {} {}", uv[0], uv[1])?;
    }
    for n in &mesh.normals {
        writeln!(out, "vn {} {} {}", n[0], n[1], n[2])?;
    }
    // OBJ indices are 1-based; one index serves all three attributes.
    for tri in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] + 1, tri[1] + 1, tri[2] + 1];
        writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
    }
    Ok(())
}

pub fn export_obj(mesh: &TerrainMesh, path: impl AsRef<Path>) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_obj(mesh, &mut out)?;
    out.flush()?;
    Ok(())
}
