use crate::format::Format;
use foundation::ScratchPool;
use std::collections::BTreeMap;

/// Growable per-attribute columns for one pack build.
///
/// Vertices are pushed as whole rows in format order and split into one
/// `f64` column per attribute; columns are sized and converted once the
/// build is complete.
#[derive(Debug)]
pub struct PackBuilder {
    format: Format,
    columns: Vec<Vec<f64>>,
    vertex_count: usize,
    elements: Vec<u32>,
    max_altitude: f64,
    properties: BTreeMap<String, bool>,
}

impl PackBuilder {
    pub fn new(format: Format, pool: &mut ScratchPool) -> Self {
        let columns = format.iter().map(|_| pool.take(0)).collect();
        Self {
            format,
            columns,
            vertex_count: 0,
            elements: Vec::new(),
            max_altitude: 0.0,
            properties: BTreeMap::new(),
        }
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Append one vertex; `row` holds `format.width()` values.
    pub fn push_vertex(&mut self, row: &[f64]) -> u32 {
        assert_eq!(
            row.len(),
            self.format.width(),
            "vertex row does not match the pack format"
        );
        let mut offset = 0;
        for (column, entry) in self.columns.iter_mut().zip(self.format.iter()) {
            column.extend_from_slice(&row[offset..offset + entry.width]);
            offset += entry.width;
        }
        let index = self.vertex_count as u32;
        self.vertex_count += 1;
        index
    }

    /// Row of an already pushed vertex.
    pub fn vertex(&self, index: u32) -> Vec<f64> {
        let i = index as usize;
        let mut row = Vec::with_capacity(self.format.width());
        for (column, entry) in self.columns.iter().zip(self.format.iter()) {
            row.extend_from_slice(&column[i * entry.width..(i + 1) * entry.width]);
        }
        row
    }

    /// Duplicate a vertex so it can carry its own normal.
    pub fn copy_vertex(&mut self, index: u32) -> u32 {
        let row = self.vertex(index);
        self.push_vertex(&row)
    }

    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.elements.extend_from_slice(&[a, b, c]);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn elements(&self) -> &[u32] {
        &self.elements
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let i = self.format.position_of(name)?;
        self.columns.get(i).map(Vec::as_slice)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut [f64]> {
        let i = self.format.position_of(name)?;
        self.columns.get_mut(i).map(Vec::as_mut_slice)
    }

    pub fn track_altitude(&mut self, altitude: f64) {
        self.max_altitude = self.max_altitude.max(altitude.abs());
    }

    pub fn max_altitude(&self) -> f64 {
        self.max_altitude
    }

    pub fn set_flag(&mut self, name: &str) {
        self.properties.insert(name.to_string(), true);
    }

    pub fn properties(&self) -> &BTreeMap<String, bool> {
        &self.properties
    }

    /// Hand the columns back to `pool` once they have been converted.
    pub fn recycle(self, pool: &mut ScratchPool) {
        for column in self.columns {
            pool.give(column);
        }
    }
}
