/// The viewer's command surface
///
/// Front ends hand whole files and button presses to a `Workbench`; it
/// routes them through the codec or the extrusion engine, loads the result
/// into the viewport and appends to the feature history.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::extrude::extrude;
use crate::history::{Feature, FeatureHistory};
use crate::normalize::Profile;
use crate::projection::Camera;
use crate::scene::{RenderBackend, Viewport};
use crate::stl;

/// File name of the bundled sample solid.
pub const SAMPLE_NAME: &str = "cube_ascii.stl";

const SAMPLE_STL: &str = include_str!("../assets/cube_ascii.stl");

/// What an opened or dropped file is treated as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Stl,
    Sketch,
}

impl FileKind {
    /// Classify by extension, ignoring case.
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("stl") => Ok(FileKind::Stl),
            Some("json") => Ok(FileKind::Sketch),
            _ => Err(Error::UnsupportedFileType {
                name: name.to_string(),
            }),
        }
    }
}

pub struct Workbench<B: RenderBackend> {
    viewport: Viewport<B>,
    history: FeatureHistory,
}

impl<B: RenderBackend> Workbench<B> {
    pub fn new(backend: B, camera: Camera) -> Self {
        Self {
            viewport: Viewport::new(backend, camera),
            history: FeatureHistory::new(),
        }
    }

    /// Load the bundled cube.
    pub fn load_sample(&mut self) -> Result<()> {
        let mesh = stl::decode(SAMPLE_STL.as_bytes())?;
        self.viewport.load(mesh, SAMPLE_NAME)?;
        self.history.record(Feature::LoadSample {
            name: SAMPLE_NAME.to_string(),
        });
        Ok(())
    }

    pub fn import_stl(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let mesh = stl::decode(bytes)?;
        self.viewport.load(mesh, name)?;
        self.history.record(Feature::ImportStl {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Extrude a sketch export and show the resulting solid.
    pub fn import_sketch(&mut self, json: &str, depth: f32) -> Result<()> {
        self.extrude_profile(Profile::from_json(json)?, depth)
    }

    fn extrude_profile(&mut self, profile: Profile, depth: f32) -> Result<()> {
        let mesh = extrude(&profile, depth)?;
        self.viewport.load(mesh, format!("Extrude({depth}mm)"))?;
        self.history.record(Feature::Extrude {
            depth,
            profile: profile.points().to_vec(),
        });
        Ok(())
    }

    /// Route a file by its extension. `depth` only applies to sketches.
    pub fn open_file(&mut self, name: &str, bytes: &[u8], depth: f32) -> Result<()> {
        let result = match FileKind::from_name(name) {
            Ok(FileKind::Stl) => self.import_stl(name, bytes),
            Ok(FileKind::Sketch) => {
                Profile::from_slice(bytes).and_then(|profile| self.extrude_profile(profile, depth))
            }
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) => info!(%name, "opened file"),
            Err(e) => warn!(%name, "could not open file: {e}"),
        }
        result
    }

    /// Binary STL of the solid on screen.
    pub fn export_stl(&self) -> Result<Vec<u8>> {
        self.viewport.export_active()
    }

    pub fn export_stl_ascii(&self) -> Result<String> {
        self.viewport.export_active_ascii()
    }

    pub fn viewport(&self) -> &Viewport<B> {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport<B> {
        &mut self.viewport
    }

    pub fn history(&self) -> &FeatureHistory {
        &self.history
    }
}
