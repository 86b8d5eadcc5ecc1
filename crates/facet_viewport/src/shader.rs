//! WGSL sources, validation and hot reload of the sphere shader.
//!
//! The sphere shader lives in two files, `pbr.vs.wgsl` and `pbr.fs.wgsl`,
//! which are concatenated into a single module. They are read from the
//! configured shader directory when possible and from the copies compiled
//! into the binary otherwise. Every source is run through naga before it
//! reaches wgpu, so a broken edit is reported instead of aborting the app.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

pub const PBR_VERTEX_FILE: &str = "pbr.vs.wgsl";
pub const PBR_FRAGMENT_FILE: &str = "pbr.fs.wgsl";

pub const EMBEDDED_PBR_VERTEX: &str = include_str!("shaders/pbr.vs.wgsl");
pub const EMBEDDED_PBR_FRAGMENT: &str = include_str!("shaders/pbr.fs.wgsl");
pub const ROOM_SHADER: &str = include_str!("shaders/room.wgsl");
pub const GRID_SHADER: &str = include_str!("shaders/grid.wgsl");
pub const MIPMAP_SHADER: &str = include_str!("shaders/mipmap.wgsl");

/// Errors that can occur while loading or checking WGSL.
#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("WGSL parse error in {label}:\n{message}")]
    Parse { label: String, message: String },

    #[error("WGSL validation error in {label}:\n{message}")]
    Validation { label: String, message: String },
}

pub type ShaderResult<T> = Result<T, ShaderError>;

/// Parse and validate a WGSL module with naga.
pub fn validate_wgsl(label: &str, source: &str) -> ShaderResult<naga::Module> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        label: label.to_string(),
        message: e.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    validator.validate(&module).map_err(|e| ShaderError::Validation {
        label: label.to_string(),
        message: e.emit_to_string(source),
    })?;

    Ok(module)
}

/// Join the two sphere stages into one module source.
pub fn combine_sources(vertex: &str, fragment: &str) -> String {
    let mut source = String::with_capacity(vertex.len() + fragment.len() + 1);
    source.push_str(vertex);
    if !vertex.ends_with('\n') {
        source.push('\n');
    }
    source.push_str(fragment);
    source
}

/// Where a loaded sphere shader came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderOrigin {
    Embedded,
    Disk(PathBuf),
}

impl std::fmt::Display for ShaderOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded => write!(f, "built-in"),
            Self::Disk(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Outcome of the last sphere shader (re)load, shown in the GUI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderStatus {
    Active(ShaderOrigin),
    /// The new source failed; the pipeline built from `active` is still in use
    Rejected { active: ShaderOrigin, error: String },
}

impl ShaderStatus {
    pub fn active(&self) -> &ShaderOrigin {
        match self {
            Self::Active(origin) | Self::Rejected { active: origin, .. } => origin,
        }
    }
}

/// Combined sphere shader source.
#[derive(Debug, Clone)]
pub struct PbrShaderSource {
    pub source: String,
    pub origin: ShaderOrigin,
}

impl PbrShaderSource {
    pub fn embedded() -> Self {
        Self {
            source: combine_sources(EMBEDDED_PBR_VERTEX, EMBEDDED_PBR_FRAGMENT),
            origin: ShaderOrigin::Embedded,
        }
    }
}

/// Tracks the on-disk sphere shader files.
///
/// `poll` is called once per frame; when either file's modification time
/// changes the shader is flagged as needing an update, and the next `load`
/// clears the flag.
#[derive(Debug)]
pub struct PbrShaderFiles {
    dir: Option<PathBuf>,
    hot_reload: bool,
    stamps: Option<[SystemTime; 2]>,
    needs_update: bool,
}

impl PbrShaderFiles {
    pub fn new(dir: Option<PathBuf>, hot_reload: bool) -> Self {
        Self {
            dir,
            hot_reload,
            stamps: None,
            needs_update: true,
        }
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Force a reload on the next frame.
    pub fn request_reload(&mut self) {
        self.needs_update = true;
    }

    fn paths(dir: &Path) -> [PathBuf; 2] {
        [dir.join(PBR_VERTEX_FILE), dir.join(PBR_FRAGMENT_FILE)]
    }

    fn read_stamps(dir: &Path) -> Option<[SystemTime; 2]> {
        let [vs, fs_path] = Self::paths(dir);
        let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
        Some([modified(&vs)?, modified(&fs_path)?])
    }

    /// Check the files for changes. Returns true when a reload is pending.
    pub fn poll(&mut self) -> bool {
        if self.hot_reload {
            if let Some(dir) = &self.dir {
                let stamps = Self::read_stamps(dir);
                if stamps.is_some() && stamps != self.stamps {
                    if self.stamps.is_some() {
                        log::info!("Shader files changed in {}", dir.display());
                    }
                    self.needs_update = true;
                }
            }
        }
        self.needs_update
    }

    /// Read both stages from disk.
    pub fn read_from_disk(&self) -> ShaderResult<Option<PbrShaderSource>> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };

        let [vs_path, fs_path] = Self::paths(dir);
        let read = |path: &PathBuf| {
            fs::read_to_string(path).map_err(|source| ShaderError::Io {
                path: path.clone(),
                source,
            })
        };
        let vertex = read(&vs_path)?;
        let fragment = read(&fs_path)?;

        Ok(Some(PbrShaderSource {
            source: combine_sources(&vertex, &fragment),
            origin: ShaderOrigin::Disk(dir.clone()),
        }))
    }

    /// Load the current sources, falling back to the built-in copies when
    /// the files cannot be read. Clears the pending-update flag.
    pub fn load(&mut self) -> PbrShaderSource {
        self.needs_update = false;
        self.stamps = self.dir.as_deref().and_then(Self::read_stamps);

        match self.read_from_disk() {
            Ok(Some(source)) => {
                log::info!("Loaded sphere shader from {}", source.origin);
                source
            }
            Ok(None) => PbrShaderSource::embedded(),
            Err(e) => {
                log::warn!("{}; using built-in sphere shader", e);
                PbrShaderSource::embedded()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("facet_shader_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_sources(dir: &Path) {
        fs::write(dir.join(PBR_VERTEX_FILE), EMBEDDED_PBR_VERTEX).unwrap();
        fs::write(dir.join(PBR_FRAGMENT_FILE), EMBEDDED_PBR_FRAGMENT).unwrap();
    }

    #[test]
    fn test_embedded_shaders_validate() {
        validate_wgsl("pbr", &PbrShaderSource::embedded().source).unwrap();
        validate_wgsl("room", ROOM_SHADER).unwrap();
        validate_wgsl("grid", GRID_SHADER).unwrap();
        validate_wgsl("mipmap", MIPMAP_SHADER).unwrap();
    }

    #[test]
    fn test_pbr_entry_points() {
        let module = validate_wgsl("pbr", &PbrShaderSource::embedded().source).unwrap();
        let names: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"vs_main"));
        assert!(names.contains(&"fs_main"));
    }

    #[test]
    fn test_room_and_grid_fog_is_linear() {
        for (label, source) in [("room", ROOM_SHADER), ("grid", GRID_SHADER)] {
            let module = validate_wgsl(label, source).unwrap();
            assert!(
                module.functions.iter().any(|(_, f)| f.name.as_deref() == Some("fog_factor")),
                "{label} has no fog_factor"
            );

            let uses_smoothstep = module
                .functions
                .iter()
                .map(|(_, f)| f)
                .chain(module.entry_points.iter().map(|e| &e.function))
                .flat_map(|f| f.expressions.iter())
                .any(|(_, expr)| {
                    matches!(
                        expr,
                        naga::Expression::Math {
                            fun: naga::MathFunction::SmoothStep,
                            ..
                        }
                    )
                });
            assert!(!uses_smoothstep, "{label} fog must be a linear ramp");
        }
    }

    #[test]
    fn test_broken_source_is_reported() {
        let err = validate_wgsl("broken", "fn main( {").unwrap_err();
        assert!(matches!(err, ShaderError::Parse { .. }));

        let fragment_only = validate_wgsl("fragment", EMBEDDED_PBR_FRAGMENT).unwrap_err();
        assert!(matches!(fragment_only, ShaderError::Parse { .. }));
    }

    #[test]
    fn test_combine_inserts_newline() {
        assert_eq!(combine_sources("a", "b"), "a\nb");
        assert_eq!(combine_sources("a\n", "b"), "a\nb");
    }

    #[test]
    fn test_missing_dir_falls_back_to_embedded() {
        let mut files = PbrShaderFiles::new(Some(PathBuf::from("/nonexistent/facet")), true);
        assert!(files.read_from_disk().is_err());
        let loaded = files.load();
        assert_eq!(loaded.origin, ShaderOrigin::Embedded);
        assert!(!files.needs_update());
    }

    #[test]
    fn test_no_dir_uses_embedded() {
        let mut files = PbrShaderFiles::new(None, true);
        assert!(files.poll());
        assert_eq!(files.load().origin, ShaderOrigin::Embedded);
        assert!(!files.poll());
    }

    #[test]
    fn test_loads_from_disk() {
        let dir = scratch_dir("load");
        write_sources(&dir);
        let mut files = PbrShaderFiles::new(Some(dir.clone()), false);
        let loaded = files.load();
        assert_eq!(loaded.origin, ShaderOrigin::Disk(dir.clone()));
        assert_eq!(loaded.source, PbrShaderSource::embedded().source);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_modified_file_triggers_reload() {
        let dir = scratch_dir("reload");
        write_sources(&dir);
        let mut files = PbrShaderFiles::new(Some(dir.clone()), true);
        files.load();
        assert!(!files.poll());

        let later = SystemTime::now() + Duration::from_secs(10);
        let file = fs::OpenOptions::new()
            .write(true)
            .open(dir.join(PBR_FRAGMENT_FILE))
            .unwrap();
        file.set_modified(later).unwrap();
        drop(file);

        assert!(files.poll());
        files.load();
        assert!(!files.poll());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_hot_reload_disabled_ignores_changes() {
        let dir = scratch_dir("static");
        write_sources(&dir);
        let mut files = PbrShaderFiles::new(Some(dir.clone()), false);
        files.load();

        let file = fs::OpenOptions::new()
            .write(true)
            .open(dir.join(PBR_VERTEX_FILE))
            .unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(10)).unwrap();
        drop(file);

        assert!(!files.poll());
        files.request_reload();
        assert!(files.poll());
        let _ = fs::remove_dir_all(&dir);
    }
}
