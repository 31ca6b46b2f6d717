//! Run Driver
//!
//! Compiles every definition a [`Manifest`] lists and writes (or checks) the
//! generated files.
//!
//! Each definition is an independent unit: a failing unit is recorded in the
//! report and writes nothing, the remaining units still run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use tracing::{debug, error, info, warn};

use crate::checksum::Fingerprint;
use crate::codegen::{
    EmissionModel, Emitter, KeyNormalizer, ModelBuilder, NamingConfig, RustEmitter,
};
use crate::config::{Configuration, Manifest};
use crate::definition::{DefinitionBody, DefinitionLoader, GeneratorMode};
use crate::error::{ResourceError, Result};
use crate::reconcile::Reconciler;
use crate::tabular::TabularReader;

// =============================================================================
// Reports
// =============================================================================

/// A rendered output file, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUnit {
    pub definition: PathBuf,
    pub output: PathBuf,
    pub content: String,
}

/// A unit that failed to compile or write
#[derive(Debug)]
pub struct UnitFailure {
    pub definition: PathBuf,
    pub mode: GeneratorMode,
    pub error: ResourceError,
}

/// Outcome of [`Compiler::generate`]
#[derive(Debug, Default)]
pub struct RunReport {
    /// Files written in this run
    pub written: Vec<PathBuf>,
    /// Files whose content was already current
    pub unchanged: Vec<PathBuf>,
    pub failures: Vec<UnitFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Why a generated file differs from what the definitions produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriftKind {
    /// No file at the output path
    Missing,
    /// Definitions changed since the file was generated
    Stale,
    /// File body no longer matches its own fingerprint
    HandEdited,
}

/// One generated file out of date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drift {
    pub definition: PathBuf,
    pub output: PathBuf,
    pub kind: DriftKind,
    pub insertions: usize,
    pub deletions: usize,
    /// Unified diff from the file on disk to the expected content
    pub diff: String,
}

/// Outcome of [`Compiler::check`]
#[derive(Debug, Default)]
pub struct CheckReport {
    pub up_to_date: Vec<PathBuf>,
    pub drift: Vec<Drift>,
    pub failures: Vec<UnitFailure>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.drift.is_empty() && self.failures.is_empty()
    }
}

// =============================================================================
// Compiler
// =============================================================================

/// Compiles resource definitions into generated modules
pub struct Compiler {
    configuration: Configuration,
    normalizer: KeyNormalizer,
    loader: DefinitionLoader,
    emitter: Box<dyn Emitter + Send + Sync>,
}

impl Compiler {
    pub fn new(configuration: Configuration, naming: NamingConfig) -> Self {
        let loader = DefinitionLoader::new(&configuration, TabularReader::new(&naming));
        Self {
            configuration,
            normalizer: KeyNormalizer::new(naming),
            loader,
            emitter: Box::new(RustEmitter::new()),
        }
    }

    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self::new(manifest.configuration.clone(), manifest.naming.clone())
    }

    /// Replace the emitter used by [`Compiler::render`]
    pub fn with_emitter(mut self, emitter: Box<dyn Emitter + Send + Sync>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Load, reconcile and build one definition. Writes nothing.
    pub fn compile_definition(&self, path: &Path, mode: GeneratorMode) -> Result<EmissionModel> {
        let path = self.configuration.resolve(path);
        let definition = self.loader.load_file(&path, mode)?;
        let builder = ModelBuilder::new(&self.normalizer);

        match &definition.body {
            DefinitionBody::Constants(source) => builder.build_constants(&definition, source),
            DefinitionBody::Values {
                versions,
                default_version,
            } => {
                let (keys, table) =
                    Reconciler::new(&self.normalizer).reconcile(versions, default_version)?;
                builder.build(&definition, &keys, table, default_version)
            }
        }
    }

    /// Render a model to its output file
    pub fn render(&self, definition: &Path, model: &EmissionModel) -> RenderedUnit {
        RenderedUnit {
            definition: definition.to_path_buf(),
            output: self
                .configuration
                .output_dir()
                .join(self.emitter.relative_path(model)),
            content: self.emitter.emit(model),
        }
    }

    /// Compile and render one definition
    pub fn compile_unit(&self, path: &Path, mode: GeneratorMode) -> Result<RenderedUnit> {
        let model = self.compile_definition(path, mode)?;
        Ok(self.render(path, &model))
    }

    /// Compile every unit of the manifest and write the results
    pub fn generate(&self, manifest: &Manifest) -> RunReport {
        let mut report = RunReport::default();

        for (definition, mode) in units(manifest) {
            let result = self
                .compile_unit(definition, mode)
                .and_then(|unit| write_unit(&unit).map(|written| (unit, written)));

            match result {
                Ok((unit, true)) => {
                    info!(
                        definition = %definition.display(),
                        output = %unit.output.display(),
                        "generated"
                    );
                    report.written.push(unit.output);
                }
                Ok((unit, false)) => {
                    debug!(output = %unit.output.display(), "unchanged");
                    report.unchanged.push(unit.output);
                }
                Err(e) => {
                    error!(definition = %definition.display(), mode = %mode, "{}", e);
                    report.failures.push(UnitFailure {
                        definition: definition.to_path_buf(),
                        mode,
                        error: e,
                    });
                }
            }
        }

        info!(
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            failed = report.failures.len(),
            "run complete"
        );
        report
    }

    /// Compile every unit and compare against the files on disk
    pub fn check(&self, manifest: &Manifest) -> CheckReport {
        let mut report = CheckReport::default();

        for (definition, mode) in units(manifest) {
            let unit = match self.compile_unit(definition, mode) {
                Ok(unit) => unit,
                Err(e) => {
                    error!(definition = %definition.display(), mode = %mode, "{}", e);
                    report.failures.push(UnitFailure {
                        definition: definition.to_path_buf(),
                        mode,
                        error: e,
                    });
                    continue;
                }
            };

            match detect_drift(&unit) {
                Ok(None) => report.up_to_date.push(unit.output),
                Ok(Some(drift)) => {
                    warn!(
                        output = %drift.output.display(),
                        kind = ?drift.kind,
                        "generated file out of date"
                    );
                    report.drift.push(drift);
                }
                Err(e) => report.failures.push(UnitFailure {
                    definition: definition.to_path_buf(),
                    mode,
                    error: e,
                }),
            }
        }

        report
    }
}

/// Manifest units in run order: constants first, then values
fn units(manifest: &Manifest) -> impl Iterator<Item = (&Path, GeneratorMode)> {
    let constants = manifest
        .constants
        .iter()
        .map(|p| (p.as_path(), GeneratorMode::Constants));
    let values = manifest
        .values
        .iter()
        .map(|p| (p.as_path(), GeneratorMode::Values));
    constants.chain(values)
}

/// Write a unit unless the file already holds the same content.
/// Returns whether the file was written.
fn write_unit(unit: &RenderedUnit) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(&unit.output) {
        if existing == unit.content {
            return Ok(false);
        }
    }
    if let Some(parent) = unit.output.parent() {
        fs::create_dir_all(parent).map_err(|e| ResourceError::io(parent, e))?;
    }
    fs::write(&unit.output, &unit.content).map_err(|e| ResourceError::io(&unit.output, e))?;
    Ok(true)
}

fn detect_drift(unit: &RenderedUnit) -> Result<Option<Drift>> {
    let existing = match fs::read_to_string(&unit.output) {
        Ok(existing) => existing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ResourceError::io(&unit.output, e)),
    };
    if existing == unit.content {
        return Ok(None);
    }

    let kind = if !unit.output.exists() {
        DriftKind::Missing
    } else {
        match Fingerprint::extract(&existing) {
            Some((stamped, body)) if !stamped.verify(body) => DriftKind::HandEdited,
            _ => DriftKind::Stale,
        }
    };

    let diff = TextDiff::from_lines(&existing, &unit.content);
    let (mut insertions, mut deletions) = (0, 0);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => insertions += 1,
            ChangeTag::Delete => deletions += 1,
            ChangeTag::Equal => {}
        }
    }
    let output = unit.output.display().to_string();
    let unified = diff
        .unified_diff()
        .context_radius(3)
        .header(&output, &output)
        .to_string();

    Ok(Some(Drift {
        definition: unit.definition.clone(),
        output: unit.output.clone(),
        kind,
        insertions,
        deletions,
        diff: unified,
    }))
}
