//! Bind climate forcing variables into a grok document.
//!
//! Each variable role gets an `include <role>.inc` line as the value of the
//! `time raster table` keyword in its section; the include file itself (the
//! list of per-interval rasters) is produced by an [`InputListGenerator`].
use crate::document::{Encoding, Lookup};
use crate::error::{Error, Result};
use crate::run::RunOrchestrator;
use crate::timespec::{ForcingMode, Interval};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const TIME_RASTER_TABLE_KEYWORD: &str = "time raster table";
/// Substituted with the interval index by the list generator.
pub const INDEX_PLACEHOLDER: &str = "{IDX}";
pub const DEFAULT_INPUT_FOLDER: &str = "../climate_forcing";

/// Which water-balance inputs drive the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForcingKind {
    /// Liquid water flux plus potential evapotranspiration.
    Pet,
    /// Net water flux (liquid water minus evapotranspiration).
    Net,
}

impl ForcingKind {
    pub fn default_roles(self) -> Vec<VariableRole> {
        match self {
            Self::Pet => vec![
                VariableRole::new("precip", "rain", "liqwatflx"),
                VariableRole::new("pet", "potential evapotranspiration", "pet"),
            ],
            Self::Net => vec![VariableRole::new("precip", "rain", "waterflx")],
        }
    }
}

impl FromStr for ForcingKind {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PET" => Ok(Self::Pet),
            "NET" => Ok(Self::Net),
            _ => Err(Error::InvalidForcingSpec(format!(
                "unknown forcing kind {raw:?}"
            ))),
        }
    }
}

impl fmt::Display for ForcingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pet => "PET",
            Self::Net => "NET",
        })
    }
}

/// One forcing variable: include-file stem, grok section anchor, and the
/// variable name used in the input raster file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRole {
    pub name: String,
    pub section: String,
    pub source_var: String,
}

impl VariableRole {
    pub fn new(
        name: impl Into<String>,
        section: impl Into<String>,
        source_var: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            section: section.into(),
            source_var: source_var.into(),
        }
    }

    pub fn include_file(&self) -> String {
        format!("{}.inc", self.name)
    }

    pub fn input_pattern(&self, input_prefix: &str) -> String {
        format!(
            "{input_prefix}_{}_iTime_{INDEX_PLACEHOLDER}.asc",
            self.source_var
        )
    }
}

/// Calendar and indexing conventions passed through to the list generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFlags {
    /// Check that every listed raster exists.
    pub validate: bool,
    /// Place each raster at the centre of its interval.
    pub center: bool,
    /// 365-day years (no leap days).
    pub days_365: bool,
    /// 1-based raster indices.
    pub fortran_index: bool,
}

impl Default for CalendarFlags {
    fn default() -> Self {
        Self {
            validate: true,
            center: true,
            days_365: true,
            fortran_index: true,
        }
    }
}

/// What to bind: either a forcing kind (default roles) or explicit roles.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcingSpec {
    pub kind: Option<ForcingKind>,
    pub roles: Option<Vec<VariableRole>>,
    pub input_prefix: String,
    pub input_folder: PathBuf,
    pub calendar: CalendarFlags,
}

impl ForcingSpec {
    pub fn new(kind: ForcingKind, input_prefix: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            roles: None,
            input_prefix: input_prefix.into(),
            input_folder: PathBuf::from(DEFAULT_INPUT_FOLDER),
            calendar: CalendarFlags::default(),
        }
    }

    /// Explicit roles win over the kind's defaults.
    pub fn resolved_roles(&self) -> Result<Vec<VariableRole>> {
        let roles = match (&self.roles, self.kind) {
            (Some(roles), _) => roles.clone(),
            (None, Some(kind)) => kind.default_roles(),
            (None, None) => {
                return Err(Error::InvalidForcingSpec(
                    "neither a forcing kind nor variable roles given".to_string(),
                ))
            }
        };
        if roles.is_empty() {
            return Err(Error::InvalidForcingSpec(
                "variable roles are empty".to_string(),
            ));
        }
        Ok(roles)
    }
}

/// Arguments for one include-file list.
#[derive(Debug, Clone, Copy)]
pub struct ListRequest<'a> {
    pub filename: &'a str,
    pub run_dir: &'a Path,
    pub input_folder: &'a Path,
    pub input_pattern: &'a str,
    pub interval: Option<Interval>,
    pub end_time: Option<f64>,
    pub mode: Option<ForcingMode>,
    pub calendar: CalendarFlags,
}

/// Writes `<run_dir>/<filename>` listing the input rasters for a run.
pub trait InputListGenerator {
    fn generate(&self, request: &ListRequest<'_>) -> Result<()>;
}

/// Point every role's `time raster table` at its include file and have
/// `generator` write the lists. Returns the include files in role order.
///
/// All section anchors are checked before the document is touched.
pub fn bind_forcing(
    run: &mut RunOrchestrator,
    spec: &ForcingSpec,
    generator: &dyn InputListGenerator,
) -> Result<Vec<String>> {
    let roles = spec.resolved_roles()?;
    if spec.input_prefix.trim().is_empty() {
        return Err(Error::InvalidForcingSpec(
            "input prefix must be non-empty".to_string(),
        ));
    }
    for role in &roles {
        run.document()
            .locate(TIME_RASTER_TABLE_KEYWORD, &Lookup::after(role.section.as_str()))?;
    }

    let mut written = Vec::with_capacity(roles.len());
    for role in &roles {
        let filename = role.include_file();
        run.document_mut().set(
            TIME_RASTER_TABLE_KEYWORD,
            format!("include {filename}"),
            Encoding::Plain,
            &Lookup::after(role.section.as_str()),
        )?;
        let input_pattern = role.input_pattern(&spec.input_prefix);
        let request = ListRequest {
            filename: &filename,
            run_dir: run.run_dir(),
            input_folder: &spec.input_folder,
            input_pattern: &input_pattern,
            interval: run.forcing_interval(),
            end_time: run.runtime(),
            mode: run.forcing_mode(),
            calendar: spec.calendar,
        };
        generator.generate(&request)?;
        tracing::debug!(role = %role.name, include = %filename, "bound forcing variable");
        written.push(filename);
    }
    Ok(written)
}

impl RunOrchestrator {
    /// See [`bind_forcing`].
    pub fn bind_forcing(
        &mut self,
        spec: &ForcingSpec,
        generator: &dyn InputListGenerator,
    ) -> Result<Vec<String>> {
        bind_forcing(self, spec, generator)
    }
}
