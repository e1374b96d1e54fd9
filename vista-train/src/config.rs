//! Training parameter groups
//!
//! Every group is a declarative table of [`ParamSpec`]s. A table can register
//! itself on a `clap::Command`, produce its defaults, and be resolved against
//! a set of explicit values. Typed structs are then built from the resolved
//! [`ParamSet`] field by field.
//!
//! Precedence, highest first: values given on the command line, values saved
//! in `<model_path>/cfg_args`, table defaults.

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// File a run stores its resolved parameters in, inside the model directory.
pub const CFG_ARGS_FILE: &str = "cfg_args";

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Argument parsing error: {0}")]
    Parse(#[from] clap::Error),

    #[error("Missing parameter '{0}'")]
    MissingKey(String),

    #[error("Parameter '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A resolved parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Parameter values keyed by name.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Default of a table entry; its variant also fixes the parameter type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
}

impl From<ParamDefault> for ParamValue {
    fn from(default: ParamDefault) -> Self {
        match default {
            ParamDefault::Bool(v) => ParamValue::Bool(v),
            ParamDefault::Int(v) => ParamValue::Int(v),
            ParamDefault::Float(v) => ParamValue::Float(v),
            ParamDefault::Str(v) => ParamValue::Str(v.to_string()),
        }
    }
}

/// One entry of a parameter table.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: ParamDefault,
    /// Also accept `-<first letter>` on the command line.
    pub shorthand: bool,
    pub help: &'static str,
}

const fn spec(name: &'static str, default: ParamDefault, shorthand: bool, help: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        default,
        shorthand,
        help,
    }
}

/// A titled table of parameters.
#[derive(Debug, Clone, Copy)]
pub struct ParamGroup {
    pub title: &'static str,
    pub specs: &'static [ParamSpec],
}

pub const MODEL_PARAMS: ParamGroup = ParamGroup {
    title: "Loading Parameters",
    specs: &[
        spec("sh_degree", ParamDefault::Int(3), false, "Spherical harmonics degree"),
        spec("source_path", ParamDefault::Str(""), true, "Dataset directory"),
        spec("model_path", ParamDefault::Str(""), true, "Output model directory"),
        spec("images", ParamDefault::Str("images"), true, "Image directory inside the dataset"),
        spec("resolution", ParamDefault::Int(-1), true, "Downscale factor, -1 caps width at 1600"),
        spec("white_background", ParamDefault::Bool(false), true, "Use a white background"),
        spec("data_device", ParamDefault::Str("cuda"), false, "Device holding image data"),
        spec("eval", ParamDefault::Bool(false), false, "Hold out test views"),
    ],
};

pub const PIPELINE_PARAMS: ParamGroup = ParamGroup {
    title: "Pipeline Parameters",
    specs: &[
        spec("convert_SHs_python", ParamDefault::Bool(false), false, "Evaluate SH on the host"),
        spec("compute_cov3D_python", ParamDefault::Bool(false), false, "Build covariances on the host"),
        spec("debug", ParamDefault::Bool(false), false, "Enable rasterizer debugging"),
    ],
};

pub const OPTIMIZATION_PARAMS: ParamGroup = ParamGroup {
    title: "Optimization Parameters",
    specs: &[
        spec("iterations", ParamDefault::Int(30_000), false, "Total optimization steps"),
        spec("position_lr_init", ParamDefault::Float(0.00016), false, "Initial position learning rate"),
        spec("position_lr_final", ParamDefault::Float(0.0000016), false, "Final position learning rate"),
        spec("position_lr_delay_mult", ParamDefault::Float(0.01), false, "Position learning rate delay"),
        spec("position_lr_max_steps", ParamDefault::Int(30_000), false, "Steps of position lr decay"),
        spec("feature_lr", ParamDefault::Float(0.0025), false, "Feature learning rate"),
        spec("opacity_lr", ParamDefault::Float(0.05), false, "Opacity learning rate"),
        spec("scaling_lr", ParamDefault::Float(0.005), false, "Scaling learning rate"),
        spec("rotation_lr", ParamDefault::Float(0.001), false, "Rotation learning rate"),
        spec("percent_dense", ParamDefault::Float(0.01), false, "Extent fraction for densification"),
        spec("lambda_dssim", ParamDefault::Float(0.2), false, "Weight of the D-SSIM loss"),
        spec("densification_interval", ParamDefault::Int(100), false, "Steps between densifications"),
        spec("opacity_reset_interval", ParamDefault::Int(3000), false, "Steps between opacity resets"),
        spec("densify_from_iter", ParamDefault::Int(500), false, "First densification step"),
        spec("densify_until_iter", ParamDefault::Int(10_000), false, "Last densification step"),
        spec("densify_grad_threshold", ParamDefault::Float(0.0002), false, "Gradient threshold for densification"),
    ],
};

/// All groups a training run registers.
pub const ALL_GROUPS: [&ParamGroup; 3] = [&MODEL_PARAMS, &PIPELINE_PARAMS, &OPTIMIZATION_PARAMS];

impl ParamGroup {
    /// Add every parameter of the table to `command` under the group title.
    pub fn register(&self, mut command: Command) -> Command {
        for spec in self.specs {
            let mut arg = Arg::new(spec.name)
                .long(spec.name)
                .help(spec.help)
                .help_heading(self.title);
            if spec.shorthand {
                if let Some(short) = spec.name.chars().next() {
                    arg = arg.short(short);
                }
            }
            arg = match spec.default {
                ParamDefault::Bool(_) => arg.action(ArgAction::SetTrue),
                ParamDefault::Int(v) => arg
                    .value_parser(value_parser!(i64))
                    .allow_negative_numbers(true)
                    .default_value(v.to_string()),
                ParamDefault::Float(v) => arg
                    .value_parser(value_parser!(f64))
                    .allow_negative_numbers(true)
                    .default_value(v.to_string()),
                ParamDefault::Str(v) => arg.default_value(v),
            };
            command = command.arg(arg);
        }
        command
    }

    pub fn defaults(&self) -> ParamSet {
        self.specs
            .iter()
            .map(|spec| (spec.name.to_string(), ParamValue::from(spec.default)))
            .collect()
    }

    /// Defaults of this table, overridden by any matching key of `overrides`.
    pub fn resolve(&self, overrides: &ParamSet) -> ParamSet {
        let mut resolved = self.defaults();
        for (key, value) in resolved.iter_mut() {
            if let Some(explicit) = overrides.get(key) {
                *value = explicit.clone();
            }
        }
        resolved
    }

    /// Every parameter of the table as seen by clap, defaults included.
    pub fn extract(&self, matches: &ArgMatches) -> ParamSet {
        self.collect(matches, |_| true)
    }

    /// Only the parameters the user actually typed on the command line.
    pub fn specified(&self, matches: &ArgMatches) -> ParamSet {
        self.collect(matches, |name| {
            matches.value_source(name) == Some(ValueSource::CommandLine)
        })
    }

    fn collect(&self, matches: &ArgMatches, keep: impl Fn(&str) -> bool) -> ParamSet {
        let mut set = ParamSet::new();
        for spec in self.specs.iter().filter(|spec| keep(spec.name)) {
            // groups missing from the command contribute nothing
            let value = match spec.default {
                ParamDefault::Bool(_) => lookup_arg::<bool>(matches, spec.name).map(|v| ParamValue::Bool(*v)),
                ParamDefault::Int(_) => lookup_arg::<i64>(matches, spec.name).map(|v| ParamValue::Int(*v)),
                ParamDefault::Float(_) => lookup_arg::<f64>(matches, spec.name).map(|v| ParamValue::Float(*v)),
                ParamDefault::Str(_) => lookup_arg::<String>(matches, spec.name).map(|v| ParamValue::Str(v.clone())),
            };
            if let Some(value) = value {
                set.insert(spec.name.to_string(), value);
            }
        }
        set
    }
}

fn lookup_arg<'a, T: Clone + Send + Sync + 'static>(matches: &'a ArgMatches, name: &str) -> Option<&'a T> {
    matches.try_get_one::<T>(name).ok().flatten()
}

/// Build a command with every training parameter group registered.
pub fn training_command(name: &'static str) -> Command {
    ALL_GROUPS
        .iter()
        .fold(Command::new(name), |command, group| group.register(command))
}

/// Read `<model_path>/cfg_args`. A missing file yields an empty set.
pub fn load_cfg_args(model_path: &Path) -> Result<ParamSet, ConfigError> {
    let path = model_path.join(CFG_ARGS_FILE);
    if !path.exists() {
        info!("Config file not found at {}", path.display());
        return Ok(ParamSet::new());
    }
    info!("Config file found: {}", path.display());
    let contents = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn save_cfg_args(model_path: &Path, params: &ParamSet) -> Result<(), ConfigError> {
    fs::create_dir_all(model_path)?;
    fs::write(model_path.join(CFG_ARGS_FILE), serde_json::to_string_pretty(params)?)?;
    Ok(())
}

/// Merge already parsed command-line matches with the saved config file.
///
/// The file is looked up under the command-line `model_path`. Specified
/// command-line values beat file values; anything left unset falls back to the
/// table defaults.
pub fn combine(matches: &ArgMatches, groups: &[&ParamGroup]) -> Result<ParamSet, ConfigError> {
    let mut merged = match lookup_arg::<String>(matches, "model_path") {
        Some(model_path) if !model_path.is_empty() => load_cfg_args(Path::new(model_path))?,
        _ => ParamSet::new(),
    };
    for group in groups {
        merged.extend(group.specified(matches));
    }

    let mut resolved = ParamSet::new();
    for group in groups {
        resolved.extend(group.resolve(&merged));
    }
    Ok(resolved)
}

/// Parse `argv` with `command` and combine it with the saved config file.
pub fn combined_args<I, T>(command: Command, groups: &[&ParamGroup], argv: I) -> Result<ParamSet, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command.try_get_matches_from(argv)?;
    combine(&matches, groups)
}

fn lookup<'a>(set: &'a ParamSet, key: &str) -> Result<&'a ParamValue, ConfigError> {
    set.get(key).ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

fn get_bool(set: &ParamSet, key: &str) -> Result<bool, ConfigError> {
    match lookup(set, key)? {
        ParamValue::Bool(v) => Ok(*v),
        _ => Err(ConfigError::TypeMismatch {
            key: key.to_string(),
            expected: "bool",
        }),
    }
}

fn get_int(set: &ParamSet, key: &str) -> Result<i64, ConfigError> {
    match lookup(set, key)? {
        ParamValue::Int(v) => Ok(*v),
        _ => Err(ConfigError::TypeMismatch {
            key: key.to_string(),
            expected: "integer",
        }),
    }
}

fn get_float(set: &ParamSet, key: &str) -> Result<f64, ConfigError> {
    match lookup(set, key)? {
        ParamValue::Float(v) => Ok(*v),
        // JSON writes whole floats without a fraction
        ParamValue::Int(v) => Ok(*v as f64),
        _ => Err(ConfigError::TypeMismatch {
            key: key.to_string(),
            expected: "float",
        }),
    }
}

fn get_str(set: &ParamSet, key: &str) -> Result<String, ConfigError> {
    match lookup(set, key)? {
        ParamValue::Str(v) => Ok(v.clone()),
        _ => Err(ConfigError::TypeMismatch {
            key: key.to_string(),
            expected: "string",
        }),
    }
}

fn get_u32(set: &ParamSet, key: &str) -> Result<u32, ConfigError> {
    u32::try_from(get_int(set, key)?).map_err(|_| ConfigError::TypeMismatch {
        key: key.to_string(),
        expected: "non-negative integer",
    })
}

/// Dataset and output locations.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub sh_degree: u32,
    /// Absolute dataset directory (empty when unset).
    pub source_path: PathBuf,
    pub model_path: PathBuf,
    pub images: String,
    pub resolution: i64,
    pub white_background: bool,
    pub data_device: String,
    pub eval: bool,
}

impl ModelParams {
    pub fn from_set(set: &ParamSet) -> Result<Self, ConfigError> {
        let set = MODEL_PARAMS.resolve(set);
        let source_path = PathBuf::from(get_str(&set, "source_path")?);
        let source_path = if source_path.as_os_str().is_empty() {
            source_path
        } else {
            std::path::absolute(&source_path)?
        };
        Ok(Self {
            sh_degree: get_u32(&set, "sh_degree")?,
            source_path,
            model_path: PathBuf::from(get_str(&set, "model_path")?),
            images: get_str(&set, "images")?,
            resolution: get_int(&set, "resolution")?,
            white_background: get_bool(&set, "white_background")?,
            data_device: get_str(&set, "data_device")?,
            eval: get_bool(&set, "eval")?,
        })
    }

    pub fn to_set(&self) -> ParamSet {
        let mut set = ParamSet::new();
        set.insert("sh_degree".into(), ParamValue::Int(self.sh_degree as i64));
        set.insert(
            "source_path".into(),
            ParamValue::Str(self.source_path.to_string_lossy().into_owned()),
        );
        set.insert(
            "model_path".into(),
            ParamValue::Str(self.model_path.to_string_lossy().into_owned()),
        );
        set.insert("images".into(), ParamValue::Str(self.images.clone()));
        set.insert("resolution".into(), ParamValue::Int(self.resolution));
        set.insert("white_background".into(), ParamValue::Bool(self.white_background));
        set.insert("data_device".into(), ParamValue::Str(self.data_device.clone()));
        set.insert("eval".into(), ParamValue::Bool(self.eval));
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineParams {
    pub convert_shs_python: bool,
    pub compute_cov3d_python: bool,
    pub debug: bool,
}

impl PipelineParams {
    pub fn from_set(set: &ParamSet) -> Result<Self, ConfigError> {
        let set = PIPELINE_PARAMS.resolve(set);
        Ok(Self {
            convert_shs_python: get_bool(&set, "convert_SHs_python")?,
            compute_cov3d_python: get_bool(&set, "compute_cov3D_python")?,
            debug: get_bool(&set, "debug")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationParams {
    pub iterations: u32,
    pub position_lr_init: f64,
    pub position_lr_final: f64,
    pub position_lr_delay_mult: f64,
    pub position_lr_max_steps: u32,
    pub feature_lr: f64,
    pub opacity_lr: f64,
    pub scaling_lr: f64,
    pub rotation_lr: f64,
    pub percent_dense: f64,
    pub lambda_dssim: f64,
    pub densification_interval: u32,
    pub opacity_reset_interval: u32,
    pub densify_from_iter: u32,
    pub densify_until_iter: u32,
    pub densify_grad_threshold: f64,
}

impl OptimizationParams {
    pub fn from_set(set: &ParamSet) -> Result<Self, ConfigError> {
        let set = OPTIMIZATION_PARAMS.resolve(set);
        Ok(Self {
            iterations: get_u32(&set, "iterations")?,
            position_lr_init: get_float(&set, "position_lr_init")?,
            position_lr_final: get_float(&set, "position_lr_final")?,
            position_lr_delay_mult: get_float(&set, "position_lr_delay_mult")?,
            position_lr_max_steps: get_u32(&set, "position_lr_max_steps")?,
            feature_lr: get_float(&set, "feature_lr")?,
            opacity_lr: get_float(&set, "opacity_lr")?,
            scaling_lr: get_float(&set, "scaling_lr")?,
            rotation_lr: get_float(&set, "rotation_lr")?,
            percent_dense: get_float(&set, "percent_dense")?,
            lambda_dssim: get_float(&set, "lambda_dssim")?,
            densification_interval: get_u32(&set, "densification_interval")?,
            opacity_reset_interval: get_u32(&set, "opacity_reset_interval")?,
            densify_from_iter: get_u32(&set, "densify_from_iter")?,
            densify_until_iter: get_u32(&set, "densify_until_iter")?,
            densify_grad_threshold: get_float(&set, "densify_grad_threshold")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_set() {
        let model = ModelParams::from_set(&ParamSet::new()).unwrap();
        assert_eq!(model.sh_degree, 3);
        assert_eq!(model.images, "images");
        assert_eq!(model.resolution, -1);
        assert!(!model.eval);
        assert_eq!(model.source_path, PathBuf::new());

        let opt = OptimizationParams::from_set(&ParamSet::new()).unwrap();
        assert_eq!(opt.iterations, 30_000);
        assert_eq!(opt.densify_until_iter, 10_000);
        assert_eq!(opt.lambda_dssim, 0.2);
    }

    #[test]
    fn test_override_beats_default() {
        let mut set = ParamSet::new();
        set.insert("resolution".into(), ParamValue::Int(2));
        set.insert("unrelated".into(), ParamValue::Bool(true));
        let resolved = MODEL_PARAMS.resolve(&set);
        assert_eq!(resolved["resolution"], ParamValue::Int(2));
        assert_eq!(resolved["images"], ParamValue::Str("images".into()));
        assert!(!resolved.contains_key("unrelated"));
        assert_eq!(resolved.len(), MODEL_PARAMS.specs.len());
    }

    #[test]
    fn test_shorthand_flags_parse() {
        let matches = training_command("train")
            .try_get_matches_from(["train", "-s", "data/garden", "-r", "4", "-w", "--eval"])
            .unwrap();
        let set = MODEL_PARAMS.extract(&matches);
        assert_eq!(set["resolution"], ParamValue::Int(4));
        assert_eq!(set["white_background"], ParamValue::Bool(true));
        assert_eq!(set["eval"], ParamValue::Bool(true));

        let model = ModelParams::from_set(&set).unwrap();
        assert!(model.source_path.is_absolute());
        assert!(model.source_path.ends_with("data/garden"));
    }

    #[test]
    fn test_negative_resolution_parses() {
        let matches = training_command("train")
            .try_get_matches_from(["train", "-r", "-1"])
            .unwrap();
        assert_eq!(MODEL_PARAMS.specified(&matches)["resolution"], ParamValue::Int(-1));
    }

    #[test]
    fn test_long_only_parameter_has_no_short_flag() {
        let result = training_command("train").try_get_matches_from(["train", "-d", "cpu"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_specified_ignores_defaults() {
        let matches = training_command("train")
            .try_get_matches_from(["train", "--iterations", "7000"])
            .unwrap();
        let specified = OPTIMIZATION_PARAMS.specified(&matches);
        assert_eq!(specified.len(), 1);
        assert_eq!(specified["iterations"], ParamValue::Int(7000));
    }

    #[test]
    fn test_float_accepts_whole_number() {
        let mut set = ParamSet::new();
        set.insert("lambda_dssim".into(), ParamValue::Int(1));
        let opt = OptimizationParams::from_set(&set).unwrap();
        assert_eq!(opt.lambda_dssim, 1.0);
    }

    #[test]
    fn test_type_mismatch_reported() {
        let mut set = ParamSet::new();
        set.insert("eval".into(), ParamValue::Str("yes".into()));
        assert!(matches!(
            ModelParams::from_set(&set),
            Err(ConfigError::TypeMismatch { expected: "bool", .. })
        ));
    }

    #[test]
    fn test_command_line_beats_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().to_string_lossy().into_owned();

        let mut saved = ParamSet::new();
        saved.insert("resolution".into(), ParamValue::Int(8));
        saved.insert("images".into(), ParamValue::Str("images_4".into()));
        saved.insert("iterations".into(), ParamValue::Int(12_000));
        save_cfg_args(dir.path(), &saved).unwrap();

        let resolved = combined_args(
            training_command("render"),
            &ALL_GROUPS,
            ["render", "-m", model_path.as_str(), "-r", "2"],
        )
        .unwrap();

        // command line wins, file fills the rest, defaults cover the remainder
        assert_eq!(resolved["resolution"], ParamValue::Int(2));
        assert_eq!(resolved["images"], ParamValue::Str("images_4".into()));
        assert_eq!(resolved["iterations"], ParamValue::Int(12_000));
        assert_eq!(resolved["sh_degree"], ParamValue::Int(3));
        assert_eq!(resolved["model_path"], ParamValue::Str(model_path));
    }

    #[test]
    fn test_pipeline_flags_keep_mixed_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().to_string_lossy().into_owned();
        let mut saved = ParamSet::new();
        saved.insert("compute_cov3D_python".into(), ParamValue::Bool(true));
        save_cfg_args(dir.path(), &saved).unwrap();

        let resolved = combined_args(
            training_command("render"),
            &ALL_GROUPS,
            ["render", "-m", model_path.as_str(), "--convert_SHs_python"],
        )
        .unwrap();

        let pipeline = PipelineParams::from_set(&resolved).unwrap();
        assert!(pipeline.convert_shs_python);
        assert!(pipeline.compute_cov3d_python);
        assert!(!pipeline.debug);
    }

    #[test]
    fn test_missing_cfg_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().to_string_lossy().into_owned();
        let resolved = combined_args(
            training_command("render"),
            &ALL_GROUPS,
            ["render", "--model_path", model_path.as_str()],
        )
        .unwrap();
        assert_eq!(resolved["resolution"], ParamValue::Int(-1));
    }

    #[test]
    fn test_model_params_round_trip_through_cfg_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = ParamSet::new();
        set.insert("model_path".into(), ParamValue::Str("out/garden".into()));
        set.insert("eval".into(), ParamValue::Bool(true));
        let model = ModelParams::from_set(&set).unwrap();

        save_cfg_args(dir.path(), &model.to_set()).unwrap();
        let reloaded = ModelParams::from_set(&load_cfg_args(dir.path()).unwrap()).unwrap();
        assert_eq!(reloaded, model);
    }
}
