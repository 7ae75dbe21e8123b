use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, ValueEnum};

use crate::command::Invocation;
use crate::error::ConfigError;

/// Subcommand of the training tool
const TRAIN_SUBCOMMAND: &str = "train";

/// Optimizer passed to the training tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Optimizer {
    #[value(name = "SGD")]
    Sgd,
    #[value(name = "Adam")]
    Adam,
    #[value(name = "AdamW")]
    AdamW,
}

impl Optimizer {
    fn as_arg(self) -> &'static str {
        match self {
            Optimizer::Sgd => "SGD",
            Optimizer::Adam => "Adam",
            Optimizer::AdamW => "AdamW",
        }
    }
}

/// Flip augmentation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Flip {
    None,
    Horizontal,
    Vertical,
    Both,
}

impl Flip {
    fn vertical(self) -> bool {
        matches!(self, Flip::Vertical | Flip::Both)
    }

    fn horizontal(self) -> bool {
        matches!(self, Flip::Horizontal | Flip::Both)
    }
}

/// Training hyperparameters
///
/// Parsed once from the command line and never mutated afterwards; the
/// supervisor only ever sees the [`Invocation`] built from it.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Model weights file (.pt)
    #[arg(long)]
    pub model: PathBuf,

    /// Dataset configuration file (.yaml)
    #[arg(long)]
    pub data: PathBuf,

    /// Number of training epochs
    #[arg(long, default_value_t = 100)]
    pub epochs: u32,

    /// Input image size
    #[arg(long, default_value_t = 640)]
    pub imgsz: u32,

    /// Batch size (-1 lets the tool pick one)
    #[arg(long, default_value_t = 16, allow_negative_numbers = true)]
    pub batch: i32,

    /// Training device: auto, cpu, mps, or CUDA device ids such as 0 or 0,1
    #[arg(long, default_value = "auto")]
    pub device: String,

    /// Output folder for training runs
    #[arg(long)]
    pub project: PathBuf,

    /// Optimizer
    #[arg(long, value_enum, default_value_t = Optimizer::Sgd)]
    pub optimizer: Optimizer,

    /// Initial learning rate
    #[arg(long, default_value_t = 0.01)]
    pub lr0: f64,

    /// Weight decay (regularization strength)
    #[arg(long, default_value_t = 0.0005)]
    pub weight_decay: f64,

    /// Mosaic augmentation (on unless --no-mosaic is given)
    #[arg(long = "no-mosaic", action = ArgAction::SetFalse)]
    pub mosaic: bool,

    /// MixUp probability
    #[arg(long, default_value_t = 0.0)]
    pub mixup: f64,

    /// Flip augmentation direction
    #[arg(long, value_enum, default_value_t = Flip::None)]
    pub flip: Flip,

    /// Rotation range in degrees
    #[arg(long, default_value_t = 0.0)]
    pub degrees: f64,

    /// Translation fraction
    #[arg(long, default_value_t = 0.1)]
    pub translate: f64,

    /// Shear range in degrees
    #[arg(long, default_value_t = 0.0)]
    pub shear: f64,

    /// Scale gain
    #[arg(long, default_value_t = 0.5)]
    pub scale: f64,

    /// Epochs without improvement before early stopping
    #[arg(long, default_value_t = 50)]
    pub patience: u32,

    /// Automatic mixed precision (on unless --no-amp is given)
    #[arg(long = "no-amp", action = ArgAction::SetFalse)]
    pub amp: bool,

    /// Resume the last interrupted run
    #[arg(long)]
    pub resume: bool,

    /// Custom model definition (.yaml) to build the model from
    #[arg(long)]
    pub cfg: Option<PathBuf>,
}

impl TrainConfig {
    /// Check every value and report all failures at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !has_extension(&self.model, "pt") {
            errors.push("model must be a .pt weights file".to_string());
        }
        if !has_extension(&self.data, "yaml") {
            errors.push("data must be a .yaml dataset configuration".to_string());
        }
        if self.project.as_os_str().is_empty() {
            errors.push("project output folder is required".to_string());
        }
        if let Some(cfg) = &self.cfg
            && cfg.as_os_str().is_empty()
        {
            errors.push("cfg must name a model YAML file when given".to_string());
        }
        if self.device.trim().is_empty() {
            errors.push("device must not be empty".to_string());
        }

        check_range(&mut errors, "epochs", self.epochs, 1..=1000);
        check_range(&mut errors, "imgsz", self.imgsz, 32..=2048);
        check_range(&mut errors, "batch", self.batch, -1..=256);
        check_range(&mut errors, "patience", self.patience, 0..=100);
        check_float(&mut errors, "lr0", self.lr0, 0.00001..=1.0);
        check_float(&mut errors, "weight_decay", self.weight_decay, 0.0..=1.0);
        check_float(&mut errors, "mixup", self.mixup, 0.0..=1.0);
        check_float(&mut errors, "degrees", self.degrees, 0.0..=180.0);
        check_float(&mut errors, "translate", self.translate, 0.0..=1.0);
        check_float(&mut errors, "shear", self.shear, 0.0..=180.0);
        check_float(&mut errors, "scale", self.scale, 0.0..=1.0);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Training tool arguments, in the order the tool documents them
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            TRAIN_SUBCOMMAND.to_string(),
            format!("model={}", self.model.display()),
            format!("data={}", self.data.display()),
            format!("epochs={}", self.epochs),
            format!("imgsz={}", self.imgsz),
            format!("batch={}", self.batch),
        ];
        if let Some(device) = resolve_device(&self.device) {
            args.push(format!("device={device}"));
        }
        args.extend([
            "save_period=1".to_string(),
            "exist_ok=True".to_string(),
            "verbose=False".to_string(),
            format!("project={}", self.project.display()),
            format!("optimizer={}", self.optimizer.as_arg()),
            format!("lr0={}", float_arg(self.lr0)),
            format!("weight_decay={}", float_arg(self.weight_decay)),
            format!("mosaic={}", switch_arg(self.mosaic)),
            format!("mixup={}", float_arg(self.mixup)),
            format!("flipud={}", switch_arg(self.flip.vertical())),
            format!("fliplr={}", switch_arg(self.flip.horizontal())),
            format!("degrees={}", float_arg(self.degrees)),
            format!("translate={}", float_arg(self.translate)),
            format!("shear={}", float_arg(self.shear)),
            format!("scale={}", float_arg(self.scale)),
            format!("patience={}", self.patience),
            format!("amp={}", bool_arg(self.amp)),
            format!("resume={}", bool_arg(self.resume)),
        ]);

        if let Some(cfg) = &self.cfg {
            args.push(format!("cfg={}", cfg.display()));
        }

        args
    }

    /// Build the invocation of `command` for this configuration
    pub fn to_invocation(&self, command: &str) -> Invocation {
        Invocation::new(command, self.args())
    }
}

/// Device argument to pass for `device`
///
/// Apple silicon resolves `auto` to `mps`. Elsewhere `auto` gives `None` and
/// the device argument is left out, so the training tool picks a CUDA GPU when
/// one is available and the CPU otherwise.
pub fn resolve_device(device: &str) -> Option<&str> {
    if device != "auto" {
        return Some(device);
    }
    cfg!(all(target_os = "macos", target_arch = "aarch64")).then_some("mps")
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

fn check_range<T>(errors: &mut Vec<String>, name: &str, value: T, range: RangeInclusive<T>)
where
    T: PartialOrd + std::fmt::Display,
{
    if !range.contains(&value) {
        errors.push(format!(
            "{name} must be between {} and {} (got {value})",
            range.start(),
            range.end()
        ));
    }
}

fn check_float(errors: &mut Vec<String>, name: &str, value: f64, range: RangeInclusive<f64>) {
    if value.is_finite() {
        check_range(errors, name, value, range);
    } else {
        errors.push(format!("{name} must be a finite number"));
    }
}

/// Floats keep their decimal point (`1.0`, not `1`)
fn float_arg(value: f64) -> String {
    format!("{value:?}")
}

fn switch_arg(enabled: bool) -> &'static str {
    if enabled { "1.0" } else { "0.0" }
}

fn bool_arg(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        config: TrainConfig,
    }

    fn parse(extra: &[&str]) -> TrainConfig {
        let mut argv = vec![
            "train-runner",
            "--model",
            "yolov8n.pt",
            "--data",
            "coco.yaml",
            "--project",
            "runs",
            "--device",
            "cpu",
        ];
        argv.extend_from_slice(extra);
        Cli::try_parse_from(argv).unwrap().config
    }

    #[test]
    fn train_config_defaults_build_expected_command_line() {
        let invocation = parse(&[]).to_invocation("yolo");
        insta::assert_snapshot!(invocation.to_string(), @"yolo train model=yolov8n.pt data=coco.yaml epochs=100 imgsz=640 batch=16 device=cpu save_period=1 exist_ok=True verbose=False project=runs optimizer=SGD lr0=0.01 weight_decay=0.0005 mosaic=1.0 mixup=0.0 flipud=0.0 fliplr=0.0 degrees=0.0 translate=0.1 shear=0.0 scale=0.5 patience=50 amp=True resume=False");
    }

    #[test]
    fn train_config_args_reflect_options() {
        let config = parse(&[
            "--epochs",
            "3",
            "--batch",
            "-1",
            "--optimizer",
            "AdamW",
            "--no-mosaic",
            "--no-amp",
            "--resume",
            "--mixup",
            "0.2",
            "--cfg",
            "custom.yaml",
        ]);
        let args = config.args();

        assert_eq!(args[0], "train");
        assert!(args.contains(&"epochs=3".to_string()));
        assert!(args.contains(&"batch=-1".to_string()));
        assert!(args.contains(&"optimizer=AdamW".to_string()));
        assert!(args.contains(&"mosaic=0.0".to_string()));
        assert!(args.contains(&"mixup=0.2".to_string()));
        assert!(args.contains(&"amp=False".to_string()));
        assert!(args.contains(&"resume=True".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("cfg=custom.yaml"));
    }

    #[rstest]
    #[case("none", "flipud=0.0", "fliplr=0.0")]
    #[case("horizontal", "flipud=0.0", "fliplr=1.0")]
    #[case("vertical", "flipud=1.0", "fliplr=0.0")]
    #[case("both", "flipud=1.0", "fliplr=1.0")]
    fn train_config_args_map_flip_direction(
        #[case] flip: &str,
        #[case] flipud: &str,
        #[case] fliplr: &str,
    ) {
        let args = parse(&["--flip", flip]).args();
        assert!(args.contains(&flipud.to_string()));
        assert!(args.contains(&fliplr.to_string()));
    }

    #[test]
    fn train_config_validate_accepts_defaults() {
        assert_eq!(parse(&[]).validate(), Ok(()));
    }

    #[test]
    fn train_config_validate_reports_every_failure() {
        let mut config = parse(&["--epochs", "0", "--lr0", "2.0"]);
        config.model = PathBuf::from("weights.bin");
        config.data = PathBuf::from("dataset.json");

        let Err(ConfigError::Invalid(errors)) = config.validate() else {
            panic!("expected validation errors");
        };

        assert_eq!(errors.len(), 4);
        assert!(errors[0].contains("model"));
        assert!(errors[1].contains("data"));
        assert!(errors.iter().any(|e| e.starts_with("epochs")));
        assert!(errors.iter().any(|e| e.starts_with("lr0")));
    }

    #[rstest]
    #[case(&["--imgsz", "16"], "imgsz")]
    #[case(&["--batch", "-2"], "batch")]
    #[case(&["--patience", "101"], "patience")]
    #[case(&["--degrees", "181"], "degrees")]
    #[case(&["--scale", "1.5"], "scale")]
    fn train_config_validate_rejects_out_of_range(#[case] extra: &[&str], #[case] field: &str) {
        let Err(ConfigError::Invalid(errors)) = parse(extra).validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with(field), "unexpected error: {}", errors[0]);
    }

    #[test]
    fn train_config_validate_rejects_empty_cfg() {
        let mut config = parse(&[]);
        config.cfg = Some(PathBuf::new());

        let Err(ConfigError::Invalid(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("cfg"));
    }

    #[test]
    fn train_config_validate_rejects_nan() {
        let mut config = parse(&[]);
        config.translate = f64::NAN;

        assert_eq!(
            config.validate(),
            Err(ConfigError::Invalid(vec![
                "translate must be a finite number".to_string()
            ]))
        );
    }

    #[test]
    fn train_config_mosaic_and_amp_default_on() {
        let config = parse(&[]);
        assert!(config.mosaic);
        assert!(config.amp);
    }

    #[rstest]
    #[case("cpu")]
    #[case("0,1")]
    #[case("mps")]
    fn resolve_device_keeps_explicit_device(#[case] device: &str) {
        assert_eq!(resolve_device(device), Some(device));
    }

    #[test]
    fn train_config_auto_device_leaves_choice_to_tool_off_apple_silicon() {
        let mut config = parse(&[]);
        config.device = "auto".to_string();
        let devices: Vec<_> = config
            .args()
            .into_iter()
            .filter(|arg| arg.starts_with("device="))
            .collect();

        if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
            assert_eq!(devices, vec!["device=mps".to_string()]);
        } else {
            assert!(devices.is_empty());
        }
    }
}
