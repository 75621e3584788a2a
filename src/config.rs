use std::path::PathBuf;
use std::str::FromStr;

use crate::screenshot::ScreenshotConfig;
use crate::simulation::SimulationConfig;

pub const USAGE: &str = "\
Usage: rn-orbit [OPTIONS]

Integrates a test-particle geodesic around a Reissner-Nordström black hole
and plots the orbit in the equatorial plane.

Metric:
  --mass <M>          black hole mass (default 1.0)
  --charge <Q>        black hole charge (default 0.5)

Initial state:
  --r0 <r>            radial coordinate (default 10.0)
  --phi0 <phi>        azimuthal angle (default 0.0)
  --pr0 <p_r>         radial momentum (default 0.0)
  --pphi0 <p_phi>     angular momentum (default 4.0)

Integration:
  --t-start <t>       start of the time span (default 0)
  --t-end <t>         end of the time span (default 100)
  --samples <n>       number of output samples (default 10000)
  --rtol <tol>        relative tolerance (default 1e-3)
  --atol <tol>        absolute tolerance (default 1e-6)
  --max-step <h>      largest solver step (default unbounded)
  --first-step <h>    initial solver step (default estimated)

Output:
  --screenshot        render to a PNG instead of opening a window
  --output <path>     PNG path (default orbit.png, implies --screenshot)
  --width <px>        image width (default 1280)
  --height <px>       image height (default 960)
  -h, --help          print this message
";

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    /// Headless PNG output; the plot is shown in a window when `None`.
    pub screenshot: Option<ScreenshotConfig>,
    pub show_help: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    UnknownFlag(String),
    MissingValue { flag: String },
    InvalidValue { flag: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::UnknownFlag(flag) => write!(f, "Unknown option '{}'", flag),
            ConfigError::MissingValue { flag } => write!(f, "Missing value for {}", flag),
            ConfigError::InvalidValue { flag, value } => {
                write!(f, "Invalid value '{}' for {}", value, flag)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub fn parse_args() -> Result<RunConfig, ConfigError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    RunConfig::from_args(&args)
}

fn parse_value<T: FromStr>(flag: &str, value: Option<&String>) -> Result<T, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::MissingValue {
        flag: flag.to_string(),
    })?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: value.clone(),
    })
}

fn parse_pixels(flag: &str, value: Option<&String>) -> Result<u32, ConfigError> {
    let px: u32 = parse_value(flag, value)?;
    if px == 0 {
        return Err(ConfigError::InvalidValue {
            flag: flag.to_string(),
            value: px.to_string(),
        });
    }
    Ok(px)
}

impl RunConfig {
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut config = RunConfig::default();
        let mut shot = ScreenshotConfig::default();
        let mut headless = false;

        let sim = &mut config.simulation;
        let mut iter = args.iter();
        while let Some(flag) = iter.next() {
            let flag = flag.as_str();
            match flag {
                "-h" | "--help" => config.show_help = true,
                "--mass" => sim.params.mass = parse_value(flag, iter.next())?,
                "--charge" => sim.params.charge = parse_value(flag, iter.next())?,
                "--r0" => sim.initial.r = parse_value(flag, iter.next())?,
                "--phi0" => sim.initial.phi = parse_value(flag, iter.next())?,
                "--pr0" => sim.initial.p_r = parse_value(flag, iter.next())?,
                "--pphi0" => sim.initial.p_phi = parse_value(flag, iter.next())?,
                "--t-start" => sim.t_span.0 = parse_value(flag, iter.next())?,
                "--t-end" => sim.t_span.1 = parse_value(flag, iter.next())?,
                "--samples" => sim.samples = parse_value(flag, iter.next())?,
                "--rtol" => sim.tolerances.rtol = parse_value(flag, iter.next())?,
                "--atol" => sim.tolerances.atol = parse_value(flag, iter.next())?,
                "--max-step" => sim.max_step = parse_value(flag, iter.next())?,
                "--first-step" => sim.first_step = Some(parse_value(flag, iter.next())?),
                "--screenshot" => headless = true,
                "--output" => {
                    let path: String = parse_value(flag, iter.next())?;
                    shot.output = PathBuf::from(path);
                    headless = true;
                }
                "--width" => shot.width = parse_pixels(flag, iter.next())?,
                "--height" => shot.height = parse_pixels(flag, iter.next())?,
                other => return Err(ConfigError::UnknownFlag(other.to_string())),
            }
        }

        if headless {
            config.screenshot = Some(shot);
        }
        Ok(config)
    }
}
