//! Built-in environment presets.
//!
//! Presets are plain constructors: `EnvConfig::preset(id)` returns a fresh
//! configuration the caller owns and may edit. There is no global registry.

use crate::config::{ActionConfig, ActionKind, EngineConfig, EnvConfig, RunPeriod};
use crate::reward::RewardConfig;
use crate::wrappers::RangeTable;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Engine program used when a preset is not given one explicitly.
pub const DEFAULT_ENGINE_PROGRAM: &str = "hvacgym-engine";

/// Output variables of the 5-zone reference building.
pub const DEFAULT_5ZONE_OBSERVATION_VARIABLES: [&str; 16] = [
    "Site Outdoor Air Drybulb Temperature(Environment)",
    "Site Outdoor Air Relative Humidity(Environment)",
    "Site Wind Speed(Environment)",
    "Site Wind Direction(Environment)",
    "Site Diffuse Solar Radiation Rate per Area(Environment)",
    "Site Direct Solar Radiation Rate per Area(Environment)",
    "Zone Thermostat Heating Setpoint Temperature(SPACE1-1)",
    "Zone Thermostat Cooling Setpoint Temperature(SPACE1-1)",
    "Zone Air Temperature(SPACE1-1)",
    "Zone Thermal Comfort Mean Radiant Temperature(SPACE1-1 PEOPLE 1)",
    "Zone Air Relative Humidity(SPACE1-1)",
    "Zone Thermal Comfort Clothing Value(SPACE1-1 PEOPLE 1)",
    "Zone Thermal Comfort Fanger Model PPD(SPACE1-1 PEOPLE 1)",
    "Zone People Occupant Count(SPACE1-1)",
    "People Air Temperature(SPACE1-1 PEOPLE 1)",
    "Facility Total HVAC Electricity Demand Rate(Whole Building)",
];

/// Zone temperature used by the default reward.
pub const DEFAULT_5ZONE_TEMPERATURE_VARIABLE: &str = "Zone Air Temperature(SPACE1-1)";

/// Electric demand used by the default reward.
pub const DEFAULT_5ZONE_ENERGY_VARIABLE: &str =
    "Facility Total HVAC Electricity Demand Rate(Whole Building)";

/// Setpoints written by the controller.
pub const DEFAULT_5ZONE_ACTION_VARIABLES: [&str; 2] = ["Heating_Setpoint_RL", "Cooling_Setpoint_RL"];

/// (heating, cooling) setpoints for each discrete action.
pub const DEFAULT_5ZONE_ACTION_MAPPING: [[f64; 2]; 10] = [
    [15.0, 30.0],
    [16.0, 29.0],
    [17.0, 28.0],
    [18.0, 27.0],
    [19.0, 26.0],
    [20.0, 25.0],
    [21.0, 24.0],
    [22.0, 23.0],
    [22.0, 22.0],
    [21.0, 21.0],
];

/// Continuous setpoint bounds (heating, cooling).
pub const DEFAULT_5ZONE_ACTION_LOW: [f64; 2] = [15.0, 22.5];
pub const DEFAULT_5ZONE_ACTION_HIGH: [f64; 2] = [22.5, 30.0];

/// Normalization ranges for the 5-zone building, including the
/// calendar variables and the fields added by the datetime encoding.
pub const RANGES_5ZONE: [(&str, f64, f64); 27] = [
    ("year", 1989.0, 2022.0),
    ("month", 1.0, 12.0),
    ("day", 1.0, 31.0),
    ("hour", 0.0, 23.0),
    ("is_weekend", 0.0, 1.0),
    ("month_sin", -1.0, 1.0),
    ("month_cos", -1.0, 1.0),
    ("hour_sin", -1.0, 1.0),
    ("hour_cos", -1.0, 1.0),
    ("Site Outdoor Air Drybulb Temperature(Environment)", -31.05, 60.7),
    ("Site Outdoor Air Relative Humidity(Environment)", 3.0, 100.0),
    ("Site Wind Speed(Environment)", 0.0, 23.1),
    ("Site Wind Direction(Environment)", 0.0, 357.5),
    ("Site Diffuse Solar Radiation Rate per Area(Environment)", 0.0, 588.0),
    ("Site Direct Solar Radiation Rate per Area(Environment)", 0.0, 1033.0),
    ("Zone Thermostat Heating Setpoint Temperature(SPACE1-1)", 15.0, 22.5),
    ("Zone Thermostat Cooling Setpoint Temperature(SPACE1-1)", 21.0, 30.0),
    ("Zone Air Temperature(SPACE1-1)", 15.225_652_646_534_51, 30.008_266_553_792_67),
    ("Zone Thermal Comfort Mean Radiant Temperature(SPACE1-1 PEOPLE 1)", 0.0, 35.988_534_967_785_08),
    ("Zone Air Relative Humidity(SPACE1-1)", 3.287_277_410_867_427, 87.292_838_539_271_44),
    ("Zone Thermal Comfort Clothing Value(SPACE1-1 PEOPLE 1)", 0.0, 1.0),
    ("Zone Thermal Comfort Fanger Model PPD(SPACE1-1 PEOPLE 1)", 0.0, 98.371_412_594_446_84),
    ("Zone People Occupant Count(SPACE1-1)", 0.0, 11.0),
    ("People Air Temperature(SPACE1-1 PEOPLE 1)", 0.0, 30.008_266_553_792_67),
    ("Facility Total HVAC Electricity Demand Rate(Whole Building)", 173.658_369_273_838_6, 32_595.572_592_617_67),
    ("Heating_Setpoint_RL", 15.0, 22.5),
    ("Cooling_Setpoint_RL", 22.5, 30.0),
];

/// Weather climates shipped with the 5-zone presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Climate {
    Hot,
    Mixed,
    Cool,
}

impl Climate {
    /// Weather file for this climate.
    pub fn weather_file(&self) -> &'static str {
        match self {
            Climate::Hot => "USA_AZ_Davis-Monthan.AFB.722745_TMY3.epw",
            Climate::Mixed => "USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY3.epw",
            Climate::Cool => "USA_WA_Port.Angeles-William.R.Fairchild.Intl.AP.727885_TMY3.epw",
        }
    }
}

/// Environment identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentId {
    /// Small demo: 5-zone building, hot weather, discrete actions
    Demo,

    FiveZoneHotDiscrete,
    FiveZoneMixedDiscrete,
    FiveZoneCoolDiscrete,
    FiveZoneHotContinuous,
    FiveZoneMixedContinuous,
    FiveZoneCoolContinuous,
}

impl EnvironmentId {
    /// Returns a list of all environments.
    pub fn all() -> Vec<EnvironmentId> {
        vec![
            EnvironmentId::Demo,
            EnvironmentId::FiveZoneHotDiscrete,
            EnvironmentId::FiveZoneMixedDiscrete,
            EnvironmentId::FiveZoneCoolDiscrete,
            EnvironmentId::FiveZoneHotContinuous,
            EnvironmentId::FiveZoneMixedContinuous,
            EnvironmentId::FiveZoneCoolContinuous,
        ]
    }

    /// Returns the environment name.
    pub fn name(&self) -> &'static str {
        match self {
            EnvironmentId::Demo => "Eplus-demo-v1",
            EnvironmentId::FiveZoneHotDiscrete => "Eplus-5Zone-hot-discrete-v1",
            EnvironmentId::FiveZoneMixedDiscrete => "Eplus-5Zone-mixed-discrete-v1",
            EnvironmentId::FiveZoneCoolDiscrete => "Eplus-5Zone-cool-discrete-v1",
            EnvironmentId::FiveZoneHotContinuous => "Eplus-5Zone-hot-continuous-v1",
            EnvironmentId::FiveZoneMixedContinuous => "Eplus-5Zone-mixed-continuous-v1",
            EnvironmentId::FiveZoneCoolContinuous => "Eplus-5Zone-cool-continuous-v1",
        }
    }

    /// Weather climate of this environment.
    pub fn climate(&self) -> Climate {
        match self {
            EnvironmentId::Demo
            | EnvironmentId::FiveZoneHotDiscrete
            | EnvironmentId::FiveZoneHotContinuous => Climate::Hot,
            EnvironmentId::FiveZoneMixedDiscrete | EnvironmentId::FiveZoneMixedContinuous => {
                Climate::Mixed
            }
            EnvironmentId::FiveZoneCoolDiscrete | EnvironmentId::FiveZoneCoolContinuous => {
                Climate::Cool
            }
        }
    }

    /// Returns true for continuous-action environments.
    pub fn is_continuous(&self) -> bool {
        matches!(
            self,
            EnvironmentId::FiveZoneHotContinuous
                | EnvironmentId::FiveZoneMixedContinuous
                | EnvironmentId::FiveZoneCoolContinuous
        )
    }
}

impl std::fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for EnvironmentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnvironmentId::all()
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(s))
            .or_else(|| match s.to_lowercase().as_str() {
                "demo" => Some(EnvironmentId::Demo),
                "5zone-hot-discrete" => Some(EnvironmentId::FiveZoneHotDiscrete),
                "5zone-mixed-discrete" => Some(EnvironmentId::FiveZoneMixedDiscrete),
                "5zone-cool-discrete" => Some(EnvironmentId::FiveZoneCoolDiscrete),
                "5zone-hot-continuous" => Some(EnvironmentId::FiveZoneHotContinuous),
                "5zone-mixed-continuous" => Some(EnvironmentId::FiveZoneMixedContinuous),
                "5zone-cool-continuous" => Some(EnvironmentId::FiveZoneCoolContinuous),
                _ => None,
            })
            .ok_or_else(|| format!("Unknown environment: {}", s))
    }
}

impl EnvConfig {
    /// Returns the configuration of a built-in environment.
    pub fn preset(id: EnvironmentId) -> Self {
        let kind = if id.is_continuous() {
            ActionKind::Continuous {
                low: DEFAULT_5ZONE_ACTION_LOW.to_vec(),
                high: DEFAULT_5ZONE_ACTION_HIGH.to_vec(),
            }
        } else {
            ActionKind::Discrete {
                mapping: DEFAULT_5ZONE_ACTION_MAPPING.iter().map(|m| m.to_vec()).collect(),
            }
        };

        Self {
            env_name: id.name().to_string(),
            output_root: PathBuf::from("."),
            engine: EngineConfig::new(DEFAULT_ENGINE_PROGRAM),
            building: PathBuf::from("5ZoneAutoDXVAV.idf"),
            weather: PathBuf::from(id.climate().weather_file()),
            observation_variables: DEFAULT_5ZONE_OBSERVATION_VARIABLES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            action: ActionConfig {
                variables: DEFAULT_5ZONE_ACTION_VARIABLES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                kind,
            },
            timesteps_per_hour: 4,
            run_period: RunPeriod {
                start: NaiveDate::from_ymd_opt(1991, 1, 1).unwrap_or(NaiveDate::MIN),
                end: NaiveDate::from_ymd_opt(1991, 12, 31).unwrap_or(NaiveDate::MIN),
            },
            max_episode_steps: None,
            start_timeout_ms: 30_000,
            terminate_timeout_ms: 2_000,
        }
    }
}

impl RewardConfig {
    /// Default linear reward for the 5-zone building.
    pub fn five_zone() -> Self {
        RewardConfig::linear(
            vec![DEFAULT_5ZONE_TEMPERATURE_VARIABLE.to_string()],
            DEFAULT_5ZONE_ENERGY_VARIABLE.to_string(),
        )
    }
}

impl RangeTable {
    /// Ranges for the 5-zone building.
    pub fn five_zone() -> Self {
        RANGES_5ZONE
            .iter()
            .map(|(name, min, max)| (name.to_string(), (*min, *max)))
            .collect()
    }
}
