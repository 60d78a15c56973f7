//! Building oracle - the toy thermal model behind the mock engine.
//!
//! A single conditioned zone coupled to a synthetic weather signal:
//!
//! - outdoor temperature follows a seasonal and a daily sine plus Gaussian noise
//! - the zone drifts toward outdoor temperature through the envelope
//! - HVAC pulls the zone back inside `[heating, cooling]` setpoints, and the
//!   HVAC electricity demand grows with the correction it had to apply
//!
//! All randomness comes from one seeded ChaCha8 stream, so a seed fully
//! determines an episode.

use chrono::Datelike;
use chrono::NaiveDate;
use hvacgym_core::calendar::{is_weekend, SimDate};
use hvacgym_core::presets::RANGES_5ZONE;
use hvacgym_env::EnvError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

/// HVAC demand with every coil idle (W)
pub const BASE_POWER: f64 = 173.658_369_273_838_6;

/// Demand per degree of correction per hour (W)
const POWER_PER_DEGREE_HOUR: f64 = 1_500.0;

/// Envelope coupling to outdoor air (1/h)
const ENVELOPE_RATE: f64 = 0.3;

/// HVAC response rate (1/h)
const HVAC_RATE: f64 = 4.0;

const SEASONAL_AMPLITUDE: f64 = 10.0;
const DAILY_AMPLITUDE: f64 = 5.0;
const MAX_OCCUPANTS: f64 = 11.0;

/// Setpoints in force until the first action arrives
pub const INITIAL_SETPOINTS: [f64; 2] = [20.0, 23.5];

/// Engine output a variable name maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    OutdoorTemperature,
    OutdoorHumidity,
    WindSpeed,
    WindDirection,
    DiffuseSolar,
    DirectSolar,
    HeatingSetpoint,
    CoolingSetpoint,
    PeopleTemperature,
    ZoneTemperature,
    RadiantTemperature,
    ZoneHumidity,
    Clothing,
    Ppd,
    Occupancy,
    HvacPower,

    /// Reported as 0
    Unknown,
}

impl Signal {
    /// Classifies an output variable by its name.
    pub fn from_variable(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        let has = |needle: &str| name.contains(needle);

        if has("outdoor air drybulb") {
            Signal::OutdoorTemperature
        } else if has("outdoor air relative humidity") {
            Signal::OutdoorHumidity
        } else if has("wind speed") {
            Signal::WindSpeed
        } else if has("wind direction") {
            Signal::WindDirection
        } else if has("diffuse solar") {
            Signal::DiffuseSolar
        } else if has("direct solar") {
            Signal::DirectSolar
        } else if has("heating setpoint") {
            Signal::HeatingSetpoint
        } else if has("cooling setpoint") {
            Signal::CoolingSetpoint
        } else if has("people air temperature") {
            Signal::PeopleTemperature
        } else if has("mean radiant") {
            Signal::RadiantTemperature
        } else if has("zone air temperature") {
            Signal::ZoneTemperature
        } else if has("zone air relative humidity") {
            Signal::ZoneHumidity
        } else if has("clothing") {
            Signal::Clothing
        } else if has("ppd") {
            Signal::Ppd
        } else if has("occupant count") {
            Signal::Occupancy
        } else if has("electricity demand") {
            Signal::HvacPower
        } else {
            Signal::Unknown
        }
    }
}

/// Mean annual outdoor temperature for a weather file name.
pub fn mean_outdoor_temperature(weather: &str) -> f64 {
    if weather.contains("_AZ_") {
        22.0
    } else if weather.contains("_NY_") {
        13.0
    } else if weather.contains("_WA_") {
        10.0
    } else {
        15.0
    }
}

/// Weather and occupancy of one timestep.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Conditions {
    outdoor_temperature: f64,
    outdoor_humidity: f64,
    wind_speed: f64,
    wind_direction: f64,
    diffuse_solar: f64,
    direct_solar: f64,
    occupants: f64,
    summer: bool,
}

/// Ground-truth state of the simulated building.
pub struct BuildingOracle {
    rng: ChaCha8Rng,
    noise: Normal<f64>,

    /// Output variables, in frame order
    signals: Vec<Signal>,
    ranges: Vec<Option<(f64, f64)>>,

    start: NaiveDate,
    step_size: f64,
    sim_time: f64,
    mean_outdoor: f64,

    conditions: Conditions,
    zone_temperature: f64,
    setpoints: [f64; 2],
    hvac_power: f64,
}

impl BuildingOracle {
    /// Creates an oracle reporting `variables`, at `sim_time = 0`.
    pub fn new(
        seed: u64,
        start: NaiveDate,
        step_size: u64,
        variables: &[String],
    ) -> Result<Self, EnvError> {
        if step_size == 0 {
            return Err(EnvError::configuration("step size must be positive"));
        }
        let noise = Normal::new(0.0, 1.0)
            .map_err(|e| EnvError::configuration(format!("noise distribution: {}", e)))?;

        let signals = variables.iter().map(|v| Signal::from_variable(v)).collect();
        let ranges = variables
            .iter()
            .map(|v| {
                RANGES_5ZONE
                    .iter()
                    .find(|(name, _, _)| name == v)
                    .map(|(_, min, max)| (*min, *max))
            })
            .collect();

        let mut oracle = Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise,
            signals,
            ranges,
            start,
            step_size: step_size as f64,
            sim_time: 0.0,
            mean_outdoor: 15.0,
            conditions: Conditions::default(),
            zone_temperature: INITIAL_SETPOINTS[0] + 1.0,
            setpoints: INITIAL_SETPOINTS,
            hvac_power: BASE_POWER,
        };
        oracle.conditions = oracle.sample_conditions()?;
        Ok(oracle)
    }

    /// Sets the climate and re-samples the current weather.
    pub fn with_mean_outdoor(mut self, mean: f64) -> Result<Self, EnvError> {
        self.mean_outdoor = mean;
        self.conditions = self.sample_conditions()?;
        Ok(self)
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn zone_temperature(&self) -> f64 {
        self.zone_temperature
    }

    pub fn hvac_power(&self) -> f64 {
        self.hvac_power
    }

    /// Applies `[heating, cooling]` setpoints; extra values are ignored,
    /// missing ones keep their previous value.
    pub fn apply_setpoints(&mut self, setpoints: &[f64]) {
        for (current, new) in self.setpoints.iter_mut().zip(setpoints) {
            *current = *new;
        }
    }

    /// Advances one timestep.
    pub fn advance(&mut self) -> Result<(), EnvError> {
        self.sim_time += self.step_size;
        self.conditions = self.sample_conditions()?;

        let hours = self.step_size / 3600.0;
        let c = &self.conditions;

        let envelope = ENVELOPE_RATE * hours * (c.outdoor_temperature - self.zone_temperature);
        let gains = 0.05 * hours * c.occupants;
        self.zone_temperature += envelope + gains;

        let [heating, cooling] = self.setpoints;
        let target = if self.zone_temperature < heating {
            heating
        } else if self.zone_temperature > cooling.max(heating) {
            cooling.max(heating)
        } else {
            self.zone_temperature
        };
        let correction = (target - self.zone_temperature) * (1.0 - (-HVAC_RATE * hours).exp());
        self.zone_temperature = (self.zone_temperature + correction).clamp(15.3, 30.0);

        let jitter = 10.0 * self.noise.sample(&mut self.rng);
        self.hvac_power = (BASE_POWER + POWER_PER_DEGREE_HOUR * correction.abs() / hours + jitter)
            .clamp(BASE_POWER, 32_595.0);
        Ok(())
    }

    /// Current value of every output variable, in frame order.
    pub fn observe(&self) -> Vec<f64> {
        self.signals
            .iter()
            .zip(&self.ranges)
            .map(|(signal, range)| {
                let value = self.value_of(*signal);
                match range {
                    Some((min, max)) => value.clamp(*min, *max),
                    None => value,
                }
            })
            .collect()
    }

    fn value_of(&self, signal: Signal) -> f64 {
        let c = &self.conditions;
        let zone = self.zone_temperature;
        match signal {
            Signal::OutdoorTemperature => c.outdoor_temperature,
            Signal::OutdoorHumidity => c.outdoor_humidity,
            Signal::WindSpeed => c.wind_speed,
            Signal::WindDirection => c.wind_direction,
            Signal::DiffuseSolar => c.diffuse_solar,
            Signal::DirectSolar => c.direct_solar,
            Signal::HeatingSetpoint => self.setpoints[0],
            Signal::CoolingSetpoint => self.setpoints[1],
            Signal::ZoneTemperature | Signal::PeopleTemperature => zone,
            Signal::RadiantTemperature => 0.8 * zone + 0.2 * c.outdoor_temperature,
            Signal::ZoneHumidity => 20.0 + 0.4 * c.outdoor_humidity,
            Signal::Clothing => {
                if c.summer {
                    0.5
                } else {
                    1.0
                }
            }
            Signal::Ppd => {
                let pmv = (zone - 23.0) / 2.5;
                100.0 - 95.0 * (-0.03353 * pmv.powi(4) - 0.2179 * pmv.powi(2)).exp()
            }
            Signal::Occupancy => c.occupants,
            Signal::HvacPower => self.hvac_power,
            Signal::Unknown => 0.0,
        }
    }

    fn sample_conditions(&mut self) -> Result<Conditions, EnvError> {
        let date = SimDate::from_sim_time(self.start, self.sim_time)?;
        let day_of_year = NaiveDate::from_ymd_opt(date.year, date.month, date.day)
            .map(|d| f64::from(d.ordinal()))
            .unwrap_or(1.0);
        let hour = (self.sim_time % 86_400.0) / 3600.0;

        let seasonal = SEASONAL_AMPLITUDE * (2.0 * PI * (day_of_year - 105.0) / 365.0).sin();
        let daily = DAILY_AMPLITUDE * (2.0 * PI * (hour - 9.0) / 24.0).sin();
        let outdoor_temperature =
            self.mean_outdoor + seasonal + daily + 0.5 * self.noise.sample(&mut self.rng);

        let outdoor_humidity =
            (60.0 - 4.0 * daily + 3.0 * self.noise.sample(&mut self.rng)).clamp(3.0, 100.0);
        let wind_speed = (3.0 + 1.5 * self.noise.sample(&mut self.rng)).abs();
        let wind_direction = self.rng.gen_range(0.0..357.5);

        let sun = (PI * (hour - 6.0) / 12.0).sin().max(0.0);
        let diffuse_solar = 150.0 * sun;
        let direct_solar = 600.0 * sun * self.rng.gen_range(0.6..1.0);

        let working_hours = (8.0..18.0).contains(&hour);
        let occupants = if working_hours && !is_weekend(date.year, date.month, date.day)? {
            MAX_OCCUPANTS
        } else {
            0.0
        };

        Ok(Conditions {
            outdoor_temperature,
            outdoor_humidity,
            wind_speed,
            wind_direction,
            diffuse_solar,
            direct_solar,
            occupants,
            summer: (6..=9).contains(&date.month),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hvacgym_core::presets::DEFAULT_5ZONE_OBSERVATION_VARIABLES;
    use proptest::prelude::*;

    fn variables() -> Vec<String> {
        DEFAULT_5ZONE_OBSERVATION_VARIABLES
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn january() -> NaiveDate {
        NaiveDate::from_ymd_opt(1991, 1, 1).unwrap()
    }

    #[test]
    fn test_every_5zone_variable_is_known() {
        for name in DEFAULT_5ZONE_OBSERVATION_VARIABLES {
            assert_ne!(Signal::from_variable(name), Signal::Unknown, "{}", name);
        }
        assert_eq!(Signal::from_variable("Zone Air Temperature(SPACE1-1)"), Signal::ZoneTemperature);
        assert_eq!(
            Signal::from_variable("People Air Temperature(SPACE1-1 PEOPLE 1)"),
            Signal::PeopleTemperature
        );
        assert_eq!(
            Signal::from_variable("Site Outdoor Air Relative Humidity(Environment)"),
            Signal::OutdoorHumidity
        );
    }

    #[test]
    fn test_unknown_variable_reports_zero() {
        let oracle = BuildingOracle::new(1, january(), 900, &["Pump Speed".to_string()]).unwrap();
        assert_eq!(oracle.observe(), vec![0.0]);
    }

    #[test]
    fn test_deterministic_per_seed() {
        let run = |seed| {
            let mut oracle = BuildingOracle::new(seed, january(), 900, &variables()).unwrap();
            for _ in 0..8 {
                oracle.advance().unwrap();
            }
            oracle.observe()
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn test_setpoints_are_reported() {
        let mut oracle = BuildingOracle::new(1, january(), 900, &variables()).unwrap();
        oracle.apply_setpoints(&[21.0, 25.0]);
        let values = oracle.observe();
        assert_eq!(values[6], 21.0);
        assert_eq!(values[7], 25.0);
    }

    #[test]
    fn test_heating_setpoint_warms_the_zone() {
        let run = |heating: f64| {
            let mut oracle = BuildingOracle::new(7, january(), 900, &variables())
                .unwrap()
                .with_mean_outdoor(10.0)
                .unwrap();
            oracle.apply_setpoints(&[heating, 30.0]);
            for _ in 0..96 {
                oracle.advance().unwrap();
            }
            oracle.zone_temperature()
        };
        assert!(run(22.0) > run(15.0));
    }

    #[test]
    fn test_sim_time_advances_by_step() {
        let mut oracle = BuildingOracle::new(1, january(), 900, &variables()).unwrap();
        oracle.advance().unwrap();
        oracle.advance().unwrap();
        assert_eq!(oracle.sim_time(), 1800.0);
    }

    proptest! {
        #[test]
        fn prop_values_stay_in_5zone_ranges(
            seed in any::<u64>(),
            heating in 15.0f64..22.5,
            cooling in 22.5f64..30.0,
            steps in 1usize..48,
        ) {
            let names = variables();
            let mut oracle = BuildingOracle::new(seed, january(), 900, &names).unwrap();
            oracle.apply_setpoints(&[heating, cooling]);
            for _ in 0..steps {
                oracle.advance().unwrap();
            }
            for (name, value) in names.iter().zip(oracle.observe()) {
                let (_, min, max) = RANGES_5ZONE.iter().find(|(n, _, _)| n == name).unwrap();
                prop_assert!(value.is_finite());
                prop_assert!(value >= *min && value <= *max, "{} = {}", name, value);
            }
        }
    }
}
