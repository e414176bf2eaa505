use std::fmt;
use std::fmt::Formatter;
use serde::Serialize;
use crate::errors::AqiError;
use crate::models::readings::PollutantReading;

/// Upper end of the AQI scale
pub const MAX_AQI: f64 = 500.0;

/// Conversion from µg/m³ to ppm for carbon monoxide at 25 °C
const CO_UGM3_PER_PPM: f64 = 1145.0;

/// One segment of a breakpoint table: a concentration range mapped to an AQI range
#[derive(Clone, Copy, Debug)]
pub struct Breakpoint {
    pub c_low: f64,
    pub c_high: f64,
    pub aqi_low: f64,
    pub aqi_high: f64,
}

const fn bp(c_low: f64, c_high: f64, aqi_low: f64, aqi_high: f64) -> Breakpoint {
    Breakpoint { c_low, c_high, aqi_low, aqi_high }
}

pub const PM25_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 12.0, 0.0, 50.0), bp(12.1, 35.4, 51.0, 100.0), bp(35.5, 55.4, 101.0, 150.0),
    bp(55.5, 150.4, 151.0, 200.0), bp(150.5, 250.4, 201.0, 300.0), bp(250.5, 500.0, 301.0, 500.0),
];

pub const PM10_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 54.0, 0.0, 50.0), bp(55.0, 154.0, 51.0, 100.0), bp(155.0, 254.0, 101.0, 150.0),
    bp(255.0, 354.0, 151.0, 200.0), bp(355.0, 424.0, 201.0, 300.0), bp(425.0, 604.0, 301.0, 500.0),
];

pub const O3_BREAKPOINTS: [Breakpoint; 5] = [
    bp(0.0, 54.0, 0.0, 50.0), bp(55.0, 70.0, 51.0, 100.0), bp(71.0, 85.0, 101.0, 150.0),
    bp(86.0, 105.0, 151.0, 200.0), bp(106.0, 200.0, 201.0, 300.0),
];

pub const NO2_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 53.0, 0.0, 50.0), bp(54.0, 100.0, 51.0, 100.0), bp(101.0, 360.0, 101.0, 150.0),
    bp(361.0, 649.0, 151.0, 200.0), bp(650.0, 1249.0, 201.0, 300.0), bp(1250.0, 2049.0, 301.0, 500.0),
];

/// Carbon monoxide table, in ppm
pub const CO_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 4.4, 0.0, 50.0), bp(4.5, 9.4, 51.0, 100.0), bp(9.5, 12.4, 101.0, 150.0),
    bp(12.5, 15.4, 151.0, 200.0), bp(15.5, 30.4, 201.0, 300.0), bp(30.5, 50.4, 301.0, 500.0),
];

pub const SO2_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 35.0, 0.0, 50.0), bp(36.0, 75.0, 51.0, 100.0), bp(76.0, 185.0, 101.0, 150.0),
    bp(186.0, 304.0, 151.0, 200.0), bp(305.0, 604.0, 201.0, 300.0), bp(605.0, 1004.0, 301.0, 500.0),
];

/// The six pollutants contributing to the overall AQI
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pollutant {
    Pm25,
    Pm10,
    O3,
    No2,
    Co,
    So2,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25, Pollutant::Pm10, Pollutant::O3, Pollutant::No2, Pollutant::Co, Pollutant::So2,
    ];

    /// Returns the breakpoint table for the pollutant
    pub fn breakpoints(&self) -> &'static [Breakpoint] {
        match self {
            Pollutant::Pm25 => &PM25_BREAKPOINTS,
            Pollutant::Pm10 => &PM10_BREAKPOINTS,
            Pollutant::O3 => &O3_BREAKPOINTS,
            Pollutant::No2 => &NO2_BREAKPOINTS,
            Pollutant::Co => &CO_BREAKPOINTS,
            Pollutant::So2 => &SO2_BREAKPOINTS,
        }
    }

    /// Converts a concentration in µg/m³ to the unit the pollutant's table is expressed in
    ///
    /// # Arguments
    ///
    /// * 'concentration' - concentration in µg/m³
    pub fn to_table_unit(&self, concentration: f64) -> f64 {
        match self {
            Pollutant::Co => concentration / CO_UGM3_PER_PPM,
            _ => concentration,
        }
    }

    fn concentration(&self, reading: &PollutantReading) -> f64 {
        match self {
            Pollutant::Pm25 => reading.pm25,
            Pollutant::Pm10 => reading.pm10,
            Pollutant::O3 => reading.o3,
            Pollutant::No2 => reading.no2,
            Pollutant::Co => reading.co,
            Pollutant::So2 => reading.so2,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Pollutant::Pm25 => write!(f, "PM2.5"),
            Pollutant::Pm10 => write!(f, "PM10"),
            Pollutant::O3 => write!(f, "O3"),
            Pollutant::No2 => write!(f, "NO2"),
            Pollutant::Co => write!(f, "CO"),
            Pollutant::So2 => write!(f, "SO2"),
        }
    }
}

/// Calculates the AQI sub-index for a concentration given a breakpoint table.
///
/// The result is the linear interpolation inside the segment holding the concentration,
/// rounded to the nearest integer. A concentration falling in the gap between two segments
/// is raised to the low bound of the upper segment, and anything above the last segment
/// is reported as the top of the AQI scale.
///
/// # Arguments
///
/// * 'concentration' - concentration in the unit of the table
/// * 'breakpoints' - the breakpoint table, ordered by concentration
pub fn sub_index(concentration: f64, breakpoints: &[Breakpoint]) -> Result<f64, AqiError> {
    if !concentration.is_finite() || concentration < 0.0 {
        return Err(AqiError::InvalidInput(format!("concentration {} is not a non-negative number", concentration)));
    }

    for b in breakpoints {
        if concentration <= b.c_high {
            let c = concentration.max(b.c_low);
            let aqi = (b.aqi_high - b.aqi_low) / (b.c_high - b.c_low) * (c - b.c_low) + b.aqi_low;
            return Ok(aqi.round());
        }
    }

    Ok(MAX_AQI)
}

/// Calculates the sub-index for one pollutant given its concentration in µg/m³
///
/// # Arguments
///
/// * 'pollutant' - the pollutant
/// * 'concentration' - concentration in µg/m³
pub fn pollutant_sub_index(pollutant: Pollutant, concentration: f64) -> Result<f64, AqiError> {
    if !concentration.is_finite() || concentration < 0.0 {
        return Err(AqiError::InvalidInput(format!("{} concentration {} is not a non-negative number", pollutant, concentration)));
    }
    sub_index(pollutant.to_table_unit(concentration), pollutant.breakpoints())
}

/// Calculates the overall AQI for a pollutant reading, i.e. the max of all sub-indices
///
/// # Arguments
///
/// * 'reading' - pollutant concentrations in µg/m³
pub fn overall_aqi(reading: &PollutantReading) -> Result<f64, AqiError> {
    let mut aqi: f64 = 0.0;
    for pollutant in Pollutant::ALL {
        aqi = aqi.max(pollutant_sub_index(pollutant, pollutant.concentration(reading))?);
    }

    Ok(aqi)
}

/// Health category of an AQI value
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Returns the category for the given AQI value
    ///
    /// # Arguments
    ///
    /// * 'aqi' - the AQI value
    pub fn from_aqi(aqi: f64) -> AqiCategory {
        if aqi <= 50.0 {
            AqiCategory::Good
        } else if aqi <= 100.0 {
            AqiCategory::Moderate
        } else if aqi <= 150.0 {
            AqiCategory::UnhealthyForSensitiveGroups
        } else if aqi <= 200.0 {
            AqiCategory::Unhealthy
        } else if aqi <= 300.0 {
            AqiCategory::VeryUnhealthy
        } else {
            AqiCategory::Hazardous
        }
    }

    /// Numeric encoding used as model feature
    pub fn encoded(&self) -> f64 {
        match self {
            AqiCategory::Good => 0.0,
            AqiCategory::Moderate => 1.0,
            AqiCategory::UnhealthyForSensitiveGroups => 2.0,
            AqiCategory::Unhealthy => 3.0,
            AqiCategory::VeryUnhealthy => 4.0,
            AqiCategory::Hazardous => 5.0,
        }
    }

    /// Background and text color used when rendering the category
    pub fn colors(&self) -> (&'static str, &'static str) {
        match self {
            AqiCategory::Good => ("#4CAF50", "white"),
            AqiCategory::Moderate => ("#FFEB3B", "black"),
            AqiCategory::UnhealthyForSensitiveGroups => ("#FF9800", "white"),
            AqiCategory::Unhealthy => ("#F44336", "white"),
            AqiCategory::VeryUnhealthy => ("#9C27B0", "white"),
            AqiCategory::Hazardous => ("#795548", "white"),
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            AqiCategory::Good => write!(f, "Good"),
            AqiCategory::Moderate => write!(f, "Moderate"),
            AqiCategory::UnhealthyForSensitiveGroups => write!(f, "Unhealthy for Sensitive Groups"),
            AqiCategory::Unhealthy => write!(f, "Unhealthy"),
            AqiCategory::VeryUnhealthy => write!(f, "Very Unhealthy"),
            AqiCategory::Hazardous => write!(f, "Hazardous"),
        }
    }
}
