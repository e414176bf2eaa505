use std::fs;
use std::path::Path;
use std::sync::Arc;
use chrono::{TimeDelta, Utc};
use log::{debug, info};
use crate::aqi::{overall_aqi, AqiCategory, MAX_AQI};
use crate::config::SensitivityParameters;
use crate::errors::PredictError;
use crate::features::{FeatureEngineer, FeatureVector, History, FEATURE_COUNT, FEATURE_NAMES, FEATURE_SCHEMA_VERSION};
use crate::models::artifact::{ModelArtifact, ScalerArtifact};
use crate::models::forecast::{DayForecast, ForecastResult, SinglePrediction};
use crate::models::readings::Reading;

/// Number of days covered by a forecast
pub const FORECAST_DAYS: usize = 3;

/// A trained regressor mapping a scaled feature vector to an AQI value
pub trait Regressor {
    /// Number of features the regressor expects
    fn n_features(&self) -> usize;

    /// Predicts the target for one scaled feature vector
    fn predict(&self, features: &[f64]) -> Result<f64, PredictError>;
}

/// Linear model y = intercept + Σ coefficient·x
pub struct RidgeModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl RidgeModel {
    /// Builds the model from an artifact, checking that it was trained on the current
    /// feature schema
    ///
    /// # Arguments
    ///
    /// * 'artifact' - deserialized model artifact
    pub fn from_artifact(artifact: ModelArtifact) -> Result<RidgeModel, PredictError> {
        if artifact.schema_version != FEATURE_SCHEMA_VERSION {
            return Err(PredictError::FeatureMismatch(format!(
                "model trained on schema version {}, features are version {}",
                artifact.schema_version, FEATURE_SCHEMA_VERSION)));
        }
        if artifact.feature_names.len() != FEATURE_COUNT || artifact.coefficients.len() != FEATURE_COUNT {
            return Err(PredictError::FeatureMismatch(format!(
                "model has {} names and {} coefficients, expected {}",
                artifact.feature_names.len(), artifact.coefficients.len(), FEATURE_COUNT)));
        }
        if let Some((i, name)) = artifact.feature_names.iter().enumerate().find(|(i, n)| n.as_str() != FEATURE_NAMES[*i]) {
            return Err(PredictError::FeatureMismatch(format!(
                "model feature {} is '{}', expected '{}'", i, name, FEATURE_NAMES[i])));
        }
        if !artifact.intercept.is_finite() || artifact.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PredictError::ModelUnavailable("model holds non finite parameters".to_string()));
        }

        Ok(RidgeModel { coefficients: artifact.coefficients, intercept: artifact.intercept })
    }
}

impl Regressor for RidgeModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> Result<f64, PredictError> {
        if features.len() != self.coefficients.len() {
            return Err(PredictError::FeatureMismatch(format!(
                "got {} features, model expects {}", features.len(), self.coefficients.len())));
        }
        let y = self.coefficients.iter().zip(features).map(|(c, x)| c * x).sum::<f64>() + self.intercept;

        Ok(y)
    }
}

/// Standard scaler, i.e. (x - mean) / scale per feature
pub struct Scaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Scaler {
    /// Builds the scaler from an artifact. A zero scale (constant feature during
    /// training) is treated as 1.
    ///
    /// # Arguments
    ///
    /// * 'artifact' - deserialized scaler artifact
    pub fn from_artifact(artifact: ScalerArtifact) -> Result<Scaler, PredictError> {
        if artifact.mean.len() != FEATURE_COUNT || artifact.scale.len() != FEATURE_COUNT {
            return Err(PredictError::FeatureMismatch(format!(
                "scaler has {} means and {} scales, expected {}",
                artifact.mean.len(), artifact.scale.len(), FEATURE_COUNT)));
        }
        if artifact.mean.iter().chain(artifact.scale.iter()).any(|v| !v.is_finite()) {
            return Err(PredictError::ModelUnavailable("scaler holds non finite parameters".to_string()));
        }
        let scale = artifact.scale.iter().map(|s| if *s == 0.0 { 1.0 } else { *s }).collect();

        Ok(Scaler { mean: artifact.mean, scale })
    }

    /// Scales a feature vector
    ///
    /// # Arguments
    ///
    /// * 'features' - the unscaled feature vector
    pub fn transform(&self, features: &FeatureVector) -> Result<Vec<f64>, PredictError> {
        if features.len() != self.mean.len() {
            return Err(PredictError::FeatureMismatch(format!(
                "got {} features, scaler expects {}", features.len(), self.mean.len())));
        }

        Ok(features.values().iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }
}

/// Loads model and scaler artifacts from disk
///
/// # Arguments
///
/// * 'model_path' - path to the model JSON file
/// * 'scaler_path' - path to the scaler JSON file
pub fn load_artifacts(model_path: &str, scaler_path: &str) -> Result<(RidgeModel, Scaler), PredictError> {
    let model: ModelArtifact = read_artifact(model_path)?;
    let scaler: ScalerArtifact = read_artifact(scaler_path)?;
    info!("loaded model artifact {} and scaler {}", model_path, scaler_path);

    Ok((RidgeModel::from_artifact(model)?, Scaler::from_artifact(scaler)?))
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, PredictError> {
    if !Path::new(path).exists() {
        return Err(PredictError::ModelUnavailable(format!("artifact {} not found", path)));
    }
    let json = fs::read_to_string(path)
        .map_err(|e| PredictError::ModelUnavailable(format!("reading {}: {}", path, e)))?;

    serde_json::from_str(&json)
        .map_err(|e| PredictError::ModelUnavailable(format!("corrupt artifact {}: {}", path, e)))
}

/// Produces AQI predictions from readings using a trained regressor
pub struct Predictor {
    engineer: FeatureEngineer,
    scaler: Scaler,
    model: Arc<dyn Regressor + Send + Sync>,
    sensitivity: SensitivityParameters,
}

impl Predictor {
    /// Returns a new Predictor
    ///
    /// # Arguments
    ///
    /// * 'engineer' - feature engineer sharing the model's schema version
    /// * 'scaler' - the scaler fitted together with the model
    /// * 'model' - the trained regressor
    /// * 'sensitivity' - parameters for the pollution sensitivity adjustment
    pub fn new(engineer: FeatureEngineer, scaler: Scaler, model: Arc<dyn Regressor + Send + Sync>, sensitivity: SensitivityParameters)
        -> Result<Predictor, PredictError> {

        if model.n_features() != FEATURE_COUNT {
            return Err(PredictError::FeatureMismatch(format!(
                "model expects {} features, schema has {}", model.n_features(), FEATURE_COUNT)));
        }

        Ok(Predictor { engineer, scaler, model, sensitivity })
    }

    /// Predicts the AQI at the time of the given reading
    ///
    /// # Arguments
    ///
    /// * 'reading' - the latest reading
    /// * 'history' - hours preceding the reading
    pub fn single(&self, reading: &Reading, history: &History) -> Result<SinglePrediction, PredictError> {
        let aqi = self.predict_at(reading, history, 0)?;
        let current_aqi = overall_aqi(&reading.pollutants)?;

        Ok(SinglePrediction {
            prediction_time: reading.timestamp(),
            aqi,
            current_aqi,
            category: AqiCategory::from_aqi(aqi),
        })
    }

    /// Produces a three day forecast. Day d is predicted from the latest reading stamped
    /// d days ahead, so the time features reflect the target time.
    ///
    /// # Arguments
    ///
    /// * 'reading' - the latest reading
    /// * 'history' - hours preceding the reading
    pub fn forecast(&self, reading: &Reading, history: &History) -> Result<ForecastResult, PredictError> {
        let mut days = Vec::with_capacity(FORECAST_DAYS);
        for day in 1..=FORECAST_DAYS {
            let aqi = self.predict_at(reading, history, day)?;
            days.push(DayForecast {
                prediction_time: reading.timestamp() + TimeDelta::days(day as i64),
                aqi,
                category: AqiCategory::from_aqi(aqi),
            });
        }
        let days: [DayForecast; FORECAST_DAYS] = days.try_into()
            .map_err(|_| PredictError::FeatureMismatch("forecast length".to_string()))?;

        Ok(ForecastResult { generated_at: Utc::now(), days })
    }

    fn predict_at(&self, reading: &Reading, history: &History, day: usize) -> Result<f64, PredictError> {
        let target = reading.restamped(reading.timestamp() + TimeDelta::days(day as i64));
        let features = self.engineer.engineer(&target, history)?;
        if features.len() != self.model.n_features() {
            return Err(PredictError::FeatureMismatch(format!(
                "engineered {} features, model expects {}", features.len(), self.model.n_features())));
        }

        let scaled = self.scaler.transform(&features)?;
        let raw = self.model.predict(&scaled)?;
        let factor = sensitivity_factor(&self.sensitivity, reading.pollutants.pm25, reading.pollutants.pm10, day);
        let aqi = (raw * factor).clamp(0.0, MAX_AQI);
        debug!("day {}: raw prediction {:.2}, sensitivity factor {:.3}, aqi {:.2}", day, raw, factor, aqi);

        Ok(aqi)
    }
}

/// Multiplicative adjustment of a prediction by how far current PM2.5/PM10 deviate from
/// their baselines. The adjustment is bounded by max_adjustment and weakens by day_decay
/// for each day beyond the first.
///
/// # Arguments
///
/// * 'params' - sensitivity parameters
/// * 'pm25' - current PM2.5 in µg/m³
/// * 'pm10' - current PM10 in µg/m³
/// * 'day' - forecast day, 0 for the current time
pub fn sensitivity_factor(params: &SensitivityParameters, pm25: f64, pm10: f64, day: usize) -> f64 {
    if !params.enabled {
        return 1.0;
    }
    let deviation = params.pm25_coefficient * (pm25 - params.pm25_baseline) / params.pm25_baseline
        + params.pm10_coefficient * (pm10 - params.pm10_baseline) / params.pm10_baseline;
    let decay = params.day_decay.powi(day.saturating_sub(1) as i32);

    1.0 + (deviation * decay).clamp(-params.max_adjustment, params.max_adjustment)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use chrono::{DateTime, TimeZone};
    use crate::models::readings::tests::reading_at;

    pub(crate) fn sensitivity(enabled: bool) -> SensitivityParameters {
        SensitivityParameters {
            enabled,
            pm25_baseline: 35.0,
            pm10_baseline: 50.0,
            pm25_coefficient: 0.1,
            pm10_coefficient: 0.05,
            max_adjustment: 0.3,
            day_decay: 0.5,
        }
    }

    pub(crate) fn model_artifact() -> ModelArtifact {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        // weight on the 3h moving average and the hour of day
        coefficients[FEATURE_NAMES.iter().position(|n| *n == "aqi_ma_3h").unwrap()] = 1.0;
        coefficients[FEATURE_NAMES.iter().position(|n| *n == "hour_sin").unwrap()] = 5.0;
        ModelArtifact {
            schema_version: FEATURE_SCHEMA_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            coefficients,
            intercept: 10.0,
        }
    }

    pub(crate) fn scaler_artifact() -> ScalerArtifact {
        ScalerArtifact { mean: vec![0.0; FEATURE_COUNT], scale: vec![1.0; FEATURE_COUNT] }
    }

    pub(crate) fn predictor(enabled: bool) -> Predictor {
        let model = RidgeModel::from_artifact(model_artifact()).unwrap();
        let scaler = Scaler::from_artifact(scaler_artifact()).unwrap();
        Predictor::new(FeatureEngineer::new(0).unwrap(), scaler, Arc::new(model), sensitivity(enabled)).unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn forecast_is_reproducible() {
        let p = predictor(true);
        let r = reading_at(noon());
        let a = p.forecast(&r, &History::new()).unwrap();
        let b = p.forecast(&r, &History::new()).unwrap();
        for d in 0..FORECAST_DAYS {
            assert_eq!(a.days[d].aqi.to_bits(), b.days[d].aqi.to_bits());
            assert_eq!(a.days[d].prediction_time, b.days[d].prediction_time);
        }
    }

    #[test]
    fn forecast_covers_three_days() {
        let r = reading_at(noon());
        let f = predictor(false).forecast(&r, &History::new()).unwrap();
        assert_eq!(f.days[0].prediction_time, noon() + TimeDelta::days(1));
        assert_eq!(f.days[2].prediction_time, noon() + TimeDelta::days(3));
        // intercept 10 + ma_3h 100 + 5·sin(π) at noon
        assert!((f.days[0].aqi - 110.0).abs() < 1e-9);
        assert_eq!(f.days[0].category, AqiCategory::UnhealthyForSensitiveGroups);
    }

    #[test]
    fn single_reports_current_aqi() {
        let s = predictor(false).single(&reading_at(noon()), &History::new()).unwrap();
        assert_eq!(s.current_aqi, 100.0);
        assert_eq!(s.prediction_time, noon());
    }

    #[test]
    fn output_is_clamped() {
        let mut artifact = model_artifact();
        artifact.intercept = 10_000.0;
        let model = RidgeModel::from_artifact(artifact).unwrap();
        let scaler = Scaler::from_artifact(scaler_artifact()).unwrap();
        let p = Predictor::new(FeatureEngineer::new(0).unwrap(), scaler, Arc::new(model), sensitivity(false)).unwrap();
        let f = p.forecast(&reading_at(noon()), &History::new()).unwrap();
        assert!(f.days.iter().all(|d| d.aqi == MAX_AQI));
    }

    #[test]
    fn sensitivity_direction_and_decay() {
        let params = sensitivity(true);
        assert_eq!(sensitivity_factor(&params, 35.0, 50.0, 1), 1.0);
        let up1 = sensitivity_factor(&params, 70.0, 50.0, 1);
        let up2 = sensitivity_factor(&params, 70.0, 50.0, 2);
        assert!((up1 - 1.1).abs() < 1e-12);
        assert!((up2 - 1.05).abs() < 1e-12);
        assert!(sensitivity_factor(&params, 5.0, 10.0, 1) < 1.0);
        assert!((sensitivity_factor(&params, 3500.0, 50.0, 1) - 1.3).abs() < 1e-12);
        assert_eq!(sensitivity_factor(&sensitivity(false), 3500.0, 50.0, 1), 1.0);
    }

    #[test]
    fn rejects_other_schema_version() {
        let mut artifact = model_artifact();
        artifact.schema_version = FEATURE_SCHEMA_VERSION + 1;
        assert!(matches!(RidgeModel::from_artifact(artifact), Err(PredictError::FeatureMismatch(_))));
    }

    #[test]
    fn rejects_reordered_features() {
        let mut artifact = model_artifact();
        artifact.feature_names.swap(0, 1);
        assert!(matches!(RidgeModel::from_artifact(artifact), Err(PredictError::FeatureMismatch(_))));
    }

    #[test]
    fn rejects_short_scaler() {
        let artifact = ScalerArtifact { mean: vec![0.0; 3], scale: vec![1.0; 3] };
        assert!(matches!(Scaler::from_artifact(artifact), Err(PredictError::FeatureMismatch(_))));
    }

    #[test]
    fn zero_scale_is_treated_as_one() {
        let mut artifact = scaler_artifact();
        artifact.scale[0] = 0.0;
        artifact.mean[0] = 8.0;
        let scaler = Scaler::from_artifact(artifact).unwrap();
        let v = FeatureEngineer::new(0).unwrap().engineer(&reading_at(noon()), &History::new()).unwrap();
        assert_eq!(scaler.transform(&v).unwrap()[0], 28.0 - 8.0);
    }

    #[test]
    fn missing_artifact_is_model_unavailable() {
        assert!(matches!(load_artifacts("/nonexistent/model.json", "/nonexistent/scaler.json"),
            Err(PredictError::ModelUnavailable(_))));
    }

    #[test]
    fn corrupt_artifact_is_model_unavailable() {
        let mut model = tempfile::NamedTempFile::new().unwrap();
        model.write_all(b"{ not json").unwrap();
        let mut scaler = tempfile::NamedTempFile::new().unwrap();
        scaler.write_all(serde_json::to_string(&scaler_artifact()).unwrap().as_bytes()).unwrap();

        let res = load_artifacts(model.path().to_str().unwrap(), scaler.path().to_str().unwrap());
        assert!(matches!(res, Err(PredictError::ModelUnavailable(_))));
    }

    #[test]
    fn loads_artifacts_from_disk() {
        let mut model = tempfile::NamedTempFile::new().unwrap();
        model.write_all(serde_json::to_string(&model_artifact()).unwrap().as_bytes()).unwrap();
        let mut scaler = tempfile::NamedTempFile::new().unwrap();
        scaler.write_all(serde_json::to_string(&scaler_artifact()).unwrap().as_bytes()).unwrap();

        let (m, _) = load_artifacts(model.path().to_str().unwrap(), scaler.path().to_str().unwrap()).unwrap();
        assert_eq!(m.n_features(), FEATURE_COUNT);
    }

    struct ShortModel;
    impl Regressor for ShortModel {
        fn n_features(&self) -> usize { 10 }
        fn predict(&self, _: &[f64]) -> Result<f64, PredictError> { Ok(0.0) }
    }

    #[test]
    fn predictor_rejects_model_of_other_width() {
        let scaler = Scaler::from_artifact(scaler_artifact()).unwrap();
        let res = Predictor::new(FeatureEngineer::new(0).unwrap(), scaler, Arc::new(ShortModel), sensitivity(false));
        assert!(matches!(res, Err(PredictError::FeatureMismatch(_))));
    }
}
