use serde::{Deserialize, Serialize};

/// Trained linear regression (ridge) model as exported by the offline trainer
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ModelArtifact {
    pub schema_version: u32,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Standard scaler fitted on the training set, i.e. per feature mean and scale
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScalerArtifact {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}
