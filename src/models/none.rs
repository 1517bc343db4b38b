use crate::model_params::RecalibParams;
use crate::models::traits::Recalibrate;

/// Identity model: leaves the strain untouched and needs no parameters.
#[derive(Debug, Clone, Default)]
pub struct NoCalibration {
    ifo_name: Option<String>,
    params: RecalibParams,
}

impl NoCalibration {
    pub const NAME: &'static str = "none";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ifo_name(mut self, ifo: impl Into<String>) -> Self {
        self.ifo_name = Some(ifo.into());
        self
    }
}

impl Recalibrate for NoCalibration {
    fn model_name(&self) -> &str {
        Self::NAME
    }

    fn ifo_name(&self) -> Option<&str> {
        self.ifo_name.as_deref()
    }

    fn params(&self) -> &RecalibParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut RecalibParams {
        &mut self.params
    }
}
