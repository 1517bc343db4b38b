pub mod cubic_spline;
pub mod none;

use anyhow::Result;
use log::debug;
use toml::Table;

use crate::calibration::config::{ifo_options, option_str};
use crate::error::RecalibError;
use cubic_spline::{CubicSpline, CubicSplineConfig};
use none::NoCalibration;

/// Names accepted for `{ifo}_model`.
pub const ALL_MODELS: &[&str] = &[NoCalibration::NAME, CubicSpline::NAME];

/// Common traits used by all recalibration models
pub mod traits {
    use std::collections::HashMap;

    use anyhow::Result;

    use crate::calibration::types::FrequencySeries;
    use crate::model_params::RecalibParams;

    /// A frequency-domain calibration correction for one interferometer.
    pub trait Recalibrate {
        /// Registry name of the model (e.g. "cubic_spline")
        fn model_name(&self) -> &str;

        fn ifo_name(&self) -> Option<&str>;

        fn params(&self) -> &RecalibParams;

        fn params_mut(&mut self) -> &mut RecalibParams;

        /// Parameter names (without prefix) that must be bound before
        /// [`Recalibrate::apply_calibration`] can succeed.
        fn required_parameters(&self) -> Vec<String> {
            Vec::new()
        }

        /// Applies the correction to `strain`, returning a series on the same grid.
        ///
        /// The default is the identity transform; concrete models override it.
        fn apply_calibration(&self, strain: &FrequencySeries) -> Result<FrequencySeries> {
            Ok(strain.clone())
        }

        /// Binds the `prefix`-matching entries of a sampler's full parameter
        /// vector (prefix stripped) and then applies the calibration.
        ///
        /// Keys without the prefix are ignored. Whether earlier values survive an
        /// update that omits them is governed by the store's
        /// [`crate::model_params::UpdatePolicy`].
        fn map_to_adjust(
            &mut self,
            strain: &FrequencySeries,
            prefix: &str,
            params: &HashMap<String, f64>,
        ) -> Result<FrequencySeries> {
            let required = self.required_parameters();
            self.params_mut()
                .update_from_prefixed(prefix, params, &required)?;
            self.apply_calibration(strain)
        }
    }
}

/// Builds the model configured for `ifo` in a config section.
///
/// `{ifo}_model` names the model; the remaining `{ifo}_*` options (label
/// stripped) are its constructor arguments.
pub fn model_from_config(
    section: &Table,
    section_name: &str,
    ifo: &str,
) -> Result<Box<dyn traits::Recalibrate>> {
    let name = option_str(section, section_name, &format!("{}_model", ifo))?;
    let options = ifo_options(section, ifo);
    debug!(
        "building '{}' model for {} from [{}] ({} options)",
        name,
        ifo,
        section_name,
        options.len()
    );

    match name.as_str() {
        NoCalibration::NAME => Ok(Box::new(NoCalibration::new().with_ifo_name(ifo))),
        CubicSpline::NAME => {
            let config = CubicSplineConfig::from_options(&options, section_name)?;
            Ok(Box::new(CubicSpline::from_config(config)?.with_ifo_name(ifo)))
        }
        _ => Err(RecalibError::UnknownModel(name).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::traits::Recalibrate;
    use super::*;
    use crate::calibration::config::{parse_config, section};

    #[test]
    fn test_model_from_config_by_name() {
        let doc = parse_config(
            r#"
[test]
ifo_model = "cubic_spline"
ifo_minimum_frequency = "10"
ifo_maximum_frequency = "1024"
ifo_n_points = "5"
other_model = "none"
"#,
        )
        .unwrap();
        let section = section(&doc, "test").unwrap();

        let model = model_from_config(section, "test", "ifo").unwrap();
        assert_eq!(model.model_name(), "cubic_spline");
        assert_eq!(model.ifo_name(), Some("ifo"));
        assert_eq!(model.required_parameters().len(), 10);

        let model = model_from_config(section, "test", "other").unwrap();
        assert_eq!(model.model_name(), "none");
        assert!(model.required_parameters().is_empty());
    }

    #[test]
    fn test_unknown_model_name() {
        let doc = parse_config("[test]\nH1_model = \"quintic\"\n").unwrap();
        let section = section(&doc, "test").unwrap();
        let err = model_from_config(section, "test", "H1").err().unwrap();
        assert_eq!(
            err.downcast_ref::<RecalibError>(),
            Some(&RecalibError::UnknownModel("quintic".into()))
        );
    }
}
