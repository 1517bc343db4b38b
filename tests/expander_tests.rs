
use rand::rngs::StdRng;
use rand::SeedableRng;
use recalib_lib::{
    calibration_config_expander, draw_calibration_parameters, expand_calibration_config,
    load_config, models_from_config, recalibrate_strain, ExpanderOptions, RecalibError,
};
use test_utils::{assert_close, quadratic_strain, write_config};

const TWO_POINT_CONFIG: &str = r#"
[calibration]
H1_model = "cubic_spline"
H1_n_points = 2
H1_amplitude_sigma = 0.1
H1_phase_sigma = 0.2
"#;

/// Two control points for one interferometer give four Gaussian priors, all
/// registered as variable parameters.
#[test]
fn test_two_point_expansion() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(dir.path(), "calib.toml", TWO_POINT_CONFIG);

    let expanded = expand_calibration_config(&input, None).unwrap();

    let mut names = expanded.variable_params();
    names.sort();
    assert_eq!(
        names,
        vec![
            "recalib_amplitude_H1_0",
            "recalib_amplitude_H1_1",
            "recalib_phase_H1_0",
            "recalib_phase_H1_1",
        ]
    );

    let prior_sections: Vec<&str> = expanded
        .section_names()
        .into_iter()
        .filter(|s| s.starts_with("prior-"))
        .collect();
    assert_eq!(prior_sections.len(), 4);

    for (param, variance) in [("amplitude", 0.01), ("phase", 0.04)] {
        for ii in 0..2 {
            let parameter = format!("recalib_{}_H1_{}", param, ii);
            let section = expanded
                .section(&format!("prior-{}", parameter))
                .unwrap_or_else(|| panic!("missing prior section for {}", parameter));
            assert_eq!(section["name"].as_str(), Some("gaussian"));
            assert_eq!(
                section[&format!("{}_mean", parameter)].as_float(),
                Some(0.0)
            );
            let var = section[&format!("{}_var", parameter)].as_float().unwrap();
            assert_close(var, variance, 1e-12);
        }
    }

    let priors = expanded.gaussian_priors().unwrap();
    assert_eq!(priors.len(), 4);
}

#[test]
fn test_unknown_model_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(
        dir.path(),
        "calib.toml",
        "[calibration]\nH1_model = \"cubic_spline\"\nH1_n_points = 4\nH1_amplitude_sigma = 0.1\nH1_phase_sigma = 0.1\nL1_model = \"quartic\"\n",
    );
    let output = dir.path().join("expanded.toml");

    let err = expand_calibration_config(&input, Some(&output)).unwrap_err();

    assert_eq!(
        err.downcast_ref::<RecalibError>(),
        Some(&RecalibError::UnknownModel("quartic".into()))
    );
    assert!(!output.exists());
}

#[test]
fn test_calibration_envelope_not_implemented() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(
        dir.path(),
        "calib.toml",
        "[calibration]\nH1_model = \"cubic_spline\"\nH1_n_points = 5\nH1_amplitude_sigma = 0.1\nH1_phase_sigma = 0.1\nH1_calibration_envelope = \"H1_envelope.txt\"\n",
    );
    let output = dir.path().join("expanded.toml");

    let err = expand_calibration_config(&input, Some(&output)).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RecalibError>(),
        Some(RecalibError::NotImplemented(_))
    ));
    assert!(!output.exists());
}

/// An envelope file fails the expansion whatever model the interferometer uses,
/// and even when no model is given.
#[test]
fn test_calibration_envelope_rejected_for_any_model() {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in [
        (
            "none.toml",
            "[calibration]\nH1_model = \"none\"\nH1_calibration_envelope = \"env.txt\"\n",
        ),
        (
            "no_model.toml",
            "[calibration]\nH1_calibration_envelope = \"env.txt\"\n",
        ),
    ] {
        let input = write_config(dir.path(), name, text);
        let output = dir.path().join(format!("expanded_{}", name));

        let err = expand_calibration_config(&input, Some(&output)).unwrap_err();

        assert!(
            matches!(
                err.downcast_ref::<RecalibError>(),
                Some(RecalibError::NotImplemented(_))
            ),
            "{}: unexpected error {:?}",
            name,
            err
        );
        assert!(!output.exists());
    }
}

/// The written file parses back to the same document, and sections that were
/// already in the input are carried through.
#[test]
fn test_output_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!(
        "[variable_params]\nmass1 = \"\"\n\n[prior-mass1]\nname = \"uniform\"\nmin-mass1 = 10.0\nmax-mass1 = 80.0\n{}",
        TWO_POINT_CONFIG
    );
    let input = write_config(dir.path(), "calib.toml", &text);
    let output = dir.path().join("expanded.toml");

    let expanded = expand_calibration_config(&input, Some(&output)).unwrap();

    let reread = load_config(&output).unwrap();
    assert_eq!(&reread, expanded.table());
    assert_eq!(expanded.variable_params().len(), 5);
    assert!(expanded.section("prior-mass1").is_some());
    // The uniform prior is not reported as gaussian.
    assert_eq!(expanded.gaussian_priors().unwrap().len(), 4);
}

#[test]
fn test_existing_prior_section_is_kept() {
    let text = format!(
        "{}\n[prior-recalib_phase_H1_1]\nname = \"gaussian\"\nrecalib_phase_H1_1_mean = 0.5\nrecalib_phase_H1_1_var = 1.0\n",
        TWO_POINT_CONFIG
    );
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(dir.path(), "calib.toml", &text);

    let expanded = expand_calibration_config(&input, None).unwrap();

    let kept = expanded.section("prior-recalib_phase_H1_1").unwrap();
    assert_eq!(kept["recalib_phase_H1_1_mean"].as_float(), Some(0.5));
    assert!(expanded
        .variable_params()
        .contains(&"recalib_phase_H1_1"));
}

/// Explicit labels may contain underscores and restrict the expansion.
#[test]
fn test_explicit_interferometer_labels() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(
        dir.path(),
        "calib.toml",
        r#"
[calibration]
H1_X_model = "cubic_spline"
H1_X_n_points = 4
H1_X_amplitude_sigma = 0.05
H1_X_phase_sigma = 0.03
L1_model = "quartic"
"#,
    );

    let options = ExpanderOptions::with_interferometers(["H1_X"]);
    let expanded = calibration_config_expander(&input, None, &options).unwrap();

    assert_eq!(expanded.variable_params().len(), 8);
    assert!(expanded
        .section("prior-recalib_amplitude_H1_X_3")
        .is_some());

    // Inferring labels instead splits "H1_X" at the first underscore.
    assert!(calibration_config_expander(&input, None, &ExpanderOptions::default()).is_err());
}

/// Expanded priors drive the models built from the same config: draw a sample,
/// bind it with the default prefix, and recalibrate.
#[test]
fn test_expanded_priors_drive_models() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(
        dir.path(),
        "calib.toml",
        r#"
[calibration]
H1_model = "cubic_spline"
H1_n_points = 5
H1_minimum_frequency = 20.0
H1_maximum_frequency = 1024.0
H1_amplitude_sigma = 0.1
H1_phase_sigma = 0.1
L1_model = "cubic_spline"
L1_n_points = 4
L1_minimum_frequency = 20.0
L1_maximum_frequency = 1024.0
L1_amplitude_sigma = 0.05
L1_phase_sigma = 0.05
"#,
    );

    let expanded = expand_calibration_config(&input, None).unwrap();
    let priors = expanded.gaussian_priors().unwrap();
    assert_eq!(priors.len(), 2 * 5 + 2 * 4);

    let mut rng = StdRng::seed_from_u64(42);
    let mut sample = draw_calibration_parameters(&priors, &mut rng).unwrap();
    sample.insert("mass1".to_string(), 30.0);

    let mut models = models_from_config(expanded.table(), "calibration", &["H1", "L1"]).unwrap();
    let strain = quadratic_strain();
    for (ifo, model) in models.iter_mut() {
        let adjusted = recalibrate_strain(model.as_mut(), &strain, &sample).unwrap();
        assert_eq!(adjusted.len(), strain.len());
        assert!(adjusted.data().iter().all(|c| c.re.is_finite() && c.im.is_finite()));
        assert_ne!(adjusted, strain, "{} was not recalibrated", ifo);
        assert!(model
            .required_parameters()
            .iter()
            .all(|key| model.params().contains(key)));
    }
}
