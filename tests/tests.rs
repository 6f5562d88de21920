use kanesim::simulation::system::SystemError;
use kanesim::{
    Engine, Geometry, IntegratorConfig, MassSpringDamper, Parameters, PerspectiveCamera, Scene,
    Shape, Symbol, System, Trajectory, VisualFrame,
};

/// Reference constants: underdamped (c^2 = 25 < 4*m*k = 400), static
/// equilibrium at x = m*g/k = 9.8
const M: f64 = 10.0;
const G: f64 = 9.8;
const C: f64 = 5.0;
const K: f64 = 10.0;

/// Build the model with every constant and initial condition bound
pub fn bound_system(model: &MassSpringDamper, x0: f64, v0: f64) -> System {
    let mut sys = System::new(model.bundle.clone());
    sys.set_constant(&model.mass, M).unwrap();
    sys.set_constant(&model.gravity, G).unwrap();
    sys.set_constant(&model.damping, C).unwrap();
    sys.set_constant(&model.stiffness, K).unwrap();
    sys.set_initial_condition(&model.x, x0).unwrap();
    sys.set_initial_condition(&model.v, v0).unwrap();
    sys
}

pub fn test_params() -> Parameters {
    Parameters {
        t_end: 8.0,
        samples: 100,
        atol: 1e-8,
        rtol: 1e-8,
    }
}

pub fn rk4() -> Engine {
    Engine {
        integrator: IntegratorConfig::Rk4,
    }
}

pub fn rkf45() -> Engine {
    Engine {
        integrator: IntegratorConfig::Rkf45,
    }
}

fn reference_trajectory() -> (MassSpringDamper, Trajectory) {
    let model = MassSpringDamper::build().unwrap();
    let sys = bound_system(&model, 0.0, 0.0);
    let params = test_params();
    let traj = sys.integrate(&params.time_grid(), &rk4(), &params).unwrap();
    (model, traj)
}

/// Closed-form underdamped response from rest:
/// x(t) = xeq * (1 - e^(-z t) * (cos(wd t) + z/wd * sin(wd t)))
fn analytic_x(t: f64) -> f64 {
    let xeq = M * G / K;
    let z = C / (2.0 * M);
    let wd = (K / M - z * z).sqrt();
    xeq * (1.0 - (-z * t).exp() * ((wd * t).cos() + z / wd * (wd * t).sin()))
}

// ==================================================================================
// Derivation tests
// ==================================================================================

#[test]
fn newton_and_kane_derivations_agree() {
    let model = MassSpringDamper::build().unwrap();
    assert!(
        model.bundle.state_derivatives_agree(&model.manual_rhs, 1e-9),
        "manual force balance and Kane's method disagree"
    );
}

#[test]
fn formation_ignores_numeric_constants() {
    // binding different numbers must not change the symbolic equations
    let a = MassSpringDamper::build().unwrap();
    let b = MassSpringDamper::build().unwrap();
    let _ = bound_system(&a, 0.0, 0.0);
    let mut other = System::new(b.bundle.clone());
    other.set_constant(&b.mass, 123.0).unwrap();

    assert_eq!(a.bundle.mass_matrix, b.bundle.mass_matrix);
    assert_eq!(a.bundle.forcing, b.bundle.forcing);
}

// ==================================================================================
// Integration tests
// ==================================================================================

#[test]
fn trajectory_matches_analytic_solution() {
    let (model, traj) = reference_trajectory();
    let xs = traj.series(&model.x).unwrap();

    for (i, t) in traj.times.iter().enumerate() {
        let want = analytic_x(*t);
        assert!(
            (xs[i] - want).abs() < 1e-3,
            "x({t}) = {}, analytic {want}",
            xs[i]
        );
    }
}

#[test]
fn trajectory_is_damped_oscillation_toward_equilibrium() {
    let (model, traj) = reference_trajectory();
    let xs = traj.series(&model.x).unwrap();
    let vs = traj.series(&model.v).unwrap();
    let xeq = M * G / K;

    assert_eq!((xs[0], vs[0]), (0.0, 0.0), "must start at rest");

    let peak = xs.iter().cloned().fold(f64::MIN, f64::max);
    assert!(peak > xeq, "underdamped response must overshoot {xeq}, peak {peak}");

    let last = xs[xs.len() - 1];
    assert!(
        (last - xeq).abs() < 0.2 * xeq,
        "x(8) = {last} should have settled near {xeq}"
    );
}

#[test]
fn integration_is_deterministic() {
    let (_, a) = reference_trajectory();
    let (_, b) = reference_trajectory();
    assert_eq!(a.states, b.states, "identical inputs must reproduce bitwise");
}

#[test]
fn adaptive_integrator_agrees_with_fixed_step() {
    let model = MassSpringDamper::build().unwrap();
    let sys = bound_system(&model, 0.0, 0.0);
    let params = test_params();
    let grid = params.time_grid();

    let fixed = sys.integrate(&grid, &rk4(), &params).unwrap();
    let adaptive = sys.integrate(&grid, &rkf45(), &params).unwrap();

    for i in 0..grid.len() {
        let d = (&fixed.states[i] - &adaptive.states[i]).norm();
        assert!(d < 5e-4, "rk4/rkf45 diverged by {d} at sample {i}");
    }
}

#[test]
fn rejects_non_increasing_time_grid() {
    let model = MassSpringDamper::build().unwrap();
    let sys = bound_system(&model, 0.0, 0.0);
    let err = sys
        .integrate(&[0.0, 1.0, 1.0], &rk4(), &test_params())
        .unwrap_err();
    assert!(err.to_string().contains("time grid"), "got: {err}");
}

// ==================================================================================
// Binding validation tests
// ==================================================================================

#[test]
fn missing_constant_fails_before_integration() {
    let model = MassSpringDamper::build().unwrap();
    let mut sys = System::new(model.bundle.clone());
    // bind everything except the stiffness
    sys.set_constant(&model.mass, M).unwrap();
    sys.set_constant(&model.gravity, G).unwrap();
    sys.set_constant(&model.damping, C).unwrap();
    sys.set_initial_condition(&model.x, 0.0).unwrap();
    sys.set_initial_condition(&model.v, 0.0).unwrap();

    let params = test_params();
    let err = sys.integrate(&params.time_grid(), &rk4(), &params).unwrap_err();
    assert!(
        err.to_string().contains("no numeric value"),
        "expected a missing-constant error, got: {err}"
    );
}

#[test]
fn missing_initial_condition_fails_before_integration() {
    let model = MassSpringDamper::build().unwrap();
    let mut sys = System::new(model.bundle.clone());
    sys.set_constant(&model.mass, M).unwrap();
    sys.set_constant(&model.gravity, G).unwrap();
    sys.set_constant(&model.damping, C).unwrap();
    sys.set_constant(&model.stiffness, K).unwrap();
    sys.set_initial_condition(&model.x, 0.0).unwrap();

    assert_eq!(
        sys.validate(),
        Err(SystemError::MissingInitialCondition(model.v.clone()))
    );
}

#[test]
fn unknown_symbols_are_rejected_on_insertion() {
    let model = MassSpringDamper::build().unwrap();
    let mut sys = System::new(model.bundle.clone());

    let bogus = Symbol::new("zz");
    assert_eq!(
        sys.set_constant(&bogus, 1.0),
        Err(SystemError::UnknownConstant(bogus.clone()))
    );
    // a constant is not a state either
    assert_eq!(
        sys.set_initial_condition(&model.mass, 1.0),
        Err(SystemError::UnknownState(model.mass.clone()))
    );
    // and this model has no specified inputs at all
    assert!(matches!(
        sys.set_specified(&model.x, kanesim::Specified::Constant(0.0)),
        Err(SystemError::UnknownSpecified(_))
    ));
}

// ==================================================================================
// Visualization tests
// ==================================================================================

fn block_scene(model: &MassSpringDamper) -> Scene {
    Scene::new(
        "test",
        &model.ceiling,
        &model.origin,
        PerspectiveCamera::new("camera", [0.0, 0.0, 30.0]),
    )
    .with(VisualFrame::new(
        "block",
        &model.ceiling,
        &model.block,
        Shape::new("block", "blue", "metal", Geometry::Sphere { radius: 1.0 }),
    ))
}

#[test]
fn initial_pose_reproduces_initial_position() {
    let model = MassSpringDamper::build().unwrap();
    let x0 = 1.25;
    let sys = bound_system(&model, x0, 0.0);
    let params = test_params();
    let traj = sys.integrate(&params.time_grid(), &rk4(), &params).unwrap();

    let doc = block_scene(&model).render(&sys, &traj).unwrap();
    let first = &doc.frames[0].transforms[0];

    // row-major 4x4: translation in column 3, identity rotation
    assert_eq!(first[3], x0, "x translation at t = 0");
    assert_eq!(first[7], 0.0);
    assert_eq!(first[11], 0.0);
    assert_eq!((first[0], first[5], first[10], first[15]), (1.0, 1.0, 1.0, 1.0));
}

#[test]
fn scene_tracks_trajectory_samples() {
    let model = MassSpringDamper::build().unwrap();
    let sys = bound_system(&model, 0.0, 0.0);
    let params = test_params();
    let traj = sys.integrate(&params.time_grid(), &rk4(), &params).unwrap();

    let doc = block_scene(&model).render(&sys, &traj).unwrap();
    assert_eq!(doc.times.len(), traj.len());
    assert_eq!(doc.frames[0].transforms.len(), traj.len());

    let xs = traj.series(&model.x).unwrap();
    for (i, tf) in doc.frames[0].transforms.iter().enumerate() {
        assert_eq!(tf[3], xs[i], "block must track the coordinate at sample {i}");
    }
}

#[test]
fn unrelated_point_cannot_be_posed() {
    let model = MassSpringDamper::build().unwrap();
    let sys = bound_system(&model, 0.0, 0.0);
    let params = test_params();
    let traj = sys.integrate(&params.time_grid(), &rk4(), &params).unwrap();

    let stray = kanesim::Point::fixed("stray");
    let scene = Scene::new(
        "bad",
        &model.ceiling,
        &model.origin,
        PerspectiveCamera::new("camera", [0.0, 0.0, 30.0]),
    )
    .with(VisualFrame::new(
        "stray",
        &model.ceiling,
        &stray,
        Shape::new("stray", "red", "default", Geometry::Cube { length: 1.0 }),
    ));

    assert!(scene.render(&sys, &traj).is_err());
}
