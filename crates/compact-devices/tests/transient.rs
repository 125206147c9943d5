//! Charge integration, truncation error and the transient-only bias
//! sources (initial conditions with UIC, predictor).

mod common;

use common::{Circuit, Env, assert_close, nodes, solution};
use compact_core::{InitMode, IntegrationMethod, Integrator};
use compact_devices::mosfet::{MosInstanceParam, MosModelParam};
use compact_devices::{Bias, CompactModel, MosfetModel, ParamValue, Terminal};

const STEP: f64 = 1e-9;

fn capacitive_nmos() -> MosfetModel {
    let mut model = MosfetModel::nmos("nmod")
        .with_instance("m1", &nodes(&[1, 2, 0, 0]))
        .unwrap();
    for (key, value) in [(MosModelParam::Cgso, 1e-10), (MosModelParam::Cgdo, 1e-10)] {
        model
            .set_model_param(key as u32, ParamValue::Real(value))
            .unwrap();
    }
    model
}

fn backward_euler() -> Env {
    let mut env = Env::without_bypass();
    env.integrator = Integrator::new(IntegrationMethod::Trapezoidal, 1).unwrap();
    env
}

#[test]
fn test_gate_ramp_integrates_charge() {
    let mut env = backward_euler();
    let mut model = capacitive_nmos();
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);
    let cgs = model.instance("m1").unwrap().derived().unwrap().cgs_overlap;

    circuit.load_at(&mut model, &env, &solution(&[1.0, 0.0]));
    circuit.states.seed_history();

    let mut gate = 0.0;
    for (k, next) in [0.1, 0.4, 0.9].into_iter().enumerate() {
        env.integrator.set_timestep(STEP);
        let init = if k == 0 { InitMode::Transient } else { InitMode::Float };
        circuit.load(&mut model, &env.transient(init), &solution(&[1.0, next]));

        let point = model.instance("m1").unwrap().operating_point().unwrap().clone();
        let qgs = point.charge(Terminal::Gate, Terminal::SourcePrime).unwrap();
        assert_close(qgs.charge, cgs * next, 1e-12);
        assert_close(qgs.conductance_factor, 1.0 / STEP, 1e-12);
        if k == 0 {
            // The first timepoint has no history to differentiate.
            assert_eq!(qgs.current, 0.0);
        } else {
            assert_close(qgs.current, cgs * (next - gate) / STEP, 1e-9);
        }

        let ts = model.truncation_timestep(&env.transient(InitMode::Float), &circuit.states);
        assert!(ts > 0.0);
        if k == 2 {
            assert!(ts.is_finite(), "a curved charge bounds the step");
        }
        circuit.states.rotate();
        gate = next;
    }
}

#[test]
fn test_constant_charge_does_not_bound_step() {
    let mut env = backward_euler();
    let mut model = capacitive_nmos();
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);
    let x = solution(&[1.0, 0.3]);
    circuit.load_at(&mut model, &env, &x);
    circuit.states.seed_history();

    for init in [InitMode::Transient, InitMode::Float, InitMode::Float] {
        env.integrator.set_timestep(STEP);
        circuit.load(&mut model, &env.transient(init), &x);
        circuit.states.rotate();
    }
    let ts = model.truncation_timestep(&env.transient(InitMode::Float), &circuit.states);
    assert!(ts > 1e3 * STEP);
}

#[test]
fn test_uic_starts_from_initial_conditions() {
    let env = backward_euler();
    let mut model = capacitive_nmos();
    model
        .set_instance_param(
            "m1",
            MosInstanceParam::Ic as u32,
            ParamValue::Vector(vec![1.0, 2.0, 0.0]),
        )
        .unwrap();
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);

    let ctx = env.transient(InitMode::Transient).with_uic(true);
    circuit.load(&mut model, &ctx, &solution(&[0.0, 0.0]));
    let point = model.instance("m1").unwrap().operating_point().unwrap().clone();
    assert_eq!(point.bias, Bias::new(2.0, 1.0, 0.0));
    assert!(!point.limited);

    // Given initial conditions are not overwritten by the solution.
    model.set_initial_conditions(&solution(&[5.0, 5.0]));
    assert_eq!(
        model
            .instance_param("m1", MosInstanceParam::IcVds as u32)
            .unwrap(),
        ParamValue::Real(1.0)
    );
}

#[test]
fn test_predictor_extrapolates_history() {
    let mut env = backward_euler();
    let mut model = capacitive_nmos();
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);

    // Accepted gate voltages 0.2 then 0.3 at equal steps.
    for gate in [0.2, 0.3] {
        env.integrator.set_timestep(STEP);
        let x = solution(&[1.0, gate]);
        circuit.load_at(&mut model, &env, &x);
        circuit.states.rotate();
    }
    env.integrator.set_timestep(STEP);
    circuit.load(
        &mut model,
        &env.transient(InitMode::Predict),
        &solution(&[0.0, 0.0]),
    );
    let bias = model.instance("m1").unwrap().operating_point().unwrap().bias;
    assert_close(bias.vgs, 0.4, 1e-9);
    assert_close(bias.vds, 1.0, 1e-9);
}
