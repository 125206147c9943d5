//! Newton-load behavior at specific bias points.

mod common;

use common::{Circuit, Env, assert_close, nodes, solution};
use compact_core::{CheckState, InitMode};
use compact_devices::mosfet::{MosInstanceParam, MosModelParam};
use compact_devices::{Bias, CompactModel, Mode, MosfetModel, OperatingPoint, ParamValue, Terminal};

fn op(model: &MosfetModel, name: &str) -> OperatingPoint {
    model
        .instance(name)
        .and_then(|inst| inst.operating_point())
        .cloned()
        .unwrap()
}

fn nmos(ids: &[u32], is: f64) -> MosfetModel {
    let mut model = MosfetModel::nmos("nmod")
        .with_instance("m1", &nodes(ids))
        .unwrap();
    model
        .set_model_param(MosModelParam::Is as u32, ParamValue::Real(is))
        .unwrap();
    model
}

#[test]
fn test_zero_bias_leaves_only_gmin() {
    let env = Env::new();
    let gmin = env.options.gmin;
    let mut model = nmos(&[1, 2, 3, 4], 0.0);
    let mut circuit = Circuit::new(4);
    circuit.setup(&mut model, &env);

    circuit.load(&mut model, &env.dc(InitMode::Float), &solution(&[0.0; 4]));
    let at_rest = op(&model, "m1");
    assert_eq!(at_rest.frame.mode(), Mode::Forward);
    assert!(!at_rest.limited);

    let bs = at_rest.current(Terminal::Bulk, Terminal::SourcePrime).unwrap();
    assert_eq!(bs.value, 0.0);
    assert_eq!(bs.partials, [0.0, 0.0, gmin]);
    let bd = at_rest.current(Terminal::Bulk, Terminal::DrainPrime).unwrap();
    assert_eq!(bd.value, 0.0);
    assert_eq!(bd.partials, [0.0, -gmin, gmin]);
    let ds = at_rest.current(Terminal::DrainPrime, Terminal::SourcePrime).unwrap();
    assert_eq!(ds.value, 0.0);

    circuit.load(&mut model, &env.dc(InitMode::Float), &solution(&[1.0, 0.0, 0.0, 0.0]));
    let drain_high = op(&model, "m1");
    assert_eq!(drain_high.frame.mode(), Mode::Forward);
    assert_eq!(drain_high.frame.mode().sign(), 1.0);
    assert_eq!(drain_high.bias, Bias::new(0.0, 1.0, 0.0));

    circuit.load(&mut model, &env.dc(InitMode::Float), &solution(&[-1.0, 0.0, 0.0, 0.0]));
    let drain_low = op(&model, "m1");
    assert_eq!(drain_low.frame.mode(), Mode::Reverse);
    assert!(drain_low.limited, "drain-source step is bounded");
}

#[test]
fn test_forward_junction_is_limited_gradually() {
    let env = Env::without_bypass();
    let mut model = nmos(&[1, 2, 0, 3], 1e-10);
    let mut circuit = Circuit::new(3);
    circuit.setup(&mut model, &env);

    let target = solution(&[0.0, 0.0, 0.7]);
    let ctx = env.dc(InitMode::Float);
    let mut last_vbs = 0.0;
    let mut last_step = f64::INFINITY;
    let mut last_current = 0.0;
    let mut limited_steps = 0;
    let mut reached = false;
    for _ in 0..50 {
        env.monitor.reset();
        circuit.load(&mut model, &ctx, &target);
        let point = op(&model, "m1");
        let current = point.current(Terminal::Bulk, Terminal::SourcePrime).unwrap().value;
        assert!(point.bias.vbs > last_vbs);
        assert!(current > last_current);
        if !point.limited {
            assert_eq!(point.bias.vbs, 0.7);
            reached = true;
            break;
        }
        let step = point.bias.vbs - last_vbs;
        assert!(step < last_step, "step {step} after {last_step}");
        assert!(!env.monitor.converged(), "a limited load is not converged");
        last_step = step;
        last_vbs = point.bias.vbs;
        last_current = current;
        limited_steps += 1;
    }
    assert!(reached);
    assert!(limited_steps >= 3, "only {limited_steps} limited steps");
}

/// Swap the drain (index 0) and source (index 2) rows of a node-indexed
/// quantity.
fn mirrored(i: usize) -> usize {
    match i {
        0 => 2,
        2 => 0,
        other => other,
    }
}

#[test]
fn test_reversed_bias_mirrors_stamps() {
    let env = Env::without_bypass();
    let mut stamps = Vec::new();
    for values in [[1.0, 1.5, 0.0, 0.0], [0.0, 1.5, 1.0, 0.0]] {
        let mut model = nmos(&[1, 2, 3, 4], 1e-14);
        let mut circuit = Circuit::new(4);
        circuit.setup(&mut model, &env);
        let x = solution(&values);
        circuit.load_at(&mut model, &env, &x);
        circuit.load(&mut model, &env.dc(InitMode::Float), &x);
        let point = op(&model, "m1");
        assert!(!point.limited);
        stamps.push((point.frame.mode(), circuit.dense(), circuit.rhs()));
    }
    let (forward_mode, forward, forward_rhs) = &stamps[0];
    let (reverse_mode, reverse, reverse_rhs) = &stamps[1];
    assert_eq!(*forward_mode, Mode::Forward);
    assert_eq!(*reverse_mode, Mode::Reverse);
    for r in 0..4 {
        for c in 0..4 {
            assert_close(reverse[(mirrored(r), mirrored(c))], forward[(r, c)], 1e-12);
        }
        assert_close(reverse_rhs[mirrored(r)], forward_rhs[r], 1e-12);
    }
}

#[test]
fn test_repeated_load_is_idempotent() {
    let env = Env::without_bypass();
    let mut model = nmos(&[1, 2, 0, 0], 1e-14);
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);
    let x = solution(&[1.0, 1.5]);
    circuit.load_at(&mut model, &env, &x);

    let ctx = env.dc(InitMode::Float);
    circuit.load(&mut model, &ctx, &x);
    let first = (op(&model, "m1"), circuit.dense(), circuit.rhs());
    circuit.load(&mut model, &ctx, &x);
    let second = (op(&model, "m1"), circuit.dense(), circuit.rhs());
    assert_eq!(first, second);
    assert!(!second.0.bypassed);
    assert!(env.monitor.converged());
}

#[test]
fn test_bypass_reuses_operating_point() {
    let env = Env::new();
    let mut model = nmos(&[1, 2, 0, 0], 1e-14);
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);
    let x = solution(&[1.0, 1.5]);
    circuit.load_at(&mut model, &env, &x);
    let (dense, rhs) = (circuit.dense(), circuit.rhs());
    assert!(!op(&model, "m1").bypassed);

    circuit.load(&mut model, &env.dc(InitMode::Float), &x);
    assert!(op(&model, "m1").bypassed);
    assert_eq!(circuit.dense(), dense);
    assert_eq!(circuit.rhs(), rhs);

    // Bypass never happens outside the floating phase.
    circuit.load(&mut model, &env.dc(InitMode::Junction), &x);
    assert!(!op(&model, "m1").bypassed);
}

#[test]
fn test_bypass_never_keeps_a_stale_mode() {
    let env = Env::new();
    let mut model = nmos(&[1, 2, 0, 0], 1e-14);
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);
    let ctx = env.dc(InitMode::Float);
    let start = solution(&[1e-7, 1.5]);
    circuit.load_at(&mut model, &env, &start);
    circuit.load(&mut model, &ctx, &start);
    circuit.load(&mut model, &ctx, &start);
    assert_eq!(op(&model, "m1").frame.mode(), Mode::Forward);

    // Same orientation, within tolerance.
    circuit.load(&mut model, &ctx, &solution(&[2e-7, 1.5]));
    assert!(op(&model, "m1").bypassed);

    // Just as close, but drain and source swap roles.
    circuit.load(&mut model, &ctx, &solution(&[-1e-7, 1.5]));
    let flipped = op(&model, "m1");
    assert!(!flipped.bypassed);
    assert_eq!(flipped.frame.mode(), Mode::Reverse);
    assert!(flipped.bias.vds < 0.0);
}

#[test]
fn test_convergence_test() {
    let env = Env::without_bypass();
    let mut model = nmos(&[1, 2, 0, 0], 1e-14);
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);
    let x = solution(&[1.0, 1.5]);
    circuit.load_at(&mut model, &env, &x);

    let ctx = env.dc(InitMode::Float);
    assert_eq!(model.convergence_test(&ctx, &x), CheckState::Pass);
    assert!(env.monitor.converged());

    let moved = solution(&[1.0, 1.6]);
    assert_eq!(model.convergence_test(&ctx, &moved), CheckState::Fail);
    assert_eq!(env.monitor.count(), 1);
    assert_eq!(env.monitor.trouble().as_deref(), Some("m1"));
}

#[test]
fn test_off_device() {
    let env = Env::without_bypass();
    let mut model = nmos(&[1, 2, 0, 0], 1e-14);
    model
        .set_instance_param("m1", MosInstanceParam::Off as u32, ParamValue::Flag(true))
        .unwrap();
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);

    let x = solution(&[3.0, 2.5]);
    circuit.load_at(&mut model, &env, &x);
    assert_eq!(op(&model, "m1").bias, Bias::default());

    circuit.load(&mut model, &env.dc(InitMode::Float), &x);
    assert!(env.monitor.converged());
    let ctx = env.dc(InitMode::Float);
    assert_eq!(model.convergence_test(&ctx, &solution(&[0.0, 5.0])), CheckState::Pass);
}

#[test]
fn test_first_junction_iteration_uses_model_bias() {
    let env = Env::new();
    let mut model = nmos(&[1, 2, 0, 0], 1e-14);
    let mut circuit = Circuit::new(2);
    circuit.setup(&mut model, &env);
    circuit.load(&mut model, &env.dc(InitMode::Junction), &solution(&[0.0, 0.0]));
    let bias = op(&model, "m1").bias;
    assert_close(bias.vgs, 0.7, 1e-12);
    assert_eq!((bias.vds, bias.vbs), (0.0, -1.0));
}

#[test]
fn test_pmos_mirrors_nmos() {
    let env = Env::new();

    let mut n = nmos(&[1, 2, 0, 0], 1e-14);
    let mut nc = Circuit::new(2);
    nc.setup(&mut n, &env);
    nc.load_at(&mut n, &env, &solution(&[2.0, 2.0]));

    let mut p = MosfetModel::pmos("pmod")
        .with_instance("m1", &nodes(&[1, 2, 3, 3]))
        .unwrap();
    let mut pc = Circuit::new(3);
    pc.setup(&mut p, &env);
    pc.load_at(&mut p, &env, &solution(&[0.0, 0.0, 2.0]));

    let (np, pp) = (op(&n, "m1"), op(&p, "m1"));
    assert_eq!(np.bias, pp.bias);
    assert_eq!(pp.polarity, -1.0);
    let id = |point: &OperatingPoint| {
        point
            .current(Terminal::DrainPrime, Terminal::SourcePrime)
            .unwrap()
            .value
    };
    assert!(id(&np) > 0.0);
    assert_close(id(&pp), id(&np), 1e-12);
    assert_close(pc.dense()[(0, 0)], nc.dense()[(0, 0)], 1e-12);
    assert_close(pc.rhs()[0], -nc.rhs()[0], 1e-12);
}
