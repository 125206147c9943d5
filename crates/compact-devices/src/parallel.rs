//! Loading several models at once.
//!
//! Evaluation only reads the solution, the state history and each model's
//! own data, so models are evaluated on the rayon pool. Writing states and
//! stamping the matrix then happens on the calling thread, model by model,
//! in the order given. The matrix and the state store never see concurrent
//! writers, and the result does not depend on the number of threads.

use compact_core::{LoadContext, MnaSystem, StateStore};
use nalgebra::DVector;
use rayon::prelude::*;

use crate::compact::CompactModel;
use crate::error::Result;
use crate::fet::OperatingPoint;

/// Newton load of every model.
///
/// Runs evaluation in parallel when `ctx.options.parallel_load` is set.
/// Every model is evaluated before any is committed; if any evaluation
/// fails, nothing is written.
pub fn load_all(
    models: &mut [Box<dyn CompactModel>],
    ctx: &LoadContext<'_>,
    solution: &DVector<f64>,
    states: &mut StateStore,
    mna: &mut MnaSystem,
) -> Result<()> {
    let shared: &StateStore = states;
    let evaluated: Vec<Vec<OperatingPoint>> = if ctx.options.parallel_load {
        models
            .par_iter()
            .map(|model| model.evaluate(ctx, solution, shared))
            .collect::<Result<_>>()?
    } else {
        models
            .iter()
            .map(|model| model.evaluate(ctx, solution, shared))
            .collect::<Result<_>>()?
    };
    log::trace!("evaluated {} models", evaluated.len());

    for (model, ops) in models.iter_mut().zip(evaluated) {
        model.commit(ctx, ops, states, mna)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_core::{Analysis, ConvergenceMonitor, InitMode, Integrator, NodeId, SimOptions};

    use crate::mosfet::MosfetModel;

    fn circuit(options: &SimOptions) -> (Vec<Box<dyn CompactModel>>, MnaSystem, StateStore) {
        let mut mna = MnaSystem::new(4);
        let mut states = StateStore::default();
        let nodes = |d, g, s, b| [d, g, s, b].map(NodeId::new);
        let mut n = MosfetModel::nmos("n");
        let mut p = MosfetModel::pmos("p");
        for i in 0..4 {
            n.add_instance(&format!("mn{i}"), &nodes(1, 2, 0, 0)).unwrap();
            p.add_instance(&format!("mp{i}"), &nodes(1, 2, 3, 3)).unwrap();
        }
        let mut models: Vec<Box<dyn CompactModel>> = vec![Box::new(n), Box::new(p)];
        for model in &mut models {
            model.setup(&mut mna, &mut states, options).unwrap();
            model.temperature(options).unwrap();
        }
        (models, mna, states)
    }

    fn load(parallel: bool) -> (Vec<f64>, Vec<f64>) {
        let options = SimOptions {
            parallel_load: parallel,
            ..SimOptions::default()
        };
        let (mut models, mut mna, mut states) = circuit(&options);
        let integrator = Integrator::default();
        let monitor = ConvergenceMonitor::new();
        let ctx = LoadContext::new(&options, &integrator, &monitor)
            .with_analysis(Analysis::Dc)
            .with_init(InitMode::Float);
        let solution = DVector::from_vec(vec![1.5, 1.2, 3.0, 0.0]);
        load_all(&mut models, &ctx, &solution, &mut states, &mut mna).unwrap();
        (mna.to_dense().as_slice().to_vec(), mna.rhs_vector().as_slice().to_vec())
    }

    #[test]
    fn test_parallel_matches_serial() {
        assert_eq!(load(false), load(true));
    }
}
