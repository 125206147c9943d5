//! FET model cards and the [`CompactModel`] implementation.

use compact_core::{
    CheckState, ElementHandle, LoadContext, MnaSystem, NodeId, SimOptions, StateStore,
};
use nalgebra::DVector;
use num_complex::Complex;
use rayon::prelude::*;

use super::distortion::DistortionInput;
use super::frame::Terminal;
use super::instance::{FetInstance, HandleTable, OperatingPoint};
use super::FetEquations;
use crate::compact::CompactModel;
use crate::error::{Error, Result};
use crate::param::ParamValue;

/// A model card of family `E` and its instances.
#[derive(Debug, Clone)]
pub struct FetModel<E: FetEquations> {
    name: String,
    model: E::Model,
    instances: Vec<FetInstance<E>>,
}

impl<E: FetEquations> FetModel<E> {
    pub fn new(name: impl Into<String>, model: E::Model) -> Self {
        Self {
            name: name.into(),
            model,
            instances: Vec::new(),
        }
    }

    pub fn model(&self) -> &E::Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut E::Model {
        &mut self.model
    }

    pub fn instances(&self) -> &[FetInstance<E>] {
        &self.instances
    }

    pub fn instance(&self, name: &str) -> Option<&FetInstance<E>> {
        self.instances.iter().find(|i| i.name == name)
    }

    pub fn instance_mut(&mut self, name: &str) -> Option<&mut FetInstance<E>> {
        self.instances.iter_mut().find(|i| i.name == name)
    }

    /// Builder-style placement of an instance.
    pub fn with_instance(mut self, name: &str, nodes: &[NodeId]) -> Result<Self> {
        self.add_instance(name, nodes)?;
        Ok(self)
    }

    fn find(&self, name: &str) -> Result<&FetInstance<E>> {
        self.instance(name)
            .ok_or_else(|| Error::UnknownInstance(name.to_string()))
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut FetInstance<E>> {
        self.instance_mut(name)
            .ok_or_else(|| Error::UnknownInstance(name.to_string()))
    }
}

fn setup_instance<E: FetEquations>(
    model: &E::Model,
    inst: &mut FetInstance<E>,
    mna: &mut MnaSystem,
    states: &mut StateStore,
    options: &SimOptions,
) -> Result<()> {
    E::setup_instance(model, &mut inst.params, options);

    let (rd, rs) = E::series_resistance(model, &inst.params);
    if rd > 0.0 && inst.drain_prime.is_none() {
        let node = mna.create_node(format!("{}#drain", inst.name));
        log::debug!("{}: drain prime node {}", inst.name, node);
        inst.drain_prime = Some(node);
    }
    if rs > 0.0 && inst.source_prime.is_none() {
        let node = mna.create_node(format!("{}#source", inst.name));
        log::debug!("{}: source prime node {}", inst.name, node);
        inst.source_prime = Some(node);
    }

    if inst.state_offset.is_none() {
        inst.state_offset = Some(states.reserve(E::state_count()));
    }

    let nodes = inst.nodes();
    let mut table: HandleTable = [[ElementHandle::TRASH; Terminal::COUNT]; Terminal::COUNT];
    for (row, handles) in table.iter_mut().enumerate() {
        for (col, handle) in handles.iter_mut().enumerate() {
            *handle = mna.acquire(nodes[row], nodes[col])?;
        }
    }
    inst.handles = Some(table);
    Ok(())
}

impl<E: FetEquations> CompactModel for FetModel<E> {
    fn family(&self) -> &'static str {
        E::FAMILY
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn instance_names(&self) -> Vec<&str> {
        self.instances.iter().map(|i| i.name()).collect()
    }

    fn add_instance(&mut self, name: &str, nodes: &[NodeId]) -> Result<()> {
        self.instances.push(FetInstance::new(name, nodes)?);
        Ok(())
    }

    fn setup(
        &mut self,
        mna: &mut MnaSystem,
        states: &mut StateStore,
        options: &SimOptions,
    ) -> Result<()> {
        E::setup_model(&mut self.model, options);
        for inst in &mut self.instances {
            setup_instance(&self.model, inst, mna, states, options)?;
        }
        Ok(())
    }

    fn unsetup(&mut self) {
        for inst in &mut self.instances {
            inst.drain_prime = None;
            inst.source_prime = None;
            inst.state_offset = None;
            inst.handles = None;
            inst.state = Default::default();
            inst.backup = None;
        }
    }

    fn temperature(&mut self, options: &SimOptions) -> Result<()> {
        for inst in &mut self.instances {
            if inst.handles.is_none() {
                return Err(Error::NotSetUp(inst.name.clone()));
            }
            inst.derived = Some(E::temperature(&self.model, &inst.params, options));
        }
        Ok(())
    }

    fn evaluate(
        &self,
        ctx: &LoadContext<'_>,
        solution: &DVector<f64>,
        states: &StateStore,
    ) -> Result<Vec<OperatingPoint>> {
        if ctx.options.parallel_load {
            self.instances
                .par_iter()
                .map(|inst| inst.evaluate(ctx, solution, states))
                .collect()
        } else {
            self.instances
                .iter()
                .map(|inst| inst.evaluate(ctx, solution, states))
                .collect()
        }
    }

    fn commit(
        &mut self,
        ctx: &LoadContext<'_>,
        ops: Vec<OperatingPoint>,
        states: &mut StateStore,
        mna: &mut MnaSystem,
    ) -> Result<()> {
        for (inst, op) in self.instances.iter_mut().zip(ops) {
            inst.commit(ctx, op, states, mna)?;
        }
        Ok(())
    }

    fn ac_load(&self, omega: f64, mna: &mut MnaSystem) -> Result<()> {
        self.instances
            .iter()
            .try_for_each(|inst| inst.ac_load(omega, mna))
    }

    fn pz_load(&self, s: Complex<f64>, mna: &mut MnaSystem) -> Result<()> {
        self.instances
            .iter()
            .try_for_each(|inst| inst.pz_load(s, mna))
    }

    fn disto_setup(&mut self, options: &SimOptions) -> Result<()> {
        self.instances
            .iter_mut()
            .try_for_each(|inst| inst.disto_setup(options))
    }

    fn disto_load(&self, input: &DistortionInput<'_>, mna: &mut MnaSystem) -> Result<()> {
        self.instances
            .iter()
            .try_for_each(|inst| inst.disto_load(input, mna))
    }

    fn truncation_timestep(&self, ctx: &LoadContext<'_>, states: &StateStore) -> f64 {
        self.instances
            .iter()
            .map(|inst| inst.truncation_timestep(ctx, states))
            .fold(f64::INFINITY, f64::min)
    }

    fn convergence_test(&self, ctx: &LoadContext<'_>, solution: &DVector<f64>) -> CheckState {
        let mut result = CheckState::Pass;
        for inst in &self.instances {
            if inst.convergence_test(solution, ctx.options) == CheckState::Fail {
                ctx.monitor.record_failure(inst.name());
                result = CheckState::Fail;
            }
        }
        result
    }

    fn set_initial_conditions(&mut self, solution: &DVector<f64>) {
        for inst in &mut self.instances {
            inst.set_initial_conditions(solution);
        }
    }

    fn model_param(&self, key: u32) -> Result<ParamValue> {
        E::model_param(&self.model, key)
    }

    fn set_model_param(&mut self, key: u32, value: ParamValue) -> Result<()> {
        E::set_model_param(&mut self.model, key, &value)
    }

    fn instance_param(&self, instance: &str, key: u32) -> Result<ParamValue> {
        E::instance_param(&self.find(instance)?.params, key)
    }

    fn set_instance_param(&mut self, instance: &str, key: u32, value: ParamValue) -> Result<()> {
        E::set_instance_param(&mut self.find_mut(instance)?.params, key, &value)
    }

    fn save(&mut self) {
        for inst in &mut self.instances {
            inst.save();
        }
    }

    fn restore(&mut self) -> Result<()> {
        self.instances.iter_mut().try_for_each(|inst| inst.restore())
    }

    fn clear_backups(&mut self) {
        for inst in &mut self.instances {
            inst.clear_backup();
        }
    }
}
