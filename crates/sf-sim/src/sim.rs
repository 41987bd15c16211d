//! Simulation driver: reset, threaded stepping, non-finite diagnosis.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use sf_compile::{CompileError, CompiledSystem, compile};
use sf_core::Real;
use sf_graph::{Graph, ValueId};
use tracing::{debug, warn};

use crate::error::{SimError, SimResult};
use crate::hooks::{DisplayHook, NullHook};
use crate::integrator::{Derivatives, IntegratorKind};
use crate::log::RunLogger;

/// A reset cheaper than this may run synchronously even while a step
/// worker holds the stepping flag (the flag is then a re-entrancy guard
/// fired from a display callback, not a real data race).
const CHEAP_RESET: Duration = Duration::from_millis(150);

/// Throttle for redraw requests issued from the step loop.
const REDRAW_INTERVAL: Duration = Duration::from_millis(50);

/// Fixed-step solver parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverParams {
    /// Simulation start time.
    pub t0: Real,
    /// Step size.
    pub step: Real,
    /// Steps taken per call to [`Simulator::step`].
    pub n_steps: usize,
    /// Integration order: 1 (Euler), 2 (midpoint) or 4 (RK4).
    pub order: usize,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            t0: 0.0,
            step: 0.01,
            n_steps: 1,
            order: 4,
        }
    }
}

struct SystemDerivatives<'a> {
    sys: &'a CompiledSystem,
    flow: &'a mut [Real],
}

impl Derivatives for SystemDerivatives<'_> {
    fn rhs(&mut self, t: Real, stock: &[Real], d: &mut [Real]) -> SimResult<()> {
        self.sys.derivatives(self.flow, stock, t, d);
        Ok(())
    }
}

/// Owns the compiled system and the numeric state, and drives stepping.
///
/// `step` runs the integration on a spawned worker thread over a private
/// copy of the stock vector; the shared arrays are only swapped in after a
/// successful join, so readers on the calling thread never observe a
/// half-stepped state.
pub struct Simulator {
    pub params: SolverParams,
    compiled: Option<Arc<CompiledSystem>>,
    flow: Vec<Real>,
    stock: Vec<Real>,
    t: Real,
    running: bool,
    stepping: Arc<AtomicBool>,
    pending_reset: bool,
    last_reset_duration: Duration,
    logger: Option<RunLogger>,
    hook: Box<dyn DisplayHook>,
    last_redraw: Instant,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SolverParams::default())
    }
}

impl Simulator {
    pub fn new(params: SolverParams) -> Self {
        Simulator {
            params,
            compiled: None,
            flow: Vec::new(),
            stock: Vec::new(),
            t: 0.0,
            running: false,
            stepping: Arc::new(AtomicBool::new(false)),
            pending_reset: false,
            last_reset_duration: Duration::ZERO,
            logger: None,
            hook: Box::new(NullHook),
            last_redraw: Instant::now(),
        }
    }

    pub fn set_hook(&mut self, hook: Box<dyn DisplayHook>) {
        self.hook = hook;
    }

    pub fn time(&self) -> Real {
        self.t
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True while a step worker is mid-flight (observable from display
    /// callbacks fired during the step).
    pub fn is_stepping(&self) -> bool {
        self.stepping.load(Ordering::Acquire)
    }

    pub fn compiled(&self) -> Option<&CompiledSystem> {
        self.compiled.as_deref()
    }

    /// Drop the compiled system; the next step recompiles and
    /// reinitialises. Called after any structural edit.
    pub fn invalidate(&mut self) {
        self.compiled = None;
        self.running = false;
    }

    /// Begin logging watched variables to `path`. Takes effect from the
    /// next reset or step.
    pub fn open_log(&mut self, path: &Path, watched: &[ValueId]) -> SimResult<()> {
        self.logger = Some(RunLogger::create(path, watched)?);
        Ok(())
    }

    pub fn close_log(&mut self) {
        self.logger = None;
    }

    /// Recompile and reinitialise. Returns `Ok(false)` when the reset was
    /// deferred because a step worker is mid-flight; the worker's caller
    /// performs it as soon as the step completes.
    pub fn reset(&mut self, graph: &mut Graph) -> SimResult<bool> {
        if self.stepping.load(Ordering::Acquire) && self.last_reset_duration >= CHEAP_RESET {
            debug!("reset deferred until the current step completes");
            self.pending_reset = true;
            return Ok(false);
        }
        self.reset_now(graph)?;
        Ok(true)
    }

    fn reset_now(&mut self, graph: &mut Graph) -> SimResult<()> {
        let started = Instant::now();
        self.pending_reset = false;
        self.running = false;
        self.t = self.params.t0;

        let mut sys = match compile(graph) {
            Ok(sys) => sys,
            Err(e) => {
                if let CompileError::CyclicNetwork { item } = e {
                    self.hook.highlight_item(item);
                }
                self.compiled = None;
                return Err(e.into());
            }
        };
        // The integrators assume at least one stock slot; give an inert one
        // to models made only of flows.
        if sys.n_stock == 0 {
            sys.n_stock = 1;
            sys.stock_names.push("@dummy".to_string());
        }

        self.flow = vec![0.0; sys.n_flow];
        self.stock = vec![0.0; sys.n_stock];
        sys.apply_inits(&mut self.flow, &mut self.stock);
        sys.eval_equations(&mut self.flow, &self.stock, self.t);

        self.compiled = Some(Arc::new(sys));
        self.publish_values(graph);
        if let Some(logger) = &mut self.logger {
            logger.bind(graph);
        }
        self.hook.reset_displays();
        self.hook.request_redraw();
        self.last_redraw = Instant::now();
        self.last_reset_duration = started.elapsed();
        debug!(elapsed = ?self.last_reset_duration, "simulation reset");
        Ok(())
    }

    /// Advance the simulation by `n_steps` steps of size `step` on a worker
    /// thread. Returns the new time and the step size used.
    pub fn step(&mut self, graph: &mut Graph) -> SimResult<(Real, Real)> {
        if self.pending_reset || self.compiled.is_none() {
            self.reset_now(graph)?;
        }
        let sys = match &self.compiled {
            Some(sys) => Arc::clone(sys),
            None => {
                return Err(SimError::InvalidArg {
                    what: "no compiled system",
                });
            }
        };
        let integrator = IntegratorKind::from_order(self.params.order)?;
        if !(self.params.step > 0.0) {
            return Err(SimError::InvalidArg {
                what: "step must be positive",
            });
        }

        self.running = true;
        self.stepping.store(true, Ordering::Release);

        let mut stock = self.stock.clone();
        let mut flow = self.flow.clone();
        let t0 = self.t;
        let dt = self.params.step;
        let n_steps = self.params.n_steps.max(1);
        let worker = thread::spawn(move || -> SimResult<(Vec<Real>, Vec<Real>, Real)> {
            let mut t = t0;
            for _ in 0..n_steps {
                let mut model = SystemDerivatives {
                    sys: &sys,
                    flow: &mut flow,
                };
                integrator.step(&mut model, t, &mut stock, dt)?;
                t += dt;
            }
            Ok((stock, flow, t))
        });
        let joined = worker.join();
        self.stepping.store(false, Ordering::Release);

        let (stock, flow, t) = match joined {
            Err(_) => {
                self.running = false;
                warn!("step worker panicked");
                self.hook.simulation_error("simulation worker panicked");
                return Err(SimError::WorkerPanic);
            }
            Ok(Err(e)) => {
                self.running = false;
                self.hook.simulation_error(&e.to_string());
                return Err(e);
            }
            Ok(Ok(result)) => result,
        };

        if self.pending_reset {
            self.reset_now(graph)?;
            return Ok((self.t, dt));
        }

        self.stock = stock;
        self.flow = flow;
        self.t = t;
        if let Some(sys) = &self.compiled {
            // Flows were last evaluated at an intermediate integrator
            // substep; bring them to the accepted state.
            sys.eval_equations(&mut self.flow, &self.stock, self.t);
        }
        self.publish_values(graph);

        if let Some(msg) = self.diagnose_non_finite(graph) {
            self.running = false;
            self.hook.simulation_error(&msg);
            return Err(SimError::NonFinite { what: msg });
        }

        if let Some(logger) = &mut self.logger {
            // a logger opened after the last reset has no slots yet
            if !logger.is_bound() {
                logger.bind(graph);
            }
            logger.log_line(self.t, &self.flow, &self.stock)?;
        }
        if self.last_redraw.elapsed() >= REDRAW_INTERVAL {
            self.hook.request_redraw();
            self.last_redraw = Instant::now();
        }
        Ok((self.t, dt))
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Copy slot contents back onto the graph's variable values so
    /// displays read current numbers without touching the slot arrays.
    fn publish_values(&self, graph: &mut Graph) {
        for (_, value) in graph.values.iter_mut() {
            if let Some(slot) = value.slot {
                value.value = if value.kind.is_stock_like() {
                    self.stock.get(slot).copied().unwrap_or(f64::NAN)
                } else {
                    self.flow.get(slot).copied().unwrap_or(f64::NAN)
                };
            }
        }
    }

    /// Name the first non-finite quantity in the current state, if any.
    /// Variables are checked first (their names mean something to the
    /// modeller), then raw equation outputs.
    pub fn diagnose_non_finite(&self, graph: &Graph) -> Option<String> {
        for (id, value) in graph.values.iter() {
            if value.slot.is_some() && !value.value.is_finite() {
                return Some(format!("variable {id}"));
            }
        }
        let sys = self.compiled.as_deref()?;
        for eq in &sys.equations {
            if let Some(out) = self.flow.get(eq.out)
                && !out.is_finite()
            {
                return Some(format!("operation {}", eq.kind.name()));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_graph::{OpKind, VarKind, value_id};

    fn variable(graph: &mut Graph, name: &str, kind: VarKind, init: &str) -> sf_core::ItemId {
        graph.add_variable(&value_id(None, name), kind, init)
    }

    /// dx/dt = -x, x(0) = 1: a stock whose inflow is its own negation.
    fn decay_model(graph: &mut Graph) {
        let x = variable(graph, "x", VarKind::Stock, "1");
        let neg = graph.add_op(OpKind::Neg);
        let x_out = graph.item(x).unwrap().output_port().unwrap();
        let neg_in = graph.item(neg).unwrap().input_ports()[0];
        let neg_out = graph.item(neg).unwrap().output_port().unwrap();
        let x_in = graph.item(x).unwrap().input_ports()[0];
        graph.add_wire(x_out, neg_in).unwrap();
        graph.add_wire(neg_out, x_in).unwrap();
    }

    #[test]
    fn reset_is_idempotent() {
        let mut graph = Graph::default();
        decay_model(&mut graph);
        let mut sim = Simulator::default();
        sim.reset(&mut graph).unwrap();
        let first = graph.values.get(":x").unwrap().value;
        sim.reset(&mut graph).unwrap();
        let second = graph.values.get(":x").unwrap().value;
        assert_eq!(first, 1.0);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_model_steps_with_dummy_stock() {
        let mut graph = Graph::default();
        let mut sim = Simulator::default();
        sim.reset(&mut graph).unwrap();
        assert_eq!(sim.compiled().unwrap().n_stock, 1);
        let (t, dt) = sim.step(&mut graph).unwrap();
        assert_eq!(dt, 0.01);
        assert!((t - 0.01).abs() < 1e-12);
    }

    #[test]
    fn decay_matches_exponential() {
        let mut graph = Graph::default();
        decay_model(&mut graph);
        let mut sim = Simulator::new(SolverParams {
            step: 0.1,
            n_steps: 10,
            ..SolverParams::default()
        });
        sim.reset(&mut graph).unwrap();
        let (t, _) = sim.step(&mut graph).unwrap();
        assert!((t - 1.0).abs() < 1e-9);
        let x = graph.values.get(":x").unwrap().value;
        assert!((x - (-1.0f64).exp()).abs() < 1e-6, "x = {x}");
    }

    #[test]
    fn euler_order_param_selects_integrator() {
        let mut graph = Graph::default();
        decay_model(&mut graph);
        let mut sim = Simulator::new(SolverParams {
            step: 0.1,
            n_steps: 10,
            order: 1,
            ..SolverParams::default()
        });
        sim.reset(&mut graph).unwrap();
        sim.step(&mut graph).unwrap();
        let x = graph.values.get(":x").unwrap().value;
        let expected = 0.9f64.powi(10);
        assert!((x - expected).abs() < 1e-9, "x = {x}");
    }

    #[test]
    fn unsupported_order_is_rejected() {
        let mut graph = Graph::default();
        let mut sim = Simulator::new(SolverParams {
            order: 3,
            ..SolverParams::default()
        });
        sim.reset(&mut graph).unwrap();
        assert!(matches!(
            sim.step(&mut graph),
            Err(SimError::InvalidArg { .. })
        ));
    }

    #[test]
    fn division_by_zero_is_diagnosed_by_name() {
        let mut graph = Graph::default();
        let one = variable(&mut graph, "one", VarKind::Parameter, "1");
        let zero = variable(&mut graph, "zero", VarKind::Parameter, "0");
        let div = graph.add_op(OpKind::Div);
        let out = variable(&mut graph, "ratio", VarKind::Flow, "0");
        let one_out = graph.item(one).unwrap().output_port().unwrap();
        let zero_out = graph.item(zero).unwrap().output_port().unwrap();
        let div_in0 = graph.item(div).unwrap().input_ports()[0];
        let div_in1 = graph.item(div).unwrap().input_ports()[1];
        let div_out = graph.item(div).unwrap().output_port().unwrap();
        let out_in = graph.item(out).unwrap().input_ports()[0];
        graph.add_wire(one_out, div_in0).unwrap();
        graph.add_wire(zero_out, div_in1).unwrap();
        graph.add_wire(div_out, out_in).unwrap();

        let mut sim = Simulator::default();
        sim.reset(&mut graph).unwrap();
        let err = sim.step(&mut graph).unwrap_err();
        match err {
            SimError::NonFinite { what } => assert!(what.contains(":ratio"), "{what}"),
            other => panic!("unexpected error {other}"),
        }
        assert!(!sim.is_running());
    }

    #[test]
    fn cyclic_model_fails_reset_and_highlights() {
        use std::sync::Mutex;
        use std::sync::OnceLock;

        static HIGHLIGHTED: OnceLock<Mutex<Vec<sf_core::ItemId>>> = OnceLock::new();

        struct Recorder;
        impl DisplayHook for Recorder {
            fn highlight_item(&mut self, item: sf_core::ItemId) {
                HIGHLIGHTED
                    .get_or_init(|| Mutex::new(Vec::new()))
                    .lock()
                    .unwrap()
                    .push(item);
            }
        }

        let mut graph = Graph::default();
        let a = variable(&mut graph, "a", VarKind::Flow, "0");
        let neg = graph.add_op(OpKind::Neg);
        let a_out = graph.item(a).unwrap().output_port().unwrap();
        let a_in = graph.item(a).unwrap().input_ports()[0];
        let neg_in = graph.item(neg).unwrap().input_ports()[0];
        let neg_out = graph.item(neg).unwrap().output_port().unwrap();
        graph.add_wire(a_out, neg_in).unwrap();
        graph.add_wire(neg_out, a_in).unwrap();

        let mut sim = Simulator::default();
        sim.set_hook(Box::new(Recorder));
        assert!(matches!(
            sim.reset(&mut graph),
            Err(SimError::Compile(CompileError::CyclicNetwork { .. }))
        ));
        assert!(
            !HIGHLIGHTED
                .get_or_init(|| Mutex::new(Vec::new()))
                .lock()
                .unwrap()
                .is_empty()
        );
    }
}
