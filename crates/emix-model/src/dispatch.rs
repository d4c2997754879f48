//! MILP dispatch-and-investment model.
//!
//! Builds the operation/investment problem for an [`EnergySystem`] over
//! `good_lp`'s object model and solves the **LP relaxation** in-process with
//! the Clarabel backend: commitment and line-build binaries are relaxed to
//! [0, 1]. Exact MILP solves go through an external engine chosen by
//! `emix-solver`; this path is the always-available pure-Rust route.
//!
//! Formulation per period t:
//! - generator: min*u ≤ p ≤ max*u, ramp limits, startup/shutdown tracking
//! - storage: soc(t) = soc(t-1) + h*(η*charge - discharge) + inflow - spill
//! - retail: buy/sell bounded by contract limits
//! - demand: served + non-served = profile; flexible demands reshape the
//!   profile across periods while conserving its total energy
//! - network: DC flow b*(θ_from - θ_to), candidate lines gated by a relaxed
//!   build decision with Big-M physics linking
//!
//! Objective: operation (fuel, commitment, startup, emissions, retail net
//! cost, non-served energy penalty) plus line investment.

use emix_core::EnergySystem;
use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Model construction/solve errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The input system failed validation.
    #[error("invalid system: {0}")]
    Validation(String),

    /// The relaxed problem is infeasible.
    #[error("dispatch problem is infeasible")]
    Infeasible,

    /// The in-process solver failed for another reason.
    #[error("solver failed: {0}")]
    SolverFailed(String),
}

/// Knobs for the relaxed solve.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Big-M constant linking candidate-line flow to DC physics.
    pub big_m: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { big_m: 1e4 }
    }
}

/// Per-generator dispatch profile.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GeneratorDispatch {
    pub name: String,
    pub output_mw: Vec<f64>,
}

/// Per-storage state-of-charge profile.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageProfile {
    pub name: String,
    pub soc_mwh: Vec<f64>,
}

/// Build decision for one candidate line (relaxed value and its rounding).
#[derive(Debug, Clone, serde::Serialize)]
pub struct LineBuild {
    pub name: String,
    /// Relaxed build variable in [0, 1].
    pub build_fraction: f64,
    /// Rounded decision.
    pub build: bool,
    pub invest_cost: f64,
}

/// Solution of the relaxed dispatch problem.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchSolution {
    pub objective: f64,
    pub operation_cost: f64,
    pub investment_cost: f64,
    pub dispatch: Vec<GeneratorDispatch>,
    pub storage: Vec<StorageProfile>,
    /// Non-served energy per demand per period, MWh.
    pub non_served_mwh: Vec<(String, Vec<f64>)>,
    pub built_lines: Vec<LineBuild>,
    pub solve_time_ms: u128,
}

impl DispatchSolution {
    /// One-paragraph human-readable summary.
    pub fn summary(&self) -> String {
        let nse: f64 = self
            .non_served_mwh
            .iter()
            .flat_map(|(_, profile)| profile.iter())
            .sum();
        let built = self.built_lines.iter().filter(|l| l.build).count();
        format!(
            "objective {:.2} (operation {:.2}, investment {:.2}), \
             non-served energy {:.3} MWh, lines built {} of {}, solved in {} ms",
            self.objective,
            self.operation_cost,
            self.investment_cost,
            nse,
            built,
            self.built_lines.len(),
            self.solve_time_ms
        )
    }
}

/// Build and solve the relaxed dispatch problem in-process.
pub fn solve_relaxed(
    system: &EnergySystem,
    config: &ModelConfig,
) -> Result<DispatchSolution, ModelError> {
    system
        .validate()
        .map_err(|e| ModelError::Validation(e.to_string()))?;

    let start = Instant::now();
    let n = system.horizon.periods;
    let hours = system.horizon.hours_per_period;
    let n_bus = system.buses.len();
    let ref_bus = 0usize;

    let mut vars = variables!();
    let mut operation_cost = Expression::from(0.0);
    let mut investment_cost = Expression::from(0.0);

    // Generator variables: output p, relaxed commitment u, startup/shutdown.
    struct GenVars {
        bus: usize,
        p: Vec<Variable>,
        u: Vec<Variable>,
        startup: Vec<Variable>,
        shutdown: Vec<Variable>,
    }
    let mut gen_vars: Vec<GenVars> = Vec::with_capacity(system.generators.len());
    for gen in &system.generators {
        let bus = system.bus_index(&gen.bus).expect("validated bus");
        let mut gv = GenVars {
            bus,
            p: Vec::with_capacity(n),
            u: Vec::with_capacity(n),
            startup: Vec::new(),
            shutdown: Vec::new(),
        };
        let marginal = gen.linear_cost + gen.co2_rate * gen.emission_cost_per_ton;
        for _ in 0..n {
            let p_var = vars.add(variable().min(0.0).max(gen.max_power_mw));
            let u_var = vars.add(variable().min(0.0).max(1.0));
            operation_cost += hours * marginal * p_var + gen.constant_cost * u_var;
            gv.p.push(p_var);
            gv.u.push(u_var);
        }
        if gen.startup_cost > 0.0 || gen.shutdown_cost > 0.0 {
            for _ in 0..n {
                let su = vars.add(variable().min(0.0).max(1.0));
                let sd = vars.add(variable().min(0.0).max(1.0));
                operation_cost += gen.startup_cost * su + gen.shutdown_cost * sd;
                gv.startup.push(su);
                gv.shutdown.push(sd);
            }
        }
        gen_vars.push(gv);
    }

    // Storage variables: charge, discharge, state of charge, spillage.
    struct StorageVars {
        bus: usize,
        charge: Vec<Variable>,
        discharge: Vec<Variable>,
        soc: Vec<Variable>,
        spill: Vec<Variable>,
    }
    let mut storage_vars: Vec<StorageVars> = Vec::with_capacity(system.storages.len());
    for st in &system.storages {
        let bus = system.bus_index(&st.bus).expect("validated bus");
        let mut sv = StorageVars {
            bus,
            charge: Vec::with_capacity(n),
            discharge: Vec::with_capacity(n),
            soc: Vec::with_capacity(n),
            spill: Vec::with_capacity(n),
        };
        for _ in 0..n {
            sv.charge.push(vars.add(variable().min(0.0).max(st.max_charge_mw)));
            sv.discharge
                .push(vars.add(variable().min(0.0).max(st.max_discharge_mw)));
            sv.soc.push(vars.add(variable().min(0.0).max(st.capacity_mwh)));
            sv.spill.push(vars.add(variable().min(0.0)));
        }
        storage_vars.push(sv);
    }

    // Demand: non-served energy, bounded by the profile. Flexible demands
    // additionally get a reshapeable served profile, bounded per period by
    // the profile's peak.
    struct DemandVars {
        bus: usize,
        nse: Vec<Variable>,
        /// Per-period served power; populated only for flexible demands.
        served: Vec<Variable>,
    }
    let mut demand_vars: Vec<DemandVars> = Vec::with_capacity(system.demands.len());
    for dem in &system.demands {
        let bus = system.bus_index(&dem.bus).expect("validated bus");
        let peak = dem.profile_mw.iter().fold(0.0_f64, |acc, &p| acc.max(p));
        let mut dv = DemandVars {
            bus,
            nse: Vec::with_capacity(n),
            served: Vec::new(),
        };
        for t in 0..n {
            let cap = if dem.flexible {
                peak
            } else {
                dem.profile_mw[t].max(0.0)
            };
            let nse = vars.add(variable().min(0.0).max(cap));
            operation_cost += hours * dem.nse_cost * nse;
            dv.nse.push(nse);
        }
        if dem.flexible {
            for _ in 0..n {
                dv.served.push(vars.add(variable().min(0.0).max(peak)));
            }
        }
        demand_vars.push(dv);
    }

    // Retail: buy from / sell to the upstream market.
    struct RetailVars {
        bus: usize,
        buy: Vec<Variable>,
        sell: Vec<Variable>,
    }
    let mut retail_vars: Vec<RetailVars> = Vec::with_capacity(system.retails.len());
    for ret in &system.retails {
        let bus = system.bus_index(&ret.bus).expect("validated bus");
        let mut rv = RetailVars {
            bus,
            buy: Vec::with_capacity(n),
            sell: Vec::with_capacity(n),
        };
        for t in 0..n {
            let buy = vars.add(variable().min(0.0).max(ret.max_buy_mw));
            let sell = vars.add(variable().min(0.0).max(ret.max_sell_mw));
            operation_cost += hours * (ret.buy_price[t] * buy - ret.sell_price[t] * sell);
            rv.buy.push(buy);
            rv.sell.push(sell);
        }
        retail_vars.push(rv);
    }

    // Bus angles (reference bus fixed at zero, no variable).
    let mut theta: HashMap<(usize, usize), Variable> = HashMap::new();
    if !system.lines.is_empty() {
        for b in 0..n_bus {
            if b == ref_bus {
                continue;
            }
            for t in 0..n {
                theta.insert(
                    (b, t),
                    vars.add(variable().min(-std::f64::consts::PI).max(std::f64::consts::PI)),
                );
            }
        }
    }

    // Candidate lines: one relaxed build decision per line, a flow variable
    // per period. Existing lines flow directly from the angle difference.
    struct CandVars {
        line: usize,
        build: Variable,
        flow: Vec<Variable>,
    }
    let mut cand_vars: Vec<CandVars> = Vec::new();
    for (l, line) in system.lines.iter().enumerate() {
        if !line.candidate {
            continue;
        }
        let build = vars.add(variable().min(0.0).max(1.0));
        investment_cost += line.invest_cost * build;
        let mut flow = Vec::with_capacity(n);
        for _ in 0..n {
            flow.push(vars.add(variable().min(-line.capacity_mw).max(line.capacity_mw)));
        }
        cand_vars.push(CandVars { line: l, build, flow });
    }

    let objective = operation_cost.clone() + investment_cost.clone();
    let mut model = vars.minimise(objective).using(clarabel);

    // Generator output/commitment coupling, ramps, transitions.
    for (gen, gv) in system.generators.iter().zip(&gen_vars) {
        for t in 0..n {
            let u = gv.u[t];
            model = model.with(constraint!(gv.p[t] <= gen.max_power_mw * u));
            if gen.min_power_mw > 0.0 {
                model = model.with(constraint!(gv.p[t] >= gen.min_power_mw * u));
            }
            if t > 0 {
                if gen.ramp_up_mw > 0.0 {
                    model = model.with(constraint!(gv.p[t] - gv.p[t - 1] <= gen.ramp_up_mw));
                }
                if gen.ramp_down_mw > 0.0 {
                    model = model.with(constraint!(gv.p[t - 1] - gv.p[t] <= gen.ramp_down_mw));
                }
            }
            if !gv.startup.is_empty() {
                let su = gv.startup[t];
                if t == 0 {
                    // Units start the horizon off, so the first committed
                    // period pays the startup cost. The shutdown bound is
                    // implied by sd >= 0 in that case.
                    model = model.with(constraint!(su >= u));
                } else {
                    let prev = gv.u[t - 1];
                    let sd = gv.shutdown[t];
                    model = model.with(constraint!(su >= u - prev));
                    model = model.with(constraint!(sd >= prev - u));
                }
            }
        }
    }

    // Storage energy balance.
    for (st, sv) in system.storages.iter().zip(&storage_vars) {
        for t in 0..n {
            let delta = hours * (st.efficiency * sv.charge[t] - sv.discharge[t]);
            let balance: Expression = if t == 0 {
                st.initial_soc_mwh + delta + st.inflow_mwh - sv.spill[t]
            } else {
                sv.soc[t - 1] + delta + st.inflow_mwh - sv.spill[t]
            };
            model = model.with(constraint!(sv.soc[t] == balance));
        }
    }

    // Network flows and per-bus power balance.
    let angle = |b: usize, t: usize| -> Expression {
        if b == ref_bus {
            Expression::from(0.0)
        } else {
            Expression::from(theta[&(b, t)])
        }
    };

    for t in 0..n {
        // Net outflow expression per bus for this period.
        let mut net_out: Vec<Expression> = (0..n_bus).map(|_| Expression::from(0.0)).collect();

        for (l, line) in system.lines.iter().enumerate() {
            let i = system.bus_index(&line.from_bus).expect("validated bus");
            let j = system.bus_index(&line.to_bus).expect("validated bus");
            if line.candidate {
                let cv = cand_vars
                    .iter()
                    .find(|c| c.line == l)
                    .expect("candidate vars");
                net_out[i] += cv.flow[t];
                net_out[j] -= cv.flow[t];
            } else {
                let flow = line.susceptance * (angle(i, t) - angle(j, t));
                model = model.with(constraint!(flow.clone() <= line.capacity_mw));
                model = model.with(constraint!(flow.clone() >= -line.capacity_mw));
                net_out[i] += flow.clone();
                net_out[j] -= flow;
            }
        }

        for (b, out) in net_out.into_iter().enumerate() {
            let mut injection = Expression::from(0.0);
            for gv in &gen_vars {
                if gv.bus == b {
                    injection += gv.p[t];
                }
            }
            for sv in &storage_vars {
                if sv.bus == b {
                    injection += sv.discharge[t] - sv.charge[t];
                }
            }
            for rv in &retail_vars {
                if rv.bus == b {
                    injection += rv.buy[t] - rv.sell[t];
                }
            }
            let mut load = Expression::from(0.0);
            for (dem, dv) in system.demands.iter().zip(&demand_vars) {
                if dv.bus == b {
                    if dem.flexible {
                        load += dv.served[t];
                    } else {
                        load += dem.profile_mw[t];
                    }
                    load -= dv.nse[t];
                }
            }
            model = model.with(constraint!(injection - load == out));
        }
    }

    // Flexible demands: the horizon's total served power must match the
    // profile's total, and non-served energy cannot exceed what was
    // scheduled in that period.
    for (dem, dv) in system.demands.iter().zip(&demand_vars) {
        if dv.served.is_empty() {
            continue;
        }
        let mut total_served = Expression::from(0.0);
        for t in 0..n {
            total_served += dv.served[t];
            model = model.with(constraint!(dv.nse[t] <= dv.served[t]));
        }
        let required: f64 = dem.profile_mw.iter().sum();
        model = model.with(constraint!(total_served == required));
    }

    // Candidate-line physics and build gating.
    for cv in &cand_vars {
        let line = &system.lines[cv.line];
        let i = system.bus_index(&line.from_bus).expect("validated bus");
        let j = system.bus_index(&line.to_bus).expect("validated bus");
        for t in 0..n {
            let physics = line.susceptance * (angle(i, t) - angle(j, t));
            let gap = cv.flow[t] - physics;
            // When build=1 the flow obeys DC physics; when build=0 the flow
            // is forced to zero by the capacity gating below.
            model = model.with(constraint!(gap.clone() <= config.big_m - config.big_m * cv.build));
            model = model.with(constraint!(gap >= -config.big_m + config.big_m * cv.build));
            model = model.with(constraint!(cv.flow[t] <= line.capacity_mw * cv.build));
            model = model.with(constraint!(cv.flow[t] >= -line.capacity_mw * cv.build));
        }
    }

    debug!(
        generators = system.generators.len(),
        storages = system.storages.len(),
        lines = system.lines.len(),
        periods = n,
        "solving relaxed dispatch"
    );

    let solution = model.solve().map_err(|e| match e {
        good_lp::ResolutionError::Infeasible => ModelError::Infeasible,
        other => ModelError::SolverFailed(format!("{other:?}")),
    })?;

    // Extract results.
    let dispatch = system
        .generators
        .iter()
        .zip(&gen_vars)
        .map(|(gen, gv)| GeneratorDispatch {
            name: gen.name.clone(),
            output_mw: (0..n).map(|t| solution.value(gv.p[t])).collect(),
        })
        .collect();

    let storage = system
        .storages
        .iter()
        .zip(&storage_vars)
        .map(|(st, sv)| StorageProfile {
            name: st.name.clone(),
            soc_mwh: (0..n).map(|t| solution.value(sv.soc[t])).collect(),
        })
        .collect();

    let non_served_mwh = system
        .demands
        .iter()
        .zip(&demand_vars)
        .map(|(dem, dv)| {
            let profile = (0..n).map(|t| hours * solution.value(dv.nse[t])).collect();
            (dem.name.clone(), profile)
        })
        .collect();

    let built_lines = cand_vars
        .iter()
        .map(|cv| {
            let line = &system.lines[cv.line];
            let fraction = solution.value(cv.build);
            LineBuild {
                name: line.name.clone(),
                build_fraction: fraction,
                build: fraction >= 0.5,
                invest_cost: line.invest_cost,
            }
        })
        .collect();

    let operation_value = operation_cost.eval_with(&solution);
    let investment_value = investment_cost.eval_with(&solution);

    Ok(DispatchSolution {
        objective: operation_value + investment_value,
        operation_cost: operation_value,
        investment_cost: investment_value,
        dispatch,
        storage,
        non_served_mwh,
        built_lines,
        solve_time_ms: start.elapsed().as_millis(),
    })
}
