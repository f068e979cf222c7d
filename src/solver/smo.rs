//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Solves
//!
//! ```text
//! min ½ αᵀQα + pᵀα   s.t.   yᵀα = Δ,   0 ≤ αᵢ ≤ Cᵢ
//! ```
//!
//! by repeatedly optimizing a pair of multipliers in closed form. The pair
//! is the maximal violating pair, refined by second-order gain unless
//! [`WorkingSetStrategy::FirstOrder`] is requested. `Δ` is implied by the
//! feasible starting point.
//!
//! The gradient `G = Qα + p` is maintained incrementally. `G_bar` holds
//! `Σ_{αⱼ = Cⱼ} Cⱼ Q_{·j}` so that the gradient of shrunk variables can be
//! rebuilt; gradient reconstruction after shrinking is
//! a correctness step, not an optimization.

use crate::cache::Qfloat;
use crate::core::{ProgressSink, WorkingSetStrategy};
use crate::solver::qmatrix::QMatrix;
use crate::solver::shrinking::{AlphaStatus, ShrinkingStrategy, ViolationBounds};

/// Curvature floor for non-PSD kernels
const TAU: f64 = 1e-12;

/// Consecutive shrinkable checks before a variable leaves the active set
const SHRINK_PATIENCE: u32 = 2;

/// Which equality structure the solver exploits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverVariant {
    /// One equality constraint `yᵀα = Δ`
    Standard,
    /// Separate constraints per label sign (ν formulations)
    Nu,
}

/// Solver settings shared by every sub-problem of a training run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub eps: f64,
    pub shrinking: bool,
    pub working_set: WorkingSetStrategy,
    /// Overrides `max(10_000_000, 100·l)`
    pub max_iterations: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            eps: 0.001,
            shrinking: true,
            working_set: WorkingSetStrategy::SecondOrder,
            max_iterations: None,
        }
    }
}

/// One dual QP: Q, linear term, labels, per-variable bounds and a feasible
/// starting point
pub struct QpProblem<'q> {
    pub q: Box<dyn QMatrix + 'q>,
    pub p: Vec<f64>,
    pub signs: Vec<i8>,
    pub upper_bounds: Vec<f64>,
    pub alpha: Vec<f64>,
}

/// Solver output, in the original variable order
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub alpha: Vec<f64>,
    pub rho: f64,
    /// `(r1 + r2) / 2` for the ν variant, 0 otherwise
    pub r: f64,
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// SMO solver for the SVM dual
#[derive(Debug, Clone, Copy, Default)]
pub struct SMOSolver {
    config: SolverConfig,
}

impl SMOSolver {
    /// Create a new SMO solver with the given configuration
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve one QP to the configured tolerance.
    ///
    /// Hitting the iteration cap is reported through `sink` and marks the
    /// solution as not converged; the multipliers reached so far are still
    /// returned.
    pub fn solve(
        &self,
        variant: SolverVariant,
        problem: QpProblem<'_>,
        sink: &dyn ProgressSink,
    ) -> Solution {
        let l = problem.p.len();
        debug_assert_eq!(problem.signs.len(), l);
        debug_assert_eq!(problem.upper_bounds.len(), l);
        debug_assert_eq!(problem.alpha.len(), l);

        let mut state = SolverState::new(variant, &self.config, problem);
        state.initialize_gradient();

        let max_iterations = self
            .config
            .max_iterations
            .unwrap_or_else(|| 10_000_000usize.max(l.saturating_mul(100)));
        let mut counter = l.min(1000) + 1;
        let mut iterations = 0;

        while iterations < max_iterations {
            counter -= 1;
            if counter == 0 {
                counter = l.min(1000);
                if state.shrinking.is_some() {
                    state.do_shrinking();
                    log::trace!("active set size {} of {}", state.active_size, l);
                }
            }

            let (i, j) = match state.select_working_set() {
                Some(pair) => pair,
                None => {
                    // Optimal on the active set; confirm on all variables
                    state.reconstruct_gradient();
                    state.active_size = l;
                    match state.select_working_set() {
                        Some(pair) => {
                            counter = 1;
                            pair
                        }
                        None => break,
                    }
                }
            };

            iterations += 1;
            state.update_alpha_pair(i, j);
        }

        let converged = iterations < max_iterations;
        if !converged {
            if state.active_size < l {
                state.reconstruct_gradient();
                state.active_size = l;
            }
            sink.warn(&format!(
                "reaching max number of iterations ({})",
                max_iterations
            ));
        }

        let (rho, r) = state.calculate_rho();
        let objective = (0..l)
            .map(|i| state.alpha[i] * (state.g[i] + state.p[i]))
            .sum::<f64>()
            / 2.0;

        let mut alpha = vec![0.0; l];
        for (position, &original) in state.active_set.iter().enumerate() {
            alpha[original] = state.alpha[position];
        }

        let cache = state.q.cache();
        log::debug!(
            "kernel cache hit rate {:.1}%, {} rows resident",
            100.0 * cache.hit_rate(),
            cache.stats().rows
        );
        sink.info(&format!("optimization finished, #iter = {}", iterations));

        Solution {
            alpha,
            rho,
            r,
            objective,
            iterations,
            converged,
        }
    }
}

/// Copy row `i` of Q into `buffer`
fn fetch_row<Q: QMatrix + ?Sized>(q: &mut Q, i: usize, len: usize, buffer: &mut Vec<Qfloat>) {
    buffer.clear();
    buffer.extend_from_slice(q.get_q(i, len));
}

/// Working state of one solve. Every per-variable vector is indexed by the
/// current position; `active_set[pos]` maps back to the original variable.
struct SolverState<'q> {
    l: usize,
    active_size: usize,
    variant: SolverVariant,
    working_set: WorkingSetStrategy,
    eps: f64,

    signs: Vec<i8>,
    g: Vec<f64>,
    g_bar: Vec<f64>,
    alpha: Vec<f64>,
    status: Vec<AlphaStatus>,
    p: Vec<f64>,
    c: Vec<f64>,
    active_set: Vec<usize>,
    qd: Vec<f64>,
    q: Box<dyn QMatrix + 'q>,
    shrinking: Option<ShrinkingStrategy>,

    row_i: Vec<Qfloat>,
    row_j: Vec<Qfloat>,
}

impl<'q> SolverState<'q> {
    fn new(variant: SolverVariant, config: &SolverConfig, problem: QpProblem<'q>) -> Self {
        let l = problem.p.len();
        let qd = problem.q.get_qd().to_vec();
        let mut state = Self {
            l,
            active_size: l,
            variant,
            working_set: config.working_set,
            eps: config.eps,
            signs: problem.signs,
            g: vec![0.0; l],
            g_bar: vec![0.0; l],
            alpha: problem.alpha,
            status: vec![AlphaStatus::LowerBound; l],
            p: problem.p,
            c: problem.upper_bounds,
            active_set: (0..l).collect(),
            qd,
            q: problem.q,
            shrinking: config
                .shrinking
                .then(|| ShrinkingStrategy::new(l, SHRINK_PATIENCE)),
            row_i: Vec::with_capacity(l),
            row_j: Vec::with_capacity(l),
        };
        for i in 0..l {
            state.update_alpha_status(i);
        }
        state
    }

    #[inline]
    fn update_alpha_status(&mut self, i: usize) {
        self.status[i] = if self.alpha[i] >= self.c[i] {
            AlphaStatus::UpperBound
        } else if self.alpha[i] <= 0.0 {
            AlphaStatus::LowerBound
        } else {
            AlphaStatus::Free
        };
    }

    #[inline]
    fn is_upper_bound(&self, i: usize) -> bool {
        self.status[i] == AlphaStatus::UpperBound
    }

    #[inline]
    fn is_lower_bound(&self, i: usize) -> bool {
        self.status[i] == AlphaStatus::LowerBound
    }

    #[inline]
    fn is_free(&self, i: usize) -> bool {
        self.status[i] == AlphaStatus::Free
    }

    /// `G = p + Qα` and `G_bar` from the starting point
    fn initialize_gradient(&mut self) {
        let l = self.l;
        self.g.copy_from_slice(&self.p);
        for i in 0..l {
            if self.is_lower_bound(i) {
                continue;
            }
            fetch_row(self.q.as_mut(), i, l, &mut self.row_i);
            let alpha_i = self.alpha[i];
            for (g, &q) in self.g.iter_mut().zip(&self.row_i) {
                *g += alpha_i * q;
            }
            if self.is_upper_bound(i) {
                let c_i = self.c[i];
                for (g_bar, &q) in self.g_bar.iter_mut().zip(&self.row_i) {
                    *g_bar += c_i * q;
                }
            }
        }
    }

    fn swap_index(&mut self, i: usize, j: usize) {
        self.q.swap_index(i, j);
        self.signs.swap(i, j);
        self.g.swap(i, j);
        self.status.swap(i, j);
        self.alpha.swap(i, j);
        self.p.swap(i, j);
        self.c.swap(i, j);
        self.active_set.swap(i, j);
        self.g_bar.swap(i, j);
        self.qd.swap(i, j);
        if let Some(strategy) = self.shrinking.as_mut() {
            strategy.swap(i, j);
        }
    }

    /// Rebuild `G` for the inactive variables from `G_bar` and the free
    /// active variables
    fn reconstruct_gradient(&mut self) {
        let (l, active_size) = (self.l, self.active_size);
        if active_size == l {
            return;
        }

        for j in active_size..l {
            self.g[j] = self.g_bar[j] + self.p[j];
        }

        let nr_free = (0..active_size).filter(|&j| self.is_free(j)).count();
        if 2 * nr_free < active_size {
            log::debug!("few free variables; disabling shrinking may be faster");
        }

        if nr_free * l > 2 * active_size * (l - active_size) {
            for i in active_size..l {
                fetch_row(self.q.as_mut(), i, active_size, &mut self.row_i);
                for j in 0..active_size {
                    if self.is_free(j) {
                        self.g[i] += self.alpha[j] * self.row_i[j];
                    }
                }
            }
        } else {
            for i in 0..active_size {
                if !self.is_free(i) {
                    continue;
                }
                fetch_row(self.q.as_mut(), i, l, &mut self.row_i);
                let alpha_i = self.alpha[i];
                for j in active_size..l {
                    self.g[j] += alpha_i * self.row_i[j];
                }
            }
        }
    }

    fn select_working_set(&mut self) -> Option<(usize, usize)> {
        match self.variant {
            SolverVariant::Standard => self.select_working_set_standard(),
            SolverVariant::Nu => self.select_working_set_nu(),
        }
    }

    #[inline]
    fn second_order_gain(&self, grad_diff: f64, quad_coef: f64) -> f64 {
        let quad_coef = if quad_coef > 0.0 { quad_coef } else { TAU };
        -(grad_diff * grad_diff) / quad_coef
    }

    /// i ∈ I_up maximizing −yᵢGᵢ, then j ∈ I_low either maximizing yⱼGⱼ
    /// (first order) or the second-order objective decrease
    fn select_working_set_standard(&mut self) -> Option<(usize, usize)> {
        let active_size = self.active_size;
        let mut gmax = f64::NEG_INFINITY;
        let mut gmax_idx = None;

        for t in 0..active_size {
            if self.signs[t] > 0 {
                if !self.is_upper_bound(t) && -self.g[t] >= gmax {
                    gmax = -self.g[t];
                    gmax_idx = Some(t);
                }
            } else if !self.is_lower_bound(t) && self.g[t] >= gmax {
                gmax = self.g[t];
                gmax_idx = Some(t);
            }
        }

        let i = gmax_idx?;
        let second_order = self.working_set == WorkingSetStrategy::SecondOrder;
        if second_order {
            fetch_row(self.q.as_mut(), i, active_size, &mut self.row_i);
        }

        let mut gmax2 = f64::NEG_INFINITY;
        let mut gmax2_idx = None;
        let mut gmin_idx = None;
        let mut obj_diff_min = f64::INFINITY;
        let y_i = f64::from(self.signs[i]);

        for j in 0..active_size {
            let (eligible, yg) = if self.signs[j] > 0 {
                (!self.is_lower_bound(j), self.g[j])
            } else {
                (!self.is_upper_bound(j), -self.g[j])
            };
            if !eligible {
                continue;
            }
            if yg >= gmax2 {
                gmax2 = yg;
                gmax2_idx = Some(j);
            }
            let grad_diff = gmax + yg;
            if second_order && grad_diff > 0.0 {
                let y_j = f64::from(self.signs[j]);
                let quad_coef = self.qd[i] + self.qd[j] - 2.0 * y_i * y_j * self.row_i[j];
                let obj_diff = self.second_order_gain(grad_diff, quad_coef);
                if obj_diff <= obj_diff_min {
                    gmin_idx = Some(j);
                    obj_diff_min = obj_diff;
                }
            }
        }

        if gmax + gmax2 < self.eps {
            return None;
        }
        let j = if second_order { gmin_idx? } else { gmax2_idx? };
        Some((i, j))
    }

    /// As the standard rule, but i and j are drawn from the same label sign
    fn select_working_set_nu(&mut self) -> Option<(usize, usize)> {
        let active_size = self.active_size;
        let mut gmaxp = f64::NEG_INFINITY;
        let mut gmaxp_idx = None;
        let mut gmaxn = f64::NEG_INFINITY;
        let mut gmaxn_idx = None;

        for t in 0..active_size {
            if self.signs[t] > 0 {
                if !self.is_upper_bound(t) && -self.g[t] >= gmaxp {
                    gmaxp = -self.g[t];
                    gmaxp_idx = Some(t);
                }
            } else if !self.is_lower_bound(t) && self.g[t] >= gmaxn {
                gmaxn = self.g[t];
                gmaxn_idx = Some(t);
            }
        }

        let second_order = self.working_set == WorkingSetStrategy::SecondOrder;
        if second_order {
            if let Some(ip) = gmaxp_idx {
                fetch_row(self.q.as_mut(), ip, active_size, &mut self.row_i);
            }
            if let Some(in_) = gmaxn_idx {
                fetch_row(self.q.as_mut(), in_, active_size, &mut self.row_j);
            }
        }

        let mut gmaxp2 = f64::NEG_INFINITY;
        let mut gmaxp2_idx = None;
        let mut gmaxn2 = f64::NEG_INFINITY;
        let mut gmaxn2_idx = None;
        let mut gmin_idx = None;
        let mut obj_diff_min = f64::INFINITY;

        for j in 0..active_size {
            let positive = self.signs[j] > 0;
            let (eligible, yg, gmax, anchor) = if positive {
                (!self.is_lower_bound(j), self.g[j], gmaxp, gmaxp_idx)
            } else {
                (!self.is_upper_bound(j), -self.g[j], gmaxn, gmaxn_idx)
            };
            if !eligible {
                continue;
            }
            if positive {
                if yg >= gmaxp2 {
                    gmaxp2 = yg;
                    gmaxp2_idx = Some(j);
                }
            } else if yg >= gmaxn2 {
                gmaxn2 = yg;
                gmaxn2_idx = Some(j);
            }

            let grad_diff = gmax + yg;
            if let (true, true, Some(anchor)) = (second_order, grad_diff > 0.0, anchor) {
                let q_anchor = if positive {
                    self.row_i[j]
                } else {
                    self.row_j[j]
                };
                let quad_coef = self.qd[anchor] + self.qd[j] - 2.0 * q_anchor;
                let obj_diff = self.second_order_gain(grad_diff, quad_coef);
                if obj_diff <= obj_diff_min {
                    gmin_idx = Some(j);
                    obj_diff_min = obj_diff;
                }
            }
        }

        if f64::max(gmaxp + gmaxp2, gmaxn + gmaxn2) < self.eps {
            return None;
        }

        if second_order {
            let j = gmin_idx?;
            let i = if self.signs[j] > 0 {
                gmaxp_idx?
            } else {
                gmaxn_idx?
            };
            Some((i, j))
        } else if gmaxp + gmaxp2 >= gmaxn + gmaxn2 {
            Some((gmaxp_idx?, gmaxp2_idx?))
        } else {
            Some((gmaxn_idx?, gmaxn2_idx?))
        }
    }

    /// Analytic solution of the two-variable sub-problem, clipped to the box
    fn update_alpha_pair(&mut self, i: usize, j: usize) {
        let active_size = self.active_size;
        fetch_row(self.q.as_mut(), i, active_size, &mut self.row_i);
        fetch_row(self.q.as_mut(), j, active_size, &mut self.row_j);

        let c_i = self.c[i];
        let c_j = self.c[j];
        let old_alpha_i = self.alpha[i];
        let old_alpha_j = self.alpha[j];

        if self.signs[i] != self.signs[j] {
            let mut quad_coef = self.qd[i] + self.qd[j] + 2.0 * self.row_i[j];
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (-self.g[i] - self.g[j]) / quad_coef;
            let diff = self.alpha[i] - self.alpha[j];
            self.alpha[i] += delta;
            self.alpha[j] += delta;

            if diff > 0.0 {
                if self.alpha[j] < 0.0 {
                    self.alpha[j] = 0.0;
                    self.alpha[i] = diff;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = -diff;
            }
            if diff > c_i - c_j {
                if self.alpha[i] > c_i {
                    self.alpha[i] = c_i;
                    self.alpha[j] = c_i - diff;
                }
            } else if self.alpha[j] > c_j {
                self.alpha[j] = c_j;
                self.alpha[i] = c_j + diff;
            }
        } else {
            let mut quad_coef = self.qd[i] + self.qd[j] - 2.0 * self.row_i[j];
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (self.g[i] - self.g[j]) / quad_coef;
            let sum = self.alpha[i] + self.alpha[j];
            self.alpha[i] -= delta;
            self.alpha[j] += delta;

            if sum > c_i {
                if self.alpha[i] > c_i {
                    self.alpha[i] = c_i;
                    self.alpha[j] = sum - c_i;
                }
            } else if self.alpha[j] < 0.0 {
                self.alpha[j] = 0.0;
                self.alpha[i] = sum;
            }
            if sum > c_j {
                if self.alpha[j] > c_j {
                    self.alpha[j] = c_j;
                    self.alpha[i] = sum - c_j;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = sum;
            }
        }

        let delta_alpha_i = self.alpha[i] - old_alpha_i;
        let delta_alpha_j = self.alpha[j] - old_alpha_j;
        for k in 0..active_size {
            self.g[k] += self.row_i[k] * delta_alpha_i + self.row_j[k] * delta_alpha_j;
        }

        let was_upper_i = self.is_upper_bound(i);
        let was_upper_j = self.is_upper_bound(j);
        self.update_alpha_status(i);
        self.update_alpha_status(j);

        if was_upper_i != self.is_upper_bound(i) {
            self.update_g_bar(i, c_i, was_upper_i);
        }
        if was_upper_j != self.is_upper_bound(j) {
            self.update_g_bar(j, c_j, was_upper_j);
        }
    }

    /// Add or remove `C_k Q_{·k}` from `G_bar` when k enters or leaves its
    /// upper bound
    fn update_g_bar(&mut self, k: usize, c_k: f64, leaving_upper: bool) {
        let l = self.l;
        fetch_row(self.q.as_mut(), k, l, &mut self.row_i);
        let scale = if leaving_upper { -c_k } else { c_k };
        for (g_bar, &q) in self.g_bar.iter_mut().zip(&self.row_i) {
            *g_bar += scale * q;
        }
    }

    fn violation_bounds(&self) -> ViolationBounds {
        let mut gmax1 = f64::NEG_INFINITY;
        let mut gmax2 = f64::NEG_INFINITY;
        let mut gmax3 = f64::NEG_INFINITY;
        let mut gmax4 = f64::NEG_INFINITY;

        for i in 0..self.active_size {
            let g = self.g[i];
            let positive = self.signs[i] > 0;
            match self.variant {
                SolverVariant::Standard => {
                    if positive {
                        if !self.is_upper_bound(i) {
                            gmax1 = gmax1.max(-g);
                        }
                        if !self.is_lower_bound(i) {
                            gmax2 = gmax2.max(g);
                        }
                    } else {
                        if !self.is_upper_bound(i) {
                            gmax2 = gmax2.max(-g);
                        }
                        if !self.is_lower_bound(i) {
                            gmax1 = gmax1.max(g);
                        }
                    }
                }
                SolverVariant::Nu => {
                    if !self.is_upper_bound(i) {
                        if positive {
                            gmax1 = gmax1.max(-g);
                        } else {
                            gmax4 = gmax4.max(-g);
                        }
                    }
                    if !self.is_lower_bound(i) {
                        if positive {
                            gmax2 = gmax2.max(g);
                        } else {
                            gmax3 = gmax3.max(g);
                        }
                    }
                }
            }
        }

        match self.variant {
            SolverVariant::Standard => ViolationBounds::Standard { gmax1, gmax2 },
            SolverVariant::Nu => ViolationBounds::Nu {
                gmax1,
                gmax2,
                gmax3,
                gmax4,
            },
        }
    }

    /// Observe position `i` in the shrinking history
    fn shrink_now(&mut self, i: usize, bounds: &ViolationBounds) -> bool {
        let shrinkable = bounds.is_shrinkable(self.status[i], self.signs[i], self.g[i]);
        match self.shrinking.as_mut() {
            Some(strategy) => strategy.observe(i, shrinkable),
            None => false,
        }
    }

    fn do_shrinking(&mut self) {
        let bounds = self.violation_bounds();

        let unshrink = match self.shrinking.as_mut() {
            Some(strategy) => strategy.should_unshrink(bounds.gap(), self.eps),
            None => return,
        };
        if unshrink {
            log::debug!("gap {:.3e} within 10·eps, unshrinking", bounds.gap());
            self.reconstruct_gradient();
            self.active_size = self.l;
        }

        let mut i = 0;
        while i < self.active_size {
            if self.shrink_now(i, &bounds) {
                self.active_size -= 1;
                while self.active_size > i {
                    if !self.shrink_now(self.active_size, &bounds) {
                        self.swap_index(i, self.active_size);
                        break;
                    }
                    self.active_size -= 1;
                }
            }
            i += 1;
        }
    }

    fn calculate_rho(&self) -> (f64, f64) {
        match self.variant {
            SolverVariant::Standard => (self.calculate_rho_standard(), 0.0),
            SolverVariant::Nu => self.calculate_rho_nu(),
        }
    }

    /// Mean of `yᵢGᵢ` over free variables, or the midpoint of the tightest
    /// bounds when none is free
    fn calculate_rho_standard(&self) -> f64 {
        let mut nr_free = 0;
        let mut ub = f64::INFINITY;
        let mut lb = f64::NEG_INFINITY;
        let mut sum_free = 0.0;

        for i in 0..self.active_size {
            let positive = self.signs[i] > 0;
            let yg = f64::from(self.signs[i]) * self.g[i];

            match (self.status[i], positive) {
                (AlphaStatus::UpperBound, false) | (AlphaStatus::LowerBound, true) => {
                    ub = ub.min(yg)
                }
                (AlphaStatus::UpperBound, true) | (AlphaStatus::LowerBound, false) => {
                    lb = lb.max(yg)
                }
                (AlphaStatus::Free, _) => {
                    nr_free += 1;
                    sum_free += yg;
                }
            }
        }

        if nr_free > 0 {
            sum_free / nr_free as f64
        } else {
            (ub + lb) / 2.0
        }
    }

    fn calculate_rho_nu(&self) -> (f64, f64) {
        // Index 0 collects positive variables, index 1 negative ones
        let mut nr_free = [0usize; 2];
        let mut ub = [f64::INFINITY; 2];
        let mut lb = [f64::NEG_INFINITY; 2];
        let mut sum_free = [0.0; 2];

        for i in 0..self.active_size {
            let side = usize::from(self.signs[i] < 0);
            let g = self.g[i];
            match self.status[i] {
                AlphaStatus::UpperBound => lb[side] = lb[side].max(g),
                AlphaStatus::LowerBound => ub[side] = ub[side].min(g),
                AlphaStatus::Free => {
                    nr_free[side] += 1;
                    sum_free[side] += g;
                }
            }
        }

        let side_value = |side: usize| {
            if nr_free[side] > 0 {
                sum_free[side] / nr_free[side] as f64
            } else {
                (ub[side] + lb[side]) / 2.0
            }
        };
        let r1 = side_value(0);
        let r2 = side_value(1);

        ((r1 - r2) / 2.0, (r1 + r2) / 2.0)
    }
}
