//! Fixed-step time integrators over the compiled flat state vector.

use sf_core::Real;

use crate::error::{SimError, SimResult};

/// Source of stock derivatives for the integrators.
///
/// `rhs` evaluates dx/dt at `(t, stock)` into `d`. Implementations may use
/// internal scratch storage, hence `&mut self`.
pub trait Derivatives {
    fn rhs(&mut self, t: Real, stock: &[Real], d: &mut [Real]) -> SimResult<()>;
}

/// Integrator selection, keyed by the solver's `order` parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorKind {
    /// Forward Euler (1st-order, 1 rhs call per step).
    Euler,
    /// Midpoint method (2nd-order, 2 rhs calls per step).
    RK2,
    /// Classical RK4 (4th-order, default, 4 rhs calls per step).
    #[default]
    RK4,
}

impl IntegratorKind {
    pub fn from_order(order: usize) -> SimResult<Self> {
        match order {
            1 => Ok(IntegratorKind::Euler),
            2 => Ok(IntegratorKind::RK2),
            4 => Ok(IntegratorKind::RK4),
            _ => Err(SimError::InvalidArg {
                what: "order must be 1, 2 or 4",
            }),
        }
    }

    /// Advance `stock` in place by one step of size `dt`.
    pub fn step<M: Derivatives>(
        self,
        model: &mut M,
        t: Real,
        stock: &mut [Real],
        dt: Real,
    ) -> SimResult<()> {
        let n = stock.len();
        match self {
            IntegratorKind::Euler => {
                let mut k1 = vec![0.0; n];
                model.rhs(t, stock, &mut k1)?;
                for i in 0..n {
                    stock[i] += dt * k1[i];
                }
            }
            IntegratorKind::RK2 => {
                let mut k1 = vec![0.0; n];
                model.rhs(t, stock, &mut k1)?;
                let mut mid = vec![0.0; n];
                for i in 0..n {
                    mid[i] = stock[i] + 0.5 * dt * k1[i];
                }
                let mut k2 = vec![0.0; n];
                model.rhs(t + 0.5 * dt, &mid, &mut k2)?;
                for i in 0..n {
                    stock[i] += dt * k2[i];
                }
            }
            IntegratorKind::RK4 => {
                let mut k1 = vec![0.0; n];
                model.rhs(t, stock, &mut k1)?;

                let mut x2 = vec![0.0; n];
                for i in 0..n {
                    x2[i] = stock[i] + 0.5 * dt * k1[i];
                }
                let mut k2 = vec![0.0; n];
                model.rhs(t + 0.5 * dt, &x2, &mut k2)?;

                let mut x3 = vec![0.0; n];
                for i in 0..n {
                    x3[i] = stock[i] + 0.5 * dt * k2[i];
                }
                let mut k3 = vec![0.0; n];
                model.rhs(t + 0.5 * dt, &x3, &mut k3)?;

                let mut x4 = vec![0.0; n];
                for i in 0..n {
                    x4[i] = stock[i] + dt * k3[i];
                }
                let mut k4 = vec![0.0; n];
                model.rhs(t + dt, &x4, &mut k4)?;

                // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
                for i in 0..n {
                    stock[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay;

    impl Derivatives for Decay {
        fn rhs(&mut self, _t: Real, stock: &[Real], d: &mut [Real]) -> SimResult<()> {
            d[0] = -stock[0];
            Ok(())
        }
    }

    #[test]
    fn from_order_rejects_unsupported() {
        assert!(IntegratorKind::from_order(1).is_ok());
        assert!(IntegratorKind::from_order(2).is_ok());
        assert!(IntegratorKind::from_order(4).is_ok());
        assert!(IntegratorKind::from_order(3).is_err());
        assert!(IntegratorKind::from_order(0).is_err());
    }

    #[test]
    fn euler_matches_closed_form() {
        let mut x = vec![1.0];
        let dt = 0.1;
        for _ in 0..10 {
            IntegratorKind::Euler.step(&mut Decay, 0.0, &mut x, dt).unwrap();
        }
        let expected = (1.0 - dt as f64).powi(10);
        assert!((x[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn rk4_is_accurate_on_decay() {
        let mut x = vec![1.0];
        let mut t = 0.0;
        for _ in 0..10 {
            IntegratorKind::RK4.step(&mut Decay, t, &mut x, 0.1).unwrap();
            t += 0.1;
        }
        assert!((x[0] - (-1.0f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn rk2_beats_euler_on_decay() {
        let mut xe = vec![1.0];
        let mut x2 = vec![1.0];
        for _ in 0..10 {
            IntegratorKind::Euler.step(&mut Decay, 0.0, &mut xe, 0.1).unwrap();
            IntegratorKind::RK2.step(&mut Decay, 0.0, &mut x2, 0.1).unwrap();
        }
        let exact = (-1.0f64).exp();
        assert!((x2[0] - exact).abs() < (xe[0] - exact).abs());
    }
}
