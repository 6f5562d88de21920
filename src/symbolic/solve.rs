//! Symbolic solving of equations linear in one symbol.
//!
//! Both derivation paths reduce to the same primitive: an equation
//! `expr = 0` that is linear in some target symbol (a speed's time
//! derivative), solved by coefficient extraction.

use std::collections::HashMap;

use thiserror::Error;

use super::expr::{Expr, Symbol};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    #[error("equation is not linear in `{0}`")]
    Nonlinear(Symbol),

    #[error("`{0}` has an identically zero coefficient; equation does not determine it")]
    ZeroCoefficient(Symbol),
}

/// Solve `expr = 0` for `sym`, assuming `expr` is linear in `sym`.
///
/// Writes `expr = a*sym + b` with `a`, `b` free of `sym` and returns
/// `-b/a`. Detection is by differentiation: if d(expr)/d(sym) still
/// contains `sym` (quadratic terms, `sym` inside sin/cos or a
/// denominator), the equation is not linear in it.
pub fn solve_linear(expr: &Expr, sym: &Symbol) -> Result<Expr, SolveError> {
    let a = expr.diff(sym);
    if a.contains(sym) {
        return Err(SolveError::Nonlinear(sym.clone()));
    }
    if a.is_zero() {
        return Err(SolveError::ZeroCoefficient(sym.clone()));
    }

    let mut at_zero = HashMap::new();
    at_zero.insert(sym.clone(), Expr::zero());
    let b = expr.subs(&at_zero);

    Ok(Expr::div(-b, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn solves_force_balance_shape() {
        // 0 = m*g - k*x - a*m  ->  a = (m*g - k*x)/m
        let m = Symbol::new("m");
        let g = Symbol::new("g");
        let k = Symbol::new("k");
        let x = Symbol::new("x");
        let a = Symbol::new("a");

        let eq = Expr::sym(&m) * Expr::sym(&g)
            - Expr::sym(&k) * Expr::sym(&x)
            - Expr::sym(&a) * Expr::sym(&m);
        let sol = solve_linear(&eq, &a).unwrap();

        let mut bind: HashMap<Symbol, f64> = HashMap::new();
        bind.insert(m.clone(), 10.0);
        bind.insert(g.clone(), 9.8);
        bind.insert(k.clone(), 10.0);
        bind.insert(x.clone(), 2.0);
        let got = sol.eval(&bind).unwrap();
        assert!((got - (9.8 - 2.0)).abs() < 1e-12);
    }

    #[test]
    fn rejects_nonlinear_target() {
        let a = Symbol::new("a");
        let eq = Expr::pow(Expr::sym(&a), 2) - Expr::one();
        assert_eq!(solve_linear(&eq, &a), Err(SolveError::Nonlinear(a)));
    }

    #[test]
    fn rejects_absent_target() {
        let a = Symbol::new("a");
        let b = Symbol::new("b");
        let eq = Expr::sym(&b) - Expr::one();
        assert_eq!(solve_linear(&eq, &a), Err(SolveError::ZeroCoefficient(a)));
    }
}
