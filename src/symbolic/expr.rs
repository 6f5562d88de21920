//! Immutable symbolic expression graph.
//!
//! Everything the derivation stages need from a symbolic engine lives here:
//! - [`Symbol`]           – interned variable name, cheap to clone
//! - [`Expr`]             – expression tree (numbers, symbols, sums, products,
//!                          quotients, integer powers, sin/cos)
//! - [`DynamicRegistry`]  – which symbols are functions of time, and the
//!                          name of each one's time derivative
//!
//! Expressions are never mutated: every operation (differentiation,
//! substitution, arithmetic) builds a new tree. The constructors fold
//! constants and strip neutral elements so trees stay small, but no general
//! canonical form is promised; callers that need to compare derivations do
//! so by evaluation (see `EomBundle::state_derivatives_agree`).

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use thiserror::Error;

/// A named scalar variable. Clones share the underlying string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Symbol(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric evaluation failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("symbol `{0}` has no numeric binding")]
    UnboundSymbol(Symbol),

    #[error("division by zero while evaluating an expression")]
    DivisionByZero,
}

/// A symbolic expression. Built through the smart constructors below (or the
/// overloaded operators), which flatten nested sums/products and fold
/// constants as they go.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(f64),
    Sym(Symbol),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, i32),
    Sin(Box<Expr>),
    Cos(Box<Expr>),
}

impl Expr {
    pub fn num(v: f64) -> Expr {
        Expr::Num(v)
    }

    pub fn sym(s: &Symbol) -> Expr {
        Expr::Sym(s.clone())
    }

    pub fn zero() -> Expr {
        Expr::Num(0.0)
    }

    pub fn one() -> Expr {
        Expr::Num(1.0)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Num(v) if *v == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Num(v) if *v == 1.0)
    }

    /// Sum of `terms`, flattened, with numeric terms folded into one constant
    pub fn add(terms: Vec<Expr>) -> Expr {
        let mut flat = Vec::new();
        let mut acc = 0.0;
        for t in terms {
            match t {
                Expr::Num(v) => acc += v,
                Expr::Add(inner) => {
                    for s in inner {
                        match s {
                            Expr::Num(v) => acc += v,
                            other => flat.push(other),
                        }
                    }
                }
                other => flat.push(other),
            }
        }
        if acc != 0.0 {
            flat.push(Expr::Num(acc));
        }
        match flat.len() {
            0 => Expr::Num(0.0),
            1 => flat.pop().unwrap(),
            _ => Expr::Add(flat),
        }
    }

    /// Product of `factors`, flattened, with numeric factors folded into one
    /// leading constant. A zero factor collapses the whole product.
    pub fn mul(factors: Vec<Expr>) -> Expr {
        let mut flat = Vec::new();
        let mut acc = 1.0;
        for t in factors {
            match t {
                Expr::Num(v) => acc *= v,
                Expr::Mul(inner) => {
                    for s in inner {
                        match s {
                            Expr::Num(v) => acc *= v,
                            other => flat.push(other),
                        }
                    }
                }
                other => flat.push(other),
            }
        }
        if acc == 0.0 {
            return Expr::Num(0.0);
        }
        if acc != 1.0 {
            flat.insert(0, Expr::Num(acc));
        }
        match flat.len() {
            0 => Expr::Num(1.0),
            1 => flat.pop().unwrap(),
            _ => Expr::Mul(flat),
        }
    }

    pub fn div(num: Expr, den: Expr) -> Expr {
        if num.is_zero() {
            return Expr::Num(0.0);
        }
        if den.is_one() {
            return num;
        }
        if let (Expr::Num(a), Expr::Num(b)) = (&num, &den) {
            if *b != 0.0 {
                return Expr::Num(a / b);
            }
        }
        Expr::Div(Box::new(num), Box::new(den))
    }

    pub fn pow(base: Expr, exp: i32) -> Expr {
        match exp {
            0 => Expr::Num(1.0),
            1 => base,
            _ => match base {
                Expr::Num(v) => Expr::Num(v.powi(exp)),
                other => Expr::Pow(Box::new(other), exp),
            },
        }
    }

    pub fn sin(arg: Expr) -> Expr {
        match arg {
            Expr::Num(v) => Expr::Num(v.sin()),
            other => Expr::Sin(Box::new(other)),
        }
    }

    pub fn cos(arg: Expr) -> Expr {
        match arg {
            Expr::Num(v) => Expr::Num(v.cos()),
            other => Expr::Cos(Box::new(other)),
        }
    }

    /// Partial derivative with respect to `wrt`; every other symbol is held
    /// constant. Use [`DynamicRegistry::dt`] for total time derivatives.
    pub fn diff(&self, wrt: &Symbol) -> Expr {
        match self {
            Expr::Num(_) => Expr::Num(0.0),
            Expr::Sym(s) => {
                if s == wrt {
                    Expr::Num(1.0)
                } else {
                    Expr::Num(0.0)
                }
            }
            Expr::Add(terms) => Expr::add(terms.iter().map(|t| t.diff(wrt)).collect()),
            Expr::Mul(factors) => {
                // product rule: sum over factors, each differentiated in turn
                let mut terms = Vec::with_capacity(factors.len());
                for (i, _) in factors.iter().enumerate() {
                    let mut fs: Vec<Expr> = factors.clone();
                    fs[i] = fs[i].diff(wrt);
                    terms.push(Expr::mul(fs));
                }
                Expr::add(terms)
            }
            Expr::Div(n, d) => {
                // (n/d)' = (n' d - n d') / d^2
                let num = Expr::add(vec![
                    Expr::mul(vec![n.diff(wrt), (**d).clone()]),
                    Expr::mul(vec![Expr::Num(-1.0), (**n).clone(), d.diff(wrt)]),
                ]);
                Expr::div(num, Expr::pow((**d).clone(), 2))
            }
            Expr::Pow(b, e) => Expr::mul(vec![
                Expr::Num(f64::from(*e)),
                Expr::pow((**b).clone(), e - 1),
                b.diff(wrt),
            ]),
            Expr::Sin(a) => Expr::mul(vec![Expr::cos((**a).clone()), a.diff(wrt)]),
            Expr::Cos(a) => Expr::mul(vec![
                Expr::Num(-1.0),
                Expr::sin((**a).clone()),
                a.diff(wrt),
            ]),
        }
    }

    /// Simultaneous substitution of symbols by expressions
    pub fn subs(&self, map: &HashMap<Symbol, Expr>) -> Expr {
        match self {
            Expr::Num(v) => Expr::Num(*v),
            Expr::Sym(s) => map.get(s).cloned().unwrap_or_else(|| Expr::Sym(s.clone())),
            Expr::Add(terms) => Expr::add(terms.iter().map(|t| t.subs(map)).collect()),
            Expr::Mul(factors) => Expr::mul(factors.iter().map(|t| t.subs(map)).collect()),
            Expr::Div(n, d) => Expr::div(n.subs(map), d.subs(map)),
            Expr::Pow(b, e) => Expr::pow(b.subs(map), *e),
            Expr::Sin(a) => Expr::sin(a.subs(map)),
            Expr::Cos(a) => Expr::cos(a.subs(map)),
        }
    }

    /// Evaluate to a number. Every free symbol must be bound; a missing
    /// binding is an error, never a silent default.
    pub fn eval(&self, bindings: &HashMap<Symbol, f64>) -> Result<f64, EvalError> {
        match self {
            Expr::Num(v) => Ok(*v),
            Expr::Sym(s) => bindings
                .get(s)
                .copied()
                .ok_or_else(|| EvalError::UnboundSymbol(s.clone())),
            Expr::Add(terms) => {
                let mut acc = 0.0;
                for t in terms {
                    acc += t.eval(bindings)?;
                }
                Ok(acc)
            }
            Expr::Mul(factors) => {
                let mut acc = 1.0;
                for t in factors {
                    acc *= t.eval(bindings)?;
                }
                Ok(acc)
            }
            Expr::Div(n, d) => {
                let dv = d.eval(bindings)?;
                if dv == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(n.eval(bindings)? / dv)
            }
            Expr::Pow(b, e) => Ok(b.eval(bindings)?.powi(*e)),
            Expr::Sin(a) => Ok(a.eval(bindings)?.sin()),
            Expr::Cos(a) => Ok(a.eval(bindings)?.cos()),
        }
    }

    /// Set of symbols appearing in the expression
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(s) => {
                out.insert(s.clone());
            }
            Expr::Add(terms) | Expr::Mul(terms) => {
                for t in terms {
                    t.collect_symbols(out);
                }
            }
            Expr::Div(n, d) => {
                n.collect_symbols(out);
                d.collect_symbols(out);
            }
            Expr::Pow(b, _) => b.collect_symbols(out),
            Expr::Sin(a) | Expr::Cos(a) => a.collect_symbols(out),
        }
    }

    pub fn contains(&self, sym: &Symbol) -> bool {
        match self {
            Expr::Num(_) => false,
            Expr::Sym(s) => s == sym,
            Expr::Add(terms) | Expr::Mul(terms) => terms.iter().any(|t| t.contains(sym)),
            Expr::Div(n, d) => n.contains(sym) || d.contains(sym),
            Expr::Pow(b, _) => b.contains(sym),
            Expr::Sin(a) | Expr::Cos(a) => a.contains(sym),
        }
    }

    // Precedence for pretty-printing: Add < Mul/Div < Pow/leaf
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(_) => 1,
            Expr::Mul(_) | Expr::Div(_, _) => 2,
            _ => 3,
        }
    }

    fn fmt_child(&self, child: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

impl Default for Expr {
    fn default() -> Self {
        Expr::zero()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Sym(s) => write!(f, "{s}"),
            Expr::Add(terms) => {
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    self.fmt_child(t, f)?;
                }
                Ok(())
            }
            Expr::Mul(factors) => {
                for (i, t) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    self.fmt_child(t, f)?;
                }
                Ok(())
            }
            Expr::Div(n, d) => {
                self.fmt_child(n, f)?;
                write!(f, "/")?;
                self.fmt_child(d, f)
            }
            Expr::Pow(b, e) => {
                self.fmt_child(b, f)?;
                write!(f, "^{e}")
            }
            Expr::Sin(a) => write!(f, "sin({a})"),
            Expr::Cos(a) => write!(f, "cos({a})"),
        }
    }
}

// Operator overloads so model code reads like the math it encodes.
// Owned and borrowed variants, plus mixed f64 forms.

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::add(vec![self, rhs])
    }
}

impl Add for &Expr {
    type Output = Expr;
    fn add(self, rhs: &Expr) -> Expr {
        Expr::add(vec![self.clone(), rhs.clone()])
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::add(vec![self, Expr::mul(vec![Expr::Num(-1.0), rhs])])
    }
}

impl Sub for &Expr {
    type Output = Expr;
    fn sub(self, rhs: &Expr) -> Expr {
        self.clone() - rhs.clone()
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul(vec![self, rhs])
    }
}

impl Mul for &Expr {
    type Output = Expr;
    fn mul(self, rhs: &Expr) -> Expr {
        Expr::mul(vec![self.clone(), rhs.clone()])
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::div(self, rhs)
    }
}

impl Div for &Expr {
    type Output = Expr;
    fn div(self, rhs: &Expr) -> Expr {
        Expr::div(self.clone(), rhs.clone())
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::mul(vec![Expr::Num(-1.0), self])
    }
}

impl Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::mul(vec![Expr::Num(-1.0), self.clone()])
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul(vec![Expr::Num(self), rhs])
    }
}

impl Mul<f64> for Expr {
    type Output = Expr;
    fn mul(self, rhs: f64) -> Expr {
        Expr::mul(vec![self, Expr::Num(rhs)])
    }
}

impl Add<f64> for Expr {
    type Output = Expr;
    fn add(self, rhs: f64) -> Expr {
        Expr::add(vec![self, Expr::Num(rhs)])
    }
}

impl Sub<f64> for Expr {
    type Output = Expr;
    fn sub(self, rhs: f64) -> Expr {
        Expr::add(vec![self, Expr::Num(-rhs)])
    }
}

/// Registry of time-varying symbols.
///
/// A symbol declared through [`dynamic`](DynamicRegistry::dynamic) is a
/// function of time; its derivative symbol carries the same name with a
/// trailing `'` (so `x` differentiates to `x'`, and `x'` to `x''`).
/// Symbols not registered here are constants under [`dt`](DynamicRegistry::dt).
#[derive(Clone, Debug)]
pub struct DynamicRegistry {
    time: Symbol,
    dynamic: BTreeSet<Symbol>,
}

impl DynamicRegistry {
    pub fn new() -> Self {
        DynamicRegistry {
            time: Symbol::new("t"),
            dynamic: BTreeSet::new(),
        }
    }

    pub fn time(&self) -> &Symbol {
        &self.time
    }

    /// Declare a time-varying symbol; returns `(symbol, derivative_symbol)`
    pub fn dynamic(&mut self, name: &str) -> (Symbol, Symbol) {
        let s = Symbol::new(name);
        let d = Symbol::new(&format!("{name}'"));
        self.dynamic.insert(s.clone());
        (s, d)
    }

    /// Whether `s` varies with time (a registered symbol or any derivative
    /// of one)
    pub fn is_dynamic(&self, s: &Symbol) -> bool {
        let base = s.name().trim_end_matches('\'');
        self.dynamic.contains(&Symbol::new(base))
    }

    /// The symbol standing for d`s`/dt
    pub fn derivative(&self, s: &Symbol) -> Symbol {
        Symbol::new(&format!("{}'", s.name()))
    }

    /// Total time derivative: chain rule over every dynamic symbol in `e`,
    /// plus the explicit dependence on the time symbol itself.
    pub fn dt(&self, e: &Expr) -> Expr {
        let mut terms = Vec::new();
        for s in e.free_symbols() {
            if s == self.time {
                terms.push(e.diff(&self.time));
            } else if self.is_dynamic(&s) {
                terms.push(Expr::mul(vec![
                    e.diff(&s),
                    Expr::Sym(self.derivative(&s)),
                ]));
            }
        }
        Expr::add(terms)
    }
}

impl Default for DynamicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(pairs: &[(&Symbol, f64)]) -> HashMap<Symbol, f64> {
        pairs.iter().map(|(s, v)| ((*s).clone(), *v)).collect()
    }

    #[test]
    fn product_rule() {
        let a = Symbol::new("a");
        let b = Symbol::new("b");
        // d/da (a*b + a) = b + 1
        let e = Expr::sym(&a) * Expr::sym(&b) + Expr::sym(&a);
        let d = e.diff(&a);
        let got = d.eval(&bind(&[(&a, 2.0), (&b, 5.0)])).unwrap();
        assert_eq!(got, 6.0);
    }

    #[test]
    fn quotient_and_chain_rule() {
        let x = Symbol::new("x");
        // d/dx sin(x)/x at x = 1: (cos(1)*1 - sin(1)) / 1
        let e = Expr::div(Expr::sin(Expr::sym(&x)), Expr::sym(&x));
        let d = e.diff(&x);
        let got = d.eval(&bind(&[(&x, 1.0)])).unwrap();
        let want = 1.0_f64.cos() - 1.0_f64.sin();
        assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
    }

    #[test]
    fn time_derivative_uses_registry() {
        let mut reg = DynamicRegistry::new();
        let (x, xd) = reg.dynamic("x");
        let k = Symbol::new("k");
        // d/dt (k * x) = k * x'
        let e = Expr::sym(&k) * Expr::sym(&x);
        let d = reg.dt(&e);
        let got = d.eval(&bind(&[(&k, 3.0), (&xd, 2.0)])).unwrap();
        assert_eq!(got, 6.0);
    }

    #[test]
    fn eval_rejects_unbound_symbol() {
        let x = Symbol::new("x");
        let y = Symbol::new("y");
        let e = Expr::sym(&x) + Expr::sym(&y);
        let err = e.eval(&bind(&[(&x, 1.0)])).unwrap_err();
        assert_eq!(err, EvalError::UnboundSymbol(y));
    }

    #[test]
    fn constants_fold_in_constructors() {
        let x = Symbol::new("x");
        let e = Expr::mul(vec![Expr::Num(1.0), Expr::sym(&x), Expr::Num(1.0)]);
        assert_eq!(e, Expr::Sym(x.clone()));
        let z = Expr::mul(vec![Expr::Num(0.0), Expr::sym(&x)]);
        assert!(z.is_zero());
    }
}
