//! Binding leftover tokens to declared positional/structured arguments.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::application::error::ArgError;
use crate::domain::format::{decode, ArgValues};
use crate::domain::{Arg, Str, Value, ValueRef};

/// An argument slot with its value after binding.
#[derive(Debug, Clone)]
pub struct BoundArg {
    pub name: String,
    pub value: ValueRef,
    /// Filled from a token (as opposed to a default or nothing).
    pub supplied: bool,
}

impl BoundArg {
    pub fn render(&self) -> String {
        self.value.render()
    }
}

struct Binder<'d> {
    decls: &'d [Arg],
    values: Vec<ValueRef>,
    supplied: Vec<bool>,
    positional: Vec<String>,
}

impl<'d> Binder<'d> {
    fn new(decls: &'d [Arg]) -> Self {
        let values: Vec<ValueRef> = decls
            .iter()
            .map(|d| d.value.clone().unwrap_or_else(|| Rc::new(Str::new())))
            .collect();
        for value in &values {
            value.reset();
        }
        Self {
            decls,
            values,
            supplied: vec![false; decls.len()],
            positional: Vec::new(),
        }
    }

    fn set(&mut self, pos: usize, raw: &str) -> Result<(), ArgError> {
        self.values[pos].set(raw).map_err(|source| ArgError::Invalid {
            name: self.decls[pos].display_name(pos),
            source,
        })?;
        self.supplied[pos] = true;
        Ok(())
    }

    /// Bind decoded groups by name. Returns false when no key matched a
    /// declared argument, so the caller can fall back to positional use.
    fn bind_named(&mut self, groups: ArgValues) -> Result<bool, ArgError> {
        let mut matched = false;
        let mut fragments = Vec::new();
        for (key, vals) in groups {
            if key.is_empty() {
                fragments.extend(vals);
                continue;
            }
            let Some(first) = vals.first() else { continue };
            if let Some(pos) = self.decls.iter().position(|d| d.name == key) {
                trace!(arg = %key, "bound by name");
                self.set(pos, first)?;
                matched = true;
            }
        }
        // Keyless values (JSON arrays, loose form words) are positional.
        if matched || !fragments.is_empty() {
            self.positional.extend(fragments);
            return Ok(true);
        }
        Ok(false)
    }

    fn push_token(&mut self, token: &str) -> Result<(), ArgError> {
        match decode(token) {
            Ok(Some(groups)) => {
                if !self.bind_named(groups)? {
                    self.positional.push(token.to_string());
                }
            }
            Ok(None) => self.positional.push(token.to_string()),
            Err(e) => {
                debug!(token, error = %e, "structured token treated as positional");
                self.positional.push(token.to_string());
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<BoundArg>, ArgError> {
        let queue = std::mem::take(&mut self.positional);
        let mut queue = queue.into_iter();
        for pos in 0..self.decls.len() {
            if self.supplied[pos] {
                continue;
            }
            if let Some(raw) = queue.next() {
                self.set(pos, &raw)?;
            }
        }

        for (pos, decl) in self.decls.iter().enumerate() {
            if self.supplied[pos] {
                continue;
            }
            if !decl.default.is_empty() {
                self.values[pos]
                    .set_default(&decl.default)
                    .map_err(|source| ArgError::InvalidDefault {
                        name: decl.display_name(pos),
                        source,
                    })?;
            } else if decl.required {
                return Err(ArgError::Missing(decl.display_name(pos)));
            }
        }

        Ok(self
            .decls
            .iter()
            .enumerate()
            .map(|(pos, decl)| BoundArg {
                name: decl.display_name(pos),
                value: self.values[pos].clone(),
                supplied: self.supplied[pos],
            })
            .collect())
    }
}

/// Bind `tokens` to `decls`.
///
/// Structured tokens whose keys name declared arguments bind those by name;
/// every other token, and keyless decoded values, fill the remaining
/// arguments in declaration order. Unfilled arguments then take their
/// default or, if required, fail.
pub fn bind_args(decls: &[Arg], tokens: &[String]) -> Result<Vec<BoundArg>, ArgError> {
    let mut binder = Binder::new(decls);
    for token in tokens {
        binder.push_token(token)?;
    }
    binder.finish()
}

/// One string argument per token, named `arg1..argN`.
pub fn synthesize_args(tokens: &[String]) -> Vec<BoundArg> {
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let value = Str::new();
            let _ = value.set(token);
            BoundArg {
                name: format!("arg{}", i + 1),
                value: Rc::new(value),
                supplied: true,
            }
        })
        .collect()
}
