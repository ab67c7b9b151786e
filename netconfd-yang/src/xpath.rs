//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt;

use smallvec::SmallVec;

use crate::error::Error;

// A parsed data path: the XPath dialect produced by the filter compiler and
// understood by the datastore iterator interface. Absolute, with
// module-qualified steps and optional predicates.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Path {
    pub steps: SmallVec<[Step; 8]>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Step {
    pub module: Option<String>,
    // Node name, or "*" for the wildcard step.
    pub name: String,
    pub predicates: Vec<Predicate>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    // [name='value'] or [.='value'] - list key, content match or
    // leaf-list value.
    Content {
        module: Option<String>,
        name: String,
        value: String,
    },
    // [text()='value'] - own-text match.
    Text { value: String },
    // [@module:name='value'] - attribute match. Data nodes carry no
    // attributes, so this never matches anything in a data tree.
    Attribute {
        module: String,
        name: String,
        value: String,
    },
}

// ===== impl Path =====

impl Path {
    // Parses an absolute data path. Predicate values accept single or
    // double quotes; the quote character cannot occur inside the value,
    // matching what the filter compiler emits.
    pub fn parse(path: &str) -> Result<Path, Error> {
        let bad = || Error::BadPath(path.to_owned());
        let mut steps = SmallVec::new();
        let mut rest = path;

        if !rest.starts_with('/') {
            return Err(bad());
        }

        while let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;

            // Step name, optionally module-qualified.
            let name_len = rest
                .find(['/', '['])
                .unwrap_or(rest.len());
            let qname = &rest[..name_len];
            if qname.is_empty() {
                return Err(bad());
            }
            rest = &rest[name_len..];

            let (module, name) = match qname.split_once(':') {
                Some((module, name)) => (Some(module.to_owned()), name),
                None => (None, qname),
            };
            if name.is_empty() {
                return Err(bad());
            }

            // Predicates.
            let mut predicates = Vec::new();
            while let Some(stripped) = rest.strip_prefix('[') {
                let end = stripped.find(']').ok_or_else(bad)?;
                let pred = &stripped[..end];
                rest = &stripped[end + 1..];
                predicates.push(Predicate::parse(pred).ok_or_else(bad)?);
            }
            if !rest.is_empty() && !rest.starts_with('/') {
                return Err(bad());
            }

            steps.push(Step {
                module,
                name: name.to_owned(),
                predicates,
            });
        }

        if steps.is_empty() {
            return Err(bad());
        }
        Ok(Path { steps })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/")?;
            if let Some(module) = &step.module {
                write!(f, "{}:", module)?;
            }
            write!(f, "{}", step.name)?;
            for pred in &step.predicates {
                write!(f, "{}", pred)?;
            }
        }
        Ok(())
    }
}

// ===== impl Predicate =====

impl Predicate {
    fn parse(pred: &str) -> Option<Predicate> {
        let (lhs, rhs) = pred.split_once('=')?;
        let value = unquote(rhs)?;

        if let Some(qname) = lhs.strip_prefix('@') {
            let (module, name) = qname.split_once(':')?;
            if module.is_empty() || name.is_empty() {
                return None;
            }
            return Some(Predicate::Attribute {
                module: module.to_owned(),
                name: name.to_owned(),
                value,
            });
        }

        if lhs == "text()" {
            return Some(Predicate::Text { value });
        }

        let (module, name) = match lhs.split_once(':') {
            Some((module, name)) => (Some(module.to_owned()), name),
            None => (None, lhs),
        };
        if name.is_empty() {
            return None;
        }
        Some(Predicate::Content {
            module,
            name: name.to_owned(),
            value,
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Content {
                module,
                name,
                value,
            } => {
                write!(f, "[")?;
                if let Some(module) = module {
                    write!(f, "{}:", module)?;
                }
                write!(f, "{}='{}']", name, value)
            }
            Predicate::Text { value } => {
                write!(f, "[text()='{}']", value)
            }
            Predicate::Attribute {
                module,
                name,
                value,
            } => {
                write!(f, "[@{}:{}='{}']", module, name, value)
            }
        }
    }
}

// ===== helper functions =====

fn unquote(quoted: &str) -> Option<String> {
    let mut chars = quoted.chars();
    let quote = chars.next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let inner = quoted.strip_prefix(quote)?.strip_suffix(quote)?;
    if inner.contains(quote) {
        return None;
    }
    Some(inner.to_owned())
}
