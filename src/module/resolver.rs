//! Symbol resolution: names and predicates to handles.
//!
//! Lookups go through query values that carry the requested name plus optional
//! disambiguating predicates. The policy is the same for types, fields and methods:
//!
//! - no declaration matches: [`crate::Error::SymbolNotFound`]
//! - one or more match and a predicate was supplied: the first in declaration order wins
//! - more than one carries the name and no predicate was supplied:
//!   [`crate::Error::AmbiguousSymbol`]
//!
//! Types are searched top-level first, then nested, each in `TypeDef` order.
//!
//! # Examples
//!
//! ```rust,no_run
//! use autofish::module::{FieldQuery, MethodQuery, Module, TypeQuery};
//! use std::path::Path;
//!
//! let module = Module::from_file(Path::new("Terraria.exe"))?;
//! let projectile = module.find_type(&TypeQuery::named("Projectile"))?;
//! let ai = module.find_field(projectile, &FieldQuery::named("ai").of_type("Single[]"))?;
//! let kill = module.find_method(projectile, &MethodQuery::named("Kill").with_params(0))?;
//! println!("ai = {}, Kill = {}", ai.token(), kill.token());
//! # Ok::<(), autofish::Error>(())
//! ```

use crate::{
    module::{FieldHandle, MethodHandle, Module, TypeDef, TypeHandle},
    Error::{AmbiguousSymbol, NoBody, SymbolNotFound},
    Result, SymbolKind,
};

/// A type lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeQuery<'a> {
    /// Simple name of the type
    pub name: &'a str,
    /// Required namespace. Nested types are matched by the namespace of their outermost
    /// enclosing type.
    pub namespace: Option<&'a str>,
}

impl<'a> TypeQuery<'a> {
    /// Look up a type by its simple name
    #[must_use]
    pub fn named(name: &'a str) -> Self {
        TypeQuery {
            name,
            namespace: None,
        }
    }

    /// Require a namespace
    #[must_use]
    pub fn in_namespace(mut self, namespace: &'a str) -> Self {
        self.namespace = Some(namespace);
        self
    }

    fn has_predicate(&self) -> bool {
        self.namespace.is_some()
    }
}

/// A field lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldQuery<'a> {
    /// Field name
    pub name: &'a str,
    /// Required static (`true`) or instance (`false`) storage
    pub is_static: Option<bool>,
    /// Required display name of the field type, e.g. `Single[]`
    pub type_name: Option<&'a str>,
}

impl<'a> FieldQuery<'a> {
    /// Look up a field by name
    #[must_use]
    pub fn named(name: &'a str) -> Self {
        FieldQuery {
            name,
            is_static: None,
            type_name: None,
        }
    }

    /// Require a static field
    #[must_use]
    pub fn static_only(mut self) -> Self {
        self.is_static = Some(true);
        self
    }

    /// Require an instance field
    #[must_use]
    pub fn instance_only(mut self) -> Self {
        self.is_static = Some(false);
        self
    }

    /// Require a field type
    #[must_use]
    pub fn of_type(mut self, type_name: &'a str) -> Self {
        self.type_name = Some(type_name);
        self
    }

    fn has_predicate(&self) -> bool {
        self.is_static.is_some() || self.type_name.is_some()
    }
}

/// A method lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodQuery<'a> {
    /// Method name
    pub name: &'a str,
    /// Required static (`true`) or instance (`false`) method
    pub is_static: Option<bool>,
    /// Required number of declared parameters, `this` excluded
    pub param_count: Option<usize>,
    /// Required minimum number of body instructions
    pub min_instructions: Option<usize>,
}

impl<'a> MethodQuery<'a> {
    /// Look up a method by name
    #[must_use]
    pub fn named(name: &'a str) -> Self {
        MethodQuery {
            name,
            is_static: None,
            param_count: None,
            min_instructions: None,
        }
    }

    /// Require a static method
    #[must_use]
    pub fn static_only(mut self) -> Self {
        self.is_static = Some(true);
        self
    }

    /// Require an instance method
    #[must_use]
    pub fn instance_only(mut self) -> Self {
        self.is_static = Some(false);
        self
    }

    /// Require `count` declared parameters, `this` excluded
    #[must_use]
    pub fn with_params(mut self, count: usize) -> Self {
        self.param_count = Some(count);
        self
    }

    /// Require a body of more than `count` instructions
    #[must_use]
    pub fn with_min_instructions(mut self, count: usize) -> Self {
        self.min_instructions = Some(count);
        self
    }

    fn has_predicate(&self) -> bool {
        self.is_static.is_some() || self.param_count.is_some() || self.min_instructions.is_some()
    }
}

/// Apply the resolution policy to the declarations carrying the requested name.
///
/// `named` is the number of declarations with the name, `matched` the first one that also
/// satisfies the predicates.
fn pick<T>(
    named: usize,
    matched: Option<T>,
    has_predicate: bool,
    kind: SymbolKind,
    owner: &str,
    name: &str,
) -> Result<T> {
    if named > 1 && !has_predicate {
        return Err(AmbiguousSymbol {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
            count: named,
        });
    }

    matched.ok_or_else(|| SymbolNotFound {
        kind,
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

impl Module {
    /// Namespace of `ty`, or of its outermost enclosing type if it is nested
    fn effective_namespace<'a>(&'a self, ty: &'a TypeDef) -> &'a str {
        let mut current = ty;
        while let Some(outer) = current.enclosing.and_then(|handle| self.type_def(handle)) {
            if outer.handle == current.handle {
                break;
            }
            current = outer;
        }
        &current.namespace
    }

    /// Resolve a type
    ///
    /// # Errors
    /// Returns [`crate::Error::SymbolNotFound`] or [`crate::Error::AmbiguousSymbol`] per the
    /// resolution policy.
    pub fn find_type(&self, query: &TypeQuery) -> Result<TypeHandle> {
        let top_level = self.types().iter().filter(|ty| ty.enclosing.is_none());
        let nested = self.types().iter().filter(|ty| ty.enclosing.is_some());
        let named = top_level
            .chain(nested)
            .filter(|ty| ty.name == query.name)
            .collect::<Vec<_>>();

        let matched = named
            .iter()
            .find(|ty| {
                query
                    .namespace
                    .map_or(true, |namespace| self.effective_namespace(ty) == namespace)
            })
            .map(|ty| ty.handle);

        pick(
            named.len(),
            matched,
            query.has_predicate(),
            SymbolKind::Type,
            query.namespace.unwrap_or(""),
            query.name,
        )
    }

    /// Resolve a field of `owner`
    ///
    /// # Errors
    /// Returns [`crate::Error::SymbolNotFound`] or [`crate::Error::AmbiguousSymbol`] per the
    /// resolution policy.
    pub fn find_field(&self, owner: TypeHandle, query: &FieldQuery) -> Result<FieldHandle> {
        let ty = self.owner(owner, SymbolKind::Field, query.name)?;

        let named = ty
            .fields
            .iter()
            .filter(|field| field.name == query.name)
            .collect::<Vec<_>>();
        let matched = named
            .iter()
            .find(|field| {
                query
                    .is_static
                    .map_or(true, |is_static| field.handle.is_static() == is_static)
                    && query
                        .type_name
                        .map_or(true, |type_name| field.type_name == type_name)
            })
            .map(|field| field.handle);

        pick(
            named.len(),
            matched,
            query.has_predicate(),
            SymbolKind::Field,
            &ty.full_name(),
            query.name,
        )
    }

    /// Resolve a method of `owner`.
    ///
    /// The minimum instruction count predicate decodes candidate bodies without caching
    /// them. Methods without a body count as empty.
    ///
    /// # Errors
    /// Returns [`crate::Error::SymbolNotFound`] or [`crate::Error::AmbiguousSymbol`] per the
    /// resolution policy, or an error if a candidate body cannot be decoded.
    pub fn find_method(&self, owner: TypeHandle, query: &MethodQuery) -> Result<MethodHandle> {
        let ty = self.owner(owner, SymbolKind::Method, query.name)?;

        let named = ty
            .methods
            .iter()
            .filter(|method| method.name == query.name)
            .collect::<Vec<_>>();

        let mut matched = None;
        for method in &named {
            if query
                .is_static
                .is_some_and(|is_static| method.handle.is_static() != is_static)
            {
                continue;
            }
            if query
                .param_count
                .is_some_and(|count| method.param_count() != count)
            {
                continue;
            }
            if let Some(minimum) = query.min_instructions {
                let count = match self.instruction_count(method.handle) {
                    Ok(count) => count,
                    Err(NoBody(_)) => 0,
                    Err(error) => return Err(error),
                };
                if count <= minimum {
                    continue;
                }
            }

            matched = Some(method.handle);
            break;
        }

        pick(
            named.len(),
            matched,
            query.has_predicate(),
            SymbolKind::Method,
            &ty.full_name(),
            query.name,
        )
    }

    fn owner(&self, owner: TypeHandle, kind: SymbolKind, name: &str) -> Result<&TypeDef> {
        self.type_def(owner).ok_or_else(|| SymbolNotFound {
            kind,
            owner: owner.token().to_string(),
            name: name.to_string(),
        })
    }
}
