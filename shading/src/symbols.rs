//! The two-level symbol table: a shared predefined scope and a per-shader scope.

use shading_common::FastHashMap;

use crate::types::{Storage, Type, TypeAndStorage};

/// An index into a [`SymbolTable`]'s symbol arena. Stable for the table's lifetime.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SymbolId(u32);

#[derive(Clone, Debug)]
pub struct Symbol {
  pub name: String,
  pub type_and_storage: TypeAndStorage,
  pub is_parameter: bool,
}

impl Symbol {
  pub fn ty(&self) -> Type {
    self.type_and_storage.ty
  }

  pub fn storage(&self) -> Storage {
    self.type_and_storage.storage
  }
}

/// A single lexical scope: a name-to-symbol map layered over a parent scope.
struct Scope {
  symbols: FastHashMap<String, SymbolId>,
}

/// Predefined-plus-shader symbol table.
///
/// The predefined scope is built once (see [`SymbolTable::with_predefined_globals`])
/// and is immutable afterwards; shader compilation pushes and pops additional
/// scopes on top of it, one per block/illuminance body.
pub struct SymbolTable {
  arena: Vec<Symbol>,
  scopes: Vec<Scope>,
}

impl SymbolTable {
  /// An empty table with just a single, empty global scope.
  pub fn new() -> Self {
    Self { arena: Vec::new(), scopes: vec![Scope { symbols: FastHashMap::default() }] }
  }

  /// Builds a table seeded with the predefined identifiers that are always in
  /// scope regardless of shader kind (§4.2's contract): `P, N, I, Cs, Os, Ci,
  /// Oi, s, t, u, v, Ps, Cl, Ol, PI`. A predefined identifier not meaningful
  /// for the shader kind being compiled (e.g. `Ci` inside a `light` shader)
  /// is simply never written by a well-formed shader of that kind; the
  /// semantic analyzer does not reject the read.
  pub fn with_predefined_globals() -> Self {
    let mut table = Self::new();
    table.declare(Symbol {
      name: "PI".into(),
      type_and_storage: TypeAndStorage::constant(Type::Float),
      is_parameter: false,
    });

    let varying = |ty: Type| TypeAndStorage::new(ty, Storage::Varying);
    let globals: &[(&str, Type)] = &[
      ("P", Type::Point),
      ("N", Type::Normal),
      ("I", Type::Vector),
      ("Cs", Type::Color),
      ("Os", Type::Color),
      ("Ci", Type::Color),
      ("Oi", Type::Color),
      ("s", Type::Float),
      ("t", Type::Float),
      ("u", Type::Float),
      ("v", Type::Float),
      ("Ps", Type::Point),
      ("Cl", Type::Color),
      ("Ol", Type::Color),
    ];
    for (name, ty) in globals {
      table.declare(Symbol { name: (*name).into(), type_and_storage: varying(*ty), is_parameter: false });
    }
    table
  }

  fn current_scope_mut(&mut self) -> &mut Scope {
    self.scopes.last_mut().expect("symbol table always has at least one scope")
  }

  /// Pushes a new, empty scope (block entry, shader entry, illuminance body entry).
  pub fn push_scope(&mut self) {
    self.scopes.push(Scope { symbols: FastHashMap::default() });
  }

  pub fn pop_scope(&mut self) {
    assert!(self.scopes.len() > 1, "cannot pop the root scope");
    self.scopes.pop();
  }

  /// Pushes a scope with `Cl`/`Ol`/`Ps` re-seeded as varying, per the rule that
  /// any read of a light's outputs inside an `illuminance` body is varying
  /// regardless of how the light shader produced them.
  pub fn push_illuminance_scope(&mut self) {
    self.push_scope();
    let varying = |ty: Type| TypeAndStorage::new(ty, Storage::Varying);
    self.declare(Symbol { name: "Cl".into(), type_and_storage: varying(Type::Color), is_parameter: false });
    self.declare(Symbol { name: "Ol".into(), type_and_storage: varying(Type::Color), is_parameter: false });
    self.declare(Symbol { name: "Ps".into(), type_and_storage: varying(Type::Point), is_parameter: false });
  }

  /// Declares `symbol` in the current (innermost) scope, returning its id.
  ///
  /// Storage class is fixed for the symbol's lifetime: once declared, a
  /// symbol's `type_and_storage.storage` never changes.
  pub fn declare(&mut self, symbol: Symbol) -> SymbolId {
    let id = SymbolId(self.arena.len() as u32);
    let name = symbol.name.clone();
    self.arena.push(symbol);
    self.current_scope_mut().symbols.insert(name, id);
    id
  }

  /// Resolves `name` starting from the innermost scope outward.
  pub fn resolve(&self, name: &str) -> Option<SymbolId> {
    for scope in self.scopes.iter().rev() {
      if let Some(id) = scope.symbols.get(name) {
        return Some(*id);
      }
    }
    None
  }

  pub fn symbol(&self, id: SymbolId) -> &Symbol {
    &self.arena[id.0 as usize]
  }

  pub fn len(&self) -> usize {
    self.arena.len()
  }

  pub fn is_empty(&self) -> bool {
    self.arena.is_empty()
  }
}

impl Default for SymbolTable {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn predefined_globals_are_always_in_scope() {
    let table = SymbolTable::with_predefined_globals();
    let id = table.resolve("Ci").expect("Ci should be predefined");
    assert_eq!(table.symbol(id).ty(), Type::Color);
    assert_eq!(table.symbol(id).storage(), Storage::Varying);
    assert!(table.resolve("PI").is_some());
  }

  #[test]
  fn inner_scope_shadows_outer_declarations() {
    let mut table = SymbolTable::new();
    table.declare(Symbol {
      name: "x".into(),
      type_and_storage: TypeAndStorage::new(Type::Float, Storage::Uniform),
      is_parameter: false,
    });
    table.push_scope();
    table.declare(Symbol {
      name: "x".into(),
      type_and_storage: TypeAndStorage::new(Type::Float, Storage::Varying),
      is_parameter: false,
    });
    let id = table.resolve("x").unwrap();
    assert_eq!(table.symbol(id).storage(), Storage::Varying);

    table.pop_scope();
    let id = table.resolve("x").unwrap();
    assert_eq!(table.symbol(id).storage(), Storage::Uniform);
  }

  #[test]
  fn undeclared_identifiers_do_not_resolve() {
    let table = SymbolTable::new();
    assert!(table.resolve("nonexistent").is_none());
  }

  #[test]
  fn illuminance_scope_seeds_varying_light_outputs() {
    let mut table = SymbolTable::with_predefined_globals();
    table.push_illuminance_scope();
    let cl = table.resolve("Cl").unwrap();
    assert_eq!(table.symbol(cl).storage(), Storage::Varying);
  }
}
