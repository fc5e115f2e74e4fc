//! Symbol table: where frozen defs live.
//!
//! A table holds the current set of defs by fully-qualified name behind a
//! reader/writer lock. Transactions are installed by [`SymbolTable::commit`],
//! which links sub-references, freezes the new defs, and swaps the live map
//! in one atomic step. Replaced defs move to a retirement list and are
//! reclaimed by [`SymbolTable::gc`] once no outside reference can reach them.
//!
//! Commits are linearizable with respect to reader snapshots: after `commit`
//! returns, any subsequent lookup observes the new set, while readers that
//! already hold a replaced def keep it alive through its `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use indexmap::IndexMap;

use crate::def::{Def, DefKind};
use crate::error::{CommitError, LinkError, LinkFailure};
use crate::txn::SymbolTxn;

#[derive(Default)]
struct Inner {
    map: IndexMap<String, Arc<Def>>,
    retired: Vec<Arc<Def>>,
}

/// A table of installed, immutable defs.
#[derive(Default)]
pub struct SymbolTable {
    inner: RwLock<Inner>,
}

impl SymbolTable {
    /// Create an empty table. The `Arc` is required: installed defs carry a
    /// weak back-reference to their owning table.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Find a def with this exact fully-qualified name.
    pub fn lookup(&self, name: &str) -> Option<Arc<Def>> {
        let inner = self.read();
        inner.map.get(name).cloned()
    }

    /// Resolve `sym` against scope `base` using descriptor.proto semantics:
    /// a leading dot means fully-qualified; otherwise the innermost scope
    /// that has the name wins, so nested types shadow ancestors.
    pub fn resolve(&self, base: &str, sym: &str) -> Option<Arc<Def>> {
        let inner = self.read();
        resolve_scoped(base, sym, |name| inner.map.get(name).cloned())
    }

    /// Snapshot the currently installed defs, optionally filtered by kind.
    /// Every returned reference is counted.
    pub fn getdefs(&self, kind: Option<DefKind>) -> Vec<Arc<Def>> {
        let inner = self.read();
        inner
            .map
            .values()
            .filter(|d| kind.is_none_or(|k| d.kind() == k))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().map.is_empty()
    }

    /// Number of replaced defs still parked on the retirement list.
    pub fn retired_count(&self) -> usize {
        self.read().retired.len()
    }

    /// Install every def staged in `txn`, atomically.
    ///
    /// Resolves every sub-reference (first against the transaction, then the
    /// existing table), rejecting unresolved names and kind mismatches. On
    /// failure the table is untouched and the transaction keeps all of its
    /// defs for a retry; on success the transaction is drained, replaced
    /// defs are retired, and the new defs are frozen.
    pub fn commit(self: &Arc<Self>, txn: &mut SymbolTxn) -> Result<(), CommitError> {
        let mut inner = self.write();

        // Validation pass: nothing is touched until the whole batch links.
        let mut errors = Vec::new();
        for (_, def) in txn.iter() {
            let Def::Message(m) = def else { continue };
            for f in m.fields() {
                let Some(expected) = f.field_type().expected_sub_kind() else {
                    continue;
                };
                let context = format!("{}.{}", m.full_name(), f.name());
                let Some(type_name) = f.type_name() else {
                    errors.push(LinkError {
                        context,
                        symbol: String::new(),
                        failure: LinkFailure::MissingTypeName,
                    });
                    continue;
                };
                let found = resolve_scoped(m.full_name(), type_name, |name| {
                    txn.get(name)
                        .map(Def::kind)
                        .or_else(|| inner.map.get(name).map(|d| d.kind()))
                });
                match found {
                    None => errors.push(LinkError {
                        context,
                        symbol: type_name.to_owned(),
                        failure: LinkFailure::NotFound,
                    }),
                    Some(kind) if kind != expected => errors.push(LinkError {
                        context,
                        symbol: type_name.to_owned(),
                        failure: LinkFailure::WrongKind {
                            expected,
                            found: kind,
                        },
                    }),
                    Some(_) => {}
                }
            }
        }
        if !errors.is_empty() {
            return Err(CommitError { errors });
        }

        // Publish: wrap, retire replaced defs, patch links, freeze, swap.
        let staged: Vec<Arc<Def>> = txn
            .take()
            .into_iter()
            .map(|(_, def)| Arc::new(def))
            .collect();

        let mut map = inner.map.clone();
        for def in &staged {
            if let Some(old) = map.insert(def.full_name().to_owned(), def.clone()) {
                inner.retired.push(old);
            }
        }

        for def in &staged {
            let Def::Message(m) = def.as_ref() else { continue };
            for f in m.fields() {
                if f.field_type().expected_sub_kind().is_none() {
                    continue;
                }
                let type_name = f.type_name().expect("validated above");
                let target = resolve_scoped(m.full_name(), type_name, |name| {
                    map.get(name).cloned()
                })
                .expect("validated above");
                f.link(Arc::downgrade(&target));
            }
        }

        for def in &staged {
            def.install(Arc::downgrade(self));
        }
        inner.map = map;
        Ok(())
    }

    /// Drop retired defs that are no longer reachable.
    ///
    /// An entry survives if an outside reference still holds it, or if it is
    /// reachable through sub-links from an entry that does. A live table
    /// entry is never dropped.
    pub fn gc(&self) {
        let mut inner = self.write();
        let retired = std::mem::take(&mut inner.retired);

        let index: HashMap<*const Def, usize> = retired
            .iter()
            .enumerate()
            .map(|(i, d)| (Arc::as_ptr(d), i))
            .collect();

        // Roots: entries referenced beyond the list's own Arc. Collected
        // before any upgrades so traversal cannot inflate the counts.
        let mut stack: Vec<usize> = retired
            .iter()
            .enumerate()
            .filter(|&(_, d)| Arc::strong_count(d) > 1)
            .map(|(i, _)| i)
            .collect();

        let mut keep = vec![false; retired.len()];
        while let Some(i) = stack.pop() {
            if keep[i] {
                continue;
            }
            keep[i] = true;
            let Def::Message(m) = retired[i].as_ref() else {
                continue;
            };
            for f in m.fields() {
                if let Some(target) = f.sub() {
                    if let Some(&j) = index.get(&Arc::as_ptr(&target)) {
                        stack.push(j);
                    }
                }
            }
        }

        inner.retired = retired
            .into_iter()
            .zip(keep)
            .filter_map(|(d, k)| k.then_some(d))
            .collect();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("symbol table lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("symbol table lock poisoned")
    }
}

/// Walk scopes from `base` outward, returning the first hit.
///
/// For base `a.b.c` and symbol `D` the candidates are `a.b.c.D`, `a.b.D`,
/// `a.D`, `D` in that order. A leading dot on `sym` skips the search.
fn resolve_scoped<T>(base: &str, sym: &str, lookup: impl Fn(&str) -> Option<T>) -> Option<T> {
    if let Some(absolute) = sym.strip_prefix('.') {
        return lookup(absolute);
    }
    let mut scope = base;
    loop {
        let candidate = if scope.is_empty() {
            sym.to_owned()
        } else {
            format!("{scope}.{sym}")
        };
        if let Some(hit) = lookup(&candidate) {
            return Some(hit);
        }
        if scope.is_empty() {
            return None;
        }
        scope = match scope.rfind('.') {
            Some(i) => &scope[..i],
            None => "",
        };
    }
}
