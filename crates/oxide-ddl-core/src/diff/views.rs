//! Views. Views marked as existing are managed elsewhere and never diffed.

use indexmap::IndexMap;

use super::{changed_refs, common_keys, relocate, DiffWarning, Differ, ViewRenameFallback};
use crate::dialect::ViewAlter;
use crate::error::Result;
use crate::resolver::{EntityKind, EntityRef};
use crate::snapshot::View;
use crate::squash::squash;
use crate::statement::{
    AlterViewStatement, MoveViewStatement, RenameViewStatement, Statement, ViewStatement,
};

fn managed(views: &IndexMap<String, View>) -> IndexMap<String, View> {
    views
        .iter()
        .filter(|(_, v)| !v.is_existing)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

impl Differ<'_> {
    pub(super) fn views(&mut self) -> Result<()> {
        let prev = managed(&self.prev.views);
        let next = managed(&self.next.views);
        let (created, deleted) = changed_refs(&prev, &next, |v| {
            EntityRef::new(v.schema.clone(), v.name.clone())
        });
        let resolution = self.resolve(EntityKind::View, created, deleted)?;

        for m in &resolution.moved {
            let Some(view) = prev.get(&self.key(&m.schema_from, &m.name)) else {
                continue;
            };
            self.out.views.push(Statement::MoveView(MoveViewStatement {
                name: m.name.clone(),
                schema_from: m.schema_from.clone(),
                schema_to: m.schema_to.clone(),
                materialized: view.materialized,
            }));
            relocate(&mut self.prev.views, self.dialect, &m.from_ref(), &m.to_ref());
        }
        for rename in &resolution.renamed {
            let (from, to) = (&rename.from, &rename.to);
            let (Some(old), Some(new)) = (
                prev.get(&self.key(&from.schema, &from.name)),
                next.get(&self.key(&to.schema, &to.name)),
            ) else {
                continue;
            };
            let supported = self.caps.rename.view
                && (from.schema == to.schema || self.caps.namespaces);
            if supported {
                if from.schema != to.schema {
                    self.out.views.push(Statement::MoveView(MoveViewStatement {
                        name: from.name.clone(),
                        schema_from: from.schema.clone(),
                        schema_to: to.schema.clone(),
                        materialized: old.materialized,
                    }));
                }
                if from.name != to.name {
                    self.out.views.push(Statement::RenameView(RenameViewStatement {
                        schema: to.schema.clone(),
                        name_from: from.name.clone(),
                        name_to: to.name.clone(),
                        materialized: old.materialized,
                    }));
                }
                relocate(&mut self.prev.views, self.dialect, from, to);
                continue;
            }
            match self.options.view_rename_fallback {
                ViewRenameFallback::Fail => {
                    return Err(self.unsupported(format!("renaming view {from} to {to}")));
                }
                ViewRenameFallback::Recreate => {
                    self.warn(DiffWarning::RenameNotSupported {
                        kind: EntityKind::View,
                        from: from.key(),
                        to: to.key(),
                    });
                    self.out
                        .pre_drops
                        .push(Statement::DropView(ViewStatement { view: old.clone() }));
                    self.out
                        .views
                        .push(Statement::CreateView(ViewStatement { view: new.clone() }));
                }
            }
        }
        for created in &resolution.created {
            if let Some(view) = next.get(&self.key(&created.schema, &created.name)) {
                self.out
                    .views
                    .push(Statement::CreateView(ViewStatement { view: view.clone() }));
            }
        }
        for deleted in &resolution.deleted {
            if let Some(view) = prev.get(&self.key(&deleted.schema, &deleted.name)) {
                self.out
                    .pre_drops
                    .push(Statement::DropView(ViewStatement { view: view.clone() }));
            }
        }
        self.alter_views(&next);
        Ok(())
    }

    /// Alters views present on both sides whose definition changed.
    fn alter_views(&mut self, next: &IndexMap<String, View>) {
        let old_views = squash(&self.prev, self.options.mode).views;
        let new_views = squash(&self.next, self.options.mode).views;
        let prev = managed(&self.prev.views);
        for key in common_keys(&prev, next) {
            let (Some(old), Some(new)) = (old_views.get(&key), new_views.get(&key)) else {
                continue;
            };
            if old == new {
                continue;
            }
            let (Some(before), Some(after)) = (prev.get(&key), next.get(&key)) else {
                continue;
            };
            self.alter_view(old, new, before, after);
        }
    }

    /// Alters a changed view in place when the dialect allows it, otherwise
    /// drops and creates it.
    fn alter_view(&mut self, old: &View, new: &View, before: &View, after: &View) {
        let only_options_changed = View {
            with: new.with.clone(),
            ..old.clone()
        } == *new;
        let in_place = match self.caps.view_alter {
            ViewAlter::Options => only_options_changed,
            ViewAlter::Definition => old.materialized == new.materialized,
            ViewAlter::None => false,
        };
        if in_place {
            let reset = if self.caps.view_alter == ViewAlter::Options {
                old.with
                    .keys()
                    .filter(|k| !new.with.contains_key(*k))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };
            self.out.views.push(Statement::AlterView(AlterViewStatement {
                view: after.clone(),
                reset,
            }));
        } else {
            self.out.pre_drops.push(Statement::DropView(ViewStatement {
                view: before.clone(),
            }));
            self.out.views.push(Statement::CreateView(ViewStatement {
                view: after.clone(),
            }));
        }
    }
}
