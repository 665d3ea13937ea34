use crate::ast::{CompiledPath, Filter, Segment};
use crate::error::Error;
use crate::runtime::evaluation::core::range_positions;
use crate::runtime::evaluation::filter::matches;
use crate::runtime::evaluation::EvalContext;
use crate::runtime::utils::clamp_index;
use crate::types::{Map, Value};

static NULL: Value = Value::Null;

/// When a walk reaches a null slot, whether to build a container there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialize {
    Never,
    /// An object before a property, an array before an index.
    ByNext,
    /// Objects only, before a property.
    ObjectsOnly,
}

type Action<'f> = dyn FnMut(&mut Value) -> Result<bool, Error> + 'f;

/// Mutable path walker. Multi-selecting segments fan out: the rest of the
/// path is applied to every selected node in place.
pub struct Walker<'a> {
    ctx: EvalContext<'a>,
    policy: Materialize,
}

impl<'a> Walker<'a> {
    /// `snapshot` is the root that reference filters read from.
    pub fn new(path: &CompiledPath, snapshot: Option<&'a Value>, policy: Materialize) -> Self {
        Self {
            ctx: EvalContext {
                root: snapshot.unwrap_or(&NULL),
                ignore_null_value: path.ignore_null_value(),
            },
            policy,
        }
    }

    /// Call `action` on every node addressed by `segments`. `next` is the
    /// segment the caller will apply to those nodes, if any. Returns whether
    /// any action reported a change.
    pub fn visit(
        &self,
        node: &mut Value,
        segments: &[Segment],
        next: Option<&Segment>,
        action: &mut Action<'_>,
    ) -> Result<bool, Error> {
        let Some((segment, rest)) = segments.split_first() else {
            return action(node);
        };
        let following = rest.first().or(next);

        match segment {
            Segment::Property { deep: false, .. } | Segment::MultiProperty(_)
                if matches!(node, Value::Array(_)) =>
            {
                let mut any = false;
                if let Value::Array(items) = node {
                    for item in items.iter_mut() {
                        any |= self.visit(item, segments, next, action)?;
                    }
                }
                Ok(any)
            }
            Segment::Property { name, deep: false, .. } => {
                self.visit_property(node, name, rest, next, following, action)
            }
            Segment::Property { name, deep: true, .. } => {
                self.visit_deep_property(node, name, rest, next, action)
            }
            Segment::MultiProperty(names) => {
                let mut any = false;
                for name in names {
                    any |= self.visit_property(node, name, rest, next, following, action)?;
                }
                Ok(any)
            }
            Segment::Wildcard { deep: false, .. } => self.visit_children(node, rest, next, action),
            Segment::Wildcard { deep: true, object_only } => {
                self.visit_descendants(node, *object_only, rest, next, action)
            }
            Segment::ArrayIndex(index) => self.visit_index(node, *index, rest, next, following, action),
            Segment::MultiIndex(indices) => {
                let mut any = false;
                for index in indices {
                    any |= self.visit_index(node, *index, rest, next, following, action)?;
                }
                Ok(any)
            }
            Segment::Range { start, end, step } => {
                let Value::Array(items) = node else {
                    return Ok(false);
                };
                let positions = range_positions(items.len(), *start, *end, *step).unwrap_or_default();
                let mut any = false;
                for i in positions {
                    any |= self.enter(&mut items[i], rest, next, following, action)?;
                }
                Ok(any)
            }
            Segment::Filter(filter) => self.visit_filtered(node, filter, rest, next, action),
            function => Err(Error::mutation(format!(
                "cannot navigate through {:?}",
                function
            ))),
        }
    }

    fn wants_container(&self, following: Option<&Segment>) -> Option<Value> {
        match (self.policy, following) {
            (Materialize::ByNext, Some(Segment::Property { deep: false, .. } | Segment::MultiProperty(_)))
            | (Materialize::ObjectsOnly, Some(Segment::Property { deep: false, .. })) => {
                Some(Value::Object(Map::new()))
            }
            (Materialize::ByNext, Some(Segment::ArrayIndex(_) | Segment::MultiIndex(_) | Segment::Range { .. })) => {
                Some(Value::Array(Vec::new()))
            }
            _ => None,
        }
    }

    fn enter(
        &self,
        child: &mut Value,
        rest: &[Segment],
        next: Option<&Segment>,
        following: Option<&Segment>,
        action: &mut Action<'_>,
    ) -> Result<bool, Error> {
        if child.is_null() {
            if let Some(container) = self.wants_container(following) {
                *child = container;
            }
        }
        self.visit(child, rest, next, action)
    }

    fn visit_property(
        &self,
        node: &mut Value,
        name: &str,
        rest: &[Segment],
        next: Option<&Segment>,
        following: Option<&Segment>,
        action: &mut Action<'_>,
    ) -> Result<bool, Error> {
        match node {
            Value::Object(map) => {
                if !map.contains_key(name) {
                    match self.wants_container(following) {
                        Some(container) => {
                            map.insert(name.to_string(), container);
                        }
                        None => return Ok(false),
                    }
                }
                match map.get_mut(name) {
                    Some(child) => self.enter(child, rest, next, following, action),
                    None => Ok(false),
                }
            }
            Value::Bean(bean) => {
                let accessor = bean.accessor();
                let mut child = accessor.get(name).unwrap_or_default();
                let changed = self.enter(&mut child, rest, next, following, action)?;
                if changed {
                    accessor.set(name, child)?;
                }
                Ok(changed)
            }
            _ => Ok(false),
        }
    }

    /// Apply the rest of the path to every value stored under `name` at any
    /// depth. Matches are not searched further.
    pub fn visit_deep_property(
        &self,
        node: &mut Value,
        name: &str,
        rest: &[Segment],
        next: Option<&Segment>,
        action: &mut Action<'_>,
    ) -> Result<bool, Error> {
        let mut any = false;
        match node {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    if key == name {
                        any |= self.visit(child, rest, next, action)?;
                    } else if !child.is_primitive() {
                        any |= self.visit_deep_property(child, name, rest, next, action)?;
                    }
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut().filter(|item| !item.is_primitive()) {
                    any |= self.visit_deep_property(item, name, rest, next, action)?;
                }
            }
            Value::Bean(bean) => {
                let accessor = bean.accessor();
                for key in accessor.property_names() {
                    let mut child = accessor.get(&key).unwrap_or_default();
                    let changed = if key == name {
                        self.visit(&mut child, rest, next, action)?
                    } else if !child.is_primitive() {
                        self.visit_deep_property(&mut child, name, rest, next, action)?
                    } else {
                        false
                    };
                    if changed {
                        accessor.set(&key, child)?;
                        any = true;
                    }
                }
            }
            _ => {}
        }
        Ok(any)
    }

    fn visit_children(
        &self,
        node: &mut Value,
        rest: &[Segment],
        next: Option<&Segment>,
        action: &mut Action<'_>,
    ) -> Result<bool, Error> {
        let mut any = false;
        match node {
            Value::Object(map) => {
                for child in map.values_mut() {
                    any |= self.visit(child, rest, next, action)?;
                }
            }
            Value::Array(items) => {
                for child in items.iter_mut() {
                    any |= self.visit(child, rest, next, action)?;
                }
            }
            Value::Bean(bean) => {
                let accessor = bean.accessor();
                for key in accessor.property_names() {
                    let mut child = accessor.get(&key).unwrap_or_default();
                    if self.visit(&mut child, rest, next, action)? {
                        accessor.set(&key, child)?;
                        any = true;
                    }
                }
            }
            _ => {}
        }
        Ok(any)
    }

    fn visit_descendants(
        &self,
        node: &mut Value,
        object_only: bool,
        rest: &[Segment],
        next: Option<&Segment>,
        action: &mut Action<'_>,
    ) -> Result<bool, Error> {
        let children: Vec<&mut Value> = match node {
            Value::Object(map) => map.values_mut().collect(),
            Value::Array(items) => items.iter_mut().collect(),
            _ => return Ok(false),
        };
        let mut any = false;
        for child in children {
            if child.is_primitive() {
                if !object_only {
                    any |= self.visit(child, rest, next, action)?;
                }
                continue;
            }
            if !object_only || !matches!(child, Value::Array(_)) {
                any |= self.visit(child, rest, next, action)?;
            }
            any |= self.visit_descendants(child, object_only, rest, next, action)?;
        }
        Ok(any)
    }

    fn visit_index(
        &self,
        node: &mut Value,
        index: i64,
        rest: &[Segment],
        next: Option<&Segment>,
        following: Option<&Segment>,
        action: &mut Action<'_>,
    ) -> Result<bool, Error> {
        match node {
            Value::Array(items) => {
                let slot = match clamp_index(items.len(), index) {
                    Some(i) => i,
                    None if index >= 0 && self.wants_container(following).is_some() => {
                        let i = index as usize;
                        pad_to(items, i)?;
                        i
                    }
                    None => return Ok(false),
                };
                self.enter(&mut items[slot], rest, next, following, action)
            }
            Value::Object(_) | Value::Bean(_) => {
                let key = index.to_string();
                self.visit_property(node, &key, rest, next, following, action)
            }
            _ => Ok(false),
        }
    }

    fn visit_filtered(
        &self,
        node: &mut Value,
        filter: &Filter,
        rest: &[Segment],
        next: Option<&Segment>,
        action: &mut Action<'_>,
    ) -> Result<bool, Error> {
        match node {
            Value::Null => Ok(false),
            Value::Array(items) => {
                let mut selected = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    if matches(&self.ctx, filter, item)? {
                        selected.push(i);
                    }
                }
                let mut any = false;
                for i in selected {
                    any |= self.visit(&mut items[i], rest, next, action)?;
                }
                Ok(any)
            }
            other => {
                if matches(&self.ctx, filter, other)? {
                    self.visit(other, rest, next, action)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Remove the items of `items` that match `filter`.
    pub fn retain_unmatched(&self, filter: &Filter, items: &mut Vec<Value>) -> Result<bool, Error> {
        let mut keep = Vec::with_capacity(items.len());
        for item in items.iter() {
            keep.push(!matches(&self.ctx, filter, item)?);
        }
        let before = items.len();
        let mut flags = keep.into_iter();
        items.retain(|_| flags.next().unwrap_or(true));
        Ok(items.len() != before)
    }

    pub fn filter_matches(&self, filter: &Filter, item: &Value) -> Result<bool, Error> {
        matches(&self.ctx, filter, item)
    }
}

fn ref_snapshot(path: &CompiledPath, root: &Value) -> Option<Value> {
    path.has_ref_segment().then(|| root.clone())
}

/// Assign `value` at every location the path addresses, creating missing
/// objects and arrays along the way.
pub fn set(path: &CompiledPath, root: &mut Value, value: Value) -> Result<bool, Error> {
    if root.is_null() {
        return Ok(false);
    }
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(Error::mutation("cannot assign to the root"));
    };
    let snapshot = ref_snapshot(path, root);
    let walker = Walker::new(path, snapshot.as_ref(), Materialize::ByNext);
    walker.visit(root, parents, Some(last), &mut |parent| {
        set_terminal(&walker, parent, last, &value)
    })
}

fn set_terminal(walker: &Walker<'_>, parent: &mut Value, last: &Segment, value: &Value) -> Result<bool, Error> {
    match last {
        Segment::Property { name, deep: false, .. } => set_property(parent, name, value),
        Segment::Property { name, deep: true, .. } => {
            walker.visit_deep_property(parent, name, &[], None, &mut |slot| {
                *slot = value.clone();
                Ok(true)
            })
        }
        Segment::MultiProperty(names) => {
            let mut any = false;
            for name in names {
                any |= set_property(parent, name, value)?;
            }
            Ok(any)
        }
        Segment::Wildcard { deep: false, .. } => Ok(match parent {
            Value::Object(map) => {
                map.values_mut().for_each(|slot| *slot = value.clone());
                !map.is_empty()
            }
            Value::Array(items) => {
                items.iter_mut().for_each(|slot| *slot = value.clone());
                !items.is_empty()
            }
            _ => false,
        }),
        Segment::ArrayIndex(index) => set_index(parent, *index, value),
        Segment::MultiIndex(indices) => {
            let mut any = false;
            for index in indices {
                any |= set_index(parent, *index, value)?;
            }
            Ok(any)
        }
        Segment::Range { start, end, step } => {
            let Value::Array(items) = parent else {
                return Ok(false);
            };
            let positions = range_positions(items.len(), *start, *end, *step).unwrap_or_default();
            for &i in &positions {
                items[i] = value.clone();
            }
            Ok(!positions.is_empty())
        }
        other => Err(Error::mutation(format!("cannot assign through {:?}", other))),
    }
}

pub(crate) fn set_property(node: &mut Value, name: &str, value: &Value) -> Result<bool, Error> {
    match node {
        Value::Object(map) => {
            map.insert(name.to_string(), value.clone());
            Ok(true)
        }
        Value::Array(items) => {
            let mut any = false;
            for item in items.iter_mut() {
                any |= set_property(item, name, value)?;
            }
            Ok(any)
        }
        Value::Bean(bean) => {
            bean.accessor().set(name, value.clone())?;
            Ok(true)
        }
        Value::Null => Ok(false),
        other => Err(Error::mutation(format!(
            "cannot set property '{}' on {} value",
            name,
            other.type_name()
        ))),
    }
}

/// Index assignment; past the end the sequence is padded with nulls.
pub(crate) fn set_index(node: &mut Value, index: i64, value: &Value) -> Result<bool, Error> {
    match node {
        Value::Array(items) => {
            if index < 0 {
                return Ok(match clamp_index(items.len(), index) {
                    Some(i) => {
                        items[i] = value.clone();
                        true
                    }
                    None => false,
                });
            }
            let i = index as usize;
            pad_to(items, i)?;
            items[i] = value.clone();
            Ok(true)
        }
        Value::Object(_) | Value::Bean(_) => set_property(node, &index.to_string(), value),
        Value::Null => Ok(false),
        other => Err(Error::mutation(format!(
            "cannot set index {} on {} value",
            index,
            other.type_name()
        ))),
    }
}

/// Nulls appended past the end of a sequence by one index assignment.
pub const MAX_INDEX_PADDING: usize = 1 << 20;

/// Grow `items` with nulls so that `index` is a valid slot.
fn pad_to(items: &mut Vec<Value>, index: usize) -> Result<(), Error> {
    if index < items.len() {
        return Ok(());
    }
    if index - items.len() >= MAX_INDEX_PADDING {
        return Err(Error::mutation(format!(
            "index {} is too far past the end of a sequence of length {}",
            index,
            items.len()
        )));
    }
    let needed = index + 1 - items.len();
    items
        .try_reserve(needed)
        .map_err(|e| Error::mutation(format!("cannot grow sequence to index {}: {}", index, e)))?;
    items.resize(index + 1, Value::Null);
    Ok(())
}

/// Remove whatever the path addresses.
pub fn remove(path: &CompiledPath, root: &mut Value) -> Result<bool, Error> {
    if root.is_null() {
        return Ok(false);
    }
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        return Err(Error::mutation("cannot remove the root"));
    };
    let snapshot = ref_snapshot(path, root);
    let walker = Walker::new(path, snapshot.as_ref(), Materialize::Never);

    // `a.b[?(...)]`: drop the objects whose `b` matches from their container.
    if let (Segment::Filter(filter), Some((Segment::Property { name, deep: false, .. }, grand))) =
        (last, parents.split_last())
    {
        return walker.visit(root, grand, parents.last(), &mut |node| {
            remove_filtered_children(&walker, node, name, filter)
        });
    }

    walker.visit(root, parents, Some(last), &mut |parent| {
        remove_terminal(&walker, parent, last)
    })
}

fn remove_filtered_children(
    walker: &Walker<'_>,
    node: &mut Value,
    name: &str,
    filter: &Filter,
) -> Result<bool, Error> {
    match node {
        Value::Array(items) => {
            let mut removed = false;
            let mut doomed = Vec::new();
            for (i, item) in items.iter_mut().enumerate() {
                let Value::Object(map) = item else {
                    continue;
                };
                match map.get_mut(name) {
                    Some(Value::Array(children)) => {
                        removed |= walker.retain_unmatched(filter, children)?;
                    }
                    Some(child @ Value::Object(_)) => {
                        if walker.filter_matches(filter, child)? {
                            doomed.push(i);
                        }
                    }
                    _ => {}
                }
            }
            removed |= !doomed.is_empty();
            for i in doomed.into_iter().rev() {
                items.remove(i);
            }
            Ok(removed)
        }
        Value::Object(map) => {
            let matched = match map.get_mut(name) {
                Some(Value::Array(children)) => return walker.retain_unmatched(filter, children),
                Some(child @ Value::Object(_)) => walker.filter_matches(filter, child)?,
                _ => false,
            };
            if matched {
                map.shift_remove(name);
            }
            Ok(matched)
        }
        _ => Ok(false),
    }
}

fn remove_terminal(walker: &Walker<'_>, parent: &mut Value, last: &Segment) -> Result<bool, Error> {
    match last {
        Segment::Property { name, deep: false, .. } => Ok(remove_property(parent, name)),
        Segment::Property { name, deep: true, .. } => remove_deep(parent, name),
        Segment::MultiProperty(names) => Ok(names
            .iter()
            .fold(false, |any, name| remove_property(parent, name) | any)),
        Segment::Wildcard { deep: false, .. } => Ok(match parent {
            Value::Object(map) => {
                let had = !map.is_empty();
                map.clear();
                had
            }
            Value::Array(items) => {
                let had = !items.is_empty();
                items.clear();
                had
            }
            _ => false,
        }),
        Segment::ArrayIndex(index) => Ok(match parent {
            Value::Array(items) => match clamp_index(items.len(), *index) {
                Some(i) => {
                    items.remove(i);
                    true
                }
                None => false,
            },
            Value::Object(_) | Value::Bean(_) => remove_property(parent, &index.to_string()),
            _ => false,
        }),
        Segment::MultiIndex(indices) => {
            let Value::Array(items) = parent else {
                return Ok(false);
            };
            let positions = indices
                .iter()
                .filter_map(|i| clamp_index(items.len(), *i))
                .collect();
            Ok(remove_positions(items, positions))
        }
        Segment::Range { start, end, step } => {
            let Value::Array(items) = parent else {
                return Ok(false);
            };
            let positions = range_positions(items.len(), *start, *end, *step).unwrap_or_default();
            Ok(remove_positions(items, positions))
        }
        Segment::Filter(filter) => match parent {
            Value::Array(items) => walker.retain_unmatched(filter, items),
            _ => Ok(false),
        },
        other => Err(Error::mutation(format!("cannot remove {:?}", other))),
    }
}

fn remove_positions(items: &mut Vec<Value>, mut positions: Vec<usize>) -> bool {
    positions.sort_unstable();
    positions.dedup();
    let removed = !positions.is_empty();
    for i in positions.into_iter().rev() {
        items.remove(i);
    }
    removed
}

/// True only when a non-null value was removed.
fn remove_property(node: &mut Value, name: &str) -> bool {
    match node {
        Value::Object(map) => map.shift_remove(name).is_some_and(|v| !v.is_null()),
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |any, item| remove_property(item, name) | any),
        Value::Bean(bean) => bean.accessor().remove(name),
        _ => false,
    }
}

fn remove_deep(node: &mut Value, name: &str) -> Result<bool, Error> {
    let mut any = false;
    match node {
        Value::Object(map) => {
            any = map.shift_remove(name).is_some_and(|v| !v.is_null());
            for child in map.values_mut().filter(|v| !v.is_primitive()) {
                any |= remove_deep(child, name)?;
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                any |= remove_deep(item, name)?;
            }
        }
        Value::Bean(bean) => {
            let accessor = bean.accessor();
            any = accessor.remove(name);
            for key in accessor.property_names() {
                let Some(mut child) = accessor.get(&key) else {
                    continue;
                };
                if !child.is_primitive() && remove_deep(&mut child, name)? {
                    accessor.set(&key, child)?;
                    any = true;
                }
            }
        }
        _ => {}
    }
    Ok(any)
}

/// Append `values` to the sequence the path addresses.
pub fn array_add(path: &CompiledPath, root: &mut Value, values: &[Value]) -> Result<(), Error> {
    if values.is_empty() || root.is_null() {
        return Ok(());
    }
    let snapshot = ref_snapshot(path, root);
    let walker = Walker::new(path, snapshot.as_ref(), Materialize::Never);
    let mut reached = false;
    walker.visit(root, path.segments(), None, &mut |target| {
        reached = true;
        match target {
            Value::Array(items) => {
                items.extend(values.iter().cloned());
                Ok(true)
            }
            Value::Null => Err(Error::mutation(format!("value not found in path {}", path))),
            other => Err(Error::mutation(format!(
                "cannot append to {} value at {}",
                other.type_name(),
                path
            ))),
        }
    })?;
    if !reached {
        return Err(Error::mutation(format!("value not found in path {}", path)));
    }
    Ok(())
}

/// Patch `add`/`replace`: write `value` at the path, building missing
/// objects on the way. Without `replace`, an existing sequence is appended
/// to and an existing scalar widens into `[old, value]`.
pub fn patch_add(path: &CompiledPath, root: &mut Value, value: &Value, replace: bool) -> Result<bool, Error> {
    if root.is_null() {
        return Ok(false);
    }
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(Error::mutation("cannot patch the root"));
    };
    let snapshot = ref_snapshot(path, root);
    let walker = Walker::new(path, snapshot.as_ref(), Materialize::ObjectsOnly);
    walker.visit(root, parents, Some(last), &mut |parent| {
        let current = match last {
            Segment::Property { name, deep: false, .. } => read_slot(parent, name),
            Segment::ArrayIndex(index) => match &*parent {
                Value::Array(items) => clamp_index(items.len(), *index)
                    .map(|i| items[i].clone())
                    .unwrap_or_default(),
                other => read_slot(other, &index.to_string()),
            },
            other => {
                return Err(Error::mutation(format!(
                    "patch path must end with a property or an index, not {:?}",
                    other
                )))
            }
        };
        let new_value = match current {
            Value::Array(mut items) if !replace => {
                items.push(value.clone());
                Value::Array(items)
            }
            Value::Null | Value::Object(_) => value.clone(),
            _ if replace => value.clone(),
            old => Value::Array(vec![old, value.clone()]),
        };
        match last {
            Segment::ArrayIndex(index) => set_index(parent, *index, &new_value),
            Segment::Property { name, .. } => set_property(parent, name, &new_value),
            _ => Ok(false),
        }
    })
}

fn read_slot(node: &Value, name: &str) -> Value {
    match node {
        Value::Object(map) => map.get(name).cloned().unwrap_or_default(),
        Value::Bean(bean) => bean.accessor().get(name).unwrap_or_default(),
        _ => Value::Null,
    }
}
