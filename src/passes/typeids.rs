//! Structural type identifiers for every class the program references.
//!
//! Ids are assigned by a preorder walk of the class hierarchy, children visited in name
//! order, starting at the root class with id 0. The subclasses of a class therefore form
//! the contiguous range `id..=max_subclass_id`, which turns a class subtype test into two
//! integer comparisons. Interfaces follow the classes, in name order.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use dashmap::DashMap;

use crate::{
    compiler::{CompiledProgram, WholeProgramPass},
    context::CompilationContext,
    events::EventKind,
    graph::{Action, Literal, Node, NodeVisitor, Value, ValueHandle, ValueOp},
    types::{ClassContext, ClassType, ValueType, ROOT_CLASS},
    Result,
};

/// The id of a class and the largest id among its subclasses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeIdRange {
    /// The class's own id.
    pub id: u32,
    /// The largest id of any subclass, or `id` for leaves and interfaces.
    pub max_subclass_id: u32,
}

impl TypeIdRange {
    /// Returns `true` if `id` belongs to this class or one of its subclasses.
    #[must_use]
    pub const fn contains(&self, id: u32) -> bool {
        self.id <= id && id <= self.max_subclass_id
    }
}

/// The session's type id table, stored as a context attachment.
#[derive(Debug, Default)]
pub struct TypeIds {
    ids: DashMap<Arc<str>, TypeIdRange>,
}

impl TypeIds {
    /// Returns the table of `context`, creating an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the attachment slot holds another type.
    pub fn get(context: &CompilationContext) -> Result<Arc<Self>> {
        context.compute_attachment_if_absent(Self::default)
    }

    /// Records an id range. Returns `false` if the class already has one.
    pub fn assign(&self, class: &str, range: TypeIdRange) -> bool {
        if self.ids.contains_key(class) {
            return false;
        }
        let mut added = false;
        self.ids.entry(Arc::from(class)).or_insert_with(|| {
            added = true;
            range
        });
        added
    }

    /// The id of a class.
    #[must_use]
    pub fn id(&self, class: &str) -> Option<u32> {
        self.ids.get(class).map(|entry| entry.id)
    }

    /// The id range of a class.
    #[must_use]
    pub fn range(&self, class: &str) -> Option<TypeIdRange> {
        self.ids.get(class).map(|entry| *entry)
    }

    /// Number of classes with an id.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no id was assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Collects the classes referenced by nodes.
struct ClassCollector<'a> {
    classes: &'a dyn ClassContext,
}

type Referenced = BTreeMap<String, Arc<ClassType>>;

impl ClassCollector<'_> {
    fn add(found: &mut Referenced, class: &Arc<ClassType>) {
        if found.contains_key(class.name()) {
            return;
        }
        found.insert(class.name().to_string(), class.clone());
        if let Some(parent) = class.super_class() {
            Self::add(found, parent);
        }
        for interface in class.interfaces() {
            Self::add(found, interface);
        }
    }

    fn add_named(&self, found: &mut Referenced, name: &str) {
        if let Some(class) = self.classes.find_defined_type(name) {
            Self::add(found, &class);
        }
    }

    fn add_type(found: &mut Referenced, ty: &ValueType) {
        match ty {
            ValueType::Reference(reference) => Self::add(found, reference.class()),
            ValueType::Pointer(pointee) => Self::add_type(found, pointee),
            ValueType::Array { element, .. } => Self::add_type(found, element),
            _ => {}
        }
    }

    fn add_handle(&self, found: &mut Referenced, handle: &ValueHandle) {
        if let Some(field) = handle.field() {
            self.add_named(found, field.owner());
        }
        Self::add_type(found, handle.value_type());
    }
}

impl NodeVisitor<Referenced, ()> for ClassCollector<'_> {
    fn visit_unknown(&mut self, _found: &mut Referenced, _node: &Node) {}

    fn visit_value(&mut self, found: &mut Referenced, _node: &Node, value: &Value) {
        Self::add_type(found, value.ty());
        match value.op() {
            ValueOp::Literal(Literal::Type(ty)) => Self::add_type(found, ty),
            ValueOp::New(class) => Self::add(found, class),
            ValueOp::InstanceOf { target, .. } | ValueOp::CheckCast { target, .. } => {
                Self::add(found, target.class());
            }
            ValueOp::Load { handle, .. } => self.add_handle(found, handle),
            ValueOp::InvokeStatic { target, .. }
            | ValueOp::InvokeInstance { target, .. }
            | ValueOp::InvokeConstructor { target, .. } => self.add_named(found, target.owner()),
            _ => {}
        }
    }

    fn visit_action(&mut self, found: &mut Referenced, _node: &Node, action: &Action) {
        match action {
            Action::Store { handle, .. } => self.add_handle(found, handle),
            Action::InvokeStatic { target, .. } | Action::InvokeInstance { target, .. } => {
                self.add_named(found, target.owner());
            }
            Action::Fence(_) | Action::MonitorEnter(_) | Action::MonitorExit(_) => {}
        }
    }
}

/// Assigns a [`TypeIdRange`] to every class referenced by any compiled graph, plus all
/// of their supertypes, and publishes the result as the [`TypeIds`] attachment.
///
/// The root class always receives id 0. The assignment depends only on the set of
/// referenced classes, never on the order in which units were compiled.
#[derive(Debug, Default)]
pub struct TypeIdAssigner {
    assigned: usize,
}

impl TypeIdAssigner {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids assigned by the last run.
    #[must_use]
    pub fn assigned(&self) -> usize {
        self.assigned
    }

    /// Numbers `name` and, recursively, its subclasses in `children`. Returns the next free id.
    fn number(
        name: &str,
        children: &BTreeMap<&str, BTreeSet<&str>>,
        next: u32,
        out: &mut Vec<(String, TypeIdRange)>,
    ) -> u32 {
        let slot = out.len();
        out.push((name.to_string(), TypeIdRange { id: next, max_subclass_id: next }));
        let mut following = next + 1;
        if let Some(subclasses) = children.get(name) {
            for child in subclasses {
                following = Self::number(child, children, following, out);
            }
        }
        out[slot].1.max_subclass_id = following - 1;
        following
    }
}

impl WholeProgramPass for TypeIdAssigner {
    fn name(&self) -> &'static str {
        "typeids"
    }

    fn run(&mut self, program: &CompiledProgram, ctx: &CompilationContext) -> Result<bool> {
        let mut collector = ClassCollector {
            classes: ctx.classes(),
        };
        let mut found = Referenced::new();
        collector.add_named(&mut found, ROOT_CLASS);
        for entry in program.graphs() {
            for id in entry.value().nodes() {
                ctx.store().get(*id)?.accept(&mut collector, &mut found);
            }
        }

        let mut children: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut interfaces = Vec::new();
        for (name, class) in &found {
            if class.is_interface() {
                interfaces.push(name.as_str());
                continue;
            }
            let parent = class.super_class().map_or(ROOT_CLASS, |parent| parent.name());
            if name != ROOT_CLASS {
                children.entry(parent).or_default().insert(name.as_str());
            }
        }

        let mut ranges = Vec::with_capacity(found.len());
        let mut next = Self::number(ROOT_CLASS, &children, 0, &mut ranges);
        for interface in interfaces {
            ranges.push((interface.to_string(), TypeIdRange { id: next, max_subclass_id: next }));
            next += 1;
        }

        let ids = TypeIds::get(ctx)?;
        let mut changed = false;
        for (name, range) in &ranges {
            if ids.assign(name, *range) {
                changed = true;
                if ctx.config().record_rewrites {
                    ctx.events
                        .record(EventKind::TypeIdAssigned)
                        .pass(self.name())
                        .message(format!("{name} = {}", range.id));
                }
            }
        }
        self.assigned = ranges.len();
        Ok(changed)
    }

    fn description(&self) -> &'static str {
        "Assigns structural type ids to all referenced classes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{BuilderPipeline, GraphBuilder},
        compiler::UnitScheduler,
        config::CompilerConfig,
        graph::BlockLabel,
        types::{ClassRegistry, ExecutableElement, MethodDescriptor, Modifiers},
    };

    struct Hierarchy {
        ctx: Arc<CompilationContext>,
        shape: Arc<ClassType>,
        circle: Arc<ClassType>,
        square: Arc<ClassType>,
        drawable: Arc<ClassType>,
    }

    fn hierarchy() -> Hierarchy {
        let registry = ClassRegistry::new();
        let drawable = registry.define(ClassType::builder("app/Drawable").interface().build());
        let shape = registry.define(
            ClassType::builder("app/Shape")
                .extends(registry.root().clone())
                .implements(drawable.clone())
                .build(),
        );
        let square = registry.define(ClassType::builder("app/Square").extends(shape.clone()).build());
        let circle = registry.define(ClassType::builder("app/Circle").extends(shape.clone()).build());
        registry.define(
            ClassType::builder("app/Unused")
                .extends(registry.root().clone())
                .build(),
        );
        let ctx = Arc::new(CompilationContext::new(
            Arc::new(registry),
            CompilerConfig::default(),
        ));
        Hierarchy {
            ctx,
            shape,
            circle,
            square,
            drawable,
        }
    }

    fn unit(name: &str) -> Arc<ExecutableElement> {
        Arc::new(ExecutableElement::method(
            "app/Main",
            name,
            MethodDescriptor::void(),
            ValueType::Void,
            Modifiers::STATIC,
        ))
    }

    fn allocate(class: Arc<ClassType>) -> impl Fn(&mut dyn GraphBuilder) -> Result<()> {
        move |b: &mut dyn GraphBuilder| -> Result<()> {
            b.begin(&BlockLabel::new())?;
            let object = b.new_(class.clone())?;
            b.return_(Some(object))?;
            Ok(())
        }
    }

    fn assign(h: &Hierarchy, allocated: Vec<Arc<ClassType>>) -> Arc<TypeIds> {
        let units: Vec<_> = (0..allocated.len()).map(|i| unit(&format!("m{i}"))).collect();
        let translator = move |element: &Arc<ExecutableElement>, b: &mut dyn GraphBuilder| -> Result<()> {
            let index: usize = element.name()[1..].parse().unwrap_or(0);
            allocate(allocated[index].clone())(b)
        };
        UnitScheduler::new(BuilderPipeline::new())
            .with_pass(TypeIdAssigner::new())
            .run(&h.ctx, &translator, units)
            .unwrap();
        TypeIds::get(&h.ctx).unwrap()
    }

    #[test]
    fn test_preorder_ranges() {
        let h = hierarchy();
        let ids = assign(&h, vec![h.square.clone(), h.circle.clone()]);

        assert_eq!(ids.id(ROOT_CLASS), Some(0));
        assert_eq!(ids.id("app/Shape"), Some(1));
        assert_eq!(ids.id("app/Circle"), Some(2));
        assert_eq!(ids.id("app/Square"), Some(3));
        assert_eq!(ids.id("app/Drawable"), Some(4));
        assert_eq!(ids.id("app/Unused"), None);

        let shape = ids.range("app/Shape").unwrap();
        assert_eq!(shape.max_subclass_id, 3);
        assert!(shape.contains(ids.id("app/Circle").unwrap()));
        assert!(!shape.contains(ids.id(ROOT_CLASS).unwrap()));
        assert_eq!(ids.range(ROOT_CLASS).unwrap().max_subclass_id, 3);
    }

    #[test]
    fn test_assignment_independent_of_unit_order() {
        let first = hierarchy();
        let second = hierarchy();
        let a = assign(&first, vec![first.circle.clone(), first.square.clone()]);
        let b = assign(&second, vec![second.square.clone(), second.circle.clone()]);

        for name in ["app/Shape", "app/Circle", "app/Square", "app/Drawable"] {
            assert_eq!(a.range(name), b.range(name), "{name}");
        }
        assert_eq!(first.drawable.name(), "app/Drawable");
        assert_eq!(first.shape.name(), "app/Shape");
    }

    #[test]
    fn test_ids_are_dense() {
        let h = hierarchy();
        let ids = assign(&h, vec![h.circle.clone()]);
        let mut all: Vec<_> = ["java/lang/Object", "app/Shape", "app/Circle", "app/Drawable"]
            .iter()
            .map(|name| ids.id(name).unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3]);
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_assign_is_insert_if_absent() {
        let ids = TypeIds::default();
        let range = TypeIdRange {
            id: 3,
            max_subclass_id: 3,
        };
        assert!(ids.assign("app/A", range));
        assert!(!ids.assign(
            "app/A",
            TypeIdRange {
                id: 9,
                max_subclass_id: 9
            }
        ));
        assert_eq!(ids.range("app/A"), Some(range));
    }
}
