#![forbid(unsafe_code)]

//! Integration tests: host render/commit mechanics.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tearless_core::{ReducerStore, Store};
use tearless_harness::{Element, Host, HostConfig, RenderCx, RenderError, StateHandle, View};
use tearless_runtime::{Selector, SubscriptionNode};

type Cx<'a> = RenderCx<'a, i32, i32>;

fn store() -> ReducerStore<i32, i32> {
    ReducerStore::new(0_i32, |n: &i32, d: &i32| n + d)
}

fn element(
    f: impl Fn(&mut Cx<'_>) -> Result<View<i32, i32>, RenderError> + 'static,
) -> Element<i32, i32> {
    Element::new(f)
}

fn count() -> Selector<i32, i32> {
    Selector::new(|s: &Rc<i32>| **s)
}

fn slot<T>() -> Rc<RefCell<Option<T>>> {
    Rc::new(RefCell::new(None))
}

// ============================================================================
// Reconciliation
// ============================================================================

#[test]
fn keyed_children_keep_state_across_reorder() {
    let serial = Rc::new(Cell::new(0));
    let order = slot::<StateHandle<Vec<&'static str>>>();

    let (s, o) = (Rc::clone(&serial), Rc::clone(&order));
    let mut host = Host::new(store().into_ref());
    host.mount(element(move |cx| {
        let (names, set_names) = cx.use_state(|| vec!["a", "b"])?;
        *o.borrow_mut() = Some(set_names);
        let s = Rc::clone(&s);
        Ok(View::empty().children(names.into_iter().map(move |name| {
            let s = Rc::clone(&s);
            element(move |cx| {
                let (token, _) = cx.use_state(|| {
                    s.set(s.get() + 1);
                    s.get()
                })?;
                Ok(View::text(format!("{name}:{token}")))
            })
            .key(name)
        })))
    }))
    .unwrap();
    assert_eq!(host.output(), vec!["a:1", "b:2"]);

    let set_names = order.borrow().clone().unwrap();
    host.act(|| set_names.set(vec!["b", "a"])).unwrap();
    assert_eq!(host.output(), vec!["b:2", "a:1"]);

    host.act(|| set_names.set(vec!["c", "a"])).unwrap();
    assert_eq!(host.output(), vec!["c:3", "a:1"]);
    assert_eq!(host.instance_count(), 3);
}

#[test]
fn duplicate_key_fails_without_touching_tree() {
    let toggle = slot::<StateHandle<bool>>();
    let t = Rc::clone(&toggle);
    let mut host = Host::new(store().into_ref());
    host.mount(element(move |cx| {
        let (dup, set_dup) = cx.use_state(|| false)?;
        *t.borrow_mut() = Some(set_dup);
        let second = if dup { "x" } else { "y" };
        Ok(View::empty()
            .child(element(|_| Ok(View::text("x"))).key("x"))
            .child(element(|_| Ok(View::text("y"))).key(second)))
    }))
    .unwrap();

    let set_dup = toggle.borrow().clone().unwrap();
    let err = host.act(|| set_dup.set(true)).unwrap_err();
    assert!(matches!(err, RenderError::DuplicateKey { ref key } if key == "x"));
    assert_eq!(host.output(), vec!["x", "y"]);
    assert_eq!(host.instance_count(), 3);
}

#[test]
fn extra_hook_on_update_is_reported() {
    let extra = Rc::new(Cell::new(false));
    let handle = slot::<StateHandle<u8>>();
    let (e, h) = (Rc::clone(&extra), Rc::clone(&handle));
    let mut host = Host::new(store().into_ref());
    host.mount(element(move |cx| {
        let (n, set) = cx.use_state(|| 0_u8)?;
        *h.borrow_mut() = Some(set);
        if e.get() {
            cx.use_selection(count())?;
        }
        Ok(View::text(n.to_string()))
    }))
    .unwrap();

    extra.set(true);
    let set = handle.borrow().clone().unwrap();
    let err = host.act(|| set.set(1)).unwrap_err();
    assert!(matches!(
        err,
        RenderError::HookOrder {
            index: 1,
            expected: "nothing",
            found: "selection"
        }
    ));
    assert_eq!(host.output(), vec!["0"]);
}

#[test]
fn swapped_hook_kind_is_reported() {
    let swap = Rc::new(Cell::new(false));
    let handle = slot::<StateHandle<u8>>();
    let (w, h) = (Rc::clone(&swap), Rc::clone(&handle));
    let mut host = Host::new(store().into_ref());
    host.mount(element(move |cx| {
        let (n, set) = cx.use_state(|| 0_u8)?;
        *h.borrow_mut() = Some(set);
        if w.get() {
            cx.use_effect(None::<()>, || {})?;
        } else {
            cx.use_selection(count())?;
        }
        Ok(View::text(n.to_string()))
    }))
    .unwrap();

    swap.set(true);
    let set = handle.borrow().clone().unwrap();
    let err = host.act(|| set.set(1)).unwrap_err();
    assert!(matches!(
        err,
        RenderError::HookOrder {
            index: 1,
            expected: "selection",
            found: "effect"
        }
    ));
}

#[test]
fn missing_hook_on_update_is_reported() {
    let skip = Rc::new(Cell::new(false));
    let handle = slot::<StateHandle<u8>>();
    let (k, h) = (Rc::clone(&skip), Rc::clone(&handle));
    let mut host = Host::new(store().into_ref());
    host.mount(element(move |cx| {
        let (n, set) = cx.use_state(|| 0_u8)?;
        *h.borrow_mut() = Some(set);
        if !k.get() {
            cx.use_selection(count())?;
        }
        Ok(View::text(n.to_string()))
    }))
    .unwrap();

    skip.set(true);
    let set = handle.borrow().clone().unwrap();
    let err = host.act(|| set.set(1)).unwrap_err();
    assert!(matches!(
        err,
        RenderError::HookOrder {
            index: 1,
            expected: "selection",
            found: "nothing"
        }
    ));
}

// ============================================================================
// Discard
// ============================================================================

#[test]
fn failed_pass_drops_new_instances_and_bindings() {
    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    let mut host = Host::new(store().into_ref());
    host.mount(element(|cx| {
        let n = cx.use_selection(count())?;
        let view = View::text(format!("n={n}"));
        if n == 0 {
            return Ok(view);
        }
        Ok(view.child(element(move |cx| {
            let m = cx.use_selection(count())?;
            if m > 1 {
                return Err(RenderError::component(Boom));
            }
            Ok(View::text("child"))
        })))
    }))
    .unwrap();
    let root_bindings = host.root_node().child_count();

    let err = host.dispatch(5).unwrap_err();
    assert!(matches!(err, RenderError::Component(_)));
    assert_eq!(err.to_string(), "component failed: boom");
    assert_eq!(host.output(), vec!["n=0"]);
    assert_eq!(host.instance_count(), 1);
    assert_eq!(host.root_node().child_count(), root_bindings);
    assert!(host.has_pending(), "failed roots stay scheduled");
}

#[test]
fn failed_mount_leaves_host_empty() {
    let mut host = Host::new(store().into_ref());
    let err = host
        .mount(element(|_| Err(RenderError::Unsettled { passes: 0 })))
        .unwrap_err();
    assert!(matches!(err, RenderError::Unsettled { .. }));
    assert!(host.root().is_none());
    assert_eq!(host.instance_count(), 0);
    assert!(host.output().is_empty());
}

// ============================================================================
// Scheduling
// ============================================================================

#[test]
fn force_updates_coalesce() {
    let renders = Rc::new(Cell::new(0));
    let handle = slot::<StateHandle<u8>>();
    let (r, h) = (Rc::clone(&renders), Rc::clone(&handle));
    let mut host = Host::new(store().into_ref());
    host.mount(element(move |cx| {
        r.set(r.get() + 1);
        let (n, set) = cx.use_state(|| 0_u8)?;
        *h.borrow_mut() = Some(set);
        Ok(View::text(n.to_string()))
    }))
    .unwrap();

    let set = handle.borrow().clone().unwrap();
    host.act(|| {
        set.set(1);
        set.set(2);
        set.update(|n| *n += 1);
    })
    .unwrap();
    assert_eq!(renders.get(), 2);
    assert_eq!(host.output(), vec!["3"]);
}

#[test]
fn render_loop_is_bounded() {
    let mut host = Host::with_config(store().into_ref(), HostConfig::default().max_flush_passes(4));
    let err = host
        .mount(element(|cx| {
            let (n, set) = cx.use_state(|| 0_u32)?;
            cx.use_effect(None::<()>, move || set.set(n + 1))?;
            Ok(View::text(n.to_string()))
        }))
        .unwrap_err();
    assert!(matches!(err, RenderError::Unsettled { passes: 4 }));
    assert!(host.has_pending());
    assert_eq!(host.output(), vec!["3"]);
}

#[test]
fn effects_run_after_commit_when_deps_change() {
    let runs: Rc<RefCell<Vec<(i32, usize)>>> = Rc::default();
    let seen_children = Rc::new(Cell::new(usize::MAX));
    let (r, seen) = (Rc::clone(&runs), Rc::clone(&seen_children));
    let node = slot::<SubscriptionNode>();
    let nd = Rc::clone(&node);

    let mut host = Host::new(store().into_ref());
    host.mount(element(move |cx| {
        let n = cx.use_selection(count())?;
        *nd.borrow_mut() = cx.child_context().node().cloned();
        let (r, nd, seen) = (Rc::clone(&r), Rc::clone(&nd), Rc::clone(&seen));
        cx.use_effect(Some(n / 2), move || {
            let attached = nd.borrow().as_ref().map_or(0, SubscriptionNode::child_count);
            seen.set(attached);
            r.borrow_mut().push((n, attached));
        })?;
        Ok(View::empty().child(element(|cx| {
            let n = cx.use_selection(count())?;
            Ok(View::text(n.to_string()))
        })))
    }))
    .unwrap();

    host.dispatch(1).unwrap();
    host.dispatch(1).unwrap();
    host.dispatch(1).unwrap();

    assert_eq!(*runs.borrow(), vec![(0, 1), (2, 1)]);
    assert_eq!(seen_children.get(), 1, "effects observe committed subscriptions");
}

#[test]
fn unmount_detaches_every_binding() {
    let store = store();
    let nodes: Rc<RefCell<Vec<SubscriptionNode>>> = Rc::default();
    let n = Rc::clone(&nodes);
    let mut host = Host::new(store.clone().into_ref());
    host.mount(element(move |cx| {
        let v = cx.use_selection(count())?;
        if let Some(node) = cx.child_context().node() {
            n.borrow_mut().push(node.clone());
        }
        let n = Rc::clone(&n);
        Ok(View::text(v.to_string()).child(element(move |cx| {
            cx.use_selection(count())?;
            if let Some(node) = cx.child_context().node() {
                n.borrow_mut().push(node.clone());
            }
            Ok(View::empty())
        })))
    }))
    .unwrap();

    assert!(nodes.borrow().iter().all(SubscriptionNode::is_attached));
    host.unmount();
    assert!(nodes.borrow().iter().all(|node| !node.is_attached()));
    assert_eq!(host.root_node().child_count(), 0);
    assert_eq!(store.listener_count(), 1, "only the provider root stays subscribed");

    drop(host);
    assert_eq!(store.listener_count(), 0);
    let _ = store.dispatch(1);
}
