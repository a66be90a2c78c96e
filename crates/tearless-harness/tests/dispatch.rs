#![forbid(unsafe_code)]

//! Integration tests: dispatcher identity.

use std::cell::RefCell;
use std::rc::Rc;

use tearless_core::{Dispatcher, ReducerStore, Store};
use tearless_harness::{Element, Host, RenderCx, RenderError, View};

type Cx<'a> = RenderCx<'a, u32, ()>;
type Captured = Rc<RefCell<Vec<Dispatcher<u32, ()>>>>;

fn store() -> ReducerStore<u32, ()> {
    ReducerStore::new(0_u32, |n: &u32, _: &()| n + 1)
}

fn element(
    f: impl Fn(&mut Cx<'_>) -> Result<View<u32, ()>, RenderError> + 'static,
) -> Element<u32, ()> {
    Element::new(f)
}

fn capturing(captured: &Captured) -> Element<u32, ()> {
    let c = Rc::clone(captured);
    element(move |cx| {
        c.borrow_mut().push(cx.use_dispatcher());
        c.borrow_mut().push(cx.use_dispatcher());
        Ok(View::text("test"))
    })
}

#[test]
fn same_reference_within_one_render() {
    let captured = Captured::default();
    let mut host = Host::new(store().into_ref());
    host.mount(capturing(&captured)).unwrap();

    let captured = captured.borrow();
    assert_eq!(captured.len(), 2);
    assert!(captured[0].ptr_eq(&captured[1]));
}

#[test]
fn same_reference_across_mounts_of_one_store() {
    let store = store().into_ref();
    let captured = Captured::default();

    let mut first = Host::new(Rc::clone(&store));
    first.mount(capturing(&captured)).unwrap();
    drop(first);

    let mut second = Host::new(Rc::clone(&store));
    second.mount(capturing(&captured)).unwrap();

    let captured = captured.borrow();
    assert_eq!(captured.len(), 4);
    assert!(captured.iter().all(|d| d.ptr_eq(&store.dispatcher())));
}

#[test]
fn same_reference_across_rerenders() {
    let captured = Captured::default();
    let store = store().into_ref();
    let mut host = Host::new(Rc::clone(&store));

    let c = Rc::clone(&captured);
    host.mount(element(move |cx| {
        let n = cx.use_whole_state()?;
        c.borrow_mut().push(cx.use_dispatcher());
        Ok(View::text(n.to_string()))
    }))
    .unwrap();

    let dispatch = captured.borrow()[0].clone();
    host.act(|| {
        dispatch.dispatch(());
    })
    .unwrap();
    host.dispatch(()).unwrap();

    let captured = captured.borrow();
    assert_eq!(captured.len(), 3);
    assert!(captured.windows(2).all(|w| w[0].ptr_eq(&w[1])));
    assert_eq!(host.output(), vec!["2"]);
}
