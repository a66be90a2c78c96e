#![forbid(unsafe_code)]

//! Components, elements, and render output.

use std::fmt;
use std::rc::Rc;

use crate::error::RenderError;
use crate::hooks::RenderCx;

/// A render function. Props are whatever the implementor captures.
pub trait Component<S, A> {
    /// Produce this instance's view. Called on mount and on every re-render.
    ///
    /// # Errors
    ///
    /// Any error fails the whole render pass.
    fn render(&self, cx: &mut RenderCx<'_, S, A>) -> Result<View<S, A>, RenderError>;
}

impl<S, A, F> Component<S, A> for F
where
    F: Fn(&mut RenderCx<'_, S, A>) -> Result<View<S, A>, RenderError>,
{
    fn render(&self, cx: &mut RenderCx<'_, S, A>) -> Result<View<S, A>, RenderError> {
        self(cx)
    }
}

/// A component placed in a parent's view, optionally keyed.
///
/// Unkeyed children are matched by position.
pub struct Element<S, A> {
    pub(crate) key: Option<String>,
    pub(crate) component: Rc<dyn Component<S, A>>,
}

impl<S, A> Element<S, A> {
    /// Element from a render closure.
    pub fn new(
        render: impl Fn(&mut RenderCx<'_, S, A>) -> Result<View<S, A>, RenderError> + 'static,
    ) -> Self {
        Self::from_component(render)
    }

    /// Element from any component.
    pub fn from_component(component: impl Component<S, A> + 'static) -> Self {
        Self {
            key: None,
            component: Rc::new(component),
        }
    }

    /// Set the reconciliation key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl<S, A> fmt::Debug for Element<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// One render result: this instance's own text plus its children.
pub struct View<S, A> {
    pub(crate) text: String,
    pub(crate) children: Vec<Element<S, A>>,
}

impl<S, A> View<S, A> {
    /// A view with no text and no children.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// A leaf with `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }

    /// Append one child.
    #[must_use]
    pub fn child(mut self, element: Element<S, A>) -> Self {
        self.children.push(element);
        self
    }

    /// Append several children.
    #[must_use]
    pub fn children(mut self, elements: impl IntoIterator<Item = Element<S, A>>) -> Self {
        self.children.extend(elements);
        self
    }
}

impl<S, A> fmt::Debug for View<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("text", &self.text)
            .field("children", &self.children)
            .finish()
    }
}
