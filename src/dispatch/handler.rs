//! Handler representation.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::reply::{Outcome, OutputKind, Reply};
use super::RequestContext;

type ContextFn = dyn Fn(&mut RequestContext, Vec<String>) -> Outcome + Send + Sync;
type PlainFn = dyn Fn(Vec<String>) -> Outcome + Send + Sync;

/// Shape of a handler, fixed at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Whether the handler takes the request context first.
    pub context: bool,
    /// Number of captured path parameters it takes.
    pub arity: usize,
    /// What its return value produces.
    pub output: OutputKind,
}

/// A registered request handler.
#[derive(Clone)]
pub enum Handler {
    /// `(ctx, params...) -> R`
    Contextual {
        signature: Signature,
        call: Arc<ContextFn>,
    },
    /// `(params...) -> R`
    Plain {
        signature: Signature,
        call: Arc<PlainFn>,
    },
}

impl Handler {
    pub fn signature(&self) -> Signature {
        match self {
            Handler::Contextual { signature, .. } | Handler::Plain { signature, .. } => *signature,
        }
    }

    pub fn arity(&self) -> usize {
        self.signature().arity
    }

    pub fn takes_context(&self) -> bool {
        matches!(self, Handler::Contextual { .. })
    }

    /// Invoke with the request context and captured parameters.
    ///
    /// `params` must hold exactly `arity()` values; the route table
    /// guarantees this for registered routes.
    pub fn invoke(&self, ctx: &mut RequestContext, params: Vec<String>) -> Outcome {
        match self {
            Handler::Contextual { call, .. } => call(ctx, params),
            Handler::Plain { call, .. } => call(params),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.signature()).finish()
    }
}

/// Marker for handlers taking the request context first.
pub struct WithContext<T>(PhantomData<fn() -> T>);

/// Marker for handlers taking only path parameters.
pub struct WithoutContext<T>(PhantomData<fn() -> T>);

/// Conversion of a function or closure into a [`Handler`].
///
/// Implemented for `Fn(&mut RequestContext, String, ...) -> R` and
/// `Fn(String, ...) -> R` with up to four `String` parameters, where
/// `R: Reply`. The marker type parameter only keeps the impls apart.
pub trait IntoHandler<M>: Send + Sync + 'static {
    fn into_handler(self) -> Handler;
}

impl IntoHandler<()> for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

macro_rules! impl_into_handler {
    ($arity:literal; $($param:ident: $ty:ty),*) => {
        impl<F, R> IntoHandler<WithContext<($($ty,)*)>> for F
        where
            F: Fn(&mut RequestContext, $($ty),*) -> R + Send + Sync + 'static,
            R: Reply,
        {
            #[allow(unused_mut, unused_variables)]
            fn into_handler(self) -> Handler {
                Handler::Contextual {
                    signature: Signature {
                        context: true,
                        arity: $arity,
                        output: R::KIND,
                    },
                    call: Arc::new(move |ctx: &mut RequestContext, params: Vec<String>| {
                        let mut params = params.into_iter();
                        $(let $param = params.next().unwrap_or_default();)*
                        (self)(ctx, $($param),*).into_outcome()
                    }),
                }
            }
        }

        impl<F, R> IntoHandler<WithoutContext<($($ty,)*)>> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: Reply,
        {
            #[allow(unused_mut, unused_variables)]
            fn into_handler(self) -> Handler {
                Handler::Plain {
                    signature: Signature {
                        context: false,
                        arity: $arity,
                        output: R::KIND,
                    },
                    call: Arc::new(move |params: Vec<String>| {
                        let mut params = params.into_iter();
                        $(let $param = params.next().unwrap_or_default();)*
                        (self)($($param),*).into_outcome()
                    }),
                }
            }
        }
    };
}

impl_into_handler!(0;);
impl_into_handler!(1; a: String);
impl_into_handler!(2; a: String, b: String);
impl_into_handler!(3; a: String, b: String, c: String);
impl_into_handler!(4; a: String, b: String, c: String, d: String);
