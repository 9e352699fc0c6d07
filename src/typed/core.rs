use crate::dispatcher::{DispatcherBuilder, HandlerArgs, HandlerFn};
use crate::ids::RequestId;
use crate::resolver::ResolveError;
use crate::spec::HandlerDescriptor;
use http::Method;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;

/// Trait implemented by typed handlers.
///
/// A handler receives a [`TypedHandlerRequest`] whose `data` was built from
/// the resolved [`HandlerArgs`], and returns a value serialized to the JSON
/// response body.
pub trait Handler: Send + Sync + 'static {
    /// The typed request view (converted from the resolved arguments)
    type Request: for<'a> TryFrom<&'a HandlerArgs, Error = anyhow::Error>;
    /// The typed response type (serialized to JSON)
    type Response: Serialize;

    /// Handle a typed request
    ///
    /// # Errors
    ///
    /// Errors become a 500 outcome, except a [`ResolveError::Rejected`]
    /// which is reported as a 400 binding failure.
    fn handle(&self, req: TypedHandlerRequest<Self::Request>) -> anyhow::Result<Self::Response>;
}

/// Conversion from resolved arguments into a typed request.
///
/// Implemented automatically for `TypedHandlerRequest<T>` where `T` can be
/// built from `&HandlerArgs`.
pub trait TypedHandlerFor<T>: Sized {
    /// # Errors
    ///
    /// [`ResolveError::Rejected`] (boxed in `anyhow`) if `T` refuses the
    /// arguments.
    fn from_args(args: &HandlerArgs) -> anyhow::Result<TypedHandlerRequest<T>>;
}

/// Typed request data passed to a [`Handler`].
#[derive(Debug, Clone)]
pub struct TypedHandlerRequest<T> {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    pub handler_name: String,
    /// Every bound path variable
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    /// Typed request data
    pub data: T,
}

impl<T> TypedHandlerFor<T> for TypedHandlerRequest<T>
where
    T: for<'a> TryFrom<&'a HandlerArgs, Error = anyhow::Error>,
{
    fn from_args(args: &HandlerArgs) -> anyhow::Result<TypedHandlerRequest<T>> {
        let data = T::try_from(args).map_err(|err| ResolveError::Rejected {
            handler: args.handler_name.clone(),
            message: format!("{err:#}"),
        })?;

        Ok(TypedHandlerRequest {
            request_id: args.request_id,
            method: args.method.clone(),
            path: args.path.clone(),
            handler_name: args.handler_name.clone(),
            path_params: args.path_params_map(),
            query_params: args
                .query_params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            data,
        })
    }
}

/// Wrap a typed handler as a plain handler function.
///
/// Request conversion failures surface as 400 outcomes, handler and
/// serialization failures as 500.
pub fn typed_handler_fn<H: Handler>(handler: H) -> HandlerFn {
    Arc::new(move |args: &HandlerArgs| -> anyhow::Result<serde_json::Value> {
        let req = TypedHandlerRequest::<H::Request>::from_args(args)?;
        let response = handler.handle(req)?;
        Ok(serde_json::to_value(response)?)
    })
}

impl DispatcherBuilder {
    /// Register a typed handler with its metadata.
    #[must_use]
    pub fn handler_typed<H: Handler>(self, descriptor: HandlerDescriptor, handler: H) -> Self {
        let f = typed_handler_fn(handler);
        self.handler(descriptor, move |args: &HandlerArgs| f(args))
    }
}
