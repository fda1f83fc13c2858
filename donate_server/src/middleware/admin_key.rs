//! Admin API key middleware for the donation storefront server.
//! This middleware can be placed on any route or service.
//!
//! It checks the incoming request for an `Authorization: Bearer <key>` header matching the configured admin API
//! key. If no key is configured at all, the guarded endpoints answer 503 rather than 403, so that a
//! misconfigured deployment is distinguishable from a bad client.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use dpg_common::Secret;
use futures::{
    future::{ok, Ready},
    Future,
};

use crate::errors::{AuthError, ServerError};

pub struct AdminKeyMiddlewareFactory {
    api_key: Option<Secret<String>>,
}

impl AdminKeyMiddlewareFactory {
    pub fn new(api_key: Option<Secret<String>>) -> Self {
        AdminKeyMiddlewareFactory { api_key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminKeyMiddlewareService { api_key: self.api_key.clone(), service: Rc::new(service) })
    }
}

pub struct AdminKeyMiddlewareService<S> {
    api_key: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let api_key = self.api_key.clone();
        Box::pin(async move {
            let Some(api_key) = api_key else {
                log::warn!("🔐️ Admin endpoint hit, but no admin API key is configured");
                return Err(ServerError::AuthenticationError(AuthError::ApiKeyNotConfigured).into());
            };
            let presented = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim);
            match presented {
                Some(key) if key == api_key.reveal() => service.call(req).await,
                _ => {
                    log::warn!("🔐️ Admin endpoint hit with a missing or invalid API key");
                    Err(ServerError::AuthenticationError(AuthError::InvalidApiKey).into())
                },
            }
        })
    }
}
